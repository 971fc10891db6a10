//! Variable storage: global, module and function scopes plus a mock
//! table consulted before any of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{BrsObject, BrsType, RoAssociativeArray};

/// Which table a definition goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Standard-library functions, visible everywhere.
    Global,
    /// Functions declared in the program's source files.
    Module,
    /// Locals of the currently executing function.
    Function,
}

type SharedTable = Rc<RefCell<HashMap<String, BrsType>>>;

/// Names are case-insensitive and stored lowercased. Global, module and
/// mock tables are shared between every function environment; each call
/// gets a fresh function table.
#[derive(Debug, Clone)]
pub struct Environment {
    global: SharedTable,
    module: SharedTable,
    function: HashMap<String, BrsType>,
    mocks: SharedTable,
    /// Receiver bound to `m` in the current function.
    m: RoAssociativeArray,
    /// Module-level `m`, also returned by `GetGlobalAA()`.
    root_m: RoAssociativeArray,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        let root_m = RoAssociativeArray::new();
        Self {
            global: Rc::default(),
            module: Rc::default(),
            function: HashMap::new(),
            mocks: Rc::default(),
            m: root_m.clone(),
            root_m,
        }
    }

    pub fn define(&mut self, scope: Scope, name: &str, value: BrsType) {
        let name = name.to_ascii_lowercase();
        match scope {
            Scope::Global => {
                self.global.borrow_mut().insert(name, value);
            }
            Scope::Module => {
                self.module.borrow_mut().insert(name, value);
            }
            Scope::Function => {
                self.function.insert(name, value);
            }
        }
    }

    /// Look `name` up: `m`, then mocks, then function, module and global
    /// scope in that order.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<BrsType> {
        let name = name.to_ascii_lowercase();
        if name == "m" {
            return Some(BrsType::Object(BrsObject::AssociativeArray(self.m.clone())));
        }
        if let Some(value) = self.mocks.borrow().get(&name) {
            return Some(value.clone());
        }
        if let Some(value) = self.function.get(&name) {
            return Some(value.clone());
        }
        if let Some(value) = self.module.borrow().get(&name) {
            return Some(value.clone());
        }
        self.global.borrow().get(&name).cloned()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        self.function.remove(&name.to_ascii_lowercase());
    }

    #[must_use]
    pub fn m(&self) -> RoAssociativeArray {
        self.m.clone()
    }

    pub fn set_m(&mut self, m: RoAssociativeArray) {
        self.m = m;
    }

    #[must_use]
    pub fn root_m(&self) -> RoAssociativeArray {
        self.root_m.clone()
    }

    /// Substitute `value` for every lookup of `name` until mocks are reset.
    pub fn set_mock(&self, name: &str, value: BrsType) {
        self.mocks
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), value);
    }

    pub fn reset_mocks(&self) {
        self.mocks.borrow_mut().clear();
    }

    /// Environment for a new call: same shared tables, empty function
    /// scope, `m` bound to `receiver` or the module-level `m`.
    #[must_use]
    pub fn create_sub_environment(&self, receiver: Option<RoAssociativeArray>) -> Self {
        Self {
            global: Rc::clone(&self.global),
            module: Rc::clone(&self.module),
            function: HashMap::new(),
            mocks: Rc::clone(&self.mocks),
            m: receiver.unwrap_or_else(|| self.root_m.clone()),
            root_m: self.root_m.clone(),
        }
    }
}
