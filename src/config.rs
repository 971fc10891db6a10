//! Execution options and the channel manifest.

use std::collections::HashMap;

/// Settings for one interpreter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Name reported in locations for source passed without a path.
    pub file: String,
    /// Preprocessor constants, keyed by lowercased name.
    pub bs_const: HashMap<String, bool>,
    /// Calls deeper than this raise a stack-overflow error.
    pub max_call_depth: usize,
    /// Columns per `print` zone, the stop a `,` separator tabs to.
    pub print_width: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            file: "main.brs".to_string(),
            bs_const: HashMap::new(),
            max_call_depth: 256,
            print_width: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest line {line}: expected 'key=value', found {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("bs_const entry {0:?} must look like NAME=true or NAME=false")]
    MalformedConst(String),
}

/// A channel manifest: `key=value` lines, `#` comments and blank lines
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: HashMap<String, String>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut entries = HashMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ManifestError::MalformedLine {
                    line: index + 1,
                    text: raw.to_string(),
                });
            };
            entries.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Constants from `bs_const=name=true;other=false`. A manifest without
    /// the key has no constants.
    pub fn bs_const(&self) -> Result<HashMap<String, bool>, ManifestError> {
        let mut constants = HashMap::new();
        let Some(value) = self.get("bs_const") else {
            return Ok(constants);
        };
        for entry in value.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = parse_const(entry)?;
            constants.insert(name, value);
        }
        Ok(constants)
    }
}

/// One `NAME=true|false` pair. The name is lowercased.
pub fn parse_const(entry: &str) -> Result<(String, bool), ManifestError> {
    let malformed = || ManifestError::MalformedConst(entry.to_string());
    let (name, value) = entry.split_once('=').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => return Err(malformed()),
    };
    Ok((name.to_ascii_lowercase(), value))
}
