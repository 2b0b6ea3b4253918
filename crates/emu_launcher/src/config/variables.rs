//! Ordered, case-insensitive variable table

use indexmap::IndexMap;
use std::fmt;

/// A named string value as last written by the launch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
}

/// Variables in insertion order, keyed case-insensitively
///
/// Re-assigning a key under any casing replaces the entry in place, so the
/// dump keeps the position of the first assignment and the casing of the last.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: IndexMap<String, Variable>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&fold(name))
            .map(|v| v.value.as_str())
    }

    /// Insert a variable, or replace the value of an existing one
    pub fn upsert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let variable = Variable {
            key: key.clone(),
            value: value.into(),
        };
        // IndexMap::insert keeps the slot of an existing key
        self.entries.insert(fold(&key), variable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// `key = value` per line, in insertion order
impl fmt::Display for VariableTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for variable in self.iter() {
            writeln!(f, "{} = {}", variable.key, variable.value)?;
        }
        Ok(())
    }
}
