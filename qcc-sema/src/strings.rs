//! String-literal pool and label generation
//!
//! String literals are interned per translation unit; the pool id feeds
//! the `.LC{n}` label the code generator emits for the literal's
//! storage. `LabelGenerator` mints the remaining symbolic labels
//! (lowered control flow, block-scope statics).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interned string literals for one translation unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringPool {
    entries: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a literal, returning its pool id. Identical literals
    /// share one entry.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.lookup.get(value) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(value.to_string());
        self.lookup.insert(value.to_string(), id);
        id
    }

    /// The assembly label for a pool entry
    pub fn label(id: u32) -> String {
        format!(".LC{}", id)
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(id as usize).map(|s| s.as_str())
    }

    /// All entries in id order, for emission
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u32, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label generator for lowered control flow and mangled statics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelGenerator {
    next_id: u32,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate a new unique label
    pub fn new_label(&mut self) -> String {
        let label = format!("L{}", self.next_id);
        self.next_id += 1;
        label
    }

    /// Generate a new label with a prefix (e.g. a block-scope static's
    /// mangled name)
    pub fn new_label_with_prefix(&mut self, prefix: &str) -> String {
        let label = format!("{}.{}", prefix, self.next_id);
        self.next_id += 1;
        label
    }
}
