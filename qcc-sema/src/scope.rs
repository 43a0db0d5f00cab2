//! Symbol and scope model
//!
//! Nested lexical scopes mapping identifiers to typed declarations.
//! Aggregate member lookup lives on the record types themselves; this
//! module covers ordinary identifiers (objects, functions, typedefs,
//! enumeration constants).

use crate::types::{TypeError, TypeRef};
use qcc_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Symbol identifier
pub type SymbolId = u32;

/// Storage classes in C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Auto,
    Static,
    Extern,
    Register,
    Typedef,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class_str = match self {
            StorageClass::Auto => "auto",
            StorageClass::Static => "static",
            StorageClass::Extern => "extern",
            StorageClass::Register => "register",
            StorageClass::Typedef => "typedef",
        };
        write!(f, "{class_str}")
    }
}

/// Linkage of a declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    None,
    Internal,
    External,
}

/// A declared identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: TypeRef,
    pub storage_class: StorageClass,
    pub linkage: Linkage,
    pub is_defined: bool,
    pub scope_level: u32,
}

impl Symbol {
    pub fn new(id: SymbolId, name: String, ty: TypeRef) -> Self {
        Self {
            id,
            name,
            ty,
            storage_class: StorageClass::Auto,
            linkage: Linkage::None,
            is_defined: false,
            scope_level: 0,
        }
    }

    pub fn with_storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = storage_class;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn as_defined(mut self) -> Self {
        self.is_defined = true;
        self
    }
}

/// Nested lexical scopes for one translation unit
///
/// Symbols live in an arena indexed by `SymbolId`; popping a scope hides
/// its names from lookup but never invalidates the ids handed out.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    symbols: Vec<Symbol>,
    scopes: Vec<HashMap<String, SymbolId>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            scopes: vec![HashMap::new()], // file scope
        }
    }

    /// Enter a new scope
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Exit the current scope
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Current nesting level (file scope is 0)
    pub fn level(&self) -> u32 {
        (self.scopes.len() - 1) as u32
    }

    /// Declare a name in the current scope
    pub fn declare(
        &mut self,
        name: &str,
        ty: TypeRef,
        storage_class: StorageClass,
        location: &SourceLocation,
    ) -> Result<SymbolId, TypeError> {
        let scope = self.scopes.last_mut().unwrap();
        if scope.contains_key(name) {
            return Err(TypeError::DuplicateMember {
                name: name.to_string(),
                location: location.clone(),
            });
        }

        let id = self.symbols.len() as SymbolId;
        let level = (self.scopes.len() - 1) as u32;
        let mut symbol = Symbol::new(id, name.to_string(), ty).with_storage_class(storage_class);
        symbol.scope_level = level;

        self.scopes.last_mut().unwrap().insert(name.to_string(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Look up a name from the current scope outward
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.get(name) {
                return Some(id);
            }
        }
        None
    }

    /// Look up a name in the current scope only
    pub fn lookup_current(&self, name: &str) -> Option<SymbolId> {
        self.scopes.last().and_then(|s| s.get(name)).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id as usize]
    }
}
