//! Per-compilation context
//!
//! One `Context` per translation unit, threaded through the parser,
//! the type registry, and the evaluator. It replaces any file-static
//! pools or process-global state: dropping the context releases every
//! type, symbol, and interned literal of the compilation.

use crate::scope::ScopeStack;
use crate::strings::{LabelGenerator, StringPool};
use crate::types::TypeRegistry;
use std::path::PathBuf;

/// Options accumulated from the command line
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// `-I` include search paths, in order
    pub include_paths: Vec<PathBuf>,
    /// `-D` macro definitions as `(name, optional value)`
    pub defines: Vec<(String, Option<String>)>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_include_path(&mut self, path: PathBuf) {
        self.include_paths.push(path);
    }

    /// Record a `-D name[=value]` definition
    pub fn add_define(&mut self, spec: &str) {
        let (name, value) = Self::parse_define(spec);
        self.defines.push((name, value));
    }

    /// Split `name[=value]`; a missing value defines the macro as `1`
    /// downstream, which the preprocessor handles
    pub fn parse_define(spec: &str) -> (String, Option<String>) {
        match spec.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (spec.to_string(), None),
        }
    }
}

/// State owned for the duration of one translation unit
#[derive(Debug)]
pub struct Context {
    pub options: CompileOptions,
    pub types: TypeRegistry,
    pub strings: StringPool,
    pub scopes: ScopeStack,
    pub labels: LabelGenerator,
}

impl Context {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            types: TypeRegistry::new(),
            strings: StringPool::new(),
            scopes: ScopeStack::new(),
            labels: LabelGenerator::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(CompileOptions::new())
    }
}
