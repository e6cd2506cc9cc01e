//! Compiler and operator registries.
//!
//! Both registries are built at startup, then injected into the pipeline
//! and treated as read-only — a fresh factory per process, shared by
//! reference across requests, needs no synchronisation.

use std::collections::HashMap;

use crate::plan::Operand;

use super::compiler::SqlCompiler;
use super::errors::{CompilationError, CompileResult};
use super::mysql::MySqlCompiler;
use super::postgres::PostgresCompiler;
use super::sqlite::SqliteCompiler;

/// Constructor for a registered dialect compiler.
pub type CompilerConstructor = Box<dyn Fn() -> Box<dyn SqlCompiler> + Send + Sync>;

/// Registry mapping dialect target names to compiler constructors.
pub struct CompilerFactory {
    compilers: HashMap<String, CompilerConstructor>,
}

impl CompilerFactory {
    /// An empty factory; register targets before use.
    pub fn new() -> Self {
        Self {
            compilers: HashMap::new(),
        }
    }

    /// A factory with the built-in targets registered: `postgres`,
    /// `sqlite`, `mysql`.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("postgres", Box::new(|| Box::new(PostgresCompiler)));
        factory.register("sqlite", Box::new(|| Box::new(SqliteCompiler)));
        factory.register("mysql", Box::new(|| Box::new(MySqlCompiler)));
        factory
    }

    /// Registers (or replaces) a compiler constructor for `name`.
    pub fn register(&mut self, name: &str, constructor: CompilerConstructor) {
        self.compilers.insert(name.to_string(), constructor);
    }

    /// Instantiates the compiler registered for `name`.
    ///
    /// # Errors
    ///
    /// Returns `compile.unsupported_dialect` when nothing is registered.
    pub fn create(&self, name: &str) -> CompileResult<Box<dyn SqlCompiler>> {
        match self.compilers.get(name) {
            Some(constructor) => Ok(constructor()),
            None => Err(CompilationError::unsupported_dialect(
                name,
                self.registered_targets(),
            )),
        }
    }

    /// Sorted list of registered target names.
    pub fn registered_targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.compilers.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }
}

impl Default for CompilerFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Rendering handler for an extension predicate operator:
/// `(operator, args, render_operand) -> sql`.
pub type OperatorHandler = Box<
    dyn Fn(&str, &[Operand], &mut dyn FnMut(&Operand) -> CompileResult<String>) -> CompileResult<String>
        + Send
        + Sync,
>;

/// Registry mapping extension operator names to rendering handlers.
///
/// Built-in operators are typed enum arms rendered directly; this registry
/// only overlays extensions, so an empty registry is the common case.
#[derive(Default)]
pub struct OperatorRegistry {
    handlers: HashMap<String, OperatorHandler>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a handler for `name`.
    pub fn register(&mut self, name: &str, handler: OperatorHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Returns the handler for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&OperatorHandler> {
        self.handlers.get(name)
    }

    /// Sorted list of registered operator names.
    pub fn registered_operators(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_targets_registered() {
        let factory = CompilerFactory::with_builtins();
        assert_eq!(
            factory.registered_targets(),
            vec!["mysql", "postgres", "sqlite"]
        );
        assert_eq!(factory.create("postgres").unwrap().dialect_name(), "postgres");
    }

    #[test]
    fn test_unknown_target_rejected() {
        let factory = CompilerFactory::with_builtins();
        let err = match factory.create("oracle") {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert_eq!(err.code(), "compile.unsupported_dialect");
    }

    #[test]
    fn test_operator_registry_lookup() {
        let mut registry = OperatorRegistry::new();
        assert!(registry.get("REGEXP").is_none());
        registry.register(
            "REGEXP",
            Box::new(|_, args, render| {
                let left = render(&args[0])?;
                let right = render(&args[1])?;
                Ok(format!("{left} REGEXP {right}"))
            }),
        );
        assert!(registry.get("REGEXP").is_some());
        assert_eq!(registry.registered_operators(), vec!["REGEXP"]);
    }
}
