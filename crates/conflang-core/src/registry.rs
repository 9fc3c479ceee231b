use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use crate::error::LineError;

/// Name of the built-in command that accepts anything and does nothing.
pub const NOP_COMMAND: &str = "nop";

/// A command handler, invoked with the command's parameters in source order.
pub type Handler = Box<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Case-sensitive mapping from command name to handler.
///
/// Populate it before a run; the runner only ever borrows it immutably.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Handler>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`NOP_COMMAND`] already registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(NOP_COMMAND, |_| Ok(()));
        registry
    }

    /// Insert or replace the handler for `name`. Last registration wins.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn lookup(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Execute every command in `source` against this registry.
    pub fn run<R: Read>(&self, source: R) -> Result<(), LineError> {
        crate::runner::run(self, source)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_new_is_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup(NOP_COMMAND).is_none());
    }

    #[test]
    fn test_builtins_nop_ignores_params() {
        let registry = Registry::with_builtins();
        let nop = registry.lookup(NOP_COMMAND).unwrap();
        assert!(nop(&["anything".to_string(), "at all".to_string()]).is_ok());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = Registry::new();
        registry.register("link", |_| Ok(()));
        assert!(registry.contains("link"));
        assert!(!registry.contains("Link"));
    }

    #[test]
    fn test_overwrite_last_registration_wins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();

        let first = Arc::clone(&calls);
        registry.register("a", move |_| {
            first.lock().unwrap().push("first");
            Ok(())
        });
        let second = Arc::clone(&calls);
        registry.register("a", move |_| {
            second.lock().unwrap().push("second");
            Ok(())
        });

        assert_eq!(registry.len(), 1);
        registry.run(&b"a\na\n"[..]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["second", "second"]);
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = Registry::with_builtins();
        registry.register("link", |_| Ok(()));
        registry.register("background-maxdim", |_| Ok(()));
        assert_eq!(registry.names(), vec!["background-maxdim", "link", "nop"]);
    }
}
