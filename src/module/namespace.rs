//! Shared namespace for public entry points
//!
//! A loader installs its declaration entry point here once at startup.
//! Installing a name that is already present is fatal.

use std::collections::HashMap;
use tracing::debug;

use crate::module::traits::LoaderError;

/// Name the declaration entry point is installed under
pub const ENTRY_POINT: &str = "define";

/// Name -> value table where every name can be installed once
#[derive(Debug)]
pub struct Namespace<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Namespace<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `value` under `name`
    ///
    /// Fails with [`LoaderError::InstallationConflict`] if the name is taken;
    /// the existing entry is left untouched.
    pub fn install(&mut self, name: &str, value: T) -> Result<&mut T, LoaderError> {
        if self.entries.contains_key(name) {
            return Err(LoaderError::InstallationConflict(name.to_string()));
        }
        debug!("Installed {} into namespace", name);
        Ok(self.entries.entry(name.to_string()).or_insert(value))
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_once() {
        let mut ns = Namespace::new();
        ns.install(ENTRY_POINT, 1).unwrap();
        let err = ns.install(ENTRY_POINT, 2).unwrap_err();
        assert!(matches!(err, LoaderError::InstallationConflict(ref n) if n == "define"));
        assert_eq!(ns.get(ENTRY_POINT), Some(&1));
    }

    #[test]
    fn test_get_mut() {
        let mut ns = Namespace::new();
        ns.install("x", vec![1]).unwrap();
        ns.get_mut("x").unwrap().push(2);
        assert_eq!(ns.get("x").unwrap(), &vec![1, 2]);
        assert!(!ns.contains("y"));
    }
}
