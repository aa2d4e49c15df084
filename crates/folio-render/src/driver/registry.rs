//! Driver classes and their process-wide setup.
//!
//! A class's `open_global` runs when its first instance is activated and its
//! `close_global` runs when the last live instance goes away. The registry
//! only holds weak references, so the lease handed to each instance decides
//! the teardown point.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::Result;

/// A family of drivers sharing global setup.
pub trait DriverClass: Sync {
    fn name(&self) -> &'static str;

    /// Run once before the first instance of this class opens.
    fn open_global(&self) -> Result<()> {
        Ok(())
    }

    /// Run once after the last instance of this class closes.
    fn close_global(&self) {}
}

struct ClassEntry {
    class: &'static dyn DriverClass,
}

impl Drop for ClassEntry {
    fn drop(&mut self) {
        tracing::trace!(class = self.class.name(), "closing driver class");
        self.class.close_global();
    }
}

/// Keeps a driver class alive for as long as one of its instances is.
#[derive(Clone)]
pub struct ClassLease(Arc<ClassEntry>);

impl ClassLease {
    pub fn class_name(&self) -> &'static str {
        self.0.class.name()
    }
}

impl fmt::Debug for ClassLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassLease").field(&self.class_name()).finish()
    }
}

/// Tracks which driver classes currently have live instances.
#[derive(Default)]
pub struct DriverRegistry {
    classes: HashMap<&'static str, Weak<ClassEntry>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lease `class` for a new instance, running its global setup if no
    /// instance is live.
    pub fn acquire(&mut self, class: &'static dyn DriverClass) -> Result<ClassLease> {
        if let Some(entry) = self.classes.get(class.name()).and_then(Weak::upgrade) {
            return Ok(ClassLease(entry));
        }
        tracing::trace!(class = class.name(), "opening driver class");
        class.open_global()?;
        let entry = Arc::new(ClassEntry { class });
        self.classes.insert(class.name(), Arc::downgrade(&entry));
        Ok(ClassLease(entry))
    }

    /// Number of live leases on the class named `name`.
    pub fn instances(&self, name: &str) -> usize {
        self.classes.get(name).map_or(0, Weak::strong_count)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.instances(name) > 0
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut active: Vec<_> = self
            .classes
            .iter()
            .filter(|(_, entry)| entry.strong_count() > 0)
            .map(|(name, _)| *name)
            .collect();
        active.sort_unstable();
        f.debug_struct("DriverRegistry")
            .field("active", &active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl DriverClass for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn open_global(&self) -> Result<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close_global(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Refusing;

    impl DriverClass for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn open_global(&self) -> Result<()> {
            Err(OutputError::Configuration("no device".into()))
        }
    }

    #[test]
    fn global_setup_runs_once_per_activation() {
        static CLASS: Counting = Counting {
            name: "counting",
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        };
        let mut registry = DriverRegistry::new();

        let first = registry.acquire(&CLASS).unwrap();
        let second = registry.acquire(&CLASS).unwrap();
        assert_eq!(CLASS.opens.load(Ordering::SeqCst), 1);
        assert_eq!(registry.instances("counting"), 2);

        drop(first);
        assert_eq!(CLASS.closes.load(Ordering::SeqCst), 0);
        drop(second);
        assert_eq!(CLASS.closes.load(Ordering::SeqCst), 1);
        assert!(!registry.is_active("counting"));

        let _again = registry.acquire(&CLASS).unwrap();
        assert_eq!(CLASS.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_setup_leaves_class_inactive() {
        static CLASS: Refusing = Refusing;
        let mut registry = DriverRegistry::new();
        assert!(registry.acquire(&CLASS).is_err());
        assert!(!registry.is_active("refusing"));
    }
}
