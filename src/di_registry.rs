//! Registry style container backend
//!
//! The second reference container shape: a flat registry where every entry
//! is a closure-backed registration and there is no first-class notion of
//! factories or invokables. The answers the inspector needs are derived
//! from the registry's two tables instead of queried directly:
//!
//! - every registered entry is closure-backed, so "has a factory" is the
//!   same question as "is registered", and the factory identifier is always
//!   reported as "Closure"
//! - invokable classes do not exist in this shape
//! - shared defaults to false and is a per-entry flag
//!
//! Names are mangled before lookup: the registry flattens namespaced names
//! by replacing the separator with an underscore, so `App\Logger` and
//! `App_Logger` address the same entry.

use crate::container::{ContainerError, ServiceContainer, ServiceFactory, ServiceValue};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One closure-backed registration
struct RegisteredObject {
    create: ServiceFactory,
    shared: bool,
    instance: RefCell<Option<ServiceValue>>,
}

/// Registry container backend with flattened name keys.
#[derive(Default)]
pub struct DiRegistryContainer {
    /// Registered entries, keyed by mangled name
    objects: HashMap<String, RegisteredObject>,
    /// Alias -> target name, keyed by mangled alias; targets stay unmangled
    aliases: HashMap<String, String>,
}

/// Flatten a namespaced name to the registry's key form
fn mangle(name: &str) -> String {
    name.replace('\\', "_")
}

impl DiRegistryContainer {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure-backed entry
    pub fn register(
        &mut self,
        name: impl Into<String>,
        shared: bool,
        create: impl Fn() -> anyhow::Result<ServiceValue> + Send + Sync + 'static,
    ) {
        self.objects.insert(
            mangle(&name.into()),
            RegisteredObject {
                create: Arc::new(create),
                shared,
                instance: RefCell::new(None),
            },
        );
    }

    /// Register an alias for another registered name
    pub fn register_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(mangle(&alias.into()), target.into());
    }

    fn entry(&self, name: &str) -> Option<&RegisteredObject> {
        self.objects.get(&mangle(name))
    }
}

impl ServiceContainer for DiRegistryContainer {
    fn has(&self, name: &str) -> bool {
        let key = mangle(name);
        self.objects.contains_key(&key) || self.aliases.contains_key(&key)
    }

    fn get(&self, name: &str) -> Result<ServiceValue, ContainerError> {
        // One level of alias indirection, as the registry itself resolves it
        let (lookup, entry) = match self.aliases.get(&mangle(name)) {
            Some(target) => match self.entry(target) {
                Some(entry) => (target.clone(), entry),
                None => {
                    return Err(ContainerError::UnresolvedAlias {
                        alias: name.to_string(),
                        target: target.clone(),
                    })
                }
            },
            None => match self.entry(name) {
                Some(entry) => (name.to_string(), entry),
                None => return Err(ContainerError::NotFound(name.to_string())),
            },
        };

        if entry.shared {
            if let Some(cached) = entry.instance.borrow().as_ref() {
                return Ok(cached.clone());
            }
        }

        debug!("Creating registry entry {}", lookup);
        let value = (entry.create)().map_err(|e| ContainerError::Creation {
            name: lookup,
            message: e.to_string(),
        })?;

        if entry.shared {
            *entry.instance.borrow_mut() = Some(value.clone());
        }

        Ok(value)
    }

    fn registered_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .keys()
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn is_shared(&self, name: &str) -> bool {
        self.entry(name).map(|entry| entry.shared).unwrap_or(false)
    }

    fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(&mangle(name))
    }

    fn alias_target(&self, name: &str) -> Option<String> {
        self.aliases.get(&mangle(name)).cloned()
    }

    fn has_factory(&self, name: &str) -> bool {
        // Every registry entry is closure-backed
        self.entry(name).is_some()
    }

    fn factory_name(&self, name: &str) -> Option<String> {
        self.entry(name).map(|_| "Closure".to_string())
    }

    fn has_invokable(&self, _name: &str) -> bool {
        false
    }

    fn invokable_class(&self, _name: &str) -> Option<String> {
        None
    }
}
