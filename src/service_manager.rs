//! Service-manager style container backend
//!
//! The direct-API container shape: aliases, factories, invokable classes
//! and pre-set service values are all first-class tables, queried exactly
//! as registered. This mirrors how a Laminas ServiceManager configuration
//! looks (factories / invokables / aliases / services / shared), so a
//! container snapshot can be transcribed into this backend table by table.

use crate::container::{ContainerError, ServiceContainer, ServiceFactory, ServiceValue};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A registered factory: an identifier for reporting plus the closure that
/// actually builds the value.
struct FactoryEntry {
    /// Factory class name, or "Closure" for anonymous factories
    name: String,
    create: ServiceFactory,
}

/// Direct-API container backend.
///
/// Services are shared by default, as in the service manager this models;
/// `set_shared` overrides per name. Shared instances are cached on first
/// `get` and handed back as clones afterwards.
#[derive(Default)]
pub struct ServiceManagerContainer {
    factories: HashMap<String, FactoryEntry>,
    invokables: HashMap<String, String>,
    aliases: HashMap<String, String>,
    services: HashMap<String, ServiceValue>,
    shared: HashMap<String, bool>,
    cache: RefCell<HashMap<String, ServiceValue>>,
}

impl ServiceManagerContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named factory class for a service
    pub fn set_factory(
        &mut self,
        name: impl Into<String>,
        factory_class: impl Into<String>,
        create: impl Fn() -> anyhow::Result<ServiceValue> + Send + Sync + 'static,
    ) {
        self.factories.insert(
            name.into(),
            FactoryEntry {
                name: factory_class.into(),
                create: Arc::new(create),
            },
        );
    }

    /// Register an anonymous closure factory for a service
    pub fn set_closure_factory(
        &mut self,
        name: impl Into<String>,
        create: impl Fn() -> anyhow::Result<ServiceValue> + Send + Sync + 'static,
    ) {
        self.set_factory(name, "Closure", create);
    }

    /// Register an invokable class: resolving the name constructs an object
    /// of that class with no factory in between
    pub fn set_invokable_class(&mut self, name: impl Into<String>, class: impl Into<String>) {
        self.invokables.insert(name.into(), class.into());
    }

    /// Register an alias for another registered name
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Register an already-built service value
    pub fn set_service(&mut self, name: impl Into<String>, value: ServiceValue) {
        self.services.insert(name.into(), value);
    }

    /// Override the shared flag for one name (the default is shared)
    pub fn set_shared(&mut self, name: impl Into<String>, shared: bool) {
        self.shared.insert(name.into(), shared);
    }

    /// Follow the alias chain to the canonical registered name
    fn resolve_name(&self, name: &str) -> String {
        let mut current = name.to_string();
        while let Some(target) = self.aliases.get(&current) {
            current = target.clone();
        }
        current
    }

    fn is_registration(&self, name: &str) -> bool {
        self.services.contains_key(name)
            || self.factories.contains_key(name)
            || self.invokables.contains_key(name)
    }

    fn create(&self, name: &str) -> Result<ServiceValue, ContainerError> {
        if let Some(value) = self.services.get(name) {
            return Ok(value.clone());
        }

        if let Some(entry) = self.factories.get(name) {
            debug!("Creating service {} via factory {}", name, entry.name);
            return (entry.create)().map_err(|e| ContainerError::Creation {
                name: name.to_string(),
                message: e.to_string(),
            });
        }

        if let Some(class) = self.invokables.get(name) {
            debug!("Creating service {} as invokable {}", name, class);
            return Ok(ServiceValue::object(class.clone()));
        }

        Err(ContainerError::NotFound(name.to_string()))
    }
}

impl ServiceContainer for ServiceManagerContainer {
    fn has(&self, name: &str) -> bool {
        self.is_registration(name) || self.aliases.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<ServiceValue, ContainerError> {
        let resolved = self.resolve_name(name);

        if !self.is_registration(&resolved) {
            if self.aliases.contains_key(name) {
                return Err(ContainerError::UnresolvedAlias {
                    alias: name.to_string(),
                    target: resolved,
                });
            }
            return Err(ContainerError::NotFound(name.to_string()));
        }

        if self.is_shared(&resolved) {
            if let Some(cached) = self.cache.borrow().get(&resolved) {
                return Ok(cached.clone());
            }
            let value = self.create(&resolved)?;
            self.cache.borrow_mut().insert(resolved, value.clone());
            Ok(value)
        } else {
            self.create(&resolved)
        }
    }

    fn registered_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .keys()
            .chain(self.factories.keys())
            .chain(self.invokables.keys())
            .chain(self.aliases.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn is_shared(&self, name: &str) -> bool {
        let resolved = self.resolve_name(name);
        self.shared.get(&resolved).copied().unwrap_or(true)
    }

    fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    fn alias_target(&self, name: &str) -> Option<String> {
        self.aliases.get(name).cloned()
    }

    fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn factory_name(&self, name: &str) -> Option<String> {
        self.factories.get(name).map(|entry| entry.name.clone())
    }

    fn has_invokable(&self, name: &str) -> bool {
        self.invokables.contains_key(name)
    }

    fn invokable_class(&self, name: &str) -> Option<String> {
        self.invokables.get(name).cloned()
    }
}
