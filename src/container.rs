//! Service container abstraction
//!
//! This module defines the fixed capability set the inspector needs from a
//! container backend, plus the modeled runtime values the backends hand out.
//! Concrete backends (the service-manager shape and the registry shape) live
//! in their own modules and only have to answer these queries; the
//! introspection logic never looks past this trait.

use std::sync::Arc;
use thiserror::Error;

/// A value resolved out of a container.
///
/// The inspected application is PHP, so a resolved service is either an
/// object of some class or one of PHP's primitive values. Objects carry
/// their fully qualified class name; the class map turns that name into a
/// hierarchy when a scan needs one.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceValue {
    /// An object instance, identified by its fully qualified class name
    Object(String),
    /// A string value
    Str(String),
    /// An integer value
    Int(i64),
    /// A floating point value
    Float(f64),
    /// A boolean value
    Bool(bool),
    /// An array value
    Array(Vec<ServiceValue>),
    /// PHP null
    Null,
}

impl ServiceValue {
    /// Convenience constructor for object values
    pub fn object(class: impl Into<String>) -> Self {
        ServiceValue::Object(class.into())
    }

    /// Whether this value is an object (only objects have a class hierarchy)
    pub fn is_object(&self) -> bool {
        matches!(self, ServiceValue::Object(_))
    }

    /// The class name for objects, or `None` for primitives
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ServiceValue::Object(class) => Some(class),
            _ => None,
        }
    }

    /// The type name reported for this value.
    ///
    /// Objects report their class name. Primitives report the tag the PHP
    /// runtime would (`gettype` names, including the historical "NULL"
    /// casing), so descriptors agree with what the application itself sees.
    pub fn type_name(&self) -> String {
        match self {
            ServiceValue::Object(class) => class.clone(),
            ServiceValue::Str(_) => "string".to_string(),
            ServiceValue::Int(_) => "integer".to_string(),
            ServiceValue::Float(_) => "double".to_string(),
            ServiceValue::Bool(_) => "boolean".to_string(),
            ServiceValue::Array(_) => "array".to_string(),
            ServiceValue::Null => "NULL".to_string(),
        }
    }
}

/// Factory closure a backend runs to create a service value.
///
/// Errors are surfaced as [`ContainerError::Creation`] with the message
/// preserved, so bulk listings can capture them per entry.
pub type ServiceFactory = Arc<dyn Fn() -> anyhow::Result<ServiceValue> + Send + Sync>;

/// Errors a container backend can report.
///
/// These are the only failure shapes the inspector handles: a name that is
/// not registered, a registration whose creation failed, and an alias whose
/// target does not exist.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The name is not registered in the container
    #[error("service \"{0}\" is not registered")]
    NotFound(String),

    /// Creating the service failed (factory error, bad registration, ...)
    #[error("failed to create service \"{name}\": {message}")]
    Creation {
        /// The requested service name
        name: String,
        /// The underlying failure message
        message: String,
    },

    /// An alias points at a name that is not itself registered
    #[error("alias \"{alias}\" points at unknown service \"{target}\"")]
    UnresolvedAlias {
        /// The alias that was requested
        alias: String,
        /// The missing target name
        target: String,
    },
}

/// The capability set a container backend exposes to the inspector.
///
/// Two reference shapes implement this: a service-manager style container
/// where aliases, factories and invokables are first-class tables queried
/// directly, and a registry style container where the same answers are
/// derived from a single closure-backed registration table. The inspector
/// is written against this trait only.
pub trait ServiceContainer {
    /// Check whether a service name is registered (aliases count)
    fn has(&self, name: &str) -> bool;

    /// Resolve a service to its value, creating it if necessary
    fn get(&self, name: &str) -> Result<ServiceValue, ContainerError>;

    /// All registered names, aliases included. Order is not significant;
    /// callers sort.
    fn registered_services(&self) -> Vec<String>;

    /// Whether the container caches a single instance for this name
    fn is_shared(&self, name: &str) -> bool;

    /// Whether the name is an alias for another registration
    fn has_alias(&self, name: &str) -> bool;

    /// The alias target, one level deep. `None` when the name is not an
    /// alias.
    fn alias_target(&self, name: &str) -> Option<String>;

    /// Whether a factory backs this registration
    fn has_factory(&self, name: &str) -> bool;

    /// An identifier for the backing factory (a factory class name, or
    /// "Closure" for anonymous factories). `None` when no factory backs the
    /// name.
    fn factory_name(&self, name: &str) -> Option<String>;

    /// Whether the registration is a bare invokable class
    fn has_invokable(&self, name: &str) -> bool;

    /// The declared invokable class, when there is one
    fn invokable_class(&self, name: &str) -> Option<String>;
}
