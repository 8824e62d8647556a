//! Laminas Inspect - service container introspection for PHP applications
//!
//! This library models a PHP application's dependency-injection container,
//! derives a uniform descriptor for every registered service, and detects
//! hidden `$this->getDi(...)` / `Registry::get(...)` lookups buried in
//! service class hierarchies.

// Core modules
pub mod container;
pub mod class_map;
pub mod service_info;
pub mod scanner;
pub mod inspector;

// Container backends
pub mod service_manager;
pub mod di_registry;

// Re-export commonly used types
pub use container::{ContainerError, ServiceContainer, ServiceFactory, ServiceValue};
pub use class_map::{ClassInfo, ClassMap};
pub use di_registry::DiRegistryContainer;
pub use inspector::{ServiceInspector, DI_BASE_CLASS, DI_TRAIT};
pub use scanner::HiddenDependency;
pub use service_info::{ServiceInfo, ServiceKind};
pub use service_manager::ServiceManagerContainer;
