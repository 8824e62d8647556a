//! Service inspector
//!
//! The query surface over a container backend: derives a [`ServiceInfo`]
//! descriptor for every registered name, lists and filters them, computes
//! the reverse alias map, and runs the hidden-dependency scan over a
//! service's class hierarchy.
//!
//! Descriptor derivation is total: a name whose resolution fails yields an
//! error-flagged descriptor, never an error, so one bad registration cannot
//! abort a listing.

use crate::class_map::ClassMap;
use crate::container::{ContainerError, ServiceContainer, ServiceValue};
use crate::scanner::{self, HiddenDependency};
use crate::service_info::{ServiceInfo, ServiceKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Base class whose descendants may call `$this->getDi(...)`
pub const DI_BASE_CLASS: &str = "SR\\Di\\AbstractDi";

/// Trait granting the same lookup capability to classes outside that
/// hierarchy
pub const DI_TRAIT: &str = "SR\\Di\\DiTrait";

/// Introspection facade over one container snapshot.
///
/// Holds the container backend and the class map for the application's
/// code; every query builds its results fresh from those two sources.
pub struct ServiceInspector<C: ServiceContainer> {
    container: C,
    classes: Arc<ClassMap>,
}

impl<C: ServiceContainer> ServiceInspector<C> {
    /// Create an inspector over a container and the application's class map
    pub fn new(container: C, classes: Arc<ClassMap>) -> Self {
        Self { container, classes }
    }

    /// Every registered service, name-ordered
    pub fn all_services(&self) -> Vec<ServiceInfo> {
        self.services(None, None)
    }

    /// Registered services filtered by name substring and/or kind tag.
    ///
    /// The name filter is a case-insensitive substring test; the kind
    /// filter is an exact match against the external tag ("service",
    /// "alias", "factory", "invokable", "unknown"). Both are optional and
    /// compose with AND. Output is ordered by name.
    pub fn services(&self, filter: Option<&str>, kind: Option<&str>) -> Vec<ServiceInfo> {
        let reverse = self.reverse_aliases();
        let filter_lower = filter.map(str::to_lowercase);

        let mut services = BTreeMap::new();
        for name in self.container.registered_services() {
            if let Some(ref needle) = filter_lower {
                if !name.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }

            let mut info = self.service_info(&name);

            if let Some(kind) = kind {
                if info.kind.as_str() != kind {
                    continue;
                }
            }

            if let Some(aliases) = reverse.get(&name) {
                info.aliases = aliases.clone();
            }

            services.insert(name, info);
        }

        info!(
            "Listed {} service(s) (filter: {:?}, kind: {:?})",
            services.len(),
            filter,
            kind
        );
        services.into_values().collect()
    }

    /// Registered services of one kind, name-ordered
    pub fn services_by_kind(&self, kind: Option<&str>) -> Vec<ServiceInfo> {
        self.services(None, kind)
    }

    /// The descriptor for one name, or `None` when the name is not
    /// registered. Never errors: resolution failures come back as an
    /// error-flagged descriptor.
    pub fn service(&self, name: &str) -> Option<ServiceInfo> {
        if !self.container.has(name) {
            return None;
        }
        Some(self.service_info(name))
    }

    /// Whether a service name is registered
    pub fn has_service(&self, name: &str) -> bool {
        self.container.has(name)
    }

    /// The raw resolved value for a name
    pub fn service_instance(&self, name: &str) -> Result<ServiceValue, ContainerError> {
        self.container.get(name)
    }

    /// Map from each alias target to the alias names pointing at it,
    /// computed in one pass over the registered names. Alias lists are
    /// name-ordered.
    pub fn reverse_aliases(&self) -> HashMap<String, Vec<String>> {
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

        for name in self.container.registered_services() {
            if let Some(target) = self.container.alias_target(&name) {
                reverse.entry(target).or_default().push(name);
            }
        }

        for aliases in reverse.values_mut() {
            aliases.sort();
        }
        reverse
    }

    /// Whether the service's class hierarchy carries the hidden-lookup
    /// capability (extends the DI base class or uses the DI trait
    /// anywhere in the chain). False for primitives and for names that do
    /// not resolve.
    pub fn uses_di(&self, name: &str) -> bool {
        match self.container.get(name) {
            Ok(ServiceValue::Object(class)) => self.class_uses_di(&class),
            _ => false,
        }
    }

    /// Hidden lookup call sites reachable from this service.
    ///
    /// The service is resolved first; a resolution failure aborts the scan
    /// with the container error rather than reporting partial results.
    /// Primitives and marker-less hierarchies yield an empty list without
    /// any file being read. Otherwise every ancestor with a known source
    /// file is scanned, findings attributed to the ancestor's own file, in
    /// chain order.
    pub fn hidden_dependencies(&self, name: &str) -> Result<Vec<HiddenDependency>, ContainerError> {
        let value = self.container.get(name)?;

        let class = match value {
            ServiceValue::Object(class) => class,
            _ => return Ok(Vec::new()),
        };

        if !self.class_uses_di(&class) {
            debug!("Service {} ({}) does not use the DI lookup capability", name, class);
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for ancestor in self.classes.hierarchy_of(&class) {
            let Some(file) = ancestor.file.as_deref() else {
                continue;
            };
            findings.extend(scanner::scan_file(file));
        }

        info!("Found {} hidden dependency call site(s) for {}", findings.len(), name);
        Ok(findings)
    }

    fn class_uses_di(&self, class: &str) -> bool {
        let chain = self.classes.hierarchy_of(class);

        if chain.iter().any(|ancestor| ancestor.name == DI_BASE_CLASS) {
            return true;
        }

        chain
            .iter()
            .flat_map(|ancestor| ancestor.traits.iter())
            .any(|t| t == DI_TRAIT)
    }

    /// Derive the descriptor for one registered name. Total: every failure
    /// mode ends up inside the descriptor.
    fn service_info(&self, name: &str) -> ServiceInfo {
        // Aliases classify immediately; the target's own descriptor carries
        // the rest of the metadata.
        if let Some(target) = self.container.alias_target(name) {
            return ServiceInfo {
                name: name.to_string(),
                kind: ServiceKind::Alias,
                class: target,
                is_shared: false,
                is_aliased: true,
                aliases: Vec::new(),
                factory: None,
                invokable_class: None,
                error: None,
            };
        }

        let factory = self.container.factory_name(name);
        let invokable_class = self.container.invokable_class(name);

        let mut kind = if factory.is_some() {
            ServiceKind::Factory
        } else if invokable_class.is_some() {
            ServiceKind::Invokable
        } else {
            ServiceKind::Service
        };

        let mut error = None;
        let class = if self.container.has(name) {
            match self.container.get(name) {
                Ok(value) => value.type_name(),
                Err(e) => {
                    kind = ServiceKind::Unknown;
                    error = Some(e.to_string());
                    format!("Error: {}", e)
                }
            }
        } else {
            "unknown".to_string()
        };

        ServiceInfo {
            name: name.to_string(),
            kind,
            class,
            is_shared: self.container.is_shared(name),
            is_aliased: false,
            aliases: Vec::new(),
            factory,
            invokable_class,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_map::ClassInfo;
    use crate::service_manager::ServiceManagerContainer;
    use anyhow::anyhow;

    fn class_map() -> Arc<ClassMap> {
        let mut map = ClassMap::new();
        map.insert(ClassInfo {
            name: "App\\Service\\Mailer".into(),
            file: None,
            parent: Some(DI_BASE_CLASS.into()),
            traits: vec![],
        });
        map.insert(ClassInfo {
            name: "App\\Service\\Plain".into(),
            file: None,
            parent: None,
            traits: vec![],
        });
        Arc::new(map)
    }

    fn inspector() -> ServiceInspector<ServiceManagerContainer> {
        let mut container = ServiceManagerContainer::new();
        container.set_factory("mailer", "App\\Factory\\MailerFactory", || {
            Ok(ServiceValue::object("App\\Service\\Mailer"))
        });
        container.set_alias("mail", "mailer");
        container.set_alias("mailer.legacy", "mailer");
        container.set_invokable_class("plain", "App\\Service\\Plain");
        container.set_service("config", ServiceValue::Array(vec![]));
        container.set_closure_factory("broken", || Err(anyhow!("boom")));
        ServiceInspector::new(container, class_map())
    }

    #[test]
    fn test_service_present_iff_registered() {
        let inspector = inspector();
        assert!(inspector.service("mailer").is_some());
        assert!(inspector.service("mail").is_some());
        assert!(inspector.service("missing").is_none());
        assert!(inspector.has_service("mailer"));
        assert!(!inspector.has_service("missing"));
    }

    #[test]
    fn test_alias_descriptor_points_at_target() {
        let inspector = inspector();
        let info = inspector.service("mail").unwrap();
        assert_eq!(info.kind, ServiceKind::Alias);
        assert!(info.is_alias());
        assert!(info.is_aliased);
        assert_eq!(info.class, "mailer");
        assert!(!info.is_shared);
    }

    #[test]
    fn test_factory_descriptor() {
        let inspector = inspector();
        let info = inspector.service("mailer").unwrap();
        assert_eq!(info.kind, ServiceKind::Factory);
        assert_eq!(info.class, "App\\Service\\Mailer");
        assert_eq!(info.factory.as_deref(), Some("App\\Factory\\MailerFactory"));
        assert!(info.is_shared);
        assert!(!info.has_error());
    }

    #[test]
    fn test_invokable_descriptor() {
        let inspector = inspector();
        let info = inspector.service("plain").unwrap();
        assert_eq!(info.kind, ServiceKind::Invokable);
        assert_eq!(info.invokable_class.as_deref(), Some("App\\Service\\Plain"));
        assert_eq!(info.class, "App\\Service\\Plain");
    }

    #[test]
    fn test_factory_wins_over_invokable_but_both_are_recorded() {
        let mut container = ServiceManagerContainer::new();
        container.set_factory("dual", "App\\Factory\\DualFactory", || {
            Ok(ServiceValue::object("App\\Service\\Plain"))
        });
        container.set_invokable_class("dual", "App\\Service\\Plain");
        let inspector = ServiceInspector::new(container, class_map());

        let info = inspector.service("dual").unwrap();
        assert_eq!(info.kind, ServiceKind::Factory);
        assert_eq!(info.factory.as_deref(), Some("App\\Factory\\DualFactory"));
        assert_eq!(info.invokable_class.as_deref(), Some("App\\Service\\Plain"));
    }

    #[test]
    fn test_plain_value_descriptor_reports_primitive_tag() {
        let inspector = inspector();
        let info = inspector.service("config").unwrap();
        assert_eq!(info.kind, ServiceKind::Service);
        assert_eq!(info.class, "array");
    }

    #[test]
    fn test_failing_factory_becomes_unknown_descriptor() {
        let inspector = inspector();
        let info = inspector.service("broken").unwrap();
        assert_eq!(info.kind, ServiceKind::Unknown);
        assert!(info.has_error());
        assert!(info.class.starts_with("Error: "));
        assert!(info.error.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn test_listing_is_name_ordered_and_total() {
        let inspector = inspector();
        let services = inspector.all_services();
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["broken", "config", "mail", "mailer", "mailer.legacy", "plain"]
        );
    }

    #[test]
    fn test_name_filter_is_case_insensitive_substring() {
        let inspector = inspector();
        let services = inspector.services(Some("MAIL"), None);
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mail", "mailer", "mailer.legacy"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let inspector = inspector();
        let once = inspector.services(Some("mail"), None);
        let again: Vec<_> = once
            .iter()
            .filter(|s| s.name.to_lowercase().contains("mail"))
            .cloned()
            .collect();
        assert_eq!(once, again);
    }

    #[test]
    fn test_kind_filter_composes_with_name_filter() {
        let inspector = inspector();
        let aliases = inspector.services(Some("mail"), Some("alias"));
        let names: Vec<&str> = aliases.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mail", "mailer.legacy"]);

        let factories = inspector.services_by_kind(Some("factory"));
        let names: Vec<&str> = factories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mailer"]);
    }

    #[test]
    fn test_unmatched_kind_filter_excludes_silently() {
        let inspector = inspector();
        assert!(inspector.services(None, Some("nonsense")).is_empty());
    }

    #[test]
    fn test_reverse_aliases() {
        let inspector = inspector();
        let reverse = inspector.reverse_aliases();
        assert_eq!(
            reverse.get("mailer"),
            Some(&vec!["mail".to_string(), "mailer.legacy".to_string()])
        );
        assert!(reverse.get("plain").is_none());
    }

    #[test]
    fn test_listing_fills_alias_backreferences() {
        let inspector = inspector();
        let services = inspector.all_services();
        let mailer = services.iter().find(|s| s.name == "mailer").unwrap();
        assert_eq!(mailer.aliases, vec!["mail".to_string(), "mailer.legacy".to_string()]);
    }

    #[test]
    fn test_uses_di_through_base_class() {
        let inspector = inspector();
        assert!(inspector.uses_di("mailer"));
        assert!(!inspector.uses_di("plain"));
        assert!(!inspector.uses_di("config"));
        assert!(!inspector.uses_di("missing"));
    }

    #[test]
    fn test_hidden_dependencies_error_for_failing_service() {
        let inspector = inspector();
        assert!(inspector.hidden_dependencies("broken").is_err());
    }

    #[test]
    fn test_hidden_dependencies_empty_for_primitive_and_markerless() {
        let inspector = inspector();
        assert!(inspector.hidden_dependencies("config").unwrap().is_empty());
        assert!(inspector.hidden_dependencies("plain").unwrap().is_empty());
    }
}
