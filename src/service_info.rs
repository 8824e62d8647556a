//! Service descriptors
//!
//! [`ServiceInfo`] is the uniform record the inspector derives for every
//! registered name, whatever the backing container shape. Descriptors are
//! immutable values built fresh per query and serialize to the plain
//! structured form a presentation layer renders.

use serde::{Deserialize, Serialize};

/// Classification of a registered name.
///
/// A name can carry both factory and invokable metadata at once; the
/// reported kind follows a fixed priority: Alias > Factory > Invokable >
/// Service. Unknown marks a name whose resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// A concrete registered service
    Service,
    /// A name forwarding resolution to another name
    Alias,
    /// A factory-backed registration
    Factory,
    /// A bare invokable class registration
    Invokable,
    /// Resolution failed; see the descriptor's error field
    Unknown,
}

impl ServiceKind {
    /// The external string tag for this kind (used by the type filter)
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Service => "service",
            ServiceKind::Alias => "alias",
            ServiceKind::Factory => "factory",
            ServiceKind::Invokable => "invokable",
            ServiceKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the inspector knows about one registered name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// The registered service name
    pub name: String,

    /// Classification under the fixed kind priority
    #[serde(rename = "type")]
    pub kind: ServiceKind,

    /// For aliases, the target name. Otherwise the resolved runtime type:
    /// a class name, a primitive type tag, or an error note when
    /// resolution failed.
    pub class: String,

    /// Whether the container caches a single instance
    #[serde(default)]
    pub is_shared: bool,

    /// Whether this name is an alias
    #[serde(default)]
    pub is_aliased: bool,

    /// Alias names that point at this service (filled during listing)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Identifier of the backing factory, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,

    /// Declared invokable class, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invokable_class: Option<String>,

    /// Failure message when resolution failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceInfo {
    /// Whether this is a plain service registration
    pub fn is_service(&self) -> bool {
        self.kind == ServiceKind::Service
    }

    /// Whether this name is an alias
    pub fn is_alias(&self) -> bool {
        self.kind == ServiceKind::Alias
    }

    /// Whether this name is factory-backed
    pub fn is_factory(&self) -> bool {
        self.kind == ServiceKind::Factory
    }

    /// Whether this name is an invokable registration
    pub fn is_invokable(&self) -> bool {
        self.kind == ServiceKind::Invokable
    }

    /// Whether resolution failed for this name
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ServiceInfo {
        ServiceInfo {
            name: "mailer".into(),
            kind: ServiceKind::Factory,
            class: "App\\Service\\Mailer".into(),
            is_shared: true,
            is_aliased: false,
            aliases: vec![],
            factory: Some("App\\Factory\\MailerFactory".into()),
            invokable_class: None,
            error: None,
        }
    }

    #[test]
    fn test_kind_predicates() {
        let info = descriptor();
        assert!(info.is_factory());
        assert!(!info.is_service());
        assert!(!info.is_alias());
        assert!(!info.is_invokable());
        assert!(!info.has_error());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ServiceKind::Service.as_str(), "service");
        assert_eq!(ServiceKind::Alias.as_str(), "alias");
        assert_eq!(ServiceKind::Factory.as_str(), "factory");
        assert_eq!(ServiceKind::Invokable.as_str(), "invokable");
        assert_eq!(ServiceKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_serialized_form_uses_external_tags() {
        let json = serde_json::to_value(descriptor()).unwrap();
        assert_eq!(json["type"], "factory");
        assert_eq!(json["name"], "mailer");
        assert_eq!(json["is_shared"], true);
        // Absent optionals are absent, not null or empty
        assert!(json.get("invokable_class").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("aliases").is_none());
    }

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let original = descriptor();
        let json = serde_json::to_string(&original).unwrap();
        let restored: ServiceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
        assert!(restored.invokable_class.is_none());
        assert!(restored.error.is_none());
        assert!(restored.aliases.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_error_descriptor() {
        let original = ServiceInfo {
            name: "db".into(),
            kind: ServiceKind::Unknown,
            class: "Error: connection refused".into(),
            is_shared: false,
            is_aliased: false,
            aliases: vec![],
            factory: None,
            invokable_class: None,
            error: Some("connection refused".into()),
        };

        let json = serde_json::to_string(&original).unwrap();
        let restored: ServiceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
        assert!(restored.has_error());
    }
}
