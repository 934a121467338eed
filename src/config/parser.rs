//! Parsing of the services document into an immutable snapshot.
//!
//! The document groups service entries under named categories:
//!
//! ```yaml
//! services:
//!   core:
//!     - name: database
//!       startup_priority: 1
//!   app:
//!     - name: notifications
//!       startup_priority: 20
//! ```
//!
//! Categories are organizational only; service names share one global
//! namespace. Declaration order is significant: it breaks ties between equal
//! startup priorities, so parsing walks the YAML mapping in document order.

use super::types::ServiceConfig;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Immutable view of the parsed services document.
///
/// Built once per successful load and swapped in atomically, so concurrent
/// readers never observe a half-updated set of services.
#[derive(Debug, Default)]
pub struct Snapshot {
    services: HashMap<String, ServiceConfig>,
    startup_order: Vec<String>,
}

impl Snapshot {
    /// Look up a service entry by name.
    pub fn get(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Whether the document declares this service.
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// All known service names, ascending by `startup_priority`, ties broken
    /// by declaration order. Shutdown uses this sequence reversed.
    pub fn startup_order(&self) -> &[String] {
        &self.startup_order
    }

    /// Number of declared services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the document declares no services at all.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[derive(serde::Deserialize)]
struct RawDocument {
    /// Kept as a raw mapping so category declaration order survives; a plain
    /// `HashMap` would scramble the priority tie-break.
    #[serde(default)]
    services: serde_yaml::Mapping,
}

/// Parser for the services YAML document.
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a YAML string into a snapshot.
    pub fn parse(&self, content: &str) -> Result<Snapshot> {
        let raw: RawDocument = serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse services document: {}", e)))?;

        let mut declared: Vec<ServiceConfig> = Vec::new();
        for (key, value) in raw.services {
            let category = key.as_str().ok_or_else(|| {
                Error::Parse(format!("Service category key must be a string, got: {:?}", key))
            })?;

            let entries: Vec<ServiceConfig> =
                serde_yaml::from_value(value).map_err(|e| {
                    Error::Parse(format!("Invalid entries under category '{}': {}", category, e))
                })?;

            for mut entry in entries {
                entry.category = category.to_string();
                declared.push(entry);
            }
        }

        Self::validate(&declared)?;

        // Stable sort keeps declaration order within equal priorities.
        let mut ordered: Vec<&ServiceConfig> = declared.iter().collect();
        ordered.sort_by_key(|entry| entry.startup_priority);
        let startup_order = ordered.into_iter().map(|e| e.name.clone()).collect();

        let services = declared
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect();

        Ok(Snapshot {
            services,
            startup_order,
        })
    }

    fn validate(declared: &[ServiceConfig]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in declared {
            if entry.name.is_empty() {
                return Err(Error::Config(format!(
                    "Service in category '{}' has an empty name",
                    entry.category
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate service name '{}' in services document",
                    entry.name
                )));
            }
            if entry.startup_timeout.is_zero() || entry.shutdown_timeout.is_zero() {
                return Err(Error::Config(format!(
                    "Service '{}' must have positive startup/shutdown timeouts",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(yaml: &str) -> Snapshot {
        DocumentParser::new().parse(yaml).expect("valid document")
    }

    #[test]
    fn test_parse_groups_and_names() {
        let snapshot = parse(
            r#"
services:
  core:
    - name: database
      startup_priority: 1
  app:
    - name: notifications
      startup_priority: 20
      enabled: false
"#,
        );

        assert_eq!(snapshot.len(), 2);
        let db = snapshot.get("database").unwrap();
        assert_eq!(db.category, "core");
        assert!(db.enabled);
        let notif = snapshot.get("notifications").unwrap();
        assert_eq!(notif.category, "app");
        assert!(!notif.enabled);
    }

    #[test]
    fn test_startup_order_sorts_by_priority() {
        let snapshot = parse(
            r#"
services:
  app:
    - name: late
      startup_priority: 30
  core:
    - name: early
      startup_priority: 1
    - name: middle
      startup_priority: 10
"#,
        );
        assert_eq!(snapshot.startup_order(), ["early", "middle", "late"]);
    }

    #[test]
    fn test_startup_order_ties_break_by_declaration_order() {
        let snapshot = parse(
            r#"
services:
  core:
    - name: b
      startup_priority: 5
    - name: a
      startup_priority: 5
  data:
    - name: c
      startup_priority: 5
"#,
        );
        // Same priority: document order wins, not alphabetical.
        assert_eq!(snapshot.startup_order(), ["b", "a", "c"]);
    }

    #[test]
    fn test_parse_timeouts_and_dependencies() {
        let snapshot = parse(
            r#"
services:
  core:
    - name: api
      startup_timeout: 10s
      shutdown_timeout: 500ms
      dependencies:
        - database
        - service: cache
          required: false
"#,
        );
        let api = snapshot.get("api").unwrap();
        assert_eq!(api.startup_timeout, Duration::from_secs(10));
        assert_eq!(api.shutdown_timeout, Duration::from_millis(500));
        assert_eq!(api.dependencies.len(), 2);
        assert!(api.dependencies[0].is_required());
        assert!(!api.dependencies[1].is_required());
    }

    #[test]
    fn test_duplicate_name_across_categories_rejected() {
        let err = DocumentParser::new()
            .parse(
                r#"
services:
  core:
    - name: db
  data:
    - name: db
"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate service name 'db'"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = DocumentParser::new()
            .parse(
                r#"
services:
  core:
    - name: db
      startup_timeout: 0s
"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = DocumentParser::new().parse("services: [not: {a map").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_empty_document_is_empty_snapshot() {
        let snapshot = parse("services: {}");
        assert!(snapshot.is_empty());
        assert!(snapshot.startup_order().is_empty());
    }
}
