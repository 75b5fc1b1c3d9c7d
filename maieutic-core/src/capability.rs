//! Capability-to-agent index used for indirect routing
//!
//! Built once per orchestrator lifecycle from the capability snapshots
//! taken at agent registration; never mutated incrementally. When two
//! agents declare the same capability the first registrant keeps it and
//! the collision is logged — a later registration never silently
//! overwrites an earlier one.
//!
//! ```rust
//! use maieutic_core::capability::CapabilityRegistry;
//!
//! let registry = CapabilityRegistry::build(vec![
//!     ("user_manager".to_string(), vec!["create_user".to_string()]),
//!     ("impostor".to_string(), vec!["create_user".to_string()]),
//! ]);
//! assert_eq!(registry.lookup("create_user"), Some("user_manager"));
//! assert_eq!(registry.all_capabilities(), vec!["create_user".to_string()]);
//! ```

use std::collections::HashMap;
use tracing::{debug, warn};

/// Mapping from capability name to owning agent id
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    mapping: HashMap<String, String>,
}

impl CapabilityRegistry {
    /// Build the index from `(agent_id, capabilities)` entries in
    /// registration order; first registrant wins on collision
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut mapping: HashMap<String, String> = HashMap::new();
        for (agent_id, capabilities) in entries {
            for capability in capabilities {
                if let Some(existing) = mapping.get(&capability) {
                    warn!(
                        capability = %capability,
                        kept = %existing,
                        ignored = %agent_id,
                        "capability collision; keeping first registrant"
                    );
                    continue;
                }
                debug!(capability = %capability, agent = %agent_id, "capability registered");
                mapping.insert(capability, agent_id.clone());
            }
        }
        Self { mapping }
    }

    /// Agent id owning `capability`, if any
    pub fn lookup(&self, capability: &str) -> Option<&str> {
        self.mapping.get(capability).map(String::as_str)
    }

    /// Every known capability, sorted for deterministic output
    pub fn all_capabilities(&self) -> Vec<String> {
        let mut capabilities: Vec<String> = self.mapping.keys().cloned().collect();
        capabilities.sort();
        capabilities
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(agent_id: &str, capabilities: &[&str]) -> (String, Vec<String>) {
        (
            agent_id.to_string(),
            capabilities.iter().map(|c| c.to_string()).collect(),
        )
    }

    #[test]
    fn test_lookup_and_enumeration() {
        let registry = CapabilityRegistry::build(vec![
            entry("user_manager", &["create_user", "get_user"]),
            entry("project_manager", &["create_project"]),
        ]);

        assert_eq!(registry.lookup("create_user"), Some("user_manager"));
        assert_eq!(registry.lookup("create_project"), Some("project_manager"));
        assert_eq!(registry.lookup("unknown"), None);
        assert_eq!(
            registry.all_capabilities(),
            vec!["create_project", "create_user", "get_user"]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_first_registrant_wins_on_collision() {
        let registry = CapabilityRegistry::build(vec![
            entry("first", &["shared", "only_first"]),
            entry("second", &["shared", "only_second"]),
        ]);

        assert_eq!(registry.lookup("shared"), Some("first"));
        assert_eq!(registry.lookup("only_second"), Some("second"));
        // The colliding capability appears exactly once.
        assert_eq!(
            registry.all_capabilities(),
            vec!["only_first", "only_second", "shared"]
        );
    }

    #[test]
    fn test_collision_deterministic_across_rebuilds() {
        for _ in 0..16 {
            let registry = CapabilityRegistry::build(vec![
                entry("first", &["shared"]),
                entry("second", &["shared"]),
            ]);
            assert_eq!(registry.lookup("shared"), Some("first"));
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = CapabilityRegistry::build(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.all_capabilities().is_empty());
        assert_eq!(registry.lookup("anything"), None);
    }
}
