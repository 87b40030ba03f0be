//! Container definition loader.

use std::path::Path;

use items_core::ContainerDefinition;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};
use crate::registry::ContainerRegistry;

/// Container definitions structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDefinitionsFile {
    pub containers: Vec<ContainerDefinition>,
}

/// Loader for named container definitions from RON files.
pub struct ContainerLoader;

impl ContainerLoader {
    /// Load every definition of a RON file into a registry keyed by name.
    pub fn load(path: &Path) -> LoadResult<ContainerRegistry> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse container definitions {}: {}", path.display(), e)
        })
    }

    pub fn parse(content: &str) -> LoadResult<ContainerRegistry> {
        let file: ContainerDefinitionsFile = ron::from_str(content)?;
        let mut registry = ContainerRegistry::new();
        for definition in file.containers {
            if definition.name.is_empty() {
                anyhow::bail!("Container definition without a name");
            }
            if registry.get(&definition.name).is_some() {
                anyhow::bail!("Duplicate container definition {}", definition.name);
            }
            registry.insert(definition);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use items_core::{NetExecutionPolicy, RuleKind, SlotLimit};

    #[test]
    fn parses_limits_rules_and_defaults() {
        let registry = ContainerLoader::parse(
            r#"(
                containers: [
                    (
                        name: "quiver",
                        slot_limit: Limited(2),
                        auto_stack: true,
                        rules: [StockSimple((limit_stack_max_count: true, stack_max_count: 50))],
                        default_items: [(def: "arrow", count: 20)],
                        net_policy: LocalPredicted,
                    ),
                    (name: "stash"),
                ],
            )"#,
        )
        .unwrap();

        let quiver = registry.get("quiver").unwrap();
        assert_eq!(quiver.slot_limit, SlotLimit::Limited(2));
        assert!(quiver.auto_stack);
        assert_eq!(quiver.rules[0].kind(), RuleKind::StockSimple);
        assert_eq!(quiver.default_items[0].count, 20);
        assert_eq!(quiver.net_policy, NetExecutionPolicy::LocalPredicted);

        let stash = registry.get("stash").unwrap();
        assert_eq!(stash.slot_limit, SlotLimit::Unlimited);
        assert_eq!(stash.net_policy, NetExecutionPolicy::ServerInitiated);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ContainerLoader::parse(r#"(containers: [(name: "bag"), (name: "bag")])"#);
        assert!(result.is_err());
    }
}
