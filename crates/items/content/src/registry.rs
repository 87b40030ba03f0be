//! Named container definitions and graph templates built from them.

use std::collections::BTreeMap;
use std::sync::Arc;

use items_core::{ContainerDefinition, ContainerGraph, ContainerSpec, LinkSpec, Tag};

/// A graph template names a definition that the registry does not hold.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("container {container} uses unknown definition {definition:?}")]
pub struct UnknownContainerDefinition {
    pub container: Tag,
    pub definition: String,
}

/// Container definitions keyed by name.
///
/// Definitions are shared: every container created from the same name points
/// at the same `Arc`.
#[derive(Clone, Debug, Default)]
pub struct ContainerRegistry {
    definitions: BTreeMap<String, Arc<ContainerDefinition>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under its own name, replacing any previous one.
    pub fn insert(&mut self, definition: ContainerDefinition) -> Arc<ContainerDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.name.clone(), Arc::clone(&definition));
        definition
    }

    pub fn get(&self, name: &str) -> Option<Arc<ContainerDefinition>> {
        self.definitions.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<ContainerDefinition> for ContainerRegistry {
    fn from_iter<I: IntoIterator<Item = ContainerDefinition>>(iter: I) -> Self {
        let mut registry = ContainerRegistry::new();
        for definition in iter {
            registry.insert(definition);
        }
        registry
    }
}

/// One container of a graph template.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerEntry {
    pub id: Tag,
    /// Name of a definition in the [`ContainerRegistry`].
    pub definition: String,
}

/// A container graph whose containers reference definitions by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraphTemplate {
    pub containers: Vec<ContainerEntry>,
    pub links: Vec<LinkSpec>,
}

impl GraphTemplate {
    /// Resolves every definition name against `registry`.
    pub fn resolve(
        &self,
        registry: &ContainerRegistry,
    ) -> Result<ContainerGraph, UnknownContainerDefinition> {
        let containers = self
            .containers
            .iter()
            .map(|entry| {
                registry
                    .get(&entry.definition)
                    .map(|def| ContainerSpec {
                        id: entry.id.clone(),
                        def,
                    })
                    .ok_or_else(|| UnknownContainerDefinition {
                        container: entry.id.clone(),
                        definition: entry.definition.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContainerGraph {
            containers,
            links: self.links.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_are_shared_by_name() {
        let registry: ContainerRegistry = [
            ContainerDefinition::new("backpack").with_slot_limit(12),
            ContainerDefinition::new("hotbar").with_slot_limit(4),
        ]
        .into_iter()
        .collect();

        let template = GraphTemplate {
            containers: vec![
                ContainerEntry {
                    id: Tag::from("Container.Backpack"),
                    definition: "backpack".to_string(),
                },
                ContainerEntry {
                    id: Tag::from("Container.Bank"),
                    definition: "backpack".to_string(),
                },
            ],
            links: Vec::new(),
        };
        let graph = template.resolve(&registry).unwrap();

        assert_eq!(graph.containers.len(), 2);
        assert!(Arc::ptr_eq(&graph.containers[0].def, &graph.containers[1].def));
    }

    #[test]
    fn unknown_definition_is_reported() {
        let template = GraphTemplate {
            containers: vec![ContainerEntry {
                id: Tag::from("Container.Chest"),
                definition: "chest".to_string(),
            }],
            links: Vec::new(),
        };
        let err = template.resolve(&ContainerRegistry::new()).unwrap_err();
        assert_eq!(err.definition, "chest");
        assert_eq!(err.container, Tag::from("Container.Chest"));
    }
}
