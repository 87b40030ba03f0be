//! Container graphs: which containers exist and how they link.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::container::ContainerDefinition;
use crate::error::{ErrorSeverity, ItemsError};
use crate::rules::ContainerRule;
use crate::tag::{Tag, TagQuery};

use super::{ContainerCollection, ContainerError};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A link spec carries a rule that is not a link.
    #[error("link spec for {linked_container} holds a non-link rule ({rule})")]
    NotALink {
        linked_container: Tag,
        rule: crate::rules::RuleKind,
    },

    /// Creating a container failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl ItemsError for GraphError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            GraphError::NotALink { .. } => ErrorSeverity::Validation,
            GraphError::Container(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            GraphError::NotALink { .. } => "GRAPH_NOT_A_LINK",
            GraphError::Container(err) => err.error_code(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerSpec {
    pub id: Tag,
    pub def: Arc<ContainerDefinition>,
}

/// Adds `link` to every container whose owned tags match `container_query`,
/// pointing it at `linked_container_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkSpec {
    pub link: ContainerRule,
    pub linked_container_id: Tag,
    #[cfg_attr(feature = "serde", serde(default))]
    pub container_query: TagQuery,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerGraph {
    pub containers: Vec<ContainerSpec>,
    pub links: Vec<LinkSpec>,
}

impl ContainerGraph {
    #[must_use]
    pub fn with_container(mut self, id: impl Into<Tag>, def: ContainerDefinition) -> Self {
        self.containers.push(ContainerSpec {
            id: id.into(),
            def: Arc::new(def),
        });
        self
    }

    #[must_use]
    pub fn with_link(
        mut self,
        link: impl Into<ContainerRule>,
        linked_container_id: impl Into<Tag>,
        container_query: TagQuery,
    ) -> Self {
        self.links.push(LinkSpec {
            link: link.into(),
            linked_container_id: linked_container_id.into(),
            container_query,
        });
        self
    }
}

impl ContainerCollection {
    /// Creates missing containers, then applies every link spec.
    ///
    /// Returns the number of link rules added.
    pub fn apply_graph(&mut self, graph: &ContainerGraph) -> Result<usize, GraphError> {
        for link in &graph.links {
            if !link.link.is_link() {
                return Err(GraphError::NotALink {
                    linked_container: link.linked_container_id.clone(),
                    rule: link.link.kind(),
                });
            }
        }

        for spec in &graph.containers {
            if self.container(&spec.id).is_some() {
                debug!(container = %spec.id, "container already exists");
                continue;
            }
            self.add_container(spec.id.clone(), Arc::clone(&spec.def))?;
        }

        let mut added = 0;
        for spec in &graph.links {
            if self.container(&spec.linked_container_id).is_none() {
                warn!(linked = %spec.linked_container_id, "link target does not exist");
                continue;
            }
            let targets: Vec<Tag> = self
                .containers()
                .filter(|c| c.id() != &spec.linked_container_id)
                .filter(|c| spec.container_query.passes(&c.owned_tags()))
                .map(|c| c.id().clone())
                .collect();
            for target in targets {
                let mut rule = spec.link.clone();
                rule.set_linked_container(Some(spec.linked_container_id.clone()));
                debug!(container = %target, linked = %spec.linked_container_id, rule = %rule.kind(), "adding link");
                if self.add_rule(&target, rule) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }
}
