/// Network role of the local copy of a replicated object.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NetRole {
    /// Server or standalone game; owns the canonical state.
    #[default]
    Authority,
    /// Owning client. May ask the server to mutate.
    AutonomousProxy,
    /// Non-owning observer. Receives state through replication only.
    SimulatedProxy,
}

impl NetRole {
    pub const fn has_authority(self) -> bool {
        matches!(self, NetRole::Authority)
    }
}

/// How a container treats mutations requested by a client.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NetExecutionPolicy {
    /// Owning clients apply the mutation immediately and also forward it.
    LocalPredicted,
    /// Only the server mutates; clients wait for replication.
    #[default]
    ServerInitiated,
}

/// Where a mutation must run.
///
/// Computed per call from the current role; never cache a plan since the role
/// can change between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetExecutionPlan {
    pub execute_on_server: bool,
    pub execute_locally: bool,
}

impl NetExecutionPlan {
    /// Plan for authority-gated mutations such as equipment grants.
    pub const fn for_role(role: NetRole) -> Self {
        match role {
            NetRole::Authority => Self {
                execute_on_server: false,
                execute_locally: true,
            },
            NetRole::AutonomousProxy => Self {
                execute_on_server: true,
                execute_locally: false,
            },
            NetRole::SimulatedProxy => Self {
                execute_on_server: false,
                execute_locally: false,
            },
        }
    }

    /// Plan for container mutations, which honour the container's policy.
    ///
    /// Local prediction is never allowed for simulated proxies.
    pub const fn for_container(role: NetRole, policy: NetExecutionPolicy) -> Self {
        let plan = Self::for_role(role);
        match (role, policy) {
            (NetRole::AutonomousProxy, NetExecutionPolicy::LocalPredicted) => Self {
                execute_on_server: true,
                execute_locally: true,
            },
            _ => plan,
        }
    }

    pub const fn is_noop(&self) -> bool {
        !self.execute_on_server && !self.execute_locally
    }
}
