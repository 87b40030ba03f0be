use crate::tag::Tag;

/// Engine constants shared by containers, rules and links.
pub struct ItemsConfig;

impl ItemsConfig {
    // ===== rule defaults =====
    /// Priority of the basic auto-slot rule when none is configured.
    pub const DEFAULT_AUTO_SLOT_PRIORITY: i32 = 1;
    /// Max count used by a simple stock rule when only the flag is set.
    pub const DEFAULT_SIMPLE_MAX_COUNT: u32 = 100;
    /// Stack max used by a simple stock rule when only the flag is set.
    pub const DEFAULT_SIMPLE_STACK_MAX_COUNT: u32 = 100;

    // ===== context tags consulted by auto-slot rules =====
    pub const TAG_AUTO_SLOT_REPLACE: &'static str = "Item.AutoSlot.Replace";
    pub const TAG_AUTO_SLOT_NO_REPLACE: &'static str = "Item.AutoSlot.NoReplace";
    pub const TAG_AUTO_SLOT_TOGGLE: &'static str = "Item.AutoSlot.Toggle";
}

/// What a container does with an item whose count drops to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZeroCountPolicy {
    /// Remove the item from every container listing it.
    #[default]
    Remove,
    /// Leave the item listed; it contributes nothing to aggregate counts.
    KeepZero,
}

/// Settings handed to the item subsystem and every collection it creates.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ItemSettings {
    /// Container used when a caller does not name one.
    pub default_container_id: Option<Tag>,
    /// Log an error when the default container id is read while unset.
    pub require_valid_default_container_id: bool,
    pub zero_count_policy: ZeroCountPolicy,
}

impl ItemSettings {
    pub fn new() -> Self {
        Self {
            default_container_id: None,
            require_valid_default_container_id: true,
            zero_count_policy: ZeroCountPolicy::Remove,
        }
    }

    #[must_use]
    pub fn with_default_container_id(mut self, id: impl Into<Tag>) -> Self {
        self.default_container_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_zero_count_policy(mut self, policy: ZeroCountPolicy) -> Self {
        self.zero_count_policy = policy;
        self
    }

    /// Returns the configured default container id.
    ///
    /// Logs an error when the id is unset and required.
    pub fn default_container_id(&self) -> Option<&Tag> {
        if self.default_container_id.is_none() && self.require_valid_default_container_id {
            tracing::error!(
                target: "items::settings",
                "default_container_id is not set, configure it in the item settings"
            );
        }
        self.default_container_id.as_ref()
    }
}

impl Default for ItemSettings {
    fn default() -> Self {
        Self::new()
    }
}
