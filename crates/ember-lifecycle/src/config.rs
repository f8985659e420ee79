use typed_builder::TypedBuilder;

pub const DEFAULT_CLICK_LIMIT: u32 = 1;
pub const DEFAULT_TTL_HOURS: u32 = 24;
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 8;

/// Defaults and bounds applied by [`LinkManager`](crate::LinkManager).
#[derive(Debug, Clone, TypedBuilder)]
pub struct LifecycleConfig {
    /// Click limit used when the caller gives none, or a value `<= 0`.
    #[builder(default = DEFAULT_CLICK_LIMIT)]
    pub default_click_limit: u32,
    /// Time-to-live in hours used when the caller gives none, or a value `<= 0`.
    #[builder(default = DEFAULT_TTL_HOURS)]
    pub default_ttl_hours: u32,
    /// How many tokens `create` requests before giving up on collisions.
    #[builder(default = DEFAULT_MAX_GENERATION_ATTEMPTS)]
    pub max_generation_attempts: u32,
}

impl LifecycleConfig {
    /// Returns a copy with every value raised to at least 1.
    pub fn normalized(self) -> Self {
        Self {
            default_click_limit: self.default_click_limit.max(1),
            default_ttl_hours: self.default_ttl_hours.max(1),
            max_generation_attempts: self.max_generation_attempts.max(1),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
