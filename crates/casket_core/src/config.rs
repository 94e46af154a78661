//! Unit-of-work configuration.

/// What a version-checked update does when it loses the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail immediately with a stale version conflict.
    #[default]
    Strict,
    /// Adopt the stored version once and retry strictly.
    ///
    /// The retry overwrites whatever the other writer stored. Only use
    /// this for entities where last-writer-wins is acceptable.
    Lenient,
}

/// Configuration for units of work.
#[derive(Debug, Clone)]
pub struct Config {
    /// Conflict policy used when adapters flush.
    pub conflict_policy: ConflictPolicy,

    /// Enlist the completion hook when the first adapter is cached instead
    /// of when the unit of work begins.
    pub enlist_on_first_use: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Strict,
            enlist_on_first_use: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the conflict policy.
    #[must_use]
    pub const fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Sets whether the completion hook is enlisted lazily.
    #[must_use]
    pub const fn enlist_on_first_use(mut self, value: bool) -> Self {
        self.enlist_on_first_use = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::Strict);
        assert!(config.enlist_on_first_use);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .conflict_policy(ConflictPolicy::Lenient)
            .enlist_on_first_use(false);

        assert_eq!(config.conflict_policy, ConflictPolicy::Lenient);
        assert!(!config.enlist_on_first_use);
    }
}
