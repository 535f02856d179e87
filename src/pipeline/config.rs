//! Rewrite configuration
//!
//! Names the function whose calls are rewritten, the function they are
//! redirected to, and how the injected argument is produced.

use crate::{
    analysis::NameMatch,
    transform::{ArgumentPolicy, ReplacementCounter, RewriteStrategy, DEFAULT_FIXED_VALUE},
};

/// Configuration for one call-site rewriting run
///
/// The defaults redirect every call to `foo()` into a call to `bar(int)`
/// (`_Z3bari`), numbering the sites from 1, and print the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Function whose call sites are located, compared per `match_mode`
    pub target: String,

    /// Function the located calls are redirected to
    /// Resolved by exact symbol first, then by demangled name
    pub replacement: String,

    /// How `target` is compared against function symbols
    pub match_mode: NameMatch,

    /// How the injected `i32` argument is chosen
    pub policy: ArgumentPolicy,

    /// Constant injected at every site under [`ArgumentPolicy::Fixed`] (default: 42)
    pub fixed_value: i32,

    /// How each call instruction is rewritten
    pub strategy: RewriteStrategy,

    /// First value of the per-run counter (default: 1)
    pub counter_seed: i32,

    /// Render the transformed program once re-verification succeeded
    pub print: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            target: "foo()".to_string(),
            replacement: "_Z3bari".to_string(),
            match_mode: NameMatch::Demangled,
            policy: ArgumentPolicy::Counter,
            fixed_value: DEFAULT_FIXED_VALUE,
            strategy: RewriteStrategy::Replace,
            counter_seed: ReplacementCounter::DEFAULT_SEED,
            print: true,
        }
    }
}

impl RewriteConfig {
    /// Creates a configuration redirecting calls of `target` to `replacement`
    ///
    /// All other settings keep their defaults.
    pub fn new(target: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            replacement: replacement.into(),
            ..Self::default()
        }
    }

    /// Sets the name comparison mode
    #[must_use]
    pub fn with_match_mode(mut self, mode: NameMatch) -> Self {
        self.match_mode = mode;
        self
    }

    /// Sets the argument policy
    #[must_use]
    pub fn with_policy(mut self, policy: ArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Switches to [`ArgumentPolicy::Fixed`] with the given constant
    #[must_use]
    pub fn with_fixed_value(mut self, value: i32) -> Self {
        self.policy = ArgumentPolicy::Fixed;
        self.fixed_value = value;
        self
    }

    /// Sets the rewrite strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: RewriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the first counter value
    #[must_use]
    pub fn with_counter_seed(mut self, seed: i32) -> Self {
        self.counter_seed = seed;
        self
    }

    /// Enables or disables rendering of the transformed program
    #[must_use]
    pub fn with_print(mut self, print: bool) -> Self {
        self.print = print;
        self
    }

    /// Returns a fresh counter starting at the configured seed
    #[must_use]
    pub fn counter(&self) -> ReplacementCounter {
        ReplacementCounter::new(self.counter_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RewriteConfig::default();
        assert_eq!(config.target, "foo()");
        assert_eq!(config.replacement, "_Z3bari");
        assert_eq!(config.match_mode, NameMatch::Demangled);
        assert_eq!(config.policy, ArgumentPolicy::Counter);
        assert_eq!(config.fixed_value, 42);
        assert_eq!(config.strategy, RewriteStrategy::Replace);
        assert_eq!(config.counter(), ReplacementCounter::new(1));
        assert!(config.print);
    }

    #[test]
    fn test_fixed_value_selects_fixed_policy() {
        let config = RewriteConfig::new("_Z3foov", "bar(int)")
            .with_match_mode(NameMatch::Exact)
            .with_fixed_value(7);
        assert_eq!(config.policy, ArgumentPolicy::Fixed);
        assert_eq!(config.fixed_value, 7);
        assert_eq!(config.target, "_Z3foov");
    }
}
