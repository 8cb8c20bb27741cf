//! # questline-rules: Stateless reward rules
//!
//! Each rule is a (predicate, calculator) pair over a [`RewardEvent`]. Rules
//! are completely pure: no IO, no clocks, no state. The configuration
//! document is passed explicitly into every calculation, so a rule's output
//! is a function of exactly `(event, config)`. This makes the registry
//! deterministic and trivially testable.
//!
//! The [`RuleRegistry`] holds a fixed, ordered collection of rules and sums
//! the output of every rule whose predicate matches. In practice exactly one
//! rule matches per event type, but the contract is the sum.

mod registry;
mod rules;

pub use registry::RuleRegistry;
pub use rules::{DailyLoginRule, GameSessionRule, TaskCompletionRule};

use questline_config::RewardConfig;
use questline_types::RewardEvent;

/// A stateless reward policy: one category of reward-triggering event.
pub trait Rule: Send + Sync {
    /// Stable identifier, used in logs and registry introspection.
    fn id(&self) -> &'static str;

    /// Whether this rule applies to the event.
    fn matches(&self, event: &RewardEvent) -> bool;

    /// The reward for a matching event. Never negative; rules that do not
    /// apply should be filtered by [`matches`](Self::matches), not return 0
    /// here (though returning 0 is harmless).
    fn calculate(&self, event: &RewardEvent, config: &RewardConfig) -> u64;
}
