//! The ordered rule collection and its summing evaluator.

use questline_config::RewardConfig;
use questline_types::RewardEvent;

use crate::rules::{DailyLoginRule, GameSessionRule, TaskCompletionRule};
use crate::Rule;

/// Fixed, ordered set of reward rules.
///
/// Evaluation iterates every registered rule; each matching rule's
/// calculator contributes to the sum. Registration order is preserved but
/// only affects log ordering, not the total.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// An empty registry. Most callers want [`RuleRegistry::default`].
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule to the evaluation order.
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Total reward for an event: the sum over all matching rules.
    pub fn total_reward(&self, event: &RewardEvent, config: &RewardConfig) -> u64 {
        self.rules
            .iter()
            .filter(|rule| rule.matches(event))
            .map(|rule| rule.calculate(event, config))
            .sum()
    }

    /// IDs of the registered rules, in evaluation order.
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }
}

impl Default for RuleRegistry {
    /// The built-in rule set: task completion, daily login, game session.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(TaskCompletionRule));
        registry.register(Box::new(DailyLoginRule));
        registry.register(Box::new(GameSessionRule));
        registry
    }
}
