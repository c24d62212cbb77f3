//! # Policy Server
//!
//! Stores rules and resolves an entity pair into one [`SecurityContext`].
//!
//! ## Resolution
//!
//! 1. Every rule is matched as written (`from` against local, `to` against
//!    distant) and, failing that, in the swapped direction. A swapped match
//!    contributes the role-swapped rule, so all candidates read from the
//!    local side.
//! 2. Candidates dominated on (from-level, to-level) by another candidate
//!    are dropped. The survivors form the most-specific frontier.
//! 3. The frontier is left-folded with [`merge_policies`]. A REQUIRED/DENIED
//!    conflict aborts resolution.
//! 4. No candidate at all yields [`SecurityContext::default_deny`].

use crate::domain::communication::Communication;
use crate::domain::context::SecurityContext;
use crate::domain::entity::Entities;
use crate::domain::rule::PolicyRule;
use crate::error::PolicyResult;
use tracing::{debug, warn};

/// A matched rule with the specificity it matched at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedRule {
    /// Rule, oriented from the local side
    pub rule: PolicyRule,
    /// Specificity on the local side
    pub from_level: u8,
    /// Specificity on the distant side
    pub to_level: u8,
}

impl RankedRule {
    fn dominates(&self, other: &Self) -> bool {
        self.from_level >= other.from_level
            && self.to_level >= other.to_level
            && (self.from_level > other.from_level || self.to_level > other.to_level)
    }
}

/// Merge two oriented rules.
///
/// Each side keeps the pattern of the more specific input; communications
/// are [`Communication::compute`]d and flags are ANDed.
pub fn merge_policies(a: &RankedRule, b: &RankedRule) -> PolicyResult<RankedRule> {
    let (from, from_level) = if b.from_level > a.from_level {
        (b.rule.from().clone(), b.from_level)
    } else {
        (a.rule.from().clone(), a.from_level)
    };
    let (to, to_level) = if b.to_level > a.to_level {
        (b.rule.to().clone(), b.to_level)
    } else {
        (a.rule.to().clone(), a.to_level)
    };
    let rule = PolicyRule::new(
        from,
        to,
        Communication::compute(a.rule.request(), b.rule.request())?,
        Communication::compute(a.rule.reply(), b.rule.reply())?,
    )
    .with_ao_creation(a.rule.ao_creation() && b.rule.ao_creation())
    .with_migration(a.rule.migration() && b.rule.migration());

    Ok(RankedRule {
        rule,
        from_level,
        to_level,
    })
}

/// Rule store and resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyServer {
    rules: Vec<PolicyRule>,
}

impl PolicyServer {
    /// Server holding `rules`.
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: PolicyRule) {
        self.rules.push(rule);
    }

    /// Stored rules.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Matching rules, oriented from the local side, before ranking.
    pub fn matching_rules(&self, local: &Entities, distant: &Entities) -> Vec<RankedRule> {
        let mut matched = Vec::new();
        for rule in &self.rules {
            let from = rule.from().match_entities(local);
            let to = rule.to().match_entities(distant);
            if from.matched() && to.matched() {
                matched.push(RankedRule {
                    rule: rule.clone(),
                    from_level: from.level,
                    to_level: to.level,
                });
                continue;
            }

            let from = rule.from().match_entities(distant);
            let to = rule.to().match_entities(local);
            if from.matched() && to.matched() {
                matched.push(RankedRule {
                    rule: rule.swapped(),
                    from_level: to.level,
                    to_level: from.level,
                });
            }
        }
        matched
    }

    /// Resolve the policy for `local` talking to `distant`.
    ///
    /// # Errors
    ///
    /// `PolicyError::IncompatiblePolicy` when two retained rules conflict.
    pub fn get_policy(&self, local: &Entities, distant: &Entities) -> PolicyResult<SecurityContext> {
        let matched = self.matching_rules(local, distant);
        let frontier: Vec<&RankedRule> = matched
            .iter()
            .filter(|candidate| !matched.iter().any(|other| other.dominates(candidate)))
            .collect();

        debug!(
            rules = self.rules.len(),
            matched = matched.len(),
            retained = frontier.len(),
            "resolved policy candidates"
        );

        let Some((first, rest)) = frontier.split_first() else {
            return Ok(SecurityContext::default_deny(local.clone(), distant.clone()));
        };

        let mut merged = (*first).clone();
        for next in rest {
            merged = merge_policies(&merged, next).inspect_err(|e| {
                warn!(error = %e, "conflicting policy rules");
            })?;
        }

        let rule = merged.rule;
        Ok(SecurityContext::new(
            local.clone(),
            distant.clone(),
            *rule.request(),
            *rule.reply(),
            rule.migration(),
            rule.ao_creation(),
        ))
    }
}

impl From<Vec<PolicyRule>> for PolicyServer {
    fn from(rules: Vec<PolicyRule>) -> Self {
        Self::new(rules)
    }
}
