//! Runs every evaluator for one record and folds the verdict.
//!
//! # Invariants
//! - Evaluators run in `RuleType::ALL` order and messages keep that order.
//! - Any `false` fails the record; all abstaining warns; otherwise pass.

use super::{
    evaluator_for, EvaluationContext, EvaluationRecord, RuleError, RuleResult, RuleSnapshot, Scope,
};
use crate::config::PhenologyConfig;
use crate::model::record::Verdict;
use crate::model::rule::{OrgGroupId, RuleType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message for a record no evaluator had an opinion on.
pub const NO_RULES_RUN: &str = "No rules run.";

/// One caller filter entry: an org group and the rule types to run for it.
/// An empty `rules` list selects every rule type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgGroupRules {
    pub organisation: String,
    pub group: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl OrgGroupRules {
    /// Parses `organisation:group[:rule+rule...]`.
    pub fn parse(text: &str) -> RuleResult<Self> {
        let invalid = || RuleError::InvalidFilter(text.to_string());
        let mut parts = text.splitn(3, ':');
        let organisation = parts.next().map(str::trim).unwrap_or_default();
        let group = parts.next().map(str::trim).ok_or_else(invalid)?;
        if organisation.is_empty() || group.is_empty() {
            return Err(invalid());
        }
        let rules = parts
            .next()
            .map(|rules| {
                rules
                    .split('+')
                    .map(str::trim)
                    .filter(|rule| !rule.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            organisation: organisation.to_string(),
            group: group.to_string(),
            rules,
        })
    }
}

/// Filter entries resolved against a snapshot: org group ids per rule type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilter {
    by_rule: BTreeMap<RuleType, Vec<OrgGroupId>>,
}

impl ResolvedFilter {
    pub fn resolve(snapshot: &RuleSnapshot, entries: &[OrgGroupRules]) -> RuleResult<Self> {
        let mut by_rule: BTreeMap<RuleType, Vec<OrgGroupId>> = BTreeMap::new();
        for entry in entries {
            let org_group = snapshot
                .find_org_group(&entry.organisation, &entry.group)
                .ok_or_else(|| RuleError::UnknownOrgGroup {
                    organisation: entry.organisation.clone(),
                    group: entry.group.clone(),
                })?;
            let rule_types = if entry.rules.is_empty() {
                RuleType::ALL.to_vec()
            } else {
                entry
                    .rules
                    .iter()
                    .map(|name| {
                        RuleType::parse(name)
                            .ok_or_else(|| RuleError::UnknownRuleType(name.clone()))
                    })
                    .collect::<RuleResult<Vec<_>>>()?
            };
            for rule_type in rule_types {
                let ids = by_rule.entry(rule_type).or_default();
                if !ids.contains(&org_group.id) {
                    ids.push(org_group.id);
                }
            }
        }
        Ok(Self { by_rule })
    }

    /// Org groups requested for `rule_type`; `None` skips the evaluator.
    pub fn org_groups(&self, rule_type: RuleType) -> Option<&[OrgGroupId]> {
        self.by_rule.get(&rule_type).map(Vec::as_slice)
    }
}

/// Folded outcome of every evaluator for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub verdict: Verdict,
    pub messages: Vec<String>,
    pub id_difficulty: Option<u8>,
}

/// Evaluates records against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RuleRunner<'a> {
    context: EvaluationContext<'a>,
}

impl<'a> RuleRunner<'a> {
    pub fn new(snapshot: &'a RuleSnapshot, phenology: &'a PhenologyConfig) -> Self {
        Self {
            context: EvaluationContext {
                snapshot,
                phenology,
            },
        }
    }

    pub fn run(
        &self,
        record: &EvaluationRecord<'_>,
        filter: Option<&ResolvedFilter>,
    ) -> RunSummary {
        let mut failed = false;
        let mut ran = false;
        let mut messages = Vec::new();
        let mut id_difficulty = None;

        for rule_type in RuleType::ALL {
            let scope = match filter {
                None => Scope::All,
                Some(filter) => match filter.org_groups(rule_type) {
                    Some(ids) => Scope::OrgGroups(ids),
                    None => continue,
                },
            };
            let outcome = evaluator_for(rule_type).run(record, &self.context, scope);
            match outcome.result {
                Some(false) => {
                    failed = true;
                    ran = true;
                }
                Some(true) => ran = true,
                None => {}
            }
            messages.extend(outcome.messages);
            id_difficulty = id_difficulty.max(outcome.id_difficulty);
        }

        let verdict = if failed {
            Verdict::Fail
        } else if ran {
            Verdict::Pass
        } else {
            messages.push(NO_RULES_RUN.to_string());
            Verdict::Warn
        };
        RunSummary {
            verdict,
            messages,
            id_difficulty,
        }
    }
}
