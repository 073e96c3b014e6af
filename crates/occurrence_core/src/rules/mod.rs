//! Rule evaluation engine.
//!
//! # Responsibility
//! - Define the contract shared by the five rule evaluators.
//! - Map each rule tag to its evaluator at compile time.
//!
//! # Invariants
//! - Evaluators read an immutable `RuleSnapshot` and never mutate it.
//! - Every diagnostic is prefixed `organisation:group:ruletype:`.
//! - `None` means abstain: no applicable rule, not a failure.

use crate::config::PhenologyConfig;
use crate::model::rule::{OrgGroupId, RuleType};
use crate::model::taxon::Taxon;
use crate::sref::SpatialReference;
use crate::vague_date::VagueDate;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod additional;
mod difficulty;
#[cfg(test)]
mod fixtures;
mod period;
mod phenology;
pub mod runner;
pub mod snapshot;
mod tenkm;

pub use additional::AdditionalEvaluator;
pub use difficulty::DifficultyEvaluator;
pub use period::PeriodEvaluator;
pub use phenology::PhenologyEvaluator;
pub use runner::{OrgGroupRules, ResolvedFilter, RuleRunner, RunSummary};
pub use snapshot::{RuleSetHandle, RuleSnapshot};
pub use tenkm::TenkmEvaluator;

/// Abstain message for an org group that has no rule for the taxon.
pub(crate) const NO_RULE_MESSAGE: &str = "There is no rule for this taxon.";

pub type RuleResult<T> = Result<T, RuleError>;

/// Rule request errors raised before any record is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    UnknownRuleType(String),
    UnknownOrgGroup { organisation: String, group: String },
    InvalidFilter(String),
}

impl Display for RuleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRuleType(value) => write!(f, "unknown rule type `{value}`"),
            Self::UnknownOrgGroup {
                organisation,
                group,
            } => write!(f, "unknown organisation group `{organisation}:{group}`"),
            Self::InvalidFilter(value) => write!(
                f,
                "invalid rule filter `{value}`; expected organisation:group[:rule+rule]"
            ),
        }
    }
}

impl Error for RuleError {}

/// Normalized record as seen by evaluators.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRecord<'a> {
    pub taxon: &'a Taxon,
    pub date: &'a VagueDate,
    pub sref: &'a SpatialReference,
    pub stage: Option<&'a str>,
}

/// Read-only inputs shared by every evaluation in a batch.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub snapshot: &'a RuleSnapshot,
    pub phenology: &'a PhenologyConfig,
}

/// Org groups an evaluator may consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    All,
    /// Explicitly requested org groups; missing rules are reported.
    OrgGroups(&'a [OrgGroupId]),
}

impl Scope<'_> {
    pub fn includes(&self, org_group_id: OrgGroupId) -> bool {
        match self {
            Self::All => true,
            Self::OrgGroups(ids) => ids.contains(&org_group_id),
        }
    }
}

/// Result of one evaluator over every org group in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub result: Option<bool>,
    pub messages: Vec<String>,
    /// Highest identification difficulty matched, if any.
    pub id_difficulty: Option<u8>,
}

impl RuleOutcome {
    pub fn abstain() -> Self {
        Self::default()
    }

    /// Folds one org group's result in; any failure sticks.
    pub fn merge(&mut self, ok: bool) {
        self.result = Some(self.result.unwrap_or(true) && ok);
    }
}

/// Common contract of the rule evaluators.
pub trait RuleEvaluator: Sync {
    fn rule_type(&self) -> RuleType;

    fn run(
        &self,
        record: &EvaluationRecord<'_>,
        context: &EvaluationContext<'_>,
        scope: Scope<'_>,
    ) -> RuleOutcome;
}

static PERIOD: PeriodEvaluator = PeriodEvaluator;
static PHENOLOGY: PhenologyEvaluator = PhenologyEvaluator;
static TENKM: TenkmEvaluator = TenkmEvaluator;
static ADDITIONAL: AdditionalEvaluator = AdditionalEvaluator;
static DIFFICULTY: DifficultyEvaluator = DifficultyEvaluator;

/// Evaluator registered for a rule tag.
pub fn evaluator_for(rule_type: RuleType) -> &'static dyn RuleEvaluator {
    match rule_type {
        RuleType::Period => &PERIOD,
        RuleType::Phenology => &PHENOLOGY,
        RuleType::Tenkm => &TENKM,
        RuleType::Additional => &ADDITIONAL,
        RuleType::Difficulty => &DIFFICULTY,
    }
}

/// Adds the abstain message for requested org groups not in `covered`.
pub(crate) fn report_missing(
    context: &EvaluationContext<'_>,
    scope: Scope<'_>,
    rule_type: RuleType,
    covered: &BTreeSet<OrgGroupId>,
    outcome: &mut RuleOutcome,
) {
    let Scope::OrgGroups(ids) = scope else {
        return;
    };
    for id in ids.iter().filter(|id| !covered.contains(id)) {
        if let Some(org_group) = context.snapshot.org_group(*id) {
            outcome
                .messages
                .push(org_group.message(rule_type, NO_RULE_MESSAGE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluator_for, RuleOutcome};
    use crate::model::rule::RuleType;

    #[test]
    fn every_rule_type_maps_to_its_evaluator() {
        for rule_type in RuleType::ALL {
            assert_eq!(evaluator_for(rule_type).rule_type(), rule_type);
        }
    }

    #[test]
    fn merge_keeps_failures() {
        let mut outcome = RuleOutcome::abstain();
        assert_eq!(outcome.result, None);
        outcome.merge(true);
        assert_eq!(outcome.result, Some(true));
        outcome.merge(false);
        outcome.merge(true);
        assert_eq!(outcome.result, Some(false));
    }
}
