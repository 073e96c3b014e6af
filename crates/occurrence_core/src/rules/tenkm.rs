//! Known 10km distribution.

use super::{
    EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, Scope, NO_RULE_MESSAGE,
};
use crate::model::rule::{OrgGroupId, RuleType};
use log::debug;

/// Fails records outside the 10km squares a taxon is known from.
///
/// Every org group that publishes tenkm rules is consulted, so a taxon with
/// no rows for that org group is reported rather than silently skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenkmEvaluator;

impl RuleEvaluator for TenkmEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Tenkm
    }

    fn run(
        &self,
        record: &EvaluationRecord<'_>,
        context: &EvaluationContext<'_>,
        scope: Scope<'_>,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::abstain();
        let rules = context.snapshot.tenkm_rules(&record.taxon.organism_key);
        let org_group_ids: Vec<OrgGroupId> = match scope {
            Scope::All => context.snapshot.tenkm_org_groups().collect(),
            Scope::OrgGroups(ids) => ids.to_vec(),
        };
        let km100 = record.sref.km100();
        let km10 = record.sref.km10();

        for org_group_id in org_group_ids {
            let Some(org_group) = context.snapshot.org_group(org_group_id) else {
                continue;
            };
            let mut squares = rules
                .iter()
                .filter(|rule| rule.org_group_id == org_group_id)
                .peekable();
            if squares.peek().is_none() {
                outcome
                    .messages
                    .push(org_group.message(RuleType::Tenkm, NO_RULE_MESSAGE));
                continue;
            }
            let Some(km10) = km10 else {
                outcome.messages.push(org_group.message(
                    RuleType::Tenkm,
                    "Record is too imprecise for a 10km check.",
                ));
                continue;
            };

            let known = squares.any(|rule| rule.km100 == km100 && rule.km10s.contains(km10));
            debug!(
                "event=rule_eval module=rules rule=tenkm org_group={org_group_id} km100={km100} km10={km10} known={known}"
            );
            if !known {
                outcome
                    .messages
                    .push(org_group.message(RuleType::Tenkm, "Record is outside known area."));
            }
            outcome.merge(known);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::TenkmEvaluator;
    use crate::config::PhenologyConfig;
    use crate::model::rule::{OrgGroup, TenkmRule};
    use crate::rules::fixtures::{run, KEY};
    use crate::rules::{RuleOutcome, RuleSnapshot, Scope};

    fn tenkm(org_group_id: i64, organism_key: &str, km100: &str, km10s: &[&str]) -> TenkmRule {
        TenkmRule {
            org_group_id,
            organism_key: organism_key.to_string(),
            km100: km100.to_string(),
            km10s: km10s.iter().map(|s| (*s).to_string()).collect(),
            commit: "c1".to_string(),
        }
    }

    fn snapshot() -> RuleSnapshot {
        let mut snapshot = RuleSnapshot::new();
        snapshot.add_org_group(OrgGroup::new(1, "BRC", "Moths"));
        snapshot.add_org_group(OrgGroup::new(2, "NBN", "Beetles"));
        snapshot.add_tenkm_rule(tenkm(1, KEY, "TL", &["13", "24"]));
        snapshot.add_tenkm_rule(tenkm(2, "OTHER", "SP", &["50"]));
        snapshot
    }

    fn eval(snapshot: &RuleSnapshot, gridref: &str, scope: Scope<'_>) -> RuleOutcome {
        run(
            &TenkmEvaluator,
            snapshot,
            &PhenologyConfig::default(),
            "1/7/2020",
            gridref,
            None,
            scope,
        )
    }

    #[test]
    fn known_square_passes_and_reports_other_org_groups() {
        let outcome = eval(&snapshot(), "TL1234", Scope::All);
        assert_eq!(outcome.result, Some(true));
        assert_eq!(
            outcome.messages,
            vec!["NBN:Beetles:tenkm: There is no rule for this taxon."]
        );
    }

    #[test]
    fn unknown_square_fails_with_distinct_message() {
        let outcome = eval(&snapshot(), "TL5555", Scope::All);
        assert_eq!(outcome.result, Some(false));
        assert!(outcome
            .messages
            .contains(&"BRC:Moths:tenkm: Record is outside known area.".to_string()));

        let other_km100 = eval(&snapshot(), "SP1234", Scope::All);
        assert_eq!(other_km100.result, Some(false));
    }

    #[test]
    fn coarse_reference_abstains() {
        let requested = [1];
        let outcome = eval(&snapshot(), "TL", Scope::OrgGroups(&requested));
        assert_eq!(outcome.result, None);
        assert_eq!(
            outcome.messages,
            vec!["BRC:Moths:tenkm: Record is too imprecise for a 10km check."]
        );
    }

    #[test]
    fn no_rows_anywhere_abstains() {
        let outcome = eval(&RuleSnapshot::new(), "TL1234", Scope::All);
        assert_eq!(outcome.result, None);
        assert!(outcome.messages.is_empty());
    }
}
