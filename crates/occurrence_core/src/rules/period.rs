//! Introduction and extinction dates.

use super::{
    report_missing, EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, Scope,
};
use crate::model::rule::{PeriodRule, RuleType};
use crate::vague_date::VagueDate;
use log::debug;
use std::collections::BTreeSet;

/// Fails records that fall wholly before a taxon's introduction or wholly
/// after its extinction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodEvaluator;

impl RuleEvaluator for PeriodEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Period
    }

    fn run(
        &self,
        record: &EvaluationRecord<'_>,
        context: &EvaluationContext<'_>,
        scope: Scope<'_>,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::abstain();
        let mut covered = BTreeSet::new();

        for rule in context
            .snapshot
            .period_rules(&record.taxon.organism_key)
            .iter()
            .filter(|rule| scope.includes(rule.org_group_id))
        {
            let Some(org_group) = context.snapshot.org_group(rule.org_group_id) else {
                continue;
            };
            covered.insert(rule.org_group_id);
            match check(rule, record.date) {
                None => outcome.merge(true),
                Some(text) => {
                    debug!(
                        "event=rule_eval module=rules rule=period org_group={} status=fail",
                        rule.org_group_id
                    );
                    outcome
                        .messages
                        .push(org_group.message(RuleType::Period, &text));
                    outcome.merge(false);
                }
            }
        }

        report_missing(context, scope, RuleType::Period, &covered, &mut outcome);
        outcome
    }
}

/// Failure text, or `None` when the record overlaps the period.
fn check(rule: &PeriodRule, date: &VagueDate) -> Option<String> {
    if let (Some(introduced), Some(end)) = (rule.start_date, date.end()) {
        if end < introduced {
            return Some(format!(
                "Record is before the introduction date of {}.",
                introduced.format("%d/%m/%Y")
            ));
        }
    }
    if let (Some(extinct), Some(start)) = (rule.end_date, date.start()) {
        if start > extinct {
            return Some(format!(
                "Record is after the extinction date of {}.",
                extinct.format("%d/%m/%Y")
            ));
        }
    }
    None
}
