//! Additional-verification flags.

use super::{
    report_missing, EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, Scope,
};
use crate::model::rule::RuleType;
use log::warn;
use std::collections::BTreeSet;

/// Fails records of taxa an org group wants checked by hand, quoting the
/// code description.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditionalEvaluator;

impl RuleEvaluator for AdditionalEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Additional
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
            .additional_rules(&record.taxon.organism_key)
            .iter()
            .filter(|rule| scope.includes(rule.org_group_id))
        {
            let Some(org_group) = context.snapshot.org_group(rule.org_group_id) else {
                continue;
            };
            covered.insert(rule.org_group_id);
            let Some(text) = context
                .snapshot
                .additional_text(rule.org_group_id, rule.code)
            else {
                warn!(
                    "event=rule_eval module=rules rule=additional org_group={} code={} status=missing_code",
                    rule.org_group_id, rule.code
                );
                continue;
            };
            outcome
                .messages
                .push(org_group.message(RuleType::Additional, text));
            outcome.merge(false);
        }

        report_missing(context, scope, RuleType::Additional, &covered, &mut outcome);
        outcome
    }
}
