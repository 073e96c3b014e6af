//! Identification difficulty.

use super::{
    report_missing, EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, Scope,
};
use crate::model::rule::RuleType;
use std::collections::BTreeSet;

/// Reports how hard a taxon is to identify. Never fails a record; the
/// highest level across org groups becomes the record's `idDifficulty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifficultyEvaluator;

impl RuleEvaluator for DifficultyEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Difficulty
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
            .difficulty_rules(&record.taxon.organism_key)
            .iter()
            .filter(|rule| scope.includes(rule.org_group_id))
        {
            let Some(org_group) = context.snapshot.org_group(rule.org_group_id) else {
                continue;
            };
            covered.insert(rule.org_group_id);
            let text = match context
                .snapshot
                .difficulty_text(rule.org_group_id, rule.difficulty)
            {
                Some(text) => format!("Identification difficulty is {}: {text}", rule.difficulty),
                None => format!("Identification difficulty is {}.", rule.difficulty),
            };
            outcome
                .messages
                .push(org_group.message(RuleType::Difficulty, &text));
            outcome.merge(true);
            outcome.id_difficulty = outcome.id_difficulty.max(Some(rule.difficulty));
        }

        report_missing(context, scope, RuleType::Difficulty, &covered, &mut outcome);
        outcome
    }
}
