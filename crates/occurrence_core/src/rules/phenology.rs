//! Seasonal windows per life stage.
//!
//! # Invariants
//! - Windows are anchored in real calendar years and may wrap the new year.
//! - Distances count actual days, so 29 February exists only in leap years.
//! - A record spanning a full year or more always passes.

use super::{
    report_missing, EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, Scope,
};
use crate::model::rule::{OrgGroupId, PhenologyRule, RuleType, Stage, WILDCARD_STAGE};
use crate::vague_date::VagueDate;
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::BTreeSet;

/// Checks a record date against the expected flight or growth period.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhenologyEvaluator;

/// Where a record sits relative to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    Inside,
    /// Outside by at most the tolerance, in days.
    Close,
    Far,
}

impl RuleEvaluator for PhenologyEvaluator {
    fn rule_type(&self) -> RuleType {
        RuleType::Phenology
    }

    fn run(
        &self,
        record: &EvaluationRecord<'_>,
        context: &EvaluationContext<'_>,
        scope: Scope<'_>,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::abstain();
        let rules = context
            .snapshot
            .phenology_rules(&record.taxon.organism_key);
        let org_group_ids: BTreeSet<OrgGroupId> = rules
            .iter()
            .map(|rule| rule.org_group_id)
            .filter(|id| scope.includes(*id))
            .collect();
        let tolerance = context.phenology.tolerance_days;

        for org_group_id in &org_group_ids {
            let Some(org_group) = context.snapshot.org_group(*org_group_id) else {
                continue;
            };
            let candidates: Vec<&PhenologyRule> = rules
                .iter()
                .filter(|rule| rule.org_group_id == *org_group_id)
                .collect();
            let Some(rule) = select_rule(
                &candidates,
                context.snapshot.stages(*org_group_id),
                record.stage,
                &context.phenology.default_stage,
            ) else {
                let stage = record.stage.unwrap_or(&context.phenology.default_stage);
                outcome.messages.push(org_group.message(
                    RuleType::Phenology,
                    &format!("There is no rule for stage {stage}."),
                ));
                continue;
            };

            let window = format!("{} - {}", rule.start, rule.end);
            let fit = fit(rule, record.date, tolerance);
            debug!(
                "event=rule_eval module=rules rule=phenology org_group={org_group_id} fit={fit:?}"
            );
            match fit {
                Fit::Inside => outcome.merge(true),
                Fit::Close => {
                    outcome.messages.push(org_group.message(
                        RuleType::Phenology,
                        &format!("Date is CLOSE TO expected period of {window}."),
                    ));
                    outcome.merge(true);
                }
                Fit::Far => {
                    let text = if tolerance == 0 {
                        format!("Date is outside expected period of {window}.")
                    } else {
                        format!("Date is FAR FROM expected period of {window}.")
                    };
                    outcome
                        .messages
                        .push(org_group.message(RuleType::Phenology, &text));
                    outcome.merge(false);
                }
            }
        }

        report_missing(
            context,
            scope,
            RuleType::Phenology,
            &org_group_ids,
            &mut outcome,
        );
        outcome
    }
}

/// Picks the rule for the record stage: exact stage or synonym, then the
/// wildcard. A record without a stage uses `default_stage`.
fn select_rule<'r>(
    rules: &[&'r PhenologyRule],
    stages: &[Stage],
    record_stage: Option<&str>,
    default_stage: &str,
) -> Option<&'r PhenologyRule> {
    let wanted = record_stage
        .map(str::trim)
        .filter(|stage| !stage.is_empty())
        .unwrap_or(default_stage);
    let canonical = stages
        .iter()
        .find(|stage| stage.matches(wanted))
        .map_or(wanted, |stage| stage.stage.as_str());

    rules
        .iter()
        .find(|rule| rule.stage.eq_ignore_ascii_case(canonical))
        .or_else(|| rules.iter().find(|rule| rule.stage == WILDCARD_STAGE))
        .copied()
}

fn fit(rule: &PhenologyRule, date: &VagueDate, tolerance: u32) -> Fit {
    let (Some(start), Some(end)) = (date.start(), date.end()) else {
        return Fit::Inside;
    };
    if (end - start).num_days() >= 365 {
        return Fit::Inside;
    }

    let mut nearest = i64::MAX;
    for day in start.iter_days().take_while(|day| *day <= end) {
        let distance = distance(rule, day);
        if distance == 0 {
            return Fit::Inside;
        }
        nearest = nearest.min(distance);
    }

    if tolerance > 0 && nearest <= i64::from(tolerance) {
        Fit::Close
    } else {
        Fit::Far
    }
}

/// Days between `day` and the nearest window edge; zero inside the window.
///
/// The window is laid down in the years either side of `day` so that edges
/// across the new year are measured on the real calendar.
fn distance(rule: &PhenologyRule, day: NaiveDate) -> i64 {
    let mut nearest = i64::MAX;
    for year in day.year() - 1..=day.year() + 1 {
        let Some((first, last)) = window_in(rule, year) else {
            continue;
        };
        if first <= day && day <= last {
            return 0;
        }
        let gap = if day < first { first - day } else { day - last };
        nearest = nearest.min(gap.num_days());
    }
    nearest
}

/// The window that opens in `year`.
fn window_in(rule: &PhenologyRule, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = rule.start.in_year(year)?;
    let end_year = if rule.wraps_year() { year + 1 } else { year };
    let last = rule.end.in_year(end_year)?;
    Some((first, last))
}
