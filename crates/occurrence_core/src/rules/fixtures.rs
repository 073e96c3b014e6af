//! Shared builders for evaluator unit tests.

use super::{EvaluationContext, EvaluationRecord, RuleEvaluator, RuleOutcome, RuleSnapshot, Scope};
use crate::config::PhenologyConfig;
use crate::model::taxon::Taxon;
use crate::sref::{GridSystem, SpatialReference, SrefSystem};
use crate::vague_date::VagueDate;
use chrono::NaiveDate;

pub(crate) const KEY: &str = "NHMSYS0000530420";

pub(crate) fn taxon() -> Taxon {
    Taxon {
        tvk: KEY.to_string(),
        preferred_tvk: KEY.to_string(),
        organism_key: KEY.to_string(),
        name: "Adalia bipunctata".to_string(),
        preferred_name: "Adalia bipunctata".to_string(),
    }
}

pub(crate) fn date(text: &str) -> VagueDate {
    let today = NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid today");
    VagueDate::parse_at(text, today).expect("fixture date should parse")
}

pub(crate) fn gb(gridref: &str) -> SpatialReference {
    SpatialReference::from_gridref(SrefSystem::Grid(GridSystem::Gb), gridref)
        .expect("fixture gridref should parse")
}

/// Runs `evaluator` for one record against `snapshot`.
pub(crate) fn run(
    evaluator: &dyn RuleEvaluator,
    snapshot: &RuleSnapshot,
    config: &PhenologyConfig,
    date_text: &str,
    gridref: &str,
    stage: Option<&str>,
    scope: Scope<'_>,
) -> RuleOutcome {
    let taxon = taxon();
    let date = date(date_text);
    let sref = gb(gridref);
    let record = EvaluationRecord {
        taxon: &taxon,
        date: &date,
        sref: &sref,
        stage,
    };
    let context = EvaluationContext {
        snapshot,
        phenology: config,
    };
    evaluator.run(&record, &context, scope)
}
