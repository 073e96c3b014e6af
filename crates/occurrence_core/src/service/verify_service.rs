//! Record verification use case.
//!
//! # Responsibility
//! - Normalize each record (taxon, date, spatial reference) and run the
//!   rule engine over it.
//! - Keep per-record failures inside the record's output.
//!
//! # Invariants
//! - Steps run taxon, date, sref, rules; the first failing step ends the
//!   record with its message and no derived fields.
//! - A batch evaluates every record against one snapshot.
//! - Only filter request errors abort a call; record errors never do.

use crate::config::VerifyConfig;
use crate::model::record::{RecordInput, RecordOutput, SrefOutput, Verdict};
use crate::model::taxon::{Taxon, TaxonError, TaxonResult};
use crate::repo::taxon_repo::TaxonResolver;
use crate::rules::{
    EvaluationRecord, OrgGroupRules, ResolvedFilter, RuleResult, RuleRunner, RuleSetHandle,
};
use crate::sref::{Projector, SpatialReference};
use crate::vague_date::VagueDate;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Message for records skipped because the batch ran out of time.
pub const DEADLINE_MESSAGE: &str = "Batch deadline exceeded before record was verified.";

/// Verifies occurrence records against the current rule set.
pub struct VerificationService<R: TaxonResolver, P: Projector> {
    resolver: R,
    projector: P,
    rules: Arc<RuleSetHandle>,
    config: VerifyConfig,
    today: Option<NaiveDate>,
}

impl<R: TaxonResolver, P: Projector> VerificationService<R, P> {
    pub fn new(resolver: R, projector: P, rules: Arc<RuleSetHandle>, config: VerifyConfig) -> Self {
        Self {
            resolver,
            projector,
            rules,
            config,
            today: None,
        }
    }

    /// Pins "today" for date validation instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Handle whose snapshot later calls will use.
    pub fn rules(&self) -> &Arc<RuleSetHandle> {
        &self.rules
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Verifies one record.
    ///
    /// # Errors
    /// - `RuleError` when `filter` names an unknown org group or rule type.
    pub fn verify(
        &self,
        record: &RecordInput,
        filter: Option<&[OrgGroupRules]>,
    ) -> RuleResult<RecordOutput> {
        let mut outputs = self.verify_batch(std::slice::from_ref(record), filter, None)?;
        Ok(outputs.remove(0))
    }

    /// Verifies records in order against one snapshot.
    ///
    /// Records not started before `deadline` fail with `DEADLINE_MESSAGE`.
    pub fn verify_batch(
        &self,
        records: &[RecordInput],
        filter: Option<&[OrgGroupRules]>,
        deadline: Option<Instant>,
    ) -> RuleResult<Vec<RecordOutput>> {
        let started_at = Instant::now();
        let snapshot = self.rules.current();
        let filter = filter
            .map(|entries| ResolvedFilter::resolve(&snapshot, entries))
            .transpose()?;
        let runner = RuleRunner::new(&snapshot, &self.config.phenology);
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        let mut failed = 0usize;
        let mut expired = 0usize;
        let outputs: Vec<RecordOutput> = records
            .iter()
            .map(|record| {
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    expired += 1;
                    return RecordOutput::failed(record, DEADLINE_MESSAGE);
                }
                let output = self.verify_one(&runner, filter.as_ref(), record, today);
                if output.result == Verdict::Fail {
                    failed += 1;
                }
                output
            })
            .collect();

        info!(
            "event=verify_batch module=service status=ok records={} failed={failed} expired={expired} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outputs)
    }

    fn verify_one(
        &self,
        runner: &RuleRunner<'_>,
        filter: Option<&ResolvedFilter>,
        record: &RecordInput,
        today: NaiveDate,
    ) -> RecordOutput {
        let taxon = match self.resolve_taxon(record) {
            Ok(taxon) => taxon,
            Err(err) => return reject(record, "taxon", err),
        };
        let date = match VagueDate::parse_at(&record.date, today) {
            Ok(date) => date,
            Err(err) => return reject(record, "date", err),
        };
        let sref = match SpatialReference::from_input(&record.sref, &self.projector) {
            Ok(sref) => sref,
            Err(err) => return reject(record, "sref", err),
        };

        let summary = runner.run(
            &EvaluationRecord {
                taxon: &taxon,
                date: &date,
                sref: &sref,
                stage: record.stage.as_deref(),
            },
            filter,
        );

        RecordOutput {
            id: record.id.clone(),
            date: date.to_string(),
            tvk: Some(taxon.tvk.clone()),
            name: Some(taxon.name.clone()),
            stage: record.stage.clone(),
            preferred_tvk: Some(taxon.preferred_tvk),
            sref: Some(SrefOutput {
                srid: sref.system().srid(),
                gridref: sref.gridref().to_string(),
                country: sref.country().code().to_string(),
                accuracy: sref.accuracy(),
                km100: sref.km100().to_string(),
                km10: sref.km10().map(str::to_string),
            }),
            id_difficulty: summary.id_difficulty,
            result: summary.verdict,
            messages: summary.messages,
        }
    }

    fn resolve_taxon(&self, record: &RecordInput) -> TaxonResult<Taxon> {
        let identifier = record
            .tvk
            .as_deref()
            .map(str::trim)
            .filter(|tvk| !tvk.is_empty())
            .or_else(|| {
                record
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
            })
            .ok_or(TaxonError::Missing)?;
        self.resolver.resolve(identifier)
    }
}

fn reject(record: &RecordInput, step: &str, err: impl std::fmt::Display) -> RecordOutput {
    warn!(
        "event=verify_record module=service status=error record_id={} step={step}",
        record.id
    );
    RecordOutput::failed(record, err.to_string())
}
