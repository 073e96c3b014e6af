//! Occurrence record verification core.
//! Grid references, vague dates and organisation rule sets meet here; this
//! crate is the single source of truth for verification invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rules;
pub mod service;
pub mod sref;
pub mod vague_date;

pub use config::{ConfigError, LoggingConfig, PhenologyConfig, VerifyConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::record::{RecordId, RecordInput, RecordOutput, SrefInput, SrefOutput, Verdict};
pub use model::rule::{
    AdditionalCode, AdditionalRule, DifficultyCode, DifficultyRule, MonthDay, OrgGroup,
    OrgGroupId, PeriodRule, PhenologyRule, RuleType, RuleValidationError, Stage, TenkmRule,
};
pub use model::taxon::{Taxon, TaxonError};
pub use repo::rule_repo::{RepoError, RepoResult, RuleRepository, SqliteRuleRepository};
pub use repo::taxon_repo::{SqliteTaxonRepository, TaxonDictionary, TaxonResolver};
pub use rules::{
    OrgGroupRules, ResolvedFilter, RuleError, RuleRunner, RuleSetHandle, RuleSnapshot, RunSummary,
};
pub use service::verify_service::{VerificationService, DEADLINE_MESSAGE};
pub use sref::{
    Country, GridCodec, GridSystem, HelmertProjector, Projector, SpatialReference, SrefError,
    SrefSystem,
};
pub use vague_date::{DatePrecision, VagueDate, VagueDateError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
