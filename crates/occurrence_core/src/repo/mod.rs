//! Persistence for rules and the taxon dictionary.
//!
//! # Responsibility
//! - Define the rule store and taxon resolution contracts.
//! - Keep SQL details out of evaluation and service code.
//!
//! # Invariants
//! - Repositories only accept connections at the latest schema version.
//! - Writes validate rows before persistence.

pub mod rule_repo;
pub mod taxon_repo;
