//! Domain model shared by the rule engine, store and service.
//!
//! # Responsibility
//! - Define the taxon identity, rule rows and record boundary shapes.
//! - Keep validation of rule rows next to their definitions.
//!
//! # Invariants
//! - Rule rows are keyed by organism key, never by a synonym TVK.
//! - Every persisted rule row carries a non-empty reload commit marker.

pub mod record;
pub mod rule;
pub mod taxon;
