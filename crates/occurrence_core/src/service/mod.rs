//! Use-case services over the verification core.
//!
//! # Responsibility
//! - Orchestrate taxon resolution, parsing and rule evaluation per record.
//! - Keep callers decoupled from storage and evaluator details.

pub mod verify_service;
