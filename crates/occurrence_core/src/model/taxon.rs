//! Canonical taxon identity.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TaxonResult<T> = Result<T, TaxonError>;

/// A resolved taxon.
///
/// `tvk` is the identifier the record used; rules are looked up by
/// `organism_key`, which is shared by every synonym.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxon {
    pub tvk: String,
    pub preferred_tvk: String,
    pub organism_key: String,
    pub name: String,
    pub preferred_name: String,
}

impl Taxon {
    /// Whether the record named a synonym rather than the preferred concept.
    pub fn is_synonym(&self) -> bool {
        self.tvk != self.preferred_tvk
    }
}

/// Taxon resolution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonError {
    /// Neither a TVK nor a name was supplied.
    Missing,
    /// No taxon matches the identifier.
    Unrecognised(String),
    /// The resolution collaborator could not answer.
    Unavailable(String),
}

impl Display for TaxonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("A tvk or a taxon name is required."),
            Self::Unrecognised(identifier) => {
                write!(f, "Unrecognised taxon identifier: {identifier}.")
            }
            Self::Unavailable(message) => write!(f, "Taxon lookup is unavailable: {message}."),
        }
    }
}

impl Error for TaxonError {}
