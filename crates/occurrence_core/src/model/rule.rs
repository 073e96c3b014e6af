//! Organisation-scoped rule rows.
//!
//! # Responsibility
//! - Define one row type per rule kind plus the stage vocabulary.
//! - Validate rows before they are written to the rule store.
//!
//! # Invariants
//! - `(month, day)` pairs are valid in a leap year.
//! - Period rules never end before they start.
//! - Tenkm squares are stored uppercase; 10km squares are two digits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned organisation group identifier.
pub type OrgGroupId = i64;

/// Stage name matching any record stage.
pub const WILDCARD_STAGE: &str = "*";

/// Rule kinds, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Period,
    Phenology,
    Tenkm,
    Additional,
    Difficulty,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        Self::Period,
        Self::Phenology,
        Self::Tenkm,
        Self::Additional,
        Self::Difficulty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Period => "period",
            Self::Phenology => "phenology",
            Self::Tenkm => "tenkm",
            Self::Additional => "additional",
            Self::Difficulty => "difficulty",
        }
    }

    /// Parses a rule tag, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "period" => Some(Self::Period),
            "phenology" => Some(Self::Phenology),
            "tenkm" => Some(Self::Tenkm),
            "additional" => Some(Self::Additional),
            "difficulty" => Some(Self::Difficulty),
            _ => None,
        }
    }
}

impl Display for RuleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An (organisation, group) pair that owns a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgGroup {
    pub id: OrgGroupId,
    pub organisation: String,
    pub group: String,
    /// Commit of the last completed reload, per rule type.
    pub watermarks: BTreeMap<RuleType, String>,
}

impl OrgGroup {
    pub fn new(id: OrgGroupId, organisation: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id,
            organisation: organisation.into(),
            group: group.into(),
            watermarks: BTreeMap::new(),
        }
    }

    pub fn watermark(&self, rule_type: RuleType) -> Option<&str> {
        self.watermarks.get(&rule_type).map(String::as_str)
    }

    /// Prefixes a diagnostic with `organisation:group:ruletype:`.
    pub fn message(&self, rule_type: RuleType, text: &str) -> String {
        format!(
            "{}:{}:{}: {}",
            self.organisation, self.group, rule_type, text
        )
    }
}

/// Month and day within a year, independent of any particular year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, RuleValidationError> {
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(RuleValidationError::InvalidMonthDay { month, day });
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// This month and day in `year`. 29 February falls back to the 28th
    /// outside leap years; `None` only when the year is out of range.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, self.day - 1))
    }
}

impl Display for MonthDay {
    /// `d/m` without padding.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.day, self.month)
    }
}

/// Introduction/extinction window for a taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRule {
    pub org_group_id: OrgGroupId,
    pub organism_key: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub commit: String,
}

impl PeriodRule {
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        validate_common(&self.organism_key, &self.commit)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(RuleValidationError::InvertedPeriod { start, end });
            }
        }
        Ok(())
    }
}

/// Seasonal window for a taxon at one life stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhenologyRule {
    pub org_group_id: OrgGroupId,
    pub organism_key: String,
    pub stage: String,
    pub start: MonthDay,
    pub end: MonthDay,
    pub commit: String,
}

impl PhenologyRule {
    /// Whether the window runs over the new year (e.g. October to March).
    pub fn wraps_year(&self) -> bool {
        self.start > self.end
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        validate_common(&self.organism_key, &self.commit)?;
        if self.stage.trim().is_empty() {
            return Err(RuleValidationError::EmptyStage);
        }
        Ok(())
    }
}

/// Accepted 10km squares of one 100km square for a taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenkmRule {
    pub org_group_id: OrgGroupId,
    pub organism_key: String,
    pub km100: String,
    pub km10s: BTreeSet<String>,
    pub commit: String,
}

impl TenkmRule {
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        validate_common(&self.organism_key, &self.commit)?;
        let km100_valid = matches!(self.km100.len(), 1 | 2)
            && self.km100.bytes().all(|b| b.is_ascii_uppercase());
        if !km100_valid {
            return Err(RuleValidationError::InvalidKm100(self.km100.clone()));
        }
        if let Some(bad) = self
            .km10s
            .iter()
            .find(|km10| km10.len() != 2 || !km10.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(RuleValidationError::InvalidKm10(bad.clone()));
        }
        Ok(())
    }
}

/// Description of an additional-verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalCode {
    pub org_group_id: OrgGroupId,
    pub code: u32,
    pub text: String,
    pub commit: String,
}

/// Flags a taxon with an additional-verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalRule {
    pub org_group_id: OrgGroupId,
    pub organism_key: String,
    pub code: u32,
    pub commit: String,
}

impl AdditionalRule {
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        validate_common(&self.organism_key, &self.commit)
    }
}

/// Description of an identification-difficulty level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyCode {
    pub org_group_id: OrgGroupId,
    pub difficulty: u8,
    pub text: String,
    pub commit: String,
}

/// Identification difficulty of a taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyRule {
    pub org_group_id: OrgGroupId,
    pub organism_key: String,
    pub difficulty: u8,
    pub commit: String,
}

impl DifficultyRule {
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        validate_common(&self.organism_key, &self.commit)
    }
}

/// One life stage of an org group's vocabulary, with its aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub stage: String,
    pub synonyms: Vec<String>,
}

impl Stage {
    pub fn new(stage: impl Into<String>, synonyms: &[&str]) -> Self {
        Self {
            stage: stage.into(),
            synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Case-insensitive match on the stage name or any synonym.
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        self.stage.eq_ignore_ascii_case(value)
            || self
                .synonyms
                .iter()
                .any(|synonym| synonym.eq_ignore_ascii_case(value))
    }
}

/// Rule row invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValidationError {
    EmptyOrgGroup,
    EmptyOrganismKey,
    EmptyCommit,
    EmptyStage,
    EmptyCodeText,
    InvalidMonthDay { month: u32, day: u32 },
    InvertedPeriod { start: NaiveDate, end: NaiveDate },
    InvalidKm100(String),
    InvalidKm10(String),
}

impl Display for RuleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyOrgGroup => write!(f, "organisation and group cannot be empty"),
            Self::EmptyOrganismKey => write!(f, "rule organism key cannot be empty"),
            Self::EmptyCommit => write!(f, "rule commit marker cannot be empty"),
            Self::EmptyStage => write!(f, "phenology stage cannot be empty"),
            Self::EmptyCodeText => write!(f, "code description cannot be empty"),
            Self::InvalidMonthDay { month, day } => {
                write!(f, "invalid day/month: {day}/{month}")
            }
            Self::InvertedPeriod { start, end } => {
                write!(f, "period start {start} is after end {end}")
            }
            Self::InvalidKm100(value) => write!(f, "invalid 100km square `{value}`"),
            Self::InvalidKm10(value) => write!(f, "invalid 10km square `{value}`"),
        }
    }
}

impl Error for RuleValidationError {}

fn validate_common(organism_key: &str, commit: &str) -> Result<(), RuleValidationError> {
    if organism_key.trim().is_empty() {
        return Err(RuleValidationError::EmptyOrganismKey);
    }
    if commit.trim().is_empty() {
        return Err(RuleValidationError::EmptyCommit);
    }
    Ok(())
}

/// Validates a code description row.
pub fn validate_code_text(text: &str, commit: &str) -> Result<(), RuleValidationError> {
    if text.trim().is_empty() {
        return Err(RuleValidationError::EmptyCodeText);
    }
    if commit.trim().is_empty() {
        return Err(RuleValidationError::EmptyCommit);
    }
    Ok(())
}
