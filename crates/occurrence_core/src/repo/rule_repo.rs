//! Rule store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist organisation-scoped rule rows tagged with a reload commit.
//! - Purge rows left over from earlier commits, one rule type at a time.
//! - Build an immutable `RuleSnapshot` for evaluation.
//!
//! # Invariants
//! - Write paths validate rows before any SQL mutation.
//! - Writes are upserts; a re-inserted row takes the new commit.
//! - `purge_stale` deletes and records the watermark in one transaction.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::rule::{
    validate_code_text, AdditionalCode, AdditionalRule, DifficultyCode, DifficultyRule, MonthDay,
    OrgGroup, OrgGroupId, PeriodRule, PhenologyRule, RuleType, RuleValidationError, Stage,
    TenkmRule,
};
use crate::rules::RuleSnapshot;
use chrono::NaiveDate;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Rule and taxon store errors.
#[derive(Debug)]
pub enum RepoError {
    Validation(RuleValidationError),
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    NotFound(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "rule store connection is at schema version {actual_version}, expected {expected_version}"
            ),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidData(message) => write!(f, "invalid persisted rule data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<RuleValidationError> for RepoError {
    fn from(value: RuleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Write and snapshot API used by rule reloads.
pub trait RuleRepository {
    /// Fresh commit marker for one reload pass.
    fn new_commit(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Returns the id of `(organisation, group)`, creating it when absent.
    fn upsert_org_group(&self, organisation: &str, group: &str) -> RepoResult<OrgGroupId>;
    /// Replaces the stage vocabulary of an org group.
    fn set_stages(&self, org_group_id: OrgGroupId, stages: &[Stage]) -> RepoResult<()>;
    fn insert_period_rule(&self, rule: &PeriodRule) -> RepoResult<()>;
    fn insert_phenology_rule(&self, rule: &PhenologyRule) -> RepoResult<()>;
    fn insert_tenkm_rule(&self, rule: &TenkmRule) -> RepoResult<()>;
    fn insert_additional_code(&self, code: &AdditionalCode) -> RepoResult<()>;
    fn insert_additional_rule(&self, rule: &AdditionalRule) -> RepoResult<()>;
    fn insert_difficulty_code(&self, code: &DifficultyCode) -> RepoResult<()>;
    fn insert_difficulty_rule(&self, rule: &DifficultyRule) -> RepoResult<()>;
    /// Deletes rows of `rule_type` not written by `commit` and records
    /// `commit` as the org group's watermark. Returns the deleted row count.
    fn purge_stale(
        &self,
        org_group_id: OrgGroupId,
        rule_type: RuleType,
        commit: &str,
    ) -> RepoResult<usize>;
    fn load_snapshot(&self) -> RepoResult<RuleSnapshot>;
}

/// SQLite-backed rule store.
pub struct SqliteRuleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRuleRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RuleRepository for SqliteRuleRepository<'_> {
    fn upsert_org_group(&self, organisation: &str, group: &str) -> RepoResult<OrgGroupId> {
        let organisation = organisation.trim();
        let group = group.trim();
        if organisation.is_empty() || group.is_empty() {
            return Err(RuleValidationError::EmptyOrgGroup.into());
        }

        self.conn.execute(
            "INSERT INTO org_groups (organisation, group_name)
             VALUES (?1, ?2)
             ON CONFLICT (organisation, group_name) DO NOTHING;",
            params![organisation, group],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM org_groups WHERE organisation = ?1 AND group_name = ?2;",
            params![organisation, group],
            |row| row.get::<_, OrgGroupId>(0),
        )?;
        Ok(id)
    }

    fn set_stages(&self, org_group_id: OrgGroupId, stages: &[Stage]) -> RepoResult<()> {
        if stages.iter().any(|stage| stage.stage.trim().is_empty()) {
            return Err(RuleValidationError::EmptyStage.into());
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM stages WHERE org_group_id = ?1;",
            params![org_group_id],
        )?;
        for (sort_order, stage) in stages.iter().enumerate() {
            tx.execute(
                "INSERT INTO stages (org_group_id, stage, sort_order) VALUES (?1, ?2, ?3);",
                params![org_group_id, stage.stage.trim(), sort_order as i64],
            )?;
            for synonym in stage.synonyms.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                tx.execute(
                    "INSERT OR IGNORE INTO stage_synonyms (org_group_id, stage, synonym)
                     VALUES (?1, ?2, ?3);",
                    params![org_group_id, stage.stage.trim(), synonym],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_period_rule(&self, rule: &PeriodRule) -> RepoResult<()> {
        rule.validate()?;
        self.conn.execute(
            "INSERT INTO period_rules (org_group_id, organism_key, start_date, end_date, commit_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (org_group_id, organism_key) DO UPDATE SET
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                commit_id = excluded.commit_id;",
            params![
                rule.org_group_id,
                rule.organism_key.trim(),
                rule.start_date.map(date_to_db),
                rule.end_date.map(date_to_db),
                rule.commit.as_str(),
            ],
        )?;
        Ok(())
    }

    fn insert_phenology_rule(&self, rule: &PhenologyRule) -> RepoResult<()> {
        rule.validate()?;
        self.conn.execute(
            "INSERT INTO phenology_rules (
                org_group_id, organism_key, stage,
                start_month, start_day, end_month, end_day, commit_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (org_group_id, organism_key, stage) DO UPDATE SET
                start_month = excluded.start_month,
                start_day = excluded.start_day,
                end_month = excluded.end_month,
                end_day = excluded.end_day,
                commit_id = excluded.commit_id;",
            params![
                rule.org_group_id,
                rule.organism_key.trim(),
                rule.stage.trim(),
                rule.start.month(),
                rule.start.day(),
                rule.end.month(),
                rule.end.day(),
                rule.commit.as_str(),
            ],
        )?;
        Ok(())
    }

    fn insert_tenkm_rule(&self, rule: &TenkmRule) -> RepoResult<()> {
        rule.validate()?;
        let km10s = rule.km10s.iter().cloned().collect::<Vec<_>>().join(" ");
        self.conn.execute(
            "INSERT INTO tenkm_rules (org_group_id, organism_key, km100, km10s, commit_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (org_group_id, organism_key, km100) DO UPDATE SET
                km10s = excluded.km10s,
                commit_id = excluded.commit_id;",
            params![
                rule.org_group_id,
                rule.organism_key.trim(),
                rule.km100.as_str(),
                km10s,
                rule.commit.as_str(),
            ],
        )?;
        Ok(())
    }

    fn insert_additional_code(&self, code: &AdditionalCode) -> RepoResult<()> {
        validate_code_text(&code.text, &code.commit)?;
        self.conn.execute(
            "INSERT INTO additional_codes (org_group_id, code, text, commit_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (org_group_id, code) DO UPDATE SET
                text = excluded.text,
                commit_id = excluded.commit_id;",
            params![
                code.org_group_id,
                code.code,
                code.text.trim(),
                code.commit.as_str()
            ],
        )?;
        Ok(())
    }

    fn insert_additional_rule(&self, rule: &AdditionalRule) -> RepoResult<()> {
        rule.validate()?;
        self.conn.execute(
            "INSERT INTO additional_rules (org_group_id, organism_key, code, commit_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (org_group_id, organism_key, code) DO UPDATE SET
                commit_id = excluded.commit_id;",
            params![
                rule.org_group_id,
                rule.organism_key.trim(),
                rule.code,
                rule.commit.as_str()
            ],
        )?;
        Ok(())
    }

    fn insert_difficulty_code(&self, code: &DifficultyCode) -> RepoResult<()> {
        validate_code_text(&code.text, &code.commit)?;
        self.conn.execute(
            "INSERT INTO difficulty_codes (org_group_id, difficulty, text, commit_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (org_group_id, difficulty) DO UPDATE SET
                text = excluded.text,
                commit_id = excluded.commit_id;",
            params![
                code.org_group_id,
                code.difficulty,
                code.text.trim(),
                code.commit.as_str()
            ],
        )?;
        Ok(())
    }

    fn insert_difficulty_rule(&self, rule: &DifficultyRule) -> RepoResult<()> {
        rule.validate()?;
        self.conn.execute(
            "INSERT INTO difficulty_rules (org_group_id, organism_key, difficulty, commit_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (org_group_id, organism_key) DO UPDATE SET
                difficulty = excluded.difficulty,
                commit_id = excluded.commit_id;",
            params![
                rule.org_group_id,
                rule.organism_key.trim(),
                rule.difficulty,
                rule.commit.as_str()
            ],
        )?;
        Ok(())
    }

    fn purge_stale(
        &self,
        org_group_id: OrgGroupId,
        rule_type: RuleType,
        commit: &str,
    ) -> RepoResult<usize> {
        if commit.trim().is_empty() {
            return Err(RuleValidationError::EmptyCommit.into());
        }
        let started_at = Instant::now();

        let tx = self.conn.unchecked_transaction()?;
        let known: Option<OrgGroupId> = tx
            .query_row(
                "SELECT id FROM org_groups WHERE id = ?1;",
                params![org_group_id],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(RepoError::NotFound(format!("org group {org_group_id}")));
        }

        let mut deleted = 0;
        for table in rule_tables(rule_type) {
            deleted += tx.execute(
                &format!("DELETE FROM {table} WHERE org_group_id = ?1 AND commit_id <> ?2;"),
                params![org_group_id, commit],
            )?;
        }
        tx.execute(
            "INSERT INTO org_group_watermarks (org_group_id, rule_type, commit_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (org_group_id, rule_type) DO UPDATE SET
                commit_id = excluded.commit_id,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![org_group_id, rule_type.as_str(), commit],
        )?;
        tx.commit()?;

        info!(
            "event=rules_purge module=repo status=ok org_group={org_group_id} rule_type={rule_type} deleted={deleted} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(deleted)
    }

    fn load_snapshot(&self) -> RepoResult<RuleSnapshot> {
        let started_at = Instant::now();
        let mut snapshot = RuleSnapshot::new();

        for org_group in load_org_groups(self.conn)? {
            snapshot.add_org_group(org_group);
        }
        for (org_group_id, stages) in load_stages(self.conn)? {
            snapshot.set_stages(org_group_id, stages);
        }
        for rule in query_rows(
            self.conn,
            "SELECT org_group_id, organism_key, start_date, end_date, commit_id FROM period_rules;",
            parse_period_row,
        )? {
            snapshot.add_period_rule(rule);
        }
        for rule in query_rows(
            self.conn,
            "SELECT org_group_id, organism_key, stage, start_month, start_day, end_month, end_day, commit_id
             FROM phenology_rules;",
            parse_phenology_row,
        )? {
            snapshot.add_phenology_rule(rule);
        }
        for rule in query_rows(
            self.conn,
            "SELECT org_group_id, organism_key, km100, km10s, commit_id FROM tenkm_rules;",
            parse_tenkm_row,
        )? {
            snapshot.add_tenkm_rule(rule);
        }
        for code in query_rows(
            self.conn,
            "SELECT org_group_id, code, text, commit_id FROM additional_codes;",
            |row| {
                Ok(AdditionalCode {
                    org_group_id: row.get(0)?,
                    code: row.get(1)?,
                    text: row.get(2)?,
                    commit: row.get(3)?,
                })
            },
        )? {
            snapshot.add_additional_code(code);
        }
        for rule in query_rows(
            self.conn,
            "SELECT org_group_id, organism_key, code, commit_id FROM additional_rules
             ORDER BY org_group_id, organism_key, code;",
            |row| {
                Ok(AdditionalRule {
                    org_group_id: row.get(0)?,
                    organism_key: row.get(1)?,
                    code: row.get(2)?,
                    commit: row.get(3)?,
                })
            },
        )? {
            snapshot.add_additional_rule(rule);
        }
        for code in query_rows(
            self.conn,
            "SELECT org_group_id, difficulty, text, commit_id FROM difficulty_codes;",
            |row| {
                Ok(DifficultyCode {
                    org_group_id: row.get(0)?,
                    difficulty: row.get(1)?,
                    text: row.get(2)?,
                    commit: row.get(3)?,
                })
            },
        )? {
            snapshot.add_difficulty_code(code);
        }
        for rule in query_rows(
            self.conn,
            "SELECT org_group_id, organism_key, difficulty, commit_id FROM difficulty_rules
             ORDER BY org_group_id, organism_key;",
            |row| {
                Ok(DifficultyRule {
                    org_group_id: row.get(0)?,
                    organism_key: row.get(1)?,
                    difficulty: row.get(2)?,
                    commit: row.get(3)?,
                })
            },
        )? {
            snapshot.add_difficulty_rule(rule);
        }

        info!(
            "event=rules_load module=repo status=ok rule_count={} duration_ms={}",
            snapshot.rule_count(),
            started_at.elapsed().as_millis()
        );
        Ok(snapshot)
    }
}

fn rule_tables(rule_type: RuleType) -> &'static [&'static str] {
    match rule_type {
        RuleType::Period => &["period_rules"],
        RuleType::Phenology => &["phenology_rules"],
        RuleType::Tenkm => &["tenkm_rules"],
        RuleType::Additional => &["additional_rules", "additional_codes"],
        RuleType::Difficulty => &["difficulty_rules", "difficulty_codes"],
    }
}

fn query_rows<T>(
    conn: &Connection,
    sql: &str,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut parsed = Vec::new();
    while let Some(row) = rows.next()? {
        parsed.push(parse(row)?);
    }
    Ok(parsed)
}

fn load_org_groups(conn: &Connection) -> RepoResult<Vec<OrgGroup>> {
    let mut org_groups: BTreeMap<OrgGroupId, OrgGroup> = query_rows(
        conn,
        "SELECT id, organisation, group_name FROM org_groups ORDER BY id;",
        |row| {
            Ok(OrgGroup::new(
                row.get(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?
    .into_iter()
    .map(|org_group| (org_group.id, org_group))
    .collect();

    let watermarks = query_rows(
        conn,
        "SELECT org_group_id, rule_type, commit_id FROM org_group_watermarks;",
        |row| {
            let rule_type: String = row.get(1)?;
            let rule_type = RuleType::parse(&rule_type)
                .ok_or_else(|| RepoError::InvalidData(format!("unknown rule_type `{rule_type}`")))?;
            Ok((row.get::<_, OrgGroupId>(0)?, rule_type, row.get::<_, String>(2)?))
        },
    )?;
    for (org_group_id, rule_type, commit) in watermarks {
        if let Some(org_group) = org_groups.get_mut(&org_group_id) {
            org_group.watermarks.insert(rule_type, commit);
        }
    }
    Ok(org_groups.into_values().collect())
}

fn load_stages(conn: &Connection) -> RepoResult<BTreeMap<OrgGroupId, Vec<Stage>>> {
    let rows = query_rows(
        conn,
        "SELECT s.org_group_id, s.stage, ss.synonym
         FROM stages s
         LEFT JOIN stage_synonyms ss
           ON ss.org_group_id = s.org_group_id AND ss.stage = s.stage
         ORDER BY s.org_group_id, s.sort_order, ss.synonym;",
        |row| {
            Ok((
                row.get::<_, OrgGroupId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        },
    )?;

    let mut stages: BTreeMap<OrgGroupId, Vec<Stage>> = BTreeMap::new();
    for (org_group_id, name, synonym) in rows {
        let list = stages.entry(org_group_id).or_default();
        if list.last().map_or(true, |stage| stage.stage != name) {
            list.push(Stage::new(name, &[]));
        }
        if let (Some(stage), Some(synonym)) = (list.last_mut(), synonym) {
            stage.synonyms.push(synonym);
        }
    }
    Ok(stages)
}

fn parse_period_row(row: &Row<'_>) -> RepoResult<PeriodRule> {
    let rule = PeriodRule {
        org_group_id: row.get(0)?,
        organism_key: row.get(1)?,
        start_date: row.get::<_, Option<String>>(2)?.map(|d| parse_db_date(&d)).transpose()?,
        end_date: row.get::<_, Option<String>>(3)?.map(|d| parse_db_date(&d)).transpose()?,
        commit: row.get(4)?,
    };
    rule.validate()
        .map_err(|err| RepoError::InvalidData(format!("period rule: {err}")))?;
    Ok(rule)
}

fn parse_phenology_row(row: &Row<'_>) -> RepoResult<PhenologyRule> {
    let month_day = |month: u32, day: u32| {
        MonthDay::new(month, day)
            .map_err(|err| RepoError::InvalidData(format!("phenology rule: {err}")))
    };
    Ok(PhenologyRule {
        org_group_id: row.get(0)?,
        organism_key: row.get(1)?,
        stage: row.get(2)?,
        start: month_day(row.get(3)?, row.get(4)?)?,
        end: month_day(row.get(5)?, row.get(6)?)?,
        commit: row.get(7)?,
    })
}

fn parse_tenkm_row(row: &Row<'_>) -> RepoResult<TenkmRule> {
    let km10s: String = row.get(3)?;
    let rule = TenkmRule {
        org_group_id: row.get(0)?,
        organism_key: row.get(1)?,
        km100: row.get(2)?,
        km10s: km10s.split_whitespace().map(str::to_string).collect(),
        commit: row.get(4)?,
    };
    rule.validate()
        .map_err(|err| RepoError::InvalidData(format!("tenkm rule: {err}")))?;
    Ok(rule)
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_db_date(value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid rule date `{value}`")))
}

pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
