//! Taxon dictionary and resolution.
//!
//! # Responsibility
//! - Resolve a record's TVK or scientific name to a canonical `Taxon`.
//! - Persist the dictionary alongside the rule store.
//!
//! # Invariants
//! - TVKs are tried before names; TVK lookup ignores case.
//! - Name lookup is exact apart from case and surrounding whitespace; a
//!   preferred-name entry wins over a synonym of the same name.

use super::rule_repo::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::taxon::{Taxon, TaxonError, TaxonResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Taxon resolution collaborator.
pub trait TaxonResolver {
    fn resolve(&self, identifier: &str) -> TaxonResult<Taxon>;
}

/// In-memory dictionary, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct TaxonDictionary {
    by_tvk: HashMap<String, Taxon>,
    by_name: HashMap<String, String>,
}

impl TaxonDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, taxon: Taxon) {
        let tvk_key = taxon.tvk.trim().to_ascii_uppercase();
        let name_key = taxon.name.trim().to_lowercase();
        let replace_name = match self.by_name.get(&name_key).and_then(|tvk| self.by_tvk.get(tvk)) {
            None => true,
            Some(existing) => existing.is_synonym() && !taxon.is_synonym(),
        };
        if replace_name {
            self.by_name.insert(name_key, tvk_key.clone());
        }
        self.by_tvk.insert(tvk_key, taxon);
    }

    pub fn len(&self) -> usize {
        self.by_tvk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tvk.is_empty()
    }
}

impl FromIterator<Taxon> for TaxonDictionary {
    fn from_iter<I: IntoIterator<Item = Taxon>>(iter: I) -> Self {
        let mut dictionary = Self::new();
        for taxon in iter {
            dictionary.insert(taxon);
        }
        dictionary
    }
}

impl TaxonResolver for TaxonDictionary {
    fn resolve(&self, identifier: &str) -> TaxonResult<Taxon> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(TaxonError::Missing);
        }
        self.by_tvk
            .get(&identifier.to_ascii_uppercase())
            .or_else(|| {
                self.by_name
                    .get(&identifier.to_lowercase())
                    .and_then(|tvk| self.by_tvk.get(tvk))
            })
            .cloned()
            .ok_or_else(|| TaxonError::Unrecognised(identifier.to_string()))
    }
}

/// SQLite-backed taxon dictionary.
pub struct SqliteTaxonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts or replaces the taxon keyed by its TVK.
    pub fn insert_taxon(&self, taxon: &Taxon) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO taxa (tvk, preferred_tvk, organism_key, name, preferred_name)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (tvk) DO UPDATE SET
                preferred_tvk = excluded.preferred_tvk,
                organism_key = excluded.organism_key,
                name = excluded.name,
                preferred_name = excluded.preferred_name;",
            params![
                taxon.tvk.trim().to_ascii_uppercase(),
                taxon.preferred_tvk.trim().to_ascii_uppercase(),
                taxon.organism_key.trim(),
                taxon.name.trim(),
                taxon.preferred_name.trim(),
            ],
        )?;
        Ok(())
    }

    pub fn get_by_tvk(&self, tvk: &str) -> RepoResult<Option<Taxon>> {
        let taxon = self
            .conn
            .query_row(
                "SELECT tvk, preferred_tvk, organism_key, name, preferred_name
                 FROM taxa WHERE tvk = ?1;",
                params![tvk.trim().to_ascii_uppercase()],
                parse_taxon_row,
            )
            .optional()?;
        Ok(taxon)
    }

    /// Preferred entries sort first so a shared name picks the accepted taxon.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Option<Taxon>> {
        let taxon = self
            .conn
            .query_row(
                "SELECT tvk, preferred_tvk, organism_key, name, preferred_name
                 FROM taxa
                 WHERE name = ?1 COLLATE NOCASE
                 ORDER BY (tvk <> preferred_tvk), tvk
                 LIMIT 1;",
                params![name.trim()],
                parse_taxon_row,
            )
            .optional()?;
        Ok(taxon)
    }

    /// Loads every taxon into a thread-shareable dictionary.
    pub fn load_dictionary(&self) -> RepoResult<TaxonDictionary> {
        let mut stmt = self.conn.prepare(
            "SELECT tvk, preferred_tvk, organism_key, name, preferred_name
             FROM taxa ORDER BY tvk;",
        )?;
        let dictionary = stmt
            .query_map([], parse_taxon_row)?
            .collect::<Result<TaxonDictionary, _>>()?;
        info!(
            "event=taxa_load module=repo status=ok taxon_count={}",
            dictionary.len()
        );
        Ok(dictionary)
    }
}

impl TaxonResolver for SqliteTaxonRepository<'_> {
    fn resolve(&self, identifier: &str) -> TaxonResult<Taxon> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(TaxonError::Missing);
        }
        let unavailable = |err: RepoError| TaxonError::Unavailable(err.to_string());
        if let Some(taxon) = self.get_by_tvk(identifier).map_err(unavailable)? {
            return Ok(taxon);
        }
        self.find_by_name(identifier)
            .map_err(unavailable)?
            .ok_or_else(|| TaxonError::Unrecognised(identifier.to_string()))
    }
}

fn parse_taxon_row(row: &Row<'_>) -> rusqlite::Result<Taxon> {
    Ok(Taxon {
        tvk: row.get(0)?,
        preferred_tvk: row.get(1)?,
        organism_key: row.get(2)?,
        name: row.get(3)?,
        preferred_name: row.get(4)?,
    })
}
