//! Immutable rule set and its atomically swapped handle.
//!
//! # Invariants
//! - A `RuleSnapshot` is never mutated once shared through a handle.
//! - `RuleSetHandle::replace` swaps the whole snapshot; readers holding the
//!   previous `Arc` keep a consistent view.

use crate::model::rule::{
    AdditionalCode, AdditionalRule, DifficultyCode, DifficultyRule, OrgGroup, OrgGroupId,
    PeriodRule, PhenologyRule, Stage, TenkmRule,
};
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Every rule row of every org group, indexed by organism key.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    org_groups: BTreeMap<OrgGroupId, OrgGroup>,
    stages: HashMap<OrgGroupId, Vec<Stage>>,
    period: HashMap<String, Vec<PeriodRule>>,
    phenology: HashMap<String, Vec<PhenologyRule>>,
    tenkm: HashMap<String, Vec<TenkmRule>>,
    tenkm_org_groups: BTreeSet<OrgGroupId>,
    additional: HashMap<String, Vec<AdditionalRule>>,
    additional_codes: HashMap<(OrgGroupId, u32), String>,
    difficulty: HashMap<String, Vec<DifficultyRule>>,
    difficulty_codes: HashMap<(OrgGroupId, u8), String>,
}

impl RuleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_org_group(&mut self, org_group: OrgGroup) {
        self.org_groups.insert(org_group.id, org_group);
    }

    pub fn set_stages(&mut self, org_group_id: OrgGroupId, stages: Vec<Stage>) {
        self.stages.insert(org_group_id, stages);
    }

    pub fn add_period_rule(&mut self, rule: PeriodRule) {
        self.period
            .entry(rule.organism_key.clone())
            .or_default()
            .push(rule);
    }

    pub fn add_phenology_rule(&mut self, rule: PhenologyRule) {
        self.phenology
            .entry(rule.organism_key.clone())
            .or_default()
            .push(rule);
    }

    pub fn add_tenkm_rule(&mut self, rule: TenkmRule) {
        self.tenkm_org_groups.insert(rule.org_group_id);
        self.tenkm
            .entry(rule.organism_key.clone())
            .or_default()
            .push(rule);
    }

    pub fn add_additional_code(&mut self, code: AdditionalCode) {
        self.additional_codes
            .insert((code.org_group_id, code.code), code.text);
    }

    pub fn add_additional_rule(&mut self, rule: AdditionalRule) {
        self.additional
            .entry(rule.organism_key.clone())
            .or_default()
            .push(rule);
    }

    pub fn add_difficulty_code(&mut self, code: DifficultyCode) {
        self.difficulty_codes
            .insert((code.org_group_id, code.difficulty), code.text);
    }

    pub fn add_difficulty_rule(&mut self, rule: DifficultyRule) {
        self.difficulty
            .entry(rule.organism_key.clone())
            .or_default()
            .push(rule);
    }

    pub fn org_group(&self, id: OrgGroupId) -> Option<&OrgGroup> {
        self.org_groups.get(&id)
    }

    pub fn find_org_group(&self, organisation: &str, group: &str) -> Option<&OrgGroup> {
        self.org_groups.values().find(|org_group| {
            org_group.organisation.eq_ignore_ascii_case(organisation.trim())
                && org_group.group.eq_ignore_ascii_case(group.trim())
        })
    }

    pub fn org_groups(&self) -> impl Iterator<Item = &OrgGroup> {
        self.org_groups.values()
    }

    pub fn stages(&self, org_group_id: OrgGroupId) -> &[Stage] {
        self.stages
            .get(&org_group_id)
            .map_or(&[] as &[Stage], Vec::as_slice)
    }

    pub fn period_rules(&self, organism_key: &str) -> &[PeriodRule] {
        rows(&self.period, organism_key)
    }

    pub fn phenology_rules(&self, organism_key: &str) -> &[PhenologyRule] {
        rows(&self.phenology, organism_key)
    }

    pub fn tenkm_rules(&self, organism_key: &str) -> &[TenkmRule] {
        rows(&self.tenkm, organism_key)
    }

    /// Org groups holding tenkm rules for any taxon.
    pub fn tenkm_org_groups(&self) -> impl Iterator<Item = OrgGroupId> + '_ {
        self.tenkm_org_groups.iter().copied()
    }

    pub fn additional_rules(&self, organism_key: &str) -> &[AdditionalRule] {
        rows(&self.additional, organism_key)
    }

    pub fn additional_text(&self, org_group_id: OrgGroupId, code: u32) -> Option<&str> {
        self.additional_codes
            .get(&(org_group_id, code))
            .map(String::as_str)
    }

    pub fn difficulty_rules(&self, organism_key: &str) -> &[DifficultyRule] {
        rows(&self.difficulty, organism_key)
    }

    pub fn difficulty_text(&self, org_group_id: OrgGroupId, difficulty: u8) -> Option<&str> {
        self.difficulty_codes
            .get(&(org_group_id, difficulty))
            .map(String::as_str)
    }

    /// Number of rule rows across all rule types.
    pub fn rule_count(&self) -> usize {
        fn count<T>(map: &HashMap<String, Vec<T>>) -> usize {
            map.values().map(Vec::len).sum()
        }
        count(&self.period)
            + count(&self.phenology)
            + count(&self.tenkm)
            + count(&self.additional)
            + count(&self.difficulty)
    }
}

fn rows<'a, T>(map: &'a HashMap<String, Vec<T>>, organism_key: &str) -> &'a [T] {
    map.get(organism_key).map_or(&[], Vec::as_slice)
}

/// Shared reference to the current committed rule set.
#[derive(Debug, Default)]
pub struct RuleSetHandle {
    current: RwLock<Arc<RuleSnapshot>>,
}

impl RuleSetHandle {
    pub fn new(snapshot: RuleSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot in force now. Callers keep it for a whole batch.
    pub fn current(&self) -> Arc<RuleSnapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Publishes a fully built snapshot and returns the one it replaced.
    pub fn replace(&self, snapshot: RuleSnapshot) -> Arc<RuleSnapshot> {
        let next = Arc::new(snapshot);
        let rules = next.rule_count();
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut *guard, next);
        info!("event=rules_swap module=rules status=ok rule_count={rules}");
        previous
    }
}
