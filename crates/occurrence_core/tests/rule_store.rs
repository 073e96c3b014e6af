use chrono::NaiveDate;
use occurrence_core::db::{open_db, open_db_in_memory};
use occurrence_core::{
    AdditionalCode, AdditionalRule, MonthDay, PeriodRule, PhenologyRule, RepoError,
    RuleRepository, RuleSetHandle, RuleType, RuleValidationError, SqliteRuleRepository,
    SqliteTaxonRepository, Stage, Taxon, TaxonResolver, TenkmRule,
};
use std::collections::BTreeSet;

const KEY: &str = "NHMSYS0000530420";

fn period(org_group_id: i64, start: Option<NaiveDate>, commit: &str) -> PeriodRule {
    PeriodRule {
        org_group_id,
        organism_key: KEY.to_string(),
        start_date: start,
        end_date: None,
        commit: commit.to_string(),
    }
}

fn tenkm(org_group_id: i64, km10s: &[&str], commit: &str) -> TenkmRule {
    TenkmRule {
        org_group_id,
        organism_key: KEY.to_string(),
        km100: "TL".to_string(),
        km10s: km10s.iter().map(|km10| (*km10).to_string()).collect::<BTreeSet<_>>(),
        commit: commit.to_string(),
    }
}

#[test]
fn org_groups_are_created_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();

    let first = repo.upsert_org_group("BRC", "Moths").unwrap();
    let again = repo.upsert_org_group(" BRC ", "Moths").unwrap();
    let other = repo.upsert_org_group("BRC", "Beetles").unwrap();

    assert_eq!(first, again);
    assert_ne!(first, other);
    assert!(matches!(
        repo.upsert_org_group("BRC", "  "),
        Err(RepoError::Validation(RuleValidationError::EmptyOrgGroup))
    ));
}

#[test]
fn snapshot_reflects_every_rule_type() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Moths").unwrap();
    let commit = repo.new_commit();

    repo.set_stages(og, &[Stage::new("Adult", &["imago", "mature"]), Stage::new("Larva", &[])])
        .unwrap();
    repo.insert_period_rule(&period(og, NaiveDate::from_ymd_opt(1990, 1, 1), &commit))
        .unwrap();
    repo.insert_phenology_rule(&PhenologyRule {
        org_group_id: og,
        organism_key: KEY.to_string(),
        stage: "Adult".to_string(),
        start: MonthDay::new(6, 8).unwrap(),
        end: MonthDay::new(10, 6).unwrap(),
        commit: commit.clone(),
    })
    .unwrap();
    repo.insert_tenkm_rule(&tenkm(og, &["13", "14"], &commit)).unwrap();
    repo.insert_additional_code(&AdditionalCode {
        org_group_id: og,
        code: 2,
        text: "Photograph required.".to_string(),
        commit: commit.clone(),
    })
    .unwrap();
    repo.insert_additional_rule(&AdditionalRule {
        org_group_id: og,
        organism_key: KEY.to_string(),
        code: 2,
        commit: commit.clone(),
    })
    .unwrap();

    let snapshot = repo.load_snapshot().unwrap();
    assert_eq!(snapshot.rule_count(), 4);
    assert_eq!(
        snapshot.find_org_group("brc", "MOTHS").map(|og| og.id),
        Some(og)
    );
    assert_eq!(snapshot.stages(og).len(), 2);
    assert!(snapshot.stages(og)[0].matches("Imago"));
    assert_eq!(
        snapshot.period_rules(KEY)[0].start_date,
        NaiveDate::from_ymd_opt(1990, 1, 1)
    );
    assert_eq!(snapshot.phenology_rules(KEY)[0].start.to_string(), "8/6");
    assert!(snapshot.tenkm_rules(KEY)[0].km10s.contains("14"));
    assert_eq!(snapshot.tenkm_org_groups().collect::<Vec<_>>(), vec![og]);
    assert_eq!(snapshot.additional_text(og, 2), Some("Photograph required."));
}

#[test]
fn purge_drops_rows_from_earlier_reloads() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Moths").unwrap();
    let other_og = repo.upsert_org_group("SRS", "Beetles").unwrap();

    let mut stale = period(og, NaiveDate::from_ymd_opt(1990, 1, 1), "c1");
    stale.organism_key = "NHMSYS0000000001".to_string();
    repo.insert_period_rule(&stale).unwrap();
    repo.insert_period_rule(&period(og, None, "c1")).unwrap();
    repo.insert_period_rule(&period(other_og, None, "c1")).unwrap();

    repo.insert_period_rule(&period(og, NaiveDate::from_ymd_opt(2000, 1, 1), "c2"))
        .unwrap();
    assert_eq!(repo.purge_stale(og, RuleType::Period, "c2").unwrap(), 1);

    let snapshot = repo.load_snapshot().unwrap();
    assert!(snapshot.period_rules("NHMSYS0000000001").is_empty());
    let rules = snapshot.period_rules(KEY);
    assert_eq!(rules.len(), 2);
    assert!(rules
        .iter()
        .any(|rule| rule.org_group_id == og && rule.commit == "c2"));
    assert!(rules.iter().any(|rule| rule.org_group_id == other_og));

    let watermarked = snapshot.org_group(og).unwrap();
    assert_eq!(watermarked.watermark(RuleType::Period), Some("c2"));
    assert_eq!(watermarked.watermark(RuleType::Tenkm), None);
}

#[test]
fn purge_rejects_unknown_org_groups_and_blank_commits() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.purge_stale(42, RuleType::Tenkm, "c1"),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        repo.purge_stale(42, RuleType::Tenkm, " "),
        Err(RepoError::Validation(RuleValidationError::EmptyCommit))
    ));
}

#[test]
fn invalid_rules_are_rejected_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Moths").unwrap();

    let mut inverted = period(og, NaiveDate::from_ymd_opt(2000, 1, 1), "c1");
    inverted.end_date = NaiveDate::from_ymd_opt(1990, 1, 1);
    assert!(matches!(
        repo.insert_period_rule(&inverted),
        Err(RepoError::Validation(RuleValidationError::InvertedPeriod { .. }))
    ));
    assert!(matches!(
        repo.insert_tenkm_rule(&tenkm(og, &["1A"], "c1")),
        Err(RepoError::Validation(RuleValidationError::InvalidKm10(_)))
    ));
    assert_eq!(repo.load_snapshot().unwrap().rule_count(), 0);
}

#[test]
fn reloaded_snapshot_replaces_the_published_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.db");
    let conn = open_db(&path).unwrap();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Moths").unwrap();

    repo.insert_tenkm_rule(&tenkm(og, &["13"], "c1")).unwrap();
    let handle = RuleSetHandle::new(repo.load_snapshot().unwrap());
    let in_flight = handle.current();

    repo.insert_tenkm_rule(&tenkm(og, &["57"], "c2")).unwrap();
    repo.purge_stale(og, RuleType::Tenkm, "c2").unwrap();
    drop(repo);
    drop(conn);

    let reopened = open_db(&path).unwrap();
    let reloaded = SqliteRuleRepository::try_new(&reopened)
        .unwrap()
        .load_snapshot()
        .unwrap();
    let previous = handle.replace(reloaded);

    assert!(previous.tenkm_rules(KEY)[0].km10s.contains("13"));
    assert!(in_flight.tenkm_rules(KEY)[0].km10s.contains("13"));
    assert!(handle.current().tenkm_rules(KEY)[0].km10s.contains("57"));
}

#[test]
fn taxa_persist_and_load_into_a_dictionary() {
    let conn = open_db_in_memory().unwrap();
    let taxa = SqliteTaxonRepository::try_new(&conn).unwrap();
    let accepted = Taxon {
        tvk: "NHMSYS0000530420".to_string(),
        preferred_tvk: "NHMSYS0000530420".to_string(),
        organism_key: KEY.to_string(),
        name: "Adalia bipunctata".to_string(),
        preferred_name: "Adalia bipunctata".to_string(),
    };
    let synonym = Taxon {
        tvk: "NBNSYS0000008319".to_string(),
        name: "Coccinella bipunctata".to_string(),
        ..accepted.clone()
    };
    taxa.insert_taxon(&accepted).unwrap();
    taxa.insert_taxon(&synonym).unwrap();

    assert_eq!(taxa.resolve("coccinella bipunctata").unwrap(), synonym);
    assert_eq!(taxa.get_by_tvk("nhmsys0000530420").unwrap(), Some(accepted.clone()));
    assert_eq!(taxa.find_by_name("Unknown species").unwrap(), None);

    let dictionary = taxa.load_dictionary().unwrap();
    assert_eq!(dictionary.len(), 2);
    assert_eq!(dictionary.resolve("Adalia bipunctata").unwrap(), accepted);
}
