use chrono::NaiveDate;
use occurrence_core::db::open_db_in_memory;
use occurrence_core::{
    DifficultyCode, DifficultyRule, HelmertProjector, MonthDay, OrgGroupRules, PhenologyRule,
    RecordInput, RecordOutput, RuleError, RuleRepository, RuleSetHandle, SqliteRuleRepository,
    SqliteTaxonRepository, Taxon, TaxonDictionary, TenkmRule, VerificationService, Verdict,
    VerifyConfig,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;

const KEY: &str = "NHMSYS0000530420";

type Service = VerificationService<TaxonDictionary, HelmertProjector>;

fn store() -> Connection {
    let conn = open_db_in_memory().unwrap();
    SqliteTaxonRepository::try_new(&conn)
        .unwrap()
        .insert_taxon(&Taxon {
            tvk: KEY.to_string(),
            preferred_tvk: KEY.to_string(),
            organism_key: KEY.to_string(),
            name: "Adalia bipunctata".to_string(),
            preferred_name: "Adalia bipunctata".to_string(),
        })
        .unwrap();
    conn
}

fn service(conn: &Connection, config: VerifyConfig) -> Service {
    let snapshot = SqliteRuleRepository::try_new(conn)
        .unwrap()
        .load_snapshot()
        .unwrap();
    let dictionary = SqliteTaxonRepository::try_new(conn)
        .unwrap()
        .load_dictionary()
        .unwrap();
    VerificationService::new(
        dictionary,
        HelmertProjector,
        Arc::new(RuleSetHandle::new(snapshot)),
        config,
    )
    .with_today(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap())
}

fn record(date: &str, gridref: &str) -> RecordInput {
    serde_json::from_value(json!({
        "id": 1,
        "date": date,
        "sref": { "srid": 27700, "gridref": gridref },
        "tvk": KEY,
    }))
    .unwrap()
}

fn add_phenology(repo: &SqliteRuleRepository<'_>, og: i64, start: (u32, u32), end: (u32, u32)) {
    repo.insert_phenology_rule(&PhenologyRule {
        org_group_id: og,
        organism_key: KEY.to_string(),
        stage: "*".to_string(),
        start: MonthDay::new(start.0, start.1).unwrap(),
        end: MonthDay::new(end.0, end.1).unwrap(),
        commit: "c1".to_string(),
    })
    .unwrap();
}

fn add_tenkm(repo: &SqliteRuleRepository<'_>, og: i64, km10: &str) {
    repo.insert_tenkm_rule(&TenkmRule {
        org_group_id: og,
        organism_key: KEY.to_string(),
        km100: "TL".to_string(),
        km10s: [km10.to_string()].into_iter().collect(),
        commit: "c1".to_string(),
    })
    .unwrap();
}

#[test]
fn phenology_window_boundary_is_inclusive() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Ladybirds").unwrap();
    add_phenology(&repo, og, (6, 8), (10, 6));
    let service = service(&conn, VerifyConfig::default());

    let early = service.verify(&record("07/06/1975", "TL1234"), None).unwrap();
    assert_eq!(early.result, Verdict::Fail);
    assert_eq!(
        early.messages,
        vec!["BRC:Ladybirds:phenology: Date is outside expected period of 8/6 - 6/10."]
    );

    let first_day = service.verify(&record("08/06/1975", "TL1234"), None).unwrap();
    assert_eq!(first_day.result, Verdict::Pass);
    assert!(first_day.messages.is_empty());
}

#[test]
fn summer_window_rejects_both_shoulders() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Ladybirds").unwrap();
    add_phenology(&repo, og, (6, 1), (10, 31));
    let strict = service(&conn, VerifyConfig::default());

    for date in ["15/05/2020", "30/11/2020"] {
        let output = strict.verify(&record(date, "TL1234"), None).unwrap();
        assert_eq!(output.result, Verdict::Fail, "{date}");
        assert_eq!(
            output.messages,
            vec!["BRC:Ladybirds:phenology: Date is outside expected period of 1/6 - 31/10."]
        );
    }
    let last_day = strict.verify(&record("31/10/2020", "TL1234"), None).unwrap();
    assert_eq!(last_day.result, Verdict::Pass);

    let config = VerifyConfig::from_toml("[phenology]\ntolerance_days = 7\n").unwrap();
    let tolerant = service(&conn, config);
    let close = tolerant.verify(&record("07/11/2020", "TL1234"), None).unwrap();
    assert_eq!(close.result, Verdict::Pass);
    assert_eq!(
        close.messages,
        vec!["BRC:Ladybirds:phenology: Date is CLOSE TO expected period of 1/6 - 31/10."]
    );
    let far = tolerant.verify(&record("08/11/2020", "TL1234"), None).unwrap();
    assert_eq!(far.result, Verdict::Fail);
    assert!(far.messages[0].contains("FAR FROM"));
}

#[test]
fn year_wrapping_windows_accept_winter_records() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let winter = repo.upsert_org_group("BRC", "Winter").unwrap();
    add_phenology(&repo, winter, (10, 1), (3, 31));
    let service = service(&conn, VerifyConfig::default());

    for date in ["15/12/2020", "10/02/2021"] {
        let output = service.verify(&record(date, "TL1234"), None).unwrap();
        assert_eq!(output.result, Verdict::Pass, "{date}");
    }
    let summer = service.verify(&record("15/06/2021", "TL1234"), None).unwrap();
    assert_eq!(summer.result, Verdict::Fail);
    assert!(summer.messages[0].ends_with("expected period of 1/10 - 31/3."));
}

#[test]
fn tolerance_separates_close_from_far() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let og = repo.upsert_org_group("BRC", "Ladybirds").unwrap();
    add_phenology(&repo, og, (6, 1), (10, 6));
    let config = VerifyConfig::from_toml("[phenology]\ntolerance_days = 10\n").unwrap();
    let service = service(&conn, config);

    let close = service.verify(&record("22/05/2020", "TL1234"), None).unwrap();
    assert_eq!(close.result, Verdict::Pass);
    assert_eq!(
        close.messages,
        vec!["BRC:Ladybirds:phenology: Date is CLOSE TO expected period of 1/6 - 6/10."]
    );

    let far = service.verify(&record("21/05/2020", "TL1234"), None).unwrap();
    assert_eq!(far.result, Verdict::Fail);
    assert!(far.messages[0].contains("FAR FROM"));
}

#[test]
fn highest_difficulty_wins_across_organisations() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let easy = repo.upsert_org_group("OrgA", "Ladybirds").unwrap();
    let hard = repo.upsert_org_group("OrgB", "Ladybirds").unwrap();
    for (og, difficulty) in [(easy, 1), (hard, 3)] {
        repo.insert_difficulty_rule(&DifficultyRule {
            org_group_id: og,
            organism_key: KEY.to_string(),
            difficulty,
            commit: "c1".to_string(),
        })
        .unwrap();
    }
    repo.insert_difficulty_code(&DifficultyCode {
        org_group_id: hard,
        difficulty: 3,
        text: "Needs expert examination.".to_string(),
        commit: "c1".to_string(),
    })
    .unwrap();
    let service = service(&conn, VerifyConfig::default());

    let output = service.verify(&record("5/6/2020", "TL1234"), None).unwrap();
    assert_eq!(output.result, Verdict::Pass);
    assert_eq!(output.id_difficulty, Some(3));
    assert_eq!(
        output.messages,
        vec![
            "OrgA:Ladybirds:difficulty: Identification difficulty is 1.",
            "OrgB:Ladybirds:difficulty: Identification difficulty is 3: Needs expert examination.",
        ]
    );
}

#[test]
fn tenkm_checks_the_record_square() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let known = repo.upsert_org_group("BRC", "Known").unwrap();
    add_tenkm(&repo, known, "13");
    let service_known = service(&conn, VerifyConfig::default());

    let inside = service_known.verify(&record("5/6/2020", "TL1234"), None).unwrap();
    assert_eq!(inside.sref.as_ref().and_then(|s| s.km10.as_deref()), Some("13"));
    assert_eq!(inside.result, Verdict::Pass);

    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let elsewhere = repo.upsert_org_group("BRC", "Elsewhere").unwrap();
    add_tenkm(&repo, elsewhere, "57");
    let service_elsewhere = service(&conn, VerifyConfig::default());

    let outside = service_elsewhere
        .verify(&record("5/6/2020", "TL1234"), None)
        .unwrap();
    assert_eq!(outside.result, Verdict::Fail);
    assert_eq!(
        outside.messages,
        vec!["BRC:Elsewhere:tenkm: Record is outside known area."]
    );

    let coarse = service_elsewhere.verify(&record("5/6/2020", "TL"), None).unwrap();
    assert_eq!(coarse.result, Verdict::Warn);
    assert_eq!(
        coarse.messages[0],
        "BRC:Elsewhere:tenkm: Record is too imprecise for a 10km check."
    );
}

#[test]
fn filters_select_org_groups_and_rule_types() {
    let conn = store();
    let repo = SqliteRuleRepository::try_new(&conn).unwrap();
    let moths = repo.upsert_org_group("BRC", "Ladybirds").unwrap();
    repo.upsert_org_group("SRS", "Beetles").unwrap();
    add_phenology(&repo, moths, (6, 8), (10, 6));
    add_tenkm(&repo, moths, "57");
    let service = service(&conn, VerifyConfig::default());
    let early = record("07/06/1975", "TL1234");

    let only_tenkm = [OrgGroupRules::parse("BRC:Ladybirds:tenkm").unwrap()];
    let output = service.verify(&early, Some(&only_tenkm)).unwrap();
    assert_eq!(output.messages, vec!["BRC:Ladybirds:tenkm: Record is outside known area."]);

    let beetles = [OrgGroupRules::parse("SRS:Beetles:phenology").unwrap()];
    let output = service.verify(&early, Some(&beetles)).unwrap();
    assert_eq!(output.result, Verdict::Warn);
    assert_eq!(
        output.messages,
        vec![
            "SRS:Beetles:phenology: There is no rule for this taxon.",
            "No rules run.",
        ]
    );

    let unknown = [OrgGroupRules::parse("BRC:Spiders").unwrap()];
    assert!(matches!(
        service.verify(&early, Some(&unknown)),
        Err(RuleError::UnknownOrgGroup { .. })
    ));
}

#[test]
fn batch_output_uses_camel_case_json() {
    let conn = store();
    let service = service(&conn, VerifyConfig::default());
    let records: Vec<RecordInput> = serde_json::from_value(json!([
        {
            "id": "a",
            "date": "June 2020",
            "sref": { "srid": 27700, "gridref": "tl 123 456" },
            "name": "adalia bipunctata",
            "stage": "adult",
        },
        {
            "id": "b",
            "date": "2020",
            "sref": { "srid": 4326, "lat": 52.2053, "lon": 0.1218, "accuracy": 1000 },
            "tvk": KEY,
        },
        {
            "id": "c",
            "date": "31/02/2020",
            "sref": { "srid": 27700, "gridref": "TL1234" },
            "tvk": KEY,
        },
    ]))
    .unwrap();

    let outputs = service.verify_batch(&records, None, None).unwrap();
    let value = serde_json::to_value(&outputs).unwrap();

    assert_eq!(value[0]["id"], "a");
    assert_eq!(value[0]["date"], "06/2020");
    assert_eq!(value[0]["preferredTvk"], KEY);
    assert_eq!(value[0]["stage"], "adult");
    assert_eq!(value[0]["sref"]["gridref"], "TL123456");
    assert_eq!(value[0]["sref"]["km10"], "14");
    assert_eq!(value[0]["result"], "warn");
    assert_eq!(value[1]["sref"]["srid"], 27700);
    assert_eq!(value[1]["sref"]["km100"], "TL");
    assert_eq!(value[2]["result"], "fail");
    assert_eq!(value[2]["date"], "31/02/2020");
    assert!(value[2].get("sref").is_none());

    let decoded: Vec<RecordOutput> = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, outputs);
}
