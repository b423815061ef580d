//! Integration tests for Callwise
//!
//! These tests verify the integration between crates:
//! - callwise-store + callwise-core: seeding, imports and ranking
//! - callwise-crew + callwise-llm: the shipped crew definitions end to end

use std::path::PathBuf;
use std::sync::Arc;

use callwise_core::{
    parse_customers_csv, rank, NewBusinessCard, NewCallRecord, NewCustomer, ScoringPolicy,
};
use callwise_crew::{Crew, CrewInputs, CrewSettings, CrewSpec, Models, RunLog};
use callwise_llm::MockProvider;
use callwise_store::{CustomerStore, SeedOptions, SeedOutcome};
use chrono::NaiveDate;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

// ============================================================================
// Store + scoring
// ============================================================================

#[tokio::test]
async fn test_seeded_database_ranks_every_customer() {
    let dir = TempDir::new().unwrap();
    let store = CustomerStore::from_path(&dir.path().join("callwise.db"))
        .await
        .unwrap();

    let today = date(2026, 4, 1);
    let options = SeedOptions {
        customers: 25,
        today,
        rng_seed: 7,
    };
    assert!(matches!(
        store.seed_demo(&options).await.unwrap(),
        SeedOutcome::Seeded { customers: 25, .. }
    ));
    assert!(matches!(
        store.seed_demo(&options).await.unwrap(),
        SeedOutcome::Skipped { existing: 25 }
    ));

    let snapshot = store.priority_snapshot().await.unwrap();
    let ranked = rank(&snapshot.customers, &snapshot.latest_contact, today);
    assert_eq!(ranked.len(), 25);
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(ranked.iter().all(|r| r.days_since_last_contact >= 1));

    store.close().await;
}

#[tokio::test]
async fn test_call_logging_changes_priority() {
    let store = CustomerStore::in_memory().await.unwrap();
    let today = date(2026, 4, 1);

    let big = store
        .create_customer(NewCustomer::new("Yamada", "Yamada Trading").with_purchase(2_000_000.0, None))
        .await
        .unwrap();
    let small = store
        .create_customer(NewCustomer::new("Kondo", "Kondo Farm").with_purchase(10_000.0, None))
        .await
        .unwrap();

    let snapshot = store.priority_snapshot().await.unwrap();
    let ranked = rank(&snapshot.customers, &snapshot.latest_contact, today);
    assert_eq!(ranked[0].customer_id, big.customer_id);

    // A call yesterday pushes the big account's recency bonus to 100
    store
        .add_call_record(NewCallRecord {
            customer_id: big.customer_id,
            call_date: date(2026, 3, 31),
            call_result: "Follow-up booked".to_string(),
            call_duration: None,
        })
        .await
        .unwrap();
    store
        .add_call_record(NewCallRecord {
            customer_id: small.customer_id,
            call_date: date(2026, 3, 30),
            call_result: "Absent".to_string(),
            call_duration: Some("1min".to_string()),
        })
        .await
        .unwrap();

    let snapshot = store.priority_snapshot().await.unwrap();
    let ranked = rank(&snapshot.customers, &snapshot.latest_contact, today);
    let big_row = ranked.iter().find(|r| r.customer_id == big.customer_id).unwrap();
    let small_row = ranked.iter().find(|r| r.customer_id == small.customer_id).unwrap();
    assert_eq!(big_row.days_since_last_contact, 1);
    assert_eq!(big_row.score, 2100.0);
    assert_eq!(small_row.days_since_last_contact, 2);
    assert_eq!(small_row.score, 60.0);
}

#[tokio::test]
async fn test_import_then_card_capture() {
    let store = CustomerStore::in_memory().await.unwrap();

    let csv = "customer_name,company_name,contact_number,total_purchase,last_purchase_date\n\
               Hayashi,Hayashi Glass,03-1234-5678,450000,2025-11-20\n\
               Ogawa,Ogawa Denki,,not-a-number,\n\
               Hayashi Jr,Hayashi Glass,,1,\n";
    let batch = parse_customers_csv(csv.as_bytes()).unwrap();
    assert_eq!(batch.rows.len(), 2);
    assert_eq!(batch.skipped, 1);

    let outcome = store.import_customers(batch.rows).await.unwrap();
    assert_eq!(outcome.imported, 2);

    let ogawa = store.find_by_company("Ogawa Denki").await.unwrap().unwrap();
    assert_eq!(ogawa.total_purchase, 0.0);
    assert_eq!(ogawa.last_contact_method.as_deref(), Some("CSV import"));

    let card = store
        .register_card(NewBusinessCard {
            company_name: "Ogawa Denki".to_string(),
            personal_name: "Ogawa Ken".to_string(),
            email: Some("ken@ogawa.example".to_string()),
            contact_number: None,
            address: None,
        })
        .await
        .unwrap();
    assert_eq!(card.customer_id, ogawa.customer_id);
    assert!(!card.created_customer);
    assert_eq!(store.cards_for(ogawa.customer_id).await.unwrap().len(), 1);

    // A re-import of the same file only skips
    let again = store
        .import_customers(parse_customers_csv(csv.as_bytes()).unwrap().rows)
        .await
        .unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 2);
    assert_eq!(store.count_customers().await.unwrap(), 2);
}

#[test]
fn test_default_scoring_policy() {
    let policy = ScoringPolicy::default();
    assert_eq!(policy.never_contacted_days, 365);
    assert_eq!(policy.min_days, 1);
}

// ============================================================================
// Crew
// ============================================================================

#[test]
fn test_shipped_crew_definitions_are_valid() {
    let spec = CrewSpec::load(repo_path("config/crew")).unwrap();
    assert_eq!(spec.agents().len(), 6);
    let ids: Vec<&str> = spec.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "requirements_task",
            "architecture_task",
            "design_task",
            "development_task",
            "qa_task",
            "infra_task"
        ]
    );
    assert_eq!(spec.tool_servers(), vec!["mermaid".to_string(), "stitch".to_string()]);
}

#[tokio::test]
async fn test_shipped_crew_runs_end_to_end() {
    let dir = TempDir::new().unwrap();
    let spec = CrewSpec::load(repo_path("config/crew")).unwrap();

    let provider = MockProvider::new();
    for id in spec.tasks().iter().map(|t| t.id.clone()).collect::<Vec<_>>() {
        provider.add_text(format!("# {}\n\ndone", id));
    }

    let settings = CrewSettings {
        output_dir: dir.path().join("docs"),
        max_rpm: 0,
        agent_max_rpm: 0,
        ..CrewSettings::default()
    };
    let crew = Crew::new(spec, Models::uniform(Arc::new(provider.clone()), "mock-model"), &settings);

    let inputs = CrewInputs::standard(repo_path("knowledge/project_context.md"), 2026).unwrap();
    let output = crew.kickoff(&inputs).await.unwrap();

    assert_eq!(output.tasks.len(), 6);
    assert_eq!(output.final_output(), Some("# infra_task\n\ndone"));
    for file in [
        "requirements.md",
        "architecture.md",
        "design.md",
        "development.md",
        "qa.md",
        "infra.md",
    ] {
        assert!(dir.path().join("docs").join(file).exists(), "{} missing", file);
    }

    // The QA task sees the requirements and development outputs
    let requests = provider.requests();
    assert_eq!(requests.len(), 6);
    let qa_prompt = &requests[4].messages.last().unwrap().content;
    assert!(qa_prompt.contains("# requirements_task"));
    assert!(qa_prompt.contains("# development_task"));
    assert!(!qa_prompt.contains("# design_task"));

    let log = RunLog::load(&dir.path().join("docs")).await.unwrap().unwrap();
    assert_eq!(log.tasks.len(), 6);
    assert_eq!(log.inputs.get("current_year"), Some("2026"));
}
