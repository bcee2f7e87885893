//! Full runs against the simulated engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use consistency_probe::client::{SimClient, SimProfile, WorkflowClient};
use consistency_probe::config::ProbeConfig;
use consistency_probe::harness::Harness;
use consistency_probe::model::{Page, RecordFilter, Sort};

fn config(trials: u32) -> ProbeConfig {
    ProbeConfig {
        trials,
        fixtures: vec![PathBuf::from("fixtures/test-tasks-query.bpmn")],
        ..ProbeConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn lagging_but_consistent_engine_passes_every_trial() {
    let sim = Arc::new(SimClient::new(SimProfile {
        materialize_after: Duration::from_millis(1200),
        ..SimProfile::default()
    }));
    let report = Harness::new(sim.clone(), config(10)).unwrap().run().await.unwrap();

    assert_eq!(report.successes, 10);
    assert_eq!(report.tag_not_echoed, 0);
    assert_eq!(report.buckets.total(), 0);
    assert_eq!(sim.cancellations(), 10);
    assert_eq!(sim.live_units(), 0);
}

#[tokio::test(start_paused = true)]
async fn injected_inconsistencies_are_bucketed() {
    let sim = Arc::new(SimClient::new(SimProfile {
        materialize_after: Duration::from_millis(300),
        point_read_missing_every: Some(5),
        data_error_every: Some(7),
        data_empty_every: Some(4),
        ..SimProfile::default()
    }));
    let report = Harness::new(sim.clone(), config(20)).unwrap().run().await.unwrap();

    // 5, 10, 15, 20 fail the point read before their data is ever queried.
    assert_eq!(report.buckets.point_read_failed.len(), 4);
    // 7, 14
    assert_eq!(report.buckets.data_query_failed.len(), 2);
    // 4, 8, 12, 16 (20 already failed its point read)
    assert_eq!(report.buckets.data_empty.len(), 4);
    assert_eq!(report.successes, 10);
    assert_eq!(report.classified(), 20);
    assert_eq!(sim.live_units(), 0);
}

#[tokio::test(start_paused = true)]
async fn read_lag_beyond_search_lag_shows_up_as_point_read_failures() {
    let sim = Arc::new(SimClient::new(SimProfile {
        materialize_after: Duration::from_millis(100),
        point_read_after: Duration::from_secs(2),
        ..SimProfile::default()
    }));
    let report = Harness::new(sim, config(3)).unwrap().run().await.unwrap();

    assert_eq!(report.buckets.point_read_failed.len(), 3);
    assert!(report.buckets.point_read_failed[0].error.contains("404"));
}

#[tokio::test(start_paused = true)]
async fn record_invisible_until_materialized_and_after_cancel() {
    let sim = SimClient::new(SimProfile {
        materialize_after: Duration::from_millis(500),
        ..SimProfile::default()
    });
    let deployment = sim
        .deploy_fixtures(&[PathBuf::from("fixtures/test-tasks-query.bpmn")])
        .await
        .unwrap();
    let definition = &deployment.primary().unwrap().id;
    assert_eq!(definition, "test-tasks-query");

    let unit = sim.create_unit_of_work(definition, "queryTag", "t-1").await.unwrap();
    let filter = RecordFilter {
        owner: unit.key.clone(),
        state: "CREATED".into(),
    };
    let sort = [Sort::asc("creationDate")];

    assert!(sim.search_derived(&filter, &sort, Page::first(10)).await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(500)).await;
    let found = sim.search_derived(&filter, &sort, Page::first(10)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].owner, unit.key);

    let data = sim.search_derived_data(&found[0].key, &[Sort::asc("name")]).await.unwrap();
    assert_eq!(data[0].value, "\"t-1\"");

    sim.cancel_unit_of_work(&unit.key).await.unwrap();
    assert!(sim.search_derived(&filter, &sort, Page::first(10)).await.unwrap().is_empty());
    let again = sim.cancel_unit_of_work(&unit.key).await.unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn create_against_unknown_definition_fails() {
    let sim = SimClient::new(SimProfile::default());
    let err = sim.create_unit_of_work("missing", "queryTag", "t").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deployment_needs_a_process_resource() {
    let sim = SimClient::new(SimProfile::default());
    let err = sim
        .deploy_fixtures(&[PathBuf::from("fixtures/test-basic-form.form")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no process resources"));
}
