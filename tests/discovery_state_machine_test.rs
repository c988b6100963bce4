//! Integration tests for the per-network discovery state machine
//!
//! Covers run-or-schedule, progress processing and the chaining of
//! scheduled discoveries and deferred document queries.

mod common;

use common::{key, patient, patient_with, processing, request, settled, FakeDriver, Harness};
use hie_orchestrator::core::discovery::RunOrScheduleOutcome;
use hie_orchestrator::domain::{
    DiscoveryStatus, DocQueryProgressUpdate, HieNetwork, NetworkDiscoveryState, RequestId,
};
use std::sync::Arc;
use test_case::test_case;
use tokio::sync::Semaphore;

const CQ: HieNetwork = HieNetwork::Carequality;
const CW: HieNetwork = HieNetwork::CommonWell;

fn harness_with(network: HieNetwork, state: NetworkDiscoveryState) -> Harness {
    Harness::new(
        vec![patient_with(network, state)],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    )
}

#[tokio::test]
async fn test_no_prior_discovery_runs_driver_with_exact_request() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let req = request("req-1", "fac-1").with_rerun_pd_on_new_demographics(true);

    let outcome = h
        .coordinator
        .run_or_schedule(CQ, &key(), req.clone())
        .await
        .unwrap();
    assert_eq!(outcome, RunOrScheduleOutcome::Started);

    h.coordinator.wait_idle().await;

    assert_eq!(h.cq.calls(), vec![req]);
    assert!(h.cw.calls().is_empty());

    let state = h.state(CQ).await;
    assert_eq!(state.scheduled_pd_request, None);
    assert_eq!(state.discovery_status, Some(DiscoveryStatus::Completed));
    let params = state.discovery_params.unwrap();
    assert_eq!(params.request_id.as_str(), "req-1");
    assert!(params.rerun_pd_on_new_demographics);
}

#[tokio::test]
async fn test_processing_without_schedule_stores_request() {
    let h = harness_with(CW, processing("in-flight"));

    let outcome = h
        .coordinator
        .run_or_schedule(CW, &key(), request("toBeScheduled", "toBeScheduled"))
        .await
        .unwrap();
    assert_eq!(outcome, RunOrScheduleOutcome::Scheduled);

    assert!(h.cw.calls().is_empty());
    let state = h.state(CW).await;
    assert_eq!(
        state.scheduled_pd_request,
        Some(request("toBeScheduled", "toBeScheduled"))
    );
    assert_eq!(state.discovery_status, Some(DiscoveryStatus::Processing));
}

#[tokio::test]
async fn test_processing_with_schedule_keeps_existing_schedule() {
    let mut state = processing("in-flight");
    state.scheduled_pd_request = Some(request("scheduled", "fac-1"));
    let h = harness_with(CW, state);

    let outcome = h
        .coordinator
        .run_or_schedule(CW, &key(), request("toNotSchedule", "fac-2"))
        .await
        .unwrap();
    assert_eq!(outcome, RunOrScheduleOutcome::AlreadyScheduled);

    assert!(h.cw.calls().is_empty());
    let scheduled = h.state(CW).await.scheduled_pd_request.unwrap();
    assert_eq!(scheduled.request_id.as_str(), "scheduled");
}

#[tokio::test]
async fn test_completed_progress_runs_scheduled_discovery() {
    let mut state = processing("current");
    state.scheduled_pd_request = Some(request("next", "fac1"));
    let h = harness_with(CQ, state);

    let updated = h
        .coordinator
        .process_discovery_progress(CQ, &key(), DiscoveryStatus::Completed)
        .await
        .unwrap();
    assert_eq!(updated.external_data.scheduled_pd_request(CQ), None);

    h.coordinator.wait_idle().await;

    assert_eq!(h.cq.calls(), vec![request("next", "fac1")]);
    let state = h.state(CQ).await;
    assert_eq!(state.scheduled_pd_request, None);
    assert_eq!(state.discovery_status, Some(DiscoveryStatus::Completed));
    assert_eq!(
        state.discovery_params.unwrap().request_id.as_str(),
        "next"
    );
}

#[tokio::test]
async fn test_only_first_request_is_kept_while_processing() {
    let h = harness_with(CQ, processing("in-flight"));

    let mut outcomes = Vec::new();
    for id in ["first", "second", "third"] {
        outcomes.push(
            h.coordinator
                .run_or_schedule(CQ, &key(), request(id, "fac-1"))
                .await
                .unwrap(),
        );
    }

    assert_eq!(
        outcomes,
        vec![
            RunOrScheduleOutcome::Scheduled,
            RunOrScheduleOutcome::AlreadyScheduled,
            RunOrScheduleOutcome::AlreadyScheduled,
        ]
    );
    let scheduled = h.state(CQ).await.scheduled_pd_request.unwrap();
    assert_eq!(scheduled.request_id.as_str(), "first");
    assert!(h.cq.calls().is_empty());
}

#[test_case(None ; "never ran")]
#[test_case(Some(DiscoveryStatus::Completed) ; "completed")]
#[test_case(Some(DiscoveryStatus::Failed) ; "failed")]
#[tokio::test]
async fn test_settled_status_dispatches_immediately(status: Option<DiscoveryStatus>) {
    let state = match status {
        Some(status) => settled("previous", status),
        None => NetworkDiscoveryState::default(),
    };
    let h = harness_with(CW, state);

    let outcome = h
        .coordinator
        .run_or_schedule(CW, &key(), request("now", "fac-1"))
        .await
        .unwrap();
    assert_eq!(outcome, RunOrScheduleOutcome::Started);

    h.coordinator.wait_idle().await;
    assert_eq!(h.cw.request_ids(), vec!["now".to_string()]);
    assert_eq!(h.state(CW).await.scheduled_pd_request, None);
}

#[tokio::test]
async fn test_reset_schedule_is_idempotent() {
    let mut state = processing("in-flight");
    state.scheduled_pd_request = Some(request("scheduled", "fac-1"));
    let h = harness_with(CQ, state);
    let scheduler = h.coordinator.scheduler();

    let once = scheduler
        .reset_scheduled_patient_discovery(CQ, &key())
        .await
        .unwrap();
    let twice = scheduler
        .reset_scheduled_patient_discovery(CQ, &key())
        .await
        .unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.external_data.scheduled_pd_request(CQ), None);
    assert_eq!(
        twice.external_data.status(CQ),
        Some(DiscoveryStatus::Processing)
    );
}

#[test_case(DiscoveryStatus::Completed ; "completed")]
#[test_case(DiscoveryStatus::Failed ; "failed")]
#[tokio::test]
async fn test_terminal_status_clears_both_schedules(status: DiscoveryStatus) {
    let mut state = processing("current");
    state.scheduled_pd_request = Some(request("next", "fac-1"));
    state.scheduled_doc_query_request_id = Some(RequestId::new("dq-1").unwrap());
    state.scheduled_doc_query_trigger_consolidated = true;
    let h = harness_with(CW, state);

    h.coordinator
        .process_discovery_progress(CW, &key(), status)
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    let state = h.state(CW).await;
    assert_eq!(state.scheduled_pd_request, None);
    assert_eq!(state.scheduled_doc_query_request_id, None);
    assert!(!state.scheduled_doc_query_trigger_consolidated);
}

#[tokio::test]
async fn test_failed_progress_does_not_retry_scheduled_discovery() {
    let mut state = processing("current");
    state.scheduled_pd_request = Some(request("next", "fac-1"));
    state.scheduled_doc_query_request_id = Some(RequestId::new("dq-1").unwrap());
    let h = harness_with(CQ, state);

    h.coordinator
        .process_discovery_progress(CQ, &key(), DiscoveryStatus::Failed)
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    assert!(h.cq.calls().is_empty());
    assert_eq!(
        h.state(CQ).await.discovery_status,
        Some(DiscoveryStatus::Failed)
    );

    // The deferred query is marked failed, not started
    assert!(h.doc_query.started().is_empty());
    assert_eq!(
        h.doc_query.progress(),
        vec![(
            CQ,
            RequestId::new("dq-1").unwrap(),
            DocQueryProgressUpdate::failed()
        )]
    );
}

#[tokio::test]
async fn test_completed_progress_starts_deferred_doc_query() {
    let mut state = processing("current");
    state.scheduled_doc_query_request_id = Some(RequestId::new("dq-1").unwrap());
    state.scheduled_doc_query_trigger_consolidated = true;
    let h = harness_with(CW, state);

    h.coordinator
        .process_discovery_progress(CW, &key(), DiscoveryStatus::Completed)
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    assert_eq!(
        h.doc_query.started(),
        vec![(CW, RequestId::new("dq-1").unwrap(), true)]
    );
    assert!(h.doc_query.progress().is_empty());
}

#[tokio::test]
async fn test_processing_progress_keeps_schedules() {
    let mut state = processing("current");
    state.scheduled_pd_request = Some(request("next", "fac-1"));
    state.scheduled_doc_query_request_id = Some(RequestId::new("dq-1").unwrap());
    let h = harness_with(CQ, state);

    h.coordinator
        .process_discovery_progress(CQ, &key(), DiscoveryStatus::Processing)
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    let state = h.state(CQ).await;
    assert!(state.scheduled_pd_request.is_some());
    assert!(state.scheduled_doc_query_request_id.is_some());
    assert!(h.cq.calls().is_empty());
    assert!(h.doc_query.started().is_empty());
}

#[tokio::test]
async fn test_driver_failure_settles_run_as_failed() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::failing(CQ),
        FakeDriver::succeeding(CW),
    );

    h.coordinator
        .run_or_schedule(CQ, &key(), request("req-1", "fac-1"))
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    assert_eq!(
        h.state(CQ).await.discovery_status,
        Some(DiscoveryStatus::Failed)
    );

    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].context.context, "cq.patient.discover");
    assert_eq!(
        errors[0].context.request_id.as_ref().map(|r| r.as_str()),
        Some("req-1")
    );
}

#[tokio::test]
async fn test_progress_for_unknown_patient_is_captured_not_raised() {
    let h = Harness::new(
        Vec::new(),
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );

    let result = h
        .coordinator
        .process_discovery_progress(CQ, &key(), DiscoveryStatus::Completed)
        .await;

    assert!(result.is_none());
    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].context.context, "cq.process_discovery_progress");
}

#[tokio::test]
async fn test_progress_without_params_is_captured() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );

    let result = h
        .coordinator
        .process_discovery_progress(CW, &key(), DiscoveryStatus::Failed)
        .await;

    assert!(result.is_none());
    assert!(h.sink.errors()[0].message.contains("Missing discovery params"));
}

#[tokio::test]
async fn test_request_during_run_is_chained_after_it() {
    let gate = Arc::new(Semaphore::new(0));
    let h = Harness::new(
        vec![patient()],
        FakeDriver::gated(CQ, gate.clone()),
        FakeDriver::succeeding(CW),
    );

    let first = h
        .coordinator
        .run_or_schedule(CQ, &key(), request("first", "fac-1"))
        .await
        .unwrap();
    let second = h
        .coordinator
        .run_or_schedule(CQ, &key(), request("second", "fac-1"))
        .await
        .unwrap();
    assert_eq!(first, RunOrScheduleOutcome::Started);
    assert_eq!(second, RunOrScheduleOutcome::Scheduled);
    assert_eq!(
        h.state(CQ).await.discovery_status,
        Some(DiscoveryStatus::Processing)
    );

    gate.add_permits(2);
    h.coordinator.wait_idle().await;

    assert_eq!(
        h.cq.request_ids(),
        vec!["first".to_string(), "second".to_string()]
    );
    let state = h.state(CQ).await;
    assert_eq!(state.discovery_status, Some(DiscoveryStatus::Completed));
    assert_eq!(state.scheduled_pd_request, None);
    assert_eq!(state.discovery_params.unwrap().request_id.as_str(), "second");
}

#[tokio::test]
async fn test_networks_are_independent() {
    let h = harness_with(CQ, processing("cq-in-flight"));

    let cq = h
        .coordinator
        .run_or_schedule(CQ, &key(), request("req-1", "fac-1"))
        .await
        .unwrap();
    let cw = h
        .coordinator
        .run_or_schedule(CW, &key(), request("req-1", "fac-1"))
        .await
        .unwrap();
    h.coordinator.wait_idle().await;

    assert_eq!(cq, RunOrScheduleOutcome::Scheduled);
    assert_eq!(cw, RunOrScheduleOutcome::Started);
    assert!(h.cq.calls().is_empty());
    assert_eq!(h.cw.request_ids(), vec!["req-1".to_string()]);
    assert_eq!(
        h.state(CQ).await.discovery_status,
        Some(DiscoveryStatus::Processing)
    );
}

#[tokio::test]
async fn test_disabled_network_requires_force() {
    let h = Harness::with_enabled(
        vec![patient()],
        (FakeDriver::succeeding(CQ), true),
        (FakeDriver::succeeding(CW), false),
    );

    let err = h
        .coordinator
        .run_or_schedule(CW, &key(), request("req-1", "fac-1"))
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(h.state(CW).await.discovery_status, None);

    let outcome = h
        .coordinator
        .run_or_schedule(CW, &key(), request("req-2", "fac-1").with_force_enabled(true))
        .await
        .unwrap();
    assert_eq!(outcome, RunOrScheduleOutcome::Started);
    h.coordinator.wait_idle().await;
    assert_eq!(h.cw.request_ids(), vec!["req-2".to_string()]);
}
