//! Integration tests for the cross-network orchestrator

mod common;

use common::{key, patient, patient_with, processing, FakeDriver, Harness};
use hie_orchestrator::core::discovery::{
    CrossHieOrchestrator, DiscoveryFlags, RunOrScheduleOutcome,
};
use hie_orchestrator::domain::{
    DiscoveryStatus, FacilityId, HieNetwork, RequestId, RequestIdGenerator,
};
use std::sync::Arc;

const CQ: HieNetwork = HieNetwork::Carequality;
const CW: HieNetwork = HieNetwork::CommonWell;

struct FixedIds(&'static str);

impl RequestIdGenerator for FixedIds {
    fn next_id(&self) -> RequestId {
        RequestId::new(self.0).unwrap()
    }
}

fn facility() -> FacilityId {
    FacilityId::new("fac-1").unwrap()
}

#[tokio::test]
async fn test_shared_generated_request_id() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator =
        CrossHieOrchestrator::with_id_generator(h.coordinator.clone(), Arc::new(FixedIds("gen-1")));

    let report = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;
    h.coordinator.wait_idle().await;

    assert_eq!(report.request_id.as_str(), "gen-1");
    assert_eq!(report.failures(), 0);
    assert_eq!(h.cq.request_ids(), vec!["gen-1".to_string()]);
    assert_eq!(h.cw.request_ids(), vec!["gen-1".to_string()]);
}

#[tokio::test]
async fn test_each_call_generates_a_fresh_id() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let first = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;
    h.coordinator.wait_idle().await;
    let second = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;
    h.coordinator.wait_idle().await;

    assert_ne!(first.request_id, second.request_id);
    assert_eq!(h.cq.calls().len(), 2);
}

#[tokio::test]
async fn test_given_request_id_is_used() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_or_schedule_across_networks(
            &key(),
            &facility(),
            &DiscoveryFlags::default(),
            Some(RequestId::new("caller-id").unwrap()),
        )
        .await;
    h.coordinator.wait_idle().await;

    assert_eq!(report.request_id.as_str(), "caller-id");
    assert_eq!(h.cw.request_ids(), vec!["caller-id".to_string()]);
}

#[tokio::test]
async fn test_failing_network_does_not_affect_the_other() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::failing(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_initial_discovery_across_networks(
            &patient(),
            &facility(),
            &DiscoveryFlags::default(),
            None,
        )
        .await;
    h.coordinator.wait_idle().await;

    // Both launches are acknowledged; the failure surfaces on the record
    assert_eq!(report.failures(), 0);
    let patient = h.patient().await;
    assert_eq!(
        patient.external_data.status(CQ),
        Some(DiscoveryStatus::Failed)
    );
    assert_eq!(
        patient.external_data.status(CW),
        Some(DiscoveryStatus::Completed)
    );
    assert_eq!(h.sink.errors().len(), 1);
}

#[tokio::test]
async fn test_initial_discovery_ignores_prior_state() {
    let h = Harness::new(
        vec![patient_with(CQ, processing("in-flight"))],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_initial_discovery_across_networks(
            &patient(),
            &facility(),
            &DiscoveryFlags::default(),
            Some(RequestId::new("initial").unwrap()),
        )
        .await;
    h.coordinator.wait_idle().await;

    assert!(matches!(
        report.outcome(CQ),
        Some(Ok(RunOrScheduleOutcome::Started))
    ));
    assert_eq!(h.cq.request_ids(), vec!["initial".to_string()]);
    assert_eq!(h.cw.request_ids(), vec!["initial".to_string()]);
}

#[tokio::test]
async fn test_run_or_schedule_decides_per_network() {
    let h = Harness::new(
        vec![patient_with(CW, processing("cw-in-flight"))],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;
    h.coordinator.wait_idle().await;

    assert!(matches!(
        report.outcome(CQ),
        Some(Ok(RunOrScheduleOutcome::Started))
    ));
    assert!(matches!(
        report.outcome(CW),
        Some(Ok(RunOrScheduleOutcome::Scheduled))
    ));
    assert!(h.cw.calls().is_empty());
    let scheduled = h.state(CW).await.scheduled_pd_request.unwrap();
    assert_eq!(scheduled.request_id, report.request_id);
}

#[tokio::test]
async fn test_flags_are_carried_into_requests() {
    let h = Harness::new(
        vec![patient()],
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());
    let flags = DiscoveryFlags {
        rerun_pd_on_new_demographics: true,
        org_id_exclude_list: Some(vec!["1.2.3".to_string()]),
        ..Default::default()
    };

    orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &flags, None)
        .await;
    h.coordinator.wait_idle().await;

    let request = &h.cq.calls()[0];
    assert!(request.rerun_pd_on_new_demographics);
    assert!(request.is_org_excluded("1.2.3"));
    assert!(!request.force_enabled);
}

#[tokio::test]
async fn test_disabled_network_is_skipped_unless_forced() {
    let h = Harness::with_enabled(
        vec![patient()],
        (FakeDriver::succeeding(CQ), true),
        (FakeDriver::succeeding(CW), false),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;
    h.coordinator.wait_idle().await;
    assert!(report.outcome(CW).is_none());
    assert!(h.cw.calls().is_empty());

    let forced = DiscoveryFlags {
        force_commonwell: true,
        ..Default::default()
    };
    let report = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &forced, None)
        .await;
    h.coordinator.wait_idle().await;
    assert!(matches!(
        report.outcome(CW),
        Some(Ok(RunOrScheduleOutcome::Started))
    ));
    assert!(h.cw.calls()[0].force_enabled);
}

#[tokio::test]
async fn test_missing_patient_is_reported_per_network() {
    let h = Harness::new(
        Vec::new(),
        FakeDriver::succeeding(CQ),
        FakeDriver::succeeding(CW),
    );
    let orchestrator = CrossHieOrchestrator::new(h.coordinator.clone());

    let report = orchestrator
        .run_or_schedule_across_networks(&key(), &facility(), &DiscoveryFlags::default(), None)
        .await;

    assert_eq!(report.failures(), 2);
    let contexts: Vec<String> = h.sink.errors().into_iter().map(|e| e.context.context).collect();
    assert!(contexts.contains(&"cq.run_or_schedule".to_string()));
    assert!(contexts.contains(&"cw.run_or_schedule".to_string()));
}
