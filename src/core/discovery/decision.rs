//! Run-or-schedule decision
//!
//! | Status                        | Pending schedule | Action               |
//! |-------------------------------|------------------|----------------------|
//! | none / completed / failed     | any              | run now              |
//! | processing                    | none             | schedule the request |
//! | processing                    | present          | drop the request     |
//!
//! Dropping is deliberate: while a run is in flight at most one follow-up is
//! queued, and the first request to claim that slot keeps it.

use super::coordinator::DiscoveryCoordinator;
use crate::domain::{
    DiscoveryRequest, DiscoveryStatus, HieNetwork, PatientKey, RequestId, Result,
    ScheduledDiscoveryRequest,
};
use std::sync::Arc;

/// What to do with a discovery request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RunNow,
    Schedule,
    KeepExisting,
}

/// Decide from the current status and pending schedule
pub fn decide(
    status: Option<DiscoveryStatus>,
    pending: Option<&ScheduledDiscoveryRequest>,
) -> Decision {
    match (status, pending) {
        (Some(DiscoveryStatus::Processing), None) => Decision::Schedule,
        (Some(DiscoveryStatus::Processing), Some(_)) => Decision::KeepExisting,
        _ => Decision::RunNow,
    }
}

/// Outcome of [`DiscoveryCoordinator::run_or_schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrScheduleOutcome {
    /// Driver launched in the background
    Started,
    /// Stored as the pending schedule
    Scheduled,
    /// A schedule already existed; the request was dropped
    AlreadyScheduled,
}

impl RunOrScheduleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOrScheduleOutcome::Started => "started",
            RunOrScheduleOutcome::Scheduled => "scheduled",
            RunOrScheduleOutcome::AlreadyScheduled => "already scheduled",
        }
    }
}

impl DiscoveryCoordinator {
    /// Run discovery now, or defer it behind the run in flight
    ///
    /// Reads the freshest record first; the caller's copy may be stale.
    ///
    /// # Errors
    ///
    /// Precondition errors only: `PatientNotFound`, `NetworkNotEnabled`, or a
    /// store failure while starting or scheduling.
    pub async fn run_or_schedule(
        self: &Arc<Self>,
        network: HieNetwork,
        key: &PatientKey,
        request: DiscoveryRequest,
    ) -> Result<RunOrScheduleOutcome> {
        let patient = self.store.get_patient(key).await?;
        let status = patient.external_data.status(network);
        let pending = patient.external_data.scheduled_pd_request(network);

        match decide(status, pending) {
            Decision::RunNow => {
                self.launch(network, &patient, request).await?;
                Ok(RunOrScheduleOutcome::Started)
            }
            Decision::Schedule => {
                let request_id = request.request_id.clone();
                match self
                    .scheduler
                    .schedule_while_processing(network, key, request.clone())
                    .await?
                {
                    Decision::Schedule => Ok(RunOrScheduleOutcome::Scheduled),
                    Decision::KeepExisting => {
                        log_dropped(network, key, &request_id);
                        Ok(RunOrScheduleOutcome::AlreadyScheduled)
                    }
                    // The run settled between the read and the lock
                    Decision::RunNow => {
                        let patient = self.store.get_patient(key).await?;
                        self.launch(network, &patient, request).await?;
                        Ok(RunOrScheduleOutcome::Started)
                    }
                }
            }
            Decision::KeepExisting => {
                log_dropped(network, key, &request.request_id);
                Ok(RunOrScheduleOutcome::AlreadyScheduled)
            }
        }
    }
}

fn log_dropped(network: HieNetwork, key: &PatientKey, request_id: &RequestId) {
    tracing::info!(
        network = %network,
        cx_id = %key.cx_id,
        patient_id = %key.patient_id,
        dropped_request_id = %request_id,
        "Discovery already scheduled, request dropped"
    );
}
