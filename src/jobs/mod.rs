use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::device::{Connector, DeviceError, Switch};
use crate::models::*;
use crate::reconcile::reconcile;

/// VlanJob runs VLAN reconciliation across a device list and aggregates the outcomes
pub struct VlanJob<C: Connector> {
    connector: Arc<C>,
    credentials: Arc<Credentials>,
    target: Arc<VlanTarget>,
    workers: usize,
}

impl<C: Connector> VlanJob<C> {
    pub fn new(connector: C, credentials: Credentials, target: VlanTarget, workers: usize) -> Self {
        Self {
            connector: Arc::new(connector),
            credentials: Arc::new(credentials),
            target: Arc::new(target),
            workers: workers.max(1),
        }
    }

    /// Run every device, in file order. A failing device never stops the run.
    pub async fn run(&self, run_id: Uuid, devices: &DeviceList) -> RunSummary {
        let started_at = Utc::now();
        tracing::info!(
            "Reconciling VLAN {} ({}) on {} device(s) with {} worker(s)",
            self.target.id,
            self.target.name,
            devices.len(),
            self.workers
        );

        // Results come back in device order even when several sessions are in flight
        let outcomes: Vec<DeviceOutcome> = stream::iter(devices.iter().cloned())
            .map(|device| self.process_device(device))
            .buffered(self.workers)
            .inspect(|outcome| log_outcome(outcome, self.target.id))
            .collect()
            .await;

        let summary = RunSummary {
            run_id,
            target: (*self.target).clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        tracing::info!(
            "Run complete: {} succeeded, {} failed, {} changed",
            summary.succeeded(),
            summary.failed(),
            summary.changed()
        );
        summary
    }

    async fn process_device(&self, device: Device) -> DeviceOutcome {
        let connector = Arc::clone(&self.connector);
        let credentials = Arc::clone(&self.credentials);
        let target = Arc::clone(&self.target);
        let address = device.address.clone();

        // Blocking threads do not inherit the dispatcher or the current span
        let span = tracing::info_span!("device", name = %device.name, address = %device.address);
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        let result = tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                let _entered = span.enter();
                reconcile_device(connector.as_ref(), &address, &credentials, &target)
            })
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))
        .and_then(|r| r.map_err(|e| e.to_string()));

        match result {
            Ok(report) => DeviceOutcome::succeeded(&device.name, &device.address, report),
            Err(e) => DeviceOutcome::failed(&device.name, &device.address, e),
        }
    }
}

/// Open a session, reconcile, and release the session on every path. Blocking.
fn reconcile_device<C: Connector>(
    connector: &C,
    address: &str,
    credentials: &Credentials,
    target: &VlanTarget,
) -> Result<ReconcileReport, DeviceError> {
    let channel = connector.connect(address, credentials)?;
    let mut switch = Switch::new(channel);
    reconcile(&mut switch, target)
}

/// Log one device's changes and result. Called in device order.
fn log_outcome(outcome: &DeviceOutcome, vlan: VlanId) {
    match (&outcome.report, &outcome.error) {
        (Some(report), _) => {
            if report.vlan == VlanAction::Created {
                tracing::info!("{} ({}): created VLAN {}", outcome.name, outcome.address, vlan);
            }
            for trunk in report.trunks.iter().filter(|t| t.action == TrunkAction::Added) {
                tracing::info!(
                    "{} ({}): allowed VLAN {} on trunk {}",
                    outcome.name,
                    outcome.address,
                    vlan,
                    trunk.port
                );
            }
            tracing::info!(
                "{} ({}) hostname={} vlan={:?} trunks_added={} trunks_checked={} ports_skipped={}",
                outcome.name,
                outcome.address,
                report.hostname,
                report.vlan,
                report.trunks_added(),
                report.trunks.len(),
                report.skipped_ports
            )
        }
        (None, error) => tracing::error!(
            "{} ({}) failed: {}",
            outcome.name,
            outcome.address,
            error.as_deref().unwrap_or("unknown error")
        ),
    }
}
