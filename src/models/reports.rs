use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::VlanTarget;

/// What reconciliation did about the VLAN itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanAction {
    AlreadyPresent,
    Created,
}

/// What reconciliation did about one trunk port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrunkAction {
    /// No allowed list configured, so every VLAN is already forwarded
    ImplicitAllowAll,
    AlreadyAllowed,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrunkResult {
    pub port: String,
    pub action: TrunkAction,
}

/// ReconcileReport describes everything reconciliation observed and changed on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub hostname: String,
    pub vlan: VlanAction,
    pub trunks: Vec<TrunkResult>,
    pub skipped_ports: usize,
    /// Configuration transactions issued (0 when the device was already compliant)
    pub transactions: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.transactions > 0
    }

    pub fn trunks_added(&self) -> usize {
        self.trunks
            .iter()
            .filter(|t| t.action == TrunkAction::Added)
            .count()
    }
}

/// DeviceOutcome is the per-device result recorded in the run summary
#[derive(Debug, Clone, Serialize)]
pub struct DeviceOutcome {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconcileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceOutcome {
    pub fn succeeded(name: &str, address: &str, report: ReconcileReport) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(name: &str, address: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            report: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// RunSummary aggregates every device outcome of a create-vlan run, in device order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub target: VlanTarget,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<DeviceOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.report.as_ref())
            .filter(|r| r.changed())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Canonical provisioning step names
pub mod step {
    pub const DISCOVER: &str = "discover";
    pub const LOAD_DEVICES: &str = "load_devices";
    pub const INVENTORY: &str = "inventory";
    pub const PLAYBOOK: &str = "playbook";
    pub const RETRIEVE_VLANS: &str = "retrieve_vlans";
    pub const ARCHIVE_LOCAL: &str = "archive_local";
    pub const STORE_IN_CORE: &str = "store_in_core";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed { reason: String },
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        StepOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// ProvisionReport records each orchestration step of auto-configure / deploy-inventory
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub run_id: Uuid,
    pub workflow: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
}

impl ProvisionReport {
    pub fn new(run_id: Uuid, workflow: &str) -> Self {
        Self {
            run_id,
            workflow: workflow.to_string(),
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, outcome: StepOutcome) {
        self.steps.push(StepRecord {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }

    pub fn is_success(&self) -> bool {
        !self
            .steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }
}
