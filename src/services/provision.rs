//! auto-configure and deploy-inventory workflows.
//!
//! Each step is recorded in a [`ProvisionReport`]. A failed step is logged and the run
//! continues; only steps that depend on missing input are skipped.

use uuid::Uuid;

use super::VlanArchive;
use crate::ansible::{Ansible, VlanTable};
use crate::config::Config;
use crate::inventory;
use crate::models::{step, DeviceList, ProvisionReport, StepOutcome};

pub const AUTO_CONFIGURE: &str = "auto-configure";
pub const DEPLOY_INVENTORY: &str = "deploy-inventory";

/// Inventory flavor generated for the template push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InventoryFormat {
    /// `[cisco_switches]` INI file
    Ini,
    /// JSON-as-YAML host document
    Dynamic,
}

/// Provisioner drives the Ansible-based provisioning workflows
pub struct Provisioner {
    config: Config,
    ansible: Ansible,
}

impl Provisioner {
    pub fn new(config: Config, ansible: Ansible) -> Self {
        Self { config, ansible }
    }

    /// Discover switches via the core switch, then provision them from a dynamic inventory
    pub async fn auto_configure(&self, run_id: Uuid) -> ProvisionReport {
        let mut report = ProvisionReport::new(run_id, AUTO_CONFIGURE);

        // Step 1: discovery (a stale discovered file may still be usable on failure)
        let outcome = match self
            .ansible
            .discover(&self.config.core_switch, &self.config.discover_playbook)
            .await
        {
            Ok(_) => StepOutcome::Succeeded,
            Err(e) => {
                tracing::error!("Switch discovery failed: {}", e);
                StepOutcome::failed(e.to_string())
            }
        };
        report.record(step::DISCOVER, outcome);

        let devices = inventory::load_devices(&self.config.discovered_switches_file).await;
        self.provision(&mut report, &devices, InventoryFormat::Dynamic)
            .await;
        report
    }

    /// Provision the switches listed in the static device file from an INI inventory
    pub async fn deploy_inventory(&self, run_id: Uuid) -> ProvisionReport {
        let mut report = ProvisionReport::new(run_id, DEPLOY_INVENTORY);

        let devices = inventory::load_devices(&self.config.devices_file).await;
        self.provision(&mut report, &devices, InventoryFormat::Ini).await;
        report
    }

    async fn provision(&self, report: &mut ProvisionReport, devices: &DeviceList, format: InventoryFormat) {
        if devices.is_empty() {
            tracing::error!("No valid switches to configure, skipping remaining steps");
            report.record(step::LOAD_DEVICES, StepOutcome::failed("no switches loaded"));
            for name in [
                step::INVENTORY,
                step::PLAYBOOK,
                step::RETRIEVE_VLANS,
                step::ARCHIVE_LOCAL,
                step::STORE_IN_CORE,
            ] {
                report.record(name, StepOutcome::skipped("no switches loaded"));
            }
            return;
        }
        report.record(step::LOAD_DEVICES, StepOutcome::Succeeded);

        // Step 2: inventory
        let inventory_path = match format {
            InventoryFormat::Ini => &self.config.inventory_file,
            InventoryFormat::Dynamic => &self.config.dynamic_inventory_file,
        };
        let written = match format {
            InventoryFormat::Ini => inventory::write_ini_inventory(inventory_path, devices).await,
            InventoryFormat::Dynamic => {
                inventory::write_dynamic_inventory(inventory_path, devices).await
            }
        };

        // Step 3: template push
        match written {
            Ok(()) => {
                report.record(step::INVENTORY, StepOutcome::Succeeded);
                let outcome = match self
                    .ansible
                    .run_playbook(inventory_path, &self.config.playbook_file)
                    .await
                {
                    Ok(_) => StepOutcome::Succeeded,
                    Err(e) => {
                        tracing::error!("Error running playbook: {}", e);
                        StepOutcome::failed(e.to_string())
                    }
                };
                report.record(step::PLAYBOOK, outcome);
            }
            Err(e) => {
                tracing::error!("Failed to write inventory {}: {}", inventory_path, e);
                report.record(step::INVENTORY, StepOutcome::failed(e.to_string()));
                report.record(
                    step::PLAYBOOK,
                    StepOutcome::skipped("inventory not written"),
                );
            }
        }

        // Step 4: VLAN read-back
        let tables = self.retrieve_vlans(report, devices).await;

        // Step 5: local archive
        let outcome = match (self.config.archive_dir(), tables.is_empty()) {
            (None, _) => StepOutcome::skipped("VLAN_ARCHIVE_DIR not set"),
            (Some(_), true) => StepOutcome::skipped("no VLAN data"),
            (Some(dir), false) => archive_tables(&VlanArchive::new(dir), &tables).await,
        };
        report.record(step::ARCHIVE_LOCAL, outcome);

        // Step 6: archival on the core switch
        let outcome = if tables.is_empty() {
            tracing::error!("No VLAN data to store.");
            StepOutcome::skipped("no VLAN data")
        } else {
            match self
                .ansible
                .store_vlans_in_core(&self.config.core_switch, &tables)
                .await
            {
                Ok(_) => {
                    tracing::info!("Stored VLANs for {} switch(es) in core switch", tables.len());
                    StepOutcome::Succeeded
                }
                Err(e) => {
                    tracing::error!("Failed to store VLANs in core switch: {}", e);
                    StepOutcome::failed(e.to_string())
                }
            }
        };
        report.record(step::STORE_IN_CORE, outcome);
    }

    async fn retrieve_vlans(&self, report: &mut ProvisionReport, devices: &DeviceList) -> Vec<VlanTable> {
        let mut tables = Vec::new();
        let mut failures = 0;

        for device in devices {
            tracing::info!("Retrieving VLAN info from {} ({})...", device.name, device.address);
            match self.ansible.retrieve_vlans(&device.address).await {
                Ok(output) => tables.push(VlanTable {
                    name: device.name.clone(),
                    address: device.address.clone(),
                    output,
                }),
                Err(e) => {
                    tracing::error!("Error retrieving VLANs from {}: {}", device.name, e);
                    failures += 1;
                }
            }
        }

        let outcome = if failures == 0 {
            StepOutcome::Succeeded
        } else {
            StepOutcome::failed(format!(
                "{} of {} switch(es) failed",
                failures,
                devices.len()
            ))
        };
        report.record(step::RETRIEVE_VLANS, outcome);
        tables
    }
}

async fn archive_tables(archive: &VlanArchive, tables: &[VlanTable]) -> StepOutcome {
    let mut failures = 0;
    for table in tables {
        if let Err(e) = archive.save(&table.name, &table.output).await {
            tracing::error!("Failed to archive VLANs for {}: {}", table.name, e);
            failures += 1;
        }
    }
    if failures == 0 {
        tracing::info!("Archived {} VLAN table(s) to {}", tables.len(), archive.dir().display());
        StepOutcome::Succeeded
    } else {
        StepOutcome::failed(format!("{} archive write(s) failed", failures))
    }
}
