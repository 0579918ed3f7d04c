use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "switch-autoconf",
    version,
    about = "Cisco switch discovery, inventory and VLAN provisioning"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Log file path (overrides LOG_FILE)")]
    pub log_file: Option<String>,
    #[arg(long, global = true, help = "Device address file (overrides DEVICES_FILE)")]
    pub devices: Option<String>,
    #[arg(long, global = true, help = "Core switch address (overrides CORE_SWITCH)")]
    pub core_switch: Option<String>,
    #[arg(long, global = true, help = "Concurrent device sessions (overrides WORKERS)")]
    pub workers: Option<usize>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ensure a VLAN exists on every switch and is carried by every trunk
    CreateVlan {
        #[arg(long, help = "VLAN id (1-4094); prompted when omitted")]
        vlan_id: Option<String>,
        #[arg(long, help = "VLAN name; prompted when omitted")]
        vlan_name: Option<String>,
    },
    /// Discover switches from the core switch and provision them
    AutoConfigure,
    /// Provision the switches listed in the device file
    DeployInventory,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.log_file {
            config.log_file = path.clone();
        }
        if let Some(path) = &self.devices {
            config.devices_file = path.clone();
        }
        if let Some(core) = &self.core_switch {
            config.core_switch = core.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_vlan_with_global_flags() {
        let cli = Cli::try_parse_from([
            "switch-autoconf",
            "create-vlan",
            "--vlan-id",
            "30",
            "--vlan-name",
            "sales",
            "--workers",
            "4",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.workers, Some(4));
        match cli.command {
            Commands::CreateVlan { vlan_id, vlan_name } => {
                assert_eq!(vlan_id.as_deref(), Some("30"));
                assert_eq!(vlan_name.as_deref(), Some("sales"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "switch-autoconf",
            "--devices",
            "/tmp/devices.json",
            "--core-switch",
            "10.9.9.9",
            "deploy-inventory",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::DeployInventory));

        let mut config = Config::load();
        cli.apply(&mut config);
        assert_eq!(config.devices_file, "/tmp/devices.json");
        assert_eq!(config.core_switch, "10.9.9.9");
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["switch-autoconf", "delete-vlan"]).is_err());
    }
}
