use std::env;
use std::time::Duration;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub devices_file: String,
    pub discovered_switches_file: String,
    pub inventory_file: String,
    pub dynamic_inventory_file: String,
    pub playbook_file: String,
    pub discover_playbook: String,
    pub log_file: String,
    pub core_switch: String,
    pub vlan_archive_dir: String,
    pub ansible_playbook_bin: String,
    pub ansible_bin: String,
    pub ssh_port: u16,
    pub ssh_timeout_secs: u64,
    pub workers: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            devices_file: get_env("DEVICES_FILE", "/devices/devices.json"),
            discovered_switches_file: get_env(
                "DISCOVERED_SWITCHES_FILE",
                "/devices/discovered_switches.json",
            ),
            inventory_file: get_env("INVENTORY_FILE", "/tmp/ansible_inventory.ini"),
            dynamic_inventory_file: get_env("DYNAMIC_INVENTORY_FILE", "/inventory.yml"),
            playbook_file: get_env("PLAYBOOK_FILE", "/switch_template.yml"),
            discover_playbook: get_env("DISCOVER_PLAYBOOK", "discover_switches.yml"),
            log_file: get_env("LOG_FILE", "/var/log/switch_auto_config.log"),
            core_switch: get_env("CORE_SWITCH", "192.168.1.1"),
            vlan_archive_dir: get_env("VLAN_ARCHIVE_DIR", ""),
            ansible_playbook_bin: get_env("ANSIBLE_PLAYBOOK_BIN", "ansible-playbook"),
            ansible_bin: get_env("ANSIBLE_BIN", "ansible"),
            ssh_port: get_env("SSH_PORT", "22").parse().unwrap_or(22),
            ssh_timeout_secs: get_env("SSH_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            workers: get_env("WORKERS", "1").parse().unwrap_or(1),
        }
    }

    /// SSH read/connect timeout as a Duration
    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_secs.max(1))
    }

    /// Worker count, never below one
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Archive directory, if archiving is enabled
    pub fn archive_dir(&self) -> Option<&str> {
        Some(self.vlan_archive_dir.as_str()).filter(|d| !d.is_empty())
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
