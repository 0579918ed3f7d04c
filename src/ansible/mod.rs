//! Ansible invocations used by the provisioning workflows.
//!
//! Every command runs from an argument vector, never through a shell, and exit status 0
//! is the only success signal.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::process::Stdio;
use tera::{Context, Tera};
use tokio::process::Command;

use crate::config::Config;

pub const IOS_COMMAND_MODULE: &str = "cisco.ios.ios_command";
pub const IOS_BANNER_MODULE: &str = "cisco.ios.ios_banner";

const BANNER_TEMPLATE: &str = "VLANs by switch
{%- for table in tables %}
--- {{ table.name }} ({{ table.address }}) ---
{{ table.output | trim }}
{%- endfor %}
";

/// Captured result of one finished process
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stderr when present, else stdout; used in failure messages
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnsibleError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status {exit_code}: {output}")]
    Failed {
        program: String,
        exit_code: i32,
        output: String,
    },
}

/// VLAN table retrieved from one switch
#[derive(Debug, Clone, Serialize)]
pub struct VlanTable {
    pub name: String,
    pub address: String,
    pub output: String,
}

/// Inline single-host inventory, as in `-i "10.0.0.1,"`
fn inline_inventory(address: &str) -> String {
    format!("{},", address)
}

pub fn discover_args(core_switch: &str, playbook: &str) -> Vec<String> {
    vec!["-i".into(), inline_inventory(core_switch), playbook.into()]
}

pub fn playbook_args(inventory: &str, playbook: &str) -> Vec<String> {
    vec!["-i".into(), inventory.into(), playbook.into()]
}

pub fn vlan_query_args(address: &str) -> Vec<String> {
    vec![
        "all".into(),
        "-i".into(),
        inline_inventory(address),
        "-m".into(),
        IOS_COMMAND_MODULE.into(),
        "-a".into(),
        "commands='show vlan brief'".into(),
    ]
}

/// Module arguments go as JSON so a multi-line banner survives intact
pub fn banner_args(core_switch: &str, banner: &str) -> Vec<String> {
    let module_args = json!({ "banner": "motd", "text": banner, "state": "present" });
    vec![
        "all".into(),
        "-i".into(),
        inline_inventory(core_switch),
        "-m".into(),
        IOS_BANNER_MODULE.into(),
        "-a".into(),
        module_args.to_string(),
    ]
}

/// Render one MOTD banner holding every retrieved VLAN table
pub fn render_banner(tables: &[VlanTable]) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("banner", BANNER_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("Invalid banner template: {}", e))?;

    let mut context = Context::new();
    context.insert("tables", tables);

    tera.render("banner", &context)
        .map_err(|e| anyhow::anyhow!("Banner rendering failed: {}", e))
}

/// Ansible runs ansible-playbook and ad-hoc ansible commands
#[derive(Debug, Clone)]
pub struct Ansible {
    playbook_bin: String,
    ansible_bin: String,
}

impl Ansible {
    pub fn new(playbook_bin: impl Into<String>, ansible_bin: impl Into<String>) -> Self {
        Self {
            playbook_bin: playbook_bin.into(),
            ansible_bin: ansible_bin.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ansible_playbook_bin, &config.ansible_bin)
    }

    async fn exec(&self, program: &str, args: &[String]) -> Result<ExecResult, AnsibleError> {
        tracing::debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AnsibleError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let result = ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.success() {
            Ok(result)
        } else {
            Err(AnsibleError::Failed {
                program: program.to_string(),
                exit_code: result.exit_code,
                output: result.diagnostics().to_string(),
            })
        }
    }

    /// Run the discovery playbook against the core switch
    pub async fn discover(&self, core_switch: &str, playbook: &str) -> Result<ExecResult, AnsibleError> {
        tracing::info!("Discovering switches from core switch {}", core_switch);
        self.exec(&self.playbook_bin, &discover_args(core_switch, playbook))
            .await
    }

    /// Push the configuration template playbook to every host of an inventory
    pub async fn run_playbook(&self, inventory: &str, playbook: &str) -> Result<ExecResult, AnsibleError> {
        tracing::info!("Running playbook {} with inventory {}", playbook, inventory);
        let result = self
            .exec(&self.playbook_bin, &playbook_args(inventory, playbook))
            .await?;
        tracing::info!("Ansible playbook executed successfully.");
        Ok(result)
    }

    /// Read `show vlan brief` from one switch; returns the captured stdout
    pub async fn retrieve_vlans(&self, address: &str) -> Result<String, AnsibleError> {
        let result = self.exec(&self.ansible_bin, &vlan_query_args(address)).await?;
        Ok(result.stdout)
    }

    /// Store every VLAN table on the core switch as a single MOTD banner
    pub async fn store_vlans_in_core(&self, core_switch: &str, tables: &[VlanTable]) -> Result<ExecResult> {
        let banner = render_banner(tables)?;
        tracing::info!(
            "Storing VLANs from {} switch(es) in core switch ({})",
            tables.len(),
            core_switch
        );
        Ok(self.exec(&self.ansible_bin, &banner_args(core_switch, &banner)).await?)
    }
}
