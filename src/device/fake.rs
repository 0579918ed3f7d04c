//! In-memory IOS device for tests. Renders `show` output in the same layout as a
//! Catalyst and interprets the configuration lines this crate sends.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{commands, CommandChannel, Connector};
use crate::models::Credentials;
use crate::ssh::SessionError;

const STATUS_HEADER: &str = "Port      Name               Status       Vlan       Duplex  Speed Type";

#[derive(Debug, Clone)]
struct FakeInterface {
    port: String,
    mode: String,
    allowed: Option<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    hostname: String,
    vlans: BTreeMap<u16, String>,
    interfaces: Vec<FakeInterface>,
    commands: Vec<String>,
    config_sets: Vec<Vec<String>>,
    reject_line: Option<String>,
    ignore_vlan_creation: bool,
    failing_command: Option<String>,
    open_sessions: usize,
}

impl FakeState {
    fn interface_mut(&mut self, port: &str) -> Option<&mut FakeInterface> {
        self.interfaces.iter_mut().find(|i| i.port == port)
    }

    fn render_vlan_brief(&self) -> String {
        let mut out = String::from(
            "VLAN Name                             Status    Ports\n\
             ---- -------------------------------- --------- -------------------------------\n",
        );
        for (id, name) in &self.vlans {
            out.push_str(&format!("{:<4} {:<32} {:<9}\n", id, name, "active"));
        }
        out
    }

    fn render_interfaces_status(&self) -> String {
        let mut out = format!("{}\n", STATUS_HEADER);
        for iface in &self.interfaces {
            out.push_str(&format!(
                "{:<10}{:<19}{:<13}{:<11}a-full a-1000 10/100/1000BaseTX\n",
                iface.port, "", "connected", iface.mode
            ));
        }
        out
    }

    fn render_allowed(&self, port: &str) -> String {
        match self.interfaces.iter().find(|i| i.port == port) {
            Some(FakeInterface { allowed: Some(list), .. }) => {
                format!(" switchport trunk allowed vlan {}\n", list)
            }
            Some(_) => String::new(),
            None => "% Invalid input detected at '^' marker.\n".to_string(),
        }
    }

    fn answer(&self, command: &str) -> String {
        match command {
            commands::SHOW_HOSTNAME if self.hostname.is_empty() => String::new(),
            commands::SHOW_HOSTNAME => format!("hostname {}\n", self.hostname),
            commands::SHOW_VLAN_BRIEF => self.render_vlan_brief(),
            commands::SHOW_INTERFACES_STATUS => self.render_interfaces_status(),
            other => match other
                .strip_prefix("show running-config interface ")
                .and_then(|rest| rest.strip_suffix(" | include allowed"))
            {
                Some(port) => self.render_allowed(port),
                None => "% Invalid input detected at '^' marker.\n".to_string(),
            },
        }
    }
}

/// FakeSwitch shares its state across clones so tests can inspect it after a run
pub struct FakeSwitch {
    state: Arc<Mutex<FakeState>>,
    counted: bool,
}

impl Clone for FakeSwitch {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            counted: false,
        }
    }
}

impl Drop for FakeSwitch {
    fn drop(&mut self) {
        if self.counted {
            self.lock().open_sessions -= 1;
        }
    }
}

impl FakeSwitch {
    pub fn builder() -> FakeSwitchBuilder {
        FakeSwitchBuilder {
            state: FakeState {
                hostname: "edge1".to_string(),
                ..Default::default()
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session(&self) -> Self {
        self.lock().open_sessions += 1;
        Self {
            state: Arc::clone(&self.state),
            counted: true,
        }
    }

    pub fn has_vlan(&self, id: u16) -> bool {
        self.lock().vlans.contains_key(&id)
    }

    pub fn vlan_name(&self, id: u16) -> Option<String> {
        self.lock().vlans.get(&id).cloned()
    }

    pub fn allowed(&self, port: &str) -> Option<String> {
        self.lock()
            .interfaces
            .iter()
            .find(|i| i.port == port)
            .and_then(|i| i.allowed.clone())
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn config_sets(&self) -> Vec<Vec<String>> {
        self.lock().config_sets.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }
}

impl CommandChannel for FakeSwitch {
    fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        let mut state = self.lock();
        state.commands.push(command.to_string());
        if state.failing_command.as_deref() == Some(command) {
            return Err(SessionError::Closed);
        }
        Ok(state.answer(command))
    }

    fn send_config_set(&mut self, lines: &[String]) -> Result<String, SessionError> {
        let mut state = self.lock();
        state.config_sets.push(lines.to_vec());

        let mut current_vlan: Option<u16> = None;
        let mut current_port: Option<String> = None;

        for line in lines {
            if state.reject_line.as_deref() == Some(line.as_str()) {
                return Err(SessionError::ConfigRejected {
                    line: line.clone(),
                    output: "% Invalid input detected at '^' marker.".to_string(),
                });
            }

            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["vlan", id] => {
                    let id: u16 = id.parse().unwrap_or_default();
                    if !state.ignore_vlan_creation {
                        state.vlans.entry(id).or_insert_with(|| format!("VLAN{:04}", id));
                    }
                    current_vlan = Some(id);
                }
                ["name", name] => {
                    if let Some(entry) = current_vlan.and_then(|id| state.vlans.get_mut(&id)) {
                        *entry = name.to_string();
                    }
                }
                ["interface", port] => {
                    if state.interface_mut(port).is_none() {
                        return Err(SessionError::ConfigRejected {
                            line: line.clone(),
                            output: "% Invalid interface".to_string(),
                        });
                    }
                    current_port = Some(port.to_string());
                }
                ["switchport", "trunk", "allowed", "vlan", "add", id] => {
                    let port = current_port.clone().unwrap_or_default();
                    if let Some(iface) = state.interface_mut(&port) {
                        if let Some(list) = iface.allowed.as_mut() {
                            list.push(',');
                            list.push_str(id);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(String::new())
    }
}

pub struct FakeSwitchBuilder {
    state: FakeState,
}

impl FakeSwitchBuilder {
    pub fn hostname(mut self, hostname: &str) -> Self {
        self.state.hostname = hostname.to_string();
        self
    }

    pub fn vlan(mut self, id: u16, name: &str) -> Self {
        self.state.vlans.insert(id, name.to_string());
        self
    }

    /// Trunk port; `allowed` is the running-config list, `None` for implicit allow-all
    pub fn trunk(mut self, port: &str, allowed: Option<&str>) -> Self {
        self.state.interfaces.push(FakeInterface {
            port: port.to_string(),
            mode: "trunk".to_string(),
            allowed: allowed.map(str::to_string),
        });
        self
    }

    pub fn access(mut self, port: &str, vlan: u16) -> Self {
        self.state.interfaces.push(FakeInterface {
            port: port.to_string(),
            mode: vlan.to_string(),
            allowed: None,
        });
        self
    }

    pub fn routed(mut self, port: &str) -> Self {
        self.state.interfaces.push(FakeInterface {
            port: port.to_string(),
            mode: "routed".to_string(),
            allowed: None,
        });
        self
    }

    pub fn reject_config_line(mut self, line: &str) -> Self {
        self.state.reject_line = Some(line.to_string());
        self
    }

    /// Accept `vlan N` without creating the VLAN
    pub fn ignore_vlan_creation(mut self) -> Self {
        self.state.ignore_vlan_creation = true;
        self
    }

    /// Drop the session when this command is issued
    pub fn fail_command(mut self, command: &str) -> Self {
        self.state.failing_command = Some(command.to_string());
        self
    }

    pub fn build(self) -> FakeSwitch {
        FakeSwitch {
            state: Arc::new(Mutex::new(self.state)),
            counted: false,
        }
    }
}

/// FakeConnector hands out sessions to fake devices by address
#[derive(Default)]
pub struct FakeConnector {
    devices: HashMap<String, FakeSwitch>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, device: &FakeSwitch) -> Self {
        self.devices.insert(address.to_string(), device.clone());
        self
    }
}

impl Connector for FakeConnector {
    type Channel = FakeSwitch;

    fn connect(&self, address: &str, _credentials: &Credentials) -> Result<FakeSwitch, SessionError> {
        match self.devices.get(address) {
            Some(device) => Ok(device.session()),
            None => Err(SessionError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}
