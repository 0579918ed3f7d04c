//! Device-facing state queries and the mutation executor.
//!
//! [`Switch`] wraps any [`CommandChannel`], so the same queries run against a live
//! [`crate::ssh::CliSession`] or an in-memory device in tests.

#[cfg(test)]
pub mod fake;

use crate::models::{Credentials, InterfaceEntry, VlanEntry, VlanId, VlanTarget};
use crate::parsers::{self, ParseError};
use crate::ssh::SessionError;

/// Hostname reported when the running config has no hostname line
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// CommandChannel is an interactive, privileged command channel to one device
pub trait CommandChannel {
    /// Run one exec-mode command and return its output without echo or prompt
    fn send_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Run lines inside `configure terminal` ... `end`, stopping at the first rejected line
    fn send_config_set(&mut self, lines: &[String]) -> Result<String, SessionError>;
}

/// Connector opens a command channel to a device address
pub trait Connector: Send + Sync + 'static {
    type Channel: CommandChannel;

    fn connect(&self, address: &str, credentials: &Credentials) -> Result<Self::Channel, SessionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("VLAN {0} still missing after creation")]
    VlanNotCreated(VlanId),
}

/// Canonical IOS command strings
pub mod commands {
    use crate::models::{VlanId, VlanTarget};

    pub const SHOW_HOSTNAME: &str = "show running-config | include hostname";
    pub const SHOW_VLAN_BRIEF: &str = "show vlan brief";
    pub const SHOW_INTERFACES_STATUS: &str = "show interfaces status";

    pub fn show_trunk_allowed(port: &str) -> String {
        format!("show running-config interface {} | include allowed", port)
    }

    pub fn create_vlan(target: &VlanTarget) -> Vec<String> {
        vec![format!("vlan {}", target.id), format!("name {}", target.name)]
    }

    pub fn trunk_allow_add(port: &str, id: VlanId) -> Vec<String> {
        vec![
            format!("interface {}", port),
            format!("switchport trunk allowed vlan add {}", id),
        ]
    }
}

/// Switch issues state queries and configuration over one command channel
pub struct Switch<C> {
    channel: C,
}

impl<C: CommandChannel> Switch<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn get_hostname(&mut self) -> Result<String, DeviceError> {
        let output = self.channel.send_command(commands::SHOW_HOSTNAME)?;
        Ok(parsers::parse_hostname(&output).unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string()))
    }

    pub fn get_vlans(&mut self) -> Result<Vec<VlanEntry>, DeviceError> {
        let output = self.channel.send_command(commands::SHOW_VLAN_BRIEF)?;
        Ok(parsers::parse_vlan_brief(&output)?)
    }

    pub fn get_interfaces(&mut self) -> Result<Vec<InterfaceEntry>, DeviceError> {
        let output = self.channel.send_command(commands::SHOW_INTERFACES_STATUS)?;
        Ok(parsers::parse_interfaces_status(&output)?)
    }

    /// Raw allowed-VLAN fragment for one port; empty when no explicit restriction exists
    pub fn get_trunk_allowed(&mut self, port: &str) -> Result<String, DeviceError> {
        let output = self.channel.send_command(&commands::show_trunk_allowed(port))?;
        parsers::check_rejected(&output)?;
        Ok(output.trim().to_string())
    }

    /// Apply an ordered list of configuration lines as one best-effort transaction.
    /// No rollback: lines before a rejected one stay applied.
    pub fn apply_config(&mut self, lines: &[String]) -> Result<String, DeviceError> {
        Ok(self.channel.send_config_set(lines)?)
    }

    pub fn create_vlan(&mut self, target: &VlanTarget) -> Result<String, DeviceError> {
        self.apply_config(&commands::create_vlan(target))
    }

    pub fn allow_on_trunk(&mut self, port: &str, id: VlanId) -> Result<String, DeviceError> {
        self.apply_config(&commands::trunk_allow_add(port, id))
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSwitch;
    use super::*;
    use crate::models::SwitchportMode;

    #[test]
    fn test_hostname_defaults_to_unknown() {
        let fake = FakeSwitch::builder().hostname("").build();
        let mut switch = Switch::new(fake);
        assert_eq!(switch.get_hostname().unwrap(), UNKNOWN_HOSTNAME);

        let fake = FakeSwitch::builder().hostname("edge1").build();
        let mut switch = Switch::new(fake);
        assert_eq!(switch.get_hostname().unwrap(), "edge1");
    }

    #[test]
    fn test_queries_round_trip_through_ios_output() {
        let fake = FakeSwitch::builder()
            .vlan(1, "default")
            .vlan(10, "users")
            .trunk("Gi0/1", Some("1,10"))
            .access("Gi0/2", 10)
            .trunk("Gi0/3", None)
            .build();
        let mut switch = Switch::new(fake.clone());

        let ids: Vec<u16> = switch.get_vlans().unwrap().iter().map(|v| v.id.get()).collect();
        assert_eq!(ids, vec![1, 10]);

        let interfaces = switch.get_interfaces().unwrap();
        assert_eq!(interfaces.len(), 3);
        assert_eq!(interfaces[0].mode, SwitchportMode::Trunk);
        assert_eq!(interfaces[1].mode, SwitchportMode::Access(10));

        assert_eq!(
            switch.get_trunk_allowed("Gi0/1").unwrap(),
            "switchport trunk allowed vlan 1,10"
        );
        assert_eq!(switch.get_trunk_allowed("Gi0/3").unwrap(), "");
        assert!(fake.config_sets().is_empty());
    }

    #[test]
    fn test_apply_config_reports_rejected_line() {
        let fake = FakeSwitch::builder().reject_config_line("name sales").build();
        let mut switch = Switch::new(fake.clone());
        let target = VlanTarget::new(VlanId::new(30).unwrap(), "sales").unwrap();

        let err = switch.create_vlan(&target).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Session(SessionError::ConfigRejected { ref line, .. }) if line == "name sales"
        ));
        // No rollback: the VLAN line before the rejected one was applied
        assert!(fake.has_vlan(30));
    }
}
