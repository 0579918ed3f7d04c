use serde::Serialize;

/// Switchport mode as reported in the Vlan column of `show interfaces status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SwitchportMode {
    Trunk,
    Access(u16),
    Routed,
    Other(String),
}

impl SwitchportMode {
    pub fn from_vlan_column(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("trunk") {
            return SwitchportMode::Trunk;
        }
        if value.eq_ignore_ascii_case("routed") {
            return SwitchportMode::Routed;
        }
        match value.parse::<u16>() {
            Ok(vlan) => SwitchportMode::Access(vlan),
            Err(_) => SwitchportMode::Other(value.to_string()),
        }
    }

    pub fn is_trunk(&self) -> bool {
        matches!(self, SwitchportMode::Trunk)
    }
}

/// InterfaceEntry is one row of `show interfaces status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceEntry {
    pub port: String,
    pub status: String,
    pub mode: SwitchportMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_vlan_column() {
        assert_eq!(SwitchportMode::from_vlan_column("trunk"), SwitchportMode::Trunk);
        assert_eq!(SwitchportMode::from_vlan_column(" 10 "), SwitchportMode::Access(10));
        assert_eq!(SwitchportMode::from_vlan_column("routed"), SwitchportMode::Routed);
        assert_eq!(
            SwitchportMode::from_vlan_column("unassigned"),
            SwitchportMode::Other("unassigned".to_string())
        );
    }
}
