use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error for VLAN ids outside 1..=4094 or not numeric
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid VLAN id '{0}': expected an integer between 1 and 4094")]
pub struct InvalidVlanId(pub String);

/// Error for VLAN names the IOS CLI would not accept as a single token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid VLAN name '{0}': expected 1-32 characters without whitespace")]
pub struct InvalidVlanName(pub String);

/// VlanId is an 802.1Q VLAN identifier usable on IOS (1..=4094)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub fn new(id: u16) -> Result<Self, InvalidVlanId> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(InvalidVlanId(id.to_string()))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl FromStr for VlanId {
    type Err = InvalidVlanId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id: u16 = trimmed
            .parse()
            .map_err(|_| InvalidVlanId(trimmed.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = InvalidVlanId;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(id: VlanId) -> Self {
        id.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// VlanTarget is the VLAN every device should carry, with its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanTarget {
    pub id: VlanId,
    pub name: String,
}

impl VlanTarget {
    pub fn new(id: VlanId, name: &str) -> Result<Self, InvalidVlanName> {
        let name = name.trim();
        let valid = !name.is_empty()
            && name.chars().count() <= 32
            && !name.chars().any(|c| c.is_whitespace() || c.is_control());
        if !valid {
            return Err(InvalidVlanName(name.to_string()));
        }
        Ok(Self {
            id,
            name: name.to_string(),
        })
    }
}

/// VlanEntry is one row of `show vlan brief`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanEntry {
    pub id: VlanId,
    pub name: String,
    pub status: String,
}

/// Inclusive VLAN range as written in an allowed list ("10" or "100-200")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VlanRange {
    pub start: u16,
    pub end: u16,
}

impl VlanRange {
    pub fn single(id: u16) -> Self {
        Self { start: id, end: id }
    }

    pub fn contains(&self, id: VlanId) -> bool {
        (self.start..=self.end).contains(&id.get())
    }
}

impl fmt::Display for VlanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// AllowedVlans is the parsed `switchport trunk allowed vlan` state of a trunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ranges", rename_all = "snake_case")]
pub enum AllowedVlans {
    /// No explicit restriction configured; IOS forwards every VLAN
    Implicit,
    All,
    None,
    List(Vec<VlanRange>),
    Except(Vec<VlanRange>),
}

impl AllowedVlans {
    /// Exact membership test. VLAN 1 is not permitted by "10".
    pub fn permits(&self, id: VlanId) -> bool {
        match self {
            AllowedVlans::Implicit | AllowedVlans::All => true,
            AllowedVlans::None => false,
            AllowedVlans::List(ranges) => ranges.iter().any(|r| r.contains(id)),
            AllowedVlans::Except(ranges) => !ranges.iter().any(|r| r.contains(id)),
        }
    }
}

impl fmt::Display for AllowedVlans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(ranges: &[VlanRange]) -> String {
            ranges
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }

        match self {
            AllowedVlans::Implicit => write!(f, "(implicit all)"),
            AllowedVlans::All => write!(f, "all"),
            AllowedVlans::None => write!(f, "none"),
            AllowedVlans::List(ranges) => write!(f, "{}", join(ranges)),
            AllowedVlans::Except(ranges) => write!(f, "except {}", join(ranges)),
        }
    }
}
