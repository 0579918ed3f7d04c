use serde::{Deserialize, Serialize};

/// Device represents one switch from the device address file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub address: String,
}

impl Device {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// DeviceList is the ordered, read-only device set for one run.
/// Order follows the source file and drives processing and log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceList {
    devices: Vec<Device>,
}

impl DeviceList {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    /// Build a list from bare addresses, naming them switch1, switch2, ...
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let devices = addresses
            .into_iter()
            .enumerate()
            .map(|(index, ip)| Device::new(format!("switch{}", index + 1), ip))
            .collect();
        Self { devices }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.address.as_str())
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
