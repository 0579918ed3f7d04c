//! Device address files and the Ansible inventories generated from them.

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::path::Path;
use tera::{Context, Tera};

use crate::models::{Device, DeviceList};

/// Group every switch is placed under in the static INI inventory
pub const INI_GROUP: &str = "cisco_switches";

const INI_TEMPLATE: &str = "[{{ group }}]
{% for device in devices %}{{ device.address }}
{% endfor %}";

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported device file layout: expected an object or an array, found {0}")]
    Layout(&'static str),
    #[error("device '{0}' has no usable address")]
    MissingAddress(String),
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Address of one object entry: a plain string or `{"ip" | "address" | "ansible_host": ...}`
fn entry_address(name: &str, value: &Value) -> Result<String, InventoryError> {
    let address = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(fields) => ["ip", "address", "ansible_host"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str)),
        _ => None,
    };
    match address.map(str::trim) {
        Some(a) if !a.is_empty() => Ok(a.to_string()),
        _ => Err(InventoryError::MissingAddress(name.to_string())),
    }
}

fn from_object(map: &Map<String, Value>) -> Result<DeviceList, InventoryError> {
    let devices = map
        .iter()
        .map(|(name, value)| Ok(Device::new(name.as_str(), entry_address(name, value)?)))
        .collect::<Result<Vec<_>, InventoryError>>()?;
    Ok(DeviceList::new(devices))
}

/// Parse a device address file. Accepted layouts, in file order:
/// `{"sw1": "10.0.0.1"}`, `{"switches": {"sw1": "10.0.0.1"}}` and `["10.0.0.1", ...]`.
pub fn parse_devices(text: &str) -> Result<DeviceList, InventoryError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(map) => match map.get("switches") {
            Some(Value::Object(inner)) => from_object(inner),
            _ => from_object(&map),
        },
        Value::Array(items) => {
            let addresses = items
                .iter()
                .enumerate()
                .map(|(index, item)| entry_address(&format!("switch{}", index + 1), item))
                .collect::<Result<Vec<_>, InventoryError>>()?;
            Ok(DeviceList::from_addresses(addresses))
        }
        other => Err(InventoryError::Layout(kind(&other))),
    }
}

/// Load a device file. A missing, unreadable or malformed file is logged and yields an empty list.
pub async fn load_devices(path: &str) -> DeviceList {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Devices file '{}' could not be read: {}", path, e);
            return DeviceList::default();
        }
    };

    match parse_devices(&content) {
        Ok(devices) => {
            if devices.is_empty() {
                tracing::warn!("No switches found in {}", path);
            } else {
                tracing::info!("Loaded {} switch(es) from {}", devices.len(), path);
            }
            devices
        }
        Err(e) => {
            tracing::error!("Error decoding devices file '{}': {}", path, e);
            DeviceList::default()
        }
    }
}

/// Render the static INI inventory: one address per line under `[cisco_switches]`
pub fn render_ini(devices: &DeviceList) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("inventory.ini", INI_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("Invalid inventory template: {}", e))?;

    let mut context = Context::new();
    context.insert("group", INI_GROUP);
    context.insert("devices", &devices.iter().collect::<Vec<_>>());

    tera.render("inventory.ini", &context)
        .map_err(|e| anyhow::anyhow!("Inventory rendering failed: {}", e))
}

/// Build the dynamic inventory document. Hosts are named switch1..N in device order.
pub fn dynamic_inventory(devices: &DeviceList) -> Value {
    let mut hosts = Map::new();
    let mut members = Map::new();
    for (index, device) in devices.iter().enumerate() {
        let name = format!("switch{}", index + 1);
        hosts.insert(name.clone(), json!({ "ansible_host": device.address }));
        members.insert(name, json!({}));
    }

    json!({
        "all": {
            "hosts": hosts,
            "children": {
                "switches": { "hosts": members }
            }
        }
    })
}

async fn write_file(path: &str, content: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

pub async fn write_ini_inventory(path: &str, devices: &DeviceList) -> Result<()> {
    write_file(path, &render_ini(devices)?).await?;
    tracing::info!("Inventory created successfully: {}", path);
    Ok(())
}

/// Write the dynamic inventory. JSON is valid YAML, so Ansible reads it as a YAML inventory.
pub async fn write_dynamic_inventory(path: &str, devices: &DeviceList) -> Result<()> {
    let content = serde_json::to_string_pretty(&dynamic_inventory(devices))?;
    write_file(path, &content).await?;
    tracing::info!("Dynamic inventory created: {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(devices: &DeviceList) -> Vec<&str> {
        devices.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_parse_flat_object_keeps_file_order() {
        let devices = parse_devices(r#"{"zeta": "10.0.0.3", "alpha": "10.0.0.1"}"#).unwrap();
        assert_eq!(names(&devices), vec!["zeta", "alpha"]);
        assert_eq!(devices.addresses().collect::<Vec<_>>(), vec!["10.0.0.3", "10.0.0.1"]);
    }

    #[test]
    fn test_parse_switches_wrapper_and_array() {
        let wrapped =
            parse_devices(r#"{"switches": {"sw1": "10.0.0.1", "sw2": {"ip": "10.0.0.2"}}}"#).unwrap();
        assert_eq!(names(&wrapped), vec!["sw1", "sw2"]);
        assert_eq!(wrapped.iter().nth(1).unwrap().address, "10.0.0.2");

        let array = parse_devices(r#"["192.168.1.10", "192.168.1.11"]"#).unwrap();
        assert_eq!(names(&array), vec!["switch1", "switch2"]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(parse_devices("{not json"), Err(InventoryError::Json(_))));
        assert!(matches!(parse_devices("42"), Err(InventoryError::Layout("a number"))));
        assert!(matches!(
            parse_devices(r#"{"sw1": ""}"#),
            Err(InventoryError::MissingAddress(name)) if name == "sw1"
        ));
    }

    #[test]
    fn test_render_ini_inventory() {
        let devices = DeviceList::new(vec![
            Device::new("sw1", "10.0.0.1"),
            Device::new("sw2", "10.0.0.2"),
        ]);
        assert_eq!(
            render_ini(&devices).unwrap(),
            "[cisco_switches]\n10.0.0.1\n10.0.0.2\n"
        );
    }

    #[test]
    fn test_dynamic_inventory_layout() {
        let devices = DeviceList::from_addresses(["10.1.1.1", "10.1.1.2"]);
        let doc = dynamic_inventory(&devices);
        assert_eq!(doc["all"]["hosts"]["switch2"]["ansible_host"], "10.1.1.2");
        assert_eq!(doc["all"]["children"]["switches"]["hosts"]["switch1"], json!({}));
    }

    #[test]
    fn test_load_missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(tokio_test::block_on(load_devices(missing.to_str().unwrap())).is_empty());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{\"sw1\": ").unwrap();
        assert!(tokio_test::block_on(load_devices(broken.to_str().unwrap())).is_empty());
    }

    #[tokio::test]
    async fn test_write_inventories() {
        let dir = tempfile::tempdir().unwrap();
        let devices = DeviceList::from_addresses(["10.0.0.5"]);

        let ini = dir.path().join("nested/inventory.ini");
        write_ini_inventory(ini.to_str().unwrap(), &devices).await.unwrap();
        assert_eq!(std::fs::read_to_string(&ini).unwrap(), "[cisco_switches]\n10.0.0.5\n");

        let yml = dir.path().join("inventory.yml");
        write_dynamic_inventory(yml.to_str().unwrap(), &devices).await.unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&yml).unwrap()).unwrap();
        assert_eq!(doc, dynamic_inventory(&devices));
    }
}
