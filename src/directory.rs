//! # Device Directory
//!
//! Static reference data mapping 3-byte Insteon addresses to the human
//! metadata used to annotate decoded frames. The directory is read-only after
//! load and is shared between sessions behind an `Arc`.
//!
//! ```json
//! {
//!   "1A.2B.3C": { "name": "Porch Light", "type": "SwitchLinc", "room": "Porch",
//!                 "location": "Front door", "category": "02", "subcategory": "2A" }
//! }
//! ```

use crate::constants::CONFIG_DEVICES;
use crate::error::PlmError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const BUILTIN_DEVICES: &str = include_str!("../config/devices.json");

/// Label used for addresses absent from the directory.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// A 3-byte device address, rendered as `AA.BB.CC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(pub [u8; 3]);

impl DeviceAddress {
    pub fn new(a: u8, b: u8, c: u8) -> Self {
        DeviceAddress([a, b, c])
    }

    /// Build from a slice that must be exactly three bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 3]>::try_from(bytes).ok().map(DeviceAddress)
    }

    pub fn bytes(&self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}.{:02X}.{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for DeviceAddress {
    type Err = PlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(PlmError::ConfigError(format!("bad device address \"{s}\"")));
        }
        let mut out = [0u8; 3];
        for (slot, part) in out.iter_mut().zip(&parts) {
            *slot = crate::util::hex::hex_byte(part)
                .map_err(|e| PlmError::ConfigError(format!("bad device address \"{s}\": {e}")))?;
        }
        Ok(DeviceAddress(out))
    }
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(alias = "display_name")]
    name: String,
    #[serde(rename = "type", default)]
    device_type: String,
    #[serde(default)]
    room: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    subcategory: String,
}

/// Metadata for one known device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: DeviceAddress,
    pub name: String,
    pub device_type: String,
    pub room: String,
    pub location: String,
    pub category: String,
    pub subcategory: String,
}

impl DeviceRecord {
    /// "name in room at location"
    pub fn label(&self) -> String {
        format!("{} in {} at {}", self.name, self.room, self.location)
    }
}

/// Address → device lookup table.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: BTreeMap<DeviceAddress, DeviceRecord>,
}

impl DeviceDirectory {
    pub fn new(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        DeviceDirectory {
            devices: records.into_iter().map(|r| (r.address, r)).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PlmError> {
        let raw: BTreeMap<String, RawDevice> = serde_json::from_str(json)
            .map_err(|e| PlmError::ConfigError(format!("{CONFIG_DEVICES}: {e}")))?;
        let records = raw
            .into_iter()
            .map(|(key, d)| {
                Ok(DeviceRecord {
                    address: key.parse()?,
                    name: d.name,
                    device_type: d.device_type,
                    room: d.room,
                    location: d.location,
                    category: d.category,
                    subcategory: d.subcategory,
                })
            })
            .collect::<Result<Vec<_>, PlmError>>()?;
        Ok(DeviceDirectory::new(records))
    }

    /// Load `devices.json` from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, PlmError> {
        let json = crate::catalog::read_table(dir.as_ref(), CONFIG_DEVICES)?;
        DeviceDirectory::from_json(&json)
    }

    /// The sample directory shipped with the crate.
    pub fn builtin() -> Result<Self, PlmError> {
        DeviceDirectory::from_json(BUILTIN_DEVICES)
    }

    pub fn lookup(&self, address: &DeviceAddress) -> Option<&DeviceRecord> {
        self.devices.get(address)
    }

    /// Human label for an address, or "unknown".
    pub fn resolve(&self, address: &DeviceAddress) -> String {
        self.lookup(address)
            .map(DeviceRecord::label)
            .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    /// Devices whose type matches `kind` case-insensitively; "all" matches everything.
    pub fn filter_by_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DeviceRecord> {
        self.devices.values().filter(move |d| {
            kind.eq_ignore_ascii_case("all") || d.device_type.eq_ignore_ascii_case(kind)
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let a: DeviceAddress = "aa.bb.0c".parse().unwrap();
        assert_eq!(a, DeviceAddress::new(0xAA, 0xBB, 0x0C));
        assert_eq!(a.to_string(), "AA.BB.0C");
    }

    #[test]
    fn test_address_parse_errors() {
        assert!("AA.BB".parse::<DeviceAddress>().is_err());
        assert!("AA.BB.CC.DD".parse::<DeviceAddress>().is_err());
        assert!("AA.BB.ZZ".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn test_from_slice() {
        assert_eq!(
            DeviceAddress::from_slice(&[1, 2, 3]),
            Some(DeviceAddress::new(1, 2, 3))
        );
        assert_eq!(DeviceAddress::from_slice(&[1, 2]), None);
    }

    #[test]
    fn test_display_name_alias() {
        let dir = DeviceDirectory::from_json(
            r#"{ "01.02.03": { "display_name": "Fan", "room": "Attic", "location": "Roof" } }"#,
        )
        .unwrap();
        assert_eq!(dir.resolve(&DeviceAddress::new(1, 2, 3)), "Fan in Attic at Roof");
    }

    #[test]
    fn test_builtin_loads() {
        let dir = DeviceDirectory::builtin().unwrap();
        assert!(!dir.is_empty());
    }
}
