// ── Device configuration domain types ──

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;

/// Default protocol sub-address.
pub const DEFAULT_SLAVE_ID: u8 = 1;

/// Which telemetry value set and configuration extension applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceKind {
    /// Production line counter (availability, meters, output flag).
    Oee,
    /// Power meter.
    Pm,
    /// Weighing scale.
    Scale,
}

impl DeviceKind {
    /// Registers this kind occupies in the gateway's aggregated map.
    pub fn register_span(self) -> u32 {
        match self {
            Self::Oee => 4,
            Self::Pm => 26,
            Self::Scale => 1,
        }
    }
}

// ── RegisterOffset ───────────────────────────────────────────────────

/// Register base offset, assigned by the gateway.
///
/// Always displayed as zero-padded hex (`0x001A`). Serialized as a plain
/// integer; deserializes from either an integer or a hex string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterOffset(u32);

impl RegisterOffset {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for RegisterOffset {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for RegisterOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl FromStr for RegisterOffset {
    type Err = CoreError;

    /// Parse a hex offset, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| CoreError::ParseError {
                message: format!("invalid register offset '{s}'"),
            })
    }
}

impl Serialize for RegisterOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for RegisterOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u32),
            Hex(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(Self(v)),
            Raw::Hex(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ── PmParam ──────────────────────────────────────────────────────────

/// One entry of a power meter's parameter map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PmParam {
    pub name: String,
    pub address: u16,
}

impl PmParam {
    pub fn new(name: impl Into<String>, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// A configured field device. The registry is the authoritative source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    pub ip: String,
    pub port: u16,
    pub slave_id: u8,
    pub offset: RegisterOffset,
    /// Only meaningful for [`DeviceKind::Pm`]. `None` means the gateway's
    /// default parameter map.
    pub pm_params: Option<Vec<PmParam>>,
}

impl Device {
    /// A device with the default port, slave id and offset.
    pub fn new(name: impl Into<String>, kind: DeviceKind, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            ip: ip.into(),
            port: DEFAULT_PORT,
            slave_id: DEFAULT_SLAVE_ID,
            offset: RegisterOffset::default(),
            pm_params: None,
        }
    }

    /// Registers this device occupies: `offset .. offset + span`.
    pub fn register_range(&self) -> Range<u32> {
        let start = self.offset.value();
        start..start.saturating_add(self.kind.register_span())
    }

    /// Check the invariants that need no round trip to the gateway.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("device name must not be empty"));
        }
        if self.ip.trim().is_empty() {
            return Err(CoreError::validation(format!(
                "device '{}' has no IP address",
                self.name
            )));
        }

        let Some(params) = &self.pm_params else {
            return Ok(());
        };
        if self.kind != DeviceKind::Pm {
            return Err(CoreError::validation(format!(
                "pm_params are only valid for pm devices, '{}' is {}",
                self.name, self.kind
            )));
        }

        let mut seen = HashSet::with_capacity(params.len());
        for param in params {
            if param.name.trim().is_empty() {
                return Err(CoreError::validation("pm parameter names must not be empty"));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(CoreError::validation(format!(
                    "duplicate pm parameter '{}'",
                    param.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn offset_displays_as_padded_hex() {
        assert_eq!(RegisterOffset::new(26).to_string(), "0x001A");
        assert_eq!(RegisterOffset::new(0).to_string(), "0x0000");
    }

    #[test]
    fn offset_parses_hex_with_or_without_prefix() {
        assert_eq!("0x1A".parse::<RegisterOffset>().unwrap().value(), 26);
        assert_eq!("1a".parse::<RegisterOffset>().unwrap().value(), 26);
        assert!("zz".parse::<RegisterOffset>().is_err());
    }

    #[test]
    fn offset_accepts_integer_or_hex_on_the_wire() {
        let from_int: RegisterOffset = serde_json::from_str("30").unwrap();
        let from_hex: RegisterOffset = serde_json::from_str("\"0x1E\"").unwrap();
        assert_eq!(from_int, from_hex);
        assert_eq!(serde_json::to_string(&from_hex).unwrap(), "30");
    }

    #[test]
    fn register_range_follows_kind_span() {
        let mut pm = Device::new("PM-1", DeviceKind::Pm, "10.0.0.3");
        pm.offset = RegisterOffset::new(4);
        assert_eq!(pm.register_range(), 4..30);

        let scale = Device::new("Scale-1", DeviceKind::Scale, "10.0.0.4");
        assert_eq!(scale.register_range(), 0..1);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let device = Device::new("  ", DeviceKind::Oee, "10.0.0.2");
        assert!(matches!(
            device.validate(),
            Err(CoreError::ValidationError { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_pm_params() {
        let mut device = Device::new("PM-1", DeviceKind::Pm, "10.0.0.3");
        device.pm_params = Some(vec![
            PmParam::new("voltage_l1", 3027),
            PmParam::new("voltage_l1", 3029),
        ]);
        let err = device.validate().unwrap_err();
        assert_eq!(err.to_string(), "duplicate pm parameter 'voltage_l1'");
    }

    #[test]
    fn validate_rejects_pm_params_on_other_kinds() {
        let mut device = Device::new("Scale-1", DeviceKind::Scale, "10.0.0.4");
        device.pm_params = Some(vec![PmParam::new("weight", 1)]);
        assert!(device.validate().is_err());

        device.kind = DeviceKind::Pm;
        device.validate().unwrap();
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("PM".parse::<DeviceKind>().unwrap(), DeviceKind::Pm);
        assert_eq!(DeviceKind::Oee.to_string(), "oee");
    }
}
