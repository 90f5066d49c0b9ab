// ── Wire → domain conversions ──
//
// Bridges raw gateway records (gatewatch-api) into canonical domain types.
// A single unreadable entry is dropped with a warning; the rest of the
// payload still applies.

use chrono::{DateTime, Utc};
use gatewatch_api::{DeviceRecord, PmDefaults, SnapshotPayload, SnapshotRecord};
use tracing::warn;

use crate::error::CoreError;
use crate::model::{
    Device, DeviceKind, LinkStatus, PmParam, Reading, Readings, RegisterOffset, SnapshotMap,
    TelemetrySnapshot,
};

// ── Devices ──────────────────────────────────────────────────────────

fn parse_offset(raw: &serde_json::Value) -> Result<RegisterOffset, CoreError> {
    match raw {
        serde_json::Value::Null => Ok(RegisterOffset::default()),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(RegisterOffset::new)
            .ok_or_else(|| CoreError::ParseError {
                message: format!("register offset out of range: {n}"),
            }),
        serde_json::Value::String(s) => s.parse(),
        other => Err(CoreError::ParseError {
            message: format!("unexpected register offset: {other}"),
        }),
    }
}

fn parse_pm_params(raw: Vec<(String, i64)>) -> Result<Vec<PmParam>, CoreError> {
    raw.into_iter()
        .map(|(name, address)| match u16::try_from(address) {
            Ok(address) => Ok(PmParam { name, address }),
            Err(_) => Err(CoreError::ParseError {
                message: format!("pm parameter '{name}' has invalid address {address}"),
            }),
        })
        .collect()
}

impl TryFrom<DeviceRecord> for Device {
    type Error = CoreError;

    fn try_from(record: DeviceRecord) -> Result<Self, Self::Error> {
        let kind: DeviceKind = record.device_type.parse().map_err(|_| CoreError::ParseError {
            message: format!(
                "device '{}' has unknown type '{}'",
                record.name, record.device_type
            ),
        })?;

        Ok(Device {
            offset: parse_offset(&record.offset)?,
            pm_params: record.pm_params.map(parse_pm_params).transpose()?,
            name: record.name,
            kind,
            ip: record.ip,
            port: record.port,
            slave_id: record.slave_id,
        })
    }
}

impl From<&Device> for DeviceRecord {
    fn from(device: &Device) -> Self {
        DeviceRecord {
            name: device.name.clone(),
            ip: device.ip.clone(),
            port: device.port,
            slave_id: device.slave_id,
            device_type: device.kind.to_string(),
            offset: serde_json::Value::from(device.offset.value()),
            pm_params: device.pm_params.as_ref().map(|params| {
                params
                    .iter()
                    .map(|p| (p.name.clone(), i64::from(p.address)))
                    .collect()
            }),
        }
    }
}

/// Convert a device listing, dropping entries that cannot be understood.
pub(crate) fn devices_from_records(records: Vec<DeviceRecord>) -> Vec<Device> {
    records
        .into_iter()
        .filter_map(|record| {
            let name = record.name.clone();
            Device::try_from(record)
                .inspect_err(|e| warn!(device = %name, error = %e, "skipping unreadable device"))
                .ok()
        })
        .collect()
}

pub(crate) fn pm_defaults_from_wire(defaults: PmDefaults) -> Result<Vec<PmParam>, CoreError> {
    parse_pm_params(defaults.params)
}

// ── Telemetry ────────────────────────────────────────────────────────

fn reading_from_json(value: serde_json::Value) -> Option<Reading> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(Reading::Number),
        serde_json::Value::String(s) => Some(Reading::Text(s)),
        serde_json::Value::Bool(b) => Some(Reading::Text(b.to_string())),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let millis = (secs * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
}

/// Convert one snapshot entry. A missing timestamp falls back to
/// `received_at`.
pub(crate) fn snapshot_from_record(
    record: SnapshotRecord,
    received_at: DateTime<Utc>,
) -> Result<TelemetrySnapshot, CoreError> {
    let status: LinkStatus = record.status.parse().map_err(|_| CoreError::ParseError {
        message: format!("unknown link status '{}'", record.status),
    })?;

    let timestamp = match record.timestamp {
        Some(secs) => timestamp_from_secs(secs).ok_or_else(|| CoreError::ParseError {
            message: format!("invalid timestamp {secs}"),
        })?,
        None => received_at,
    };

    let values: Readings = record
        .values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| reading_from_json(value).map(|r| (key, r)))
        .collect();

    Ok(TelemetrySnapshot {
        status,
        values,
        error: record.error,
        timestamp,
    })
}

fn snapshot_from_entry(
    entry: serde_json::Value,
    received_at: DateTime<Utc>,
) -> Result<TelemetrySnapshot, CoreError> {
    let record = SnapshotRecord::from_entry(entry).map_err(|e| CoreError::ParseError {
        message: e.to_string(),
    })?;
    snapshot_from_record(record, received_at)
}

/// Convert a full dump, dropping entries that cannot be understood.
pub(crate) fn snapshots_from_payload(
    payload: SnapshotPayload,
    received_at: DateTime<Utc>,
) -> SnapshotMap {
    payload
        .into_iter()
        .filter_map(|(name, entry)| match snapshot_from_entry(entry, received_at) {
            Ok(snapshot) => Some((name, snapshot)),
            Err(e) => {
                warn!(device = %name, error = %e, "discarding unreadable snapshot entry");
                None
            }
        })
        .collect()
}
