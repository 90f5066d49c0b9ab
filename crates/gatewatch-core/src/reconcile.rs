// ── Reconciler ──
//
// Pure merge of the registry and the latest telemetry into one view.
// Deterministic in its inputs (including `now`), so the same inputs always
// yield the same view.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ingest::ChannelHealth;
use crate::model::{
    Connectivity, Device, ReconciledDevice, ReconciledView, Readings, SnapshotMap,
    TelemetrySnapshot,
};
use crate::registry::RegistryState;

/// Build the reconciled view.
///
/// One entry per registry device, in registry order, left-joined against
/// `snapshots` by name. Snapshots for unknown names are ignored. While the
/// registry has never loaded the view is [`ReconciledView::NoData`].
pub fn reconcile(
    registry: &RegistryState,
    snapshots: &SnapshotMap,
    health: &ChannelHealth,
    now: DateTime<Utc>,
    staleness_threshold: Duration,
) -> ReconciledView {
    let Some(devices) = &registry.devices else {
        return ReconciledView::NoData {
            last_error: registry.last_error.clone(),
        };
    };

    let healthy = health.is_healthy();
    let devices = devices
        .iter()
        .map(|device| {
            reconcile_device(
                device,
                snapshots.get(&device.name),
                healthy,
                now,
                staleness_threshold,
            )
        })
        .collect();

    ReconciledView::Devices { devices }
}

/// Classify a single device.
///
/// A snapshot is trusted only while the channel is healthy and the sample
/// is no older than the threshold. Untrusted snapshots are frozen: their
/// telemetry is kept for display, connectivity becomes `unknown` and the
/// entry is marked stale.
pub fn reconcile_device(
    device: &Arc<Device>,
    snapshot: Option<&TelemetrySnapshot>,
    channel_healthy: bool,
    now: DateTime<Utc>,
    staleness_threshold: Duration,
) -> ReconciledDevice {
    let Some(snapshot) = snapshot else {
        return ReconciledDevice {
            device: Arc::clone(device),
            connectivity: Connectivity::Unknown,
            values: Readings::new(),
            error: None,
            last_seen: None,
            last_status: None,
            stale: false,
        };
    };

    let trusted = channel_healthy && snapshot.age(now) <= staleness_threshold;
    let connectivity = if trusted {
        Connectivity::from(snapshot.status)
    } else {
        Connectivity::Unknown
    };

    ReconciledDevice {
        device: Arc::clone(device),
        connectivity,
        values: snapshot.values.clone(),
        error: snapshot.error.clone(),
        last_seen: Some(snapshot.timestamp),
        last_status: Some(snapshot.status),
        stale: !trusted,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::TelemetryMode;
    use crate::ingest::ChannelState;
    use crate::model::{DeviceKind, LinkStatus, Reading};

    const THRESHOLD: Duration = Duration::from_secs(10);

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_100, 0).unwrap()
    }

    fn registry(names: &[&str]) -> RegistryState {
        RegistryState {
            devices: Some(Arc::new(
                names
                    .iter()
                    .map(|n| Arc::new(Device::new(*n, DeviceKind::Oee, "10.0.0.2")))
                    .collect(),
            )),
            last_error: None,
            loaded_at: Some(now()),
        }
    }

    fn health(state: ChannelState) -> ChannelHealth {
        ChannelHealth {
            state,
            ..ChannelHealth::new(TelemetryMode::Poll)
        }
    }

    fn online(age_secs: i64, values: &[(&str, f64)]) -> TelemetrySnapshot {
        TelemetrySnapshot {
            status: LinkStatus::Online,
            values: values
                .iter()
                .map(|(k, v)| ((*k).to_owned(), Reading::Number(*v)))
                .collect(),
            error: None,
            timestamp: now() - TimeDelta::seconds(age_secs),
        }
    }

    fn offline(age_secs: i64, error: &str) -> TelemetrySnapshot {
        TelemetrySnapshot {
            status: LinkStatus::Offline,
            values: Readings::new(),
            error: Some(error.to_owned()),
            timestamp: now() - TimeDelta::seconds(age_secs),
        }
    }

    fn snapshots(entries: Vec<(&str, TelemetrySnapshot)>) -> SnapshotMap {
        entries
            .into_iter()
            .map(|(name, snap)| (name.to_owned(), snap))
            .collect()
    }

    fn summary(view: &ReconciledView) -> Vec<(String, Connectivity, bool)> {
        view.devices()
            .iter()
            .map(|d| (d.name().to_owned(), d.connectivity, d.stale))
            .collect()
    }

    #[test]
    fn online_snapshot_is_reported_verbatim() {
        let view = reconcile(
            &registry(&["D1"]),
            &snapshots(vec![("D1", online(1, &[("temperature", 25.5)]))]),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );

        let d1 = view.get("D1").unwrap();
        assert_eq!(d1.connectivity, Connectivity::Online);
        assert_eq!(d1.values["temperature"], Reading::Number(25.5));
        assert!(!d1.stale);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn missing_snapshot_is_unknown_with_no_values() {
        let view = reconcile(
            &registry(&["D1"]),
            &SnapshotMap::new(),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );

        let d1 = view.get("D1").unwrap();
        assert_eq!(d1.connectivity, Connectivity::Unknown);
        assert!(d1.values.is_empty());
        assert!(!d1.stale);
        assert!(d1.last_seen.is_none());
    }

    #[test]
    fn unhealthy_channel_freezes_instead_of_reporting_online() {
        let snaps = snapshots(vec![("D1", online(1, &[("temperature", 25.5)]))]);

        for state in [
            ChannelState::Degraded,
            ChannelState::Disconnected,
            ChannelState::Connecting,
        ] {
            let view = reconcile(&registry(&["D1"]), &snaps, &health(state), now(), THRESHOLD);
            let d1 = view.get("D1").unwrap();
            assert_eq!(d1.connectivity, Connectivity::Unknown, "state {state}");
            assert!(d1.stale);
            assert_eq!(d1.last_status, Some(LinkStatus::Online));
            assert_eq!(d1.values["temperature"], Reading::Number(25.5));
        }
    }

    #[test]
    fn old_snapshot_is_stale() {
        let view = reconcile(
            &registry(&["D1", "D2"]),
            &snapshots(vec![
                ("D1", online(11, &[])),
                ("D2", offline(10, "timed out")),
            ]),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );

        assert_eq!(
            summary(&view),
            vec![
                ("D1".to_owned(), Connectivity::Unknown, true),
                ("D2".to_owned(), Connectivity::Offline, false),
            ]
        );
        assert_eq!(view.get("D2").unwrap().error.as_deref(), Some("timed out"));
    }

    #[test]
    fn future_timestamps_count_as_fresh() {
        let view = reconcile(
            &registry(&["D1"]),
            &snapshots(vec![("D1", online(-3600, &[]))]),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );
        assert_eq!(view.get("D1").unwrap().connectivity, Connectivity::Online);
    }

    #[test]
    fn cardinality_and_order_follow_the_registry() {
        let view = reconcile(
            &registry(&["C", "A", "B"]),
            &snapshots(vec![
                ("A", online(0, &[])),
                ("Z", online(0, &[])),
                ("Y", offline(0, "gone")),
            ]),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );

        assert_eq!(view.names().collect::<Vec<_>>(), ["C", "A", "B"]);
        assert!(view.get("Z").is_none());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let reg = registry(&["D1", "D2"]);
        let snaps = snapshots(vec![("D1", online(2, &[("weight", 412.0)]))]);
        let h = health(ChannelState::Connected);

        let first = reconcile(&reg, &snaps, &h, now(), THRESHOLD);
        let second = reconcile(&reg, &snaps, &h, now(), THRESHOLD);
        assert_eq!(first, second);
    }

    #[test]
    fn never_loaded_registry_is_no_data() {
        let reg = RegistryState {
            devices: None,
            last_error: Some("Device registry unavailable: connection refused".into()),
            loaded_at: None,
        };
        let view = reconcile(
            &reg,
            &snapshots(vec![("D1", online(0, &[]))]),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );

        assert_eq!(
            view,
            ReconciledView::NoData {
                last_error: Some("Device registry unavailable: connection refused".into())
            }
        );
        assert!(view.is_empty());
    }

    #[test]
    fn empty_registry_is_an_empty_list_not_no_data() {
        let view = reconcile(
            &registry(&[]),
            &SnapshotMap::new(),
            &health(ChannelState::Connected),
            now(),
            THRESHOLD,
        );
        assert!(!view.is_no_data());
        assert!(view.is_empty());
    }
}
