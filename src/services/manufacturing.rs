//! Manufacturing network detection
//!
//! Signals are evaluated in strict priority order and the first positive one
//! wins: explicit override, one-time marker file, fixture reachability. No
//! state is persisted here beyond the marker file itself, so the answer may
//! change from boot to boot as the device moves between networks.

use crate::{
    config::ManufacturingConfig,
    services::{
        marker::{MarkerFile, MarkerState},
        probe::{PingProbe, ReachabilityProbe},
    },
};
use log::{error, info, warn};

/// Values of the override flag that mean "in manufacturing", compared
/// case-insensitively.
const TRUTHY_OVERRIDES: [&str; 3] = ["true", "1", "t"];

/// The signal that put the device into manufacturing mode
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ManufacturingSignal {
    Override,
    Marker,
    FixtureReachable,
}

/// Result of one detection pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManufacturingDecision {
    pub signal: Option<ManufacturingSignal>,
    pub marker: MarkerState,
    /// Why the probe did not succeed, if it ran and failed
    pub probe_failure: Option<String>,
}

impl ManufacturingDecision {
    pub fn in_manufacturing(&self) -> bool {
        self.signal.is_some()
    }
}

/// Whether an override value means "in manufacturing"
pub fn override_is_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        TRUTHY_OVERRIDES
            .iter()
            .any(|truthy| value.eq_ignore_ascii_case(truthy))
    })
}

pub struct ManufacturingDetector<P>
where
    P: ReachabilityProbe,
{
    override_flag: Option<String>,
    marker: MarkerFile,
    probe: P,
}

impl ManufacturingDetector<PingProbe> {
    pub fn from_config(config: &ManufacturingConfig) -> Self {
        Self::new(
            config.override_flag.clone(),
            MarkerFile::new(config.marker_path.clone(), "in manufacturing"),
            PingProbe::new(config.ping_binary.clone(), config.fixture_address),
        )
    }
}

impl<P> ManufacturingDetector<P>
where
    P: ReachabilityProbe,
{
    pub fn new(override_flag: Option<String>, marker: MarkerFile, probe: P) -> Self {
        Self {
            override_flag,
            marker,
            probe,
        }
    }

    /// Full detection: override, then marker (consumed), then probe.
    pub async fn in_manufacturing(&self) -> ManufacturingDecision {
        if let Some(decision) = self.check_override() {
            return decision;
        }

        let marker = match self.marker.consume() {
            Ok(state) => state,
            Err(e) => {
                warn!("failed to check manufacturing marker, assuming absent: {e:#}");
                MarkerState::NeverPresent
            }
        };

        if marker.fired() {
            info!("manufacturing marker found");
            return ManufacturingDecision {
                signal: Some(ManufacturingSignal::Marker),
                marker,
                probe_failure: None,
            };
        }

        self.check_probe(marker).await
    }

    /// Network-only detection: override, then probe. The marker is left alone.
    pub async fn in_manufacturing_network(&self) -> ManufacturingDecision {
        if let Some(decision) = self.check_override() {
            return decision;
        }

        self.check_probe(MarkerState::NotYetChecked).await
    }

    fn check_override(&self) -> Option<ManufacturingDecision> {
        override_is_set(self.override_flag.as_deref()).then(|| {
            info!("manufacturing mode forced by IN_MANUFACTURING");
            ManufacturingDecision {
                signal: Some(ManufacturingSignal::Override),
                ..Default::default()
            }
        })
    }

    async fn check_probe(&self, marker: MarkerState) -> ManufacturingDecision {
        info!("probing manufacturing fixture to detect network");

        match self.probe.probe().await {
            Ok(()) => {
                info!("manufacturing fixture reachable");
                ManufacturingDecision {
                    signal: Some(ManufacturingSignal::FixtureReachable),
                    marker,
                    probe_failure: None,
                }
            }
            Err(e) => {
                error!("failed to reach manufacturing fixture: {e:#}");
                ManufacturingDecision {
                    signal: None,
                    marker,
                    probe_failure: Some(format!("{e:#}")),
                }
            }
        }
    }
}
