//! Manager configuration (`spec.md` §6). A plain struct, not CLI-bound —
//! the `ais-replay` binary's `clap`-derived `Cli` builds one of these from
//! parsed arguments, mirroring the teacher's split between its `Cli`
//! struct (`lib/mod.rs`) and its own settings/config types.

use std::time::Duration;

use crate::codec::GeneratedSentenceId;
use crate::target::{Dimensions, Mmsi};

/// `spec.md` §4.5/§4.6 `TrackEstimationParameters`.
#[derive(Clone, Copy, Debug)]
pub struct TrackEstimationParameters {
    /// Own-ship position older than this is treated as stale by
    /// `getOwnShipData`.
    pub maximum_position_age: Duration,
    /// Reserved for future target-pruning heuristics; carried through from
    /// the spec's parameter bundle even though no operation currently
    /// reads it directly (cleanup uses `deleteTargetAfterTimeout` instead).
    pub target_lost_timeout: Duration,
    /// CPA distance in metres below which a target triggers a dangerous-
    /// vessel warning.
    pub warning_distance_meters: f64,
    /// TCPA ceiling for the same warning.
    pub warning_time: Duration,
    /// Surveillance loop period.
    pub ais_safety_check_interval: Duration,
    /// Whether the surveillance loop emits GNSS-missing warnings.
    pub warn_if_gnss_missing: bool,
}

impl Default for TrackEstimationParameters {
    fn default() -> Self {
        TrackEstimationParameters {
            maximum_position_age: Duration::from_secs(60),
            target_lost_timeout: Duration::from_secs(600),
            warning_distance_meters: 1_852.0, // 1 nautical mile
            warning_time: Duration::from_secs(12 * 60),
            ais_safety_check_interval: Duration::from_secs(2),
            warn_if_gnss_missing: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ManagerConfig {
    pub own_mmsi: Mmsi,
    pub own_ship_name: String,
    pub own_dimensions: Dimensions,
    pub auto_send_warnings: bool,
    /// Zero means infinite (`spec.md` §6: "0 = infinite").
    pub delete_target_after_timeout: Duration,
    pub track_estimation_parameters: TrackEstimationParameters,
    pub throw_on_unknown_message: bool,
    pub generated_sentences_id: GeneratedSentenceId,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            own_mmsi: 0,
            own_ship_name: String::new(),
            own_dimensions: Dimensions::default(),
            auto_send_warnings: true,
            delete_target_after_timeout: Duration::ZERO,
            track_estimation_parameters: TrackEstimationParameters::default(),
            throw_on_unknown_message: false,
            generated_sentences_id: GeneratedSentenceId::Vdo,
        }
    }
}

/// `CleanupLatency` — minimum interval between cleanup passes (`spec.md`
/// §4.3).
pub const CLEANUP_LATENCY: Duration = Duration::from_secs(30);

/// Floor on the surveillance loop's sleep between iterations (`spec.md`
/// §4.6 step 7).
pub const MINIMUM_ALARM_SLEEP: Duration = Duration::from_millis(20);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = ManagerConfig::default();
        assert!(config.auto_send_warnings);
        assert_eq!(config.delete_target_after_timeout, Duration::ZERO);
        assert_eq!(config.generated_sentences_id, GeneratedSentenceId::Vdo);
        assert!(!config.throw_on_unknown_message);
    }
}
