//! `ais_sentinel` — an AIS target-tracking core and NMEA log-replay driver.
//!
//! Ingests decoded NMEA-0183 sentences, maintains a concurrent database of
//! AIS targets (ships, base stations, aids to navigation, SAR aircraft),
//! computes Closest-Point-of-Approach / Time-to-CPA collision geometry
//! against the own ship, and emits safety-related broadcast warnings.
//! [`replay::LogReplaySource`] feeds a recorded sentence log into the
//! pipeline, either as fast as possible or paced to the original
//! recording's wall-clock cadence.
//!
//! The collision geometry here is an estimate for situational awareness,
//! not a certified collision-avoidance system — it does not replace radar
//! ARPA or a navigator's judgement.

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod geo;
pub mod manager;
pub mod position;
pub mod replay;
pub mod store;
pub mod target;
pub mod warnings;

pub use clock::{Clock, SystemClock, TestClock};
pub use config::{ManagerConfig, TrackEstimationParameters};
pub use error::AisError;
pub use manager::AisManager;
pub use replay::{LogReplaySource, ReplayInput, ReplayMode};
pub use store::TargetStore;
pub use target::{AisTarget, Mmsi};
