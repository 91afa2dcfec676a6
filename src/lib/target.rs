//! The AIS target data model (`spec.md` §3): a tagged union over the four
//! station classes a decoded AIVDM/AIVDO stream can describe, plus the
//! helpers that translate between the codec's raw position-report fields
//! and this crate's in-memory representation.
//!
//! Grounded on the teacher's `GeoPosition`/polymorphic-target split in
//! `radar/mod.rs`: one small `Display`-able value type plus a set of
//! plain structs rather than a class hierarchy.

use std::time::Instant;

use crate::geo::GeoPosition;

/// A Maritime Mobile Service Identity. The wire value is 30 bits; `u32` is
/// the natural host type for it.
pub type Mmsi = u32;

/// AIS equipment class, carried on Class A/B position reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransceiverClass {
    A,
    B,
    Unknown,
}

/// `NavigationStatus` enumerates the values carried in Class A position
/// reports (ITU-R M.1371 Table 45). Only the variant this crate's logic
/// inspects directly (`AisSartIsActive`) needs special handling; the rest
/// are passed through opaquely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationStatus {
    UnderWayUsingEngine,
    AtAnchor,
    NotUnderCommand,
    RestrictedManoeuvrability,
    ConstrainedByDraught,
    Moored,
    Aground,
    EngagedInFishing,
    UnderWaySailing,
    Reserved(u8),
    AisSartIsActive,
    NotDefined,
}

/// Bow/stern/port/starboard offsets from the GPS antenna, in metres —
/// the AIS "dimensions" block shared by ships and aids to navigation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dimensions {
    pub to_bow: f64,
    pub to_stern: f64,
    pub to_port: f64,
    pub to_starboard: f64,
}

/// The relative-motion snapshot the surveillance loop writes back onto a
/// target after each CPA/TCPA pass. Re-exported here so callers can match
/// on `AisTarget::common().relative_position` without importing `geo`
/// directly.
pub use crate::geo::ShipRelativePosition;

/// Fields shared by every target variant (`spec.md` §3, "Common
/// attributes").
#[derive(Clone, Debug, Default)]
pub struct CommonFields {
    pub mmsi: Mmsi,
    pub name: Option<String>,
    pub last_seen: Option<Instant>,
    pub position: Option<GeoPosition>,
    pub relative_position: Option<ShipRelativePosition>,
}

#[derive(Clone, Debug)]
pub struct Ship {
    pub common: CommonFields,
    pub call_sign: Option<String>,
    pub destination: Option<String>,
    pub draught: Option<f64>,
    pub imo_number: Option<u32>,
    pub ship_type: u8,
    pub transceiver_class: TransceiverClass,
    pub course_over_ground: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub true_heading: Option<f64>,
    pub rate_of_turn: Option<f64>,
    pub navigation_status: NavigationStatus,
    pub estimated_time_of_arrival: Option<chrono::DateTime<chrono::Utc>>,
    pub dimensions: Dimensions,
}

impl Ship {
    pub fn new(mmsi: Mmsi) -> Self {
        Ship {
            common: CommonFields {
                mmsi,
                ..Default::default()
            },
            call_sign: None,
            destination: None,
            draught: None,
            imo_number: None,
            ship_type: 0,
            transceiver_class: TransceiverClass::Unknown,
            course_over_ground: None,
            speed_over_ground: None,
            true_heading: None,
            rate_of_turn: None,
            navigation_status: NavigationStatus::NotDefined,
            estimated_time_of_arrival: None,
            dimensions: Dimensions::default(),
        }
    }

    /// Zero-padded 9-digit MMSI text, used as the warning message-id for
    /// exceptional-target alerts (`spec.md` §4.2).
    pub fn format_mmsi(&self) -> String {
        format!("{:09}", self.common.mmsi)
    }
}

#[derive(Clone, Debug)]
pub struct BaseStation {
    pub common: CommonFields,
}

impl BaseStation {
    pub fn new(mmsi: Mmsi) -> Self {
        BaseStation {
            common: CommonFields {
                mmsi,
                ..Default::default()
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct SarAircraft {
    pub common: CommonFields,
    pub course_over_ground: Option<f64>,
    pub speed_over_ground: Option<f64>,
    /// Always zero for SAR aircraft — `spec.md` §3.
    pub rate_of_turn: f64,
}

impl SarAircraft {
    pub fn new(mmsi: Mmsi) -> Self {
        SarAircraft {
            common: CommonFields {
                mmsi,
                ..Default::default()
            },
            course_over_ground: None,
            speed_over_ground: None,
            rate_of_turn: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AidToNavigation {
    pub common: CommonFields,
    pub dimensions: Dimensions,
    pub off_position: bool,
    pub virtual_aid: bool,
    pub navigational_aid_type: u8,
}

impl AidToNavigation {
    pub fn new(mmsi: Mmsi) -> Self {
        AidToNavigation {
            common: CommonFields {
                mmsi,
                ..Default::default()
            },
            dimensions: Dimensions::default(),
            off_position: false,
            virtual_aid: false,
            navigational_aid_type: 0,
        }
    }
}

/// The polymorphic target stored by MMSI (`spec.md` §3, §9 "tagged sum
/// type"). A stored target changes variant only via remove-then-insert,
/// never by mutating in place — see `TargetStore::get_or_create`.
#[derive(Clone, Debug)]
pub enum AisTarget {
    Ship(Ship),
    BaseStation(BaseStation),
    SarAircraft(SarAircraft),
    AidToNavigation(AidToNavigation),
}

impl AisTarget {
    pub fn mmsi(&self) -> Mmsi {
        self.common().mmsi
    }

    pub fn common(&self) -> &CommonFields {
        match self {
            AisTarget::Ship(s) => &s.common,
            AisTarget::BaseStation(b) => &b.common,
            AisTarget::SarAircraft(a) => &a.common,
            AisTarget::AidToNavigation(n) => &n.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonFields {
        match self {
            AisTarget::Ship(s) => &mut s.common,
            AisTarget::BaseStation(b) => &mut b.common,
            AisTarget::SarAircraft(a) => &mut a.common,
            AisTarget::AidToNavigation(n) => &mut n.common,
        }
    }

    pub fn as_ship(&self) -> Option<&Ship> {
        match self {
            AisTarget::Ship(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ship_mut(&mut self) -> Option<&mut Ship> {
        match self {
            AisTarget::Ship(s) => Some(s),
            _ => None,
        }
    }

    /// Age of the target relative to `now`; targets with no `last_seen`
    /// (should not happen once inserted, but kept total) are treated as
    /// infinitely old so a cleanup pass prunes them.
    pub fn age(&self, now: Instant) -> std::time::Duration {
        match self.common().last_seen {
            Some(seen) => now.saturating_duration_since(seen),
            None => std::time::Duration::MAX,
        }
    }
}

/// Raw fields carried by a decoded Class A position report, before the
/// rate-of-turn and lat/lon conversions are applied. Mirrors the payload
/// shape `nmea-parser`'s `VesselDynamicData` exposes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionReportClassA {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub raw_rate_of_turn: Option<i8>,
    pub true_heading: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub navigation_status: NavigationStatus,
}

/// Converts a raw sensor rate-of-turn reading into degrees/minute.
/// `spec.md` §4.2: `v = raw / 4.733; rot = sign(v) · v²`.
pub fn rate_of_turn_from_raw(raw: i8) -> f64 {
    let v = raw as f64 / 4.733;
    v.signum() * v * v
}

/// Inverse of [`rate_of_turn_from_raw`], used when encoding outbound
/// position reports: `v = sign(r)·√|r|; raw = round(v · 4.733)`.
pub fn rate_of_turn_to_raw(rot_deg_per_min: f64) -> i8 {
    let v = rot_deg_per_min.signum() * rot_deg_per_min.abs().sqrt();
    let raw = (v * 4.733).round();
    raw.clamp(i8::MIN as f64, i8::MAX as f64) as i8
}

/// Applies a decoded Class A position report onto a `Ship`, per
/// `spec.md` §4.2's `positionReportClassAToShip` rule. Latitude/longitude
/// outside their valid ranges are rejected by [`GeoPosition::new`] and the
/// stored position is left unchanged, per the §3 invariant.
pub fn apply_position_report_class_a(ship: &mut Ship, report: &PositionReportClassA) {
    if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
        if let Some(pos) = GeoPosition::new(lat, lon) {
            ship.common.position = Some(pos);
        } else {
            log::warn!(
                "ignoring out-of-range position ({}, {}) for MMSI {}",
                lat,
                lon,
                ship.common.mmsi
            );
        }
    }
    ship.rate_of_turn = report.raw_rate_of_turn.map(rate_of_turn_from_raw);
    ship.true_heading = report.true_heading;
    ship.course_over_ground = report.course_over_ground;
    ship.speed_over_ground = report.speed_over_ground;
    ship.navigation_status = report.navigation_status;
}

/// A station class recognised by `identify_mmsi_type`, per the ITU-R
/// M.585 MID allocations for AIS emergency beacons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmsiDeviceClass {
    AisSart,
    Epirb,
    Mob,
    Ordinary,
}

/// Classifies an MMSI by its MID range, recognizing the AIS-SART
/// (970xxxxxx), EPIRB-AIS (974xxxxxx) and MOB-AIS (972xxxxxx) emergency
/// beacon ranges `checkIsExceptionalTarget` (`spec.md` §4.2) depends on.
pub fn identify_mmsi_type(mmsi: Mmsi) -> MmsiDeviceClass {
    match mmsi / 1_000_000 {
        970 => MmsiDeviceClass::AisSart,
        974 => MmsiDeviceClass::Epirb,
        972 => MmsiDeviceClass::Mob,
        _ => MmsiDeviceClass::Ordinary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mmsi_is_zero_padded() {
        let ship = Ship::new(2442);
        assert_eq!(ship.format_mmsi(), "000002442");
    }

    #[test]
    fn identify_mmsi_type_recognizes_emergency_ranges() {
        assert_eq!(identify_mmsi_type(970_123_456), MmsiDeviceClass::AisSart);
        assert_eq!(identify_mmsi_type(974_000_001), MmsiDeviceClass::Epirb);
        assert_eq!(identify_mmsi_type(972_000_001), MmsiDeviceClass::Mob);
        assert_eq!(identify_mmsi_type(244_670_123), MmsiDeviceClass::Ordinary);
    }

    #[test]
    fn rate_of_turn_round_trips_within_quantisation() {
        for raw in [-120i8, -30, -1, 0, 1, 30, 120] {
            let rot = rate_of_turn_from_raw(raw);
            let back = rate_of_turn_to_raw(rot);
            assert!((back as i32 - raw as i32).abs() <= 1, "raw={raw} rot={rot} back={back}");
        }
    }

    #[test]
    fn position_report_rejects_out_of_range_position() {
        let mut ship = Ship::new(1);
        let report = PositionReportClassA {
            latitude: Some(91.0),
            longitude: Some(0.0),
            ..Default::default()
        };
        apply_position_report_class_a(&mut ship, &report);
        assert!(ship.common.position.is_none());
    }

    #[test]
    fn position_report_applies_valid_fields() {
        let mut ship = Ship::new(244_670_123);
        let report = PositionReportClassA {
            latitude: Some(47.5),
            longitude: Some(9.5),
            raw_rate_of_turn: None,
            true_heading: Some(271.0),
            course_over_ground: Some(270.0),
            speed_over_ground: Some(5.0),
            navigation_status: NavigationStatus::UnderWayUsingEngine,
        };
        apply_position_report_class_a(&mut ship, &report);
        let pos = ship.common.position.unwrap();
        assert_eq!(pos.lat, 47.5);
        assert_eq!(pos.lon, 9.5);
        assert_eq!(ship.course_over_ground, Some(270.0));
        assert_eq!(ship.speed_over_ground, Some(5.0));
        assert_eq!(ship.true_heading, Some(271.0));
    }
}
