//! Geographic position and the relative-motion geometry (distance, bearing,
//! CPA/TCPA) used by the surveillance loop.
//!
//! `spec.md` §9 treats these as external collaborators ("total functions
//! over positions and motion vectors"); no crate in the reference corpus
//! supplies marine collision geometry, so they're implemented directly here,
//! grounded on the unit-conversion constants the teacher repo already uses
//! for its own nautical-mile/degree math (`radar/target.rs`).

use std::fmt;
use std::time::{Duration, Instant};

pub const METERS_PER_DEGREE_LATITUDE: f64 = 60. * 1852.;
pub const KN_TO_MS: f64 = 1852. / 3600.;

fn meters_per_degree_longitude(lat_deg: f64) -> f64 {
    METERS_PER_DEGREE_LATITUDE * lat_deg.to_radians().cos()
}

/// A geographic position expressed in degrees latitude and longitude, with
/// an optional altitude in metres (used by SAR aircraft).
///
/// Latitude is positive in the northern hemisphere, negative in the
/// southern. Longitude is positive in the eastern hemisphere, negative in
/// the western. Valid ranges are `[-90, 90]` and `[-180, 180]`
/// respectively — out-of-range values are rejected by [`GeoPosition::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

impl GeoPosition {
    /// Returns `None` if `lat`/`lon` fall outside their valid ranges, per
    /// the data-model invariant in `spec.md` §3 ("out-of-range values from
    /// the codec are not stored").
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(GeoPosition {
            lat,
            lon,
            altitude: None,
        })
    }

    pub fn with_altitude(lat: f64, lon: f64, altitude: f64) -> Option<Self> {
        Self::new(lat, lon).map(|mut p| {
            p.altitude = Some(altitude);
            p
        })
    }

    /// Great-circle distance in metres, using the equirectangular
    /// approximation appropriate at collision-avoidance ranges (a handful
    /// of nautical miles at most).
    pub fn distance_meters(&self, other: &GeoPosition) -> f64 {
        let mean_lat = (self.lat + other.lat) / 2.0;
        let dlat_m = (other.lat - self.lat) * METERS_PER_DEGREE_LATITUDE / 60.0 * 60.0;
        let dlon_m = (other.lon - self.lon) * meters_per_degree_longitude(mean_lat) / 60.0 * 60.0;
        (dlat_m * dlat_m + dlon_m * dlon_m).sqrt()
    }

    /// Initial bearing from `self` to `other`, in degrees `[0, 360)`.
    pub fn bearing_deg(&self, other: &GeoPosition) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let bearing = y.atan2(x).to_degrees();
        (bearing + 360.0) % 360.0
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// A 2-D velocity vector in metres/second, used internally for the CPA
/// computation.
#[derive(Clone, Copy, Debug)]
struct Velocity {
    north: f64,
    east: f64,
}

fn velocity_of(cog_deg: f64, sog_knots: f64) -> Velocity {
    let sog_ms = sog_knots * KN_TO_MS;
    let heading = cog_deg.to_radians();
    Velocity {
        north: sog_ms * heading.cos(),
        east: sog_ms * heading.sin(),
    }
}

/// The relative-motion snapshot the surveillance loop computes for every
/// target relative to the own ship and writes back into
/// `AisTarget::relative_position` (`spec.md` §3, `ShipRelativePosition`).
#[derive(Clone, Copy, Debug)]
pub struct ShipRelativePosition {
    pub from: u32,
    pub to: u32,
    pub distance_meters: f64,
    pub bearing_deg: f64,
    pub closest_point_of_approach_distance_meters: f64,
    pub time_of_closest_point_of_approach: Instant,
}

impl ShipRelativePosition {
    pub fn time_to_closest_point_of_approach(&self, now: Instant) -> Duration {
        self.time_of_closest_point_of_approach
            .saturating_duration_since(now)
    }

    /// Signed time-to-CPA in seconds: positive when the CPA instant is in
    /// the future, negative when it has already passed. The surveillance
    /// loop's warning rule (`spec.md` §4.6) needs both directions
    /// ("`-1 min < tcpa < warningTime`"), which an unsigned `Duration`
    /// can't express on its own.
    pub fn signed_time_to_closest_point_of_approach_secs(&self, now: Instant) -> f64 {
        if self.time_of_closest_point_of_approach >= now {
            self.time_of_closest_point_of_approach
                .duration_since(now)
                .as_secs_f64()
        } else {
            -now.duration_since(self.time_of_closest_point_of_approach)
                .as_secs_f64()
        }
    }

    pub fn is_tcpa_before(&self, now: Instant) -> bool {
        self.time_of_closest_point_of_approach < now
    }
}

/// Computes the relative position, CPA and TCPA of `target` relative to
/// `own_ship`, given both positions and motion vectors (course over ground
/// in degrees, speed over ground in knots). `now` anchors the "present"
/// instant that `time_of_closest_point_of_approach` is computed relative to.
///
/// Returns `None` when either party lacks a position — the spec says this
/// geometry is a total function over "positions and motion vectors" so the
/// caller is expected to only invoke it once both sides have a fix;
/// returning `Option` here keeps that precondition explicit at the type
/// level instead of panicking.
pub fn relative_position(
    own_mmsi: u32,
    own_position: GeoPosition,
    own_cog_deg: f64,
    own_sog_knots: f64,
    target_mmsi: u32,
    target_position: GeoPosition,
    target_cog_deg: f64,
    target_sog_knots: f64,
    now: Instant,
) -> ShipRelativePosition {
    let distance = own_position.distance_meters(&target_position);
    let bearing = own_position.bearing_deg(&target_position);

    let own_v = velocity_of(own_cog_deg, own_sog_knots);
    let target_v = velocity_of(target_cog_deg, target_sog_knots);

    // Relative position of target w.r.t. own ship, in a local flat-earth
    // metre frame centred on own ship, and the relative velocity vector.
    let mean_lat = (own_position.lat + target_position.lat) / 2.0;
    let rel_north =
        (target_position.lat - own_position.lat) * METERS_PER_DEGREE_LATITUDE;
    let rel_east =
        (target_position.lon - own_position.lon) * meters_per_degree_longitude(mean_lat);
    let rel_v_north = target_v.north - own_v.north;
    let rel_v_east = target_v.east - own_v.east;

    let speed_sq = rel_v_north * rel_v_north + rel_v_east * rel_v_east;
    let t_cpa_secs = if speed_sq < 1e-9 {
        0.0
    } else {
        -(rel_north * rel_v_north + rel_east * rel_v_east) / speed_sq
    };

    let cpa_north = rel_north + rel_v_north * t_cpa_secs;
    let cpa_east = rel_east + rel_v_east * t_cpa_secs;
    let cpa_distance = (cpa_north * cpa_north + cpa_east * cpa_east).sqrt();

    let time_of_cpa = if t_cpa_secs >= 0.0 {
        now + Duration::from_secs_f64(t_cpa_secs)
    } else {
        now.checked_sub(Duration::from_secs_f64(-t_cpa_secs))
            .unwrap_or(now)
    };

    ShipRelativePosition {
        from: own_mmsi,
        to: target_mmsi,
        distance_meters: distance,
        bearing_deg: bearing,
        closest_point_of_approach_distance_meters: cpa_distance,
        time_of_closest_point_of_approach: time_of_cpa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_on_targets_close_to_zero_cpa() {
        let now = Instant::now();
        let own = GeoPosition::new(0.0, 0.0).unwrap();
        // About 1 nm north, heading south at 10 kn; own ship stationary.
        let target = GeoPosition::new(1852.0 / METERS_PER_DEGREE_LATITUDE, 0.0).unwrap();
        let rel = relative_position(1, own, 0.0, 0.0, 2, target, 180.0, 10.0, now);
        assert!(rel.closest_point_of_approach_distance_meters < 1.0);
        assert!(rel.time_of_closest_point_of_approach > now);
    }

    #[test]
    fn diverging_targets_have_past_cpa() {
        let now = Instant::now();
        let own = GeoPosition::new(0.0, 0.0).unwrap();
        let target = GeoPosition::new(1852.0 / METERS_PER_DEGREE_LATITUDE, 0.0).unwrap();
        // Target heading further north, away from own ship.
        let rel = relative_position(1, own, 0.0, 0.0, 2, target, 0.0, 10.0, now);
        assert!(rel.is_tcpa_before(now));
    }

    #[test]
    fn out_of_range_position_rejected() {
        assert!(GeoPosition::new(91.0, 0.0).is_none());
        assert!(GeoPosition::new(0.0, 181.0).is_none());
        assert!(GeoPosition::new(47.5, 9.5).is_some());
    }

    #[test]
    fn bearing_due_east_is_90_degrees() {
        let a = GeoPosition::new(0.0, 0.0).unwrap();
        let b = GeoPosition::new(0.0, 1.0).unwrap();
        let bearing = a.bearing_deg(&b);
        assert!((bearing - 90.0).abs() < 1.0);
    }
}
