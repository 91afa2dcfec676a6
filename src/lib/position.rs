//! The Sentence Cache / Position Provider boundary (`spec.md` §2.2):
//! "stores recent position/heading/speed sentences; exposes
//! `TryGetCurrentPosition(now) → (position, cog, sog, heading,
//! messageTime)`". Treated by the spec as an external collaborator — the
//! manager only depends on the `PositionProvider` trait — but a default
//! in-process implementation is supplied so the crate and its binary are
//! usable without wiring in a separate sentence parser.
//!
//! Grounded on the teacher's `navdata.rs`, which keeps the own-ship
//! position/COG/SOG/heading as a handful of fields updated by whichever
//! NMEA sentence last carried them; here those fields live on an instance
//! behind a mutex instead of process-wide statics, since this crate has no
//! single-radar-process assumption to lean on.

use std::sync::Mutex;
use std::time::Instant;

use crate::geo::GeoPosition;

/// A snapshot of the own ship's most recently observed motion state.
#[derive(Clone, Copy, Debug)]
pub struct OwnShipFix {
    pub position: Option<GeoPosition>,
    pub course_over_ground: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub true_heading: Option<f64>,
    pub message_time: Instant,
}

/// External collaborator boundary: something that can answer "where and
/// how fast is the own ship right now". `spec.md` §4.5 says the result is
/// "not ok" when there is no position, or when the position is older than
/// `maximumPositionAge` — that staleness check is the manager's job, not
/// the provider's; the provider only reports what it last saw and when.
pub trait PositionProvider: Send + Sync {
    fn try_get_current_position(&self, now: Instant) -> Option<OwnShipFix>;

    /// Lets the provider inspect a raw incoming sentence before AIS
    /// dispatch, per `spec.md` §4.2 step 1 ("Forward the sentence to the
    /// Sentence Cache"). Default no-op — a provider fed out-of-band (e.g.
    /// a GPS daemon) has nothing to do here.
    fn observe_sentence(&self, _sentence: &str, _now: Instant) {}
}

/// Default in-process `PositionProvider`, fed by whatever component parses
/// incoming position/COG/SOG/heading-bearing sentences (RMC, GLL, VTG,
/// HDT, …) ahead of the AIS payload dispatch.
pub struct SentenceCache {
    fix: Mutex<Option<OwnShipFix>>,
    parser: Mutex<nmea_parser::NmeaParser>,
}

impl SentenceCache {
    pub fn new() -> Self {
        SentenceCache {
            fix: Mutex::new(None),
            parser: Mutex::new(nmea_parser::NmeaParser::new()),
        }
    }

    pub fn set_position(&self, position: GeoPosition, now: Instant) {
        let mut fix = self.fix.lock().unwrap();
        let entry = fix.get_or_insert(OwnShipFix {
            position: None,
            course_over_ground: None,
            speed_over_ground: None,
            true_heading: None,
            message_time: now,
        });
        entry.position = Some(position);
        entry.message_time = now;
    }

    pub fn set_course_over_ground(&self, cog_deg: f64, now: Instant) {
        let mut fix = self.fix.lock().unwrap();
        let entry = fix.get_or_insert(OwnShipFix {
            position: None,
            course_over_ground: None,
            speed_over_ground: None,
            true_heading: None,
            message_time: now,
        });
        entry.course_over_ground = Some(cog_deg);
        entry.message_time = now;
    }

    pub fn set_speed_over_ground(&self, sog_knots: f64, now: Instant) {
        let mut fix = self.fix.lock().unwrap();
        let entry = fix.get_or_insert(OwnShipFix {
            position: None,
            course_over_ground: None,
            speed_over_ground: None,
            true_heading: None,
            message_time: now,
        });
        entry.speed_over_ground = Some(sog_knots);
        entry.message_time = now;
    }

    pub fn set_true_heading(&self, heading_deg: f64, now: Instant) {
        let mut fix = self.fix.lock().unwrap();
        let entry = fix.get_or_insert(OwnShipFix {
            position: None,
            course_over_ground: None,
            speed_over_ground: None,
            true_heading: None,
            message_time: now,
        });
        entry.true_heading = Some(heading_deg);
        entry.message_time = now;
    }
}

impl Default for SentenceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionProvider for SentenceCache {
    fn try_get_current_position(&self, _now: Instant) -> Option<OwnShipFix> {
        *self.fix.lock().unwrap()
    }

    /// Parses own-ship GNSS sentences the way the teacher's `navdata.rs`
    /// does — matching on the decoded sentence kind and updating whichever
    /// fields it carries — except state lives on this instance rather
    /// than process-wide statics.
    fn observe_sentence(&self, sentence: &str, now: Instant) {
        use nmea_parser::ParsedMessage;

        let parsed = {
            let mut parser = self.parser.lock().unwrap();
            parser.parse_sentence(sentence).ok()
        };
        match parsed {
            Some(ParsedMessage::Rmc(rmc)) => {
                if let (Some(lat), Some(lon)) = (rmc.latitude, rmc.longitude) {
                    if let Some(pos) = GeoPosition::new(lat, lon) {
                        self.set_position(pos, now);
                    }
                }
                if let Some(sog) = rmc.speed_knots {
                    self.set_speed_over_ground(sog, now);
                }
                if let Some(cog) = rmc.bearing {
                    self.set_course_over_ground(cog, now);
                }
            }
            Some(ParsedMessage::Gll(gll)) => {
                if let (Some(lat), Some(lon)) = (gll.latitude, gll.longitude) {
                    if let Some(pos) = GeoPosition::new(lat, lon) {
                        self.set_position(pos, now);
                    }
                }
            }
            Some(ParsedMessage::Vtg(vtg)) => {
                if let Some(cog) = vtg.cog_true {
                    self.set_course_over_ground(cog, now);
                }
                if let Some(sog) = vtg.sog_knots {
                    self.set_speed_over_ground(sog, now);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_has_no_fix() {
        let cache = SentenceCache::new();
        assert!(cache.try_get_current_position(Instant::now()).is_none());
    }

    #[test]
    fn set_position_then_motion_accumulates_on_one_fix() {
        let cache = SentenceCache::new();
        let now = Instant::now();
        let pos = GeoPosition::new(47.5, 9.5).unwrap();
        cache.set_position(pos, now);
        cache.set_course_over_ground(270.0, now);
        cache.set_speed_over_ground(5.0, now);
        let fix = cache.try_get_current_position(now).unwrap();
        assert_eq!(fix.position, Some(pos));
        assert_eq!(fix.course_over_ground, Some(270.0));
        assert_eq!(fix.speed_over_ground, Some(5.0));
    }
}
