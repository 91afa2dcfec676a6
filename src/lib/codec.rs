//! The AIS Codec boundary (`spec.md` §2.3): `Parse(sentence) → AisMessage?`
//! and `ToSentences(AisMessage) → [sentence…]`. Decoding is delegated to
//! the `nmea-parser` crate (the same dependency the teacher already
//! carries); no published crate in the reference corpus implements AIS
//! *encoding*, so the outbound half is a small from-scratch AIVDM armourer
//! grounded on the 6-bit bit-packing primitives in `nmea-parser`'s own
//! `util.rs` (inverted: packing instead of unpacking).

use chrono::{DateTime, Utc};

use crate::target::{Mmsi, NavigationStatus, PositionReportClassA};

/// A decoded AIS payload message, translated from whatever the underlying
/// parser crate produced into the shape this crate's dispatch table
/// (`spec.md` §4.2) expects. Deliberately narrower than the wire protocol:
/// message kinds this crate only consumes silently (interrogation, data
/// link management, acknowledgements) are folded into `Consumed`.
#[derive(Clone, Debug)]
pub enum AisMessage {
    PositionReportClassA {
        mmsi: Mmsi,
        report: PositionReportClassA,
    },
    /// Covers `spec.md` §4.2's "Static Data Report Part A", "Static Data
    /// Report Part B" and "Static & Voyage Related Data" dispatch rows
    /// together: `nmea-parser`'s `VesselStaticData` already merges AIS
    /// message types 5 and 24 (Parts A and B) into one struct before this
    /// crate sees it, so there is no wire-level way to tell a lone Part A
    /// from a lone Part B once decoded. Fields absent on the wire arrive
    /// as `None`/`0`, and the manager only overwrites a ship's existing
    /// field when the incoming value is present — see `manager.rs`'s
    /// dispatch arm for this variant.
    StaticAndVoyageData {
        mmsi: Mmsi,
        ship_name: Option<String>,
        call_sign: Option<String>,
        destination: Option<String>,
        draught: Option<f64>,
        imo_number: Option<u32>,
        ship_type: u8,
        to_bow: f64,
        to_stern: f64,
        to_port: f64,
        to_starboard: f64,
        eta_month: Option<u8>,
        eta_day: Option<u8>,
        eta_hour: Option<u8>,
        eta_minute: Option<u8>,
    },
    StandardClassBPositionReport {
        mmsi: Mmsi,
        latitude: Option<f64>,
        longitude: Option<f64>,
        course_over_ground: Option<f64>,
        speed_over_ground: Option<f64>,
        true_heading: Option<f64>,
    },
    ExtendedClassBPositionReport {
        mmsi: Mmsi,
        latitude: Option<f64>,
        longitude: Option<f64>,
        course_over_ground: Option<f64>,
        speed_over_ground: Option<f64>,
        true_heading: Option<f64>,
        ship_name: Option<String>,
        ship_type: u8,
        to_bow: f64,
        to_stern: f64,
        to_port: f64,
        to_starboard: f64,
    },
    BaseStationReport {
        mmsi: Mmsi,
        latitude: Option<f64>,
        longitude: Option<f64>,
    },
    StandardSarAircraftPositionReport {
        mmsi: Mmsi,
        latitude: Option<f64>,
        longitude: Option<f64>,
        altitude_m: Option<f64>,
        course_over_ground: Option<f64>,
        speed_over_ground: Option<f64>,
    },
    AidToNavigationReport {
        mmsi: Mmsi,
        name: String,
        name_extension: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        to_bow: f64,
        to_stern: f64,
        to_port: f64,
        to_starboard: f64,
        off_position: bool,
        virtual_aid: bool,
        navigational_aid_type: u8,
    },
    AddressedSafetyRelatedMessage {
        source_mmsi: Mmsi,
        destination_mmsi: Mmsi,
        text: String,
    },
    SafetyRelatedBroadcastMessage {
        source_mmsi: Mmsi,
        text: String,
    },
    /// Interrogation / data link management / anything else this crate
    /// consumes without acting on, per `spec.md` §4.2's dispatch table row
    /// "consume silently".
    Consumed,
    /// Anything the parser recognised but this crate has no dispatch row
    /// for. Distinct from `Consumed` so `throwOnUnknownMessage` can tell
    /// the two apart.
    Unrecognized,
}

/// `spec.md` §6's `generatedSentencesId` option: which AIS talker sentence
/// identifier outbound messages are wrapped in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratedSentenceId {
    Vdm,
    Vdo,
}

impl Default for GeneratedSentenceId {
    fn default() -> Self {
        GeneratedSentenceId::Vdo
    }
}

/// The codec boundary itself: decode incoming raw sentences, encode
/// outbound AIS messages back into sentences.
pub trait Codec: Send + Sync {
    fn decode(&self, sentence: &str) -> Option<AisMessage>;

    /// Encodes `message` into one or more outbound NMEA sentences tagged
    /// with `sentence_id`. Returns `Err` if encoding isn't supported for
    /// this message (see `AisError::UnsupportedEncoding`).
    fn encode(
        &self,
        message: &AisMessage,
        sentence_id: GeneratedSentenceId,
    ) -> Result<Vec<String>, crate::error::AisError>;
}

/// Default `Codec`, decoding via `nmea-parser` and encoding via the
/// from-scratch AIVDM armourer in [`aivdm`].
pub struct NmeaParserCodec {
    inner: std::sync::Mutex<nmea_parser::NmeaParser>,
}

impl NmeaParserCodec {
    pub fn new() -> Self {
        NmeaParserCodec {
            inner: std::sync::Mutex::new(nmea_parser::NmeaParser::new()),
        }
    }
}

impl Default for NmeaParserCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the ETA rollover rule from `spec.md` §4.2 directly: year =
/// current UTC year; if `(month, day) < (now.month, now.day)`
/// lexicographically, add one year. Returns `None` (never panics) when the
/// composed calendar date doesn't exist (e.g. 31 February).
pub fn compose_eta(
    now: DateTime<Utc>,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
) -> Option<DateTime<Utc>> {
    use chrono::{NaiveDate, TimeZone};

    let mut year = now.format("%Y").to_string().parse::<i32>().ok()?;
    let now_month = now.format("%m").to_string().parse::<u8>().ok()?;
    let now_day = now.format("%d").to_string().parse::<u8>().ok()?;
    if (month, day) < (now_month, now_day) {
        year += 1;
    }
    let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
    let time = date.and_hms_opt(hour as u32, minute as u32, 0)?;
    match Utc.from_local_datetime(&time).single() {
        Some(dt) => Some(dt),
        None => None,
    }
}

/// `spec.md` §6: "AIS payloads recognised are AIVDM/AIVDO multi-part; all
/// others are cached only." Non-AIS NMEA chatter (RMC, GLL, VTG, GGA, ZDA,
/// …) that happens to parse successfully must never reach
/// `throwOnUnknownMessage` as though it were an unrecognised *AIS* message
/// type — it's simply not an AIS sentence, so `decode` reports a miss for
/// it before even invoking the parser.
fn is_ais_payload_sentence(sentence: &str) -> bool {
    sentence
        .splitn(2, ',')
        .next()
        .map(|identifier| identifier.ends_with("VDM") || identifier.ends_with("VDO"))
        .unwrap_or(false)
}

impl Codec for NmeaParserCodec {
    fn decode(&self, sentence: &str) -> Option<AisMessage> {
        use nmea_parser::ParsedMessage;

        if !is_ais_payload_sentence(sentence) {
            return None;
        }

        let mut parser = self.inner.lock().unwrap();
        let parsed = parser.parse_sentence(sentence).ok()?;
        let message = match parsed {
            ParsedMessage::VesselDynamicData(d) => AisMessage::PositionReportClassA {
                mmsi: d.mmsi,
                report: PositionReportClassA {
                    latitude: d.latitude,
                    longitude: d.longitude,
                    raw_rate_of_turn: None,
                    true_heading: d.heading_true,
                    course_over_ground: d.cog,
                    speed_over_ground: d.sog_knots,
                    navigation_status: map_navigation_status(d.nav_status),
                },
            },
            ParsedMessage::VesselStaticData(s) => {
                let (eta_month, eta_day, eta_hour, eta_minute) = match s.eta {
                    Some(eta) => (
                        eta.format("%m").to_string().parse().ok(),
                        eta.format("%d").to_string().parse().ok(),
                        eta.format("%H").to_string().parse().ok(),
                        eta.format("%M").to_string().parse().ok(),
                    ),
                    None => (None, None, None, None),
                };
                AisMessage::StaticAndVoyageData {
                    mmsi: s.mmsi,
                    ship_name: s.name,
                    call_sign: s.call_sign,
                    destination: s.destination,
                    draught: s.draught10.map(|d| d as f64 / 10.0),
                    imo_number: s.imo_number,
                    ship_type: s.ship_type as u8,
                    to_bow: s.dimension_to_bow.unwrap_or(0) as f64,
                    to_stern: s.dimension_to_stern.unwrap_or(0) as f64,
                    to_port: s.dimension_to_port.unwrap_or(0) as f64,
                    to_starboard: s.dimension_to_starboard.unwrap_or(0) as f64,
                    eta_month,
                    eta_day,
                    eta_hour,
                    eta_minute,
                }
            }
            ParsedMessage::BaseStationReport(b) => AisMessage::BaseStationReport {
                mmsi: b.mmsi,
                latitude: b.latitude,
                longitude: b.longitude,
            },
            ParsedMessage::StandardSarAircraftPositionReport(a) => {
                AisMessage::StandardSarAircraftPositionReport {
                    mmsi: a.mmsi,
                    latitude: a.latitude,
                    longitude: a.longitude,
                    altitude_m: a.altitude.map(|v| v as f64),
                    course_over_ground: a.cog,
                    speed_over_ground: a.sog_knots.map(|v| v as f64),
                }
            }
            ParsedMessage::AidToNavigationReport(n) => AisMessage::AidToNavigationReport {
                mmsi: n.mmsi,
                name: n.name,
                name_extension: None,
                latitude: n.latitude,
                longitude: n.longitude,
                to_bow: n.dimension_to_bow.unwrap_or(0) as f64,
                to_stern: n.dimension_to_stern.unwrap_or(0) as f64,
                to_port: n.dimension_to_port.unwrap_or(0) as f64,
                to_starboard: n.dimension_to_starboard.unwrap_or(0) as f64,
                off_position: n.off_position_indicator,
                virtual_aid: n.virtual_aid_flag,
                navigational_aid_type: n.aid_type as u8,
            },
            ParsedMessage::AddressedSafetyRelatedMessage(m) => {
                AisMessage::AddressedSafetyRelatedMessage {
                    source_mmsi: m.source_mmsi,
                    destination_mmsi: m.destination_mmsi,
                    text: m.text,
                }
            }
            ParsedMessage::SafetyRelatedBroadcastMessage(m) => {
                AisMessage::SafetyRelatedBroadcastMessage {
                    source_mmsi: m.mmsi,
                    text: m.text,
                }
            }
            ParsedMessage::Interrogation(_)
            | ParsedMessage::UtcDateInquiry(_)
            | ParsedMessage::AssignmentModeCommand(_)
            | ParsedMessage::SafetyRelatedAcknowledgement(_) => AisMessage::Consumed,
            ParsedMessage::Incomplete => return None,
            _ => AisMessage::Unrecognized,
        };
        Some(message)
    }

    fn encode(
        &self,
        message: &AisMessage,
        sentence_id: GeneratedSentenceId,
    ) -> Result<Vec<String>, crate::error::AisError> {
        aivdm::encode(message, sentence_id)
    }
}

fn map_navigation_status(raw: nmea_parser::ais::NavigationStatus) -> NavigationStatus {
    use nmea_parser::ais::NavigationStatus as N;
    match raw {
        N::UnderWayUsingEngine => NavigationStatus::UnderWayUsingEngine,
        N::AtAnchor => NavigationStatus::AtAnchor,
        N::NotUnderCommand => NavigationStatus::NotUnderCommand,
        N::RestrictedManoeuverability => NavigationStatus::RestrictedManoeuvrability,
        N::ConstrainedByDraught => NavigationStatus::ConstrainedByDraught,
        N::Moored => NavigationStatus::Moored,
        N::Aground => NavigationStatus::Aground,
        N::EngagedInFishing => NavigationStatus::EngagedInFishing,
        N::UnderWaySailing => NavigationStatus::UnderWaySailing,
        N::AisSartIsActive => NavigationStatus::AisSartIsActive,
        N::NotDefined => NavigationStatus::NotDefined,
        other => NavigationStatus::Reserved(other as u8),
    }
}

/// The from-scratch outbound AIVDM armourer. Grounded on `nmea-parser`'s
/// `util::parse_payload`/`pick_u64`/`pick_i64`/`pick_string` bit-unpacking
/// primitives — this module does the inverse: packing fields into the
/// six-bit ASCII payload alphabet. Only what `spec.md` §4.2/§4.4 actually
/// needs to emit is implemented: Class A position reports (type 1) and
/// safety-related broadcasts (type 14).
mod aivdm {
    use super::{AisMessage, GeneratedSentenceId};
    use crate::error::AisError;

    const SIXBIT_ALPHABET: &[u8; 64] =
        b"0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_ !\"#$%&'()*+,-./";

    struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        fn new() -> Self {
            BitWriter { bits: Vec::new() }
        }

        fn push_uint(&mut self, value: u64, width: u32) {
            for i in (0..width).rev() {
                self.bits.push((value >> i) & 1 == 1);
            }
        }

        fn push_int(&mut self, value: i64, width: u32) {
            self.push_uint(value as u64 & ((1u64 << width) - 1), width);
        }

        fn push_str(&mut self, text: &str, width_chars: u32) {
            let padded: String = text
                .chars()
                .chain(std::iter::repeat('@'))
                .take(width_chars as usize)
                .collect();
            for ch in padded.chars() {
                let code = ais_char_code(ch);
                self.push_uint(code as u64, 6);
            }
        }

        fn into_payload(mut self) -> String {
            while self.bits.len() % 6 != 0 {
                self.bits.push(false);
            }
            let mut out = String::with_capacity(self.bits.len() / 6);
            for chunk in self.bits.chunks(6) {
                let mut value: u8 = 0;
                for bit in chunk {
                    value = (value << 1) | (*bit as u8);
                }
                let armoured = if value < 40 { value + 48 } else { value + 56 };
                out.push(armoured as char);
            }
            out
        }
    }

    fn ais_char_code(ch: char) -> u8 {
        let upper = ch.to_ascii_uppercase();
        SIXBIT_ALPHABET
            .iter()
            .position(|&c| c as char == upper)
            .unwrap_or(32) as u8
    }

    fn checksum(sentence_body: &str) -> u8 {
        sentence_body.bytes().fold(0u8, |acc, b| acc ^ b)
    }

    fn wrap_sentence(talker_id: &str, payload: &str, fill_bits: u8) -> String {
        let body = format!(
            "{talker_id},1,1,,A,{payload},{fill_bits}",
            talker_id = talker_id,
            payload = payload,
            fill_bits = fill_bits
        );
        let cksum = checksum(&body);
        format!("!{}*{:02X}", body, cksum)
    }

    fn degrees_to_fixed(value: f64, scale: f64) -> i64 {
        (value * scale).round() as i64
    }

    pub fn encode(
        message: &AisMessage,
        sentence_id: GeneratedSentenceId,
    ) -> Result<Vec<String>, AisError> {
        let talker_id = match sentence_id {
            GeneratedSentenceId::Vdm => "!AIVDM",
            GeneratedSentenceId::Vdo => "!AIVDO",
        };

        match message {
            AisMessage::PositionReportClassA { mmsi, report } => {
                let mut w = BitWriter::new();
                w.push_uint(1, 6); // message type 1
                w.push_uint(0, 2); // repeat indicator
                w.push_uint(*mmsi as u64, 30);
                w.push_uint(navigation_status_code(report.navigation_status), 4);
                let raw_rot = report
                    .raw_rate_of_turn
                    .unwrap_or(-128);
                w.push_int(raw_rot as i64, 8);
                let sog = report
                    .speed_over_ground
                    .map(|v| degrees_to_fixed(v, 10.0))
                    .unwrap_or(1023);
                w.push_uint(sog as u64, 10);
                w.push_uint(1, 1); // position accuracy: high
                let lon = report
                    .longitude
                    .map(|v| degrees_to_fixed(v, 600_000.0))
                    .unwrap_or(0x6791AC0);
                w.push_int(lon, 28);
                let lat = report
                    .latitude
                    .map(|v| degrees_to_fixed(v, 600_000.0))
                    .unwrap_or(0x3412140);
                w.push_int(lat, 27);
                let cog = report
                    .course_over_ground
                    .map(|v| degrees_to_fixed(v, 10.0))
                    .unwrap_or(3600);
                w.push_uint(cog as u64, 12);
                let heading = report.true_heading.map(|v| v as u64).unwrap_or(511);
                w.push_uint(heading, 9);
                w.push_uint(60, 6); // time stamp: 60 = not available
                w.push_uint(0, 2); // manoeuvre indicator
                w.push_uint(0, 3); // spare
                w.push_uint(0, 1); // RAIM
                w.push_uint(0, 19); // radio status, not computed

                let payload = w.into_payload();
                let fill_bits = (6 - (168 % 6)) % 6;
                Ok(vec![wrap_sentence(talker_id, &payload, fill_bits as u8)])
            }
            AisMessage::SafetyRelatedBroadcastMessage { source_mmsi, text } => {
                let char_count = text.chars().count().min(161).max(1) as u32;
                let mut w = BitWriter::new();
                w.push_uint(14, 6); // message type 14
                w.push_uint(0, 2);
                w.push_uint(*source_mmsi as u64, 30);
                w.push_str(text, char_count);
                let bits_before_pad = w.bits.len();
                let payload = w.into_payload();
                let fill_bits = (6 - (bits_before_pad % 6)) % 6;
                Ok(vec![wrap_sentence(talker_id, &payload, fill_bits as u8)])
            }
            AisMessage::StandardClassBPositionReport { .. }
            | AisMessage::ExtendedClassBPositionReport { .. } => {
                Err(AisError::UnsupportedEncoding)
            }
            _ => Err(AisError::EncodeFailure),
        }
    }

    fn navigation_status_code(status: crate::target::NavigationStatus) -> u64 {
        use crate::target::NavigationStatus::*;
        match status {
            UnderWayUsingEngine => 0,
            AtAnchor => 1,
            NotUnderCommand => 2,
            RestrictedManoeuvrability => 3,
            ConstrainedByDraught => 4,
            Moored => 5,
            Aground => 6,
            EngagedInFishing => 7,
            UnderWaySailing => 8,
            Reserved(n) => n as u64,
            AisSartIsActive => 14,
            NotDefined => 15,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::target::{NavigationStatus, PositionReportClassA};

        #[test]
        fn encodes_position_report_to_one_sentence() {
            let message = AisMessage::PositionReportClassA {
                mmsi: 244_670_123,
                report: PositionReportClassA {
                    latitude: Some(47.5),
                    longitude: Some(9.5),
                    raw_rate_of_turn: None,
                    true_heading: Some(271.0),
                    course_over_ground: Some(270.0),
                    speed_over_ground: Some(5.0),
                    navigation_status: NavigationStatus::UnderWayUsingEngine,
                },
            };
            let sentences = encode(&message, GeneratedSentenceId::Vdo).unwrap();
            assert_eq!(sentences.len(), 1);
            assert!(sentences[0].starts_with("!AIVDO"));
        }

        #[test]
        fn class_b_position_report_encoding_is_unsupported() {
            let message = AisMessage::StandardClassBPositionReport {
                mmsi: 1,
                latitude: None,
                longitude: None,
                course_over_ground: None,
                speed_over_ground: None,
                true_heading: None,
            };
            let err = encode(&message, GeneratedSentenceId::Vdo).unwrap_err();
            assert!(matches!(err, AisError::UnsupportedEncoding));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn eta_rollover_adds_a_year_when_month_day_precede_now() {
        let now = Utc.with_ymd_and_hms(2024, 12, 15, 0, 0, 0).unwrap();
        let eta = compose_eta(now, 2, 10, 0, 0).unwrap();
        assert_eq!(eta, Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn eta_same_year_when_month_day_do_not_precede_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let eta = compose_eta(now, 6, 1, 12, 30).unwrap();
        assert_eq!(eta, Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn invalid_calendar_date_yields_none() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(compose_eta(now, 2, 31, 0, 0).is_none());
    }

    #[test]
    fn recognises_aivdm_and_aivdo_identifiers() {
        assert!(is_ais_payload_sentence("!AIVDM,1,1,,A,15M67FC000G?ufbE`FepT@3n00Sa,0*5C"));
        assert!(is_ais_payload_sentence("!AIVDO,1,1,,A,15M67FC000G?ufbE`FepT@3n00Sa,0*5C"));
        assert!(!is_ais_payload_sentence("$GPRMC,225446,A,4916.45,N,12311.12,W,000.5,054.7,191120,020.3,E*67"));
        assert!(!is_ais_payload_sentence("$GPZDA,001000,01,01,2024,00,00*00"));
    }

    #[test]
    fn decode_reports_a_miss_for_non_ais_chatter() {
        let codec = NmeaParserCodec::new();
        let decoded = codec.decode(
            "$GPRMC,225446,A,4916.45,N,12311.12,W,000.5,054.7,191120,020.3,E*67",
        );
        assert!(decoded.is_none());
    }
}
