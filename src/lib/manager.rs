//! `AisManager` — the orchestration core (`spec.md` §4.2–§4.6): sentence
//! ingestion and dispatch, cleanup, exceptional-target detection, own-ship
//! data, and the alarm surveillance loop lifecycle.
//!
//! Grounded on the teacher's `SharedRadars` for the store-mutex discipline
//! and on its worker-thread pattern (`radar/mod.rs`'s locator threads) for
//! the surveillance loop, generalized from an async tokio task to a plain
//! `std::thread` per `spec.md` §5's explicit preemptive-OS-thread model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::clock::Clock;
use crate::codec::{AisMessage, Codec, GeneratedSentenceId};
use crate::config::{ManagerConfig, TrackEstimationParameters, CLEANUP_LATENCY, MINIMUM_ALARM_SLEEP};
use crate::error::AisError;
use crate::geo::relative_position;
use crate::position::PositionProvider;
use crate::store::TargetStore;
use crate::target::{
    identify_mmsi_type, rate_of_turn_to_raw, AidToNavigation, AisTarget, BaseStation, Dimensions,
    MmsiDeviceClass, NavigationStatus, PositionReportClassA, SarAircraft, Ship, TransceiverClass,
};
use crate::warnings::{MessageObserver, OutboundSentenceObserver, WarningLedger};

/// Own-ship data snapshot returned by [`AisManager::get_own_ship_data`]
/// (`spec.md` §4.5). `ok` is false when the position is missing or stale,
/// per the §4.5 contract — the ship fields are still populated with
/// whatever the position provider returned.
pub struct OwnShipData {
    pub ship: Ship,
    pub ok: bool,
}

/// The AIS target-tracking core. Cheaply cloneable: every field is an
/// `Arc` or copy-cheap handle, matching the teacher's `SharedRadars`
/// clone-to-share pattern used across its locator threads.
#[derive(Clone)]
pub struct AisManager {
    config: Arc<RwLock<ManagerConfig>>,
    store: TargetStore,
    warnings: Arc<WarningLedger>,
    position_provider: Arc<dyn PositionProvider>,
    codec: Arc<dyn Codec>,
    clock: Arc<dyn Clock>,
    message_observers: Arc<Mutex<Vec<Arc<dyn MessageObserver>>>>,
    outbound_observers: Arc<Mutex<Vec<Arc<dyn OutboundSentenceObserver>>>>,
    last_cleanup: Arc<Mutex<Option<Instant>>>,
    alarm_running: Arc<AtomicBool>,
    alarm_thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AisManager {
    pub fn new(
        config: ManagerConfig,
        position_provider: Arc<dyn PositionProvider>,
        codec: Arc<dyn Codec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AisManager {
            config: Arc::new(RwLock::new(config)),
            store: TargetStore::new(),
            warnings: Arc::new(WarningLedger::new()),
            position_provider,
            codec,
            clock,
            message_observers: Arc::new(Mutex::new(Vec::new())),
            outbound_observers: Arc::new(Mutex::new(Vec::new())),
            last_cleanup: Arc::new(Mutex::new(None)),
            alarm_running: Arc::new(AtomicBool::new(false)),
            alarm_thread: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &TargetStore {
        &self.store
    }

    pub fn warnings(&self) -> &WarningLedger {
        &self.warnings
    }

    pub fn add_message_observer(&self, observer: Arc<dyn MessageObserver>) {
        self.message_observers.lock().unwrap().push(observer);
    }

    pub fn add_outbound_observer(&self, observer: Arc<dyn OutboundSentenceObserver>) {
        self.outbound_observers.lock().unwrap().push(observer);
    }

    fn fire_message(&self, received: bool, source: u32, destination: u32, text: &str) {
        for observer in self.message_observers.lock().unwrap().iter() {
            observer.on_message(received, source, destination, text);
        }
    }

    fn fire_outbound(&self, sentence: &str) {
        for observer in self.outbound_observers.lock().unwrap().iter() {
            observer.on_outbound_sentence(sentence);
        }
    }

    /// `spec.md` §4.2: `sendSentence(source, sentence)`. `source` is kept
    /// for parity with the spec's signature (multiple input streams can
    /// share one manager); this crate doesn't currently discriminate by
    /// source so it's unused beyond documentation/log context.
    pub fn send_sentence(&self, source: &str, sentence: &str) -> Result<(), AisError> {
        let now = self.clock.now();

        // Step 1: forward to the Sentence Cache.
        self.position_provider.observe_sentence(sentence, now);

        // Step 2: cleanup.
        self.do_cleanup(now);

        // Step 3: decode.
        let message = match self.codec.decode(sentence) {
            Some(m) => m,
            None => {
                log::trace!("[{source}] decode miss for sentence: {sentence}");
                return Ok(());
            }
        };

        log::trace!("[{source}] dispatching {message:?}");
        self.dispatch(message, now)
    }

    fn dispatch(&self, message: AisMessage, now: Instant) -> Result<(), AisError> {
        let throw_on_unknown = self.config.read().unwrap().throw_on_unknown_message;

        match message {
            AisMessage::PositionReportClassA { mmsi, report } => {
                self.store.get_or_create(
                    mmsi,
                    |t| matches!(t, AisTarget::Ship(_)),
                    |mmsi| AisTarget::Ship(Ship::new(mmsi)),
                    |target| {
                        if let AisTarget::Ship(ship) = target {
                            crate::target::apply_position_report_class_a(ship, &report);
                        }
                    },
                    Some(now),
                );
                self.check_is_exceptional_target(mmsi, now);
            }
            AisMessage::StaticAndVoyageData {
                mmsi,
                ship_name,
                call_sign,
                destination,
                draught,
                imo_number,
                ship_type,
                to_bow,
                to_stern,
                to_port,
                to_starboard,
                eta_month,
                eta_day,
                eta_hour,
                eta_minute,
            } => {
                let eta = match (eta_month, eta_day, eta_hour, eta_minute) {
                    (Some(month), Some(day), Some(hour), Some(minute)) => {
                        crate::codec::compose_eta(chrono::Utc::now(), month, day, hour, minute)
                    }
                    _ => None,
                };
                let dimensions = Dimensions {
                    to_bow,
                    to_stern,
                    to_port,
                    to_starboard,
                };
                self.store.get_or_create(
                    mmsi,
                    |t| matches!(t, AisTarget::Ship(_)),
                    |mmsi| AisTarget::Ship(Ship::new(mmsi)),
                    |target| {
                        if let AisTarget::Ship(ship) = target {
                            if ship_name.is_some() {
                                ship.common.name = ship_name;
                            }
                            if call_sign.is_some() {
                                ship.call_sign = call_sign;
                            }
                            if destination.is_some() {
                                ship.destination = destination;
                            }
                            if draught.is_some() {
                                ship.draught = draught;
                            }
                            if imo_number.is_some() {
                                ship.imo_number = imo_number;
                            }
                            if ship_type != 0 {
                                ship.ship_type = ship_type;
                            }
                            if dimensions != Dimensions::default() {
                                ship.dimensions = dimensions;
                            }
                            if eta.is_some() {
                                ship.estimated_time_of_arrival = eta;
                            }
                        }
                    },
                    Some(now),
                );
            }
            AisMessage::StandardClassBPositionReport {
                mmsi,
                latitude,
                longitude,
                course_over_ground,
                speed_over_ground,
                true_heading,
            } => {
                self.apply_class_b(
                    mmsi, latitude, longitude, course_over_ground, speed_over_ground,
                    true_heading, None, 0, Dimensions::default(), now,
                );
            }
            AisMessage::ExtendedClassBPositionReport {
                mmsi,
                latitude,
                longitude,
                course_over_ground,
                speed_over_ground,
                true_heading,
                ship_name,
                ship_type,
                to_bow,
                to_stern,
                to_port,
                to_starboard,
            } => {
                self.apply_class_b(
                    mmsi,
                    latitude,
                    longitude,
                    course_over_ground,
                    speed_over_ground,
                    true_heading,
                    ship_name,
                    ship_type,
                    Dimensions {
                        to_bow,
                        to_stern,
                        to_port,
                        to_starboard,
                    },
                    now,
                );
            }
            AisMessage::BaseStationReport {
                mmsi,
                latitude,
                longitude,
            } => {
                self.store.get_or_create(
                    mmsi,
                    |t| matches!(t, AisTarget::BaseStation(_)),
                    |mmsi| AisTarget::BaseStation(BaseStation::new(mmsi)),
                    |target| {
                        if let AisTarget::BaseStation(base) = target {
                            if let (Some(lat), Some(lon)) = (latitude, longitude) {
                                base.common.position = crate::geo::GeoPosition::new(lat, lon);
                            }
                        }
                    },
                    Some(now),
                );
            }
            AisMessage::StandardSarAircraftPositionReport {
                mmsi,
                latitude,
                longitude,
                altitude_m,
                course_over_ground,
                speed_over_ground,
            } => {
                self.store.get_or_create(
                    mmsi,
                    |t| matches!(t, AisTarget::SarAircraft(_)),
                    |mmsi| AisTarget::SarAircraft(SarAircraft::new(mmsi)),
                    |target| {
                        if let AisTarget::SarAircraft(aircraft) = target {
                            if let (Some(lat), Some(lon)) = (latitude, longitude) {
                                aircraft.common.position = match altitude_m {
                                    Some(alt) => {
                                        crate::geo::GeoPosition::with_altitude(lat, lon, alt)
                                    }
                                    None => crate::geo::GeoPosition::new(lat, lon),
                                };
                            }
                            aircraft.course_over_ground = course_over_ground;
                            aircraft.speed_over_ground = speed_over_ground;
                            aircraft.rate_of_turn = 0.0;
                        }
                    },
                    Some(now),
                );
            }
            AisMessage::AidToNavigationReport {
                mmsi,
                name,
                name_extension,
                latitude,
                longitude,
                to_bow,
                to_stern,
                to_port,
                to_starboard,
                off_position,
                virtual_aid,
                navigational_aid_type,
            } => {
                let full_name = match name_extension {
                    Some(ext) => format!("{name}{ext}"),
                    None => name,
                };
                self.store.get_or_create(
                    mmsi,
                    |t| matches!(t, AisTarget::AidToNavigation(_)),
                    |mmsi| AisTarget::AidToNavigation(AidToNavigation::new(mmsi)),
                    |target| {
                        if let AisTarget::AidToNavigation(aid) = target {
                            aid.common.name = Some(full_name);
                            if let (Some(lat), Some(lon)) = (latitude, longitude) {
                                aid.common.position = crate::geo::GeoPosition::new(lat, lon);
                            }
                            aid.dimensions = Dimensions {
                                to_bow,
                                to_stern,
                                to_port,
                                to_starboard,
                            };
                            aid.off_position = off_position;
                            aid.virtual_aid = virtual_aid;
                            aid.navigational_aid_type = navigational_aid_type;
                        }
                    },
                    Some(now),
                );
            }
            AisMessage::AddressedSafetyRelatedMessage {
                source_mmsi,
                destination_mmsi,
                text,
            } => {
                self.fire_message(true, source_mmsi, destination_mmsi, &text);
            }
            AisMessage::SafetyRelatedBroadcastMessage { source_mmsi, text } => {
                self.fire_message(true, source_mmsi, 0, &text);
            }
            AisMessage::Consumed => {}
            AisMessage::Unrecognized => {
                if throw_on_unknown {
                    return Err(AisError::UnsupportedMessage);
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_class_b(
        &self,
        mmsi: u32,
        latitude: Option<f64>,
        longitude: Option<f64>,
        course_over_ground: Option<f64>,
        speed_over_ground: Option<f64>,
        true_heading: Option<f64>,
        ship_name: Option<String>,
        ship_type: u8,
        dimensions: Dimensions,
        now: Instant,
    ) {
        self.store.get_or_create(
            mmsi,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |target| {
                if let AisTarget::Ship(ship) = target {
                    if let (Some(lat), Some(lon)) = (latitude, longitude) {
                        ship.common.position = crate::geo::GeoPosition::new(lat, lon);
                    }
                    ship.course_over_ground = course_over_ground;
                    ship.speed_over_ground = speed_over_ground;
                    ship.true_heading = true_heading;
                    ship.rate_of_turn = None;
                    ship.transceiver_class = TransceiverClass::B;
                    if let Some(name) = ship_name.clone() {
                        ship.common.name = Some(name);
                    }
                    if ship_type != 0 {
                        ship.ship_type = ship_type;
                    }
                    if dimensions != Dimensions::default() {
                        ship.dimensions = dimensions;
                    }
                }
            },
            Some(now),
        );
    }

    /// `spec.md` §4.2 `checkIsExceptionalTarget`.
    fn check_is_exceptional_target(&self, mmsi: u32, now: Instant) {
        if !self.config.read().unwrap().auto_send_warnings {
            return;
        }
        let target = match self.store.try_get(mmsi) {
            Some(t) => t,
            None => return,
        };
        let ship = match target.as_ship() {
            Some(s) => s,
            None => return,
        };

        let device_class = identify_mmsi_type(mmsi);
        let is_exceptional = ship.navigation_status == NavigationStatus::AisSartIsActive
            || matches!(
                device_class,
                MmsiDeviceClass::AisSart | MmsiDeviceClass::Epirb | MmsiDeviceClass::Mob
            );
        if !is_exceptional {
            return;
        }

        let label = match device_class {
            MmsiDeviceClass::AisSart => "AIS SART",
            MmsiDeviceClass::Epirb => "EPIRB",
            MmsiDeviceClass::Mob => "MOB",
            MmsiDeviceClass::Ordinary => "AIS SART",
        };

        let position = ship.common.position;
        let distance = match (position, self.own_position(now)) {
            (Some(target_pos), Some(own_pos)) => own_pos.distance_meters(&target_pos),
            _ => 0.0,
        };
        let (lat_text, lon_text) = match position {
            Some(p) => (
                format!("{:.4}{}", p.lat.abs(), if p.lat >= 0.0 { "N" } else { "S" }),
                format!("{:.4}{}", p.lon.abs(), if p.lon >= 0.0 { "E" } else { "W" }),
            ),
            None => ("unknown".to_string(), "unknown".to_string()),
        };

        let text = format!(
            "{label} Target activated: MMSI {mmsi} in Position {lat_text} {lon_text}! Distance {distance:.0}",
        );
        self.send_warning_message(&ship.format_mmsi(), mmsi, &text, now);
    }

    fn own_position(&self, now: Instant) -> Option<crate::geo::GeoPosition> {
        self.position_provider
            .try_get_current_position(now)
            .and_then(|fix| fix.position)
    }

    /// `spec.md` §4.3 `doCleanup(now)`.
    fn do_cleanup(&self, now: Instant) {
        let timeout = self.config.read().unwrap().delete_target_after_timeout;
        if timeout.is_zero() {
            return;
        }
        let mut last = self.last_cleanup.lock().unwrap();
        if let Some(previous) = *last {
            if now.saturating_duration_since(previous) < CLEANUP_LATENCY {
                return;
            }
        }
        *last = Some(now);
        drop(last);

        let removed = self.store.remove_if(|target| target.age(now) > timeout);
        if removed > 0 {
            log::debug!("cleanup removed {removed} stale target(s)");
        }
    }

    /// `spec.md` §4.4 `sendWarningMessage`.
    pub fn send_warning_message(&self, message_id: &str, source_mmsi: u32, text: &str, now: Instant) -> bool {
        if !self.warnings.try_issue(message_id, text, now) {
            return false;
        }
        self.send_broadcast_message(source_mmsi, text);
        true
    }

    /// `spec.md` §4.4 `sendBroadcastMessage`.
    pub fn send_broadcast_message(&self, source_mmsi: u32, text: &str) {
        self.fire_message(false, source_mmsi, 0, text);

        let message = AisMessage::SafetyRelatedBroadcastMessage {
            source_mmsi,
            text: text.to_string(),
        };
        let sentence_id = self.config.read().unwrap().generated_sentences_id;
        match self.codec.encode(&message, sentence_id) {
            Ok(sentences) => {
                for sentence in sentences {
                    self.fire_outbound(&sentence);
                }
            }
            Err(err) => {
                log::error!("failed to encode broadcast message: {err}");
            }
        }
    }

    pub fn clear_warnings(&self) {
        self.warnings.clear();
    }

    /// Encodes and fires an outbound Class A position report for the own
    /// ship, per `spec.md` §4.2's inverse `positionReportClassAToShip`
    /// transform. Only transceiver class A is supported for outbound
    /// encoding, matching the codec's documented limitation.
    pub fn send_ship_position_report(&self, ship: &Ship) -> Result<(), AisError> {
        if ship.transceiver_class != TransceiverClass::A {
            return Err(AisError::UnsupportedEncoding);
        }
        let report = PositionReportClassA {
            latitude: ship.common.position.map(|p| p.lat),
            longitude: ship.common.position.map(|p| p.lon),
            raw_rate_of_turn: ship.rate_of_turn.map(rate_of_turn_to_raw),
            true_heading: ship.true_heading,
            course_over_ground: ship.course_over_ground,
            speed_over_ground: ship.speed_over_ground,
            navigation_status: ship.navigation_status,
        };
        let message = AisMessage::PositionReportClassA {
            mmsi: ship.common.mmsi,
            report,
        };
        let sentence_id = self.config.read().unwrap().generated_sentences_id;
        let sentences = self.codec.encode(&message, sentence_id)?;
        if sentences.len() != 1 {
            return Err(AisError::EncodeFailure);
        }
        self.fire_outbound(&sentences[0]);
        Ok(())
    }

    /// `spec.md` §4.5 `getOwnShipData(now)`.
    pub fn get_own_ship_data(&self, now: Instant) -> OwnShipData {
        let config = self.config.read().unwrap();
        let mut ship = Ship::new(config.own_mmsi);
        ship.common.name = Some(config.own_ship_name.clone());
        ship.dimensions = config.own_dimensions;
        let max_age = config.track_estimation_parameters.maximum_position_age;
        drop(config);

        let fix = self.position_provider.try_get_current_position(now);
        let mut ok = false;
        if let Some(fix) = fix {
            ship.common.position = fix.position;
            ship.course_over_ground = fix.course_over_ground;
            ship.speed_over_ground = fix.speed_over_ground;
            ship.true_heading = fix.true_heading;
            ok = fix.position.is_some()
                && now.saturating_duration_since(fix.message_time) < max_age;
        }
        OwnShipData { ship, ok }
    }

    /// `spec.md` §4.6 `enableAisAlarms(enable, parameters?)`.
    pub fn enable_ais_alarms(&self, enable: bool, parameters: Option<TrackEstimationParameters>) {
        if let Some(params) = parameters {
            self.config.write().unwrap().track_estimation_parameters = params;
        }

        if enable {
            if self.alarm_running.swap(true, Ordering::SeqCst) {
                return; // already running
            }
            let manager = self.clone();
            let handle = std::thread::Builder::new()
                .name("ais-alarm-surveillance".into())
                .spawn(move || manager.surveillance_loop())
                .expect("failed to spawn surveillance thread");
            *self.alarm_thread.lock().unwrap() = Some(handle);
            log::info!("alarm surveillance enabled");
        } else {
            self.alarm_running.store(false, Ordering::SeqCst);
            if let Some(handle) = self.alarm_thread.lock().unwrap().take() {
                let _ = handle.join();
            }
            log::info!("alarm surveillance disabled");
        }
    }

    /// `spec.md` §4.6 worker loop. Runs on its own `std::thread`, spawned
    /// by `enable_ais_alarms`.
    fn surveillance_loop(&self) {
        loop {
            let loop_start = self.clock.now();
            let own = self.get_own_ship_data(loop_start);

            if !own.ok {
                let params = self.config.read().unwrap().track_estimation_parameters;
                if params.warn_if_gnss_missing {
                    let message_id = if own.ship.common.position.is_some() {
                        "GNSSOLD"
                    } else {
                        "NOGNSS"
                    };
                    let text = if own.ship.common.position.is_some() {
                        "own-ship GNSS position is stale"
                    } else {
                        "no own-ship GNSS position available"
                    };
                    self.send_warning_message(message_id, own.ship.common.mmsi, text, loop_start);
                }
                self.clock.sleep(params.ais_safety_check_interval);
                if !self.alarm_running.load(Ordering::SeqCst) {
                    break;
                }
                continue;
            }

            let own_position = own.ship.common.position.unwrap();
            let own_cog = own.ship.course_over_ground.unwrap_or(0.0);
            let own_sog = own.ship.speed_over_ground.unwrap_or(0.0);
            let params = self.config.read().unwrap().track_estimation_parameters;

            let targets = self.store.snapshot();
            let mut diffs = Vec::with_capacity(targets.len());
            for target in &targets {
                let target_position = match target.common().position {
                    Some(p) => p,
                    None => continue,
                };
                let (target_cog, target_sog) = match target {
                    AisTarget::Ship(s) => (
                        s.course_over_ground.unwrap_or(0.0),
                        s.speed_over_ground.unwrap_or(0.0),
                    ),
                    AisTarget::SarAircraft(a) => (
                        a.course_over_ground.unwrap_or(0.0),
                        a.speed_over_ground.unwrap_or(0.0),
                    ),
                    _ => (0.0, 0.0),
                };
                let diff = relative_position(
                    own.ship.common.mmsi,
                    own_position,
                    own_cog,
                    own_sog,
                    target.mmsi(),
                    target_position,
                    target_cog,
                    target_sog,
                    loop_start,
                );
                diffs.push((target.mmsi(), target.common().name.clone(), diff));
            }

            for (mmsi, name, diff) in &diffs {
                let tcpa_secs = diff.signed_time_to_closest_point_of_approach_secs(loop_start);
                let tcpa_in_window =
                    tcpa_secs > -60.0 && tcpa_secs < params.warning_time.as_secs_f64();

                if diff.closest_point_of_approach_distance_meters < params.warning_distance_meters
                    && tcpa_in_window
                {
                    let total_secs = tcpa_secs.max(0.0) as u64;
                    let text = format!(
                        "{} is dangerously close. CPA {:.0}; TCPA {:02}:{:02}",
                        name.clone().unwrap_or_else(|| mmsi.to_string()),
                        diff.closest_point_of_approach_distance_meters,
                        total_secs / 60,
                        total_secs % 60,
                    );
                    self.send_warning_message(
                        &format!("DANGEROUS VESSEL-{mmsi}"),
                        *mmsi,
                        &text,
                        loop_start,
                    );
                }
            }

            for (mmsi, _, diff) in diffs {
                self.store.update_in_place(mmsi, |target| {
                    target.common_mut().relative_position = Some(diff);
                });
            }

            let elapsed = self.clock.now().saturating_duration_since(loop_start);
            let interval = self
                .config
                .read()
                .unwrap()
                .track_estimation_parameters
                .ais_safety_check_interval;
            let remaining = interval
                .checked_sub(elapsed)
                .unwrap_or(MINIMUM_ALARM_SLEEP)
                .max(MINIMUM_ALARM_SLEEP);
            self.clock.sleep(remaining);

            if !self.alarm_running.load(Ordering::SeqCst) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::codec::NmeaParserCodec;
    use crate::position::SentenceCache;

    fn manager_with_defaults() -> AisManager {
        AisManager::new(
            ManagerConfig::default(),
            Arc::new(SentenceCache::new()),
            Arc::new(NmeaParserCodec::new()),
            Arc::new(TestClock::new()),
        )
    }

    #[test]
    fn unknown_mmsi_lookup_returns_none() {
        let manager = manager_with_defaults();
        assert!(manager.store().try_get(1).is_none());
    }

    #[test]
    fn variant_collision_replaces_ship_with_base_station() {
        let manager = manager_with_defaults();
        let now = Instant::now();
        manager.store().get_or_create(
            2_442_000,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(now),
        );
        manager.store().get_or_create(
            2_442_000,
            |t| matches!(t, AisTarget::BaseStation(_)),
            |mmsi| AisTarget::BaseStation(BaseStation::new(mmsi)),
            |_| {},
            Some(now),
        );
        assert!(matches!(
            manager.store().try_get(2_442_000),
            Some(AisTarget::BaseStation(_))
        ));
    }

    #[test]
    fn cleanup_is_a_no_op_when_timeout_is_zero() {
        let manager = manager_with_defaults();
        let now = Instant::now();
        manager.store().get_or_create(
            1,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(now),
        );
        manager.do_cleanup(now + std::time::Duration::from_secs(3600));
        assert_eq!(manager.store().len(), 1);
    }

    #[test]
    fn cleanup_removes_stale_targets_after_timeout() {
        let mut config = ManagerConfig::default();
        config.delete_target_after_timeout = std::time::Duration::from_secs(60);
        let manager = AisManager::new(
            config,
            Arc::new(SentenceCache::new()),
            Arc::new(NmeaParserCodec::new()),
            Arc::new(TestClock::new()),
        );
        let t0 = Instant::now();
        manager.store().get_or_create(
            1,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(t0),
        );
        manager.do_cleanup(t0 + std::time::Duration::from_secs(120));
        assert_eq!(manager.store().len(), 0);
    }

    #[test]
    fn cleanup_respects_latency_window() {
        let mut config = ManagerConfig::default();
        config.delete_target_after_timeout = std::time::Duration::from_secs(1);
        let manager = AisManager::new(
            config,
            Arc::new(SentenceCache::new()),
            Arc::new(NmeaParserCodec::new()),
            Arc::new(TestClock::new()),
        );
        let t0 = Instant::now();
        manager.store().get_or_create(
            1,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(t0),
        );
        manager.do_cleanup(t0 + std::time::Duration::from_secs(2));
        assert_eq!(manager.store().len(), 0);

        manager.store().get_or_create(
            2,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(t0 + std::time::Duration::from_secs(2)),
        );
        // Within the 30s cleanup latency window — should not run yet.
        manager.do_cleanup(t0 + std::time::Duration::from_secs(3));
        assert_eq!(manager.store().len(), 1);
    }

    #[test]
    fn send_ship_position_report_requires_class_a() {
        let manager = manager_with_defaults();
        let mut ship = Ship::new(244_670_123);
        ship.transceiver_class = TransceiverClass::B;
        let err = manager.send_ship_position_report(&ship).unwrap_err();
        assert!(matches!(err, AisError::UnsupportedEncoding));
    }

    #[test]
    fn send_ship_position_report_encodes_class_a() {
        let manager = manager_with_defaults();
        let mut ship = Ship::new(244_670_123);
        ship.transceiver_class = TransceiverClass::A;
        ship.common.position = crate::geo::GeoPosition::new(47.5, 9.5);
        assert!(manager.send_ship_position_report(&ship).is_ok());
    }

    #[test]
    fn exceptional_target_emits_warning_for_sart_mmsi() {
        let manager = manager_with_defaults();
        let now = Instant::now();
        manager.store().get_or_create(
            970_000_001,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |target| {
                if let AisTarget::Ship(ship) = target {
                    ship.common.position = crate::geo::GeoPosition::new(0.0, 0.0);
                }
            },
            Some(now),
        );
        manager.check_is_exceptional_target(970_000_001, now);
        assert_eq!(manager.warnings().len(), 1);
    }

    #[test]
    fn own_ship_data_not_ok_without_position() {
        let manager = manager_with_defaults();
        let data = manager.get_own_ship_data(Instant::now());
        assert!(!data.ok);
    }
}
