//! `ais-replay` — a small CLI front end wiring a [`LogReplaySource`] to an
//! [`AisManager`] over one or more recorded NMEA logs, printing target and
//! warning activity to the terminal as it plays back.

use std::sync::Arc;
use std::time::Duration;

use ais_sentinel::codec::NmeaParserCodec;
use ais_sentinel::config::{ManagerConfig, TrackEstimationParameters};
use ais_sentinel::position::SentenceCache;
use ais_sentinel::replay::{LogReplaySource, ReplayInput, ReplayMode};
use ais_sentinel::target::Dimensions;
use ais_sentinel::warnings::{MessageObserver, OutboundSentenceObserver};
use ais_sentinel::{AisManager, Mmsi, SystemClock};

use clap::Parser;
use env_logger::Env;

/// Replay one or more recorded NMEA-0183 logs through the AIS target
/// tracker, printing decoded activity and safety warnings as they occur.
#[derive(Parser)]
struct Cli {
    #[clap(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Path(s) to NMEA-0183 log file(s), replayed in order.
    #[arg(required = true)]
    logs: Vec<std::path::PathBuf>,

    /// Pace replay to the original recording's wall-clock cadence instead
    /// of draining the log as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// Own vessel's MMSI, used for own-ship position and CPA/TCPA geometry.
    #[arg(long, default_value_t = 0)]
    own_mmsi: Mmsi,

    /// Own vessel's name.
    #[arg(long, default_value = "")]
    own_name: String,

    /// Enable the background CPA/TCPA alarm surveillance loop.
    #[arg(long)]
    alarms: bool,

    /// Print a target-store snapshot (JSON) after replay completes.
    #[arg(long)]
    dump_targets: bool,
}

struct TerminalMessageObserver;

impl MessageObserver for TerminalMessageObserver {
    fn on_message(&self, received: bool, source_mmsi: Mmsi, destination_mmsi: Mmsi, text: &str) {
        if received {
            println!("[message] {source_mmsi} -> {destination_mmsi}: {text}");
        } else {
            println!("[broadcast] {source_mmsi}: {text}");
        }
    }
}

struct TerminalOutboundObserver;

impl OutboundSentenceObserver for TerminalOutboundObserver {
    fn on_outbound_sentence(&self, sentence: &str) {
        println!("[outbound] {sentence}");
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default())
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let config = ManagerConfig {
        own_mmsi: cli.own_mmsi,
        own_ship_name: cli.own_name.clone(),
        own_dimensions: Dimensions::default(),
        track_estimation_parameters: TrackEstimationParameters::default(),
        ..ManagerConfig::default()
    };

    let manager = AisManager::new(
        config,
        Arc::new(SentenceCache::new()),
        Arc::new(NmeaParserCodec::new()),
        Arc::new(SystemClock),
    );
    manager.add_message_observer(Arc::new(TerminalMessageObserver));
    manager.add_outbound_observer(Arc::new(TerminalOutboundObserver));

    if cli.alarms {
        manager.enable_ais_alarms(true, None);
    }

    let mode = if cli.realtime {
        ReplayMode::Realtime
    } else {
        ReplayMode::Fast
    };
    let source = LogReplaySource::new(manager.clone(), Arc::new(SystemClock), mode);

    let inputs = cli.logs.into_iter().map(ReplayInput::Path).collect();
    log::info!("starting replay (mode={mode:?})");
    source.start_decode(inputs);
    source.stop_decode();
    log::info!("replay finished");

    if cli.alarms {
        // Let one more surveillance pass settle before shutting down.
        std::thread::sleep(Duration::from_millis(50));
        manager.enable_ais_alarms(false, None);
    }

    if cli.dump_targets {
        let snapshot: Vec<_> = manager
            .store()
            .snapshot()
            .iter()
            .map(target_summary)
            .collect();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("failed to serialize target snapshot: {err}"),
        }
    }
}

#[derive(serde::Serialize)]
struct TargetSummary {
    mmsi: Mmsi,
    kind: &'static str,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

fn target_summary(target: &ais_sentinel::AisTarget) -> TargetSummary {
    use ais_sentinel::AisTarget::*;
    let kind = match target {
        Ship(_) => "ship",
        BaseStation(_) => "base_station",
        SarAircraft(_) => "sar_aircraft",
        AidToNavigation(_) => "aid_to_navigation",
    };
    let common = target.common();
    TargetSummary {
        mmsi: common.mmsi,
        kind,
        name: common.name.clone(),
        latitude: common.position.map(|p| p.lat),
        longitude: common.position.map(|p| p.lon),
    }
}
