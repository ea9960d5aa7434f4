use std::fs;
use std::path::PathBuf;

use clap::Parser;

use trunksim_core::{debug, CallId, ConsoleId, Location, SiteId, TalkgroupId, UnitId, ZoneId};
use trunksim_entities::{Event, ZoneController};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Trunked land-mobile-radio network simulator",
    long_about = "Runs a discrete-event simulation of a trunked radio system from a YAML network description"
)]
struct Args {
    /// YAML network configuration
    #[arg(help = "WACN/zone/site/talkgroup/unit configuration in YAML")]
    config: PathBuf,

    /// Newline-delimited commands to inject at t=0 before the run starts
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 60)]
    ticks: u64,

    /// Virtual milliseconds advanced per tick
    #[arg(long, default_value_t = 1000)]
    tick_ms: i64,

    /// RNG seed for placement, jitter, and channel assignment
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Optional verbose log file, in addition to stdout
    #[arg(long)]
    log_file: Option<String>,
}

fn load_config(path: &PathBuf) -> trunksim_config::Wacn {
    match trunksim_config::from_file(path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("failed to load configuration from {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// Parses one line of the command file into an action against a named zone.
/// Unknown verbs or malformed lines are skipped with a warning, not fatal:
/// one bad line in an otherwise-good scenario shouldn't abort the run.
enum Command {
    PowerOn { zone: ZoneId, unit: UnitId },
    UpdateLocation { zone: ZoneId, unit: UnitId, lat: f64, lon: f64 },
    InitiateCall { zone: ZoneId, unit: UnitId, talkgroup: TalkgroupId },
    ConsoleInitiateCall { zone: ZoneId, console: ConsoleId, talkgroup: TalkgroupId },
    EndTransmission { zone: ZoneId, unit: UnitId, call: CallId },
    StopSite { zone: ZoneId, site: SiteId },
    FailSite { zone: ZoneId, site: SiteId },
}

fn parse_command(line: &str) -> Option<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let zone_of = |s: &str| s.parse::<u32>().ok().map(ZoneId);
    match parts.as_slice() {
        ["power_on", zone, unit] => Some(Command::PowerOn {
            zone: zone_of(zone)?,
            unit: UnitId(unit.parse().ok()?),
        }),
        ["update_location", zone, unit, lat, lon] => Some(Command::UpdateLocation {
            zone: zone_of(zone)?,
            unit: UnitId(unit.parse().ok()?),
            lat: lat.parse().ok()?,
            lon: lon.parse().ok()?,
        }),
        ["initiate_call", zone, unit, talkgroup] => Some(Command::InitiateCall {
            zone: zone_of(zone)?,
            unit: UnitId(unit.parse().ok()?),
            talkgroup: TalkgroupId(talkgroup.parse().ok()?),
        }),
        ["console_initiate_call", zone, console, talkgroup] => Some(Command::ConsoleInitiateCall {
            zone: zone_of(zone)?,
            console: ConsoleId(console.parse().ok()?),
            talkgroup: TalkgroupId(talkgroup.parse().ok()?),
        }),
        ["end_transmission", zone, unit, call] => Some(Command::EndTransmission {
            zone: zone_of(zone)?,
            unit: UnitId(unit.parse().ok()?),
            call: CallId(call.parse().ok()?),
        }),
        ["stop_site", zone, site] => Some(Command::StopSite {
            zone: zone_of(zone)?,
            site: SiteId(site.parse().ok()?),
        }),
        ["fail_site", zone, site] => Some(Command::FailSite {
            zone: zone_of(zone)?,
            site: SiteId(site.parse().ok()?),
        }),
        _ => None,
    }
}

fn apply_command(controllers: &mut [ZoneController], cmd: Command) {
    let zone = match &cmd {
        Command::PowerOn { zone, .. }
        | Command::UpdateLocation { zone, .. }
        | Command::InitiateCall { zone, .. }
        | Command::ConsoleInitiateCall { zone, .. }
        | Command::EndTransmission { zone, .. }
        | Command::StopSite { zone, .. }
        | Command::FailSite { zone, .. } => *zone,
    };
    let Some(controller) = controllers.iter_mut().find(|c| c.zone_id == zone) else {
        tracing::warn!(%zone, "command targets unknown zone, ignored");
        return;
    };

    match cmd {
        Command::PowerOn { unit, .. } => controller.publish(
            trunksim_core::EventPriority::Default,
            Event::UnitPowerOnCommand { unit_id: unit },
        ),
        Command::UpdateLocation { unit, lat, lon, .. } => controller.publish(
            trunksim_core::EventPriority::Default,
            Event::UnitUpdateLocationCommand { unit_id: unit, new_location: Location::new(lat, lon) },
        ),
        Command::InitiateCall { unit, talkgroup, .. } => controller.publish(
            trunksim_core::EventPriority::Default,
            Event::UnitInitiateCallCommand { unit_id: unit, talkgroup_id: talkgroup },
        ),
        Command::ConsoleInitiateCall { console, talkgroup, .. } => controller.publish(
            trunksim_core::EventPriority::Preempt,
            Event::ConsoleInitiateCallCommand { console_id: console, talkgroup_id: talkgroup },
        ),
        Command::EndTransmission { unit, call, .. } => controller.publish(
            trunksim_core::EventPriority::Default,
            Event::UnitEndTransmissionCommand { unit_id: unit, call_id: call },
        ),
        Command::StopSite { site, .. } => controller.stop_site(site),
        Command::FailSite { site, .. } => controller.fail_site(site),
    }
}

fn main() {
    let args = Args::parse();
    let _log_guard = debug::setup_logging_default(args.log_file.clone());

    let wacn = load_config(&args.config);
    let wacn_area = wacn.area;

    let mut controllers: Vec<ZoneController> = wacn
        .zones
        .into_values()
        .map(|zone| {
            let seed = args.seed.wrapping_add(zone.id.0 as u64);
            ZoneController::new(zone, wacn_area, seed)
        })
        .collect();
    controllers.sort_by_key(|c| c.zone_id);

    for controller in &mut controllers {
        controller.initialize_system();
        tracing::info!(zone = %controller.zone_id, "initialized");
    }

    if let Some(path) = &args.commands {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to read command file {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        for (lineno, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_command(trimmed) {
                Some(cmd) => apply_command(&mut controllers, cmd),
                None => tracing::warn!(line = lineno + 1, text = trimmed, "unrecognized command, skipped"),
            }
        }
    }

    for tick in 0..args.ticks {
        let snapshots: Vec<_> = controllers.iter().flat_map(|c| c.site_snapshots()).collect();
        for controller in &mut controllers {
            controller.tick(args.tick_ms, &snapshots);
        }
        if tick % 10 == 0 {
            for controller in &controllers {
                tracing::info!(
                    zone = %controller.zone_id,
                    now = %controller.now(),
                    active_calls = controller.active_calls.len(),
                    queued = controller.call_busy_queue.len(),
                    "tick"
                );
            }
        }
    }

    for controller in &controllers {
        tracing::info!(
            zone = %controller.zone_id,
            now = %controller.now(),
            active_calls = controller.active_calls.len(),
            queued = controller.call_busy_queue.len(),
            "run complete"
        );
    }
}
