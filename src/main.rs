//! Station binary: wires a rig, the event sink, and the control loop.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use blp_stand::adapters::{HardwareRig, LogEventSink, SimulatedRig};
use blp_stand::app::ports::{ActuatorPort, SamplePort};
use blp_stand::link::TcpLink;
use blp_stand::{ControlStation, RunnerState, SystemConfig};

#[derive(Parser, Debug)]
#[command(name = "blp-stand", about = "BLP test-stand ground-support station")]
struct Args {
    /// Run against the built-in simulator instead of hardware.
    #[arg(long, conflicts_with = "connect")]
    simulate: bool,

    /// Controller address, e.g. 192.168.4.1:8888.
    #[arg(long)]
    connect: Option<String>,

    /// Sequence file (CSV) to load and start.
    #[arg(long)]
    sequence: Option<PathBuf>,

    /// Configuration file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds even if the sequence has not finished.
    #[arg(long)]
    run_for: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SystemConfig::default(),
    };

    if args.simulate {
        info!("rig: simulator");
        let station = ControlStation::new(config, SimulatedRig::new(), LogEventSink);
        run(station, &args)
    } else if let Some(addr) = &args.connect {
        info!("rig: controller at {addr}");
        let link = TcpLink::connect(addr.as_str(), config.link_timeout_ms)
            .with_context(|| format!("connecting to {addr}"))?;
        let station = ControlStation::new(config, HardwareRig::new(link), LogEventSink);
        run(station, &args)
    } else {
        bail!("select a rig: --simulate or --connect <addr>");
    }
}

fn run<R>(mut station: ControlStation<R, LogEventSink>, args: &Args) -> Result<()>
where
    R: ActuatorPort + SamplePort,
{
    let started = Instant::now();
    let interval = Duration::from_millis(u64::from(station.config().control_loop_interval_ms));
    let deadline = args
        .run_for
        .map(|secs| started + Duration::from_secs_f32(secs));

    let sequencing = if let Some(path) = &args.sequence {
        station
            .load_sequence(path)
            .with_context(|| format!("loading sequence {}", path.display()))?;
        station.start(Instant::now())?;
        true
    } else {
        info!("no sequence given; monitoring only");
        false
    };

    loop {
        let now = Instant::now();
        if let Err(e) = station.tick(now) {
            // Only internal-consistency halts propagate; the stand is
            // already safed by the time we get here.
            bail!("control loop halted: {e}");
        }

        match station.runner_state() {
            RunnerState::Idle if sequencing => {
                info!("sequence finished; exiting");
                break;
            }
            RunnerState::Aborted => {
                warn!("abort latched; exiting");
                break;
            }
            _ => {}
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("run window elapsed; exiting");
            break;
        }

        thread::sleep(interval.saturating_sub(now.elapsed()));
    }

    for (name, status) in station.health_snapshot() {
        info!("health: {name} = {status}");
    }
    Ok(())
}
