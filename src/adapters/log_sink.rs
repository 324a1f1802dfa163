//! Event sink that routes structured events into the process log.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Default sink for interactive runs: one log line per event, with the
/// severity matching how much an operator should care.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::SequenceLoaded {
                entries,
                duration_secs,
            } => info!("event: sequence loaded, {entries} commands over {duration_secs:.1}s"),
            AppEvent::SequenceStarted { entries } => {
                info!("event: sequence started ({entries} commands)")
            }
            AppEvent::CommandDispatched {
                offset_secs,
                target,
                action,
            } => info!("event: T+{offset_secs:.1}s {target} {action}"),
            AppEvent::SequenceComplete { elapsed_secs } => {
                info!("event: sequence complete at T+{elapsed_secs:.1}s")
            }
            AppEvent::Aborted { reason } => warn!("event: ABORT - {reason}"),
            AppEvent::PressureReading { channel, psi } => {
                info!("event: {channel} reads {psi:.1} PSI")
            }
            AppEvent::ManualValve { valve, state } => {
                info!("event: manual {valve} -> {state:?}")
            }
            AppEvent::Telemetry(sample) => debug!(
                "event: telemetry thrust={:.1} pt=[{:.1} {:.1} {:.1} {:.1} {:.1}]",
                sample.thrust, sample.pt1, sample.pt2, sample.pt3, sample.pt4, sample.pt5
            ),
        }
    }
}
