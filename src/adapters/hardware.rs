//! Hardware rig: the real controller behind a [`LinkPort`].
//!
//! Actuator commands encode to the framed ASCII protocol and go out in one
//! write. Sampling drains whatever the socket has buffered, feeds the
//! streaming decoder, and returns the newest complete packet; the station
//! keeps its previous sample when nothing (or only garbage) arrived.

use log::{trace, warn};

use crate::actuators::ValveId;
use crate::app::ports::{ActuatorPort, SamplePort};
use crate::error::LinkError;
use crate::link::codec::{FrameDecoder, WireCommand, PACKET_LEN};
use crate::link::transport::LinkPort;
use crate::telemetry::SensorSample;

/// Socket drain size per sample call. A few packets' worth keeps one call
/// from looping forever on a chatty link.
const RECV_CHUNK: usize = PACKET_LEN * 4;

pub struct HardwareRig<L: LinkPort> {
    link: L,
    decoder: FrameDecoder,
    /// Abort flags from the newest packet; lets the loop see a
    /// controller-side watchdog trip.
    last_abort_flags: u8,
}

impl<L: LinkPort> HardwareRig<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            decoder: FrameDecoder::new(),
            last_abort_flags: 0,
        }
    }

    /// Abort flags carried by the most recent packet.
    pub fn abort_flags(&self) -> u8 {
        self.last_abort_flags
    }

    fn send_command(&mut self, cmd: WireCommand) -> Result<(), LinkError> {
        trace!("hw: send {:?} ({})", cmd, cmd.text());
        self.link.send(&cmd.encode())
    }
}

impl<L: LinkPort> ActuatorPort for HardwareRig<L> {
    fn open_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        self.send_command(WireCommand::ValveOpen(valve))
    }

    fn close_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        self.send_command(WireCommand::ValveClose(valve))
    }

    fn set_coil_speed(&mut self, ms: u16) -> Result<(), LinkError> {
        self.send_command(WireCommand::CoilSpeed(ms))
    }

    fn spark(&mut self) -> Result<(), LinkError> {
        self.send_command(WireCommand::Spark)
    }

    fn all_off(&mut self) -> Result<(), LinkError> {
        self.send_command(WireCommand::AllOff)
    }
}

impl<L: LinkPort> SamplePort for HardwareRig<L> {
    fn sample(&mut self) -> Result<SensorSample, LinkError> {
        let mut buf = [0u8; RECV_CHUNK];
        let n = self.link.recv(&mut buf)?;
        let packets = self.decoder.feed(&buf[..n]);

        let dropped = self.decoder.take_malformed();
        if dropped > 0 {
            warn!("hw: dropped {dropped} unframeable byte(s)");
        }

        match packets.last() {
            Some(p) => {
                self.last_abort_flags = p.abort_flags;
                Ok(p.sample)
            }
            // Garbage arrived but no packet completed: surface it so the
            // station marks the link bad and keeps its previous sample.
            None if dropped > 0 => Err(LinkError::MalformedPacket),
            None => Err(LinkError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::codec::{encode_packet, TelemetryPacket};

    /// Scripted transport: records sends, replays queued receive chunks.
    #[derive(Default)]
    struct ScriptedLink {
        sent: Vec<u8>,
        inbound: Vec<Vec<u8>>,
    }

    impl LinkPort for ScriptedLink {
        fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }
        fn recv(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
            if self.inbound.is_empty() {
                return Ok(0);
            }
            let chunk = self.inbound.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    fn packet(pt1: f32, abort_flags: u8) -> TelemetryPacket {
        TelemetryPacket {
            sample: SensorSample {
                pt1,
                ..Default::default()
            },
            abort_flags,
            status: 0,
        }
    }

    #[test]
    fn commands_hit_the_wire_framed() {
        let mut rig = HardwareRig::new(ScriptedLink::default());
        rig.open_valve(ValveId::V1).unwrap();
        rig.all_off().unwrap();
        assert_eq!(rig.link.sent, b"[1,[O,[X,[!,");
    }

    #[test]
    fn sample_returns_newest_packet() {
        let mut link = ScriptedLink::default();
        let mut chunk = Vec::new();
        chunk.extend_from_slice(&encode_packet(&packet(10.0, 0)));
        chunk.extend_from_slice(&encode_packet(&packet(20.0, 0b001)));
        link.inbound.push(chunk);

        let mut rig = HardwareRig::new(link);
        let s = rig.sample().unwrap();
        assert_eq!(s.pt1, 20.0);
        assert_eq!(rig.abort_flags(), 0b001);
    }

    #[test]
    fn split_packet_completes_on_second_call() {
        let raw = encode_packet(&packet(33.0, 0));
        let mut link = ScriptedLink::default();
        link.inbound.push(raw[..12].to_vec());
        link.inbound.push(raw[12..].to_vec());

        let mut rig = HardwareRig::new(link);
        assert_eq!(rig.sample(), Err(LinkError::Timeout));
        assert_eq!(rig.sample().unwrap().pt1, 33.0);
    }

    #[test]
    fn pure_garbage_is_malformed() {
        let mut link = ScriptedLink::default();
        link.inbound.push(vec![0x01, 0x02, 0x03, 0x04]);
        let mut rig = HardwareRig::new(link);
        assert_eq!(rig.sample(), Err(LinkError::MalformedPacket));
    }

    #[test]
    fn quiet_link_is_timeout() {
        let mut rig = HardwareRig::new(ScriptedLink::default());
        assert_eq!(rig.sample(), Err(LinkError::Timeout));
    }
}
