//! Wire formats for the controller link.
//!
//! Outbound commands are short ASCII strings sent one character at a time,
//! each character wrapped in a `'['` / `','` frame the controller's parser
//! scans for:
//!
//! ```text
//!   "1O"  ->  [1,[O,          valve 1 open
//!   "1C"  ->  [1,[C,          valve 1 close
//!   "K!"  ->  [K,[!,          spark the coil
//!   "W0050" -> [W,[0,[0,[5,[0,  coil speed 50 ms
//!   "X!"  ->  [X,[!,          everything off
//! ```
//!
//! Inbound telemetry is a fixed 27-byte packet:
//!
//! ```text
//!   offset 0      heartbeat 0xA5
//!   offset 1..25  six little-endian f32: thrust, pt1..pt5
//!   offset 25     abort flags (bit 0 = PT1, bit 1 = PT2, bit 2 = PT3)
//!   offset 26     controller status byte
//! ```
//!
//! [`FrameDecoder`] reassembles packets from an arbitrary byte stream,
//! resynchronising on the heartbeat after garbage.

use log::trace;

use crate::actuators::ValveId;
use crate::error::LinkError;
use crate::telemetry::{PtChannel, SensorSample};

// ---------------------------------------------------------------------------
// Outbound commands
// ---------------------------------------------------------------------------

const FRAME_OPEN: u8 = b'[';
const FRAME_CLOSE: u8 = b',';

/// Maximum coil speed encodable in the four-digit `W` command.
const COIL_SPEED_MAX_MS: u16 = 9999;

/// Every command the station can put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCommand {
    ValveOpen(ValveId),
    ValveClose(ValveId),
    Spark,
    CoilSpeed(u16),
    AllOff,
}

impl WireCommand {
    /// The unframed ASCII text of the command.
    pub fn text(self) -> String {
        match self {
            Self::ValveOpen(v) => format!("{}O", v.number()),
            Self::ValveClose(v) => format!("{}C", v.number()),
            Self::Spark => "K!".to_string(),
            Self::CoilSpeed(ms) => format!("W{:04}", ms.min(COIL_SPEED_MAX_MS)),
            Self::AllOff => "X!".to_string(),
        }
    }

    /// The framed on-wire bytes: each character as `'[' ch ','`.
    pub fn encode(self) -> Vec<u8> {
        let text = self.text();
        let mut out = Vec::with_capacity(text.len() * 3);
        for ch in text.bytes() {
            out.push(FRAME_OPEN);
            out.push(ch);
            out.push(FRAME_CLOSE);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Inbound telemetry packets
// ---------------------------------------------------------------------------

/// Heartbeat byte opening every telemetry packet.
pub const HEARTBEAT: u8 = 0xA5;

/// Total packet length on the wire.
pub const PACKET_LEN: usize = 27;

const ABORT_FLAGS_OFFSET: usize = 25;
const STATUS_OFFSET: usize = 26;

/// One decoded telemetry packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPacket {
    pub sample: SensorSample,
    pub abort_flags: u8,
    pub status: u8,
}

impl TelemetryPacket {
    /// Whether the controller's own watchdog tripped on a channel.
    pub fn abort_tripped(&self, channel: PtChannel) -> bool {
        let bit = match channel {
            PtChannel::Pt1 => 0,
            PtChannel::Pt2 => 1,
            PtChannel::Pt3 => 2,
            PtChannel::Pt4 | PtChannel::Pt5 => return false,
        };
        self.abort_flags & (1 << bit) != 0
    }
}

/// Decode one complete packet. The heartbeat must already be at offset 0;
/// non-finite readings reject the packet.
pub fn decode_packet(raw: &[u8; PACKET_LEN]) -> Result<TelemetryPacket, LinkError> {
    if raw[0] != HEARTBEAT {
        return Err(LinkError::MalformedPacket);
    }
    let mut fields = [0f32; 6];
    for (i, field) in fields.iter_mut().enumerate() {
        let at = 1 + i * 4;
        let bytes: [u8; 4] = raw[at..at + 4]
            .try_into()
            .map_err(|_| LinkError::MalformedPacket)?;
        let v = f32::from_le_bytes(bytes);
        if !v.is_finite() {
            return Err(LinkError::MalformedPacket);
        }
        *field = v;
    }
    Ok(TelemetryPacket {
        sample: SensorSample {
            thrust: fields[0],
            pt1: fields[1],
            pt2: fields[2],
            pt3: fields[3],
            pt4: fields[4],
            pt5: fields[5],
        },
        abort_flags: raw[ABORT_FLAGS_OFFSET],
        status: raw[STATUS_OFFSET],
    })
}

/// Encode a packet (simulator and test support).
pub fn encode_packet(packet: &TelemetryPacket) -> [u8; PACKET_LEN] {
    let mut out = [0u8; PACKET_LEN];
    out[0] = HEARTBEAT;
    let s = &packet.sample;
    let fields = [s.thrust, s.pt1, s.pt2, s.pt3, s.pt4, s.pt5];
    for (i, v) in fields.iter().enumerate() {
        let at = 1 + i * 4;
        out[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
    out[ABORT_FLAGS_OFFSET] = packet.abort_flags;
    out[STATUS_OFFSET] = packet.status;
    out
}

// ---------------------------------------------------------------------------
// Streaming decoder
// ---------------------------------------------------------------------------

/// Reassembles [`TelemetryPacket`]s from an unaligned byte stream.
///
/// Bytes before a heartbeat are discarded and counted; a buffered frame
/// that fails field decode is likewise dropped with the count bumped, and
/// scanning resumes at the next heartbeat. The caller reads
/// [`take_malformed`](Self::take_malformed) to decide whether to flag the
/// link.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every packet completed by this feed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TelemetryPacket> {
        self.buf.extend_from_slice(bytes);
        let mut packets = Vec::new();

        loop {
            // Resync: drop everything ahead of the first heartbeat.
            match self.buf.iter().position(|&b| b == HEARTBEAT) {
                Some(0) => {}
                Some(skip) => {
                    trace!("FrameDecoder: skipped {skip} bytes resyncing");
                    self.malformed += skip;
                    self.buf.drain(..skip);
                }
                None => {
                    self.malformed += self.buf.len();
                    self.buf.clear();
                    break;
                }
            }
            if self.buf.len() < PACKET_LEN {
                break;
            }
            let frame: [u8; PACKET_LEN] = self.buf[..PACKET_LEN]
                .try_into()
                .unwrap_or([0; PACKET_LEN]);
            match decode_packet(&frame) {
                Ok(p) => {
                    self.buf.drain(..PACKET_LEN);
                    packets.push(p);
                }
                Err(_) => {
                    // Bad field data behind a real heartbeat: drop the
                    // heartbeat byte and rescan.
                    self.malformed += 1;
                    self.buf.drain(..1);
                }
            }
        }
        packets
    }

    /// Bytes discarded since the last call. Non-zero means the stream
    /// carried garbage or a truncated frame.
    pub fn take_malformed(&mut self) -> usize {
        std::mem::take(&mut self.malformed)
    }
}
