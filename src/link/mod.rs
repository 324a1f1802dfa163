//! Controller link: wire encoding and transport.
//!
//! The stand controller speaks a character-framed ASCII command protocol
//! outbound and a fixed-size binary telemetry packet inbound. [`codec`]
//! owns both formats; [`transport`] moves the bytes with bounded blocking.

pub mod codec;
pub mod transport;

pub use codec::{FrameDecoder, TelemetryPacket, WireCommand, PACKET_LEN};
pub use transport::{LinkPort, NullLink, TcpLink};
