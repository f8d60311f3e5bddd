//! This crate implements the device side of the LIFX LAN protocol, so that any light you can drive
//! from software can show up in the LIFX app (and in home automation hubs) as if it were a real
//! LIFX color bulb.
//!
//! Protocol documentation can be found here: https://lan.developer.lifx.com/
//!
//! The crate does not talk to the network, read the clock, or touch any hardware itself.  Those
//! are provided by the host through the traits in [host] and [light], and the host decides how
//! datagrams reach [Emulator::handle_datagram] and how often [Emulator::tick] runs.
//!
//! # Quirks
//!
//! Real bulbs do a number of odd things that clients have come to depend on, and this crate
//! reproduces them on purpose:
//!
//! * Discovery ([Message::GetService]) is answered twice, once for service type 1 and once for
//!   service type 5.
//! * Group and location identifiers are sent in a mixed-endian byte order (see [Guid]).
//! * Every nanosecond timestamp the device reports has [MAGIC_OFFSET] added to it.
//!
//! # Reserved fields
//! Reserved fields in incoming packets are accepted whatever their value.  Be conservative in what
//! you send, and liberal in what you accept.

use std::io;
use thiserror::Error;

mod codec;
mod dispatch;
mod emulator;
pub mod host;
pub mod light;
mod message;
mod persist;
mod state;
mod types;
mod waveform;

pub use codec::{
    header_timestamp, BuildOptions, Frame, FrameAddress, ProtocolHeader, RawMessage, HEADER_SIZE,
    LIFX_PORT, MAGIC_OFFSET, MAX_DATAGRAM_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_NUMBER, SITE,
};
pub use dispatch::{is_device_state, Reply};
pub use emulator::Emulator;
pub use message::Message;
pub use persist::{
    MemoryStore, PersistedMembership, PersistedState, PersistenceGuard, PersistentStore,
};
pub use state::{CloudStub, DeviceDefaults, DeviceState, Membership};
pub use types::{Blob, Guid, Label, PowerLevel, Service, Waveform, HSBK};
pub use waveform::{WaveformEngine, WaveformParams};

/// Various message encoding/decoding errors
#[derive(Error, Debug)]
pub enum Error {
    /// This error means we were unable to parse a raw message because its type is unknown.
    ///
    /// LIFX apps are known to send messages that are not officially documented, so this error
    /// type does not necessarily represent a bug.
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    /// This error means one of the message fields contains an invalid or unsupported value.
    ///
    /// The inner string is a description of the error.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The datagram is larger than [MAX_DATAGRAM_SIZE] and was not decoded.
    #[error("datagram of {0} bytes exceeds the {max} byte limit", max = MAX_DATAGRAM_SIZE)]
    Oversized(usize),

    /// The datagram is shorter than the fixed header.
    #[error("datagram of {0} bytes is shorter than the {len} byte header", len = HEADER_SIZE)]
    Truncated(usize),

    /// The device configuration is unusable (bad GUID, missing light, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
