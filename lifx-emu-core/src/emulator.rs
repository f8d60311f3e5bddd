use tracing::{debug, info, warn};

use crate::codec::{header_timestamp, BuildOptions, RawMessage, SITE};
use crate::dispatch::Reply;
use crate::host::{NetworkIdentity, TimeSource};
use crate::light::LightOutput;
use crate::persist::{PersistenceGuard, PersistentStore};
use crate::state::{DeviceDefaults, DeviceState};
use crate::waveform::WaveformEngine;
use crate::Error;

/// An emulated LIFX bulb.
///
/// Feed it every datagram that arrives on the LIFX port with [Emulator::handle_datagram], send
/// back what it returns, and call [Emulator::tick] regularly (every 50ms is plenty) so waveform
/// effects keep moving.  Both take a monotonic time in milliseconds.
///
/// Nothing in here is shared, so the emulator must only be used from one place at a time.
pub struct Emulator {
    pub(crate) state: DeviceState,
    pub(crate) waveform: WaveformEngine,
    pub(crate) light: LightOutput,
    pub(crate) persistence: PersistenceGuard,
    pub(crate) clock: Box<dyn TimeSource>,
    pub(crate) identity: Box<dyn NetworkIdentity>,
    /// Wall clock seconds at startup
    pub(crate) started_at: u64,
}

impl Emulator {
    /// Creates the bulb from its defaults, replaced by saved state where that is still valid,
    /// and shows the starting color on the light.
    pub fn new(
        defaults: &DeviceDefaults,
        light: LightOutput,
        store: Box<dyn PersistentStore>,
        clock: Box<dyn TimeSource>,
        identity: Box<dyn NetworkIdentity>,
    ) -> Emulator {
        let mut state = DeviceState::from_defaults(defaults);
        let persistence = PersistenceGuard::new(defaults, store);
        persistence.load(&mut state);

        let mac = identity.mac();
        info!(
            "Emulating bulb {:?} ({:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}) in location {:?}, group {:?}",
            state.label.to_string(),
            mac[0],
            mac[1],
            mac[2],
            mac[3],
            mac[4],
            mac[5],
            state.location.label.to_string(),
            state.group.label.to_string()
        );

        let started_at = clock.utcnow();
        let mut emulator = Emulator {
            state,
            waveform: WaveformEngine::new(),
            light,
            persistence,
            clock,
            identity,
            started_at,
        };
        emulator.update_light(0);
        emulator
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn waveform_active(&self) -> bool {
        self.waveform.is_active()
    }

    /// Handles one received datagram and returns the datagrams to send back to its sender, in
    /// order.
    ///
    /// Anything that cannot be decoded is logged and produces no reply at all.
    pub fn handle_datagram(&mut self, data: &[u8], now_ms: u64) -> Vec<Vec<u8>> {
        self.state.count_rx(data.len());

        let raw = match RawMessage::unpack(data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Dropping datagram: {}", e);
                return Vec::new();
            }
        };

        let replies = match self.handle_raw(&raw, now_ms) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    "Dropping message type {} with {} byte payload: {}",
                    raw.protocol_header.typ,
                    raw.payload.len(),
                    e
                );
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(replies.len());
        for reply in replies {
            match self.encode(&raw, &reply) {
                Ok(bytes) => {
                    self.state.count_tx(bytes.len());
                    out.push(bytes);
                }
                Err(e) => warn!("Unable to encode {:?}: {}", reply.message, e),
            }
        }
        out
    }

    /// Advances a running waveform and updates the light if the color moved.
    pub fn tick(&mut self, now_ms: u64) {
        if self.waveform.update(&mut self.state.color, now_ms) {
            self.update_light(0);
        }
    }

    fn encode(&self, request: &RawMessage, reply: &Reply) -> Result<Vec<u8>, Error> {
        let options = BuildOptions {
            target: Some(self.identity.mac()),
            site: SITE,
            origin: reply.origin,
            ack_required: false,
            res_required: reply.res_flag,
            sequence: request.frame_addr.sequence,
            source: request.frame.source,
            timestamp: header_timestamp(self.clock.utcnow()),
        };
        debug!("Sending {:?}", reply.message);
        RawMessage::build(&options, &reply.message)?.pack()
    }

    pub(crate) fn update_light(&mut self, transition_ms: u32) {
        self.light
            .apply(self.state.color, self.state.power, transition_ms);
    }

    pub(crate) fn save(&mut self) {
        self.persistence.save(&self.state);
    }
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("state", &self.state)
            .field("waveform", &self.waveform)
            .field("light", &self.light)
            .finish()
    }
}
