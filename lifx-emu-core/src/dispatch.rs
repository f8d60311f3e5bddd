use tracing::{debug, info, warn};

use crate::codec::{header_timestamp, RawMessage, LIFX_PORT};
use crate::emulator::Emulator;
use crate::host::signal_milliwatts;
use crate::message::Message;
use crate::state::copy_bounded;
use crate::types::{Blob, PowerLevel, Service};
use crate::waveform::WaveformParams;
use crate::Error;

const HOST_FIRMWARE_BUILD: u64 = 0x14d9_051c_5818_9400;
const HOST_FIRMWARE_MINOR: u16 = 22;
const HOST_FIRMWARE_MAJOR: u16 = 1;

const WIFI_FIRMWARE_BUILD: u64 = 0x1435_157d_aa82_8800;
const WIFI_FIRMWARE_MINOR: u16 = 62;
const WIFI_FIRMWARE_MAJOR: u16 = 101;

const VENDOR_LIFX: u32 = 1;
/// LIFX Color 1000
const PRODUCT_ID: u32 = 22;

/// One message to send back, before it gets a header.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message: Message,
    /// Frame origin bits.  Responses use 1, but StateZone goes out like a bulb command, with 0.
    pub origin: u8,
    /// Set the response-required flag on the reply.  Real bulbs do this for some state messages.
    pub res_flag: bool,
}

impl Reply {
    fn state(message: Message) -> Reply {
        Reply {
            message,
            origin: 1,
            res_flag: false,
        }
    }

    fn flagged(message: Message) -> Reply {
        Reply {
            message,
            origin: 1,
            res_flag: true,
        }
    }

    fn command(message: Message) -> Reply {
        Reply {
            message,
            origin: 0,
            res_flag: false,
        }
    }
}

/// Messages that only a device sends.  Other bulbs on the network broadcast these, and they are
/// dropped without being decoded.
pub fn is_device_state(typ: u16) -> bool {
    matches!(
        typ,
        3 | 13
            | 15
            | 17
            | 19
            | 22
            | 25
            | 28
            | 31
            | 33
            | 35
            | 45
            | 50
            | 53
            | 56
            | 59
            | 107
            | 118
            | 121
            | 203
            | 206
            | 211
            | 223
            | 503
            | 506
    )
}

impl Emulator {
    /// Works out the replies to one decoded packet, updating the device along the way.
    ///
    /// The acknowledgement is included when the packet asks for one.  Payloads too short for
    /// their message type are an error, and no acknowledgement is sent for them.
    pub fn handle_raw(&mut self, raw: &RawMessage, now_ms: u64) -> Result<Vec<Reply>, Error> {
        let typ = raw.protocol_header.typ;
        let addr = &raw.frame_addr;

        if addr.reserved2 != 0 {
            debug!("Reserved flag bits set: {:#04x}", addr.flags());
        }

        let mut replies = if is_device_state(typ) {
            debug!("Ignoring device state message {} from another device", typ);
            Vec::new()
        } else {
            match Message::from_raw(raw) {
                Ok(msg) => {
                    debug!("Received {:?}", msg);
                    self.handle_message(msg, addr.res_required, now_ms)
                }
                Err(Error::UnknownMessageType(t)) => {
                    warn!("Unknown message type {} ({} byte payload)", t, raw.payload.len());
                    Vec::new()
                }
                Err(e) => return Err(e),
            }
        };

        if addr.ack_required {
            replies.push(Reply::state(Message::Acknowledgement {
                seq: addr.sequence,
            }));
        }
        Ok(replies)
    }

    fn handle_message(&mut self, msg: Message, res_required: bool, now_ms: u64) -> Vec<Reply> {
        let mut replies = Vec::new();
        match msg {
            Message::GetService => {
                for service in [Service::UDP, Service::UDP5] {
                    replies.push(Reply::state(Message::StateService {
                        service,
                        port: LIFX_PORT as u32,
                    }));
                }
            }
            Message::GetHostInfo => {
                replies.push(Reply::state(Message::StateHostInfo {
                    signal: signal_milliwatts(self.identity.rssi()),
                    tx: self.state.tx_bytes,
                    rx: self.state.rx_bytes,
                    reserved: 0,
                }));
            }
            Message::GetWifiInfo => {
                replies.push(Reply::state(Message::StateWifiInfo {
                    signal: signal_milliwatts(self.identity.rssi()),
                    tx: self.state.tx_bytes,
                    rx: self.state.rx_bytes,
                    reserved: 0,
                }));
            }
            Message::GetHostFirmware => {
                replies.push(Reply::flagged(Message::StateHostFirmware {
                    build: HOST_FIRMWARE_BUILD,
                    reserved: HOST_FIRMWARE_BUILD,
                    version_minor: HOST_FIRMWARE_MINOR,
                    version_major: HOST_FIRMWARE_MAJOR,
                }));
            }
            Message::GetWifiFirmware => {
                replies.push(Reply::flagged(Message::StateWifiFirmware {
                    build: WIFI_FIRMWARE_BUILD,
                    reserved: 0,
                    version_minor: WIFI_FIRMWARE_MINOR,
                    version_major: WIFI_FIRMWARE_MAJOR,
                }));
            }
            Message::GetVersion => {
                replies.push(Reply::flagged(Message::StateVersion {
                    vendor: VENDOR_LIFX,
                    product: PRODUCT_ID,
                    version: 0,
                }));
            }
            Message::GetInfo => {
                let now = self.clock.utcnow();
                replies.push(Reply::state(Message::StateInfo {
                    time: header_timestamp(now),
                    uptime: now.saturating_sub(self.started_at).saturating_mul(1_000_000_000),
                    downtime: 0,
                }));
            }
            Message::SetReboot => {
                info!("Reboot requested, ignoring");
            }

            Message::GetPower => {
                replies.push(Reply::state(self.state_power()));
            }
            Message::SetPower { level } => {
                self.set_power(level, 0);
                if res_required {
                    replies.push(Reply::state(self.state_power()));
                }
            }
            Message::LightGetPower => {
                replies.push(Reply::state(self.light_state_power()));
            }
            Message::LightSetPower { level, duration } => {
                self.set_power(level, duration);
                if res_required {
                    replies.push(Reply::state(self.light_state_power()));
                }
            }

            Message::GetLabel => {
                replies.push(Reply::state(Message::StateLabel {
                    label: self.state.label,
                }));
            }
            Message::SetLabel { label } => {
                info!("Label changed to {:?}", label.to_string());
                self.state.label = label;
                self.save();
                if res_required {
                    replies.push(Reply::state(Message::StateLabel { label }));
                }
            }
            Message::GetTags => {
                replies.push(Reply::state(Message::StateTags {
                    tags: self.state.tags,
                }));
            }
            Message::SetTags { tags } => {
                self.state.tags = tags;
                self.save();
                if res_required {
                    replies.push(Reply::state(Message::StateTags { tags }));
                }
            }
            Message::GetTagLabels => {
                replies.push(Reply::state(Message::StateTagLabels {
                    label: self.state.tag_labels,
                }));
            }
            Message::SetTagLabels { label } => {
                self.state.tag_labels = label;
                self.save();
                if res_required {
                    replies.push(Reply::state(Message::StateTagLabels { label }));
                }
            }

            Message::GetLocation => {
                replies.push(Reply::flagged(self.state_location()));
            }
            Message::SetLocation {
                location,
                label,
                updated_at,
            } => {
                self.state.location.guid = location;
                self.state.location.label = label;
                self.state.location.updated_at = self.stamp(updated_at);
                info!(
                    "Location changed to {:?} ({})",
                    label.to_string(),
                    location
                );
                self.save();
                if res_required {
                    replies.push(Reply::flagged(self.state_location()));
                }
            }
            Message::GetGroup => {
                replies.push(Reply::flagged(self.state_group()));
            }
            Message::SetGroup {
                group,
                label,
                updated_at,
            } => {
                self.state.group.guid = group;
                self.state.group.label = label;
                self.state.group.updated_at = self.stamp(updated_at);
                info!("Group changed to {:?} ({})", label.to_string(), group);
                self.save();
                if res_required {
                    replies.push(Reply::flagged(self.state_group()));
                }
            }

            Message::GetAuth => {
                replies.push(Reply::flagged(self.state_auth()));
            }
            Message::SetAuth { payload } => {
                copy_bounded(&mut self.state.cloud.auth, &payload.0);
                if res_required {
                    replies.push(Reply::flagged(self.state_auth()));
                }
            }
            Message::GetCloudStatus => {
                replies.push(Reply::flagged(Message::StateCloudStatus {
                    status: self.state.cloud.status,
                }));
            }
            Message::SetCloudStatus { status } => {
                debug!("Cloud status changed to {}", status);
                self.state.cloud.status = status;
                if res_required {
                    replies.push(Reply::flagged(Message::StateCloudStatus { status }));
                }
            }
            Message::GetCloudAuth => {
                replies.push(Reply::flagged(self.state_cloud_auth()));
            }
            Message::SetCloudAuth { payload } => {
                copy_bounded(&mut self.state.cloud.cloud_auth, &payload.0);
                if res_required {
                    replies.push(Reply::flagged(self.state_cloud_auth()));
                }
            }
            Message::GetCloudBroker => {
                replies.push(Reply::flagged(self.state_cloud_broker()));
            }
            Message::SetCloudBroker { payload } => {
                copy_bounded(&mut self.state.cloud.broker, &payload.0);
                if res_required {
                    replies.push(Reply::flagged(self.state_cloud_broker()));
                }
            }

            Message::EchoRequest { payload } => {
                replies.push(Reply::state(Message::EchoResponse { payload }));
            }

            Message::LightGet => {
                replies.push(Reply::state(self.light_state()));
            }
            Message::LightSetColor {
                reserved: _,
                color,
                duration,
            } => {
                self.waveform.stop(&mut self.state.color, false);
                self.state.color = color;
                self.update_light(duration);
                if res_required {
                    replies.push(Reply::state(self.light_state()));
                }
            }
            Message::SetWaveform {
                reserved: _,
                transient,
                color,
                period,
                cycles,
                skew_ratio,
                waveform,
            } => {
                let params =
                    WaveformParams::all(transient, color, period, cycles, skew_ratio, waveform);
                self.start_waveform(params, now_ms);
                if res_required {
                    replies.push(Reply::state(self.light_state()));
                }
            }
            Message::SetWaveformOptional {
                reserved: _,
                transient,
                color,
                period,
                cycles,
                skew_ratio,
                waveform,
                set_hue,
                set_saturation,
                set_brightness,
                set_kelvin,
            } => {
                let params = WaveformParams {
                    transient,
                    color,
                    period,
                    cycles,
                    skew_ratio,
                    waveform,
                    set_hue,
                    set_saturation,
                    set_brightness,
                    set_kelvin,
                };
                self.start_waveform(params, now_ms);
                if res_required {
                    replies.push(Reply::state(self.light_state()));
                }
            }

            Message::LightGetInfrared => {
                replies.push(Reply::state(Message::LightStateInfrared {
                    brightness: self.state.infrared,
                }));
            }
            Message::LightSetInfrared { brightness } => {
                self.state.infrared = brightness;
                if res_required {
                    replies.push(Reply::state(Message::LightStateInfrared { brightness }));
                }
            }

            Message::GetColorZones { .. } => {
                replies.push(Reply::command(Message::StateZone {
                    count: 1,
                    index: 0,
                    color: self.state.color,
                }));
            }

            Message::StateService { .. }
            | Message::StateHostInfo { .. }
            | Message::StateHostFirmware { .. }
            | Message::StateWifiInfo { .. }
            | Message::StateWifiFirmware { .. }
            | Message::StatePower { .. }
            | Message::StateLabel { .. }
            | Message::StateTags { .. }
            | Message::StateTagLabels { .. }
            | Message::StateVersion { .. }
            | Message::StateInfo { .. }
            | Message::Acknowledgement { .. }
            | Message::StateLocation { .. }
            | Message::StateGroup { .. }
            | Message::StateAuth { .. }
            | Message::EchoResponse { .. }
            | Message::LightState { .. }
            | Message::LightStatePower { .. }
            | Message::LightStateInfrared { .. }
            | Message::StateCloudStatus { .. }
            | Message::StateCloudAuth { .. }
            | Message::StateCloudBroker { .. }
            | Message::StateZone { .. } => {
                debug!("Ignoring device state message");
            }
        }
        replies
    }

    fn set_power(&mut self, level: u16, duration: u32) {
        self.waveform.stop(&mut self.state.color, false);
        self.state.power = PowerLevel::from_level(level);
        info!("Power {:?}", self.state.power);
        self.update_light(duration);
    }

    fn start_waveform(&mut self, params: WaveformParams, now_ms: u64) {
        let active = self.waveform.start(&mut self.state.color, params, now_ms);
        if !active {
            self.update_light(0);
        }
    }

    /// A client supplied `updated_at`, or now if the client left it zero.
    fn stamp(&self, updated_at: u64) -> u64 {
        if updated_at == 0 {
            header_timestamp(self.clock.utcnow())
        } else {
            updated_at
        }
    }

    fn state_power(&self) -> Message {
        Message::StatePower {
            level: self.state.power as u16,
        }
    }

    fn light_state_power(&self) -> Message {
        Message::LightStatePower {
            level: self.state.power as u16,
        }
    }

    fn light_state(&self) -> Message {
        Message::LightState {
            color: self.state.color,
            reserved: 0,
            power: self.state.power as u16,
            label: self.state.label,
            tags: self.state.tags,
        }
    }

    fn state_location(&self) -> Message {
        Message::StateLocation {
            location: self.state.location.guid,
            label: self.state.location.label,
            updated_at: self.state.location.updated_at,
        }
    }

    fn state_group(&self) -> Message {
        Message::StateGroup {
            group: self.state.group.guid,
            label: self.state.group.label,
            updated_at: self.state.group.updated_at,
        }
    }

    fn state_auth(&self) -> Message {
        Message::StateAuth {
            payload: Blob(self.state.cloud.auth.to_vec()),
        }
    }

    fn state_cloud_auth(&self) -> Message {
        Message::StateCloudAuth {
            payload: Blob(self.state.cloud.cloud_auth.to_vec()),
        }
    }

    fn state_cloud_broker(&self) -> Message {
        Message::StateCloudBroker {
            payload: Blob(self.state.cloud.broker.to_vec()),
        }
    }
}
