use std::io::Cursor;

use crate::codec::{LittleEndianReader, LittleEndianWriter, RawMessage};
use crate::types::{Blob, Guid, Label, Service, Waveform, HSBK};
use crate::Error;

trait LifxFrom<T>: Sized {
    fn from(val: T) -> Result<Self, Error>;
}

macro_rules! derive_lifx_from {
{ $( $t:ty ),*} => {
    $(
        impl LifxFrom<$t> for $t {
            fn from(val: $t) -> Result<Self, Error> { Ok(val)}
        }
    )*

}
}

derive_lifx_from! {
    u8, u16, i16, u32, f32, u64, [u8; 8], Guid, Label, Blob, HSBK
}

impl LifxFrom<u8> for bool {
    fn from(val: u8) -> Result<bool, Error> {
        Ok(val != 0)
    }
}

impl LifxFrom<u8> for Waveform {
    fn from(val: u8) -> Result<Waveform, Error> {
        match val {
            0 => Ok(Waveform::Saw),
            1 => Ok(Waveform::Sine),
            2 => Ok(Waveform::HalfSine),
            3 => Ok(Waveform::Triangle),
            4 => Ok(Waveform::Pulse),
            x => Err(Error::ProtocolError(format!(
                "Unknown waveform value {}",
                x
            ))),
        }
    }
}

impl LifxFrom<u8> for Service {
    fn from(val: u8) -> Result<Service, Error> {
        match val {
            1 => Ok(Service::UDP),
            2 => Ok(Service::TCP),
            5 => Ok(Service::UDP5),
            x => Err(Error::ProtocolError(format!(
                "Unknown service value {}",
                x
            ))),
        }
    }
}

macro_rules! unpack {
    ($msg:ident, $typ:ident, $( $n:ident: $t:ty ),*) => {
        {
        let mut c = Cursor::new(&$msg.payload);
        $(
            let $n: $t = c.read_val()?;
        )*

        Message::$typ{
            $(
                $n: LifxFrom::from($n)?,
            )*
        }
        }

    };
}

/// Decoded LIFX Messages
///
/// This enum lists every message type the emulated bulb understands or sends, including the
/// undocumented ones real bulbs exchange with the LIFX app (tags, auth, cloud).
///
/// Levels and flags are kept as they appear on the wire; the dispatcher decides what they mean.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Message {
    /// GetService - 2
    ///
    /// Sent by a client to acquire responses from all devices on the local network. No payload is
    /// required. Causes the devices to transmit a StateService message.
    GetService,

    /// StateService - 3
    ///
    /// Response to [Message::GetService] message.
    StateService {
        /// unsigned 8-bit integer, maps to `Service`
        service: Service,
        /// Port number of the light.  If the service is temporarily unavailable, then the port value
        /// will be 0.
        port: u32,
    },

    /// GetHostInfo - 12
    ///
    /// Get Host MCU information. No payload is required. Causes the device to transmit a
    /// [Message::StateHostInfo] message.
    GetHostInfo,

    /// StateHostInfo - 13
    ///
    /// Response to [Message::GetHostInfo] message.
    StateHostInfo {
        /// radio receive signal strength in milliWatts
        signal: f32,
        /// Bytes transmitted since power on
        tx: u32,
        /// Bytes received since power on
        rx: u32,
        reserved: i16,
    },

    /// GetHostFirmware - 14
    ///
    /// Gets Host MCU firmware information. No payload is required. Causes the device to transmit a
    /// [Message::StateHostFirmware] message.
    GetHostFirmware,

    /// StateHostFirmware - 15
    ///
    /// Response to [Message::GetHostFirmware] message.
    StateHostFirmware {
        /// Firmware build time (absolute time in nanoseconds since epoch)
        build: u64,
        reserved: u64,
        /// Minor firmware version number
        version_minor: u16,
        /// Major firmware version number
        version_major: u16,
    },

    /// GetWifiInfo - 16
    ///
    /// Get Wifi subsystem information. No payload is required. Causes the device to transmit a
    /// [Message::StateWifiInfo] message.
    GetWifiInfo,

    /// StateWifiInfo - 17
    ///
    /// Response to [Message::GetWifiInfo] message.
    StateWifiInfo {
        /// Radio receive signal strength in milliWatts
        signal: f32,
        /// Bytes transmitted since power on
        tx: u32,
        /// Bytes received since power on
        rx: u32,
        reserved: i16,
    },

    /// GetWifiFirmware - 18
    ///
    /// Get Wifi subsystem firmware. No payload is required. Causes the device to transmit a
    /// [Message::StateWifiFirmware] message.
    GetWifiFirmware,

    /// StateWifiFirmware - 19
    ///
    /// Response to [Message::GetWifiFirmware] message.
    StateWifiFirmware {
        /// firmware build time (absolute time in nanoseconds since epoch)
        build: u64,
        reserved: u64,
        version_minor: u16,
        version_major: u16,
    },

    /// GetPower - 20
    ///
    /// Get device power level. No payload is required. Causes the device to transmit a
    /// [Message::StatePower] message
    GetPower,

    /// SetPower - 21
    ///
    /// Set device power level.  Zero is off; anything else turns the light on.
    SetPower { level: u16 },

    /// StatePower - 22
    ///
    /// Response to [Message::GetPower] message.
    StatePower { level: u16 },

    /// GetLabel - 23
    ///
    /// Get device label. No payload is required. Causes the device to transmit a
    /// [Message::StateLabel] message.
    GetLabel,

    /// SetLabel - 24
    ///
    /// Set the device label text.
    SetLabel { label: Label },

    /// StateLabel - 25
    ///
    /// Response to [Message::GetLabel] message.
    StateLabel { label: Label },

    /// GetTags - 26
    ///
    /// Undocumented.  The LIFX app still asks for these.
    GetTags,

    /// SetTags - 27
    SetTags { tags: [u8; 8] },

    /// StateTags - 28
    StateTags { tags: [u8; 8] },

    /// GetTagLabels - 29
    ///
    /// Undocumented.
    GetTagLabels,

    /// SetTagLabels - 30
    SetTagLabels { label: Label },

    /// StateTagLabels - 31
    StateTagLabels { label: Label },

    /// GetVersion - 32
    ///
    /// Get the hardware version. No payload is required. Causes the device to transmit a
    /// [Message::StateVersion] message.
    GetVersion,

    /// StateVersion - 33
    ///
    /// Response to [Message::GetVersion] message.
    StateVersion {
        /// vendor ID
        vendor: u32,
        /// product ID
        product: u32,
        /// hardware version
        version: u32,
    },

    /// GetInfo - 34
    ///
    /// Get run-time information. No payload is required. Causes the device to transmit a
    /// [Message::StateInfo] message.
    GetInfo,

    /// StateInfo - 35
    ///
    /// Response to [Message::GetInfo] message.
    StateInfo {
        /// current time (absolute time in nanoseconds since epoch)
        time: u64,
        /// time since last power on (relative time in nanoseconds)
        uptime: u64,
        /// last power off period, 5 second accuracy (in nanoseconds)
        downtime: u64,
    },

    /// SetReboot - 38
    ///
    /// Undocumented.  Asks the device to restart.
    SetReboot,

    /// Acknowledgement - 45
    ///
    /// Response to any message sent with ack_required set to 1.
    Acknowledgement {
        /// sequence number of the message being acknowledged
        seq: u8,
    },

    /// GetLocation - 48
    ///
    /// Ask the bulb to return its location information. No payload is required. Causes the
    /// device to transmit a [Message::StateLocation] message.
    GetLocation,

    /// SetLocation - 49
    ///
    /// Set the device location
    SetLocation {
        /// GUID byte array
        location: Guid,
        /// The name assigned to this location
        label: Label,
        /// An epoch in nanoseconds of when this location was set on the bulb
        updated_at: u64,
    },

    /// StateLocation - 50
    ///
    /// Device location.
    StateLocation {
        location: Guid,
        label: Label,
        updated_at: u64,
    },

    /// GetGroup - 51
    ///
    /// Ask the bulb to return its group membership information.
    /// No payload is required.
    /// Causes the device to transmit a [Message::StateGroup] message.
    GetGroup,

    /// SetGroup - 52
    ///
    /// Set the device group
    SetGroup {
        group: Guid,
        label: Label,
        updated_at: u64,
    },

    /// StateGroup - 53
    ///
    /// Device group.
    StateGroup {
        group: Guid,
        label: Label,
        updated_at: u64,
    },

    /// GetAuth - 54
    ///
    /// Undocumented.  The payload of the matching state message is opaque.
    GetAuth,

    /// SetAuth - 55
    SetAuth { payload: Blob },

    /// StateAuth - 56
    StateAuth { payload: Blob },

    /// EchoRequest - 58
    ///
    /// Request an arbitrary payload be echoed back. Causes the device to transmit an
    /// [Message::EchoResponse] message.
    EchoRequest { payload: Blob },

    /// EchoResponse - 59
    ///
    /// Response to [Message::EchoRequest] message.
    ///
    /// Echo response with payload sent in the EchoRequest.
    EchoResponse { payload: Blob },

    /// Get - 101
    ///
    /// Sent by a client to obtain the light state. No payload required. Causes the device to
    /// transmit a [Message::LightState] message.
    LightGet,

    /// SetColor - 102
    ///
    /// Sent by a client to change the light state.
    ///
    /// If the Frame Address res_required field is set to one (1) then the device will transmit a
    /// [Message::LightState] message.
    LightSetColor {
        reserved: u8,
        /// Color in HSBK
        color: HSBK,
        /// Color transition time in milliseconds
        duration: u32,
    },

    /// SetWaveform - 103
    ///
    /// Apply an effect to the bulb.
    SetWaveform {
        reserved: u8,
        transient: bool,
        color: HSBK,
        /// Duration of a cycle in milliseconds
        period: u32,
        /// Number of cycles.  Zero or less repeats forever.
        cycles: f32,
        /// Waveform Skew, [-32768, 32767] scaled to [0, 1].
        skew_ratio: i16,
        /// Waveform to use for transition.
        waveform: Waveform,
    },

    /// State - 107
    ///
    /// Sent by a device to provide the current light state.
    LightState {
        color: HSBK,
        reserved: i16,
        power: u16,
        label: Label,
        tags: [u8; 8],
    },

    /// GetPower - 116
    ///
    /// Sent by a client to obtain the power level. No payload required. Causes the device to
    /// transmit a [Message::LightStatePower] message.
    LightGetPower,

    /// SetPower - 117
    ///
    /// Sent by a client to change the light power level.
    ///
    /// The duration is the power level transition time in milliseconds.
    LightSetPower { level: u16, duration: u32 },

    /// StatePower - 118
    ///
    /// Sent by a device to provide the current power level.
    LightStatePower { level: u16 },

    /// SetWaveformOptional - 119
    ///
    /// Apply an effect to the bulb.  Only the color components with their flag set are animated;
    /// the others keep their current value.
    SetWaveformOptional {
        reserved: u8,
        transient: bool,
        color: HSBK,
        /// Duration of a cycle in milliseconds
        period: u32,
        /// Number of cycles
        cycles: f32,
        /// Waveform Skew, [-32768, 32767] scaled to [0, 1].
        skew_ratio: i16,
        /// Waveform to use for transition.
        waveform: Waveform,
        set_hue: bool,
        set_saturation: bool,
        set_brightness: bool,
        set_kelvin: bool,
    },

    /// GetInfrared - 120
    ///
    /// Gets the current maximum power level of the Infrared channel
    LightGetInfrared,

    /// StateInfrared - 121
    ///
    /// Indicates the current maximum setting for the infrared channel.
    LightStateInfrared { brightness: u16 },

    /// SetInfrared -- 122
    ///
    /// Set the current maximum brightness for the infrared channel.
    LightSetInfrared { brightness: u16 },

    /// GetCloudStatus - 201
    ///
    /// Undocumented.
    GetCloudStatus,

    /// SetCloudStatus - 202
    SetCloudStatus { status: u8 },

    /// StateCloudStatus - 203
    StateCloudStatus { status: u8 },

    /// GetCloudAuth - 204
    ///
    /// Undocumented.
    GetCloudAuth,

    /// SetCloudAuth - 205
    SetCloudAuth { payload: Blob },

    /// StateCloudAuth - 206
    StateCloudAuth { payload: Blob },

    /// GetCloudBroker - 209
    ///
    /// Undocumented.  The state message carries the URL of the cloud broker.
    GetCloudBroker,

    /// SetCloudBroker - 210
    SetCloudBroker { payload: Blob },

    /// StateCloudBroker - 211
    StateCloudBroker { payload: Blob },

    /// GetColorZones - 502
    ///
    /// GetColorZones is used to request the zone colors for a range of zones.
    GetColorZones { start_index: u8, end_index: u8 },

    /// StateZone - 503
    StateZone { count: u8, index: u8, color: HSBK },
}

impl Message {
    pub fn get_num(&self) -> u16 {
        match *self {
            Message::GetService => 2,
            Message::StateService { .. } => 3,
            Message::GetHostInfo => 12,
            Message::StateHostInfo { .. } => 13,
            Message::GetHostFirmware => 14,
            Message::StateHostFirmware { .. } => 15,
            Message::GetWifiInfo => 16,
            Message::StateWifiInfo { .. } => 17,
            Message::GetWifiFirmware => 18,
            Message::StateWifiFirmware { .. } => 19,
            Message::GetPower => 20,
            Message::SetPower { .. } => 21,
            Message::StatePower { .. } => 22,
            Message::GetLabel => 23,
            Message::SetLabel { .. } => 24,
            Message::StateLabel { .. } => 25,
            Message::GetTags => 26,
            Message::SetTags { .. } => 27,
            Message::StateTags { .. } => 28,
            Message::GetTagLabels => 29,
            Message::SetTagLabels { .. } => 30,
            Message::StateTagLabels { .. } => 31,
            Message::GetVersion => 32,
            Message::StateVersion { .. } => 33,
            Message::GetInfo => 34,
            Message::StateInfo { .. } => 35,
            Message::SetReboot => 38,
            Message::Acknowledgement { .. } => 45,
            Message::GetLocation => 48,
            Message::SetLocation { .. } => 49,
            Message::StateLocation { .. } => 50,
            Message::GetGroup => 51,
            Message::SetGroup { .. } => 52,
            Message::StateGroup { .. } => 53,
            Message::GetAuth => 54,
            Message::SetAuth { .. } => 55,
            Message::StateAuth { .. } => 56,
            Message::EchoRequest { .. } => 58,
            Message::EchoResponse { .. } => 59,
            Message::LightGet => 101,
            Message::LightSetColor { .. } => 102,
            Message::SetWaveform { .. } => 103,
            Message::LightState { .. } => 107,
            Message::LightGetPower => 116,
            Message::LightSetPower { .. } => 117,
            Message::LightStatePower { .. } => 118,
            Message::SetWaveformOptional { .. } => 119,
            Message::LightGetInfrared => 120,
            Message::LightStateInfrared { .. } => 121,
            Message::LightSetInfrared { .. } => 122,
            Message::GetCloudStatus => 201,
            Message::SetCloudStatus { .. } => 202,
            Message::StateCloudStatus { .. } => 203,
            Message::GetCloudAuth => 204,
            Message::SetCloudAuth { .. } => 205,
            Message::StateCloudAuth { .. } => 206,
            Message::GetCloudBroker => 209,
            Message::SetCloudBroker { .. } => 210,
            Message::StateCloudBroker { .. } => 211,
            Message::GetColorZones { .. } => 502,
            Message::StateZone { .. } => 503,
        }
    }

    /// Tries to parse the payload in a [RawMessage], based on its message type.
    ///
    /// Trailing payload bytes past a message's fixed layout are ignored.  A payload that is too
    /// short fails with [Error::Io].
    pub fn from_raw(msg: &RawMessage) -> Result<Message, Error> {
        match msg.protocol_header.typ {
            2 => Ok(Message::GetService),
            3 => Ok(unpack!(msg, StateService, service: u8, port: u32)),
            12 => Ok(Message::GetHostInfo),
            13 => Ok(unpack!(
                msg,
                StateHostInfo,
                signal: f32,
                tx: u32,
                rx: u32,
                reserved: i16
            )),
            14 => Ok(Message::GetHostFirmware),
            15 => Ok(unpack!(
                msg,
                StateHostFirmware,
                build: u64,
                reserved: u64,
                version_minor: u16,
                version_major: u16
            )),
            16 => Ok(Message::GetWifiInfo),
            17 => Ok(unpack!(
                msg,
                StateWifiInfo,
                signal: f32,
                tx: u32,
                rx: u32,
                reserved: i16
            )),
            18 => Ok(Message::GetWifiFirmware),
            19 => Ok(unpack!(
                msg,
                StateWifiFirmware,
                build: u64,
                reserved: u64,
                version_minor: u16,
                version_major: u16
            )),
            20 => Ok(Message::GetPower),
            21 => Ok(unpack!(msg, SetPower, level: u16)),
            22 => Ok(unpack!(msg, StatePower, level: u16)),
            23 => Ok(Message::GetLabel),
            24 => Ok(unpack!(msg, SetLabel, label: Label)),
            25 => Ok(unpack!(msg, StateLabel, label: Label)),
            26 => Ok(Message::GetTags),
            27 => Ok(unpack!(msg, SetTags, tags: [u8; 8])),
            28 => Ok(unpack!(msg, StateTags, tags: [u8; 8])),
            29 => Ok(Message::GetTagLabels),
            30 => Ok(unpack!(msg, SetTagLabels, label: Label)),
            31 => Ok(unpack!(msg, StateTagLabels, label: Label)),
            32 => Ok(Message::GetVersion),
            33 => Ok(unpack!(
                msg,
                StateVersion,
                vendor: u32,
                product: u32,
                version: u32
            )),
            34 => Ok(Message::GetInfo),
            35 => Ok(unpack!(
                msg,
                StateInfo,
                time: u64,
                uptime: u64,
                downtime: u64
            )),
            38 => Ok(Message::SetReboot),
            45 => Ok(Message::Acknowledgement {
                seq: msg.frame_addr.sequence,
            }),
            48 => Ok(Message::GetLocation),
            49 => Ok(unpack!(
                msg,
                SetLocation,
                location: Guid,
                label: Label,
                updated_at: u64
            )),
            50 => Ok(unpack!(
                msg,
                StateLocation,
                location: Guid,
                label: Label,
                updated_at: u64
            )),
            51 => Ok(Message::GetGroup),
            52 => Ok(unpack!(
                msg,
                SetGroup,
                group: Guid,
                label: Label,
                updated_at: u64
            )),
            53 => Ok(unpack!(
                msg,
                StateGroup,
                group: Guid,
                label: Label,
                updated_at: u64
            )),
            54 => Ok(Message::GetAuth),
            55 => Ok(unpack!(msg, SetAuth, payload: Blob)),
            56 => Ok(unpack!(msg, StateAuth, payload: Blob)),
            58 => Ok(unpack!(msg, EchoRequest, payload: Blob)),
            59 => Ok(unpack!(msg, EchoResponse, payload: Blob)),
            101 => Ok(Message::LightGet),
            102 => Ok(unpack!(
                msg,
                LightSetColor,
                reserved: u8,
                color: HSBK,
                duration: u32
            )),
            103 => Ok(unpack!(
                msg,
                SetWaveform,
                reserved: u8,
                transient: u8,
                color: HSBK,
                period: u32,
                cycles: f32,
                skew_ratio: i16,
                waveform: u8
            )),
            107 => Ok(unpack!(
                msg,
                LightState,
                color: HSBK,
                reserved: i16,
                power: u16,
                label: Label,
                tags: [u8; 8]
            )),
            116 => Ok(Message::LightGetPower),
            117 => Ok(unpack!(msg, LightSetPower, level: u16, duration: u32)),
            118 => Ok(unpack!(msg, LightStatePower, level: u16)),
            119 => Ok(unpack!(
                msg,
                SetWaveformOptional,
                reserved: u8,
                transient: u8,
                color: HSBK,
                period: u32,
                cycles: f32,
                skew_ratio: i16,
                waveform: u8,
                set_hue: u8,
                set_saturation: u8,
                set_brightness: u8,
                set_kelvin: u8
            )),
            120 => Ok(Message::LightGetInfrared),
            121 => Ok(unpack!(msg, LightStateInfrared, brightness: u16)),
            122 => Ok(unpack!(msg, LightSetInfrared, brightness: u16)),
            201 => Ok(Message::GetCloudStatus),
            202 => Ok(unpack!(msg, SetCloudStatus, status: u8)),
            203 => Ok(unpack!(msg, StateCloudStatus, status: u8)),
            204 => Ok(Message::GetCloudAuth),
            205 => Ok(unpack!(msg, SetCloudAuth, payload: Blob)),
            206 => Ok(unpack!(msg, StateCloudAuth, payload: Blob)),
            209 => Ok(Message::GetCloudBroker),
            210 => Ok(unpack!(msg, SetCloudBroker, payload: Blob)),
            211 => Ok(unpack!(msg, StateCloudBroker, payload: Blob)),
            502 => Ok(unpack!(msg, GetColorZones, start_index: u8, end_index: u8)),
            503 => Ok(unpack!(msg, StateZone, count: u8, index: u8, color: HSBK)),
            _ => Err(Error::UnknownMessageType(msg.protocol_header.typ)),
        }
    }

    /// Encodes just the payload of this message.  See [RawMessage::build] for the whole packet.
    pub fn pack_payload(&self) -> Result<Vec<u8>, Error> {
        let mut v = Vec::new();
        match self.clone() {
            Message::GetService
            | Message::GetHostInfo
            | Message::GetHostFirmware
            | Message::GetWifiInfo
            | Message::GetWifiFirmware
            | Message::GetPower
            | Message::GetLabel
            | Message::GetTags
            | Message::GetTagLabels
            | Message::GetVersion
            | Message::GetInfo
            | Message::SetReboot
            | Message::Acknowledgement { .. }
            | Message::GetLocation
            | Message::GetGroup
            | Message::GetAuth
            | Message::LightGet
            | Message::LightGetPower
            | Message::LightGetInfrared
            | Message::GetCloudStatus
            | Message::GetCloudAuth
            | Message::GetCloudBroker => {
                // these types have no payload
            }
            Message::StateService { service, port } => {
                v.write_val(service)?;
                v.write_val(port)?;
            }
            Message::StateHostInfo {
                signal,
                tx,
                rx,
                reserved,
            }
            | Message::StateWifiInfo {
                signal,
                tx,
                rx,
                reserved,
            } => {
                v.write_val(signal)?;
                v.write_val(tx)?;
                v.write_val(rx)?;
                v.write_val(reserved)?;
            }
            Message::StateHostFirmware {
                build,
                reserved,
                version_minor,
                version_major,
            }
            | Message::StateWifiFirmware {
                build,
                reserved,
                version_minor,
                version_major,
            } => {
                v.write_val(build)?;
                v.write_val(reserved)?;
                v.write_val(version_minor)?;
                v.write_val(version_major)?;
            }
            Message::SetPower { level }
            | Message::StatePower { level }
            | Message::LightStatePower { level } => {
                v.write_val(level)?;
            }
            Message::SetLabel { label }
            | Message::StateLabel { label }
            | Message::SetTagLabels { label }
            | Message::StateTagLabels { label } => {
                v.write_val(label)?;
            }
            Message::SetTags { tags } | Message::StateTags { tags } => {
                v.write_val(tags)?;
            }
            Message::StateVersion {
                vendor,
                product,
                version,
            } => {
                v.write_val(vendor)?;
                v.write_val(product)?;
                v.write_val(version)?;
            }
            Message::StateInfo {
                time,
                uptime,
                downtime,
            } => {
                v.write_val(time)?;
                v.write_val(uptime)?;
                v.write_val(downtime)?;
            }
            Message::SetLocation {
                location: guid,
                label,
                updated_at,
            }
            | Message::StateLocation {
                location: guid,
                label,
                updated_at,
            }
            | Message::SetGroup {
                group: guid,
                label,
                updated_at,
            }
            | Message::StateGroup {
                group: guid,
                label,
                updated_at,
            } => {
                v.write_val(guid)?;
                v.write_val(label)?;
                v.write_val(updated_at)?;
            }
            Message::SetAuth { payload }
            | Message::StateAuth { payload }
            | Message::EchoRequest { payload }
            | Message::EchoResponse { payload }
            | Message::SetCloudAuth { payload }
            | Message::StateCloudAuth { payload }
            | Message::SetCloudBroker { payload }
            | Message::StateCloudBroker { payload } => {
                v.write_val(payload)?;
            }
            Message::LightSetColor {
                reserved,
                color,
                duration,
            } => {
                v.write_val(reserved)?;
                v.write_val(color)?;
                v.write_val(duration)?;
            }
            Message::SetWaveform {
                reserved,
                transient,
                color,
                period,
                cycles,
                skew_ratio,
                waveform,
            } => {
                v.write_val(reserved)?;
                v.write_val(transient)?;
                v.write_val(color)?;
                v.write_val(period)?;
                v.write_val(cycles)?;
                v.write_val(skew_ratio)?;
                v.write_val(waveform)?;
            }
            Message::SetWaveformOptional {
                reserved,
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
                v.write_val(reserved)?;
                v.write_val(transient)?;
                v.write_val(color)?;
                v.write_val(period)?;
                v.write_val(cycles)?;
                v.write_val(skew_ratio)?;
                v.write_val(waveform)?;
                v.write_val(set_hue)?;
                v.write_val(set_saturation)?;
                v.write_val(set_brightness)?;
                v.write_val(set_kelvin)?;
            }
            Message::LightState {
                color,
                reserved,
                power,
                label,
                tags,
            } => {
                v.write_val(color)?;
                v.write_val(reserved)?;
                v.write_val(power)?;
                v.write_val(label)?;
                v.write_val(tags)?;
            }
            Message::LightSetPower { level, duration } => {
                v.write_val(level)?;
                v.write_val(duration)?;
            }
            Message::LightStateInfrared { brightness }
            | Message::LightSetInfrared { brightness } => {
                v.write_val(brightness)?;
            }
            Message::SetCloudStatus { status } | Message::StateCloudStatus { status } => {
                v.write_val(status)?;
            }
            Message::GetColorZones {
                start_index,
                end_index,
            } => {
                v.write_val(start_index)?;
                v.write_val(end_index)?;
            }
            Message::StateZone {
                count,
                index,
                color,
            } => {
                v.write_val(count)?;
                v.write_val(index)?;
                v.write_val(color)?;
            }
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BuildOptions;

    fn raw_with(typ: u16, payload: &[u8]) -> RawMessage {
        let mut raw = RawMessage::build(&BuildOptions::default(), &Message::GetService).unwrap();
        raw.protocol_header.typ = typ;
        raw.payload = payload.to_vec();
        raw
    }

    #[test]
    fn test_decode_set_color() {
        let raw = raw_with(
            102,
            &[0x00, 0x55, 0x55, 0xFF, 0xFF, 0xFF, 0xFF, 0xAC, 0x0D, 0x00, 0x04, 0x00, 0x00],
        );
        match Message::from_raw(&raw).unwrap() {
            Message::LightSetColor {
                reserved,
                color,
                duration,
            } => {
                assert_eq!(reserved, 0);
                assert_eq!(color.hue, 21845);
                assert_eq!(color.saturation, 65535);
                assert_eq!(color.brightness, 65535);
                assert_eq!(color.kelvin, 3500);
                assert_eq!(duration, 1024);
            }
            m => panic!("wrong message {:?}", m),
        }
    }

    #[test]
    fn test_decode_waveform_optional() {
        let mut payload = vec![0, 1];
        payload.extend_from_slice(&[0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0xAC, 0x0D]);
        payload.extend_from_slice(&500u32.to_le_bytes());
        payload.extend_from_slice(&2.5f32.to_le_bytes());
        payload.extend_from_slice(&(-16384i16).to_le_bytes());
        payload.push(4);
        payload.extend_from_slice(&[1, 0, 1, 0]);
        assert_eq!(payload.len(), 25);

        let msg = Message::from_raw(&raw_with(119, &payload)).unwrap();
        assert_eq!(
            msg,
            Message::SetWaveformOptional {
                reserved: 0,
                transient: true,
                color: HSBK {
                    hue: 0x10,
                    saturation: 0x20,
                    brightness: 0x30,
                    kelvin: 3500
                },
                period: 500,
                cycles: 2.5,
                skew_ratio: -16384,
                waveform: Waveform::Pulse,
                set_hue: true,
                set_saturation: false,
                set_brightness: true,
                set_kelvin: false,
            }
        );
        assert_eq!(msg.pack_payload().unwrap(), payload);
    }

    #[test]
    fn test_short_payload_is_an_error() {
        // SetColor needs 13 bytes
        let raw = raw_with(102, &[0x00, 0x55, 0x55, 0xFF]);
        assert!(matches!(Message::from_raw(&raw), Err(Error::Io(_))));

        let raw = raw_with(21, &[]);
        assert!(Message::from_raw(&raw).is_err());
    }

    #[test]
    fn test_bad_waveform() {
        let mut payload = vec![0; 21];
        payload[20] = 9;
        assert!(matches!(
            Message::from_raw(&raw_with(103, &payload)),
            Err(Error::ProtocolError(_))
        ));
    }

    #[test]
    fn test_unknown_type() {
        let raw = raw_with(700, &[]);
        assert!(matches!(
            Message::from_raw(&raw),
            Err(Error::UnknownMessageType(700))
        ));
    }

    #[test]
    fn test_location_guid_is_permuted() {
        let guid = Guid::parse("00010203-0405-0607-0809-0a0b0c0d0e0f").unwrap();
        let msg = Message::StateLocation {
            location: guid,
            label: Label::new("Home"),
            updated_at: 7,
        };
        let payload = msg.pack_payload().unwrap();
        assert_eq!(payload.len(), 56);
        assert_eq!(&payload[..8], &[3, 2, 1, 0, 5, 4, 7, 6]);
        assert_eq!(&payload[16..20], b"Home");
        assert_eq!(&payload[48..], &7u64.to_le_bytes());

        match Message::from_raw(&raw_with(49, &payload)).unwrap() {
            Message::SetLocation { location, .. } => assert_eq!(location, guid),
            m => panic!("wrong message {:?}", m),
        }
    }

    #[test]
    fn test_state_service_layout() {
        let msg = Message::StateService {
            service: Service::UDP5,
            port: 56700,
        };
        assert_eq!(msg.pack_payload().unwrap(), vec![5, 0x7c, 0xdd, 0, 0]);
    }

    #[test]
    fn test_light_state_layout() {
        let msg = Message::LightState {
            color: HSBK {
                hue: 1,
                saturation: 2,
                brightness: 3,
                kelvin: 4,
            },
            reserved: 0,
            power: 65535,
            label: Label::new("Lamp"),
            tags: [9; 8],
        };
        let payload = msg.pack_payload().unwrap();
        assert_eq!(payload.len(), 52);
        assert_eq!(&payload[10..12], &[0xff, 0xff]);
        assert_eq!(&payload[12..16], b"Lamp");
        assert_eq!(&payload[44..], &[9; 8]);
    }
}
