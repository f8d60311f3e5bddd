use std::fmt;

use uuid::Uuid;

use crate::Error;

/// Bulb color (Hue-Saturation-Brightness-Kelvin)
///
/// # Notes:
///
/// Colors are represented as Hue-Saturation-Brightness-Kelvin, or HSBK
///
/// When a light is displaying whites, saturation will be zero, hue will be ignored, and only
/// brightness and kelvin will matter.
///
/// Normal values for "kelvin" are from 2500 (warm/yellow) to 9000 (cool/blue)
///
/// When a light is displaying colors, kelvin is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct HSBK {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl HSBK {
    pub fn describe(&self, short: bool) -> String {
        match short {
            true if self.saturation == 0 => format!("{}K", self.kelvin),
            true => format!(
                "{:.0}/{:.0}",
                (self.hue as f32 / 65535.0) * 360.0,
                self.saturation as f32 / 655.35
            ),
            false if self.saturation == 0 => format!(
                "{:.0}% White ({})",
                self.brightness as f32 / 655.35,
                describe_kelvin(self.kelvin)
            ),
            false => format!(
                "{:.0}% hue: {} sat: {}",
                self.brightness as f32 / 655.35,
                self.hue,
                self.saturation
            ),
        }
    }
}

/// Describe (in english words) the color temperature as given in kelvin.
///
/// These descriptions match the values shown in the LIFX mobile app.
pub fn describe_kelvin(k: u16) -> &'static str {
    match k {
        0..=2500 => "Ultra Warm",
        2501..=2700 => "Incandescent",
        2701..=3000 => "Warm",
        3001..=3200 => "Neutral Warm",
        3201..=3500 => "Neutral",
        3501..=4000 => "Cool",
        4001..=4500 => "Cool Daylight",
        4501..=5000 => "Soft Daylight",
        5001..=5500 => "Daylight",
        5501..=6000 => "Noon Daylight",
        6001..=6500 => "Bright Daylight",
        6501..=7000 => "Cloudy Daylight",
        7001..=7500 => "Blue Daylight",
        7501..=8000 => "Blue Overcast",
        8001..=8500 => "Blue Water",
        _ => "Blue Ice",
    }
}

/// Power level of the device.  The protocol carries a u16 but only the two extremes are defined.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum PowerLevel {
    Standby = 0,
    Enabled = 65535,
}

impl PowerLevel {
    /// Any non-zero level turns the light on.
    pub fn from_level(level: u16) -> PowerLevel {
        if level > 0 {
            PowerLevel::Enabled
        } else {
            PowerLevel::Standby
        }
    }

    pub fn is_on(self) -> bool {
        self == PowerLevel::Enabled
    }
}

/// What services are advertised in a [crate::Message::StateService].
///
/// Only UDP is documented.  Real bulbs also answer discovery with service 5, and clients expect
/// to see both.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Service {
    UDP = 1,
    TCP = 2,
    UDP5 = 5,
}

/// Shape of a waveform effect.
///
/// See https://lan.developer.lifx.com/docs/waveforms
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Waveform {
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

/// A fixed 32 byte text field (labels, location and group names, tag labels).
///
/// The buffer is kept as raw bytes so whatever a client writes is handed back unchanged.  It is
/// null padded, but a label using all 32 bytes has no terminator.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Label(pub [u8; 32]);

impl Label {
    /// Constructs a new Label, truncating to 32 bytes.
    pub fn new(s: &str) -> Label {
        let mut buf = [0; 32];
        let len = s.len().min(32);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Label(buf)
    }

    /// The text up to the first null byte.
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(32);
        &self.0[..end]
    }
}

impl Default for Label {
    fn default() -> Self {
        Label([0; 32])
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Label({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

/// Wire position of each stored GUID byte.  The first three groups of a UUID go out
/// little-endian, the rest in order.
const GUID_ORDER: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// A 16 byte group or location identifier, stored in the order it is written as text
/// (`b49bed4d-77b0-...` is stored as `b4 9b ed 4d 77 b0 ...`).
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Parses any text form of a UUID: dashed, plain hex, braced or `urn:uuid:`.
    pub fn parse(s: &str) -> Result<Guid, Error> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| Error::Config(format!("invalid GUID {:?}: {}", s, e)))?;
        Ok(Guid(*uuid.as_bytes()))
    }

    /// Builds a GUID from the 16 bytes found in a packet.
    pub fn from_wire(wire: [u8; 16]) -> Guid {
        let mut stored = [0; 16];
        for (i, &b) in wire.iter().enumerate() {
            stored[GUID_ORDER[i]] = b;
        }
        Guid(stored)
    }

    /// The 16 bytes to put in a packet.
    pub fn to_wire(&self) -> [u8; 16] {
        let mut wire = [0; 16];
        for (i, slot) in wire.iter_mut().enumerate() {
            *slot = self.0[GUID_ORDER[i]];
        }
        wire
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Opaque bytes that are stored and echoed without interpretation (echo payloads and the
/// undocumented auth/cloud messages).
#[derive(Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Blob(pub Vec<u8>);

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Blob {} bytes>", self.0.len())
    }
}
