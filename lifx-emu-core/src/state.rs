use crate::types::{Guid, Label, PowerLevel, HSBK};

/// A location or group the bulb belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub guid: Guid,
    pub label: Label,
    /// Nanoseconds since the epoch (magic offset included) of the last change.
    pub updated_at: u64,
}

impl Membership {
    pub fn new(guid: Guid, label: &str, updated_at: u64) -> Membership {
        Membership {
            guid,
            label: Label::new(label),
            updated_at,
        }
    }
}

/// Undocumented fields the LIFX app reads and writes.  Their contents are never interpreted,
/// only stored and echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudStub {
    pub status: u8,
    pub auth: [u8; 56],
    pub cloud_auth: [u8; 32],
    pub broker: [u8; 33],
}

impl Default for CloudStub {
    fn default() -> CloudStub {
        CloudStub {
            status: 0,
            auth: [0; 56],
            cloud_auth: [0; 32],
            broker: [0; 33],
        }
    }
}

/// Copies as much of `src` as fits into `dst`.  Bytes past the end of `src` are left alone.
pub(crate) fn copy_bounded(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

/// Values a freshly started bulb reports before anything has been changed over the network.
///
/// The label, location and group also decide whether previously saved state is still valid, see
/// [crate::PersistenceGuard].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDefaults {
    pub label: Label,
    pub location: Membership,
    pub group: Membership,
    pub color: HSBK,
    pub power: PowerLevel,
}

impl Default for DeviceDefaults {
    /// A warm white bulb, switched on.
    fn default() -> DeviceDefaults {
        DeviceDefaults {
            label: Label::new("LIFX Emulator"),
            location: Membership {
                guid: Guid([
                    0x5c, 0x0e, 0x41, 0x2a, 0x93, 0x7d, 0x4f, 0x10, 0xb2, 0x61, 0x0c, 0x8e, 0x3f,
                    0x55, 0xd4, 0x91,
                ]),
                label: Label::new("Home"),
                updated_at: 1_700_000_000_000_614_500,
            },
            group: Membership {
                guid: Guid([
                    0xe1, 0x7a, 0x06, 0x3b, 0x28, 0xc4, 0x4d, 0x9e, 0x87, 0x12, 0x5a, 0xf0, 0x6b,
                    0x3d, 0x20, 0xc7,
                ]),
                label: Label::new("Emulated"),
                updated_at: 1_700_000_000_000_614_500,
            },
            color: HSBK {
                hue: 0,
                saturation: 0,
                brightness: 65535,
                kelvin: 2700,
            },
            power: PowerLevel::Enabled,
        }
    }
}

/// Everything the emulated bulb reports about itself.
///
/// There is exactly one of these per [crate::Emulator]; it is only changed by datagram handling
/// and waveform ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub color: HSBK,
    pub power: PowerLevel,
    pub label: Label,
    pub tags: [u8; 8],
    pub tag_labels: Label,
    pub location: Membership,
    pub group: Membership,
    pub infrared: u16,
    pub cloud: CloudStub,
    /// Bytes sent since startup.  Wraps.
    pub tx_bytes: u32,
    /// Bytes received since startup, including datagrams that were dropped.  Wraps.
    ///
    /// Only what the host hands over is counted, so a datagram cut short by the host's receive
    /// buffer counts as the bytes actually read.
    pub rx_bytes: u32,
}

impl DeviceState {
    pub fn from_defaults(defaults: &DeviceDefaults) -> DeviceState {
        DeviceState {
            color: defaults.color,
            power: defaults.power,
            label: defaults.label,
            tags: [0; 8],
            tag_labels: Label::default(),
            location: defaults.location,
            group: defaults.group,
            infrared: 0,
            cloud: CloudStub::default(),
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    pub(crate) fn count_rx(&mut self, n: usize) {
        self.rx_bytes = self.rx_bytes.wrapping_add(n as u32);
    }

    pub(crate) fn count_tx(&mut self, n: usize) {
        self.tx_bytes = self.tx_bytes.wrapping_add(n as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_defaults() {
        let defaults = DeviceDefaults::default();
        let state = DeviceState::from_defaults(&defaults);
        assert_eq!(state.color.kelvin, 2700);
        assert!(state.power.is_on());
        assert_eq!(&state.label, "LIFX Emulator");
        assert_eq!(&state.location.label, "Home");
        assert_eq!(state.tags, [0; 8]);
        assert_eq!(state.cloud.broker, [0; 33]);
    }

    #[test]
    fn test_copy_bounded() {
        let mut buf = [7u8; 4];
        assert_eq!(copy_bounded(&mut buf, &[1, 2]), 2);
        assert_eq!(buf, [1, 2, 7, 7]);
        assert_eq!(copy_bounded(&mut buf, &[9; 10]), 4);
        assert_eq!(buf, [9; 4]);
    }

    #[test]
    fn test_counters_wrap() {
        let mut state = DeviceState::from_defaults(&DeviceDefaults::default());
        state.rx_bytes = u32::MAX;
        state.count_rx(2);
        assert_eq!(state.rx_bytes, 1);
        state.count_tx(36);
        assert_eq!(state.tx_bytes, 36);
    }
}
