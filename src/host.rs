//! The emulator's view of this machine: the system clock, a fixed network identity, a state
//! file, and lights that only log what they would do.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;
use lifx_emu_core::host::{NetworkIdentity, TimeSource};
use lifx_emu_core::light::LightActuator;
use lifx_emu_core::PersistentStore;
use tracing::{debug, info, warn};

pub struct SystemClock;

impl TimeSource for SystemClock {
    fn utcnow(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// MAC and signal strength taken from the config file.
pub struct StaticIdentity {
    pub mac: [u8; 6],
    pub rssi: i32,
}

impl NetworkIdentity for StaticIdentity {
    fn mac(&self) -> [u8; 6] {
        self.mac
    }

    fn rssi(&self) -> i32 {
        self.rssi
    }
}

/// Keeps saved state in a single file, replaced on every save.
pub struct FileStore {
    pub path: PathBuf,
}

impl PersistentStore for FileStore {
    fn load(&self) -> Option<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Unable to read {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, blob: &[u8]) {
        let tmp = self.path.with_extension("tmp");
        let result = fs::write(&tmp, blob).and_then(|_| fs::rename(&tmp, &self.path));
        match result {
            Ok(()) => debug!("Saved state to {}", self.path.display()),
            Err(e) => warn!("Unable to save state to {}: {}", self.path.display(), e),
        }
    }
}

/// A light that logs each change instead of driving hardware.
pub struct LogActuator {
    name: String,
    pending: String,
}

impl LogActuator {
    pub fn new(name: &str) -> LogActuator {
        LogActuator {
            name: name.to_string(),
            pending: String::new(),
        }
    }

    fn add(&mut self, args: std::fmt::Arguments) {
        if !self.pending.is_empty() {
            self.pending.push_str(", ");
        }
        let _ = self.pending.write_fmt(args);
    }
}

impl LightActuator for LogActuator {
    fn turn_on(&mut self) {
        self.add(format_args!("on"));
    }

    fn turn_off(&mut self) {
        self.add(format_args!("off"));
    }

    fn set_rgb(&mut self, red: f32, green: f32, blue: f32) {
        self.add(format_args!("rgb {:.3}/{:.3}/{:.3}", red, green, blue));
    }

    fn set_color_temperature(&mut self, mireds: f32) {
        self.add(format_args!("{} mireds", mireds));
    }

    fn set_brightness(&mut self, brightness: f32) {
        self.add(format_args!("brightness {:.0}%", brightness * 100.0));
    }

    fn set_transition_length(&mut self, millis: u32) {
        self.add(format_args!("over {}ms", millis));
    }

    fn perform(&mut self) {
        info!("[{}] {}", self.name, self.pending);
        self.pending.clear();
    }
}
