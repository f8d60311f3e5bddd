//! The `lifx-emu.toml` configuration file.
//!
//! Every setting has a default, so the emulator runs without a config file at all.
//!
//! ```toml
//! label = "Desk Lamp"
//! mac = "d0:73:d5:00:00:01"
//! light = "dual"
//!
//! [location]
//! name = "Home"
//! guid = "5c0e412a-937d-4f10-b261-0c8e3f55d491"
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lifx_emu_core::{DeviceDefaults, Guid, Label, Membership, LIFX_PORT};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    /// One light that does both colors and whites
    Combined,
    /// A white light and a separate color light
    Dual,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipConfig {
    pub name: String,
    pub guid: String,
    /// Nanoseconds since the epoch.  Zero or absent means startup time.
    #[serde(default)]
    pub updated_at: u64,
}

impl From<&Membership> for MembershipConfig {
    fn from(m: &Membership) -> MembershipConfig {
        MembershipConfig {
            name: m.label.to_string(),
            guid: m.guid.to_string(),
            updated_at: m.updated_at,
        }
    }
}

impl MembershipConfig {
    fn to_membership(&self, what: &str, now_ns: u64) -> Result<Membership> {
        let guid = Guid::parse(&self.guid).with_context(|| format!("invalid {} guid", what))?;
        let updated_at = if self.updated_at == 0 {
            now_ns
        } else {
            self.updated_at
        };
        Ok(Membership::new(guid, &self.name, updated_at))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address to listen on
    pub bind: IpAddr,
    pub port: u16,
    /// MAC address reported to clients, as six colon separated hex octets
    pub mac: String,
    /// Signal strength reported to clients, in dBm
    pub rssi: i32,
    pub label: String,
    pub location: MembershipConfig,
    pub group: MembershipConfig,
    pub light: LightMode,
    /// Where labels, locations and groups set from an app are kept
    pub state_file: PathBuf,
    /// How often running waveforms are advanced, in milliseconds
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Config {
        let defaults = DeviceDefaults::default();
        Config {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: LIFX_PORT,
            mac: "d0:73:d5:00:00:01".to_string(),
            rssi: -40,
            label: defaults.label.to_string(),
            location: (&defaults.location).into(),
            group: (&defaults.group).into(),
            light: LightMode::Combined,
            state_file: PathBuf::from("lifx-emu-state.json"),
            tick_ms: 50,
        }
    }
}

impl Config {
    /// Reads the config file, or returns the defaults if there is none.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("unable to read {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    fn validate(&self) -> Result<()> {
        self.mac_bytes()?;
        if self.tick_ms == 0 {
            bail!("tick_ms must be at least 1");
        }
        Ok(())
    }

    pub fn mac_bytes(&self) -> Result<[u8; 6]> {
        parse_mac(&self.mac)
    }

    /// The device defaults described by this config.  `now_ns` stamps any location or group
    /// whose `updated_at` is zero.
    pub fn device_defaults(&self, now_ns: u64) -> Result<DeviceDefaults> {
        Ok(DeviceDefaults {
            label: Label::new(&self.label),
            location: self.location.to_membership("location", now_ns)?,
            group: self.group.to_membership("group", now_ns)?,
            ..DeviceDefaults::default()
        })
    }
}

fn parse_mac(s: &str) -> Result<[u8; 6]> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        bail!("MAC address {:?} must have six octets", s);
    }
    let mut mac = [0; 6];
    for (byte, part) in mac.iter_mut().zip(parts) {
        if part.len() != 2 {
            bail!("MAC address {:?} has a bad octet {:?}", s, part);
        }
        *byte = u8::from_str_radix(part, 16)
            .with_context(|| format!("MAC address {:?} has a bad octet {:?}", s, part))?;
    }
    Ok(mac)
}
