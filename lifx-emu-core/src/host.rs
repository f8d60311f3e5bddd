//! What the emulator needs to know about the machine it runs on.

/// Wall clock.
pub trait TimeSource {
    /// Seconds since the Unix epoch.
    fn utcnow(&self) -> u64;
}

/// The network interface the bulb pretends to be.
pub trait NetworkIdentity {
    /// Reported as the target of every response, and used by apps to tell bulbs apart.
    fn mac(&self) -> [u8; 6];
    /// Received signal strength in dBm.  Wired hosts can report something strong, like -40.
    fn rssi(&self) -> i32;
}

/// Signal strength in milliwatts, the unit used by StateWifiInfo and StateHostInfo.
pub fn signal_milliwatts(rssi: i32) -> f32 {
    10f32.powf(rssi as f32 / 10.0)
}
