#![no_main]
use libfuzzer_sys::fuzz_target;

use lifx_emu_core::host::{NetworkIdentity, TimeSource};
use lifx_emu_core::light::{LightActuator, LightOutput};
use lifx_emu_core::{DeviceDefaults, Emulator, MemoryStore, HEADER_SIZE, MAX_PAYLOAD_SIZE};

struct Clock;

impl TimeSource for Clock {
    fn utcnow(&self) -> u64 {
        1_700_000_000
    }
}

struct Identity;

impl NetworkIdentity for Identity {
    fn mac(&self) -> [u8; 6] {
        [0xd0, 0x73, 0xd5, 0, 0, 1]
    }
    fn rssi(&self) -> i32 {
        -40
    }
}

struct Dark;

impl LightActuator for Dark {
    fn turn_on(&mut self) {}
    fn turn_off(&mut self) {}
    fn set_rgb(&mut self, _: f32, _: f32, _: f32) {}
    fn set_color_temperature(&mut self, _: f32) {}
    fn set_brightness(&mut self, _: f32) {}
    fn set_transition_length(&mut self, _: u32) {}
    fn perform(&mut self) {}
}

fuzz_target!(|data: &[u8]| {
    let mut emulator = Emulator::new(
        &DeviceDefaults::default(),
        LightOutput::Combined(Box::new(Dark)),
        Box::new(MemoryStore::default()),
        Box::new(Clock),
        Box::new(Identity),
    );

    let replies = emulator.handle_datagram(data, 0);
    assert!(replies.len() <= 3);
    for reply in replies {
        assert!(reply.len() >= HEADER_SIZE && reply.len() <= HEADER_SIZE + MAX_PAYLOAD_SIZE);
    }

    // keep any waveform that was started moving
    for step in 1..=40 {
        emulator.tick(step * 50);
    }
});
