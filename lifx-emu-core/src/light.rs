//! Driving the real light behind the emulated bulb.

use tracing::debug;

use crate::types::{PowerLevel, HSBK};
use crate::Error;

/// One controllable light.
///
/// Calls between a `turn_on`/`turn_off` and the following `perform` build up a single change,
/// which `perform` then applies.  Implementations report their own failures; nothing is returned
/// to the emulator.
pub trait LightActuator {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
    /// Each channel in `0.0..=1.0`.
    fn set_rgb(&mut self, red: f32, green: f32, blue: f32);
    fn set_color_temperature(&mut self, mireds: f32);
    /// `0.0..=1.0`
    fn set_brightness(&mut self, brightness: f32);
    fn set_transition_length(&mut self, millis: u32);
    fn perform(&mut self);
}

/// How the emulated bulb's color reaches the hardware.
pub enum LightOutput {
    /// A single light that can show both colors and whites.
    Combined(Box<dyn LightActuator>),
    /// A white-only light and a color-only light, with one of them off at any time.
    Dual {
        white: Box<dyn LightActuator>,
        color: Box<dyn LightActuator>,
    },
}

impl std::fmt::Debug for LightOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LightOutput::Combined(_) => write!(f, "LightOutput::Combined"),
            LightOutput::Dual { .. } => write!(f, "LightOutput::Dual"),
        }
    }
}

impl LightOutput {
    /// Picks the output mode from whichever lights were supplied.
    ///
    /// Either a combined light on its own, or both a white and a color light.  Anything else is a
    /// configuration error.
    pub fn from_parts(
        combined: Option<Box<dyn LightActuator>>,
        white: Option<Box<dyn LightActuator>>,
        color: Option<Box<dyn LightActuator>>,
    ) -> Result<LightOutput, Error> {
        match (combined, white, color) {
            (Some(c), None, None) => Ok(LightOutput::Combined(c)),
            (None, Some(white), Some(color)) => Ok(LightOutput::Dual { white, color }),
            (Some(_), _, _) => Err(Error::Config(
                "a combined light cannot be used together with separate white or color lights"
                    .to_string(),
            )),
            (None, None, None) => Err(Error::Config("no light configured".to_string())),
            (None, _, _) => Err(Error::Config(
                "separate lights need both a white and a color light".to_string(),
            )),
        }
    }

    /// Shows `color` on the hardware, or switches it off when the bulb is powered down or at zero
    /// brightness.
    pub fn apply(&mut self, color: HSBK, power: PowerLevel, transition_ms: u32) {
        debug!(
            "Set light: {} ({}), power {:?}, transition {}ms",
            color.describe(false),
            color.describe(true),
            power,
            transition_ms
        );

        let lit = power.is_on() && color.brightness > 0;
        match self {
            LightOutput::Combined(light) => {
                if !lit {
                    switch_off(light.as_mut(), transition_ms);
                    return;
                }
                light.turn_on();
                if color.saturation == 0 {
                    light.set_color_temperature(mireds(color.kelvin));
                } else {
                    let (r, g, b) = rgb(color);
                    light.set_rgb(r, g, b);
                }
                light.set_brightness(brightness(color));
                light.set_transition_length(transition_ms);
                light.perform();
            }
            LightOutput::Dual {
                white,
                color: colored,
            } => {
                if !lit {
                    switch_off(colored.as_mut(), transition_ms);
                    switch_off(white.as_mut(), transition_ms);
                    return;
                }
                if color.saturation == 0 {
                    colored.turn_off();
                    colored.perform();

                    white.turn_on();
                    white.set_color_temperature(mireds(color.kelvin));
                    white.set_brightness(brightness(color));
                    white.set_transition_length(transition_ms);
                    white.perform();
                } else {
                    white.turn_off();
                    colored.turn_on();
                    let (r, g, b) = rgb(color);
                    colored.set_rgb(r, g, b);
                    colored.set_brightness(brightness(color));
                    colored.set_transition_length(transition_ms);
                    white.perform();
                    colored.perform();
                }
            }
        }
    }
}

fn switch_off(light: &mut dyn LightActuator, transition_ms: u32) {
    light.turn_off();
    light.set_brightness(0.0);
    light.set_transition_length(transition_ms);
    light.perform();
}

fn brightness(color: HSBK) -> f32 {
    color.brightness as f32 / 65535.0
}

fn mireds(kelvin: u16) -> f32 {
    (1_000_000 / kelvin.max(1) as u32) as f32
}

fn rgb(color: HSBK) -> (f32, f32, f32) {
    let index = (color.hue as u32 * 767 / 65535) as u16;
    let sat = (color.saturation as u32 * 255 / 65535) as u8;
    let bri = (color.brightness as u32 * 255 / 65535) as u8;
    let [r, g, b] = hsb_to_rgb(index, sat, bri);
    (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Integer color wheel: `index` runs around the wheel in 768 steps (red, green, blue), `sat` and
/// `bright` are `0..=255`.
pub fn hsb_to_rgb(index: u16, sat: u8, bright: u8) -> [u8; 3] {
    let index = index % 768;
    let index_mod = index % 256;
    let inverse_sat = (sat ^ 255) as u16;

    let (r, g, b) = match index {
        0..=255 => (index_mod ^ 255, index_mod, 0),
        256..=511 => (0, index_mod ^ 255, index_mod),
        _ => (index_mod, 0, index_mod ^ 255),
    };

    let scale = |c: u16| -> u8 {
        let c = (c * sat as u16) / 255 + inverse_sat;
        ((c * bright as u16) / 255) as u8
    };
    [scale(r), scale(g), scale(b)]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every call as a short string.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingLight {
        pub name: &'static str,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingLight {
        pub fn new(name: &'static str, calls: &Arc<Mutex<Vec<String>>>) -> RecordingLight {
            RecordingLight {
                name,
                calls: calls.clone(),
            }
        }

        fn push(&self, s: String) {
            self.calls.lock().unwrap().push(format!("{}.{}", self.name, s));
        }
    }

    impl LightActuator for RecordingLight {
        fn turn_on(&mut self) {
            self.push("on".into())
        }
        fn turn_off(&mut self) {
            self.push("off".into())
        }
        fn set_rgb(&mut self, red: f32, green: f32, blue: f32) {
            self.push(format!("rgb({:.2},{:.2},{:.2})", red, green, blue))
        }
        fn set_color_temperature(&mut self, mireds: f32) {
            self.push(format!("ct({})", mireds))
        }
        fn set_brightness(&mut self, brightness: f32) {
            self.push(format!("bri({:.2})", brightness))
        }
        fn set_transition_length(&mut self, millis: u32) {
            self.push(format!("tr({})", millis))
        }
        fn perform(&mut self) {
            self.push("perform".into())
        }
    }

    const WARM: HSBK = HSBK {
        hue: 0,
        saturation: 0,
        brightness: 65535,
        kelvin: 2700,
    };

    const RED_HALF: HSBK = HSBK {
        hue: 0,
        saturation: 65535,
        brightness: 32768,
        kelvin: 3500,
    };

    fn calls(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().drain(..).collect()
    }

    #[test]
    fn test_hsb_to_rgb() {
        assert_eq!(hsb_to_rgb(0, 255, 255), [255, 0, 0]);
        assert_eq!(hsb_to_rgb(256, 255, 255), [0, 255, 0]);
        assert_eq!(hsb_to_rgb(512, 255, 255), [0, 0, 255]);
        assert_eq!(hsb_to_rgb(128, 255, 255), [127, 128, 0]);
        // no saturation is white
        assert_eq!(hsb_to_rgb(300, 0, 255), [255, 255, 255]);
        assert_eq!(hsb_to_rgb(0, 255, 0), [0, 0, 0]);
        // wraps
        assert_eq!(hsb_to_rgb(768, 255, 255), [255, 0, 0]);
    }

    #[test]
    fn test_mode_selection() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let light = |n| -> Option<Box<dyn LightActuator>> {
            Some(Box::new(RecordingLight::new(n, &log)))
        };

        assert!(matches!(
            LightOutput::from_parts(light("rgbww"), None, None),
            Ok(LightOutput::Combined(_))
        ));
        assert!(matches!(
            LightOutput::from_parts(None, light("w"), light("c")),
            Ok(LightOutput::Dual { .. })
        ));
        assert!(matches!(
            LightOutput::from_parts(light("rgbww"), light("w"), light("c")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LightOutput::from_parts(None, light("w"), None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LightOutput::from_parts(None, None, None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_combined_white_and_color() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut out = LightOutput::Combined(Box::new(RecordingLight::new("rgbww", &log)));

        out.apply(WARM, PowerLevel::Enabled, 250);
        assert_eq!(
            calls(&log),
            vec![
                "rgbww.on",
                "rgbww.ct(370)",
                "rgbww.bri(1.00)",
                "rgbww.tr(250)",
                "rgbww.perform"
            ]
        );

        out.apply(RED_HALF, PowerLevel::Enabled, 0);
        assert_eq!(
            calls(&log),
            vec![
                "rgbww.on",
                "rgbww.rgb(0.50,0.00,0.00)",
                "rgbww.bri(0.50)",
                "rgbww.tr(0)",
                "rgbww.perform"
            ]
        );
    }

    #[test]
    fn test_off_when_powered_down_or_dark() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut out = LightOutput::Combined(Box::new(RecordingLight::new("rgbww", &log)));

        out.apply(WARM, PowerLevel::Standby, 1000);
        assert_eq!(
            calls(&log),
            vec!["rgbww.off", "rgbww.bri(0.00)", "rgbww.tr(1000)", "rgbww.perform"]
        );

        let dark = HSBK {
            brightness: 0,
            ..WARM
        };
        out.apply(dark, PowerLevel::Enabled, 0);
        assert_eq!(calls(&log)[0], "rgbww.off");
    }

    #[test]
    fn test_dual() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut out = LightOutput::Dual {
            white: Box::new(RecordingLight::new("w", &log)),
            color: Box::new(RecordingLight::new("c", &log)),
        };

        out.apply(WARM, PowerLevel::Enabled, 100);
        assert_eq!(
            calls(&log),
            vec![
                "c.off",
                "c.perform",
                "w.on",
                "w.ct(370)",
                "w.bri(1.00)",
                "w.tr(100)",
                "w.perform"
            ]
        );

        out.apply(RED_HALF, PowerLevel::Enabled, 100);
        assert_eq!(
            calls(&log),
            vec![
                "w.off",
                "c.on",
                "c.rgb(0.50,0.00,0.00)",
                "c.bri(0.50)",
                "c.tr(100)",
                "w.perform",
                "c.perform"
            ]
        );

        out.apply(RED_HALF, PowerLevel::Standby, 100);
        assert_eq!(
            calls(&log),
            vec![
                "c.off",
                "c.bri(0.00)",
                "c.tr(100)",
                "c.perform",
                "w.off",
                "w.bri(0.00)",
                "w.tr(100)",
                "w.perform"
            ]
        );
    }
}
