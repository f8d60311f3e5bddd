//! Software waveform effects.
//!
//! A waveform moves the light back and forth between the color it had when the effect started
//! (the origin) and a target color.  The shape decides how far along the way the light is at each
//! point of a period.  See https://lan.developer.lifx.com/docs/waveforms
//!
//! Time is passed in by the caller as monotonic milliseconds, which keeps the engine free of any
//! clock and lets tests step through an effect exactly.

use std::f32::consts::PI;

use tracing::debug;

use crate::types::{Waveform, HSBK};

/// Recomputations closer together than this are skipped.
const MIN_UPDATE_INTERVAL_MS: u64 = 50;

/// The parameters of a SetWaveform or SetWaveformOptional request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformParams {
    /// Return to the origin color when the effect finishes, instead of staying on the target.
    pub transient: bool,
    pub color: HSBK,
    /// Length of one cycle in milliseconds.  Zero applies the target at once.
    pub period: u32,
    /// Number of cycles to run.  Anything that is not a positive number runs forever.
    pub cycles: f32,
    pub skew_ratio: i16,
    pub waveform: Waveform,
    pub set_hue: bool,
    pub set_saturation: bool,
    pub set_brightness: bool,
    pub set_kelvin: bool,
}

impl WaveformParams {
    /// Parameters of a plain SetWaveform, which animates every component.
    pub fn all(
        transient: bool,
        color: HSBK,
        period: u32,
        cycles: f32,
        skew_ratio: i16,
        waveform: Waveform,
    ) -> WaveformParams {
        WaveformParams {
            transient,
            color,
            period,
            cycles,
            skew_ratio,
            waveform,
            set_hue: true,
            set_saturation: true,
            set_brightness: true,
            set_kelvin: true,
        }
    }

    /// The color to move toward.  Components that are not flagged keep their current value.
    pub fn target(&self, current: HSBK) -> HSBK {
        HSBK {
            hue: if self.set_hue {
                self.color.hue
            } else {
                current.hue
            },
            saturation: if self.set_saturation {
                self.color.saturation
            } else {
                current.saturation
            },
            brightness: if self.set_brightness {
                self.color.brightness
            } else {
                current.brightness
            },
            kelvin: if self.set_kelvin {
                self.color.kelvin
            } else {
                current.kelvin
            },
        }
    }

    fn is_infinite(&self) -> bool {
        // also catches NaN
        !(self.cycles > 0.0)
    }
}

#[derive(Debug, Clone)]
struct ActiveWaveform {
    params: WaveformParams,
    origin: HSBK,
    target: HSBK,
    start_ms: u64,
    last_update_ms: u64,
}

/// Runs at most one waveform at a time.
#[derive(Debug, Clone, Default)]
pub struct WaveformEngine {
    active: Option<ActiveWaveform>,
}

impl WaveformEngine {
    pub fn new() -> WaveformEngine {
        WaveformEngine { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a new effect from `color`, replacing any effect already running.
    ///
    /// A zero period writes the target into `color` straight away and leaves the engine idle.
    /// Returns true when the engine is now active.
    pub fn start(&mut self, color: &mut HSBK, params: WaveformParams, now_ms: u64) -> bool {
        let origin = *color;
        let target = params.target(origin);

        if params.period == 0 {
            debug!("Zero period waveform, applying {:?} directly", target);
            *color = target;
            self.active = None;
            return false;
        }

        debug!(
            "Starting {:?} waveform from {} to {}, period {}ms, cycles {}",
            params.waveform,
            origin.describe(true),
            target.describe(true),
            params.period,
            params.cycles
        );
        self.active = Some(ActiveWaveform {
            params,
            origin,
            target,
            start_ms: now_ms,
            last_update_ms: now_ms,
        });
        true
    }

    /// Advances the running effect.
    ///
    /// Returns true if `color` was changed and should be sent to the light.
    pub fn update(&mut self, color: &mut HSBK, now_ms: u64) -> bool {
        let wave = match &mut self.active {
            Some(w) => w,
            None => return false,
        };

        let elapsed = now_ms.saturating_sub(wave.start_ms);
        let params = wave.params;

        if !params.is_infinite() && elapsed as f64 >= params.period as f64 * params.cycles as f64
        {
            self.stop(color, params.transient);
            return true;
        }

        if now_ms.saturating_sub(wave.last_update_ms) < MIN_UPDATE_INTERVAL_MS {
            return false;
        }
        wave.last_update_ms = now_ms;

        let phase = (elapsed % params.period as u64) as f32 / params.period as f32;
        let f = shape_factor(params.waveform, phase, params.skew_ratio);
        *color = interpolate(wave.origin, wave.target, f);
        true
    }

    /// Ends the running effect, leaving `color` at the origin when `restore` is set and at the
    /// target otherwise.  Does nothing if no effect is running.
    pub fn stop(&mut self, color: &mut HSBK, restore: bool) {
        if let Some(wave) = self.active.take() {
            *color = if restore { wave.origin } else { wave.target };
            debug!("Waveform stopped, color now {}", color.describe(true));
        }
    }
}

/// How far from the origin toward the target the light should be, in `[0, 1]`, at `phase` of a
/// cycle.
fn shape_factor(waveform: Waveform, phase: f32, skew_ratio: i16) -> f32 {
    match waveform {
        Waveform::Saw => phase,
        Waveform::Sine => (1.0 - (2.0 * PI * phase).cos()) / 2.0,
        Waveform::HalfSine => (PI * phase).sin(),
        Waveform::Triangle => {
            if phase < 0.5 {
                2.0 * phase
            } else {
                2.0 - 2.0 * phase
            }
        }
        Waveform::Pulse => {
            let duty = (skew_ratio as f32 + 32768.0) / 65535.0;
            if phase < 1.0 - duty {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn lerp(a: u16, b: u16, f: f32) -> u16 {
    let v = a as f32 + (b as f32 - a as f32) * f;
    v.round().clamp(0.0, 65535.0) as u16
}

/// Hue is a circle, so it takes the short way round.
fn lerp_hue(a: u16, b: u16, f: f32) -> u16 {
    let mut delta = b as i32 - a as i32;
    if delta > 32767 {
        delta -= 65536;
    } else if delta < -32768 {
        delta += 65536;
    }
    let step = (delta as f32 * f).round() as i32;
    (a as i32 + step).rem_euclid(65536) as u16
}

fn interpolate(origin: HSBK, target: HSBK, f: f32) -> HSBK {
    HSBK {
        hue: lerp_hue(origin.hue, target.hue, f),
        saturation: lerp(origin.saturation, target.saturation, f),
        brightness: lerp(origin.brightness, target.brightness, f),
        kelvin: lerp(origin.kelvin, target.kelvin, f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: HSBK = HSBK {
        hue: 1000,
        saturation: 0,
        brightness: 10000,
        kelvin: 2700,
    };
    const B: HSBK = HSBK {
        hue: 30000,
        saturation: 65535,
        brightness: 60000,
        kelvin: 6500,
    };

    #[test]
    fn test_finite_transient_restores_origin() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(true, B, 500, 2.0, 0, Waveform::Saw);
        assert!(engine.start(&mut color, params, 10_000));

        let mut now = 10_000;
        while now < 11_000 {
            now += 50;
            engine.update(&mut color, now);
            if now < 11_000 {
                assert!(engine.is_active());
            }
        }
        assert!(!engine.is_active());
        assert_eq!(color, A);
    }

    #[test]
    fn test_finite_non_transient_ends_on_target() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(false, B, 100, 1.0, 0, Waveform::Sine);
        engine.start(&mut color, params, 0);
        assert!(engine.update(&mut color, 100));
        assert!(!engine.is_active());
        assert_eq!(color, B);
    }

    #[test]
    fn test_zero_cycles_runs_forever() {
        for cycles in [0.0, -1.0, f32::NAN] {
            let mut engine = WaveformEngine::new();
            let mut color = A;
            let params = WaveformParams::all(true, B, 100, cycles, 0, Waveform::Triangle);
            engine.start(&mut color, params, 0);
            for step in 1..=2000u64 {
                engine.update(&mut color, step * 50);
            }
            assert!(engine.is_active());
        }
    }

    #[test]
    fn test_zero_period_applies_target() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(false, B, 0, 3.0, 0, Waveform::Saw);
        assert!(!engine.start(&mut color, params, 0));
        assert!(!engine.is_active());
        assert_eq!(color, B);
    }

    #[test]
    fn test_rate_limit() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(false, B, 1000, 0.0, 0, Waveform::Saw);
        engine.start(&mut color, params, 0);
        assert!(!engine.update(&mut color, 20));
        assert_eq!(color, A);
        assert!(engine.update(&mut color, 50));
        assert_ne!(color, A);
        assert!(!engine.update(&mut color, 60));
        assert!(engine.update(&mut color, 100));
    }

    #[test]
    fn test_saw_midpoint() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(false, B, 1000, 0.0, 0, Waveform::Saw);
        engine.start(&mut color, params, 0);
        engine.update(&mut color, 500);
        assert_eq!(color.brightness, 35000);
        assert_eq!(color.kelvin, 4600);
        assert_eq!(color.hue, 15500);
    }

    #[test]
    fn test_hue_takes_short_way() {
        assert_eq!(lerp_hue(65500, 100, 0.5), 32);
        assert_eq!(lerp_hue(100, 65500, 0.5), 32);
        assert_eq!(lerp_hue(100, 65500, 1.0), 65500);
        assert_eq!(lerp_hue(0, 32768, 0.5), 49152);
    }

    #[test]
    fn test_shapes() {
        assert_eq!(shape_factor(Waveform::Saw, 0.25, 0), 0.25);
        assert!((shape_factor(Waveform::Sine, 0.5, 0) - 1.0).abs() < 1e-6);
        assert!(shape_factor(Waveform::Sine, 0.0, 0).abs() < 1e-6);
        assert!((shape_factor(Waveform::HalfSine, 0.5, 0) - 1.0).abs() < 1e-6);
        assert_eq!(shape_factor(Waveform::Triangle, 0.25, 0), 0.5);
        assert_eq!(shape_factor(Waveform::Triangle, 0.75, 0), 0.5);

        // skew 0 is very nearly a 50% duty cycle
        assert_eq!(shape_factor(Waveform::Pulse, 0.25, 0), 1.0);
        assert_eq!(shape_factor(Waveform::Pulse, 0.75, 0), 0.0);
        // fully skewed one way or the other
        assert_eq!(shape_factor(Waveform::Pulse, 0.5, i16::MIN), 1.0);
        assert_eq!(shape_factor(Waveform::Pulse, 0.01, i16::MAX), 0.0);
    }

    #[test]
    fn test_optional_components_keep_current() {
        let params = WaveformParams {
            set_hue: false,
            set_kelvin: false,
            ..WaveformParams::all(false, B, 100, 1.0, 0, Waveform::Saw)
        };
        let target = params.target(A);
        assert_eq!(target.hue, A.hue);
        assert_eq!(target.kelvin, A.kelvin);
        assert_eq!(target.saturation, B.saturation);
        assert_eq!(target.brightness, B.brightness);
    }

    #[test]
    fn test_stop_without_restore() {
        let mut engine = WaveformEngine::new();
        let mut color = A;
        let params = WaveformParams::all(true, B, 1000, 5.0, 0, Waveform::Sine);
        engine.start(&mut color, params, 0);
        engine.update(&mut color, 300);
        engine.stop(&mut color, false);
        assert!(!engine.is_active());
        assert_eq!(color, B);

        // stopping an idle engine leaves the color alone
        let mut other = A;
        engine.stop(&mut other, true);
        assert_eq!(other, A);
    }
}
