//! Operator, feedback and pulse-width envelopes.
//!
//! Each curve is a closed-form function of the time since the note started
//! and of the beat position, so any tick can be evaluated without history.

use std::f64::consts::TAU;

use crate::config::{EnvelopeCurve, EnvelopeSpec};

/// Position inside a note at which an envelope is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTime {
    /// Seconds since the note started.
    pub seconds: f64,
    /// Beats since the note started.
    pub beats: f64,
    /// Linear gain of the note's pins at this point.
    pub pin_volume: f64,
}

pub fn envelope_value(spec: &EnvelopeSpec, at: EnvelopeTime) -> f64 {
    let t = at.seconds.max(0.0);
    let speed = spec.speed;
    match spec.curve {
        EnvelopeCurve::Custom => at.pin_volume,
        EnvelopeCurve::Steady => 1.0,
        EnvelopeCurve::Punch => (2.0 - 10.0 * t).max(1.0),
        EnvelopeCurve::Flare => {
            let attack = 0.25 / speed.sqrt();
            if t < attack {
                t / attack
            } else {
                1.0 / (1.0 + (t - attack) * speed)
            }
        }
        EnvelopeCurve::Pluck => 1.0 / (1.0 + t * speed),
        EnvelopeCurve::Tremolo => 0.5 - 0.5 * (TAU * at.beats.max(0.0) * speed).cos(),
        EnvelopeCurve::Flute => 1.0 - 1.0 / (1.0 + t * speed),
    }
}
