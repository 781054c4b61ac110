//! Per-channel synthesis state carried from tick to tick.
//!
//! The resolver writes start values and per-sample deltas here once per
//! tick; the kernels read and advance them sample by sample.

use std::f64::consts::TAU;

use crate::config::{EFFECT_PERIOD_SECONDS, OPERATOR_COUNT};

use super::filter::OnePole;

/// Sine oscillator driving vibrato and tremolo, as a two-term resonator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectLfo {
    y: f64,
    y_prev: f64,
    mult: f64,
}

impl EffectLfo {
    pub fn new(sample_rate: f64) -> Self {
        let omega = TAU / (EFFECT_PERIOD_SECONDS * sample_rate.max(1.0));
        EffectLfo { y: 0.0, y_prev: -omega.sin(), mult: 2.0 * omega.cos() }
    }

    #[inline]
    pub fn next(&mut self) -> f64 {
        let y = self.mult * self.y - self.y_prev;
        self.y_prev = self.y;
        self.y = y;
        y
    }
}

#[derive(Debug, Clone)]
pub struct SynthChannel {
    /// Phases in cycles. Chip and PWM use slots 0 and 1, FM one per operator.
    pub phases: [f64; OPERATOR_COUNT],
    pub phase_deltas: [f64; OPERATOR_COUNT],
    /// Applied to every phase delta once per sample to glide the pitch.
    pub phase_delta_scale: f64,
    pub volume: f64,
    pub volume_delta: f64,
    /// Gain of the second oscillator, including chorus polarity.
    pub secondary_gain: f64,
    pub filter: OnePole,
    pub filter_coefficient: f64,
    pub filter_scale: f64,
    pub vibrato_scale: f64,
    pub tremolo_scale: f64,
    pub lfo: EffectLfo,
    pub expressions: [f64; OPERATOR_COUNT],
    pub expression_deltas: [f64; OPERATOR_COUNT],
    /// Previous sample of each operator, read by feedback routes.
    pub operator_outputs: [f64; OPERATOR_COUNT],
    pub feedback: f64,
    pub feedback_delta: f64,
    pub pulse_width: f64,
    pub pulse_width_delta: f64,
    /// Chip or noise wave index.
    pub wave: usize,
    pub pan_left: f64,
    pub pan_right: f64,
    /// (bar, start part) of the note currently sounding.
    pub active_note: Option<(usize, i32)>,
    sample_rate: f64,
}

impl SynthChannel {
    pub fn new(sample_rate: f64) -> Self {
        SynthChannel {
            phases: [0.0; OPERATOR_COUNT],
            phase_deltas: [0.0; OPERATOR_COUNT],
            phase_delta_scale: 1.0,
            volume: 0.0,
            volume_delta: 0.0,
            secondary_gain: 0.0,
            filter: OnePole::new(),
            filter_coefficient: 1.0,
            filter_scale: 1.0,
            vibrato_scale: 0.0,
            tremolo_scale: 0.0,
            lfo: EffectLfo::new(sample_rate),
            expressions: [0.0; OPERATOR_COUNT],
            expression_deltas: [0.0; OPERATOR_COUNT],
            operator_outputs: [0.0; OPERATOR_COUNT],
            feedback: 0.0,
            feedback_delta: 0.0,
            pulse_width: 0.5,
            pulse_width_delta: 0.0,
            wave: 0,
            pan_left: 1.0,
            pan_right: 1.0,
            active_note: None,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Mute the channel for the coming tick, keeping phases.
    pub fn silence(&mut self) {
        self.volume = 0.0;
        self.volume_delta = 0.0;
        self.phase_deltas = [0.0; OPERATOR_COUNT];
        self.phase_delta_scale = 1.0;
        self.expressions = [0.0; OPERATOR_COUNT];
        self.expression_deltas = [0.0; OPERATOR_COUNT];
        self.feedback = 0.0;
        self.feedback_delta = 0.0;
        self.vibrato_scale = 0.0;
        self.tremolo_scale = 0.0;
        self.active_note = None;
    }

    /// Restart oscillators for a new note.
    pub fn reset_phases(&mut self) {
        self.phases = [0.0; OPERATOR_COUNT];
        self.operator_outputs = [0.0; OPERATOR_COUNT];
        self.filter.reset();
        self.lfo = EffectLfo::new(self.sample_rate);
    }

    /// Drop everything, as if the channel had never played.
    pub fn reset(&mut self) {
        *self = SynthChannel::new(self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lfo_is_a_sine() {
        let sample_rate = 1000.0;
        let mut lfo = EffectLfo::new(sample_rate);
        let omega = TAU / (EFFECT_PERIOD_SECONDS * sample_rate);
        for n in 1..500 {
            assert_relative_eq!(lfo.next(), (omega * n as f64).sin(), epsilon = 1e-9);
        }
    }

    #[test]
    fn silence_keeps_phase() {
        let mut ch = SynthChannel::new(44100.0);
        ch.phases[0] = 0.3;
        ch.volume = 0.5;
        ch.active_note = Some((1, 4));
        ch.silence();
        assert_eq!(ch.phases[0], 0.3);
        assert_eq!(ch.volume, 0.0);
        assert_eq!(ch.active_note, None);
        ch.reset_phases();
        assert_eq!(ch.phases[0], 0.0);
    }

    #[test]
    fn reset_keeps_sample_rate() {
        let mut ch = SynthChannel::new(22050.0);
        ch.volume = 1.0;
        ch.reset();
        assert_eq!(ch.volume, 0.0);
        assert_eq!(ch.sample_rate(), 22050.0);
    }
}
