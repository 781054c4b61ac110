//! One-pole low-pass filter used by the instrument voices and the master muff.

use std::f64::consts::TAU;

/// Smoothing coefficient for a cutoff frequency, in `(0, 1]`.
///
/// A coefficient of 1 passes the input through unchanged.
pub fn cutoff_to_coefficient(cutoff_hz: f64, sample_rate: f64) -> f64 {
    if cutoff_hz <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    (1.0 - (-TAU * cutoff_hz / sample_rate).exp()).clamp(1e-6, 1.0)
}

/// Per-sample factor applied to a coefficient so the cutoff falls by
/// `octaves_per_second`.
pub fn decay_scale(octaves_per_second: f64, sample_rate: f64) -> f64 {
    if octaves_per_second <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        2f64.powf(-octaves_per_second / sample_rate)
    }
}

/// `y += (x - y) * coefficient`
#[derive(Debug, Clone, Default)]
pub struct OnePole {
    state: f64,
}

impl OnePole {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn process(&mut self, input: f64, coefficient: f64) -> f64 {
        self.state += (input - self.state) * coefficient;
        self.state
    }

    pub fn value(&self) -> f64 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_coefficient_passes_through() {
        let mut f = OnePole::new();
        assert_eq!(f.process(0.7, 1.0), 0.7);
        assert_eq!(f.process(-0.2, 1.0), -0.2);
    }

    #[test]
    fn converges_to_dc() {
        let mut f = OnePole::new();
        let coefficient = cutoff_to_coefficient(100.0, 44100.0);
        let mut out = 0.0;
        for _ in 0..44100 {
            out = f.process(1.0, coefficient);
        }
        assert_relative_eq!(out, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn attenuates_high_frequencies() {
        let coefficient = cutoff_to_coefficient(200.0, 44100.0);
        let mut f = OnePole::new();
        let mut peak: f64 = 0.0;
        for i in 0..4410 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = f.process(x, coefficient);
            if i > 100 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05, "Nyquist should be heavily attenuated, got {peak}");
    }

    #[test]
    fn coefficient_grows_with_cutoff() {
        let low = cutoff_to_coefficient(500.0, 44100.0);
        let high = cutoff_to_coefficient(5000.0, 44100.0);
        assert!(low < high && high <= 1.0);
        assert_eq!(cutoff_to_coefficient(0.0, 44100.0), 1.0);
    }

    #[test]
    fn decay_halves_per_octave() {
        let scale = decay_scale(1.0, 1000.0);
        assert_relative_eq!(scale.powi(1000), 0.5, epsilon = 1e-9);
        assert_eq!(decay_scale(0.0, 1000.0), 1.0);
    }
}
