//! Lookup tables shared by every synthesis kernel.
//!
//! Built once per engine: chip waves stretched to a common length and
//! centered, a sine table with a guard sample for interpolation, and the
//! noise tables the drum channels read from.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::{CHIP_WAVES, NOISE_WAVES, NOISE_WAVE_LENGTH};

pub const CHIP_WAVE_LENGTH: usize = 64;
pub const SINE_LENGTH: usize = 256;

/// Fixed so every render of a song produces the same noise.
const NOISE_SEED: u64 = 0x6368_6970_626f_78;

#[derive(Debug, Clone)]
pub struct SynthTables {
    pub chip_waves: Vec<[f64; CHIP_WAVE_LENGTH]>,
    /// One full cycle plus a copy of the first sample.
    pub sine: Vec<f64>,
    pub noise_waves: Vec<Vec<f64>>,
}

impl Default for SynthTables {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthTables {
    pub fn new() -> Self {
        let chip_waves = CHIP_WAVES.iter().map(|w| expand_chip_wave(w.samples)).collect();
        let sine = (0..=SINE_LENGTH)
            .map(|i| (TAU * i as f64 / SINE_LENGTH as f64).sin())
            .collect();

        let mut rng = StdRng::seed_from_u64(NOISE_SEED);
        let noise_waves = NOISE_WAVES
            .iter()
            .map(|w| match w.name {
                "white" => white_noise(&mut rng),
                "clang" => lfsr_noise(2 << 14),
                "buzz" => lfsr_noise(10 << 2),
                "hollow" => hollow_noise(&mut rng),
                _ => lfsr_noise(1 << 14),
            })
            .collect();

        SynthTables { chip_waves, sine, noise_waves }
    }

    /// Interpolated sine of a phase measured in cycles.
    #[inline]
    pub fn sine_at(&self, phase: f64) -> f64 {
        let pos = (phase - phase.floor()) * SINE_LENGTH as f64;
        let index = (pos as usize).min(SINE_LENGTH - 1);
        let frac = pos - index as f64;
        let a = self.sine[index];
        a + (self.sine[index + 1] - a) * frac
    }
}

#[inline]
pub fn chip_sample(wave: &[f64; CHIP_WAVE_LENGTH], phase: f64) -> f64 {
    wave[(phase * CHIP_WAVE_LENGTH as f64) as usize & (CHIP_WAVE_LENGTH - 1)]
}

#[inline]
pub fn noise_sample(wave: &[f64], phase: f64) -> f64 {
    wave[(phase * NOISE_WAVE_LENGTH as f64) as usize & (NOISE_WAVE_LENGTH - 1)]
}

/// PolyBLEP residual for a discontinuity at phase 0.
#[inline]
pub fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// Repeat each sample so every wave has the same length, then remove DC.
fn expand_chip_wave(samples: &[f64]) -> [f64; CHIP_WAVE_LENGTH] {
    let mut wave = [0.0; CHIP_WAVE_LENGTH];
    let stride = CHIP_WAVE_LENGTH / samples.len().max(1);
    for (i, slot) in wave.iter_mut().enumerate() {
        *slot = samples[(i / stride).min(samples.len() - 1)];
    }
    let mean = wave.iter().sum::<f64>() / CHIP_WAVE_LENGTH as f64;
    for slot in &mut wave {
        *slot -= mean;
    }
    wave
}

/// Linear-feedback shift register noise; `feedback` is the value injected
/// when the two low bits differ.
fn lfsr_noise(feedback: u32) -> Vec<f64> {
    let mut register: u32 = 1;
    (0..NOISE_WAVE_LENGTH)
        .map(|_| {
            let out = if register & 1 == 1 { 1.0 } else { -1.0 };
            let mut next = register >> 1;
            if (register + next) & 1 == 1 {
                next += feedback;
            }
            register = next;
            out
        })
        .collect()
}

fn white_noise(rng: &mut StdRng) -> Vec<f64> {
    (0..NOISE_WAVE_LENGTH).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Band-limited noise designed in the frequency domain.
fn hollow_noise(rng: &mut StdRng) -> Vec<f64> {
    let mut spectrum = vec![Complex::new(0.0, 0.0); NOISE_WAVE_LENGTH];
    draw_noise_spectrum(&mut spectrum, rng, 10, 11, 1.0, 1.0);
    draw_noise_spectrum(&mut spectrum, rng, 11, 14, -2.0, -2.0);

    let fft = FftPlanner::<f64>::new().plan_fft_inverse(NOISE_WAVE_LENGTH);
    fft.process(&mut spectrum);

    let mut wave: Vec<f64> = spectrum.iter().map(|c| c.re).collect();
    let peak = wave.iter().fold(0.0f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for s in &mut wave {
            *s /= peak;
        }
    }
    wave
}

/// Fill bins between two octaves with random phases, interpolating the
/// log-amplitude from `low_power` to `high_power`.
fn draw_noise_spectrum(
    spectrum: &mut [Complex<f64>],
    rng: &mut StdRng,
    low_octave: u32,
    high_octave: u32,
    low_power: f64,
    high_power: f64,
) {
    let len = spectrum.len();
    let low = 1usize << low_octave;
    let high = (1usize << high_octave).min(len / 2);
    for bin in low..high {
        let progress = ((bin as f64).log2() - low_octave as f64) / (high_octave - low_octave) as f64;
        let power = low_power + (high_power - low_power) * progress;
        let amplitude = 2f64.powf(power) * rng.gen_range(0.5..1.0);
        let value = Complex::from_polar(amplitude, rng.gen_range(0.0..TAU));
        spectrum[bin] = value;
        spectrum[len - bin] = value.conj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn chip_waves_are_centered() {
        let tables = SynthTables::new();
        assert_eq!(tables.chip_waves.len(), CHIP_WAVES.len());
        for (wave, spec) in tables.chip_waves.iter().zip(CHIP_WAVES) {
            let mean = wave.iter().sum::<f64>() / CHIP_WAVE_LENGTH as f64;
            assert!(mean.abs() < 1e-9, "{} has DC offset {mean}", spec.name);
        }
    }

    #[test]
    fn square_wave_is_stretched() {
        let tables = SynthTables::new();
        let square = &tables.chip_waves[1];
        assert_relative_eq!(square[0], 1.0);
        assert_relative_eq!(square[31], 1.0);
        assert_relative_eq!(square[32], -1.0);
        assert_relative_eq!(chip_sample(square, 0.75), -1.0);
    }

    #[test]
    fn sine_interpolates() {
        let tables = SynthTables::new();
        assert_eq!(tables.sine.len(), SINE_LENGTH + 1);
        assert_relative_eq!(tables.sine_at(0.25), 1.0, epsilon = 1e-9);
        assert_relative_eq!(tables.sine_at(1.75), -1.0, epsilon = 1e-9);
        assert_relative_eq!(tables.sine_at(0.1), (TAU * 0.1).sin(), epsilon = 1e-3);
        assert!(tables.sine_at(-1e-20).abs() < 1e-3);
    }

    #[test]
    fn noise_tables_are_bounded_and_repeatable() {
        let a = SynthTables::new();
        let b = SynthTables::new();
        assert_eq!(a.noise_waves.len(), NOISE_WAVES.len());
        for (wave, spec) in a.noise_waves.iter().zip(NOISE_WAVES) {
            assert_eq!(wave.len(), NOISE_WAVE_LENGTH);
            assert!(wave.iter().all(|s| s.abs() <= 1.0), "{} exceeds unity", spec.name);
            assert!(wave.iter().any(|&s| s != wave[0]), "{} is constant", spec.name);
        }
        assert_eq!(a.noise_waves, b.noise_waves);
    }

    #[test]
    fn poly_blep_is_local() {
        assert_eq!(poly_blep(0.5, 0.01), 0.0);
        assert_relative_eq!(poly_blep(0.0, 0.01), -1.0);
        assert!(poly_blep(0.995, 0.01) > 0.0);
    }
}
