//! Master bus — the chain every mixed sample passes through on its way out.
//!
//! Order: reverb send, muff low-pass, blend, sample-rate decimation, peak
//! limiter, soft clip, master volume.

use crate::config::{reverb_amount, BLEND_RANGE, MUFFS, SAMPLE_RATE_MODES};
use crate::song::Song;

use super::filter::{cutoff_to_coefficient, OnePole};
use super::reverb::FdnReverb;

/// Seconds the limiter takes to recover one unit of gain reduction.
const LIMITER_RELEASE_SECONDS: f64 = 0.5;

/// Song-level mix settings, derived once per bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterSettings {
    pub reverb: f64,
    /// 1.0 leaves the mix unfiltered.
    pub muff_coefficient: f64,
    /// 0 keeps full stereo, 1 collapses to mono.
    pub blend: f64,
    pub decimation: usize,
    pub volume: f64,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            reverb: 0.0,
            muff_coefficient: 1.0,
            blend: 0.0,
            decimation: 1,
            volume: 1.0,
        }
    }
}

impl MasterSettings {
    pub fn for_song(song: &Song, sample_rate: f64, volume: f64) -> Self {
        let muff = MUFFS.get(song.muff).and_then(|m| m.cutoff);
        Self {
            reverb: reverb_amount(song.reverb),
            muff_coefficient: muff.map_or(1.0, |hz| cutoff_to_coefficient(hz, sample_rate)),
            blend: (song.blend.min(BLEND_RANGE - 1)) as f64 / (BLEND_RANGE - 1) as f64,
            decimation: SAMPLE_RATE_MODES.get(song.sample_rate).map_or(1, |m| m.decimation).max(1),
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MasterBus {
    mix_left: Vec<f64>,
    mix_right: Vec<f64>,
    reverb: FdnReverb,
    muff_left: OnePole,
    muff_right: OnePole,
    held: (f64, f64),
    hold_counter: usize,
    limit: f64,
    limit_decay: f64,
}

impl MasterBus {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            mix_left: Vec::new(),
            mix_right: Vec::new(),
            reverb: FdnReverb::new(),
            muff_left: OnePole::new(),
            muff_right: OnePole::new(),
            held: (0.0, 0.0),
            hold_counter: 0,
            limit: 1.0,
            limit_decay: 1.0 / (LIMITER_RELEASE_SECONDS * sample_rate.max(1.0)),
        }
    }

    /// Zeroed mix buffers of `len` samples for the channels to add into.
    pub fn begin(&mut self, len: usize) -> (&mut [f64], &mut [f64]) {
        self.mix_left.clear();
        self.mix_left.resize(len, 0.0);
        self.mix_right.clear();
        self.mix_right.resize(len, 0.0);
        (&mut self.mix_left[..], &mut self.mix_right[..])
    }

    /// Run the mix buffers through the chain into the output slices.
    pub fn finish(&mut self, settings: &MasterSettings, left: &mut [f32], right: &mut [f32]) {
        let len = self.mix_left.len().min(left.len()).min(right.len());
        for i in 0..len {
            let (l, r) = self.process(self.mix_left[i], self.mix_right[i], settings);
            left[i] = l as f32;
            right[i] = r as f32;
        }
    }

    #[inline]
    pub fn process(&mut self, mut l: f64, mut r: f64, settings: &MasterSettings) -> (f64, f64) {
        if settings.reverb > 0.0 {
            let (wet_l, wet_r) = self.reverb.process((l + r) * 0.5, settings.reverb);
            l += wet_l;
            r += wet_r;
        }

        l = self.muff_left.process(l, settings.muff_coefficient);
        r = self.muff_right.process(r, settings.muff_coefficient);

        let mid = (l + r) * 0.5;
        let keep = 1.0 - settings.blend;
        l = l * keep + mid * settings.blend;
        r = r * keep + mid * settings.blend;

        if self.hold_counter == 0 {
            self.held = (l, r);
            self.hold_counter = settings.decimation;
        }
        self.hold_counter -= 1;
        let (l, r) = self.held;

        let peak = l.abs().max(r.abs());
        self.limit = (self.limit - self.limit_decay).max(peak).max(1.0);
        let gain = 1.0 / self.limit;

        (
            soft_clip(l * gain) * settings.volume,
            soft_clip(r * gain) * settings.volume,
        )
    }

    /// Drop reverb tails and limiter memory.
    pub fn reset(&mut self) {
        self.reverb.clear();
        self.muff_left.reset();
        self.muff_right.reset();
        self.held = (0.0, 0.0);
        self.hold_counter = 0;
        self.limit = 1.0;
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
#[inline]
pub fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(bus: &mut MasterBus, settings: &MasterSettings, input: &[(f64, f64)]) -> Vec<(f32, f32)> {
        let (l, r) = bus.begin(input.len());
        for (i, &(a, b)) in input.iter().enumerate() {
            l[i] = a;
            r[i] = b;
        }
        let mut out_l = vec![0.0f32; input.len()];
        let mut out_r = vec![0.0f32; input.len()];
        bus.finish(settings, &mut out_l, &mut out_r);
        out_l.into_iter().zip(out_r).collect()
    }

    #[test]
    fn empty_buffer() {
        let mut bus = MasterBus::new(44100.0);
        let out = run(&mut bus, &MasterSettings::default(), &[(0.0, 0.0); 128]);
        assert_eq!(out.len(), 128);
        assert!(out.iter().all(|&(l, r)| l == 0.0 && r == 0.0));
    }

    #[test]
    fn quiet_signal_passes_nearly_unchanged() {
        let mut bus = MasterBus::new(44100.0);
        let out = run(&mut bus, &MasterSettings::default(), &[(0.1, -0.05)]);
        assert!((out[0].0 as f64 - soft_clip(0.1)).abs() < 1e-6);
        assert!((out[0].1 as f64 - soft_clip(-0.05)).abs() < 1e-6);
    }

    #[test]
    fn limiter_and_clip_keep_output_below_one() {
        let mut bus = MasterBus::new(44100.0);
        let loud: Vec<(f64, f64)> = (0..1000).map(|i| if i % 2 == 0 { (40.0, -25.0) } else { (-3.0, 90.0) }).collect();
        for (l, r) in run(&mut bus, &MasterSettings::default(), &loud) {
            assert!(l.abs() < 1.0 && r.abs() < 1.0, "Output should stay below 1.0, got {l}, {r}");
        }
    }

    #[test]
    fn full_blend_is_mono() {
        let mut bus = MasterBus::new(44100.0);
        let settings = MasterSettings { blend: 1.0, ..MasterSettings::default() };
        let out = run(&mut bus, &settings, &[(0.4, -0.2), (0.0, 0.3)]);
        for (l, r) in out {
            assert_eq!(l, r);
        }
    }

    #[test]
    fn decimation_holds_samples() {
        let mut bus = MasterBus::new(44100.0);
        let settings = MasterSettings { decimation: 4, ..MasterSettings::default() };
        let input: Vec<(f64, f64)> = (0..8).map(|i| (i as f64 * 0.01, 0.0)).collect();
        let out = run(&mut bus, &settings, &input);
        assert_eq!(out[0], out[3]);
        assert_eq!(out[4], out[7]);
        assert_ne!(out[3], out[4]);
    }

    #[test]
    fn volume_scales_output() {
        let mut bus = MasterBus::new(44100.0);
        let settings = MasterSettings { volume: 0.5, ..MasterSettings::default() };
        let out = run(&mut bus, &settings, &[(0.2, 0.2)]);
        assert!((out[0].0 as f64 - soft_clip(0.2) * 0.5).abs() < 1e-6);
    }

    #[test]
    fn settings_follow_the_song() {
        let mut song = Song::new();
        song.reverb = 0;
        song.muff = 0;
        song.blend = BLEND_RANGE - 1;
        song.sample_rate = 2;
        let s = MasterSettings::for_song(&song, 44100.0, 3.0);
        assert_eq!(s.reverb, 0.0);
        assert_eq!(s.muff_coefficient, 1.0);
        assert_eq!(s.blend, 1.0);
        assert_eq!(s.decimation, 4);
        assert_eq!(s.volume, 1.0);

        song.muff = 3;
        let muffled = MasterSettings::for_song(&song, 44100.0, 1.0);
        assert!(muffled.muff_coefficient < 1.0);
    }
}
