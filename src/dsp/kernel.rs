//! Specialised synthesis kernels.
//!
//! Every bar gets a fingerprint describing what each channel needs: its
//! instrument type and, for FM, the algorithm and feedback routing. A
//! [`Kernel`] built for a fingerprint holds one [`ChannelProgram`] per
//! channel, each pointing at a render loop monomorphic over its instrument
//! type. Kernels are cached by fingerprint, so a song only ever builds as
//! many as it has distinct channel layouts.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ALGORITHMS, CHIP_WAVES, FEEDBACKS, NOISE_WAVES, OPERATOR_COUNT, TICKS_PER_PART};
use crate::song::{InstrumentType, Song};

use super::mixer::{MasterBus, MasterSettings};
use super::resolver::{resolve_tick, TickContext};
use super::voice::SynthChannel;
use super::waves::{chip_sample, noise_sample, poly_blep, SynthTables};

/// Cycles of phase modulation per unit of modulator output.
const FM_MODULATION_DEPTH: f64 = 0.5;

pub type RenderFn = fn(&ChannelProgram, &mut SynthChannel, &SynthTables, &mut [f64], &mut [f64]);

/// Operator routing for one FM algorithm and feedback type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmWiring {
    pub carrier_count: usize,
    pub modulated_by: [&'static [usize]; OPERATOR_COUNT],
    pub feedback_from: [&'static [usize]; OPERATOR_COUNT],
}

impl FmWiring {
    pub fn new(algorithm: usize, feedback: usize) -> Self {
        let algorithm = &ALGORITHMS[algorithm.min(ALGORITHMS.len() - 1)];
        let feedback = &FEEDBACKS[feedback.min(FEEDBACKS.len() - 1)];
        FmWiring {
            carrier_count: algorithm.carrier_count,
            modulated_by: algorithm.modulated_by,
            feedback_from: feedback.indices,
        }
    }
}

/// What a channel needs for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelKind {
    Silent,
    Chip,
    PulseWidth,
    Noise,
    Fm { algorithm: usize, feedback: usize },
}

impl ChannelKind {
    fn of(song: &Song, channel: usize, bar: usize) -> Self {
        if song.get_pattern(channel, bar).is_none() {
            return ChannelKind::Silent;
        }
        match song.instrument_for(channel, bar) {
            None => ChannelKind::Silent,
            Some(i) if i.mute => ChannelKind::Silent,
            Some(i) => match i.instrument_type {
                InstrumentType::Chip => ChannelKind::Chip,
                InstrumentType::PulseWidth => ChannelKind::PulseWidth,
                InstrumentType::Noise => ChannelKind::Noise,
                InstrumentType::Fm => ChannelKind::Fm { algorithm: i.algorithm, feedback: i.feedback_type },
            },
        }
    }

    fn write_token(self, out: &mut String) {
        match self {
            ChannelKind::Silent => out.push('_'),
            ChannelKind::Chip => out.push('c'),
            ChannelKind::PulseWidth => out.push('w'),
            ChannelKind::Noise => out.push('n'),
            ChannelKind::Fm { algorithm, feedback } => {
                let _ = write!(out, "f{algorithm}.{feedback}");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelProgram {
    pub channel: usize,
    render: RenderFn,
    wiring: Option<FmWiring>,
}

impl ChannelProgram {
    fn new(channel: usize, kind: ChannelKind) -> Self {
        let (render, wiring): (RenderFn, _) = match kind {
            ChannelKind::Silent => (render_silent, None),
            ChannelKind::Chip => (render_chip, None),
            ChannelKind::PulseWidth => (render_pulse, None),
            ChannelKind::Noise => (render_noise, None),
            ChannelKind::Fm { algorithm, feedback } => (render_fm, Some(FmWiring::new(algorithm, feedback))),
        };
        ChannelProgram { channel, render, wiring }
    }

    pub fn wiring(&self) -> Option<&FmWiring> {
        self.wiring.as_ref()
    }
}

/// Transport position inside the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BarPosition {
    pub bar: usize,
    pub beat: usize,
    /// Part within the beat.
    pub part: usize,
    /// Tick within the part.
    pub arpeggio: usize,
    /// Samples left in the current tick. Before the tick is resolved, zero
    /// means a whole tick.
    pub countdown: usize,
    /// The current tick's parameters have been written to the channels.
    pub resolved: bool,
}

impl BarPosition {
    pub fn at_bar(bar: usize) -> Self {
        BarPosition { bar, ..Self::default() }
    }

    pub fn part_in_bar(&self, parts_per_beat: usize) -> usize {
        self.beat * parts_per_beat + self.part
    }

    /// Whole ticks elapsed since the start of the bar.
    pub fn tick_in_bar(&self, parts_per_beat: usize) -> usize {
        self.part_in_bar(parts_per_beat) * TICKS_PER_PART + self.arpeggio
    }

    /// Step to the next tick; false once the bar is exhausted.
    fn advance_tick(&mut self, parts_per_beat: usize, beats_per_bar: usize) -> bool {
        self.resolved = false;
        self.countdown = 0;
        self.arpeggio += 1;
        if self.arpeggio < TICKS_PER_PART {
            return true;
        }
        self.arpeggio = 0;
        self.part += 1;
        if self.part < parts_per_beat {
            return true;
        }
        self.part = 0;
        self.beat += 1;
        self.beat < beats_per_bar
    }
}

/// Everything a kernel reads but never changes.
#[derive(Debug, Clone, Copy)]
pub struct RenderEnv<'a> {
    pub song: &'a Song,
    pub tables: &'a SynthTables,
    pub settings: &'a MasterSettings,
    pub samples_per_tick: usize,
    pub sample_rate: f64,
}

/// Output buffers and the write position inside them.
#[derive(Debug)]
pub struct RenderTarget<'a> {
    pub left: &'a mut [f32],
    pub right: &'a mut [f32],
    pub cursor: usize,
}

impl RenderTarget<'_> {
    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelOutcome {
    BufferFilled,
    /// The bar ended with output written up to `cursor`.
    BarFinished { cursor: usize },
}

#[derive(Debug)]
pub struct Kernel {
    pub fingerprint: String,
    programs: Vec<ChannelProgram>,
}

impl Kernel {
    fn build(song: &Song, bar: usize, fingerprint: String) -> Self {
        let programs = (0..song.channel_count())
            .map(|ch| ChannelProgram::new(ch, ChannelKind::of(song, ch, bar)))
            .collect();
        Kernel { fingerprint, programs }
    }

    pub fn programs(&self) -> &[ChannelProgram] {
        &self.programs
    }

    /// Render from `position` until the buffer is full or the bar ends.
    pub fn render_bar(
        &self,
        env: &RenderEnv<'_>,
        position: &mut BarPosition,
        voices: &mut [SynthChannel],
        bus: &mut MasterBus,
        target: &mut RenderTarget<'_>,
    ) -> KernelOutcome {
        let song = env.song;
        let samples_per_tick = env.samples_per_tick.max(1);
        let len = target.len();
        loop {
            if target.cursor >= len {
                return KernelOutcome::BufferFilled;
            }
            if position.resolved
                && position.countdown == 0
                && !position.advance_tick(song.parts_per_beat, song.beats_per_bar)
            {
                return KernelOutcome::BarFinished { cursor: target.cursor };
            }
            if !position.resolved {
                if position.countdown == 0 || position.countdown > samples_per_tick {
                    position.countdown = samples_per_tick;
                }
                let ctx = TickContext {
                    bar: position.bar,
                    part: position.part_in_bar(song.parts_per_beat),
                    arpeggio: position.arpeggio,
                    remaining: position.countdown,
                    samples_per_tick,
                    sample_rate: env.sample_rate,
                };
                for (channel, voice) in voices.iter_mut().enumerate() {
                    resolve_tick(&ctx, song, channel, voice);
                }
                position.resolved = true;
            }

            let start = target.cursor;
            let chunk = position.countdown.min(len - start);
            let (mix_left, mix_right) = bus.begin(chunk);
            for program in &self.programs {
                if let Some(voice) = voices.get_mut(program.channel) {
                    (program.render)(program, voice, env.tables, mix_left, mix_right);
                }
            }
            bus.finish(
                env.settings,
                &mut target.left[start..start + chunk],
                &mut target.right[start..start + chunk],
            );
            target.cursor += chunk;
            position.countdown -= chunk;
        }
    }
}

/// Kernels keyed by fingerprint, owned by the engine.
#[derive(Debug, Default)]
pub struct KernelCache {
    kernels: HashMap<String, Arc<Kernel>>,
    scratch: String,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of `bar`, valid until the next call.
    pub fn fingerprint(&mut self, song: &Song, bar: usize) -> &str {
        self.scratch.clear();
        for channel in 0..song.channel_count() {
            ChannelKind::of(song, channel, bar).write_token(&mut self.scratch);
        }
        &self.scratch
    }

    pub fn lookup_or_build(&mut self, song: &Song, bar: usize) -> Arc<Kernel> {
        self.fingerprint(song, bar);
        if let Some(kernel) = self.kernels.get(self.scratch.as_str()) {
            debug!(bar, fingerprint = %self.scratch, "kernel cache hit");
            return Arc::clone(kernel);
        }
        let kernel = Arc::new(Kernel::build(song, bar, self.scratch.clone()));
        self.kernels.insert(self.scratch.clone(), Arc::clone(&kernel));
        info!(bar, fingerprint = %kernel.fingerprint, cached = self.kernels.len(), "built synthesis kernel");
        kernel
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn clear(&mut self) {
        self.kernels.clear();
    }
}

// ── Render loops ────────────────────────────────────────────

fn render_silent(_: &ChannelProgram, _: &mut SynthChannel, _: &SynthTables, _: &mut [f64], _: &mut [f64]) {}

fn render_chip(
    _: &ChannelProgram,
    v: &mut SynthChannel,
    tables: &SynthTables,
    left: &mut [f64],
    right: &mut [f64],
) {
    let wave = &tables.chip_waves[v.wave.min(CHIP_WAVES.len() - 1)];
    let [mut phase_a, mut phase_b, ..] = v.phases;
    let [mut delta_a, mut delta_b, ..] = v.phase_deltas;
    let mut volume = v.volume;
    let mut coefficient = v.filter_coefficient;

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let lfo = v.lfo.next();
        let vibrato = 1.0 + v.vibrato_scale * lfo;
        phase_a += delta_a * vibrato;
        phase_a -= phase_a.floor();
        phase_b += delta_b * vibrato;
        phase_b -= phase_b.floor();

        let raw = chip_sample(wave, phase_a) + chip_sample(wave, phase_b) * v.secondary_gain;
        let filtered = v.filter.process(raw, coefficient);
        let out = filtered * volume * (1.0 - v.tremolo_scale * (0.5 + 0.5 * lfo));
        *l += out * v.pan_left;
        *r += out * v.pan_right;

        volume += v.volume_delta;
        delta_a *= v.phase_delta_scale;
        delta_b *= v.phase_delta_scale;
        coefficient *= v.filter_scale;
    }

    v.phases[0] = phase_a;
    v.phases[1] = phase_b;
    v.phase_deltas[0] = delta_a;
    v.phase_deltas[1] = delta_b;
    v.volume = volume;
    v.filter_coefficient = coefficient;
}

/// Band-limited pulse with its DC offset removed.
#[inline]
fn pulse(phase: f64, width: f64, dt: f64) -> f64 {
    let mut value = if phase < width { 1.0 } else { -1.0 };
    value += poly_blep(phase, dt);
    value -= poly_blep((phase + 1.0 - width).fract(), dt);
    value - (2.0 * width - 1.0)
}

fn render_pulse(
    _: &ChannelProgram,
    v: &mut SynthChannel,
    _: &SynthTables,
    left: &mut [f64],
    right: &mut [f64],
) {
    let [mut phase_a, mut phase_b, ..] = v.phases;
    let [mut delta_a, mut delta_b, ..] = v.phase_deltas;
    let mut volume = v.volume;
    let mut coefficient = v.filter_coefficient;
    let mut width = v.pulse_width;

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let lfo = v.lfo.next();
        let vibrato = 1.0 + v.vibrato_scale * lfo;
        let step_a = delta_a * vibrato;
        let step_b = delta_b * vibrato;
        phase_a += step_a;
        phase_a -= phase_a.floor();
        phase_b += step_b;
        phase_b -= phase_b.floor();

        let raw = pulse(phase_a, width, step_a) + pulse(phase_b, width, step_b) * v.secondary_gain;
        let filtered = v.filter.process(raw, coefficient);
        let out = filtered * volume * (1.0 - v.tremolo_scale * (0.5 + 0.5 * lfo));
        *l += out * v.pan_left;
        *r += out * v.pan_right;

        volume += v.volume_delta;
        width += v.pulse_width_delta;
        delta_a *= v.phase_delta_scale;
        delta_b *= v.phase_delta_scale;
        coefficient *= v.filter_scale;
    }

    v.phases[0] = phase_a;
    v.phases[1] = phase_b;
    v.phase_deltas[0] = delta_a;
    v.phase_deltas[1] = delta_b;
    v.volume = volume;
    v.pulse_width = width;
    v.filter_coefficient = coefficient;
}

fn render_noise(
    _: &ChannelProgram,
    v: &mut SynthChannel,
    tables: &SynthTables,
    left: &mut [f64],
    right: &mut [f64],
) {
    let wave = &tables.noise_waves[v.wave.min(NOISE_WAVES.len() - 1)];
    let mut phase = v.phases[0];
    let mut delta = v.phase_deltas[0];
    let mut volume = v.volume;

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let lfo = v.lfo.next();
        phase += delta * (1.0 + v.vibrato_scale * lfo);
        phase -= phase.floor();

        let filtered = v.filter.process(noise_sample(wave, phase), v.filter_coefficient);
        let out = filtered * volume * (1.0 - v.tremolo_scale * (0.5 + 0.5 * lfo));
        *l += out * v.pan_left;
        *r += out * v.pan_right;

        volume += v.volume_delta;
        delta *= v.phase_delta_scale;
    }

    v.phases[0] = phase;
    v.phase_deltas[0] = delta;
    v.volume = volume;
}

fn render_fm(
    program: &ChannelProgram,
    v: &mut SynthChannel,
    tables: &SynthTables,
    left: &mut [f64],
    right: &mut [f64],
) {
    let Some(wiring) = program.wiring else {
        return;
    };
    let mut phases = v.phases;
    let mut deltas = v.phase_deltas;
    let mut expressions = v.expressions;
    let mut feedback = v.feedback;
    let mut volume = v.volume;

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let lfo = v.lfo.next();
        let vibrato = 1.0 + v.vibrato_scale * lfo;

        let mut outputs = [0.0; OPERATOR_COUNT];
        for op in (0..OPERATOR_COUNT).rev() {
            let mut modulation = 0.0;
            for &source in wiring.modulated_by[op] {
                modulation += outputs[source];
            }
            for &source in wiring.feedback_from[op] {
                modulation += v.operator_outputs[source] * feedback;
            }
            phases[op] += deltas[op] * vibrato;
            phases[op] -= phases[op].floor();
            outputs[op] = tables.sine_at(phases[op] + modulation * FM_MODULATION_DEPTH) * expressions[op];
        }
        v.operator_outputs = outputs;

        let carriers: f64 = outputs[..wiring.carrier_count].iter().sum();
        let out = carriers * volume * (1.0 - v.tremolo_scale * (0.5 + 0.5 * lfo));
        *l += out * v.pan_left;
        *r += out * v.pan_right;

        volume += v.volume_delta;
        feedback += v.feedback_delta;
        for op in 0..OPERATOR_COUNT {
            expressions[op] += v.expression_deltas[op];
            deltas[op] *= v.phase_delta_scale;
        }
    }

    v.phases = phases;
    v.phase_deltas = deltas;
    v.expressions = expressions;
    v.feedback = feedback;
    v.volume = volume;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::Note;

    fn fm_song() -> Song {
        let mut song = Song::new();
        let instrument = &mut song.channels[1].instruments[0];
        instrument.set_type_and_reset(InstrumentType::Fm);
        instrument.algorithm = 5;
        instrument.feedback_type = 18;
        song
    }

    #[test]
    fn fingerprint_lists_every_channel() {
        let mut cache = KernelCache::new();
        let mut song = fm_song();
        song.channels[2].instruments[0].set_type_and_reset(InstrumentType::PulseWidth);
        song.channels[3].instruments[0].mute = true;
        assert_eq!(cache.fingerprint(&song, 0), "cf5.18w_n");
        assert_eq!(cache.fingerprint(&song, 8), "_____");
    }

    #[test]
    fn kernels_are_shared_by_fingerprint() {
        let mut cache = KernelCache::new();
        let song = fm_song();
        let a = cache.lookup_or_build(&song, 0);
        let b = cache.lookup_or_build(&song, 3);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let silent = cache.lookup_or_build(&song, 10);
        assert!(!Arc::ptr_eq(&a, &silent));
        assert_eq!(cache.len(), 2);
        assert_eq!(silent.fingerprint, "_____");
    }

    #[test]
    fn fm_programs_carry_their_wiring() {
        let mut cache = KernelCache::new();
        let kernel = cache.lookup_or_build(&fm_song(), 0);
        let programs = kernel.programs();
        assert_eq!(programs.len(), 5);
        assert!(programs[0].wiring().is_none());
        let wiring = programs[1].wiring().unwrap();
        assert_eq!(wiring.carrier_count, 2);
        assert_eq!(wiring.modulated_by[0], &[2]);
        assert_eq!(wiring.feedback_from[0], &[3]);
    }

    #[test]
    fn bar_position_walks_ticks_beats_and_bars() {
        let mut pos = BarPosition::at_bar(2);
        let mut ticks = 1;
        while pos.advance_tick(2, 3) {
            ticks += 1;
        }
        assert_eq!(ticks, 2 * 3 * TICKS_PER_PART);

        let mid = BarPosition { beat: 1, part: 1, arpeggio: 2, ..BarPosition::at_bar(0) };
        assert_eq!(mid.part_in_bar(4), 5);
        assert_eq!(mid.tick_in_bar(4), 22);
    }

    fn render(song: &Song, position: &mut BarPosition, len: usize) -> (KernelOutcome, Vec<f32>) {
        let tables = SynthTables::new();
        let settings = MasterSettings::default();
        let env = RenderEnv { song, tables: &tables, settings: &settings, samples_per_tick: 10, sample_rate: 8000.0 };
        let mut cache = KernelCache::new();
        let kernel = cache.lookup_or_build(song, position.bar);
        let mut voices: Vec<SynthChannel> = (0..song.channel_count()).map(|_| SynthChannel::new(8000.0)).collect();
        let mut bus = MasterBus::new(8000.0);
        let mut left = vec![0.0f32; len];
        let mut right = vec![0.0f32; len];
        let mut target = RenderTarget { left: &mut left, right: &mut right, cursor: 0 };
        let outcome = kernel.render_bar(&env, position, &mut voices, &mut bus, &mut target);
        (outcome, left)
    }

    #[test]
    fn render_bar_stops_at_the_bar_line() {
        let mut song = Song::new();
        song.channels[0].patterns[0].notes.push(Note::new(24, 0, 32, 3, false));
        let bar_samples = song.parts_per_bar() * TICKS_PER_PART * 10;

        let mut position = BarPosition::at_bar(0);
        let (outcome, left) = render(&song, &mut position, bar_samples + 50);
        assert_eq!(outcome, KernelOutcome::BarFinished { cursor: bar_samples });
        assert!(left[..bar_samples].iter().any(|&s| s != 0.0));

        let mut position = BarPosition::at_bar(0);
        let (outcome, _) = render(&song, &mut position, 35);
        assert_eq!(outcome, KernelOutcome::BufferFilled);
        assert_eq!(position.tick_in_bar(song.parts_per_beat), 3);
        assert_eq!(position.countdown, 5);
    }

    #[test]
    fn pulse_has_no_dc() {
        let dt = 1.0 / 64.0;
        for width in [0.5, 0.25, 0.1] {
            let mean: f64 = (0..64).map(|i| pulse(i as f64 * dt, width, dt)).sum::<f64>() / 64.0;
            assert!(mean.abs() < 0.05, "width {width} has DC {mean}");
        }
    }
}
