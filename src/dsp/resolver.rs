//! Tick resolver — turns the song's notes into per-tick synthesis parameters.
//!
//! Once per tick and channel it finds the sounding note and its contiguous
//! neighbours, evaluates pins, slides, transitions, harmony and envelopes at
//! both ends of the tick, and writes start values plus per-sample deltas into
//! the channel's [`SynthChannel`]. The kernels then only interpolate.

use crate::config::{
    detune_semitones, frequency_from_pitch, note_volume_mult, operator_amplitude_curve, pan_gains,
    pulse_width_ratio, volume_mult, HarmonyKind, Transition, ALGORITHMS, ARPEGGIO_PATTERNS,
    CARRIER_INTERVALS, CHIP_BASE_VOLUME, CHIP_WAVES, CHORUSES, DRUM_INTERVAL, DRUM_PITCH_REFERENCE,
    EFFECTS, ENVELOPES, FILTERS, FM_BASE_VOLUME, HARMONIES, INSTRUMENT_OCTAVE_CENTER, KEY_BASE_PITCH,
    MIXES, NOISE_BASE_VOLUME, NOISE_WAVES, NOISE_WAVE_LENGTH, OPERATOR_FREQUENCIES, PITCH_DAMPING,
    PULSE_BASE_VOLUME, RIFFS, SLIDE_TICKS, TICKS_PER_PART, TRANSITIONS,
};
use crate::song::{Instrument, InstrumentType, Note, Pattern, Song};

use super::envelope::{envelope_value, EnvelopeTime};
use super::filter::{cutoff_to_coefficient, decay_scale};
use super::voice::SynthChannel;

/// Noise tables are designed to be read at this rate.
const NOISE_REFERENCE_RATE: f64 = 44100.0;

/// Where in the song a tick chunk starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub bar: usize,
    /// Part within the bar.
    pub part: usize,
    /// Tick within the part, `0..TICKS_PER_PART`.
    pub arpeggio: usize,
    /// Samples left to render in this tick; less than a full tick after a seek.
    pub remaining: usize,
    pub samples_per_tick: usize,
    pub sample_rate: f64,
}

impl TickContext {
    fn tick_in_bar(&self) -> usize {
        self.part * TICKS_PER_PART + self.arpeggio
    }

    fn elapsed_fraction(&self) -> f64 {
        if self.samples_per_tick == 0 {
            return 0.0;
        }
        1.0 - self.remaining.min(self.samples_per_tick) as f64 / self.samples_per_tick as f64
    }

    fn seconds(&self, ticks: f64) -> f64 {
        ticks * self.samples_per_tick as f64 / self.sample_rate
    }
}

/// The note evaluated at one instant.
#[derive(Debug, Clone, Copy)]
struct NotePoint {
    /// Pitch bend, slide and trill, in semitones.
    bend: f64,
    /// Linear gain of the pins, including the slide.
    pin_volume: f64,
    /// Attack, release, click and blip shaping.
    transition_gain: f64,
    seconds: f64,
    beats: f64,
}

impl NotePoint {
    fn envelope_time(&self) -> EnvelopeTime {
        EnvelopeTime { seconds: self.seconds, beats: self.beats, pin_volume: self.pin_volume }
    }
}

fn pick<T>(table: &[T], index: usize) -> &T {
    &table[index.min(table.len() - 1)]
}

/// Resolve one tick of one channel into `state`.
pub fn resolve_tick(ctx: &TickContext, song: &Song, channel: usize, state: &mut SynthChannel) {
    let (Some(pattern), Some(instrument)) =
        (song.get_pattern(channel, ctx.bar), song.instrument_for(channel, ctx.bar))
    else {
        state.silence();
        return;
    };
    let part = ctx.part as i32;
    let found = pattern.notes.iter().position(|n| n.start <= part && part < n.end);
    let Some(index) = found.filter(|_| !instrument.mute) else {
        state.silence();
        return;
    };
    let note = &pattern.notes[index];
    if note.pitches.is_empty() {
        state.silence();
        return;
    }

    let prev = previous_note(song, channel, ctx.bar, pattern, index);
    let next = next_note(song, channel, ctx.bar, pattern, index);
    let transition = pick(TRANSITIONS, instrument.transition);
    let noisy = instrument.instrument_type == InstrumentType::Noise;

    let ticks_per_part = TICKS_PER_PART as f64;
    let start_tick = note.start as f64 * ticks_per_part;
    let length = note.length() as f64 * ticks_per_part;
    let tick = ctx.tick_in_bar() as f64;
    let n0 = tick + ctx.elapsed_fraction() - start_tick;
    let n1 = tick + 1.0 - start_tick;
    let tick_of_note = (tick - start_tick).max(0.0) as usize;

    let note_id = (ctx.bar, note.start);
    if state.active_note != Some(note_id) {
        if noisy || !(transition.legato && prev.is_some()) {
            state.reset_phases();
        }
        state.active_note = Some(note_id);
    }

    let harmony_spec = pick(HARMONIES, instrument.harmony);
    let clock = tick_of_note / pick(RIFFS, song.riff).divisor.max(1);
    let (main, harmony) = chord_voices(harmony_spec.kind, &note.pitches, clock);
    let trill = if tick_of_note % 2 == 1 { transition.trill_interval } else { 0.0 };
    let ticks_per_beat = (song.parts_per_beat * TICKS_PER_PART).max(1) as f64;

    let point = |n: f64| {
        let (interval, pins) = pin_state(note, n / ticks_per_part);
        let (slide_pitch, slide_volume) = if transition.slides {
            slide_at(note, prev, next, n, length)
        } else {
            (0.0, 0.0)
        };
        NotePoint {
            bend: interval + slide_pitch + trill,
            pin_volume: note_volume_mult(pins + slide_volume),
            transition_gain: transition_gain(transition, n, length, prev.is_some(), next.is_some()),
            seconds: ctx.seconds(n),
            beats: n / ticks_per_beat,
        }
    };
    let a = point(n0);
    let b = point(n1);
    let remaining = ctx.remaining.max(1) as f64;

    let (pan_left, pan_right) = pan_gains(instrument.pan);
    state.pan_left = pan_left;
    state.pan_right = pan_right;

    let mix = pick(MIXES, song.mix);
    let mix_gain = if song.channel_is_drum(channel) { mix.drum_gain } else { mix.pitch_gain };
    let gain = volume_mult(instrument.volume) * mix_gain;

    let effect = pick(EFFECTS, instrument.effect);
    let vibrato_on = n0 >= effect.delay_parts as f64 * ticks_per_part;
    state.vibrato_scale = if vibrato_on { 2f64.powf(effect.vibrato / 12.0) - 1.0 } else { 0.0 };
    state.tremolo_scale = effect.tremolo;

    if noisy {
        let voice = Voices { main: main as f64, harmony: None, harmony_volume: 0.0 };
        resolve_noise(ctx, instrument, state, voice, (&a, &b), gain, remaining);
        return;
    }

    let root = KEY_BASE_PITCH as f64
        + song.key as f64
        + (instrument.octave as f64 - INSTRUMENT_OCTAVE_CENTER as f64) * 12.0
        + detune_semitones(song.detune);
    let voices = Voices {
        main: root + main as f64,
        harmony: harmony.map(|h| root + h as f64),
        harmony_volume: harmony_spec.harmony_volume,
    };
    state.phase_delta_scale = 2f64.powf((b.bend - a.bend) / 12.0 / remaining);

    match instrument.instrument_type {
        InstrumentType::Fm => resolve_fm(ctx, instrument, state, voices, (&a, &b), gain, remaining),
        _ => resolve_oscillators(ctx, instrument, state, voices, (&a, &b), gain, remaining),
    }
}

/// Main and optional harmony pitch, before bends.
#[derive(Debug, Clone, Copy)]
struct Voices {
    main: f64,
    harmony: Option<f64>,
    harmony_volume: f64,
}

fn pitch_damping(pitch: f64) -> f64 {
    2f64.powf(-(pitch - 60.0) / PITCH_DAMPING)
}

fn resolve_oscillators(
    ctx: &TickContext,
    instrument: &Instrument,
    state: &mut SynthChannel,
    voices: Voices,
    (a, b): (&NotePoint, &NotePoint),
    gain: f64,
    remaining: f64,
) {
    let chorus = pick(CHORUSES, instrument.chorus);
    let first = voices.main + a.bend + chorus.offset + chorus.interval;
    let second = voices.harmony.unwrap_or(voices.main) + a.bend + chorus.offset - chorus.interval;
    state.phase_deltas = [
        frequency_from_pitch(first) / ctx.sample_rate,
        frequency_from_pitch(second) / ctx.sample_rate,
        0.0,
        0.0,
    ];
    let second_volume = if voices.harmony.is_some() { voices.harmony_volume } else { 1.0 };
    state.secondary_gain = chorus.sign * second_volume;

    let filter = pick(FILTERS, instrument.filter);
    let base = match instrument.instrument_type {
        InstrumentType::PulseWidth => PULSE_BASE_VOLUME,
        _ => CHIP_BASE_VOLUME * pick(CHIP_WAVES, instrument.wave).volume,
    };
    let type_gain = gain * base * filter.volume * chorus.volume;
    let volume_at = |p: &NotePoint| {
        type_gain * p.pin_volume * p.transition_gain * pitch_damping(voices.main + p.bend)
    };
    let start = volume_at(a);
    state.volume = start;
    state.volume_delta = (volume_at(b) - start) / remaining;

    match filter.octaves {
        Some(octaves) => {
            let cutoff = frequency_from_pitch(voices.main + a.bend)
                * 2f64.powf(octaves - filter.decay * a.seconds);
            state.filter_coefficient =
                cutoff_to_coefficient(cutoff.min(ctx.sample_rate * 0.45), ctx.sample_rate);
            state.filter_scale = decay_scale(filter.decay, ctx.sample_rate);
        }
        None => {
            state.filter_coefficient = 1.0;
            state.filter_scale = 1.0;
        }
    }

    let envelope = pick(ENVELOPES, instrument.pulse_envelope);
    let ratio = pulse_width_ratio(instrument.pulse_width);
    let width_at = |p: &NotePoint| (ratio * envelope_value(envelope, p.envelope_time())).clamp(0.01, 0.5);
    let width = width_at(a);
    state.pulse_width = width;
    state.pulse_width_delta = (width_at(b) - width) / remaining;

    state.wave = instrument.wave.min(CHIP_WAVES.len() - 1);
}

fn resolve_fm(
    ctx: &TickContext,
    instrument: &Instrument,
    state: &mut SynthChannel,
    voices: Voices,
    (a, b): (&NotePoint, &NotePoint),
    gain: f64,
    remaining: f64,
) {
    let algorithm = pick(ALGORITHMS, instrument.algorithm);
    let mut carrier_sum = 0.0;
    let mut modulator_sum = 0.0;

    for (op, operator) in instrument.operators.iter().enumerate() {
        let carrier = algorithm.associated_carrier[op];
        let voice = if carrier == 1 { voices.harmony.unwrap_or(voices.main) } else { voices.main };
        let ratio = pick(OPERATOR_FREQUENCIES, operator.frequency);
        let hz = ratio.mult * frequency_from_pitch(voice + a.bend + CARRIER_INTERVALS[carrier])
            + ratio.hz_offset;
        state.phase_deltas[op] = hz.max(0.0) / ctx.sample_rate;

        let amplitude = operator_amplitude_curve(operator.amplitude as f64);
        if op < algorithm.carrier_count {
            carrier_sum += amplitude;
        } else {
            modulator_sum += amplitude;
        }
        let envelope = pick(ENVELOPES, operator.envelope);
        let scale = amplitude * ratio.amplitude_sign;
        let start = scale * envelope_value(envelope, a.envelope_time());
        let end = scale * envelope_value(envelope, b.envelope_time());
        state.expressions[op] = start;
        state.expression_deltas[op] = (end - start) / remaining;
    }

    let feedback_amplitude = operator_amplitude_curve(instrument.feedback_amplitude as f64);
    let feedback_envelope = pick(ENVELOPES, instrument.feedback_envelope);
    let start = feedback_amplitude * envelope_value(feedback_envelope, a.envelope_time());
    let end = feedback_amplitude * envelope_value(feedback_envelope, b.envelope_time());
    state.feedback = start;
    state.feedback_delta = (end - start) / remaining;

    let boost = (1.0 - modulator_sum.min(1.0))
        * (1.0 - feedback_amplitude.min(1.0))
        * (1.0 - (carrier_sum - 1.0).clamp(0.0, 1.0));
    let type_gain = gain * FM_BASE_VOLUME * (1.0 + 3.0 * boost);
    let volume_at = |p: &NotePoint| type_gain * p.transition_gain * pitch_damping(voices.main + p.bend);
    let start = volume_at(a);
    state.volume = start;
    state.volume_delta = (volume_at(b) - start) / remaining;
    state.secondary_gain = 0.0;
    state.filter_coefficient = 1.0;
    state.filter_scale = 1.0;
}

fn resolve_noise(
    ctx: &TickContext,
    instrument: &Instrument,
    state: &mut SynthChannel,
    voices: Voices,
    (a, b): (&NotePoint, &NotePoint),
    gain: f64,
    remaining: f64,
) {
    let wave = pick(NOISE_WAVES, instrument.wave);
    let pitch_at = |p: &NotePoint| wave.base_pitch + (voices.main + p.bend) * DRUM_INTERVAL;
    let start_pitch = pitch_at(a);
    let end_pitch = pitch_at(b);

    let rate = 2f64.powf((start_pitch - DRUM_PITCH_REFERENCE) / 12.0) * NOISE_REFERENCE_RATE / ctx.sample_rate;
    state.phase_deltas = [rate / NOISE_WAVE_LENGTH as f64, 0.0, 0.0, 0.0];
    state.phase_delta_scale = 2f64.powf((end_pitch - start_pitch) / 12.0 / remaining);
    state.filter_coefficient =
        (frequency_from_pitch(start_pitch) / ctx.sample_rate * wave.pitch_filter_mult).min(1.0);
    state.filter_scale = 1.0;
    state.secondary_gain = 0.0;

    let type_gain = gain * NOISE_BASE_VOLUME * wave.volume;
    let volume_at = |p: &NotePoint| type_gain * p.pin_volume * p.transition_gain;
    let start = volume_at(a);
    state.volume = start;
    state.volume_delta = (volume_at(b) - start) / remaining;
    state.wave = instrument.wave.min(NOISE_WAVES.len() - 1);
}

fn previous_note<'a>(
    song: &'a Song,
    channel: usize,
    bar: usize,
    pattern: &'a Pattern,
    index: usize,
) -> Option<&'a Note> {
    let note = &pattern.notes[index];
    if index > 0 {
        let prev = &pattern.notes[index - 1];
        return (prev.end == note.start).then_some(prev);
    }
    if note.start != 0 || bar == 0 {
        return None;
    }
    let prev = song.get_pattern(channel, bar - 1)?.notes.last()?;
    (prev.end == song.parts_per_bar() as i32).then_some(prev)
}

fn next_note<'a>(
    song: &'a Song,
    channel: usize,
    bar: usize,
    pattern: &'a Pattern,
    index: usize,
) -> Option<&'a Note> {
    let note = &pattern.notes[index];
    if let Some(next) = pattern.notes.get(index + 1) {
        return (next.start == note.end).then_some(next);
    }
    if note.end != song.parts_per_bar() as i32 || bar + 1 >= song.bar_count {
        return None;
    }
    let next = song.get_pattern(channel, bar + 1)?.notes.first()?;
    (next.start == 0).then_some(next)
}

/// Pitch bend and pin volume `parts` into the note, interpolated between pins.
fn pin_state(note: &Note, parts: f64) -> (f64, f64) {
    let (Some(first), Some(last)) = (note.pins.first(), note.pins.last()) else {
        return (0.0, 0.0);
    };
    if parts <= first.time as f64 {
        return (first.interval as f64, first.volume as f64);
    }
    for pair in note.pins.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if parts <= to.time as f64 {
            let ratio = (parts - from.time as f64) / (to.time - from.time).max(1) as f64;
            let lerp = |x: i32, y: i32| x as f64 + (y - x) as f64 * ratio;
            return (lerp(from.interval, to.interval), lerp(from.volume, to.volume));
        }
    }
    (last.interval as f64, last.volume as f64)
}

/// Pitch and pin-volume offsets bending toward contiguous neighbours.
///
/// Each side of a boundary moves half way, so both notes meet in the middle.
fn slide_at(note: &Note, prev: Option<&Note>, next: Option<&Note>, n: f64, length: f64) -> (f64, f64) {
    let window = SLIDE_TICKS.min(length * 0.5);
    if window <= 0.0 {
        return (0.0, 0.0);
    }
    let first_pitch = note.pitches[0];
    let mut pitch = 0.0;
    let mut volume = 0.0;
    if let Some(prev) = prev.filter(|p| !p.pitches.is_empty()) {
        let weight = (1.0 - n / window).max(0.0);
        let from = prev.pitches[0] + prev.end_interval();
        let to = first_pitch + note.pins.first().map_or(0, |p| p.interval);
        pitch += (from - to) as f64 * 0.5 * weight;
        volume += (prev.end_volume() - note.start_volume()) as f64 * 0.5 * weight;
    }
    if let Some(next) = next.filter(|p| !p.pitches.is_empty()) {
        let weight = (1.0 - (length - n) / window).max(0.0);
        let from = first_pitch + note.end_interval();
        let to = next.pitches[0] + next.pins.first().map_or(0, |p| p.interval);
        pitch += (to - from) as f64 * 0.5 * weight;
        volume += (next.start_volume() - note.end_volume()) as f64 * 0.5 * weight;
    }
    (pitch, volume)
}

fn transition_gain(transition: &Transition, n: f64, length: f64, has_prev: bool, has_next: bool) -> f64 {
    let mut gain = 1.0;
    if !has_prev {
        if transition.attack_ticks > 0.0 {
            gain *= (n / transition.attack_ticks).clamp(0.0, 1.0);
        }
        gain *= 1.0 + transition.click_boost * (1.0 - n).max(0.0);
    }
    if !has_next && transition.release_ticks > 0.0 {
        gain *= ((length - n) / transition.release_ticks).clamp(0.0, 1.0);
    }
    if transition.blip_ticks > 0.0 {
        gain *= (transition.blip_ticks - n).clamp(0.0, 1.0);
    }
    gain
}

fn arpeggiate(pitches: &[i32], clock: usize) -> i32 {
    let order = ARPEGGIO_PATTERNS[pitches.len().clamp(1, ARPEGGIO_PATTERNS.len()) - 1];
    pitches[order[clock % order.len()].min(pitches.len() - 1)]
}

/// Main pitch and optional harmony pitch for a chord at an arpeggio step.
fn chord_voices(kind: HarmonyKind, pitches: &[i32], clock: usize) -> (i32, Option<i32>) {
    let first = pitches[0];
    let count = pitches.len();
    if count == 1 {
        return (first, None);
    }
    match kind {
        HarmonyKind::Arpeggio => (arpeggiate(pitches, clock), None),
        HarmonyKind::HalfArpeggio => (arpeggiate(pitches, clock / 2), None),
        HarmonyKind::Duet => match count {
            2 => (first, Some(pitches[1])),
            _ => (first, Some(arpeggiate(&pitches[1..], clock))),
        },
        HarmonyKind::Chord => match count {
            2 => (first, Some(pitches[1])),
            _ => (arpeggiate(&pitches[..count - 1], clock), Some(pitches[count - 1])),
        },
        HarmonyKind::Seventh => match count {
            2 => (first, Some(pitches[1])),
            3 => (first, Some(arpeggiate(&pitches[1..], clock))),
            _ => (arpeggiate(&pitches[..2], clock), Some(arpeggiate(&pitches[2..], clock))),
        },
        HarmonyKind::ArpChord => (arpeggiate(pitches, clock), Some(first)),
    }
}
