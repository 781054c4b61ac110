//! Human-readable JSON interchange.
//!
//! Export goes through serde-derived structs. Import walks a loose
//! [`serde_json::Value`] instead, so hand-edited or partial documents still
//! load: unknown names fall back to the first table entry, numbers are
//! clipped, and malformed notes are skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::format::VERSION_LATEST;
use crate::config::{
    self, clip, index_by_name, tempo_from_bpm, BAR_COUNT_MAX, CHANNEL_OCTAVE_RANGE, DRUM_CHANNEL_COUNT_MAX,
    DRUM_COUNT, INSTRUMENTS_PER_CHANNEL_MAX, MAX_CHORD_SIZE, MAX_PITCH, NOTE_VOLUME_MAX, OPERATOR_COUNT,
    PATTERNS_PER_CHANNEL_MAX, PITCH_CHANNEL_COUNT_MAX,
};
use crate::error::SongError;
use crate::song::{Instrument, InstrumentType, Note, NotePin, Song};

pub const FORMAT_NAME: &str = "ChipBox";

/// How the bar table is unrolled into each channel's `sequence`.
///
/// The defaults reproduce the bar table exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub enable_intro: bool,
    /// Times the loop section is written out; at least one.
    pub loop_count: usize,
    pub enable_outro: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            enable_intro: true,
            loop_count: 1,
            enable_outro: true,
        }
    }
}

// ── Export ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongJson {
    pub format: &'static str,
    pub version: usize,
    pub scale: &'static str,
    pub key: &'static str,
    pub intro_bars: usize,
    pub loop_bars: usize,
    pub beats_per_bar: usize,
    pub ticks_per_beat: usize,
    pub beats_per_minute: f64,
    pub reverb: usize,
    pub blend: usize,
    pub riff: &'static str,
    pub detune: usize,
    pub muff: &'static str,
    pub mix: &'static str,
    pub sample_rate: &'static str,
    pub channels: Vec<ChannelJson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelJson {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub octave_scroll_bar: usize,
    pub instruments: Vec<InstrumentJson>,
    pub patterns: Vec<PatternJson>,
    pub sequence: Vec<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentJson {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub volume: i64,
    pub pan: i64,
    pub muted: bool,
    pub transition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse_width: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse_envelope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chorus: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmony: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octave: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_amplitude: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_envelope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<OperatorJson>>,
}

#[derive(Debug, Serialize)]
pub struct OperatorJson {
    pub frequency: &'static str,
    pub amplitude: usize,
    pub envelope: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PatternJson {
    /// 1-based instrument number.
    pub instrument: usize,
    pub notes: Vec<NoteJson>,
}

#[derive(Debug, Serialize)]
pub struct NoteJson {
    pub pitches: Vec<i32>,
    pub points: Vec<PointJson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointJson {
    pub tick: i32,
    pub pitch_bend: i32,
    pub volume: i64,
}

fn volume_percent(volume: usize) -> i64 {
    (100.0 - volume as f64 * 100.0 / (config::VOLUME_RANGE - 1) as f64).round() as i64
}

fn pan_percent(pan: usize) -> i64 {
    (pan as i64 - config::PAN_CENTER as i64) * 100 / config::PAN_CENTER as i64
}

fn envelope_name(index: usize) -> &'static str {
    config::ENVELOPES.get(index).map_or("steady", |e| e.name)
}

fn instrument_json(instrument: &Instrument) -> InstrumentJson {
    let kind = instrument.instrument_type;
    let is_noise = kind == InstrumentType::Noise;
    let is_fm = kind == InstrumentType::Fm;
    let is_pwm = kind == InstrumentType::PulseWidth;

    let wave = match kind {
        InstrumentType::Chip => config::CHIP_WAVES.get(instrument.wave).map(|w| w.name),
        InstrumentType::Noise => config::NOISE_WAVES.get(instrument.wave).map(|w| w.name),
        _ => None,
    };
    InstrumentJson {
        kind: kind.name(),
        volume: volume_percent(instrument.volume),
        pan: pan_percent(instrument.pan),
        muted: instrument.mute,
        transition: config::TRANSITIONS.get(instrument.transition).map_or("seamless", |t| t.name),
        wave,
        pulse_width: is_pwm
            .then(|| config::PULSE_WIDTH_NAMES.get(instrument.pulse_width).copied())
            .flatten(),
        pulse_envelope: is_pwm.then(|| envelope_name(instrument.pulse_envelope)),
        filter: (!is_noise && !is_fm)
            .then(|| config::FILTERS.get(instrument.filter).map(|f| f.name))
            .flatten(),
        effect: (!is_noise).then(|| config::EFFECTS.get(instrument.effect).map(|e| e.name)).flatten(),
        chorus: (!is_noise && !is_fm)
            .then(|| config::CHORUSES.get(instrument.chorus).map(|c| c.name))
            .flatten(),
        harmony: (!is_noise).then(|| config::HARMONIES.get(instrument.harmony).map(|h| h.name)).flatten(),
        octave: (!is_noise).then(|| instrument.octave as i64 - config::INSTRUMENT_OCTAVE_CENTER as i64),
        algorithm: is_fm.then(|| config::ALGORITHMS.get(instrument.algorithm).map(|a| a.name)).flatten(),
        feedback_type: is_fm
            .then(|| config::FEEDBACKS.get(instrument.feedback_type).map(|f| f.name))
            .flatten(),
        feedback_amplitude: is_fm.then_some(instrument.feedback_amplitude),
        feedback_envelope: is_fm.then(|| envelope_name(instrument.feedback_envelope)),
        operators: is_fm.then(|| {
            instrument
                .operators
                .iter()
                .map(|op| OperatorJson {
                    frequency: config::OPERATOR_FREQUENCIES.get(op.frequency).map_or("1×", |f| f.name),
                    amplitude: op.amplitude,
                    envelope: envelope_name(op.envelope),
                })
                .collect()
        }),
    }
}

/// Bar indices in playback order for the given export options.
pub fn unrolled_bars(song: &Song, options: &ExportOptions) -> Vec<usize> {
    let loop_end = (song.loop_start + song.loop_length).min(song.bar_count);
    let mut bars = Vec::new();
    if options.enable_intro {
        bars.extend(0..song.loop_start);
    }
    for _ in 0..options.loop_count.max(1) {
        bars.extend(song.loop_start..loop_end);
    }
    if options.enable_outro {
        bars.extend(loop_end..song.bar_count);
    }
    bars
}

pub fn export_song(song: &Song, options: &ExportOptions) -> SongJson {
    let bars = unrolled_bars(song, options);
    let channels = song
        .channels
        .iter()
        .enumerate()
        .map(|(index, channel)| ChannelJson {
            kind: if song.channel_is_drum(index) { "drum" } else { "pitch" },
            octave_scroll_bar: channel.octave,
            instruments: channel
                .instruments
                .iter()
                .take(song.instruments_per_channel)
                .map(instrument_json)
                .collect(),
            patterns: channel
                .patterns
                .iter()
                .take(song.patterns_per_channel)
                .map(|pattern| PatternJson {
                    instrument: pattern.instrument + 1,
                    notes: pattern
                        .notes
                        .iter()
                        .map(|note| NoteJson {
                            pitches: note.pitches.clone(),
                            points: note
                                .pins
                                .iter()
                                .map(|pin| PointJson {
                                    tick: note.start + pin.time,
                                    pitch_bend: pin.interval,
                                    volume: (pin.volume as f64 * 100.0 / NOTE_VOLUME_MAX as f64).round() as i64,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
            sequence: bars.iter().map(|&bar| channel.bars.get(bar).copied().unwrap_or(0)).collect(),
        })
        .collect();

    SongJson {
        format: FORMAT_NAME,
        version: VERSION_LATEST,
        scale: config::SCALES.get(song.scale).map_or("easy :)", |s| s.name),
        key: config::KEY_NAMES.get(song.key).copied().unwrap_or("C"),
        intro_bars: if options.enable_intro { song.loop_start } else { 0 },
        loop_bars: song.loop_length,
        beats_per_bar: song.beats_per_bar,
        ticks_per_beat: song.parts_per_beat,
        beats_per_minute: song.beats_per_minute(),
        reverb: song.reverb,
        blend: song.blend,
        riff: config::RIFFS.get(song.riff).map_or("fast", |r| r.name),
        detune: song.detune,
        muff: config::MUFFS.get(song.muff).map_or("off", |m| m.name),
        mix: config::MIXES.get(song.mix).map_or("Type A", |m| m.name),
        sample_rate: config::SAMPLE_RATE_MODES.get(song.sample_rate).map_or("full", |m| m.name),
        channels,
    }
}

pub fn to_json(song: &Song, options: &ExportOptions) -> Result<String, SongError> {
    Ok(serde_json::to_string_pretty(&export_song(song, options))?)
}

// ── Import ──────────────────────────────────────────────────

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn count(value: Option<&Value>) -> Option<usize> {
    number(value).map(|v| v.round().max(0.0) as usize)
}

fn string(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// Index of `name` in a table, logging when it falls back to the first entry.
fn lookup<'a, I>(names: I, field: &str, name: &str) -> usize
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    if !names.clone().into_iter().any(|n| n == name) {
        debug!(field, name, "unknown name, using the first entry");
    }
    index_by_name(names, name)
}

fn read_name<'a, I>(obj: &Map<String, Value>, field: &str, names: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    string(obj.get(field)).map(|name| lookup(names, field, name))
}

fn array<'v>(obj: &'v Map<String, Value>, field: &str) -> &'v [Value] {
    obj.get(field).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Replace `song` with the song described by the JSON text.
///
/// Only unparseable text is an error; missing or odd fields keep defaults.
pub fn load_json(song: &mut Song, text: &str) -> Result<(), SongError> {
    let root: Value = serde_json::from_str(text)?;
    song.init_to_default(true);
    let Some(obj) = root.as_object() else {
        warn!("song JSON is not an object, keeping defaults");
        return Ok(());
    };

    if let Some(scale) = read_name(obj, "scale", config::SCALES.iter().map(|s| s.name)) {
        song.scale = scale;
    }
    if let Some(key) = string(obj.get("key")) {
        let key = key.replace('#', "♯");
        song.key = lookup(config::KEY_NAMES.iter().copied(), "key", &key);
    }
    if let Some(bpm) = number(obj.get("beatsPerMinute")) {
        song.tempo = tempo_from_bpm(bpm);
    }
    if let Some(reverb) = count(obj.get("reverb")) {
        song.reverb = clip(0, config::REVERB_RANGE, reverb);
    }
    if let Some(blend) = count(obj.get("blend")) {
        song.blend = clip(0, config::BLEND_RANGE, blend);
    }
    if let Some(detune) = count(obj.get("detune")) {
        song.detune = clip(0, config::DETUNE_RANGE, detune);
    }
    if let Some(riff) = read_name(obj, "riff", config::RIFFS.iter().map(|r| r.name)) {
        song.riff = riff;
    }
    if let Some(muff) = read_name(obj, "muff", config::MUFFS.iter().map(|m| m.name)) {
        song.muff = muff;
    }
    if let Some(mix) = read_name(obj, "mix", config::MIXES.iter().map(|m| m.name)) {
        song.mix = mix;
    }
    if let Some(mode) = read_name(obj, "sampleRate", config::SAMPLE_RATE_MODES.iter().map(|m| m.name)) {
        song.sample_rate = mode;
    }
    if let Some(beats) = count(obj.get("beatsPerBar")) {
        song.set_beats_per_bar(beats);
    }
    if let Some(ticks) = count(obj.get("ticksPerBeat")) {
        song.parts_per_beat = config::PART_COUNTS
            .iter()
            .copied()
            .min_by_key(|&p| p.abs_diff(ticks))
            .unwrap_or(4);
    }

    let channels = array(obj, "channels");
    let is_drum = |ch: &Value| string(ch.get("type")) == Some("drum");
    let pitch_channels: Vec<&Value> = channels.iter().filter(|ch| !is_drum(*ch)).collect();
    let drum_channels: Vec<&Value> = channels.iter().filter(|ch| is_drum(*ch)).collect();

    if !channels.is_empty() {
        let pitch = pitch_channels.len().min(PITCH_CHANNEL_COUNT_MAX);
        let drum = drum_channels.len().min(DRUM_CHANNEL_COUNT_MAX);
        song.set_channel_counts(pitch, drum);

        let largest = |field: &str| {
            channels
                .iter()
                .map(|ch| ch.get(field).and_then(Value::as_array).map_or(0, Vec::len))
                .max()
                .unwrap_or(0)
        };
        song.set_instruments_per_channel(largest("instruments").clamp(1, INSTRUMENTS_PER_CHANNEL_MAX));
        song.set_patterns_per_channel(largest("patterns").clamp(1, PATTERNS_PER_CHANNEL_MAX));
        song.set_bar_count(largest("sequence").clamp(1, BAR_COUNT_MAX));
    }

    song.loop_start = count(obj.get("introBars")).unwrap_or(0);
    song.loop_length = count(obj.get("loopBars")).unwrap_or(song.bar_count);
    song.set_bar_count(song.bar_count);

    // Drum channels always follow the pitch slots, even when the document
    // has fewer pitch channels than the song.
    let pitch_count = song.pitch_channel_count;
    let pitch_slots = pitch_channels.into_iter().take(pitch_count).enumerate();
    let drum_slots = drum_channels
        .into_iter()
        .take(song.drum_channel_count)
        .enumerate()
        .map(|(j, value)| (pitch_count + j, value));
    for (index, channel_value) in pitch_slots.chain(drum_slots) {
        let Some(channel_obj) = channel_value.as_object() else {
            continue;
        };
        load_channel(song, index, channel_obj);
    }

    let dropped = song.normalize();
    if dropped > 0 {
        debug!(dropped, "dropped malformed notes while importing JSON");
    }
    Ok(())
}

fn load_channel(song: &mut Song, index: usize, obj: &Map<String, Value>) {
    let is_drum = song.channel_is_drum(index);
    let parts_per_bar = song.parts_per_bar() as i32;
    let instrument_count = song.instruments_per_channel;
    let pattern_count = song.patterns_per_channel;
    let max_pitch = if is_drum { DRUM_COUNT - 1 } else { MAX_PITCH };
    let Some(channel) = song.channels.get_mut(index) else {
        return;
    };

    if let Some(octave) = count(obj.get("octaveScrollBar")) {
        channel.octave = clip(0, CHANNEL_OCTAVE_RANGE, octave);
    }

    for (instrument, value) in channel.instruments.iter_mut().zip(array(obj, "instruments")) {
        if let Some(inst_obj) = value.as_object() {
            load_instrument(instrument, inst_obj, is_drum);
        }
    }

    for (pattern, value) in channel.patterns.iter_mut().zip(array(obj, "patterns")) {
        let Some(pattern_obj) = value.as_object() else {
            continue;
        };
        let instrument = count(pattern_obj.get("instrument")).unwrap_or(1);
        pattern.instrument = clip(0, instrument_count, instrument.saturating_sub(1));
        for note_value in array(pattern_obj, "notes") {
            if let Some(note) = note_value.as_object().and_then(|n| load_note(n, max_pitch, parts_per_bar)) {
                pattern.notes.push(note);
            }
        }
    }

    channel.bars.fill(0);
    for (slot, value) in channel.bars.iter_mut().zip(array(obj, "sequence")) {
        let number = count(Some(value)).unwrap_or(0);
        *slot = if number > pattern_count { 0 } else { number };
    }
}

fn load_instrument(instrument: &mut Instrument, obj: &Map<String, Value>, is_drum: bool) {
    let fallback = if is_drum { InstrumentType::Noise } else { InstrumentType::Chip };
    let kind = match string(obj.get("type")).map(|name| (name, InstrumentType::from_name(name))) {
        Some((_, Some(kind))) => kind,
        Some((name, None)) => {
            debug!(name, "unknown instrument type, using the channel default");
            fallback
        }
        None => fallback,
    };
    instrument.set_type_and_reset(kind);

    if let Some(volume) = number(obj.get("volume")) {
        let steps = (config::VOLUME_RANGE - 1) as f64;
        instrument.volume = clip(0.0, steps + 1.0, ((100.0 - volume) * steps / 100.0).round()).max(0.0) as usize;
    }
    if let Some(pan) = number(obj.get("pan")) {
        let center = config::PAN_CENTER as f64;
        instrument.pan = clip(0.0, config::PAN_RANGE as f64, (pan / 100.0 * center + center).round()).max(0.0) as usize;
    }
    if let Some(muted) = obj.get("muted").and_then(Value::as_bool) {
        instrument.mute = muted;
    }
    if let Some(transition) = read_name(obj, "transition", config::TRANSITIONS.iter().map(|t| t.name)) {
        instrument.transition = transition;
    }
    let wave = match kind {
        InstrumentType::Noise => read_name(obj, "wave", config::NOISE_WAVES.iter().map(|w| w.name)),
        _ => read_name(obj, "wave", config::CHIP_WAVES.iter().map(|w| w.name)),
    };
    if let Some(wave) = wave {
        instrument.wave = wave;
    }
    if let Some(filter) = read_name(obj, "filter", config::FILTERS.iter().map(|f| f.name)) {
        instrument.filter = filter;
    }
    if let Some(effect) = read_name(obj, "effect", config::EFFECTS.iter().map(|e| e.name)) {
        instrument.effect = effect;
    }
    if let Some(chorus) = read_name(obj, "chorus", config::CHORUSES.iter().map(|c| c.name)) {
        instrument.chorus = chorus;
    }
    if let Some(harmony) = read_name(obj, "harmony", config::HARMONIES.iter().map(|h| h.name)) {
        instrument.harmony = harmony;
    }
    if let Some(octave) = number(obj.get("octave")) {
        let index = octave.round() + config::INSTRUMENT_OCTAVE_CENTER as f64;
        instrument.octave = clip(0.0, config::INSTRUMENT_OCTAVE_RANGE as f64, index).max(0.0) as usize;
    }
    if let Some(width) = read_name(obj, "pulseWidth", config::PULSE_WIDTH_NAMES.iter().copied()) {
        instrument.pulse_width = width;
    }
    let envelopes = config::ENVELOPES.iter().map(|e| e.name);
    if let Some(envelope) = read_name(obj, "pulseEnvelope", envelopes.clone()) {
        instrument.pulse_envelope = envelope;
    }
    if let Some(algorithm) = read_name(obj, "algorithm", config::ALGORITHMS.iter().map(|a| a.name)) {
        instrument.algorithm = algorithm;
    }
    if let Some(feedback) = read_name(obj, "feedbackType", config::FEEDBACKS.iter().map(|f| f.name)) {
        instrument.feedback_type = feedback;
    }
    if let Some(amplitude) = count(obj.get("feedbackAmplitude")) {
        instrument.feedback_amplitude = clip(0, config::FEEDBACK_AMPLITUDE_MAX + 1, amplitude);
    }
    if let Some(envelope) = read_name(obj, "feedbackEnvelope", envelopes.clone()) {
        instrument.feedback_envelope = envelope;
    }
    for (op, value) in instrument.operators.iter_mut().zip(array(obj, "operators")).take(OPERATOR_COUNT) {
        let Some(op_obj) = value.as_object() else {
            continue;
        };
        if let Some(frequency) = read_name(op_obj, "frequency", config::OPERATOR_FREQUENCIES.iter().map(|f| f.name)) {
            op.frequency = frequency;
        }
        if let Some(amplitude) = count(op_obj.get("amplitude")) {
            op.amplitude = clip(0, config::OPERATOR_AMPLITUDE_MAX + 1, amplitude);
        }
        if let Some(envelope) = read_name(op_obj, "envelope", envelopes.clone()) {
            op.envelope = envelope;
        }
    }
}

/// Three consecutive pins hold the same bend and volume, so the middle one
/// adds nothing.
fn redundant(a: &NotePin, b: &NotePin, c: &NotePin) -> bool {
    a.interval == b.interval && b.interval == c.interval && a.volume == b.volume && b.volume == c.volume
}

fn load_note(obj: &Map<String, Value>, max_pitch: i32, parts_per_bar: i32) -> Option<Note> {
    let mut start = 0;
    let mut start_interval = 0;
    let mut pins: Vec<NotePin> = Vec::new();
    for point in array(obj, "points") {
        let Some(point) = point.as_object() else {
            continue;
        };
        let Some(tick) = number(point.get("tick")).map(|t| t.round() as i32) else {
            continue;
        };
        let bend = number(point.get("pitchBend")).map_or(0, |b| b.round() as i32);
        let volume = number(point.get("volume")).map_or(NOTE_VOLUME_MAX, |v| {
            (v * NOTE_VOLUME_MAX as f64 / 100.0).round().clamp(0.0, NOTE_VOLUME_MAX as f64) as i32
        });

        if pins.is_empty() {
            start = tick;
            start_interval = bend;
            pins.push(NotePin::new(0, 0, volume));
            continue;
        }
        let time = tick - start;
        if pins.last().is_some_and(|last| time <= last.time) || tick > parts_per_bar {
            continue;
        }
        pins.push(NotePin::new(bend - start_interval, time, volume));
        let n = pins.len();
        if n >= 3 && redundant(&pins[n - 3], &pins[n - 2], &pins[n - 1]) {
            pins.remove(n - 2);
        }
    }
    if pins.len() < 2 {
        return None;
    }

    let mut pitches: Vec<i32> = Vec::with_capacity(MAX_CHORD_SIZE);
    for value in array(obj, "pitches") {
        let Some(pitch) = number(Some(value)) else {
            continue;
        };
        let pitch = (pitch.round() as i32 + start_interval).clamp(0, max_pitch);
        if !pitches.contains(&pitch) && pitches.len() < MAX_CHORD_SIZE {
            pitches.push(pitch);
        }
    }
    if pitches.is_empty() {
        return None;
    }

    let lowest = pitches.iter().copied().min().unwrap_or(0);
    let highest = pitches.iter().copied().max().unwrap_or(0);
    for pin in &mut pins {
        pin.interval = pin.interval.clamp(-lowest, max_pitch - highest);
    }

    let length = pins.last().map_or(0, |p| p.time);
    Some(Note {
        pitches,
        pins,
        start,
        end: start + length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_song() -> Song {
        let mut song = Song::new();
        song.set_instruments_per_channel(2);
        song.channels[0].instruments[1].set_type_and_reset(InstrumentType::Fm);
        song.channels[0].instruments[1].algorithm = 5;
        song.channels[0].instruments[1].feedback_type = 18;
        song.channels[1].instruments[0].set_type_and_reset(InstrumentType::PulseWidth);
        song.channels[1].instruments[0].pulse_width = 3;
        song.channels[0].instruments[0].volume = 3;
        song.channels[0].instruments[0].pan = 7;
        let mut chord = Note::new(48, 0, 8, 3, false);
        chord.pitches = vec![48, 52, 55];
        chord.pins = vec![NotePin::new(0, 0, 3), NotePin::new(2, 4, 2), NotePin::new(2, 8, 0)];
        song.channels[0].patterns[0].notes.push(chord);
        song.channels[0].patterns[0].instrument = 1;
        song.channels[4].patterns[0].notes.push(Note::new(3, 4, 6, 2, true));
        song.loop_start = 1;
        song.loop_length = 2;
        song
    }

    #[test]
    fn export_shape() {
        let json = export_song(&sample_song(), &ExportOptions::default());
        assert_eq!(json.format, FORMAT_NAME);
        assert_eq!(json.beats_per_minute, 120.0);
        assert_eq!(json.channels.len(), 5);
        assert_eq!(json.channels[4].kind, "drum");
        let lead = &json.channels[0];
        assert_eq!(lead.instruments[0].volume, 57);
        assert_eq!(lead.instruments[0].pan, 75);
        assert_eq!(lead.instruments[1].algorithm, Some("1←3 2←4"));
        assert_eq!(lead.instruments[1].feedback_type, Some("4→1"));
        assert!(lead.instruments[0].operators.is_none());
        assert_eq!(lead.patterns[0].instrument, 2);
        let points = &lead.patterns[0].notes[0].points;
        assert_eq!((points[1].tick, points[1].pitch_bend, points[1].volume), (4, 2, 67));
        assert_eq!(lead.sequence.len(), 16);
        assert_eq!(json.channels[1].instruments[0].pulse_width, Some("18%"));
    }

    #[test]
    fn sequence_unrolls_loops() {
        let song = sample_song();
        let options = ExportOptions {
            enable_intro: false,
            loop_count: 3,
            enable_outro: false,
        };
        assert_eq!(unrolled_bars(&song, &options), vec![1, 2, 1, 2, 1, 2]);
        let options = ExportOptions { loop_count: 2, ..ExportOptions::default() };
        let bars = unrolled_bars(&song, &options);
        assert_eq!(&bars[..5], &[0, 1, 2, 1, 2]);
        assert_eq!(bars.len(), 18);
    }

    #[test]
    fn import_restores_exported_song() {
        let song = sample_song();
        let text = to_json(&song, &ExportOptions::default()).unwrap();
        let mut loaded = Song::new();
        load_json(&mut loaded, &text).unwrap();
        assert_eq!(loaded, song);
    }

    #[test]
    fn export_import_export_is_stable() {
        let first = to_json(&sample_song(), &ExportOptions::default()).unwrap();
        let mut loaded = Song::new();
        load_json(&mut loaded, &first).unwrap();
        let second = to_json(&loaded, &ExportOptions::default()).unwrap();
        let a: Value = serde_json::from_str(&first).unwrap();
        let b: Value = serde_json::from_str(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_text_is_an_error() {
        let mut song = Song::new();
        assert!(matches!(load_json(&mut song, "{not json"), Err(SongError::Json(_))));
        load_json(&mut song, "[1, 2]").unwrap();
        assert_eq!(song, Song::new());
    }

    #[test]
    fn loose_documents_are_repaired() {
        let text = r#"{
            "scale": "no such scale",
            "key": "F#",
            "beatsPerMinute": 240,
            "reverb": 99,
            "channels": [
                {"type": "pitch", "instruments": [{"type": "theremin", "transition": "slide"}],
                 "patterns": [{"instrument": 1, "notes": [
                    {"pitches": [200, 200, 10], "points": [{"tick": 0, "pitchBend": 0, "volume": 100},
                                                         {"tick": 2, "pitchBend": 1, "volume": 100},
                                                         {"tick": 4, "pitchBend": 2, "volume": 100},
                                                         {"tick": 3, "pitchBend": 0, "volume": 50}]},
                    {"pitches": [30], "points": [{"tick": 6, "pitchBend": 0, "volume": 100}]}
                 ]}],
                 "sequence": [1, 1, 0, 99]},
                {"type": "drum", "instruments": [{"type": "FM"}], "patterns": [], "sequence": []}
            ]
        }"#;
        let mut song = Song::new();
        load_json(&mut song, text).unwrap();
        assert_eq!(song.scale, 0);
        assert_eq!(song.key, 6);
        assert_eq!(song.tempo, 16usize.min(config::TEMPO_STEPS - 1));
        assert_eq!(song.reverb, config::REVERB_RANGE - 1);
        assert_eq!((song.pitch_channel_count, song.drum_channel_count), (1, 1));
        assert_eq!(song.bar_count, 4);
        assert_eq!(song.channels[0].bars, vec![1, 1, 0, 0]);
        assert_eq!(song.channels[0].instruments[0].instrument_type, InstrumentType::Chip);
        assert_eq!(song.channels[0].instruments[0].transition, 3);
        assert_eq!(song.channels[1].instruments[0].instrument_type, InstrumentType::Noise);

        let notes = &song.channels[0].patterns[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitches, vec![MAX_PITCH, 10]);
        // the out-of-order pin was skipped; the bend clamp flattened the rest
        assert_eq!(notes[0].pins.len(), 3);
        assert_eq!(notes[0].end, 4);
        assert!(notes[0].pins.iter().all(|p| p.interval <= 0));
    }

    #[test]
    fn sloped_pins_survive_a_round_trip() {
        let mut song = Song::new();
        let mut note = Note::new(30, 0, 4, 3, false);
        note.pins = vec![NotePin::new(0, 0, 3), NotePin::new(2, 2, 2), NotePin::new(4, 4, 1)];
        song.channels[0].patterns[0].notes.push(note);

        let text = to_json(&song, &ExportOptions::default()).unwrap();
        let mut loaded = Song::new();
        load_json(&mut loaded, &text).unwrap();
        assert_eq!(loaded.channels[0].patterns[0].notes[0].pins.len(), 3);
        assert_eq!(loaded, song);
    }

    #[test]
    fn flat_pin_runs_collapse() {
        let text = r#"{"channels": [{"type": "pitch", "patterns": [{"notes": [
            {"pitches": [30], "points": [{"tick": 0, "pitchBend": 0, "volume": 100},
                                         {"tick": 2, "pitchBend": 0, "volume": 100},
                                         {"tick": 4, "pitchBend": 0, "volume": 100}]}
        ]}], "sequence": [1]}]}"#;
        let mut song = Song::new();
        load_json(&mut song, text).unwrap();
        let pins = &song.channels[0].patterns[0].notes[0].pins;
        assert_eq!(pins.len(), 2);
        assert_eq!((pins[1].time, pins[1].volume), (4, 3));
    }

    #[test]
    fn drum_only_document_loads_into_the_drum_channel() {
        let text = r#"{"channels": [{"type": "drum", "patterns": [{"notes": [
            {"pitches": [3], "points": [{"tick": 0, "pitchBend": 0, "volume": 100},
                                        {"tick": 2, "pitchBend": 0, "volume": 100}]}
        ]}], "sequence": [1]}]}"#;
        let mut song = Song::new();
        load_json(&mut song, text).unwrap();
        assert_eq!((song.pitch_channel_count, song.drum_channel_count), (1, 1));
        assert!(song.channels[0].patterns.iter().all(|p| p.notes.is_empty()));
        let drum = &song.channels[1];
        assert_eq!(drum.bars, vec![1]);
        assert_eq!(drum.patterns[0].notes.len(), 1);
        assert_eq!(drum.patterns[0].notes[0].pitches, vec![3]);
        assert_eq!(drum.instruments[0].instrument_type, InstrumentType::Noise);
    }
}
