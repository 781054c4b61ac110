//! Song data model: channels of instruments, patterns of notes, and the bar
//! table that sequences patterns over time.
//!
//! Every setting is stored as a small index into a table in [`crate::config`].
//! The structural resizers keep the invariants the codec and the engine rely
//! on, so code that edits a song should go through them rather than pushing
//! into the vectors directly.

use crate::config::{
    self, clip, BAR_COUNT_MAX, BAR_COUNT_MIN, BEATS_PER_BAR_MAX, BEATS_PER_BAR_MIN, CHANNEL_OCTAVE_RANGE,
    DRUM_CHANNEL_COUNT_MAX, DRUM_CHANNEL_COUNT_MIN, DRUM_COUNT, INSTRUMENTS_PER_CHANNEL_MAX, INSTRUMENTS_PER_CHANNEL_MIN,
    MAX_CHORD_SIZE, MAX_PITCH, NOTE_VOLUME_MAX, OPERATOR_AMPLITUDE_MAX, OPERATOR_COUNT, PATTERNS_PER_CHANNEL_MAX,
    PATTERNS_PER_CHANNEL_MIN, PITCH_CHANNEL_COUNT_MAX, PITCH_CHANNEL_COUNT_MIN,
};
use crate::error::SongError;

/// Synthesis method of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentType {
    Chip,
    Fm,
    Noise,
    PulseWidth,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 4] = [
        InstrumentType::Chip,
        InstrumentType::Fm,
        InstrumentType::Noise,
        InstrumentType::PulseWidth,
    ];

    /// The type with this serialized code.
    pub fn from_index(index: usize) -> Result<Self, SongError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(SongError::UnknownInstrumentType(index))
    }

    pub fn index(self) -> usize {
        match self {
            InstrumentType::Chip => 0,
            InstrumentType::Fm => 1,
            InstrumentType::Noise => 2,
            InstrumentType::PulseWidth => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstrumentType::Chip => "chip",
            InstrumentType::Fm => "FM",
            InstrumentType::Noise => "noise",
            InstrumentType::PulseWidth => "PWM",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

/// A control point on a note: pitch bend, time offset and volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePin {
    /// Semitones relative to the note's pitches.
    pub interval: i32,
    /// Parts since the note's start.
    pub time: i32,
    /// 0 (silent) to 3.
    pub volume: i32,
}

impl NotePin {
    pub fn new(interval: i32, time: i32, volume: i32) -> Self {
        Self { interval, time, volume }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// One to four distinct pitches, sounding together.
    pub pitches: Vec<i32>,
    /// At least two pins; the first at time 0, the last at `end - start`.
    pub pins: Vec<NotePin>,
    /// Start and end in parts within the bar.
    pub start: i32,
    pub end: i32,
}

impl Note {
    /// A single-pitch note with a flat volume, optionally fading out.
    pub fn new(pitch: i32, start: i32, end: i32, volume: i32, fade_out: bool) -> Self {
        Note {
            pitches: vec![pitch],
            pins: vec![
                NotePin::new(0, 0, volume),
                NotePin::new(0, end - start, if fade_out { 0 } else { volume }),
            ],
            start,
            end,
        }
    }

    pub fn length(&self) -> i32 {
        self.end - self.start
    }

    /// Pitch bend at the note's end.
    pub fn end_interval(&self) -> i32 {
        self.pins.last().map_or(0, |p| p.interval)
    }

    pub fn start_volume(&self) -> i32 {
        self.pins.first().map_or(0, |p| p.volume)
    }

    pub fn end_volume(&self) -> i32 {
        self.pins.last().map_or(0, |p| p.volume)
    }

    fn is_well_formed(&self, parts_per_bar: i32, max_pitch: i32) -> bool {
        if self.pitches.is_empty() || self.pitches.len() > MAX_CHORD_SIZE || self.pins.len() < 2 {
            return false;
        }
        if self.pitches.iter().any(|&p| !(0..=max_pitch).contains(&p)) {
            return false;
        }
        if self.start < 0 || self.end > parts_per_bar || self.start >= self.end {
            return false;
        }
        if self.pins[0].time != 0 || self.end_time() != Some(self.length()) {
            return false;
        }
        self.pins.windows(2).all(|w| w[0].time < w[1].time)
    }

    fn end_time(&self) -> Option<i32> {
        self.pins.last().map(|p| p.time)
    }
}

/// A bar-long sequence of non-overlapping notes played by one instrument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub instrument: usize,
    pub notes: Vec<Note>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.instrument = 0;
        self.notes.clear();
    }

    /// Drop notes that overlap, leave the bar, sit outside `0..=max_pitch`
    /// or are malformed, and clamp pin volumes. Returns how many notes were
    /// dropped.
    pub fn normalize(&mut self, parts_per_bar: i32, max_pitch: i32) -> usize {
        let before = self.notes.len();
        let mut last_end = 0;
        self.notes.retain(|note| {
            let keep = note.start >= last_end && note.is_well_formed(parts_per_bar, max_pitch);
            if keep {
                last_end = note.end;
            }
            keep
        });
        for note in &mut self.notes {
            for pin in &mut note.pins {
                pin.volume = pin.volume.clamp(0, NOTE_VOLUME_MAX);
            }
        }
        before - self.notes.len()
    }
}

/// One FM operator: frequency ratio, amplitude and envelope indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub frequency: usize,
    pub amplitude: usize,
    pub envelope: usize,
}

impl Operator {
    pub fn new(index: usize) -> Self {
        Operator {
            frequency: 0,
            amplitude: if index <= 1 { OPERATOR_AMPLITUDE_MAX } else { 0 },
            envelope: if index == 0 { 0 } else { config::ENVELOPE_STEADY },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub instrument_type: InstrumentType,
    /// Chip wave, or noise wave for noise instruments.
    pub wave: usize,
    pub filter: usize,
    pub transition: usize,
    pub effect: usize,
    pub chorus: usize,
    pub volume: usize,
    pub pan: usize,
    pub mute: bool,
    /// Octave shift index, centered on [`config::INSTRUMENT_OCTAVE_CENTER`].
    pub octave: usize,
    pub harmony: usize,
    pub pulse_width: usize,
    pub pulse_envelope: usize,
    pub algorithm: usize,
    pub feedback_type: usize,
    pub feedback_amplitude: usize,
    pub feedback_envelope: usize,
    pub operators: [Operator; OPERATOR_COUNT],
}

impl Instrument {
    pub fn new(instrument_type: InstrumentType) -> Self {
        Instrument {
            instrument_type,
            wave: 1,
            filter: 1,
            transition: 1,
            effect: 0,
            chorus: 0,
            volume: 0,
            pan: config::PAN_CENTER,
            mute: false,
            octave: config::INSTRUMENT_OCTAVE_CENTER,
            harmony: 0,
            pulse_width: 0,
            pulse_envelope: config::ENVELOPE_STEADY,
            algorithm: 0,
            feedback_type: 0,
            feedback_amplitude: 0,
            feedback_envelope: config::ENVELOPE_STEADY,
            operators: [Operator::new(0), Operator::new(1), Operator::new(2), Operator::new(3)],
        }
    }

    /// Switch synthesis type, discarding every setting of the old type.
    pub fn set_type_and_reset(&mut self, instrument_type: InstrumentType) {
        *self = Instrument::new(instrument_type);
    }

    /// Clamp every index into its table.
    pub fn clamp_settings(&mut self) {
        let wave_count = if self.instrument_type == InstrumentType::Noise {
            config::NOISE_WAVES.len()
        } else {
            config::CHIP_WAVES.len()
        };
        self.wave = clip(0, wave_count, self.wave);
        self.filter = clip(0, config::FILTERS.len(), self.filter);
        self.transition = clip(0, config::TRANSITIONS.len(), self.transition);
        self.effect = clip(0, config::EFFECTS.len(), self.effect);
        self.chorus = clip(0, config::CHORUSES.len(), self.chorus);
        self.volume = clip(0, config::VOLUME_RANGE, self.volume);
        self.pan = clip(0, config::PAN_RANGE, self.pan);
        self.octave = clip(0, config::INSTRUMENT_OCTAVE_RANGE, self.octave);
        self.harmony = clip(0, config::HARMONIES.len(), self.harmony);
        self.pulse_width = clip(0, config::PULSE_WIDTH_NAMES.len(), self.pulse_width);
        self.pulse_envelope = clip(0, config::ENVELOPES.len(), self.pulse_envelope);
        self.algorithm = clip(0, config::ALGORITHMS.len(), self.algorithm);
        self.feedback_type = clip(0, config::FEEDBACKS.len(), self.feedback_type);
        self.feedback_amplitude = clip(0, config::FEEDBACK_AMPLITUDE_MAX + 1, self.feedback_amplitude);
        self.feedback_envelope = clip(0, config::ENVELOPES.len(), self.feedback_envelope);
        for op in &mut self.operators {
            op.frequency = clip(0, config::OPERATOR_FREQUENCIES.len(), op.frequency);
            op.amplitude = clip(0, OPERATOR_AMPLITUDE_MAX + 1, op.amplitude);
            op.envelope = clip(0, config::ENVELOPES.len(), op.envelope);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Octave scroll position; also seeds the codec's pitch predictions.
    pub octave: usize,
    pub instruments: Vec<Instrument>,
    pub patterns: Vec<Pattern>,
    /// Per bar: 0 for silence, otherwise a 1-based pattern number.
    pub bars: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub scale: usize,
    pub key: usize,
    pub tempo: usize,
    pub reverb: usize,
    pub blend: usize,
    pub riff: usize,
    pub detune: usize,
    pub muff: usize,
    pub mix: usize,
    /// Output sample-rate mode, see [`config::SAMPLE_RATE_MODES`].
    pub sample_rate: usize,
    pub beats_per_bar: usize,
    pub parts_per_beat: usize,
    pub bar_count: usize,
    pub patterns_per_channel: usize,
    pub instruments_per_channel: usize,
    pub loop_start: usize,
    pub loop_length: usize,
    pub pitch_channel_count: usize,
    pub drum_channel_count: usize,
    /// Pitch channels first, then drum channels.
    pub channels: Vec<Channel>,
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

impl Song {
    pub fn new() -> Self {
        let mut song = Song {
            scale: 0,
            key: 0,
            tempo: 0,
            reverb: 0,
            blend: 0,
            riff: 0,
            detune: 0,
            muff: 0,
            mix: 0,
            sample_rate: 0,
            beats_per_bar: 0,
            parts_per_beat: 0,
            bar_count: 0,
            patterns_per_channel: 0,
            instruments_per_channel: 0,
            loop_start: 0,
            loop_length: 0,
            pitch_channel_count: 0,
            drum_channel_count: 0,
            channels: Vec::new(),
        };
        song.init_to_default(true);
        song
    }

    /// Restore the default settings, and the default channels too when asked.
    pub fn init_to_default(&mut self, and_reset_channels: bool) {
        self.scale = 0;
        self.key = 0;
        self.tempo = config::DEFAULT_TEMPO;
        self.reverb = 0;
        self.blend = 0;
        self.riff = 0;
        self.detune = config::DETUNE_CENTER;
        self.muff = 0;
        self.mix = 0;
        self.sample_rate = 0;
        self.beats_per_bar = 8;
        self.parts_per_beat = 4;
        self.loop_start = 0;
        self.loop_length = 4;

        if and_reset_channels {
            self.bar_count = 16;
            self.patterns_per_channel = 8;
            self.instruments_per_channel = 1;
            self.pitch_channel_count = 4;
            self.drum_channel_count = 1;
            let channels: Vec<Channel> = (0..self.channel_count())
                .map(|ch| {
                    let mut channel = self.new_channel(ch >= self.pitch_channel_count, ch);
                    for (bar, pattern) in channel.bars.iter_mut().enumerate() {
                        *pattern = if bar < 4 { 1 } else { 0 };
                    }
                    channel
                })
                .collect();
            self.channels = channels;
        }
    }

    fn new_channel(&self, is_drum: bool, index: usize) -> Channel {
        let instrument_type = if is_drum { InstrumentType::Noise } else { InstrumentType::Chip };
        Channel {
            octave: if is_drum { 0 } else { 4usize.saturating_sub(index) },
            instruments: (0..self.instruments_per_channel)
                .map(|_| Instrument::new(instrument_type))
                .collect(),
            patterns: (0..self.patterns_per_channel).map(|_| Pattern::new()).collect(),
            bars: vec![0; self.bar_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.pitch_channel_count + self.drum_channel_count
    }

    pub fn channel_is_drum(&self, channel: usize) -> bool {
        channel >= self.pitch_channel_count
    }

    pub fn parts_per_bar(&self) -> usize {
        self.beats_per_bar * self.parts_per_beat
    }

    pub fn beats_per_minute(&self) -> f64 {
        config::beats_per_minute(self.tempo)
    }

    /// Pattern placed at `bar`, or `None` for an empty bar.
    pub fn get_pattern(&self, channel: usize, bar: usize) -> Option<&Pattern> {
        let ch = self.channels.get(channel)?;
        match *ch.bars.get(bar)? {
            0 => None,
            number => ch.patterns.get(number - 1),
        }
    }

    pub fn get_pattern_instrument(&self, channel: usize, bar: usize) -> usize {
        self.get_pattern(channel, bar).map_or(0, |p| p.instrument)
    }

    pub fn instrument_for(&self, channel: usize, bar: usize) -> Option<&Instrument> {
        self.channels
            .get(channel)?
            .instruments
            .get(self.get_pattern_instrument(channel, bar))
    }

    /// Change the channel layout, keeping existing channels of each kind.
    pub fn set_channel_counts(&mut self, pitch: usize, drum: usize) {
        let pitch = clip(PITCH_CHANNEL_COUNT_MIN, PITCH_CHANNEL_COUNT_MAX + 1, pitch);
        let drum = clip(DRUM_CHANNEL_COUNT_MIN, DRUM_CHANNEL_COUNT_MAX + 1, drum);
        if pitch == self.pitch_channel_count && drum == self.drum_channel_count {
            return;
        }
        let mut old = std::mem::take(&mut self.channels).into_iter();
        let old_pitch: Vec<Channel> = old.by_ref().take(self.pitch_channel_count).collect();
        let old_drum: Vec<Channel> = old.collect();
        let mut old_pitch = old_pitch.into_iter();
        let mut old_drum = old_drum.into_iter();

        let mut channels = Vec::with_capacity(pitch + drum);
        for i in 0..pitch {
            channels.push(old_pitch.next().unwrap_or_else(|| self.new_channel(false, i)));
        }
        for i in 0..drum {
            channels.push(old_drum.next().unwrap_or_else(|| self.new_channel(true, pitch + i)));
        }
        self.pitch_channel_count = pitch;
        self.drum_channel_count = drum;
        self.channels = channels;
    }

    pub fn set_bar_count(&mut self, bar_count: usize) {
        self.bar_count = clip(BAR_COUNT_MIN, BAR_COUNT_MAX + 1, bar_count);
        for channel in &mut self.channels {
            channel.bars.resize(self.bar_count, 0);
        }
        self.clamp_loop();
    }

    pub fn set_patterns_per_channel(&mut self, count: usize) {
        self.patterns_per_channel = clip(PATTERNS_PER_CHANNEL_MIN, PATTERNS_PER_CHANNEL_MAX + 1, count);
        for channel in &mut self.channels {
            channel.patterns.resize_with(self.patterns_per_channel, Pattern::new);
            for bar in &mut channel.bars {
                if *bar > self.patterns_per_channel {
                    *bar = 0;
                }
            }
        }
    }

    pub fn set_instruments_per_channel(&mut self, count: usize) {
        self.instruments_per_channel = clip(INSTRUMENTS_PER_CHANNEL_MIN, INSTRUMENTS_PER_CHANNEL_MAX + 1, count);
        let pitch_count = self.pitch_channel_count;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let instrument_type = if index >= pitch_count { InstrumentType::Noise } else { InstrumentType::Chip };
            channel
                .instruments
                .resize_with(self.instruments_per_channel, || Instrument::new(instrument_type));
            for pattern in &mut channel.patterns {
                pattern.instrument = clip(0, self.instruments_per_channel, pattern.instrument);
            }
        }
    }

    pub fn set_beats_per_bar(&mut self, beats: usize) {
        self.beats_per_bar = clip(BEATS_PER_BAR_MIN, BEATS_PER_BAR_MAX + 1, beats);
    }

    fn clamp_loop(&mut self) {
        self.loop_start = clip(0, self.bar_count, self.loop_start);
        self.loop_length = clip(1, self.bar_count - self.loop_start + 1, self.loop_length);
    }

    /// Clamp every field into range and drop notes that break the pattern
    /// invariant. Returns the number of notes dropped.
    pub fn normalize(&mut self) -> usize {
        self.scale = clip(0, config::SCALES.len(), self.scale);
        self.key = clip(0, config::KEY_NAMES.len(), self.key);
        self.tempo = clip(0, config::TEMPO_STEPS, self.tempo);
        self.reverb = clip(0, config::REVERB_RANGE, self.reverb);
        self.blend = clip(0, config::BLEND_RANGE, self.blend);
        self.riff = clip(0, config::RIFFS.len(), self.riff);
        self.detune = clip(0, config::DETUNE_RANGE, self.detune);
        self.muff = clip(0, config::MUFFS.len(), self.muff);
        self.mix = clip(0, config::MIXES.len(), self.mix);
        self.sample_rate = clip(0, config::SAMPLE_RATE_MODES.len(), self.sample_rate);
        self.set_beats_per_bar(self.beats_per_bar);
        if !config::PART_COUNTS.contains(&self.parts_per_beat) {
            self.parts_per_beat = 4;
        }
        self.set_bar_count(self.bar_count);
        self.set_patterns_per_channel(self.patterns_per_channel);
        self.set_instruments_per_channel(self.instruments_per_channel);

        let parts_per_bar = self.parts_per_bar() as i32;
        let pitch_count = self.pitch_channel_count;
        let mut dropped = 0;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let is_drum = index >= pitch_count;
            channel.octave = clip(0, CHANNEL_OCTAVE_RANGE, channel.octave);
            for instrument in &mut channel.instruments {
                if is_drum && instrument.instrument_type != InstrumentType::Noise {
                    instrument.set_type_and_reset(InstrumentType::Noise);
                } else if !is_drum && instrument.instrument_type == InstrumentType::Noise {
                    instrument.set_type_and_reset(InstrumentType::Chip);
                }
                instrument.clamp_settings();
            }
            let max_pitch = if is_drum { DRUM_COUNT - 1 } else { MAX_PITCH };
            for pattern in &mut channel.patterns {
                dropped += pattern.normalize(parts_per_bar, max_pitch);
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_song_layout() {
        let song = Song::new();
        assert_eq!(song.channel_count(), 5);
        assert!(!song.channel_is_drum(3));
        assert!(song.channel_is_drum(4));
        let octaves: Vec<usize> = song.channels.iter().map(|c| c.octave).collect();
        assert_eq!(octaves, vec![4, 3, 2, 1, 0]);
        for channel in &song.channels {
            assert_eq!(channel.bars.len(), 16);
            assert_eq!(&channel.bars[..5], &[1, 1, 1, 1, 0]);
            assert_eq!(channel.patterns.len(), 8);
        }
        assert_eq!(song.beats_per_minute(), 120.0);
        assert_eq!(song.channels[4].instruments[0].instrument_type, InstrumentType::Noise);
    }

    #[test]
    fn retyping_resets_every_field() {
        let mut inst = Instrument::new(InstrumentType::Chip);
        inst.wave = 5;
        inst.harmony = 3;
        inst.operators[2].amplitude = 9;
        inst.set_type_and_reset(InstrumentType::Fm);
        assert_eq!(inst, Instrument::new(InstrumentType::Fm));
    }

    #[test]
    fn instrument_type_codes() {
        for t in InstrumentType::ALL {
            assert_eq!(InstrumentType::from_index(t.index()).unwrap(), t);
            assert_eq!(InstrumentType::from_name(t.name()), Some(t));
        }
        assert!(matches!(
            InstrumentType::from_index(4),
            Err(SongError::UnknownInstrumentType(4))
        ));
    }

    #[test]
    fn pattern_lookup_uses_one_based_numbers() {
        let mut song = Song::new();
        song.channels[0].patterns[0].instrument = 0;
        song.channels[0].patterns[0].notes.push(Note::new(12, 0, 4, 3, false));
        assert!(song.get_pattern(0, 0).is_some());
        assert!(song.get_pattern(0, 4).is_none());
        assert!(song.get_pattern(0, 99).is_none());
        assert!(song.get_pattern(9, 0).is_none());
    }

    #[test]
    fn channel_resize_keeps_existing_channels() {
        let mut song = Song::new();
        song.channels[0].octave = 2;
        song.channels[4].bars[7] = 3;
        song.set_channel_counts(6, 2);
        assert_eq!(song.channels.len(), 8);
        assert_eq!(song.channels[0].octave, 2);
        assert_eq!(song.channels[6].bars[7], 3);
        assert_eq!(song.channels[7].instruments[0].instrument_type, InstrumentType::Noise);
        assert_eq!(song.channels[5].instruments[0].instrument_type, InstrumentType::Chip);

        song.set_channel_counts(0, 9);
        assert_eq!(song.pitch_channel_count, 1);
        assert_eq!(song.drum_channel_count, 2);
    }

    #[test]
    fn shrinking_patterns_clears_dangling_bars() {
        let mut song = Song::new();
        song.channels[1].bars[2] = 8;
        song.set_patterns_per_channel(4);
        assert_eq!(song.channels[1].bars[2], 0);
        assert_eq!(song.channels[1].bars[0], 1);
    }

    #[test]
    fn shrinking_bars_clamps_loop() {
        let mut song = Song::new();
        song.loop_start = 10;
        song.loop_length = 6;
        song.set_bar_count(12);
        assert_eq!(song.loop_start, 10);
        assert_eq!(song.loop_length, 2);
        song.set_bar_count(0);
        assert_eq!(song.bar_count, 1);
        assert_eq!(song.loop_start, 0);
        assert_eq!(song.loop_length, 1);
    }

    #[test]
    fn normalize_enforces_pattern_invariant() {
        let mut pattern = Pattern::new();
        pattern.notes.push(Note::new(10, 0, 4, 3, false));
        pattern.notes.push(Note::new(11, 2, 6, 3, false)); // overlaps
        pattern.notes.push(Note::new(12, 6, 8, 3, true));
        pattern.notes.push(Note::new(13, 30, 40, 3, false)); // past the bar
        let mut bad = Note::new(14, 8, 10, 3, false);
        bad.pins.truncate(1);
        pattern.notes.push(bad);
        assert_eq!(pattern.normalize(32, MAX_PITCH), 3);
        let starts: Vec<i32> = pattern.notes.iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![0, 6]);
    }

    #[test]
    fn normalize_keeps_noise_on_drum_channels() {
        let mut song = Song::new();
        song.channels[4].instruments[0].instrument_type = InstrumentType::Chip;
        song.channels[0].instruments[0].instrument_type = InstrumentType::Noise;
        song.channels[0].instruments[0].wave = 40;
        song.normalize();
        assert_eq!(song.channels[4].instruments[0].instrument_type, InstrumentType::Noise);
        assert_eq!(song.channels[0].instruments[0].instrument_type, InstrumentType::Chip);
    }
}
