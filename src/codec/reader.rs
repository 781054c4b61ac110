//! Compact string decoder for every supported format generation.

use tracing::{debug, warn};

use super::format::{BarLayout, FormatRules, InstrumentScope, PatternLayout};
use super::tags;
use super::writer::{initial_last_pitch, initial_recent_pitches, needed_bits, SHAPE_HISTORY};
use crate::bits::{base64_value, BitFieldReader, BASE64_CHAR_TO_INT};
use crate::config::{clip, CHANNEL_OCTAVE_RANGE, MAX_CHORD_SIZE, PART_COUNTS};
use crate::error::SongError;
use crate::recency::RecencyList;
use crate::song::{Instrument, InstrumentType, Note, NotePin, Song};

/// A note's rhythm and volume contour, without its pitches.
#[derive(Debug, Clone, PartialEq)]
struct NoteShape {
    pitch_count: usize,
    bend_count: usize,
    initial_volume: i32,
    length: i32,
    pins: Vec<ShapePin>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ShapePin {
    bends: bool,
    time: i32,
    volume: i32,
}

struct HashCursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> HashCursor<'a> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.src.get(self.pos).copied();
        self.pos += 1;
        byte
    }

    /// Next symbol as a number; 0 past the end.
    fn value(&mut self) -> usize {
        self.next_byte().map_or(0, base64_value)
    }

    fn wide_value(&mut self) -> usize {
        let high = self.value();
        (high << 6) | self.value()
    }

    /// A bit reader over the next `len` symbols.
    fn bits(&mut self, len: usize) -> BitFieldReader {
        let start = self.pos;
        self.pos += len;
        BitFieldReader::new(&BASE64_CHAR_TO_INT, self.src, start, self.pos)
    }
}

struct Decoder {
    rules: FormatRules,
    /// Channel and instrument opened by the last type tag.
    typed_slot: Option<(usize, usize)>,
}

/// Replace `song` with the song encoded in `compressed`.
///
/// Strings in an unknown or unsupported version leave `song` at defaults.
pub fn load_base64(song: &mut Song, compressed: &str) -> Result<(), SongError> {
    let src = compressed.trim().trim_start_matches('#').as_bytes();
    song.init_to_default(true);
    let Some(&first) = src.first() else {
        return Ok(());
    };
    let version = match BASE64_CHAR_TO_INT.get(first as usize) {
        Some(&v) if v != crate::bits::INVALID_BASE64 => v as usize,
        _ => usize::MAX,
    };
    let Some(rules) = FormatRules::for_version(version) else {
        warn!(version, "unsupported song version, keeping defaults");
        return Ok(());
    };

    let (pitch, drum) = rules.default_channels;
    song.set_channel_counts(pitch, drum);

    let mut cursor = HashCursor { src, pos: 1 };
    let mut decoder = Decoder { rules, typed_slot: None };
    while let Some(tag) = cursor.next_byte() {
        if !decoder.apply_tag(song, tag, &mut cursor)? {
            warn!(tag = %char::from(tag), position = cursor.pos - 1, "unrecognized song tag, stopping");
            break;
        }
    }

    let dropped = song.normalize();
    if dropped > 0 {
        debug!(dropped, "dropped malformed notes while decoding");
    }
    Ok(())
}

impl Decoder {
    /// Decode one tag's payload. Returns `false` for an unknown tag.
    fn apply_tag(&mut self, song: &mut Song, tag: u8, cursor: &mut HashCursor) -> Result<bool, SongError> {
        let rules = self.rules;
        match tag {
            tags::CHANNEL_COUNT => {
                let pitch = cursor.value();
                let drum = cursor.value();
                song.set_channel_counts(pitch, drum);
            }
            tags::SCALE => song.scale = rules.scale(cursor.value()),
            tags::KEY => song.key = rules.key(cursor.value()),
            tags::LOOP_START => song.loop_start = self.bar_field(cursor),
            tags::LOOP_END => song.loop_length = self.bar_field(cursor) + 1,
            tags::TEMPO => song.tempo = rules.tempo(cursor.value()),
            tags::REVERB => song.reverb = cursor.value(),
            tags::BEAT_COUNT => song.set_beats_per_bar(rules.beats_per_bar(cursor.value())),
            tags::BAR_COUNT => {
                let bars = self.bar_field(cursor) + 1;
                song.set_bar_count(bars);
            }
            tags::PATTERN_COUNT => song.set_patterns_per_channel(cursor.value() + 1),
            tags::INSTRUMENT_COUNT => song.set_instruments_per_channel(cursor.value() + 1),
            tags::RHYTHM => song.parts_per_beat = PART_COUNTS[clip(0, PART_COUNTS.len(), cursor.value())],
            tags::BLEND => song.blend = cursor.value(),
            tags::RIFF => song.riff = cursor.value(),
            tags::DETUNE => song.detune = cursor.value(),
            tags::MUFF => song.muff = cursor.value(),
            tags::MIX => song.mix = cursor.value(),
            tags::SAMPLE_RATE => song.sample_rate = cursor.value(),
            tags::CHANNEL_OCTAVE => {
                if rules.instrument_scope == InstrumentScope::ChannelPrefixed {
                    let channel = cursor.value();
                    let octave = clip(0, CHANNEL_OCTAVE_RANGE, cursor.value());
                    if let Some(ch) = song.channels.get_mut(channel) {
                        ch.octave = octave;
                    }
                } else {
                    for ch in &mut song.channels {
                        ch.octave = clip(0, CHANNEL_OCTAVE_RANGE, cursor.value());
                    }
                }
            }
            tags::START_INSTRUMENT => {
                let instrument_type = InstrumentType::from_index(cursor.value())?;
                let slot = match self.typed_slot {
                    None => (0, 0),
                    Some((ch, i)) if i + 1 >= song.instruments_per_channel => (ch + 1, 0),
                    Some((ch, i)) => (ch, i + 1),
                };
                self.typed_slot = Some(slot);
                if let Some(instrument) = self.typed_instrument(song) {
                    instrument.set_type_and_reset(instrument_type);
                }
            }
            tags::WAVE => self.instrument_setting(song, cursor, |inst, v| inst.wave = v),
            tags::FILTER => self.instrument_setting(song, cursor, |inst, v| inst.filter = rules.filter(v)),
            tags::TRANSITION => self.instrument_setting(song, cursor, |inst, v| inst.transition = v),
            tags::EFFECT => self.instrument_setting(song, cursor, |inst, v| inst.effect = v),
            tags::CHORUS => self.instrument_setting(song, cursor, |inst, v| inst.chorus = v),
            tags::VOLUME => self.instrument_setting(song, cursor, |inst, v| inst.volume = v),
            tags::HARMONY => self.instrument_setting(song, cursor, |inst, v| inst.harmony = v),
            tags::PAN => self.instrument_setting(song, cursor, |inst, v| inst.pan = v),
            tags::MUTE => self.instrument_setting(song, cursor, |inst, v| inst.mute = v != 0),
            tags::INSTRUMENT_OCTAVE => self.instrument_setting(song, cursor, |inst, v| inst.octave = v),
            tags::PULSE_WIDTH => self.instrument_setting(song, cursor, |inst, v| inst.pulse_width = v),
            tags::PULSE_ENVELOPE => self.instrument_setting(song, cursor, |inst, v| inst.pulse_envelope = v),
            tags::ALGORITHM => self.instrument_setting(song, cursor, |inst, v| inst.algorithm = v),
            tags::FEEDBACK_TYPE => self.instrument_setting(song, cursor, |inst, v| inst.feedback_type = v),
            tags::FEEDBACK_AMPLITUDE => {
                self.instrument_setting(song, cursor, |inst, v| inst.feedback_amplitude = v)
            }
            tags::FEEDBACK_ENVELOPE => {
                self.instrument_setting(song, cursor, |inst, v| inst.feedback_envelope = v)
            }
            tags::OPERATOR_FREQUENCIES => {
                for op in 0..crate::config::OPERATOR_COUNT {
                    self.instrument_setting(song, cursor, |inst, v| inst.operators[op].frequency = v);
                }
            }
            tags::OPERATOR_AMPLITUDES => {
                for op in 0..crate::config::OPERATOR_COUNT {
                    self.instrument_setting(song, cursor, |inst, v| inst.operators[op].amplitude = v);
                }
            }
            tags::OPERATOR_ENVELOPES => {
                for op in 0..crate::config::OPERATOR_COUNT {
                    self.instrument_setting(song, cursor, |inst, v| inst.operators[op].envelope = v);
                }
            }
            tags::BARS => self.read_bars(song, cursor),
            tags::PATTERNS => self.read_patterns(song, cursor),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn bar_field(&self, cursor: &mut HashCursor) -> usize {
        if self.rules.wide_bar_fields { cursor.wide_value() } else { cursor.value() }
    }

    fn typed_instrument<'s>(&self, song: &'s mut Song) -> Option<&'s mut Instrument> {
        let (channel, index) = self.typed_slot?;
        song.channels.get_mut(channel)?.instruments.get_mut(index)
    }

    /// Read one instrument setting laid out according to the generation.
    fn instrument_setting<F>(&self, song: &mut Song, cursor: &mut HashCursor, apply: F)
    where
        F: Fn(&mut Instrument, usize),
    {
        match self.rules.instrument_scope {
            InstrumentScope::ChannelPrefixed => {
                let channel = cursor.value();
                let value = cursor.value();
                if let Some(inst) = song.channels.get_mut(channel).and_then(|c| c.instruments.first_mut()) {
                    apply(inst, value);
                }
            }
            InstrumentScope::PerChannel => {
                for channel in &mut song.channels {
                    let value = cursor.value();
                    for inst in &mut channel.instruments {
                        apply(inst, value);
                    }
                }
            }
            InstrumentScope::PerInstrument => {
                for channel in &mut song.channels {
                    for inst in &mut channel.instruments {
                        apply(inst, cursor.value());
                    }
                }
            }
            InstrumentScope::Typed => {
                let value = cursor.value();
                if let Some(inst) = self.typed_instrument(song) {
                    apply(inst, value);
                }
            }
        }
    }

    fn read_bars(&self, song: &mut Song, cursor: &mut HashCursor) {
        match self.rules.bars {
            BarLayout::PrefixedPerChannel => {
                let channel = cursor.value();
                let count = cursor.value();
                let mut bits = cursor.bits(count.div_ceil(2));
                for bar in 0..count {
                    let pattern = bits.read(3) as usize + 1;
                    if let Some(slot) = song.channels.get_mut(channel).and_then(|c| c.bars.get_mut(bar)) {
                        *slot = pattern;
                    }
                }
            }
            layout => {
                let (bit_count, offset) = if layout == BarLayout::OneBased {
                    (needed_bits(song.patterns_per_channel), 1)
                } else {
                    (needed_bits(song.patterns_per_channel + 1), 0)
                };
                let total_bits = song.channel_count() * song.bar_count * bit_count as usize;
                let mut bits = cursor.bits(total_bits.div_ceil(6));
                let bar_count = song.bar_count;
                for channel in &mut song.channels {
                    channel.bars.resize(bar_count, 0);
                    for slot in &mut channel.bars {
                        *slot = bits.read(bit_count) as usize + offset;
                    }
                }
            }
        }
    }

    fn read_patterns(&self, song: &mut Song, cursor: &mut HashCursor) {
        match self.rules.patterns {
            PatternLayout::PrefixedPerChannel => {
                let channel = cursor.value();
                // pattern count, always eight back then
                cursor.value();
                let length = cursor.wide_value();
                let mut bits = cursor.bits(length);
                if channel < song.channel_count() {
                    decode_channel_patterns(song, channel, &mut bits, self.rules.has_notes_bit);
                }
            }
            PatternLayout::Combined => {
                // lengths below the hash limit never need more than three digits
                let digits = cursor.value().min(3);
                let mut length = 0usize;
                for _ in 0..digits {
                    length = (length << 6) | cursor.value();
                }
                let mut bits = cursor.bits(length);
                for channel in 0..song.channel_count() {
                    decode_channel_patterns(song, channel, &mut bits, self.rules.has_notes_bit);
                }
            }
        }
    }
}

fn read_shape(bits: &mut BitFieldReader) -> NoteShape {
    let mut pitch_count = 1;
    while pitch_count < MAX_CHORD_SIZE && bits.read(1) == 1 {
        pitch_count += 1;
    }
    let pin_count = bits.read_pin_count();
    let initial_volume = bits.read(2) as i32;
    let mut shape = NoteShape {
        pitch_count,
        bend_count: 0,
        initial_volume,
        length: 0,
        pins: Vec::with_capacity(pin_count.clamp(0, 64) as usize),
    };
    for _ in 0..pin_count {
        let bends = bits.read(1) == 1;
        if bends {
            shape.bend_count += 1;
        }
        shape.length = shape.length.saturating_add(bits.read_part_duration() as i32);
        let volume = bits.read(2) as i32;
        shape.pins.push(ShapePin { bends, time: shape.length, volume });
        if bits.remaining() == 0 {
            break;
        }
    }
    shape
}

fn decode_channel_patterns(song: &mut Song, channel_index: usize, bits: &mut BitFieldReader, has_notes_bit: bool) {
    let is_drum = song.channel_is_drum(channel_index);
    let instrument_bits = needed_bits(song.instruments_per_channel);
    let parts_per_bar = song.parts_per_bar() as i32;
    let pattern_count = song.patterns_per_channel;
    let Some(channel) = song.channels.get_mut(channel_index) else {
        return;
    };
    let octave_offset = if is_drum { 0 } else { channel.octave as i32 * 12 };

    let mut recent_pitches = initial_recent_pitches(is_drum, octave_offset);
    let mut recent_shapes: RecencyList<NoteShape> = RecencyList::new(SHAPE_HISTORY);
    let mut last_pitch = initial_last_pitch(is_drum, octave_offset);

    for pattern in channel.patterns.iter_mut().take(pattern_count) {
        pattern.reset();
        pattern.instrument = bits.read(instrument_bits) as usize;
        if has_notes_bit && bits.read(1) == 0 {
            continue;
        }

        let mut cur_part = 0i32;
        while cur_part < parts_per_bar {
            let use_old_shape = bits.read(1) == 1;
            let shape = if use_old_shape {
                let index = bits.read_long_tail(0, 0) as usize;
                match recent_shapes.promote(index) {
                    Some(shape) => shape.clone(),
                    None => break,
                }
            } else if bits.read(1) == 1 {
                let shape = read_shape(bits);
                recent_shapes.touch(shape.clone());
                shape
            } else {
                cur_part = cur_part.saturating_add(bits.read_part_duration() as i32);
                continue;
            };

            let mut pitches = Vec::with_capacity(shape.pitch_count);
            let mut bends = Vec::with_capacity(shape.bend_count);
            for j in 0..shape.pitch_count + shape.bend_count {
                let pitch = if bits.read(1) == 1 {
                    let index = bits.read(3) as usize;
                    match recent_pitches.promote(index) {
                        Some(&pitch) => pitch,
                        None => last_pitch,
                    }
                } else {
                    let pitch = walk_interval(last_pitch, bits.read_pitch_interval(), &recent_pitches);
                    recent_pitches.touch(pitch);
                    pitch
                };
                if j < shape.pitch_count {
                    pitches.push(pitch);
                } else {
                    bends.push(pitch);
                }
                last_pitch = if j + 1 == shape.pitch_count { pitches[0] } else { pitch };
            }

            let base_pitch = pitches[0];
            let mut current = base_pitch;
            let mut bends = bends.into_iter();
            let mut pins = Vec::with_capacity(shape.pins.len() + 1);
            pins.push(NotePin::new(0, 0, shape.initial_volume));
            for pin in &shape.pins {
                if pin.bends {
                    current = bends.next().unwrap_or(current);
                }
                pins.push(NotePin::new(current - base_pitch, pin.time, pin.volume));
            }

            pattern.notes.push(Note {
                pitches,
                pins,
                start: cur_part,
                end: cur_part.saturating_add(shape.length),
            });
            cur_part = cur_part.saturating_add(shape.length);
        }
    }
}

/// Inverse of the encoder's interval count: step from `from`, skipping
/// pitches in the recency list.
fn walk_interval(from: i32, interval: i64, recent: &RecencyList<i32>) -> i32 {
    let mut pitch = from;
    let mut remaining = interval.clamp(-256, 256);
    while remaining > 0 {
        pitch += 1;
        while recent.contains(&pitch) {
            pitch += 1;
        }
        remaining -= 1;
    }
    while remaining < 0 {
        pitch -= 1;
        while recent.contains(&pitch) {
            pitch -= 1;
        }
        remaining += 1;
    }
    pitch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::to_base64;
    use crate::config::{self, TEMPO_STEPS};

    fn decode(hash: &str) -> Song {
        let mut song = Song::new();
        load_base64(&mut song, hash).unwrap();
        song
    }

    fn round_trip(song: &Song) -> Song {
        let hash = to_base64(song).unwrap();
        let decoded = decode(&hash);
        assert_eq!(&decoded, song, "round trip changed the song, hash {hash}");
        decoded
    }

    fn melody_song() -> Song {
        let mut song = Song::new();
        let pattern = &mut song.channels[0].patterns[0];
        pattern.notes.push(Note::new(48, 0, 4, 3, false));
        pattern.notes.push(Note::new(52, 4, 8, 2, true));
        let mut chord = Note::new(55, 10, 16, 3, false);
        chord.pitches = vec![55, 59, 62, 67];
        chord.pins = vec![NotePin::new(0, 0, 3), NotePin::new(2, 3, 2), NotePin::new(-1, 6, 1)];
        pattern.notes.push(chord);
        pattern.notes.push(Note::new(48, 20, 24, 3, false));
        song.channels[1].patterns[2].notes.push(Note::new(30, 0, 32, 1, true));
        song.channels[1].bars[5] = 3;
        song.channels[4].patterns[0].notes.push(Note::new(4, 0, 2, 3, true));
        song.channels[4].patterns[0].notes.push(Note::new(11, 2, 4, 3, true));
        song
    }

    #[test]
    fn default_song_round_trips() {
        round_trip(&Song::new());
    }

    #[test]
    fn notes_chords_and_bends_round_trip() {
        round_trip(&melody_song());
    }

    #[test]
    fn every_instrument_type_and_harmony_round_trips() {
        let mut song = melody_song();
        song.set_instruments_per_channel(4);
        for (i, t) in [InstrumentType::Chip, InstrumentType::Fm, InstrumentType::PulseWidth]
            .into_iter()
            .enumerate()
        {
            let inst = &mut song.channels[0].instruments[i];
            inst.set_type_and_reset(t);
            inst.transition = 3;
            inst.effect = 2;
            inst.volume = 4;
            inst.pan = 1;
            inst.mute = i == 2;
            inst.harmony = i + 2;
        }
        song.channels[0].instruments[0].wave = 7;
        song.channels[0].instruments[0].chorus = 5;
        song.channels[0].instruments[0].octave = 4;
        song.channels[0].instruments[0].filter = 6;
        let fm = &mut song.channels[0].instruments[1];
        fm.algorithm = 5;
        fm.feedback_type = 18;
        fm.feedback_amplitude = 9;
        fm.feedback_envelope = 7;
        fm.operators[3].frequency = 14;
        fm.operators[2].amplitude = 11;
        fm.operators[1].envelope = 12;
        let pwm = &mut song.channels[0].instruments[2];
        pwm.pulse_width = 5;
        pwm.pulse_envelope = 4;
        song.channels[0].patterns[0].instrument = 1;
        song.channels[0].patterns[1].instrument = 3;
        song.channels[4].instruments[1].wave = 4;
        song.channels[4].instruments[2].transition = 7;
        round_trip(&song);

        for harmony in 0..config::HARMONIES.len() {
            let mut song = melody_song();
            song.channels[2].instruments[0].harmony = harmony;
            round_trip(&song);
        }
    }

    #[test]
    fn globals_round_trip() {
        let mut song = melody_song();
        song.scale = 11;
        song.key = 9;
        song.tempo = TEMPO_STEPS - 1;
        song.reverb = 3;
        song.blend = 2;
        song.riff = 3;
        song.detune = 20;
        song.muff = 1;
        song.mix = 2;
        song.sample_rate = 3;
        song.parts_per_beat = 8;
        song.set_beats_per_bar(5);
        song.set_bar_count(100);
        song.loop_start = 70;
        song.loop_length = 30;
        song.channels[3].bars[99] = 8;
        song.set_channel_counts(6, 2);
        round_trip(&song);
    }

    #[test]
    fn repeated_shapes_and_pitches_round_trip() {
        let mut song = Song::new();
        for (p, pattern) in song.channels[0].patterns.iter_mut().enumerate() {
            for i in 0..16 {
                let pitch = 36 + ((i * 7 + p * 3) % 24) as i32;
                pattern.notes.push(Note::new(pitch, i as i32 * 2, i as i32 * 2 + 2, 3, i % 3 == 0));
            }
        }
        round_trip(&song);
    }

    #[test]
    fn unsupported_versions_keep_defaults() {
        for hash in ["1n31", "8n31", "!n31", "zzzz"] {
            assert_eq!(decode(hash), Song::new(), "decoding {hash}");
        }
        assert_eq!(decode(""), Song::new());
    }

    #[test]
    fn unknown_instrument_type_is_fatal() {
        let mut song = Song::new();
        let err = load_base64(&mut song, "7n41T9").unwrap_err();
        assert!(matches!(err, SongError::UnknownInstrumentType(9)));
    }

    #[test]
    fn out_of_range_fields_are_clipped() {
        let song = decode("7s_t_m_k_");
        assert_eq!(song.scale, config::SCALES.len() - 1);
        assert_eq!(song.tempo, TEMPO_STEPS - 1);
        assert_eq!(song.reverb, config::REVERB_RANGE - 1);
        assert_eq!(song.key, config::KEY_NAMES.len() - 1);
    }

    #[test]
    fn legacy_generations_decode_their_own_layouts() {
        let v2 = decode("2t2a2s9k0w02");
        assert_eq!(v2.pitch_channel_count, 3);
        assert_eq!(v2.tempo, 7);
        assert_eq!(v2.beats_per_bar, 8);
        assert_eq!(v2.scale, 9);
        assert_eq!(v2.key, 11);
        assert_eq!(v2.channels[0].instruments[0].wave, 2);
        assert_eq!(v2.channels[1].instruments[0].wave, 1);

        let v3 = decode("3t3w1234");
        assert_eq!(v3.tempo, 10);
        let waves: Vec<usize> = v3.channels.iter().map(|c| c.instruments[0].wave).collect();
        assert_eq!(waves, vec![1, 2, 3, 4]);

        let v5 = decode("5l01e03g0f");
        assert_eq!(v5.loop_start, 1);
        assert_eq!(v5.loop_length, 4);
        assert_eq!(v5.bar_count, 16);

        let v6 = decode("6n21i1v123456");
        let volumes: Vec<usize> = v6
            .channels
            .iter()
            .flat_map(|c| c.instruments.iter().map(|i| i.volume))
            .collect();
        assert_eq!(volumes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn legacy_bars_are_one_based() {
        // generation 4: 8 patterns need 3 bits, 4 channels x 16 bars
        let mut hash = String::from("4b");
        hash.push_str(&"0".repeat(32));
        let song = decode(&hash);
        assert!(song.channels.iter().all(|c| c.bars.iter().all(|&b| b == 1)));
    }

    #[test]
    fn notes_leaving_the_bar_are_dropped() {
        let mut song = Song::new();
        song.channels[0].patterns[0].notes.push(Note::new(48, 0, 4, 3, false));
        song.channels[0].patterns[0].notes.push(Note::new(50, 28, 36, 3, false));
        song.channels[0].patterns[1].notes.push(Note::new(40, 8, 12, 2, false));
        let decoded = decode(&to_base64(&song).unwrap());
        assert_eq!(decoded.channels[0].patterns[0].notes.len(), 1);
        assert_eq!(decoded.channels[0].patterns[0].notes[0].pitches, vec![48]);
        assert_eq!(decoded.channels[0].patterns[1], song.channels[0].patterns[1]);
    }

    #[test]
    fn truncated_strings_degrade() {
        let hash = to_base64(&melody_song()).unwrap();
        for cut in [1, 10, hash.len() / 2, hash.len() - 3] {
            let mut song = Song::new();
            assert!(load_base64(&mut song, &hash[..cut]).is_ok());
        }
    }

    #[test]
    fn interval_walk_skips_predictions() {
        let recent = RecencyList::with_items(8, [13, 14]);
        assert_eq!(walk_interval(12, 2, &recent), 16);
        assert_eq!(walk_interval(16, -2, &recent), 12);
    }
}
