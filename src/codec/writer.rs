//! Compact string encoder. Always writes the latest format generation.

use super::format::VERSION_LATEST;
use super::tags;
use crate::bits::{BitFieldWriter, BASE64_INT_TO_CHAR};
use crate::config::PART_COUNTS;
use crate::error::SongError;
use crate::recency::RecencyList;
use crate::song::{Instrument, InstrumentType, Song};

/// Encoded songs must stay below this many characters.
pub const MAX_HASH_LENGTH: usize = 65535;

pub(crate) const PITCH_HISTORY: usize = 8;
pub(crate) const SHAPE_HISTORY: usize = 10;

/// Pitch predictions a channel starts from.
pub(crate) fn initial_recent_pitches(is_drum: bool, octave_offset: i32) -> RecencyList<i32> {
    if is_drum {
        RecencyList::with_items(PITCH_HISTORY, [4, 6, 7, 2, 3, 8, 0, 10])
    } else {
        RecencyList::with_items(
            PITCH_HISTORY,
            [12, 19, 24, 31, 36, 7, 0].into_iter().map(|p| p + octave_offset),
        )
    }
}

pub(crate) fn initial_last_pitch(is_drum: bool, octave_offset: i32) -> i32 {
    if is_drum { 4 } else { 12 + octave_offset }
}

/// Bits needed to store values `0..count`.
pub(crate) fn needed_bits(count: usize) -> u32 {
    let mut bits = 0;
    while (1usize << bits) < count {
        bits += 1;
    }
    bits
}

#[inline]
fn push_value(out: &mut Vec<u8>, value: usize) {
    out.push(BASE64_INT_TO_CHAR[value.min(63)]);
}

fn push_wide(out: &mut Vec<u8>, value: usize) {
    push_value(out, (value >> 6) & 63);
    push_value(out, value & 63);
}

fn push_tag(out: &mut Vec<u8>, tag: u8, value: usize) {
    out.push(tag);
    push_value(out, value);
}

pub fn to_base64(song: &Song) -> Result<String, SongError> {
    let mut out: Vec<u8> = Vec::with_capacity(2048);
    push_value(&mut out, VERSION_LATEST);

    out.push(tags::CHANNEL_COUNT);
    push_value(&mut out, song.pitch_channel_count);
    push_value(&mut out, song.drum_channel_count);
    push_tag(&mut out, tags::SCALE, song.scale);
    push_tag(&mut out, tags::KEY, song.key);
    out.push(tags::LOOP_START);
    push_wide(&mut out, song.loop_start);
    out.push(tags::LOOP_END);
    push_wide(&mut out, song.loop_length.saturating_sub(1));
    push_tag(&mut out, tags::TEMPO, song.tempo);
    push_tag(&mut out, tags::REVERB, song.reverb);
    push_tag(&mut out, tags::BEAT_COUNT, song.beats_per_bar.saturating_sub(1));
    out.push(tags::BAR_COUNT);
    push_wide(&mut out, song.bar_count.saturating_sub(1));
    push_tag(&mut out, tags::PATTERN_COUNT, song.patterns_per_channel.saturating_sub(1));
    push_tag(&mut out, tags::INSTRUMENT_COUNT, song.instruments_per_channel.saturating_sub(1));
    let rhythm = PART_COUNTS.iter().position(|&p| p == song.parts_per_beat).unwrap_or(1);
    push_tag(&mut out, tags::RHYTHM, rhythm);
    push_tag(&mut out, tags::BLEND, song.blend);
    push_tag(&mut out, tags::RIFF, song.riff);
    push_tag(&mut out, tags::DETUNE, song.detune);
    push_tag(&mut out, tags::MUFF, song.muff);
    push_tag(&mut out, tags::MIX, song.mix);
    push_tag(&mut out, tags::SAMPLE_RATE, song.sample_rate);

    out.push(tags::CHANNEL_OCTAVE);
    for channel in &song.channels {
        push_value(&mut out, channel.octave);
    }

    for channel in &song.channels {
        for instrument in channel.instruments.iter().take(song.instruments_per_channel) {
            write_instrument(&mut out, instrument);
        }
    }

    let bar_bits = needed_bits(song.patterns_per_channel + 1);
    let mut bits = BitFieldWriter::new();
    for channel in &song.channels {
        for bar in 0..song.bar_count {
            let pattern = channel.bars.get(bar).copied().unwrap_or(0);
            bits.write(bar_bits, pattern as u32);
        }
    }
    out.push(tags::BARS);
    bits.encode_base64(&mut out);

    let mut bits = BitFieldWriter::new();
    for channel in 0..song.channel_count() {
        encode_channel_patterns(song, channel, &mut bits)?;
    }
    let mut length = bits.length_base64();
    let mut digits = Vec::new();
    while length > 0 {
        digits.push(length & 63);
        length >>= 6;
    }
    out.push(tags::PATTERNS);
    push_value(&mut out, digits.len());
    for &digit in digits.iter().rev() {
        push_value(&mut out, digit);
    }
    bits.encode_base64(&mut out);

    if out.len() >= MAX_HASH_LENGTH {
        return Err(SongError::HashTooLong(out.len()));
    }
    Ok(out.into_iter().map(char::from).collect())
}

fn write_instrument(out: &mut Vec<u8>, instrument: &Instrument) {
    push_tag(out, tags::START_INSTRUMENT, instrument.instrument_type.index());
    match instrument.instrument_type {
        InstrumentType::Chip => {
            push_tag(out, tags::WAVE, instrument.wave);
            push_tag(out, tags::FILTER, instrument.filter);
            push_tag(out, tags::TRANSITION, instrument.transition);
            push_tag(out, tags::EFFECT, instrument.effect);
            push_tag(out, tags::CHORUS, instrument.chorus);
            push_tag(out, tags::HARMONY, instrument.harmony);
            push_tag(out, tags::INSTRUMENT_OCTAVE, instrument.octave);
        }
        InstrumentType::PulseWidth => {
            push_tag(out, tags::PULSE_WIDTH, instrument.pulse_width);
            push_tag(out, tags::PULSE_ENVELOPE, instrument.pulse_envelope);
            push_tag(out, tags::FILTER, instrument.filter);
            push_tag(out, tags::TRANSITION, instrument.transition);
            push_tag(out, tags::EFFECT, instrument.effect);
            push_tag(out, tags::CHORUS, instrument.chorus);
            push_tag(out, tags::HARMONY, instrument.harmony);
            push_tag(out, tags::INSTRUMENT_OCTAVE, instrument.octave);
        }
        InstrumentType::Fm => {
            push_tag(out, tags::TRANSITION, instrument.transition);
            push_tag(out, tags::EFFECT, instrument.effect);
            push_tag(out, tags::ALGORITHM, instrument.algorithm);
            push_tag(out, tags::FEEDBACK_TYPE, instrument.feedback_type);
            push_tag(out, tags::FEEDBACK_AMPLITUDE, instrument.feedback_amplitude);
            push_tag(out, tags::FEEDBACK_ENVELOPE, instrument.feedback_envelope);
            out.push(tags::OPERATOR_FREQUENCIES);
            for op in &instrument.operators {
                push_value(out, op.frequency);
            }
            out.push(tags::OPERATOR_AMPLITUDES);
            for op in &instrument.operators {
                push_value(out, op.amplitude);
            }
            out.push(tags::OPERATOR_ENVELOPES);
            for op in &instrument.operators {
                push_value(out, op.envelope);
            }
            push_tag(out, tags::HARMONY, instrument.harmony);
            push_tag(out, tags::INSTRUMENT_OCTAVE, instrument.octave);
        }
        InstrumentType::Noise => {
            push_tag(out, tags::WAVE, instrument.wave);
            push_tag(out, tags::TRANSITION, instrument.transition);
        }
    }
    push_tag(out, tags::VOLUME, instrument.volume);
    push_tag(out, tags::PAN, instrument.pan);
    push_tag(out, tags::MUTE, instrument.mute as usize);
}

fn encode_channel_patterns(song: &Song, channel_index: usize, bits: &mut BitFieldWriter) -> Result<(), SongError> {
    let channel = &song.channels[channel_index];
    let is_drum = song.channel_is_drum(channel_index);
    let octave_offset = if is_drum { 0 } else { channel.octave as i32 * 12 };
    let instrument_bits = needed_bits(song.instruments_per_channel);
    let parts_per_bar = song.parts_per_bar() as i32;

    let mut recent_pitches = initial_recent_pitches(is_drum, octave_offset);
    let mut recent_shapes: RecencyList<String> = RecencyList::new(SHAPE_HISTORY);
    let mut last_pitch = initial_last_pitch(is_drum, octave_offset);
    let mut shape_bits = BitFieldWriter::new();
    let mut pitch_bends: Vec<i32> = Vec::new();

    for pattern in channel.patterns.iter().take(song.patterns_per_channel) {
        bits.write(instrument_bits, pattern.instrument as u32);
        if pattern.notes.is_empty() {
            bits.write(1, 0);
            continue;
        }
        bits.write(1, 1);

        let mut cur_part = 0;
        for note in &pattern.notes {
            if note.start > cur_part {
                bits.write(2, 0b00);
                bits.write_part_duration((note.start - cur_part) as i64)?;
            }

            shape_bits.clear();
            pitch_bends.clear();
            for _ in 1..note.pitches.len() {
                shape_bits.write(1, 1);
            }
            if note.pitches.len() < crate::config::MAX_CHORD_SIZE {
                shape_bits.write(1, 0);
            }
            shape_bits.write_pin_count(note.pins.len() as i64 - 1)?;
            shape_bits.write(2, note.start_volume() as u32);

            let start_pitch = note.pitches.first().copied().unwrap_or(0);
            let mut current_pitch = start_pitch;
            let mut shape_part = 0;
            for pin in note.pins.iter().skip(1) {
                let pitch = start_pitch + pin.interval;
                if current_pitch != pitch {
                    shape_bits.write(1, 1);
                    pitch_bends.push(pitch);
                    current_pitch = pitch;
                } else {
                    shape_bits.write(1, 0);
                }
                shape_bits.write_part_duration((pin.time - shape_part) as i64)?;
                shape_part = pin.time;
                shape_bits.write(2, pin.volume as u32);
            }

            let shape_key = shape_bits.to_bit_string();
            match recent_shapes.position(&shape_key) {
                Some(index) => {
                    bits.write(1, 1);
                    bits.write_long_tail(0, 0, index as i64)?;
                    recent_shapes.promote(index);
                }
                None => {
                    bits.write(2, 0b01);
                    bits.concat(&shape_bits);
                    recent_shapes.touch(shape_key);
                }
            }

            let chord_size = note.pitches.len();
            for (i, &pitch) in note.pitches.iter().chain(pitch_bends.iter()).enumerate() {
                match recent_pitches.position(&pitch) {
                    Some(index) => {
                        bits.write(1, 1);
                        bits.write(3, index as u32);
                        recent_pitches.promote(index);
                    }
                    None => {
                        // `last_pitch` is always in the list and `pitch` is not,
                        // so the step onto `pitch` counts and the interval is never 0.
                        let interval = pitch_interval(last_pitch, pitch, &recent_pitches);
                        debug_assert_ne!(interval, 0, "pitch {pitch} not in the recency list");
                        bits.write(1, 0);
                        bits.write_pitch_interval(interval)?;
                        recent_pitches.touch(pitch);
                    }
                }
                last_pitch = if i + 1 == chord_size { start_pitch } else { pitch };
            }

            cur_part = note.end;
        }

        if cur_part < parts_per_bar {
            bits.write(2, 0b00);
            bits.write_part_duration((parts_per_bar - cur_part) as i64)?;
        }
    }
    Ok(())
}

/// Semitone steps from `from` to `to`, skipping pitches the decoder can
/// already reach through the recency list.
fn pitch_interval(from: i32, to: i32, recent: &RecencyList<i32>) -> i64 {
    let mut interval = 0i64;
    let mut pitch = from;
    while pitch < to {
        pitch += 1;
        if !recent.contains(&pitch) {
            interval += 1;
        }
    }
    while pitch > to {
        pitch -= 1;
        if !recent.contains(&pitch) {
            interval -= 1;
        }
    }
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{Note, NotePin};

    #[test]
    fn default_song_starts_with_latest_version() {
        let hash = to_base64(&Song::new()).unwrap();
        assert!(hash.starts_with('7'), "got {hash}");
        assert!(hash.starts_with("7n41s0k0l00e03t7m0a7g0fj7i0r1"), "got {hash}");
        assert!(hash.contains("o43210"));
    }

    #[test]
    fn needed_bits_covers_count() {
        assert_eq!(needed_bits(1), 0);
        assert_eq!(needed_bits(2), 1);
        assert_eq!(needed_bits(9), 4);
        assert_eq!(needed_bits(8), 3);
    }

    #[test]
    fn intervals_skip_predicted_pitches() {
        let recent = RecencyList::with_items(8, [13, 14]);
        assert_eq!(pitch_interval(12, 16, &recent), 2);
        assert_eq!(pitch_interval(16, 12, &recent), -2);
        assert_eq!(pitch_interval(12, 12, &recent), 0);
    }

    #[test]
    fn single_pin_notes_are_rejected() {
        let mut song = Song::new();
        let mut note = Note::new(24, 0, 4, 3, false);
        note.pins = vec![NotePin::new(0, 0, 3)];
        song.channels[0].patterns[0].notes.push(note);
        assert!(matches!(to_base64(&song), Err(SongError::LongTailUnderflow { .. })));
    }

    #[test]
    fn oversized_songs_are_rejected() {
        let mut song = Song::new();
        song.set_channel_counts(6, 2);
        song.set_patterns_per_channel(64);
        song.set_bar_count(256);
        let mut seed = 12345u32;
        let mut next_pitch = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            ((seed >> 16) % 70) as i32
        };
        for channel in &mut song.channels {
            for pattern in &mut channel.patterns {
                for i in 0..32 {
                    let p = next_pitch();
                    let mut note = Note::new(p, i, i + 1, 3, false);
                    note.pitches = vec![p, p + 1, p + 2, p + 3];
                    note.pins[1].interval = next_pitch() % 5 + 1;
                    pattern.notes.push(note);
                }
            }
        }
        assert!(matches!(to_base64(&song), Err(SongError::HashTooLong(_))));
    }

    #[test]
    fn intervals_to_unlisted_pitches_are_never_zero() {
        let recent = initial_recent_pitches(false, 0);
        let last = initial_last_pitch(false, 0);
        for pitch in 0..=crate::config::MAX_PITCH {
            if !recent.contains(&pitch) {
                assert_ne!(pitch_interval(last, pitch, &recent), 0, "pitch {pitch}");
            }
        }
        assert_eq!(pitch_interval(12, 13, &recent), 1);
        assert_eq!(pitch_interval(12, 6, &recent), -5);
    }
}
