//! Static parameter tables shared by the codec, the resolver and the kernels.
//!
//! Every table is indexed by the small integers stored in a [`Song`], so the
//! order of entries is part of the song format and must never change.
//!
//! [`Song`]: crate::song::Song

use std::ops::Sub;

/// Clamp `value` into the half-open range `[min, max)`.
///
/// Values below `min` become `min`, values at or above `max` become `max - 1`.
pub fn clip<T>(min: T, max: T, value: T) -> T
where
    T: PartialOrd + Copy + Sub<Output = T> + From<u8>,
{
    if value < min {
        min
    } else if value >= max {
        max - T::from(1)
    } else {
        value
    }
}

// ── Song structure ──────────────────────────────────────────

pub const PITCH_CHANNEL_COUNT_MIN: usize = 1;
pub const PITCH_CHANNEL_COUNT_MAX: usize = 6;
pub const DRUM_CHANNEL_COUNT_MIN: usize = 0;
pub const DRUM_CHANNEL_COUNT_MAX: usize = 2;

pub const BEATS_PER_BAR_MIN: usize = 3;
pub const BEATS_PER_BAR_MAX: usize = 16;
pub const BAR_COUNT_MIN: usize = 1;
pub const BAR_COUNT_MAX: usize = 256;
pub const PATTERNS_PER_CHANNEL_MIN: usize = 1;
pub const PATTERNS_PER_CHANNEL_MAX: usize = 64;
pub const INSTRUMENTS_PER_CHANNEL_MIN: usize = 1;
pub const INSTRUMENTS_PER_CHANNEL_MAX: usize = 10;

/// Parts-per-beat choices, selected by the song's rhythm index.
pub const PART_COUNTS: [usize; 4] = [3, 4, 6, 8];
/// Ticks (arpeggio steps) per part.
pub const TICKS_PER_PART: usize = 4;

pub const MAX_PITCH: i32 = 84;
pub const DRUM_COUNT: i32 = 12;
pub const MAX_CHORD_SIZE: usize = 4;
pub const NOTE_VOLUME_MAX: i32 = 3;
/// Channel octave scroll positions `0..CHANNEL_OCTAVE_RANGE`.
pub const CHANNEL_OCTAVE_RANGE: usize = 5;

// ── Global song settings ────────────────────────────────────

pub struct Scale {
    pub name: &'static str,
    pub flags: [bool; 12],
}

const fn scale(name: &'static str, bits: u16) -> Scale {
    let mut flags = [false; 12];
    let mut i = 0;
    while i < 12 {
        flags[i] = bits & (1 << (11 - i)) != 0;
        i += 1;
    }
    Scale { name, flags }
}

pub const SCALES: &[Scale] = &[
    scale("easy :)", 0b1010_1001_0100),
    scale("easy :(", 0b1001_0101_0010),
    scale("island :)", 0b1000_1101_0001),
    scale("island :(", 0b1101_0001_1000),
    scale("blues :)", 0b1011_1001_0100),
    scale("blues :(", 0b1001_0111_0010),
    scale("normal :)", 0b1010_1101_0101),
    scale("normal :(", 0b1011_0101_1010),
    scale("dbl harmonic :)", 0b1100_1101_1001),
    scale("dbl harmonic :(", 0b1011_0011_1001),
    scale("strange", 0b1010_1010_1010),
    scale("expert", 0b1111_1111_1111),
];

pub const KEY_NAMES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Pitch 0 of key C sounds at MIDI note 12.
pub const KEY_BASE_PITCH: i32 = 12;

pub const TEMPO_STEPS: usize = 15;
pub const DEFAULT_TEMPO: usize = 7;

/// Beats per minute for a tempo index.
pub fn beats_per_minute(tempo: usize) -> f64 {
    (120.0 * 2f64.powf((tempo as f64 - DEFAULT_TEMPO as f64) / 9.0)).round()
}

/// Nearest tempo index for a beats-per-minute value.
pub fn tempo_from_bpm(bpm: f64) -> usize {
    if !bpm.is_finite() || bpm <= 0.0 {
        return DEFAULT_TEMPO;
    }
    let index = (DEFAULT_TEMPO as f64 + 9.0 * (bpm / 120.0).log2()).round();
    clip(0.0, TEMPO_STEPS as f64, index).max(0.0) as usize
}

pub const REVERB_RANGE: usize = 4;

/// Wet level of the master reverb for a reverb index.
pub fn reverb_amount(reverb: usize) -> f64 {
    (reverb as f64 / (REVERB_RANGE - 1) as f64).powf(0.667) * 0.425
}

pub const BLEND_RANGE: usize = 4;

pub const DETUNE_RANGE: usize = 25;
pub const DETUNE_CENTER: usize = 12;

/// Global detune in semitones, between -0.5 and 0.5.
pub fn detune_semitones(detune: usize) -> f64 {
    (detune as f64 - DETUNE_CENTER as f64) / (2 * DETUNE_CENTER) as f64
}

pub struct RiffSpeed {
    pub name: &'static str,
    pub divisor: usize,
}

pub const RIFFS: &[RiffSpeed] = &[
    RiffSpeed { name: "fast", divisor: 1 },
    RiffSpeed { name: "medium", divisor: 2 },
    RiffSpeed { name: "slow", divisor: 4 },
    RiffSpeed { name: "crawl", divisor: 8 },
];

pub struct MuffSpec {
    pub name: &'static str,
    /// Master low-pass cutoff in Hz; `None` leaves the mix untouched.
    pub cutoff: Option<f64>,
}

pub const MUFFS: &[MuffSpec] = &[
    MuffSpec { name: "off", cutoff: None },
    MuffSpec { name: "light", cutoff: Some(8000.0) },
    MuffSpec { name: "medium", cutoff: Some(4000.0) },
    MuffSpec { name: "heavy", cutoff: Some(1800.0) },
];

pub struct MixSpec {
    pub name: &'static str,
    pub pitch_gain: f64,
    pub drum_gain: f64,
}

pub const MIXES: &[MixSpec] = &[
    MixSpec { name: "Type A", pitch_gain: 1.0, drum_gain: 1.0 },
    MixSpec { name: "Type B", pitch_gain: 1.0, drum_gain: 1.4 },
    MixSpec { name: "Type C", pitch_gain: 0.8, drum_gain: 1.8 },
];

pub struct SampleRateMode {
    pub name: &'static str,
    /// Output is held for this many samples at a time.
    pub decimation: usize,
}

pub const SAMPLE_RATE_MODES: &[SampleRateMode] = &[
    SampleRateMode { name: "full", decimation: 1 },
    SampleRateMode { name: "half", decimation: 2 },
    SampleRateMode { name: "quarter", decimation: 4 },
    SampleRateMode { name: "eighth", decimation: 8 },
];

// ── Instrument settings ─────────────────────────────────────

pub const VOLUME_RANGE: usize = 8;

/// Linear gain for an instrument volume index; the last step is silent.
pub fn volume_mult(volume: usize) -> f64 {
    if volume >= VOLUME_RANGE - 1 {
        0.0
    } else {
        2f64.powf(-(volume as f64) * 0.5)
    }
}

pub const PAN_RANGE: usize = 9;
pub const PAN_CENTER: usize = 4;

/// (left, right) gains for a pan index.
pub fn pan_gains(pan: usize) -> (f64, f64) {
    let pan = clip(0, PAN_RANGE, pan) as f64;
    let center = PAN_CENTER as f64;
    (
        ((2.0 * center - pan) / center).min(1.0),
        (pan / center).min(1.0),
    )
}

/// Instrument octave offsets `0..INSTRUMENT_OCTAVE_RANGE`, centered.
pub const INSTRUMENT_OCTAVE_RANGE: usize = 5;
pub const INSTRUMENT_OCTAVE_CENTER: usize = 2;

pub struct ChipWave {
    pub name: &'static str,
    pub volume: f64,
    pub samples: &'static [f64],
}

pub const CHIP_WAVES: &[ChipWave] = &[
    ChipWave {
        name: "triangle",
        volume: 1.0,
        samples: &[
            1.0 / 15.0, 3.0 / 15.0, 5.0 / 15.0, 7.0 / 15.0, 9.0 / 15.0, 11.0 / 15.0, 13.0 / 15.0, 1.0,
            1.0, 13.0 / 15.0, 11.0 / 15.0, 9.0 / 15.0, 7.0 / 15.0, 5.0 / 15.0, 3.0 / 15.0, 1.0 / 15.0,
            -1.0 / 15.0, -3.0 / 15.0, -5.0 / 15.0, -7.0 / 15.0, -9.0 / 15.0, -11.0 / 15.0, -13.0 / 15.0, -1.0,
            -1.0, -13.0 / 15.0, -11.0 / 15.0, -9.0 / 15.0, -7.0 / 15.0, -5.0 / 15.0, -3.0 / 15.0, -1.0 / 15.0,
        ],
    },
    ChipWave { name: "square", volume: 0.5, samples: &[1.0, -1.0] },
    ChipWave { name: "pulse wide", volume: 0.5, samples: &[1.0, -1.0, -1.0, -1.0] },
    ChipWave {
        name: "pulse narrow",
        volume: 0.5,
        samples: &[1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0],
    },
    ChipWave {
        name: "sawtooth",
        volume: 0.65,
        samples: &[
            1.0 / 31.0, 3.0 / 31.0, 5.0 / 31.0, 7.0 / 31.0, 9.0 / 31.0, 11.0 / 31.0, 13.0 / 31.0, 15.0 / 31.0,
            17.0 / 31.0, 19.0 / 31.0, 21.0 / 31.0, 23.0 / 31.0, 25.0 / 31.0, 27.0 / 31.0, 29.0 / 31.0, 1.0,
            -1.0, -29.0 / 31.0, -27.0 / 31.0, -25.0 / 31.0, -23.0 / 31.0, -21.0 / 31.0, -19.0 / 31.0, -17.0 / 31.0,
            -15.0 / 31.0, -13.0 / 31.0, -11.0 / 31.0, -9.0 / 31.0, -7.0 / 31.0, -5.0 / 31.0, -3.0 / 31.0, -1.0 / 31.0,
        ],
    },
    ChipWave {
        name: "double saw",
        volume: 0.5,
        samples: &[
            0.0, -0.2, -0.4, -0.6, -0.8, -1.0, 1.0, -0.8, -0.6, -0.4, -0.2, 1.0, 0.8, 0.6, 0.4, 0.2,
        ],
    },
    ChipWave {
        name: "double pulse",
        volume: 0.4,
        samples: &[
            1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0,
        ],
    },
    ChipWave {
        name: "spiky",
        volume: 0.4,
        samples: &[1.0, -1.0, 1.0, -1.0, 1.0, 0.0, 0.0, 0.0],
    },
    ChipWave {
        name: "plateau",
        volume: 0.5,
        samples: &[
            0.0, 0.2, 0.4, 0.5, 0.6, 0.7, 0.8, 0.85, 0.9, 0.95, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            0.0, -0.2, -0.4, -0.5, -0.6, -0.7, -0.8, -0.85, -0.9, -0.95, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0,
        ],
    },
];

pub struct NoiseWave {
    pub name: &'static str,
    pub volume: f64,
    /// MIDI pitch of drum note 0.
    pub base_pitch: f64,
    /// Scales the per-sample frequency into the smoothing coefficient.
    pub pitch_filter_mult: f64,
    pub is_soft: bool,
}

pub const NOISE_WAVES: &[NoiseWave] = &[
    NoiseWave { name: "retro", volume: 0.25, base_pitch: 69.0, pitch_filter_mult: 1024.0, is_soft: false },
    NoiseWave { name: "white", volume: 1.0, base_pitch: 69.0, pitch_filter_mult: 8.0, is_soft: true },
    NoiseWave { name: "clang", volume: 0.4, base_pitch: 69.0, pitch_filter_mult: 1024.0, is_soft: false },
    NoiseWave { name: "buzz", volume: 0.3, base_pitch: 69.0, pitch_filter_mult: 1024.0, is_soft: false },
    NoiseWave { name: "hollow", volume: 1.5, base_pitch: 96.0, pitch_filter_mult: 1.0, is_soft: true },
];

/// Semitones between adjacent drum pitches.
pub const DRUM_INTERVAL: f64 = 6.0;
/// The noise pitch that reads one table sample per sample at 44.1 kHz.
pub const DRUM_PITCH_REFERENCE: f64 = 69.0 + 11.0 * DRUM_INTERVAL;
/// Noise tables are `1 << NOISE_WAVE_BITS` samples long.
pub const NOISE_WAVE_BITS: usize = 15;
pub const NOISE_WAVE_LENGTH: usize = 1 << NOISE_WAVE_BITS;

pub struct FilterSpec {
    pub name: &'static str,
    /// Cutoff in octaves above the note's fundamental; `None` bypasses.
    pub octaves: Option<f64>,
    /// Octaves per second the cutoff falls while the note sounds.
    pub decay: f64,
    pub volume: f64,
}

pub const FILTERS: &[FilterSpec] = &[
    FilterSpec { name: "none", octaves: None, decay: 0.0, volume: 0.4 },
    FilterSpec { name: "sustain sharp", octaves: Some(4.0), decay: 0.0, volume: 0.5 },
    FilterSpec { name: "sustain medium", octaves: Some(2.5), decay: 0.0, volume: 0.7 },
    FilterSpec { name: "sustain soft", octaves: Some(1.0), decay: 0.0, volume: 1.0 },
    FilterSpec { name: "decay sharp", octaves: Some(4.0), decay: 6.0, volume: 0.5 },
    FilterSpec { name: "decay medium", octaves: Some(2.5), decay: 4.0, volume: 0.7 },
    FilterSpec { name: "decay soft", octaves: Some(1.0), decay: 2.0, volume: 1.0 },
];

pub struct Transition {
    pub name: &'static str,
    /// Phases carry across a contiguous previous note instead of resetting.
    pub legato: bool,
    /// Fade-in length in ticks when nothing precedes the note.
    pub attack_ticks: f64,
    /// Fade-out length in ticks when nothing follows the note.
    pub release_ticks: f64,
    pub slides: bool,
    /// Semitones added on every odd tick.
    pub trill_interval: f64,
    /// Extra gain at the very start of a note, gone after one tick.
    pub click_boost: f64,
    /// The note is silent after this many ticks; zero disables.
    pub blip_ticks: f64,
}

const fn transition(name: &'static str, legato: bool, attack_ticks: f64, release_ticks: f64) -> Transition {
    Transition {
        name,
        legato,
        attack_ticks,
        release_ticks,
        slides: false,
        trill_interval: 0.0,
        click_boost: 0.0,
        blip_ticks: 0.0,
    }
}

pub const TRANSITIONS: &[Transition] = &[
    transition("seamless", true, 0.0, 0.0),
    transition("sudden", false, 0.0, 0.0),
    transition("smooth", true, 1.0, 1.0),
    Transition { slides: true, ..transition("slide", true, 1.0, 1.0) },
    Transition { trill_interval: 1.0, ..transition("trill", false, 0.0, 0.0) },
    Transition { click_boost: 0.6, ..transition("click", false, 0.0, 0.0) },
    transition("bow", true, 4.0, 4.0),
    Transition { blip_ticks: 4.0, ..transition("blip", false, 0.0, 0.0) },
];

/// Longest slide, in ticks, on either side of a note boundary.
pub const SLIDE_TICKS: f64 = 3.0;

pub struct EffectSpec {
    pub name: &'static str,
    /// Vibrato depth in semitones.
    pub vibrato: f64,
    /// Tremolo depth as a fraction of the volume.
    pub tremolo: f64,
    /// Parts into the note before vibrato starts.
    pub delay_parts: i32,
}

pub const EFFECTS: &[EffectSpec] = &[
    EffectSpec { name: "none", vibrato: 0.0, tremolo: 0.0, delay_parts: 0 },
    EffectSpec { name: "vibrato light", vibrato: 0.15, tremolo: 0.0, delay_parts: 0 },
    EffectSpec { name: "vibrato delayed", vibrato: 0.3, tremolo: 0.0, delay_parts: 6 },
    EffectSpec { name: "vibrato heavy", vibrato: 0.45, tremolo: 0.0, delay_parts: 0 },
    EffectSpec { name: "tremolo light", vibrato: 0.0, tremolo: 0.25, delay_parts: 0 },
    EffectSpec { name: "tremolo heavy", vibrato: 0.0, tremolo: 0.45, delay_parts: 0 },
];

/// Period of the shared vibrato/tremolo oscillator.
pub const EFFECT_PERIOD_SECONDS: f64 = 0.14;

pub struct ChorusSpec {
    pub name: &'static str,
    /// Semitones the two oscillators are spread apart, each way.
    pub interval: f64,
    /// Semitones both oscillators are shifted.
    pub offset: f64,
    pub volume: f64,
    /// Polarity of the second oscillator.
    pub sign: f64,
}

pub const CHORUSES: &[ChorusSpec] = &[
    ChorusSpec { name: "union", interval: 0.0, offset: 0.0, volume: 0.7, sign: 1.0 },
    ChorusSpec { name: "shimmer", interval: 0.02, offset: 0.0, volume: 0.8, sign: 1.0 },
    ChorusSpec { name: "hum", interval: 0.05, offset: 0.0, volume: 1.0, sign: 1.0 },
    ChorusSpec { name: "honky tonk", interval: 0.1, offset: 0.0, volume: 1.0, sign: 1.0 },
    ChorusSpec { name: "dissonant", interval: 0.25, offset: 0.0, volume: 0.9, sign: 1.0 },
    ChorusSpec { name: "fifths", interval: 3.5, offset: 3.5, volume: 0.9, sign: 1.0 },
    ChorusSpec { name: "octaves", interval: 6.0, offset: 6.0, volume: 0.8, sign: 1.0 },
    ChorusSpec { name: "bowed", interval: 0.02, offset: 0.0, volume: 1.0, sign: -1.0 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonyKind {
    Arpeggio,
    Duet,
    Chord,
    Seventh,
    HalfArpeggio,
    ArpChord,
}

pub struct HarmonySpec {
    pub name: &'static str,
    pub kind: HarmonyKind,
    /// Gain of the harmony voice relative to the main voice.
    pub harmony_volume: f64,
}

pub const HARMONIES: &[HarmonySpec] = &[
    HarmonySpec { name: "arpeggio", kind: HarmonyKind::Arpeggio, harmony_volume: 0.0 },
    HarmonySpec { name: "duet", kind: HarmonyKind::Duet, harmony_volume: 0.9 },
    HarmonySpec { name: "chord", kind: HarmonyKind::Chord, harmony_volume: 0.8 },
    HarmonySpec { name: "seventh", kind: HarmonyKind::Seventh, harmony_volume: 0.7 },
    HarmonySpec { name: "half arpeggio", kind: HarmonyKind::HalfArpeggio, harmony_volume: 0.0 },
    HarmonySpec { name: "arp-chord", kind: HarmonyKind::ArpChord, harmony_volume: 0.8 },
];

/// Arpeggio step orders, indexed by chord size minus one.
pub const ARPEGGIO_PATTERNS: [&[usize]; 4] = [&[0], &[0, 1], &[0, 1, 2, 1], &[0, 1, 2, 3]];

// ── Envelopes ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeCurve {
    Custom,
    Steady,
    Punch,
    Flare,
    Pluck,
    Tremolo,
    Flute,
}

pub struct EnvelopeSpec {
    pub name: &'static str,
    pub curve: EnvelopeCurve,
    pub speed: f64,
}

pub const ENVELOPES: &[EnvelopeSpec] = &[
    EnvelopeSpec { name: "custom", curve: EnvelopeCurve::Custom, speed: 0.0 },
    EnvelopeSpec { name: "steady", curve: EnvelopeCurve::Steady, speed: 0.0 },
    EnvelopeSpec { name: "punch", curve: EnvelopeCurve::Punch, speed: 0.0 },
    EnvelopeSpec { name: "flare 1", curve: EnvelopeCurve::Flare, speed: 32.0 },
    EnvelopeSpec { name: "flare 2", curve: EnvelopeCurve::Flare, speed: 8.0 },
    EnvelopeSpec { name: "flare 3", curve: EnvelopeCurve::Flare, speed: 2.0 },
    EnvelopeSpec { name: "pluck 1", curve: EnvelopeCurve::Pluck, speed: 32.0 },
    EnvelopeSpec { name: "pluck 2", curve: EnvelopeCurve::Pluck, speed: 8.0 },
    EnvelopeSpec { name: "pluck 3", curve: EnvelopeCurve::Pluck, speed: 2.0 },
    EnvelopeSpec { name: "tremolo 1", curve: EnvelopeCurve::Tremolo, speed: 4.0 },
    EnvelopeSpec { name: "tremolo 2", curve: EnvelopeCurve::Tremolo, speed: 2.0 },
    EnvelopeSpec { name: "tremolo 3", curve: EnvelopeCurve::Tremolo, speed: 1.0 },
    EnvelopeSpec { name: "flute 1", curve: EnvelopeCurve::Flute, speed: 16.0 },
    EnvelopeSpec { name: "flute 2", curve: EnvelopeCurve::Flute, speed: 8.0 },
    EnvelopeSpec { name: "flute 3", curve: EnvelopeCurve::Flute, speed: 4.0 },
];

pub const ENVELOPE_STEADY: usize = 1;

// ── Pulse width ─────────────────────────────────────────────

pub const PULSE_WIDTH_NAMES: [&str; 8] = ["50%", "35%", "25%", "18%", "13%", "9%", "6%", "4%"];

/// Duty cycle for a pulse-width index.
pub fn pulse_width_ratio(index: usize) -> f64 {
    0.5 * 2f64.powf(-(clip(0, PULSE_WIDTH_NAMES.len(), index) as f64) * 0.5)
}

// ── FM ──────────────────────────────────────────────────────

pub const OPERATOR_COUNT: usize = 4;
pub const OPERATOR_AMPLITUDE_MAX: usize = 15;
pub const FEEDBACK_AMPLITUDE_MAX: usize = 15;

pub struct FmAlgorithm {
    pub name: &'static str,
    pub carrier_count: usize,
    /// Which carrier (0-based) each operator's pitch follows.
    pub associated_carrier: [usize; OPERATOR_COUNT],
    /// Operators (0-based) modulating each operator.
    pub modulated_by: [&'static [usize]; OPERATOR_COUNT],
}

pub const ALGORITHMS: &[FmAlgorithm] = &[
    FmAlgorithm { name: "1←(2 3 4)", carrier_count: 1, associated_carrier: [0, 0, 0, 0], modulated_by: [&[1, 2, 3], &[], &[], &[]] },
    FmAlgorithm { name: "1←(2 3←4)", carrier_count: 1, associated_carrier: [0, 0, 0, 0], modulated_by: [&[1, 2], &[], &[3], &[]] },
    FmAlgorithm { name: "1←2←(3 4)", carrier_count: 1, associated_carrier: [0, 0, 0, 0], modulated_by: [&[1], &[2, 3], &[], &[]] },
    FmAlgorithm { name: "1←(2 3)←4", carrier_count: 1, associated_carrier: [0, 0, 0, 0], modulated_by: [&[1, 2], &[3], &[3], &[]] },
    FmAlgorithm { name: "1←2←3←4", carrier_count: 1, associated_carrier: [0, 0, 0, 0], modulated_by: [&[1], &[2], &[3], &[]] },
    FmAlgorithm { name: "1←3 2←4", carrier_count: 2, associated_carrier: [0, 1, 0, 1], modulated_by: [&[2], &[3], &[], &[]] },
    FmAlgorithm { name: "1 2←(3 4)", carrier_count: 2, associated_carrier: [0, 1, 1, 1], modulated_by: [&[], &[2, 3], &[], &[]] },
    FmAlgorithm { name: "1 2←3←4", carrier_count: 2, associated_carrier: [0, 1, 1, 1], modulated_by: [&[], &[2], &[3], &[]] },
    FmAlgorithm { name: "(1 2)←3←4", carrier_count: 2, associated_carrier: [0, 1, 1, 1], modulated_by: [&[2], &[2], &[3], &[]] },
    FmAlgorithm { name: "(1 2)←(3 4)", carrier_count: 2, associated_carrier: [0, 1, 1, 1], modulated_by: [&[2, 3], &[2, 3], &[], &[]] },
    FmAlgorithm { name: "1 2 3←4", carrier_count: 3, associated_carrier: [0, 1, 2, 2], modulated_by: [&[], &[], &[3], &[]] },
    FmAlgorithm { name: "(1 2 3)←4", carrier_count: 3, associated_carrier: [0, 1, 2, 2], modulated_by: [&[3], &[3], &[3], &[]] },
    FmAlgorithm { name: "1 2 3 4", carrier_count: 4, associated_carrier: [0, 1, 2, 3], modulated_by: [&[], &[], &[], &[]] },
];

pub struct FmFeedback {
    pub name: &'static str,
    /// Operators (0-based) whose previous output feeds each operator.
    pub indices: [&'static [usize]; OPERATOR_COUNT],
}

pub const FEEDBACKS: &[FmFeedback] = &[
    FmFeedback { name: "1⟲", indices: [&[0], &[], &[], &[]] },
    FmFeedback { name: "2⟲", indices: [&[], &[1], &[], &[]] },
    FmFeedback { name: "3⟲", indices: [&[], &[], &[2], &[]] },
    FmFeedback { name: "4⟲", indices: [&[], &[], &[], &[3]] },
    FmFeedback { name: "1⟲ 2⟲", indices: [&[0], &[1], &[], &[]] },
    FmFeedback { name: "3⟲ 4⟲", indices: [&[], &[], &[2], &[3]] },
    FmFeedback { name: "1⟲ 2⟲ 3⟲", indices: [&[0], &[1], &[2], &[]] },
    FmFeedback { name: "2⟲ 3⟲ 4⟲", indices: [&[], &[1], &[2], &[3]] },
    FmFeedback { name: "1⟲ 2⟲ 3⟲ 4⟲", indices: [&[0], &[1], &[2], &[3]] },
    FmFeedback { name: "1→2", indices: [&[], &[0], &[], &[]] },
    FmFeedback { name: "1→3", indices: [&[], &[], &[0], &[]] },
    FmFeedback { name: "1→4", indices: [&[], &[], &[], &[0]] },
    FmFeedback { name: "2→3", indices: [&[], &[], &[1], &[]] },
    FmFeedback { name: "2→4", indices: [&[], &[], &[], &[1]] },
    FmFeedback { name: "3→4", indices: [&[], &[], &[], &[2]] },
    FmFeedback { name: "1→3 2→4", indices: [&[], &[], &[0], &[1]] },
    FmFeedback { name: "1→4 2→3", indices: [&[], &[], &[1], &[0]] },
    FmFeedback { name: "1→2→3→4", indices: [&[], &[0], &[1], &[2]] },
    FmFeedback { name: "4→1", indices: [&[3], &[], &[], &[]] },
];

pub struct OperatorFrequency {
    pub name: &'static str,
    pub mult: f64,
    pub hz_offset: f64,
    pub amplitude_sign: f64,
}

const fn ratio(name: &'static str, mult: f64) -> OperatorFrequency {
    OperatorFrequency { name, mult, hz_offset: 0.0, amplitude_sign: 1.0 }
}

pub const OPERATOR_FREQUENCIES: &[OperatorFrequency] = &[
    ratio("1×", 1.0),
    OperatorFrequency { name: "~1×", mult: 1.0, hz_offset: 1.5, amplitude_sign: -1.0 },
    ratio("2×", 2.0),
    OperatorFrequency { name: "~2×", mult: 2.0, hz_offset: -1.3, amplitude_sign: -1.0 },
    ratio("3×", 3.0),
    ratio("4×", 4.0),
    ratio("5×", 5.0),
    ratio("6×", 6.0),
    ratio("7×", 7.0),
    ratio("8×", 8.0),
    ratio("9×", 9.0),
    ratio("11×", 11.0),
    ratio("13×", 13.0),
    ratio("16×", 16.0),
    ratio("20×", 20.0),
];

/// Semitone spread applied to each carrier so stacked carriers beat.
pub const CARRIER_INTERVALS: [f64; OPERATOR_COUNT] = [0.0, 0.04, -0.073, 0.091];

/// Linear amplitude of an operator amplitude index.
pub fn operator_amplitude_curve(amplitude: f64) -> f64 {
    (16f64.powf(amplitude / 15.0) - 1.0) / 15.0
}

// ── Base gains ──────────────────────────────────────────────

pub const CHIP_BASE_VOLUME: f64 = 0.15;
pub const PULSE_BASE_VOLUME: f64 = 0.12;
pub const FM_BASE_VOLUME: f64 = 0.05;
pub const NOISE_BASE_VOLUME: f64 = 0.19;

/// Semitones over which a pitch channel's volume halves.
pub const PITCH_DAMPING: f64 = 48.0;

/// Hz for a MIDI-style pitch number.
pub fn frequency_from_pitch(pitch: f64) -> f64 {
    440.0 * 2f64.powf((pitch - 69.0) / 12.0)
}

/// Linear gain of a note pin volume.
pub fn note_volume_mult(volume: f64) -> f64 {
    (volume.max(0.0) / NOTE_VOLUME_MAX as f64).powf(1.5)
}

/// Look up a table entry by name, falling back to index 0.
pub fn index_by_name<'a, I>(names: I, name: &str) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().position(|n| n == name).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clip_law() {
        for v in -3i32..12 {
            let c = clip(0, 8, v);
            assert!((0..8).contains(&c), "clip(0, 8, {v}) gave {c}");
            if (0..8).contains(&v) {
                assert_eq!(c, v);
            }
        }
        assert_eq!(clip(0, 8, -1), 0);
        assert_eq!(clip(0, 8, 8), 7);
        assert_eq!(clip(1usize, 5, 40), 4);
    }

    #[test]
    fn default_tempo_is_120_bpm() {
        assert_eq!(beats_per_minute(DEFAULT_TEMPO), 120.0);
        for tempo in 0..TEMPO_STEPS {
            assert_eq!(tempo_from_bpm(beats_per_minute(tempo)), tempo);
        }
        assert_eq!(tempo_from_bpm(10_000.0), TEMPO_STEPS - 1);
        assert_eq!(tempo_from_bpm(f64::NAN), DEFAULT_TEMPO);
    }

    #[test]
    fn scales_start_on_the_root() {
        assert_eq!(SCALES.len(), 12);
        assert!(SCALES.iter().all(|s| s.flags[0]));
        assert!(SCALES[11].flags.iter().all(|&f| f));
        // normal :) is the major scale
        let major: Vec<usize> = (0..12).filter(|&i| SCALES[6].flags[i]).collect();
        assert_eq!(major, vec![0, 2, 4, 5, 7, 9, 11]);
    }

    #[test]
    fn chip_waves_expand_evenly() {
        for wave in CHIP_WAVES {
            assert!(
                wave.samples.len().is_power_of_two() && wave.samples.len() <= 64,
                "{} has {} samples",
                wave.name,
                wave.samples.len()
            );
        }
    }

    #[test]
    fn fm_routing_only_flows_downward() {
        for alg in ALGORITHMS {
            for (op, mods) in alg.modulated_by.iter().enumerate() {
                assert!(mods.iter().all(|&m| m > op), "{} routes upward", alg.name);
            }
            for op in 0..alg.carrier_count {
                assert_eq!(alg.associated_carrier[op], op);
            }
        }
        assert!(FEEDBACKS.iter().any(|f| f.name == "4→1"));
    }

    #[test]
    fn gain_curves() {
        assert_relative_eq!(operator_amplitude_curve(15.0), 1.0);
        assert_relative_eq!(operator_amplitude_curve(0.0), 0.0);
        assert_relative_eq!(frequency_from_pitch(69.0), 440.0);
        assert_relative_eq!(note_volume_mult(3.0), 1.0);
        assert_eq!(volume_mult(VOLUME_RANGE - 1), 0.0);
        assert_eq!(pan_gains(PAN_CENTER), (1.0, 1.0));
        assert_eq!(pan_gains(0), (1.0, 0.0));
        assert_relative_eq!(pulse_width_ratio(0), 0.5);
    }

    #[test]
    fn unknown_names_fall_back_to_first_entry() {
        let names = TRANSITIONS.iter().map(|t| t.name);
        assert_eq!(index_by_name(names.clone(), "slide"), 3);
        assert_eq!(index_by_name(names, "wobble"), 0);
    }
}
