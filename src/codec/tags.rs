//! Single-character field tags of the compact song string.

// song structure
pub const CHANNEL_COUNT: u8 = b'n';
pub const SCALE: u8 = b's';
pub const KEY: u8 = b'k';
pub const LOOP_START: u8 = b'l';
pub const LOOP_END: u8 = b'e';
pub const TEMPO: u8 = b't';
pub const REVERB: u8 = b'm';
pub const BEAT_COUNT: u8 = b'a';
pub const BAR_COUNT: u8 = b'g';
pub const PATTERN_COUNT: u8 = b'j';
pub const INSTRUMENT_COUNT: u8 = b'i';
pub const RHYTHM: u8 = b'r';
pub const CHANNEL_OCTAVE: u8 = b'o';
pub const BARS: u8 = b'b';
pub const PATTERNS: u8 = b'p';

// global mix settings
pub const BLEND: u8 = b'x';
pub const RIFF: u8 = b'y';
pub const DETUNE: u8 = b'z';
pub const MUFF: u8 = b'u';
pub const MIX: u8 = b'q';
pub const SAMPLE_RATE: u8 = b'S';

// instrument settings
pub const START_INSTRUMENT: u8 = b'T';
pub const WAVE: u8 = b'w';
pub const FILTER: u8 = b'f';
pub const TRANSITION: u8 = b'd';
pub const EFFECT: u8 = b'c';
pub const CHORUS: u8 = b'h';
pub const VOLUME: u8 = b'v';
pub const HARMONY: u8 = b'H';
pub const PAN: u8 = b'L';
pub const MUTE: u8 = b'U';
pub const INSTRUMENT_OCTAVE: u8 = b'O';
pub const PULSE_WIDTH: u8 = b'W';
pub const PULSE_ENVELOPE: u8 = b'G';

// FM
pub const ALGORITHM: u8 = b'A';
pub const FEEDBACK_TYPE: u8 = b'F';
pub const FEEDBACK_AMPLITUDE: u8 = b'B';
pub const FEEDBACK_ENVELOPE: u8 = b'V';
pub const OPERATOR_FREQUENCIES: u8 = b'Q';
pub const OPERATOR_AMPLITUDES: u8 = b'P';
pub const OPERATOR_ENVELOPES: u8 = b'E';
