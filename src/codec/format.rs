//! Format generations of the compact song string.
//!
//! Each version that ever shipped gets its own [`FormatRules`], built by one
//! constructor. The reader consults the rules instead of comparing version
//! numbers inline, so each generation stays readable in isolation.

use crate::config::{clip, BEATS_PER_BAR_MAX, BEATS_PER_BAR_MIN, FILTERS, KEY_NAMES, SCALES, TEMPO_STEPS};

pub const VERSION_OLDEST: usize = 2;
pub const VERSION_LATEST: usize = 7;

/// How per-instrument setting tags are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentScope {
    /// A channel index, then one value for that channel's first instrument.
    ChannelPrefixed,
    /// One value per channel, shared by all of its instruments.
    PerChannel,
    /// One value per instrument, channel by channel.
    PerInstrument,
    /// One value for the instrument opened by the last type tag.
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLayout {
    /// Channel index and bar count precede three bits per bar.
    PrefixedPerChannel,
    /// All channels at once; stored values are pattern numbers minus one.
    OneBased,
    /// All channels at once; zero marks an empty bar.
    ZeroIsEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternLayout {
    /// One tag per channel, with a fixed two-symbol length.
    PrefixedPerChannel,
    /// One tag for every channel, with a variable-length length.
    Combined,
}

const LEGACY_TEMPOS: [usize; 4] = [1, 4, 7, 10];
const LEGACY_BEATS: [usize; 5] = [6, 7, 8, 9, 10];
const LEGACY_FILTERS: [usize; 4] = [1, 3, 4, 5];
/// Position of the "expert" scale before "strange" was added after it.
const LEGACY_EXPERT_SCALE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRules {
    pub version: usize,
    pub instrument_scope: InstrumentScope,
    pub bars: BarLayout,
    pub patterns: PatternLayout,
    /// Loop and bar-count fields take two symbols instead of one.
    pub wide_bar_fields: bool,
    pub legacy_tempo: bool,
    pub legacy_beats: bool,
    pub legacy_scale: bool,
    pub legacy_filter: bool,
    /// Keys were listed from B down to C.
    pub reversed_keys: bool,
    /// Each pattern starts with a bit telling whether it has notes.
    pub has_notes_bit: bool,
    /// Pitch and drum channel counts assumed before any channel tag.
    pub default_channels: (usize, usize),
}

impl FormatRules {
    pub fn for_version(version: usize) -> Option<Self> {
        match version {
            2 => Some(Self::generation_2()),
            3 => Some(Self::generation_3()),
            4 => Some(Self::generation_4()),
            5 => Some(Self::generation_5()),
            6 => Some(Self::generation_6()),
            7 => Some(Self::generation_7()),
            _ => None,
        }
    }

    fn generation_2() -> Self {
        FormatRules {
            version: 2,
            instrument_scope: InstrumentScope::ChannelPrefixed,
            bars: BarLayout::PrefixedPerChannel,
            patterns: PatternLayout::PrefixedPerChannel,
            wide_bar_fields: false,
            legacy_tempo: true,
            legacy_beats: true,
            legacy_scale: true,
            legacy_filter: true,
            reversed_keys: true,
            has_notes_bit: false,
            default_channels: (3, 1),
        }
    }

    fn generation_3() -> Self {
        FormatRules {
            version: 3,
            instrument_scope: InstrumentScope::PerChannel,
            bars: BarLayout::OneBased,
            patterns: PatternLayout::Combined,
            wide_bar_fields: false,
            legacy_tempo: true,
            legacy_beats: false,
            legacy_scale: false,
            legacy_filter: false,
            reversed_keys: true,
            has_notes_bit: true,
            default_channels: (3, 1),
        }
    }

    fn generation_4() -> Self {
        FormatRules {
            version: 4,
            legacy_tempo: false,
            ..Self::generation_3()
        }
    }

    fn generation_5() -> Self {
        FormatRules {
            version: 5,
            bars: BarLayout::ZeroIsEmpty,
            wide_bar_fields: true,
            ..Self::generation_4()
        }
    }

    fn generation_6() -> Self {
        FormatRules {
            version: 6,
            instrument_scope: InstrumentScope::PerInstrument,
            default_channels: (4, 1),
            ..Self::generation_5()
        }
    }

    fn generation_7() -> Self {
        FormatRules {
            version: 7,
            instrument_scope: InstrumentScope::Typed,
            reversed_keys: false,
            ..Self::generation_6()
        }
    }

    pub fn tempo(&self, raw: usize) -> usize {
        if self.legacy_tempo {
            LEGACY_TEMPOS[clip(0, LEGACY_TEMPOS.len(), raw)]
        } else {
            clip(0, TEMPO_STEPS, raw)
        }
    }

    pub fn beats_per_bar(&self, raw: usize) -> usize {
        if self.legacy_beats {
            LEGACY_BEATS[clip(0, LEGACY_BEATS.len(), raw)]
        } else {
            clip(BEATS_PER_BAR_MIN, BEATS_PER_BAR_MAX + 1, raw + 1)
        }
    }

    pub fn scale(&self, raw: usize) -> usize {
        if self.legacy_scale && raw == LEGACY_EXPERT_SCALE {
            SCALES.len() - 1
        } else {
            clip(0, SCALES.len(), raw)
        }
    }

    pub fn key(&self, raw: usize) -> usize {
        let key = clip(0, KEY_NAMES.len(), raw);
        if self.reversed_keys { KEY_NAMES.len() - 1 - key } else { key }
    }

    pub fn filter(&self, raw: usize) -> usize {
        if self.legacy_filter {
            LEGACY_FILTERS[clip(0, LEGACY_FILTERS.len(), raw)]
        } else {
            clip(0, FILTERS.len(), raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_version_has_rules() {
        for v in VERSION_OLDEST..=VERSION_LATEST {
            let rules = FormatRules::for_version(v).unwrap();
            assert_eq!(rules.version, v);
        }
        assert!(FormatRules::for_version(VERSION_OLDEST - 1).is_none());
        assert!(FormatRules::for_version(VERSION_LATEST + 1).is_none());
        assert!(FormatRules::for_version(0).is_none());
    }

    #[test]
    fn legacy_tempo_table_until_generation_4() {
        assert_eq!(FormatRules::for_version(2).unwrap().tempo(2), 7);
        assert_eq!(FormatRules::for_version(3).unwrap().tempo(9), 10);
        assert_eq!(FormatRules::for_version(4).unwrap().tempo(9), 9);
        assert_eq!(FormatRules::for_version(7).unwrap().tempo(60), TEMPO_STEPS - 1);
    }

    #[test]
    fn generation_2_quirks() {
        let rules = FormatRules::for_version(2).unwrap();
        assert_eq!(rules.beats_per_bar(2), 8);
        assert_eq!(rules.scale(10), 11);
        assert_eq!(rules.filter(1), 3);
        assert_eq!(rules.key(11), 0);
        assert!(!rules.has_notes_bit);
        assert_eq!(rules.default_channels, (3, 1));
    }

    #[test]
    fn generations_widen_incrementally() {
        let g4 = FormatRules::for_version(4).unwrap();
        let g5 = FormatRules::for_version(5).unwrap();
        let g6 = FormatRules::for_version(6).unwrap();
        let g7 = FormatRules::for_version(7).unwrap();
        assert!(!g4.wide_bar_fields && g5.wide_bar_fields);
        assert_eq!(g4.bars, BarLayout::OneBased);
        assert_eq!(g5.bars, BarLayout::ZeroIsEmpty);
        assert_eq!(g5.instrument_scope, InstrumentScope::PerChannel);
        assert_eq!(g6.instrument_scope, InstrumentScope::PerInstrument);
        assert_eq!(g7.instrument_scope, InstrumentScope::Typed);
        assert_eq!(g6.key(0), 11);
        assert_eq!(g7.key(0), 0);
        assert_eq!(g7.beats_per_bar(7), 8);
    }
}
