//! Song serialization: the versioned compact string and JSON interchange.

pub mod format;
pub mod json;
pub mod reader;
pub mod tags;
pub mod writer;

pub use format::{FormatRules, VERSION_LATEST, VERSION_OLDEST};
pub use json::{export_song, load_json, to_json, unrolled_bars, ExportOptions, SongJson};
pub use reader::load_base64;
pub use writer::{to_base64, MAX_HASH_LENGTH};

use crate::error::SongError;
use crate::song::Song;

/// Load either format, telling them apart by the first character.
pub fn parse_song(text: &str) -> Result<Song, SongError> {
    let mut song = Song::new();
    let trimmed = text.trim_start().trim_start_matches('#');
    if trimmed.starts_with('{') {
        load_json(&mut song, trimmed)?;
    } else {
        load_base64(&mut song, trimmed)?;
    }
    Ok(song)
}

impl Song {
    pub fn to_base64(&self) -> Result<String, SongError> {
        to_base64(self)
    }

    pub fn from_base64(compressed: &str) -> Result<Song, SongError> {
        let mut song = Song::new();
        load_base64(&mut song, compressed)?;
        Ok(song)
    }

    pub fn to_json(&self, options: &ExportOptions) -> Result<String, SongError> {
        to_json(self, options)
    }

    pub fn from_json(text: &str) -> Result<Song, SongError> {
        let mut song = Song::new();
        load_json(&mut song, text)?;
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::Note;

    #[test]
    fn parse_detects_the_format() {
        let mut song = Song::new();
        song.tempo = 3;
        song.channels[2].patterns[0].notes.push(Note::new(30, 0, 8, 2, false));

        let hash = song.to_base64().unwrap();
        assert_eq!(parse_song(&hash).unwrap(), song);
        assert_eq!(parse_song(&format!("#{hash}")).unwrap(), song);

        let json = song.to_json(&ExportOptions::default()).unwrap();
        assert_eq!(parse_song(&json).unwrap(), song);
    }

    #[test]
    fn legacy_strings_keep_their_meaning() {
        assert_eq!(Song::from_base64("2t2").unwrap().tempo, 7);
        assert_eq!(Song::from_base64("4t9").unwrap().tempo, 9);
        assert_eq!(Song::from_base64("9n31t2").unwrap(), Song::new());
    }

    #[test]
    fn json_export_survives_compact_round_trip() {
        let mut song = Song::new();
        song.channels[0].patterns[1].notes.push(Note::new(40, 4, 12, 3, true));
        song.channels[0].bars[6] = 2;
        let hash = song.to_base64().unwrap();
        let from_hash = Song::from_base64(&hash).unwrap();
        let options = ExportOptions::default();
        assert_eq!(from_hash.to_json(&options).unwrap(), song.to_json(&options).unwrap());
    }
}
