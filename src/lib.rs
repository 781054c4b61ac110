pub mod bits;
pub mod codec;
pub mod config;
pub mod dsp;
pub mod error;
pub mod recency;
pub mod song;

pub use codec::{parse_song, ExportOptions};
pub use error::SongError;
pub use song::Song;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the chipbox-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(e: SongError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: convert a compact song string to pretty JSON.
#[wasm_bindgen]
pub fn song_to_json(hash: &str) -> Result<String, JsValue> {
    let song = parse_song(hash).map_err(js_error)?;
    song.to_json(&ExportOptions::default()).map_err(js_error)
}

/// WASM-exposed: convert song JSON to the compact string.
#[wasm_bindgen]
pub fn json_to_song_hash(json: &str) -> Result<String, JsValue> {
    let song = Song::from_json(json).map_err(js_error)?;
    song.to_base64().map_err(js_error)
}

/// WASM-exposed: the song as a plain JS object, in the JSON export shape.
#[wasm_bindgen]
pub fn song_to_object(hash: &str) -> Result<JsValue, JsValue> {
    let song = parse_song(hash).map_err(js_error)?;
    let exported = codec::export_song(&song, &ExportOptions::default());
    serde_wasm_bindgen::to_value(&exported).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a song to interleaved stereo f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_song_samples(hash: &str, sample_rate: u32, loops: usize) -> Result<Vec<f32>, JsValue> {
    let song = parse_song(hash).map_err(js_error)?;
    Ok(dsp::renderer::render_song(&song, sample_rate, loops))
}

/// WASM-exposed: render a song to a WAV byte array.
#[wasm_bindgen]
pub fn render_song_wav(hash: &str, sample_rate: u32, loops: usize) -> Result<Vec<u8>, JsValue> {
    let song = parse_song(hash).map_err(js_error)?;
    Ok(dsp::renderer::render_wav(&song, sample_rate, loops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::engine::{PlaybackConfig, Synth};

    #[test]
    fn version_matches_cargo() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_song_round_trips_and_renders() {
        let song = Song::new();
        let hash = song.to_base64().unwrap();
        let decoded = parse_song(&hash).unwrap();
        assert_eq!(decoded, song);

        let json = song_to_json(&hash).unwrap();
        let back = json_to_song_hash(&json).unwrap();
        assert_eq!(back, hash);

        let mut synth = Synth::new(decoded, PlaybackConfig::default());
        synth.play();
        let mut left = vec![1.0f32; 512];
        let mut right = vec![1.0f32; 512];
        synth.synthesize(&mut left, &mut right, 512);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0), "Empty song should render silence");
        assert!(synth.is_playing());
    }
}
