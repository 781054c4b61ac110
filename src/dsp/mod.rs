//! DSP engine — pure Rust synthesis for chiptune songs.
//!
//! The same code drives live playback through [`engine::Synth`] and offline
//! rendering to WAV through [`renderer`]. Per tick the resolver turns notes
//! into channel state; per sample the cached kernels turn that state into
//! sound and the master bus mixes it down.

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod kernel;
pub mod mixer;
pub mod renderer;
pub mod resolver;
pub mod reverb;
pub mod voice;
pub mod waves;
