//! Offline renderer — plays a whole song into memory, then to WAV bytes.
//!
//! A render covers the intro, `loops` passes of the loop region and the
//! outro, exactly [`Synth::total_samples`] long.

use crate::song::Song;

use super::engine::{PlaybackConfig, Synth};

const CHUNK: usize = 4096;

/// Render `song` to interleaved stereo f32 samples.
pub fn render_song(song: &Song, sample_rate: u32, loops: usize) -> Vec<f32> {
    let loops = loops.max(1);
    let config = PlaybackConfig {
        sample_rate,
        loop_count: loops.min(i32::MAX as usize) as i32,
        enable_intro: true,
        enable_outro: true,
        volume: 1.0,
    };
    let mut synth = Synth::new(song.clone(), config);
    let total = synth.total_samples(true, loops, true);

    let mut left = vec![0.0f32; CHUNK];
    let mut right = vec![0.0f32; CHUNK];
    let mut out = Vec::with_capacity(total * 2);
    synth.play();
    let mut done = 0;
    while done < total {
        let len = CHUNK.min(total - done);
        synth.synthesize(&mut left, &mut right, len);
        for (&l, &r) in left[..len].iter().zip(&right[..len]) {
            out.push(l);
            out.push(r);
        }
        done += len;
    }
    out
}

/// Render to interleaved 16-bit PCM.
pub fn render_pcm_i16(song: &Song, sample_rate: u32, loops: usize) -> Vec<i16> {
    render_song(song, sample_rate, loops)
        .iter()
        .map(|&s| (s as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Render to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(song: &Song, sample_rate: u32, loops: usize) -> Vec<u8> {
    let pcm = render_pcm_i16(song, sample_rate, loops);
    encode_wav(&pcm, sample_rate, 2)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
