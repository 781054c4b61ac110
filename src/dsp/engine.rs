//! Playback engine — streams a song as stereo samples.
//!
//! [`Synth`] owns the song, the transport and every piece of transient
//! synthesis state. Each call to [`Synth::synthesize`] renders bar by bar
//! through the cached kernels, applying the loop policy at every bar line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TICKS_PER_PART;
use crate::error::SongError;
use crate::song::Song;

use super::kernel::{BarPosition, Kernel, KernelCache, KernelOutcome, RenderEnv, RenderTarget};
use super::mixer::{MasterBus, MasterSettings};
use super::voice::SynthChannel;
use super::waves::SynthTables;

/// Playback options that are not part of the song itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    pub sample_rate: u32,
    /// Times the loop region plays; -1 repeats it forever.
    pub loop_count: i32,
    pub enable_intro: bool,
    pub enable_outro: bool,
    /// Master volume, 0.0 to 1.0.
    pub volume: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            loop_count: -1,
            enable_intro: true,
            enable_outro: false,
            volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn from_json(text: &str) -> Result<Self, SongError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where rendered audio ends up. The engine only tells the sink when
/// playback starts and stops; samples are pulled through [`Synth::synthesize`].
pub trait AudioSink {
    fn open(&mut self, sample_rate: u32);
    fn close(&mut self);
}

fn normalize_loop_count(count: i32) -> i32 {
    if count < 0 { -1 } else { count.max(1) }
}

pub struct Synth {
    song: Song,
    config: PlaybackConfig,
    position: BarPosition,
    playing: bool,
    remaining_loops: i32,
    voices: Vec<SynthChannel>,
    kernels: KernelCache,
    kernel: Option<Arc<Kernel>>,
    bus: MasterBus,
    tables: SynthTables,
    sink: Option<Box<dyn AudioSink>>,
}

impl Synth {
    pub fn new(song: Song, config: PlaybackConfig) -> Self {
        let config = PlaybackConfig { loop_count: normalize_loop_count(config.loop_count), ..config };
        let sample_rate = config.sample_rate.max(1) as f64;
        let mut synth = Synth {
            song,
            config,
            position: BarPosition::at_bar(0),
            playing: false,
            remaining_loops: config.loop_count,
            voices: Vec::new(),
            kernels: KernelCache::new(),
            kernel: None,
            bus: MasterBus::new(sample_rate),
            tables: SynthTables::new(),
            sink: None,
        };
        synth.sync_voices();
        synth.snap_to_start();
        synth
    }

    pub fn with_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Option<Box<dyn AudioSink>>) {
        if self.playing {
            if let Some(old) = self.sink.as_mut() {
                old.close();
            }
        }
        self.sink = sink;
        if self.playing {
            if let Some(new) = self.sink.as_mut() {
                new.open(self.config.sample_rate);
            }
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate.max(1) as f64
    }

    // ── Transport ───────────────────────────────────────────

    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        self.playing = true;
        if let Some(sink) = self.sink.as_mut() {
            sink.open(self.config.sample_rate);
        }
        info!(bar = self.position.bar, "playback started");
    }

    /// Stop output and drop transient synthesis state. The playhead stays.
    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        if let Some(sink) = self.sink.as_mut() {
            sink.close();
        }
        for voice in &mut self.voices {
            voice.reset();
        }
        self.bus.reset();
        self.position.resolved = false;
        info!(bar = self.position.bar, "playback paused");
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn bar(&self) -> usize {
        self.position.bar
    }

    pub fn remaining_loops(&self) -> i32 {
        self.remaining_loops
    }

    pub fn go_to_bar(&mut self, bar: usize) {
        self.position = BarPosition::at_bar(bar.min(self.song.bar_count.saturating_sub(1)));
        self.kernel = None;
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    /// Position in bars, with the fraction covering ticks and samples.
    pub fn playhead(&self) -> f64 {
        let ticks_per_bar = (self.song.parts_per_bar() * TICKS_PER_PART).max(1) as f64;
        let samples_per_tick = self.samples_per_arpeggio() as f64;
        let tick = self.position.tick_in_bar(self.song.parts_per_beat) as f64;
        let within = if !self.position.resolved && self.position.countdown == 0 {
            0.0
        } else {
            1.0 - self.position.countdown as f64 / samples_per_tick
        };
        self.position.bar as f64 + (tick + within) / ticks_per_bar
    }

    pub fn set_playhead(&mut self, playhead: f64) {
        let playhead = if playhead.is_finite() { playhead.max(0.0) } else { 0.0 };
        let bar = (playhead.floor() as usize).min(self.song.bar_count.saturating_sub(1));
        self.go_to_bar(bar);

        let ticks_per_beat = (self.song.parts_per_beat * TICKS_PER_PART).max(1);
        let ticks_per_bar = (ticks_per_beat * self.song.beats_per_bar).max(1);
        let ticks = ((playhead - bar as f64) * ticks_per_bar as f64).clamp(0.0, ticks_per_bar as f64 - 1e-9);
        let tick = (ticks.floor() as usize).min(ticks_per_bar - 1);
        let samples_per_tick = self.samples_per_arpeggio();
        let into = (((ticks - tick as f64) * samples_per_tick as f64).round() as usize).min(samples_per_tick - 1);

        self.position.beat = tick / ticks_per_beat;
        self.position.part = (tick % ticks_per_beat) / TICKS_PER_PART;
        self.position.arpeggio = tick % TICKS_PER_PART;
        self.position.countdown = if into == 0 { 0 } else { samples_per_tick - into };
    }

    pub fn next_bar(&mut self) {
        let next = self.position.bar + 1;
        self.go_to_bar(if next >= self.song.bar_count { 0 } else { next });
    }

    pub fn prev_bar(&mut self) {
        let bar = self.position.bar;
        self.go_to_bar(if bar == 0 { self.song.bar_count.saturating_sub(1) } else { bar - 1 });
    }

    /// Back to the first bar that will play, with the loop count restored.
    pub fn snap_to_start(&mut self) {
        self.remaining_loops = self.config.loop_count;
        let start = if self.config.enable_intro { 0 } else { self.song.loop_start };
        self.go_to_bar(start);
    }

    pub fn set_loop_count(&mut self, count: i32) {
        self.config.loop_count = normalize_loop_count(count);
        self.remaining_loops = self.config.loop_count;
    }

    pub fn set_enable_intro(&mut self, enable: bool) {
        self.config.enable_intro = enable;
    }

    pub fn set_enable_outro(&mut self, enable: bool) {
        self.config.enable_outro = enable;
    }

    // ── Song access ─────────────────────────────────────────

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Edits take effect from the next rendered chunk.
    pub fn song_mut(&mut self) -> &mut Song {
        self.kernel = None;
        &mut self.song
    }

    pub fn set_song(&mut self, song: Song) {
        self.song = song;
        self.kernels.clear();
        self.voices.clear();
        self.sync_voices();
        self.bus.reset();
        self.snap_to_start();
    }

    fn sync_voices(&mut self) {
        let sample_rate = self.sample_rate();
        self.voices.resize_with(self.song.channel_count(), || SynthChannel::new(sample_rate));
    }

    // ── Timing ──────────────────────────────────────────────

    /// Samples per tick at the song's tempo.
    pub fn samples_per_arpeggio(&self) -> usize {
        let ticks_per_second =
            self.song.beats_per_minute() / 60.0 * (self.song.parts_per_beat * TICKS_PER_PART) as f64;
        ((self.sample_rate() / ticks_per_second).floor() as usize).max(1)
    }

    pub fn samples_per_bar(&self) -> usize {
        self.song.parts_per_bar() * TICKS_PER_PART * self.samples_per_arpeggio()
    }

    /// Length of a full render: optional intro, `loops` passes of the loop
    /// region, optional outro.
    pub fn total_samples(&self, enable_intro: bool, loops: usize, enable_outro: bool) -> usize {
        let song = &self.song;
        let loop_end = (song.loop_start + song.loop_length).min(song.bar_count);
        let intro = if enable_intro { song.loop_start } else { 0 };
        let outro = if enable_outro { song.bar_count - loop_end } else { 0 };
        let bars = intro + loops.max(1) * (loop_end - song.loop_start) + outro;
        bars * self.samples_per_bar()
    }

    // ── Rendering ───────────────────────────────────────────

    /// Fill exactly `length` samples of each channel, silence included.
    pub fn synthesize(&mut self, left: &mut [f32], right: &mut [f32], length: usize) {
        let length = length.min(left.len()).min(right.len());
        let mut cursor = 0;
        if self.playing {
            self.sync_voices();
        }
        let sample_rate = self.sample_rate();
        let samples_per_tick = self.samples_per_arpeggio();

        while self.playing && cursor < length {
            let kernel = match &self.kernel {
                Some(kernel) => Arc::clone(kernel),
                None => {
                    let kernel = self.kernels.lookup_or_build(&self.song, self.position.bar);
                    self.kernel = Some(Arc::clone(&kernel));
                    kernel
                }
            };
            let settings = MasterSettings::for_song(&self.song, sample_rate, self.config.volume);
            let env = RenderEnv {
                song: &self.song,
                tables: &self.tables,
                settings: &settings,
                samples_per_tick,
                sample_rate,
            };
            let mut target = RenderTarget { left: &mut left[..length], right: &mut right[..length], cursor };
            match kernel.render_bar(&env, &mut self.position, &mut self.voices, &mut self.bus, &mut target) {
                KernelOutcome::BufferFilled => cursor = length,
                KernelOutcome::BarFinished { cursor: end } => {
                    cursor = end;
                    self.advance_bar();
                }
            }
        }

        left[cursor..length].fill(0.0);
        right[cursor..length].fill(0.0);
    }

    fn advance_bar(&mut self) {
        let bar_count = self.song.bar_count;
        let loop_start = self.song.loop_start;
        let loop_end = loop_start + self.song.loop_length;
        let mut next = self.position.bar + 1;

        // A seek can leave the playhead past the loop; without an outro to
        // play, that counts as reaching the loop end.
        let past_loop = next > loop_end && (self.remaining_loops < 0 || !self.config.enable_outro);
        if next == loop_end || past_loop {
            if self.remaining_loops < 0 {
                next = loop_start;
            } else {
                self.remaining_loops -= 1;
                if self.remaining_loops > 0 {
                    next = loop_start;
                } else if !self.config.enable_outro {
                    self.end_song();
                    return;
                }
            }
        }
        if !self.config.enable_intro && next < loop_start {
            next = loop_start;
        }
        if next >= bar_count {
            self.end_song();
            return;
        }

        self.position = BarPosition::at_bar(next);
        self.kernel = None;
        // Notes are told apart by bar and start, so a revisited bar must not
        // look like the note still sounding.
        for voice in &mut self.voices {
            voice.active_note = None;
        }
        debug!(bar = next, remaining_loops = self.remaining_loops, "entered bar");
    }

    fn end_song(&mut self) {
        info!("song finished");
        self.pause();
        self.config.enable_intro = true;
        self.remaining_loops = self.config.loop_count;
        self.go_to_bar(0);
    }
}
