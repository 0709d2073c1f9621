//! Playable audio sources: decoded WAV tracks and the procedural demo.

use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use super::synthesis::DemoSynth;
use crate::error::{Error, Result};

/// What to play, before the output sample rate is known
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// WAV file on disk
    Wav(PathBuf),
    /// Built-in Glicol composition
    Demo,
}

/// Decoded track, interleaved f32 samples in [-1, 1]
#[derive(Debug, Clone)]
pub struct WavTrack {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    /// Next frame to play
    position: usize,
}

impl WavTrack {
    /// Decode a WAV file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let track = Self::from_reader(WavReader::open(path)?)?;
        info!(
            "Loaded {}: {} ch @ {}Hz, {:.1}s",
            path.display(),
            track.channels,
            track.sample_rate,
            track.duration_secs()
        );
        Ok(track)
    }

    /// Decode from any WAV reader (integer or float PCM)
    pub fn from_reader<R: Read>(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(Error::Audio("WAV file declares zero channels".to_string()));
        }

        let samples = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            position: 0,
        })
    }

    /// Build a track from interleaved samples
    pub fn from_samples(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
            position: 0,
        }
    }

    /// Convert to another sample rate by linear interpolation
    pub fn resampled(self, target_rate: u32) -> Self {
        if target_rate == self.sample_rate || target_rate == 0 || self.sample_rate == 0 {
            return self;
        }
        let samples =
            resample_linear(&self.samples, self.channels, self.sample_rate, target_rate);
        Self {
            samples,
            channels: self.channels,
            sample_rate: target_rate,
            position: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total length in frames
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.frames()
    }

    fn next_frame(&mut self) -> Option<&[f32]> {
        if self.is_finished() {
            return None;
        }
        let start = self.position * self.channels;
        self.position += 1;
        Some(&self.samples[start..start + self.channels])
    }
}

/// A source the output callback can pull frames from
pub enum AudioSource {
    Track(WavTrack),
    Demo(DemoSynth),
}

impl AudioSource {
    /// Prepare a source for playback at `sample_rate`
    pub fn open(spec: &SourceSpec, sample_rate: u32) -> Result<Self> {
        match spec {
            SourceSpec::Wav(path) => Ok(Self::Track(WavTrack::open(path)?.resampled(sample_rate))),
            SourceSpec::Demo => Ok(Self::Demo(DemoSynth::new(sample_rate)?)),
        }
    }

    /// Length in seconds, or None for endless sources
    pub fn duration_secs(&self) -> Option<f32> {
        match self {
            Self::Track(track) => Some(track.duration_secs()),
            Self::Demo(_) => None,
        }
    }

    /// Fill an interleaved buffer of `channels` channels
    ///
    /// Returns false once the source has run out; the remainder is silence.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> bool {
        let channels = channels.max(1);
        let mut alive = true;
        for frame in out.chunks_mut(channels) {
            match self {
                Self::Track(track) => match track.next_frame() {
                    Some(src) => map_channels(src, frame),
                    None => {
                        frame.fill(0.0);
                        alive = false;
                    }
                },
                Self::Demo(synth) => map_channels(&synth.next_frame(), frame),
            }
        }
        alive
    }
}

/// Copy one frame between channel layouts (down-mix to mono, else wrap)
fn map_channels(src: &[f32], dst: &mut [f32]) {
    if dst.len() == 1 {
        dst[0] = src.iter().sum::<f32>() / src.len().max(1) as f32;
        return;
    }
    for (c, sample) in dst.iter_mut().enumerate() {
        *sample = src.get(c % src.len().max(1)).copied().unwrap_or(0.0);
    }
}

fn resample_linear(samples: &[f32], channels: usize, from: u32, to: u32) -> Vec<f32> {
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = (in_frames as u64 * to as u64 / from as u64) as usize;
    let ratio = from as f64 / to as f64;

    let mut out = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        let pos = i as f64 * ratio;
        let i0 = (pos.floor() as usize).min(in_frames - 1);
        let i1 = (i0 + 1).min(in_frames - 1);
        let frac = (pos - i0 as f64) as f32;
        for c in 0..channels {
            let a = samples[i0 * channels + c];
            let b = samples[i1 * channels + c];
            out.push(a + (b - a) * frac);
        }
    }
    out
}
