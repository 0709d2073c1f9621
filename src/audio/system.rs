//! Audio system managing playback and frequency analysis.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::source::{AudioSource, SourceSpec};
use crate::analysis::AnalyserNode;
use crate::error::{Error, Result};
use crate::params::{AnalyserConfig, RecordingConfig};

/// Audio system: one output stream, one source, one analyser
///
/// The analyser is created here exactly once and handed out as shared
/// handles; nothing downstream ever wires a second one into the stream.
pub struct AudioSystem {
    /// Spectrum analyser fed from the output callback
    analyser: AnalyserNode,

    /// Whether the source is advancing (false outputs silence)
    playing: Arc<AtomicBool>,

    /// Output sample rate (Hz)
    sample_rate: u32,

    /// Source length, None for endless sources
    duration_secs: Option<f32>,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl AudioSystem {
    /// Open the default output device and start streaming `spec`, paused
    pub fn new(
        spec: &SourceSpec,
        analyser_config: AnalyserConfig,
        recording_config: Option<&RecordingConfig>,
    ) -> Result<Self> {
        let analyser = AnalyserNode::new(analyser_config)?;

        // Setup audio output device
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("No audio output device found".to_string()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| Error::Audio(format!("Failed to get audio config: {}", e)))?;
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        let mut source = AudioSource::open(spec, sample_rate)?;
        let duration_secs = source.duration_secs();

        // Create WAV writer if recording
        let mut wav_writer = match recording_config {
            Some(recording) => {
                let wav_spec = hound::WavSpec {
                    channels: config.channels,
                    sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let writer: hound::WavWriter<BufWriter<File>> =
                    hound::WavWriter::create(recording.audio_path(), wav_spec)?;
                Some(writer)
            }
            None => None,
        };

        let playing = Arc::new(AtomicBool::new(false));
        let playing_cb = Arc::clone(&playing);
        let analyser_cb = analyser.clone();
        let mut mono = Vec::<f32>::with_capacity(4096);

        // Build audio output stream
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if playing_cb.load(Ordering::Acquire) {
                        if !source.render(data, channels) {
                            playing_cb.store(false, Ordering::Release);
                        }
                    } else {
                        data.fill(0.0);
                    }

                    mono.clear();
                    for frame in data.chunks_mut(channels) {
                        // Safety limiter: hard clip to full scale
                        for sample in frame.iter_mut() {
                            *sample = sample.clamp(-1.0, 1.0);
                        }
                        mono.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                    // Paused output is silence, and the analyser hears it as such
                    analyser_cb.write_samples(&mono);

                    write_recording(&mut wav_writer, data);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::Audio(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start audio stream: {}", e)))?;

        Ok(Self {
            analyser,
            playing,
            sample_rate,
            duration_secs,
            _stream: stream,
        })
    }

    /// Shared handle to this system's analyser
    pub fn analyser(&self) -> AnalyserNode {
        self.analyser.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        if playing && self.duration_secs == Some(0.0) {
            warn!("Source is empty, nothing to play");
            return;
        }
        self.playing.store(playing, Ordering::Release);
    }

    /// Flip play/pause, returning the new state
    pub fn toggle(&self) -> bool {
        let playing = !self.is_playing();
        self.set_playing(playing);
        self.is_playing()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> Option<f32> {
        self.duration_secs
    }
}

/// Append output samples to the recording, if one is running
///
/// The first failed write stops the recording for good; the writer is
/// dropped so the header gets one last update.
fn write_recording<W: Write + Seek>(recording: &mut Option<hound::WavWriter<W>>, data: &[f32]) {
    let Some(writer) = recording.as_mut() else {
        return;
    };
    for &sample in data {
        if let Err(e) = writer.write_sample(sample) {
            warn!("Audio recording stopped: {}", e);
            *recording = None;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, SeekFrom};

    /// In-memory sink that refuses to grow past `limit` bytes
    struct LimitedSink {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.inner.position() + buf.len() as u64 > self.limit {
                return Err(io::Error::other("disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for LimitedSink {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn recorder(limit: u64) -> Option<hound::WavWriter<LimitedSink>> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let sink = LimitedSink {
            inner: Cursor::new(Vec::new()),
            limit,
        };
        Some(hound::WavWriter::new(sink, spec).unwrap())
    }

    #[test]
    fn test_recording_appends_samples() {
        let mut recording = recorder(u64::MAX);
        write_recording(&mut recording, &[0.25; 8]);
        write_recording(&mut recording, &[-0.5; 8]);
        assert_eq!(recording.as_ref().unwrap().len(), 16);
    }

    #[test]
    fn test_failed_write_stops_recording() {
        let mut recording = recorder(200);
        write_recording(&mut recording, &[0.1; 4]);
        assert!(recording.is_some());

        // 400 bytes of samples cannot fit
        write_recording(&mut recording, &[0.1; 100]);
        assert!(recording.is_none());

        // Later callbacks are a no-op
        write_recording(&mut recording, &[0.1; 4]);
        assert!(recording.is_none());
    }
}
