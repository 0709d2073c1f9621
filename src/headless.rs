//! Offline rendering: a WAV file in, a numbered PNG sequence out.
//!
//! No window and no audio device. The track is advanced one frame interval
//! at a time, so the analyser always holds the samples preceding the frame
//! being drawn, exactly as it would during live playback.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::analysis::AnalyserNode;
use crate::audio::{AudioSource, WavTrack};
use crate::error::{Error, Result};
use crate::params::{audio_constants, Config};
use crate::visual::{FrameOutcome, SpectrumRenderer, TickScheduler, Viewport, Visibility};

/// Offline render settings
#[derive(Debug, Clone)]
pub struct OfflineOptions {
    pub config: Config,

    /// Output frame rate (FPS)
    pub fps: u32,

    /// Physical pixels per logical pixel of the output frames
    pub device_pixel_ratio: f32,

    /// Stop after this many seconds even if the track is longer
    pub max_duration_secs: Option<f32>,
}

impl Default for OfflineOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            fps: 60,
            device_pixel_ratio: 1.0,
            max_duration_secs: None,
        }
    }
}

/// What an offline render produced
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineSummary {
    pub frames_written: usize,
    /// Highest intensity reached on any frame
    pub peak_intensity: f32,
    /// Output frame size (physical pixels)
    pub frame_size: (u32, u32),
    pub out_dir: PathBuf,
}

/// Render `wav` to `out_dir/frame_00000.png`, `frame_00001.png`, ...
pub fn render_offline(
    wav: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    options: &OfflineOptions,
) -> Result<OfflineSummary> {
    let track = WavTrack::open(wav)?.resampled(audio_constants::DEFAULT_SAMPLE_RATE_HZ);
    render_track(track, out_dir, options)
}

/// Render an already decoded track
pub fn render_track(
    track: WavTrack,
    out_dir: impl AsRef<Path>,
    options: &OfflineOptions,
) -> Result<OfflineSummary> {
    options.config.validate()?;
    if options.fps == 0 {
        return Err(Error::Config("fps must be positive".to_string()));
    }

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let sample_rate = track.sample_rate().max(1);
    let fps = options.fps as u64;
    let mut total_frames = (track.frames() as u64 * fps).div_ceil(sample_rate as u64) as usize;
    if let Some(max) = options.max_duration_secs {
        total_frames = total_frames.min((max.max(0.0) * options.fps as f32).ceil() as usize);
    }

    let render = &options.config.render;
    let viewport = Viewport::new(
        render.window_width as f32,
        render.window_height as f32,
        options.device_pixel_ratio,
    );

    let analyser = AnalyserNode::new(options.config.analyser.clone())?;
    let mut host = TickScheduler::new(viewport);
    let mut renderer = SpectrumRenderer::new(options.config.equalizer.clone(), viewport);
    renderer.attach(analyser.clone(), &mut host);

    let mut visibility = Visibility::new(render);
    visibility.set_playing(true, Duration::ZERO);

    info!(
        "Offline render: {} frames @ {} fps into {}",
        total_frames,
        options.fps,
        out_dir.display()
    );

    let mut source = AudioSource::Track(track);
    let mut block = Vec::new();
    let mut samples_fed = 0u64;
    let mut peak_intensity = 0.0f32;
    let mut frames_written = 0;

    for frame_num in 0..total_frames {
        // Feed audio up to the end of this frame interval
        let frame_end = (frame_num as u64 + 1) * sample_rate as u64 / fps;
        block.resize((frame_end - samples_fed) as usize, 0.0);
        source.render(&mut block, 1);
        analyser.write_samples(&block);
        samples_fed = frame_end;

        let Some(id) = host.next_due() else {
            break;
        };
        if let FrameOutcome::Drawn(stats) = renderer.on_frame(id, &mut host) {
            peak_intensity = peak_intensity.max(stats.intensity);
        }

        let now = Duration::from_secs_f64(frame_num as f64 / options.fps as f64);
        let surface = renderer.surface();
        let pixels = surface.export_rgba(visibility.opacity(now), render.edge_feather);
        let path = out_dir.join(frame_file_name(frame_num));
        image::save_buffer(
            &path,
            &pixels,
            surface.width(),
            surface.height(),
            image::ColorType::Rgba8,
        )?;
        debug!("Wrote {}", path.display());
        frames_written += 1;
    }

    let frame_size = (renderer.surface().width(), renderer.surface().height());
    renderer.detach(&mut host);

    info!(
        "Offline render finished: {} frames, peak intensity {:.2}",
        frames_written, peak_intensity
    );

    Ok(OfflineSummary {
        frames_written,
        peak_intensity,
        frame_size,
        out_dir: out_dir.to_path_buf(),
    })
}

/// File name of one numbered frame
pub fn frame_file_name(frame_num: usize) -> String {
    format!("frame_{:05}.png", frame_num)
}
