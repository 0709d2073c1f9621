//! Window, compositing and recording configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (logical pixels)
    pub window_width: u32,

    /// Window height (logical pixels)
    pub window_height: u32,

    /// Opacity-transition duration when playback starts or stops (seconds)
    pub fade_duration_s: f32,

    /// Surface opacity while audio is playing
    pub playing_opacity: f32,

    /// Width of the transparent-to-opaque ramp on each horizontal edge,
    /// as a fraction of surface width
    pub edge_feather: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fade_duration_s: 1.5,
            playing_opacity: 1.0,
            edge_feather: 0.1,
        }
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames and audio
    pub output_dir: PathBuf,

    /// Frame rate (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: PathBuf::from("recording"),
            fps: 60,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs * self.fps as f32).ceil() as usize
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    /// Path of one numbered frame
    pub fn frame_path(&self, frame_num: usize) -> PathBuf {
        self.frames_dir().join(format!("frame_{:05}.png", frame_num))
    }

    /// Audio file path
    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join("audio.wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_paths() {
        let config = RecordingConfig::new(2.5);
        assert_eq!(config.total_frames(), 150);
        assert_eq!(
            config.frame_path(7),
            PathBuf::from("recording/frames/frame_00007.png")
        );
        assert_eq!(config.audio_path(), PathBuf::from("recording/audio.wav"));
    }
}
