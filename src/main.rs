//! Spectroglow - a glowing waveform that breathes with the music
//!
//! The low end of the spectrum drives a smoothed line with neon glow and
//! mirrored reflections; heavy bass hits thicken and brighten it.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use spectroglow::analysis::AnalyserNode;
use spectroglow::audio::AudioSystem;
use spectroglow::cli::Args;
use spectroglow::headless::render_offline;
use spectroglow::params::{Config, RecordingConfig};
use spectroglow::rendering::RenderSystem;
use spectroglow::visual::{
    FrameHost, FrameId, FrameOutcome, ListenerId, SpectrumRenderer, Viewport, Visibility,
};

/// Frame host backed by winit redraw requests
struct WindowHost {
    window: Arc<Window>,
    next_id: u64,
    pending: Option<FrameId>,
    listeners: Vec<ListenerId>,
}

impl WindowHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 1,
            pending: None,
            listeners: Vec::new(),
        }
    }

    fn has_resize_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl FrameHost for WindowHost {
    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.pending = Some(id);
        self.window.request_redraw();
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|&listener| listener != id);
    }

    fn viewport(&self) -> Viewport {
        let scale = self.window.scale_factor();
        let size = self.window.inner_size().to_logical::<f32>(scale);
        Viewport::new(size.width, size.height, scale as f32)
    }
}

/// Main application state
struct App {
    args: Args,
    config: Config,
    recording: Option<RecordingConfig>,

    // Window and rendering
    window: Option<Arc<Window>>,
    host: Option<WindowHost>,
    render_system: Option<RenderSystem>,
    renderer: Option<SpectrumRenderer<AnalyserNode>>,

    audio: Option<AudioSystem>,
    visibility: Visibility,

    // Time tracking
    start_time: Instant,
    frames_recorded: usize,

    /// Failure that ended the event loop
    error: Option<anyhow::Error>,
}

impl App {
    fn new(args: Args, config: Config, recording: Option<RecordingConfig>) -> Self {
        let visibility = Visibility::new(&config.render);
        Self {
            args,
            config,
            recording,
            window: None,
            host: None,
            render_system: None,
            renderer: None,
            audio: None,
            visibility,
            start_time: Instant::now(),
            frames_recorded: 0,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("Spectroglow")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        // Initialize rendering system
        let render_system = pollster::block_on(RenderSystem::new(Arc::clone(&window)))
            .context("Failed to initialize renderer")?;

        // Initialize audio system
        let audio = AudioSystem::new(
            &self.args.source_spec(),
            self.config.analyser.clone(),
            self.recording.as_ref(),
        )
        .context("Failed to initialize audio")?;

        let mut host = WindowHost::new(Arc::clone(&window));
        let mut renderer = SpectrumRenderer::new(self.config.equalizer.clone(), host.viewport());
        renderer.attach(audio.analyser(), &mut host);

        audio.set_playing(true);

        info!("Spectroglow is running! Space: play/pause, Esc: quit");

        self.window = Some(window);
        self.host = Some(host);
        self.render_system = Some(render_system);
        self.renderer = Some(renderer);
        self.audio = Some(audio);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_resize(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        if let Some(render_system) = self.render_system.as_mut() {
            let size = window.inner_size();
            render_system.resize(size.width, size.height);
        }
        if let (Some(renderer), Some(host)) = (self.renderer.as_mut(), self.host.as_mut()) {
            if host.has_resize_listeners() {
                renderer.on_resize(host);
            }
        }
    }

    fn toggle_playback(&mut self) {
        if let Some(audio) = &self.audio {
            let playing = audio.toggle();
            info!("{}", if playing { "Playing" } else { "Paused" });
        }
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(host), Some(renderer), Some(render_system), Some(audio)) = (
            self.host.as_mut(),
            self.renderer.as_mut(),
            self.render_system.as_mut(),
            self.audio.as_ref(),
        ) else {
            return;
        };

        // Only the outstanding request produces a frame
        let Some(id) = host.pending.take() else {
            return;
        };
        if let FrameOutcome::Drawn(_) = renderer.on_frame(id, host) {
            render_system.upload(renderer.surface());
        }

        let now = self.start_time.elapsed();
        self.visibility.set_playing(audio.is_playing(), now);
        let opacity = self.visibility.opacity(now);
        let feather = self.config.render.edge_feather;

        match render_system.render(opacity, feather) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.handle_resize();
            }
            Err(e) => {
                self.fail(event_loop, anyhow::anyhow!("Render error: {:?}", e));
                return;
            }
        }

        if let Err(e) = self.capture_frame(opacity, feather) {
            self.fail(event_loop, e);
            return;
        }
        if let Some(recording) = &self.recording {
            if self.frames_recorded >= recording.total_frames() {
                info!(
                    "Recording complete: {} frames in {}",
                    self.frames_recorded,
                    recording.output_dir.display()
                );
                event_loop.exit();
            }
        }
    }

    /// Save the composited frame to disk (recording mode only)
    fn capture_frame(&mut self, opacity: f32, feather: f32) -> anyhow::Result<()> {
        let (Some(recording), Some(renderer)) = (&self.recording, &self.renderer) else {
            return Ok(());
        };
        let surface = renderer.surface();
        let pixels = surface.export_rgba(opacity, feather);
        let path = recording.frame_path(self.frames_recorded);
        image::save_buffer(
            &path,
            &pixels,
            surface.width(),
            surface.height(),
            image::ColorType::Rgba8,
        )
        .with_context(|| format!("Failed to save frame {}", path.display()))?;
        self.frames_recorded += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        if let (Some(renderer), Some(host)) = (self.renderer.as_mut(), self.host.as_mut()) {
            renderer.detach(host);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => self.toggle_playback(),
                _ => {}
            },
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.handle_resize();
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn init_logging(level: &str) {
    let default_directive = level
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy(); // RUST_LOG env var takes precedence

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = args.build_config().context("Invalid configuration")?;

    if let Some((audio, out_dir, options)) = args.offline_options(&config) {
        let summary = render_offline(&audio, &out_dir, &options)
            .with_context(|| format!("Offline render of {} failed", audio.display()))?;
        info!(
            "Wrote {} frames ({}x{}) to {}, peak intensity {:.2}",
            summary.frames_written,
            summary.frame_size.0,
            summary.frame_size.1,
            summary.out_dir.display(),
            summary.peak_intensity
        );
        return Ok(());
    }

    let recording = args
        .recording_config()
        .context("Failed to prepare recording")?;
    if let Some(recording) = &recording {
        info!(
            "Recording {}s ({} frames) to {}",
            recording.duration_secs,
            recording.total_frames(),
            recording.output_dir.display()
        );
    }

    let mut app = App::new(args, config, recording);
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
