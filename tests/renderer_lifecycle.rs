//! Frame-loop lifecycle against a host that records every call.

use spectroglow::analysis::{AnalyserNode, FrequencySampler};
use spectroglow::params::{AnalyserConfig, EqualizerStyle};
use spectroglow::visual::{
    FrameHost, FrameId, FrameOutcome, ListenerId, SpectrumRenderer, Viewport,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Request(FrameId),
    Cancel(FrameId),
    AddListener(ListenerId),
    RemoveListener(ListenerId),
}

/// Host that logs calls and lets the test fire frames by hand
struct SpyHost {
    viewport: Viewport,
    next_id: u64,
    calls: Vec<Call>,
}

impl SpyHost {
    fn new(width: f32, height: f32, dpr: f32) -> Self {
        Self {
            viewport: Viewport::new(width, height, dpr),
            next_id: 1,
            calls: Vec::new(),
        }
    }

    fn last_request(&self) -> Option<FrameId> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Request(id) => Some(*id),
            _ => None,
        })
    }

    fn requests(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Request(_)))
            .count()
    }
}

impl FrameHost for SpyHost {
    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.calls.push(Call::Request(id));
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.calls.push(Call::Cancel(id));
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.calls.push(Call::AddListener(id));
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.calls.push(Call::RemoveListener(id));
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

/// Sampler returning the same snapshot every frame
struct Fixed(Vec<u8>);

impl FrequencySampler for Fixed {
    fn frequency_bin_count(&self) -> usize {
        self.0.len()
    }

    fn sample_spectrum(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.0[..out.len()]);
    }
}

fn drawn(outcome: FrameOutcome) -> spectroglow::visual::FrameStats {
    match outcome {
        FrameOutcome::Drawn(stats) => stats,
        other => panic!("expected a drawn frame, got {:?}", other),
    }
}

#[test]
fn test_1024_bins_give_204_points() {
    let mut host = SpyHost::new(800.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(Fixed(vec![0; 1024]), &mut host);

    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));
    assert_eq!(stats.points, 204);

    // Silence draws a flat line through the center
    let scene = renderer.last_scene().unwrap();
    assert!(scene.waveform.points().iter().all(|p| p.y == 100.0));
}

#[test]
fn test_full_bass_maxes_out_strokes() {
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(Fixed(vec![255; 1024]), &mut host);

    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));
    assert_eq!(stats.bass_energy, 1.0);
    assert_eq!(stats.intensity, 1.0);
    assert_eq!(stats.line_width, 10.0);
    assert_eq!(stats.glow_blur, 70.0);
    assert_eq!(stats.overdraw_passes, 2);
}

#[test]
fn test_quiet_bass_has_no_overdraw() {
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    // Mean of the first ten bins sits exactly on the threshold
    let mut snapshot = vec![0u8; 1024];
    snapshot[..10].fill(140);
    renderer.attach(Fixed(snapshot), &mut host);

    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));
    assert!(stats.bass_energy <= 0.55);
    assert_eq!(stats.intensity, 0.0);
    assert_eq!(stats.overdraw_passes, 0);
    assert_eq!(stats.line_width, 4.0);
}

#[test]
fn test_resize_uses_new_width_on_next_frame() {
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(Fixed(vec![128; 1024]), &mut host);

    let id = host.last_request().unwrap();
    drawn(renderer.on_frame(id, &mut host));
    assert_eq!(
        (renderer.surface().width(), renderer.surface().height()),
        (400, 200)
    );

    host.viewport = Viewport::new(640.0, 360.0, 2.0);
    assert!(renderer.on_resize(&mut host));
    assert_eq!(
        (renderer.surface().width(), renderer.surface().height()),
        (1280, 720)
    );

    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));
    // Already synced by the listener, nothing left to do this frame
    assert!(!stats.resized);

    let last = *renderer.last_scene().unwrap().waveform.points().last().unwrap();
    assert!((last.x - 640.0).abs() < 1e-3);
}

#[test]
fn test_frame_catches_resize_without_event() {
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(Fixed(vec![0; 256]), &mut host);

    host.viewport = Viewport::new(300.0, 100.0, 1.5);
    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));

    assert!(stats.resized);
    assert_eq!(
        (renderer.surface().width(), renderer.surface().height()),
        (450, 150)
    );
}

#[test]
fn test_detach_cancels_frame_and_removes_listener() {
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(Fixed(vec![0; 1024]), &mut host);

    let first = host.last_request().unwrap();
    drawn(renderer.on_frame(first, &mut host));
    let pending = host.last_request().unwrap();
    let listener = host
        .calls
        .iter()
        .find_map(|call| match call {
            Call::AddListener(id) => Some(*id),
            _ => None,
        })
        .unwrap();

    renderer.detach(&mut host);

    assert!(host.calls.contains(&Call::Cancel(pending)));
    assert!(host.calls.contains(&Call::RemoveListener(listener)));

    // A callback that slipped through after teardown draws nothing
    let requests = host.requests();
    let drawn_before = renderer.frames_drawn();
    assert_eq!(renderer.on_frame(pending, &mut host), FrameOutcome::Idle);
    assert_eq!(renderer.frames_drawn(), drawn_before);
    assert_eq!(host.requests(), requests);
}

#[test]
fn test_live_analyser_drives_renderer() {
    let analyser = AnalyserNode::new(AnalyserConfig::default()).unwrap();
    let mut host = SpyHost::new(400.0, 200.0, 1.0);
    let mut renderer = SpectrumRenderer::new(EqualizerStyle::default(), host.viewport());
    renderer.attach(analyser.clone(), &mut host);

    analyser.write_samples(&[0.0; 2048]);
    let id = host.last_request().unwrap();
    let stats = drawn(renderer.on_frame(id, &mut host));
    assert_eq!(stats.points, 204);
    assert_eq!(stats.intensity, 0.0);
}
