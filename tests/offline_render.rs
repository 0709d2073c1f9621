use spectroglow::headless::{frame_file_name, render_offline, OfflineOptions};

fn write_wav(path: &std::path::Path, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        // Same signal on both channels
        writer.write_sample(s).unwrap();
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_wav_to_png_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    let tone: Vec<i16> = (0..22050)
        .map(|i| ((i as f32 * 60.0 * std::f32::consts::TAU / 22050.0).sin() * 20000.0) as i16)
        .collect();
    write_wav(&wav, 22050, &tone);

    let mut options = OfflineOptions::default();
    options.config.render.window_width = 96;
    options.config.render.window_height = 48;
    options.fps = 10;

    let out = dir.path().join("frames");
    let summary = render_offline(&wav, &out, &options).unwrap();

    // One second at 10 fps, resampled to 44.1 kHz along the way
    assert_eq!(summary.frames_written, 10);
    assert_eq!(summary.frame_size, (96, 48));

    let last = image::open(out.join(frame_file_name(9))).unwrap().to_rgba8();
    assert_eq!(last.dimensions(), (96, 48));
    // Faded in far enough by now for the line to show
    assert!(last.pixels().any(|p| p[3] > 0));
}

#[test]
fn test_missing_wav_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = render_offline(
        dir.path().join("nope.wav"),
        dir.path(),
        &OfflineOptions::default(),
    );
    assert!(result.is_err());
}
