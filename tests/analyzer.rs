use dasp::signal::{self, Signal};
use multiband_comp::audio::constants;
use multiband_comp::audio::processor::{MultibandProcessor, ProcessConfig};
use multiband_comp::audio::sample_relay::SampleTap;
use multiband_comp::audio::spectral_transform::{FftOrder, SpectralFrame, SpectralTransform};
use multiband_comp::ui::{AnalyzerPipeline, CurveGenerator, DbRange, PathConsumer, Rect};
use multiband_comp::{BandParameters, GlobalParameters, SharedParameters};
use std::sync::Arc;

const SAMPLE_RATE: f32 = 48000.0;

fn sine(frequency: f64, amplitude: f32, len: usize) -> Vec<f32> {
    signal::rate(SAMPLE_RATE as f64)
        .const_hz(frequency)
        .sine()
        .take(len)
        .map(|s| s as f32 * amplitude)
        .collect()
}

fn pipeline(area: Rect) -> (SampleTap, AnalyzerPipeline, Vec<PathConsumer>) {
    let (tap, mut pipeline, paths) =
        AnalyzerPipeline::connect(2, FftOrder::Order2048, SAMPLE_RATE).unwrap();
    pipeline.set_area(area);

    (tap, pipeline, paths)
}

#[test]
fn bin_centred_sine_gives_a_single_peak() {
    for order in [FftOrder::Order2048, FftOrder::Order4096, FftOrder::Order8192] {
        let size = order.size();
        let bin = size / 32;
        let frequency = bin as f64 * SAMPLE_RATE as f64 / size as f64;

        let mut transform = SpectralTransform::new(order, SAMPLE_RATE);
        for chunk in sine(frequency, 1.0, size).chunks(constants::RELAY_CHUNK_SIZE) {
            transform.push_chunk(chunk, -150.0);
        }
        let frame = transform.latest_frame().unwrap();
        let magnitudes = frame.magnitudes_db();

        let (peak_bin, peak_db) = magnitudes
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, db)| if db > best.1 { (i, db) } else { best });
        assert!(peak_bin.abs_diff(bin) <= 1, "{order:?}: peak at {peak_bin}, expected {bin}");
        assert!(peak_db.abs() < 0.5, "{order:?}: peak reads {peak_db} dB");

        for (i, &db) in magnitudes.iter().enumerate() {
            if i.abs_diff(bin) > 4 {
                assert!(db < -60.0, "{order:?}: bin {i} reads {db} dB");
            }
        }
    }
}

#[test]
fn paths_have_one_point_per_column() {
    let generator = CurveGenerator::new(DbRange::default());
    for order in [FftOrder::Order2048, FftOrder::Order4096, FftOrder::Order8192] {
        let mut transform = SpectralTransform::new(order, SAMPLE_RATE);
        transform.push_chunk(&sine(440.0, 0.5, 4096), -48.0);
        let frame = transform.latest_frame().unwrap();

        for width in [1.0, 37.0, 300.0, 1024.0, 1920.0] {
            let area = Rect::new(13.0, 4.0, width, 120.0);
            let path = generator.generate(&frame, area);
            let points = path.points();

            assert_eq!(points.len(), width as usize);
            assert_eq!(points[0].x, area.x);
            assert_eq!(points[points.len() - 1].x, area.x + width - 1.0);
            assert!(points.windows(2).all(|pair| pair[0].x < pair[1].x));
            assert!(points.iter().all(|p| p.y >= area.y && p.y <= area.bottom()));
        }
    }
}

#[test]
fn silence_saturates_at_the_floor() {
    let area = Rect::new(0.0, 0.0, 500.0, 200.0);

    // Includes floors below what `util::gain_to_db()` can return
    for floor_db in [-60.0, -120.0, -150.0] {
        let (tap, mut pipeline, mut paths) = pipeline(area);
        pipeline.set_negative_infinity(floor_db);

        let params = Arc::new(SharedParameters::default());
        let mut processor = MultibandProcessor::new(params);
        processor
            .prepare(ProcessConfig {
                sample_rate: SAMPLE_RATE,
                max_block_size: 1024,
                num_channels: 2,
            })
            .unwrap();
        processor.attach_tap(tap);

        let (mut left, mut right) = (vec![0.0; 4096], vec![0.0; 4096]);
        processor.process(&mut [left.as_mut_slice(), right.as_mut_slice()]);

        assert_eq!(pipeline.tick(), 2);
        for path in paths.iter_mut() {
            let path = path.read();
            assert_eq!(path.len(), 500);
            assert!(
                path.points().iter().all(|p| p.y == area.bottom()),
                "silence drawn above the {floor_db} dB floor"
            );
        }
    }
}

#[test]
fn processed_tone_peaks_at_its_frequency() {
    let area = Rect::new(0.0, 0.0, 400.0, 100.0);
    let (tap, mut pipeline, mut paths) = pipeline(area);

    let params = Arc::new(SharedParameters::new(
        GlobalParameters::default(),
        BandParameters::default(),
    ));
    let mut processor = MultibandProcessor::new(params);
    processor
        .prepare(ProcessConfig {
            sample_rate: SAMPLE_RATE,
            max_block_size: 512,
            num_channels: 2,
        })
        .unwrap();
    processor.attach_tap(tap);

    let mut left = sine(1000.0, 0.5, 8192);
    let mut right = left.clone();
    processor.process(&mut [left.as_mut_slice(), right.as_mut_slice()]);
    pipeline.tick();

    for path in paths.iter_mut() {
        let points = path.read().points();
        let loudest = points
            .iter()
            .min_by(|a, b| a.y.total_cmp(&b.y))
            .unwrap();
        let frequency = constants::log_position_to_freq(loudest.x / area.width);

        assert!((frequency - 1000.0).abs() < 50.0, "peak drawn at {frequency} Hz");
        assert!(loudest.y < area.bottom() - 10.0);
    }
}

#[test]
fn disabled_ticks_leave_the_path_alone() {
    let area = Rect::new(0.0, 0.0, 256.0, 100.0);
    let (mut tap, mut pipeline, mut paths) = pipeline(area);

    tap.push(0, &sine(2000.0, 0.8, 4096));
    assert_eq!(pipeline.tick(), 1);
    let before = paths[0].read().clone();
    assert_eq!(before.len(), 256);

    let control = pipeline.control();
    control.set_enabled(false);
    tap.push(0, &vec![0.0; 4096]);
    assert_eq!(pipeline.tick(), 0);
    assert!(!paths[0].has_update());
    assert_eq!(paths[0].read(), &before);

    // Nothing was drained while disabled, so the silence shows up once enabled again
    control.set_enabled(true);
    assert_eq!(pipeline.tick(), 1);
    assert_ne!(paths[0].read(), &before);
}

#[test]
fn floor_changes_only_affect_later_ticks() {
    let area = Rect::new(0.0, 0.0, 128.0, 100.0);
    let (mut tap, mut pipeline, mut paths) = pipeline(area);

    tap.push(0, &sine(300.0, 0.1, 2048));
    pipeline.tick();
    let published = paths[0].read().clone();

    pipeline.set_negative_infinity(-90.0);
    assert_eq!(paths[0].read(), &published);
    assert_eq!(pipeline.latest_path(0), Some(&published));

    tap.push(0, &sine(300.0, 0.1, 2048));
    pipeline.tick();
    assert_ne!(paths[0].read(), &published);
}

#[test]
fn frames_from_the_same_history_map_identically() {
    let frame = SpectralFrame::silent(FftOrder::Order4096, SAMPLE_RATE, -48.0);
    let generator = CurveGenerator::default();
    let area = Rect::new(0.0, 0.0, 200.0, 50.0);

    assert_eq!(generator.generate(&frame, area), generator.generate(&frame, area));
}
