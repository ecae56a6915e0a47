mod common;

use std::sync::Arc;

use common::*;
use loopback_audio_core::{CaptureEngine, CaptureError, CaptureState, DeviceChangeListener, MixFormat, PlaybackStatus};

fn started_engine(provider: &Arc<ScriptedProvider>) -> CaptureEngine {
    init_logging();
    let engine = CaptureEngine::new(provider.clone(), test_config()).unwrap();
    engine.initialize(10, RATE).unwrap();
    engine
}

#[test]
fn identity_capture_is_delayed_by_the_prepare_threshold() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let mut reader = engine.playback_reader();
    let prepare = engine.config().prepare_buffer_size;
    const STEP: usize = 1024;

    let mut delivered = Vec::new();
    let mut silent_reads = 0;
    for step in 0..8 {
        provider.push(&stereo_ramp(step * STEP, STEP));
        let expected_len = (step + 1) * STEP - delivered.len();
        assert!(wait_until(|| engine.playback_len(0) == expected_len));

        let (block, status) = reader.get_buffer_with_status(0, STEP);
        match status {
            PlaybackStatus::Preparing => {
                assert!(block.iter().all(|&s| s == 0.0));
                silent_reads += 1;
            }
            PlaybackStatus::Delivered => delivered.extend_from_slice(block),
            other => panic!("unexpected status {:?}", other),
        }
    }

    // Silent until the queue first held `prepare` samples.
    assert_eq!(silent_reads, prepare / STEP - 1);
    assert_eq!(engine.state(), CaptureState::Playing);
    let expected: Vec<f32> = stereo_ramp(0, delivered.len()).into_iter().step_by(2).collect();
    assert_eq!(delivered, expected);
}

#[test]
fn playback_start_is_reported_off_the_render_thread() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let delegate = Arc::new(RecordingDelegate::default());
    engine.set_delegate(delegate.clone());
    let prepare = engine.config().prepare_buffer_size;

    provider.push(&stereo_ramp(0, prepare));
    assert!(wait_until(|| engine.playback_len(0) == prepare));
    let render = std::thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let status = engine.read_playback(0, &mut [0.0; 256]);
            (engine, status)
        })
        .unwrap();
    let (engine, status) = render.join().unwrap();
    assert_eq!(status, PlaybackStatus::Delivered);
    assert_eq!(engine.state(), CaptureState::Playing);

    let started = (CaptureState::Preparing, CaptureState::Playing);
    assert!(wait_until(|| delegate.transitions.lock().contains(&started)));
    let transitions = delegate.transitions.lock().clone();
    let index = transitions.iter().position(|&t| t == started).unwrap();
    assert_eq!(delegate.threads.lock()[index].as_deref(), Some("loopback-capture"));
}

#[test]
fn preparing_reads_do_not_consume() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    provider.push(&stereo_ramp(0, 1000));
    assert!(wait_until(|| engine.playback_len(0) == 1000));

    for _ in 0..3 {
        assert_eq!(engine.read_playback(0, &mut [1.0; 256]), PlaybackStatus::Preparing);
    }
    assert_eq!(engine.playback_len(0), 1000);
    assert_eq!(engine.state(), CaptureState::Preparing);
}

#[test]
fn underrun_is_idempotent() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let mut reader = engine.playback_reader();
    provider.push(&stereo_ramp(0, 3200));
    assert!(wait_until(|| engine.playback_len(0) == 3200));

    assert_eq!(reader.get_buffer_with_status(0, 3000).1, PlaybackStatus::Delivered);
    for _ in 0..5 {
        let (block, status) = reader.get_buffer_with_status(0, 512);
        assert_eq!(status, PlaybackStatus::Underrun);
        assert!(block.iter().all(|&s| s == 0.0));
        assert_eq!(engine.playback_len(0), 200);
    }
    // Still playing: a read that fits is served.
    assert_eq!(reader.get_buffer(0, 200).len(), 200);
    assert_eq!(engine.playback_len(0), 0);
}

#[test]
fn reset_buffer_returns_to_preparing() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    provider.push(&stereo_ramp(0, 4000));
    assert!(wait_until(|| engine.playback_len(1) == 4000));
    assert_eq!(engine.read_playback(1, &mut [0.0; 64]), PlaybackStatus::Delivered);

    engine.reset_buffer();
    assert_eq!(engine.state(), CaptureState::Preparing);
    assert_eq!(engine.playback_len(0), 0);
    assert_eq!(engine.playback_len(1), 0);
    // Analysis data is untouched.
    assert_eq!(engine.analysis_len(0), 4000);
}

#[test]
fn catch_up_aligns_channels() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    provider.push(&stereo_ramp(0, 3500));
    assert!(wait_until(|| engine.playback_len(0) == 3500));

    assert_eq!(engine.read_playback(0, &mut [0.0; 500]), PlaybackStatus::Delivered);
    assert_eq!(engine.playback_len(1), 3500);
    engine.catch_up(1);
    assert_eq!(engine.playback_len(1), 3000);

    // The oldest samples were trimmed, so both channels read the same frames.
    let mut left = [0.0; 8];
    let mut right = [0.0; 8];
    engine.read_playback(0, &mut left);
    engine.read_playback(1, &mut right);
    assert_eq!(left.map(|s| -s), right);
}

#[test]
fn analysis_blocks_are_aligned() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    provider.push(&stereo_ramp(0, 1000));
    assert!(wait_until(|| engine.analysis_len(0) == 1000));

    let blocks = engine.take_analysis_blocks(256).unwrap();
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|c| c.len() == 768));
    assert_eq!(engine.analysis_len(0), 232);
    assert!(engine.take_analysis_blocks(256).is_none());

    engine.reset_analysis();
    assert_eq!(engine.analysis_len(1), 0);
}

#[test]
fn failed_initialize_leaves_state_unchanged() {
    init_logging();
    let provider = ScriptedProvider::new();
    provider.script.lock().failing_opens = 1;
    let engine = CaptureEngine::new(provider.clone(), test_config()).unwrap();

    assert_eq!(engine.initialize(10, RATE), Err(CaptureError::DeviceNotAvailable));
    assert_eq!(engine.state(), CaptureState::Constructed);
    assert!(!engine.is_initialized());
    assert_eq!(engine.device_generation(), 0);

    engine.initialize(10, RATE).unwrap();
    assert_eq!(engine.state(), CaptureState::Preparing);
    assert_eq!(engine.num_channels(), 2);
    assert_eq!(engine.device_generation(), 1);
}

#[test]
fn unsupported_format_is_rejected_and_source_stopped() {
    init_logging();
    let format = MixFormat {
        bits_per_sample: 16,
        block_align: 4,
        ..MixFormat::float32(RATE, 2)
    };
    let provider = ScriptedProvider::with_format(format);
    let engine = CaptureEngine::new(provider.clone(), test_config()).unwrap();

    let err = engine.initialize(10, RATE).unwrap_err();
    assert!(matches!(err, CaptureError::UnsupportedFormat(_)));
    assert_eq!(provider.stops(), 1);
    assert_eq!(engine.state(), CaptureState::Constructed);
}

#[test]
fn capture_failure_reinitializes_without_stopping() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let delegate = Arc::new(RecordingDelegate::default());
    engine.set_delegate(delegate.clone());

    provider.script.lock().fail_next_poll = true;
    assert!(wait_until(|| provider.opens() == 2 && engine.state() == CaptureState::Preparing));
    assert_eq!(engine.device_generation(), 2);
    assert_eq!(delegate.errors.lock().len(), 1);

    let transitions = delegate.transitions.lock().clone();
    assert!(transitions.contains(&(CaptureState::Preparing, CaptureState::Reinitializing)));
    assert!(transitions.contains(&(CaptureState::Reinitializing, CaptureState::Preparing)));

    // The new stream captures normally.
    provider.push(&stereo_ramp(0, 300));
    assert!(wait_until(|| engine.playback_len(0) == 300));
}

#[test]
fn failed_reacquisition_is_retried() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    {
        let mut script = provider.script.lock();
        script.failing_opens = 3;
        script.fail_next_poll = true;
    }
    assert!(wait_until(|| engine.state() == CaptureState::Preparing && provider.opens() == 2));
    assert_eq!(provider.script.lock().failing_opens, 0);
}

#[test]
fn device_change_requests_reinitialize() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let listener = engine.device_change_listener();

    listener.on_default_device_changed();
    assert!(wait_until(|| engine.device_generation() == 2 && engine.state() == CaptureState::Preparing));
    assert_eq!(provider.opens(), 2);
    assert_eq!(engine.sample_rate(), RATE);
}

#[test]
fn reinitialize_at_a_new_rate_resamples() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);

    engine.request_reinitialize(44100);
    assert!(wait_until(|| engine.device_generation() == 2 && engine.state() == CaptureState::Preparing));
    assert_eq!(engine.sample_rate(), 44100);

    provider.push(&stereo_ramp(0, 4800));
    assert!(wait_until(|| engine.playback_len(0) > 3000));
    let len = engine.playback_len(0);
    assert!(len <= 4410, "resampled length {}", len);
}

#[test]
fn stop_is_terminal() {
    let provider = ScriptedProvider::new();
    let engine = started_engine(&provider);
    let mut reader = engine.playback_reader();
    engine.stop();

    assert_eq!(engine.state(), CaptureState::Stopped);
    assert!(provider.stops() >= 1);
    assert!(matches!(engine.initialize(10, RATE), Err(CaptureError::InvalidState(_))));
    assert_eq!(reader.get_buffer_with_status(0, 16).1, PlaybackStatus::Inactive);

    // Requests after stop are ignored.
    engine.request_reinitialize(RATE);
    assert_eq!(engine.state(), CaptureState::Stopped);
    engine.stop();
}
