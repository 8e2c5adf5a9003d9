//! Engine behavior against the deterministic synthetic stream.

#![allow(clippy::unwrap_used)]

use audiosource::config::EngineConfig;
use audiosource::source::synthetic::SyntheticBackend;
use audiosource::source::{AudioSource, DelayReference, DelaySpec, TrackStart};
use audiosource::{Error, ErrorKind};

const RATE: u32 = 48_000;

fn open(backend: SyntheticBackend, delay: DelaySpec, engine: &EngineConfig) -> AudioSource<SyntheticBackend> {
    AudioSource::with_backend(backend, delay, engine).unwrap()
}

fn open_default(backend: SyntheticBackend) -> AudioSource<SyntheticBackend> {
    open(backend, DelaySpec::default(), &EngineConfig::default())
}

fn tiny_cache() -> EngineConfig {
    EngineConfig {
        cache_max_frames: 2,
        ..EngineConfig::default()
    }
}

fn reference(channels: usize, len: u64, start: u64, count: u64) -> Vec<Vec<u8>> {
    SyntheticBackend::reference(channels, len, start, count)
}

#[test]
fn test_returns_exact_counts_matching_reference() {
    let len = 100_000;
    let mut source = open_default(SyntheticBackend::new(RATE, 2, len));

    for (start, count) in [(0_u64, 1_u64), (0, 1_152), (1_151, 2), (33_333, 10_000), (99_999, 1)] {
        let planes = source
            .get_audio_planar(i64::try_from(start).unwrap(), i64::try_from(count).unwrap())
            .unwrap();
        assert_eq!(planes.len(), 2);
        assert!(planes.iter().all(|p| p.len() == usize::try_from(count * 2).unwrap()));
        assert_eq!(planes, reference(2, len, start, count), "range {start}+{count}");
    }
}

#[test]
fn test_repeated_requests_are_identical() {
    let mut source = open_default(SyntheticBackend::new(RATE, 1, 200_000).with_seek_granularity(4));

    let first = source.get_audio_planar(70_001, 5_000).unwrap();
    let _ = source.get_audio_planar(150_000, 5_000).unwrap();
    let second = source.get_audio_planar(70_001, 5_000).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cached_and_cold_paths_agree() {
    let len = 120_000;
    let mut cold = open_default(SyntheticBackend::new(RATE, 2, len));
    let cold_range = cold.get_audio_planar(40_000, 9_000).unwrap();

    let mut warm = open_default(SyntheticBackend::new(RATE, 2, len));
    let _ = warm.get_audio_planar(30_000, 30_000).unwrap();
    let before = warm.stats();
    let warm_range = warm.get_audio_planar(40_000, 9_000).unwrap();
    let after = warm.stats();

    assert_eq!(cold_range, warm_range);
    assert_eq!(after.frames_decoded, before.frames_decoded, "served from cache");
    assert!(after.cache_hits > before.cache_hits);
}

#[test]
fn test_sequential_requests_never_seek() {
    let len = 480_000;
    let mut source = open_default(SyntheticBackend::new(RATE, 1, len));

    let block = 4_800_u64;
    for i in 0..(len / block) {
        let start = i * block;
        let planes = source
            .get_audio_planar(i64::try_from(start).unwrap(), i64::try_from(block).unwrap())
            .unwrap();
        assert_eq!(planes, reference(1, len, start, block));
    }
    let stats = source.stats();
    assert_eq!(stats.seeks, 0);
    assert_eq!(stats.samples_decoded, len);
}

#[test]
fn test_small_forward_skip_continues_without_seeking() {
    let mut source = open_default(SyntheticBackend::new(RATE, 1, 200_000));
    let _ = source.get_audio_planar(0, 1_000).unwrap();
    let planes = source.get_audio_planar(20_000, 1_000).unwrap();
    assert_eq!(planes, reference(1, 200_000, 20_000, 1_000));
    assert_eq!(source.stats().seeks, 0);
}

#[test]
fn test_large_forward_skip_seeks_once() {
    let len = 1_000_000;
    let mut source = open_default(SyntheticBackend::new(RATE, 1, len));
    let _ = source.get_audio_planar(0, 1_000).unwrap();

    let planes = source.get_audio_planar(500_000, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 500_000, 1_000));
    assert_eq!(source.stats().seeks, 1);

    let planes = source.get_audio_planar(501_000, 10_000).unwrap();
    assert_eq!(planes, reference(1, len, 501_000, 10_000));
    assert_eq!(source.stats().seeks, 1);
}

#[test]
fn test_backward_jump_reseeks_and_trims() {
    let len = 200_000;
    let backend = SyntheticBackend::new(RATE, 2, len)
        .with_frame_len(1_000)
        .with_seek_granularity(3);
    let mut source = open(backend, DelaySpec::default(), &tiny_cache());

    for start in (0..len).step_by(10_000) {
        let _ = source
            .get_audio_planar(i64::try_from(start).unwrap(), 10_000)
            .unwrap();
    }
    assert_eq!(source.stats().seeks, 0);

    let planes = source.get_audio_planar(1_500, 5_000).unwrap();
    assert_eq!(planes, reference(2, len, 1_500, 5_000));
    assert!(source.stats().seeks >= 1);
    assert!(source.stats().evictions > 0);
}

#[test]
fn test_random_access_with_tiny_cache_matches_reference() {
    let len = 300_000;
    let backend = SyntheticBackend::new(RATE, 2, len)
        .with_frame_len(1_152)
        .with_seek_granularity(4);
    let mut source = open(backend, DelaySpec::default(), &tiny_cache());

    let mut state = 0x2545_f491_u64;
    for _ in 0..50 {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        let start = (state >> 33) % (len + 2_000);
        let count = 1 + (state >> 13) % 6_000;
        let planes = source
            .get_audio_planar(i64::try_from(start).unwrap(), i64::try_from(count).unwrap())
            .unwrap();
        assert_eq!(planes, reference(2, len, start, count), "range {start}+{count}");
    }
}

#[test]
fn test_priming_frames_after_seek_are_never_cached() {
    let len = 200_000;
    let backend = SyntheticBackend::new(RATE, 1, len)
        .with_frame_len(1_000)
        .with_seek_granularity(3)
        .with_garbage_after_seek(1);
    let mut source = open_default(backend);

    let cold = source.get_audio_planar(150_017, 2_000).unwrap();
    assert_eq!(cold, reference(1, len, 150_017, 2_000));

    let back = source.get_audio_planar(145_000, 5_000).unwrap();
    assert_eq!(back, reference(1, len, 145_000, 5_000));
    assert_eq!(source.stats().seeks, 2);

    // Everything cached so far must match a decode from the start.
    let before = source.stats();
    let cached = source.get_audio_planar(144_000, 8_000).unwrap();
    assert_eq!(cached, reference(1, len, 144_000, 8_000));
    assert_eq!(source.stats().frames_decoded, before.frames_decoded);
}

#[test]
fn test_random_access_with_priming_matches_reference() {
    let len = 300_000;
    let backend = SyntheticBackend::new(RATE, 2, len)
        .with_frame_len(1_152)
        .with_seek_granularity(4)
        .with_garbage_after_seek(2);
    let engine = EngineConfig {
        cache_max_frames: 64,
        seek_tolerance_samples: 0,
        ..EngineConfig::default()
    };
    let mut source = open(backend, DelaySpec::default(), &engine);

    let mut state = 0x9e37_79b9_u64;
    for _ in 0..50 {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        let start = (state >> 33) % (len + 2_000);
        let count = 1 + (state >> 13) % 6_000;
        let planes = source
            .get_audio_planar(i64::try_from(start).unwrap(), i64::try_from(count).unwrap())
            .unwrap();
        assert_eq!(planes, reference(2, len, start, count), "range {start}+{count}");
    }
    assert!(source.stats().seeks > 0);
}

#[test]
fn test_late_seek_retries_further_back() {
    let len = 200_000;
    let backend = SyntheticBackend::new(RATE, 1, len)
        .with_frame_len(1_000)
        .with_late_seeks(3_000);
    let mut source = open_default(backend);

    let planes = source.get_audio_planar(100_000, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 100_000, 1_000));
    assert_eq!(source.stats().seeks, 2);
}

#[test]
fn test_persistently_late_seeks_fall_back_to_start() {
    let len = 300_000;
    let backend = SyntheticBackend::new(RATE, 1, len)
        .with_frame_len(1_000)
        .with_late_seeks(100_000);
    let engine = EngineConfig::default();
    let mut source = open(backend, DelaySpec::default(), &engine);

    let planes = source.get_audio_planar(150_000, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 150_000, 1_000));
    assert_eq!(source.stats().seeks, u64::from(engine.max_seek_attempts));
}

#[test]
fn test_tail_past_end_is_silence() {
    let len = 10_000;
    let mut source = open_default(SyntheticBackend::new(RATE, 1, len));

    let planes = source.get_audio_planar(9_500, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 9_500, 1_000));
    assert!(planes[0][1_000..].iter().all(|&b| b == 0));

    let planes = source.get_audio_planar(50_000, 100).unwrap();
    assert!(planes[0].iter().all(|&b| b == 0));
}

#[test]
fn test_stream_shorter_than_nominal_is_padded() {
    let backend = SyntheticBackend::new(RATE, 1, 10_000).with_nominal_len(12_000);
    let mut source = open_default(backend);
    assert_eq!(source.properties().num_samples, 12_000);

    let planes = source.get_audio_planar(9_000, 2_000).unwrap();
    assert_eq!(planes, reference(1, 10_000, 9_000, 2_000));
}

#[test]
fn test_exact_duration_only_changes_sample_count() {
    let backend = SyntheticBackend::new(RATE, 2, 90_001).with_nominal_len(95_000);
    let mut source = open_default(backend);
    let before = source.properties().clone();
    assert!(!before.exact_samples);

    let _ = source.get_audio_planar(60_000, 1_000).unwrap();
    source.establish_exact_duration().unwrap();
    let after = source.properties().clone();

    assert_eq!(after.num_samples, 90_001);
    assert!(after.exact_samples);
    assert_eq!(after.format, before.format);
    assert_eq!(after.channels, before.channels);
    assert_eq!(after.channel_layout, before.channel_layout);
    assert_eq!(after.sample_rate, before.sample_rate);

    let decoded = source.stats().samples_decoded;
    source.establish_exact_duration().unwrap();
    assert_eq!(source.properties(), &after);
    assert_eq!(source.stats().samples_decoded, decoded, "second call is free");

    let planes = source.get_audio_planar(89_000, 2_000).unwrap();
    assert_eq!(planes, reference(2, 90_001, 89_000, 2_000));
}

#[test]
fn test_exact_duration_continues_from_start_without_seeking() {
    let mut source = open_default(SyntheticBackend::new(RATE, 1, 50_000));
    let _ = source.get_audio_planar(0, 10_000).unwrap();
    source.establish_exact_duration().unwrap();

    assert_eq!(source.properties().num_samples, 50_000);
    assert_eq!(source.stats().seeks, 0);
    assert_eq!(source.stats().samples_decoded, 50_000);
}

#[test]
fn test_positive_delay_skips_into_stream() {
    let len = 100_000;
    let mut source = open(
        SyntheticBackend::new(RATE, 1, len),
        DelaySpec::samples(1_000),
        &EngineConfig::default(),
    );

    assert_eq!(source.properties().num_samples, len - 1_000);
    let planes = source.get_audio_planar(0, 500).unwrap();
    assert_eq!(planes, reference(1, len, 1_000, 500));
}

#[test]
fn test_negative_delay_prepends_silence() {
    let len = 100_000;
    let mut source = open(
        SyntheticBackend::new(RATE, 2, len),
        DelaySpec::samples(-1_000),
        &EngineConfig::default(),
    );

    assert_eq!(source.properties().num_samples, len + 1_000);
    let planes = source.get_audio_planar(0, 1_500).unwrap();
    let expected = reference(2, len, 0, 500);
    for (plane, tail) in planes.iter().zip(&expected) {
        assert!(plane[..2_000].iter().all(|&b| b == 0));
        assert_eq!(&plane[2_000..], tail.as_slice());
    }

    let planes = source.get_audio_planar(1_000, 10).unwrap();
    assert_eq!(planes, reference(2, len, 0, 10));
}

#[test]
fn test_auto_delay_from_track_start() {
    let late_audio = TrackStart {
        ts: 500,
        numer: 1,
        denom: 1_000,
    };
    let backend = SyntheticBackend::new(RATE, 1, 100_000).with_audio_start(late_audio);
    let mut source = open(
        backend,
        DelaySpec {
            adjustment: 0,
            auto: Some(DelayReference::EarliestTrack),
        },
        &EngineConfig::default(),
    );

    assert_eq!(source.delay_offset(), -24_000);
    let planes = source.get_audio_planar(23_999, 2).unwrap();
    assert_eq!(&planes[0][..2], &[0, 0]);
    assert_eq!(&planes[0][2..], reference(1, 100_000, 0, 1)[0].as_slice());
}

#[test]
fn test_ten_second_scenario() {
    let len = 480_000;
    for engine in [EngineConfig::default(), tiny_cache()] {
        let mut source = open(SyntheticBackend::new(RATE, 1, len), DelaySpec::default(), &engine);

        let first = source.get_audio_planar(0, 48_000).unwrap();
        let second = source.get_audio_planar(48_000, 48_000).unwrap();
        let third = source.get_audio_planar(0, 48_000).unwrap();

        assert_eq!(first, reference(1, len, 0, 48_000));
        assert_eq!(second, reference(1, len, 48_000, 48_000));
        assert_eq!(third, first);
    }
}

#[test]
fn test_decode_failure_fails_call_but_instance_survives() {
    let len = 20_000;
    let backend = SyntheticBackend::new(RATE, 1, len)
        .with_frame_len(1_000)
        .with_failure_at(5_000);
    let mut source = open_default(backend);

    let err = source.get_audio_planar(4_000, 2_000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let planes = source.get_audio_planar(0, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 0, 1_000));

    let planes = source.get_audio_planar(10_000, 1_000).unwrap();
    assert_eq!(planes, reference(1, len, 10_000, 1_000));

    assert!(source.get_audio_planar(5_500, 10).is_err());
}

#[test]
fn test_invalid_requests_are_rejected() {
    let mut source = open_default(SyntheticBackend::new(RATE, 2, 10_000));

    assert!(matches!(
        source.get_audio_planar(-1, 10).unwrap_err(),
        Error::InvalidRange { .. }
    ));
    assert!(matches!(
        source.get_audio_planar(0, 0).unwrap_err(),
        Error::InvalidRange { .. }
    ));

    let mut one = vec![0_u8; 20];
    let err = source.get_audio(0, 10, &mut [one.as_mut_slice()]).unwrap_err();
    assert!(matches!(err, Error::OutputBuffer { .. }));
    assert_eq!(err.kind(), ErrorKind::Audio);

    let mut left = vec![0_u8; 20];
    let mut right = vec![0_u8; 19];
    let err = source
        .get_audio(0, 10, &mut [left.as_mut_slice(), right.as_mut_slice()])
        .unwrap_err();
    assert!(matches!(err, Error::OutputBuffer { .. }));
}

#[test]
fn test_unallocatable_request_is_an_error() {
    let mut source = open_default(SyntheticBackend::new(RATE, 2, 10_000));
    let err = source.get_audio_planar(0, i64::MAX).unwrap_err();
    assert!(matches!(err, Error::OutputBuffer { .. }));
}

#[test]
fn test_oversized_buffers_are_filled_only_for_count() {
    let mut source = open_default(SyntheticBackend::new(RATE, 1, 10_000));
    let mut plane = vec![0xaa_u8; 40];
    source.get_audio(100, 10, &mut [plane.as_mut_slice()]).unwrap();
    assert_eq!(&plane[..20], reference(1, 10_000, 100, 10)[0].as_slice());
    assert!(plane[20..].iter().all(|&b| b == 0xaa));
}
