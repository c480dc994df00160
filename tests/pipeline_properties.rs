use posewatch::announce::{
    AnnouncementThrottle, Clock, CollectorSpeaker, ManualClock, ManualTimer, SystemClock,
    ThreadTimer,
};
use posewatch::classify::{PostureLabel, ScriptedEngine, interpret};
use posewatch::config::Config;
use posewatch::error::PosewatchError;
use posewatch::pipeline::PosturePipeline;
use posewatch::pose::{LandmarkName, LandmarkSet, Normalizer};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A seated pose with distinct coordinates for every joint.
fn seated_pose() -> Vec<[f32; 3]> {
    (0..33)
        .map(|i| {
            let t = i as f32 / 32.0;
            [0.35 + 0.3 * (t * 7.0).sin().abs(), 0.15 + 0.7 * t, -0.1 + 0.05 * t]
        })
        .collect()
}

fn hip_center(points: &[[f32; 3]]) -> (f32, f32) {
    let l = points[LandmarkName::LeftHip.index()];
    let r = points[LandmarkName::RightHip.index()];
    ((l[0] + r[0]) / 2.0, (l[1] + r[1]) / 2.0)
}

fn assert_close(a: &[f32], b: &[f32]) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < 1e-4, "index {}: {} vs {}", i, x, y);
    }
}

#[test]
fn features_have_132_values_with_presence_markers() {
    let features = Normalizer::default()
        .normalize(&LandmarkSet::from_points(&seated_pose()))
        .unwrap();

    assert_eq!(features.len(), 132);
    for i in 0..33 {
        assert_eq!(features.as_slice()[i * 4 + 3], 1.0);
    }
}

#[test]
fn features_ignore_translation() {
    let points = seated_pose();
    let shifted: Vec<[f32; 3]> = points.iter().map(|p| [p[0] + 0.2, p[1] - 0.15, p[2]]).collect();
    let normalizer = Normalizer::default();

    let a = normalizer.normalize(&LandmarkSet::from_points(&points)).unwrap();
    let b = normalizer.normalize(&LandmarkSet::from_points(&shifted)).unwrap();

    assert_close(a.as_slice(), b.as_slice());
}

#[test]
fn features_ignore_scale_about_hip_center() {
    let points = seated_pose();
    let (hx, hy) = hip_center(&points);
    let k = 1.7;
    let scaled: Vec<[f32; 3]> = points
        .iter()
        .map(|p| [hx + k * (p[0] - hx), hy + k * (p[1] - hy), k * p[2]])
        .collect();
    let normalizer = Normalizer::default();

    let a = normalizer.normalize(&LandmarkSet::from_points(&points)).unwrap();
    let b = normalizer.normalize(&LandmarkSet::from_points(&scaled)).unwrap();

    assert_close(a.as_slice(), b.as_slice());
}

#[test]
fn identical_landmarks_are_degenerate() {
    let result = Normalizer::default().normalize(&LandmarkSet::from_points(&[[0.4, 0.4, 0.1]; 33]));
    assert!(matches!(result, Err(PosewatchError::DegenerateScale { .. })));
}

#[test]
fn interpreter_examples() {
    let d = interpret(&[0.1, 0.9, 0.3]).unwrap();
    assert_eq!(d.label, PostureLabel::LegsUp);
    assert_eq!(d.confidence, 0.9);

    let d = interpret(&[0.5, 0.5, 0.1]).unwrap();
    assert_eq!(d.label, PostureLabel::Normal);
    assert_eq!(d.confidence, 0.5);

    assert!(matches!(interpret(&[]), Err(PosewatchError::EmptyScores)));
}

#[test]
fn throttle_announces_first_request_and_rearms_after_firing() {
    let clock = ManualClock::new();
    let timer = Arc::new(ManualTimer::new());
    let speaker = CollectorSpeaker::new();
    let throttle = AnnouncementThrottle::new(timer.clone(), Arc::new(speaker.clone()));
    let t0 = clock.now();

    assert!(throttle.request("Normal", t0).unwrap());
    assert!(!throttle.request("LyingDown", t0 + Duration::from_millis(500)).unwrap());

    assert_eq!(timer.fire_due(t0 + Duration::from_millis(1999)), 0);
    assert_eq!(timer.fire_due(t0 + Duration::from_millis(2000)), 1);
    assert_eq!(speaker.spoken(), vec!["Normal"]);
    assert_eq!(throttle.last_emission(), Some(t0 + Duration::from_millis(2000)));

    assert!(throttle.request("Normal", t0 + Duration::from_millis(2100)).unwrap());
    assert_eq!(timer.next_deadline(), Some(t0 + Duration::from_millis(4100)));
}

#[test]
fn empty_frame_makes_no_announcement() {
    let engine = Arc::new(ScriptedEngine::new("scripted"));
    let timer = Arc::new(ManualTimer::new());
    let speaker = CollectorSpeaker::new();
    let clock = ManualClock::new();
    let pipeline = PosturePipeline::from_config(
        &Config::default(),
        Arc::clone(&engine),
        clock.clone(),
        timer.clone(),
        Arc::new(speaker.clone()),
    );

    for _ in 0..5 {
        assert_eq!(
            pipeline.process(&LandmarkSet::empty()).unwrap(),
            "Pose tidak terdeteksi"
        );
    }
    clock.advance(Duration::from_secs(10));
    timer.fire_due(clock.now());

    assert_eq!(engine.call_count(), 0);
    assert_eq!(speaker.count(), 0);
}

#[test]
fn real_timer_speaks_after_delay() {
    let engine = ScriptedEngine::new("scripted").with_scores(vec![0.05, 0.05, 0.9]);
    let speaker = CollectorSpeaker::new();
    let mut config = Config::default();
    config.announce.delay_ms = 50;
    let pipeline = PosturePipeline::from_config(
        &config,
        engine,
        SystemClock,
        Arc::new(ThreadTimer::new()),
        Arc::new(speaker.clone()),
    );

    let start = Instant::now();
    assert_eq!(
        pipeline
            .process(&LandmarkSet::from_points(&seated_pose()))
            .unwrap(),
        "Tidur"
    );
    assert_eq!(speaker.count(), 0);

    while speaker.count() == 0 && start.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(speaker.spoken(), vec!["Tidur"]);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(!pipeline.throttle().unwrap().is_pending());
}

#[test]
fn dropped_pipeline_still_speaks_scheduled_label() {
    let engine = ScriptedEngine::new("scripted").with_scores(vec![0.05, 0.05, 0.9]);
    let speaker = CollectorSpeaker::new();
    let mut config = Config::default();
    config.announce.delay_ms = 50;
    let pipeline = PosturePipeline::from_config(
        &config,
        engine,
        SystemClock,
        Arc::new(ThreadTimer::new()),
        Arc::new(speaker.clone()),
    );

    let start = Instant::now();
    assert_eq!(
        pipeline
            .process(&LandmarkSet::from_points(&seated_pose()))
            .unwrap(),
        "Tidur"
    );
    assert!(pipeline.throttle().unwrap().is_pending());
    drop(pipeline);

    while speaker.count() == 0 && start.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(speaker.spoken(), vec!["Tidur"]);
}
