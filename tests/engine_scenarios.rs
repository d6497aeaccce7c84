//! Behavioural properties of the temporal state engine.

use ocular_sensor_agent::config::{EngineConfig, GazeConfig};
use ocular_sensor_agent::core::{
    advance, classify_gaze, DropReason, EngineState, FrameFeatures, FrameInput, GazeDirection,
    OcularEvent, OcularState, StepOutcome, TemporalStateEngine,
};
use ocular_sensor_agent::capture::IntensityGrid;
use proptest::prelude::*;
use std::time::{Duration, Instant};

const OPEN: f64 = 0.3;
const CLOSED: f64 = 0.1;

fn frame(ear: f64, at: Instant) -> FrameInput {
    FrameInput::Features(FrameFeatures {
        eye_aspect_ratio: ear,
        left_gaze: GazeDirection::Center,
        right_gaze: GazeDirection::Center,
        timestamp: at,
    })
}

/// Feed `closed` flags spaced `step` apart; returns the engine and all events.
fn run(closed: &[bool], step: Duration) -> (TemporalStateEngine, Vec<OcularEvent>) {
    let t0 = Instant::now();
    let mut engine = TemporalStateEngine::default();
    let mut events = Vec::new();
    for (i, &c) in closed.iter().enumerate() {
        let ear = if c { CLOSED } else { OPEN };
        let outcome = engine.process_frame(frame(ear, t0 + step * i as u32));
        events.extend(outcome.event());
    }
    (engine, events)
}

/// Lengths of maximal closed runs, and whether each run was followed by an
/// open frame.
fn closed_runs(closed: &[bool]) -> Vec<(usize, bool)> {
    let mut runs = Vec::new();
    let mut len = 0;
    for &c in closed {
        if c {
            len += 1;
        } else if len > 0 {
            runs.push((len, true));
            len = 0;
        }
    }
    if len > 0 {
        runs.push((len, false));
    }
    runs
}

/// Sequences built from runs so long closures actually occur.
fn segmented() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec((any::<bool>(), 1usize..60), 0..10).prop_map(|segments| {
        segments
            .into_iter()
            .flat_map(|(closed, len)| std::iter::repeat(closed).take(len))
            .collect()
    })
}

proptest! {
    #[test]
    fn blink_count_matches_terminated_runs(closed in prop::collection::vec(any::<bool>(), 0..200)) {
        let (engine, events) = run(&closed, Duration::from_millis(33));
        let expected = closed_runs(&closed)
            .into_iter()
            .filter(|&(len, terminated)| terminated && len >= 3)
            .count() as u64;

        prop_assert_eq!(engine.state().total_blink_count, expected);
        let blinks = events
            .iter()
            .filter(|e| matches!(e, OcularEvent::BlinkCompleted { .. }))
            .count() as u64;
        prop_assert_eq!(blinks, expected);
    }

    #[test]
    fn one_alarm_per_long_closure(closed in segmented()) {
        // 100 ms frames: the alarm frame is the 31st of a run (3.0 s elapsed)
        let (_, events) = run(&closed, Duration::from_millis(100));
        let expected = closed_runs(&closed)
            .into_iter()
            .filter(|&(len, _)| len >= 31)
            .count();

        let alarms = events
            .iter()
            .filter(|e| matches!(e, OcularEvent::AlarmRaised))
            .count();
        prop_assert_eq!(alarms, expected);
    }

    #[test]
    fn open_frame_clears_closure(closed in segmented()) {
        let t0 = Instant::now();
        let step = Duration::from_millis(100);
        let mut engine = TemporalStateEngine::default();
        for (i, &c) in closed.iter().enumerate() {
            engine.process_frame(frame(if c { CLOSED } else { OPEN }, t0 + step * i as u32));
        }

        let at = t0 + step * closed.len() as u32;
        let outcome = engine.process_frame(frame(OPEN, at));

        prop_assert_eq!(engine.state().consecutive_low_ear_frames, 0);
        prop_assert_eq!(engine.state().closure_start, None);
        prop_assert!(!engine.state().alarm_active);
        prop_assert_ne!(outcome.event(), Some(OcularEvent::AlarmRaised));
        prop_assert_eq!(outcome.state(), Some(OcularState::GazeCenter));
    }

    #[test]
    fn dropped_frames_hold_state(
        closed in segmented(),
        reason in prop_oneof![Just(DropReason::NoFaceDetected), Just(DropReason::DegenerateGeometry)],
    ) {
        let config = EngineConfig::default();
        let t0 = Instant::now();
        let mut state = EngineState::default();
        for (i, &c) in closed.iter().enumerate() {
            let input = frame(if c { CLOSED } else { OPEN }, t0 + Duration::from_millis(33) * i as u32);
            state = advance(&config, state, input).0;
        }

        let (held, outcome) = advance(&config, state.clone(), FrameInput::Dropped(reason));
        prop_assert_eq!(&held, &state);
        prop_assert_eq!(
            outcome,
            StepOutcome::Held { state: state.last_state, reason }
        );
    }

    #[test]
    fn closed_frames_report_blinking(closed in prop::collection::vec(any::<bool>(), 1..100)) {
        let t0 = Instant::now();
        let mut engine = TemporalStateEngine::default();
        for (i, &c) in closed.iter().enumerate() {
            let outcome = engine.process_frame(frame(
                if c { CLOSED } else { OPEN },
                t0 + Duration::from_millis(33) * i as u32,
            ));
            let expected = if c { OcularState::Blinking } else { OcularState::GazeCenter };
            prop_assert_eq!(outcome.state(), Some(expected));
        }
    }
}

#[test]
fn short_blink_scenario() {
    let (engine, events) = run(&[true, true, true, false], Duration::from_millis(33));
    assert_eq!(engine.state().total_blink_count, 1);
    assert_eq!(events, vec![OcularEvent::BlinkCompleted { total: 1 }]);
    assert!(!engine.state().alarm_active);
}

#[test]
fn two_frame_closure_is_not_a_blink() {
    let (engine, events) = run(&[true, true, false], Duration::from_millis(33));
    assert_eq!(engine.state().total_blink_count, 0);
    assert!(events.is_empty());
}

#[test]
fn sustained_closure_alarms_once_at_three_seconds() {
    let t0 = Instant::now();
    let step = Duration::from_millis(100);
    let mut engine = TemporalStateEngine::default();

    // 3.5 s of closed eyes
    for i in 0..=35u32 {
        let outcome = engine.process_frame(frame(CLOSED, t0 + step * i));
        if i == 30 {
            assert_eq!(outcome.event(), Some(OcularEvent::AlarmRaised));
        } else {
            assert_eq!(outcome.event(), None, "unexpected event at frame {i}");
        }
        assert_eq!(engine.state().alarm_active, i >= 30);
    }

    let outcome = engine.process_frame(frame(OPEN, t0 + step * 36));
    assert_eq!(outcome.event(), Some(OcularEvent::BlinkCompleted { total: 1 }));
    assert!(!engine.state().alarm_active);
}

#[test]
fn dropped_frames_do_not_extend_or_break_closure() {
    let t0 = Instant::now();
    let mut engine = TemporalStateEngine::default();

    engine.process_frame(frame(CLOSED, t0));
    engine.process_frame(frame(CLOSED, t0 + Duration::from_millis(33)));
    let held = engine.process_frame(FrameInput::Dropped(DropReason::NoFaceDetected));
    assert_eq!(
        held,
        StepOutcome::Held {
            state: Some(OcularState::Blinking),
            reason: DropReason::NoFaceDetected
        }
    );
    assert_eq!(engine.state().consecutive_low_ear_frames, 2);

    engine.process_frame(frame(CLOSED, t0 + Duration::from_millis(99)));
    let outcome = engine.process_frame(frame(OPEN, t0 + Duration::from_millis(132)));
    assert_eq!(outcome.event(), Some(OcularEvent::BlinkCompleted { total: 1 }));
}

#[test]
fn empty_left_half_reads_center() {
    // left half empty, five foreground pixels on the right
    let grid = IntensityGrid::from_fn(10, 1, |x, _| if x >= 5 { 255 } else { 0 });
    assert_eq!(classify_gaze(&grid, &GazeConfig::default()), GazeDirection::Center);
}

#[test]
fn custom_thresholds_are_honoured() {
    let config = EngineConfig {
        ear_threshold: 0.25,
        min_consec_frames: 2,
        alarm_duration: Duration::from_secs(1),
    };
    let t0 = Instant::now();
    let mut engine = TemporalStateEngine::new(config);

    let mut events = Vec::new();
    for i in 0..12u32 {
        let outcome = engine.process_frame(frame(0.22, t0 + Duration::from_millis(100) * i));
        events.extend(outcome.event());
    }
    events.extend(
        engine
            .process_frame(frame(OPEN, t0 + Duration::from_millis(1200)))
            .event(),
    );

    assert_eq!(
        events,
        vec![
            OcularEvent::AlarmRaised,
            OcularEvent::BlinkCompleted { total: 1 }
        ]
    );
}
