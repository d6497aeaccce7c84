//! Demonstration of the Ocular Sensor Agent pipeline.
//!
//! This example shows how to:
//! 1. Write a replay stream of synthetic eye landmarks
//! 2. Replay it through a frame collector thread
//! 3. Run a monitoring session over the frames
//! 4. Watch blinks, gaze changes and the prolonged-closure alarm
//! 5. Print the session summary
//!
//! Run with: cargo run --example replay_demo

use ocular_sensor_agent::{
    capture::{
        write_replay, CollectorConfig, EyeLandmarks, FaceLandmarks, FaceObservation,
        FrameCollector, IntensityGrid, Point, ReplayFrame, ReplaySource,
    },
    core::{run_session, MonitoringSession, OcularEvent},
    sink::MemorySink,
    transparency::MonitoringLog,
    Config, MONITORING_NOTICE,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Frame spacing of the synthetic stream (30 fps).
const FRAME_MS: u64 = 33;

/// Six-point eye contour 6 units wide whose EAR equals `ear`.
fn eye(ear: f64) -> EyeLandmarks {
    let h = ear * 3.0;
    EyeLandmarks::new([
        Point::new(0.0, 0.0),
        Point::new(2.0, -h),
        Point::new(4.0, -h),
        Point::new(6.0, 0.0),
        Point::new(4.0, h),
        Point::new(2.0, h),
    ])
}

/// Eye region with `left` bright columns in its left half and `right` in
/// its right half (out of 10 each).
fn region(left: usize, right: usize) -> IntensityGrid {
    IntensityGrid::from_fn(20, 8, |x, _| {
        let bright = if x < 10 { x < left } else { x - 10 < right };
        if bright {
            200
        } else {
            20
        }
    })
}

fn face(ear: f64, regions: (usize, usize)) -> FaceObservation {
    FaceObservation {
        landmarks: FaceLandmarks {
            left_eye: eye(ear),
            right_eye: eye(ear),
        },
        left_region: Some(region(regions.0, regions.1)),
        right_region: Some(region(regions.0, regions.1)),
    }
}

fn build_stream() -> Vec<ReplayFrame> {
    let centre = (5, 5);
    let looking_left = (2, 8);
    let looking_right = (8, 2);

    let mut faces: Vec<Option<FaceObservation>> = Vec::new();
    faces.extend((0..30).map(|_| Some(face(0.30, centre))));
    // A quick blink
    faces.extend((0..4).map(|_| Some(face(0.10, centre))));
    faces.extend((0..20).map(|_| Some(face(0.30, looking_left))));
    // Face lost for a moment
    faces.extend((0..5).map(|_| None));
    faces.extend((0..20).map(|_| Some(face(0.30, looking_right))));
    // Eyes closed for about four seconds
    faces.extend((0..120).map(|_| Some(face(0.08, centre))));
    faces.extend((0..30).map(|_| Some(face(0.30, centre))));

    faces
        .into_iter()
        .enumerate()
        .map(|(i, face)| ReplayFrame {
            t_ms: i as u64 * FRAME_MS,
            face,
        })
        .collect()
}

fn main() {
    println!("Ocular Sensor Agent - Replay Demo");
    println!("=================================");
    println!();
    println!("{MONITORING_NOTICE}");
    println!();

    let path = std::env::temp_dir().join("ocular_replay_demo.jsonl");
    let frames = build_stream();
    let file = match std::fs::File::create(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error creating {path:?}: {e}");
            return;
        }
    };
    if let Err(e) = write_replay(std::io::BufWriter::new(file), &frames) {
        eprintln!("Error writing replay: {e}");
        return;
    }
    println!("Wrote {} frames to {:?}", frames.len(), path);

    let source = match ReplaySource::from_path(&path) {
        Ok(source) => source.realtime(true),
        Err(e) => {
            eprintln!("Error reading replay: {e}");
            return;
        }
    };

    let collector = match FrameCollector::start(source, CollectorConfig::default()) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("Error starting capture: {e}");
            return;
        }
    };

    let sink = Arc::new(MemorySink::new());
    let log = Arc::new(MonitoringLog::new());
    let mut session =
        MonitoringSession::new("demo-operator", &Config::default(), sink.clone()).with_log(log.clone());

    println!("Session ID: {}", session.session_id());
    println!();

    let running = AtomicBool::new(true);
    let mut last_state = None;
    let origin = Instant::now();

    let end = run_session(collector.receiver(), &mut session, origin, &running, |step| {
        let state = step.outcome.state();
        if state != last_state {
            if let Some(state) = state {
                println!("[{:>6.2}s] state → {}", origin.elapsed().as_secs_f64(), state);
            }
            last_state = state;
        }
        match step.outcome.event() {
            Some(OcularEvent::BlinkCompleted { total }) => println!("          blink #{total}"),
            Some(OcularEvent::AlarmRaised) => println!("          ALARM: eyes closed too long"),
            None => {}
        }
    });

    println!();
    println!("Session ended: {end:?}");
    println!("Records captured: {}", sink.len());
    println!();
    println!("{}", session.finish());
    println!("{}", log.summary());

    let _ = std::fs::remove_file(&path);
}
