//! Judgment behavior through a full session with the default tier table:
//! Perfect 50 ms, Good 120 ms, Miss timeout 200 ms.

use cadenza::chart::Chart;
use cadenza::session::{Judgment, MinigameSession, NullAudio, SessionConfig};
use cadenza::timing::ManualTime;

fn session(time: &ManualTime) -> MinigameSession {
    let config = SessionConfig {
        pre_roll_ms: 0.0,
        ..SessionConfig::default()
    };
    MinigameSession::new(config, Box::new(time.clone()), Box::new(NullAudio::default()))
}

fn drive(
    session: &mut MinigameSession,
    time: &ManualTime,
    taps_at: &[f64],
) -> Vec<Judgment> {
    let mut judgments = Vec::new();
    for _ in 0..20_000 {
        time.advance_ms(5.0);
        let now = session.current_ms();
        let hits: Vec<usize> = if taps_at.iter().any(|&t| (now - t).abs() < 2.6) {
            vec![0]
        } else {
            vec![]
        };
        let report = session.tick(&hits);
        judgments.extend(report.judgments);
        if report.finished {
            return judgments;
        }
    }
    panic!("session never finished");
}

#[test]
fn default_tiers_grade_by_offset() {
    let time = ManualTime::new();
    let mut session = session(&time);
    session
        .start(Chart::from_pattern("graded", 500.0, &[0.0, 200.0, 400.0]))
        .unwrap();

    // 40 ms late on the first note, 80 ms late on the second, the third
    // times out.
    let judgments = drive(&mut session, &time, &[540.0, 780.0]);

    let names: Vec<&str> = judgments.iter().map(|j| j.tier_name.as_str()).collect();
    assert_eq!(names, ["Perfect", "Good", "Miss"]);
    assert_eq!(judgments[0].diff_ms, -40.0);
    assert_eq!(judgments[1].diff_ms, -80.0);

    let result = session.result().unwrap();
    assert_eq!(result.total_accuracy, 0.5);
    assert_eq!(result.max_combo, 2);
    assert_eq!(result.miss_count, 1);
}

#[test]
fn combo_survives_as_max_after_a_mid_run_miss() {
    let time = ManualTime::new();
    let mut session = session(&time);
    session
        .start(Chart::from_pattern(
            "streak",
            300.0,
            &[0.0, 200.0, 400.0, 600.0, 800.0],
        ))
        .unwrap();

    // Hit the first three and the last; let the fourth time out. The last
    // tap waits until the timed-out note has been swept off the queue head.
    let judgments = drive(&mut session, &time, &[300.0, 500.0, 700.0, 1110.0]);

    let combos: Vec<u32> = judgments.iter().map(|j| j.combo).collect();
    assert_eq!(combos, [1, 2, 3, 0, 1]);

    let result = session.result().unwrap();
    assert_eq!(result.max_combo, 3);
    assert_eq!(result.miss_count, 1);
    assert_eq!(result.total_accuracy, 0.8);
}

#[test]
fn accuracy_is_bounded_for_any_mix() {
    let timings: Vec<f64> = (0..20).map(|i| i as f64 * 150.0).collect();
    let time = ManualTime::new();
    let mut session = session(&time);
    session
        .start(Chart::from_pattern("mixed", 400.0, &timings))
        .unwrap();

    // Tap every other note, some of them sloppily.
    let taps: Vec<f64> = timings
        .iter()
        .step_by(2)
        .map(|&t| 400.0 + t + 60.0)
        .collect();
    drive(&mut session, &time, &taps);

    let result = session.result().unwrap();
    assert!(result.total_accuracy >= 0.0 && result.total_accuracy <= 1.0);
    assert_eq!(result.miss_count, 10);
}
