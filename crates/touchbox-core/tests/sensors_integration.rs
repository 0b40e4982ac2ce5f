//! Sensor threads posting touches into a bout owned by another thread.

use std::sync::Arc;
use std::thread;

use touchbox_core::output::{DisplayLog, IndicatorLog, DEFAULT_LOCK_WAIT};
use touchbox_core::{Bout, BoutSettings, Event, GuardedIndicator, ManualClock, Score, Side};

fn started_bout() -> (Bout, Arc<ManualClock>) {
    let time = Arc::new(ManualClock::new(0));
    let mut bout = Bout::new(
        BoutSettings::default(),
        time.clone(),
        Arc::new(DisplayLog::new()),
        Arc::new(GuardedIndicator::new(IndicatorLog::default(), DEFAULT_LOCK_WAIT)),
    );
    bout.toggle_start_pause();
    (bout, time)
}

#[test]
fn one_thread_per_side_yields_one_double() {
    let (mut bout, time) = started_bout();
    time.set(1_000);

    let handles: Vec<_> = [(Side::Red, 1_000), (Side::Green, 1_012)]
        .into_iter()
        .map(|(side, ts)| {
            let sensors = bout.registrar();
            thread::spawn(move || sensors.register_hit(side, ts))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }

    for t in 1_000..=1_100 {
        time.set(t);
        bout.poll();
    }
    assert_eq!(bout.score(), Score { red: 1, green: 1 });
    let decisions = bout
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::TouchScored { .. }))
        .count();
    assert_eq!(decisions, 1);
}

#[test]
fn hammering_one_side_still_scores_once() {
    let (mut bout, time) = started_bout();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sensors = bout.registrar();
            thread::spawn(move || {
                for _ in 0..500 {
                    sensors.register_hit(Side::Red, 5);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for t in 0..=200 {
        time.set(t);
        bout.poll();
    }
    assert_eq!(bout.score(), Score { red: 1, green: 0 });
    assert!(bout.is_locked());
}

#[test]
fn touches_while_locked_never_reach_the_next_point() {
    let (mut bout, time) = started_bout();
    let sensors = bout.registrar();
    sensors.register_hit(Side::Green, 0);
    for t in 0..=100 {
        time.set(t);
        bout.poll();
    }
    assert!(bout.is_locked());

    let late = {
        let sensors = sensors.clone();
        thread::spawn(move || sensors.register_hit(Side::Red, 100))
    };
    assert!(!late.join().unwrap());

    bout.next_point();
    for t in 101..=400 {
        time.set(t);
        bout.poll();
    }
    assert_eq!(bout.score(), Score { red: 0, green: 1 });
    assert!(!bout.is_locked());
}
