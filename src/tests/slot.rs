use super::SMALL_TIMEOUT;
use crate::{slot::Slot, TaskError, TaskState};
use std::{
    sync::{Arc, Barrier},
    thread,
    time::{Duration, Instant},
};

#[test]
fn first_write_wins() {
    let slot = Slot::new(TaskState::Running);
    assert!(!slot.is_resolved());
    assert!(slot.resolve(Ok(1)).is_ok());
    assert!(matches!(slot.resolve(Ok(2)), Err(Ok(2))));
    assert!(matches!(
        slot.resolve(Err(TaskError::TimedOut(SMALL_TIMEOUT))),
        Err(Err(TaskError::TimedOut(_)))
    ));
    assert_eq!(slot.state(), TaskState::Completed);
    assert!(matches!(slot.take(), Some(Ok(1))));
    assert!(slot.take().is_none());
}

#[test]
fn start_only_from_pending() {
    let slot = Slot::<()>::new(TaskState::Pending);
    assert!(slot.start());
    assert_eq!(slot.state(), TaskState::Running);
    assert!(!slot.start());

    let slot = Slot::<()>::new(TaskState::Running);
    assert!(!slot.start());
}

#[test]
fn wait_for_times_out() {
    let slot = Slot::<()>::new(TaskState::Running);
    assert!(!slot.wait_for(SMALL_TIMEOUT));
    slot.resolve(Ok(())).unwrap();
    assert!(slot.wait_for(Duration::ZERO));
}

#[test]
fn concurrent_writers() {
    const WRITERS: usize = 16;

    for _ in 0..32 {
        let slot = Arc::new(Slot::new(TaskState::Running));
        let barrier = Arc::new(Barrier::new(WRITERS));

        let writers: Vec<_> = (0..WRITERS)
            .map(|i| {
                let slot = slot.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let outcome = if i % 2 == 0 {
                        Ok(i)
                    } else {
                        Err(TaskError::TimedOut(SMALL_TIMEOUT))
                    };
                    slot.resolve(outcome).is_ok()
                })
            })
            .collect();
        let winners = writers
            .into_iter()
            .map(|writer| writer.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);

        slot.wait();
        match (slot.state(), slot.take()) {
            (TaskState::Completed, Some(Ok(i))) => assert_eq!(i % 2, 0),
            (TaskState::TimedOut, Some(Err(TaskError::TimedOut(_)))) => (),
            (state, outcome) => panic!("inconsistent slot: {state:?} {outcome:?}"),
        }
    }
}

#[test]
fn unbounded_wait() {
    let slot = Arc::new(Slot::new(TaskState::Running));
    let writer = thread::spawn({
        let slot = slot.clone();
        move || {
            thread::sleep(SMALL_TIMEOUT);
            slot.resolve(Ok(3)).is_ok()
        }
    });
    assert!(slot.wait_for(Duration::MAX));
    assert!(writer.join().unwrap());
    assert!(slot.wait_until(None));
    assert!(matches!(slot.take(), Some(Ok(3))));
}

#[test]
fn passed_deadline() {
    let slot = Slot::<()>::new(TaskState::Running);
    let deadline = Instant::now();
    thread::sleep(SMALL_TIMEOUT);
    let start = Instant::now();
    assert!(!slot.wait_until(Some(deadline)));
    assert!(start.elapsed() < SMALL_TIMEOUT * 5);
}
