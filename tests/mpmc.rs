#![cfg(feature = "loom")]

use coop_sync::mpmc;
use loom::future::block_on;
use loom::thread;
use std::num::NonZeroUsize;

#[test]
fn loom_mpmc_bounded_backpressure() {
    loom::model(|| {
        let (tx, rx) = mpmc::bounded(NonZeroUsize::new(1).unwrap());

        let handle = thread::spawn(move || {
            block_on(async move {
                tx.send(1).await.unwrap();
                tx.send(2).await.unwrap();
            });
        });

        block_on(async {
            assert_eq!(rx.recv().await, Ok(1));
            assert_eq!(rx.recv().await, Ok(2));
        });

        handle.join().unwrap();
    });
}

#[test]
fn loom_mpmc_drain_then_closed() {
    loom::model(|| {
        let (tx, rx) = mpmc::unbounded();

        let handle = thread::spawn(move || {
            tx.try_send(1).unwrap();
        });

        block_on(async {
            assert_eq!(rx.recv().await, Ok(1));
            assert_eq!(rx.recv().await, Err(mpmc::RecvError));
        });

        handle.join().unwrap();
    });
}

#[test]
fn loom_mpmc_receiver_drop_fails_send() {
    loom::model(|| {
        let (tx, rx) = mpmc::unbounded::<u32>();

        let handle = thread::spawn(move || {
            drop(rx);
        });

        let outcome = tx.try_send(1);
        handle.join().unwrap();

        match outcome {
            Ok(()) | Err(mpmc::TrySendError::Closed(1)) => {}
            other => panic!("unexpected send outcome: {other:?}"),
        }
    });
}
