#![cfg(feature = "loom")]

use coop_sync::oneshot;
use loom::future::block_on;
use loom::thread;

#[test]
fn loom_oneshot_send_recv() {
    loom::model(|| {
        let (tx, mut rx) = oneshot::channel();

        let handle = thread::spawn(move || {
            tx.send(7).unwrap();
        });

        let value = block_on(rx.recv());
        assert_eq!(value, Ok(7));

        handle.join().unwrap();
    });
}

#[test]
fn loom_oneshot_sender_drop_closes() {
    loom::model(|| {
        let (tx, mut rx) = oneshot::channel::<u32>();

        let handle = thread::spawn(move || {
            drop(tx);
        });

        let value = block_on(rx.recv());
        assert_eq!(value, Err(oneshot::RecvError::Closed));

        handle.join().unwrap();
    });
}

#[test]
fn loom_oneshot_send_races_close() {
    loom::model(|| {
        let (tx, rx) = oneshot::channel();

        let handle = thread::spawn(move || tx.send(1));

        rx.close();
        let sent = handle.join().unwrap();

        // Exactly one of the two state transitions won
        match sent {
            Ok(()) => {}
            Err(oneshot::SendError::Closed(1)) => {}
            other => panic!("unexpected send outcome: {other:?}"),
        }
    });
}
