//! One-shot channel: a single value handed from one sender to one receiver.
//!
//! The channel moves through an atomic state machine, so every race — send
//! against close, close against close, receive against send — is decided by a
//! single state transition and the loser fails deterministically:
//!
//! ```text
//! EMPTY --send--> SENT --receive--> CONSUMED   (terminal)
//! EMPTY --close-> CLOSED                       (terminal)
//! ```
//!
//! A second send reports [`SendError::AlreadySent`], a second receive reports
//! [`RecvError::AlreadyConsumed`], and a close never destroys a value that was
//! already sent.
//!
//! 一次性通道：一个值从唯一发送端移交给唯一接收端。
//!
//! 通道通过原子状态机推进，因此每种竞争（发送对关闭、关闭对关闭、接收对发送）
//! 都由单次状态转换裁决，失败方得到确定的错误。第二次发送报告
//! [`SendError::AlreadySent`]，第二次接收报告 [`RecvError::AlreadyConsumed`]，
//! 而关闭永远不会销毁已经发送的值。
//!
//! # Examples
//!
//! ```
//! use coop_sync::oneshot;
//!
//! # tokio_test::block_on(async {
//! let (tx, mut rx) = oneshot::channel();
//!
//! tokio::spawn(async move {
//!     tx.send(42).unwrap();
//! });
//!
//! assert_eq!(rx.recv().await, Ok(42));
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::mem::MaybeUninit;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::atomic_waker::AtomicWaker;
use crate::shim::atomic::{AtomicU8, Ordering};
use crate::shim::cell::UnsafeCell;
use crate::shim::sync::Arc;

pub mod error {
    //! One-shot channel error types.

    use std::fmt;

    /// Error returned by [`Sender::send`](super::Sender::send), handing the
    /// rejected value back to the caller.
    ///
    /// [`Sender::send`](super::Sender::send) 返回的错误，将被拒绝的值交还给调用者。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SendError<V> {
        /// A value has already been sent through this channel.
        ///
        /// 已经有值通过此通道发送过。
        AlreadySent(V),

        /// The channel was closed before any value was sent.
        ///
        /// 通道在任何值发送前已被关闭。
        Closed(V),
    }

    impl<V> fmt::Display for SendError<V> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                SendError::AlreadySent(_) => write!(f, "value already sent"),
                SendError::Closed(_) => write!(f, "channel closed"),
            }
        }
    }

    impl<V: fmt::Debug> std::error::Error for SendError<V> {}

    /// Error returned when waiting for the value fails.
    ///
    /// 等待值失败时返回的错误。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RecvError {
        /// The channel was closed without a value.
        ///
        /// 通道在没有值的情况下被关闭。
        Closed,

        /// The value was already received; it only exists once.
        ///
        /// 值已经被接收过；它只存在一次。
        AlreadyConsumed,
    }

    impl fmt::Display for RecvError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                RecvError::Closed => write!(f, "channel closed"),
                RecvError::AlreadyConsumed => write!(f, "value already consumed"),
            }
        }
    }

    impl std::error::Error for RecvError {}

    /// Error returned from [`Receiver::try_recv`](super::Receiver::try_recv).
    ///
    /// [`Receiver::try_recv`](super::Receiver::try_recv) 返回的错误。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TryRecvError {
        /// No value has been sent yet.
        ///
        /// 尚未发送任何值。
        Empty,

        /// The channel was closed without a value.
        ///
        /// 通道在没有值的情况下被关闭。
        Closed,

        /// The value was already received.
        ///
        /// 值已经被接收过。
        AlreadyConsumed,
    }

    impl fmt::Display for TryRecvError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                TryRecvError::Empty => write!(f, "channel empty"),
                TryRecvError::Closed => write!(f, "channel closed"),
                TryRecvError::AlreadyConsumed => write!(f, "value already consumed"),
            }
        }
    }

    impl std::error::Error for TryRecvError {}
}

pub use self::error::{RecvError, SendError, TryRecvError};

// Channel states. SENDING and RECEIVING are short-lived write/read locks on
// the value cell.
const EMPTY: u8 = 0;
const SENDING: u8 = 1;
const SENT: u8 = 2;
const RECEIVING: u8 = 3;
const CONSUMED: u8 = 4;
const CLOSED: u8 = 5;

/// Create a new one-shot channel.
///
/// 创建一个新的一次性通道。
#[inline]
pub fn channel<V>() -> (Sender<V>, Receiver<V>) {
    let inner = Arc::new(Inner {
        state: AtomicU8::new(EMPTY),
        value: UnsafeCell::new(MaybeUninit::uninit()),
        waker: AtomicWaker::new(),
    });

    let sender = Sender {
        inner: inner.clone(),
    };
    let receiver = Receiver { inner };

    (sender, receiver)
}

/// Outcome of trying to move the value out of the channel.
enum Take<V> {
    Ready(V),
    Pending,
    Closed,
    Consumed,
}

struct Inner<V> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<V>>,
    waker: AtomicWaker,
}

// SAFETY: the value cell is only written inside the SENDING transition and
// only read inside the RECEIVING transition; both are entered by exactly one
// winner of a CAS on `state`.
unsafe impl<V: Send> Send for Inner<V> {}
unsafe impl<V: Send> Sync for Inner<V> {}

impl<V> Inner<V> {
    /// Move the value out if it is ready.
    fn try_take(&self) -> Take<V> {
        match self
            .state
            .compare_exchange(SENT, RECEIVING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: the SENT -> RECEIVING winner has exclusive access to
                // an initialized value.
                let value = self.value.with(|value| unsafe { (*value).assume_init_read() });
                self.state.store(CONSUMED, Ordering::Release);
                Take::Ready(value)
            }
            Err(EMPTY) | Err(SENDING) => Take::Pending,
            Err(CLOSED) => Take::Closed,
            Err(_) => Take::Consumed,
        }
    }

    /// Close an empty channel. A stored value always survives a close race.
    ///
    /// 关闭空通道。已存储的值总能在关闭竞争中幸存。
    fn close(&self) {
        if self
            .state
            .compare_exchange(EMPTY, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.waker.wake();
        }
    }
}

impl<V> Drop for Inner<V> {
    fn drop(&mut self) {
        // A value that was sent but never received is destroyed with the
        // channel.
        //
        // 已发送但从未被接收的值随通道一起销毁。
        if self.state.load(Ordering::Acquire) == SENT {
            self.value.with_mut(|value| unsafe {
                (*value).assume_init_drop();
            });
        }
    }
}

/// Sending half of a one-shot channel.
///
/// 一次性通道的发送端。
pub struct Sender<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Sender<V> {
    /// Send the value, waking a waiting receiver.
    ///
    /// Fails with [`SendError::AlreadySent`] when a value was already sent
    /// and with [`SendError::Closed`] when the channel was closed first; the
    /// value is handed back inside the error either way.
    ///
    /// 发送值并唤醒等待中的接收端。
    ///
    /// 若已发送过值则以 [`SendError::AlreadySent`] 失败；若通道先被关闭则以
    /// [`SendError::Closed`] 失败；两种情况下值都会随错误交还。
    pub fn send(&self, value: V) -> Result<(), SendError<V>> {
        match self
            .inner
            .state
            .compare_exchange(EMPTY, SENDING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: the EMPTY -> SENDING winner has exclusive write
                // access to the cell.
                self.inner.value.with_mut(|cell| unsafe {
                    (*cell).write(value);
                });
                self.inner.state.store(SENT, Ordering::Release);
                self.inner.waker.wake();
                Ok(())
            }
            Err(CLOSED) => Err(SendError::Closed(value)),
            Err(_) => Err(SendError::AlreadySent(value)),
        }
    }

    /// Close the channel; a pending receive fails with [`RecvError::Closed`].
    ///
    /// No-op once a value was sent.
    ///
    /// 关闭通道；挂起的接收会以 [`RecvError::Closed`] 失败。值已发送时为空操作。
    pub fn close(&self) {
        self.inner.close();
    }

    /// Whether sending can no longer succeed.
    ///
    /// 发送是否已不可能成功。
    pub fn is_closed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CLOSED
            || Arc::strong_count(&self.inner) == 1
    }
}

impl<V> Drop for Sender<V> {
    fn drop(&mut self) {
        // Dropping without sending counts as a close.
        self.inner.close();
    }
}

impl<V> fmt::Debug for Sender<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("state", &self.inner.state.load(Ordering::Acquire))
            .finish()
    }
}

/// Receiving half of a one-shot channel.
///
/// Implements [`Future`] directly, so both `receiver.await` and
/// `receiver.recv().await` work.
///
/// 一次性通道的接收端。直接实现了 [`Future`]，
/// 因此 `receiver.await` 与 `receiver.recv().await` 均可使用。
pub struct Receiver<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Receiver<V> {
    /// Wait for the value.
    ///
    /// Consumes the stored value; a second call fails with
    /// [`RecvError::AlreadyConsumed`].
    ///
    /// 等待值。会取走已存储的值；第二次调用以 [`RecvError::AlreadyConsumed`] 失败。
    pub async fn recv(&mut self) -> Result<V, RecvError> {
        (&mut *self).await
    }

    /// Take the value without suspending.
    ///
    /// 不挂起地取值。
    pub fn try_recv(&mut self) -> Result<V, TryRecvError> {
        match self.inner.try_take() {
            Take::Ready(value) => Ok(value),
            Take::Pending => Err(TryRecvError::Empty),
            Take::Closed => Err(TryRecvError::Closed),
            Take::Consumed => Err(TryRecvError::AlreadyConsumed),
        }
    }

    /// Close the channel from the receiving side; a subsequent send fails
    /// with [`SendError::Closed`].
    ///
    /// No-op once a value was sent: the value stays receivable.
    ///
    /// 从接收侧关闭通道；之后的发送以 [`SendError::Closed`] 失败。
    /// 值已发送时为空操作：值仍然可以被接收。
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<V> Drop for Receiver<V> {
    fn drop(&mut self) {
        // Ensure a sender that outlives us fails fast instead of filling a
        // slot nobody will read. An already-sent value is cleaned up by
        // `Inner::drop`.
        self.inner.close();
    }
}

impl<V> Future for Receiver<V> {
    type Output = Result<V, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // Fast path: the value (or a terminal state) is already there.
        match this.inner.try_take() {
            Take::Ready(value) => return Poll::Ready(Ok(value)),
            Take::Closed => return Poll::Ready(Err(RecvError::Closed)),
            Take::Consumed => return Poll::Ready(Err(RecvError::AlreadyConsumed)),
            Take::Pending => {}
        }

        this.inner.waker.register(cx.waker());

        // Re-check: a send or close may have slipped in between the first
        // check and the registration.
        //
        // 再次检查：发送或关闭可能发生在首次检查与注册之间。
        match this.inner.try_take() {
            Take::Ready(value) => Poll::Ready(Ok(value)),
            Take::Closed => Poll::Ready(Err(RecvError::Closed)),
            Take::Consumed => Poll::Ready(Err(RecvError::AlreadyConsumed)),
            Take::Pending => Poll::Pending,
        }
    }
}

impl<V> fmt::Debug for Receiver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("state", &self.inner.state.load(Ordering::Acquire))
            .finish()
    }
}
