//! Multi-producer multi-consumer channel with optional bounded capacity.
//!
//! Both endpoints are cheaply cloneable handles; the channel tracks how many
//! of each role remain. Once the last [`Sender`] drops, receivers drain the
//! remaining buffered items and then observe closed; once the last
//! [`Receiver`] drops, the buffer is discarded and senders fail immediately,
//! so producers never block into a void.
//!
//! Items are delivered in exactly the order their sends completed, and both
//! the sender-side and receiver-side wait queues are FIFO, so a fast producer
//! or consumer cannot starve the others. A full bounded channel suspends
//! senders until a receive frees a slot.
//!
//! 可选有界容量的多生产者多消费者通道。
//!
//! 两个端点都是可廉价克隆的句柄；通道跟踪每种角色的剩余数量。
//! 最后一个 [`Sender`] 被丢弃后，接收端先取完缓冲中剩余的条目再观察到关闭；
//! 最后一个 [`Receiver`] 被丢弃后，缓冲被丢弃且发送立即失败，
//! 生产者永远不会对着空洞阻塞。
//!
//! 条目严格按发送完成的顺序投递；发送侧与接收侧的等待队列都是 FIFO，
//! 快的生产者或消费者无法饿死其他任务。有界通道满时发送端挂起，
//! 直到接收腾出空位。
//!
//! # Examples
//!
//! ```
//! use coop_sync::mpmc;
//!
//! # tokio_test::block_on(async {
//! let (tx, rx) = mpmc::unbounded();
//!
//! tokio::spawn(async move {
//!     for i in 0..10 {
//!         tx.send(i).await.unwrap();
//!     }
//! });
//!
//! let mut sum = 0;
//! while let Ok(value) = rx.recv().await {
//!     sum += value;
//! }
//! assert_eq!(sum, 45);
//! # });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::shim::atomic::{AtomicUsize, Ordering};
use crate::shim::sync::{Arc, Mutex as StateLock};
use crate::wait_queue::WaitQueue;

/// Send error type
///
/// 发送错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError<T> {
    /// Channel is closed; the value is handed back.
    ///
    /// 通道已关闭；值被交还。
    Closed(T),
}

/// Try-send error type
///
/// 尝试发送错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// Buffer is at capacity.
    ///
    /// 缓冲区已满。
    Full(T),

    /// Channel is closed.
    ///
    /// 通道已关闭。
    Closed(T),
}

/// Error returned when waiting for an item fails: the channel is closed and
/// nothing is left to drain.
///
/// 等待条目失败时返回的错误：通道已关闭且没有剩余条目可取。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel closed")
    }
}

impl std::error::Error for RecvError {}

/// Try-receive error type
///
/// 尝试接收错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Buffer is empty.
    ///
    /// 缓冲区为空。
    Empty,

    /// Channel is closed and drained.
    ///
    /// 通道已关闭且已取空。
    Closed,
}

/// Channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Sends and receives proceed normally.
    Open,
    /// No further sends; buffered items remain receivable.
    Draining,
    /// Terminal; the buffer has been discarded.
    Closed,
}

/// Create a channel with the given capacity, `None` meaning unbounded.
///
/// 创建具有给定容量的通道，`None` 表示无界。
///
/// # Examples
///
/// ```
/// use coop_sync::mpmc;
/// use std::num::NonZeroUsize;
///
/// let (tx, rx) = mpmc::channel(NonZeroUsize::new(2));
/// assert_eq!(tx.capacity(), Some(2));
/// assert!(tx.try_send(1).is_ok());
/// assert_eq!(rx.try_recv(), Ok(1));
/// ```
pub fn channel<T>(capacity: Option<NonZeroUsize>) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: StateLock::new(State {
            buffer: VecDeque::new(),
            phase: Phase::Open,
            send_waiters: WaitQueue::new(),
            recv_waiters: WaitQueue::new(),
        }),
        capacity,
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
    });

    let sender = Sender {
        shared: shared.clone(),
    };
    let receiver = Receiver { shared };

    (sender, receiver)
}

/// Create a bounded channel holding at most `capacity` items.
///
/// 创建最多容纳 `capacity` 个条目的有界通道。
#[inline]
pub fn bounded<T>(capacity: NonZeroUsize) -> (Sender<T>, Receiver<T>) {
    channel(Some(capacity))
}

/// Create an unbounded channel; sends never suspend.
///
/// 创建无界通道；发送永不挂起。
#[inline]
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    channel(None)
}

/// Buffer, lifecycle phase and both FIFO wait queues, mutated under one lock
/// so wake-ups and cancellation stay atomic with the state they guard.
///
/// 缓冲、生命周期阶段与两个 FIFO 等待队列在同一把锁下修改，
/// 使唤醒与取消和它们守护的状态保持原子。
struct State<T> {
    buffer: VecDeque<T>,
    phase: Phase,
    send_waiters: WaitQueue,
    recv_waiters: WaitQueue,
}

struct Shared<T> {
    state: StateLock<State<T>>,
    capacity: Option<NonZeroUsize>,
    senders: AtomicUsize,
    receivers: AtomicUsize,
}

impl<T> Shared<T> {
    fn buffer_full(&self, state: &State<T>) -> bool {
        self.capacity
            .is_some_and(|capacity| state.buffer.len() >= capacity.get())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        if state.phase == Phase::Open {
            state.phase = Phase::Draining;
        }
        state.send_waiters.wake_all();
        state.recv_waiters.wake_all();
    }

    fn shutdown_immediate(&self) {
        let mut state = self.state.lock().unwrap();
        state.phase = Phase::Closed;
        state.buffer.clear();
        state.send_waiters.wake_all();
        state.recv_waiters.wake_all();
    }

    fn len(&self) -> usize {
        self.state.lock().unwrap().buffer.len()
    }

    fn is_full(&self) -> bool {
        let state = self.state.lock().unwrap();
        self.buffer_full(&state)
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().phase != Phase::Open
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Shared")
            .field("phase", &state.phase)
            .field("len", &state.buffer.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// MPMC channel sender handle.
///
/// Cloning creates another producer; the channel starts draining once the
/// last one is dropped.
///
/// MPMC 通道发送句柄。克隆即创建另一个生产者；
/// 最后一个被丢弃后通道进入排空阶段。
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Send a value, suspending while the buffer is at capacity.
    ///
    /// Resolves to [`SendError::Closed`] — returning the value — when the
    /// channel shuts down or the last receiver disappears, including while
    /// the send is suspended. Dropping the future before completion gives up
    /// the queue slot and re-offers any freed capacity to the next sender.
    ///
    /// 发送一个值；缓冲满时挂起。
    ///
    /// 当通道关闭或最后一个接收端消失时（包括挂起期间），
    /// 解析为携带原值的 [`SendError::Closed`]。
    /// 在完成前丢弃该 future 会放弃排队位置，并把空出的容量转让给下一个发送者。
    pub fn send(&self, value: T) -> SendFuture<'_, T> {
        SendFuture {
            sender: self,
            value: Some(value),
            key: None,
        }
    }

    /// Try to send without suspending.
    ///
    /// 尝试发送而不挂起。
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.shared.state.lock().unwrap();

        if state.phase != Phase::Open {
            return Err(TrySendError::Closed(value));
        }
        if self.shared.buffer_full(&state) {
            return Err(TrySendError::Full(value));
        }

        state.buffer.push_back(value);
        state.recv_waiters.wake_one();
        Ok(())
    }

    /// Queuing capacity, or `None` if unbounded.
    ///
    /// 队列容量；无界时为 `None`。
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity.map(NonZeroUsize::get)
    }

    /// Number of buffered items.
    ///
    /// 缓冲中的条目数。
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the buffer is empty.
    ///
    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer is at capacity. Always `false` for unbounded
    /// channels.
    ///
    /// 缓冲是否已满。无界通道恒为 `false`。
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }

    /// Whether the channel no longer accepts sends.
    ///
    /// 通道是否不再接受发送。
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Shut the channel down: further sends fail, receivers drain the
    /// remaining buffered items and then observe closed.
    ///
    /// 关闭通道：之后的发送失败，接收端先取完缓冲剩余条目再观察到关闭。
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Shut the channel down and discard the buffer: pending receives fail
    /// immediately.
    ///
    /// 关闭通道并丢弃缓冲：挂起的接收立即失败。
    pub fn shutdown_immediate(&self) {
        self.shared.shutdown_immediate();
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last producer gone: receivers may still drain the buffer.
            //
            // 最后一个生产者已离开：接收端仍可取空缓冲。
            let mut state = self.shared.state.lock().unwrap();
            if state.phase == Phase::Open {
                state.phase = Phase::Draining;
            }
            state.recv_waiters.wake_all();
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").field("shared", &self.shared).finish()
    }
}

/// MPMC channel receiver handle.
///
/// Cloning creates another consumer; dropping the last one closes the channel
/// and discards the buffer.
///
/// MPMC 通道接收句柄。克隆即创建另一个消费者；
/// 丢弃最后一个会关闭通道并丢弃缓冲。
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Receive the oldest buffered item, suspending while the buffer is
    /// empty.
    ///
    /// Popping an item from a full bounded channel wakes the oldest blocked
    /// sender. Resolves to [`RecvError`] once the channel is closed and
    /// drained. Dropping the future before completion gives up the queue slot
    /// and re-offers an already-delivered wake to the next receiver.
    ///
    /// 接收缓冲中最早的条目；缓冲为空时挂起。
    ///
    /// 从已满的有界通道取出条目会唤醒最早被阻塞的发送者。
    /// 通道关闭且取空后解析为 [`RecvError`]。
    /// 在完成前丢弃该 future 会放弃排队位置，并把已投递的唤醒转让给下一个接收者。
    pub fn recv(&self) -> RecvFuture<'_, T> {
        RecvFuture {
            receiver: self,
            key: None,
        }
    }

    /// Try to receive without suspending.
    ///
    /// 尝试接收而不挂起。
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.shared.state.lock().unwrap();

        match state.buffer.pop_front() {
            Some(value) => {
                state.send_waiters.wake_one();
                Ok(value)
            }
            None => match state.phase {
                Phase::Open => Err(TryRecvError::Empty),
                Phase::Draining | Phase::Closed => Err(TryRecvError::Closed),
            },
        }
    }

    /// Iterator that removes and returns the immediately available items.
    ///
    /// 移除并返回当前立即可得条目的迭代器。
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_sync::mpmc;
    ///
    /// let (tx, mut rx) = mpmc::unbounded();
    /// for i in 0..3 {
    ///     tx.try_send(i).unwrap();
    /// }
    ///
    /// let items: Vec<i32> = rx.drain().collect();
    /// assert_eq!(items, vec![0, 1, 2]);
    /// assert!(rx.is_empty());
    /// ```
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { receiver: self }
    }

    /// Queuing capacity, or `None` if unbounded.
    ///
    /// 队列容量；无界时为 `None`。
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity.map(NonZeroUsize::get)
    }

    /// Number of buffered items.
    ///
    /// 缓冲中的条目数。
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the buffer is empty.
    ///
    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer is at capacity. Always `false` for unbounded
    /// channels.
    ///
    /// 缓冲是否已满。无界通道恒为 `false`。
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }

    /// Whether the channel no longer accepts sends.
    ///
    /// 通道是否不再接受发送。
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Shut the channel down: further sends fail, receivers drain the
    /// remaining buffered items and then observe closed.
    ///
    /// 关闭通道：之后的发送失败，接收端先取完缓冲剩余条目再观察到关闭。
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Shut the channel down and discard the buffer: pending receives fail
    /// immediately.
    ///
    /// 关闭通道并丢弃缓冲：挂起的接收立即失败。
    pub fn shutdown_immediate(&self) {
        self.shared.shutdown_immediate();
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.shared.receivers.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if self.shared.receivers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last consumer gone: nothing buffered can ever be delivered, and
            // blocked senders must not wait forever.
            //
            // 最后一个消费者已离开：缓冲中的条目再也无法投递，
            // 被阻塞的发送者不能永远等待。
            let mut state = self.shared.state.lock().unwrap();
            state.phase = Phase::Closed;
            state.buffer.clear();
            state.send_waiters.wake_all();
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("shared", &self.shared)
            .finish()
    }
}

/// Future returned by [`Sender::send`].
///
/// [`Sender::send`] 返回的 future。
pub struct SendFuture<'a, T> {
    sender: &'a Sender<T>,
    value: Option<T>,
    key: Option<u64>,
}

impl<T> Unpin for SendFuture<'_, T> {}

impl<T> Future for SendFuture<'_, T> {
    type Output = Result<(), SendError<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let shared = &this.sender.shared;
        let mut state = shared.state.lock().unwrap();

        // Consume a wake addressed to us before re-checking the buffer.
        if let Some(key) = this.key {
            if state.send_waiters.take_wake(key) {
                this.key = None;
            }
        }

        if state.phase != Phase::Open {
            if let Some(key) = this.key.take() {
                let _ = state.send_waiters.cancel(key);
            }
            let value = match this.value.take() {
                Some(value) => value,
                None => panic!("SendFuture polled after completion"),
            };
            return Poll::Ready(Err(SendError::Closed(value)));
        }

        if !shared.buffer_full(&state) {
            if let Some(key) = this.key.take() {
                let _ = state.send_waiters.cancel(key);
            }
            let value = match this.value.take() {
                Some(value) => value,
                None => panic!("SendFuture polled after completion"),
            };
            state.buffer.push_back(value);
            state.recv_waiters.wake_one();
            return Poll::Ready(Ok(()));
        }

        // Still full: a woken slot was stolen or this is the first poll.
        // Queue up (again) at the back.
        //
        // 仍然是满的：被唤醒后空位被抢走，或这是第一次 poll。重新排到队尾。
        match this.key {
            Some(key) => state.send_waiters.update(key, cx.waker()),
            None => this.key = Some(state.send_waiters.register(cx.waker())),
        }
        Poll::Pending
    }
}

impl<T> Drop for SendFuture<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else { return };
        let mut state = self.sender.shared.state.lock().unwrap();
        if state.send_waiters.cancel(key) {
            // A slot was offered to us but never used; offer it to the next
            // blocked sender.
            //
            // 有空位曾提供给我们但从未使用；转交给下一个被阻塞的发送者。
            state.send_waiters.wake_one();
        }
    }
}

impl<T> fmt::Debug for SendFuture<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendFuture")
            .field("queued", &self.key.is_some())
            .finish()
    }
}

/// Future returned by [`Receiver::recv`].
///
/// [`Receiver::recv`] 返回的 future。
pub struct RecvFuture<'a, T> {
    receiver: &'a Receiver<T>,
    key: Option<u64>,
}

impl<T> Future for RecvFuture<'_, T> {
    type Output = Result<T, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let shared = &this.receiver.shared;
        let mut state = shared.state.lock().unwrap();

        // Consume a wake addressed to us before re-checking the buffer.
        if let Some(key) = this.key {
            if state.recv_waiters.take_wake(key) {
                this.key = None;
            }
        }

        if let Some(value) = state.buffer.pop_front() {
            if let Some(key) = this.key.take() {
                let _ = state.recv_waiters.cancel(key);
            }
            state.send_waiters.wake_one();
            return Poll::Ready(Ok(value));
        }

        if state.phase != Phase::Open {
            if let Some(key) = this.key.take() {
                let _ = state.recv_waiters.cancel(key);
            }
            return Poll::Ready(Err(RecvError));
        }

        match this.key {
            Some(key) => state.recv_waiters.update(key, cx.waker()),
            None => this.key = Some(state.recv_waiters.register(cx.waker())),
        }
        Poll::Pending
    }
}

impl<T> Drop for RecvFuture<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else { return };
        let mut state = self.receiver.shared.state.lock().unwrap();
        if state.recv_waiters.cancel(key) {
            // An item was announced to us but never taken; announce it to the
            // next waiting receiver.
            //
            // 有条目曾通知给我们但从未取走；转而通知下一个等待的接收者。
            state.recv_waiters.wake_one();
        }
    }
}

impl<T> fmt::Debug for RecvFuture<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecvFuture")
            .field("queued", &self.key.is_some())
            .finish()
    }
}

/// Draining iterator for the channel, created by [`Receiver::drain`].
///
/// 通道的取空迭代器，由 [`Receiver::drain`] 创建。
pub struct Drain<'a, T> {
    receiver: &'a mut Receiver<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.try_recv().ok()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.receiver.len();
        (len, Some(len))
    }
}

impl<T> fmt::Debug for Drain<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain")
            .field("len", &self.receiver.len())
            .finish()
    }
}
