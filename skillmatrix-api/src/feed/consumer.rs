//! Client side of the change feed.
//!
//! A [`FeedConsumer`] keeps one view current: it holds a [`Subscription`]
//! while connected, re-fetches the whole view on every matching event, and
//! reconnects through a [`RetryMachine`] when the subscription fails.  The
//! owning view controls it through a [`ViewHandle`]; dropping the handle
//! stops the consumer and releases the subscription.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use ts_rs::TS;

use super::{ChangeEvent, FeedFilter};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("subscription rejected: {0}")]
    Rejected(String),
    #[error("change feed closed")]
    Closed,
    #[error("unsubscribe failed: {0}")]
    Unsubscribe(String),
}

/// Anything a consumer can subscribe to.
pub trait FeedSource {
    fn subscribe(&self, filter: FeedFilter) -> Result<Subscription, FeedError>;
}

/// What a subscription yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMessage {
    Event(ChangeEvent),
    /// The subscriber fell behind and this many events were dropped.
    Missed(u64),
}

type Release = Box<dyn FnOnce() -> Result<(), FeedError> + Send>;

/// A live subscription.  Dropping it unsubscribes; a failed unsubscribe is
/// logged and otherwise ignored.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: FeedFilter,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(receiver: broadcast::Receiver<ChangeEvent>, filter: FeedFilter) -> Self {
        Subscription {
            receiver,
            filter,
            release: None,
        }
    }

    /// Runs `release` when the subscription is dropped.
    pub fn on_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> Result<(), FeedError> + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    /// Waits for the next event matching the filter.
    pub async fn next(&mut self) -> Result<FeedMessage, FeedError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(FeedMessage::Event(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => return Ok(FeedMessage::Missed(n)),
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(e) = release() {
                warn!("Error releasing change feed subscription: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum ConnectionState {
    /// Before the first subscription attempt completes.
    Connecting,
    Connected,
    Retrying { attempt: u32 },
    Failed,
}

/// What to do after an event fed into the [`RetryMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    RetryNow,
    /// Wait until the view is visible again.
    Defer,
    GiveUp,
}

/// Reconnection bookkeeping.
///
/// Errors while the view is visible consume an attempt and schedule a retry
/// after the fixed delay until the attempts run out.  Errors while hidden
/// consume nothing and leave one retry pending, which fires immediately once
/// the view becomes visible.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: ConnectionState,
    attempts: u32,
    pending: bool,
    visible: bool,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryMachine {
            policy,
            state: ConnectionState::Connecting,
            attempts: 0,
            pending: false,
            visible: true,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.pending = false;
    }

    pub fn on_error(&mut self) -> RetryDecision {
        if !self.visible {
            self.pending = true;
            self.state = ConnectionState::Retrying {
                attempt: self.attempts,
            };
            return RetryDecision::Defer;
        }
        if self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            self.state = ConnectionState::Retrying {
                attempt: self.attempts,
            };
            RetryDecision::RetryAfter(self.policy.delay)
        } else {
            self.state = ConnectionState::Failed;
            RetryDecision::GiveUp
        }
    }

    /// Records a visibility change.  Returns `RetryNow` when this flushes a
    /// deferred retry.
    pub fn set_visible(&mut self, visible: bool) -> Option<RetryDecision> {
        self.visible = visible;
        if visible && self.pending {
            self.pending = false;
            Some(RetryDecision::RetryNow)
        } else {
            None
        }
    }
}

/// The view's side of a running consumer.
#[derive(Debug)]
pub struct ViewHandle {
    visibility: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
}

impl ViewHandle {
    pub fn set_visible(&self, visible: bool) {
        self.visibility.send_replace(visible);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Waits until the connection state satisfies `pred`.
    pub async fn wait_for<P>(&mut self, pred: P) -> ConnectionState
    where
        P: FnMut(&ConnectionState) -> bool,
    {
        let waited = self.state.wait_for(pred).await.map(|state| *state);
        waited.unwrap_or_else(|_| *self.state.borrow())
    }
}

pub struct FeedConsumer<S> {
    source: S,
    filter: FeedFilter,
    machine: RetryMachine,
    visibility: watch::Receiver<bool>,
    state: watch::Sender<ConnectionState>,
}

enum Step {
    Resubscribe,
    Stop,
}

impl<S: FeedSource> FeedConsumer<S> {
    pub fn new(source: S, filter: FeedFilter, policy: RetryPolicy) -> (Self, ViewHandle) {
        let (visibility_tx, visibility_rx) = watch::channel(true);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let consumer = FeedConsumer {
            source,
            filter,
            machine: RetryMachine::new(policy),
            visibility: visibility_rx,
            state: state_tx,
        };
        let handle = ViewHandle {
            visibility: visibility_tx,
            state: state_rx,
        };
        (consumer, handle)
    }

    fn publish_state(&self) {
        self.state.send_replace(self.machine.state());
    }

    /// Drives the consumer until the view handle is dropped or the retries
    /// are exhausted, calling `refetch` on every matching event.  Returns the
    /// final connection state.
    pub async fn run<F, Fut>(mut self, mut refetch: F) -> ConnectionState
    where
        F: FnMut(FeedMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        let visible = *self.visibility.borrow_and_update();
        self.machine.set_visible(visible);

        loop {
            match self.source.subscribe(self.filter.clone()) {
                Ok(subscription) => {
                    self.machine.on_connected();
                    self.publish_state();
                    info!("Change feed subscribed ({:?})", self.filter.tables);
                    match self.follow(subscription, &mut refetch).await {
                        Step::Stop => return self.machine.state(),
                        Step::Resubscribe => {}
                    }
                }
                Err(e) => warn!("Change feed subscription error: {}", e),
            }

            match self.recover().await {
                Step::Stop => return self.machine.state(),
                Step::Resubscribe => {}
            }
        }
    }

    async fn follow<F, Fut>(&mut self, mut subscription: Subscription, refetch: &mut F) -> Step
    where
        F: FnMut(FeedMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            tokio::select! {
                message = subscription.next() => match message {
                    Ok(message) => refetch(message).await,
                    Err(e) => {
                        warn!("Change feed subscription error: {}", e);
                        return Step::Resubscribe;
                    }
                },
                changed = self.visibility.changed() => {
                    if changed.is_err() {
                        return Step::Stop;
                    }
                    let visible = *self.visibility.borrow_and_update();
                    self.machine.set_visible(visible);
                }
            }
        }
    }

    async fn recover(&mut self) -> Step {
        let mut decision = self.machine.on_error();
        self.publish_state();
        loop {
            match decision {
                RetryDecision::RetryNow => return Step::Resubscribe,
                RetryDecision::GiveUp => {
                    warn!(
                        "Change feed failed after {} attempts; live updates are off",
                        self.machine.attempts()
                    );
                    return Step::Stop;
                }
                RetryDecision::RetryAfter(delay) => {
                    info!(
                        "Reconnecting change feed (attempt {})",
                        self.machine.attempts()
                    );
                    let sleep = tokio::time::sleep(delay);
                    tokio::pin!(sleep);
                    loop {
                        tokio::select! {
                            _ = &mut sleep => return Step::Resubscribe,
                            changed = self.visibility.changed() => {
                                if changed.is_err() {
                                    return Step::Stop;
                                }
                                let visible = *self.visibility.borrow_and_update();
                                self.machine.set_visible(visible);
                            }
                        }
                    }
                }
                RetryDecision::Defer => {
                    if self.visibility.changed().await.is_err() {
                        return Step::Stop;
                    }
                    let visible = *self.visibility.borrow_and_update();
                    if let Some(next) = self.machine.set_visible(visible) {
                        decision = next;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ChangeFeed, ChangeKind, Table};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn retries_until_exhausted() {
        let mut machine = RetryMachine::new(quick_policy(2));
        assert_eq!(
            machine.on_error(),
            RetryDecision::RetryAfter(Duration::from_millis(5))
        );
        assert_eq!(machine.state(), ConnectionState::Retrying { attempt: 1 });
        assert!(matches!(machine.on_error(), RetryDecision::RetryAfter(_)));
        assert_eq!(machine.on_error(), RetryDecision::GiveUp);
        assert_eq!(machine.state(), ConnectionState::Failed);
    }

    #[test]
    fn connecting_resets_attempts() {
        let mut machine = RetryMachine::new(RetryPolicy::default());
        machine.on_error();
        machine.on_error();
        machine.on_connected();
        assert_eq!(machine.state(), ConnectionState::Connected);
        assert_eq!(machine.attempts(), 0);
    }

    #[test]
    fn hidden_errors_defer_without_consuming_attempts() {
        let mut machine = RetryMachine::new(quick_policy(1));
        assert_eq!(machine.set_visible(false), None);
        assert_eq!(machine.on_error(), RetryDecision::Defer);
        assert_eq!(machine.on_error(), RetryDecision::Defer);
        assert_eq!(machine.attempts(), 0);
        assert!(machine.is_pending());

        assert_eq!(machine.set_visible(true), Some(RetryDecision::RetryNow));
        assert!(!machine.is_pending());
        // Only one flush per deferral.
        assert_eq!(machine.set_visible(true), None);
        assert!(matches!(machine.on_error(), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn dropping_subscription_releases_once() {
        let feed = ChangeFeed::new(4);
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let sub = Subscription::new(feed.receiver(), FeedFilter::default()).on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FeedError::Unsubscribe("socket already closed".to_string()))
        });
        assert_eq!(feed.subscriber_count(), 1);
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(feed.subscriber_count(), 0);
    }

    /// Fails a scripted number of times before handing out real
    /// subscriptions on the wrapped feed.
    struct FlakySource {
        feed: ChangeFeed,
        failures: Mutex<VecDeque<FeedError>>,
        calls: Arc<AtomicUsize>,
    }

    impl FlakySource {
        fn new(feed: ChangeFeed, failures: usize) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = FlakySource {
                feed,
                failures: Mutex::new(
                    (0..failures)
                        .map(|_| FeedError::Rejected("channel error".to_string()))
                        .collect(),
                ),
                calls: calls.clone(),
            };
            (source, calls)
        }
    }

    impl FeedSource for FlakySource {
        fn subscribe(&self, filter: FeedFilter) -> Result<Subscription, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop_front() {
                Some(err) => Err(err),
                None => self.feed.subscribe(filter),
            }
        }
    }

    #[tokio::test]
    async fn refetches_on_matching_events_only() {
        let feed = ChangeFeed::new(16);
        let (consumer, mut view) = FeedConsumer::new(
            feed.clone(),
            FeedFilter::tables(&[Table::EmployeeSkills]).for_team(1),
            quick_policy(3),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(consumer.run(move |message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
            }
        }));

        view.wait_for(|s| *s == ConnectionState::Connected).await;
        feed.publish(ChangeEvent::new(Table::Teams, ChangeKind::Update, 1, Some(1)));
        feed.publish(ChangeEvent::new(Table::EmployeeSkills, ChangeKind::Insert, 5, Some(2)));
        let wanted = ChangeEvent::new(Table::EmployeeSkills, ChangeKind::Update, 6, Some(1));
        feed.publish(wanted);

        assert_eq!(rx.recv().await, Some(FeedMessage::Event(wanted)));

        drop(view);
        assert_eq!(task.await.unwrap(), ConnectionState::Connected);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_retries() {
        let (source, calls) = FlakySource::new(ChangeFeed::new(4), 10);
        let (consumer, _view) = FeedConsumer::new(source, FeedFilter::default(), quick_policy(3));

        let end = consumer.run(|_| async {}).await;
        assert_eq!(end, ConnectionState::Failed);
        // The first attempt plus three retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let feed = ChangeFeed::new(4);
        let (source, calls) = FlakySource::new(feed.clone(), 2);
        let (consumer, mut view) = FeedConsumer::new(source, FeedFilter::default(), quick_policy(5));
        let task = tokio::spawn(consumer.run(|_| async {}));

        assert_eq!(
            view.wait_for(|s| *s == ConnectionState::Connected).await,
            ConnectionState::Connected
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        drop(view);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn hidden_view_defers_until_visible() {
        let (source, calls) = FlakySource::new(ChangeFeed::new(4), 1);
        let (consumer, mut view) = FeedConsumer::new(source, FeedFilter::default(), quick_policy(5));
        view.set_visible(false);
        let task = tokio::spawn(consumer.run(|_| async {}));

        view.wait_for(|s| matches!(s, ConnectionState::Retrying { .. }))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Still waiting on the deferred retry.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(view.state(), ConnectionState::Retrying { attempt: 0 });

        view.set_visible(true);
        view.wait_for(|s| *s == ConnectionState::Connected).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(view);
        task.await.unwrap();
    }
}
