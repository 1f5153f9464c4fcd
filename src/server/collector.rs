use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::protocol::PlayerId;

/// What a wait returned: everything gathered so far plus whoever never
/// delivered.
#[derive(Debug)]
pub struct Collected<T> {
    pub collected: HashMap<PlayerId, T>,
    pub missing: Vec<PlayerId>,
}

/// Gathers one item per expected player, with deadline semantics tailored to
/// the round loop: the fast path (everyone answered) still honors the round
/// duration, the slow path grants stragglers a grace period.
///
/// A later item from the same player overwrites the earlier one.
#[derive(Debug)]
pub struct Collector<T> {
    inner: Mutex<CollectorInner<T>>,
    all_in: Notify,
}

#[derive(Debug)]
struct CollectorInner<T> {
    outstanding: HashSet<PlayerId>,
    collected: HashMap<PlayerId, T>,
}

impl<T> Collector<T> {
    pub fn new(expected: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            inner: Mutex::new(CollectorInner {
                outstanding: expected.into_iter().collect(),
                collected: HashMap::new(),
            }),
            all_in: Notify::new(),
        }
    }

    /// Store `item` for `player_id` and mark the player satisfied.
    pub fn collect(&self, player_id: PlayerId, item: T) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.collected.insert(player_id, item);
        inner.outstanding.remove(&player_id);
        if inner.outstanding.is_empty() {
            self.all_in.notify_waiters();
        }
    }

    /// Treat the player as satisfied without storing an item (disconnect).
    pub fn remove_player(&self, player_id: PlayerId) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.outstanding.remove(&player_id);
        if inner.outstanding.is_empty() {
            self.all_in.notify_waiters();
        }
    }

    fn is_satisfied(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .outstanding
            .is_empty()
    }

    fn take_result(&self) -> Collected<T> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut missing: Vec<PlayerId> = inner.outstanding.iter().copied().collect();
        missing.sort();
        Collected {
            collected: std::mem::take(&mut inner.collected),
            missing,
        }
    }

    async fn wait_all_satisfied(&self) {
        loop {
            let notified = self.all_in.notified();
            if self.is_satisfied() {
                return;
            }
            notified.await;
        }
    }

    /// Complete at the earlier of (all satisfied AND `delay` elapsed) or
    /// (`delay + grace` elapsed). Never returns before `delay` on the fast
    /// path, so clients always see the full round duration.
    pub async fn wait_with_grace(&self, delay: Duration, grace: Duration) -> Collected<T> {
        let deadline = Instant::now() + delay;
        tokio::select! {
            () = async {
                self.wait_all_satisfied().await;
                tokio::time::sleep_until(deadline).await;
            } => {}
            () = tokio::time::sleep_until(deadline + grace) => {}
        }
        self.take_result()
    }

    /// Complete as soon as all are satisfied or `timeout` elapses. No
    /// minimum wait.
    pub async fn wait_up_to(&self, timeout: Duration) -> Collected<T> {
        tokio::select! {
            () = self.wait_all_satisfied() => {}
            () = tokio::time::sleep(timeout) => {}
        }
        self.take_result()
    }
}
