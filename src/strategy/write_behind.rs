//! Write-behind queue
//!
//! Deferred counter changes live only in memory until flushed. A crash loses
//! whatever has not been flushed yet; graceful shutdown drains the queue.
//!
//! A drained delta stays visible through [`WriteBehindQueue::pending_for`]
//! until the flush settles it, and the flush gate keeps a source read from
//! interleaving with a batch being applied. Together these let a reader add
//! the unflushed deltas to a freshly loaded row without counting any twice.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::CounterDelta;
use crate::metrics::WRITE_BEHIND_QUEUE_DEPTH;

/// One deferred change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub photo_id: i64,
    pub delta: CounterDelta,
}

#[derive(Debug, Default)]
struct Pending {
    /// Coalesced deltas waiting for the next drain
    queued: BTreeMap<i64, CounterDelta>,
    /// Drained deltas not yet settled by the flush
    in_flight: BTreeMap<i64, CounterDelta>,
    /// Individual writes behind `queued`
    writes: usize,
}

impl Pending {
    fn publish(&self, depth: &AtomicUsize) {
        depth.store(self.writes, Ordering::SeqCst);
        WRITE_BEHIND_QUEUE_DEPTH.set(self.writes as i64);
    }
}

/// Per-photo coalescing queue of deferred writes
#[derive(Debug, Default)]
pub struct WriteBehindQueue {
    pending: Mutex<Pending>,
    depth: AtomicUsize,
    gate: RwLock<()>,
}

impl WriteBehindQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, write: PendingWrite) {
        let mut pending = self.pending.lock().await;
        pending
            .queued
            .entry(write.photo_id)
            .or_default()
            .merge(write.delta);
        pending.writes += 1;
        pending.publish(&self.depth);
    }

    /// Writes queued and not yet drained
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything queued, merged into one delta per photo
    ///
    /// The taken deltas move in flight and keep counting towards
    /// [`pending_for`](Self::pending_for) until settled or requeued.
    pub async fn drain(&self) -> BTreeMap<i64, CounterDelta> {
        let mut pending = self.pending.lock().await;
        let batch = std::mem::take(&mut pending.queued);
        for (photo_id, delta) in &batch {
            pending.in_flight.entry(*photo_id).or_default().merge(*delta);
        }
        pending.writes = 0;
        pending.publish(&self.depth);
        batch
    }

    /// Forget an in-flight delta once the database holds it
    pub async fn settle(&self, photo_id: i64) {
        self.pending.lock().await.in_flight.remove(&photo_id);
    }

    /// Put an in-flight delta back after a failed flush
    pub async fn requeue(&self, photo_id: i64, delta: CounterDelta) {
        let mut pending = self.pending.lock().await;
        pending.in_flight.remove(&photo_id);
        pending.queued.entry(photo_id).or_default().merge(delta);
        pending.writes += 1;
        pending.publish(&self.depth);
    }

    /// Everything deferred for a photo that the database does not hold yet
    pub async fn pending_for(&self, photo_id: i64) -> Option<CounterDelta> {
        let pending = self.pending.lock().await;
        let mut total = CounterDelta::default();
        for map in [&pending.queued, &pending.in_flight] {
            if let Some(delta) = map.get(&photo_id) {
                total.merge(*delta);
            }
        }
        (!total.is_empty()).then_some(total)
    }

    /// Held while a drained batch is applied
    pub async fn flush_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Held across a source read and the overlay of its pending deltas
    pub async fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InteractionKind;
    use std::sync::Arc;

    fn view(photo_id: i64) -> PendingWrite {
        PendingWrite {
            photo_id,
            delta: CounterDelta::single(InteractionKind::View, 1),
        }
    }

    #[tokio::test]
    async fn drain_coalesces_per_photo() {
        let queue = WriteBehindQueue::new();
        for photo_id in [1, 2, 1, 1] {
            queue.push(view(photo_id)).await;
        }
        assert_eq!(queue.len(), 4);

        let merged = queue.drain().await;
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&1].views, 3);
        assert_eq!(merged[&2].views, 1);
        assert!(queue.is_empty());
        assert!(queue.drain().await.is_empty());
    }

    #[tokio::test]
    async fn requeued_writes_are_drained_again() {
        let queue = WriteBehindQueue::new();
        queue.push(view(9)).await;
        let batch = queue.drain().await;
        queue.requeue(9, batch[&9]).await;
        assert_eq!(queue.len(), 1);

        let merged = queue.drain().await;
        assert_eq!(merged[&9].views, 1);
    }

    #[tokio::test]
    async fn drained_deltas_stay_pending_until_settled() {
        let queue = WriteBehindQueue::new();
        queue.push(view(3)).await;
        queue.push(view(3)).await;
        queue.drain().await;
        queue.push(view(3)).await;

        assert_eq!(queue.pending_for(3).await.map(|delta| delta.views), Some(3));
        assert_eq!(queue.pending_for(4).await, None);

        queue.settle(3).await;
        assert_eq!(queue.pending_for(3).await.map(|delta| delta.views), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pushes_and_drains_account_for_every_write() {
        const PUSHERS: i64 = 3;
        const PUSHES: i64 = 20_000;

        let queue = Arc::new(WriteBehindQueue::new());
        let pushers: Vec<_> = (0..PUSHERS)
            .map(|photo_id| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for _ in 0..PUSHES {
                        queue.push(view(photo_id)).await;
                    }
                })
            })
            .collect();

        let drainer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut total = 0;
                loop {
                    let batch = queue.drain().await;
                    total += batch.values().map(|delta| delta.views).sum::<i64>();
                    for photo_id in batch.keys() {
                        queue.settle(*photo_id).await;
                    }
                    if total == PUSHERS * PUSHES {
                        return total;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for pusher in pushers {
            pusher.await.unwrap();
        }
        assert_eq!(drainer.await.unwrap(), PUSHERS * PUSHES);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pending_for(0).await, None);
    }
}
