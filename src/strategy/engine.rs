//! Strategy engine: read and write paths for every caching policy

use axum::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::write_behind::{PendingWrite, WriteBehindQueue};
use super::{CacheStrategy, ReadPolicy, WritePolicy};
use crate::data::{
    CounterDelta, HeatWeights, InteractionKind, PhotoWithOwner, RankedPhoto, RankingPeriod,
    StrategyStore,
};
use crate::error::AppError;
use crate::metrics::{
    CACHE_EVICTIONS_TOTAL, CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, CACHE_SETS_TOTAL,
    WRITE_BEHIND_FLUSHED_TOTAL,
};

/// Cached view of an approved photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSnapshot {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub theme: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub favorites: i64,
    pub votes: i64,
    pub heat_score: f64,
    pub user_id: i64,
    pub username: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<PhotoWithOwner> for PhotoSnapshot {
    fn from(row: PhotoWithOwner) -> Self {
        let photo = row.photo;
        Self {
            id: photo.id,
            title: photo.title,
            description: photo.description,
            image_url: photo.image_url,
            thumbnail_url: photo.thumbnail_url,
            theme: photo.theme,
            views: photo.views,
            likes: photo.likes,
            favorites: photo.favorites,
            votes: photo.votes,
            heat_score: photo.heat_score,
            user_id: photo.user_id,
            username: row.owner_username,
            uploaded_at: photo.uploaded_at,
        }
    }
}

impl PhotoSnapshot {
    /// Apply counter changes the database has not seen yet
    pub fn add_delta(&mut self, delta: CounterDelta, weights: &HeatWeights) {
        self.views += delta.views;
        self.likes += delta.likes;
        self.favorites += delta.favorites;
        self.votes += delta.votes;
        self.heat_score += weights.score(delta.likes, delta.views, delta.favorites, delta.votes);
    }
}

/// Value held in the strategy store
#[derive(Debug)]
pub enum CachedValue {
    Photo(PhotoSnapshot),
    Rankings(Vec<RankedPhoto>),
}

/// Result of a read along with whether the store answered it
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub value: T,
    pub cache_hit: bool,
}

/// Backing store the engine reads through and writes to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Approved photo by id
    async fn load_photo(&self, photo_id: i64) -> Result<Option<PhotoSnapshot>, AppError>;

    async fn load_rankings(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<RankedPhoto>, AppError>;

    /// Apply counter changes; `false` when the photo no longer exists
    async fn apply_delta(&self, photo_id: i64, delta: CounterDelta) -> Result<bool, AppError>;

    async fn heat_weights(&self) -> HeatWeights;
}

/// Read side shared by every strategy
#[async_trait]
pub trait RankingReader {
    async fn read_photo(
        &self,
        strategy: CacheStrategy,
        photo_id: i64,
    ) -> Result<Lookup<PhotoSnapshot>, AppError>;

    async fn read_rankings(
        &self,
        strategy: CacheStrategy,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Lookup<Vec<RankedPhoto>>, AppError>;
}

/// Write side shared by every strategy
#[async_trait]
pub trait RankingWriter {
    /// Count one view and return the photo as the caller should now see it
    async fn record_view(
        &self,
        strategy: CacheStrategy,
        photo_id: i64,
    ) -> Result<Lookup<PhotoSnapshot>, AppError>;
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

/// Per-strategy counters as reported by the experiment endpoints
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStats {
    pub strategy: String,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// Percentage of lookups answered from the store
    pub hit_rate: f64,
    pub entries: u64,
}

pub struct StrategyEngine {
    store: StrategyStore<CachedValue>,
    source: Arc<dyn PhotoSource>,
    current: AtomicUsize,
    counters: [Counters; 6],
    queue: WriteBehindQueue,
}

impl StrategyEngine {
    pub fn new(source: Arc<dyn PhotoSource>, default: CacheStrategy, max_entries: u64) -> Self {
        Self {
            store: StrategyStore::new(max_entries),
            source,
            current: AtomicUsize::new(default.index()),
            counters: Default::default(),
            queue: WriteBehindQueue::new(),
        }
    }

    /// Strategy used when a request does not name one
    pub fn current_strategy(&self) -> CacheStrategy {
        CacheStrategy::from_index(self.current.load(Ordering::SeqCst))
    }

    /// Make `strategy` the default and start it from an empty store
    pub async fn switch_strategy(&self, strategy: CacheStrategy) {
        self.store.clear().await;
        let previous = self.current.swap(strategy.index(), Ordering::SeqCst);
        tracing::info!(
            from = %CacheStrategy::from_index(previous),
            to = %strategy,
            "Cache strategy switched"
        );
    }

    /// Drop a photo entry and every ranking entry, across all strategies
    pub async fn invalidate_photo(&self, photo_id: i64) {
        self.remove_matching(&format!("*:photo:{}", photo_id)).await;
        self.remove_matching("*:rankings:*").await;
    }

    /// Drop ranking entries for all strategies
    pub async fn invalidate_rankings(&self) {
        self.remove_matching("*:rankings:*").await;
    }

    /// Remove keys matching a glob; returns the number removed
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let removed = self.remove_matching(pattern).await;
        tracing::info!(pattern, removed, "Cache entries invalidated");
        removed
    }

    pub async fn clear(&self) {
        self.store.clear().await;
        tracing::info!("Strategy store cleared");
    }

    pub async fn stats(&self, strategy: CacheStrategy) -> StrategyStats {
        let counters = &self.counters[strategy.index()];
        let hits = counters.hits.load(Ordering::Relaxed);
        let misses = counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            (hits as f64 / lookups as f64 * 10000.0).round() / 100.0
        };

        StrategyStats {
            strategy: strategy.as_str().to_string(),
            hits,
            misses,
            sets: counters.sets.load(Ordering::Relaxed),
            deletes: counters.deletes.load(Ordering::Relaxed),
            hit_rate,
            entries: self
                .store
                .count_prefix(&format!("{}:", strategy.as_str()))
                .await,
        }
    }

    pub async fn all_stats(&self) -> Vec<StrategyStats> {
        let mut stats = Vec::with_capacity(CacheStrategy::ALL.len());
        for strategy in CacheStrategy::ALL {
            stats.push(self.stats(strategy).await);
        }
        stats
    }

    /// Writes waiting for the next flush
    pub fn pending_writes(&self) -> usize {
        self.queue.len()
    }

    /// Apply queued write-behind deltas, one update per photo
    ///
    /// A delta that fails to apply goes back on the queue. Returns the number
    /// of photos updated.
    pub async fn flush_write_behind(&self) -> usize {
        let _gate = self.queue.flush_gate().await;
        let batch = self.queue.drain().await;
        if batch.is_empty() {
            return 0;
        }

        let mut flushed = 0;
        for (photo_id, delta) in batch {
            match self.source.apply_delta(photo_id, delta).await {
                Ok(true) => {
                    flushed += 1;
                    self.queue.settle(photo_id).await;
                }
                Ok(false) => {
                    tracing::warn!(photo_id, "Dropping write-behind delta for missing photo");
                    self.queue.settle(photo_id).await;
                }
                Err(error) => {
                    tracing::error!(photo_id, error = %error, "Write-behind flush failed");
                    self.queue.requeue(photo_id, delta).await;
                }
            }
        }

        WRITE_BEHIND_FLUSHED_TOTAL.inc_by(flushed as u64);
        tracing::debug!(flushed, "Write-behind queue flushed");
        flushed
    }

    // =========================================================================
    // Store helpers
    // =========================================================================

    async fn lookup(&self, strategy: CacheStrategy, key: &str) -> Option<Arc<CachedValue>> {
        let policy = strategy.read_policy();
        if policy == ReadPolicy::Bypass {
            return None;
        }

        let counters = &self.counters[strategy.index()];
        match self.store.get(key).await {
            Some(value) => {
                counters.hits.fetch_add(1, Ordering::Relaxed);
                CACHE_HITS_TOTAL
                    .with_label_values(&[strategy.as_str()])
                    .inc();
                if matches!(policy, ReadPolicy::Adaptive { .. }) {
                    self.store.mark_hot(key).await;
                }
                tracing::debug!(strategy = %strategy, key, "Cache hit");
                Some(value)
            }
            None => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                CACHE_MISSES_TOTAL
                    .with_label_values(&[strategy.as_str()])
                    .inc();
                tracing::debug!(strategy = %strategy, key, "Cache miss");
                None
            }
        }
    }

    async fn fill(&self, strategy: CacheStrategy, key: String, value: CachedValue) {
        let ttl = match strategy.read_policy() {
            ReadPolicy::Bypass => return,
            ReadPolicy::Fixed(ttl) => ttl,
            ReadPolicy::Adaptive { base, hot } => {
                if self.store.is_hot(&key).await {
                    hot
                } else {
                    base
                }
            }
        };

        self.store.insert(key, Arc::new(value), ttl).await;
        self.counters[strategy.index()]
            .sets
            .fetch_add(1, Ordering::Relaxed);
        CACHE_SETS_TOTAL
            .with_label_values(&[strategy.as_str()])
            .inc();
    }

    async fn remove_matching(&self, pattern: &str) -> u64 {
        let mut removed = 0;
        for key in self.store.matching_keys(pattern) {
            if self.store.remove(&key).await {
                removed += 1;
                self.count_delete(&key);
            }
        }
        removed
    }

    fn count_delete(&self, key: &str) {
        let Some(prefix) = key.split(':').next() else {
            return;
        };
        if let Ok(strategy) = CacheStrategy::parse(prefix) {
            self.counters[strategy.index()]
                .deletes
                .fetch_add(1, Ordering::Relaxed);
            CACHE_EVICTIONS_TOTAL
                .with_label_values(&[strategy.as_str()])
                .inc();
        }
    }

    /// Photo from the source with any unflushed write-behind deltas added
    async fn load_photo(&self, photo_id: i64) -> Result<PhotoSnapshot, AppError> {
        let _gate = self.queue.read_gate().await;
        let mut photo = self
            .source
            .load_photo(photo_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if let Some(delta) = self.queue.pending_for(photo_id).await {
            let weights = self.source.heat_weights().await;
            photo.add_delta(delta, &weights);
        }
        Ok(photo)
    }

    async fn apply_view(&self, photo_id: i64) -> Result<(), AppError> {
        let delta = CounterDelta::single(InteractionKind::View, 1);
        if !self.source.apply_delta(photo_id, delta).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

fn photo_key(strategy: CacheStrategy, photo_id: i64) -> String {
    format!("{}:photo:{}", strategy.as_str(), photo_id)
}

fn rankings_key(strategy: CacheStrategy, period: RankingPeriod, limit: i64) -> String {
    format!("{}:rankings:{}:{}", strategy.as_str(), period.as_str(), limit)
}

#[async_trait]
impl RankingReader for StrategyEngine {
    async fn read_photo(
        &self,
        strategy: CacheStrategy,
        photo_id: i64,
    ) -> Result<Lookup<PhotoSnapshot>, AppError> {
        let key = photo_key(strategy, photo_id);
        if let Some(cached) = self.lookup(strategy, &key).await {
            if let CachedValue::Photo(photo) = cached.as_ref() {
                return Ok(Lookup {
                    value: photo.clone(),
                    cache_hit: true,
                });
            }
        }

        let photo = self.load_photo(photo_id).await?;
        self.fill(strategy, key, CachedValue::Photo(photo.clone()))
            .await;
        Ok(Lookup {
            value: photo,
            cache_hit: false,
        })
    }

    async fn read_rankings(
        &self,
        strategy: CacheStrategy,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Lookup<Vec<RankedPhoto>>, AppError> {
        let key = rankings_key(strategy, period, limit);
        if let Some(cached) = self.lookup(strategy, &key).await {
            if let CachedValue::Rankings(rankings) = cached.as_ref() {
                return Ok(Lookup {
                    value: rankings.clone(),
                    cache_hit: true,
                });
            }
        }

        let rankings = self.source.load_rankings(period, limit).await?;
        self.fill(strategy, key, CachedValue::Rankings(rankings.clone()))
            .await;
        Ok(Lookup {
            value: rankings,
            cache_hit: false,
        })
    }
}

#[async_trait]
impl RankingWriter for StrategyEngine {
    async fn record_view(
        &self,
        strategy: CacheStrategy,
        photo_id: i64,
    ) -> Result<Lookup<PhotoSnapshot>, AppError> {
        let key = photo_key(strategy, photo_id);
        let rankings_pattern = format!("{}:rankings:*", strategy.as_str());

        match strategy.write_policy() {
            WritePolicy::Direct => {
                self.load_photo(photo_id).await?;
                self.apply_view(photo_id).await?;
                Ok(Lookup {
                    value: self.load_photo(photo_id).await?,
                    cache_hit: false,
                })
            }
            WritePolicy::Invalidate => {
                self.load_photo(photo_id).await?;
                self.apply_view(photo_id).await?;
                if self.store.remove(&key).await {
                    self.count_delete(&key);
                }
                self.remove_matching(&rankings_pattern).await;
                Ok(Lookup {
                    value: self.load_photo(photo_id).await?,
                    cache_hit: false,
                })
            }
            WritePolicy::Refresh => {
                self.load_photo(photo_id).await?;
                self.apply_view(photo_id).await?;
                let photo = self.load_photo(photo_id).await?;
                self.fill(strategy, key, CachedValue::Photo(photo.clone()))
                    .await;
                self.remove_matching(&rankings_pattern).await;
                Ok(Lookup {
                    value: photo,
                    cache_hit: false,
                })
            }
            WritePolicy::Deferred => {
                let cached = match self.lookup(strategy, &key).await {
                    Some(value) => match value.as_ref() {
                        CachedValue::Photo(photo) => Some(photo.clone()),
                        CachedValue::Rankings(_) => None,
                    },
                    None => None,
                };
                let cache_hit = cached.is_some();
                let mut photo = match cached {
                    Some(photo) => photo,
                    None => self.load_photo(photo_id).await?,
                };

                let weights = self.source.heat_weights().await;
                let delta = CounterDelta::single(InteractionKind::View, 1);
                photo.add_delta(delta, &weights);

                self.fill(strategy, key, CachedValue::Photo(photo.clone()))
                    .await;
                self.queue.push(PendingWrite { photo_id, delta }).await;

                Ok(Lookup {
                    value: photo,
                    cache_hit,
                })
            }
        }
    }
}

/// Group stats by strategy name for JSON responses
pub fn stats_by_name(stats: Vec<StrategyStats>) -> BTreeMap<String, StrategyStats> {
    stats
        .into_iter()
        .map(|entry| (entry.strategy.clone(), entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn snapshot(id: i64, views: i64) -> PhotoSnapshot {
        PhotoSnapshot {
            id,
            title: format!("Photo {}", id),
            description: None,
            image_url: format!("/media/photos/{}.jpg", id),
            thumbnail_url: None,
            theme: Some("campus_life".to_string()),
            views,
            likes: 0,
            favorites: 0,
            votes: 0,
            heat_score: views as f64 * 0.3,
            user_id: 1,
            username: "alice".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    fn engine(source: MockPhotoSource, default: CacheStrategy) -> StrategyEngine {
        StrategyEngine::new(Arc::new(source), default, 1000)
    }

    #[tokio::test]
    async fn baseline_always_reads_the_source() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .with(eq(7))
            .times(2)
            .returning(|id| Ok(Some(snapshot(id, 3))));
        let engine = engine(source, CacheStrategy::Baseline);

        for _ in 0..2 {
            let lookup = engine.read_photo(CacheStrategy::Baseline, 7).await.unwrap();
            assert!(!lookup.cache_hit);
            assert_eq!(lookup.value.views, 3);
        }
        let stats = engine.stats(CacheStrategy::Baseline).await;
        assert_eq!(stats.hits + stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn cache_aside_fills_once_then_hits() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .times(1)
            .returning(|id| Ok(Some(snapshot(id, 0))));
        let engine = engine(source, CacheStrategy::CacheAside);

        let first = engine.read_photo(CacheStrategy::CacheAside, 1).await.unwrap();
        let second = engine.read_photo(CacheStrategy::CacheAside, 1).await.unwrap();
        assert!(!first.cache_hit);
        assert!(second.cache_hit);

        let stats = engine.stats(CacheStrategy::CacheAside).await;
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 1, 1));
        assert_eq!(stats.hit_rate, 50.0);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn strategies_do_not_share_entries() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .times(2)
            .returning(|id| Ok(Some(snapshot(id, 0))));
        let engine = engine(source, CacheStrategy::CacheAside);

        engine.read_photo(CacheStrategy::CacheAside, 1).await.unwrap();
        let other = engine.read_photo(CacheStrategy::SmartTtl, 1).await.unwrap();
        assert!(!other.cache_hit);
    }

    #[tokio::test]
    async fn missing_photo_is_not_found() {
        let mut source = MockPhotoSource::new();
        source.expect_load_photo().returning(|_| Ok(None));
        let engine = engine(source, CacheStrategy::Hybrid);

        let error = engine
            .read_photo(CacheStrategy::Hybrid, 404)
            .await
            .expect_err("no such photo");
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn cache_aside_view_invalidates_the_photo_entry() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .returning(|id| Ok(Some(snapshot(id, 1))));
        source
            .expect_apply_delta()
            .withf(|id, delta| *id == 5 && delta.views == 1)
            .times(1)
            .returning(|_, _| Ok(true));
        let engine = engine(source, CacheStrategy::CacheAside);

        engine.read_photo(CacheStrategy::CacheAside, 5).await.unwrap();
        engine
            .record_view(CacheStrategy::CacheAside, 5)
            .await
            .unwrap();

        let after = engine.read_photo(CacheStrategy::CacheAside, 5).await.unwrap();
        assert!(!after.cache_hit);
        assert_eq!(engine.stats(CacheStrategy::CacheAside).await.deletes, 1);
    }

    #[tokio::test]
    async fn write_through_view_refreshes_the_entry() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .returning(|id| Ok(Some(snapshot(id, 2))));
        source.expect_apply_delta().returning(|_, _| Ok(true));
        let engine = engine(source, CacheStrategy::WriteThrough);

        engine
            .record_view(CacheStrategy::WriteThrough, 3)
            .await
            .unwrap();
        let read = engine.read_photo(CacheStrategy::WriteThrough, 3).await.unwrap();
        assert!(read.cache_hit);
    }

    #[tokio::test]
    async fn write_behind_defers_the_database_update() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .times(1)
            .returning(|id| Ok(Some(snapshot(id, 10))));
        source
            .expect_heat_weights()
            .returning(HeatWeights::default);
        source
            .expect_apply_delta()
            .withf(|id, delta| *id == 9 && delta.views == 3)
            .times(1)
            .returning(|_, _| Ok(true));
        let engine = engine(source, CacheStrategy::WriteBehind);

        let first = engine
            .record_view(CacheStrategy::WriteBehind, 9)
            .await
            .unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.value.views, 11);

        engine.record_view(CacheStrategy::WriteBehind, 9).await.unwrap();
        let third = engine
            .record_view(CacheStrategy::WriteBehind, 9)
            .await
            .unwrap();
        assert!(third.cache_hit);
        assert_eq!(third.value.views, 13);
        assert!((third.value.heat_score - 13.0 * 0.3).abs() < 1e-9);
        assert_eq!(engine.pending_writes(), 3);

        assert_eq!(engine.flush_write_behind().await, 1);
        assert_eq!(engine.pending_writes(), 0);
    }

    #[tokio::test]
    async fn failed_flush_requeues_the_delta() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .returning(|id| Ok(Some(snapshot(id, 0))));
        source
            .expect_heat_weights()
            .returning(HeatWeights::default);
        source
            .expect_apply_delta()
            .times(1)
            .returning(|_, _| Err(AppError::Storage("disk full".to_string())));
        let engine = engine(source, CacheStrategy::WriteBehind);

        engine.record_view(CacheStrategy::WriteBehind, 2).await.unwrap();
        assert_eq!(engine.flush_write_behind().await, 0);
        assert_eq!(engine.pending_writes(), 1);
    }

    #[tokio::test]
    async fn write_behind_views_survive_invalidation_and_flush() {
        let stored = Arc::new(std::sync::atomic::AtomicI64::new(10));
        let mut source = MockPhotoSource::new();
        let reader = stored.clone();
        source
            .expect_load_photo()
            .returning(move |id| Ok(Some(snapshot(id, reader.load(Ordering::SeqCst)))));
        source
            .expect_heat_weights()
            .returning(HeatWeights::default);
        let writer = stored.clone();
        source.expect_apply_delta().returning(move |_, delta| {
            writer.fetch_add(delta.views, Ordering::SeqCst);
            Ok(true)
        });
        let engine = engine(source, CacheStrategy::WriteBehind);

        engine.record_view(CacheStrategy::WriteBehind, 1).await.unwrap();
        let second = engine
            .record_view(CacheStrategy::WriteBehind, 1)
            .await
            .unwrap();
        assert_eq!(second.value.views, 12);

        // A like elsewhere drops the entry while both views are still queued
        engine.invalidate_photo(1).await;
        let reloaded = engine.read_photo(CacheStrategy::WriteBehind, 1).await.unwrap();
        assert!(!reloaded.cache_hit);
        assert_eq!(reloaded.value.views, 12);
        assert!((reloaded.value.heat_score - 12.0 * 0.3).abs() < 1e-9);

        let third = engine
            .record_view(CacheStrategy::WriteBehind, 1)
            .await
            .unwrap();
        assert_eq!(third.value.views, 13);

        assert_eq!(engine.flush_write_behind().await, 1);
        assert_eq!(stored.load(Ordering::SeqCst), 13);
        engine.invalidate_photo(1).await;
        let flushed = engine.read_photo(CacheStrategy::WriteBehind, 1).await.unwrap();
        assert_eq!(flushed.value.views, 13);
    }

    #[tokio::test]
    async fn rankings_are_cached_per_period_and_limit() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_rankings()
            .times(2)
            .returning(|_, _| Ok(Vec::new()));
        let engine = engine(source, CacheStrategy::CacheAside);

        engine
            .read_rankings(CacheStrategy::CacheAside, RankingPeriod::Week, 20)
            .await
            .unwrap();
        let hit = engine
            .read_rankings(CacheStrategy::CacheAside, RankingPeriod::Week, 20)
            .await
            .unwrap();
        assert!(hit.cache_hit);
        let other = engine
            .read_rankings(CacheStrategy::CacheAside, RankingPeriod::Month, 20)
            .await
            .unwrap();
        assert!(!other.cache_hit);
    }

    #[tokio::test]
    async fn invalidate_photo_spans_strategies() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .returning(|id| Ok(Some(snapshot(id, 0))));
        source
            .expect_load_rankings()
            .returning(|_, _| Ok(Vec::new()));
        let engine = engine(source, CacheStrategy::CacheAside);

        engine.read_photo(CacheStrategy::CacheAside, 4).await.unwrap();
        engine.read_photo(CacheStrategy::Hybrid, 4).await.unwrap();
        engine
            .read_rankings(CacheStrategy::SmartTtl, RankingPeriod::All, 10)
            .await
            .unwrap();

        engine.invalidate_photo(4).await;

        for strategy in [CacheStrategy::CacheAside, CacheStrategy::Hybrid] {
            assert!(!engine.read_photo(strategy, 4).await.unwrap().cache_hit);
        }
        let rankings = engine
            .read_rankings(CacheStrategy::SmartTtl, RankingPeriod::All, 10)
            .await
            .unwrap();
        assert!(!rankings.cache_hit);
    }

    #[tokio::test]
    async fn switching_strategy_clears_the_store() {
        let mut source = MockPhotoSource::new();
        source
            .expect_load_photo()
            .times(2)
            .returning(|id| Ok(Some(snapshot(id, 0))));
        let engine = engine(source, CacheStrategy::CacheAside);

        engine.read_photo(CacheStrategy::CacheAside, 1).await.unwrap();
        engine.switch_strategy(CacheStrategy::SmartTtl).await;
        assert_eq!(engine.current_strategy(), CacheStrategy::SmartTtl);

        let read = engine.read_photo(CacheStrategy::CacheAside, 1).await.unwrap();
        assert!(!read.cache_hit);
    }
}
