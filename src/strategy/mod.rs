//! Cache strategy experiment
//!
//! Six interchangeable caching policies in front of photo and ranking reads.
//! Each variant maps to a read policy and a write policy; the engine
//! dispatches on those, so adding a variant means extending two tables.

mod engine;
mod write_behind;

pub use engine::{
    CachedValue, Lookup, PhotoSnapshot, PhotoSource, RankingReader, RankingWriter,
    StrategyEngine, StrategyStats, stats_by_name,
};
pub use write_behind::{PendingWrite, WriteBehindQueue};

#[cfg(test)]
pub use engine::MockPhotoSource;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;

/// Base TTL for lazily filled entries
pub const BASE_TTL: Duration = Duration::from_secs(300);
/// TTL for hot keys and write-through entries
pub const EXTENDED_TTL: Duration = Duration::from_secs(600);
/// TTL for write-behind entries, which carry unflushed state
pub const WRITE_BEHIND_TTL: Duration = Duration::from_secs(1800);

/// Caching policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    Baseline,
    CacheAside,
    SmartTtl,
    WriteThrough,
    WriteBehind,
    Hybrid,
}

/// How reads interact with the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Always read the database
    Bypass,
    /// Fill on miss with a fixed TTL
    Fixed(Duration),
    /// Fill on miss; keys hit recently get the longer TTL
    Adaptive { base: Duration, hot: Duration },
}

/// How a view is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Database only
    Direct,
    /// Database, then drop cached entries
    Invalidate,
    /// Database, then reload the photo entry
    Refresh,
    /// Cache now, database later
    Deferred,
}

impl CacheStrategy {
    pub const ALL: [CacheStrategy; 6] = [
        Self::Baseline,
        Self::CacheAside,
        Self::SmartTtl,
        Self::WriteThrough,
        Self::WriteBehind,
        Self::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::CacheAside => "cache_aside",
            Self::SmartTtl => "smart_ttl",
            Self::WriteThrough => "write_through",
            Self::WriteBehind => "write_behind",
            Self::Hybrid => "hybrid",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Baseline => "Baseline (no cache)",
            Self::CacheAside => "Cache-Aside",
            Self::SmartTtl => "Smart TTL",
            Self::WriteThrough => "Write-Through",
            Self::WriteBehind => "Write-Behind",
            Self::Hybrid => "Hybrid",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("Unknown cache strategy: {}", value)))
    }

    pub fn read_policy(&self) -> ReadPolicy {
        match self {
            Self::Baseline => ReadPolicy::Bypass,
            Self::CacheAside => ReadPolicy::Fixed(BASE_TTL),
            Self::SmartTtl | Self::Hybrid => ReadPolicy::Adaptive {
                base: BASE_TTL,
                hot: EXTENDED_TTL,
            },
            Self::WriteThrough => ReadPolicy::Fixed(EXTENDED_TTL),
            Self::WriteBehind => ReadPolicy::Fixed(WRITE_BEHIND_TTL),
        }
    }

    pub fn write_policy(&self) -> WritePolicy {
        match self {
            Self::Baseline => WritePolicy::Direct,
            Self::CacheAside | Self::SmartTtl => WritePolicy::Invalidate,
            Self::WriteThrough | Self::Hybrid => WritePolicy::Refresh,
            Self::WriteBehind => WritePolicy::Deferred,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Baseline => 0,
            Self::CacheAside => 1,
            Self::SmartTtl => 2,
            Self::WriteThrough => 3,
            Self::WriteBehind => 4,
            Self::Hybrid => 5,
        }
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for strategy in CacheStrategy::ALL {
            assert_eq!(CacheStrategy::parse(strategy.as_str()).unwrap(), strategy);
            assert_eq!(CacheStrategy::from_index(strategy.index()), strategy);
        }
        assert!(CacheStrategy::parse("redis").is_err());
    }

    #[test]
    fn policy_tables() {
        assert_eq!(CacheStrategy::Baseline.read_policy(), ReadPolicy::Bypass);
        assert_eq!(
            CacheStrategy::WriteBehind.read_policy(),
            ReadPolicy::Fixed(WRITE_BEHIND_TTL)
        );
        assert_eq!(
            CacheStrategy::Hybrid.read_policy(),
            CacheStrategy::SmartTtl.read_policy()
        );
        assert_eq!(CacheStrategy::Hybrid.write_policy(), WritePolicy::Refresh);
        assert_eq!(CacheStrategy::SmartTtl.write_policy(), WritePolicy::Invalidate);
        assert_eq!(CacheStrategy::WriteBehind.write_policy(), WritePolicy::Deferred);
    }

    #[test]
    fn config_values_deserialize() {
        let strategy: CacheStrategy = serde_json::from_str("\"write_through\"").unwrap();
        assert_eq!(strategy, CacheStrategy::WriteThrough);
    }
}
