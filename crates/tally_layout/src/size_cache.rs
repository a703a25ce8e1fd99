//! Fitted-size cache keyed by rendered label text
//!
//! Measuring a button means shaping its label, which is far more expensive
//! than the rest of a layout pass. The cache remembers, per widget, the label
//! text it last measured and the fitted size it produced. A lookup hits only
//! when the widget's *current* text is identical to the stored text.
//!
//! Invalidation is explicit: the owner calls [`SizeCache::remove`] when a
//! widget is destroyed. A style change that leaves the text untouched keeps
//! the cached size.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use tally_core::Size;

/// Stored measurement for one widget
#[derive(Clone, Debug, PartialEq)]
pub struct SizeCacheEntry {
    /// Label text at measurement time (`None` = no title)
    pub text: Option<String>,
    /// Fitted size, already clamped to the minimum width
    pub size: Size,
}

/// Hit/miss counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Per-widget memo of fitted sizes
#[derive(Debug)]
pub struct SizeCache<K> {
    entries: FxHashMap<K, SizeCacheEntry>,
    min_width: f32,
    hits: u64,
    misses: u64,
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> SizeCache<K> {
    /// Create an empty cache with the given minimum width floor
    pub fn new(min_width: f32) -> Self {
        Self {
            entries: FxHashMap::default(),
            min_width,
            hits: 0,
            misses: 0,
        }
    }

    pub fn min_width(&self) -> f32 {
        self.min_width
    }

    /// Fitted size for `key` showing `text`
    ///
    /// Returns the stored size when `text` matches what was last measured for
    /// `key`. Otherwise calls `fit` exactly once, floors the width at the
    /// minimum, stores the result, and returns it.
    pub fn measure<F>(&mut self, key: K, text: Option<&str>, fit: F) -> Size
    where
        F: FnOnce() -> Size,
    {
        if let Some(entry) = self.entries.get(&key) {
            if entry.text.as_deref() == text {
                self.hits += 1;
                tracing::trace!("SizeCache: hit for {:?}", key);
                return entry.size;
            }
        }

        self.misses += 1;
        let mut size = fit();
        size.width = size.width.max(self.min_width);
        tracing::trace!("SizeCache: measured {:?} as {:?}", key, size);

        self.entries.insert(
            key,
            SizeCacheEntry {
                text: text.map(str::to_owned),
                size,
            },
        );
        size
    }

    /// Purge the entry for a destroyed widget
    pub fn remove(&mut self, key: K) -> Option<SizeCacheEntry> {
        self.entries.remove(&key)
    }

    pub fn get(&self, key: K) -> Option<&SizeCacheEntry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate cached keys
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> SizeCacheStats {
        SizeCacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
