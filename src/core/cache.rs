use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{content_hash, Verdict};
use crate::cache::patterns::salient_terms;
use crate::cache::{
    derive_pattern_key, EntryMetadata, PatternRecord, PatternTable, PruneStats, RetentionPolicy,
};
use crate::embeddings::{cosine_similarity, EmbeddingModel};
use crate::errors::{CodevetError, Result};

const EMBEDDINGS_DIR: &str = "embeddings";
const PATTERNS_DIR: &str = "patterns";
const PATTERN_STATS_FILE: &str = "pattern_stats.json";

/// Verdict record persisted as `{content_hash}.json`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub content_hash: String,
    pub pattern_key: String,
    pub cached_at: DateTime<Utc>,
    pub verdict: Verdict,
}

/// Embedding persisted as `embeddings/{content_hash}.json`, independent of
/// the verdict it supports.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub content_hash: String,
    pub model: String,
    pub vector: Vec<f32>,
}

/// Best fuzzy match returned by [`SemanticCache::find_similar`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarMatch {
    pub content_hash: String,
    pub similarity: f64,
    pub verdict: Verdict,
}

/// Exact content-hash cache plus a nearest-neighbour index over embeddings.
///
/// Everything lives under one directory as plain JSON so the cache can be
/// inspected by hand. In-memory indexes mirror the directory and are safe to
/// share between worker threads. Lock order: `embeddings` before `index`.
pub struct SemanticCache {
    cache_dir: PathBuf,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    retention: RetentionPolicy,
    index: RwLock<HashMap<String, EntryMetadata>>,
    embeddings: RwLock<HashMap<String, Vec<f32>>>,
    patterns: Mutex<PatternTable>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl std::fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCache")
            .field("cache_dir", &self.cache_dir)
            .field("embedder", &self.embedder.as_ref().map(|m| m.name().to_string()))
            .field("retention", &self.retention)
            .finish()
    }
}

impl SemanticCache {
    /// Open (creating if needed) a cache directory and load its indexes.
    pub fn open(
        cache_dir: impl Into<PathBuf>,
        embedder: Option<Arc<dyn EmbeddingModel>>,
        retention: RetentionPolicy,
    ) -> Result<Self> {
        let cache_dir = cache_dir.into();
        for dir in [
            cache_dir.clone(),
            cache_dir.join(EMBEDDINGS_DIR),
            cache_dir.join(PATTERNS_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| CodevetError::io(&dir, e))?;
        }

        let index = load_index(&cache_dir)?;
        let embeddings = match &embedder {
            Some(model) => load_embeddings(&cache_dir.join(EMBEDDINGS_DIR), model.as_ref())?,
            None => HashMap::new(),
        };
        let patterns = read_json::<PatternTable>(&cache_dir.join(PATTERN_STATS_FILE))
            .unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable pattern statistics");
                None
            })
            .unwrap_or_default();

        debug!(
            dir = %cache_dir.display(),
            entries = index.len(),
            embeddings = embeddings.len(),
            "opened semantic cache"
        );

        Ok(Self {
            cache_dir,
            embedder,
            retention,
            index: RwLock::new(index),
            embeddings: RwLock::new(embeddings),
            patterns: Mutex::new(patterns),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether the fuzzy layer can run.
    pub fn has_embeddings(&self) -> bool {
        self.embedder.as_ref().is_some_and(|m| m.is_available())
    }

    /// Exact lookup by content hash.
    pub fn get(&self, hash: &str) -> Option<Verdict> {
        self.get_entry(hash).map(|entry| entry.verdict)
    }

    /// Exact lookup returning the full persisted record.
    pub fn get_entry(&self, hash: &str) -> Option<CacheEntry> {
        let entry = match self.read_entry(hash) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!(hash, error = %e, category = %e.category(), "unreadable cache entry");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        self.hits.fetch_add(1, Ordering::Relaxed);
        self.index
            .write()
            .entry(hash.to_string())
            .or_insert_with(|| EntryMetadata::new(entry.cached_at))
            .last_accessed = Utc::now();
        self.record_pattern(&entry.pattern_key, &entry.verdict, PatternEvent::Hit);

        Some(entry)
    }

    /// Lookup that leaves hit/miss counters and recency untouched.
    pub fn peek(&self, hash: &str) -> Option<Verdict> {
        self.read_entry(hash).ok().flatten().map(|entry| entry.verdict)
    }

    /// Persist a verdict under its content hash and return its pattern key.
    ///
    /// Storing an outcome identical to the one already cached is a no-op.
    pub fn set(&self, hash: &str, verdict: &Verdict) -> Result<String> {
        ensure_cache_key(hash)?;

        if let Ok(Some(existing)) = self.read_entry(hash) {
            if existing.verdict.same_outcome(verdict) {
                self.touch(hash, existing.cached_at);
                return Ok(existing.pattern_key);
            }
        }

        let now = Utc::now();
        let pattern_key = derive_pattern_key(verdict);
        let entry = CacheEntry {
            content_hash: hash.to_string(),
            pattern_key: pattern_key.clone(),
            cached_at: now,
            verdict: verdict.clone(),
        };
        write_json_atomic(&self.entry_path(hash), &entry)?;
        self.index
            .write()
            .insert(hash.to_string(), EntryMetadata::new(now));
        self.record_pattern(&pattern_key, verdict, PatternEvent::Stored);

        let overflow = self.retention.select_lru_overflow(&self.index.read());
        let evicted = self.evict(overflow);
        if evicted > 0 {
            debug!(evicted, "cache over capacity; evicted least recently used");
        }

        Ok(pattern_key)
    }

    /// Highest-scoring cached verdict whose embedding is at least
    /// `threshold`-similar to `text`. Full linear scan.
    pub fn find_similar(&self, text: &str, threshold: f64) -> Option<SimilarMatch> {
        let model = self.embedder.as_ref().filter(|m| m.is_available())?;
        let query = match model.embed(text) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "embedding failed; skipping similarity lookup");
                return None;
            }
        };

        let (content_hash, similarity) = {
            let embeddings = self.embeddings.read();
            let index = self.index.read();
            embeddings
                .iter()
                .filter(|(hash, _)| index.contains_key(*hash))
                .map(|(hash, vector)| (hash, cosine_similarity(&query, vector)))
                .filter(|(_, score)| *score >= threshold)
                // Highest score wins; the smaller hash breaks ties.
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(hash, score)| (hash.clone(), score))?
        };

        match self.read_entry(&content_hash) {
            Ok(Some(entry)) => Some(SimilarMatch {
                content_hash,
                similarity,
                verdict: entry.verdict,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(hash = %content_hash, error = %e, "similar entry unreadable");
                None
            }
        }
    }

    /// Embedding for `text`, cached by content hash. Empty when no
    /// embedding model is available or embedding fails.
    pub fn get_embedding(&self, text: &str) -> Vec<f32> {
        let Some(model) = self.embedder.as_ref().filter(|m| m.is_available()) else {
            return Vec::new();
        };

        let hash = content_hash(text);
        if let Some(vector) = self.embeddings.read().get(&hash) {
            return vector.clone();
        }

        let vector = match model.embed(text) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "embedding failed");
                return Vec::new();
            }
        };
        let record = EmbeddingRecord {
            content_hash: hash.clone(),
            model: model.name().to_string(),
            vector,
        };
        if let Err(e) = write_json_atomic(&self.embedding_path(&hash), &record) {
            warn!(hash = %hash, error = %e, "failed to persist embedding");
        }
        self.embeddings.write().insert(hash, record.vector.clone());
        record.vector
    }

    /// Snapshot of the pattern statistics.
    pub fn pattern_stats(&self) -> PatternTable {
        self.patterns.lock().clone()
    }

    /// Apply the retention policy: drop entries older than the TTL, then
    /// trim to the size cap, then delete embeddings without a verdict.
    pub fn prune(&self) -> Result<PruneStats> {
        let expired = self.retention.select_expired(&self.index.read(), Utc::now());
        let expired = self.evict(expired);
        let overflow = self.retention.select_lru_overflow(&self.index.read());
        let over_capacity = self.evict(overflow);

        let orphans: Vec<String> = {
            let embeddings = self.embeddings.read();
            let index = self.index.read();
            embeddings
                .keys()
                .filter(|hash| !index.contains_key(*hash))
                .cloned()
                .collect()
        };
        for hash in &orphans {
            self.remove_embedding(hash);
        }

        let stats = PruneStats {
            expired,
            over_capacity,
            orphaned_embeddings: orphans.len(),
            entries_remaining: self.index.read().len(),
        };
        debug!(%stats, "pruned cache");
        Ok(stats)
    }

    /// Delete every record this cache owns and reset counters.
    pub fn clear(&self) -> Result<()> {
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| CodevetError::io(&self.cache_dir, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let owned = path.file_name().and_then(|n| n.to_str()) == Some(PATTERN_STATS_FILE)
                || hash_from_path(&path).is_some();
            if owned && path.is_file() {
                remove_file_if_exists(&path)?;
            }
        }
        for dir in [EMBEDDINGS_DIR, PATTERNS_DIR] {
            let dir = self.cache_dir.join(dir);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CodevetError::io(&dir, e)),
            }
            fs::create_dir_all(&dir).map_err(|e| CodevetError::io(&dir, e))?;
        }

        self.embeddings.write().clear();
        self.index.write().clear();
        self.patterns.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            entries: self.index.read().len(),
            hits,
            misses,
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
            embeddings: self.embeddings.read().len(),
            patterns: self.patterns.lock().len(),
        }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(format!("{hash}.json"))
    }

    fn embedding_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(EMBEDDINGS_DIR).join(format!("{hash}.json"))
    }

    fn read_entry(&self, hash: &str) -> Result<Option<CacheEntry>> {
        ensure_cache_key(hash)?;
        read_json(&self.entry_path(hash))
    }

    fn touch(&self, hash: &str, cached_at: DateTime<Utc>) {
        self.index
            .write()
            .entry(hash.to_string())
            .or_insert_with(|| EntryMetadata::new(cached_at))
            .last_accessed = Utc::now();
    }

    /// Remove verdicts and their embeddings; returns how many verdicts went.
    fn evict(&self, hashes: Vec<String>) -> usize {
        let mut removed = 0;
        for hash in hashes {
            if self.index.write().remove(&hash).is_some() {
                removed += 1;
            }
            if let Err(e) = remove_file_if_exists(&self.entry_path(&hash)) {
                warn!(hash = %hash, error = %e, "failed to delete evicted entry");
            }
            self.remove_embedding(&hash);
        }
        removed
    }

    fn remove_embedding(&self, hash: &str) {
        self.embeddings.write().remove(hash);
        if let Err(e) = remove_file_if_exists(&self.embedding_path(hash)) {
            warn!(hash, error = %e, "failed to delete embedding");
        }
    }

    /// Update pattern counters and persist them. Failures are logged; the
    /// statistics are advisory.
    fn record_pattern(&self, key: &str, verdict: &Verdict, event: PatternEvent) {
        let mut patterns = self.patterns.lock();
        let stats = patterns.entry(key.to_string()).or_default();
        match event {
            PatternEvent::Stored => stats.count += 1,
            PatternEvent::Hit => stats.cache_hits += 1,
        }

        let record = PatternRecord {
            pattern_key: key.to_string(),
            status: verdict.status.as_str().to_string(),
            terms: salient_terms(verdict),
            count: stats.count,
            cache_hits: stats.cache_hits,
            last_seen: Utc::now(),
        };
        let written = write_json_atomic(
            &self.cache_dir.join(PATTERNS_DIR).join(format!("{key}.json")),
            &record,
        )
        .and_then(|()| write_json_atomic(&self.cache_dir.join(PATTERN_STATS_FILE), &*patterns));
        if let Err(e) = written {
            warn!(pattern = key, error = %e, "failed to persist pattern statistics");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PatternEvent {
    Stored,
    Hit,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
    pub embeddings: usize,
    pub patterns: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache Stats: {} entries, {} hits, {} misses, {:.1}% hit rate, {} embeddings, {} patterns",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.embeddings,
            self.patterns
        )
    }
}

/// Length of a hex-encoded SHA-256 digest.
const CACHE_KEY_LEN: usize = 64;

/// Content hashes are 64 lowercase hex digits; anything else could escape
/// the cache directory or alias another entry.
fn ensure_cache_key(hash: &str) -> Result<()> {
    if is_cache_key(hash) {
        Ok(())
    } else {
        Err(CodevetError::Cache(format!("invalid cache key '{hash}'")))
    }
}

fn is_cache_key(hash: &str) -> bool {
    hash.len() == CACHE_KEY_LEN && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn hash_from_path(path: &Path) -> Option<&str> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|stem| is_cache_key(stem))
}

fn load_index(cache_dir: &Path) -> Result<HashMap<String, EntryMetadata>> {
    let mut index = HashMap::new();
    let entries = fs::read_dir(cache_dir).map_err(|e| CodevetError::io(cache_dir, e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(hash) = hash_from_path(&path) else {
            continue;
        };
        match read_json::<CacheEntry>(&path) {
            Ok(Some(record)) => {
                index.insert(hash.to_string(), EntryMetadata::new(record.cached_at));
            }
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt cache entry"),
        }
    }
    Ok(index)
}

fn load_embeddings(dir: &Path, model: &dyn EmbeddingModel) -> Result<HashMap<String, Vec<f32>>> {
    let mut embeddings = HashMap::new();
    let entries = fs::read_dir(dir).map_err(|e| CodevetError::io(dir, e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(hash) = hash_from_path(&path) else {
            continue;
        };
        match read_json::<EmbeddingRecord>(&path) {
            // Vectors from another model are not comparable.
            Ok(Some(record))
                if record.model == model.name() && record.vector.len() == model.dimensions() =>
            {
                embeddings.insert(hash.to_string(), record.vector);
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt embedding"),
        }
    }
    Ok(embeddings)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CodevetError::io(path, e)),
    };
    Ok(Some(serde_json::from_slice(&data)?))
}

/// Write through a uniquely named temporary file so readers never see a
/// partial record.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("tmp{:08x}", rand::random::<u32>()));
    fs::write(&tmp, data).map_err(|e| CodevetError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CodevetError::io(path, e)
    })
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CodevetError::io(path, e)),
    }
}
