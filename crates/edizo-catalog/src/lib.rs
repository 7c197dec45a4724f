//! Caching catalog service in front of the sheet source.
//!
//! Reads are served from an injected [`CacheService`]. A cold cache is
//! hydrated from the last durable snapshot when one exists, otherwise from
//! the network. A stale entry is returned immediately and a background
//! refresh is spawned so callers never wait on revalidation. Concurrent
//! refreshes of the same resource are coalesced behind a per-resource gate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use edizo_core::{InternshipRecord, TeamMember};
use edizo_sheets::CatalogSource;
use edizo_storage::SnapshotStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

pub const RESOURCE_INTERNSHIPS: &str = "internships";
pub const RESOURCE_TEAM: &str = "team";

/// Cached data is considered fresh for this long unless overridden.
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(300);

/// One cached value together with the instant it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Stale strictly after `ttl` has elapsed; an entry exactly `ttl` old is
    /// still fresh.
    pub fn is_stale(&self, ttl: StdDuration, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.fetched_at) > ttl
    }
}

/// Storage seam for cached catalog data. The service never assumes a
/// concrete backing store; tests and alternative deployments supply their
/// own implementation.
pub trait CacheService<T: Clone>: Send + Sync {
    fn get(&self) -> Option<CacheEntry<T>>;
    fn set(&self, entry: CacheEntry<T>);
    /// An empty cache counts as stale.
    fn is_stale(&self, ttl: StdDuration, now: DateTime<Utc>) -> bool;
}

/// Default in-process cache holding a single entry per resource.
pub struct MemoryCache<T> {
    slot: RwLock<Option<CacheEntry<T>>>,
}

impl<T> MemoryCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> CacheService<T> for MemoryCache<T> {
    fn get(&self) -> Option<CacheEntry<T>> {
        self.slot.read().expect("cache lock not poisoned").clone()
    }

    fn set(&self, entry: CacheEntry<T>) {
        *self.slot.write().expect("cache lock not poisoned") = Some(entry);
    }

    fn is_stale(&self, ttl: StdDuration, now: DateTime<Utc>) -> bool {
        self.slot
            .read()
            .expect("cache lock not poisoned")
            .as_ref()
            .is_none_or(|entry| entry.is_stale(ttl, now))
    }
}

/// Runtime knobs for the catalog service, read from the environment with
/// defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub ttl: StdDuration,
    pub snapshot_dir: Option<PathBuf>,
    pub scheduler_enabled: bool,
    pub refresh_cron: String,
    pub user_agent: String,
    pub http_timeout: StdDuration,
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("EDIZO_CACHE_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(300);
        let snapshot_dir = match std::env::var("EDIZO_SNAPSHOT_DIR") {
            Ok(raw) if raw.eq_ignore_ascii_case("none") => None,
            Ok(raw) => Some(PathBuf::from(raw)),
            Err(_) => Some(PathBuf::from("./snapshots")),
        };
        let scheduler_enabled = std::env::var("EDIZO_SCHEDULER_ENABLED")
            .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let refresh_cron = std::env::var("EDIZO_REFRESH_CRON")
            .unwrap_or_else(|_| "0 0/5 * * * *".to_string());
        let user_agent = std::env::var("EDIZO_USER_AGENT")
            .unwrap_or_else(|_| concat!("edizo-catalog/", env!("CARGO_PKG_VERSION")).to_string());
        let http_timeout_secs = std::env::var("EDIZO_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(10);
        Self {
            ttl: StdDuration::from_secs(ttl_secs),
            snapshot_dir,
            scheduler_enabled,
            refresh_cron,
            user_agent,
            http_timeout: StdDuration::from_secs(http_timeout_secs),
        }
    }
}

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Cache,
    Network,
    Snapshot,
}

/// What a read returns: the data plus enough provenance for callers to
/// surface freshness to users.
#[derive(Debug, Clone)]
pub struct CatalogView<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
    pub origin: DataOrigin,
}

/// Outcome of one full refresh run, for logs and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub internships: usize,
    pub team_members: usize,
    pub skipped_rows: usize,
    pub snapshot_paths: Vec<PathBuf>,
}

#[derive(Serialize)]
struct SnapshotWrite<'a, T: Serialize> {
    fetched_at: DateTime<Utc>,
    data: &'a T,
}

#[derive(Deserialize)]
struct SnapshotRead<T> {
    fetched_at: DateTime<Utc>,
    data: T,
}

// What a coalesced refresh actually did: a waiter that found a fresh entry
// inside the gate reports that entry, not a phantom network fetch.
struct RefreshOutcome<T> {
    records: Vec<T>,
    skipped: usize,
    fetched_at: DateTime<Utc>,
    from_cache: bool,
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    Internships,
    Team,
}

impl Resource {
    fn name(self) -> &'static str {
        match self {
            Resource::Internships => RESOURCE_INTERNSHIPS,
            Resource::Team => RESOURCE_TEAM,
        }
    }
}

pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
    internships: Arc<dyn CacheService<Vec<InternshipRecord>>>,
    team: Arc<dyn CacheService<Vec<TeamMember>>>,
    snapshots: Option<SnapshotStore>,
    ttl: StdDuration,
    gates: Mutex<HashMap<&'static str, Arc<Mutex<()>>>>,
}

impl CatalogService {
    pub fn new(source: Arc<dyn CatalogSource>, config: &CatalogConfig) -> Self {
        Self::with_caches(
            source,
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryCache::new()),
        )
    }

    /// Composition-root constructor: the caches are supplied by the caller.
    pub fn with_caches(
        source: Arc<dyn CatalogSource>,
        config: &CatalogConfig,
        internships: Arc<dyn CacheService<Vec<InternshipRecord>>>,
        team: Arc<dyn CacheService<Vec<TeamMember>>>,
    ) -> Self {
        let snapshots = config
            .snapshot_dir
            .as_ref()
            .map(|dir| SnapshotStore::new(dir.clone()));
        Self {
            source,
            internships,
            team,
            snapshots,
            ttl: config.ttl,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> StdDuration {
        self.ttl
    }

    /// Serve internships from cache, snapshot, or network, in that order.
    /// A stale hit is returned as-is with a background refresh in flight.
    pub async fn internships(
        self: &Arc<Self>,
    ) -> anyhow::Result<CatalogView<Vec<InternshipRecord>>> {
        let now = Utc::now();
        if let Some(entry) = self.internships.get() {
            let stale = entry.is_stale(self.ttl, now);
            if stale {
                self.spawn_refresh(Resource::Internships);
            }
            return Ok(CatalogView {
                data: entry.data,
                fetched_at: entry.fetched_at,
                stale,
                origin: DataOrigin::Cache,
            });
        }
        if let Some((records, fetched_at)) = self
            .hydrate_snapshot::<Vec<InternshipRecord>>(RESOURCE_INTERNSHIPS)
            .await
        {
            self.internships.set(CacheEntry {
                data: records.clone(),
                fetched_at,
            });
            let stale = now.signed_duration_since(fetched_at)
                > TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
            if stale {
                self.spawn_refresh(Resource::Internships);
            }
            return Ok(CatalogView {
                data: records,
                fetched_at,
                stale,
                origin: DataOrigin::Snapshot,
            });
        }
        let outcome = self.refresh_internships_inner(false).await?;
        Ok(CatalogView {
            data: outcome.records,
            fetched_at: outcome.fetched_at,
            stale: false,
            origin: if outcome.from_cache {
                DataOrigin::Cache
            } else {
                DataOrigin::Network
            },
        })
    }

    /// Same serving order as [`Self::internships`], for the team sheet.
    pub async fn team(self: &Arc<Self>) -> anyhow::Result<CatalogView<Vec<TeamMember>>> {
        let now = Utc::now();
        if let Some(entry) = self.team.get() {
            let stale = entry.is_stale(self.ttl, now);
            if stale {
                self.spawn_refresh(Resource::Team);
            }
            return Ok(CatalogView {
                data: entry.data,
                fetched_at: entry.fetched_at,
                stale,
                origin: DataOrigin::Cache,
            });
        }
        if let Some((members, fetched_at)) = self
            .hydrate_snapshot::<Vec<TeamMember>>(RESOURCE_TEAM)
            .await
        {
            self.team.set(CacheEntry {
                data: members.clone(),
                fetched_at,
            });
            let stale = now.signed_duration_since(fetched_at)
                > TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
            if stale {
                self.spawn_refresh(Resource::Team);
            }
            return Ok(CatalogView {
                data: members,
                fetched_at,
                stale,
                origin: DataOrigin::Snapshot,
            });
        }
        let outcome = self.refresh_team_inner(false).await?;
        Ok(CatalogView {
            data: outcome.records,
            fetched_at: outcome.fetched_at,
            stale: false,
            origin: if outcome.from_cache {
                DataOrigin::Cache
            } else {
                DataOrigin::Network
            },
        })
    }

    /// Force-refresh both resources, bypassing freshness checks.
    pub async fn refresh_all(&self) -> anyhow::Result<RefreshSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(run_id = %run_id, "catalog refresh started");
        let internships = self.refresh_internships_inner(true).await?;
        let team_members = self.refresh_team_inner(true).await?;
        let snapshot_paths = self
            .snapshots
            .as_ref()
            .map(|store| {
                vec![
                    store.snapshot_path(RESOURCE_INTERNSHIPS),
                    store.snapshot_path(RESOURCE_TEAM),
                ]
            })
            .unwrap_or_default();
        let summary = RefreshSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            internships: internships.records.len(),
            team_members: team_members.records.len(),
            skipped_rows: internships.skipped + team_members.skipped,
            snapshot_paths,
        };
        tracing::info!(
            run_id = %run_id,
            internships = summary.internships,
            team_members = summary.team_members,
            skipped_rows = summary.skipped_rows,
            "catalog refresh finished"
        );
        Ok(summary)
    }

    /// Periodic refresh driven by a cron schedule, when enabled.
    pub async fn maybe_build_scheduler(
        self: &Arc<Self>,
        config: &CatalogConfig,
    ) -> anyhow::Result<Option<JobScheduler>> {
        if !config.scheduler_enabled {
            return Ok(None);
        }
        let scheduler = JobScheduler::new()
            .await
            .context("creating refresh scheduler")?;
        let service = Arc::clone(self);
        let job = Job::new_async(config.refresh_cron.as_str(), move |_uuid, _lock| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                match service.refresh_all().await {
                    Ok(summary) => tracing::info!(
                        run_id = %summary.run_id,
                        internships = summary.internships,
                        "scheduled catalog refresh complete"
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, "scheduled catalog refresh failed")
                    }
                }
            })
        })
        .with_context(|| format!("invalid refresh cron `{}`", config.refresh_cron))?;
        scheduler
            .add(job)
            .await
            .context("adding refresh job to scheduler")?;
        Ok(Some(scheduler))
    }

    async fn refresh_internships_inner(
        &self,
        force: bool,
    ) -> anyhow::Result<RefreshOutcome<InternshipRecord>> {
        let gate = self.gate(RESOURCE_INTERNSHIPS).await;
        let _guard = gate.lock().await;
        // Another caller may have refreshed while we waited on the gate.
        if !force {
            if let Some(entry) = self.internships.get() {
                if !entry.is_stale(self.ttl, Utc::now()) {
                    return Ok(RefreshOutcome {
                        records: entry.data,
                        skipped: 0,
                        fetched_at: entry.fetched_at,
                        from_cache: true,
                    });
                }
            }
        }
        let parsed = self.source.fetch_internships().await?;
        if !parsed.skipped.is_empty() {
            tracing::warn!(
                skipped = parsed.skipped.len(),
                "internship rows skipped during refresh"
            );
        }
        let fetched_at = Utc::now();
        self.internships.set(CacheEntry {
            data: parsed.records.clone(),
            fetched_at,
        });
        self.persist_snapshot(RESOURCE_INTERNSHIPS, &parsed.records, fetched_at)
            .await;
        Ok(RefreshOutcome {
            records: parsed.records,
            skipped: parsed.skipped.len(),
            fetched_at,
            from_cache: false,
        })
    }

    async fn refresh_team_inner(
        &self,
        force: bool,
    ) -> anyhow::Result<RefreshOutcome<TeamMember>> {
        let gate = self.gate(RESOURCE_TEAM).await;
        let _guard = gate.lock().await;
        if !force {
            if let Some(entry) = self.team.get() {
                if !entry.is_stale(self.ttl, Utc::now()) {
                    return Ok(RefreshOutcome {
                        records: entry.data,
                        skipped: 0,
                        fetched_at: entry.fetched_at,
                        from_cache: true,
                    });
                }
            }
        }
        let parsed = self.source.fetch_team().await?;
        if !parsed.skipped.is_empty() {
            tracing::warn!(
                skipped = parsed.skipped.len(),
                "team rows skipped during refresh"
            );
        }
        let fetched_at = Utc::now();
        self.team.set(CacheEntry {
            data: parsed.records.clone(),
            fetched_at,
        });
        self.persist_snapshot(RESOURCE_TEAM, &parsed.records, fetched_at)
            .await;
        Ok(RefreshOutcome {
            records: parsed.records,
            skipped: parsed.skipped.len(),
            fetched_at,
            from_cache: false,
        })
    }

    fn spawn_refresh(self: &Arc<Self>, resource: Resource) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let result = match resource {
                Resource::Internships => service
                    .refresh_internships_inner(false)
                    .await
                    .map(|_| ()),
                Resource::Team => service.refresh_team_inner(false).await.map(|_| ()),
            };
            if let Err(err) = result {
                tracing::warn!(
                    resource = resource.name(),
                    error = %err,
                    "background catalog refresh failed"
                );
            }
        });
    }

    async fn gate(&self, resource: &'static str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(resource).or_default())
    }

    /// Snapshot writes are best effort, a failure never fails the refresh.
    async fn persist_snapshot<T: Serialize>(
        &self,
        resource: &str,
        data: &T,
        fetched_at: DateTime<Utc>,
    ) {
        let Some(store) = &self.snapshots else {
            return;
        };
        let envelope = SnapshotWrite { fetched_at, data };
        match serde_json::to_vec_pretty(&envelope) {
            Ok(bytes) => {
                if let Err(err) = store.persist(resource, &bytes).await {
                    tracing::warn!(resource, error = %err, "snapshot write failed");
                }
            }
            Err(err) => {
                tracing::warn!(resource, error = %err, "snapshot serialization failed")
            }
        }
    }

    async fn hydrate_snapshot<T: DeserializeOwned>(
        &self,
        resource: &str,
    ) -> Option<(T, DateTime<Utc>)> {
        let store = self.snapshots.as_ref()?;
        match store.load(resource).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<SnapshotRead<T>>(&bytes) {
                Ok(snapshot) => {
                    tracing::info!(resource, "cache hydrated from snapshot");
                    Some((snapshot.data, snapshot.fetched_at))
                }
                Err(err) => {
                    tracing::warn!(resource, error = %err, "snapshot decode failed");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(resource, error = %err, "snapshot read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edizo_core::{DeliveryMode, Duration};
    use edizo_sheets::ParsedSheet;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mk_record(id: &str) -> InternshipRecord {
        let mut pricing = BTreeMap::new();
        pricing.insert(Duration::OneMonth, 3500);
        InternshipRecord {
            id: id.to_string(),
            title: format!("{id} title"),
            category: "Development".to_string(),
            mode: DeliveryMode::Online,
            company: "Edizo".to_string(),
            image: String::new(),
            rating: 4.5,
            description: String::new(),
            why_choose_edizo: Vec::new(),
            benefits: Vec::new(),
            syllabus: BTreeMap::new(),
            pricing,
            discount: BTreeMap::new(),
            available_coupons: Vec::new(),
            coupon_discounts: BTreeMap::new(),
        }
    }

    struct MockSource {
        calls: AtomicUsize,
        team_calls: AtomicUsize,
        delay: Option<StdDuration>,
        record_id: String,
    }

    impl MockSource {
        fn new(record_id: &str, delay: Option<StdDuration>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                team_calls: AtomicUsize::new(0),
                delay,
                record_id: record_id.to_string(),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for MockSource {
        async fn fetch_internships(&self) -> anyhow::Result<ParsedSheet<InternshipRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(ParsedSheet {
                records: vec![mk_record(&self.record_id)],
                skipped: Vec::new(),
            })
        }

        async fn fetch_team(&self) -> anyhow::Result<ParsedSheet<TeamMember>> {
            self.team_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ParsedSheet {
                records: Vec::new(),
                skipped: Vec::new(),
            })
        }
    }

    fn test_config(snapshot_dir: Option<PathBuf>) -> CatalogConfig {
        CatalogConfig {
            ttl: DEFAULT_TTL,
            snapshot_dir,
            scheduler_enabled: false,
            refresh_cron: "0 0/5 * * * *".to_string(),
            user_agent: "edizo-test".to_string(),
            http_timeout: StdDuration::from_secs(5),
        }
    }

    #[test]
    fn entry_is_stale_strictly_after_ttl() {
        let now = Utc::now();
        let fresh = CacheEntry {
            data: 1u32,
            fetched_at: now - TimeDelta::seconds(299),
        };
        let stale = CacheEntry {
            data: 1u32,
            fetched_at: now - TimeDelta::seconds(301),
        };
        assert!(!fresh.is_stale(DEFAULT_TTL, now));
        assert!(stale.is_stale(DEFAULT_TTL, now));
    }

    #[test]
    fn empty_memory_cache_counts_as_stale() {
        let cache: MemoryCache<Vec<u32>> = MemoryCache::new();
        assert!(cache.is_stale(DEFAULT_TTL, Utc::now()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_cold_reads_fetch_once() {
        let source = Arc::new(MockSource::new(
            "web-dev",
            Some(StdDuration::from_millis(50)),
        ));
        let service = Arc::new(CatalogService::new(source.clone(), &test_config(None)));

        let first = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.internships().await }
        });
        let second = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.internships().await }
        });
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(first.data, second.data);
        // The coalesced waiter reports the instant of the one real fetch.
        assert_eq!(first.fetched_at, second.fetched_at);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stale_hit_serves_old_data_and_revalidates() {
        let source = Arc::new(MockSource::new("fresh", None));
        let cache: Arc<MemoryCache<Vec<InternshipRecord>>> = Arc::new(MemoryCache::new());
        let service = Arc::new(CatalogService::with_caches(
            source.clone(),
            &test_config(None),
            cache.clone(),
            Arc::new(MemoryCache::new()),
        ));

        cache.set(CacheEntry {
            data: vec![mk_record("old")],
            fetched_at: Utc::now() - TimeDelta::minutes(10),
        });

        let view = service.internships().await.unwrap();
        assert!(view.stale);
        assert_eq!(view.origin, DataOrigin::Cache);
        assert_eq!(view.data[0].id, "old");

        // Wait for the background refresh to land.
        for _ in 0..50 {
            if !cache.is_stale(service.ttl(), Utc::now()) {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        let refreshed = cache.get().expect("cache repopulated");
        assert_eq!(refreshed.data[0].id, "fresh");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_hit_serves_cache_without_fetching() {
        let source = Arc::new(MockSource::new("web-dev", None));
        let service = Arc::new(CatalogService::new(source.clone(), &test_config(None)));

        let first = service.internships().await.unwrap();
        assert_eq!(first.origin, DataOrigin::Network);
        let second = service.internships().await.unwrap();
        assert_eq!(second.origin, DataOrigin::Cache);
        assert!(!second.stale);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_hydrates_cold_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(Some(dir.path().to_path_buf()));

        let writer_source = Arc::new(MockSource::new("web-dev", None));
        let writer = Arc::new(CatalogService::new(writer_source.clone(), &config));
        let summary = writer.refresh_all().await.unwrap();
        assert_eq!(summary.snapshot_paths.len(), 2);

        // New service, cold cache, same snapshot directory.
        let reader_source = Arc::new(MockSource::new("should-not-fetch", None));
        let reader = Arc::new(CatalogService::new(reader_source.clone(), &config));
        let view = reader.internships().await.unwrap();

        assert_eq!(view.origin, DataOrigin::Snapshot);
        assert_eq!(view.data[0].id, "web-dev");
        assert!(!view.stale);
        assert_eq!(reader_source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_all_reports_counts() {
        let source = Arc::new(MockSource::new("web-dev", None));
        let service = Arc::new(CatalogService::new(source.clone(), &test_config(None)));
        let summary = service.refresh_all().await.unwrap();
        assert_eq!(summary.internships, 1);
        assert_eq!(summary.team_members, 0);
        assert_eq!(summary.skipped_rows, 0);
        assert!(summary.snapshot_paths.is_empty());
        assert!(summary.finished_at >= summary.started_at);
    }
}
