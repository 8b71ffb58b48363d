use crate::error::{LifecycleError, Result};
use crate::ids::UrlIdAllocator;
use crate::retention::{purge_deadline, stale_cutoff};
use crate::sweep::{SweepGate, SweepKind, SweepReport};
use futures::{StreamExt, TryStreamExt};
use littleurl_core::{
    Clock, CollisionPolicy, InsertOutcome, LifecycleSettings, MoveOutcome, RecordFilter,
    RecordState, RecordStore, RecordStoreExt, ShortKey, SweepDispatch, SystemClock, UrlRecord,
};
use littleurl_generator::Generator;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// The record state machine.
///
/// Records live in one of two partitions of a [`RecordStore`]: active or
/// deleted. The engine creates records (deduplicating by long URL), moves
/// them between partitions, and runs the retention and purge sweeps.
///
/// Sweeps have no scheduler. [`lookup`](Self::lookup) checks two gates and
/// starts a sweep when its last run is more than the configured interval
/// ago, so sweeps only happen while there is read traffic.
///
/// Moves go through [`RecordStore::move_record`]. With the default
/// delete-then-insert implementation a failure between the two steps loses
/// the record from both partitions; later lookups then report it as missing.
pub struct LifecycleEngine<S, G, C = SystemClock> {
    store: Arc<S>,
    generator: Arc<G>,
    clock: Arc<C>,
    settings: LifecycleSettings,
    ids: Arc<UrlIdAllocator>,
    purge_gate: Arc<SweepGate>,
    retention_gate: Arc<SweepGate>,
}

impl<S, G, C> Clone for LifecycleEngine<S, G, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
            ids: Arc::clone(&self.ids),
            purge_gate: Arc::clone(&self.purge_gate),
            retention_gate: Arc::clone(&self.retention_gate),
        }
    }
}

impl<S: RecordStore, G: Generator> LifecycleEngine<S, G, SystemClock> {
    /// Creates an engine driven by the system clock.
    pub fn new(store: S, generator: G, settings: LifecycleSettings) -> Result<Self> {
        Self::with_clock(store, generator, SystemClock, settings)
    }
}

impl<S: RecordStore, G: Generator, C: Clock> LifecycleEngine<S, G, C> {
    /// Creates an engine with an explicit clock.
    pub fn with_clock(store: S, generator: G, clock: C, settings: LifecycleSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
            clock: Arc::new(clock),
            purge_gate: Arc::new(SweepGate::new(settings.sweep_interval)),
            retention_gate: Arc::new(SweepGate::new(settings.sweep_interval)),
            ids: Arc::new(UrlIdAllocator::new()),
            settings,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Returns the record for `long_url`.
    ///
    /// An active record with the same URL is returned unchanged. A deleted
    /// one is restored and returned. Otherwise a new record is written under
    /// a freshly generated key.
    pub async fn create(&self, long_url: &str) -> Result<UrlRecord> {
        let filter = RecordFilter::LongUrl(long_url.to_string());

        if let Some(existing) = self
            .store
            .scan(RecordState::Active, filter.clone())
            .try_next()
            .await?
        {
            debug!(key = %existing.short_key, "long url already shortened");
            return Ok(existing);
        }

        if let Some(deleted) = self
            .store
            .scan(RecordState::Deleted, filter)
            .try_next()
            .await?
        {
            if let Some(revived) = self.undelete(&deleted.short_key).await? {
                info!(key = %revived.short_key, "revived deleted record for duplicate long url");
                return Ok(revived);
            }
            // Purged or restored by someone else in the meantime.
            debug!(key = %deleted.short_key, "deleted duplicate vanished before revival");
        }

        let url_id = self.ids.next_id(self.store.as_ref()).await?;
        let record = self.insert_new(long_url, url_id).await?;
        info!(key = %record.short_key, url_id, "created record");
        Ok(record)
    }

    async fn insert_new(&self, long_url: &str, url_id: u64) -> Result<UrlRecord> {
        let now = self.clock.now();

        match self.settings.collision_policy {
            CollisionPolicy::Overwrite => {
                let key: ShortKey = self.generator.generate().into();
                let record = UrlRecord::new_active(key, long_url, url_id, now);
                self.store.put(RecordState::Active, &record).await?;
                Ok(record)
            }
            CollisionPolicy::Retry { max_attempts } => {
                for attempt in 1..=max_attempts {
                    let key: ShortKey = self.generator.generate().into();
                    // A key parked in the deleted partition is still taken.
                    if self.store.get(RecordState::Deleted, &key).await?.is_some() {
                        debug!(key = %key, attempt, "generated key held by a deleted record");
                        continue;
                    }
                    let record = UrlRecord::new_active(key, long_url, url_id, now);
                    match self
                        .store
                        .insert_exclusive(RecordState::Active, &record)
                        .await?
                    {
                        InsertOutcome::Inserted => return Ok(record),
                        InsertOutcome::AlreadyExists => {
                            debug!(key = %record.short_key, attempt, "generated key collided");
                        }
                    }
                }
                warn!(max_attempts, "gave up generating an unused key");
                Err(LifecycleError::KeysExhausted(max_attempts))
            }
        }
    }

    /// Looks up `key` in the partition selected by `want_deleted`.
    ///
    /// A hit in the active partition refreshes `last_accessed_at`. The purge
    /// sweep may start before the read and the retention sweep after an
    /// active hit, each at most once per sweep interval.
    pub async fn lookup(&self, key: &ShortKey, want_deleted: bool) -> Result<Option<UrlRecord>> {
        let now = self.clock.now();
        if self.purge_gate.try_begin(now) {
            self.dispatch(SweepKind::Purge).await;
        }

        let state = RecordState::from_deleted_flag(want_deleted);
        let Some(mut record) = self.store.get(state, key).await? else {
            trace!(key = %key, state = %state, "lookup miss");
            return Ok(None);
        };

        if state == RecordState::Active {
            // Best effort: a failed touch must not fail the read.
            match self.store.touch(RecordState::Active, key, now).await {
                Ok(true) => record.last_accessed_at = now,
                Ok(false) => debug!(key = %key, "record left the partition before the touch"),
                Err(e) => warn!(key = %key, error = %e, "failed to refresh last access time"),
            }

            if self.retention_gate.try_begin(now) {
                self.dispatch(SweepKind::Retention).await;
            }
        }

        Ok(Some(record))
    }

    /// Soft-deletes an active record. Returns `None` if no active record
    /// has this key.
    pub async fn delete(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        self.transition(key, RecordState::Deleted).await
    }

    /// Restores a deleted record. Returns `None` if no deleted record has
    /// this key.
    pub async fn undelete(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        self.transition(key, RecordState::Active).await
    }

    async fn transition(&self, key: &ShortKey, to: RecordState) -> Result<Option<UrlRecord>> {
        let from = to.opposite();
        let Some(mut record) = self.store.get(from, key).await? else {
            debug!(key = %key, from = %from, "nothing to move");
            return Ok(None);
        };

        match to {
            RecordState::Deleted => {
                let now = self.clock.now();
                record.mark_deleted(now, purge_deadline(now, self.settings.retention_days)?);
            }
            RecordState::Active => record.mark_restored(),
        }

        match self.store.move_record(&record).await? {
            MoveOutcome::Moved => {
                info!(key = %key, to = %to, "moved record");
                Ok(Some(record))
            }
            MoveOutcome::SourceMissing => {
                debug!(key = %key, from = %from, "record left the partition before the move");
                Ok(None)
            }
            MoveOutcome::TargetOccupied => {
                warn!(key = %key, to = %to, "target partition already held the key");
                Ok(self.store.get(to, key).await?)
            }
        }
    }

    async fn dispatch(&self, kind: SweepKind) {
        match self.settings.sweep_dispatch {
            SweepDispatch::Inline => {
                self.run_sweep(kind).await;
            }
            SweepDispatch::Background => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let engine = self.clone();
                    handle.spawn(async move {
                        engine.run_sweep(kind).await;
                    });
                }
                Err(_) => {
                    warn!(sweep = %kind, "no async runtime to spawn on, sweeping inline");
                    self.run_sweep(kind).await;
                }
            },
        }
    }

    async fn run_sweep(&self, kind: SweepKind) {
        match kind {
            SweepKind::Purge => {
                log_report(kind, "sweep finished", &self.purge_sweep().await);
                log_report(kind, "reconcile finished", &self.reconcile().await);
            }
            SweepKind::Retention => {
                log_report(kind, "sweep finished", &self.retention_sweep().await);
            }
        }
    }

    /// Moves every active record not read within the retention window to the
    /// deleted partition. Failures are logged and skipped.
    pub async fn retention_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let cutoff = stale_cutoff(now, self.settings.retention());
        let mut report = SweepReport::default();

        // Scans page by key, so moving records out of the partition mid-scan
        // does not skip any.
        let mut stale = self
            .store
            .scan(RecordState::Active, RecordFilter::LastAccessedBefore(cutoff));

        while let Some(next) = stale.next().await {
            let mut record = match next {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, "retention scan failed");
                    report.failed += 1;
                    break;
                }
            };
            report.examined += 1;

            let purge_at = match purge_deadline(now, self.settings.retention_days) {
                Ok(purge_at) => purge_at,
                Err(e) => {
                    warn!(key = %record.short_key, error = %e, "cannot schedule purge");
                    report.failed += 1;
                    continue;
                }
            };
            record.mark_deleted(now, purge_at);

            match self.store.move_record(&record).await {
                Ok(MoveOutcome::Moved) => {
                    debug!(key = %record.short_key, "retired stale record");
                    report.affected += 1;
                }
                Ok(outcome) => {
                    debug!(key = %record.short_key, ?outcome, "stale record already moved");
                }
                Err(e) => {
                    warn!(key = %record.short_key, error = %e, "failed to retire stale record");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Permanently removes every deleted record whose purge deadline has
    /// passed. Failures are logged and skipped.
    pub async fn purge_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let mut due = self
            .store
            .scan(RecordState::Deleted, RecordFilter::PurgeDue(now));

        while let Some(next) = due.next().await {
            let record = match next {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, "purge scan failed");
                    report.failed += 1;
                    break;
                }
            };
            report.examined += 1;

            match self
                .store
                .delete(RecordState::Deleted, &record.short_key)
                .await
            {
                Ok(true) => {
                    debug!(key = %record.short_key, "purged record");
                    report.affected += 1;
                }
                Ok(false) => {
                    debug!(key = %record.short_key, "record already purged");
                }
                Err(e) => {
                    warn!(key = %record.short_key, error = %e, "failed to purge record");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Repairs keys present in both partitions.
    ///
    /// Such duplicates come from interrupted moves or from writers that
    /// bypass the engine. Runs after every purge sweep. The copy with the later
    /// transition wins: if the deletion happened after the last access the
    /// active copy is dropped, otherwise the deleted copy is.
    pub async fn reconcile(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut deleted = self.store.scan(RecordState::Deleted, RecordFilter::All);

        while let Some(next) = deleted.next().await {
            let record = match next {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, "reconcile scan failed");
                    report.failed += 1;
                    break;
                }
            };
            report.examined += 1;

            let active = match self.store.get(RecordState::Active, &record.short_key).await {
                Ok(Some(active)) => active,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %record.short_key, error = %e, "reconcile lookup failed");
                    report.failed += 1;
                    continue;
                }
            };

            let deleted_last = record
                .deleted_at
                .is_some_and(|deleted_at| deleted_at > active.last_accessed_at);
            let loser = if deleted_last {
                RecordState::Active
            } else {
                RecordState::Deleted
            };

            match self.store.delete(loser, &record.short_key).await {
                Ok(_) => {
                    info!(key = %record.short_key, dropped = %loser, "repaired duplicated key");
                    report.affected += 1;
                }
                Err(e) => {
                    warn!(key = %record.short_key, error = %e, "failed to repair duplicated key");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Lists every record in both partitions.
    pub async fn list(&self) -> Result<Vec<UrlRecord>> {
        let mut records = self
            .store
            .scan_all(RecordState::Active, RecordFilter::All)
            .await?;
        records.extend(
            self.store
                .scan_all(RecordState::Deleted, RecordFilter::All)
                .await?,
        );
        Ok(records)
    }
}

fn log_report(kind: SweepKind, message: &'static str, report: &SweepReport) {
    info!(
        sweep = %kind,
        examined = report.examined,
        affected = report.affected,
        failed = report.failed,
        "{message}"
    );
}
