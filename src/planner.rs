//! Planner façade: the public mutation and query surface.
//!
//! One instance exists per process. Every mutating operation runs under a
//! single-writer guard and fails fast with [`PlannerError::AlreadyRunning`]
//! when another mutation is in flight; the guard is held across catalogue
//! lookups, so those serialise too. Queries never take the guard: the
//! reservation list is replaced wholesale under a write lock, so a reader
//! always observes a consistent snapshot.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::RwLock;

use crate::collaborators::{ObserverNotifier, ProgramCatalogue, RuleStore};
use crate::error::{PlannerError, Result};
use crate::resolver;
use crate::rule;
use crate::store::ReservationStore;
use crate::types::{EncodeOption, ProgramId, Reservation, Rule, RuleId, TunerDevice};

/// Reservation planner. Construct one at process start and share it behind
/// an [`Arc`]; the deferred re-plans spawned by [`Planner::cancel`] and
/// [`Planner::unskip`] need the shared handle.
pub struct Planner {
    catalogue: Arc<dyn ProgramCatalogue>,
    rules: Arc<dyn RuleStore>,
    notifier: Arc<dyn ObserverNotifier>,
    store: RwLock<ReservationStore>,
    tuners: RwLock<Vec<TunerDevice>>,
    /// Single-writer flag: set while a mutating operation is in flight.
    running: AtomicBool,
    /// Highest manual id issued so far, seeded from the persisted list.
    last_manual_id: AtomicI64,
}

/// Clears the single-writer flag on every exit path.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Planner {
    /// Construct the planner, loading the persisted reservation document.
    ///
    /// A missing document starts the planner empty; an unparseable one is
    /// fatal and surfaces here.
    pub fn new<P: AsRef<Path>>(
        catalogue: Arc<dyn ProgramCatalogue>,
        rules: Arc<dyn RuleStore>,
        notifier: Arc<dyn ObserverNotifier>,
        reserves_path: P,
    ) -> Result<Self> {
        let store = ReservationStore::load(reserves_path)?;
        let last_manual_id = store.max_manual_id();
        Ok(Self {
            catalogue,
            rules,
            notifier,
            store: RwLock::new(store),
            tuners: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            last_manual_id: AtomicI64::new(last_manual_id),
        })
    }

    /// Take the single-writer guard, failing fast when a mutation is
    /// already in flight. Callers retry on [`PlannerError::AlreadyRunning`].
    fn begin(&self) -> Result<RunGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PlannerError::AlreadyRunning);
        }
        Ok(RunGuard {
            flag: &self.running,
        })
    }

    /// Next manual id: wall-clock millis, strictly increasing even across
    /// calls within the same millisecond. Only called under the guard.
    fn next_manual_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let next = now.max(self.last_manual_id.load(Ordering::SeqCst) + 1);
        self.last_manual_id.store(next, Ordering::SeqCst);
        next
    }

    /// Replace the tuner inventory. Takes effect on the next re-plan; none
    /// is triggered here.
    pub async fn set_tuners(&self, devices: Vec<TunerDevice>) -> Result<()> {
        let _guard = self.begin()?;
        info!("tuner inventory replaced: {} device(s)", devices.len());
        *self.tuners.write().await = devices;
        Ok(())
    }

    /// Reserve one specific program.
    ///
    /// Fails without mutating state when the program is unknown, already
    /// reserved, rejected by the encode validator, or would not fit any
    /// tuner alongside the established reservations.
    pub async fn add_manual(
        &self,
        program_id: ProgramId,
        encode_option: Option<EncodeOption>,
    ) -> Result<()> {
        let _guard = self.begin()?;

        if let Some(option) = &encode_option {
            validate_encode_option(option)?;
        }

        let program = self
            .catalogue
            .find_by_id(program_id, true)
            .await
            .map_err(|e| PlannerError::Catalogue(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(PlannerError::ProgramNotFound(program_id))?;

        let reservation = Reservation::manual(program, self.next_manual_id(), encode_option);

        // Trial allocation against the established neighbours only; their
        // own flags are not rewritten by this call.
        let mut candidates: Vec<Reservation> = {
            let store = self.store.read().await;
            if store.by_program_id(program_id).is_some() {
                return Err(PlannerError::AlreadyReserved(program_id));
            }
            store
                .reserves()
                .iter()
                .filter(|r| {
                    !r.is_skip && !r.is_conflict && r.program.overlaps(&reservation.program)
                })
                .cloned()
                .collect()
        };
        candidates.push(reservation.clone());

        let tuners = self.tuners.read().await.clone();
        let resolved = resolver::resolve(candidates, &tuners);
        let lost = resolved
            .iter()
            .find(|r| r.program.id == program_id)
            .map_or(true, |r| r.is_conflict);
        if lost {
            return Err(PlannerError::Conflict(program_id));
        }

        let mut store = self.store.write().await;
        store.insert(reservation);
        store.save()?;
        drop(store);

        info!("manual reservation added for program {}", program_id);
        self.notifier.notify_observers().await;
        Ok(())
    }

    /// Withdraw the intent to record a program.
    ///
    /// A manual reservation is removed outright; a rule match becomes a
    /// skip so the withdrawal survives future re-plans of the same rule.
    /// The full re-plan then runs on a background task; the caller is not
    /// held up by it.
    pub async fn cancel(self: Arc<Self>, program_id: ProgramId) -> Result<()> {
        {
            let _guard = self.begin()?;
            let mut store = self.store.write().await;

            let is_manual = match store.by_program_id(program_id) {
                Some(r) => r.is_manual(),
                None => {
                    warn!("cancel requested for unknown program {}", program_id);
                    return Ok(());
                }
            };
            if is_manual {
                store.remove(program_id);
                info!("manual reservation for program {} removed", program_id);
            } else if let Some(r) = store.by_program_id_mut(program_id) {
                r.is_skip = true;
                r.is_conflict = false;
                info!("rule reservation for program {} marked as skip", program_id);
            }
            store.save()?;
            drop(store);
            self.notifier.notify_observers().await;
        }
        self.spawn_update_all();
        Ok(())
    }

    /// Clear a skip so the program becomes eligible for recording again.
    /// For a rule match, the rule's re-plan runs on a background task.
    pub async fn unskip(self: Arc<Self>, program_id: ProgramId) -> Result<()> {
        let rule_id = {
            let _guard = self.begin()?;
            let mut store = self.store.write().await;

            let rule_id = match store.by_program_id_mut(program_id) {
                Some(r) => {
                    r.is_skip = false;
                    r.rule_id
                }
                None => {
                    warn!("unskip requested for unknown program {}", program_id);
                    return Ok(());
                }
            };
            store.save()?;
            drop(store);
            info!("skip cleared for program {}", program_id);
            self.notifier.notify_observers().await;
            rule_id
        };
        if let Some(rule_id) = rule_id {
            self.spawn_update_rule(rule_id);
        }
        Ok(())
    }

    /// Re-derive the whole schedule from the catalogue, the rules and the
    /// retained manual reservations.
    pub async fn update_all(&self) -> Result<()> {
        let _guard = self.begin()?;

        let old: Vec<Reservation> = self.store.read().await.reserves().to_vec();
        let mut candidates: Vec<Reservation> = Vec::new();

        // Manual reservations survive with a refreshed program snapshot;
        // ones whose program left the catalogue drop out.
        for reservation in old.iter().filter(|r| r.is_manual()) {
            let id = reservation.program.id;
            match self.catalogue.find_by_id(id, true).await {
                Ok(programs) => match programs.into_iter().next() {
                    Some(program) => {
                        let mut refreshed = reservation.clone();
                        refreshed.program = program;
                        refreshed.is_conflict = false;
                        candidates.push(refreshed);
                    }
                    None => warn!(
                        "manual reservation dropped: program {} left the catalogue",
                        id
                    ),
                },
                Err(e) => error!("manual reservation {} not refreshed: {}", id, e),
            }
        }

        let rules = self
            .rules
            .find_all()
            .await
            .map_err(|e| PlannerError::Rules(e.to_string()))?;
        for rule_record in rules.iter().filter(|r| r.enable) {
            self.collect_rule_matches(rule_record, &mut candidates).await;
        }

        apply_skips(&old, &mut candidates);

        let tuners = self.tuners.read().await.clone();
        let resolved = resolver::resolve(candidates, &tuners);
        self.commit(resolved).await
    }

    /// Re-plan the matches of a single rule. Reservations belonging to
    /// other rules and manual entries are preserved as they are, with only
    /// their conflict flags re-derived.
    pub async fn update_rule(&self, rule_id: RuleId) -> Result<()> {
        let _guard = self.begin()?;

        let old: Vec<Reservation> = self.store.read().await.reserves().to_vec();

        let mut candidates: Vec<Reservation> = old
            .iter()
            .filter(|r| r.rule_id != Some(rule_id))
            .cloned()
            .map(|mut r| {
                r.is_conflict = false;
                r
            })
            .collect();

        let rule_record = self
            .rules
            .find_by_id(rule_id)
            .await
            .map_err(|e| PlannerError::Rules(e.to_string()))?
            .into_iter()
            .next();
        match rule_record {
            Some(ref rule_record) if rule_record.enable => {
                self.collect_rule_matches(rule_record, &mut candidates).await;
            }
            _ => info!("rule {} is gone or disabled, dropping its matches", rule_id),
        }

        apply_skips(&old, &mut candidates);

        let tuners = self.tuners.read().await.clone();
        let resolved = resolver::resolve(candidates, &tuners);
        self.commit(resolved).await
    }

    /// Evict reservations whose broadcast already ended and persist the
    /// shrunken document.
    pub async fn clean(&self) -> Result<()> {
        let _guard = self.begin()?;
        let now = Utc::now().timestamp_millis();

        let mut store = self.store.write().await;
        let evicted = store.evict_finished(now);
        if evicted > 0 {
            store.save()?;
            info!("cleaned {} finished reservation(s)", evicted);
        }
        Ok(())
    }

    /// Every reservation in `startAt` order, optionally sliced.
    pub async fn reserves(&self, limit: Option<usize>, offset: usize) -> Vec<Reservation> {
        self.store.read().await.all(limit, offset)
    }

    /// Reservations that will actually be recorded, plus the pre-slice total.
    pub async fn plain(&self, limit: Option<usize>, offset: usize) -> (Vec<Reservation>, usize) {
        self.store.read().await.plain(limit, offset)
    }

    /// Reservations no tuner could host, plus the pre-slice total.
    pub async fn conflicts(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> (Vec<Reservation>, usize) {
        self.store.read().await.conflicts(limit, offset)
    }

    /// Reservations the user asked to omit, plus the pre-slice total.
    pub async fn skips(&self, limit: Option<usize>, offset: usize) -> (Vec<Reservation>, usize) {
        self.store.read().await.skips(limit, offset)
    }

    pub async fn by_program_id(&self, id: ProgramId) -> Option<Reservation> {
        self.store.read().await.by_program_id(id).cloned()
    }

    /// Fetch one rule's matches and push them as candidates. A failed query
    /// is logged and the rule contributes nothing this round.
    async fn collect_rule_matches(&self, rule_record: &Rule, candidates: &mut Vec<Reservation>) {
        let search = rule::search_option(rule_record);
        match self.catalogue.find_by_rule(&search).await {
            Ok(programs) => {
                for program in programs {
                    candidates.push(Reservation::from_rule(
                        program,
                        rule_record.id,
                        rule::rule_option(rule_record),
                        rule::encode_option(rule_record),
                    ));
                }
            }
            Err(e) => error!("rule {} match query failed: {}", rule_record.id, e),
        }
    }

    /// Install a resolver's output: replace the list, persist, report
    /// conflicts, signal observers.
    async fn commit(&self, resolved: Vec<Reservation>) -> Result<()> {
        for r in resolved.iter().filter(|r| r.is_conflict) {
            warn!(
                "conflict: no tuner for \"{}\" (program {}) [{} - {}]",
                r.program.name, r.program.id, r.program.start_at, r.program.end_at
            );
        }
        let total = resolved.len();
        let conflicts = resolved.iter().filter(|r| r.is_conflict).count();
        let skips = resolved.iter().filter(|r| r.is_skip).count();

        let mut store = self.store.write().await;
        store.replace(resolved);
        store.save()?;
        drop(store);

        info!(
            "schedule committed: {} reservation(s), {} conflict(s), {} skip(s)",
            total, conflicts, skips
        );
        self.notifier.notify_observers().await;
        Ok(())
    }

    /// Run the full re-plan on a background task. The caller already got
    /// its acknowledgement; losing the guard race here only means another
    /// mutation got in first, so the deferred run logs and gives up.
    fn spawn_update_all(self: Arc<Self>) {
        tokio::spawn(async move {
            if let Err(e) = self.update_all().await {
                warn!("deferred full re-plan failed: {}", e);
            }
        });
    }

    fn spawn_update_rule(self: Arc<Self>, rule_id: RuleId) {
        tokio::spawn(async move {
            if let Err(e) = self.update_rule(rule_id).await {
                warn!("deferred re-plan of rule {} failed: {}", rule_id, e);
            }
        });
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner").finish_non_exhaustive()
    }
}

/// Re-apply persisted skip flags by program id so a user's skip survives a
/// re-plan for as long as the program keeps matching.
fn apply_skips(old: &[Reservation], candidates: &mut [Reservation]) {
    let skipped: HashSet<ProgramId> = old
        .iter()
        .filter(|r| r.is_skip)
        .map(|r| r.program.id)
        .collect();
    if skipped.is_empty() {
        return;
    }
    for candidate in candidates {
        if skipped.contains(&candidate.program.id) {
            candidate.is_skip = true;
            candidate.is_conflict = false;
        }
    }
}

/// Reject a transcode directive whose `directoryN` has no matching `modeN`.
fn validate_encode_option(option: &EncodeOption) -> Result<()> {
    for (mode, directory, field) in [
        (option.mode1, &option.directory1, "directory1"),
        (option.mode2, &option.directory2, "directory2"),
        (option.mode3, &option.directory3, "directory3"),
    ] {
        if mode.is_none() && directory.is_some() {
            return Err(PlannerError::InvalidEncodeOption(format!(
                "{} is set but its mode is missing",
                field
            )));
        }
    }
    Ok(())
}
