//! In-memory authoritative reservation list with atomic JSON persistence.
//!
//! The whole list is serialized as a single JSON array and rewritten on
//! every mutation. Writes go to a temporary sibling file which is renamed
//! over the target, so a crash mid-save never leaves a torn document.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{PlannerError, Result};
use crate::types::{ProgramId, Reservation, UnixMillis};

/// Default location of the reservation document, relative to the install
/// root. The embedding process may point the planner elsewhere.
pub const DEFAULT_RESERVES_PATH: &str = "data/reserves.json";

pub struct ReservationStore {
    path: PathBuf,
    reserves: Vec<Reservation>,
}

impl ReservationStore {
    /// Load the reservation document, starting empty when the file does not
    /// exist yet. An unreadable or unparseable document is an error: the
    /// caller must not continue and silently discard user data.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reserves = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Vec<Reservation>>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("reservation file {:?} not found, starting empty", path);
                Vec::new()
            }
            Err(e) => return Err(PlannerError::Io(e)),
        };
        info!("loaded {} reservation(s) from {:?}", reserves.len(), path);
        let mut store = Self { path, reserves };
        store.sort();
        Ok(store)
    }

    /// Atomically rewrite the document with the current list.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.reserves)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn sort(&mut self) {
        self.reserves
            .sort_by_key(|r| (r.program.start_at, r.program.id));
    }

    /// Replace the whole list with a resolver's output and restore order.
    pub fn replace(&mut self, reserves: Vec<Reservation>) {
        self.reserves = reserves;
        self.sort();
    }

    /// Insert one reservation, keeping the list ordered.
    pub fn insert(&mut self, reservation: Reservation) {
        self.reserves.push(reservation);
        self.sort();
    }

    /// Remove the reservation for a program, returning it if present.
    pub fn remove(&mut self, id: ProgramId) -> Option<Reservation> {
        let pos = self.reserves.iter().position(|r| r.program.id == id)?;
        Some(self.reserves.remove(pos))
    }

    /// Drop reservations whose broadcast ended before `now`. Returns how
    /// many were evicted.
    pub fn evict_finished(&mut self, now: UnixMillis) -> usize {
        let before = self.reserves.len();
        self.reserves.retain(|r| r.program.end_at >= now);
        before - self.reserves.len()
    }

    pub fn by_program_id(&self, id: ProgramId) -> Option<&Reservation> {
        self.reserves.iter().find(|r| r.program.id == id)
    }

    pub fn by_program_id_mut(&mut self, id: ProgramId) -> Option<&mut Reservation> {
        self.reserves.iter_mut().find(|r| r.program.id == id)
    }

    /// Every reservation in `startAt` order.
    pub fn reserves(&self) -> &[Reservation] {
        &self.reserves
    }

    /// The full list, sliced per [`slice`] semantics.
    pub fn all(&self, limit: Option<usize>, offset: usize) -> Vec<Reservation> {
        slice(self.reserves.iter(), limit, offset)
    }

    /// Reservations that will actually be recorded, plus the pre-slice total.
    pub fn plain(&self, limit: Option<usize>, offset: usize) -> (Vec<Reservation>, usize) {
        self.filtered(|r| !r.is_skip && !r.is_conflict, limit, offset)
    }

    /// Reservations no tuner could host, plus the pre-slice total.
    pub fn conflicts(&self, limit: Option<usize>, offset: usize) -> (Vec<Reservation>, usize) {
        self.filtered(|r| r.is_conflict, limit, offset)
    }

    /// Reservations the user asked to omit, plus the pre-slice total.
    pub fn skips(&self, limit: Option<usize>, offset: usize) -> (Vec<Reservation>, usize) {
        self.filtered(|r| r.is_skip, limit, offset)
    }

    /// Highest manual id on record; 0 when there are none.
    pub fn max_manual_id(&self) -> i64 {
        self.reserves
            .iter()
            .filter_map(|r| r.manual_id)
            .max()
            .unwrap_or(0)
    }

    fn filtered(
        &self,
        pred: impl Fn(&Reservation) -> bool,
        limit: Option<usize>,
        offset: usize,
    ) -> (Vec<Reservation>, usize) {
        let matched: Vec<&Reservation> = self.reserves.iter().filter(|r| pred(r)).collect();
        let total = matched.len();
        (slice(matched.into_iter(), limit, offset), total)
    }
}

impl std::fmt::Debug for ReservationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationStore")
            .field("path", &self.path)
            .field("reserves", &self.reserves.len())
            .finish()
    }
}

/// Slicing semantics shared by the readers: with a limit, return
/// `sequence[offset .. offset + limit]` clamped to the sequence; without
/// one, return the whole sequence and ignore the offset.
fn slice<'a>(
    iter: impl Iterator<Item = &'a Reservation>,
    limit: Option<usize>,
    offset: usize,
) -> Vec<Reservation> {
    match limit {
        Some(limit) => iter.skip(offset).take(limit).cloned().collect(),
        None => iter.cloned().collect(),
    }
}
