//! Sweep-line conflict resolver.
//!
//! Takes the full candidate set for a re-plan (manual reservations plus
//! rule matches, duplicate program ids included) and the tuner inventory,
//! and decides which candidates get a tuner and which are conflicts.
//!
//! # How It Works
//!
//! 1. Candidates are sorted into authority order (manual before rule,
//!    smaller id first) and deduplicated by program id; the first claim
//!    on a program wins.
//! 2. Every surviving non-skip candidate contributes a start and an end
//!    event, and the events are swept in time order. At equal timestamps
//!    ends sort before starts, so back-to-back programs hand the tuner
//!    over cleanly.
//! 3. After every event the active candidates are reassigned to tuners
//!    from scratch, in authority order, first-fit over the tuner array.
//!    A candidate no tuner accepts is marked as a conflict and leaves the
//!    sweep for good; a tuner freed later does not resurrect it.
//!
//! Reassigning the whole active set on every event keeps the allocation
//! stable under priority: a higher-authority candidate is always re-placed
//! before a lower one, so a late arrival can never steal its tuner.

use std::collections::HashSet;

use log::debug;

use crate::tuner::TunerSlot;
use crate::types::{Reservation, TunerDevice, UnixMillis};

/// Authority order: manual before rule, smaller id first. The program id
/// breaks the remaining ties so the order is total and the partition is
/// reproducible.
fn authority_key(reservation: &Reservation) -> (u8, i64, i64) {
    match (reservation.manual_id, reservation.rule_id) {
        (Some(manual_id), _) => (0, manual_id, reservation.program.id),
        (None, Some(rule_id)) => (1, rule_id, reservation.program.id),
        // Constructors guarantee one of the ids is set.
        (None, None) => (2, 0, reservation.program.id),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    // Declared in sort order: at equal timestamps the end comes first.
    End = 0,
    Start = 1,
}

#[derive(Debug)]
struct SweepEvent {
    at: UnixMillis,
    kind: EventKind,
    /// Position in the deduplicated candidate array, which is also the
    /// candidate's authority rank.
    idx: usize,
}

/// Resolve tuner contention for one re-plan.
///
/// Returns the deduplicated candidates in `(startAt, programId)` order with
/// their final `is_conflict` flags. Skipped candidates occupy no tuner and
/// can never conflict.
pub fn resolve(mut candidates: Vec<Reservation>, tuners: &[TunerDevice]) -> Vec<Reservation> {
    // Stage 1: dedup, keeping the highest-authority claim per program.
    candidates.sort_by_key(authority_key);
    let mut seen = HashSet::new();
    let mut deduped: Vec<Reservation> = Vec::new();
    for candidate in candidates {
        if seen.insert(candidate.program.id) {
            deduped.push(candidate);
        }
    }

    // Stage 2: sweep events. Skipped candidates emit none, so they occupy
    // no tuner and cannot be marked as conflicts.
    let mut events = Vec::with_capacity(deduped.len() * 2);
    for (idx, reservation) in deduped.iter_mut().enumerate() {
        if reservation.is_skip {
            reservation.is_conflict = false;
            continue;
        }
        events.push(SweepEvent {
            at: reservation.program.start_at,
            kind: EventKind::Start,
            idx,
        });
        events.push(SweepEvent {
            at: reservation.program.end_at,
            kind: EventKind::End,
            idx,
        });
    }
    events.sort_by_key(|e| (e.at, e.kind as u8, e.idx));

    // Stage 3: sweep, reassigning the active set after every event.
    let mut slots: Vec<TunerSlot> = tuners.iter().map(TunerSlot::new).collect();
    let mut active: Vec<usize> = Vec::new();
    for event in events {
        match event.kind {
            EventKind::Start => active.push(event.idx),
            // A conflicted candidate was evicted already; this is a no-op then.
            EventKind::End => active.retain(|&idx| idx != event.idx),
        }
        active.sort_unstable();

        for slot in &mut slots {
            slot.clear();
        }
        let mut evicted: Vec<usize> = Vec::new();
        for &idx in &active {
            let program = &deduped[idx].program;
            match slots.iter_mut().position(|slot| slot.try_add(program)) {
                Some(pos) => {
                    debug!("program {} held by tuner {}", program.id, slots[pos].index());
                    deduped[idx].is_conflict = false;
                }
                None => {
                    debug!("program {} fits no tuner, conflict", program.id);
                    deduped[idx].is_conflict = true;
                    evicted.push(idx);
                }
            }
        }
        active.retain(|idx| !evicted.contains(idx));
    }

    // Stage 4: emit in broadcast order.
    deduped.sort_by_key(|r| (r.program.start_at, r.program.id));
    deduped
}
