//! Room-presence tracking
//!
//! Collapses per-room debounced presence flags into a single current-room
//! trace. The trace is sticky: while the previously inferred room stays
//! active it is kept, even if other rooms are active at the same time, which
//! keeps simultaneous activations from inflating the transition count.

use crate::types::Room;

/// Infer the currently occupied room from per-room presence flags.
///
/// `active` is aligned with [`Room::ALL`]. No active room yields `None`; the
/// previous room wins while it remains active; otherwise the first active
/// room in canonical order is chosen as the deterministic tie-break.
pub fn infer_current_room(active: &[bool; Room::ALL.len()], prev: Option<Room>) -> Option<Room> {
    if let Some(p) = prev {
        let idx = Room::ALL.iter().position(|&r| r == p);
        if let Some(i) = idx {
            if active[i] {
                return Some(p);
            }
        }
    }
    Room::ALL
        .iter()
        .enumerate()
        .find(|(i, _)| active[*i])
        .map(|(_, &r)| r)
}

/// Build the current-room trace for a whole series.
///
/// `presence` holds one debounced flag slice per room, aligned with
/// [`Room::ALL`]; all slices must share the series length.
pub fn room_trace(presence: [&[bool]; Room::ALL.len()]) -> Vec<Option<Room>> {
    let len = presence[0].len();
    debug_assert!(presence.iter().all(|p| p.len() == len));

    let mut trace = Vec::with_capacity(len);
    let mut prev: Option<Room> = None;
    for t in 0..len {
        let active = [presence[0][t], presence[1][t], presence[2][t]];
        let current = infer_current_room(&active, prev);
        trace.push(current);
        prev = current;
    }
    trace
}

/// Count room transitions in a trace slice.
///
/// Only consecutive non-`None` values that differ count; the comparison room
/// carried across `None` gaps is the last known non-`None` room, so a gap
/// itself never counts as a transition.
pub fn count_transitions(trace: &[Option<Room>]) -> u32 {
    let mut transitions = 0;
    let mut prev: Option<Room> = None;

    for room in trace.iter().flatten() {
        if let Some(p) = prev {
            if *room != p {
                transitions += 1;
            }
        }
        prev = Some(*room);
    }

    transitions
}
