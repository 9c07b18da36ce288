//! Per-snapshot register storage oracle and the base-register combiner.
//!
//! The codec never persists anything itself: callers hand it a read-only
//! view of the trace's register storage, and a partial register write is
//! widened into a coherent full-base-register value before anything is
//! persisted.

use ahash::AHashMap;

use super::error::{RegisterError, RegisterResult};
use super::register::{RegisterCatalog, RegisterId, RegisterValue};

/// A discrete point in the trace's timeline.
pub type Snap = i64;

/// Whether a register's value at a snapshot has been observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryState {
    Unknown,
    Known,
    /// The recording attempt at this snapshot faulted.
    Error,
}

/// Read-only oracle over the trace's per-snapshot register storage. The
/// implementation owns its own persistence and concurrency control.
pub trait RegisterStore {
    fn state(&self, snap: Snap, register: RegisterId) -> MemoryState;

    /// The recorded value, if any entry exists at this snapshot.
    fn value(&self, snap: Snap, register: RegisterId) -> Option<RegisterValue>;
}

/// Plain in-memory store for callers and tests that do not sit on top of a
/// real trace database.
#[derive(Debug, Default)]
pub struct TraceRegisterBank {
    entries: AHashMap<(Snap, RegisterId), (MemoryState, RegisterValue)>,
}

impl TraceRegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, snap: Snap, state: MemoryState, value: RegisterValue) {
        self.entries.insert((snap, value.register()), (state, value));
    }
}

impl RegisterStore for TraceRegisterBank {
    fn state(&self, snap: Snap, register: RegisterId) -> MemoryState {
        self.entries
            .get(&(snap, register))
            .map(|(state, _)| *state)
            .unwrap_or(MemoryState::Unknown)
    }

    fn value(&self, snap: Snap, register: RegisterId) -> Option<RegisterValue> {
        self.entries
            .get(&(snap, register))
            .map(|(_, value)| value.clone())
    }
}

/// Widens `value` to a coherent full-base-register value by overlaying its
/// masked bits onto the base register's state at `snap`.
///
/// Base-register values pass through unchanged. With no store at hand, or no
/// recorded base value, the result keeps only the child's bits defined. With
/// `require_known`, the base register's state must already be
/// [`MemoryState::Known`]; otherwise the call fails so the caller can fetch
/// the base and retry. This is the only path by which a partial register
/// write becomes a full-register value.
pub fn combine_with_base(
    catalog: &RegisterCatalog,
    value: &RegisterValue,
    snap: Snap,
    store: Option<&dyn RegisterStore>,
    require_known: bool,
) -> RegisterResult<RegisterValue> {
    let reg = catalog.register(value.register());
    if reg.is_base() {
        return Ok(value.clone());
    }
    let base_not_known = || RegisterError::BaseNotKnown {
        register: reg.name().to_string(),
    };
    let Some(store) = store else {
        if require_known {
            return Err(base_not_known());
        }
        return Ok(value.base_register_value(catalog));
    };
    let base = catalog.base(reg);
    if require_known && store.state(snap, base.id()) != MemoryState::Known {
        return Err(base_not_known());
    }
    match store.value(snap, base.id()) {
        Some(base_value) => Ok(base_value.combine(&value.base_register_value(catalog))),
        None => Ok(value.base_register_value(catalog)),
    }
}
