use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Name formerly used as a tombstone sentinel; still rejected on creation so
/// stored names never collide with legacy data.
pub const RESERVED_DELETED: &str = "DELETED";

/// Reserved name of the time variable, tracked by the store for O(1) lookup.
pub const TIME_NAME: &str = "TIME";

/// One named scalar state variable.
///
/// `rate` is the most recent time-derivative and is transient: it is refreshed
/// after each committed integration step and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    value: f64,
    #[serde(skip)]
    rate: f64,
    is_computed: bool,
    sequence: u32,
}

impl Variable {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            value: 0.0,
            rate: 0.0,
            is_computed: false,
            sequence: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Whether this variable is derived from other variables after a step
    /// (e.g. energy) rather than integrated itself.
    pub fn is_computed(&self) -> bool {
        self.is_computed
    }

    /// Monotonic counter incremented on every discontinuous value change.
    /// Consumers compare snapshots of this to avoid drawing across jumps.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub(crate) fn set_computed(&mut self, computed: bool) {
        self.is_computed = computed;
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub(crate) fn bump_sequence(&mut self) {
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Writes a new value. A discontinuous write that actually changes the
    /// value bumps the sequence number; smooth writes never do.
    pub(crate) fn write(&mut self, value: f64, continuous: bool) {
        if !continuous && self.value != value {
            self.bump_sequence();
        }
        self.value = value;
    }
}

/// A slot in the store: live data or a reusable tombstone.
///
/// Deletion tombstones slots instead of compacting so every other variable
/// keeps its index. An `Empty` slot is never readable as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Slot {
    Live(Variable),
    Empty,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub(crate) fn live(&self, index: usize) -> SimResult<&Variable> {
        match self {
            Slot::Live(v) => Ok(v),
            Slot::Empty => Err(SimError::DeletedVariable(index)),
        }
    }

    pub(crate) fn live_mut(&mut self, index: usize) -> SimResult<&mut Variable> {
        match self {
            Slot::Live(v) => Ok(v),
            Slot::Empty => Err(SimError::DeletedVariable(index)),
        }
    }
}

/// Normalizes a display name into the canonical variable identifier:
/// trimmed, uppercased, spaces and dashes collapsed to underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Validates a caller-supplied name, returning its canonical form.
pub fn validate_name(name: &str) -> SimResult<String> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Err(SimError::BlankName(name.to_string()));
    }
    if normalized == RESERVED_DELETED {
        return Err(SimError::ReservedName(name.to_string()));
    }
    Ok(normalized)
}
