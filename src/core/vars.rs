//! Ordered, named store of scalar state variables.
//!
//! The store is the single state vector a model integrates over. Index order
//! is meaningful and stable: deleting variables tombstones their slots rather
//! than compacting, and new variables reuse contiguous tombstoned runs before
//! the sequence grows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::variable::{validate_name, Slot, Variable, TIME_NAME};
use crate::error::{SimError, SimResult};

/// Broadcast whenever variables are added to or removed from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarsEvent {
    Added { index: usize, count: usize },
    Removed { index: usize, count: usize },
}

type Observer = Box<dyn FnMut(&VarsEvent)>;

/// Ordered container of [`Variable`] slots with tombstoned reuse and
/// discontinuity tracking.
pub struct VariableStore {
    slots: Vec<Slot>,
    time_index: Option<usize>,
    observers: Vec<Observer>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            time_index: None,
            observers: Vec::new(),
        }
    }

    /// Total slot count, tombstones included. Valid indices are `0..len`.
    pub fn num_variables(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registers an observer called on every add/remove of variables.
    pub fn on_modified<F>(&mut self, observer: F)
    where
        F: FnMut(&VarsEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Adds one variable, reusing a tombstoned slot when one exists.
    /// Returns the index the variable was placed at.
    pub fn add_variable(&mut self, name: &str) -> SimResult<usize> {
        let canonical = validate_name(name)?;
        self.check_duplicate(&canonical)?;
        let index = self.find_open_slot(1);
        self.place(index, canonical);
        self.notify(VarsEvent::Added { index, count: 1 });
        Ok(index)
    }

    /// Atomically allocates a contiguous run of variables, reusing a
    /// tombstoned run only when it can hold the whole block. Returns the
    /// first index of the run.
    pub fn add_variable_block(&mut self, names: &[&str]) -> SimResult<usize> {
        if names.is_empty() {
            return Err(SimError::EmptyNameList);
        }
        let mut canonical = Vec::with_capacity(names.len());
        for name in names {
            let c = validate_name(name)?;
            if canonical.contains(&c) {
                return Err(SimError::DuplicateName(c));
            }
            self.check_duplicate(&c)?;
            canonical.push(c);
        }
        let first = self.find_open_slot(canonical.len());
        let count = canonical.len();
        for (offset, name) in canonical.into_iter().enumerate() {
            self.place(first + offset, name);
        }
        self.notify(VarsEvent::Added {
            index: first,
            count,
        });
        Ok(first)
    }

    /// Tombstones `count` slots starting at `index`. Indices of all other
    /// variables are unaffected. A zero count is a no-op.
    pub fn delete_variables(&mut self, index: usize, count: usize) -> SimResult<()> {
        if count == 0 {
            return Ok(());
        }
        let end = index
            .checked_add(count)
            .ok_or(SimError::RangeOutOfRange {
                index,
                end: usize::MAX,
                len: self.slots.len(),
            })?;
        if end > self.slots.len() {
            return Err(SimError::RangeOutOfRange {
                index,
                end,
                len: self.slots.len(),
            });
        }
        for slot in &mut self.slots[index..end] {
            *slot = Slot::Empty;
        }
        if let Some(t) = self.time_index {
            if t >= index && t < end {
                self.time_index = None;
            }
        }
        self.notify(VarsEvent::Removed { index, count });
        Ok(())
    }

    /// Read access to the variable at `index`; tombstoned slots are an error.
    pub fn variable(&self, index: usize) -> SimResult<&Variable> {
        self.slot(index)?.live(index)
    }

    /// Finds a live variable by (normalized) name.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        let canonical = crate::core::variable::normalize_name(name);
        self.slots.iter().position(|slot| match slot {
            Slot::Live(v) => v.name() == canonical,
            Slot::Empty => false,
        })
    }

    pub fn get_value(&self, index: usize) -> SimResult<f64> {
        Ok(self.variable(index)?.value())
    }

    /// Writes a value. `continuous = false` marks the write as a jump and
    /// bumps the variable's sequence number when the value changes.
    /// NaN is rejected unless the variable is flagged computed.
    pub fn set_value(&mut self, index: usize, value: f64, continuous: bool) -> SimResult<()> {
        let var = self.slot_mut(index)?.live_mut(index)?;
        if value.is_nan() && !var.is_computed() {
            return Err(SimError::NotANumber { index });
        }
        var.write(value, continuous);
        Ok(())
    }

    /// Copies all values into `out` (cleared first). Computed variables are
    /// masked to NaN unless `include_computed`; tombstoned slots read 0.0.
    pub fn write_values(&self, out: &mut Vec<f64>, include_computed: bool) {
        out.clear();
        out.extend(self.slots.iter().map(|slot| match slot {
            Slot::Live(v) => {
                if v.is_computed() && !include_computed {
                    f64::NAN
                } else {
                    v.value()
                }
            }
            Slot::Empty => 0.0,
        }));
    }

    /// Allocating convenience over [`VariableStore::write_values`].
    pub fn values(&self, include_computed: bool) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.slots.len());
        self.write_values(&mut out, include_computed);
        out
    }

    /// Writes one value per slot; tombstoned slots are skipped. The whole
    /// batch is validated up front, so a rejected entry (NaN for a
    /// non-computed variable) leaves every slot unwritten.
    pub fn set_values(&mut self, values: &[f64], continuous: bool) -> SimResult<()> {
        if values.len() != self.slots.len() {
            return Err(SimError::LengthMismatch {
                expected: self.slots.len(),
                actual: values.len(),
            });
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Live(v) = slot {
                if values[index].is_nan() && !v.is_computed() {
                    return Err(SimError::NotANumber { index });
                }
            }
        }
        for index in 0..self.slots.len() {
            if !self.slots[index].is_empty() {
                self.set_value(index, values[index], continuous)?;
            }
        }
        Ok(())
    }

    /// Fills `out` with `true` for every slot the integrator owns: live and
    /// not computed.
    pub fn write_state_mask(&self, out: &mut Vec<bool>) {
        out.clear();
        out.extend(self.slots.iter().map(|slot| match slot {
            Slot::Live(v) => !v.is_computed(),
            Slot::Empty => false,
        }));
    }

    /// Flags a discontinuity without changing any value. With no indices,
    /// every live variable is flagged (used when an external parameter change
    /// invalidates derived quantities wholesale).
    pub fn increment_sequence(&mut self, indices: &[usize]) -> SimResult<()> {
        if indices.is_empty() {
            for slot in &mut self.slots {
                if let Slot::Live(v) = slot {
                    v.bump_sequence();
                }
            }
            return Ok(());
        }
        for &index in indices {
            self.slot_mut(index)?.live_mut(index)?.bump_sequence();
        }
        Ok(())
    }

    /// Marks a variable as computed (derived after integration) or not.
    pub fn set_computed(&mut self, index: usize, computed: bool) -> SimResult<()> {
        self.slot_mut(index)?.live_mut(index)?.set_computed(computed);
        Ok(())
    }

    /// Refreshes the transient rate of a variable.
    pub fn set_rate(&mut self, index: usize, rate: f64) -> SimResult<()> {
        self.slot_mut(index)?.live_mut(index)?.set_rate(rate);
        Ok(())
    }

    /// Index of the `TIME` variable, if one exists.
    pub fn time_index(&self) -> Option<usize> {
        self.time_index
    }

    /// Current simulation time; an error when no time variable exists.
    pub fn time(&self) -> SimResult<f64> {
        let index = self.time_index.ok_or(SimError::NoTimeVariable)?;
        self.get_value(index)
    }

    /// Finds the start of a contiguous run of `quantity` reusable slots.
    ///
    /// The first interior tombstoned run long enough wins. A trailing run
    /// that is too short is extended by exactly the shortfall, keeping the
    /// returned run contiguous. Otherwise the store grows at the end.
    fn find_open_slot(&mut self, quantity: usize) -> usize {
        debug_assert!(quantity > 0);
        let len = self.slots.len();
        let mut i = 0;
        while i < len {
            if self.slots[i].is_empty() {
                let start = i;
                let mut j = i;
                while j < len && self.slots[j].is_empty() {
                    j += 1;
                }
                let run = j - start;
                if run >= quantity {
                    return start;
                }
                if j == len {
                    // trailing run: grow by the shortfall only
                    self.grow(quantity - run);
                    return start;
                }
                i = j;
            } else {
                i += 1;
            }
        }
        let start = len;
        self.grow(quantity);
        start
    }

    fn grow(&mut self, count: usize) {
        self.slots
            .extend(std::iter::repeat_with(|| Slot::Empty).take(count));
    }

    fn place(&mut self, index: usize, canonical_name: String) {
        if canonical_name == TIME_NAME {
            self.time_index = Some(index);
        }
        self.slots[index] = Slot::Live(Variable::new(canonical_name));
    }

    fn check_duplicate(&self, canonical: &str) -> SimResult<()> {
        for slot in &self.slots {
            if let Slot::Live(v) = slot {
                if v.name() == canonical {
                    return Err(SimError::DuplicateName(canonical.to_string()));
                }
            }
        }
        Ok(())
    }

    fn slot(&self, index: usize) -> SimResult<&Slot> {
        self.slots.get(index).ok_or(SimError::IndexOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> SimResult<&mut Slot> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(SimError::IndexOutOfRange { index, len })
    }

    fn notify(&mut self, event: VarsEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableStore")
            .field("slots", &self.slots)
            .field("time_index", &self.time_index)
            .field("observers", &self.observers.len())
            .finish()
    }
}
