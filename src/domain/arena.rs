//! Slot arena with a LIFO free list, addressed by typed integer handles.

use std::fmt;
use std::marker::PhantomData;

use tracing::instrument;

use crate::domain::error::{ForestError, ForestResult};

/// Integer handle type accepted by an [`Arena`].
///
/// Each arena is parameterized over its handle type, so a handle minted for one
/// arena type cannot be passed to an arena of another.
pub trait Handle: Copy + Eq + Ord + fmt::Debug {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Handle of a node in a [`Forest`](crate::domain::Forest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Handle for NodeId {
    /// Panics past `u32::MAX` slots; a wider index cannot be written to the log.
    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("node arena exceeded u32::MAX slots"))
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A single arena slot. `Vacant` is the tombstone of a freed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Occupied(T),
    Vacant,
}

/// Vector of slots plus a stack of freed handles.
///
/// Freed handles are reissued last-freed-first before any new slot is appended.
#[derive(Debug)]
pub struct Arena<H: Handle, T> {
    slots: Vec<Slot<T>>,
    free: Vec<H>,
    live: usize,
    _handle: PhantomData<fn() -> H>,
}

impl<H: Handle, T: Default> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T: Default> Arena<H, T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }

    /// Pops a recycled handle (resetting its record to `T::default()`) or
    /// appends a fresh slot.
    #[instrument(level = "trace", skip(self))]
    pub fn allocate(&mut self) -> H {
        self.live += 1;
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle.index()] = Slot::Occupied(T::default());
                handle
            }
            None => {
                self.slots.push(Slot::Occupied(T::default()));
                H::from_index(self.slots.len() - 1)
            }
        }
    }
}

impl<H: Handle, T> Arena<H, T> {
    /// Tombstones the slot and pushes the handle onto the free list.
    ///
    /// The caller must have unlinked every record that still points at `handle`.
    #[instrument(level = "trace", skip(self))]
    pub fn free(&mut self, handle: H) -> ForestResult<T> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(ForestError::OutOfRange(handle.index()))?;
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(record) => {
                self.free.push(handle);
                self.live -= 1;
                Ok(record)
            }
            Slot::Vacant => Err(ForestError::OutOfRange(handle.index())),
        }
    }

    pub fn get(&self, handle: H) -> ForestResult<&T> {
        match self.slots.get(handle.index()) {
            Some(Slot::Occupied(record)) => Ok(record),
            _ => Err(ForestError::OutOfRange(handle.index())),
        }
    }

    pub fn get_mut(&mut self, handle: H) -> ForestResult<&mut T> {
        match self.slots.get_mut(handle.index()) {
            Some(Slot::Occupied(record)) => Ok(record),
            _ => Err(ForestError::OutOfRange(handle.index())),
        }
    }

    pub fn contains(&self, handle: H) -> bool {
        matches!(self.slots.get(handle.index()), Some(Slot::Occupied(_)))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever appended, live or tombstoned.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Freed handles, most recently freed last (next to be reissued).
    pub fn free_list(&self) -> &[H] {
        &self.free
    }

    /// Live handles with their records, ascending by handle.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(record) => Some((H::from_index(index), record)),
                Slot::Vacant => None,
            })
    }
}
