//! # Slot Table
//!
//! Fixed-size table of pipeline slots addressed by index handles.

/// Lifecycle of one pipeline slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Free for the next `produce`.
    Released,
    /// Held by an outstanding producer continuation.
    Reserved,
    /// Holds a completed payload waiting in the FIFO.
    Completed,
    /// Payload handed to the consumer; freed once the consumer returns.
    Consuming,
}

/// Handle to a slot. The generation catches handles that outlive their slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SlotHandle {
    index: usize,
    generation: u32,
}

struct Slot<T> {
    state: SlotState,
    generation: u32,
    trace_id: u64,
    payload: Option<T>,
}

/// All pipeline slots. Storage is allocated once, at construction.
pub(crate) struct SlotTable<T> {
    slots: Box<[Slot<T>]>,
    /// Indices of released slots.
    free_list: Vec<usize>,
}

impl<T> SlotTable<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Pipeline depth must be greater than zero");

        let slots: Vec<Slot<T>> = (0..capacity)
            .map(|_| Slot {
                state: SlotState::Released,
                generation: 0,
                trace_id: 0,
                payload: None,
            })
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            free_list: (0..capacity).rev().collect(),
        }
    }

    /// Number of slots not in the `Released` state.
    #[inline]
    pub(crate) fn in_use(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Reserves a free slot, or returns `None` when every slot is in use.
    ///
    /// `trace_id` is only called once a slot has been found.
    pub(crate) fn reserve(
        &mut self,
        trace_id: impl FnOnce() -> u64,
    ) -> Option<(SlotHandle, u64)> {
        let index = self.free_list.pop()?;
        let slot = &mut self.slots[index];
        debug_assert_eq!(slot.state, SlotState::Released);

        slot.state = SlotState::Reserved;
        slot.trace_id = trace_id();

        let handle = SlotHandle {
            index,
            generation: slot.generation,
        };
        Some((handle, slot.trace_id))
    }

    /// Stores a payload in a reserved slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not reserved by `handle`.
    pub(crate) fn fill(&mut self, handle: SlotHandle, payload: T) {
        let slot = self.slot_mut(handle);
        assert_eq!(
            slot.state,
            SlotState::Reserved,
            "Pipeline slot completed twice or after discard"
        );
        slot.state = SlotState::Completed;
        slot.payload = Some(payload);
    }

    /// Moves a completed payload out for consumption.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds no completed payload.
    pub(crate) fn take(&mut self, handle: SlotHandle) -> (T, u64) {
        let slot = self.slot_mut(handle);
        assert_eq!(slot.state, SlotState::Completed, "Pipeline slot consumed before completion");
        slot.state = SlotState::Consuming;
        let payload = slot.payload.take();
        let trace_id = slot.trace_id;
        match payload {
            Some(payload) => (payload, trace_id),
            None => unreachable!("completed pipeline slot without payload"),
        }
    }

    /// Returns a slot to the free list. Stale handles are ignored.
    pub(crate) fn release(&mut self, handle: SlotHandle) {
        let Some(slot) = self.slots.get_mut(handle.index) else {
            return;
        };
        if slot.generation != handle.generation || slot.state == SlotState::Released {
            return;
        }

        slot.state = SlotState::Released;
        slot.payload = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
    }

    #[cfg(test)]
    pub(crate) fn state(&self, handle: SlotHandle) -> SlotState {
        self.slots[handle.index].state
    }

    fn slot_mut(&mut self, handle: SlotHandle) -> &mut Slot<T> {
        let slot = &mut self.slots[handle.index];
        assert_eq!(slot.generation, handle.generation, "stale pipeline slot handle");
        slot
    }
}
