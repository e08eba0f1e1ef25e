//! Texture id bookkeeping, independent of any graphics API.
//!
//! A [`TextureSlots`] hands out [`TextureId`]s for a bounded number of
//! handles. Ids live in a [`U64Map`] from id to slot index. Deleting an id
//! retires its entry in place rather than removing it, because removal
//! would break the lookup chains of other ids that collided with it.
//! Retired entries are dropped when the map fills up and is rebuilt.

#![cfg_attr(not(feature = "glow"), allow(dead_code))]

use crate::{allocator::Allocator, map::U64Map, types::TextureId};

/// Map value marking a deleted id whose key still occupies a map entry.
const RETIRED: u32 = u32::MAX;

/// A bounded table of texture handles addressed by [`TextureId`].
pub(crate) struct TextureSlots<T: Copy> {
    /// Handles by slot; `None` marks a free slot.
    handles: Vec<Option<T>>,
    /// Maximum number of live handles.
    limit: usize,
    /// Id to slot index.
    ids: U64Map<u32>,
    /// Next id handed out; ids start at 1 because key 0 is reserved.
    next_id: u32,
}

impl<T: Copy> TextureSlots<T> {
    /// A table holding at most `limit` handles at once.
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            handles: Vec::with_capacity(limit),
            limit,
            ids: U64Map::new(Allocator::heap(), limit.saturating_mul(2)),
            next_id: 1,
        }
    }

    /// Maximum number of live handles.
    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    /// Number of live handles.
    pub(crate) fn len(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    /// Whether every slot holds a live handle.
    pub(crate) fn is_full(&self) -> bool {
        self.free_slot().is_none()
    }

    fn free_slot(&self) -> Option<usize> {
        match self.handles.iter().position(Option::is_none) {
            Some(slot) => Some(slot),
            None if self.handles.len() < self.limit => Some(self.handles.len()),
            None => None,
        }
    }

    /// Store `handle` under a fresh id.
    ///
    /// Hands `handle` back when the table is full.
    pub(crate) fn insert(&mut self, handle: T) -> Result<(TextureId, usize), T> {
        let Some(slot) = self.free_slot() else {
            return Err(handle);
        };
        let Ok(slot_index) = u32::try_from(slot) else {
            return Err(handle);
        };
        if slot == self.handles.len() {
            self.handles.push(Some(handle));
        } else {
            self.handles[slot] = Some(handle);
        }

        if self.ids.len() == self.ids.capacity() {
            self.compact();
        }
        let id = TextureId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.ids.set(u64::from(id.raw()), slot_index);
        Ok((id, slot))
    }

    /// Retire `id` and return its handle. Unknown or retired ids give `None`.
    pub(crate) fn remove(&mut self, id: TextureId) -> Option<T> {
        let slot = self.ids.get_mut(u64::from(id.raw()))?;
        if *slot == RETIRED {
            return None;
        }
        let index = *slot as usize;
        *slot = RETIRED;
        self.handles.get_mut(index)?.take()
    }

    /// Handle behind `id`.
    pub(crate) fn get(&self, id: TextureId) -> Option<T> {
        self.ids
            .get(u64::from(id.raw()))
            .filter(|&&slot| slot != RETIRED)
            .and_then(|&slot| self.handles.get(slot as usize).copied().flatten())
    }

    /// Every live handle, in slot order.
    pub(crate) fn handles(&self) -> impl Iterator<Item = T> + '_ {
        self.handles.iter().flatten().copied()
    }

    /// Rebuild the id map with only live ids.
    fn compact(&mut self) {
        let mut fresh = U64Map::new(Allocator::heap(), self.ids.capacity());
        for (key, &slot) in self.ids.iter() {
            if slot != RETIRED {
                fresh.set(key, slot);
            }
        }
        tracing::trace!(
            before = self.ids.len(),
            after = fresh.len(),
            "compacted texture map"
        );
        self.ids = fresh;
    }
}
