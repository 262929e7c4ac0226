//! Owned, generational store of every buffer in the editor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::buffer::{Buffer, BufferId};

struct Slot {
    generation: u32,
    buffer: Option<Buffer>,
}

#[derive(Default)]
pub struct BufferManager {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<BufferId>,
    by_path: HashMap<PathBuf, BufferId>,
    focus_clock: u64,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> BufferId {
        if let Some(index) = self.free.pop() {
            let generation = self.slots[index as usize].generation;
            BufferId::new(index, generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                buffer: None,
            });
            BufferId::new((self.slots.len() - 1) as u32, 0)
        }
    }

    /// Stores the buffer built by `make` under a fresh id. A path already
    /// owned by another buffer is not re-keyed; callers check `find_by_path`
    /// first.
    pub fn insert(&mut self, make: impl FnOnce(BufferId) -> Buffer) -> BufferId {
        let id = self.allocate();
        let buffer = make(id);
        if let Some(path) = buffer.path() {
            self.by_path.entry(path.to_path_buf()).or_insert(id);
        }
        self.slots[id.index() as usize].buffer = Some(buffer);
        self.order.push(id);
        id
    }

    /// Takes the buffer out and retires its id.
    pub fn remove(&mut self, id: BufferId) -> Option<Buffer> {
        let slot = self.slot_mut(id)?;
        let buffer = slot.buffer.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.order.retain(|b| *b != id);
        if let Some(path) = buffer.path() {
            if self.by_path.get(path) == Some(&id) {
                self.by_path.remove(path);
            }
        }
        Some(buffer)
    }

    fn slot_mut(&mut self, id: BufferId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.buffer.as_ref())
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.slot_mut(id).and_then(|slot| slot.buffer.as_mut())
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.get(id).is_some()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<BufferId> {
        self.by_path.get(path).copied()
    }

    /// Moves `id` to `path`. Refuses a path that belongs to another buffer.
    pub fn rekey_path(&mut self, id: BufferId, path: PathBuf) -> bool {
        if let Some(owner) = self.by_path.get(&path) {
            return *owner == id;
        }
        let Some(buffer) = self.get_mut(id) else {
            return false;
        };
        let old = buffer.path().map(Path::to_path_buf);
        buffer.set_path(path.clone());
        if let Some(old) = old {
            self.by_path.remove(&old);
        }
        self.by_path.insert(path, id);
        true
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<BufferId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> + '_ {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records that `id` was just given focus.
    pub fn touch(&mut self, id: BufferId) {
        self.focus_clock += 1;
        let stamp = self.focus_clock;
        if let Some(buffer) = self.get_mut(id) {
            buffer.set_focus_stamp(stamp);
        }
    }

    /// Most recently focused buffer; never-focused buffers rank by recency
    /// of insertion.
    pub fn mru(&self) -> Option<BufferId> {
        self.order
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| self.get(*id).map(|b| ((b.focus_stamp(), pos), *id)))
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, id)| id)
    }

    /// Drops every buffer. Outstanding ids stay invalid.
    pub fn clear(&mut self) {
        for id in self.ids() {
            self.remove(id);
        }
    }
}
