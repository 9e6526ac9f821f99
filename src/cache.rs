use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CACHE_CAPACITY: usize = 3;

/// One loaded thumbnail. The slot owns the image; dropping the slot
/// releases it.
#[derive(Debug)]
pub struct CacheSlot<T> {
    pub list_index: usize,
    pub source_path: PathBuf,
    pub image: T,
}

/// FIFO cache of scaled thumbnails keyed by position in the open listing.
///
/// Slot 0 is always the oldest entry. Alongside the slots the cache tracks
/// which entry is currently on screen, and clears that marker in the same
/// call that evicts it, so the renderer can never be handed an image that
/// is no longer held here.
#[derive(Debug)]
pub struct ThumbnailCache<T> {
    slots: Vec<CacheSlot<T>>,
    capacity: usize,
    displayed_index: Option<usize>,
    displayed_valid: bool,
}

impl<T> Default for ThumbnailCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<T> ThumbnailCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            displayed_index: None,
            displayed_valid: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Slot position holding `list_index`, if cached.
    pub fn find(&self, list_index: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.list_index == list_index)
    }

    /// The slot the next `evict` would drop, only when the cache is full.
    pub fn evict_slot(&self) -> Option<usize> {
        (self.is_full() && !self.slots.is_empty()).then_some(0)
    }

    /// Appends a new entry. Fails without touching the cache when full; the
    /// caller evicts first so it decides when the old image goes away.
    ///
    /// An entry already cached under the same `list_index` is replaced in
    /// place, keeping its age.
    pub fn add(&mut self, list_index: usize, source_path: &Path, image: T) -> bool {
        if self.is_full() {
            return false;
        }
        match self.find(list_index) {
            Some(pos) => self.overwrite(pos, source_path, image),
            None => self.slots.push(CacheSlot {
                list_index,
                source_path: source_path.to_path_buf(),
                image,
            }),
        }
        true
    }

    /// Drops the oldest entry. Evicting the displayed entry invalidates the
    /// displayed marker in the same step.
    pub fn evict(&mut self) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let evicted = self.slots.remove(0);
        if self.displayed_valid && self.displayed_index == Some(evicted.list_index) {
            self.displayed_valid = false;
        }
        debug!(list_index = evicted.list_index, "thumb: evicted");
        true
    }

    /// Evict-if-full followed by `add`. A reload of an entry that is still
    /// cached replaces it without evicting anything.
    pub fn push(&mut self, list_index: usize, source_path: &Path, image: T) -> bool {
        if let Some(pos) = self.find(list_index) {
            self.overwrite(pos, source_path, image);
            return true;
        }
        if self.is_full() {
            self.evict();
        }
        self.add(list_index, source_path, image)
    }

    fn overwrite(&mut self, pos: usize, source_path: &Path, image: T) {
        let slot = &mut self.slots[pos];
        slot.source_path = source_path.to_path_buf();
        slot.image = image;
    }

    pub fn data(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot).map(|s| &s.image)
    }

    pub fn slot(&self, slot: usize) -> Option<&CacheSlot<T>> {
        self.slots.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheSlot<T>> {
        self.slots.iter()
    }

    /// Drops every entry and the displayed marker. Call whenever the listing
    /// changes, since list indices only mean something within one listing.
    pub fn clear(&mut self) {
        if !self.slots.is_empty() {
            debug!(count = self.slots.len(), "thumb: clearing cache");
        }
        self.slots.clear();
        self.clear_displayed();
    }

    pub fn set_displayed(&mut self, list_index: usize) {
        self.displayed_index = Some(list_index);
        self.displayed_valid = self.find(list_index).is_some();
    }

    pub fn clear_displayed(&mut self) {
        self.displayed_index = None;
        self.displayed_valid = false;
    }

    pub fn is_displayed_valid(&self) -> bool {
        self.displayed_valid
    }

    pub fn displayed_index(&self) -> Option<usize> {
        self.displayed_index
    }

    /// The image that should be on screen right now. Resolved through `find`
    /// on every call; never hold the reference across frames.
    pub fn displayed_data(&self) -> Option<&T> {
        if !self.displayed_valid {
            return None;
        }
        let slot = self.find(self.displayed_index?)?;
        self.data(slot)
    }
}
