//! Z-order as an arena of descriptors plus an index permutation.
//!
//! Position 0 is the bottom of the stack. The arena never changes after
//! construction; reordering only rewrites `order`, which makes "is this a
//! permutation of the current set" a cheap mechanical check.

use std::collections::HashMap;
use std::sync::Arc;

use crate::resource::{LayerDescriptor, LayerKey};

#[derive(Debug, Default)]
pub(crate) struct ZOrder {
    arena: Vec<Arc<LayerDescriptor>>,
    slots: HashMap<LayerKey, usize>,
    /// position -> arena index
    order: Vec<usize>,
    /// arena index -> position
    rank: Vec<usize>,
}

impl ZOrder {
    /// Build from descriptors in bottom-to-top order. Later duplicates of a
    /// key are ignored.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = Arc<LayerDescriptor>>) -> Self {
        let mut arena = Vec::new();
        let mut slots = HashMap::new();
        for descriptor in descriptors {
            let key = descriptor.key();
            if slots.contains_key(&key) {
                continue;
            }
            slots.insert(key, arena.len());
            arena.push(descriptor);
        }
        let order: Vec<usize> = (0..arena.len()).collect();
        let rank = order.clone();
        Self {
            arena,
            slots,
            order,
            rank,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptor at `position`.
    pub fn get(&self, position: usize) -> Option<&Arc<LayerDescriptor>> {
        self.order.get(position).map(|&slot| &self.arena[slot])
    }

    /// Current descriptor instance for a key.
    pub fn descriptor(&self, key: &LayerKey) -> Option<&Arc<LayerDescriptor>> {
        self.slots.get(key).map(|&slot| &self.arena[slot])
    }

    /// Position of a key, which is also its z-index.
    pub fn position(&self, key: &LayerKey) -> Option<usize> {
        self.slots.get(key).map(|&slot| self.rank[slot])
    }

    /// Descriptors bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<LayerDescriptor>> {
        self.order.iter().map(|&slot| &self.arena[slot])
    }

    pub fn to_vec(&self) -> Vec<Arc<LayerDescriptor>> {
        self.iter().cloned().collect()
    }

    /// Replace the order if `requested` is exactly a permutation of the
    /// current descriptors (matched by identity). Otherwise nothing
    /// changes and false is returned.
    pub fn set_order(&mut self, requested: &[Arc<LayerDescriptor>]) -> bool {
        if requested.len() != self.arena.len() {
            return false;
        }
        let mut seen = vec![false; self.arena.len()];
        let mut order = Vec::with_capacity(requested.len());
        for descriptor in requested {
            let Some(&slot) = self.slots.get(&descriptor.key()) else {
                return false;
            };
            if std::mem::replace(&mut seen[slot], true) {
                return false;
            }
            order.push(slot);
        }

        for (position, &slot) in order.iter().enumerate() {
            self.rank[slot] = position;
        }
        self.order = order;
        true
    }
}
