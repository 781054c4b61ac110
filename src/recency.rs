//! Bounded most-recently-used lists.
//!
//! The compact format references recently seen pitches and note shapes by
//! their position in one of these lists. Encoder and decoder must update
//! them identically, so all mutation goes through [`RecencyList::touch`] and
//! [`RecencyList::promote`].

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RecencyList<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: PartialEq> RecencyList<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Seed the list in order; index 0 is the most recent entry.
    pub fn with_items<I: IntoIterator<Item = T>>(capacity: usize, items: I) -> Self {
        let mut list = Self::new(capacity);
        list.items.extend(items);
        list.items.truncate(capacity);
        list
    }

    pub fn position(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x == item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Insert a new entry at the front, dropping the oldest past capacity.
    pub fn touch(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    /// Move an existing entry to the front and return it.
    pub fn promote(&mut self, index: usize) -> Option<&T> {
        let item = self.items.remove(index)?;
        self.items.push_front(item);
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
