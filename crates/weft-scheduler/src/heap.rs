//! Array-backed binary min-heap used by the scheduler's task queues.
//!
//! Entries are ordered by their sort index and then by id, so entries that
//! share a sort index come out in id order (FIFO for monotonically assigned
//! ids) independent of how the heap happened to shuffle them.

use std::cmp::Ordering;

/// An entry that can be stored in a [`MinHeap`].
pub trait HeapNode {
    /// Identity used to break ties between equal sort indices.
    fn id(&self) -> u64;

    /// Primary ordering key. Smaller values are popped first.
    fn sort_index(&self) -> u64;
}

impl<T: HeapNode + ?Sized> HeapNode for std::rc::Rc<T> {
    fn id(&self) -> u64 {
        (**self).id()
    }

    fn sort_index(&self) -> u64 {
        (**self).sort_index()
    }
}

fn compare<T: HeapNode>(a: &T, b: &T) -> Ordering {
    a.sort_index()
        .cmp(&b.sort_index())
        .then_with(|| a.id().cmp(&b.id()))
}

#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    nodes: Vec<T>,
}

impl<T> Default for MinHeap<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T: HeapNode> MinHeap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the smallest entry without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.nodes.first()
    }

    pub fn push(&mut self, node: T) {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.sift_up(index);
    }

    /// Removes and returns the smallest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.nodes.is_empty() {
            return None;
        }
        let last = self.nodes.len() - 1;
        self.nodes.swap(0, last);
        let first = self.nodes.pop();
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter()
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) >> 1;
            if compare(&self.nodes[parent], &self.nodes[index]) == Ordering::Greater {
                self.nodes.swap(parent, index);
                index = parent;
            } else {
                return;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let length = self.nodes.len();
        let half = length >> 1;
        while index < half {
            let left = 2 * index + 1;
            let right = left + 1;
            // `left` always exists while index < length / 2.
            let smaller_child = if right < length
                && compare(&self.nodes[right], &self.nodes[left]) == Ordering::Less
            {
                right
            } else {
                left
            };
            if compare(&self.nodes[smaller_child], &self.nodes[index]) == Ordering::Less {
                self.nodes.swap(index, smaller_child);
                index = smaller_child;
            } else {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/heap_tests.rs"]
mod tests;
