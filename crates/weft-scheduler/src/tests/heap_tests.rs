use super::{HeapNode, MinHeap};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    id: u64,
    sort_index: u64,
}

impl HeapNode for Entry {
    fn id(&self) -> u64 {
        self.id
    }

    fn sort_index(&self) -> u64 {
        self.sort_index
    }
}

fn entry(id: u64, sort_index: u64) -> Entry {
    Entry { id, sort_index }
}

fn drain(heap: &mut MinHeap<Entry>) -> Vec<(u64, u64)> {
    let mut out = Vec::new();
    while let Some(next) = heap.pop() {
        out.push((next.sort_index, next.id));
    }
    out
}

#[test]
fn empty_heap_peeks_and_pops_none() {
    let mut heap: MinHeap<Entry> = MinHeap::new();
    assert!(heap.peek().is_none());
    assert!(heap.pop().is_none());
    assert!(heap.is_empty());
}

#[test]
fn single_entry_is_the_top() {
    let mut heap = MinHeap::new();
    heap.push(entry(1, 1));
    assert_eq!(heap.peek().map(|e| e.sort_index), Some(1));
    assert_eq!(heap.len(), 1);
}

#[test]
fn peek_tracks_minimum_across_pushes_and_pops() {
    let mut heap = MinHeap::new();
    heap.push(entry(0, 1));
    heap.push(entry(1, 2));
    heap.push(entry(2, 3));
    assert_eq!(heap.peek().map(|e| e.sort_index), Some(1));

    heap.push(entry(3, 0));
    assert_eq!(heap.peek().map(|e| e.sort_index), Some(0));

    heap.pop();
    assert_eq!(heap.peek().map(|e| e.sort_index), Some(1));
}

#[test]
fn equal_sort_indices_pop_in_id_order() {
    let mut heap = MinHeap::new();
    for id in [5, 3, 9, 1, 7] {
        heap.push(entry(id, 10));
    }
    let ids: Vec<u64> = drain(&mut heap).into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, vec![1, 3, 5, 7, 9]);
}

#[test]
fn pops_come_out_sorted_for_scrambled_input() {
    let mut heap = MinHeap::new();
    let keys = [42u64, 7, 19, 7, 0, 100, 3, 55, 19, 8, 64, 1];
    for (id, key) in keys.iter().enumerate() {
        heap.push(entry(id as u64, *key));
    }

    let drained = drain(&mut heap);
    assert_eq!(drained.len(), keys.len());
    for pair in drained.windows(2) {
        assert!(pair[0] <= pair[1], "heap order violated: {pair:?}");
    }
}

#[test]
fn interleaved_operations_keep_minimum_on_top() {
    let mut heap: MinHeap<Entry> = MinHeap::new();
    let mut shadow: Vec<(u64, u64)> = Vec::new();
    let mut next_id = 0;
    // Deterministic pseudo-random sequence.
    let mut seed: u64 = 0x2545_f491;
    for step in 0..200 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        if step % 3 == 2 {
            let popped = heap.pop().map(|e| (e.sort_index, e.id));
            shadow.sort();
            let expected = if shadow.is_empty() {
                None
            } else {
                Some(shadow.remove(0))
            };
            assert_eq!(popped, expected);
        } else {
            let key = seed % 50;
            heap.push(entry(next_id, key));
            shadow.push((key, next_id));
            next_id += 1;
        }
        shadow.sort();
        assert_eq!(heap.peek().map(|e| (e.sort_index, e.id)), shadow.first().copied());
    }
}
