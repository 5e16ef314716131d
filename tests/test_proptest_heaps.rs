//! Property-based tests for the two priority queues behind the search.

use kdrift::interval_heap::IntervalHeap;
use kdrift::min_heap::MinHeap;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum HeapOp {
    Insert(f64),
    RemoveMin,
    RemoveMax,
    ReplaceMax(f64),
}

fn arb_op() -> impl Strategy<Value = HeapOp> {
    prop_oneof![
        3 => (-1000.0..1000.0f64).prop_map(HeapOp::Insert),
        1 => Just(HeapOp::RemoveMin),
        1 => Just(HeapOp::RemoveMax),
        1 => (-1000.0..1000.0f64).prop_map(HeapOp::ReplaceMax),
    ]
}

proptest! {
    #[test]
    fn test_min_heap_drains_sorted(keys in prop::collection::vec(-1000.0..1000.0f64, 0..200)) {
        let mut heap = MinHeap::new();
        for (value, key) in keys.iter().enumerate() {
            heap.insert(*key, value);
        }
        let mut drained = Vec::new();
        while !heap.is_empty() {
            let key = heap.min_key().unwrap();
            heap.remove_min().unwrap();
            drained.push(key);
        }
        let mut expected = keys.clone();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        prop_assert_eq!(drained, expected);
    }

    // The interval heap is checked against a plain sorted-vector model: after any op
    // sequence both report the same minimum and maximum.
    #[test]
    fn test_interval_heap_matches_model(ops in prop::collection::vec(arb_op(), 1..200)) {
        let mut heap: IntervalHeap<u32> = IntervalHeap::new();
        let mut model: Vec<f64> = Vec::new();

        for op in ops {
            match op {
                HeapOp::Insert(key) => {
                    heap.insert(key, 0);
                    let position = model.partition_point(|k| *k < key);
                    model.insert(position, key);
                }
                HeapOp::RemoveMin => {
                    if model.is_empty() {
                        prop_assert!(heap.remove_min().is_err());
                    } else {
                        let key = heap.min_key().unwrap();
                        heap.remove_min().unwrap();
                        prop_assert_eq!(key, model.remove(0));
                    }
                }
                HeapOp::RemoveMax => {
                    if model.is_empty() {
                        prop_assert!(heap.remove_max().is_err());
                    } else {
                        let key = heap.max_key().unwrap();
                        heap.remove_max().unwrap();
                        prop_assert_eq!(key, model.pop().unwrap());
                    }
                }
                HeapOp::ReplaceMax(key) => {
                    if model.is_empty() {
                        prop_assert!(heap.replace_max(key, 0).is_err());
                    } else {
                        heap.replace_max(key, 0).unwrap();
                        model.pop();
                        let position = model.partition_point(|k| *k < key);
                        model.insert(position, key);
                    }
                }
            }

            prop_assert_eq!(heap.len(), model.len());
            if model.is_empty() {
                prop_assert!(heap.is_empty());
            } else {
                prop_assert_eq!(heap.min_key().unwrap(), model[0]);
                prop_assert_eq!(heap.max_key().unwrap(), *model.last().unwrap());
            }
        }
    }
}
