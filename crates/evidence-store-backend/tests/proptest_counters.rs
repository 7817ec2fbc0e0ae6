use proptest::prelude::*;

use evidence_store_backend::counters::SequenceCounters;

proptest! {
    /// Allocating N times for the same type always yields the contiguous
    /// prefix 1..=N, regardless of how many unrelated types are
    /// interleaved.
    #[test]
    fn allocation_is_a_contiguous_prefix(
        n in 1u64..200,
        other_types in prop::collection::vec("[a-z]{1,8}", 0..20),
    ) {
        let mut counters = SequenceCounters::new();
        let mut allocated = Vec::new();
        let mut others = other_types.into_iter().cycle();
        for _ in 0..n {
            allocated.push(counters.allocate("event"));
            if let Some(other) = others.next() {
                if other != "event" {
                    counters.allocate(&other);
                }
            }
        }
        let expected: Vec<u64> = (1..=n).collect();
        prop_assert_eq!(allocated, expected);
        prop_assert_eq!(counters.count("event"), n);
    }

    /// Recovering a counter then allocating continues from one past the
    /// recovered high-water mark.
    #[test]
    fn recover_then_allocate_continues_the_sequence(highest in 0u64..10_000) {
        let mut counters = SequenceCounters::new();
        counters.recover("event", highest);
        prop_assert_eq!(counters.allocate("event"), highest + 1);
    }
}
