use creepline_core::RingBuffer;
use proptest::prelude::*;

proptest! {
    #[test]
    fn overflow_keeps_only_the_most_recent_values(capacity in 1_usize..16, extra in 1_usize..24) {
        let mut buffer = RingBuffer::new(capacity);
        let total = capacity + extra;
        for value in 0..total {
            buffer.push(Some(value));
        }

        prop_assert_eq!(buffer.len(), capacity);
        let mut drained = Vec::new();
        while let Some(value) = buffer.oldest().copied() {
            prop_assert_eq!(buffer.discard(), Some(value));
            drained.push(value);
        }
        let expected: Vec<usize> = (extra..total).collect();
        prop_assert_eq!(drained, expected, "oldest {} values must be gone", extra);
    }

    #[test]
    fn previous_trails_latest_by_one_push(capacity in 2_usize..16, pushes in 2_usize..40) {
        let mut buffer = RingBuffer::new(capacity);
        for value in 0..pushes {
            buffer.push(Some(value));
        }
        prop_assert_eq!(buffer.previous(), Some(&(pushes - 2)));
        prop_assert_eq!(buffer.peek_latest(), Some(&(pushes - 1)));
    }
}

#[test]
fn previous_is_absent_until_two_values_exist() {
    let mut buffer = RingBuffer::<u8>::new(8);
    assert!(buffer.previous().is_none());
    buffer.push(Some(1));
    assert!(buffer.previous().is_none(), "a single value has no predecessor");
    buffer.push(Some(2));
    assert_eq!(buffer.previous(), Some(&1));
}

#[test]
fn iteration_runs_from_oldest_to_latest_after_wrap() {
    let mut buffer = RingBuffer::new(3);
    for value in [10, 20, 30, 40, 50] {
        buffer.push(Some(value));
    }
    let values: Vec<_> = buffer.iter().copied().collect();
    assert_eq!(values, vec![30, 40, 50]);
}

#[test]
fn discarding_everything_then_pushing_restarts_cleanly() {
    let mut buffer = RingBuffer::new(2);
    buffer.push(Some('a'));
    buffer.push(Some('b'));
    assert_eq!(buffer.discard(), Some('a'));
    assert_eq!(buffer.discard(), Some('b'));
    assert!(buffer.is_empty());
    assert_eq!(buffer.discard(), None);

    buffer.push(Some('c'));
    assert_eq!(buffer.oldest(), Some(&'c'));
    assert_eq!(buffer.len(), 1);
}

#[test]
fn in_place_edits_survive_the_commit() {
    let mut buffer = RingBuffer::<Vec<u8>>::new(4);
    buffer.latest().push(1);
    buffer.latest().push(2);
    buffer.push(None);
    buffer.latest().push(3);

    assert_eq!(buffer.previous(), Some(&vec![1, 2]));
    assert_eq!(buffer.peek_latest(), Some(&vec![3]));
}
