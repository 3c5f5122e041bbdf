/// Splits `[from, to]` into end-inclusive chunks of at most `batch` blocks,
/// in strictly increasing, non-overlapping order whose union is the input
/// range.
pub fn block_ranges(from: u64, to: u64, batch: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    if from > to {
        return ranges;
    }

    let step = batch.max(1);
    let mut start = from;
    loop {
        let end = start.saturating_add(step - 1).min(to);
        ranges.push((start, end));
        if end == to {
            break;
        }
        start = end + 1;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiples_split_cleanly() {
        assert_eq!(block_ranges(0, 199, 100), vec![(0, 99), (100, 199)]);
    }

    #[test]
    fn trailing_partial_chunk_is_kept() {
        assert_eq!(block_ranges(0, 120, 100), vec![(0, 99), (100, 120)]);
        assert_eq!(block_ranges(151, 210, 100), vec![(151, 210)]);
    }

    #[test]
    fn empty_and_single_block_ranges() {
        assert_eq!(block_ranges(10, 9, 100), Vec::<(u64, u64)>::new());
        assert_eq!(block_ranges(7, 7, 100), vec![(7, 7)]);
    }

    #[test]
    fn windows_partition_the_target_range() {
        let (from, to, batch) = (37u64, 1_503u64, 97u64);
        let ranges = block_ranges(from, to, batch);

        assert_eq!(ranges.first().map(|r| r.0), Some(from));
        assert_eq!(ranges.last().map(|r| r.1), Some(to));
        for window in ranges.windows(2) {
            assert_eq!(window[0].1 + 1, window[1].0);
        }
        let covered: u64 = ranges.iter().map(|(s, e)| e - s + 1).sum();
        assert_eq!(covered, to - from + 1);
        assert!(ranges.iter().all(|(s, e)| s <= e && e - s + 1 <= batch));
    }

    #[test]
    fn upper_boundary_does_not_overflow() {
        let ranges = block_ranges(u64::MAX - 1, u64::MAX, 1000);
        assert_eq!(ranges, vec![(u64::MAX - 1, u64::MAX)]);
    }
}
