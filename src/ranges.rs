//! Compact range-string codec for sets of port or VLAN numbers.
//!
//! The textual form is a comma-separated list of `N` and `A-B` items, e.g.
//! `"1-3, 5, 8-10"`. It appears in persisted layouts (`port_ranges`) and in
//! the `allowed_vlans` field of trunk ports.

/// Format a set of integers as a range string.
///
/// The input is sorted and deduplicated; runs of consecutive values collapse
/// to `A-B`, singletons stay bare.
pub fn format_ranges(indices: &[u32]) -> String {
    if indices.is_empty() {
        return String::new();
    }
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];
    for &curr in &sorted[1..] {
        if curr == prev + 1 {
            prev = curr;
            continue;
        }
        parts.push(render_run(start, prev));
        start = curr;
        prev = curr;
    }
    parts.push(render_run(start, prev));
    parts.join(", ")
}

fn render_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Parse a range string back into a sorted list of integers.
///
/// Lenient: items that fail to parse, and `A-B` items with `A > B`, are
/// silently skipped.
pub fn parse_ranges(range_str: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for part in range_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((a, b)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (a.trim().parse::<u32>(), b.trim().parse::<u32>()) else {
                continue;
            };
            if start <= end {
                out.extend(start..=end);
            }
        } else if let Ok(idx) = part.parse::<u32>() {
            out.push(idx);
        }
    }
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_runs_and_singletons() {
        assert_eq!(format_ranges(&[1, 2, 3, 5, 6, 10]), "1-3, 5-6, 10");
        assert_eq!(format_ranges(&[7]), "7");
        assert_eq!(format_ranges(&[]), "");
    }

    #[test]
    fn format_sorts_and_dedups() {
        assert_eq!(format_ranges(&[10, 1, 3, 2, 3, 1]), "1-3, 10");
    }

    #[test]
    fn no_degenerate_runs() {
        // A singleton must never render as "A-A".
        for set in [vec![4], vec![1, 4, 8], vec![1, 2, 4]] {
            let s = format_ranges(&set);
            for item in s.split(", ") {
                if let Some((a, b)) = item.split_once('-') {
                    assert_ne!(a, b, "degenerate run in {:?}", s);
                }
            }
        }
    }

    #[test]
    fn parses_mixed_items() {
        assert_eq!(parse_ranges("1-3, 5, 8-10"), vec![1, 2, 3, 5, 8, 9, 10]);
        assert_eq!(parse_ranges(" 4 , 2 "), vec![2, 4]);
    }

    #[test]
    fn parse_skips_invalid_items() {
        assert_eq!(parse_ranges("1, x, 5-3, -2, 7"), vec![1, 7]);
        assert_eq!(parse_ranges(""), Vec::<u32>::new());
    }

    #[test]
    fn round_trip_equals_sorted_unique_input() {
        let cases: Vec<Vec<u32>> = vec![
            vec![1],
            vec![1, 2, 3],
            vec![48, 1, 13, 14, 15, 2],
            vec![5, 5, 5],
            vec![1000, 1001, 4094],
            (1..=64).collect(),
        ];
        for case in cases {
            let mut expected = case.clone();
            expected.sort_unstable();
            expected.dedup();
            assert_eq!(parse_ranges(&format_ranges(&case)), expected);
        }
    }
}
