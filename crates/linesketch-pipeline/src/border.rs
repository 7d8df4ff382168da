//! Out-of-bounds sample handling for neighbourhood filters.

/// How a filter reads samples that fall outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Mirror without repeating the edge sample: `dcb|abcd|cba`.
    #[default]
    Reflect101,
    /// Repeat the edge sample: `aaa|abcd|ddd`.
    Replicate,
}

/// Map a possibly out-of-range index into `0..len`.
///
/// Returns `None` only when `len == 0`.
#[must_use]
pub fn map_index(i: isize, len: usize, mode: BorderMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let last = len - 1;
    match mode {
        BorderMode::Replicate => Some(usize::try_from(i).map_or(0, |idx| idx.min(last))),
        BorderMode::Reflect101 => {
            if len == 1 {
                return Some(0);
            }
            let period = isize::try_from(2 * last).ok()?;
            let r = usize::try_from(i.rem_euclid(period)).ok()?;
            Some(if r < len { r } else { 2 * last - r })
        }
    }
}

/// Precomputed source indices for every output position and tap of a
/// centred kernel of `taps` samples over a line of `len` samples.
///
/// Entry `[i * taps + j]` is the source index read by tap `j` when
/// producing output `i`.
pub(crate) fn tap_table(len: usize, taps: usize, mode: BorderMode) -> Vec<usize> {
    let radius = isize::try_from(taps / 2).unwrap_or(isize::MAX);
    let mut table = Vec::with_capacity(len * taps);
    for i in 0..len {
        let centre = isize::try_from(i).unwrap_or(isize::MAX);
        for j in 0..taps {
            let offset = isize::try_from(j).unwrap_or(isize::MAX) - radius;
            table.push(map_index(centre + offset, len, mode).unwrap_or(0));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_clamps_both_ends() {
        let mode = BorderMode::Replicate;
        assert_eq!(map_index(-3, 5, mode), Some(0));
        assert_eq!(map_index(2, 5, mode), Some(2));
        assert_eq!(map_index(9, 5, mode), Some(4));
    }

    #[test]
    fn reflect101_skips_edge_sample() {
        let mode = BorderMode::Reflect101;
        let got: Vec<_> = (-4..=8).map(|i| map_index(i, 5, mode).unwrap()).collect();
        assert_eq!(got, vec![4, 3, 2, 1, 0, 1, 2, 3, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn reflect101_handles_kernels_wider_than_the_line() {
        let mode = BorderMode::Reflect101;
        for i in -20..20 {
            assert_eq!(map_index(i, 1, mode), Some(0));
            assert!(map_index(i, 2, mode).unwrap() < 2);
        }
    }

    #[test]
    fn empty_line_has_no_index() {
        assert_eq!(map_index(0, 0, BorderMode::Reflect101), None);
        assert_eq!(map_index(0, 0, BorderMode::Replicate), None);
    }

    #[test]
    fn tap_table_layout() {
        let table = tap_table(3, 3, BorderMode::Replicate);
        assert_eq!(table, vec![0, 0, 1, 0, 1, 2, 1, 2, 2]);
    }
}
