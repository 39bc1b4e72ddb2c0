//! Resynchronisation of a camera's observation streams

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Bring the three streams drained from one camera to the same length.
///
/// The newest entries are discarded from whichever streams are longest until all three match
/// the shortest. This assumes the extra entries are unpaired and the shortest stream's timestamps
/// are authoritative. It is a heuristic and valid detections can be discarded under load.
/// Mispaired entries are still caught by the timestamp check on each triple.
///
/// After resynchronisation entries are paired by position. Returns the number of entries
/// discarded.
pub fn resync<A, B, C>(tvecs: &mut Vec<A>, rvecs: &mut Vec<B>, ids: &mut Vec<C>) -> usize {
    let len = tvecs.len().min(rvecs.len()).min(ids.len());
    let dropped = tvecs.len() + rvecs.len() + ids.len() - 3 * len;

    tvecs.truncate(len);
    rvecs.truncate(len);
    ids.truncate(len);

    dropped
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resync_lengths() {
        let mut t = vec![1, 2, 3];
        let mut r = vec![1, 2];
        let mut i = vec![1, 2, 3];

        assert_eq!(resync(&mut t, &mut r, &mut i), 2);
        assert_eq!(t.len(), 2);
        assert_eq!(r.len(), 2);
        assert_eq!(i.len(), 2);

        // Oldest entries kept
        assert_eq!(t, vec![1, 2]);
    }

    #[test]
    fn test_resync_noop_and_empty() {
        let mut t = vec![1.0];
        let mut r = vec![2.0];
        let mut i = vec![3];
        assert_eq!(resync(&mut t, &mut r, &mut i), 0);
        assert_eq!(t.len(), 1);

        let mut t: Vec<f64> = vec![];
        let mut r = vec![2.0, 3.0];
        let mut i = vec![3];
        assert_eq!(resync(&mut t, &mut r, &mut i), 3);
        assert!(r.is_empty() && i.is_empty());
    }
}
