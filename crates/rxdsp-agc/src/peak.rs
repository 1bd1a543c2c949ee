//! Peak-tracking engine — sliding-window maximum over recent magnitudes
//!
//! Keeps the running maximum of the last `window` magnitude samples without
//! rescanning history. The window lives in the leaf row of a complete binary
//! max-tree stored in one flat array:
//!
//! ```text
//! index:   [0 .. leaves)                  leaf magnitudes (ring, write cursor)
//!          [leaves .. leaves + leaves/2)  pairwise maxima of the leaves
//!          ...                            further levels, halving each time
//!          [2*leaves - 2]                 root = max over the whole window
//! ```
//!
//! `leaves` is the next power of two at or above the window length, which
//! bounds the update walk at `log2(leaves)` levels and leaves slack above
//! the active window for re-seeding after a resize.
//!
//! Inserting overwrites the chronologically oldest leaf (the caller advances
//! the cursor) and recomputes ancestors upward, stopping early as soon as a
//! recomputed ancestor is unchanged: the untouched sibling subtree already
//! guarantees every level above is correct. Queries are a single array read.

use crate::error::{AgcError, AgcResult};
use crate::types::Sample;

/// Fixed-capacity sliding-window maximum of non-negative magnitudes.
pub struct PeakWindow {
    /// Flat max-tree; length `2 * leaves`
    tree: Vec<Sample>,
    /// Leaf row width (power of two, >= window)
    leaves: usize,
    /// Active window length; leaves at and above this index stay zero
    window: usize,
}

impl PeakWindow {
    /// Create a window over the last `window` samples (must be >= 1).
    ///
    /// Fails only if the backing array cannot be allocated.
    pub fn new(window: usize) -> AgcResult<Self> {
        let leaves = window.next_power_of_two().max(2);
        let len = leaves * 2;
        let mut tree = Vec::new();
        tree.try_reserve_exact(len)
            .map_err(|source| AgcError::Alloc { requested: len, source })?;
        tree.resize(len, 0.0);
        Ok(Self { tree, leaves, window })
    }

    /// Active window length in samples.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Leaf-row capacity (power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.leaves
    }

    /// Maximum magnitude over the current window. O(1).
    #[inline]
    pub fn max(&self) -> Sample {
        self.tree[self.leaves * 2 - 2]
    }

    /// Overwrite the leaf at `pos` (the caller's ring cursor, `< window`)
    /// and repair ancestors. Amortized O(1), worst case O(log leaves).
    pub fn insert(&mut self, pos: usize, mag: Sample) {
        debug_assert!(pos < self.window);
        self.tree[pos] = mag;

        let mut p = pos;
        let mut ofs = 0;
        let mut base = self.leaves;
        while base > 1 {
            let pair_max = self.tree[ofs + p].max(self.tree[ofs + (p ^ 1)]);
            p >>= 1;
            ofs += base;
            if self.tree[ofs + p] == pair_max {
                // Ancestor unchanged: the sibling subtree already accounts
                // for everything above this level.
                break;
            }
            self.tree[ofs + p] = pair_max;
            base >>= 1;
        }
    }

    /// Rebuild the whole tree from a fresh set of window magnitudes.
    ///
    /// Used when the window is re-seeded after a geometry change or an
    /// enable transition. `mags` supplies up to `window` values (positions
    /// beyond the iterator are zeroed). O(leaves).
    pub fn rebuild<I: IntoIterator<Item = Sample>>(&mut self, mags: I) {
        self.tree[..self.leaves].fill(0.0);
        for (leaf, mag) in self.tree[..self.window].iter_mut().zip(mags) {
            *leaf = mag;
        }

        let mut ofs = 0;
        let mut base = self.leaves;
        while base > 1 {
            for i in 0..base / 2 {
                self.tree[ofs + base + i] =
                    self.tree[ofs + 2 * i].max(self.tree[ofs + 2 * i + 1]);
            }
            ofs += base;
            base >>= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random magnitudes in [0, 1)
    fn lcg_sequence(len: usize, mut seed: u64) -> Vec<f32> {
        (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((seed >> 33) & 0xFFFF) as f32 / 65536.0
            })
            .collect()
    }

    /// Brute-force max over the trailing `window` inserted values
    fn brute_max(history: &[f32], window: usize) -> f32 {
        let start = history.len().saturating_sub(window);
        history[start..].iter().fold(0.0_f32, |a, &b| a.max(b))
    }

    #[test]
    fn test_matches_brute_force_over_long_stream() {
        // Non-power-of-two window exercises the slack leaves
        let window = 37;
        let mut pw = PeakWindow::new(window).unwrap();
        assert_eq!(pw.capacity(), 64);

        let stream = lcg_sequence(1000, 12345);
        let mut pos = 0;
        for i in 0..stream.len() {
            pw.insert(pos, stream[i]);
            pos = (pos + 1) % window;
            let expected = brute_max(&stream[..=i], window);
            assert_eq!(
                pw.max(),
                expected,
                "window max wrong after insert {} (got {}, want {})",
                i, pw.max(), expected
            );
        }
    }

    #[test]
    fn test_peak_expires_after_window() {
        let window = 8;
        let mut pw = PeakWindow::new(window).unwrap();
        let mut pos = 0;
        let mut push = |pw: &mut PeakWindow, mag: f32| {
            pw.insert(pos, mag);
            pos = (pos + 1) % window;
        };

        push(&mut pw, 1.0);
        for _ in 0..window - 1 {
            push(&mut pw, 0.1);
            assert_eq!(pw.max(), 1.0, "peak still inside the window");
        }
        // The next insert overwrites the 1.0 leaf
        push(&mut pw, 0.1);
        assert_eq!(pw.max(), 0.1);
    }

    #[test]
    fn test_zero_magnitude_is_valid() {
        let mut pw = PeakWindow::new(4).unwrap();
        for pos in 0..4 {
            pw.insert(pos, 0.0);
        }
        assert_eq!(pw.max(), 0.0);
    }

    #[test]
    fn test_rebuild_from_history() {
        let mut pw = PeakWindow::new(6).unwrap();
        pw.rebuild([0.2, 0.9, 0.1, 0.4, 0.0, 0.3]);
        assert_eq!(pw.max(), 0.9);

        // Rebuild with fewer values than the window zeroes the rest
        pw.rebuild([0.5]);
        assert_eq!(pw.max(), 0.5);
    }

    #[test]
    fn test_minimum_window() {
        let mut pw = PeakWindow::new(1).unwrap();
        assert_eq!(pw.capacity(), 2);
        pw.insert(0, 0.7);
        assert_eq!(pw.max(), 0.7);
        pw.insert(0, 0.2);
        assert_eq!(pw.max(), 0.2);
    }
}
