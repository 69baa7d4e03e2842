//! Index-range combination generation.
//!
//! Subsets are produced in size order, and within a size in lexicographic
//! order of their index vectors: `[0] [1] [2] [0,1] [0,2] [1,2] [0,1,2]`.
//! The order depends only on `n`, never on hashing or platform.

/// Lexicographic k-combinations of `0..n`.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            indices: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        // Rightmost position that can still move right.
        let (n, k) = (self.n, self.k);
        match (0..k).rev().find(|&i| self.indices[i] < n - k + i) {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.done = true,
        }

        Some(current)
    }
}

/// Every non-empty subset of `0..n`, size 1 first.
pub fn nonempty_subsets(n: usize) -> impl Iterator<Item = Vec<usize>> {
    (1..=n).flat_map(move |k| Combinations::new(n, k))
}

/// Number of non-empty subsets of an n-element set, `2^n - 1`.
/// `None` on overflow.
pub fn subset_count(n: usize) -> Option<usize> {
    1usize.checked_shl(n as u32).map(|p| p - 1)
}
