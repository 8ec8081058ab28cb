use glam::Affine3A;

/// Dirty flags for lazy world-transform evaluation.
/// Bit i corresponds to the arena node with index i.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    words: Vec<u64>,
    len: usize,
}

impl DirtyFlags {
    /// Create with every node marked dirty
    pub fn all_dirty(len: usize) -> Self {
        let mut flags = Self {
            words: vec![0; len.div_ceil(64)],
            len,
        };
        flags.mark_all();
        flags
    }

    /// Check if a node is dirty (needs recomputation)
    #[inline]
    pub fn is_dirty(&self, node: usize) -> bool {
        node < self.len && (self.words[node / 64] & (1 << (node % 64))) != 0
    }

    /// Check if any node is dirty
    #[inline]
    pub fn is_any_dirty(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }

    #[inline]
    pub fn mark(&mut self, node: usize) {
        if node < self.len {
            self.words[node / 64] |= 1 << (node % 64);
        }
    }

    #[inline]
    pub fn clear(&mut self, node: usize) {
        if node < self.len {
            self.words[node / 64] &= !(1 << (node % 64));
        }
    }

    pub fn mark_all(&mut self) {
        for (i, word) in self.words.iter_mut().enumerate() {
            let remaining = self.len - i * 64;
            *word = if remaining >= 64 {
                u64::MAX
            } else {
                (1 << remaining) - 1
            };
        }
    }

    /// Mark `node` and all its descendants.
    ///
    /// `parents` must be topologically sorted (parents before children).
    /// A dirty node always has dirty descendants, so a single forward sweep
    /// suffices.
    pub fn mark_subtree(&mut self, node: usize, parents: impl Iterator<Item = Option<usize>>) {
        self.mark(node);
        for (i, parent) in parents.enumerate().skip(node + 1) {
            if let Some(p) = parent {
                if self.is_dirty(p) {
                    self.mark(i);
                }
            }
        }
    }
}

/// Cache for world transforms of every arena node
#[derive(Debug, Clone)]
pub struct WorldCache {
    pub world: Vec<Affine3A>,
    pub dirty: DirtyFlags,
}

impl WorldCache {
    pub fn new(len: usize) -> Self {
        Self {
            world: vec![Affine3A::IDENTITY; len],
            dirty: DirtyFlags::all_dirty(len),
        }
    }
}
