//! Disjoint-set forest over block ids.
//!
//! Parent and rank live in two flat arrays; `find` uses iterative path
//! halving, so deep chains never recurse.

pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Root of the set containing `i`.
    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            let grandparent = self.parent[self.parent[i]];
            self.parent[i] = grandparent;
            i = grandparent;
        }
        i
    }

    /// Merge the sets of `a` and `b` by rank.
    ///
    /// Returns the surviving root and the absorbed root, or `None` when
    /// both were already in the same set.
    pub fn union(&mut self, a: usize, b: usize) -> Option<(usize, usize)> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return None;
        }

        let (root, child) = if self.rank[ra] >= self.rank[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[child] = root;
        if self.rank[root] == self.rank[child] {
            self.rank[root] = self.rank[root].saturating_add(1);
        }
        Some((root, child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut set = DisjointSet::new(4);
        for i in 0..4 {
            assert_eq!(set.find(i), i);
        }
    }

    #[test]
    fn test_union_connects() {
        let mut set = DisjointSet::new(5);
        assert!(set.union(0, 1).is_some());
        assert!(set.union(3, 4).is_some());
        assert!(set.union(1, 0).is_none());

        assert_eq!(set.find(0), set.find(1));
        assert_eq!(set.find(3), set.find(4));
        assert_ne!(set.find(0), set.find(3));
        assert_eq!(set.find(2), 2);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let n = 200_000;
        let mut set = DisjointSet::new(n);
        for i in 1..n {
            set.union(i - 1, i);
        }
        let root = set.find(0);
        assert_eq!(set.find(n - 1), root);
    }
}
