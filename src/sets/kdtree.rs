// ============================================================================
// KD-Tree
// Static spatial index for nearest-sample queries over irregular domains
// ============================================================================
//
// Nodes live in a left-complete (Eytzinger) array: the children of node `i`
// are `2i + 1` and `2i + 2`, and the split axis is the node depth modulo the
// dimension. Point coordinates are stored permuted alongside the nodes.
// ============================================================================

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Candidate neighbour ordered by squared distance (max-heap on top).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    distance_sq: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance_sq == other.distance_sq
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq.total_cmp(&other.distance_sq)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KdTree {
    /// Original sample index per tree node
    nodes: Vec<usize>,
    /// Node coordinates, `dimension` values per node
    points: Vec<f64>,
    dimension: usize,
}

impl KdTree {
    /// Build from column-major samples (`columns[axis][sample]`).
    pub(crate) fn new(columns: &[Vec<f64>]) -> Self {
        let dimension = columns.len();
        let n = columns.first().map_or(0, Vec::len);
        let mut flat = vec![0.0; n * dimension];
        for (axis, column) in columns.iter().enumerate() {
            for (i, v) in column.iter().enumerate() {
                flat[i * dimension + axis] = *v;
            }
        }
        let mut indices: Vec<usize> = (0..n).collect();
        let mut nodes = vec![0; n];
        let mut points = vec![0.0; n * dimension];
        if dimension > 0 {
            build(&flat, dimension, &mut indices, 0, &mut nodes, &mut points, 0);
        }
        Self {
            nodes,
            points,
            dimension,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The `k` samples nearest to `query` as `(sample index, distance)`,
    /// closest first. `exclude` skips one sample index.
    pub(crate) fn nearest(
        &self,
        query: &[f64],
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<(usize, f64)> {
        if k == 0 || self.nodes.is_empty() || query.len() != self.dimension {
            return Vec::new();
        }
        let d = self.dimension;
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        let mut stack = vec![0usize];

        while let Some(node) = stack.pop() {
            let axis = depth_of(node) % d;
            let point = &self.points[node * d..node * d + d];

            if exclude != Some(self.nodes[node]) {
                let distance_sq: f64 =
                    point.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
                if heap.len() < k {
                    heap.push(Candidate {
                        index: self.nodes[node],
                        distance_sq,
                    });
                } else if heap.peek().is_some_and(|top| distance_sq < top.distance_sq) {
                    heap.pop();
                    heap.push(Candidate {
                        index: self.nodes[node],
                        distance_sq,
                    });
                }
            }

            let left = 2 * node + 1;
            let right = left + 1;
            if left >= self.nodes.len() {
                continue;
            }
            let diff = query[axis] - point[axis];
            let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };

            let bound = heap.peek().map_or(f64::INFINITY, |top| top.distance_sq);
            if far < self.nodes.len() && (heap.len() < k || diff * diff < bound) {
                stack.push(far);
            }
            if near < self.nodes.len() {
                stack.push(near);
            }
        }

        let mut found: Vec<(usize, f64)> = heap
            .into_iter()
            .map(|c| (c.index, c.distance_sq.sqrt()))
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        found
    }
}

#[inline]
fn depth_of(node: usize) -> usize {
    (usize::BITS - (node + 1).leading_zeros() - 1) as usize
}

fn build(
    flat: &[f64],
    dims: usize,
    indices: &mut [usize],
    depth: usize,
    nodes: &mut [usize],
    points: &mut [f64],
    current: usize,
) {
    if indices.is_empty() {
        return;
    }
    let axis = depth % dims;
    let median = left_subtree_size(indices.len());
    if median < indices.len() {
        indices.select_nth_unstable_by(median, |&a, &b| {
            flat[a * dims + axis].total_cmp(&flat[b * dims + axis])
        });
    }
    let sample = indices[median];
    nodes[current] = sample;
    points[current * dims..current * dims + dims]
        .copy_from_slice(&flat[sample * dims..sample * dims + dims]);

    let (left, rest) = indices.split_at_mut(median);
    build(flat, dims, left, depth + 1, nodes, points, 2 * current + 1);
    build(flat, dims, &mut rest[1..], depth + 1, nodes, points, 2 * current + 2);
}

/// Nodes in the left subtree of a left-complete binary tree of `n` nodes.
fn left_subtree_size(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let h = (usize::BITS - n.leading_zeros() - 1) as usize;
    let capacity = 1usize << h;
    let last_level = n - (capacity - 1);
    (capacity / 2 - 1) + last_level.min(capacity / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(columns: &[Vec<f64>], query: &[f64], k: usize) -> Vec<usize> {
        let n = columns[0].len();
        let mut all: Vec<(usize, f64)> = (0..n)
            .map(|i| {
                let d: f64 = columns.iter().zip(query).map(|(c, q)| (c[i] - q) * (c[i] - q)).sum();
                (i, d)
            })
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        all.into_iter().take(k).map(|(i, _)| i).collect()
    }

    #[test]
    fn test_left_subtree_size() {
        assert_eq!(left_subtree_size(1), 0);
        assert_eq!(left_subtree_size(2), 1);
        assert_eq!(left_subtree_size(3), 1);
        assert_eq!(left_subtree_size(6), 3);
        assert_eq!(left_subtree_size(7), 3);
    }

    #[test]
    fn test_matches_brute_force() {
        let xs: Vec<f64> = (0..97).map(|i| ((i * 37) % 101) as f64 * 0.13).collect();
        let ys: Vec<f64> = (0..97).map(|i| ((i * 53) % 89) as f64 * 0.29).collect();
        let columns = vec![xs, ys];
        let tree = KdTree::new(&columns);
        assert_eq!(tree.len(), 97);
        for query in [[0.0, 0.0], [5.1, 12.3], [13.0, 25.0], [7.7, 1.2]] {
            let got: Vec<usize> =
                tree.nearest(&query, 3, None).into_iter().map(|(i, _)| i).collect();
            assert_eq!(got, brute_force(&columns, &query, 3));
        }
    }

    #[test]
    fn test_exclude_and_empty() {
        let columns = vec![vec![0.0, 1.0, 2.0]];
        let tree = KdTree::new(&columns);
        let found = tree.nearest(&[1.0], 1, Some(1));
        assert_eq!(found.len(), 1);
        assert!((found[0].1 - 1.0).abs() < 1e-12);
        assert!(KdTree::new(&[Vec::new()]).nearest(&[0.0], 2, None).is_empty());
    }
}
