//! Cluster tree nodes: leaves built from single contigs, internal nodes
//! built from two already-rooted subtrees.
//!
//! The forest itself — which nodes exist, how they're wired, and the
//! slice-rewiring pass that turns a node's owned contig array into its
//! descendants' non-owning views — lives in [`crate::graph`]; this module
//! only knows how to build one node's data given its inputs.

/// How a node's member contig ids are stored.
///
/// Every node owns its array at the moment it is built. [`crate::graph`]'s
/// slice-rewiring pass later replaces every non-root node's storage with a
/// [`ContigsStorage::View`] into its root's array, so only roots hold an
/// owned allocation once a tree is complete.
#[derive(Debug, Default, Clone)]
pub enum ContigsStorage {
    #[default]
    Unset,
    Owned(Vec<String>),
    View { root: usize, offset: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct ClusterNode {
    pub contigs: ContigsStorage,
    pub num_contigs: usize,
    pub length: i64,
    pub sum_read_counts: Vec<i64>,
    pub arrival_rates: Vec<f64>,

    pub child1: Option<usize>,
    pub child2: Option<usize>,

    pub score: f64,
    pub model_score: f64,
    pub modeled: bool,
    pub connected: bool,
}

impl ClusterNode {
    /// A singleton cluster wrapping one contig.
    pub fn leaf(contig_id: String, modified_length: i64, sum_read_counts: Vec<i64>) -> Self {
        let length = modified_length;
        let arrival_rates = sum_read_counts.iter().map(|&count| count as f64 / length as f64).collect();

        ClusterNode {
            contigs: ContigsStorage::Owned(vec![contig_id]),
            num_contigs: 1,
            length,
            sum_read_counts,
            arrival_rates,
            child1: None,
            child2: None,
            score: 0.0,
            model_score: 0.0,
            modeled: false,
            connected: false,
        }
    }

    /// An internal node over two child roots.
    ///
    /// `contigs` must already be the concatenation of `child1`'s contig ids
    /// followed by `child2`'s, in that order — callers own the arena and are
    /// in the best position to build that vector without an extra clone.
    pub fn internal(
        child1_idx: usize,
        child2_idx: usize,
        contigs: Vec<String>,
        child1_length: i64,
        child1_sum_read_counts: &[i64],
        child2_length: i64,
        child2_sum_read_counts: &[i64],
    ) -> Self {
        let num_contigs = contigs.len();
        let length = child1_length + child2_length;

        let sum_read_counts: Vec<i64> =
            child1_sum_read_counts.iter().zip(child2_sum_read_counts).map(|(a, b)| a + b).collect();
        let arrival_rates = sum_read_counts.iter().map(|&count| count as f64 / length as f64).collect();

        ClusterNode {
            contigs: ContigsStorage::Owned(contigs),
            num_contigs,
            length,
            sum_read_counts,
            arrival_rates,
            child1: Some(child1_idx),
            child2: Some(child2_idx),
            score: 0.0,
            model_score: 0.0,
            modeled: false,
            connected: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.child1.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_computes_arrival_rate() {
        let leaf = ClusterNode::leaf("c1".to_string(), 100, vec![10, 20]);
        assert_eq!(leaf.num_contigs, 1);
        assert_eq!(leaf.arrival_rates, vec![0.1, 0.2]);
        assert!(leaf.is_leaf());
    }

    #[test]
    fn internal_concatenates_children_in_order() {
        let node = ClusterNode::internal(0, 1, vec!["a".to_string(), "b".to_string()], 100, &[10, 10], 200, &[5, 5]);
        assert_eq!(node.num_contigs, 2);
        assert_eq!(node.length, 300);
        assert_eq!(node.sum_read_counts, vec![15, 15]);
        assert_eq!(node.arrival_rates, vec![15.0 / 300.0, 15.0 / 300.0]);
        assert!(!node.is_leaf());
        match &node.contigs {
            ContigsStorage::Owned(ids) => assert_eq!(ids, &vec!["a".to_string(), "b".to_string()]),
            other => panic!("expected owned storage, got {other:?}"),
        }
    }
}
