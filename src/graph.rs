//! The cluster graph: builds a forest of agglomeration trees along scaffold
//! edges, scores every node, picks connected-vs-cut per node bottom-up, and
//! hands back the final partition.
//!
//! The forest lives in a single arena (`Vec<ClusterNode>`); components are
//! tracked by contig id through a `root_of` map rather than a mutable
//! back-pointer stored on `Contig` itself.

use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::{ClusterNode, ContigsStorage};
use crate::contig::ContigMap;
use crate::distribution::ReadCountModel;
use crate::edge::EdgeQueue;

/// One line of the final partition: a maximal connected cluster node's
/// member contig ids plus the sample-0 figures the output writer reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub contig_ids: Vec<String>,
    pub sum_read_count_sample0: i64,
    pub arrival_rate_sample0: f64,
}

pub struct ClusterGraph {
    nodes: Vec<ClusterNode>,
    roots: BTreeSet<usize>,
    num_windows: usize,
}

impl ClusterGraph {
    /// Builds the forest: one leaf per contig, then one internal node per
    /// edge that unifies two distinct components. Edges are drained from
    /// the queue in priority order; edges whose endpoints are already in
    /// the same component are dropped. Finishes with the slice-rewiring
    /// pass so every node's `contigs` resolve against the arena.
    pub fn build(contigs: &ContigMap, mut edges: EdgeQueue) -> Self {
        let mut nodes = Vec::with_capacity(contigs.len());
        let mut root_of: BTreeMap<String, usize> = BTreeMap::new();
        let mut roots: BTreeSet<usize> = BTreeSet::new();
        let mut num_windows = 0usize;

        for (id, contig) in contigs.iter() {
            num_windows += contig.num_windows;

            let leaf = ClusterNode::leaf(id.clone(), contig.modified_length(), contig.sum_read_counts.clone());
            nodes.push(leaf);
            let idx = nodes.len() - 1;

            root_of.insert(id.clone(), idx);
            roots.insert(idx);
        }

        while let Some((id1, id2)) = edges.pop() {
            let (Some(&root1), Some(&root2)) = (root_of.get(&id1), root_of.get(&id2)) else {
                continue;
            };

            if root1 == root2 {
                continue;
            }

            let contigs1 = match std::mem::take(&mut nodes[root1].contigs) {
                ContigsStorage::Owned(v) => v,
                other => unreachable!("current root must own its contig array, found {other:?}"),
            };
            let contigs2 = match std::mem::take(&mut nodes[root2].contigs) {
                ContigsStorage::Owned(v) => v,
                other => unreachable!("current root must own its contig array, found {other:?}"),
            };

            let (length1, length2) = (nodes[root1].length, nodes[root2].length);
            let sums1 = nodes[root1].sum_read_counts.clone();
            let sums2 = nodes[root2].sum_read_counts.clone();

            let mut merged_ids = contigs1;
            merged_ids.extend(contigs2);

            let merged = ClusterNode::internal(root1, root2, merged_ids.clone(), length1, &sums1, length2, &sums2);
            nodes.push(merged);
            let new_idx = nodes.len() - 1;

            for id in &merged_ids {
                root_of.insert(id.clone(), new_idx);
            }

            roots.remove(&root1);
            roots.remove(&root2);
            roots.insert(new_idx);
        }

        let mut graph = ClusterGraph { nodes, roots, num_windows };
        graph.rewire_slices();
        graph
    }

    /// Pre-order pass that rewrites every internal node's children to view
    /// into the ultimate root's owned array rather than each owning a
    /// private copy. child1 takes the left `num_contigs` slots, child2 the
    /// remainder, matching the concatenation order used at merge time.
    fn rewire_slices(&mut self) {
        let mut stack: Vec<usize> = self.roots.iter().copied().collect();

        while let Some(idx) = stack.pop() {
            let (child1, child2) = (self.nodes[idx].child1, self.nodes[idx].child2);
            let (Some(c1), Some(c2)) = (child1, child2) else { continue };

            let (root, base_offset) = match &self.nodes[idx].contigs {
                ContigsStorage::Owned(_) => (idx, 0),
                ContigsStorage::View { root, offset, .. } => (*root, *offset),
                ContigsStorage::Unset => unreachable!("node must own or view contigs before rewiring"),
            };

            let c1_len = self.nodes[c1].num_contigs;
            let c2_len = self.nodes[c2].num_contigs;

            self.nodes[c1].contigs = ContigsStorage::View { root, offset: base_offset, len: c1_len };
            self.nodes[c2].contigs = ContigsStorage::View { root, offset: base_offset + c1_len, len: c2_len };

            stack.push(c1);
            stack.push(c2);
        }
    }

    fn contig_ids(&self, idx: usize) -> &[String] {
        match &self.nodes[idx].contigs {
            ContigsStorage::Owned(ids) => ids.as_slice(),
            ContigsStorage::View { root, offset, len } => match &self.nodes[*root].contigs {
                ContigsStorage::Owned(ids) => &ids[*offset..*offset + *len],
                _ => panic!("view root must own its contig array"),
            },
            ContigsStorage::Unset => &[],
        }
    }

    /// Scores every node independently against the given read-count model.
    /// Order doesn't matter: a node's score only depends on its own member
    /// contigs' raw counts and its own arrival rates, never on other nodes.
    pub fn compute_scores(
        &mut self,
        contigs: &ContigMap,
        prob_dist: &dyn ReadCountModel,
        num_samples: usize,
        contig_window_len: i64,
    ) {
        for idx in 0..self.nodes.len() {
            let score = self.compute_cluster_score(idx, contigs, prob_dist, num_samples, contig_window_len);
            self.nodes[idx].score = score;
        }
    }

    fn compute_cluster_score(
        &self,
        idx: usize,
        contigs: &ContigMap,
        prob_dist: &dyn ReadCountModel,
        num_samples: usize,
        contig_window_len: i64,
    ) -> f64 {
        let mut score = 0.0;
        let arrival_rates = &self.nodes[idx].arrival_rates;
        let member_ids = self.contig_ids(idx);

        for sample_index in 0..num_samples {
            let mut mean_read_count = 0.0;
            if contig_window_len > 0 {
                mean_read_count = arrival_rates[sample_index] * contig_window_len as f64;
            }

            for id in member_ids {
                let contig = &contigs[id];

                if contig_window_len == 0 {
                    let mean = arrival_rates[sample_index] * contig.modified_length() as f64;
                    score += prob_dist.log_pmf(mean, contig.sum_read_counts[sample_index] as f64);
                } else {
                    for &count in &contig.read_counts[sample_index] {
                        score += prob_dist.log_pmf(mean_read_count, count as f64);
                    }
                }
            }
        }

        score -= 0.5 * num_samples as f64 * (self.num_windows as f64).ln();
        score
    }

    /// Bottom-up model selection: a leaf is always connected; an internal
    /// node compares its own score against the sum of its children's
    /// already-decided model scores and keeps whichever is larger, ties
    /// favouring "connected". Requires strict post-order visitation, done
    /// here with a retry-push stack: a node is only popped once both its
    /// children report `modeled`, otherwise it's left in place and its
    /// children are pushed on top to be visited first.
    pub fn compute_models(&mut self) {
        let mut stack: Vec<usize> = self.roots.iter().copied().collect();

        while let Some(&idx) = stack.last() {
            let node = &self.nodes[idx];
            let ready = match (node.child1, node.child2) {
                (Some(c1), Some(c2)) => self.nodes[c1].modeled && self.nodes[c2].modeled,
                _ => true,
            };

            if ready {
                stack.pop();
                self.compute_cluster_model(idx);
            } else {
                let (c1, c2) = (node.child1.unwrap(), node.child2.unwrap());
                stack.push(c1);
                stack.push(c2);
            }
        }
    }

    fn compute_cluster_model(&mut self, idx: usize) {
        let node = &self.nodes[idx];
        let score = node.score;
        let children = (node.child1, node.child2);

        let (model_score, connected) = match children {
            (Some(c1), Some(c2)) => {
                let disconnected_score = self.nodes[c1].model_score + self.nodes[c2].model_score;
                if score >= disconnected_score { (score, true) } else { (disconnected_score, false) }
            }
            _ => (score, true),
        };

        self.nodes[idx].model_score = model_score;
        self.nodes[idx].connected = connected;
        self.nodes[idx].modeled = true;
    }

    /// Walks each tree from its root, descending past cut nodes, and emits
    /// one [`ClusterAssignment`] per maximal connected node. Must run after
    /// [`ClusterGraph::compute_models`].
    pub fn final_partition(&self) -> Vec<ClusterAssignment> {
        let mut assignments = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().copied().collect();

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];

            if node.connected {
                assignments.push(ClusterAssignment {
                    contig_ids: self.contig_ids(idx).to_vec(),
                    sum_read_count_sample0: node.sum_read_counts[0],
                    arrival_rate_sample0: node.arrival_rates[0],
                });
            } else {
                stack.push(node.child1.unwrap());
                stack.push(node.child2.unwrap());
            }
        }

        assignments
    }

    pub fn num_roots(&self) -> usize {
        self.roots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contig::Contig;
    use crate::distribution::PoissonModel;
    use crate::edge::Edge;

    fn contig(id: &str, length: i64, count: i64) -> Contig {
        let mut c = Contig::new(id, length, 0, 0, 1);
        c.record_read(0, 0, 0);
        for _ in 0..count {
            c.record_read(0, 0, 0);
        }
        c.finalize_sums(0);
        c
    }

    #[test]
    fn disjoint_contigs_stay_singleton_roots() {
        let mut contigs = ContigMap::new();
        contigs.insert("a".to_string(), contig("a", 100, 10));
        contigs.insert("b".to_string(), contig("b", 100, 10));

        let graph = ClusterGraph::build(&contigs, EdgeQueue::new());
        assert_eq!(graph.num_roots(), 2);
    }

    #[test]
    fn an_edge_merges_two_components_into_one_root() {
        let mut contigs = ContigMap::new();
        contigs.insert("a".to_string(), contig("a", 100, 10));
        contigs.insert("b".to_string(), contig("b", 100, 10));

        let mut edges = EdgeQueue::new();
        edges.insert(Edge::new("a", "b", 500));

        let graph = ClusterGraph::build(&contigs, edges);
        assert_eq!(graph.num_roots(), 1);

        let partition = {
            let mut graph = graph;
            let model = PoissonModel;
            graph.compute_scores(&contigs, &model, 1, 0);
            graph.compute_models();
            graph.final_partition()
        };

        let total_contigs: usize = partition.iter().map(|a| a.contig_ids.len()).sum();
        assert_eq!(total_contigs, 2);
    }

    #[test]
    fn unknown_edge_endpoints_are_ignored() {
        let mut contigs = ContigMap::new();
        contigs.insert("a".to_string(), contig("a", 100, 10));

        let mut edges = EdgeQueue::new();
        edges.insert(Edge::new("a", "missing", 10));

        let graph = ClusterGraph::build(&contigs, edges);
        assert_eq!(graph.num_roots(), 1);
    }

    #[test]
    fn very_dissimilar_contigs_stay_disconnected_after_modeling() {
        // One contig with heavy, uniform coverage and one essentially
        // uncovered: forcing them into one cluster should score far worse
        // than leaving them apart, so the model pass should cut the edge.
        let mut contigs = ContigMap::new();
        contigs.insert("a".to_string(), contig("a", 1000, 1000));
        contigs.insert("b".to_string(), contig("b", 1000, 0));

        let mut edges = EdgeQueue::new();
        edges.insert(Edge::new("a", "b", 100));

        let mut graph = ClusterGraph::build(&contigs, edges);
        let model = PoissonModel;
        graph.compute_scores(&contigs, &model, 1, 0);
        graph.compute_models();

        let partition = graph.final_partition();
        assert_eq!(partition.len(), 2);
    }
}
