//! Contig geometry, per-sample read-count table, and the persisted-snapshot
//! format that lets a run skip re-counting reads.
//!
//! A `Contig` owns its own window geometry and read-count matrix; its
//! membership in a cluster is tracked externally by
//! [`crate::graph::ClusterGraph`] rather than on the contig itself.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, SigmaError};

/// Window geometry derived from a contig's length, edge trim, and window
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub num_windows: usize,
    pub left_edge: i64,
    pub right_edge: i64,
}

impl WindowGeometry {
    pub fn compute(length: i64, edge_len: i64, window_len: i64) -> Self {
        if window_len > 0 {
            let num_windows = ((length - 2 * edge_len) / window_len).max(0) as usize;
            let remainder = length - num_windows as i64 * window_len;
            let left_edge = remainder / 2;
            let right_edge = length - 1 - (remainder - left_edge);
            WindowGeometry { num_windows, left_edge, right_edge }
        } else {
            WindowGeometry {
                num_windows: 1,
                left_edge: edge_len,
                right_edge: length - 1 - edge_len,
            }
        }
    }
}

/// A single assembled contig: its geometry and per-sample window read counts.
///
/// There is no cluster back-pointer on this struct — a cluster holding both
/// owned contig ids and a back-pointer into itself is awkward under Rust's
/// ownership rules, so the final partition is instead produced directly by
/// a traversal in [`crate::graph::ClusterGraph`].
#[derive(Debug, Clone)]
pub struct Contig {
    pub id: String,
    pub length: i64,
    pub left_edge: i64,
    pub right_edge: i64,
    pub num_windows: usize,
    pub sum_read_counts: Vec<i64>,
    pub read_counts: Vec<Vec<i64>>,
}

impl Contig {
    /// Constructs a contig, deriving window geometry from `length`, and
    /// allocates a zeroed read-count matrix for `num_samples` samples.
    pub fn new(id: impl Into<String>, length: i64, edge_len: i64, window_len: i64, num_samples: usize) -> Self {
        let geometry = WindowGeometry::compute(length, edge_len, window_len);
        Self::from_geometry(id, length, geometry, num_samples)
    }

    /// Reconstructs a contig from a persisted snapshot row, where geometry
    /// was already computed on a prior run.
    pub fn from_snapshot_header(id: impl Into<String>, length: i64, left_edge: i64, right_edge: i64, num_windows: usize, num_samples: usize) -> Self {
        Self::from_geometry(id, length, WindowGeometry { num_windows, left_edge, right_edge }, num_samples)
    }

    fn from_geometry(id: impl Into<String>, length: i64, geometry: WindowGeometry, num_samples: usize) -> Self {
        Contig {
            id: id.into(),
            length,
            left_edge: geometry.left_edge,
            right_edge: geometry.right_edge,
            num_windows: geometry.num_windows,
            sum_read_counts: vec![0; num_samples],
            read_counts: vec![vec![0; geometry.num_windows]; num_samples],
        }
    }

    pub fn modified_length(&self) -> i64 {
        self.right_edge - self.left_edge + 1
    }

    /// Increments the read count of the window containing `pos` (already
    /// 0-based) for `sample`, if `pos` falls within the scored region.
    pub fn record_read(&mut self, sample: usize, pos: i64, window_len: i64) {
        if pos < self.left_edge || pos > self.right_edge {
            return;
        }

        let window_index = if window_len > 0 { ((pos - self.left_edge) / window_len) as usize } else { 0 };

        self.read_counts[sample][window_index] += 1;
    }

    /// Sums a single sample's window counts into `sum_read_counts[sample]`.
    /// Called once per sample after all of that sample's reads have been
    /// recorded.
    pub fn finalize_sums(&mut self, sample: usize) {
        self.sum_read_counts[sample] = self.read_counts[sample].iter().sum();
    }
}

pub type ContigMap = BTreeMap<String, Contig>;

/// Computes the empirical variance-to-mean ratio used when
/// `pdist_type = NegativeBinomial` and the configured `vmr <= 1.0`.
///
/// Restricted to contigs of length `>= 10_000`, population mean/variance per
/// (contig, sample), and the lower-median of the resulting ratios.
pub fn compute_empirical_vmr(contigs: &ContigMap, num_samples: usize) -> f64 {
    let mut vmrs = Vec::new();

    for contig in contigs.values() {
        if contig.length < 10_000 {
            continue;
        }

        for sample in 0..num_samples {
            let counts = &contig.read_counts[sample];
            let n = counts.len() as f64;

            let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / n;
            if mean == 0.0 {
                // No reads at all in this contig/sample: variance/mean is 0/0,
                // not a ratio this contig can contribute to the estimate.
                continue;
            }
            let variance = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;

            vmrs.push(variance / mean);
        }
    }

    vmrs.sort_by(|a, b| a.partial_cmp(b).expect("variance/mean ratios are finite once mean != 0.0"));
    vmrs[vmrs.len() / 2]
}

/// Header line of a persisted snapshot: `num_samples contig_len_thr contig_edge_len contig_window_len`.
pub struct SnapshotHeader {
    pub num_samples: usize,
    pub contig_len_thr: i64,
    pub contig_edge_len: i64,
    pub contig_window_len: i64,
}

/// Writes the persisted contig snapshot: a header line of run parameters,
/// then per contig a geometry line followed by a sum line and a
/// space-separated window-counts line for each sample.
pub fn save_contigs(path: impl AsRef<Path>, contigs: &ContigMap, header: &SnapshotHeader) -> Result<()> {
    let path = path.as_ref();
    let mut out = std::fs::File::create(path).map_err(|e| SigmaError::io(path, e))?;

    writeln!(
        out,
        "{} {} {} {}",
        header.num_samples, header.contig_len_thr, header.contig_edge_len, header.contig_window_len
    )
    .map_err(|e| SigmaError::io(path, e))?;

    for contig in contigs.values() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            contig.id, contig.length, contig.left_edge, contig.right_edge, contig.num_windows
        )
        .map_err(|e| SigmaError::io(path, e))?;

        for sample in 0..header.num_samples {
            writeln!(out, "{}", contig.sum_read_counts[sample]).map_err(|e| SigmaError::io(path, e))?;

            let counts: Vec<String> = contig.read_counts[sample].iter().map(|c| c.to_string()).collect();
            writeln!(out, "{}", counts.join(" ")).map_err(|e| SigmaError::io(path, e))?;
        }
    }

    Ok(())
}

/// Loads a persisted contig snapshot, reproducing [`save_contigs`]'s layout.
pub fn load_contigs(path: impl AsRef<Path>) -> Result<(SnapshotHeader, ContigMap)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SigmaError::io(path, e))?;
    let mut lines = text.lines();

    let header_line = lines.next().ok_or_else(|| SigmaError::MalformedSnapshot { reason: "empty file".to_string() })?;
    let mut header_fields = header_line.split_whitespace();
    let header = SnapshotHeader {
        num_samples: parse_field(&mut header_fields, "num_samples")?,
        contig_len_thr: parse_field(&mut header_fields, "contig_len_thr")?,
        contig_edge_len: parse_field(&mut header_fields, "contig_edge_len")?,
        contig_window_len: parse_field(&mut header_fields, "contig_window_len")?,
    };

    let mut contigs = ContigMap::new();

    loop {
        let Some(header_line) = lines.next() else { break };
        if header_line.is_empty() {
            continue;
        }

        let mut fields = header_line.split('\t');
        let id = fields.next().ok_or_else(|| snapshot_err("missing contig id"))?.to_string();
        let length: i64 = parse_field(&mut fields, "length")?;
        let left_edge: i64 = parse_field(&mut fields, "left_edge")?;
        let right_edge: i64 = parse_field(&mut fields, "right_edge")?;
        let num_windows: usize = parse_field(&mut fields, "num_windows")?;

        let mut contig = Contig::from_snapshot_header(id.clone(), length, left_edge, right_edge, num_windows, header.num_samples);

        for sample in 0..header.num_samples {
            let sum_line = lines.next().ok_or_else(|| snapshot_err("missing sum_read_counts line"))?;
            contig.sum_read_counts[sample] = sum_line.trim().parse().map_err(|_| snapshot_err("invalid sum_read_counts"))?;

            let counts_line = lines.next().ok_or_else(|| snapshot_err("missing read_counts line"))?;
            let counts: Vec<i64> = counts_line
                .split_whitespace()
                .map(|s| s.parse().map_err(|_| snapshot_err("invalid read_counts")))
                .collect::<Result<_>>()?;

            if counts.len() != num_windows {
                return Err(snapshot_err("read_counts length does not match num_windows"));
            }

            contig.read_counts[sample] = counts;
        }

        contigs.insert(id, contig);
    }

    Ok((header, contigs))
}

fn parse_field<'a, T: std::str::FromStr>(fields: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<T> {
    fields
        .next()
        .ok_or_else(|| snapshot_err(&format!("missing {name}")))?
        .parse()
        .map_err(|_| snapshot_err(&format!("invalid {name}")))
}

fn snapshot_err(reason: &str) -> SigmaError {
    SigmaError::MalformedSnapshot { reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_geometry_matches_spec_examples() {
        let g = WindowGeometry::compute(2000, 0, 0);
        assert_eq!(g.num_windows, 1);
        assert_eq!(g.left_edge, 0);
        assert_eq!(g.right_edge, 1999);

        let g = WindowGeometry::compute(1000, 10, 100);
        assert_eq!(g.num_windows, 9);
        let used = g.right_edge - g.left_edge + 1;
        assert!(used >= g.num_windows as i64 * 100);
        assert!(g.num_windows as i64 * 100 <= 1000 - 2 * 10);
    }

    #[test]
    fn record_read_buckets_into_correct_window() {
        let mut contig = Contig::new("c1", 1000, 0, 100, 1);
        contig.record_read(0, 250, 100);
        assert_eq!(contig.read_counts[0][2], 1);
        contig.finalize_sums(0);
        assert_eq!(contig.sum_read_counts[0], 1);
    }

    #[test]
    fn record_read_outside_scored_region_is_ignored() {
        let mut contig = Contig::new("c1", 1000, 10, 0, 1);
        contig.record_read(0, 5, 0);
        contig.finalize_sums(0);
        assert_eq!(contig.sum_read_counts[0], 0);
    }

    #[test]
    fn sum_law_holds_after_recording() {
        let mut contig = Contig::new("c1", 500, 0, 0, 1);
        for pos in [0, 10, 499, 250, 250] {
            contig.record_read(0, pos, 0);
        }
        contig.finalize_sums(0);
        let window_sum: i64 = contig.read_counts[0].iter().sum();
        assert_eq!(contig.sum_read_counts[0], window_sum);
    }

    #[test]
    fn empirical_vmr_is_median_of_per_sample_ratios() {
        // S5: three 20_000-length contigs with per-window variance/mean of 4/2, 9/3, 16/4.
        let mut contigs = ContigMap::new();

        let make = |id: &str, counts: Vec<i64>| {
            let mut c = Contig::new(id, 20_000, 0, 1000, 1);
            c.read_counts[0] = counts;
            c
        };

        // mean 2, variance 4 over 4 windows: e.g. [0, 0, 4, 4] -> mean 2, var ((2^2)*4)/4=4
        contigs.insert("a".to_string(), make("a", vec![0, 0, 4, 4]));
        // mean 3, variance 9: [0, 0, 6, 6] -> mean 3, deviations -3,-3,3,3 -> var 9
        contigs.insert("b".to_string(), make("b", vec![0, 0, 6, 6]));
        // mean 4, variance 16: [0, 0, 8, 8] -> mean 4, deviations -4,-4,4,4 -> var 16
        contigs.insert("c".to_string(), make("c", vec![0, 0, 8, 8]));

        let vmr = compute_empirical_vmr(&contigs, 1);
        assert!((vmr - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empirical_vmr_ignores_zero_mean_contigs_instead_of_panicking() {
        let mut contigs = ContigMap::new();

        let make = |id: &str, counts: Vec<i64>| {
            let mut c = Contig::new(id, 20_000, 0, 1000, 1);
            c.read_counts[0] = counts;
            c
        };

        // zero reads everywhere: mean 0, variance/mean would be 0/0 = NaN.
        contigs.insert("zero".to_string(), make("zero", vec![0, 0, 0, 0]));
        contigs.insert("b".to_string(), make("b", vec![0, 0, 6, 6]));

        let vmr = compute_empirical_vmr(&contigs, 1);
        assert!((vmr - 9.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = std::env::temp_dir().join(format!("sigma-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.txt");

        let mut contigs = ContigMap::new();
        let mut c = Contig::new("contig_1", 1000, 0, 100, 2);
        c.record_read(0, 5, 100);
        c.record_read(1, 250, 100);
        c.finalize_sums(0);
        c.finalize_sums(1);
        contigs.insert(c.id.clone(), c);

        let header = SnapshotHeader { num_samples: 2, contig_len_thr: 500, contig_edge_len: 0, contig_window_len: 100 };
        save_contigs(&path, &contigs, &header).unwrap();

        let (loaded_header, loaded_contigs) = load_contigs(&path).unwrap();
        assert_eq!(loaded_header.num_samples, 2);
        let loaded = &loaded_contigs["contig_1"];
        let original = &contigs["contig_1"];
        assert_eq!(loaded.length, original.length);
        assert_eq!(loaded.left_edge, original.left_edge);
        assert_eq!(loaded.right_edge, original.right_edge);
        assert_eq!(loaded.num_windows, original.num_windows);
        assert_eq!(loaded.sum_read_counts, original.sum_read_counts);
        assert_eq!(loaded.read_counts, original.read_counts);

        std::fs::remove_dir_all(&dir).ok();
    }
}
