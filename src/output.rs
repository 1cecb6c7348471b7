//! Final cluster-assignment writer (C6): one TSV row per contig.

use std::path::Path;

use csv::WriterBuilder;

use crate::error::{Result, SigmaError};
use crate::graph::ClusterAssignment;

/// Writes the `clusters` output file: one row per contig,
/// `id<TAB>cluster_id<TAB>sum_read_counts[0]<TAB>arrival_rate[0]`, with
/// `cluster_id` a 1-based integer assigned in `partition`'s visitation
/// order.
pub fn write_clusters(path: impl AsRef<Path>, partition: &[ClusterAssignment]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error_to_io(path, e))?;

    for (cluster_index, cluster) in partition.iter().enumerate() {
        let cluster_id = cluster_index + 1;

        for contig_id in &cluster.contig_ids {
            writer
                .write_record([
                    contig_id.clone(),
                    cluster_id.to_string(),
                    cluster.sum_read_count_sample0.to_string(),
                    format!("{:.6}", cluster.arrival_rate_sample0),
                ])
                .map_err(|e| csv_error_to_io(path, e))?;
        }
    }

    writer.flush().map_err(|e| SigmaError::io(path, e))?;
    Ok(())
}

fn csv_error_to_io(path: &Path, err: csv::Error) -> SigmaError {
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => SigmaError::io(path, io_err),
        other => SigmaError::io(path, std::io::Error::other(other.to_string())),
    }
}
