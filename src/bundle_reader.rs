//! Scaffold-bundle ("Opera bundle") reader and post-clustering filter (C3
//! input / C6 output side-channel, out of core scope per spec §1).
//!
//! Lines whose two contig ids are both known become a deduplicated [`Edge`]
//! in the shared [`EdgeQueue`]; any other line (unknown id, or one that
//! doesn't even parse into the expected shape) is echoed verbatim to a
//! `skipped_*` file. After clustering, [`filter_bundle`] re-reads each bundle
//! and echoes a line verbatim to `filtered_*` iff both contigs ended up in
//! the same maximal-connected cluster.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::contig::ContigMap;
use crate::edge::{Edge, EdgeQueue};
use crate::error::{Result, SigmaError};

/// Reads one scaffold-bundle file, inserting a deduplicated [`Edge`] per line
/// whose two contig ids are both known, and echoing every other line
/// verbatim to `skipped_path`.
pub fn read_bundle(
    path: impl AsRef<Path>,
    contigs: &ContigMap,
    edges: &mut EdgeQueue,
    skipped_path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let skipped_path = skipped_path.as_ref();

    let text = std::fs::read_to_string(path).map_err(|e| SigmaError::io(path, e))?;
    let mut skipped = File::create(skipped_path).map_err(|e| SigmaError::io(skipped_path, e))?;

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        match parse_bundle_line(line) {
            Some((id1, id2, distance)) if contigs.contains_key(id1) && contigs.contains_key(id2) => {
                edges.insert(Edge::new(id1, id2, distance));
            }
            _ => {
                writeln!(skipped, "{line}").map_err(|e| SigmaError::io(skipped_path, e))?;
            }
        }
    }

    Ok(())
}

/// Re-reads `path` after clustering and echoes a line verbatim to
/// `filtered_path` iff both of its contig ids appear in `cluster_of` under
/// the same cluster id.
pub fn filter_bundle(path: impl AsRef<Path>, filtered_path: impl AsRef<Path>, cluster_of: &HashMap<&str, usize>) -> Result<()> {
    let path = path.as_ref();
    let filtered_path = filtered_path.as_ref();

    let text = std::fs::read_to_string(path).map_err(|e| SigmaError::io(path, e))?;
    let mut filtered = File::create(filtered_path).map_err(|e| SigmaError::io(filtered_path, e))?;

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        let Some((id1, id2, _)) = parse_bundle_line(line) else { continue };

        if let (Some(&c1), Some(&c2)) = (cluster_of.get(id1), cluster_of.get(id2)) {
            if c1 == c2 {
                writeln!(filtered, "{line}").map_err(|e| SigmaError::io(filtered_path, e))?;
            }
        }
    }

    Ok(())
}

/// `ID1<TAB>O1<TAB>ID2<TAB>O2<TAB>dist<TAB>stdev<TAB>size`. Only the ids and
/// `dist` feed graph construction; `dist` is rounded to the nearest base,
/// since scaffolders report a real-valued gap estimate but the ranking key
/// only needs ascending order (see DESIGN.md on `Edge::computeDistance`).
fn parse_bundle_line(line: &str) -> Option<(&str, &str, i64)> {
    let mut fields = line.split('\t');
    let id1 = fields.next()?;
    let _orientation1 = fields.next()?;
    let id2 = fields.next()?;
    let _orientation2 = fields.next()?;
    let dist: f64 = fields.next()?.parse().ok()?;
    Some((id1, id2, dist.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contig::Contig;

    fn contigs_with(ids: &[&str]) -> ContigMap {
        let mut contigs = ContigMap::new();
        for &id in ids {
            contigs.insert(id.to_string(), Contig::new(id, 1000, 0, 0, 1));
        }
        contigs
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sigma-bundle-test-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn known_pair_becomes_an_edge() {
        let dir = scratch_dir("known");
        let bundle_path = dir.join("b.bundle");
        std::fs::write(&bundle_path, "a\tEB\tb\tBE\t120\t10\t3\n").unwrap();

        let contigs = contigs_with(&["a", "b"]);
        let mut edges = EdgeQueue::new();
        read_bundle(&bundle_path, &contigs, &mut edges, dir.join("skipped")).unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges.pop(), Some(("a".to_string(), "b".to_string())));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_pair_is_skipped_to_side_channel() {
        let dir = scratch_dir("unknown");
        let bundle_path = dir.join("b.bundle");
        std::fs::write(&bundle_path, "a\tEB\tmissing\tBE\t120\t10\t3\n").unwrap();

        let contigs = contigs_with(&["a"]);
        let mut edges = EdgeQueue::new();
        let skipped_path = dir.join("skipped");
        read_bundle(&bundle_path, &contigs, &mut edges, &skipped_path).unwrap();

        assert!(edges.is_empty());
        let skipped_text = std::fs::read_to_string(&skipped_path).unwrap();
        assert_eq!(skipped_text, "a\tEB\tmissing\tBE\t120\t10\t3\n");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn filter_keeps_only_same_cluster_pairs() {
        let dir = scratch_dir("filter");
        let bundle_path = dir.join("b.bundle");
        std::fs::write(&bundle_path, "a\tEB\tb\tBE\t120\t10\t3\na\tEB\tc\tBE\t50\t5\t2\n").unwrap();

        let mut cluster_of = HashMap::new();
        cluster_of.insert("a", 1usize);
        cluster_of.insert("b", 1usize);
        cluster_of.insert("c", 2usize);

        let filtered_path = dir.join("filtered");
        filter_bundle(&bundle_path, &filtered_path, &cluster_of).unwrap();

        let filtered_text = std::fs::read_to_string(&filtered_path).unwrap();
        assert_eq!(filtered_text, "a\tEB\tb\tBE\t120\t10\t3\n");

        std::fs::remove_dir_all(&dir).ok();
    }
}
