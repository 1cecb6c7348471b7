//! Line-oriented `key = value` configuration file reader.
//!
//! This module is intentionally dumb: it has no knowledge of the cluster
//! graph engine, it only produces a typed [`RunConfig`] that the rest of
//! the pipeline consumes. Unknown keys are ignored; missing keys fall back
//! to per-type defaults (`-1` for ints, `-1.0` for reals, `"-"` for
//! strings, empty for lists) exactly as spec'd.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, SigmaError};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub contigs_file_type: String,

    pub contigs_file: String,
    pub mapping_files: Vec<String>,
    pub edges_files: Vec<String>,

    pub sigma_contigs_file: String,

    pub output_dir: String,
    pub skipped_edges_files: Vec<String>,
    pub filtered_edges_files: Vec<String>,
    pub clusters_file: String,

    pub num_samples: usize,

    pub contig_len_thr: i64,
    pub contig_edge_len: i64,
    pub contig_window_len: i64,

    pub pdist_type: String,

    pub vmr: f64,
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SigmaError::io(path, e))?;
        let params = parse_params(&text);
        Ok(Self::from_params(&params))
    }

    fn from_params(params: &HashMap<String, String>) -> Self {
        let contigs_file_type = get_string(params, "contigs_file_type");

        let contigs_file = get_string(params, "contigs_file");
        let mapping_files = get_vector(params, "mapping_files");
        let edges_files = get_vector(params, "edges_files");

        let sigma_contigs_file = get_string(params, "sigma_contigs_file");

        let output_dir = get_string(params, "output_dir");

        let (skipped_edges_files, filtered_edges_files) = edges_files
            .iter()
            .map(|file_path| {
                let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
                (
                    format!("{output_dir}/skipped_{file_name}"),
                    format!("{output_dir}/filtered_{file_name}"),
                )
            })
            .unzip();

        let clusters_file = format!("{output_dir}/clusters");

        let num_samples = mapping_files.len();

        let mut contig_len_thr = get_int(params, "contig_len_thr");
        let mut contig_edge_len = get_int(params, "contig_edge_len");
        let mut contig_window_len = get_int(params, "contig_window_len");

        if contig_len_thr == -1 {
            contig_len_thr = 500;
        }
        if contig_edge_len == -1 {
            contig_edge_len = 0;
        }
        if contig_window_len == -1 {
            contig_window_len = 0;
        }

        let mut pdist_type = get_string(params, "pdist_type");
        if pdist_type == "-" {
            pdist_type = "Poisson".to_string();
        }

        let vmr = get_double(params, "vmr");

        RunConfig {
            contigs_file_type,
            contigs_file,
            mapping_files,
            edges_files,
            sigma_contigs_file,
            output_dir,
            skipped_edges_files,
            filtered_edges_files,
            clusters_file,
            num_samples,
            contig_len_thr,
            contig_edge_len,
            contig_window_len,
            pdist_type,
            vmr,
        }
    }
}

fn parse_params(text: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for raw_line in text.lines() {
        let line = match raw_line.find('#') {
            Some(comment_pos) => &raw_line[..comment_pos],
            None => raw_line,
        };

        let Some(eq_pos) = line.find('=') else { continue };

        let key = line[..eq_pos].trim();
        let value = line[eq_pos + 1..].trim();

        if key.is_empty() {
            continue;
        }

        params.insert(key.to_string(), value.to_string());
    }

    params
}

fn get_int(params: &HashMap<String, String>, key: &str) -> i64 {
    params.get(key).and_then(|v| v.parse().ok()).unwrap_or(-1)
}

fn get_double(params: &HashMap<String, String>, key: &str) -> f64 {
    params.get(key).and_then(|v| v.parse().ok()).unwrap_or(-1.0)
}

fn get_string(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_else(|| "-".to_string())
}

fn get_vector(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(value) if !value.is_empty() => value.split(',').map(|s| s.to_string()).collect(),
        _ => Vec::new(),
    }
}
