//! Assembler contig-file readers (C1 input, out of core scope per spec §1):
//! SOAPdenovo and Velvet header dialects.
//!
//! Both dialects only care about each record's header line; sequence body
//! lines are skipped outright. A header line that doesn't match the selected
//! dialect's shape is skipped silently rather than treated as an error.

use std::path::Path;

use crate::contig::{Contig, ContigMap};
use crate::error::{Result, SigmaError};

/// Which assembler produced the contig file, selecting the header dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContigFileType {
    SoapDenovo,
    Velvet,
}

impl ContigFileType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "SOAPdenovo" => Ok(ContigFileType::SoapDenovo),
            "Velvet" => Ok(ContigFileType::Velvet),
            other => Err(SigmaError::Config { key: "contigs_file_type", value: other.to_string() }),
        }
    }
}

/// Reads a contig file into a [`ContigMap`], dropping contigs shorter than
/// `contig_len_thr` and allocating each surviving contig's read-count matrix
/// for `num_samples` samples.
pub fn read_contigs(
    path: impl AsRef<Path>,
    file_type: ContigFileType,
    contig_len_thr: i64,
    contig_edge_len: i64,
    contig_window_len: i64,
    num_samples: usize,
) -> Result<ContigMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SigmaError::io(path, e))?;

    let mut contigs = ContigMap::new();

    for line in text.lines() {
        if !line.starts_with('>') {
            continue;
        }

        let header = match file_type {
            ContigFileType::SoapDenovo => parse_soapdenovo_header(line),
            ContigFileType::Velvet => parse_velvet_header(line),
        };

        let Some((id, length)) = header else { continue };

        if length < contig_len_thr {
            continue;
        }

        contigs.insert(id.clone(), Contig::new(id, length, contig_edge_len, contig_window_len, num_samples));
    }

    Ok(contigs)
}

/// `>ID length LEN cvg_C_tip_T`: the id token, a skipped token, the integer
/// length, and a final skipped token.
fn parse_soapdenovo_header(line: &str) -> Option<(String, i64)> {
    let rest = line.strip_prefix('>')?;
    let mut fields = rest.split_whitespace();
    let id = fields.next()?.to_string();
    let _cvg_marker = fields.next()?;
    let length: i64 = fields.next()?.parse().ok()?;
    Some((id, length))
}

/// `>NODE_ID_length_LEN_cov_C`: the id is the whole token after `>`, and the
/// length is the id's 4th underscore-delimited field.
fn parse_velvet_header(line: &str) -> Option<(String, i64)> {
    let rest = line.strip_prefix('>')?;
    let id = rest.split_whitespace().next()?.to_string();
    let length: i64 = id.split('_').nth(3)?.parse().ok()?;
    Some((id, length))
}
