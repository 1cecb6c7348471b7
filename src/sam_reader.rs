//! Streams one sample's SAM alignments into a [`ContigMap`]'s read-count
//! table (C1 input, out of core scope per spec §1).
//!
//! Only RNAME (field 3) and POS (field 4, 1-based) are consumed; every other
//! SAM field is ignored. `@`-prefixed header lines are skipped; any other
//! line that doesn't carry at least RNAME and POS is a fatal
//! [`SigmaError::MalformedSam`].

use std::io::{self, BufRead, BufReader};

use crate::contig::ContigMap;
use crate::error::{Result, SigmaError};

/// Streams all alignments in `path` (or stdin if `path == "-"`) into
/// `sample`'s window counts. An alignment against a contig id absent from
/// `contigs` (e.g. one dropped by `contig_len_thr`, or an unmapped read's
/// `*`) is ignored.
pub fn read_sam_reads(path: &str, sample: usize, contigs: &mut ContigMap, contig_window_len: i64) -> Result<()> {
    let reader: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(path).map_err(|e| SigmaError::io(path, e))?))
    };

    for line in reader.lines() {
        let line = line.map_err(|e| SigmaError::io(path, e))?;

        if line.is_empty() || line.starts_with('@') {
            continue;
        }

        let mut fields = line.split('\t');
        let _qname = fields.next();
        let _flag = fields.next();
        let rname = fields.next();
        let pos_field = fields.next();

        let (Some(rname), Some(pos_field)) = (rname, pos_field) else {
            return Err(SigmaError::MalformedSam { line });
        };

        let pos: i64 = pos_field.parse().map_err(|_| SigmaError::MalformedSam { line: line.clone() })?;

        if rname == "*" {
            continue;
        }

        if let Some(contig) = contigs.get_mut(rname) {
            contig.record_read(sample, pos - 1, contig_window_len);
        }
    }

    Ok(())
}
