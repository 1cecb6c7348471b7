//! `sigma`: clusters assembly contigs by read-coverage profile across one or
//! more sequencing samples.
//!
//! Reads a single config-file path from the command line, runs the pipeline
//! to completion, and exits 0 on success or non-zero with a diagnostic on
//! stderr on any fatal error.

mod bundle_reader;
mod cluster;
mod config;
mod contig;
mod contig_reader;
mod distribution;
mod edge;
mod error;
mod graph;
mod output;
mod sam_reader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use config::RunConfig;
use contig::{compute_empirical_vmr, save_contigs, ContigMap, SnapshotHeader};
use contig_reader::ContigFileType;
use distribution::{NegativeBinomialModel, PDistType, PoissonModel, ReadCountModel};
use edge::EdgeQueue;
use error::Result;
use graph::ClusterGraph;

/// Clusters assembly contigs by read-coverage profile across scaffold-linked samples.
#[derive(Parser, Debug)]
#[command(name = "sigma", about, long_about = None)]
struct Cli {
    /// Path to the Sigma configuration file.
    config_path: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli.config_path) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(config_path: &Path) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;

    let (contigs, num_samples, contig_window_len) = load_contigs_stage(&config)?;

    let mut edges = EdgeQueue::new();
    for (edges_file, skipped_path) in config.edges_files.iter().zip(&config.skipped_edges_files) {
        log::info!("reading scaffold bundle {edges_file}");
        let started = Instant::now();
        bundle_reader::read_bundle(edges_file, &contigs, &mut edges, skipped_path)?;
        log::info!("done reading {edges_file} in {:.4} sec", started.elapsed().as_secs_f64());
    }

    log::info!("building cluster graph from {} contigs and {} edges", contigs.len(), edges.len());
    let started = Instant::now();
    let mut graph = ClusterGraph::build(&contigs, edges);
    log::info!(
        "done building cluster graph in {:.4} sec, {} roots",
        started.elapsed().as_secs_f64(),
        graph.num_roots()
    );

    let pdist_type = PDistType::parse(&config.pdist_type)?;
    let model: Box<dyn ReadCountModel> = match pdist_type {
        PDistType::Poisson => Box::new(PoissonModel),
        PDistType::NegativeBinomial => {
            let vmr = if config.vmr > 1.0 {
                config.vmr
            } else {
                log::info!("vmr <= 1.0, estimating empirical variance-to-mean ratio");
                compute_empirical_vmr(&contigs, num_samples)
            };
            Box::new(NegativeBinomialModel::new(vmr))
        }
    };

    log::info!("scoring cluster tree nodes");
    let started = Instant::now();
    graph.compute_scores(&contigs, model.as_ref(), num_samples, contig_window_len);
    log::info!("done scoring in {:.4} sec", started.elapsed().as_secs_f64());

    log::info!("running model selection");
    let started = Instant::now();
    graph.compute_models();
    log::info!("done model selection in {:.4} sec", started.elapsed().as_secs_f64());

    let partition = graph.final_partition();
    log::info!("final partition has {} clusters", partition.len());

    let cluster_of: HashMap<&str, usize> = partition
        .iter()
        .enumerate()
        .flat_map(|(index, cluster)| cluster.contig_ids.iter().map(move |id| (id.as_str(), index + 1)))
        .collect();

    for (edges_file, filtered_path) in config.edges_files.iter().zip(&config.filtered_edges_files) {
        bundle_reader::filter_bundle(edges_file, filtered_path, &cluster_of)?;
    }

    log::info!("writing clusters to {}", config.clusters_file);
    output::write_clusters(&config.clusters_file, &partition)?;

    Ok(())
}

/// Loads the snapshot (if `mapping_files` is empty) or reads contigs fresh
/// and streams every mapping file's reads into them, saving a snapshot
/// afterward unless `sigma_contigs_file == "-"`.
///
/// Returns the contigs plus the `num_samples`/`contig_window_len` that
/// actually describe them: on the snapshot-reload path these come from the
/// snapshot's own header rather than the config file, matching the
/// original's `ContigIO::load_contigs` overwriting `Sigma::num_samples` (and
/// the other run parameters) from the snapshot it just read.
fn load_contigs_stage(config: &RunConfig) -> Result<(ContigMap, usize, i64)> {
    if config.num_samples == 0 {
        log::info!("no mapping files configured, loading contig snapshot from {}", config.sigma_contigs_file);
        let started = Instant::now();
        let (header, contigs) = contig::load_contigs(&config.sigma_contigs_file)?;
        log::info!("done loading snapshot in {:.4} sec, {} contigs", started.elapsed().as_secs_f64(), contigs.len());
        return Ok((contigs, header.num_samples, header.contig_window_len));
    }

    let file_type = ContigFileType::parse(&config.contigs_file_type)?;

    log::info!("reading contigs from {}", config.contigs_file);
    let started = Instant::now();
    let mut contigs = contig_reader::read_contigs(
        &config.contigs_file,
        file_type,
        config.contig_len_thr,
        config.contig_edge_len,
        config.contig_window_len,
        config.num_samples,
    )?;
    log::info!("done reading {} contigs in {:.4} sec", contigs.len(), started.elapsed().as_secs_f64());

    for (sample, mapping_file) in config.mapping_files.iter().enumerate() {
        log::info!("reading mapping file {mapping_file} (sample {sample})");
        let started = Instant::now();
        sam_reader::read_sam_reads(mapping_file, sample, &mut contigs, config.contig_window_len)?;
        for contig in contigs.values_mut() {
            contig.finalize_sums(sample);
        }
        log::info!("done reading {mapping_file} in {:.4} sec", started.elapsed().as_secs_f64());
    }

    if config.sigma_contigs_file != "-" {
        log::info!("saving contig snapshot to {}", config.sigma_contigs_file);
        let header = SnapshotHeader {
            num_samples: config.num_samples,
            contig_len_thr: config.contig_len_thr,
            contig_edge_len: config.contig_edge_len,
            contig_window_len: config.contig_window_len,
        };
        save_contigs(&config.sigma_contigs_file, &contigs, &header)?;
    }

    Ok((contigs, config.num_samples, config.contig_window_len))
}
