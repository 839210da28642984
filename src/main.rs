use std::env;
use std::time::SystemTime;

use log::{debug, error, info, LevelFilter};
use tigsplit::cli::{get_args, Arguments};
use tigsplit::containers::{ConfusedEdge, TigVector};
use tigsplit::error_profile::compute_error_profiles;
use tigsplit::evidence::ReadStore;
use tigsplit::ingester::{load_confused_edges, load_contigs, load_layout};
use tigsplit::result_writer;
use tigsplit::unitig_builder::create_unitigs;
use tigsplit::utils::is_local_file;

fn set_up() -> Arguments {
    let args = get_args();
    let filter_level: LevelFilter = match (args.verbose, args.trace) {
        (_, true) => LevelFilter::Trace,
        (true, false) => LevelFilter::Debug,
        (false, false) => LevelFilter::Info,
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("\nRunning tigsplit v{version}\n");

    let cmd: Vec<String> = env::args().collect();
    let cmd_str = cmd.join(" ");
    debug!("Run command: {cmd_str}");
    debug!("v{version}\n");

    if !args.layout_path.is_file() {
        error!("Layout file {} not found", args.layout_path.display());
        std::process::exit(exitcode::CONFIG);
    }
    if let Some(confused_edges_path) = &args.confused_edges_path {
        if !is_local_file(confused_edges_path) {
            error!("Confused edges file {} not found", confused_edges_path);
            std::process::exit(exitcode::CONFIG);
        }
    }

    let path = std::path::Path::new(&args.outdir);
    if !path.exists() || !path.is_dir() {
        error!("outdir {} does not exist", args.outdir,);
        std::process::exit(exitcode::CONFIG);
    }
    if args.prefix.contains('_') {
        error!("Prefix does not allow underscores");
        std::process::exit(exitcode::CONFIG);
    }
    if args.max_placements == 0 {
        error!("`--max-placements` must be at least 1");
        std::process::exit(exitcode::CONFIG);
    }

    args
}

fn log_time(start_time: SystemTime) {
    let elapsed_time = start_time.elapsed().unwrap_or_default().as_secs();
    let hours = elapsed_time / 3600;
    let minutes = (elapsed_time % 3600) / 60;
    let seconds = elapsed_time % 60;
    debug!("Running time: {hours}h:{minutes}m:{seconds}s");
}

fn main() {
    ///////////////////////////////////////////////////////////////////////////
    // Set up
    let args = set_up();
    let start_time = SystemTime::now();
    let config = args.unitig_config();

    ///////////////////////////////////////////////////////////////////////////
    // Load the assembly snapshot
    let layout = load_layout(args.layout_path.clone());
    let mut contigs: TigVector = load_contigs(&layout);
    let evidence = ReadStore::from_layout(&layout);
    drop(layout);

    let confused_edges: Vec<ConfusedEdge> = match args.confused_edges_path.clone() {
        Some(confused_edges_path) => load_confused_edges(confused_edges_path),
        None => Vec::new(),
    };

    ///////////////////////////////////////////////////////////////////////////
    // Split contigs into unitigs
    compute_error_profiles(&mut contigs, &evidence);
    let result = match create_unitigs(&contigs, &evidence, &confused_edges, &config) {
        Ok(result) => result,
        Err(e) => {
            error!("Unitig construction failed: {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // Write results
    ///////////////////////////////////////////////////////////////////////////
    result_writer::write_results(
        &result,
        args.outdir.trim_end_matches('/').to_string(),
        args.prefix,
        args.write_unzipped,
    );
    log_time(start_time);
}
