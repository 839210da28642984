use clap::Parser;
use std::path::PathBuf;

use crate::containers::UnitigConfig;
use crate::utils;

#[derive(Clone, Parser)]
#[clap(author, version, about)]
pub struct Arguments {
    /// Assembly layout JSON (contigs, reads, overlaps, read placements). GZIP files allowed.
    #[clap(required = true)]
    #[clap(long = "layout")]
    #[clap(value_name = "JSON")]
    pub layout_path: PathBuf,

    /// Table of confused read ends: read ID, end (5 or 3), ID of the read causing the confusion.
    /// GZIP files allowed.
    #[clap(required = false)]
    #[clap(long = "confused-edges")]
    #[clap(value_name = "TSV")]
    pub confused_edges_path: Option<String>,

    /// Output directory path
    #[clap(required = true)]
    #[clap(long = "outdir")]
    #[clap(value_name = "STRING")]
    pub outdir: String,

    /// Sample or project ID. No underscores allowed.
    #[clap(required = true)]
    #[clap(long = "prefix")]
    #[clap(value_name = "STRING")]
    pub prefix: String,

    /// Shortest verified overlap allowed to split another contig
    #[clap(required = false)]
    #[clap(long = "min-intersect-len")]
    #[clap(value_name = "INT")]
    #[clap(default_value_t = utils::DEFAULT_MIN_INTERSECT_LEN)]
    pub min_intersect_len: u32,

    /// Contig ends with more candidate breaks than this are too ambiguous to use
    #[clap(required = false)]
    #[clap(long = "max-placements")]
    #[clap(value_name = "INT")]
    #[clap(default_value_t = utils::DEFAULT_MAX_PLACEMENTS)]
    pub max_placements: u32,

    /// Standard deviations above a contig's mean error rate still considered consistent with it
    #[clap(required = false)]
    #[clap(long = "deviation-graph")]
    #[clap(value_name = "FLOAT")]
    #[clap(default_value_t = utils::DEFAULT_DEVIATION_GRAPH)]
    pub deviation_graph: f64,

    /// Flag to evaluate and log every filter for each placement. Does not change results.
    #[clap(long = "evaluate-all-filters", hide = true)]
    pub evaluate_all_filters: bool,

    /// Flag to keep non-backbone reads at the ends of unitigs
    #[clap(long = "no-trim", hide = true)]
    pub no_trim: bool,

    /// Flag to output results in unzipped format
    #[clap(long = "write-unzipped", hide = true)]
    pub write_unzipped: bool,

    /// Optional flag to print verbose output for debugging purposes.
    #[clap(long = "verbose")]
    pub verbose: bool,

    /// Optional flag to also print per-overlap scan output. Very large.
    #[clap(long = "trace", hide = true)]
    pub trace: bool,
}

impl Arguments {
    pub fn unitig_config(&self) -> UnitigConfig {
        UnitigConfig {
            min_intersect_len: self.min_intersect_len,
            max_placements: self.max_placements,
            deviation_graph: self.deviation_graph,
            evaluate_all_filters: self.evaluate_all_filters,
            trim_non_backbone: !self.no_trim,
        }
    }
}

pub fn get_args() -> Arguments {
    Arguments::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = Arguments::parse_from([
            "tigsplit",
            "--layout",
            "layout.json",
            "--outdir",
            "out",
            "--prefix",
            "sample",
        ]);
        assert_eq!(args.unitig_config(), UnitigConfig::default());
        assert!(args.confused_edges_path.is_none());
    }

    #[test]
    fn test_flags_reach_config() {
        let args = Arguments::parse_from([
            "tigsplit",
            "--layout",
            "layout.json.gz",
            "--outdir",
            "out",
            "--prefix",
            "sample",
            "--min-intersect-len",
            "1000",
            "--max-placements",
            "4",
            "--no-trim",
            "--evaluate-all-filters",
        ]);
        let config = args.unitig_config();
        assert_eq!(config.min_intersect_len, 1000);
        assert_eq!(config.max_placements, 4);
        assert!(!config.trim_non_backbone);
        assert!(config.evaluate_all_filters);
    }
}
