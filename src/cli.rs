//! Defines command-line interface options using `clap` for the cube_helper application.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Equalise, merge and aggregate NetCDF climate cubes
#[derive(Parser, Debug)]
#[command(
    version,
    name = "cube_helper",
    about = "Load a series of NetCDF files as one equalised cube"
)]
#[command(group(ArgGroup::new("source").required(true).args(["dir", "files"])))]
pub struct Args {
    /// Directory to load every matching file from
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Explicit list of files to load
    #[arg(short, long, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// File extension to accept
    #[arg(long, default_value = ".nc")]
    pub filetype: String,

    /// Data variable to read; defaults to the first data variable of each file
    #[arg(long)]
    pub variable: Option<String>,

    /// Print the files in chronological order and exit
    #[arg(long, default_value_t = false)]
    pub probe: bool,

    /// Categorical coordinate to derive, e.g. `season` (repeatable)
    #[arg(short, long)]
    pub categorical: Vec<String>,

    /// Aggregate over a categorical, e.g. `annual_seasonal_mean`
    #[arg(short, long)]
    pub aggregate: Option<String>,

    /// Reducer used for aggregation: mean, sum, min or max
    #[arg(short, long, default_value = "mean")]
    pub reducer: String,

    /// Path to save the resulting cube as NetCDF. If not set, prints a summary.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directory_run() {
        let args = Args::try_parse_from([
            "cube_helper",
            "--dir",
            "data",
            "-c",
            "season",
            "-c",
            "year",
            "--aggregate",
            "annual_seasonal_mean",
        ])
        .unwrap();
        assert_eq!(args.dir, Some(PathBuf::from("data")));
        assert_eq!(args.categorical, vec!["season", "year"]);
        assert_eq!(args.reducer, "mean");
        assert_eq!(args.filetype, ".nc");
    }

    #[test]
    fn requires_a_source() {
        assert!(Args::try_parse_from(["cube_helper", "--probe"]).is_err());
        assert!(Args::try_parse_from(["cube_helper", "--dir", "a", "--files", "b.nc"]).is_err());
    }
}
