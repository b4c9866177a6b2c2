use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "rifdock CLI - rotamer catalog tooling and hierarchical rigid-body docking search.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, inspect and query rotamer catalogs.
    Catalog(CatalogArgs),
    /// Run a hierarchical docking search described by a TOML file.
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

/// Where the residue chemistry templates come from.
#[derive(Args, Debug, Clone, Default)]
pub struct TemplateSource {
    /// Residue template file in TOML format. Defaults to the built-in set.
    #[arg(short, long, value_name = "PATH")]
    pub templates: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Build a catalog from a rotamer spec list and write it in binary form.
    Build {
        /// Tab-separated rotamer spec list (resname, chis, proton chi count, parent key).
        #[arg(short, long, required = true, value_name = "PATH")]
        spec: PathBuf,

        /// Output path for the binary catalog.
        #[arg(short, long, required = true, value_name = "PATH")]
        output: PathBuf,

        #[command(flatten)]
        templates: TemplateSource,
    },
    /// Load a binary catalog and print its per-residue summary.
    Show {
        /// Binary catalog written by `catalog build`.
        #[arg(required = true, value_name = "PATH")]
        catalog: PathBuf,

        #[command(flatten)]
        templates: TemplateSource,
    },
    /// Find the first spec entry matching a residue conformation.
    Match {
        /// Tab-separated rotamer spec list.
        #[arg(short, long, required = true, value_name = "PATH")]
        spec: PathBuf,

        /// Three-letter residue name, e.g. SER or DSE.
        #[arg(short, long, required = true, value_name = "NAME")]
        resname: String,

        /// Observed chi angles in degrees.
        #[arg(value_name = "CHI", allow_negative_numbers = true)]
        chis: Vec<f32>,

        /// Maximum per-chi difference in degrees.
        #[arg(long, value_name = "DEGREES", default_value_t = rifdock::core::rotamers::spec::DEFAULT_MATCH_TOLERANCE)]
        tolerance: f32,
    },
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Path to the search configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the beam size from the config file.
    #[arg(short, long, value_name = "INT")]
    pub beam_size: Option<usize>,

    /// Override the global score cut from the config file.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub score_cut: Option<f32>,

    /// Override how many results are printed.
    #[arg(short = 'n', long, value_name = "INT")]
    pub top: Option<usize>,

    /// Skip the refinement pass, even if the config file defines one.
    #[arg(long)]
    pub no_refine: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.beam-size=8192
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
