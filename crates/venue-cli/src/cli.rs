use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit log lines as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load documents from a JSON array or JSON-lines file into a database
    #[command(arg_required_else_help = true)]
    Import {
        /// Database file to write to
        #[arg(long, value_hint = ValueHint::FilePath)]
        db: PathBuf,

        /// Collection to import into
        #[arg(long)]
        collection: String,

        /// File holding the documents
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Run a listing query and print one page of results
    #[command(arg_required_else_help = true)]
    #[command(group(ArgGroup::new("source").required(true).args(["db", "file"])))]
    Query {
        /// Collection to query
        #[arg(long)]
        collection: String,

        /// Query a database created with `import`
        #[arg(long, value_hint = ValueHint::FilePath)]
        db: Option<PathBuf>,

        /// Query a JSON array or JSON-lines file directly
        #[arg(long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Print results as a table
        #[arg(long)]
        table: bool,

        /// Query string, e.g. "q=pub&page=2&sort=-rating"
        #[arg(default_value = "")]
        query: String,
    },

    /// Print the query a query string builds, without running it
    #[command(arg_required_else_help = true)]
    Explain {
        /// Collection to query
        #[arg(long)]
        collection: String,

        /// Query string
        #[arg(default_value = "")]
        query: String,
    },

    /// Print the effective configuration
    Config {
        /// Print the annotated default configuration instead
        #[arg(long)]
        default: bool,
    },
}
