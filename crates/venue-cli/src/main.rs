use clap::Parser;
use cli::{Args, Commands};
use error::{CliError, CliResult};
use explain::explain_query;
use import::import_documents;
use logging::setup_logging;
use query::{run_query, Source};
use tracing::debug;
use venue_config::Config;

mod cli;
mod error;
mod explain;
mod import;
mod logging;
mod query;
mod utils;

fn load_config(args: &Args) -> CliResult<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };
    Ok(config)
}

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args)?;

    if args.no_color {
        utils::set_color(false);
    }

    match &args.command {
        Commands::Import {
            db,
            collection,
            file,
        } => {
            import_documents(db, collection, file)?;
        }
        Commands::Query {
            collection,
            db,
            file,
            table,
            query,
        } => {
            let config = load_config(&args)?;
            let source = match (db, file) {
                (Some(db), _) => Source::Db(db),
                (None, Some(file)) => Source::File(file),
                (None, None) => return Err(CliError::MissingSource),
            };
            run_query(&config, collection, source, query, *table)?;
        }
        Commands::Explain { collection, query } => {
            let config = load_config(&args)?;
            explain_query(&config, collection, query)?;
        }
        Commands::Config { default } => {
            let config = if *default {
                Config::default_config()
            } else {
                load_config(&args)?
            };
            debug!(default = *default, "printing configuration");
            print!("{}", config.to_annotated_document()?);
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
