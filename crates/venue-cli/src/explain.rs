use venue_config::Config;

use crate::{error::CliResult, query::build_spec};

pub fn explain_query(config: &Config, collection: &str, query: &str) -> CliResult<()> {
    let spec = build_spec(config, collection, query)?;
    println!("{}", serde_json::to_string_pretty(&spec.to_document())?);
    Ok(())
}
