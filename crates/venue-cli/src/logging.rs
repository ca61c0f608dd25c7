use nu_ansi_term::Color::{Blue, Cyan, Magenta, Red, Yellow};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    registry::LookupSpan,
};

use crate::{
    cli::Args,
    error::{CliError, CliResult},
    utils::Colored,
};

/// Crates whose events are shown.
const TARGETS: [&str; 4] = ["venues", "venue_config", "venue_db", "venue_query"];

/// Collects the message and the structured fields of an event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        match *event.metadata().level() {
            Level::TRACE => write!(writer, "{} ", Colored(Magenta, "[TRACE]")),
            Level::DEBUG => write!(writer, "{} ", Colored(Blue, "[DEBUG]")),
            Level::INFO => write!(writer, ""),
            Level::WARN => write!(writer, "{} ", Colored(Yellow, "[WARN]")),
            Level::ERROR => write!(writer, "{} ", Colored(Red, "[ERROR]")),
        }?;

        write!(writer, "{}", visitor.message.unwrap_or_default())?;
        for (name, value) in visitor.fields {
            write!(writer, " {}={}", Colored(Cyan, name), value)?;
        }
        writeln!(writer)
    }
}

/// Env filter directives for the given verbosity flags.
fn filter_directives(quiet: bool, verbose: u8) -> String {
    let level = if quiet {
        Level::ERROR
    } else if verbose >= 2 {
        Level::TRACE
    } else if verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    };

    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn setup_logging(args: &Args) -> CliResult<()> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter_directives(args.quiet, args.verbose))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(CustomFormatter).finish())
    };

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| CliError::Logging(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(
            filter_directives(false, 0),
            "venues=INFO,venue_config=INFO,venue_db=INFO,venue_query=INFO"
        );
        assert!(filter_directives(false, 1).starts_with("venues=DEBUG,"));
        assert!(filter_directives(false, 5).starts_with("venues=TRACE,"));
        assert!(filter_directives(true, 3).starts_with("venues=ERROR,"));
    }

    #[test]
    fn test_setup_logging_twice_fails() {
        let args = Args::parse_from(["venues", "--json", "config"]);

        let _ = setup_logging(&args);
        assert!(matches!(setup_logging(&args), Err(CliError::Logging(_))));
    }
}
