use clap::{Parser, Subcommand, ValueEnum};

/// Per-year cultural overview: music charts, film and TV, events and Nobel prizes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Build one year's overview and print it as JSON
    Year {
        year: i32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable, colored output
    Pretty,
    /// One JSON object per line
    Json,
}

/// Pretty in debug builds, JSON in release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let args = Args::try_parse_from(["wikicap"]).unwrap();
        assert_eq!(args.command, None);
    }

    #[test]
    fn test_year_command() {
        let args = Args::try_parse_from(["wikicap", "--tracing", "json", "year", "1999"]).unwrap();
        assert_eq!(args.tracing, TracingFormat::Json);
        assert_eq!(args.command, Some(Command::Year { year: 1999 }));
    }

    #[test]
    fn test_year_must_be_integer() {
        assert!(Args::try_parse_from(["wikicap", "year", "nineteen"]).is_err());
    }
}
