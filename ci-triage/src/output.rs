// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: colors, log formatting and where results are written.

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, Write},
    sync::Once,
};
use tracing::{Event, Level, Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Events logged to this target are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "ci_triage::no_heading";

/// Environment variable holding a log filter, in `tracing_subscriber::filter::Targets` syntax.
const LOG_ENV: &str = "CI_TRIAGE_LOG";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output: also show debug logs
    #[arg(long, short, global = true, env = "CI_TRIAGE_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "CI_TRIAGE_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    /// Installs the stderr logger (once per process) and resolves colors.
    pub(crate) fn init(self) -> OutputContext {
        let colorize_stderr = self.color.should_colorize(supports_color::Stream::Stderr);

        static INIT_LOGGER: Once = Once::new();
        INIT_LOGGER.call_once(|| {
            let env_filter = std::env::var(LOG_ENV).ok();
            let layer = tracing_subscriber::fmt::layer()
                .event_format(TriageFormatter {
                    palette: LogPalette {
                        colorize: colorize_stderr,
                    },
                })
                .with_writer(io::stderr)
                .with_filter(log_targets(self.verbose, env_filter.as_deref()));
            tracing_subscriber::registry().with(layer).init();
        });

        OutputContext { colorize_stderr }
    }
}

/// Output settings resolved from the command line.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    colorize_stderr: bool,
}

impl OutputContext {
    /// Returns the styles to use for messages written to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        if self.colorize_stderr {
            StderrStyles { bold: style().bold() }
        } else {
            StderrStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub(crate) enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Styles used for messages written to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

/// Chooses the log filter.
///
/// A non-empty, valid filter from the environment wins. Otherwise everything at `INFO` and above
/// is shown, or `DEBUG` and above when `verbose` is set.
fn log_targets(verbose: bool, env_filter: Option<&str>) -> Targets {
    if let Some(filter) = env_filter.filter(|filter| !filter.is_empty()) {
        match filter.parse::<Targets>() {
            Ok(targets) => return targets,
            // The logger isn't installed yet, so this can only go to stderr directly.
            Err(error) => eprintln!("ignoring invalid {LOG_ENV} value `{filter}`: {error}"),
        }
    }

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    Targets::new().with_default(level)
}

#[derive(Copy, Clone, Debug, Default)]
struct LogPalette {
    colorize: bool,
}

impl LogPalette {
    fn heading(self, level: Level) -> (&'static str, Style) {
        let (label, color) = match level {
            Level::ERROR => ("error", style().red().bold()),
            Level::WARN => ("warning", style().yellow().bold()),
            Level::INFO => ("info", style().bold()),
            Level::DEBUG => ("debug", style().bold()),
            Level::TRACE => ("trace", style().dimmed()),
        };
        (label, if self.colorize { color } else { Style::new() })
    }
}

/// Formats events as `<level>: <message>`, one per line.
struct TriageFormatter {
    palette: LogPalette,
}

impl<S, N> FormatEvent<S, N> for TriageFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (label, style) = self.palette.heading(*metadata.level());
            write!(writer, "{}: ", label.style(style))?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Where command results are written.
///
/// The `Test` variant is only compiled for tests, so release builds always go straight to stdout.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to stdout.
    #[default]
    Normal,
    /// Collect output in memory.
    #[cfg(test)]
    Test {
        /// Everything written so far.
        stdout: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn write_stdout(&mut self, text: &str) -> io::Result<()> {
        match self {
            Self::Normal => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
            #[cfg(test)]
            Self::Test { stdout } => {
                stdout.extend_from_slice(text.as_bytes());
                Ok(())
            }
        }
    }
}
