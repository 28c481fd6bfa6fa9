//! Logging setup on the env_logger backend
//!
//! On a TTY, records go through [`MultiProgress::suspend`] so a line never
//! lands in the middle of a redrawn bar.

use std::io::{self, Write};

use env_logger::{Builder, Env, Target, WriteStyle};
use indicatif::MultiProgress;

/// Default filter for the given verbosity flags
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// stderr with the progress bars hidden for the duration of each write.
struct SuspendedStderr {
    multi: MultiProgress,
}

impl Write for SuspendedStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

fn builder(quiet: bool, debug: bool, multi: Option<&MultiProgress>) -> Builder {
    let env = Env::default().default_filter_or(default_level(quiet, debug));
    let mut builder = Builder::from_env(env);
    builder.format_target(false);

    match multi {
        // Interactive: colored levels, no timestamps, bars kept intact
        Some(multi) => {
            builder
                .format_timestamp(None)
                .write_style(WriteStyle::Always)
                .target(Target::Pipe(Box::new(SuspendedStderr {
                    multi: multi.clone(),
                })));
        }
        None => {
            builder
                .format_timestamp_millis()
                .write_style(WriteStyle::Never)
                .target(Target::Stderr);
        }
    }
    builder
}

/// Install the global logger. `RUST_LOG` overrides the default level.
///
/// With `multi` (TTY mode) log lines are printed above the progress bars;
/// without it, plain timestamped lines suitable for log collection.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    builder(quiet, debug, multi).try_init()
}
