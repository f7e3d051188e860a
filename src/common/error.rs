//! Driver error types.
//!
//! Every failure in the pipeline is unrecoverable: the driver aborts the
//! whole build on the first error, after the temporary-file ledger has been
//! flushed. Errors propagate with `?` and are rendered exactly once, in
//! `driver_main`, as `cc9995: error: <message>`.

use snafu::Snafu;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Everything that can abort a build, from bad usage to a failing
/// toolchain program.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DriverError {
    /// Malformed or unrecognized command-line usage.
    #[snafu(display("{message}"))]
    Usage { message: String },

    /// A filename the extension rewriter cannot work with.
    #[snafu(display("no extension on '{path}'"))]
    MissingExtension { path: String },

    /// A positional argument whose extension matches no pipeline stage.
    #[snafu(display("don't know what to do with '{path}'"))]
    UnknownFileType { path: String },

    /// The driver assembled more arguments than the sanity cap allows.
    #[snafu(display("too many arguments to command"))]
    TooManyArguments,

    /// A stdin/stdout redirection file could not be opened.
    #[snafu(display("{path}: {source}"))]
    Redirect {
        path: String,
        source: std::io::Error,
    },

    /// An external program could not be started at all.
    #[snafu(display("{program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// An external program exited nonzero or died on a signal.
    #[snafu(display("{program} failed"))]
    ToolFailed { program: String },

    /// No `-L` directory contains `lib<name>.a`.
    #[snafu(display("unable to find library '{name}'"))]
    LibraryNotFound { name: String },
}

impl DriverError {
    pub fn usage(message: impl Into<String>) -> Self {
        DriverError::Usage {
            message: message.into(),
        }
    }
}
