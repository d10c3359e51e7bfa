//! Error types for the rendering pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning diagram source into an artifact.
///
/// Every variant is terminal for the run: the pipeline stops at the first
/// failure and never writes a partial artifact.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input or output argument was not supplied
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// The diagram source could not be read
    #[error("Unable to read input: {0}")]
    FileReadError(String),

    /// The artifact could not be written
    #[error("Unable to write output: {0}")]
    FileWriteError(String),

    /// The diagram source was empty after trimming
    #[error("No input provided: {0}")]
    EmptySource(String),

    /// The rendering capability produced no output or the surface failed to start
    #[error("SVG generation failed: {0}")]
    RenderFailure(String),

    /// No measurable vector element, or a degenerate natural box
    #[error("Could not get SVG dimensions: {0}")]
    GeometryUnavailable(String),

    /// The raster capture step failed or timed out
    #[error("PNG capture failed: {0}")]
    CaptureFailure(String),

    /// The output resolves to neither svg nor png
    #[error("Unsupported output type '{0}'. Use 'svg' or 'png'")]
    UnsupportedOutputType(String),

    /// A raster artifact was requested on standard output
    #[error("PNG output to stdout not supported. Please specify a filename with .png extension.")]
    UnsupportedStdoutFormat,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable short name of the error kind, suitable for logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingArgument(_) => "MissingArgument",
            Error::FileReadError(_) => "FileReadError",
            Error::FileWriteError(_) => "FileWriteError",
            Error::EmptySource(_) => "EmptySource",
            Error::RenderFailure(_) => "RenderFailure",
            Error::GeometryUnavailable(_) => "GeometryUnavailable",
            Error::CaptureFailure(_) => "CaptureFailure",
            Error::UnsupportedOutputType(_) => "UnsupportedOutputType",
            Error::UnsupportedStdoutFormat => "UnsupportedStdoutFormat",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::Other(_) => "Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(Error::UnsupportedStdoutFormat.kind(), "UnsupportedStdoutFormat");
        assert_eq!(Error::GeometryUnavailable("x".into()).kind(), "GeometryUnavailable");
        assert_eq!(Error::RenderFailure("x".into()).kind(), "RenderFailure");
    }

    #[test]
    fn stdout_message_points_at_png_filename() {
        let msg = Error::UnsupportedStdoutFormat.to_string();
        assert!(msg.contains(".png"));
    }
}
