use std::fmt;

/// Stable error identifiers for the container codec.
///
/// These map 1:1 onto the error taxonomy the format defines (not onto
/// Rust type names), so callers can match on them across versions.
#[derive(Debug)]
pub enum CodecError {
    /// A write was requested but the frame holds no payload in any state.
    NoData,
    /// A write asked to un-render a frame that was read back already rendered.
    InvalidData,
    /// A `FrameSet` write requested a channel that some frame doesn't carry.
    MissingData,
    /// A `Simulation` write was attempted before `set_subdivisions` was called.
    MissingGridDefinition,
    /// `SatelliteFrame::write_full` was called; satellite is rendered-only.
    RenderedOnlyFrame,
    /// A `Simulation` read found a version other than the one this codec understands.
    IncompatibleVersion,
    /// The streaming writer's background thread is gone, either because it
    /// already closed or because it panicked.
    StreamClosed,
    /// Underlying I/O (including gzip) failure.
    Io(std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::NoData => write!(f, "no data"),
            CodecError::InvalidData => write!(f, "invalid data"),
            CodecError::MissingData => write!(f, "missing data"),
            CodecError::MissingGridDefinition => write!(f, "grid definition was not set"),
            CodecError::RenderedOnlyFrame => write!(f, "frame type must be rendered"),
            CodecError::IncompatibleVersion => write!(f, "incompatible version"),
            CodecError::StreamClosed => write!(f, "stream writer is closed"),
            CodecError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}
