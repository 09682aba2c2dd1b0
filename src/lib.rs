//! Binary container format and codec for time-ordered planetary simulation
//! snapshots.
//!
//! A [`simulation::Simulation`] is a sequence of [`frame_set::FrameSet`]s,
//! each a batch of [`frame::Frame`]s covering up to three independently
//! versioned channels: [`age_frame::AgeFrame`] (a scalar),
//! [`elevation_frame::ElevationFrame`] (lossless floats or an adaptively
//! quantised "rendered" form), and [`satellite_frame::SatelliteFrame`]
//! (rendered-only RGB). Every channel can be read back without decoding
//! bytes it doesn't need to touch: a frame loaded from disk keeps its raw
//! payload opaque until a write asks for a different compression or
//! rendered state than it was read with.
//!
//! [`stream_writer::StreamWriter`] writes a simulation incrementally from a
//! background thread; [`transcode::transcode`] re-batches an existing
//! simulation's frames, optionally changing their compression or rendered
//! state along the way.

mod age_frame;
mod byteio;
mod elevation_frame;
mod error;
mod frame;
mod frame_set;
mod gzip;
mod satellite_frame;
mod simulation;
mod stream_writer;
mod transcode;

pub use age_frame::AgeFrame;
pub use elevation_frame::{ElevationFrame, RenderStrategy, RenderedElevation};
pub use error::{CodecError, Result};
pub use frame::{Frame, channel_mask};
pub use frame_set::FrameSet;
pub use satellite_frame::{ClimateLut, RenderedColor, SatelliteFrame};
pub use simulation::{Simulation, SimulationReader};
pub use stream_writer::StreamWriter;
pub use transcode::{BATCH_SIZE, transcode};
