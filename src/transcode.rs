//! Re-batches a simulation's frames into fixed-size `FrameSet`s, optionally
//! changing compression or rendered/full state along the way.
//!
//! Frames are read off `source` `FrameSet` by `FrameSet` but re-grouped
//! into batches of [`BATCH_SIZE`] before being written back out, so the
//! output's `FrameSet` boundaries need not match the input's. Because
//! elevation delta chaining never crosses a `FrameSet` boundary, every
//! new batch re-runs the chain against its own first frame rather than
//! whatever chain the source had — see `spec.md` §5.2.

use crate::error::Result;
use crate::frame::Frame;
use crate::frame_set::FrameSet;
use crate::simulation::Simulation;
use std::io::{Read, Write};

pub const BATCH_SIZE: usize = 30;

/// Streams `source` into `target`, re-batching into groups of
/// [`BATCH_SIZE`] frames and writing only the channels in `types_to_write`.
/// `rendered` selects whether the output uses the lossy rendered layout or
/// the lossless full layout for the channels that support it.
pub fn transcode<R, W>(
    source: R,
    target: &mut W,
    types_to_write: u64,
    compressed: bool,
    rendered: bool,
) -> Result<()>
where
    R: Read,
    W: Write,
{
    let mut reader = Simulation::open_reader(source)?;

    let header_source = {
        let mut sim = Simulation::new();
        sim.set_subdivisions(reader.subdivisions());
        sim
    };
    header_source.write_header(target, types_to_write)?;
    log::debug!(
        "transcode started, types={types_to_write:#x} compressed={compressed} rendered={rendered}"
    );

    let mut pending: Vec<Frame> = Vec::with_capacity(BATCH_SIZE);
    let mut batches_written = 0_u64;
    while let Some(frame_set) = reader.next_frame_set()? {
        for frame in frame_set.frames() {
            pending.push(frame.clone());
            if pending.len() == BATCH_SIZE {
                flush_batch(&mut pending, target, types_to_write, compressed, rendered)?;
                batches_written += 1;
            }
        }
    }
    if !pending.is_empty() {
        flush_batch(&mut pending, target, types_to_write, compressed, rendered)?;
        batches_written += 1;
    }
    log::debug!("transcode finished, wrote {batches_written} frame sets");
    Ok(())
}

fn flush_batch(
    pending: &mut Vec<Frame>,
    target: &mut impl Write,
    types_to_write: u64,
    compressed: bool,
    rendered: bool,
) -> Result<()> {
    let mut frame_set = FrameSet::new();
    for frame in pending.drain(..) {
        frame_set.add_frame(frame);
    }
    if rendered {
        frame_set.write_rendered(target, types_to_write, compressed)?;
    } else {
        frame_set.write_full(target, types_to_write, compressed)?;
    }
    Ok(())
}
