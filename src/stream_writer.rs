//! Producer/consumer streaming writer.
//!
//! `add_frame_set` hands a `FrameSet` to a background thread over a
//! capacity-1 channel, so a producer that's faster than the underlying
//! writer blocks instead of buffering unboundedly in memory. Modeled on
//! `puffin::frames_writer`'s `thread::spawn` + channel + join-on-drop
//! shape.
//!
//! The header is written synchronously by `begin_stream_write_rendered`
//! before any frame set exists, so `frame_set_count` in that header is
//! always `0` — see [`crate::simulation`]'s module doc comment.

use crate::error::{CodecError, Result};
use crate::frame_set::FrameSet;
use crate::simulation::Simulation;
use std::io::Write;
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};

pub struct StreamWriter {
    sender: Option<SyncSender<FrameSet>>,
    worker: Option<JoinHandle<Result<()>>>,
    closed: bool,
}

impl StreamWriter {
    /// Writes the simulation header to `target` and spawns the background
    /// writer thread. `types_to_write` is fixed for the lifetime of the
    /// stream: every `FrameSet` handed to [`Self::add_frame_set`] must carry
    /// exactly those channels.
    pub fn begin_stream_write_rendered<W>(
        mut target: W,
        subdivisions: u64,
        types_to_write: u64,
        compressed: bool,
    ) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let mut header_source = Simulation::new();
        header_source.set_subdivisions(subdivisions);
        header_source.write_header(&mut target, types_to_write)?;
        log::debug!("stream writer started, subdivisions={subdivisions} types={types_to_write:#x}");

        let (sender, receiver) = mpsc::sync_channel::<FrameSet>(1);
        let worker = thread::spawn(move || -> Result<()> {
            let mut frame_sets_written = 0_u64;
            for mut frame_set in receiver {
                if let Err(err) = frame_set.write_rendered(&mut target, types_to_write, compressed)
                {
                    log::warn!("stream writer failed after {frame_sets_written} frame sets: {err}");
                    return Err(err);
                }
                frame_sets_written += 1;
            }
            target.flush()?;
            log::debug!("stream writer closed after {frame_sets_written} frame sets");
            Ok(())
        });

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            closed: false,
        })
    }

    /// Hands `frame_set` to the background writer, blocking if it hasn't
    /// drained the previous one yet.
    pub fn add_frame_set(&mut self, frame_set: FrameSet) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(CodecError::StreamClosed)?;
        sender.send(frame_set).map_err(|_| CodecError::StreamClosed)
    }

    /// Signals end of stream, waits for the background thread to drain and
    /// flush, and surfaces any write error it hit. Safe to call more than
    /// once: later calls are a no-op returning `Ok(())`.
    pub fn flush_and_close_write_stream(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        drop(self.sender.take());
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| CodecError::StreamClosed)?,
            None => Ok(()),
        }
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        let _ = self.flush_and_close_write_stream();
    }
}
