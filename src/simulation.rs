//! Top-level container: a sequence of `FrameSet`s sharing one grid.
//!
//! See `spec.md` §6. The header's `frame_set_count` is written with
//! whatever `self.frame_sets.len()` is at the moment the header is
//! serialized; it is never retroactively patched. For an in-memory
//! `Simulation` built with [`Simulation::add_frame_set`] before writing,
//! that's the true count. For the streaming writer and the transcoder,
//! frame sets are handed to the target one at a time as they're produced,
//! so the header is written first with a count of zero — a limitation
//! carried forward unchanged from the reference implementation.

use crate::byteio;
use crate::error::{CodecError, Result};
use crate::frame_set::FrameSet;
use std::io::{Read, Write};

pub const VERSION: u64 = 2;

#[derive(Debug, Clone, Default)]
pub struct Simulation {
    subdivisions: Option<u64>,
    frame_sets: Vec<FrameSet>,
    /// The channel bitmask a read `Simulation` was written with. Unset
    /// (`0`) on a `Simulation` built fresh for writing.
    types_written: u64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_subdivisions(&mut self, value: u64) {
        self.subdivisions = Some(value);
    }

    pub fn subdivisions(&self) -> Option<u64> {
        self.subdivisions
    }

    pub fn add_frame_set(&mut self, frame_set: FrameSet) {
        self.frame_sets.push(frame_set);
    }

    pub fn frame_sets(&self) -> &[FrameSet] {
        &self.frame_sets
    }

    /// The channel bitmask this `Simulation` was read back with. Zero if
    /// it was never read (only ever written).
    pub fn types_written(&self) -> u64 {
        self.types_written
    }

    pub fn write_full(
        &mut self,
        target: &mut impl Write,
        types_to_write: u64,
        compressed: bool,
    ) -> Result<()> {
        self.write_header(target, types_to_write)?;
        for frame_set in &mut self.frame_sets {
            frame_set.write_full(target, types_to_write, compressed)?;
        }
        Ok(())
    }

    pub fn write_rendered(
        &mut self,
        target: &mut impl Write,
        types_to_write: u64,
        compressed: bool,
    ) -> Result<()> {
        self.write_header(target, types_to_write)?;
        for frame_set in &mut self.frame_sets {
            frame_set.write_rendered(target, types_to_write, compressed)?;
        }
        Ok(())
    }

    /// Writes the fixed-size header only. Exposed for [`crate::stream_writer`],
    /// which must write the header before any `FrameSet` exists.
    pub(crate) fn write_header(&self, target: &mut impl Write, types_to_write: u64) -> Result<()> {
        let subdivisions = self.subdivisions.ok_or(CodecError::MissingGridDefinition)?;
        byteio::write_u64(target, VERSION)?;
        byteio::write_u64(target, HEADER_SIZE)?;
        byteio::write_u64(target, subdivisions)?;
        byteio::write_u64(target, self.frame_sets.len() as u64)?;
        byteio::write_u64(target, types_to_write)?;
        Ok(())
    }

    /// Reads the header and every `FrameSet` it declares, eagerly.
    pub fn read(source: &mut impl Read) -> Result<Self> {
        let (subdivisions, frame_set_count, types_written) = read_header(source)?;

        let mut frame_sets = Vec::with_capacity(frame_set_count as usize);
        for _ in 0..frame_set_count {
            frame_sets.push(FrameSet::read(source, types_written)?);
        }

        Ok(Self {
            subdivisions: Some(subdivisions),
            frame_sets,
            types_written,
        })
    }

    /// A sequential, on-demand reader: the header is consumed immediately,
    /// but each `FrameSet` is only parsed as [`SimulationReader::next_frame_set`]
    /// is called. Useful for simulations too large to hold fully in memory.
    pub fn open_reader<R: Read>(mut source: R) -> Result<SimulationReader<R>> {
        let (subdivisions, frame_set_count, types_written) = read_header(&mut source)?;
        Ok(SimulationReader {
            source,
            subdivisions,
            frame_set_count,
            types_written,
            frame_sets_read: 0,
        })
    }
}

/// Recorded `headerSize` field: bytes past `version` and `headerSize`
/// itself, i.e. `subdivisions` + `frame_set_count` + `types_written`
/// (`spec.md` §4.6).
const HEADER_SIZE: u64 = 8 + 8 + 8;

fn read_header(source: &mut impl Read) -> Result<(u64, u64, u64)> {
    let version = byteio::read_u64(source)?;
    if version != VERSION {
        return Err(CodecError::IncompatibleVersion);
    }
    let _header_size = byteio::read_u64(source)?;
    let subdivisions = byteio::read_u64(source)?;
    let frame_set_count = byteio::read_u64(source)?;
    let types_written = byteio::read_u64(source)?;
    Ok((subdivisions, frame_set_count, types_written))
}

/// Sequential reader produced by [`Simulation::open_reader`].
///
/// `frame_set_count` reflects whatever the writer declared in the header —
/// for a streamed or transcoded file that is `0` (see the module doc
/// comment), so callers of a streamed file should read `FrameSet`s until
/// [`SimulationReader::next_frame_set`] returns `None` at EOF rather than
/// trusting the declared count.
pub struct SimulationReader<R> {
    source: R,
    subdivisions: u64,
    frame_set_count: u64,
    types_written: u64,
    frame_sets_read: u64,
}

impl<R: Read> SimulationReader<R> {
    pub fn subdivisions(&self) -> u64 {
        self.subdivisions
    }

    pub fn types_written(&self) -> u64 {
        self.types_written
    }

    pub fn declared_frame_set_count(&self) -> u64 {
        self.frame_set_count
    }

    /// Reads the next `FrameSet`, or `None` once the stream is exhausted.
    pub fn next_frame_set(&mut self) -> Result<Option<FrameSet>> {
        let mut probe = [0_u8; 1];
        match self.source.read(&mut probe) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(err) => return Err(err.into()),
        }
        let mut chained = (&probe[..]).chain(&mut self.source);
        let frame_set = FrameSet::read(&mut chained, self.types_written)?;
        self.frame_sets_read += 1;
        Ok(Some(frame_set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age_frame::AgeFrame;
    use crate::frame::{Frame, channel_mask};
    use std::io::Cursor;

    #[test]
    fn header_matches_reference_byte_layout() {
        // spec.md §8 scenario 2: subdivisions=123, one age-only FrameSet.
        let mut sim = Simulation::new();
        sim.set_subdivisions(123);
        let mut frame_set = FrameSet::new();
        let mut frame = crate::frame::Frame::new();
        frame.age = Some(AgeFrame::new(100.0));
        frame_set.add_frame(frame);
        sim.add_frame_set(frame_set);

        let mut buf = Vec::new();
        sim.write_full(&mut buf, channel_mask::AGE, false).unwrap();

        let mut cursor = Cursor::new(&buf[0..40]);
        assert_eq!(byteio::read_u64(&mut cursor).unwrap(), 2);
        assert_eq!(byteio::read_u64(&mut cursor).unwrap(), 24);
        assert_eq!(byteio::read_u64(&mut cursor).unwrap(), 123);
        assert_eq!(byteio::read_u64(&mut cursor).unwrap(), 1);
        assert_eq!(byteio::read_u64(&mut cursor).unwrap(), channel_mask::AGE);
    }

    #[test]
    fn write_without_subdivisions_fails() {
        let mut sim = Simulation::new();
        let mut buf = Vec::new();
        assert!(matches!(
            sim.write_full(&mut buf, channel_mask::AGE, false),
            Err(CodecError::MissingGridDefinition)
        ));
    }

    #[test]
    fn wrong_version_is_rejected_on_read() {
        let mut buf = Vec::new();
        byteio::write_u64(&mut buf, 99).unwrap();
        byteio::write_u64(&mut buf, HEADER_SIZE).unwrap();
        byteio::write_u64(&mut buf, 10).unwrap();
        byteio::write_u64(&mut buf, 0).unwrap();
        byteio::write_u64(&mut buf, 0).unwrap();

        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            Simulation::read(&mut cursor),
            Err(CodecError::IncompatibleVersion)
        ));
    }

    #[test]
    fn full_round_trip_with_one_frame_set() {
        let mut sim = Simulation::new();
        sim.set_subdivisions(42);

        let mut frame_set = FrameSet::new();
        for age in [1.0, 2.0] {
            let mut frame = Frame::new();
            frame.age = Some(AgeFrame::new(age));
            frame_set.add_frame(frame);
        }
        sim.add_frame_set(frame_set);

        let mut buf = Vec::new();
        sim.write_full(&mut buf, channel_mask::AGE, false).unwrap();

        let mut cursor = Cursor::new(buf);
        let read_back = Simulation::read(&mut cursor).unwrap();
        assert_eq!(read_back.subdivisions(), Some(42));
        assert_eq!(read_back.types_written(), channel_mask::AGE);
        assert_eq!(read_back.frame_sets().len(), 1);
        assert_eq!(read_back.frame_sets()[0].frame_count(), 2);
    }

    #[test]
    fn sequential_reader_reads_until_eof() {
        let mut sim = Simulation::new();
        sim.set_subdivisions(7);
        for age in [[1.0], [2.0]] {
            let mut frame_set = FrameSet::new();
            let mut frame = Frame::new();
            frame.age = Some(AgeFrame::new(age[0]));
            frame_set.add_frame(frame);
            sim.add_frame_set(frame_set);
        }

        let mut buf = Vec::new();
        sim.write_full(&mut buf, channel_mask::AGE, false).unwrap();

        let cursor = Cursor::new(buf);
        let mut reader = Simulation::open_reader(cursor).unwrap();
        assert_eq!(reader.subdivisions(), 7);
        // Declared count reflects the in-memory length at write time since
        // every frame set was known up front.
        assert_eq!(reader.declared_frame_set_count(), 2);

        let mut read_count = 0;
        while reader.next_frame_set().unwrap().is_some() {
            read_count += 1;
        }
        assert_eq!(read_count, 2);
    }
}
