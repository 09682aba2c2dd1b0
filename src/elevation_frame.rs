//! Lossless and lossy-quantised ("rendered") elevation channel.
//!
//! An [`ElevationFrame`] holds its payload in at most two overlapping live
//! forms (raw `elevations`, and a cached `rendered` quantisation derived
//! from them) or, once read back from disk, as an opaque byte blob that is
//! only decoded on demand. See `spec.md` §4.3 for the wire layout this
//! module implements bit-for-bit.

use crate::byteio;
use crate::error::{CodecError, Result};
use crate::gzip;
use std::io::{Cursor, Read, Write};

/// Flag bits used in elevation (and satellite) frame headers.
pub(crate) const COMPRESSED_FLAG: u64 = 1 << 63;
pub(crate) const RENDERED_FLAG: u64 = 1 << 62;
/// Reserved: set when per-cell deltas were applied against the previous
/// frame's values. The reference format never actually sets this bit — a
/// frame's position within its `FrameSet` implies whether it was
/// delta-encoded — but the bit is reserved wire space, so it is named here
/// and left unset on write.
#[allow(dead_code)]
pub(crate) const SELF_DIFFED_FLAG: u64 = 1 << 61;
/// Reserved, see [`SELF_DIFFED_FLAG`].
#[allow(dead_code)]
pub(crate) const AVERAGE_DIFFED_FLAG: u64 = 1 << 60;

/// One quantised elevation cell: a 2-bit band and an 8-bit within-band index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderedElevation {
    pub section: u8,
    pub value: u8,
}

/// Which quantisation scheme [`ElevationFrame::render`] uses.
///
/// `Relative` equal-population binning is the default used implicitly by
/// `write_rendered` when no rendering has been cached yet. `Absolute` uses
/// fixed elevation bands and is offered as an explicit alternative for
/// callers that want visualisations comparable across frames with very
/// different elevation distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    #[default]
    Relative,
    Absolute,
}

#[derive(Debug, Clone)]
struct OpaqueBody {
    bytes: Vec<u8>,
    from_compressed: bool,
    from_rendered: bool,
}

/// A single snapshot's per-cell elevation channel.
#[derive(Debug, Clone, Default)]
pub struct ElevationFrame {
    sealevel: f64,
    elevations: Option<Vec<f64>>,
    rendered: Option<Vec<RenderedElevation>>,
    opaque: Option<OpaqueBody>,
}

impl ElevationFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sea level used by [`RenderStrategy`] banding. Configuration
    /// of the renderer, not part of the persisted payload.
    pub fn set_sealevel(&mut self, value: f64) {
        self.sealevel = value;
    }

    pub fn sealevel(&self) -> f64 {
        self.sealevel
    }

    /// Sets the live, lossless per-cell elevations. Clears any cached
    /// rendering and any opaque data this frame previously held: the frame
    /// is now fully described by `values`.
    pub fn set_elevations(&mut self, values: Vec<f64>) {
        self.elevations = Some(values);
        self.rendered = None;
        self.opaque = None;
    }

    /// The live, lossless elevations, decoding an opaque full (non-rendered)
    /// payload on demand if that's all this frame holds. Returns `Ok(None)`
    /// if the frame was loaded already rendered (quantisation is
    /// non-invertible) or holds no data at all.
    pub fn elevations(&self) -> Result<Option<Vec<f64>>> {
        if let Some(values) = &self.elevations {
            return Ok(Some(values.clone()));
        }
        let Some(opaque) = &self.opaque else {
            return Ok(None);
        };
        if opaque.from_rendered {
            return Ok(None);
        }
        let bytes = if opaque.from_compressed {
            gzip::decompress(&opaque.bytes)?
        } else {
            opaque.bytes.clone()
        };
        let mut cursor = Cursor::new(bytes);
        let len = cursor.get_ref().len();
        let mut values = Vec::with_capacity(len / 8);
        while (cursor.position() as usize) < len {
            values.push(byteio::read_f64(&mut cursor)?);
        }
        Ok(Some(values))
    }

    /// Quantises the live elevations with `strategy`, caching the result.
    /// No-op (keeps the existing cache) if a rendering is already cached.
    pub fn render(&mut self, strategy: RenderStrategy) -> Result<()> {
        if self.rendered.is_some() {
            return Ok(());
        }
        let Some(elevations) = &self.elevations else {
            return Err(CodecError::NoData);
        };
        self.rendered = Some(match strategy {
            RenderStrategy::Relative => render_relative(elevations, self.sealevel),
            RenderStrategy::Absolute => render_absolute(elevations, self.sealevel),
        });
        Ok(())
    }

    fn has_any_data(&self) -> bool {
        self.elevations.is_some() || self.rendered.is_some() || self.opaque.is_some()
    }

    /// Writes lossless float64 cells, optionally gzipped.
    pub fn write_full(&mut self, target: &mut impl Write, compressed: bool) -> Result<()> {
        self.internal_write(target, compressed, false, None)
    }

    /// Writes the adaptively-quantised rendering, optionally gzipped.
    pub fn write_rendered(&mut self, target: &mut impl Write, compressed: bool) -> Result<()> {
        self.internal_write(target, compressed, true, None)
    }

    /// Like [`Self::write_rendered`]/[`Self::write_full`] but additionally
    /// diffs this frame's rendered values against `prev`'s, for delta
    /// chaining within a `FrameSet`. Used by `frame_set`.
    pub(crate) fn internal_write(
        &mut self,
        target: &mut impl Write,
        compressed: bool,
        rendered: bool,
        prev: Option<&ElevationFrame>,
    ) -> Result<()> {
        if !self.has_any_data() {
            return Err(CodecError::NoData);
        }

        let mut flags = 0_u64;
        if compressed {
            flags |= COMPRESSED_FLAG;
        }

        if let Some(opaque) = &self.opaque {
            if opaque.from_rendered && !rendered {
                // Quantisation is non-invertible: no amount of recoding
                // turns rendered bytes back into full elevations.
                return Err(CodecError::InvalidData);
            }
            if opaque.from_rendered == rendered {
                // Opaque pass-through: the target state matches what we
                // already hold, so only (de)compression, never decoding,
                // is needed.
                if rendered {
                    flags |= RENDERED_FLAG;
                }
                let body = gzip::recode(&opaque.bytes, opaque.from_compressed, compressed)?;
                write_header(target, body.len() as u64, flags)?;
                target.write_all(&body)?;
                return Ok(());
            }
            // Opaque full frame, rendered output requested: there's no way
            // around decoding it into live elevations before we can render.
            let elevations = self.elevations()?.ok_or(CodecError::NoData)?;
            self.elevations = Some(elevations);
            self.opaque = None;
        }

        if !rendered {
            // Live-full path: we must have raw elevations (no opaque, no
            // rendered-only state is reachable without opaque on this branch).
            let elevations = self.elevations.as_ref().ok_or(CodecError::NoData)?;
            let mut body = Vec::with_capacity(elevations.len() * 8);
            for value in elevations {
                byteio::write_f64(&mut body, *value)?;
            }
            let body = if compressed { gzip::compress(&body)? } else { body };
            write_header(target, body.len() as u64, flags)?;
            target.write_all(&body)?;
            return Ok(());
        }

        flags |= RENDERED_FLAG;
        self.render(RenderStrategy::Relative)?;
        let rendered_cells = self.rendered.as_ref().ok_or(CodecError::NoData)?;

        let mut body = pack_sections(rendered_cells);
        let prev_cells = prev.and_then(|p| p.rendered.as_deref());
        body.extend(encode_values(rendered_cells, prev_cells));

        let body = if compressed { gzip::compress(&body)? } else { body };
        write_header(target, body.len() as u64, flags)?;
        target.write_all(&body)?;
        Ok(())
    }

    /// Reads the 16-byte header and retains the payload as an opaque blob;
    /// nothing is decompressed or parsed until a getter or a write asks for it.
    pub fn read(source: &mut impl Read) -> Result<Self> {
        let data_size = byteio::read_u64(source)?;
        let flags = byteio::read_u64(source)?;
        let mut bytes = vec![0_u8; data_size as usize];
        source.read_exact(&mut bytes)?;
        Ok(Self {
            sealevel: 0.0,
            elevations: None,
            rendered: None,
            opaque: Some(OpaqueBody {
                bytes,
                from_compressed: flags & COMPRESSED_FLAG != 0,
                from_rendered: flags & RENDERED_FLAG != 0,
            }),
        })
    }
}

fn write_header(target: &mut impl Write, data_size: u64, flags: u64) -> Result<()> {
    byteio::write_u64(target, data_size)?;
    byteio::write_u64(target, flags)?;
    Ok(())
}

/// Packs each cell's 2-bit section into a byte stream, 4 cells per byte,
/// least-significant-pair first. The output is `ceil(n / 4)` bytes, with
/// no extra byte when `n % 4 == 0` (`spec.md` §4.3.2).
fn pack_sections(cells: &[RenderedElevation]) -> Vec<u8> {
    let mut out = vec![0_u8; cells.len().saturating_sub(1) / 4 + 1];
    for (i, cell) in cells.iter().enumerate() {
        out[i / 4] |= cell.section << (2 * (i % 4));
    }
    out
}

/// One byte per cell, optionally wrapping-diffed against `prev`.
fn encode_values(cells: &[RenderedElevation], prev: Option<&[RenderedElevation]>) -> Vec<u8> {
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| match prev {
            Some(prev_cells) => cell.value.wrapping_sub(prev_cells[i].value),
            None => cell.value,
        })
        .collect()
}

/// Equal-population binning over oceans (section 0) and land (sections
/// 1-3), per `spec.md` §4.3.1. Must match byte-for-byte: the compound
/// bin-advance condition below is the documented quirk, not a simplification.
fn render_relative(elevations: &[f64], sealevel: f64) -> Vec<RenderedElevation> {
    let mut out = vec![RenderedElevation::default(); elevations.len()];

    let mut oceans: Vec<(f64, usize)> = Vec::new();
    let mut land: Vec<(f64, usize)> = Vec::new();
    for (index, &elevation) in elevations.iter().enumerate() {
        if elevation - sealevel < 0.0 {
            oceans.push((elevation, index));
        } else {
            land.push((elevation, index));
        }
    }
    oceans.sort_by(|a, b| a.0.total_cmp(&b.0));
    land.sort_by(|a, b| a.0.total_cmp(&b.0));

    let bin_size = oceans.len() / 256;
    let overflow = oceans.len() % 256;
    let mut bin: u8 = 0;
    let mut bin_count = 0_usize;
    for (_, index) in &oceans {
        out[*index] = RenderedElevation {
            section: 0,
            value: bin,
        };
        bin_count += 1;
        if (bin_count == bin_size && bin as usize > overflow) || bin_count > bin_size {
            bin = bin.wrapping_add(1);
            bin_count = 0;
        }
    }

    let bin_size = land.len() / (256 * 3);
    let overflow = land.len() % (256 * 3);
    let mut big_bin: u8 = 0;
    let mut bin: u8 = 0;
    let mut bin_count = 0_usize;
    for (_, index) in &land {
        out[*index] = RenderedElevation {
            section: big_bin + 1,
            value: bin,
        };
        bin_count += 1;
        let tot_bin = bin as usize + big_bin as usize * 256;
        if (bin_count == bin_size && tot_bin > overflow) || bin_count > bin_size {
            if bin == 255 {
                bin = 0;
                big_bin = big_bin.wrapping_add(1);
            } else {
                bin += 1;
            }
            bin_count = 0;
        }
    }

    out
}

/// Fixed elevation-band quantisation, independent of a frame's own
/// distribution. Carried forward from `original_source/elevationFrame.go`'s
/// `absolute` branch as an explicit opt-in strategy (see `SPEC_FULL.md`).
fn render_absolute(elevations: &[f64], sealevel: f64) -> Vec<RenderedElevation> {
    elevations
        .iter()
        .map(|&elevation| {
            let from_sea_level = elevation - sealevel;
            if from_sea_level < -3800.0 {
                RenderedElevation {
                    section: 0,
                    value: 0,
                }
            } else if from_sea_level < 0.0 {
                RenderedElevation {
                    section: 0,
                    value: (((from_sea_level + 3800.0) / 3800.0) * 255.0) as u8,
                }
            } else if from_sea_level < 3000.0 {
                RenderedElevation {
                    section: 1,
                    value: ((from_sea_level / 3000.0) * 255.0) as u8,
                }
            } else if from_sea_level < 7000.0 {
                RenderedElevation {
                    section: 2,
                    value: (((from_sea_level - 3000.0) / 4000.0) * 255.0) as u8,
                }
            } else if from_sea_level < 14000.0 {
                RenderedElevation {
                    section: 3,
                    value: (((from_sea_level - 7000.0) / 7000.0) * 255.0) as u8,
                }
            } else {
                RenderedElevation {
                    section: 3,
                    value: 255,
                }
            }
        })
        .collect()
}
