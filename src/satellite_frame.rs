//! Rendered-only RGB "satellite" imagery channel.
//!
//! Unlike [`crate::elevation_frame`], there is no lossless form: a
//! `SatelliteFrame` only ever exists as planar RGB triples, so
//! `write_full` always fails. See `spec.md` §4.4.

use crate::byteio;
use crate::error::{CodecError, Result};
use crate::gzip;
use std::io::{Cursor, Read, Write};

use crate::elevation_frame::{COMPRESSED_FLAG, RENDERED_FLAG};

/// One cell's colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A 2D lookup from a climate coordinate to a colour, supplied by the
/// caller. The format has no opinion on how this table is built; it only
/// needs to sample it.
pub trait ClimateLut {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn sample(&self, x: usize, y: usize) -> RenderedColor;
}

const TEMPERATURE_MIN: f64 = -10.0;
const TEMPERATURE_MAX: f64 = 30.0;
const PRECIPITATION_MIN: f64 = 0.0;
const PRECIPITATION_MAX: f64 = 4.16;
/// Elevations at or below this are oceanic; colour comes from temperature
/// alone rather than the climate LUT.
const OCEAN_ELEVATION_CEILING: f64 = 9620.0;
const OCEAN_ICE_TEMPERATURE: f64 = -6.0;

#[derive(Debug, Clone)]
struct OpaqueBody {
    bytes: Vec<u8>,
    from_compressed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SatelliteFrame {
    colors: Option<Vec<RenderedColor>>,
    opaque: Option<OpaqueBody>,
}

impl SatelliteFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colours every cell from temperature/precipitation by sampling
    /// `lut`, except oceanic cells (`elevation <= 9620`), which are coloured
    /// directly from temperature: icy white below -6C, blue otherwise.
    ///
    /// `temperature`, `precipitation` and `elevations` must be the same
    /// length; out-of-range temperature/precipitation values are clamped
    /// to the LUT's domain before sampling.
    pub fn set_colors_from_data(
        &mut self,
        temperature: &[f64],
        precipitation: &[f64],
        elevations: &[f64],
        lut: &impl ClimateLut,
    ) -> Result<()> {
        if temperature.len() != precipitation.len() || temperature.len() != elevations.len() {
            return Err(CodecError::InvalidData);
        }

        let width = lut.width();
        let height = lut.height();

        let colors = itertools::izip!(temperature, precipitation, elevations)
            .map(|(&temp, &precip, &elevation)| {
                if elevation <= OCEAN_ELEVATION_CEILING {
                    return if temp < OCEAN_ICE_TEMPERATURE {
                        RenderedColor {
                            r: 255,
                            g: 255,
                            b: 255,
                        }
                    } else {
                        RenderedColor {
                            r: 0,
                            g: 0,
                            b: 255,
                        }
                    };
                }

                let frac_temp =
                    ((temp - TEMPERATURE_MIN) / (TEMPERATURE_MAX - TEMPERATURE_MIN)).clamp(0.0, 1.0);
                let frac_precip = ((precip - PRECIPITATION_MIN)
                    / (PRECIPITATION_MAX - PRECIPITATION_MIN))
                    .clamp(0.0, 1.0);

                // Truncating cast, not rounding: an exact fraction of 1.0
                // lands one past the last valid index, which the clamp
                // below pulls back in bounds (`original_source/satalliteFrame.go`'s
                // `xTemp -= 1` / `yPrecip -= 1` edge case).
                let x = ((frac_temp * width as f64) as usize).min(width.saturating_sub(1));
                let y = ((frac_precip * height as f64) as usize).min(height.saturating_sub(1));
                lut.sample(x, y)
            })
            .collect();

        self.colors = Some(colors);
        self.opaque = None;
        Ok(())
    }

    /// The live colours, decoding an opaque payload on demand if that's all
    /// this frame holds.
    pub fn colors(&self) -> Result<Option<Vec<RenderedColor>>> {
        if let Some(colors) = &self.colors {
            return Ok(Some(colors.clone()));
        }
        let Some(opaque) = &self.opaque else {
            return Ok(None);
        };
        let bytes = if opaque.from_compressed {
            gzip::decompress(&opaque.bytes)?
        } else {
            opaque.bytes.clone()
        };
        Ok(Some(unpack_planar(&bytes)))
    }

    /// Always fails: satellite frames have no lossless representation.
    pub fn write_full(&mut self, _target: &mut impl Write, _compressed: bool) -> Result<()> {
        Err(CodecError::RenderedOnlyFrame)
    }

    /// Writes planar R/G/B bytes (all red, then all green, then all blue),
    /// optionally gzipped.
    pub fn write_rendered(&mut self, target: &mut impl Write, compressed: bool) -> Result<()> {
        let mut flags = RENDERED_FLAG;
        if compressed {
            flags |= COMPRESSED_FLAG;
        }

        if let Some(opaque) = &self.opaque {
            let body = gzip::recode(&opaque.bytes, opaque.from_compressed, compressed)?;
            write_header(target, body.len() as u64, flags)?;
            target.write_all(&body)?;
            return Ok(());
        }

        let Some(colors) = &self.colors else {
            return Err(CodecError::NoData);
        };
        let body = pack_planar(colors);
        let body = if compressed { gzip::compress(&body)? } else { body };
        write_header(target, body.len() as u64, flags)?;
        target.write_all(&body)?;
        Ok(())
    }

    /// Reads the 16-byte header and retains the payload opaquely.
    pub fn read(source: &mut impl Read) -> Result<Self> {
        let data_size = byteio::read_u64(source)?;
        let flags = byteio::read_u64(source)?;
        let mut bytes = vec![0_u8; data_size as usize];
        source.read_exact(&mut bytes)?;
        Ok(Self {
            colors: None,
            opaque: Some(OpaqueBody {
                bytes,
                from_compressed: flags & COMPRESSED_FLAG != 0,
            }),
        })
    }
}

fn write_header(target: &mut impl Write, data_size: u64, flags: u64) -> Result<()> {
    byteio::write_u64(target, data_size)?;
    byteio::write_u64(target, flags)?;
    Ok(())
}

fn pack_planar(colors: &[RenderedColor]) -> Vec<u8> {
    let mut out = Vec::with_capacity(colors.len() * 3);
    out.extend(colors.iter().map(|c| c.r));
    out.extend(colors.iter().map(|c| c.g));
    out.extend(colors.iter().map(|c| c.b));
    out
}

fn unpack_planar(bytes: &[u8]) -> Vec<RenderedColor> {
    let cell_count = bytes.len() / 3;
    let (red, rest) = bytes.split_at(cell_count);
    let (green, blue) = rest.split_at(cell_count);
    (0..cell_count)
        .map(|i| RenderedColor {
            r: red[i],
            g: green[i],
            b: blue[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatLut {
        color: RenderedColor,
    }

    impl ClimateLut for FlatLut {
        fn width(&self) -> usize {
            16
        }
        fn height(&self) -> usize {
            16
        }
        fn sample(&self, _x: usize, _y: usize) -> RenderedColor {
            self.color
        }
    }

    #[test]
    fn write_full_is_always_rejected() {
        let mut frame = SatelliteFrame::new();
        let mut buf = Vec::new();
        assert!(matches!(
            frame.write_full(&mut buf, false),
            Err(CodecError::RenderedOnlyFrame)
        ));
    }

    #[test]
    fn ocean_cells_bypass_the_lut() {
        let lut = FlatLut {
            color: RenderedColor {
                r: 10,
                g: 20,
                b: 30,
            },
        };
        let mut frame = SatelliteFrame::new();
        frame
            .set_colors_from_data(&[-10.0, 5.0], &[1.0, 1.0], &[0.0, 9621.0], &lut)
            .unwrap();
        let colors = frame.colors().unwrap().unwrap();
        assert_eq!(
            colors[0],
            RenderedColor {
                r: 255,
                g: 255,
                b: 255
            }
        );
        assert_eq!(colors[1], RenderedColor { r: 10, g: 20, b: 30 });
    }

    #[test]
    fn rendered_round_trip_is_byte_identical() {
        let lut = FlatLut {
            color: RenderedColor {
                r: 1,
                g: 2,
                b: 3,
            },
        };
        let mut frame = SatelliteFrame::new();
        frame
            .set_colors_from_data(&[15.0, 15.0, 15.0], &[1.0, 1.0, 1.0], &[9700.0, 9700.0, 9700.0], &lut)
            .unwrap();

        let mut first = Vec::new();
        frame.write_rendered(&mut first, true).unwrap();

        let mut cursor = Cursor::new(first.clone());
        let mut read_back = SatelliteFrame::read(&mut cursor).unwrap();

        let mut second = Vec::new();
        read_back.write_rendered(&mut second, true).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            read_back.colors().unwrap().unwrap(),
            vec![RenderedColor { r: 1, g: 2, b: 3 }; 3]
        );
    }

    #[test]
    fn opaque_frame_recompresses_on_demand() {
        let lut = FlatLut {
            color: RenderedColor { r: 9, g: 9, b: 9 },
        };
        let mut frame = SatelliteFrame::new();
        frame
            .set_colors_from_data(&[15.0], &[1.0], &[9700.0], &lut)
            .unwrap();
        let mut compressed_bytes = Vec::new();
        frame.write_rendered(&mut compressed_bytes, true).unwrap();

        let mut cursor = Cursor::new(compressed_bytes);
        let mut read_back = SatelliteFrame::read(&mut cursor).unwrap();

        let mut uncompressed = Vec::new();
        read_back.write_rendered(&mut uncompressed, false).unwrap();
        assert_eq!(uncompressed.len(), 16 + 3);
    }
}
