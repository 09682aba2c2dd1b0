//! The trivial single-float age channel: no header, no flags, 8 bytes.

use crate::Result;
use crate::byteio;
use std::io::{Read, Write};

/// A frame's age in whatever time unit the simulation uses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgeFrame {
    pub age: f64,
}

impl AgeFrame {
    pub fn new(age: f64) -> Self {
        Self { age }
    }

    /// Writes the 8-byte `f64`, no header.
    pub fn write_all(&self, target: &mut impl Write) -> Result<()> {
        byteio::write_f64(target, self.age)?;
        Ok(())
    }

    /// Reads exactly 8 bytes.
    pub fn read(source: &mut impl Read) -> Result<Self> {
        Ok(Self {
            age: byteio::read_f64(source)?,
        })
    }
}
