//! Little-endian primitive read/write helpers.
//!
//! All multi-byte values on the wire are little-endian. These are thin
//! wrappers over [`byteorder`] so the rest of the crate never has to name
//! the endianness at each call site.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub fn write_u64(w: &mut impl Write, value: u64) -> io::Result<()> {
    w.write_u64::<LE>(value)
}

pub fn write_i16(w: &mut impl Write, value: i16) -> io::Result<()> {
    w.write_i16::<LE>(value)
}

pub fn write_f64(w: &mut impl Write, value: f64) -> io::Result<()> {
    w.write_f64::<LE>(value)
}

pub fn read_u64(r: &mut impl Read) -> io::Result<u64> {
    r.read_u64::<LE>()
}

pub fn read_i16(r: &mut impl Read) -> io::Result<i16> {
    r.read_i16::<LE>()
}

pub fn read_f64(r: &mut impl Read) -> io::Result<f64> {
    r.read_f64::<LE>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_primitives() {
        let mut buf = Vec::new();
        write_u64(&mut buf, 0xdead_beef_cafe_u64).unwrap();
        write_i16(&mut buf, -7).unwrap();
        write_f64(&mut buf, 171.002301).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_u64(&mut cursor).unwrap(), 0xdead_beef_cafe_u64);
        assert_eq!(read_i16(&mut cursor).unwrap(), -7);
        assert_eq!(read_f64(&mut cursor).unwrap(), 171.002301);
    }
}
