use std::io;

/// Reads a value back from the bytes of a received frame.
pub trait Deserialize<'a>: Sized {
    /// Deserializes a new instance from `buf`.
    ///
    /// # Arguments
    /// * `buf` - The received frame, the returned value may borrow from it.
    ///
    /// # Returns
    /// The deserialized value or an `InvalidData` io error.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}

/// A forward-only reader of big-endian fields over a frame.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn take(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame too short, needed {n} more bytes but {} are left", self.buf.len()),
            ));
        }

        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    pub(crate) fn u32(&mut self) -> io::Result<u32> {
        let bytes = self.take(size_of::<u32>())?;
        let mut raw = [0; size_of::<u32>()];
        raw.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(raw))
    }

    pub(crate) fn u64(&mut self) -> io::Result<u64> {
        let bytes = self.take(size_of::<u64>())?;
        let mut raw = [0; size_of::<u64>()];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    pub(crate) fn str(&mut self, len: usize) -> io::Result<&'a str> {
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Reads a `u64` length followed by that many native-endian `f32`s.
    pub(crate) fn f32s(&mut self) -> io::Result<Vec<f32>> {
        let len = self.u64()? as usize;
        let size = len.checked_mul(size_of::<f32>()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("vector length {len} overflows"))
        })?;

        let bytes = self.take(size)?;
        let nums = bytes
            .chunks_exact(size_of::<f32>())
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(nums)
    }

    /// Returns whatever is left of the frame.
    pub(crate) fn rest(self) -> &'a [u8] {
        self.buf
    }

    pub(crate) fn finish(self) -> io::Result<()> {
        if !self.buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} trailing bytes after the message", self.buf.len()),
            ));
        }

        Ok(())
    }
}
