use crate::DecodeError;

/// Little-endian cursor over a datagram. Every read advances by a fixed width.
pub(crate) struct PacketReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PacketReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let truncated = DecodeError::Truncated {
            offset: self.offset,
            needed: len,
            len: self.data.len(),
        };
        let end = self.offset.checked_add(len).ok_or(truncated)?;
        let slice = self.data.get(self.offset..end).ok_or(truncated)?;
        self.offset = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_exact(len).map(|_| ())
    }

    pub(crate) fn read_i8(&mut self) -> Result<i8, DecodeError> {
        self.read_array::<1>().map(i8::from_le_bytes)
    }

    pub(crate) fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        self.read_array::<4>().map(i32::from_le_bytes)
    }

    pub(crate) fn read_f32_le(&mut self) -> Result<f32, DecodeError> {
        self.read_array::<4>().map(f32::from_le_bytes)
    }

    pub(crate) fn read_f32x4_le(&mut self) -> Result<[f32; 4], DecodeError> {
        Ok([
            self.read_f32_le()?,
            self.read_f32_le()?,
            self.read_f32_le()?,
            self.read_f32_le()?,
        ])
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}
