//! Bounded cursor over a borrowed transaction buffer.
//!
//! Every read is all-or-nothing: either the full destination is filled and
//! the cursor advances, or an error is returned and nothing is consumed.

/// Largest size a compact-size prefix may declare (`MAX_SIZE` in Bitcoin Core).
pub const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

/// Failures raised while reading from a [`TxInputStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("end of data: requested {requested} bytes, {remaining} remaining")]
    EndOfData { requested: usize, remaining: usize },
    #[error("non-canonical compact size encoding")]
    NonCanonicalCompactSize,
    #[error("compact size {0} exceeds the maximum of {MAX_COMPACT_SIZE}")]
    OversizedCompactSize(u64),
}

/// Reads consecutive fields out of a serialized transaction.
#[derive(Debug, Clone)]
pub struct TxInputStream<'a> {
    data: &'a [u8],
}

impl<'a> TxInputStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Fills `destination` entirely, or fails without consuming anything.
    pub fn read(&mut self, destination: &mut [u8]) -> Result<(), ReadError> {
        let bytes = self.take(destination.len())?;
        destination.copy_from_slice(bytes);
        Ok(())
    }

    /// Borrows the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        self.take(len)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0u8; N];
        self.read(&mut out)?;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ReadError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ReadError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, ReadError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, ReadError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a compact-size integer, requiring the shortest encoding and
    /// rejecting values above [`MAX_COMPACT_SIZE`].
    pub fn read_compact_size(&mut self) -> Result<u64, ReadError> {
        let checkpoint = self.data;
        let result = self.read_compact_size_unchecked();
        if result.is_err() {
            self.data = checkpoint;
        }
        result
    }

    fn read_compact_size_unchecked(&mut self) -> Result<u64, ReadError> {
        let value = match self.read_u8()? {
            0xfd => {
                let value = u64::from(self.read_u16_le()?);
                if value < 0xfd {
                    return Err(ReadError::NonCanonicalCompactSize);
                }
                value
            }
            0xfe => {
                let value = u64::from(self.read_u32_le()?);
                if value < 0x1_0000 {
                    return Err(ReadError::NonCanonicalCompactSize);
                }
                value
            }
            0xff => {
                let value = self.read_u64_le()?;
                if value < 0x1_0000_0000 {
                    return Err(ReadError::NonCanonicalCompactSize);
                }
                value
            }
            small => u64::from(small),
        };
        if value > MAX_COMPACT_SIZE {
            return Err(ReadError::OversizedCompactSize(value));
        }
        Ok(value)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        if len > self.data.len() {
            return Err(ReadError::EndOfData {
                requested: len,
                remaining: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_advances_cursor() {
        let data = [1u8, 2, 3, 4, 5];
        let mut stream = TxInputStream::new(&data);
        let mut first = [0u8; 2];
        stream.read(&mut first).unwrap();
        assert_eq!(first, [1, 2]);
        assert_eq!(stream.remaining(), 3);
        let mut rest = [0u8; 3];
        stream.read(&mut rest).unwrap();
        assert_eq!(rest, [3, 4, 5]);
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn short_read_consumes_nothing() {
        let data = [9u8, 8, 7];
        let mut stream = TxInputStream::new(&data);
        let mut dest = [0u8; 4];
        let err = stream.read(&mut dest).unwrap_err();
        assert_eq!(
            err,
            ReadError::EndOfData {
                requested: 4,
                remaining: 3
            }
        );
        assert_eq!(dest, [0u8; 4]);
        assert_eq!(stream.remaining(), 3);
        assert_eq!(stream.read_u8().unwrap(), 9);
    }

    #[test]
    fn zero_length_read_succeeds_at_end() {
        let mut stream = TxInputStream::new(&[]);
        stream.read(&mut []).unwrap();
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn little_endian_integers() {
        let data = [0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let mut stream = TxInputStream::new(&data);
        assert_eq!(stream.read_u32_le().unwrap(), 1);
        assert_eq!(stream.read_i32_le().unwrap(), -1);
    }

    #[test]
    fn compact_size_forms() {
        let mut stream = TxInputStream::new(&[0xfc]);
        assert_eq!(stream.read_compact_size().unwrap(), 0xfc);

        let mut stream = TxInputStream::new(&[0xfd, 0xfd, 0x00]);
        assert_eq!(stream.read_compact_size().unwrap(), 0xfd);

        let mut stream = TxInputStream::new(&[0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(stream.read_compact_size().unwrap(), 0x1_0000);
    }

    #[test]
    fn compact_size_rejects_non_canonical() {
        let mut stream = TxInputStream::new(&[0xfd, 0x10, 0x00]);
        assert_eq!(
            stream.read_compact_size().unwrap_err(),
            ReadError::NonCanonicalCompactSize
        );
        assert_eq!(stream.remaining(), 3);

        let mut stream = TxInputStream::new(&[0xfe, 0xff, 0xff, 0x00, 0x00]);
        assert_eq!(
            stream.read_compact_size().unwrap_err(),
            ReadError::NonCanonicalCompactSize
        );
    }

    #[test]
    fn compact_size_rejects_oversized() {
        let mut stream = TxInputStream::new(&[0xfe, 0x01, 0x00, 0x00, 0x02]);
        assert_eq!(
            stream.read_compact_size().unwrap_err(),
            ReadError::OversizedCompactSize(0x0200_0001)
        );
    }

    #[test]
    fn compact_size_truncated() {
        let mut stream = TxInputStream::new(&[0xfd, 0x01]);
        assert!(matches!(
            stream.read_compact_size(),
            Err(ReadError::EndOfData { .. })
        ));
        assert_eq!(stream.remaining(), 2);
    }

    proptest! {
        #[test]
        fn reads_never_exceed_buffer(data in proptest::collection::vec(any::<u8>(), 0..64), want in 0usize..80) {
            let mut stream = TxInputStream::new(&data);
            match stream.read_bytes(want) {
                Ok(bytes) => {
                    prop_assert_eq!(bytes, &data[..want]);
                    prop_assert_eq!(stream.remaining(), data.len() - want);
                }
                Err(_) => {
                    prop_assert!(want > data.len());
                    prop_assert_eq!(stream.remaining(), data.len());
                }
            }
        }
    }
}
