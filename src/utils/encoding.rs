//! Little-endian field access for memory-mapped records

/// Read a little-endian u32 at `offset`
#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

/// Read a little-endian u64 at `offset`
#[inline]
pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Overwrite a little-endian u32 at `offset`
#[inline]
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Overwrite a little-endian u64 at `offset`
#[inline]
pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_fields() {
        let mut buf = vec![0u8; 16];
        write_u32(&mut buf, 1, 0xdead_beef);
        write_u64(&mut buf, 6, u64::MAX - 3);
        assert_eq!(read_u32(&buf, 1), 0xdead_beef);
        assert_eq!(read_u64(&buf, 6), u64::MAX - 3);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_read_panics() {
        let buf = [0u8; 3];
        read_u32(&buf, 0);
    }
}
