/// String descriptor indexes use zero for "no string".
pub(crate) fn optional_nonzero_u8(value: u8) -> Option<u8> {
    if value == 0 { None } else { Some(value) }
}

pub(crate) fn u24_le(bytes: [u8; 3]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
}

/// Lowercase hex rendering used for raw byte runs in fields and reports.
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::{hex_bytes, optional_nonzero_u8, u24_le};

    #[test]
    fn optional_nonzero_u8_zero() {
        assert_eq!(optional_nonzero_u8(0), None);
    }

    #[test]
    fn optional_nonzero_u8_value() {
        assert_eq!(optional_nonzero_u8(12), Some(12));
    }

    #[test]
    fn u24_le_reads_sample_rate() {
        assert_eq!(u24_le([0x44, 0xac, 0x00]), 44_100);
        assert_eq!(u24_le([0x80, 0xbb, 0x00]), 48_000);
        assert_eq!(u24_le([0xff, 0xff, 0xff]), 0x00ff_ffff);
    }

    #[test]
    fn hex_bytes_is_lowercase() {
        assert_eq!(hex_bytes(&[0xf0, 0x43, 0x0a]), "f0430a");
        assert_eq!(hex_bytes(&[]), "");
    }
}
