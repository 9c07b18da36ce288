pub const MAX_ENDIAN_BYTES: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    #[inline(always)]
    pub const fn is_big(self) -> bool {
        matches!(self, Endianness::Big)
    }

    /// Decodes a byte slice as an unsigned magnitude in this byte order.
    #[inline(always)]
    pub fn decode_bytes(self, bytes: &[u8]) -> u128 {
        assert!(bytes.len() <= MAX_ENDIAN_BYTES, "value exceeds 128 bits");
        if bytes.is_empty() {
            return 0;
        }
        let mut buf = [0u8; MAX_ENDIAN_BYTES];
        match self {
            Endianness::Little => {
                buf[..bytes.len()].copy_from_slice(bytes);
                u128::from_le_bytes(buf)
            }
            Endianness::Big => {
                let start = MAX_ENDIAN_BYTES - bytes.len();
                buf[start..].copy_from_slice(bytes);
                u128::from_be_bytes(buf)
            }
        }
    }
}

#[inline(always)]
pub(crate) fn mask_bits(width_bits: usize) -> u128 {
    if width_bits >= 128 {
        u128::MAX
    } else if width_bits == 0 {
        0
    } else {
        (1u128 << width_bits) - 1
    }
}
