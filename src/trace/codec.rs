//! Byte-level codec between the trace's canonical big-endian storage layout
//! and a register's native layout.
//!
//! The trace records every register value as a big-endian magnitude spanning
//! the whole base register. Reading or writing a (possibly little-endian,
//! possibly partial) register therefore means windowing the right bytes out
//! of the base span and reversing them where the declared byte order calls
//! for it.

use std::borrow::Cow;

use smallvec::{SmallVec, smallvec};

use super::addr::Address;
use super::error::{RegisterError, RegisterResult};
use super::register::{Register, RegisterCatalog, RegisterId, RegisterValue};

/// Pads or truncates a big-endian magnitude to `target_len` bytes. Growing
/// zero-extends on the most-significant side; shrinking drops the leading
/// overflow bytes. Never fails, and borrows the input whenever no new
/// allocation is needed.
pub fn resize(bytes: &[u8], target_len: usize) -> Cow<'_, [u8]> {
    if bytes.len() == target_len {
        return Cow::Borrowed(bytes);
    }
    if bytes.len() < target_len {
        let mut grown = vec![0u8; target_len];
        grown[target_len - bytes.len()..].copy_from_slice(bytes);
        return Cow::Owned(grown);
    }
    Cow::Borrowed(&bytes[bytes.len() - target_len..])
}

/// Byte offset of `reg`'s mask within its base register's span. Purely
/// additive; alignment is checked separately by [`require_byte_bound`].
pub fn mask_offset(catalog: &RegisterCatalog, reg: &Register) -> usize {
    if reg.is_base() {
        return 0;
    }
    (reg.address().offset - catalog.base(reg).address().offset) as usize
}

pub fn is_byte_bound(reg: &Register) -> bool {
    reg.least_significant_bit() % 8 == 0 && reg.bit_length() % 8 == 0
}

/// Raw-byte-buffer operations cannot address a register whose bit span does
/// not land on byte boundaries.
pub fn require_byte_bound(reg: &Register) -> RegisterResult<()> {
    if is_byte_bound(reg) {
        return Ok(());
    }
    Err(RegisterError::SubByteRegister {
        register: reg.name().to_string(),
    })
}

/// Read/write access to exactly the live bytes of one register, carved out
/// of a cloned base-register-sized buffer. Writes only land once the window
/// is turned back into a fresh [`RegisterValue`] with [`ValueWindow::into_value`].
#[derive(Debug)]
pub struct ValueWindow {
    register: RegisterId,
    bytes: SmallVec<[u8; 32]>,
    start: usize,
    len: usize,
    reversed: bool,
}

impl ValueWindow {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[self.start..self.start + self.len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.start..self.start + self.len]
    }

    /// Restores canonical storage order and yields the rebuilt value.
    pub fn into_value(mut self) -> RegisterValue {
        if self.reversed {
            let half = self.bytes.len() / 2;
            self.bytes[half..].reverse();
        }
        RegisterValue::from_buf(self.register, self.bytes)
    }
}

/// Windows the live bytes of `reg` out of `value`'s value half. Little-endian
/// registers get their value half reversed first, except processor-context
/// registers, which always keep big-endian layout regardless of the declared
/// byte order.
pub fn value_window(
    catalog: &RegisterCatalog,
    reg: &Register,
    value: &RegisterValue,
) -> RegisterResult<ValueWindow> {
    require_byte_bound(reg)?;
    debug_assert_eq!(
        value.bytes().len(),
        reg.base_byte_len() * 2,
        "value must span the register's base width"
    );
    let mut bytes: SmallVec<[u8; 32]> = SmallVec::from_slice(value.bytes());
    let half = bytes.len() / 2;
    let reversed = !reg.is_big_endian() && !reg.is_processor_context();
    if reversed {
        bytes[half..].reverse();
    }
    Ok(ValueWindow {
        register: value.register(),
        bytes,
        start: half + mask_offset(catalog, reg),
        len: reg.byte_len(),
        reversed,
    })
}

/// Builds a [`RegisterValue`] by letting `read` fill exactly the bytes the
/// register's mask covers. The callback receives the register's address and
/// the live window of a base-register-sized buffer, is invoked exactly once,
/// and may perform I/O. The value half is then folded back to canonical
/// big-endian order for little-endian non-context registers.
pub fn read_register_value(
    catalog: &RegisterCatalog,
    reg: &Register,
    read: impl FnOnce(Address, &mut [u8]),
) -> RegisterResult<RegisterValue> {
    require_byte_bound(reg)?;
    let mask = reg.base_mask();
    let mut bytes: SmallVec<[u8; 32]> = smallvec![0; mask.len() * 2];
    bytes[..mask.len()].copy_from_slice(mask);
    let start = mask.len() + mask_offset(catalog, reg);
    read(reg.address(), &mut bytes[start..start + reg.byte_len()]);
    if !reg.is_big_endian() && !reg.is_processor_context() {
        let half = bytes.len() / 2;
        bytes[half..].reverse();
    }
    Ok(RegisterValue::from_buf(reg.id(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::addr::AddressSpace;
    use crate::trace::register::RegisterFlags;
    use hex_literal::hex;

    fn little_endian_pair() -> (RegisterCatalog, RegisterId, RegisterId) {
        let mut catalog = RegisterCatalog::new();
        let base = catalog.add_base(
            "x0",
            AddressSpace::Register,
            0x40,
            4,
            RegisterFlags::empty(),
        );
        let low = catalog.add_child("x0h", base, 2, 2).expect("child");
        (catalog, base, low)
    }

    #[test]
    fn resize_preserves_magnitude() {
        let bytes = hex!("0102");
        assert_eq!(&*resize(&bytes, 2), bytes, "equal length passes through");
        assert_eq!(
            &*resize(&bytes, 4),
            hex!("0000 0102"),
            "growth zero-extends on the most-significant side"
        );
        assert_eq!(
            &*resize(&hex!("AA01 02"), 2),
            hex!("0102"),
            "shrinking drops leading overflow bytes"
        );
        assert!(
            matches!(resize(&bytes, 2), Cow::Borrowed(_)),
            "no copy when the length already matches"
        );
    }

    #[test]
    fn resize_round_trips_through_padding() {
        let bytes = hex!("DEAD BEEF");
        for target in bytes.len()..=12 {
            let padded = resize(&bytes, target).into_owned();
            assert_eq!(
                &*resize(&padded, bytes.len()),
                bytes,
                "pad to {target} then truncate must restore the input"
            );
        }
    }

    #[test]
    fn mask_offset_is_the_memory_order_distance() {
        let (catalog, base, low) = little_endian_pair();
        assert_eq!(mask_offset(&catalog, catalog.register(base)), 0);
        assert_eq!(
            mask_offset(&catalog, catalog.register(low)),
            0,
            "a little-endian low child starts at its base's address"
        );
        let mut big = RegisterCatalog::new();
        let r0 = big.add_base(
            "r0",
            AddressSpace::Register,
            0x100,
            8,
            RegisterFlags::BIG_ENDIAN,
        );
        let r0w = big.add_child("r0w", r0, 6, 2).expect("child");
        assert_eq!(
            mask_offset(&big, big.register(r0w)),
            6,
            "big-endian children trail their base in memory"
        );
    }

    #[test]
    fn child_window_fits_inside_the_base() {
        let (catalog, base, low) = little_endian_pair();
        let base_reg = catalog.register(base);
        let child = catalog.register(low);
        assert!(
            mask_offset(&catalog, child) + child.byte_len() <= base_reg.byte_len(),
            "child window may never overhang the base span"
        );
    }

    #[test]
    fn little_endian_child_window_presents_its_low_bytes() {
        let (catalog, base, low) = little_endian_pair();
        let stored = RegisterValue::from_bytes(base, &hex!("FFFF FFFF 0102 0304"));
        let window = value_window(&catalog, catalog.register(low), &stored).expect("window");
        assert_eq!(
            window.bytes(),
            hex!("0403"),
            "the child's window holds its native low bytes, not the leading pair"
        );

        let mut window = value_window(&catalog, catalog.register(low), &stored).expect("window");
        window.bytes_mut().copy_from_slice(&hex!("CDAB"));
        let written = window.into_value();
        assert_eq!(
            written.value_bytes(),
            hex!("0102 ABCD"),
            "the write lands on the child's bytes of the canonical storage"
        );
    }

    #[test]
    fn little_endian_window_reverses_the_value_half() {
        let (catalog, base, _) = little_endian_pair();
        let value = RegisterValue::from_bytes(base, &hex!("FFFF FFFF 0102 0304"));
        let window = value_window(&catalog, catalog.register(base), &value).expect("window");
        assert_eq!(
            window.bytes(),
            hex!("0403 0201"),
            "window presents register-native byte order"
        );
    }

    #[test]
    fn window_writes_restore_canonical_order() {
        let (catalog, base, _) = little_endian_pair();
        let value = RegisterValue::from_bytes(base, &hex!("FFFF FFFF 0102 0304"));
        let mut window = value_window(&catalog, catalog.register(base), &value).expect("window");
        let native: SmallVec<[u8; 16]> = SmallVec::from_slice(window.bytes());
        window.bytes_mut().copy_from_slice(&native);
        assert_eq!(
            window.into_value(),
            value,
            "writing the windowed bytes back must reproduce the stored bytes"
        );
    }

    #[test]
    fn context_registers_keep_big_endian_layout() {
        let mut catalog = RegisterCatalog::new();
        let ctx = catalog.add_base(
            "contextreg",
            AddressSpace::Register,
            0x0,
            4,
            RegisterFlags::PROCESSOR_CONTEXT,
        );
        let value = RegisterValue::from_bytes(ctx, &hex!("FFFF FFFF 0102 0304"));
        let window = value_window(&catalog, catalog.register(ctx), &value).expect("window");
        assert_eq!(
            window.bytes(),
            hex!("0102 0304"),
            "context registers ignore the declared little-endian order"
        );
    }

    #[test]
    fn sub_byte_registers_are_rejected_by_the_guard() {
        let mut catalog = RegisterCatalog::new();
        let base = catalog.add_base(
            "r0",
            AddressSpace::Register,
            0x0,
            8,
            RegisterFlags::BIG_ENDIAN,
        );
        let field = catalog.add_field("r0f", base, 3, 5).expect("field");
        let reg = catalog.register(field);
        assert!(!is_byte_bound(reg));
        let err = require_byte_bound(reg).unwrap_err();
        assert!(matches!(err, RegisterError::SubByteRegister { .. }));
        let value = RegisterValue::from_bytes(field, &[0; 16]);
        assert!(
            value_window(&catalog, reg, &value).is_err(),
            "window construction must call the guard first"
        );
    }

    #[test]
    fn read_path_lands_fetched_bytes_under_the_mask() {
        let (catalog, base, low) = little_endian_pair();
        let reg = catalog.register(low);
        let mut calls = 0;
        let value = read_register_value(&catalog, reg, |address, window| {
            calls += 1;
            assert_eq!(address, reg.address(), "callback sees the register address");
            assert_eq!(
                address,
                catalog.register(base).address(),
                "the low child reads from its base's address"
            );
            assert_eq!(window.len(), 2, "callback sees exactly the live bytes");
            // Native order for 0xABCD on a little-endian register.
            window.copy_from_slice(&hex!("CDAB"));
        })
        .expect("read");
        assert_eq!(calls, 1, "read callback runs exactly once");
        assert_eq!(value.mask_bytes(), hex!("0000 FFFF"));
        assert_eq!(
            value.value_bytes(),
            hex!("0000 ABCD"),
            "the fetched bytes fold back under the defined-bits mask"
        );
        assert_eq!(value.unsigned_value(&catalog), 0xABCD);
    }
}
