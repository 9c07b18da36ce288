//! Register descriptors, the catalog that interns them, and masked register
//! values.
//!
//! A sub-register never copies its base register's bytes; it carries only its
//! own id, the base's id, and a byte mask over the base's span. Every value
//! is a `(register, bytes)` pair whose byte array spans twice the base width:
//! the first half marks which bits are defined, the second half holds the
//! big-endian magnitude.

use std::num::NonZeroU32;

use ahash::AHashMap;
use bitflags::bitflags;
use smallvec::{SmallVec, smallvec};

use super::addr::{Address, AddressRange, AddressSpace};
use super::codec::{require_byte_bound, resize};
use super::endian::{Endianness, mask_bits};
use super::error::{RegisterError, RegisterResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegisterId(NonZeroU32);

impl RegisterId {
    fn from_index(index: usize) -> Self {
        let raw = NonZeroU32::new((index as u32) + 1).expect("register index overflow");
        Self(raw)
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RegisterFlags: u8 {
        const BIG_ENDIAN = 1 << 0;
        /// Processor-context registers keep big-endian layout in the trace
        /// regardless of the declared byte order.
        const PROCESSOR_CONTEXT = 1 << 1;
    }
}

/// Static facts about a register. Immutable once interned; the catalog owns
/// the descriptors and hands out shared references.
#[derive(Clone, Debug)]
pub struct Register {
    name: String,
    id: RegisterId,
    base: RegisterId,
    address: Address,
    bit_length: u32,
    least_significant_bit: u32,
    flags: RegisterFlags,
    base_mask: SmallVec<[u8; 16]>,
}

impl Register {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> RegisterId {
        self.id
    }

    pub fn base_id(&self) -> RegisterId {
        self.base
    }

    pub fn is_base(&self) -> bool {
        self.base == self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    pub fn least_significant_bit(&self) -> u32 {
        self.least_significant_bit
    }

    pub fn is_big_endian(&self) -> bool {
        self.flags.contains(RegisterFlags::BIG_ENDIAN)
    }

    pub fn is_processor_context(&self) -> bool {
        self.flags.contains(RegisterFlags::PROCESSOR_CONTEXT)
    }

    pub fn endianness(&self) -> Endianness {
        if self.is_big_endian() {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    /// Smallest whole-byte width that holds this register's bits.
    pub fn byte_len(&self) -> usize {
        ((self.bit_length as usize) + 7) / 8
    }

    /// Byte width of the base register, which is also the width of each half
    /// of a `RegisterValue` backing array.
    pub fn base_byte_len(&self) -> usize {
        self.base_mask.len()
    }

    /// Set bits mark which bits of a base-register-sized buffer belong to
    /// this register.
    pub fn base_mask(&self) -> &[u8] {
        &self.base_mask
    }

    /// The address range this register occupies in the register space.
    pub fn range(&self) -> AddressRange {
        AddressRange::from_len(self.address, self.byte_len() as u64)
    }
}

/// Interns register descriptors and resolves base-register linkage. Stands in
/// for the language's register catalog in the trace model.
#[derive(Debug, Default)]
pub struct RegisterCatalog {
    registers: Vec<Register>,
    by_name: AHashMap<String, RegisterId>,
}

impl RegisterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: RegisterId) -> &Register {
        &self.registers[id.index()]
    }

    pub fn by_name(&self, name: &str) -> Option<&Register> {
        self.by_name.get(name).map(|id| self.register(*id))
    }

    pub fn base(&self, reg: &Register) -> &Register {
        self.register(reg.base_id())
    }

    /// Interns a base register spanning `byte_len` bytes at `offset` in
    /// `space`. The mask covers the whole span.
    pub fn add_base(
        &mut self,
        name: impl Into<String>,
        space: AddressSpace,
        offset: u64,
        byte_len: usize,
        flags: RegisterFlags,
    ) -> RegisterId {
        let id = RegisterId::from_index(self.registers.len());
        self.intern(Register {
            name: name.into(),
            id,
            base: id,
            address: Address::new(space, offset),
            bit_length: (byte_len * 8) as u32,
            least_significant_bit: 0,
            flags,
            base_mask: smallvec![0xFF; byte_len],
        })
    }

    /// Interns a byte-bound child occupying `byte_len` bytes starting
    /// `byte_offset` bytes into its base register's span.
    pub fn add_child(
        &mut self,
        name: impl Into<String>,
        base: RegisterId,
        byte_offset: usize,
        byte_len: usize,
    ) -> RegisterResult<RegisterId> {
        let name = name.into();
        let parent = self.register(base);
        let base_len = parent.byte_len();
        let address = parent.address();
        let flags = parent.flags;
        if byte_offset + byte_len > base_len {
            return Err(RegisterError::ChildOutOfBounds {
                child: name,
                base: parent.name().to_string(),
            });
        }
        let mut mask: SmallVec<[u8; 16]> = smallvec![0; base_len];
        mask[byte_offset..byte_offset + byte_len].fill(0xFF);
        // Children are addressed by memory-order distance: on a little-endian
        // base the low-magnitude child shares the base's address, while the
        // mask keeps its big-endian magnitude position. Context registers are
        // always laid out big-endian.
        let delta = if little_endian_layout(flags) {
            base_len - byte_offset - byte_len
        } else {
            byte_offset
        };
        let id = RegisterId::from_index(self.registers.len());
        Ok(self.intern(Register {
            name,
            id,
            base,
            address: address.add(delta as u64),
            bit_length: (byte_len * 8) as u32,
            least_significant_bit: ((base_len - byte_offset - byte_len) * 8) as u32,
            flags,
            base_mask: mask,
        }))
    }

    /// Interns a bit field of the base register, addressed by the bytes its
    /// span touches. Fields need not land on byte boundaries; byte-buffer
    /// operations reject them through the alignment guard.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        base: RegisterId,
        lsb: u32,
        bit_len: u32,
    ) -> RegisterResult<RegisterId> {
        let name = name.into();
        let parent = self.register(base);
        if lsb + bit_len > parent.bit_length() || bit_len == 0 {
            return Err(RegisterError::ChildOutOfBounds {
                child: name,
                base: parent.name().to_string(),
            });
        }
        let base_len = parent.byte_len();
        let address = parent.address();
        let flags = parent.flags;
        let msb = lsb + bit_len - 1;
        let mut mask: SmallVec<[u8; 16]> = smallvec![0; base_len];
        for bit in lsb..=msb {
            mask[base_len - 1 - (bit as usize) / 8] |= 1 << (bit % 8);
        }
        let first_byte = if little_endian_layout(flags) {
            (lsb as usize) / 8
        } else {
            base_len - 1 - (msb as usize) / 8
        };
        let id = RegisterId::from_index(self.registers.len());
        Ok(self.intern(Register {
            name,
            id,
            base,
            address: address.add(first_byte as u64),
            bit_length: bit_len,
            least_significant_bit: lsb,
            flags,
            base_mask: mask,
        }))
    }

    fn intern(&mut self, register: Register) -> RegisterId {
        let id = register.id();
        self.by_name.insert(register.name.clone(), id);
        self.registers.push(register);
        id
    }
}

fn little_endian_layout(flags: RegisterFlags) -> bool {
    !flags.contains(RegisterFlags::BIG_ENDIAN) && !flags.contains(RegisterFlags::PROCESSOR_CONTEXT)
}

/// A register paired with a byte array twice the base register's width: the
/// leading half is the defined-bits mask, the trailing half the big-endian
/// magnitude. Bits outside the mask are undefined and must not be trusted.
/// Immutable once built; operations return fresh values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterValue {
    register: RegisterId,
    bytes: SmallVec<[u8; 32]>,
}

impl RegisterValue {
    pub fn from_bytes(register: RegisterId, bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() % 2 == 0, "mask and value halves must match");
        Self {
            register,
            bytes: SmallVec::from_slice(bytes),
        }
    }

    pub(crate) fn from_buf(register: RegisterId, bytes: SmallVec<[u8; 32]>) -> Self {
        debug_assert!(bytes.len() % 2 == 0, "mask and value halves must match");
        Self { register, bytes }
    }

    /// Builds a value for `register` from an unsigned magnitude, placing its
    /// big-endian bytes in the register's window of the base span and
    /// clamping defined bits to the register's mask.
    pub fn with_unsigned(
        catalog: &RegisterCatalog,
        register: RegisterId,
        value: u128,
    ) -> RegisterResult<Self> {
        let reg = catalog.register(register);
        require_byte_bound(reg)?;
        let base_len = reg.base_byte_len();
        let mut bytes: SmallVec<[u8; 32]> = smallvec![0; base_len * 2];
        bytes[..base_len].copy_from_slice(reg.base_mask());
        // The magnitude sits at the mask's big-endian position, which for a
        // little-endian child differs from the memory-order address delta.
        let position = base_len - (reg.least_significant_bit() as usize) / 8 - reg.byte_len();
        let offset = base_len + position;
        let magnitude = value.to_be_bytes();
        bytes[offset..offset + reg.byte_len()]
            .copy_from_slice(&resize(&magnitude, reg.byte_len()));
        for index in 0..base_len {
            bytes[base_len + index] &= bytes[index];
        }
        Ok(Self { register, bytes })
    }

    pub fn register(&self) -> RegisterId {
        self.register
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn half(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn mask_bytes(&self) -> &[u8] {
        &self.bytes[..self.half()]
    }

    pub fn value_bytes(&self) -> &[u8] {
        &self.bytes[self.half()..]
    }

    /// Reinterprets this value as a value of its base register. The bytes
    /// already span the base width; only the child's bits are defined.
    pub fn base_register_value(&self, catalog: &RegisterCatalog) -> Self {
        let reg = catalog.register(self.register);
        Self {
            register: reg.base_id(),
            bytes: self.bytes.clone(),
        }
    }

    /// Overlays `child`'s defined bits onto this value. Bits the child's mask
    /// defines come from the child; every other bit, and its definedness,
    /// comes from `self`. Both values must span the same base width.
    pub fn combine(&self, child: &RegisterValue) -> Self {
        debug_assert_eq!(
            self.bytes.len(),
            child.bytes.len(),
            "combined values must share a base register span"
        );
        let half = self.half();
        let mut bytes = self.bytes.clone();
        for index in 0..half {
            let child_mask = child.bytes[index];
            bytes[index] |= child_mask;
            bytes[half + index] = (self.bytes[half + index] & !child_mask)
                | (child.bytes[half + index] & child_mask);
        }
        Self {
            register: self.register,
            bytes,
        }
    }

    /// The unsigned magnitude of this register's defined bits, shifted down
    /// to bit zero. Works for sub-byte registers as well.
    pub fn unsigned_value(&self, catalog: &RegisterCatalog) -> u128 {
        let reg = catalog.register(self.register);
        let half = self.half();
        let mut masked: SmallVec<[u8; 16]> = SmallVec::from_slice(self.value_bytes());
        for (byte, mask) in masked.iter_mut().zip(&self.bytes[..half]) {
            *byte &= mask;
        }
        let wide = Endianness::Big.decode_bytes(&masked);
        (wide >> reg.least_significant_bit()) & mask_bits(reg.bit_length() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn catalog_with_base() -> (RegisterCatalog, RegisterId) {
        let mut catalog = RegisterCatalog::new();
        let base = catalog.add_base(
            "r0",
            AddressSpace::Register,
            0x100,
            8,
            RegisterFlags::BIG_ENDIAN,
        );
        (catalog, base)
    }

    #[test]
    fn child_mask_and_lsb_follow_byte_position() {
        let (mut catalog, base) = catalog_with_base();
        let low = catalog.add_child("r0w", base, 6, 2).expect("child");
        let reg = catalog.register(low);
        assert_eq!(reg.base_mask(), hex!("0000 0000 0000 FFFF"));
        assert_eq!(reg.least_significant_bit(), 0);
        assert_eq!(reg.address().offset, 0x106, "child address trails the base");
        let high = catalog.add_child("r0h", base, 0, 4).expect("child");
        assert_eq!(
            catalog.register(high).least_significant_bit(),
            32,
            "leading bytes sit above the low half"
        );
    }

    #[test]
    fn little_endian_children_are_addressed_in_memory_order() {
        let mut catalog = RegisterCatalog::new();
        let base = catalog.add_base("x0", AddressSpace::Register, 0x40, 4, RegisterFlags::empty());
        let low = catalog.add_child("x0w", base, 2, 2).expect("child");
        let high = catalog.add_child("x0t", base, 0, 2).expect("child");
        let low_reg = catalog.register(low);
        assert_eq!(
            low_reg.address().offset,
            0x40,
            "the low word shares its base's address"
        );
        assert_eq!(
            low_reg.base_mask(),
            hex!("0000 FFFF"),
            "the mask keeps its big-endian magnitude position"
        );
        assert_eq!(
            catalog.register(high).address().offset,
            0x42,
            "the high word sits two bytes into memory"
        );
        let flag = catalog.add_field("x0b", base, 8, 8).expect("field");
        assert_eq!(
            catalog.register(flag).address().offset,
            0x41,
            "fields follow the same memory-order addressing"
        );
        let value = RegisterValue::with_unsigned(&catalog, low, 0xAAAA).expect("value");
        assert_eq!(
            value.value_bytes(),
            hex!("0000 AAAA"),
            "the magnitude lands under the mask, not at the address delta"
        );
        assert_eq!(value.unsigned_value(&catalog), 0xAAAA);
    }

    #[test]
    fn child_span_must_fit_the_base() {
        let (mut catalog, base) = catalog_with_base();
        let err = catalog.add_child("r0x", base, 6, 4).unwrap_err();
        assert!(
            matches!(err, RegisterError::ChildOutOfBounds { .. }),
            "overhanging child must be rejected"
        );
    }

    #[test]
    fn bit_field_mask_marks_exact_bits() {
        let (mut catalog, base) = catalog_with_base();
        let field = catalog.add_field("r0f", base, 4, 4).expect("field");
        let reg = catalog.register(field);
        assert_eq!(reg.base_mask(), hex!("0000 0000 0000 00F0"));
        assert_eq!(reg.bit_length(), 4);
        assert_eq!(reg.address().offset, 0x107, "field addressed by touched byte");
    }

    #[test]
    fn with_unsigned_places_bytes_in_the_child_window() {
        let (mut catalog, base) = catalog_with_base();
        let low = catalog.add_child("r0w", base, 6, 2).expect("child");
        let value = RegisterValue::with_unsigned(&catalog, low, 0xAAAA).expect("value");
        assert_eq!(value.mask_bytes(), hex!("0000 0000 0000 FFFF"));
        assert_eq!(value.value_bytes(), hex!("0000 0000 0000 AAAA"));
        assert_eq!(value.unsigned_value(&catalog), 0xAAAA);
    }

    #[test]
    fn with_unsigned_clamps_to_the_mask() {
        let (catalog, base) = catalog_with_base();
        let value =
            RegisterValue::with_unsigned(&catalog, base, u128::MAX).expect("value");
        assert_eq!(
            value.value_bytes(),
            hex!("FFFF FFFF FFFF FFFF"),
            "magnitude truncates to the base width"
        );
    }

    #[test]
    fn combine_overlays_only_masked_bits() {
        let (mut catalog, base) = catalog_with_base();
        let low = catalog.add_child("r0w", base, 6, 2).expect("child");
        let full = RegisterValue::with_unsigned(&catalog, base, 0x1122334455667788).expect("base");
        let child = RegisterValue::with_unsigned(&catalog, low, 0xAAAA).expect("child");
        let merged = full.combine(&child.base_register_value(&catalog));
        assert_eq!(merged.register(), base);
        assert_eq!(
            merged.unsigned_value(&catalog),
            0x112233445566AAAA,
            "only the low two bytes change"
        );
        assert_eq!(merged.mask_bytes(), hex!("FFFF FFFF FFFF FFFF"));
    }

    #[test]
    fn sub_byte_value_reads_shift_down_to_bit_zero() {
        let (mut catalog, base) = catalog_with_base();
        let field = catalog.add_field("r0f", base, 4, 4).expect("field");
        let mut bytes: SmallVec<[u8; 32]> = smallvec![0; 16];
        bytes[..8].copy_from_slice(catalog.register(field).base_mask());
        bytes[8..].copy_from_slice(&hex!("0000 0000 0000 00A5"));
        let value = RegisterValue::from_bytes(field, &bytes);
        // 0xA5 under the 0xF0 mask leaves 0xA0, shifted down to 0xA.
        assert_eq!(value.unsigned_value(&catalog), 0xA);
    }
}
