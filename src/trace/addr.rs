//! Synthetic address spaces, addresses, and inclusive ranges used to model
//! register storage as if it were memory.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    Memory,
    Register,
    Constant,
}

impl AddressSpace {
    #[inline(always)]
    pub const fn is_register_space(self) -> bool {
        matches!(self, AddressSpace::Register)
    }

    pub const fn label(self) -> &'static str {
        match self {
            AddressSpace::Memory => "ram",
            AddressSpace::Register => "reg",
            AddressSpace::Constant => "const",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "ram" => Some(AddressSpace::Memory),
            "reg" => Some(AddressSpace::Register),
            "const" => Some(AddressSpace::Constant),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub space: AddressSpace,
    pub offset: u64,
}

impl Address {
    pub const fn new(space: AddressSpace, offset: u64) -> Self {
        Self { space, offset }
    }

    pub const fn add(self, delta: u64) -> Self {
        match self.offset.checked_add(delta) {
            Some(offset) => Self {
                space: self.space,
                offset,
            },
            None => panic!("address offset overflow"),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:0x{:x}", self.space.label(), self.offset)
    }
}

/// Inclusive `[min, max]` range within a single address space. Equality and
/// containment comparisons are exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    pub space: AddressSpace,
    pub min: u64,
    pub max: u64,
}

impl AddressRange {
    pub fn new(space: AddressSpace, min: u64, max: u64) -> Self {
        debug_assert!(min <= max, "inverted address range");
        Self { space, min, max }
    }

    pub fn from_len(start: Address, byte_len: u64) -> Self {
        debug_assert!(byte_len > 0, "empty address range");
        Self::new(start.space, start.offset, start.offset + byte_len - 1)
    }

    pub const fn byte_len(&self) -> u64 {
        self.max - self.min + 1
    }

    pub fn contains(&self, other: &AddressRange) -> bool {
        self.space == other.space && self.min <= other.min && other.max <= self.max
    }

    pub const fn min_address(&self) -> Address {
        Address::new(self.space, self.min)
    }

    pub const fn max_address(&self) -> Address {
        Address::new(self.space, self.max)
    }
}

/// Resolves textual addresses and bounds offsets for a trace's address
/// domain. Implemented by the trace's base address factory.
pub trait AddressFactory {
    fn default_space(&self) -> AddressSpace;

    /// Returns `None` when the offset cannot be expressed in the space.
    fn address(&self, space: AddressSpace, offset: u64) -> Option<Address>;

    /// Parses `text` as an address, accepting an optional `space:` label
    /// prefix and hexadecimal offsets with or without `0x`.
    fn parse(&self, text: &str) -> Option<Address>;
}

#[derive(Clone, Copy, Debug)]
pub struct BaseAddressFactory {
    default_space: AddressSpace,
    max_offset: u64,
}

impl BaseAddressFactory {
    pub const fn new(default_space: AddressSpace, max_offset: u64) -> Self {
        Self {
            default_space,
            max_offset,
        }
    }
}

impl Default for BaseAddressFactory {
    fn default() -> Self {
        Self::new(AddressSpace::Memory, u64::MAX)
    }
}

impl AddressFactory for BaseAddressFactory {
    fn default_space(&self) -> AddressSpace {
        self.default_space
    }

    fn address(&self, space: AddressSpace, offset: u64) -> Option<Address> {
        if offset > self.max_offset {
            return None;
        }
        Some(Address::new(space, offset))
    }

    fn parse(&self, text: &str) -> Option<Address> {
        let text = text.trim();
        let (space, digits) = match text.split_once(':') {
            Some((label, rest)) => (AddressSpace::from_label(label)?, rest),
            None => (self.default_space, text),
        };
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        let offset = u64::from_str_radix(digits, 16).ok()?;
        self.address(space, offset)
    }
}
