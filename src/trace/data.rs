//! Typed data items and the structure-field resolver.
//!
//! When a register's storage is modeled as a field of a typed aggregate
//! rather than raw trace bytes, the resolver narrows the aggregate down to
//! the component whose address range equals the register's range.

use std::cmp::Ordering;

use super::addr::AddressRange;
use super::codec::resize;
use super::endian::Endianness;
use super::error::{RegisterError, RegisterResult};
use super::register::Register;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    Scalar,
    Pointer,
    Structure,
}

/// One node of a typed data tree: an address range, a data-type tag, and a
/// codec for its textual representation. Traversed read-only.
pub trait DataItem {
    fn range(&self) -> AddressRange;

    /// The declared data-type name, used in encode errors.
    fn data_type(&self) -> &str;

    fn kind(&self) -> DataKind;

    /// The component containing the byte at `offset` from this item's start,
    /// for aggregate items.
    fn component_at(&self, offset: u64) -> Option<&dyn DataItem>;

    /// The stored bytes in trace-canonical big-endian order.
    fn bytes(&self) -> &[u8];

    /// Generic textual representation of the stored value.
    fn representation(&self) -> String;

    /// Generic encoder: turns editor text into stored bytes of this item's
    /// length, or an encode error naming the text and type.
    fn encode_representation(&self, text: &str) -> RegisterResult<Vec<u8>>;
}

/// Locates the structural component of `data` whose range equals `range`
/// exactly. Returns `None` for absent data, non-aggregate items, and ranges
/// that do not land on a single field; a miss is not an error, so callers
/// can fall back to raw-memory-backed register storage.
///
/// Iterative narrowing with an explicit current node, so pathological
/// nesting cannot overflow the stack. Dynamic and variable-length
/// aggregates are not supported.
pub fn seek_component<'a>(
    data: Option<&'a dyn DataItem>,
    range: AddressRange,
) -> Option<&'a dyn DataItem> {
    let mut current = data?;
    loop {
        if current.kind() != DataKind::Structure {
            return None;
        }
        let span = current.range();
        if span.space != range.space || range.min < span.min {
            return None;
        }
        // Data spans are bounded so the offset fits a 32-bit index.
        let offset = range.min - span.min;
        if offset > i32::MAX as u64 {
            return None;
        }
        let component = current.component_at(offset)?;
        match range.max.cmp(&component.range().max) {
            Ordering::Greater => return None,
            Ordering::Equal if component.range().min == range.min => return Some(component),
            _ => current = component,
        }
    }
}

/// Resolves the structural field backing `reg`'s address range.
pub fn seek_register_component<'a>(
    data: Option<&'a dyn DataItem>,
    reg: &Register,
) -> Option<&'a dyn DataItem> {
    seek_component(data, reg.range())
}

/// Plain tree node implementing [`DataItem`], for traces that model typed
/// register storage without a full listing database behind it.
#[derive(Clone, Debug)]
pub struct DataNode {
    range: AddressRange,
    kind: DataKind,
    type_name: String,
    bytes: Vec<u8>,
    components: Vec<DataNode>,
}

impl DataNode {
    pub fn scalar(type_name: impl Into<String>, range: AddressRange, bytes: Vec<u8>) -> Self {
        Self {
            range,
            kind: DataKind::Scalar,
            type_name: type_name.into(),
            bytes,
            components: Vec::new(),
        }
    }

    pub fn pointer(type_name: impl Into<String>, range: AddressRange, bytes: Vec<u8>) -> Self {
        Self {
            range,
            kind: DataKind::Pointer,
            type_name: type_name.into(),
            bytes,
            components: Vec::new(),
        }
    }

    pub fn structure(
        type_name: impl Into<String>,
        range: AddressRange,
        components: Vec<DataNode>,
    ) -> Self {
        debug_assert!(
            components.iter().all(|c| range.contains(&c.range)),
            "components must lie inside the structure span"
        );
        Self {
            range,
            kind: DataKind::Structure,
            type_name: type_name.into(),
            bytes: Vec::new(),
            components,
        }
    }
}

impl DataItem for DataNode {
    fn range(&self) -> AddressRange {
        self.range
    }

    fn data_type(&self) -> &str {
        &self.type_name
    }

    fn kind(&self) -> DataKind {
        self.kind
    }

    fn component_at(&self, offset: u64) -> Option<&dyn DataItem> {
        let target = self.range.min.checked_add(offset)?;
        self.components
            .iter()
            .find(|c| c.range.min <= target && target <= c.range.max)
            .map(|c| c as &dyn DataItem)
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn representation(&self) -> String {
        match self.kind {
            DataKind::Structure => self.type_name.clone(),
            _ => format!("0x{:x}", Endianness::Big.decode_bytes(&self.bytes)),
        }
    }

    fn encode_representation(&self, text: &str) -> RegisterResult<Vec<u8>> {
        let encode_err = || RegisterError::Encode {
            text: text.to_string(),
            data_type: self.type_name.clone(),
        };
        if self.kind == DataKind::Structure {
            return Err(encode_err());
        }
        let text = text.trim();
        let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(digits) => u128::from_str_radix(digits, 16),
            None => text.parse::<u128>(),
        }
        .map_err(|_| encode_err())?;
        let byte_len = self.range.byte_len() as usize;
        Ok(resize(&value.to_be_bytes(), byte_len).into_owned())
    }
}
