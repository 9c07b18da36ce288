//! Presentation override for pointer-typed data in the register space.
//!
//! A register holding a pointer should read, render, and parse as an address
//! rather than a raw integer. The override is a predicate-guarded branch, not
//! a type hierarchy: it applies only when the data is pointer-typed AND its
//! address lies in the register space, and delegates to the generic codec
//! everywhere else.

use super::addr::{Address, AddressFactory};
use super::codec::resize;
use super::data::{DataItem, DataKind};
use super::endian::Endianness;
use super::error::{RegisterError, RegisterResult};
use super::register::{RegisterCatalog, RegisterId, RegisterValue};

/// Rendering of the not-a-pointer sentinel.
pub const NOT_A_POINTER: &str = "NaP";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataValue {
    Address(Address),
    /// Pointer-typed, but the stored bytes do not resolve to an address.
    NotAPointer,
    Scalar(u128),
}

fn is_register_pointer(data: &dyn DataItem) -> bool {
    data.kind() == DataKind::Pointer && data.range().space.is_register_space()
}

fn resolve_pointer(data: &dyn DataItem, factory: &dyn AddressFactory) -> Option<Address> {
    let bytes = data.bytes();
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    let offset = Endianness::Big.decode_bytes(bytes) as u64;
    factory.address(factory.default_space(), offset)
}

/// Reads `data`'s value. Register-space pointers resolve through the trace's
/// default address space and never surface as raw integers; everything else
/// decodes generically.
pub fn data_value(data: &dyn DataItem, factory: &dyn AddressFactory) -> DataValue {
    if !is_register_pointer(data) {
        return DataValue::Scalar(Endianness::Big.decode_bytes(data.bytes()));
    }
    match resolve_pointer(data, factory) {
        Some(address) => DataValue::Address(address),
        None => DataValue::NotAPointer,
    }
}

/// Renders `data` for the editor: the address's canonical form for
/// register-space pointers, [`NOT_A_POINTER`] for the sentinel, and the
/// generic representation otherwise.
pub fn representation(data: &dyn DataItem, factory: &dyn AddressFactory) -> String {
    if !is_register_pointer(data) {
        return data.representation();
    }
    match resolve_pointer(data, factory) {
        Some(address) => address.to_string(),
        None => NOT_A_POINTER.to_string(),
    }
}

/// Parses editor text into a value for `register`. Register-space pointers
/// parse as addresses through the trace's address factory; other data
/// delegates to the generic encoder, whose bytes are then reinterpreted as
/// an unsigned integer sized to the register's minimum byte width and
/// honoring its endianness.
pub fn encode_representation(
    catalog: &RegisterCatalog,
    register: RegisterId,
    data: &dyn DataItem,
    text: &str,
    factory: &dyn AddressFactory,
) -> RegisterResult<RegisterValue> {
    let reg = catalog.register(register);
    if !is_register_pointer(data) {
        let encoded = data.encode_representation(text)?;
        let sized = resize(&encoded, reg.byte_len());
        let value = reg.endianness().decode_bytes(&sized);
        return RegisterValue::with_unsigned(catalog, register, value);
    }
    let address = factory.parse(text).ok_or_else(|| RegisterError::Encode {
        text: text.to_string(),
        data_type: data.data_type().to_string(),
    })?;
    RegisterValue::with_unsigned(catalog, register, address.offset as u128)
}
