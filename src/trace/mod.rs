pub mod addr;
pub mod codec;
pub mod data;
pub mod endian;
pub mod error;
pub mod pointer;
pub mod register;
pub mod storage;

pub use addr::{Address, AddressFactory, AddressRange, AddressSpace, BaseAddressFactory};
pub use codec::{
    ValueWindow, is_byte_bound, mask_offset, read_register_value, require_byte_bound, resize,
    value_window,
};
pub use data::{DataItem, DataKind, DataNode, seek_component, seek_register_component};
pub use endian::Endianness;
pub use error::{RegisterError, RegisterResult};
pub use pointer::{DataValue, NOT_A_POINTER, data_value, encode_representation, representation};
pub use register::{Register, RegisterCatalog, RegisterFlags, RegisterId, RegisterValue};
pub use storage::{MemoryState, RegisterStore, Snap, TraceRegisterBank, combine_with_base};
