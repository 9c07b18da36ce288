use std::{error::Error, fmt};

pub type RegisterResult<T> = Result<T, RegisterError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// A raw-byte-buffer operation was asked to handle a register whose bit
    /// span does not land on byte boundaries.
    SubByteRegister {
        register: String,
    },
    /// A child register was written while its base register's value was not
    /// known at the target snapshot.
    BaseNotKnown {
        register: String,
    },
    /// Editor text did not encode as the declared data type.
    Encode {
        text: String,
        data_type: String,
    },
    ChildOutOfBounds {
        child: String,
        base: String,
    },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::SubByteRegister { register } => write!(
                f,
                "cannot work with sub-byte register '{register}'; use a parent register instead"
            ),
            RegisterError::BaseNotKnown { register } => write!(
                f,
                "base register of '{register}' must be fetched before setting a child"
            ),
            RegisterError::Encode { text, data_type } => {
                write!(f, "'{text}' does not encode as {data_type}")
            }
            RegisterError::ChildOutOfBounds { child, base } => {
                write!(f, "child register '{child}' exceeds the span of base '{base}'")
            }
        }
    }
}

impl Error for RegisterError {}
