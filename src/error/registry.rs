use super::parser::ParseError;

/// Errors of the host registration API.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
	#[error("'{0}' is already registered")]
	AlreadyRegistered(String),
	#[error("Identifier '{0}' is not a data type")]
	UnknownType(String),
	#[error("'{0}' is not an enum")]
	NotAnEnum(String),
	#[error("Invalid declaration: {0}")]
	InvalidDeclaration(#[from] ParseError),
	#[error("'{0}' can't be registered for '{1}'")]
	InvalidBehaviour(String, String),
	#[error(transparent)]
	DataType(#[from] DataTypeError),
}

/// Returned by the [`DataType`](crate::types::DataType) mutators when the
/// change would break one of the type's invariants.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeError {
	#[error("Object handle is not supported for this type")]
	HandleNotAllowed,
	#[error("The type is not a handle")]
	NotAHandle,
	#[error("Invalid array element type")]
	InvalidArrayElement,
}
