/// Failures raised by the virtual machine. They abort the running call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
	#[error("Null pointer access")]
	NullPointerAccess,
	#[error("Divide by zero")]
	DivideByZero,
	#[error("Index out of bounds")]
	IndexOutOfBounds,
	#[error("Stack overflow")]
	StackOverflow,
	#[error("No function named '{0}'")]
	NoFunction(String),
	#[error("Function '{0}' failed to compile")]
	FunctionNotCompiled(String),
	#[error("Expected {expected} arguments, got {found}")]
	ArgumentCount { expected: usize, found: usize },
	#[error("Invalid value: {0}")]
	InvalidValue(String),
	#[error("Native function failed: {0}")]
	Native(String),
}
