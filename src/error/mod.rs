pub mod compiler;
pub mod parser;
pub mod registry;
pub mod runtime;

/// ZangelError is the top-level error type of the engine.
#[derive(thiserror::Error, Debug)]
pub enum ZangelError {
	/// Internal error, should never happen
	#[error("EngineInternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	/// Syntax errors encountered during parsing
	#[error("Generated {0} parser errors")]
	ParserErrors(usize),
	/// Errors reported while compiling function bodies
	#[error("Generated {0} compiler errors")]
	CompileErrors(usize),
	/// The host registered something inconsistent
	#[error("Registration failed: {0}")]
	Registration(#[from] registry::RegistryError),
	/// Errors raised while executing bytecode
	#[error("Runtime error:\n{0}")]
	Runtime(#[from] runtime::RuntimeError),
}
