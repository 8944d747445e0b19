//! Compiler diagnostics.
//!
//! The compiler never stops at the first problem. Every message is a
//! [`Diagnostic`] handed to a [`MessageSink`]; errors also mark the function
//! being compiled as failed so that no bytecode is kept for it.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Error,
	Warning,
	Info,
}

impl Display for Severity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Severity::Error => write!(f, "Error  "),
			Severity::Warning => write!(f, "Warning"),
			Severity::Info => write!(f, "Info   "),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
	pub section:  String,
	pub row:      usize,
	pub col:      usize,
	pub severity: Severity,
	pub message:  String,
}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({}, {}) : {} : {}", self.section, self.row, self.col, self.severity, self.message)
	}
}

/// Receives every message produced while building a module.
pub trait MessageSink {
	fn message(&mut self, diagnostic: Diagnostic);
}

/// Prints messages to stderr as they arrive.
#[derive(Debug, Default)]
pub struct StderrSink;

impl MessageSink for StderrSink {
	fn message(&mut self, diagnostic: Diagnostic) { eprintln!("{diagnostic}") }
}

/// Keeps messages for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
	pub messages: Vec<Diagnostic>,
}

impl CollectingSink {
	pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
		self.messages.iter().filter(|d| d.severity == Severity::Error)
	}

	pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
		self.messages.iter().filter(|d| d.severity == Severity::Warning)
	}

	/// Whether any message contains `text`.
	pub fn contains(&self, text: &str) -> bool { self.messages.iter().any(|d| d.message.contains(text)) }
}

impl MessageSink for CollectingSink {
	fn message(&mut self, diagnostic: Diagnostic) { self.messages.push(diagnostic) }
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
	fn message(&mut self, diagnostic: Diagnostic) { (**self).message(diagnostic) }
}

/// Every message the compiler can report. Types are already formatted.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorType {
	AlreadyDeclared(String),
	NotDeclared(String),
	DataTypeCantBe(String),
	UnknownType(String),
	NoConversion(String, String),
	CantImplicitlyConvert(String, String),
	IllegalOperation,
	IllegalOperationOn(String),
	NotAMember(String, String),
	NotAFunction(String),
	NoMatchingSignatures(String),
	MultipleMatchingSignatures(String),
	Candidate(String),
	MoreThanOneMatchingOp,
	FunctionNotFound(String),
	NoGetAccessor,
	NoSetAccessor,
	CompoundAssignWithProperty,
	RefIsReadOnly,
	RefIsTemporary,
	NotValidReference,
	NotLValue,
	ArgNotLValue,
	NoDefaultCopyOp,
	NoDefaultConstructor(String),
	HandleNotSupported,
	NotInGlobalExpression(&'static str),
	NoIndexOperator(String),
	BothExpressionsSameType,
	ExpressionMustBeBool,
	SwitchMustBeIntegral,
	SwitchCaseMustBeConstant,
	DuplicateSwitchCase,
	DefaultMustBeLast,
	EmptySwitch,
	InvalidBreak,
	InvalidContinue,
	MustReturnValue,
	CantReturnValue,
	NotAllPathsReturn,
	DivideByZero,
	StringFactoryMissing,
	InvalidStringEscape,
	ExpectedConstant,
	ImplicitValueCastRequired(String),
	// Warnings
	UnreachableCode,
	Uninitialized(String),
	SignedUnsignedMismatch,
	ChangeSign,
	ValueTooLarge,
	NotExact,
	LossOfPrecision,
	ImplicitHandleComparison,
}

impl CompileErrorType {
	pub fn severity(&self) -> Severity {
		use CompileErrorType::*;
		match self {
			UnreachableCode
			| Uninitialized(_)
			| SignedUnsignedMismatch
			| ChangeSign
			| ValueTooLarge
			| NotExact
			| LossOfPrecision
			| ImplicitHandleComparison => Severity::Warning,
			Candidate(_) => Severity::Info,
			_ => Severity::Error,
		}
	}
}

impl Display for CompileErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use CompileErrorType::*;
		match self {
			AlreadyDeclared(name) => write!(f, "'{name}' is already declared"),
			NotDeclared(name) => write!(f, "'{name}' is not declared"),
			DataTypeCantBe(ty) => write!(f, "Data type can't be '{ty}'"),
			UnknownType(name) => write!(f, "Identifier '{name}' is not a data type"),
			NoConversion(from, to) => write!(f, "No conversion from '{from}' to '{to}' available."),
			CantImplicitlyConvert(from, to) => write!(f, "Can't implicitly convert from '{from}' to '{to}'."),
			IllegalOperation => write!(f, "Illegal operation on this datatype"),
			IllegalOperationOn(ty) => write!(f, "Illegal operation on '{ty}'"),
			NotAMember(name, ty) => write!(f, "'{name}' is not a member of '{ty}'"),
			NotAFunction(name) => write!(f, "'{name}' is not a function"),
			NoMatchingSignatures(sig) => write!(f, "No matching signatures to '{sig}'"),
			MultipleMatchingSignatures(sig) => write!(f, "Multiple matching signatures to '{sig}'"),
			Candidate(decl) => write!(f, "Candidate: {decl}"),
			MoreThanOneMatchingOp => write!(f, "Found more than one matching operator"),
			FunctionNotFound(name) => write!(f, "No matching operator '{name}' found"),
			NoGetAccessor => write!(f, "The property has no get accessor"),
			NoSetAccessor => write!(f, "The property has no set accessor"),
			CompoundAssignWithProperty => write!(f, "Compound assignments with property accessors are not allowed"),
			RefIsReadOnly => write!(f, "Reference is read-only"),
			RefIsTemporary => write!(f, "Reference is temporary"),
			NotValidReference => write!(f, "Not a valid reference"),
			NotLValue => write!(f, "Not a valid lvalue"),
			ArgNotLValue => write!(f, "Output argument expression is not assignable"),
			NoDefaultCopyOp => write!(f, "There is no copy operator for this type available."),
			NoDefaultConstructor(ty) => write!(f, "No default constructor for object of type '{ty}'."),
			HandleNotSupported => write!(f, "Object handle is not supported for this type"),
			NotInGlobalExpression(what) => write!(f, "{what} is not allowed in global expressions"),
			NoIndexOperator(ty) => write!(f, "Type '{ty}' doesn't support the indexing operator"),
			BothExpressionsSameType => write!(f, "Both expressions must have the same type"),
			ExpressionMustBeBool => write!(f, "Expression must be of boolean type"),
			SwitchMustBeIntegral => write!(f, "Switch expression must be an integral type"),
			SwitchCaseMustBeConstant => write!(f, "Case expressions must be constants"),
			DuplicateSwitchCase => write!(f, "Duplicate switch case"),
			DefaultMustBeLast => write!(f, "The default case must be the last one"),
			EmptySwitch => write!(f, "Empty switch statement"),
			InvalidBreak => write!(f, "Invalid 'break'"),
			InvalidContinue => write!(f, "Invalid 'continue'"),
			MustReturnValue => write!(f, "Must return a value"),
			CantReturnValue => write!(f, "Can't return value when return type is 'void'"),
			NotAllPathsReturn => write!(f, "Not all paths return a value"),
			DivideByZero => write!(f, "Divide by zero"),
			StringFactoryMissing => write!(f, "Strings are not supported, no string factory is registered"),
			InvalidStringEscape => write!(f, "Invalid escape sequence"),
			ExpectedConstant => write!(f, "Expected a constant expression"),
			ImplicitValueCastRequired(ty) => write!(f, "Can't implicitly convert '{ty}' without an explicit cast"),
			UnreachableCode => write!(f, "Unreachable code"),
			Uninitialized(name) => write!(f, "'{name}' is not initialized."),
			SignedUnsignedMismatch => write!(f, "Signed/Unsigned mismatch"),
			ChangeSign => write!(f, "Implicit conversion changed sign of value"),
			ValueTooLarge => write!(f, "Value is too large for data type"),
			NotExact => write!(f, "Implicit conversion of value is not exact"),
			LossOfPrecision => write!(f, "Conversion from double to float, possible loss of precision"),
			ImplicitHandleComparison => {
				write!(f, "The operand is implicitly converted to handle in order to compare them")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn warnings_are_classified() {
		assert_eq!(CompileErrorType::ChangeSign.severity(), Severity::Warning);
		assert_eq!(CompileErrorType::NoGetAccessor.severity(), Severity::Error);
		assert_eq!(CompileErrorType::Candidate("void f()".into()).severity(), Severity::Info);
	}

	#[test]
	fn diagnostics_render_like_the_cli_prints_them() {
		let d = Diagnostic {
			section:  "script.as".into(),
			row:      3,
			col:      7,
			severity: Severity::Error,
			message:  CompileErrorType::NotDeclared("x".into()).to_string(),
		};
		assert_eq!(d.to_string(), "script.as (3, 7) : Error   : 'x' is not declared");
	}
}
