#[derive(thiserror::Error, Debug)]
pub enum ParserError {
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	#[error(transparent)]
	ParseError(#[from] ParseError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("({row}, {col}) : {type}")]
pub struct ParseError {
	pub row:    usize,
	pub col:    usize,
	pub r#type: ParseErrorType,
}

impl ParseError {
	pub fn new(row: usize, col: usize, r#type: ParseErrorType) -> Self { Self { row, col, r#type } }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorType {
	/// Found a token where another one was required
	Expected(&'static str, String),
	ExpectedExpression(String),
	ExpectedDataType(String),
	ExpectedIdentifier(String),
	/// An identifier used as a type that no one registered
	UnknownDataType(String),
	UnterminatedString,
	UnterminatedComment,
	UnrecognizedToken(String),
	/// A registration declaration with trailing text or missing parts
	InvalidDeclaration(String),
}

impl std::fmt::Display for ParseErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ParseErrorType::*;
		match self {
			Expected(what, found) => {
				write!(f, "Expected '{what}' instead of '{found}'")
			}
			ExpectedExpression(found) => {
				write!(f, "Expected expression value instead of '{found}'")
			}
			ExpectedDataType(found) => {
				write!(f, "Expected data type instead of '{found}'")
			}
			ExpectedIdentifier(found) => {
				write!(f, "Expected identifier instead of '{found}'")
			}
			UnknownDataType(name) => {
				write!(f, "Identifier '{name}' is not a data type")
			}
			UnterminatedString => {
				write!(f, "Non-terminated string literal")
			}
			UnterminatedComment => {
				write!(f, "Non-terminated comment")
			}
			UnrecognizedToken(text) => {
				write!(f, "Unexpected token '{text}'")
			}
			InvalidDeclaration(decl) => {
				write!(f, "Invalid declaration '{decl}'")
			}
		}
	}
}
