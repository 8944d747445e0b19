use std::fmt::Display;

/// A significant token produced by the scanner
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
	pub kind:   TokenKind,
	pub lexeme: &'a str,
	/// Byte offset of the first character in the source
	pub pos:    usize,
	pub row:    usize,
	pub col:    usize,
}

impl<'a> Token<'a> {
	pub fn new(kind: TokenKind, lexeme: &'a str, pos: usize, row: usize, col: usize) -> Self {
		Self { kind, lexeme, pos, row, col }
	}
}

/// Coarse classification of a token, reported along with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
	Whitespace,
	Comment,
	Value,
	Identifier,
	Keyword,
	Unknown,
}

/// Every kind of token the tokenizer can report. The primitive type keywords
/// double as the base kind of a [`DataType`](crate::types::DataType).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	#[default]
	Unrecognized,
	End,

	Whitespace,
	OnelineComment,
	MultilineComment,

	Identifier,
	IntConstant,
	FloatConstant,
	DoubleConstant,
	BitsConstant,
	StringConstant,
	MultilineStringConstant,
	HeredocStringConstant,
	NonTerminatedStringConstant,

	// Operators and punctuation
	Plus,
	AddAssign,
	Inc,
	Minus,
	SubAssign,
	Dec,
	Star,
	MulAssign,
	Slash,
	DivAssign,
	Percent,
	ModAssign,
	Assignment,
	HandleAssign,
	Equal,
	NotEqual,
	LessThan,
	LessThanOrEqual,
	GreaterThan,
	GreaterThanOrEqual,
	OpenParen,
	CloseParen,
	OpenBracket,
	CloseBracket,
	StartStatementBlock,
	EndStatementBlock,
	ListSeparator,
	EndStatement,
	Dot,
	Question,
	Colon,
	Scope,
	Amp,
	AndAssign,
	BitOr,
	OrAssign,
	BitXor,
	XorAssign,
	BitShiftLeft,
	ShiftLeftAssign,
	BitShiftRight,
	ShiftRightLAssign,
	BitShiftRightArith,
	ShiftRightAAssign,
	BitNot,
	Handle,
	And,
	Or,
	Xor,
	Not,
	Is,
	NotIs,

	// Primitive types
	Void,
	Bool,
	Int8,
	Int16,
	Int,
	Int64,
	UInt8,
	UInt16,
	UInt,
	UInt64,
	Float,
	Double,

	// Keywords
	Break,
	Case,
	Cast,
	Class,
	Const,
	Continue,
	Default,
	Do,
	Else,
	Enum,
	False,
	For,
	If,
	In,
	InOut,
	Null,
	Out,
	Return,
	Switch,
	True,
	While,
}

use TokenKind::*;

/// Reserved words and operators, matched by the tokenizer's incremental
/// prefix search.
#[rustfmt::skip]
pub const KEYWORDS: &[(&str, TokenKind)] = &[
	("+", Plus), ("+=", AddAssign), ("++", Inc),
	("-", Minus), ("-=", SubAssign), ("--", Dec),
	("*", Star), ("*=", MulAssign),
	("/", Slash), ("/=", DivAssign),
	("%", Percent), ("%=", ModAssign),
	("=", Assignment), ("==", Equal), ("@=", HandleAssign),
	("!=", NotEqual), ("<", LessThan), ("<=", LessThanOrEqual),
	(">", GreaterThan), (">=", GreaterThanOrEqual),
	("(", OpenParen), (")", CloseParen), ("[", OpenBracket), ("]", CloseBracket),
	("{", StartStatementBlock), ("}", EndStatementBlock),
	(",", ListSeparator), (";", EndStatement), (".", Dot),
	("?", Question), (":", Colon), ("::", Scope),
	("&", Amp), ("&=", AndAssign), ("|", BitOr), ("|=", OrAssign),
	("^", BitXor), ("^=", XorAssign),
	("<<", BitShiftLeft), ("<<=", ShiftLeftAssign),
	(">>", BitShiftRight), (">>=", ShiftRightLAssign),
	(">>>", BitShiftRightArith), (">>>=", ShiftRightAAssign),
	("~", BitNot), ("@", Handle),
	("&&", And), ("||", Or), ("^^", Xor), ("!", Not),
	("and", And), ("or", Or), ("xor", Xor), ("not", Not),
	("is", Is), ("!is", NotIs),
	("void", Void), ("bool", Bool),
	("int8", Int8), ("int16", Int16), ("int", Int), ("int64", Int64),
	("uint8", UInt8), ("uint16", UInt16), ("uint", UInt), ("uint64", UInt64),
	("float", Float), ("double", Double),
	("break", Break), ("case", Case), ("cast", Cast), ("class", Class),
	("const", Const), ("continue", Continue), ("default", Default), ("do", Do),
	("else", Else), ("enum", Enum), ("false", False), ("for", For), ("if", If),
	("in", In), ("inout", InOut), ("null", Null), ("out", Out),
	("return", Return), ("switch", Switch), ("true", True), ("while", While),
];

impl TokenKind {
	/// Whitespace and comments never reach the parser.
	pub fn is_ignored(&self) -> bool { matches!(self, Whitespace | OnelineComment | MultilineComment) }

	pub fn is_primitive_type(&self) -> bool {
		matches!(self, Void | Bool | Int8 | Int16 | Int | Int64 | UInt8 | UInt16 | UInt | UInt64 | Float | Double)
	}

	pub fn is_assign_operator(&self) -> bool {
		matches!(
			self,
			Assignment
				| HandleAssign | AddAssign
				| SubAssign | MulAssign
				| DivAssign | ModAssign
				| AndAssign | OrAssign
				| XorAssign | ShiftLeftAssign
				| ShiftRightLAssign
				| ShiftRightAAssign
		)
	}

	pub fn is_string_constant(&self) -> bool {
		matches!(self, StringConstant | MultilineStringConstant | HeredocStringConstant)
	}

	/// The source text of keywords and operators, or a description for the
	/// value carrying kinds.
	pub fn text(&self) -> &'static str {
		if let Some((word, _)) = KEYWORDS.iter().find(|(_, kind)| kind == self) {
			return word;
		}
		match self {
			Unrecognized => "<unrecognized token>",
			End => "<end of file>",
			Whitespace => "<white space>",
			OnelineComment | MultilineComment => "<comment>",
			Identifier => "<identifier>",
			IntConstant | BitsConstant => "<integer constant>",
			FloatConstant => "<float constant>",
			DoubleConstant => "<double constant>",
			StringConstant | MultilineStringConstant | HeredocStringConstant => "<string constant>",
			NonTerminatedStringConstant => "<non-terminated string>",
			_ => "<unknown>",
		}
	}
}

impl Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.text()) }
}
