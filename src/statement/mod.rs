//! Statement and declaration AST nodes.
//!
//! There is no place in the grammar where both an expression and a statement
//! are allowed. The operands of, say, `+` are always expressions, never
//! statements. The body of a `while` loop is always a statement.

use std::fmt::Display;

use crate::{parser::expression::Expression, scanner::Token, types::ParamModifier};

/// A type as written in the source, resolved against the registry by the
/// compiler.
#[derive(Debug, Clone)]
pub struct TypeDecl<'a> {
	pub is_const: bool,
	/// A primitive type keyword or an identifier
	pub base:     Token<'a>,
	pub suffixes: Vec<TypeSuffix>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSuffix {
	/// `@`, or `@ const` for a read only handle
	Handle { is_const: bool },
	/// `[]`
	Array,
}

impl Display for TypeDecl<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_const {
			write!(f, "const ")?;
		}
		write!(f, "{}", self.base.lexeme)?;
		for suffix in &self.suffixes {
			match suffix {
				TypeSuffix::Handle { is_const: false } => write!(f, "@")?,
				TypeSuffix::Handle { is_const: true } => write!(f, "@ const")?,
				TypeSuffix::Array => write!(f, "[]")?,
			}
		}
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct ParamDecl<'a> {
	pub ty:        TypeDecl<'a>,
	/// `&`, `&in`, `&out` or `&inout`. A bare `&` means `&inout`.
	pub reference: Option<ParamModifier>,
	pub name:      Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl<'a> {
	pub return_type:       TypeDecl<'a>,
	pub returns_reference: bool,
	pub name:              &'a str,
	pub params:            Vec<ParamDecl<'a>>,
	/// Trailing `const`, only meaningful for registered methods
	pub is_const:          bool,
	/// `None` for registration declarations
	pub body:              Option<Vec<Statement<'a>>>,
	pub row:               usize,
	pub col:               usize,
}

#[derive(Debug, Clone)]
pub enum Initializer<'a> {
	None,
	/// `T v = expr`
	Expression(Expression<'a>),
	/// `T v(args)`
	Args(Vec<Expression<'a>>),
}

#[derive(Debug, Clone)]
pub struct Declarator<'a> {
	pub name: &'a str,
	pub init: Initializer<'a>,
	pub row:  usize,
	pub col:  usize,
}

/// `T a = 1, b;`, one type shared by several variables.
#[derive(Debug, Clone)]
pub struct VariableDecl<'a> {
	pub ty:   TypeDecl<'a>,
	pub vars: Vec<Declarator<'a>>,
}

#[derive(Debug, Clone)]
pub struct EnumValueDecl<'a> {
	pub name:  &'a str,
	pub value: Option<Expression<'a>>,
	pub row:   usize,
	pub col:   usize,
}

#[derive(Debug, Clone)]
pub struct EnumDecl<'a> {
	pub name:   &'a str,
	pub values: Vec<EnumValueDecl<'a>>,
	pub row:    usize,
	pub col:    usize,
}

/// Top level declarations of a script.
#[derive(Debug, Clone)]
pub enum Declaration<'a> {
	Function(FunctionDecl<'a>),
	Variable(VariableDecl<'a>),
	Enum(EnumDecl<'a>),
}

#[derive(Debug, Clone, Default)]
pub struct Script<'a> {
	pub declarations: Vec<Declaration<'a>>,
}

/// One `case` or `default` label and the statements following it.
#[derive(Debug, Clone)]
pub struct Case<'a> {
	/// `None` for `default`
	pub value: Option<Expression<'a>>,
	pub body:  Vec<Statement<'a>>,
	pub row:   usize,
	pub col:   usize,
}

#[derive(Debug, Clone)]
pub struct Statement<'a> {
	pub kind: StatementKind<'a>,
	pub row:  usize,
	pub col:  usize,
}

impl<'a> Statement<'a> {
	pub fn at(kind: StatementKind<'a>, token: &Token<'_>) -> Self { Self { kind, row: token.row, col: token.col } }

	pub fn pos(&self) -> (usize, usize) { (self.row, self.col) }
}

/// A statement in the programming language.
#[derive(Debug, Clone)]
pub enum StatementKind<'a> {
	/// An expression used as a statement.
	Expression(Expression<'a>),
	/// A variable declaration statement.
	Declaration(VariableDecl<'a>),
	If {
		condition:   Expression<'a>,
		then_branch: Box<Statement<'a>>,
		else_branch: Option<Box<Statement<'a>>>,
	},
	While {
		condition: Expression<'a>,
		body:      Box<Statement<'a>>,
	},
	DoWhile {
		body:      Box<Statement<'a>>,
		condition: Expression<'a>,
	},
	For {
		init:      Option<Box<Statement<'a>>>,
		condition: Option<Expression<'a>>,
		increment: Vec<Expression<'a>>,
		body:      Box<Statement<'a>>,
	},
	Switch {
		value: Expression<'a>,
		cases: Vec<Case<'a>>,
	},
	Break,
	Continue,
	/// A return statement.
	Return(Option<Expression<'a>>),
	/// A block of statements.
	Block(Vec<Statement<'a>>),
	/// A lone `;`
	Empty,
}
