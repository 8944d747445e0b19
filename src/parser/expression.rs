//! Expression AST nodes
//!
//! An `Expression` is a tree structure representing code like `-123 *
//! (a.b[2] + f(x))` as nested nodes. Every node remembers the source position
//! diagnostics about it should point to.

use std::fmt::Display;

use ExpressionKind::*;

use crate::{scanner::{Token, TokenKind}, statement::TypeDecl};

#[derive(Debug, Clone)]
pub struct Expression<'a> {
	pub kind: ExpressionKind<'a>,
	pub row:  usize,
	pub col:  usize,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind<'a> {
	/// Numbers, strings, `true`, `false` and `null`
	Literal(Token<'a>),
	/// A variable or enum value, optionally qualified as `Scope::name`
	Variable { scope: Option<&'a str>, name: &'a str },
	Unary { operator: TokenKind, right: Box<Expression<'a>> },
	Postfix { operator: TokenKind, left: Box<Expression<'a>> },
	Binary { left: Box<Expression<'a>>, operator: TokenKind, right: Box<Expression<'a>> },
	Assign { target: Box<Expression<'a>>, operator: TokenKind, value: Box<Expression<'a>> },
	Ternary { condition: Box<Expression<'a>>, then_branch: Box<Expression<'a>>, else_branch: Box<Expression<'a>> },
	/// A function call, or a construct call when `name` is a type
	Call { scope: Option<&'a str>, name: &'a str, args: Vec<Expression<'a>> },
	/// `T(args)` for a primitive `T`
	Construct { ty: TypeDecl<'a>, args: Vec<Expression<'a>> },
	Cast { ty: TypeDecl<'a>, expr: Box<Expression<'a>> },
	Member { object: Box<Expression<'a>>, name: &'a str },
	MethodCall { object: Box<Expression<'a>>, name: &'a str, args: Vec<Expression<'a>> },
	Index { object: Box<Expression<'a>>, index: Box<Expression<'a>> },
	Grouping(Box<Expression<'a>>),
}

impl<'a> Expression<'a> {
	pub fn new(kind: ExpressionKind<'a>, row: usize, col: usize) -> Self { Self { kind, row, col } }

	pub fn at(kind: ExpressionKind<'a>, token: &Token<'_>) -> Self { Self::new(kind, token.row, token.col) }

	pub fn boxed(self) -> Box<Self> { Box::new(self) }

	pub fn pos(&self) -> (usize, usize) { (self.row, self.col) }

	/// The expression with any parentheses around it removed.
	pub fn ungrouped(&self) -> &Self {
		match &self.kind {
			Grouping(inner) => inner.ungrouped(),
			_ => self,
		}
	}
}

fn list(f: &mut std::fmt::Formatter<'_>, args: &[Expression<'_>]) -> std::fmt::Result {
	for arg in args {
		write!(f, " {arg}")?;
	}
	Ok(())
}

impl Display for Expression<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.kind {
			Literal(token) => write!(f, "{}", token.lexeme),
			Variable { scope: Some(scope), name } => write!(f, "{scope}::{name}"),
			Variable { scope: None, name } => write!(f, "{name}"),
			Unary { operator, right } => write!(f, "({operator} {right})"),
			Postfix { operator, left } => write!(f, "({left} {operator})"),
			Binary { left, operator, right } => write!(f, "({operator} {left} {right})"),
			Assign { target, operator, value } => write!(f, "({operator} {target} {value})"),
			Ternary { condition, then_branch, else_branch } => {
				write!(f, "(? {condition} : {then_branch} {else_branch})")
			}
			Call { scope, name, args } => {
				match scope {
					Some(scope) => write!(f, "(call {scope}::{name}")?,
					None => write!(f, "(call {name}")?,
				}
				list(f, args)?;
				write!(f, ")")
			}
			Construct { ty, args } => {
				write!(f, "({ty}")?;
				list(f, args)?;
				write!(f, ")")
			}
			Cast { ty, expr } => write!(f, "(cast<{ty}> {expr})"),
			Member { object, name } => write!(f, "(. {object} {name})"),
			MethodCall { object, name, args } => {
				write!(f, "(.call {object} {name}")?;
				list(f, args)?;
				write!(f, ")")
			}
			Index { object, index } => write!(f, "([] {object} {index})"),
			Grouping(expression) => write!(f, "(group {expression})"),
		}
	}
}
