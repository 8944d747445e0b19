//! Expression grammar, lowest precedence first:
//!
//! |Name|Operators|Associates
//! --|--|--
//! Assignment|= += -= *= /= %= &= \|= ^= <<= >>= >>>= @=|Right
//! Ternary|?:|Right
//! Logical or|\|\| or|Left
//! Logical xor|^^ xor|Left
//! Logical and|&& and|Left
//! Bitwise|\| ^ &|Left
//! Equality|== != is !is|Left
//! Comparison|< > <= >=|Left
//! Shift|<< >> >>>|Left
//! Term|+ -|Left
//! Factor|* / %|Left
//! Unary|- + ! ~ ++ -- @|Right
//! Postfix|++ -- . []|Left
//!
//! ``` BNF
//! assignment     → ternary ( ASSIGN_OP assignment )? ;
//! ternary        → binary ( "?" assignment ":" assignment )? ;
//! binary         → unary ( BINARY_OP unary )* ;   precedence climbing
//! unary          → UNARY_OP unary | postfix ;
//! postfix        → primary ( "." IDENT arguments? | "[" assignment "]" | "++" | "--" )* ;
//! primary        → CONSTANT | "(" assignment ")" | "cast" "<" type ">" "(" assignment ")"
//!                | PRIMITIVE arguments | ( "::" )? ( IDENT "::" )? IDENT arguments? ;
//! ```

use TokenKind::*;

use super::{Parser, expression::{Expression, ExpressionKind}};
use crate::{error::parser::{ParseErrorType, ParserError}, scanner::TokenKind};

#[rustfmt::skip]
fn binary_precedence(kind: TokenKind) -> Option<u8> {
	Some(match kind {
		Or => 0,
		Xor => 1,
		And => 2,
		BitOr => 3,
		BitXor => 4,
		Amp => 5,
		Equal | NotEqual | Is | NotIs => 6,
		LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => 7,
		BitShiftLeft | BitShiftRight | BitShiftRightArith => 8,
		Plus | Minus => 9,
		Star | Slash | Percent => 10,
		_ => return None,
	})
}

impl<'a> Parser<'a> {
	pub fn expression(&mut self) -> Result<Expression<'a>, ParserError> { self.assignment() }

	fn assignment(&mut self) -> Result<Expression<'a>, ParserError> {
		let target = self.ternary()?;
		if self.peek().kind.is_assign_operator() {
			let operator = self.advance()?;
			let value = self.assignment()?;
			let kind = ExpressionKind::Assign { target: target.boxed(), operator: operator.kind, value: value.boxed() };
			return Ok(Expression::at(kind, &operator));
		}
		Ok(target)
	}

	fn ternary(&mut self) -> Result<Expression<'a>, ParserError> {
		let condition = self.binary(0)?;
		if !self.check(Question) {
			return Ok(condition);
		}
		let question = self.advance()?;
		let then_branch = self.assignment()?;
		self.expect(Colon, ":")?;
		let else_branch = self.assignment()?;
		let kind = ExpressionKind::Ternary {
			condition:   condition.boxed(),
			then_branch: then_branch.boxed(),
			else_branch: else_branch.boxed(),
		};
		Ok(Expression::at(kind, &question))
	}

	fn binary(&mut self, min_precedence: u8) -> Result<Expression<'a>, ParserError> {
		let mut left = self.unary()?;
		while let Some(precedence) = binary_precedence(self.peek().kind)
			&& precedence >= min_precedence
		{
			let operator = self.advance()?;
			let right = self.binary(precedence + 1)?;
			let kind = ExpressionKind::Binary { left: left.boxed(), operator: operator.kind, right: right.boxed() };
			left = Expression::at(kind, &operator);
		}
		Ok(left)
	}

	fn unary(&mut self) -> Result<Expression<'a>, ParserError> {
		if matches!(self.peek().kind, Minus | Plus | Not | BitNot | Inc | Dec | Handle) {
			let operator = self.advance()?;
			let right = self.unary()?;
			return Ok(Expression::at(ExpressionKind::Unary { operator: operator.kind, right: right.boxed() }, &operator));
		}
		self.postfix()
	}

	fn postfix(&mut self) -> Result<Expression<'a>, ParserError> {
		let mut expr = self.primary()?;
		loop {
			match self.peek().kind {
				Dot => {
					self.advance()?;
					let name = self.expect_identifier()?;
					let object = expr.boxed();
					let kind = if self.check(OpenParen) {
						ExpressionKind::MethodCall { object, name: name.lexeme, args: self.arguments()? }
					} else {
						ExpressionKind::Member { object, name: name.lexeme }
					};
					expr = Expression::at(kind, &name);
				}
				OpenBracket => {
					let bracket = self.advance()?;
					let index = self.assignment()?;
					self.expect(CloseBracket, "]")?;
					expr = Expression::at(ExpressionKind::Index { object: expr.boxed(), index: index.boxed() }, &bracket);
				}
				Inc | Dec => {
					let operator = self.advance()?;
					expr = Expression::at(ExpressionKind::Postfix { operator: operator.kind, left: expr.boxed() }, &operator);
				}
				_ => return Ok(expr),
			}
		}
	}

	fn primary(&mut self) -> Result<Expression<'a>, ParserError> {
		let token = *self.peek();
		match token.kind {
			IntConstant | FloatConstant | DoubleConstant | BitsConstant | StringConstant | MultilineStringConstant
			| HeredocStringConstant | True | False | Null => {
				self.advance()?;
				Ok(Expression::at(ExpressionKind::Literal(token), &token))
			}
			OpenParen => {
				self.advance()?;
				let expr = self.assignment()?;
				self.expect(CloseParen, ")")?;
				Ok(Expression::at(ExpressionKind::Grouping(expr.boxed()), &token))
			}
			Cast => {
				self.advance()?;
				self.expect(LessThan, "<")?;
				let ty = self.type_decl()?;
				self.expect(GreaterThan, ">")?;
				self.expect(OpenParen, "(")?;
				let expr = self.assignment()?;
				self.expect(CloseParen, ")")?;
				Ok(Expression::at(ExpressionKind::Cast { ty, expr: expr.boxed() }, &token))
			}
			kind if kind.is_primitive_type() => {
				let ty = self.type_decl()?;
				let args = self.arguments()?;
				Ok(Expression::at(ExpressionKind::Construct { ty, args }, &token))
			}
			Scope | Identifier => {
				let scope = if self.matches(Scope) {
					Some("")
				} else if self.peek_at(1) == Scope {
					let scope = self.advance()?;
					self.advance()?;
					Some(scope.lexeme)
				} else {
					None
				};
				let name = self.expect_identifier()?.lexeme;
				if self.check(OpenParen) {
					return Ok(Expression::at(ExpressionKind::Call { scope, name, args: self.arguments()? }, &token));
				}
				Ok(Expression::at(ExpressionKind::Variable { scope, name }, &token))
			}
			_ => Err(self.error_at(&token, ParseErrorType::ExpectedExpression(Self::describe(&token))).into()),
		}
	}

	/// `( [assignment { , assignment }] )`
	pub(super) fn arguments(&mut self) -> Result<Vec<Expression<'a>>, ParserError> {
		self.expect(OpenParen, "(")?;
		let mut args = Vec::new();
		if self.matches(CloseParen) {
			return Ok(args);
		}
		loop {
			args.push(self.assignment()?);
			if !self.matches(ListSeparator) {
				break;
			}
		}
		self.expect(CloseParen, ")")?;
		Ok(args)
	}
}
