//! Expression dispatch, literals, names and explicit conversions.

use super::{Compiler, Pos, context::{ExprContext, TypeInfo}};
use crate::{bytecode::{ConstValue, Instruction}, error::compiler::CompileErrorType, parser::expression::{Expression, ExpressionKind}, scanner::{Token, TokenKind}, statement::TypeDecl, types::{DataType, GlobalId}};

/// The text of a string literal with its escapes resolved. `None` on an
/// invalid escape sequence.
fn string_value(token: &Token<'_>) -> Option<String> {
	let lexeme = token.lexeme;
	if token.kind == TokenKind::HeredocStringConstant {
		let text = lexeme.get(3..lexeme.len().saturating_sub(3)).unwrap_or_default();
		return Some(heredoc_value(text));
	}
	unescape(lexeme.get(1..lexeme.len().saturating_sub(1)).unwrap_or_default())
}

/// Heredoc strings are raw. A first or last line holding only whitespace is
/// dropped.
fn heredoc_value(mut text: &str) -> String {
	if let Some(end) = text.find('\n')
		&& text[..end].trim().is_empty()
	{
		text = &text[end + 1..];
	}
	if let Some(start) = text.rfind('\n')
		&& text[start + 1..].trim().is_empty()
	{
		text = &text[..start];
	}
	text.to_string()
}

fn unescape(text: &str) -> Option<String> {
	let mut out = String::with_capacity(text.len());
	let mut chars = text.chars();
	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		let escaped = match chars.next()? {
			'n' => '\n',
			'r' => '\r',
			't' => '\t',
			'0' => '\0',
			'\\' => '\\',
			'\'' => '\'',
			'"' => '"',
			'x' | 'X' => hex_char(&mut chars, 1, 2)?,
			'u' => hex_char(&mut chars, 4, 4)?,
			'U' => hex_char(&mut chars, 8, 8)?,
			_ => return None,
		};
		out.push(escaped);
	}
	Some(out)
}

/// Reads between `min` and `max` hex digits as a code point.
fn hex_char(chars: &mut std::str::Chars<'_>, min: usize, max: usize) -> Option<char> {
	let rest = chars.as_str();
	let len = rest.bytes().take(max).take_while(u8::is_ascii_hexdigit).count();
	if len < min {
		return None;
	}
	let value = u32::from_str_radix(&rest[..len], 16).ok()?;
	*chars = rest[len..].chars();
	char::from_u32(value)
}

fn primitive(kind: TokenKind) -> DataType { DataType::create_primitive(kind, false) }

impl Compiler<'_> {
	pub(super) fn compile_expression(&mut self, expr: &Expression<'_>) -> ExprContext {
		let pos = expr.pos();
		match &expr.kind {
			ExpressionKind::Literal(token) => self.compile_literal(token, pos),
			ExpressionKind::Variable { scope, name } => self.compile_variable(*scope, name, pos, true),
			ExpressionKind::Unary { operator, right } => self.compile_unary(*operator, right, pos),
			ExpressionKind::Postfix { operator, left } => self.compile_postfix(*operator, left, pos),
			ExpressionKind::Binary { left, operator, right } => self.compile_binary(left, *operator, right, pos),
			ExpressionKind::Assign { target, operator, value } => self.compile_assignment(target, *operator, value, pos),
			ExpressionKind::Ternary { condition, then_branch, else_branch } => {
				self.compile_ternary(condition, then_branch, else_branch, pos)
			}
			ExpressionKind::Call { scope, name, args } => self.compile_function_call(*scope, name, args, pos),
			ExpressionKind::Construct { ty, args } => match self.resolve_type(ty, pos) {
				Some(dt) if dt.is_primitive() => self.compile_conversion(&dt, args, pos),
				Some(dt) => self.compile_construct_call(&dt, args, pos),
				None => ExprContext::dummy(),
			},
			ExpressionKind::Cast { ty, expr } => self.compile_cast(ty, expr, pos),
			ExpressionKind::Member { object, name } => self.compile_member(object, name, pos),
			ExpressionKind::MethodCall { object, name, args } => self.compile_method_call(object, name, args, pos),
			ExpressionKind::Index { object, index } => self.compile_index(object, index, pos),
			ExpressionKind::Grouping(inner) => self.compile_expression(inner),
		}
	}

	fn compile_literal(&mut self, token: &Token<'_>, pos: Pos) -> ExprContext {
		match token.kind {
			TokenKind::True | TokenKind::False => {
				Self::constant_of(primitive(TokenKind::Bool), ConstValue::Bool(token.kind == TokenKind::True))
			}
			TokenKind::Null => ExprContext::with_type(TypeInfo::null()),
			TokenKind::IntConstant => {
				let Ok(v) = token.lexeme.parse::<u64>() else {
					self.report(CompileErrorType::ValueTooLarge, pos);
					return Self::constant_of(primitive(TokenKind::UInt64), ConstValue::UInt(u64::MAX));
				};
				if v <= i32::MAX as u64 {
					Self::constant_of(primitive(TokenKind::Int), ConstValue::Int(v as i64))
				} else if v <= i64::MAX as u64 {
					Self::constant_of(primitive(TokenKind::Int64), ConstValue::Int(v as i64))
				} else {
					Self::constant_of(primitive(TokenKind::UInt64), ConstValue::UInt(v))
				}
			}
			TokenKind::BitsConstant => {
				let digits = token.lexeme.get(2..).unwrap_or_default();
				let v = match u64::from_str_radix(digits, 16) {
					Ok(v) => v,
					Err(_) if digits.is_empty() => {
						self.report(CompileErrorType::ExpectedConstant, pos);
						0
					}
					Err(_) => {
						self.report(CompileErrorType::ValueTooLarge, pos);
						u64::MAX
					}
				};
				let kind = if v <= u64::from(u32::MAX) { TokenKind::UInt } else { TokenKind::UInt64 };
				Self::constant_of(primitive(kind), ConstValue::UInt(v))
			}
			TokenKind::FloatConstant => {
				let v = token.lexeme.trim_end_matches(['f', 'F']).parse::<f32>().unwrap_or_default();
				Self::constant_of(primitive(TokenKind::Float), ConstValue::Float(v))
			}
			TokenKind::DoubleConstant => {
				let v = token.lexeme.parse::<f64>().unwrap_or_default();
				Self::constant_of(primitive(TokenKind::Double), ConstValue::Double(v))
			}
			TokenKind::StringConstant | TokenKind::MultilineStringConstant | TokenKind::HeredocStringConstant => {
				self.compile_string(token, pos)
			}
			_ => {
				self.report(CompileErrorType::ExpectedConstant, pos);
				ExprContext::dummy()
			}
		}
	}

	/// A string literal is handed to the registered string factory, which
	/// returns a new string object.
	fn compile_string(&mut self, token: &Token<'_>, pos: Pos) -> ExprContext {
		let (Some(factory), Some(dt)) = (self.registry.string_factory(), self.registry.string_type()) else {
			self.report(CompileErrorType::StringFactoryMissing, pos);
			return ExprContext::dummy();
		};
		let text = string_value(token).unwrap_or_else(|| {
			self.report(CompileErrorType::InvalidStringEscape, pos);
			String::new()
		});
		let mut ctx = ExprContext::new();
		ctx.bc.instr(Instruction::Str(text.into()));
		ctx.bc.instr(self.call_instruction(factory));
		let temp = self.temporary(&dt, &[]);
		ctx.bc.instr(Instruction::CpyRtoV(temp.stack_offset));
		ctx.ty = temp;
		ctx
	}

	/// A name used as a value: a local, a global, an enum value or a global
	/// property accessor, in that order.
	pub(super) fn compile_variable(
		&mut self,
		scope: Option<&str>,
		name: &str,
		pos: Pos,
		warn_uninitialized: bool,
	) -> ExprContext {
		if scope.is_none()
			&& let Some(var) = self.find_variable(name).cloned()
		{
			if let Some(value) = var.constant {
				return Self::constant_of(var.ty, value);
			}
			if warn_uninitialized && !var.is_initialized {
				self.report(CompileErrorType::Uninitialized(name.to_string()), pos);
				self.mark_initialized(var.offset);
			}
			if var.holds_reference {
				let mut ctx = ExprContext::with_type(TypeInfo::value(var.ty));
				ctx.bc.instr(Instruction::PshV(var.offset));
				return ctx;
			}
			return ExprContext::with_type(TypeInfo::variable(var.ty, var.offset, false));
		}

		let global_scope = scope.is_none_or(str::is_empty);
		if global_scope {
			let global = self.module.globals.get(name).copied().or_else(|| self.registry.find_global(name));
			if let Some(id) = global {
				return self.compile_global(id);
			}
		}
		let enum_scope = scope.filter(|s| !s.is_empty());
		if let Some((ty, value)) = self.registry.find_enum_value(name, enum_scope) {
			let dt = DataType::create_object(self.registry.type_ref(ty), true);
			return Self::constant_of(dt, ConstValue::Int(value));
		}
		if global_scope && let Some(ctx) = self.global_accessor(name) {
			return ctx;
		}
		let full = match scope {
			Some(scope) => format!("{scope}::{name}"),
			None => name.to_string(),
		};
		self.report(CompileErrorType::NotDeclared(full), pos);
		ExprContext::dummy()
	}

	/// Globals are read through a reference. Objects are pushed as
	/// themselves.
	fn compile_global(&mut self, id: GlobalId) -> ExprContext {
		let global = self.registry.global(id);
		if let Some(value) = global.constant {
			return Self::constant_of(global.ty, value);
		}
		let mut dt = global.ty;
		let _ = dt.make_reference(true);
		let mut ctx = ExprContext::with_type(TypeInfo::value(dt));
		ctx.bc.instr(Instruction::Pga(id));
		if dt.is_object() && !dt.is_object_handle() {
			ctx.bc.instr(Instruction::Deref);
		}
		ctx
	}

	/// `T(expr)` for a primitive or enum `T`, an explicit conversion.
	pub(super) fn compile_conversion(&mut self, to: &DataType, args: &[Expression<'_>], pos: Pos) -> ExprContext {
		let [arg] = args else {
			let args = self.compile_args(args);
			let types = args.iter().map(|a| self.format(&a.ty.data_type)).collect::<Vec<_>>().join(", ");
			self.report(CompileErrorType::NoMatchingSignatures(format!("{}({types})", self.format(to))), pos);
			self.release_args(args);
			return ExprContext::dummy();
		};
		let mut ctx = self.compile_expression(arg);
		self.process_property_get(&mut ctx, arg.pos());
		let from = ctx.ty.data_type;
		self.implicit_conversion(&mut ctx, to, arg.pos(), true, true, &[]);
		if !ctx.ty.data_type.is_equal_except_ref_and_const(to) {
			let (from, to) = (self.format(&from), self.format(to));
			self.report(CompileErrorType::NoConversion(from, to), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		}
		if !ctx.ty.is_constant {
			self.convert_to_temporary(&mut ctx);
		}
		ctx
	}

	/// `cast<T>(expr)`, a reference cast between object handles. A cast that
	/// doesn't hold at run time yields null.
	fn compile_cast(&mut self, ty: &TypeDecl<'_>, expr: &Expression<'_>, pos: Pos) -> ExprContext {
		let Some(to) = self.resolve_type(ty, pos) else {
			return ExprContext::dummy();
		};
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, expr.pos());
		let from = ctx.ty.data_type;
		if !to.is_object_handle() || !(from.is_object() || from.is_null_handle()) {
			let (from, to) = (self.format(&from), self.format(&to));
			self.report(CompileErrorType::NoConversion(from, to), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		}
		self.implicit_conversion(&mut ctx, &to, pos, true, true, &[]);
		if ctx.ty.data_type.type_id() != to.type_id() {
			let (from, to) = (self.format(&from), self.format(&to));
			self.report(CompileErrorType::NoConversion(from, to), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		}
		ctx
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compiler::tests::{diagnostics, run};

	fn literal(kind: TokenKind, lexeme: &str) -> Option<String> { string_value(&Token::new(kind, lexeme, 0, 1, 1)) }

	#[test]
	fn escapes_are_resolved() {
		assert_eq!(literal(TokenKind::StringConstant, r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
		assert_eq!(literal(TokenKind::StringConstant, r#"'it\'s'"#).as_deref(), Some("it's"));
		assert_eq!(literal(TokenKind::StringConstant, r#""\x41\u00e9\U0001F600""#).as_deref(), Some("Aé😀"));
		assert_eq!(literal(TokenKind::StringConstant, r#""\q""#), None);
		assert_eq!(literal(TokenKind::StringConstant, r#""\u12""#), None);
	}

	#[test]
	fn heredocs_are_raw() {
		let text = "\"\"\"  \n  raw \\n \"quoted\"\n   \"\"\"";
		assert_eq!(literal(TokenKind::HeredocStringConstant, text).as_deref(), Some("  raw \\n \"quoted\""));
		assert_eq!(literal(TokenKind::HeredocStringConstant, "\"\"\"x\"\"\"").as_deref(), Some("x"));
	}

	#[test]
	fn literal_types() {
		let out = run("void main() { print(2147483647); print(2147483648); print(0xFFFFFFFF); print(1.5f); print(.25); }");
		assert_eq!(out, "2147483647\n2147483648\n4294967295\n1.5\n0.25\n");
		assert!(diagnostics("void main() { string s = \"\\z\"; }").contains("Invalid escape sequence"));
	}

	#[test]
	fn explicit_conversions() {
		let out = run("void main() { double d = 2.75; print(int(d)); print(uint(uint8(300))); print(float(1) / 4); }");
		assert_eq!(out, "2\n44\n0.25\n");
		assert!(diagnostics("void main() { int a = int(\"x\"); }").contains("No conversion from 'const string' to 'int'"));
		assert!(diagnostics("void main() { print(uint8(300)); }").contains("Multiple matching signatures to 'print(uint8)'"));
	}

	#[test]
	fn unknown_names() {
		let messages = diagnostics("void main() { int a = b + Color::Red; }");
		assert!(messages.contains("'b' is not declared"), "{messages}");
		assert!(messages.contains("'Color::Red' is not declared"), "{messages}");
	}

	#[test]
	fn casts_need_handles() {
		assert!(diagnostics("void main() { int a = cast<int>(1); }").contains("No conversion from 'const int' to 'int'"));
	}
}
