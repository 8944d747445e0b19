//! Unary, binary, comparison and logical operators.
//!
//! Object operands go through the operator methods of their type first
//! (`opAdd`, `opEquals`, `opCmp`, ...), next to a primitive they may use
//! their value cast instead. Primitive operands are converted to a common
//! type, then folded when both are constants or compiled into a
//! single instruction writing a temporary.

use super::{Compiler, Pos, context::{ExprContext, TypeInfo}};
use crate::{bytecode::{BitOp, ConstValue, Instruction, Label, MathOp, NumKind, Operand, TestOp, Var}, error::compiler::CompileErrorType, parser::expression::Expression, scanner::TokenKind, types::{DataType, FuncId}, vm::Value};

pub(super) fn math_op(op: TokenKind) -> Option<MathOp> {
	Some(match op {
		TokenKind::Plus | TokenKind::AddAssign => MathOp::Add,
		TokenKind::Minus | TokenKind::SubAssign => MathOp::Sub,
		TokenKind::Star | TokenKind::MulAssign => MathOp::Mul,
		TokenKind::Slash | TokenKind::DivAssign => MathOp::Div,
		TokenKind::Percent | TokenKind::ModAssign => MathOp::Mod,
		_ => return None,
	})
}

pub(super) fn bit_op(op: TokenKind) -> Option<BitOp> {
	Some(match op {
		TokenKind::Amp | TokenKind::AndAssign => BitOp::And,
		TokenKind::BitOr | TokenKind::OrAssign => BitOp::Or,
		TokenKind::BitXor | TokenKind::XorAssign => BitOp::Xor,
		TokenKind::BitShiftLeft | TokenKind::ShiftLeftAssign => BitOp::Shl,
		TokenKind::BitShiftRight | TokenKind::ShiftRightLAssign => BitOp::Shr,
		TokenKind::BitShiftRightArith | TokenKind::ShiftRightAAssign => BitOp::Sar,
		_ => return None,
	})
}

fn compare_test(op: TokenKind) -> Option<TestOp> {
	Some(match op {
		TokenKind::Equal => TestOp::Zero,
		TokenKind::NotEqual => TestOp::NotZero,
		TokenKind::LessThan => TestOp::Negative,
		TokenKind::GreaterThanOrEqual => TestOp::NotNegative,
		TokenKind::GreaterThan => TestOp::Positive,
		TokenKind::LessThanOrEqual => TestOp::NotPositive,
		_ => return None,
	})
}

/// The test giving the same answer with the operands swapped.
fn swapped(test: TestOp) -> TestOp {
	match test {
		TestOp::Negative => TestOp::Positive,
		TestOp::Positive => TestOp::Negative,
		TestOp::NotNegative => TestOp::NotPositive,
		TestOp::NotPositive => TestOp::NotNegative,
		same => same,
	}
}

fn passes(test: TestOp, order: i64) -> bool {
	match test {
		TestOp::Zero => order == 0,
		TestOp::NotZero => order != 0,
		TestOp::Negative => order < 0,
		TestOp::NotNegative => order >= 0,
		TestOp::Positive => order > 0,
		TestOp::NotPositive => order <= 0,
	}
}

/// Name of the method implementing a binary or compound assignment operator.
pub(super) fn operator_method(op: TokenKind) -> Option<&'static str> {
	Some(match op {
		TokenKind::Plus => "opAdd",
		TokenKind::Minus => "opSub",
		TokenKind::Star => "opMul",
		TokenKind::Slash => "opDiv",
		TokenKind::Percent => "opMod",
		TokenKind::Amp => "opAnd",
		TokenKind::BitOr => "opOr",
		TokenKind::BitXor => "opXor",
		TokenKind::BitShiftLeft => "opShl",
		TokenKind::BitShiftRight => "opShr",
		TokenKind::BitShiftRightArith => "opUShr",
		TokenKind::AddAssign => "opAddAssign",
		TokenKind::SubAssign => "opSubAssign",
		TokenKind::MulAssign => "opMulAssign",
		TokenKind::DivAssign => "opDivAssign",
		TokenKind::ModAssign => "opModAssign",
		TokenKind::AndAssign => "opAndAssign",
		TokenKind::OrAssign => "opOrAssign",
		TokenKind::XorAssign => "opXorAssign",
		TokenKind::ShiftLeftAssign => "opShlAssign",
		TokenKind::ShiftRightLAssign => "opShrAssign",
		TokenKind::ShiftRightAAssign => "opUShrAssign",
		_ => return None,
	})
}

pub(super) fn kind_type(kind: NumKind) -> DataType {
	let token = match kind {
		NumKind::I8 => TokenKind::Int8,
		NumKind::I16 => TokenKind::Int16,
		NumKind::I32 => TokenKind::Int,
		NumKind::I64 => TokenKind::Int64,
		NumKind::U8 => TokenKind::UInt8,
		NumKind::U16 => TokenKind::UInt16,
		NumKind::U32 => TokenKind::UInt,
		NumKind::U64 => TokenKind::UInt64,
		NumKind::F32 => TokenKind::Float,
		NumKind::F64 => TokenKind::Double,
	};
	DataType::create_primitive(token, false)
}

pub(super) fn is_wide(kind: NumKind) -> bool { matches!(kind, NumKind::I64 | NumKind::U64 | NumKind::F64) }

pub(super) fn int_kind(wide: bool, unsigned: bool) -> NumKind {
	match (wide, unsigned) {
		(false, false) => NumKind::I32,
		(false, true) => NumKind::U32,
		(true, false) => NumKind::I64,
		(true, true) => NumKind::U64,
	}
}

/// The constant a folded VM value stands for.
fn folded(value: Value, kind: NumKind) -> ConstValue {
	match value {
		Value::Bool(b) => ConstValue::Bool(b),
		Value::Float(v) => ConstValue::Float(v),
		Value::Double(v) => ConstValue::Double(v),
		Value::Int(v) if kind.is_unsigned() => ConstValue::UInt(v as u64),
		Value::Int(v) => ConstValue::Int(v),
		_ => ConstValue::Int(0),
	}
}

pub(super) fn bool_type() -> DataType { DataType::create_primitive(TokenKind::Bool, false) }

/// The type both operands of an arithmetic operator or a comparison are
/// converted to. Small integers promote to 32 bits and the result is signed
/// unless both sides are unsigned. A double constant next to a float
/// variable is taken as a float. An operand that isn't a number leaves the
/// choice to the other one and is later converted through its value cast.
fn arithmetic_type(l: &TypeInfo, r: &TypeInfo) -> Option<DataType> {
	let (lk, rk) = (NumKind::of(&l.data_type), NumKind::of(&r.data_type));
	let float_constant = |a: &TypeInfo, ak: Option<NumKind>, b: &TypeInfo, bk: Option<NumKind>| {
		a.is_constant && ak == Some(NumKind::F64) && !b.is_constant && bk == Some(NumKind::F32)
	};
	if float_constant(l, lk, r, rk) || float_constant(r, rk, l, lk) {
		return Some(kind_type(NumKind::F32));
	}
	let kinds: Vec<NumKind> = [lk, rk].into_iter().flatten().collect();
	if kinds.is_empty() {
		return None;
	}
	if kinds.contains(&NumKind::F64) {
		return Some(kind_type(NumKind::F64));
	}
	if kinds.iter().any(|k| k.is_float()) {
		return Some(kind_type(NumKind::F32));
	}
	let wide = kinds.iter().any(|&k| is_wide(k));
	let unsigned = kinds.iter().all(|k| k.is_unsigned());
	Some(kind_type(int_kind(wide, unsigned)))
}

impl Compiler<'_> {
	pub(super) fn compile_binary(
		&mut self,
		left: &Expression<'_>,
		op: TokenKind,
		right: &Expression<'_>,
		pos: Pos,
	) -> ExprContext {
		if matches!(op, TokenKind::And | TokenKind::Or | TokenKind::Xor) {
			return self.compile_boolean(left, op, right);
		}
		let mut lctx = self.compile_expression(left);
		self.process_property_get(&mut lctx, left.pos());
		let mut rctx = self.compile_expression(right);
		self.process_property_get(&mut rctx, right.pos());
		self.compile_operator(lctx, op, rctx, pos)
	}

	/// Applies a binary operator to two compiled operands. Explicit handles
	/// only compare. Objects try their operator methods, then fall back to a
	/// value cast when the other operand is a primitive.
	pub(super) fn compile_operator(&mut self, lctx: ExprContext, op: TokenKind, rctx: ExprContext, pos: Pos) -> ExprContext {
		let (l, r) = (lctx.ty, rctx.ty);
		let equality = matches!(op, TokenKind::Equal | TokenKind::NotEqual);
		let identity = matches!(op, TokenKind::Is | TokenKind::NotIs);
		if l.is_explicit_handle || r.is_explicit_handle {
			if !equality && !identity {
				self.report(CompileErrorType::IllegalOperation, pos);
				return self.drop_operands(lctx, rctx);
			}
			return self.compile_handle_comparison(lctx, op, rctx, pos);
		}
		if identity || (equality && (l.is_null_constant() || r.is_null_constant())) {
			return self.compile_handle_comparison(lctx, op, rctx, pos);
		}
		let is_object = |t: &TypeInfo| t.data_type.is_object() || t.data_type.is_null_handle();
		let (lctx, rctx) = if is_object(&l) || is_object(&r) {
			match self.compile_overloaded_operator(lctx, op, rctx, pos) {
				Ok(ctx) => return ctx,
				Err(operands) => operands,
			}
		} else {
			(lctx, rctx)
		};
		if is_object(&l) && is_object(&r) {
			let culprit = if l.data_type.is_object() { l.data_type } else { r.data_type };
			self.report(CompileErrorType::IllegalOperationOn(self.format(&culprit)), pos);
			return self.drop_operands(lctx, rctx);
		}
		if let Some(test) = compare_test(op) {
			return self.compile_comparison(lctx, test, rctx, pos);
		}
		if let Some(math) = math_op(op) {
			return self.compile_math(lctx, math, rctx, pos);
		}
		if let Some(bits) = bit_op(op) {
			return self.compile_bitwise(lctx, bits, rctx, pos);
		}
		self.report(CompileErrorType::IllegalOperation, pos);
		self.drop_operands(lctx, rctx)
	}

	/// Releases both operands of a failed operator.
	fn drop_operands(&mut self, lctx: ExprContext, rctx: ExprContext) -> ExprContext {
		self.release_args(vec![lctx, rctx]);
		ExprContext::dummy()
	}

	fn operand_error(&mut self, lctx: ExprContext, rctx: ExprContext, pos: Pos) -> ExprContext {
		let culprit = if NumKind::of(&lctx.ty.data_type).is_none() { lctx.ty.data_type } else { rctx.ty.data_type };
		self.report(CompileErrorType::IllegalOperationOn(self.format(&culprit)), pos);
		self.drop_operands(lctx, rctx)
	}

	/// `&&`, `||` and `^^`. The right operand of `&&` and `||` only runs when
	/// the left one doesn't decide the result.
	fn compile_boolean(&mut self, left: &Expression<'_>, op: TokenKind, right: &Expression<'_>) -> ExprContext {
		let mut lctx = self.compile_condition(left);
		let mut rctx = self.compile_condition(right);
		if lctx.ty.is_constant && rctx.ty.is_constant {
			let (a, b) = (lctx.ty.constant.as_bool(), rctx.ty.constant.as_bool());
			let value = match op {
				TokenKind::And => a && b,
				TokenKind::Or => a || b,
				_ => a != b,
			};
			return Self::constant_of(bool_type(), ConstValue::Bool(value));
		}
		if op == TokenKind::Xor {
			return self.emit_comparison(lctx, TestOp::NotZero, rctx, NumKind::I32);
		}
		if lctx.ty.is_constant {
			let decides = lctx.ty.constant.as_bool() == (op == TokenKind::Or);
			if decides {
				self.release_args(vec![rctx]);
				return lctx;
			}
			return rctx;
		}

		let reserved = rctx.bc.vars_used();
		let result = self.result_temporary(&mut lctx, &bool_type(), &reserved);
		let end = self.next_label();
		let mut ctx = ExprContext::new();
		ctx.merge(&mut lctx);
		ctx.bc.instr(Instruction::CpyVtoR(result));
		ctx.bc.instr(if op == TokenKind::And { Instruction::Jz(end) } else { Instruction::Jnz(end) });
		self.store_in_variable(&mut rctx, result);
		ctx.merge(&mut rctx);
		ctx.bc.label(end);
		ctx.ty = TypeInfo::variable(bool_type(), result, true);
		ctx
	}

	/// Moves the value into a temporary of `dt` unless it already is one.
	pub(super) fn result_temporary(&mut self, ctx: &mut ExprContext, dt: &DataType, reserved: &[Var]) -> Var {
		if ctx.ty.is_variable && ctx.ty.is_temporary {
			return ctx.ty.stack_offset;
		}
		let mut reserved = reserved.to_vec();
		reserved.extend(ctx.bc.vars_used());
		let temp = self.allocate_temporary(dt, &reserved);
		self.store_in_variable(ctx, temp);
		ctx.ty = TypeInfo::variable(*dt, temp, true);
		temp
	}

	/// Compiles an expression that must be a `bool`.
	pub(super) fn compile_condition(&mut self, expr: &Expression<'_>) -> ExprContext {
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, expr.pos());
		self.implicit_conversion(&mut ctx, &bool_type(), expr.pos(), false, true, &[]);
		if !ctx.ty.data_type.is_boolean_type() {
			self.report(CompileErrorType::ExpressionMustBeBool, expr.pos());
			self.release_args(vec![ctx]);
			return Self::constant_of(bool_type(), ConstValue::Bool(false));
		}
		ctx
	}

	/// Converts both operands to `to`, each kept clear of the other's
	/// variables.
	fn convert_operands(
		&mut self,
		lctx: &mut ExprContext,
		rctx: &mut ExprContext,
		(lto, rto): (&DataType, &DataType),
		explicit: bool,
		pos: Pos,
	) -> bool {
		let reserved = rctx.bc.vars_used();
		self.implicit_conversion(lctx, lto, pos, explicit, true, &reserved);
		let reserved = lctx.bc.vars_used();
		self.implicit_conversion(rctx, rto, pos, explicit, true, &reserved);
		for (ctx, to) in [(&*lctx, lto), (&*rctx, rto)] {
			if !ctx.ty.data_type.is_equal_except_ref_and_const(to) {
				let (from, to) = (self.format(&ctx.ty.data_type), self.format(to));
				self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
				return false;
			}
		}
		true
	}

	/// Both operands as instruction operands, constants folded in.
	fn operands(&mut self, lctx: &mut ExprContext, rctx: &mut ExprContext) -> (Operand, Operand) {
		let lhs = if lctx.ty.is_constant {
			Operand::Const(lctx.ty.constant)
		} else {
			let reserved = rctx.bc.vars_used();
			self.convert_to_variable_not_in(lctx, &reserved);
			Operand::Var(lctx.ty.stack_offset)
		};
		let rhs = if rctx.ty.is_constant {
			Operand::Const(rctx.ty.constant)
		} else {
			let reserved = lctx.bc.vars_used();
			self.convert_to_variable_not_in(rctx, &reserved);
			Operand::Var(rctx.ty.stack_offset)
		};
		(lhs, rhs)
	}

	/// Emits an instruction writing a temporary of `to`, reusing a temporary
	/// operand when there is one.
	fn emit_operation(
		&mut self,
		mut lctx: ExprContext,
		mut rctx: ExprContext,
		to: DataType,
		make: impl FnOnce(Var, Operand, Operand) -> Instruction,
	) -> ExprContext {
		let (lhs, rhs) = self.operands(&mut lctx, &mut rctx);
		let dst = if lctx.ty.is_temporary {
			lctx.ty.stack_offset
		} else if rctx.ty.is_temporary {
			rctx.ty.stack_offset
		} else {
			let mut reserved = lctx.bc.vars_used();
			reserved.extend(rctx.bc.vars_used());
			self.allocate_temporary(&to, &reserved)
		};
		let mut ctx = ExprContext::new();
		ctx.merge(&mut lctx);
		ctx.merge(&mut rctx);
		ctx.bc.instr(make(dst, lhs, rhs));
		for ty in [lctx.ty, rctx.ty] {
			if ty.is_variable && ty.stack_offset != dst {
				self.release_temporary(&ty, &mut ctx.bc);
			}
		}
		ctx.ty = TypeInfo::variable(to, dst, true);
		ctx
	}

	fn compile_math(&mut self, mut lctx: ExprContext, op: MathOp, mut rctx: ExprContext, pos: Pos) -> ExprContext {
		let Some(to) = arithmetic_type(&lctx.ty, &rctx.ty) else {
			return self.operand_error(lctx, rctx, pos);
		};
		if !self.convert_operands(&mut lctx, &mut rctx, (&to, &to), false, pos) {
			return self.drop_operands(lctx, rctx);
		}
		let Some(kind) = NumKind::of(&to) else {
			return self.drop_operands(lctx, rctx);
		};
		if !kind.is_float()
			&& matches!(op, MathOp::Div | MathOp::Mod)
			&& rctx.ty.is_constant
			&& kind.wrap(rctx.ty.constant.as_i64()) == 0
		{
			self.report(CompileErrorType::DivideByZero, pos);
			return self.drop_operands(lctx, rctx);
		}
		if lctx.ty.is_constant && rctx.ty.is_constant {
			let (l, r) = (Value::from(lctx.ty.constant), Value::from(rctx.ty.constant));
			return match l.math(op, kind, &r) {
				Ok(value) => Self::constant_of(to, folded(value, kind)),
				Err(_) => {
					self.report(CompileErrorType::DivideByZero, pos);
					ExprContext::dummy()
				}
			};
		}
		self.emit_operation(lctx, rctx, to, |dst, lhs, rhs| Instruction::Math { op, kind, dst, lhs, rhs })
	}

	/// `&`, `|` and `^` work on unsigned integers of the wider operand. Shifts
	/// keep the type of the left operand and take an unsigned amount.
	fn compile_bitwise(&mut self, mut lctx: ExprContext, op: BitOp, mut rctx: ExprContext, pos: Pos) -> ExprContext {
		// An object goes through its value cast to the unsigned type
		let kind_of = |t: &TypeInfo| NumKind::of(&t.data_type).or_else(|| t.data_type.is_object().then_some(NumKind::U32));
		let (Some(lk), Some(rk)) = (kind_of(&lctx.ty), kind_of(&rctx.ty)) else {
			return self.operand_error(lctx, rctx, pos);
		};
		if lk.is_float() || rk.is_float() {
			let culprit = if lk.is_float() { lctx.ty.data_type } else { rctx.ty.data_type };
			self.report(CompileErrorType::IllegalOperationOn(self.format(&culprit)), pos);
			return self.drop_operands(lctx, rctx);
		}
		let (lto, rto) = if matches!(op, BitOp::Shl | BitOp::Shr | BitOp::Sar) {
			(kind_type(int_kind(is_wide(lk), lk.is_unsigned())), kind_type(NumKind::U32))
		} else {
			let to = kind_type(int_kind(is_wide(lk) || is_wide(rk), true));
			(to, to)
		};
		if !self.convert_operands(&mut lctx, &mut rctx, (&lto, &rto), true, pos) {
			return self.drop_operands(lctx, rctx);
		}
		let Some(kind) = NumKind::of(&lto) else {
			return self.drop_operands(lctx, rctx);
		};
		if lctx.ty.is_constant && rctx.ty.is_constant {
			let (l, r) = (Value::from(lctx.ty.constant), Value::from(rctx.ty.constant));
			if let Ok(value) = l.bits(op, kind, &r) {
				return Self::constant_of(lto, folded(value, kind));
			}
		}
		self.emit_operation(lctx, rctx, lto, |dst, lhs, rhs| Instruction::Bits { op, kind, dst, lhs, rhs })
	}

	fn compile_comparison(&mut self, mut lctx: ExprContext, test: TestOp, mut rctx: ExprContext, pos: Pos) -> ExprContext {
		let (l, r) = (lctx.ty, rctx.ty);
		let to = if l.data_type.is_boolean_type() && r.data_type.is_boolean_type() {
			if !matches!(test, TestOp::Zero | TestOp::NotZero) {
				self.report(CompileErrorType::IllegalOperationOn(self.format(&bool_type())), pos);
				return self.drop_operands(lctx, rctx);
			}
			bool_type()
		} else {
			match arithmetic_type(&l, &r) {
				Some(to) => to,
				None => return self.operand_error(lctx, rctx, pos),
			}
		};
		let signed_mismatch = match (NumKind::of(&l.data_type), NumKind::of(&r.data_type)) {
			(Some(lk), Some(rk)) => !lk.is_float() && !rk.is_float() && lk.is_unsigned() != rk.is_unsigned(),
			_ => false,
		};
		if signed_mismatch && !l.is_constant && !r.is_constant {
			self.report(CompileErrorType::SignedUnsignedMismatch, pos);
		}
		if !self.convert_operands(&mut lctx, &mut rctx, (&to, &to), false, pos) {
			return self.drop_operands(lctx, rctx);
		}
		let kind = NumKind::of(&to).unwrap_or(NumKind::I32);
		self.emit_comparison(lctx, test, rctx, kind)
	}

	/// `Cmp` and `Test`, leaving the outcome in a `bool` temporary.
	fn emit_comparison(&mut self, mut lctx: ExprContext, test: TestOp, mut rctx: ExprContext, kind: NumKind) -> ExprContext {
		if lctx.ty.is_constant && rctx.ty.is_constant {
			let (l, r) = (Value::from(lctx.ty.constant), Value::from(rctx.ty.constant));
			if let Ok(order) = l.compare(kind, &r) {
				return Self::constant_of(bool_type(), ConstValue::Bool(passes(test, order)));
			}
		}
		let (lhs, rhs) = self.operands(&mut lctx, &mut rctx);
		let mut ctx = ExprContext::new();
		ctx.merge(&mut lctx);
		ctx.merge(&mut rctx);
		ctx.bc.instr(Instruction::Cmp { kind, lhs, rhs });
		ctx.bc.instr(Instruction::Test(test));
		self.release_temporary(&lctx.ty, &mut ctx.bc);
		self.release_temporary(&rctx.ty, &mut ctx.bc);
		let result = self.allocate_temporary(&bool_type(), &[]);
		ctx.bc.instr(Instruction::CpyRtoV(result));
		ctx.ty = TypeInfo::variable(bool_type(), result, true);
		ctx
	}

	/// `is`, `!is` and `==`/`!=` on handles compare identity.
	fn compile_handle_comparison(&mut self, mut lctx: ExprContext, op: TokenKind, mut rctx: ExprContext, pos: Pos) -> ExprContext {
		let (l, r) = (lctx.ty, rctx.ty);
		let (l_null, r_null) = (l.is_null_constant(), r.is_null_constant());
		if matches!(op, TokenKind::Equal | TokenKind::NotEqual)
			&& ((!l.is_explicit_handle && !l_null) || (!r.is_explicit_handle && !r_null))
		{
			self.report(CompileErrorType::ImplicitHandleComparison, pos);
		}
		let equal = matches!(op, TokenKind::Equal | TokenKind::Is);
		if l_null && r_null {
			return Self::constant_of(bool_type(), ConstValue::Bool(equal));
		}

		let mut to = if l_null { r.data_type } else { l.data_type };
		let _ = to.make_reference(false);
		if !to.is_object_handle() {
			let _ = to.make_read_only(false);
			if to.make_handle(true, false).is_err() {
				self.report(CompileErrorType::HandleNotSupported, pos);
				return self.drop_operands(lctx, rctx);
			}
		}
		let _ = to.make_handle_to_const(true);
		let reserved = rctx.bc.vars_used();
		self.implicit_conversion(&mut lctx, &to, pos, false, true, &reserved);
		let reserved = lctx.bc.vars_used();
		self.implicit_conversion(&mut rctx, &to, pos, false, true, &reserved);
		for dt in [lctx.ty.data_type, rctx.ty.data_type] {
			if !dt.is_object_handle() || dt.type_id() != to.type_id() {
				let (from, to) = (self.format(&dt), self.format(&to));
				self.report(CompileErrorType::NoConversion(from, to), pos);
				return self.drop_operands(lctx, rctx);
			}
		}

		let reserved = rctx.bc.vars_used();
		self.convert_to_variable_not_in(&mut lctx, &reserved);
		let reserved = lctx.bc.vars_used();
		self.convert_to_variable_not_in(&mut rctx, &reserved);
		let mut ctx = ExprContext::new();
		ctx.merge(&mut lctx);
		ctx.merge(&mut rctx);
		ctx.bc.instr(Instruction::CmpHandle { lhs: lctx.ty.stack_offset, rhs: rctx.ty.stack_offset });
		ctx.bc.instr(Instruction::Test(if equal { TestOp::Zero } else { TestOp::NotZero }));
		self.release_temporary(&lctx.ty, &mut ctx.bc);
		self.release_temporary(&rctx.ty, &mut ctx.bc);
		let result = self.allocate_temporary(&bool_type(), &[]);
		ctx.bc.instr(Instruction::CpyRtoV(result));
		ctx.ty = TypeInfo::variable(bool_type(), result, true);
		ctx
	}

	/// The operator methods of either operand. Hands the operands back when
	/// neither type implements the operator.
	fn compile_overloaded_operator(
		&mut self,
		lctx: ExprContext,
		op: TokenKind,
		rctx: ExprContext,
		pos: Pos,
	) -> Result<ExprContext, (ExprContext, ExprContext)> {
		if let Some(test) = compare_test(op) {
			if matches!(op, TokenKind::Equal | TokenKind::NotEqual) {
				let not = op == TokenKind::NotEqual;
				if let Some(func) = self.find_operator(&lctx, "opEquals", &rctx, pos) {
					let mut ctx = self.call_operator(lctx, func, rctx, false, pos);
					return Ok(self.negate_if(&mut ctx, not));
				}
				if let Some(func) = self.find_operator(&rctx, "opEquals", &lctx, pos) {
					let mut ctx = self.call_operator(rctx, func, lctx, true, pos);
					return Ok(self.negate_if(&mut ctx, not));
				}
			}
			if let Some(func) = self.find_operator(&lctx, "opCmp", &rctx, pos) {
				let ctx = self.call_operator(lctx, func, rctx, false, pos);
				return Ok(self.test_order(ctx, test));
			}
			if let Some(func) = self.find_operator(&rctx, "opCmp", &lctx, pos) {
				let ctx = self.call_operator(rctx, func, lctx, true, pos);
				return Ok(self.test_order(ctx, swapped(test)));
			}
			let handles = |t: &TypeInfo| t.data_type.is_object_handle() || t.data_type.supports_handles();
			if matches!(op, TokenKind::Equal | TokenKind::NotEqual) && handles(&lctx.ty) && handles(&rctx.ty) {
				return Ok(self.compile_handle_comparison(lctx, op, rctx, pos));
			}
		} else if let Some(name) = operator_method(op) {
			if let Some(func) = self.find_operator(&lctx, name, &rctx, pos) {
				return Ok(self.call_operator(lctx, func, rctx, false, pos));
			}
			let reflected = format!("{name}_r");
			if let Some(func) = self.find_operator(&rctx, &reflected, &lctx, pos) {
				return Ok(self.call_operator(rctx, func, lctx, true, pos));
			}
		}
		Err((lctx, rctx))
	}

	/// The one-argument method `name` of the object's type that fits `arg`
	/// best.
	pub(super) fn find_operator(&mut self, object: &ExprContext, name: &str, arg: &ExprContext, pos: Pos) -> Option<FuncId> {
		let dt = object.ty.data_type;
		let id = dt.type_id().filter(|_| dt.is_object())?;
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		let candidates: Vec<FuncId> = self
			.registry
			.methods(id, name)
			.into_iter()
			.filter(|&f| {
				let desc = self.registry.function(f);
				desc.params.len() == 1 && (!read_only || desc.is_read_only)
			})
			.collect();
		let mut fits = Vec::new();
		for func in candidates {
			let param = self.registry.function(func).params[0];
			if let Some(tier) = self.match_argument(arg, &param, pos) {
				fits.push((tier, func));
			}
		}
		let best = fits.iter().map(|&(tier, _)| tier).min()?;
		let mut matching: Vec<FuncId> = fits.into_iter().filter(|&(tier, _)| tier == best).map(|(_, f)| f).collect();
		if matching.len() > 1 && matching.iter().any(|&f| !self.registry.function(f).is_read_only) {
			matching.retain(|&f| !self.registry.function(f).is_read_only);
		}
		if matching.len() > 1 {
			self.report(CompileErrorType::MoreThanOneMatchingOp, pos);
		}
		matching.first().copied()
	}

	/// Calls an operator method on `object` with `arg`. When `swapped`, `arg`
	/// is the left operand in the source and is evaluated first.
	fn call_operator(&mut self, mut object: ExprContext, func: FuncId, mut arg: ExprContext, swapped: bool, pos: Pos) -> ExprContext {
		let mut ctx = ExprContext::new();
		if swapped && !arg.ty.is_constant {
			let reserved = object.bc.vars_used();
			self.convert_to_variable_not_in(&mut arg, &reserved);
			ctx.merge(&mut arg);
		}
		self.push_object(&mut object);
		ctx.merge(&mut object);
		self.perform_call(&mut ctx, func, vec![arg], pos);
		ctx
	}

	fn negate_if(&mut self, ctx: &mut ExprContext, not: bool) -> ExprContext {
		if not {
			self.convert_to_temporary(ctx);
			ctx.bc.instr(Instruction::Not(ctx.ty.stack_offset));
		}
		std::mem::take(ctx)
	}

	/// Tests the -1/0/1 an `opCmp` returned.
	fn test_order(&mut self, mut ctx: ExprContext, test: TestOp) -> ExprContext {
		self.convert_to_temporary(&mut ctx);
		let order = ctx.ty.stack_offset;
		ctx.bc.instr(Instruction::Cmp { kind: NumKind::I32, lhs: Operand::Var(order), rhs: Operand::Const(ConstValue::Int(0)) });
		ctx.bc.instr(Instruction::Test(test));
		ctx.bc.instr(Instruction::CpyRtoV(order));
		ctx.ty = TypeInfo::variable(bool_type(), order, true);
		ctx
	}

	pub(super) fn compile_unary(&mut self, op: TokenKind, right: &Expression<'_>, pos: Pos) -> ExprContext {
		match op {
			TokenKind::Inc | TokenKind::Dec => return self.compile_increment(right, op == TokenKind::Inc, true, pos),
			TokenKind::Handle => return self.compile_handle_of(right, pos),
			TokenKind::Not => {
				let mut ctx = self.compile_condition(right);
				if ctx.ty.is_constant {
					return Self::constant_of(bool_type(), ConstValue::Bool(!ctx.ty.constant.as_bool()));
				}
				self.convert_to_temporary(&mut ctx);
				ctx.bc.instr(Instruction::Not(ctx.ty.stack_offset));
				return ctx;
			}
			_ => {}
		}

		let mut ctx = self.compile_expression(right);
		self.process_property_get(&mut ctx, right.pos());
		let dt = ctx.ty.data_type;
		if dt.is_object() {
			let name = match op {
				TokenKind::Minus => "opNeg",
				TokenKind::BitNot => "opCom",
				_ => "",
			};
			return self.call_unary_operator(ctx, name, pos);
		}
		if dt.is_enum_type() {
			self.implicit_conversion(&mut ctx, &kind_type(NumKind::I32), pos, false, true, &[]);
		}
		let dt = ctx.ty.data_type;
		let Some(kind) = NumKind::of(&dt) else {
			self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		};
		match op {
			TokenKind::Plus => ctx,
			TokenKind::Minus if ctx.ty.is_constant => {
				if kind.is_unsigned() {
					// A literal like `-2147483648` is signed again
					let v = ctx.ty.constant.as_u64();
					let to = if v <= 1 << 31 { NumKind::I32 } else { NumKind::I64 };
					return Self::constant_of(kind_type(to), ConstValue::Int((v as i64).wrapping_neg()));
				}
				match Value::from(ctx.ty.constant).negate(kind) {
					Ok(value) => Self::constant_of(dt, folded(value, kind)),
					Err(_) => ExprContext::dummy(),
				}
			}
			TokenKind::Minus => {
				self.convert_to_temporary(&mut ctx);
				ctx.bc.instr(Instruction::Neg { var: ctx.ty.stack_offset, kind });
				ctx
			}
			TokenKind::BitNot if kind.is_float() => {
				self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
				self.release_args(vec![ctx]);
				ExprContext::dummy()
			}
			TokenKind::BitNot if ctx.ty.is_constant => match Value::from(ctx.ty.constant).bit_not(kind) {
				Ok(value) => Self::constant_of(dt, folded(value, kind)),
				Err(_) => ExprContext::dummy(),
			},
			TokenKind::BitNot => {
				self.convert_to_temporary(&mut ctx);
				ctx.bc.instr(Instruction::BNot { var: ctx.ty.stack_offset, kind });
				ctx
			}
			_ => {
				self.report(CompileErrorType::IllegalOperation, pos);
				self.release_args(vec![ctx]);
				ExprContext::dummy()
			}
		}
	}

	/// `-obj` and `~obj` through `opNeg` and `opCom`.
	fn call_unary_operator(&mut self, mut ctx: ExprContext, name: &str, pos: Pos) -> ExprContext {
		let dt = ctx.ty.data_type;
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		let found = dt.type_id().and_then(|id| {
			self.registry.methods(id, name).into_iter().find(|&f| {
				let desc = self.registry.function(f);
				desc.params.is_empty() && (!read_only || desc.is_read_only)
			})
		});
		let Some(func) = found.filter(|_| !name.is_empty()) else {
			self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		};
		self.push_object(&mut ctx);
		self.perform_call(&mut ctx, func, Vec::new(), pos);
		ctx
	}

	/// `@expr`, the expression used as a handle.
	fn compile_handle_of(&mut self, expr: &Expression<'_>, pos: Pos) -> ExprContext {
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, expr.pos());
		let dt = ctx.ty.data_type;
		if dt.is_object_handle() || ctx.ty.is_null_constant() {
			ctx.ty.is_explicit_handle = true;
			return ctx;
		}
		if !dt.supports_handles() {
			self.report(CompileErrorType::HandleNotSupported, pos);
			return ctx;
		}
		let mut handle = dt;
		let _ = handle.make_read_only(false);
		let _ = handle.make_reference(false);
		if handle.make_handle(true, false).is_err() {
			self.report(CompileErrorType::HandleNotSupported, pos);
			return ctx;
		}
		let _ = handle.make_handle_to_const(dt.is_read_only());
		ctx.ty.data_type = handle;
		ctx.ty.is_explicit_handle = true;
		ctx
	}

	pub(super) fn compile_postfix(&mut self, op: TokenKind, left: &Expression<'_>, pos: Pos) -> ExprContext {
		self.compile_increment(left, op == TokenKind::Inc, false, pos)
	}

	/// `++` and `--`. The prefix form evaluates to the variable itself, the
	/// postfix form to a copy of the old value.
	fn compile_increment(&mut self, expr: &Expression<'_>, up: bool, prefix: bool, pos: Pos) -> ExprContext {
		if self.in_global_expression {
			self.report(CompileErrorType::NotInGlobalExpression("Increment operator"), pos);
			return ExprContext::dummy();
		}
		let delta = if up { 1 } else { -1 };
		let mut ctx = self.compile_expression(expr);
		if let Some(accessor) = ctx.accessor.take() {
			self.report(CompileErrorType::CompoundAssignWithProperty, pos);
			if accessor.is_method {
				ctx.bc.instr(Instruction::Pop);
			}
			return ExprContext::dummy();
		}
		let dt = ctx.ty.data_type;
		let kind = NumKind::of(&dt).filter(|_| dt.is_numeric());
		let Some(kind) = kind else {
			self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		};
		if !ctx.ty.is_lvalue() || dt.is_read_only() {
			let error = if ctx.ty.is_lvalue() { CompileErrorType::RefIsReadOnly } else { CompileErrorType::NotLValue };
			self.report(error, pos);
			self.release_args(vec![ctx]);
			return ExprContext::dummy();
		}

		let mut value = dt;
		let _ = value.make_reference(false);
		if ctx.ty.is_variable {
			let var = ctx.ty.stack_offset;
			if prefix {
				ctx.bc.instr(Instruction::IncV { var, kind, delta });
				return ctx;
			}
			let old = self.allocate_temporary(&value, &ctx.bc.vars_used());
			ctx.bc.instr(Instruction::CpyV { dst: old, src: var });
			ctx.bc.instr(Instruction::IncV { var, kind, delta });
			ctx.ty = TypeInfo::variable(value, old, true);
			return ctx;
		}
		if prefix {
			ctx.bc.instr(Instruction::Inc { kind, delta });
			return ctx;
		}
		let reference = self.allocate_temporary(&dt, &ctx.bc.vars_used());
		let old = self.allocate_temporary(&value, &[reference]);
		for instruction in [
			Instruction::PopV(reference),
			Instruction::PshV(reference),
			Instruction::Rdr(old),
			Instruction::PshV(reference),
			Instruction::Inc { kind, delta },
			Instruction::Pop,
		] {
			ctx.bc.instr(instruction);
		}
		self.release_temporary_var(reference, &mut ctx.bc);
		ctx.ty = TypeInfo::variable(value, old, true);
		ctx
	}

	/// `cond ? a : b`. Both branches end up in one temporary of their common
	/// type.
	pub(super) fn compile_ternary(
		&mut self,
		condition: &Expression<'_>,
		then_branch: &Expression<'_>,
		else_branch: &Expression<'_>,
		pos: Pos,
	) -> ExprContext {
		let mut cond = self.compile_condition(condition);
		let mut a = self.compile_expression(then_branch);
		self.process_property_get(&mut a, then_branch.pos());
		let mut b = self.compile_expression(else_branch);
		self.process_property_get(&mut b, else_branch.pos());

		if !a.ty.data_type.is_equal_except_ref_and_const(&b.ty.data_type) {
			let mut to = a.ty.data_type;
			let _ = to.make_reference(false);
			let _ = to.make_read_only(false);
			let reserved = a.bc.vars_used();
			self.implicit_conversion(&mut b, &to, else_branch.pos(), false, true, &reserved);
			if !b.ty.data_type.is_equal_except_ref_and_const(&to) {
				let mut to = b.ty.data_type;
				let _ = to.make_reference(false);
				let _ = to.make_read_only(false);
				let reserved = b.bc.vars_used();
				self.implicit_conversion(&mut a, &to, then_branch.pos(), false, true, &reserved);
			}
			if !a.ty.data_type.is_equal_except_ref_and_const(&b.ty.data_type) {
				self.report(CompileErrorType::BothExpressionsSameType, pos);
				self.release_args(vec![cond, a, b]);
				return ExprContext::dummy();
			}
		}
		if cond.ty.is_constant {
			let (taken, dropped) = if cond.ty.constant.as_bool() { (a, b) } else { (b, a) };
			self.release_args(vec![dropped]);
			return taken;
		}
		if a.ty.is_constant && b.ty.is_constant && a.ty.is_null_constant() && b.ty.is_null_constant() {
			self.release_args(vec![cond]);
			return a;
		}

		let mut dt = a.ty.data_type;
		let _ = dt.make_reference(false);
		let _ = dt.make_read_only(a.ty.data_type.is_read_only() && b.ty.data_type.is_read_only() && !dt.is_primitive());
		let mut reserved = a.bc.vars_used();
		reserved.extend(b.bc.vars_used());
		reserved.extend(cond.bc.vars_used());
		let result = self.allocate_temporary(&dt, &reserved);
		let (else_label, end): (Label, Label) = (self.next_label(), self.next_label());

		let mut ctx = ExprContext::new();
		self.convert_to_variable_not_in(&mut cond, &reserved);
		ctx.merge(&mut cond);
		ctx.bc.instr(Instruction::CpyVtoR(cond.ty.stack_offset));
		self.release_temporary(&cond.ty, &mut ctx.bc);
		ctx.bc.instr(Instruction::Jz(else_label));
		self.store_in_variable(&mut a, result);
		ctx.merge(&mut a);
		ctx.bc.instr(Instruction::Jmp(end));
		ctx.bc.label(else_label);
		self.store_in_variable(&mut b, result);
		ctx.merge(&mut b);
		ctx.bc.label(end);
		ctx.ty = TypeInfo::variable(dt, result, true);
		ctx
	}
}

#[cfg(test)]
mod tests {
	use crate::compiler::tests::{diagnostics, run};

	#[test]
	fn arithmetic_follows_the_operand_types() {
		let out = run(
			"void main() { int a = 7; print(a / 2); print(a % 4); print(a / 2.0); \
			 uint8 small = 250; print(small + 10); int64 big = 1; print(big << 40); print(-a); }",
		);
		assert_eq!(out, "3\n3\n3.5\n260\n1099511627776\n-7\n");
	}

	#[test]
	fn mixed_signedness_computes_signed() {
		let out = run(
			"void main() { uint u = 5; int i = 10; print(u - i); print(u - 10); \
			 uint64 w = 5; print(w - 10); uint a = 5; uint b = 10; print(a - b); }",
		);
		assert_eq!(out, "-5\n-5\n-5\n4294967291\n");
	}

	#[test]
	fn double_constants_next_to_floats_stay_float() {
		let out = run(
			"void main() { float f = 16777216.0f; print(f + 1.0); double one = 1.0; print(f + one); \
			 double d = 16777216.0; print(d + 1.0); }",
		);
		assert_eq!(out, "16777216\n16777217\n16777217\n");
	}

	#[test]
	fn bitwise_operators_and_shifts() {
		let out = run("void main() { int a = -16; print(a >> 2); print(a >>> 2); print(0xF0 | 0x0F); print(~0); }");
		assert_eq!(out, "1073741820\n-4\n255\n-1\n");
	}

	#[test]
	fn constants_fold_and_division_by_zero_is_caught() {
		let messages = diagnostics("void main() { int a = 10 / 0; }");
		assert!(messages.contains("Divide by zero"), "{messages}");
		let messages = diagnostics("void main() { int a = 1; int b = a % 0; }");
		assert!(messages.contains("Divide by zero"), "{messages}");
	}

	#[test]
	fn comparisons_and_logic() {
		let out = run(
			"bool side(bool v) { print(v); return v; } \
			 void main() { int a = 3; print(a < 4 && a >= 3); print(a == 2 || a != 3); \
			 print(side(false) && side(true)); print(side(true) ^^ side(true)); print(!(a > 1)); }",
		);
		assert_eq!(out, "true\nfalse\nfalse\nfalse\ntrue\ntrue\nfalse\nfalse\n");
	}

	#[test]
	fn signed_unsigned_comparison_warns() {
		let messages = diagnostics("void main() { int a = -1; uint b = 1; bool c = a < b; }");
		assert!(messages.contains("Signed/Unsigned mismatch"), "{messages}");
		assert!(!diagnostics("void main() { uint b = 1; bool c = b < 3; }").contains("mismatch"));
	}

	#[test]
	fn increments_before_and_after() {
		let out = run("void main() { int a = 5; print(a++); print(a); print(++a); print(--a); int[] v(1); v[0]++; print(v[0]); }");
		assert_eq!(out, "5\n6\n7\n6\n1\n");
		assert!(diagnostics("void main() { 3++; }").contains("Not a valid lvalue"));
	}

	#[test]
	fn ternaries_take_a_common_type() {
		let out = run("void main() { int a = 2; print(a > 1 ? 1.5 : a); print(a > 5 ? \"big\" : \"small\"); }");
		assert_eq!(out, "1.5\nsmall\n");
		assert!(diagnostics("void main() { int a = 1; a > 0 ? 1 : \"x\"; }").contains("Both expressions must have the same type"));
	}

	#[test]
	fn strings_use_their_operators() {
		let out = run("void main() { string a = \"ab\"; string b = a + \"c\"; print(b); print(a == \"ab\"); print(a != b); print(a < b); }");
		assert_eq!(out, "abc\ntrue\ntrue\ntrue\n");
	}

	#[test]
	fn conditions_must_be_bool() {
		assert!(diagnostics("void main() { int a = 1; if (a) {} }").contains("Expression must be of boolean type"));
	}
}
