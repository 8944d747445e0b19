//! Assignments, compound assignments and handle assignments.
//!
//! The value is evaluated before the target. Primitives are stored directly
//! into variables, or written through a reference the target left on the
//! stack. Objects are copied with the type's `opAssign`, handles are
//! rebound with `RefCpy`.

use super::{Compiler, Pos, context::ExprContext, operators::{bit_op, kind_type, math_op, operator_method}};
use crate::{bytecode::{ConstValue, Instruction, MathOp, NumKind, Operand, Var}, error::compiler::CompileErrorType, parser::expression::{Expression, ExpressionKind}, scanner::TokenKind};

impl Compiler<'_> {
	pub(super) fn compile_assignment(
		&mut self,
		target: &Expression<'_>,
		op: TokenKind,
		value: &Expression<'_>,
		pos: Pos,
	) -> ExprContext {
		if self.in_global_expression {
			self.report(CompileErrorType::NotInGlobalExpression("Assignment"), pos);
			return ExprContext::dummy();
		}
		if op == TokenKind::HandleAssign {
			return self.compile_handle_assignment(target, value, pos);
		}
		if op == TokenKind::Assignment
			&& let ExpressionKind::Unary { operator: TokenKind::Handle, right } = &target.ungrouped().kind
		{
			return self.compile_handle_assignment(right, value, pos);
		}

		let mut lctx = self.compile_assign_target(target, op != TokenKind::Assignment);
		let mut rctx = self.compile_expression(value);
		self.process_property_get(&mut rctx, value.pos());
		if let Some(accessor) = lctx.accessor {
			if op != TokenKind::Assignment {
				self.report(CompileErrorType::CompoundAssignWithProperty, pos);
				if accessor.is_method {
					lctx.bc.instr(Instruction::Pop);
				}
				self.release_args(vec![rctx]);
				return ExprContext::dummy();
			}
			self.process_property_set(&mut lctx, rctx, pos);
			return lctx;
		}
		if op == TokenKind::Assignment {
			self.perform_assignment(&mut lctx, &mut rctx, pos);
			if lctx.ty.is_variable && !lctx.ty.is_temporary {
				self.mark_initialized(lctx.ty.stack_offset);
			}
			return lctx;
		}
		self.perform_compound_assignment(lctx, op, rctx, pos)
	}

	/// The left side of an assignment. Plain assignments don't read the
	/// variable, so they don't warn about it being uninitialized.
	fn compile_assign_target(&mut self, target: &Expression<'_>, reads: bool) -> ExprContext {
		match &target.ungrouped().kind {
			ExpressionKind::Variable { scope, name } => self.compile_variable(*scope, name, target.pos(), reads),
			_ => self.compile_expression(target),
		}
	}

	/// Assigns `rhs` to the lvalue `lhs`, merging all code into `lhs`.
	pub(super) fn perform_assignment(&mut self, lhs: &mut ExprContext, rhs: &mut ExprContext, pos: Pos) {
		let dt = lhs.ty.data_type;
		if !lhs.ty.is_lvalue() {
			self.report(CompileErrorType::NotLValue, pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		if dt.is_object_handle() && (rhs.ty.is_null_constant() || rhs.ty.is_explicit_handle) {
			self.assign_handle(lhs, rhs, pos);
		} else if dt.is_object() {
			self.assign_object(lhs, rhs, pos);
		} else {
			self.assign_primitive(lhs, rhs, pos);
		}
	}

	/// Puts `rhs`'s code in front of `lhs`'s.
	fn value_first(lhs: &mut ExprContext, rhs: &mut ExprContext) {
		let mut bc = std::mem::take(&mut rhs.bc);
		bc.append(&mut lhs.bc);
		lhs.bc = bc;
		lhs.deferred.append(&mut rhs.deferred);
	}

	fn assign_primitive(&mut self, lhs: &mut ExprContext, rhs: &mut ExprContext, pos: Pos) {
		if lhs.ty.data_type.is_read_only() {
			self.report(CompileErrorType::RefIsReadOnly, pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		let mut to = lhs.ty.data_type;
		let _ = to.make_reference(false);
		let reserved = lhs.bc.vars_used();
		self.implicit_conversion(rhs, &to, pos, false, true, &reserved);
		if !rhs.ty.data_type.is_equal_except_ref_and_const(&to) {
			let (from, to) = (self.format(&rhs.ty.data_type), self.format(&to));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		if lhs.ty.is_variable {
			self.store_in_variable(rhs, lhs.ty.stack_offset);
			Self::value_first(lhs, rhs);
			return;
		}
		self.convert_to_variable_not_in(rhs, &reserved);
		let value = rhs.ty;
		Self::value_first(lhs, rhs);
		lhs.bc.instr(Instruction::Wrt(value.stack_offset));
		self.release_temporary(&value, &mut lhs.bc);
	}

	/// Copies into the object with `opAssign`, or field by field for POD
	/// types without one.
	fn assign_object(&mut self, lhs: &mut ExprContext, rhs: &mut ExprContext, pos: Pos) {
		let dt = lhs.ty.data_type;
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		if read_only {
			self.report(CompileErrorType::RefIsReadOnly, pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		let mut object = dt;
		let _ = object.make_handle(false, false);
		let _ = object.make_reference(false);
		let mut to = object;
		let _ = to.make_read_only(true);
		let reserved = lhs.bc.vars_used();
		self.implicit_conversion(rhs, &to, pos, false, true, &reserved);
		let from = rhs.ty.data_type;
		if !from.is_object() || from.type_id() != object.type_id() {
			let (from, to) = (self.format(&from), self.format(&object));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		let Some(id) = object.type_id() else {
			return;
		};

		self.convert_to_variable_not_in(rhs, &reserved);
		let value = rhs.ty;
		Self::value_first(lhs, rhs);
		self.push_object(lhs);
		match self.registry.object_type(id).beh.copy {
			Some(copy) => self.perform_call(lhs, copy, vec![ExprContext::with_type(value)], pos),
			None if object.can_be_copied(self.registry) => {
				lhs.bc.instr(Instruction::CopyObj(value.stack_offset));
				self.release_temporary(&value, &mut lhs.bc);
			}
			None => {
				self.report(CompileErrorType::NoDefaultCopyOp, pos);
				self.release_temporary(&value, &mut lhs.bc);
			}
		}
	}

	/// Rebinds the handle `lhs` to what `rhs` refers to.
	fn assign_handle(&mut self, lhs: &mut ExprContext, rhs: &mut ExprContext, pos: Pos) {
		if lhs.ty.data_type.is_read_only() {
			self.report(CompileErrorType::RefIsReadOnly, pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		let mut to = lhs.ty.data_type;
		let _ = to.make_reference(false);
		let _ = to.make_read_only(false);
		let reserved = lhs.bc.vars_used();
		self.implicit_conversion(rhs, &to, pos, false, true, &reserved);
		let from = rhs.ty.data_type;
		if !from.is_object_handle() || !from.is_equal_except_ref_and_const(&to) {
			let (from, to) = (self.format(&from), self.format(&to));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![std::mem::take(rhs)]);
			return;
		}
		if lhs.ty.is_variable {
			let dst = lhs.ty.stack_offset;
			if rhs.ty.is_constant {
				lhs.bc.instr(Instruction::SetV(dst, ConstValue::Null));
				return;
			}
			self.convert_to_variable_not_in(rhs, &reserved);
			let value = rhs.ty;
			Self::value_first(lhs, rhs);
			lhs.bc.instr(Instruction::RefCpyV { dst, src: value.stack_offset });
			self.release_temporary(&value, &mut lhs.bc);
			return;
		}
		self.convert_to_variable_not_in(rhs, &reserved);
		let value = rhs.ty;
		Self::value_first(lhs, rhs);
		lhs.bc.instr(Instruction::RefCpy(value.stack_offset));
		self.release_temporary(&value, &mut lhs.bc);
	}

	/// `target @= value`, or `@target = value`.
	fn compile_handle_assignment(&mut self, target: &Expression<'_>, value: &Expression<'_>, pos: Pos) -> ExprContext {
		let mut lctx = self.compile_assign_target(target, false);
		if lctx.accessor.is_some() {
			let mut rctx = self.compile_expression(value);
			self.process_property_get(&mut rctx, value.pos());
			rctx.ty.is_explicit_handle = true;
			self.process_property_set(&mut lctx, rctx, pos);
			return lctx;
		}
		if !lctx.ty.data_type.is_object_handle() {
			self.report(CompileErrorType::HandleNotSupported, pos);
			self.release_args(vec![lctx]);
			return ExprContext::dummy();
		}
		let mut rctx = self.compile_expression(value);
		self.process_property_get(&mut rctx, value.pos());
		if !lctx.ty.is_lvalue() {
			self.report(CompileErrorType::NotLValue, pos);
			self.release_args(vec![lctx, rctx]);
			return ExprContext::dummy();
		}
		self.assign_handle(&mut lctx, &mut rctx, pos);
		if lctx.ty.is_variable && !lctx.ty.is_temporary {
			self.mark_initialized(lctx.ty.stack_offset);
		}
		lctx
	}

	/// `+=` and friends. The target is read, combined with the value and
	/// written back.
	fn perform_compound_assignment(&mut self, mut lhs: ExprContext, op: TokenKind, mut rhs: ExprContext, pos: Pos) -> ExprContext {
		let dt = lhs.ty.data_type;
		if dt.is_object() {
			let name = operator_method(op).unwrap_or_default();
			if let Some(func) = self.find_operator(&lhs, name, &rhs, pos) {
				let reserved = lhs.bc.vars_used();
				if !rhs.ty.is_constant {
					self.convert_to_variable_not_in(&mut rhs, &reserved);
				}
				Self::value_first(&mut lhs, &mut rhs);
				self.push_object(&mut lhs);
				self.perform_call(&mut lhs, func, vec![rhs], pos);
				return lhs;
			}
			self.report(CompileErrorType::FunctionNotFound(name.to_string()), pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		}

		let kind = NumKind::of(&dt).filter(|_| dt.is_numeric());
		let Some(kind) = kind else {
			self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		};
		if !lhs.ty.is_lvalue() || dt.is_read_only() {
			let error = if lhs.ty.is_lvalue() { CompileErrorType::RefIsReadOnly } else { CompileErrorType::NotLValue };
			self.report(error, pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		}
		let (math, bits) = (math_op(op), bit_op(op));
		if bits.is_some() && kind.is_float() {
			self.report(CompileErrorType::IllegalOperationOn(self.format(&dt)), pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		}

		let mut value = dt;
		let _ = value.make_reference(false);
		let shift = matches!(op, TokenKind::ShiftLeftAssign | TokenKind::ShiftRightLAssign | TokenKind::ShiftRightAAssign);
		let to = if shift { kind_type(NumKind::U32) } else { value };
		let reserved = lhs.bc.vars_used();
		self.implicit_conversion(&mut rhs, &to, pos, bits.is_some(), true, &reserved);
		if !rhs.ty.data_type.is_equal_except_ref_and_const(&to) {
			let (from, to) = (self.format(&rhs.ty.data_type), self.format(&to));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		}
		if math.is_some_and(|m| matches!(m, MathOp::Div | MathOp::Mod))
			&& !kind.is_float()
			&& rhs.ty.is_constant
			&& kind.wrap(rhs.ty.constant.as_i64()) == 0
		{
			self.report(CompileErrorType::DivideByZero, pos);
			self.release_args(vec![lhs, rhs]);
			return ExprContext::dummy();
		}

		let operand = if rhs.ty.is_constant {
			Operand::Const(rhs.ty.constant)
		} else {
			let mut reserved = reserved.clone();
			if lhs.ty.is_variable {
				reserved.push(lhs.ty.stack_offset);
			}
			self.convert_to_variable_not_in(&mut rhs, &reserved);
			Operand::Var(rhs.ty.stack_offset)
		};
		let make = |dst: Var| match (math, bits) {
			(Some(op), _) => Instruction::Math { op, kind, dst, lhs: Operand::Var(dst), rhs: operand },
			(None, Some(op)) => Instruction::Bits { op, kind, dst, lhs: Operand::Var(dst), rhs: operand },
			(None, None) => Instruction::Pop,
		};
		let value_ty = rhs.ty;
		Self::value_first(&mut lhs, &mut rhs);

		if lhs.ty.is_variable {
			lhs.bc.instr(make(lhs.ty.stack_offset));
			self.release_temporary(&value_ty, &mut lhs.bc);
			return lhs;
		}
		let mut reserved = lhs.bc.vars_used();
		reserved.extend(value_ty.is_variable.then_some(value_ty.stack_offset));
		let reference = self.allocate_temporary(&dt, &reserved);
		reserved.push(reference);
		let current = self.allocate_temporary(&value, &reserved);
		for instruction in [
			Instruction::PopV(reference),
			Instruction::PshV(reference),
			Instruction::Rdr(current),
			make(current),
			Instruction::PshV(reference),
			Instruction::Wrt(current),
		] {
			lhs.bc.instr(instruction);
		}
		self.release_temporary_var(current, &mut lhs.bc);
		self.release_temporary_var(reference, &mut lhs.bc);
		self.release_temporary(&value_ty, &mut lhs.bc);
		lhs
	}

	/// Stores the result of `ctx` in `var`, releasing whatever temporary held
	/// it.
	pub(super) fn store_in_variable(&mut self, ctx: &mut ExprContext, var: Var) {
		if ctx.ty.is_constant {
			let value = if ctx.ty.is_null_constant() { ConstValue::Null } else { ctx.ty.constant };
			ctx.bc.instr(Instruction::SetV(var, value));
			return;
		}
		if !ctx.ty.is_variable {
			ctx.bc.instr(if ctx.ty.is_ref_on_stack() { Instruction::Rdr(var) } else { Instruction::PopV(var) });
			return;
		}
		let src = ctx.ty.stack_offset;
		if src == var {
			return;
		}
		let dt = ctx.ty.data_type;
		let used = ctx.bc.vars_used();
		if ctx.ty.is_temporary && dt.is_primitive() && used.contains(&src) && !used.contains(&var) {
			// The code computing the temporary writes `var` directly instead
			ctx.bc.exchange_var(src, var);
		} else if dt.is_object() || dt.is_object_handle() {
			ctx.bc.instr(Instruction::RefCpyV { dst: var, src });
		} else {
			ctx.bc.instr(Instruction::CpyV { dst: var, src });
		}
		let ty = ctx.ty;
		self.release_temporary(&ty, &mut ctx.bc);
	}

	/// Drops the value of an expression statement.
	pub(super) fn discard(&mut self, ctx: &mut ExprContext) {
		if ctx.ty.is_on_stack() {
			ctx.bc.instr(Instruction::Pop);
		}
		let ty = ctx.ty;
		self.release_temporary(&ty, &mut ctx.bc);
	}
}

#[cfg(test)]
mod tests {
	use crate::compiler::tests::{diagnostics, run};

	#[test]
	fn assignments_convert_the_value() {
		let out = run("void main() { double d; d = 3; print(d); int a; a = 2; a += 3; a *= a; a -= 1; print(a); }");
		assert_eq!(out, "3\n24\n");
	}

	#[test]
	fn compound_assignment_through_references() {
		let out = run("void main() { int[] v(2); v[1] = 4; v[1] += 3; v[1] <<= 2; print(v[1]); v[0] |= 5; print(v[0]); }");
		assert_eq!(out, "28\n5\n");
	}

	#[test]
	fn assignments_chain() {
		let out = run("void main() { int a; int b; a = b = 7; print(a + b); }");
		assert_eq!(out, "14\n");
	}

	#[test]
	fn read_only_targets_are_rejected() {
		assert!(diagnostics("void main() { const int a = 1; a = 2; }").contains("Not a valid lvalue"));
		assert!(diagnostics("void main() { int a = 1; const int b = a; b = 2; }").contains("Reference is read-only"));
		assert!(diagnostics("void main() { 1 = 2; }").contains("Not a valid lvalue"));
	}

	#[test]
	fn objects_are_copied_not_shared() {
		let out = run("void main() { string a = \"x\"; string b; b = a; a += \"y\"; print(a); print(b); }");
		assert_eq!(out, "xy\nx\n");
	}

	#[test]
	fn uninitialized_reads_warn_once() {
		let messages = diagnostics("void main() { int a; int b = a + 1; a += 1; }");
		assert_eq!(messages.matches("'a' is not initialized.").count(), 1, "{messages}");
		assert!(!diagnostics("void main() { int a; a = 1; int b = a; }").contains("not initialized"));
	}
}
