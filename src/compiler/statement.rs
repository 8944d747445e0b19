//! Statements, control flow and variable declarations.
//!
//! Every statement compiler returns whether the statement never falls through
//! to the next one, which is how missing returns and unreachable code are
//! detected.

use super::{Compiler, GlobalInit, Pos, context::{ExprContext, TypeInfo}, operators::{int_kind, is_wide, kind_type}};
use crate::{bytecode::{ByteCode, ConstValue, Instruction, Label, MathOp, NumKind, Operand, Var}, error::compiler::CompileErrorType, parser::expression::Expression, statement::{Case, Declarator, Initializer, Statement, StatementKind, VariableDecl}, types::DataType};

/// Case values this close together, and at least this many of them, are
/// dispatched through a jump table.
const TABLE_MAX_GAP: i128 = 5;
const TABLE_MIN_CASES: usize = 5;

fn case_constant(kind: NumKind, value: i128) -> ConstValue {
	if kind.is_unsigned() { ConstValue::UInt(value as u64) } else { ConstValue::Int(value as i64) }
}

impl Compiler<'_> {
	/// Compiles a list of statements. Code following a statement that never
	/// falls through is still checked, but not emitted.
	pub(super) fn compile_statement_block(
		&mut self,
		statements: &[Statement<'_>],
		bc: &mut ByteCode,
		own_scope: bool,
	) -> bool {
		if own_scope {
			self.push_scope(false, false);
		}
		let mut has_returned = false;
		let mut warned = false;
		let mut dead = ByteCode::new();
		for statement in statements {
			if has_returned {
				if !warned && !matches!(statement.kind, StatementKind::Empty) {
					self.report(CompileErrorType::UnreachableCode, statement.pos());
					warned = true;
				}
				self.compile_statement(statement, &mut dead);
				continue;
			}
			bc.line(statement.row);
			has_returned = self.compile_statement(statement, bc);
			debug_assert!(
				self.errors > 0 || self.temps.is_empty(),
				"temporaries live after the statement at line {}",
				statement.row
			);
		}
		if own_scope {
			self.pop_scope(bc);
		}
		has_returned
	}

	fn compile_statement(&mut self, statement: &Statement<'_>, bc: &mut ByteCode) -> bool {
		let pos = statement.pos();
		match &statement.kind {
			StatementKind::Expression(expr) => {
				self.compile_expression_statement(expr, bc);
				false
			}
			StatementKind::Declaration(decl) => {
				self.compile_declaration(decl, bc);
				false
			}
			StatementKind::If { condition, then_branch, else_branch } => {
				self.compile_if(condition, then_branch, else_branch.as_deref(), bc)
			}
			StatementKind::While { condition, body } => {
				self.compile_while(condition, body, bc);
				false
			}
			StatementKind::DoWhile { body, condition } => {
				self.compile_do_while(body, condition, bc);
				false
			}
			StatementKind::For { init, condition, increment, body } => {
				self.compile_for(init.as_deref(), condition.as_ref(), increment, body, bc);
				false
			}
			StatementKind::Switch { value, cases } => {
				self.compile_switch(value, cases, pos, bc);
				false
			}
			StatementKind::Break => {
				self.compile_break(false, pos, bc);
				true
			}
			StatementKind::Continue => {
				self.compile_break(true, pos, bc);
				true
			}
			StatementKind::Return(value) => {
				self.compile_return(value.as_ref(), pos, bc);
				true
			}
			StatementKind::Block(statements) => self.compile_statement_block(statements, bc, true),
			StatementKind::Empty => false,
		}
	}

	/// The branch of an `if` or the body of a loop. Declarations in a
	/// single-statement body are scoped to it.
	fn compile_sub_statement(&mut self, statement: &Statement<'_>, bc: &mut ByteCode) -> bool {
		if let StatementKind::Block(statements) = &statement.kind {
			return self.compile_statement_block(statements, bc, true);
		}
		self.push_scope(false, false);
		bc.line(statement.row);
		let has_returned = self.compile_statement(statement, bc);
		self.pop_scope(bc);
		has_returned
	}

	fn compile_expression_statement(&mut self, expr: &Expression<'_>, bc: &mut ByteCode) {
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, expr.pos());
		self.discard(&mut ctx);
		bc.append(&mut ctx.bc);
	}

	fn compile_declaration(&mut self, decl: &VariableDecl<'_>, bc: &mut ByteCode) {
		let pos = (decl.ty.base.row, decl.ty.base.col);
		let Some(dt) = self.resolve_type(&decl.ty, pos) else {
			return;
		};
		if !dt.can_be_instantiated(self.registry) {
			self.report(CompileErrorType::DataTypeCantBe(self.format(&dt)), pos);
			return;
		}
		for var in &decl.vars {
			bc.line(var.row);
			self.declare_local(&dt, var, bc);
		}
	}

	fn declare(&mut self, name: &str, dt: DataType, constant: Option<ConstValue>, pos: Pos) -> Option<Var> {
		let offset = self.declare_variable(name, dt, constant);
		if offset.is_none() {
			self.report(CompileErrorType::AlreadyDeclared(name.to_string()), pos);
		}
		offset
	}

	fn declare_local(&mut self, dt: &DataType, var: &Declarator<'_>, bc: &mut ByteCode) {
		let pos = (var.row, var.col);
		let is_object = dt.is_object() && !dt.is_object_handle();
		match &var.init {
			Initializer::None => {
				let Some(offset) = self.declare(var.name, *dt, None, pos) else {
					return;
				};
				if dt.is_object() || dt.is_object_handle() {
					self.default_construct(dt, offset, bc, pos);
					self.mark_initialized(offset);
				}
			}
			Initializer::Expression(expr) => self.declare_initialized(dt, var.name, expr, pos, bc),
			Initializer::Args(args) if !is_object => match args.as_slice() {
				[expr] => self.declare_initialized(dt, var.name, expr, pos, bc),
				_ => {
					let ctx = self.compile_conversion(dt, args, pos);
					self.release_args(vec![ctx]);
					if let Some(offset) = self.declare(var.name, *dt, None, pos) {
						self.mark_initialized(offset);
					}
				}
			},
			Initializer::Args(args) => {
				let args = self.compile_args(args);
				let Some(offset) = self.declare(var.name, *dt, None, pos) else {
					self.release_args(args);
					return;
				};
				let mut ctx = ExprContext::new();
				self.construct_into(&mut ctx, dt, offset, args, pos);
				self.mark_initialized(offset);
				bc.append(&mut ctx.bc);
			}
		}
	}

	/// `T name = expr`. The initializer is compiled before the variable
	/// exists. A `const` primitive with a constant initializer gets no
	/// storage.
	fn declare_initialized(&mut self, dt: &DataType, name: &str, expr: &Expression<'_>, pos: Pos, bc: &mut ByteCode) {
		let Some(mut ctx) = self.initial_value(dt, expr) else {
			if let Some(offset) = self.declare(name, *dt, None, pos) {
				self.mark_initialized(offset);
			}
			return;
		};
		if dt.is_read_only() && dt.is_primitive() && ctx.ty.is_constant {
			self.declare(name, *dt, Some(ctx.ty.constant), pos);
			return;
		}
		let Some(offset) = self.declare(name, *dt, None, pos) else {
			self.discard(&mut ctx);
			bc.append(&mut ctx.bc);
			return;
		};
		self.store_in_variable(&mut ctx, offset);
		self.mark_initialized(offset);
		bc.append(&mut ctx.bc);
	}

	/// The value a new variable of `dt` starts with, converted to `dt`.
	/// Objects always come as a temporary the variable takes over.
	fn initial_value(&mut self, dt: &DataType, expr: &Expression<'_>) -> Option<ExprContext> {
		let pos = expr.pos();
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, pos);

		if dt.is_object() && !dt.is_object_handle() {
			let mut value_type = *dt;
			let _ = value_type.make_read_only(false);
			let _ = value_type.make_reference(false);
			if ctx.ty.is_variable
				&& ctx.ty.is_temporary
				&& !ctx.ty.data_type.is_object_handle()
				&& ctx.ty.data_type.type_id() == dt.type_id()
			{
				return Some(ctx);
			}
			let temp = self.temporary(&value_type, &ctx.bc.vars_used());
			let mut result = ExprContext::with_type(temp);
			if !self.default_construct(&value_type, temp.stack_offset, &mut result.bc, pos) {
				self.release_args(vec![ctx]);
				self.release_temporary(&temp, &mut result.bc);
				return None;
			}
			let mut lhs = ExprContext::with_type(TypeInfo::variable(value_type, temp.stack_offset, false));
			self.perform_assignment(&mut lhs, &mut ctx, pos);
			self.discard(&mut lhs);
			result.merge(&mut lhs);
			return Some(result);
		}

		let from = ctx.ty.data_type;
		self.implicit_conversion(&mut ctx, dt, pos, false, true, &[]);
		if !ctx.ty.data_type.is_equal_except_ref_and_const(dt) {
			let (from, to) = (self.format(&from), self.format(dt));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![ctx]);
			return None;
		}
		Some(ctx)
	}

	/// Jumps to `label` when the condition is `when`. Constant conditions
	/// jump unconditionally or not at all.
	fn jump_on_condition(&mut self, mut cond: ExprContext, when: bool, label: Label, bc: &mut ByteCode) {
		if cond.ty.is_constant {
			if cond.ty.constant.as_bool() == when {
				bc.instr(Instruction::Jmp(label));
			}
			return;
		}
		self.convert_to_variable(&mut cond);
		cond.bc.instr(Instruction::CpyVtoR(cond.ty.stack_offset));
		let ty = cond.ty;
		self.release_temporary(&ty, &mut cond.bc);
		cond.bc.instr(if when { Instruction::Jnz(label) } else { Instruction::Jz(label) });
		bc.append(&mut cond.bc);
	}

	fn compile_if(
		&mut self,
		condition: &Expression<'_>,
		then_branch: &Statement<'_>,
		else_branch: Option<&Statement<'_>>,
		bc: &mut ByteCode,
	) -> bool {
		let cond = self.compile_condition(condition);
		if cond.ty.is_constant {
			let taken = cond.ty.constant.as_bool();
			let (mut then_bc, mut else_bc) = (ByteCode::new(), ByteCode::new());
			let then_returned = self.compile_sub_statement(then_branch, &mut then_bc);
			let else_returned = else_branch.is_some_and(|s| self.compile_sub_statement(s, &mut else_bc));
			if taken {
				bc.append(&mut then_bc);
				return then_returned;
			}
			bc.append(&mut else_bc);
			return else_returned;
		}

		let else_label = self.next_label();
		self.jump_on_condition(cond, false, else_label, bc);
		let then_returned = self.compile_sub_statement(then_branch, bc);
		let Some(else_branch) = else_branch else {
			bc.label(else_label);
			return false;
		};
		let end = self.next_label();
		if !then_returned {
			bc.instr(Instruction::Jmp(end));
		}
		bc.label(else_label);
		let else_returned = self.compile_sub_statement(else_branch, bc);
		bc.label(end);
		then_returned && else_returned
	}

	/// Loop bodies get a scope of their own, the one `break` and `continue`
	/// leave.
	fn compile_loop_body(&mut self, body: &Statement<'_>, bc: &mut ByteCode) {
		self.push_scope(true, true);
		match &body.kind {
			StatementKind::Block(statements) => {
				self.compile_statement_block(statements, bc, false);
			}
			_ => {
				bc.line(body.row);
				self.compile_statement(body, bc);
			}
		}
		self.pop_scope(bc);
	}

	fn compile_while(&mut self, condition: &Expression<'_>, body: &Statement<'_>, bc: &mut ByteCode) {
		let (start, end) = (self.next_label(), self.next_label());
		bc.label(start);
		let cond = self.compile_condition(condition);
		self.jump_on_condition(cond, false, end, bc);

		self.break_labels.push(end);
		self.continue_labels.push(start);
		self.compile_loop_body(body, bc);
		self.break_labels.pop();
		self.continue_labels.pop();

		bc.instr(Instruction::Jmp(start));
		bc.label(end);
	}

	fn compile_do_while(&mut self, body: &Statement<'_>, condition: &Expression<'_>, bc: &mut ByteCode) {
		let (start, next, end) = (self.next_label(), self.next_label(), self.next_label());
		bc.label(start);
		self.break_labels.push(end);
		self.continue_labels.push(next);
		self.compile_loop_body(body, bc);
		self.break_labels.pop();
		self.continue_labels.pop();

		bc.label(next);
		bc.line(condition.pos().0);
		let cond = self.compile_condition(condition);
		self.jump_on_condition(cond, true, start, bc);
		bc.label(end);
	}

	fn compile_for(
		&mut self,
		init: Option<&Statement<'_>>,
		condition: Option<&Expression<'_>>,
		increment: &[Expression<'_>],
		body: &Statement<'_>,
		bc: &mut ByteCode,
	) {
		self.push_scope(false, false);
		if let Some(init) = init {
			bc.line(init.row);
			self.compile_statement(init, bc);
		}
		let (start, next, end) = (self.next_label(), self.next_label(), self.next_label());
		bc.label(start);
		if let Some(condition) = condition {
			let cond = self.compile_condition(condition);
			self.jump_on_condition(cond, false, end, bc);
		}

		self.break_labels.push(end);
		self.continue_labels.push(next);
		self.compile_loop_body(body, bc);
		self.break_labels.pop();
		self.continue_labels.pop();

		bc.label(next);
		for expr in increment {
			self.compile_expression_statement(expr, bc);
		}
		bc.instr(Instruction::Jmp(start));
		bc.label(end);
		self.pop_scope(bc);
	}

	/// The switch value is compared against the sorted case values. Runs of
	/// close values go through a jump table, the rest through a chain of
	/// compares.
	fn compile_switch(&mut self, value: &Expression<'_>, cases: &[Case<'_>], pos: Pos, bc: &mut ByteCode) {
		let mut ctx = self.compile_expression(value);
		self.process_property_get(&mut ctx, value.pos());
		let Some(kind) = NumKind::of(&ctx.ty.data_type).filter(|k| !k.is_float()) else {
			self.report(CompileErrorType::SwitchMustBeIntegral, value.pos());
			self.release_args(vec![ctx]);
			return;
		};
		if cases.is_empty() {
			self.report(CompileErrorType::EmptySwitch, pos);
			self.release_args(vec![ctx]);
			return;
		}
		let kind = int_kind(is_wide(kind), kind.is_unsigned());
		let switch_type = kind_type(kind);
		self.implicit_conversion(&mut ctx, &switch_type, value.pos(), false, true, &[]);
		self.convert_to_variable(&mut ctx);
		let var = ctx.ty.stack_offset;

		let mut values: Vec<(i128, usize)> = Vec::new();
		let mut default = None;
		for (i, case) in cases.iter().enumerate() {
			let case_pos = (case.row, case.col);
			let Some(expr) = &case.value else {
				if i + 1 != cases.len() {
					self.report(CompileErrorType::DefaultMustBeLast, case_pos);
				}
				default = Some(i);
				continue;
			};
			let mut c = self.compile_expression(expr);
			self.implicit_conversion(&mut c, &switch_type, expr.pos(), false, true, &[var]);
			if !c.ty.is_constant {
				self.report(CompileErrorType::SwitchCaseMustBeConstant, case_pos);
				self.release_args(vec![c]);
				continue;
			}
			let v = if kind.is_unsigned() { i128::from(c.ty.constant.as_u64()) } else { i128::from(c.ty.constant.as_i64()) };
			if values.iter().any(|&(x, _)| x == v) {
				self.report(CompileErrorType::DuplicateSwitchCase, case_pos);
				continue;
			}
			values.push((v, i));
		}
		values.sort_unstable_by_key(|&(v, _)| v);

		let labels: Vec<Label> = cases.iter().map(|_| self.next_label()).collect();
		let end = self.next_label();
		let mut i = 0;
		while i < values.len() {
			let mut j = i + 1;
			while j < values.len() && values[j].0 - values[j - 1].0 <= TABLE_MAX_GAP {
				j += 1;
			}
			if j - i >= TABLE_MIN_CASES {
				self.emit_jump_table(&values[i..j], var, kind, &labels, &mut ctx.bc);
			} else {
				for &(v, case) in &values[i..j] {
					let rhs = Operand::Const(case_constant(kind, v));
					ctx.bc.instr(Instruction::Cmp { kind, lhs: Operand::Var(var), rhs });
					ctx.bc.instr(Instruction::Jz(labels[case]));
				}
			}
			i = j;
		}
		ctx.bc.instr(Instruction::Jmp(default.map_or(end, |d| labels[d])));
		let ty = ctx.ty;
		self.release_temporary(&ty, &mut ctx.bc);
		bc.append(&mut ctx.bc);

		self.break_labels.push(end);
		self.push_scope(true, false);
		for (case, label) in cases.iter().zip(&labels) {
			bc.label(*label);
			bc.line(case.row);
			self.compile_statement_block(&case.body, bc, false);
		}
		self.pop_scope(bc);
		self.break_labels.pop();
		bc.label(end);
	}

	/// `JmpP` skips as many of the following jumps as the value is above the
	/// lowest case. Values outside the range skip the table.
	fn emit_jump_table(&mut self, cluster: &[(i128, usize)], var: Var, kind: NumKind, labels: &[Label], bc: &mut ByteCode) {
		let (Some(&(low, _)), Some(&(high, _))) = (cluster.first(), cluster.last()) else {
			return;
		};
		let skip = self.next_label();
		bc.instr(Instruction::Cmp { kind, lhs: Operand::Var(var), rhs: Operand::Const(case_constant(kind, low)) });
		bc.instr(Instruction::Js(skip));
		bc.instr(Instruction::Cmp { kind, lhs: Operand::Var(var), rhs: Operand::Const(case_constant(kind, high)) });
		bc.instr(Instruction::Jp(skip));

		let offset = self.allocate_temporary(&kind_type(kind), &[var]);
		bc.instr(Instruction::Math {
			op: MathOp::Sub,
			kind,
			dst: offset,
			lhs: Operand::Var(var),
			rhs: Operand::Const(case_constant(kind, low)),
		});
		bc.instr(Instruction::JmpP(offset));
		for v in low..=high {
			let target = cluster.iter().find(|&&(x, _)| x == v).map_or(skip, |&(_, case)| labels[case]);
			bc.instr(Instruction::Jmp(target));
		}
		bc.label(skip);
		self.release_temporary_var(offset, bc);
	}

	fn compile_break(&mut self, is_continue: bool, pos: Pos, bc: &mut ByteCode) {
		let label = if is_continue { self.continue_labels.last() } else { self.break_labels.last() };
		let Some(&label) = label else {
			let error = if is_continue { CompileErrorType::InvalidContinue } else { CompileErrorType::InvalidBreak };
			self.report(error, pos);
			return;
		};
		self.free_scopes_until(bc, is_continue);
		bc.instr(Instruction::Jmp(label));
	}

	/// The value is left in the register. Named objects are copied first,
	/// leaving the function frees them.
	fn compile_return(&mut self, value: Option<&Expression<'_>>, pos: Pos, bc: &mut ByteCode) {
		let return_type = self.return_type;
		let is_void = TypeInfo::value(return_type).is_void();
		match value {
			None if !is_void => self.report(CompileErrorType::MustReturnValue, pos),
			None => {}
			Some(_) if is_void => self.report(CompileErrorType::CantReturnValue, pos),
			Some(expr) => self.compile_return_value(expr, &return_type, bc),
		}
		self.free_all_scopes(bc);
		bc.instr(Instruction::Ret);
	}

	fn compile_return_value(&mut self, expr: &Expression<'_>, return_type: &DataType, bc: &mut ByteCode) {
		let pos = expr.pos();
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, pos);
		let from = ctx.ty.data_type;
		self.implicit_conversion(&mut ctx, return_type, pos, false, true, &[]);
		if !ctx.ty.data_type.is_equal_except_ref_and_const(return_type) {
			let (from, to) = (self.format(&from), self.format(return_type));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			self.release_args(vec![ctx]);
			return;
		}
		let owned = ctx.ty.is_variable && ctx.ty.is_temporary;
		if return_type.is_object() && !return_type.is_object_handle() && !owned {
			self.copy_to_temporary(&mut ctx, pos, &[]);
		}
		self.convert_to_variable(&mut ctx);
		ctx.bc.instr(Instruction::CpyVtoR(ctx.ty.stack_offset));
		let ty = ctx.ty;
		self.release_temporary(&ty, &mut ctx.bc);
		bc.append(&mut ctx.bc);
	}

	/// Evaluates the initializer of a script global and stores it through
	/// the global's reference. Globals without one keep their default.
	pub(super) fn compile_global_init(&mut self, global: &GlobalInit<'_, '_>, bc: &mut ByteCode) {
		let pos = (global.row, global.col);
		let dt = self.registry.global(global.id).ty;
		let is_object = dt.is_object() && !dt.is_object_handle();
		let mut value_type = dt;
		let _ = value_type.make_read_only(false);

		let ctx = match global.init {
			Initializer::None if is_object => {
				let temp = self.temporary(&value_type, &[]);
				let mut ctx = ExprContext::with_type(temp);
				self.default_construct(&value_type, temp.stack_offset, &mut ctx.bc, pos);
				Some(ctx)
			}
			Initializer::None => None,
			Initializer::Args(args) if is_object => {
				let args = self.compile_args(args);
				let temp = self.temporary(&value_type, &[]);
				let mut ctx = ExprContext::with_type(temp);
				self.construct_into(&mut ctx, &value_type, temp.stack_offset, args, pos);
				Some(ctx)
			}
			Initializer::Args(args) => match args.as_slice() {
				[expr] => self.initial_value(&dt, expr),
				_ => {
					let ctx = self.compile_conversion(&dt, args, pos);
					self.release_args(vec![ctx]);
					None
				}
			},
			Initializer::Expression(expr) => self.initial_value(&dt, expr),
		};
		let Some(mut ctx) = ctx else {
			return;
		};

		self.convert_to_variable(&mut ctx);
		let var = ctx.ty.stack_offset;
		ctx.bc.instr(Instruction::Pga(global.id));
		ctx.bc.instr(if dt.is_object() || dt.is_object_handle() { Instruction::RefCpy(var) } else { Instruction::Wrt(var) });
		ctx.bc.instr(Instruction::Pop);
		let ty = ctx.ty;
		self.release_temporary(&ty, &mut ctx.bc);
		bc.append(&mut ctx.bc);
	}
}

#[cfg(test)]
mod tests {
	use crate::{bytecode::{ConstValue, Instruction}, compiler::tests::{compile, diagnostics, registry, run}, types::FunctionKind};

	fn code_of(source: &str, name: &str) -> Vec<Instruction> {
		let (mut registry, _) = registry();
		let (sink, functions) = compile(&mut registry, source);
		assert_eq!(sink.errors().count(), 0, "{:?}", sink.messages);
		let FunctionKind::Script(Some(code)) = &registry.function(functions[name]).kind else {
			panic!("'{name}' was not compiled")
		};
		code.code.clone()
	}

	#[test]
	fn constant_initializers_are_folded() {
		let code = code_of("void main() { int x = 2 + 3 * 4; }", "main");
		assert!(code.iter().any(|i| matches!(i, Instruction::SetV(_, ConstValue::Int(14)))), "{code:?}");
		assert!(!code.iter().any(|i| matches!(i, Instruction::Math { .. })), "{code:?}");
	}

	#[test]
	fn const_locals_take_no_storage() {
		let code = code_of("int main() { const int c = 3; return c * 2; }", "main");
		assert!(!code.iter().any(|i| matches!(i, Instruction::SetV(_, ConstValue::Int(3)))), "{code:?}");
		assert!(code.iter().any(|i| matches!(i, Instruction::SetV(_, ConstValue::Int(6)))), "{code:?}");
	}

	#[test]
	fn loops_break_and_continue() {
		let out = run("void main() {
			int sum = 0;
			for (int i = 0; i < 10; i++) {
				if (i == 3) continue;
				if (i == 6) break;
				sum += i;
			}
			print(sum);
			int n = 0;
			while (n < 5) n += 2;
			print(n);
			do { n--; } while (n > 3);
			print(n);
		}");
		assert_eq!(out, "12\n6\n3\n");
	}

	#[test]
	fn if_else_chains() {
		let out = run("string sign(int v) {
				if (v < 0) return \"negative\";
				else if (v == 0) return \"zero\";
				else return \"positive\";
			}
			void main() { print(sign(-4)); print(sign(0)); print(sign(9)); if (false) print(1); else print(2); }");
		assert_eq!(out, "negative\nzero\npositive\n2\n");
	}

	#[test]
	fn switch_falls_through() {
		let out = run("string name(int v) {
				switch (v) {
				case 1: return \"one\";
				case 2:
				case 3: return \"few\";
				default: return \"many\";
				}
				return \"\";
			}
			void main() { print(name(1)); print(name(2)); print(name(3)); print(name(7)); }");
		assert_eq!(out, "one\nfew\nfew\nmany\n");
	}

	#[test]
	fn dense_cases_use_a_jump_table() {
		let source = "int classify(int v) {
				int r = -1;
				switch (v) {
				case 10: r = 0; break;
				case 11: r = 1; break;
				case 12: r = 2; break;
				case 14: r = 4; break;
				case 15: r = 5; break;
				case 100: r = 100; break;
				}
				return r;
			}
			void main() { for (int i = 9; i <= 16; i++) print(classify(i)); print(classify(100)); print(classify(-5)); }";
		assert!(code_of(source, "classify").iter().any(|i| matches!(i, Instruction::JmpP(_))));
		assert_eq!(run(source), "-1\n0\n1\n2\n-1\n4\n5\n-1\n100\n-1\n");
	}

	#[test]
	fn switch_errors() {
		assert!(diagnostics("void main() { float f = 1; switch (f) { case 1: break; } }").contains("must be an integral type"));
		assert!(diagnostics("void main(int a) { switch (a) { case 1: case 1: break; } }").contains("Duplicate switch case"));
		assert!(diagnostics("void f(int a, int b) { switch (a) { case b: break; } }").contains("Case expressions must be constants"));
		assert!(diagnostics("void f(int a) { switch (a) { default: break; case 1: break; } }").contains("default case must be the last"));
	}

	#[test]
	fn control_flow_errors() {
		assert!(diagnostics("void main() { break; }").contains("Invalid 'break'"));
		assert!(diagnostics("void main() { if (true) continue; }").contains("Invalid 'continue'"));
		assert!(diagnostics("int f() { return; }").contains("Must return a value"));
		assert!(diagnostics("void f() { return 1; }").contains("Can't return value when return type is 'void'"));
		let messages = diagnostics("int f() { return 1; int a = 2; a++; }");
		assert_eq!(messages.matches("Unreachable code").count(), 1, "{messages}");
	}

	#[test]
	fn declarations() {
		assert!(diagnostics("void main() { int a = 1; int a = 2; }").contains("'a' is already declared"));
		assert!(diagnostics("void main() { int a = \"x\"; }").contains("Can't implicitly convert from 'const string' to 'int'"));
		assert_eq!(run("void main() { int a = 1; { int a = 5; print(a); } print(a); int b(7), c; c = b; print(c); }"), "5\n1\n7\n");
	}

	#[test]
	fn objects_are_copied_on_return() {
		let out = run("string keep() { string s = \"abc\"; string t = s; t += \"d\"; return s; } void main() { print(keep()); }");
		assert_eq!(out, "abc\n");
	}

	#[test]
	fn statements_leave_no_temporaries() {
		let source = "
			int twice(int a) { return a * 2; }
			void fill(int &out a, int &out b) { a = 7; b = 3; }
			void main() {
				int total = twice(3) + twice(4);
				int o;
				int p;
				fill(o, p);
				total += twice(o) * p;
				total -= o % 3 == 1 ? twice(1) : 0;
				string s = \"x\";
				s += \"!\" + s;
				print(total);
				print(s);
			}";
		let (mut registry, _) = registry();
		let (sink, functions) = compile(&mut registry, source);
		assert_eq!(sink.errors().count(), 0, "{:?}", sink.messages);
		for name in ["twice", "fill", "main"] {
			let FunctionKind::Script(Some(code)) = &registry.function(functions[name]).kind else {
				panic!("'{name}' was not compiled")
			};
			assert_eq!(code.temps.allocated, code.temps.released, "{name}");
		}
		assert_eq!(run(source), "54\nx!x\n");
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "temporaries live after the statement at line 4")]
	fn a_live_temporary_fails_its_statement() {
		use crate::{bytecode::ByteCode, compiler::tests::with_compiler, scanner::TokenKind, statement::{Statement, StatementKind}, types::{DataType, TypeRegistry}};

		let mut registry = TypeRegistry::new();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			c.allocate_temporary(&int, &[]);
			let statements = [Statement { kind: StatementKind::Empty, row: 4, col: 1 }];
			c.compile_statement_block(&statements, &mut ByteCode::new(), false);
		});
	}
}
