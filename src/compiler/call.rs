//! Overload resolution, argument passing and the calls themselves.
//!
//! Arguments are pushed left to right, after the object for methods. By
//! value and `&in` arguments are pushed as values, the stack keeps them alive
//! so their temporaries are released right away. `&out` arguments get a
//! temporary the callee writes, assigned to the real target once the call
//! returned. `&inout` arguments must be lvalues and are passed as references.

use super::{Compiler, Pos, context::{DeferredParam, ExprContext, PendingAccessor, TypeInfo}};
use crate::{bytecode::{ByteCode, Instruction, Var}, error::compiler::CompileErrorType, parser::expression::Expression, types::{DataType, FuncId, ObjectFlags, ParamModifier, Parameter}};

impl Compiler<'_> {
	/// Compiles call arguments, resolving property accessors.
	pub(super) fn compile_args(&mut self, args: &[Expression<'_>]) -> Vec<ExprContext> {
		args.iter()
			.map(|arg| {
				let mut ctx = self.compile_expression(arg);
				self.process_property_get(&mut ctx, arg.pos());
				ctx
			})
			.collect()
	}

	/// Drops arguments of a call that won't be made.
	pub(super) fn release_args(&mut self, args: Vec<ExprContext>) {
		let mut bc = ByteCode::new();
		for arg in args {
			self.release_temporary(&arg.ty, &mut bc);
		}
	}

	/// How well the argument fits the parameter, lower is better. `None` when
	/// it can't be passed at all.
	pub(super) fn match_argument(&mut self, arg: &ExprContext, param: &Parameter, pos: Pos) -> Option<u8> {
		if param.ty.is_any() {
			return Some(5);
		}
		let from = arg.ty.data_type;
		if param.modifier == ParamModifier::Out {
			let mut value = param.ty;
			let _ = value.make_reference(false);
			let mut ctx = ExprContext::with_type(TypeInfo::variable(value, 0, true));
			self.implicit_conversion(&mut ctx, &from, pos, false, false, &[]);
			if !ctx.ty.data_type.is_equal_except_ref_and_const(&from) {
				return None;
			}
			return Some(if value.is_equal_except_ref_and_const(&from) { 0 } else { 4 });
		}
		if param.modifier == ParamModifier::InOut
			&& param.ty.is_primitive()
			&& (param.ty.token() != from.token() || param.ty.object_type() != from.object_type())
		{
			return None;
		}

		let mut ctx = ExprContext::with_type(arg.ty);
		self.implicit_conversion(&mut ctx, &param.ty, pos, false, false, &[]);
		let converted = ctx.ty.data_type;
		if !param.ty.is_equal_except_ref(&converted) {
			return None;
		}
		let tier = if from.is_equal_except_ref(&converted) {
			0
		} else if from.is_equal_except_ref_and_const(&converted) {
			1
		} else if from.is_same_primitive_base_type(&converted) && from.is_unsigned_type() == converted.is_unsigned_type() {
			2
		} else if from.is_same_primitive_base_type(&converted) {
			3
		} else {
			4
		};
		Some(tier)
	}

	/// Picks the one candidate the arguments fit best. Every argument keeps
	/// only the candidates it fits at its best level, the survivors of all
	/// arguments win. A read only object only sees `const` methods, a mutable
	/// one prefers the non-const overload.
	pub(super) fn match_functions(
		&mut self,
		name: &str,
		candidates: &[FuncId],
		args: &[ExprContext],
		object_read_only: bool,
		pos: Pos,
	) -> Option<FuncId> {
		let viable: Vec<FuncId> = candidates
			.iter()
			.copied()
			.filter(|&f| {
				let desc = self.registry.function(f);
				desc.params.len() == args.len() && (!object_read_only || desc.is_read_only)
			})
			.collect();
		let mut matching = viable.clone();
		for (i, arg) in args.iter().enumerate() {
			let mut best = u8::MAX;
			let mut fits = Vec::new();
			for &f in &viable {
				let param = self.registry.function(f).params[i];
				if let Some(tier) = self.match_argument(arg, &param, pos) {
					best = best.min(tier);
					fits.push((f, tier));
				}
			}
			matching.retain(|f| fits.iter().any(|&(g, tier)| g == *f && tier == best));
		}
		if matching.len() > 1 && !object_read_only && matching.iter().any(|&f| !self.registry.function(f).is_read_only) {
			matching.retain(|&f| !self.registry.function(f).is_read_only);
		}
		if let [func] = matching[..] {
			return Some(func);
		}

		let arg_types = args
			.iter()
			.map(|arg| {
				let mut dt = arg.ty.data_type;
				let _ = dt.make_reference(false);
				self.format(&dt)
			})
			.collect::<Vec<_>>()
			.join(", ");
		let signature = format!("{name}({arg_types})");
		let shown = if matching.is_empty() {
			self.report(CompileErrorType::NoMatchingSignatures(signature), pos);
			candidates.to_vec()
		} else {
			self.report(CompileErrorType::MultipleMatchingSignatures(signature), pos);
			matching
		};
		for f in shown {
			let decl = self.registry.function(f).declaration(self.registry);
			self.report(CompileErrorType::Candidate(decl), pos);
		}
		None
	}

	/// Replaces the argument's code with the code pushing it. `&out`
	/// arguments hand back the writeback to do after the call.
	fn prepare_argument(&mut self, arg: &mut ExprContext, param: &Parameter, pos: Pos, reserved: &[Var]) -> Option<DeferredParam> {
		match param.modifier {
			ParamModifier::Out => return self.prepare_out_argument(arg, param, pos, reserved),
			ParamModifier::InOut => {
				self.prepare_inout_argument(arg, param, pos);
				return None;
			}
			ParamModifier::None | ParamModifier::In => {}
		}
		if param.ty.is_any() {
			if arg.ty.is_object_value() {
				self.push_object_argument(arg);
			} else {
				self.push_value(arg);
			}
			return None;
		}

		self.implicit_conversion(arg, &param.ty, pos, false, true, reserved);
		if !param.ty.is_equal_except_ref(&arg.ty.data_type) && !arg.ty.data_type.is_equal_except_ref_and_const(&param.ty) {
			let (from, to) = (self.format(&arg.ty.data_type), self.format(&param.ty));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
		}
		if param.ty.is_object() && !param.ty.is_object_handle() {
			let owned = arg.ty.is_variable && arg.ty.is_temporary;
			if param.modifier == ParamModifier::None && !owned && arg.ty.data_type.can_be_copied(self.registry) {
				self.copy_to_temporary(arg, pos, reserved);
			}
			self.push_object_argument(arg);
		} else {
			self.push_value(arg);
		}
		None
	}

	/// Pushes an object the callee works on directly.
	fn push_object_argument(&mut self, arg: &mut ExprContext) {
		if arg.ty.is_variable {
			arg.bc.instr(Instruction::PshV(arg.ty.stack_offset));
			let ty = arg.ty;
			self.release_temporary(&ty, &mut arg.bc);
		} else if arg.ty.is_null_constant() {
			arg.bc.instr(Instruction::PshNull);
		}
		arg.ty = TypeInfo::value(arg.ty.data_type);
	}

	fn prepare_out_argument(
		&mut self,
		arg: &mut ExprContext,
		param: &Parameter,
		pos: Pos,
		reserved: &[Var],
	) -> Option<DeferredParam> {
		if !arg.ty.is_lvalue() {
			self.report(CompileErrorType::ArgNotLValue, pos);
			let ty = arg.ty;
			self.release_temporary(&ty, &mut arg.bc);
			return None;
		}
		if arg.ty.data_type.is_read_only() {
			self.report(CompileErrorType::RefIsReadOnly, pos);
		}
		let mut value = param.ty;
		let _ = value.make_reference(false);
		let _ = value.make_read_only(false);
		let mut reserved = reserved.to_vec();
		reserved.extend(arg.bc.vars_used());
		let temp = self.temporary(&value, &reserved);

		let mut bc = ByteCode::new();
		if value.is_object() && !value.is_object_handle() {
			self.default_construct(&value, temp.stack_offset, &mut bc, pos);
			bc.instr(Instruction::PshV(temp.stack_offset));
		} else {
			if value.is_object_handle() {
				bc.instr(Instruction::SetV(temp.stack_offset, crate::bytecode::ConstValue::Null));
			}
			bc.instr(Instruction::Psf(temp.stack_offset));
		}
		let target = std::mem::replace(arg, ExprContext { bc, ..ExprContext::new() });
		Some(DeferredParam { temp, target: Box::new(target) })
	}

	fn prepare_inout_argument(&mut self, arg: &mut ExprContext, param: &Parameter, pos: Pos) {
		if !arg.ty.is_lvalue() {
			self.report(CompileErrorType::ArgNotLValue, pos);
		} else if arg.ty.data_type.is_read_only() && !param.ty.is_read_only() {
			self.report(CompileErrorType::RefIsReadOnly, pos);
		}
		if arg.ty.is_object_value() || arg.ty.is_constant {
			self.push_object_argument(arg);
		} else if arg.ty.is_variable {
			arg.bc.instr(Instruction::Psf(arg.ty.stack_offset));
			let ty = arg.ty;
			self.release_temporary(&ty, &mut arg.bc);
		}
		arg.ty = TypeInfo::value(param.ty);
	}

	/// Pushes the arguments, calls `func` and leaves its result in `ctx`. For
	/// methods the object must already be pushed by `ctx`'s code.
	pub(super) fn perform_call(&mut self, ctx: &mut ExprContext, func: FuncId, mut args: Vec<ExprContext>, pos: Pos) {
		let signature = self.signature(func);
		let reserved: Vec<Var> = args.iter().flat_map(|arg| arg.bc.vars_used()).collect();
		let mut deferred = Vec::new();
		for (arg, param) in args.iter_mut().zip(&signature.params) {
			if let Some(writeback) = self.prepare_argument(arg, param, pos, &reserved) {
				deferred.push(writeback);
			}
			ctx.merge(arg);
		}
		ctx.bc.instr(self.call_instruction(func));

		let ret = signature.return_type;
		if TypeInfo::value(ret).is_void() {
			ctx.ty = TypeInfo::default();
		} else if ret.is_reference() {
			ctx.bc.instr(Instruction::PshR);
			ctx.ty = TypeInfo::value(ret);
		} else {
			let temp = self.temporary(&ret, &reserved);
			ctx.bc.instr(Instruction::CpyRtoV(temp.stack_offset));
			ctx.ty = temp;
		}
		for writeback in deferred {
			self.process_deferred(ctx, writeback, pos);
		}
	}

	/// Assigns what the callee wrote into an `&out` temporary to the
	/// argument's real target.
	fn process_deferred(&mut self, ctx: &mut ExprContext, writeback: DeferredParam, pos: Pos) {
		let DeferredParam { temp, target } = writeback;
		let mut lhs = *target;
		let mut rhs = ExprContext::with_type(temp);
		rhs.ty.is_explicit_handle = temp.data_type.is_object_handle();
		self.perform_assignment(&mut lhs, &mut rhs, pos);
		if lhs.ty.is_variable && !lhs.ty.is_temporary {
			self.mark_initialized(lhs.ty.stack_offset);
		}
		self.discard(&mut lhs);
		self.release_temporary(&temp, &mut lhs.bc);
		ctx.merge(&mut lhs);
	}

	/// Global functions of the module and the host with the given name.
	fn function_candidates(&self, name: &str) -> Vec<FuncId> {
		let mut candidates = self.module.functions.get(name).cloned().unwrap_or_default();
		candidates.extend(self.registry.global_functions(name));
		candidates
	}

	/// `f(args)`, or `T(args)` when `T` names an object type.
	pub(super) fn compile_function_call(
		&mut self,
		scope: Option<&str>,
		name: &str,
		args: &[Expression<'_>],
		pos: Pos,
	) -> ExprContext {
		if scope.is_none_or(str::is_empty)
			&& let Some(id) = self.registry.find_type(name)
		{
			let dt = DataType::create_object(self.registry.type_ref(id), false);
			if dt.is_enum_type() {
				return self.compile_conversion(&dt, args, pos);
			}
			return self.compile_construct_call(&dt, args, pos);
		}

		let candidates = self.function_candidates(name);
		if candidates.is_empty() && (self.find_variable(name).is_some() || self.module.globals.contains_key(name)) {
			self.report(CompileErrorType::NotAFunction(name.to_string()), pos);
			return ExprContext::dummy();
		}
		if self.in_global_expression {
			self.report(CompileErrorType::NotInGlobalExpression("Function call"), pos);
			return ExprContext::dummy();
		}
		let args = self.compile_args(args);
		let Some(func) = self.match_functions(name, &candidates, &args, false, pos) else {
			self.release_args(args);
			return ExprContext::dummy();
		};
		let mut ctx = ExprContext::new();
		self.perform_call(&mut ctx, func, args, pos);
		ctx
	}

	/// `object.name(args)`
	pub(super) fn compile_method_call(
		&mut self,
		object: &Expression<'_>,
		name: &str,
		args: &[Expression<'_>],
		pos: Pos,
	) -> ExprContext {
		let mut ctx = self.compile_expression(object);
		self.process_property_get(&mut ctx, object.pos());
		let dt = ctx.ty.data_type;
		let candidates = match dt.type_id() {
			Some(id) if dt.is_object() => self.registry.methods(id, name),
			_ => Vec::new(),
		};
		if candidates.is_empty() {
			self.report(CompileErrorType::NotAMember(name.to_string(), self.format(&dt)), pos);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		}
		if self.in_global_expression {
			self.report(CompileErrorType::NotInGlobalExpression("Method call"), pos);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		}
		let args = self.compile_args(args);
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		let Some(func) = self.match_functions(name, &candidates, &args, read_only, pos) else {
			self.release_args(args);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		};
		self.push_object(&mut ctx);
		self.perform_call(&mut ctx, func, args, pos);
		ctx
	}

	/// `object[index]` through the type's `opIndex`.
	pub(super) fn compile_index(&mut self, object: &Expression<'_>, index: &Expression<'_>, pos: Pos) -> ExprContext {
		let mut ctx = self.compile_expression(object);
		self.process_property_get(&mut ctx, object.pos());
		let dt = ctx.ty.data_type;
		let candidates = match dt.type_id() {
			Some(id) if dt.is_object() => self.registry.methods(id, "opIndex"),
			_ => Vec::new(),
		};
		if candidates.is_empty() {
			self.report(CompileErrorType::NoIndexOperator(self.format(&dt)), pos);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		}
		let args = self.compile_args(std::slice::from_ref(index));
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		let Some(func) = self.match_functions("opIndex", &candidates, &args, read_only, pos) else {
			self.release_args(args);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		};
		self.push_object(&mut ctx);
		self.perform_call(&mut ctx, func, args, pos);
		ctx
	}

	/// `object.name`, a registered property or a pair of `get_`/`set_`
	/// accessors.
	pub(super) fn compile_member(&mut self, object: &Expression<'_>, name: &str, pos: Pos) -> ExprContext {
		let mut ctx = self.compile_expression(object);
		self.process_property_get(&mut ctx, object.pos());
		let dt = ctx.ty.data_type;
		let Some(id) = dt.type_id().filter(|_| dt.is_object()) else {
			self.report(CompileErrorType::NotAMember(name.to_string(), self.format(&dt)), pos);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		};
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };

		if let Some(prop) = self.registry.object_type(id).property(name).cloned() {
			self.push_object(&mut ctx);
			let is_object = prop.ty.is_object() && !prop.ty.is_object_handle();
			ctx.bc.instr(Instruction::Field { index: prop.index, object: is_object });
			let mut ty = prop.ty;
			let _ = ty.make_reference(true);
			if read_only {
				let _ = ty.make_read_only(true);
			}
			ctx.ty = TypeInfo::value(ty);
			return ctx;
		}

		let get = self
			.registry
			.methods(id, &format!("get_{name}"))
			.into_iter()
			.find(|&f| self.registry.function(f).params.is_empty() && (!read_only || self.registry.function(f).is_read_only));
		let set = self
			.registry
			.methods(id, &format!("set_{name}"))
			.into_iter()
			.find(|&f| self.registry.function(f).params.len() == 1 && !read_only);
		if get.is_none() && set.is_none() {
			self.report(CompileErrorType::NotAMember(name.to_string(), self.format(&dt)), pos);
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
			return ExprContext::dummy();
		}
		self.push_object(&mut ctx);
		ctx.ty = TypeInfo::value(self.accessor_type(get, set));
		ctx.accessor = Some(PendingAccessor { get, set, is_method: true });
		ctx
	}

	/// A global `get_name`/`set_name` pair used as a variable.
	pub(super) fn global_accessor(&mut self, name: &str) -> Option<ExprContext> {
		let get = self
			.function_candidates(&format!("get_{name}"))
			.into_iter()
			.find(|&f| self.registry.function(f).params.is_empty());
		let set = self
			.function_candidates(&format!("set_{name}"))
			.into_iter()
			.find(|&f| self.registry.function(f).params.len() == 1);
		if get.is_none() && set.is_none() {
			return None;
		}
		let mut ctx = ExprContext::with_type(TypeInfo::value(self.accessor_type(get, set)));
		ctx.accessor = Some(PendingAccessor { get, set, is_method: false });
		Some(ctx)
	}

	fn accessor_type(&self, get: Option<FuncId>, set: Option<FuncId>) -> DataType {
		let mut dt = match (get, set) {
			(Some(get), _) => self.registry.function(get).return_type,
			(None, Some(set)) => self.registry.function(set).params[0].ty,
			(None, None) => DataType::default(),
		};
		let _ = dt.make_reference(false);
		dt
	}

	/// Turns a pending accessor into the value its getter returns.
	pub(super) fn process_property_get(&mut self, ctx: &mut ExprContext, pos: Pos) {
		let Some(accessor) = ctx.accessor.take() else {
			return;
		};
		match accessor.get {
			Some(get) => self.perform_call(ctx, get, Vec::new(), pos),
			None => {
				self.report(CompileErrorType::NoGetAccessor, pos);
				if accessor.is_method {
					ctx.bc.instr(Instruction::Pop);
				}
				ctx.ty = TypeInfo::dummy();
			}
		}
	}

	/// Calls the setter of a pending accessor with `value`. The result is
	/// void.
	pub(super) fn process_property_set(&mut self, ctx: &mut ExprContext, value: ExprContext, pos: Pos) {
		let Some(accessor) = ctx.accessor.take() else {
			return;
		};
		let Some(set) = accessor.set else {
			self.report(CompileErrorType::NoSetAccessor, pos);
			if accessor.is_method {
				ctx.bc.instr(Instruction::Pop);
			}
			self.release_args(vec![value]);
			ctx.ty = TypeInfo::dummy();
			return;
		};
		let param = self.registry.function(set).params[0];
		if self.match_argument(&value, &param, pos).is_none() {
			let (from, to) = (self.format(&value.ty.data_type), self.format(&param.ty));
			self.report(CompileErrorType::CantImplicitlyConvert(from, to), pos);
			if accessor.is_method {
				ctx.bc.instr(Instruction::Pop);
			}
			self.release_args(vec![value]);
			ctx.ty = TypeInfo::dummy();
			return;
		}
		self.perform_call(ctx, set, vec![value], pos);
	}

	/// `T(args)` for an object type, constructed in a temporary.
	pub(super) fn compile_construct_call(&mut self, dt: &DataType, args: &[Expression<'_>], pos: Pos) -> ExprContext {
		let args = self.compile_args(args);
		let reserved: Vec<Var> = args.iter().flat_map(|arg| arg.bc.vars_used()).collect();
		let temp = self.temporary(dt, &reserved);
		let mut ctx = ExprContext::new();
		if !self.construct_into(&mut ctx, dt, temp.stack_offset, args, pos) {
			self.release_temporary(&temp, &mut ctx.bc);
			return ExprContext::dummy();
		}
		ctx.ty = temp;
		ctx
	}

	/// Initializes the object variable `var` from constructor arguments.
	/// Value types are allocated and constructed in place, reference types
	/// come from a factory.
	pub(super) fn construct_into(
		&mut self,
		ctx: &mut ExprContext,
		dt: &DataType,
		var: Var,
		mut args: Vec<ExprContext>,
		pos: Pos,
	) -> bool {
		let Some(ot) = dt.object_type().filter(|_| dt.is_object() && !dt.is_object_handle()) else {
			self.report(CompileErrorType::IllegalOperationOn(self.format(dt)), pos);
			self.release_args(args);
			return false;
		};
		if args.is_empty() {
			let mut bc = ByteCode::new();
			let done = self.default_construct(dt, var, &mut bc, pos);
			ctx.bc.append(&mut bc);
			return done;
		}
		let beh = self.registry.object_type(ot.id).beh.clone();
		let is_ref = ot.flags.contains(ObjectFlags::REF);

		// A value type built from another instance is a copy
		if !is_ref && args.len() == 1 && args[0].ty.data_type.type_id() == Some(ot.id) && beh.constructors.is_empty() {
			let Some(mut src) = args.pop() else {
				return false;
			};
			self.convert_to_variable_not_in(&mut src, &[var]);
			ctx.merge(&mut src);
			let mut bc = ByteCode::new();
			let done = self.default_construct(dt, var, &mut bc, pos)
				&& self.copy_object(&mut bc, var, src.ty.stack_offset, dt, pos);
			ctx.bc.append(&mut bc);
			self.release_temporary(&src.ty, &mut ctx.bc);
			return done;
		}

		let candidates = if is_ref { beh.factories } else { beh.constructors };
		let name = self.registry.type_name(ot.id);
		let Some(func) = self.match_functions(&name, &candidates, &args, false, pos) else {
			self.release_args(args);
			return false;
		};
		let mut call = ExprContext::new();
		if is_ref {
			self.perform_call(&mut call, func, args, pos);
			call.bc.instr(Instruction::RefCpyV { dst: var, src: call.ty.stack_offset });
			let ty = call.ty;
			self.release_temporary(&ty, &mut call.bc);
		} else {
			call.bc.instr(Instruction::Alloc { var, ty: ot.id });
			call.bc.instr(Instruction::PshV(var));
			self.perform_call(&mut call, func, args, pos);
		}
		ctx.merge(&mut call);
		true
	}
}

#[cfg(test)]
mod tests {
	use crate::compiler::tests::{diagnostics, run};

	#[test]
	fn overloads_pick_the_closest_type() {
		let out = run("void main() { print(1); print(2.5); print(true); float f = 1.5f; print(f); uint u = 7; print(u); }");
		assert_eq!(out, "1\n2.5\ntrue\n1.5\n7\n");
	}

	#[test]
	fn ambiguous_and_missing_overloads_are_reported() {
		let messages = diagnostics("void f(int a) {} void f(uint a) {} void main() { int8 x = 1; f(x); f(); }");
		assert!(messages.contains("No matching signatures to 'f()'"), "{messages}");
		assert!(messages.contains("Candidate: void f(int)"), "{messages}");

		let messages = diagnostics("void f(int64 a) {} void f(int16 a) {} void main() { f(1); }");
		assert!(messages.contains("Multiple matching signatures to 'f(const int)'"), "{messages}");
	}

	#[test]
	fn out_arguments_are_written_back() {
		let out = run(
			"void split(int v, int &out hi, int &out lo) { hi = v / 10; lo = v % 10; } \
			 void main() { int a, b; split(42, a, b); print(a); print(b); }",
		);
		assert_eq!(out, "4\n2\n");
	}

	#[test]
	fn inout_arguments_alias_the_caller() {
		let out = run("void twice(int &inout v) { v *= 2; } void main() { int a = 21; twice(a); print(a); }");
		assert_eq!(out, "42\n");
		assert!(diagnostics("void twice(int &inout v) {} void main() { twice(3); }").contains("not assignable"));
	}

	#[test]
	fn by_value_objects_are_copies() {
		let out = run(
			"void change(string s) { s += \"!\"; } void append(string &inout s) { s += \"?\"; } \
			 void main() { string a = \"hi\"; change(a); print(a); append(a); print(a); }",
		);
		assert_eq!(out, "hi\nhi?\n");
	}

	#[test]
	fn methods_and_array_indexing() {
		let out = run(
			"void main() { int[] a(3); a[0] = 5; a[2] = a[0] + 1; a.insertLast(9); \
			 print(a.length()); print(a[2]); print(a[3]); }",
		);
		assert_eq!(out, "4\n6\n9\n");
	}
}
