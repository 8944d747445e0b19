//! Implicit and explicit conversions.
//!
//! Every conversion is dispatched on whether the source and target are
//! primitives. With `generate` unset only the resulting type is computed,
//! which is how overload resolution tries a conversion without emitting code.

use super::{Compiler, Pos, context::{ExprContext, TypeInfo}};
use crate::{bytecode::{ByteCode, ConstValue, Instruction, NumKind, Var}, error::compiler::CompileErrorType, types::{Behaviour, DataType, FuncId, ObjectFlags}};

/// Lowest and highest value of an integer kind.
fn int_range(kind: NumKind) -> (i128, i128) {
	let bits = match kind {
		NumKind::I8 | NumKind::U8 => 8,
		NumKind::I16 | NumKind::U16 => 16,
		NumKind::I32 | NumKind::U32 | NumKind::F32 => 32,
		NumKind::I64 | NumKind::U64 | NumKind::F64 => 64,
	};
	if kind.is_unsigned() { (0, (1i128 << bits) - 1) } else { (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1) }
}

fn int_constant(kind: NumKind, bits: i64) -> ConstValue {
	if kind.is_unsigned() { ConstValue::UInt(kind.wrap(bits) as u64) } else { ConstValue::Int(kind.wrap(bits)) }
}

impl Compiler<'_> {
	/// Converts `ctx` towards `to`. The conversion is not guaranteed to reach
	/// `to`, callers compare the resulting type.
	pub(super) fn implicit_conversion(
		&mut self,
		ctx: &mut ExprContext,
		to: &DataType,
		pos: Pos,
		explicit: bool,
		generate: bool,
		reserved: &[Var],
	) {
		if ctx.ty.is_void() || to.is_any() {
			return;
		}
		let from = ctx.ty.data_type;
		match (from.is_primitive(), to.is_primitive()) {
			(true, true) => self.conv_primitive_to_primitive(ctx, to, pos, explicit, generate, reserved),
			(false, true) => self.conv_object_to_primitive(ctx, to, pos, explicit, generate, reserved),
			// TODO: construct objects from primitives through single argument
			// constructors or factories
			(true, false) => {}
			(false, false) => self.conv_object_to_object(ctx, to, pos, explicit, generate, reserved),
		}
	}

	fn conv_primitive_to_primitive(
		&mut self,
		ctx: &mut ExprContext,
		to: &DataType,
		pos: Pos,
		explicit: bool,
		generate: bool,
		reserved: &[Var],
	) {
		let from = ctx.ty.data_type;
		if from.is_equal_except_ref_and_const(to) {
			let _ = ctx.ty.data_type.make_read_only(to.is_read_only());
			return;
		}
		let (Some(from_kind), Some(to_kind)) = (NumKind::of(&from), NumKind::of(to)) else {
			return;
		};
		if to.is_enum_type() && !explicit {
			return;
		}
		if ctx.ty.is_constant {
			self.convert_constant(ctx, to, pos, explicit || !generate);
			let _ = ctx.ty.data_type.make_read_only(to.is_read_only());
			return;
		}

		let mut target = *to;
		let _ = target.make_reference(false);
		let _ = target.make_read_only(false);
		if !generate {
			ctx.ty.data_type = target;
			let _ = ctx.ty.data_type.make_read_only(to.is_read_only());
			return;
		}

		self.convert_to_variable_not_in(ctx, reserved);
		if from_kind == to_kind {
			ctx.ty.data_type.set_base_from(&target);
		} else {
			let src = ctx.ty.stack_offset;
			let dst = if ctx.ty.is_temporary && from.size_on_stack_dwords() == target.size_on_stack_dwords() {
				src
			} else {
				let ty = ctx.ty;
				self.release_temporary(&ty, &mut ctx.bc);
				let mut reserved = reserved.to_vec();
				reserved.push(src);
				self.allocate_temporary(&target, &reserved)
			};
			ctx.bc.instr(Instruction::Conv { dst, src, from: from_kind, to: to_kind });
			ctx.ty = TypeInfo::variable(target, dst, true);
		}
		let _ = ctx.ty.data_type.make_read_only(to.is_read_only());
	}

	/// Folds a numeric constant into another kind, warning when the value
	/// changes unless `quiet`.
	fn convert_constant(&mut self, ctx: &mut ExprContext, to: &DataType, pos: Pos, quiet: bool) {
		let from = ctx.ty.data_type;
		let (Some(from_kind), Some(to_kind)) = (NumKind::of(&from), NumKind::of(to)) else {
			return;
		};
		let value = ctx.ty.constant;
		let mut warning = None;
		let converted = if from_kind.is_float() {
			let f = value.as_f64();
			if to_kind == NumKind::F32 {
				let v = f as f32;
				if from_kind == NumKind::F64 && f64::from(v) != f && !f.is_nan() {
					warning = Some(CompileErrorType::LossOfPrecision);
				}
				ConstValue::Float(v)
			} else if to_kind == NumKind::F64 {
				ConstValue::Double(f)
			} else {
				let whole = f.trunc();
				let (min, max) = int_range(to_kind);
				if whole != f {
					warning = Some(CompileErrorType::NotExact);
				} else if to_kind.is_unsigned() && f < 0.0 {
					warning = Some(CompileErrorType::ChangeSign);
				} else if (whole as i128) < min || (whole as i128) > max {
					warning = Some(CompileErrorType::ValueTooLarge);
				}
				let bits = if to_kind.is_unsigned() { f as u64 as i64 } else { f as i64 };
				int_constant(to_kind, bits)
			}
		} else {
			let bits = from_kind.wrap(value.as_i64());
			let v = if from_kind.is_unsigned() { i128::from(bits as u64) } else { i128::from(bits) };
			match to_kind {
				NumKind::F32 => {
					let f = v as f32;
					if f as i128 != v {
						warning = Some(CompileErrorType::NotExact);
					}
					ConstValue::Float(f)
				}
				NumKind::F64 => {
					let f = v as f64;
					if f as i128 != v {
						warning = Some(CompileErrorType::NotExact);
					}
					ConstValue::Double(f)
				}
				_ => {
					let (min, max) = int_range(to_kind);
					if v < min || v > max {
						let half = (max + 1) / 2;
						let sign_changed = if to_kind.is_unsigned() {
							v < 0 && v >= -half
						} else {
							from_kind.is_unsigned() && v > max && v <= 2 * max + 1
						};
						warning =
							Some(if sign_changed { CompileErrorType::ChangeSign } else { CompileErrorType::ValueTooLarge });
					}
					int_constant(to_kind, v as i64)
				}
			}
		};
		if let Some(warning) = warning
			&& !quiet
		{
			self.report(warning, pos);
		}
		let mut dt = *to;
		let _ = dt.make_reference(false);
		ctx.ty = TypeInfo::constant(dt, converted);
	}

	/// Objects become primitives through their registered value casts.
	fn conv_object_to_primitive(
		&mut self,
		ctx: &mut ExprContext,
		to: &DataType,
		pos: Pos,
		explicit: bool,
		generate: bool,
		reserved: &[Var],
	) {
		if ctx.ty.is_explicit_handle {
			return;
		}
		let Some(id) = ctx.ty.data_type.type_id() else {
			return;
		};
		let kinds: &[Behaviour] =
			if explicit { &[Behaviour::ImplicitValueCast, Behaviour::ValueCast] } else { &[Behaviour::ImplicitValueCast] };
		let casts: Vec<(FuncId, DataType)> = self
			.registry
			.object_type(id)
			.beh
			.casts(kinds)
			.map(|f| (f, self.registry.function(f).return_type))
			.filter(|(_, ret)| ret.is_primitive())
			.collect();
		let pick = casts
			.iter()
			.find(|(_, ret)| ret.is_equal_except_ref_and_const(to))
			.or_else(|| casts.iter().find(|(_, ret)| ret.is_same_primitive_base_type(to)))
			.or_else(|| casts.iter().find(|(_, ret)| ret.is_numeric() && to.is_numeric()));
		let Some(&(func, ret)) = pick else {
			return;
		};
		if generate {
			self.push_object(ctx);
			self.perform_call(ctx, func, Vec::new(), pos);
		} else {
			ctx.ty = TypeInfo::value(ret);
		}
		self.conv_primitive_to_primitive(ctx, to, pos, explicit, generate, reserved);
	}

	fn conv_object_to_object(
		&mut self,
		ctx: &mut ExprContext,
		to: &DataType,
		pos: Pos,
		explicit: bool,
		generate: bool,
		reserved: &[Var],
	) {
		let from = ctx.ty.data_type;
		if from.is_null_handle() {
			if to.is_object_handle() {
				let mut dt = *to;
				let _ = dt.make_reference(false);
				ctx.ty.data_type = dt;
			}
			return;
		}
		let (Some(from_id), Some(to_id)) = (from.type_id(), to.type_id()) else {
			return;
		};
		if from_id != to_id {
			if self.conv_ref_cast(ctx, to, pos, explicit, generate) {
				self.conv_object_to_object(ctx, to, pos, explicit, generate, reserved);
			}
			return;
		}

		if to.is_object_handle() {
			if from.is_object_handle() {
				if from.is_handle_to_const() && !to.is_handle_to_const() {
					return;
				}
				if to.is_handle_to_const() {
					let _ = ctx.ty.data_type.make_handle_to_const(true);
				}
				return;
			}
			// The handle of an object
			if !from.supports_handles() || (from.is_read_only() && !to.is_handle_to_const()) {
				return;
			}
			let mut dt = from;
			let _ = dt.make_read_only(false);
			let _ = dt.make_handle(true, false);
			let _ = dt.make_handle_to_const(from.is_read_only() || to.is_handle_to_const());
			let _ = dt.make_reference(ctx.ty.is_variable && from.is_reference());
			ctx.ty.data_type = dt;
			return;
		}

		if from.is_object_handle() {
			// The object a handle points to
			if generate && ctx.ty.is_on_stack() {
				if from.is_reference() {
					ctx.bc.instr(Instruction::Deref);
				}
				ctx.bc.instr(Instruction::ChkRef);
			}
			let mut dt = from;
			let _ = dt.make_handle(false, false);
			let _ = dt.make_read_only(from.is_handle_to_const());
			let _ = dt.make_reference(ctx.ty.is_on_stack() || from.is_reference());
			ctx.ty.data_type = dt;
		}

		let current = ctx.ty.data_type;
		if current.is_read_only() && !to.is_read_only() {
			if current.can_be_copied(self.registry) {
				if generate {
					self.copy_to_temporary(ctx, pos, reserved);
				} else {
					let _ = ctx.ty.data_type.make_read_only(false);
				}
			}
		} else if to.is_read_only() {
			let _ = ctx.ty.data_type.make_read_only(true);
		}
	}

	/// Registered reference casts between object types. Leaves a handle of
	/// the target type.
	fn conv_ref_cast(&mut self, ctx: &mut ExprContext, to: &DataType, pos: Pos, explicit: bool, generate: bool) -> bool {
		let Some(from_id) = ctx.ty.data_type.type_id() else {
			return false;
		};
		let kinds: &[Behaviour] =
			if explicit { &[Behaviour::ImplicitRefCast, Behaviour::RefCast] } else { &[Behaviour::ImplicitRefCast] };
		let found = self
			.registry
			.object_type(from_id)
			.beh
			.casts(kinds)
			.find(|&f| self.registry.function(f).return_type.type_id() == to.type_id());
		let Some(func) = found else {
			return false;
		};
		if generate {
			self.push_object(ctx);
			self.perform_call(ctx, func, Vec::new(), pos);
		} else {
			let mut ret = self.registry.function(func).return_type;
			let _ = ret.make_reference(false);
			ctx.ty = TypeInfo::value(ret);
		}
		true
	}

	/// Leaves the result in a variable. Named variables stay where they are.
	pub(super) fn convert_to_variable(&mut self, ctx: &mut ExprContext) { self.convert_to_variable_not_in(ctx, &[]) }

	pub(super) fn convert_to_variable_not_in(&mut self, ctx: &mut ExprContext, reserved: &[Var]) {
		if ctx.ty.is_variable || ctx.ty.is_void() {
			return;
		}
		let mut reserved = reserved.to_vec();
		reserved.extend(ctx.bc.vars_used());
		let mut dt = ctx.ty.data_type;
		let _ = dt.make_reference(false);
		let offset = self.allocate_temporary(&dt, &reserved);
		if ctx.ty.is_constant {
			ctx.bc.instr(Instruction::SetV(offset, ctx.ty.constant));
		} else if ctx.ty.is_ref_on_stack() {
			ctx.bc.instr(Instruction::Rdr(offset));
		} else {
			ctx.bc.instr(Instruction::PopV(offset));
		}
		let explicit = ctx.ty.is_explicit_handle;
		ctx.ty = TypeInfo::variable(dt, offset, true);
		ctx.ty.is_explicit_handle = explicit;
	}

	/// Makes sure the value is in a temporary the caller may modify.
	pub(super) fn convert_to_temporary(&mut self, ctx: &mut ExprContext) {
		if ctx.ty.is_variable && !ctx.ty.is_temporary {
			let mut dt = ctx.ty.data_type;
			let _ = dt.make_reference(false);
			let _ = dt.make_read_only(false);
			let src = ctx.ty.stack_offset;
			let offset = self.allocate_temporary(&dt, &ctx.bc.vars_used());
			ctx.bc.instr(Instruction::CpyV { dst: offset, src });
			ctx.ty = TypeInfo::variable(dt, offset, true);
			return;
		}
		self.convert_to_variable(ctx);
		let _ = ctx.ty.data_type.make_read_only(false);
	}

	/// Reads a reference on the stack, leaving the value itself.
	pub(super) fn dereference(&mut self, ctx: &mut ExprContext) {
		if ctx.ty.is_ref_on_stack() {
			ctx.bc.instr(Instruction::Deref);
			let _ = ctx.ty.data_type.make_reference(false);
		}
	}

	/// Leaves the object itself on the stack, ready for a method call or a
	/// field access. Handles are checked for null.
	pub(super) fn push_object(&mut self, ctx: &mut ExprContext) {
		let dt = ctx.ty.data_type;
		let read_only = if dt.is_object_handle() { dt.is_handle_to_const() } else { dt.is_read_only() };
		if ctx.ty.is_variable {
			ctx.bc.instr(Instruction::PshV(ctx.ty.stack_offset));
			if dt.is_object_handle() {
				ctx.bc.instr(Instruction::ChkRef);
			}
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
		} else if ctx.ty.is_constant {
			ctx.bc.instr(Instruction::PshNull);
			ctx.bc.instr(Instruction::ChkRef);
		} else if dt.is_object_handle() {
			if dt.is_reference() {
				ctx.bc.instr(Instruction::Deref);
			}
			ctx.bc.instr(Instruction::ChkRef);
		}
		let mut obj = dt;
		let _ = obj.make_handle(false, false);
		let _ = obj.make_reference(true);
		let _ = obj.make_read_only(read_only);
		ctx.ty = TypeInfo::value(obj);
	}

	/// Pushes the value of a primitive or handle argument.
	pub(super) fn push_value(&mut self, ctx: &mut ExprContext) {
		if ctx.ty.is_constant {
			if ctx.ty.is_null_constant() {
				ctx.bc.instr(Instruction::PshNull);
			} else {
				ctx.bc.instr(Instruction::PshC(ctx.ty.constant));
			}
		} else if ctx.ty.is_variable {
			ctx.bc.instr(Instruction::PshV(ctx.ty.stack_offset));
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut ctx.bc);
		} else {
			self.dereference(ctx);
		}
		let _ = ctx.ty.data_type.make_reference(false);
		ctx.ty = TypeInfo::value(ctx.ty.data_type);
	}

	/// The instruction calling `func`.
	pub(super) fn call_instruction(&self, func: FuncId) -> Instruction {
		if self.registry.function(func).is_native() { Instruction::CallSys(func) } else { Instruction::Call(func) }
	}

	/// Initializes the variable with a default value of `dt`. Primitives are
	/// left alone.
	pub(super) fn default_construct(&mut self, dt: &DataType, var: Var, bc: &mut ByteCode, pos: Pos) -> bool {
		if dt.is_object_handle() {
			bc.instr(Instruction::SetV(var, ConstValue::Null));
			return true;
		}
		let Some(ot) = dt.object_type().filter(|_| dt.is_object()) else {
			return true;
		};
		let beh = self.registry.object_type(ot.id).beh.clone();
		if ot.flags.contains(ObjectFlags::REF) {
			let factory =
				beh.default_factory.or_else(|| beh.factories.iter().copied().find(|&f| self.registry.function(f).params.is_empty()));
			let Some(factory) = factory else {
				self.report(CompileErrorType::NoDefaultConstructor(self.format(dt)), pos);
				return false;
			};
			bc.instr(self.call_instruction(factory));
			bc.instr(Instruction::CpyRtoV(var));
			return true;
		}
		bc.instr(Instruction::Alloc { var, ty: ot.id });
		match beh.default_constructor {
			Some(constructor) => {
				bc.instr(Instruction::PshV(var));
				bc.instr(self.call_instruction(constructor));
			}
			None if !ot.flags.contains(ObjectFlags::POD) && !beh.constructors.is_empty() => {
				self.report(CompileErrorType::NoDefaultConstructor(self.format(dt)), pos);
				return false;
			}
			None => {}
		}
		true
	}

	/// Copies the object in `src` into the object in `dst` with the type's
	/// copy behaviour, or field by field for POD types.
	pub(super) fn copy_object(&mut self, bc: &mut ByteCode, dst: Var, src: Var, dt: &DataType, pos: Pos) -> bool {
		let Some(id) = dt.type_id() else {
			return false;
		};
		match self.registry.object_type(id).beh.copy {
			Some(copy) => {
				bc.instr(Instruction::PshV(dst));
				bc.instr(Instruction::PshV(src));
				bc.instr(self.call_instruction(copy));
			}
			None if dt.can_be_copied(self.registry) => {
				bc.instr(Instruction::PshV(dst));
				bc.instr(Instruction::CopyObj(src));
				bc.instr(Instruction::Pop);
			}
			None => {
				self.report(CompileErrorType::NoDefaultCopyOp, pos);
				return false;
			}
		}
		true
	}

	/// Replaces the object with a fresh, modifiable copy in a temporary.
	pub(super) fn copy_to_temporary(&mut self, ctx: &mut ExprContext, pos: Pos, reserved: &[Var]) {
		let mut dt = ctx.ty.data_type;
		let _ = dt.make_reference(false);
		let _ = dt.make_read_only(false);
		self.convert_to_variable_not_in(ctx, reserved);
		let src = ctx.ty;
		let mut reserved = reserved.to_vec();
		reserved.extend(ctx.bc.vars_used());
		let temp = self.temporary(&dt, &reserved);
		let mut bc = ByteCode::new();
		if self.default_construct(&dt, temp.stack_offset, &mut bc, pos) {
			self.copy_object(&mut bc, temp.stack_offset, src.stack_offset, &dt, pos);
		}
		ctx.bc.append(&mut bc);
		self.release_temporary(&src, &mut ctx.bc);
		ctx.ty = temp;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{compiler::tests::{messages, with_compiler}, scanner::TokenKind, types::TypeRegistry};

	fn constant(token: TokenKind, value: ConstValue) -> ExprContext {
		ExprContext::with_type(TypeInfo::constant(DataType::create_primitive(token, false), value))
	}

	fn convert(ctx: &mut ExprContext, to: TokenKind) -> String {
		let mut registry = TypeRegistry::new();
		messages(&mut registry, |c| {
			c.implicit_conversion(ctx, &DataType::create_primitive(to, false), (1, 1), false, true, &[])
		})
	}

	#[test]
	fn constants_fold_with_warnings() {
		let mut ctx = constant(TokenKind::Int, ConstValue::Int(-1));
		assert!(convert(&mut ctx, TokenKind::UInt).contains("changed sign"));
		assert_eq!(ctx.ty.constant, ConstValue::UInt(0xFFFF_FFFF));
		assert!(ctx.bc.is_empty());

		let mut ctx = constant(TokenKind::Int, ConstValue::Int(300));
		assert!(convert(&mut ctx, TokenKind::Int8).contains("too large"));
		assert_eq!(ctx.ty.constant, ConstValue::Int(44));

		let mut ctx = constant(TokenKind::Double, ConstValue::Double(2.5));
		assert!(convert(&mut ctx, TokenKind::Int).contains("not exact"));
		assert_eq!(ctx.ty.constant, ConstValue::Int(2));

		let mut ctx = constant(TokenKind::Double, ConstValue::Double(0.1));
		assert!(convert(&mut ctx, TokenKind::Float).contains("precision"));

		let mut ctx = constant(TokenKind::UInt, ConstValue::UInt(7));
		assert!(convert(&mut ctx, TokenKind::Double).is_empty());
		assert_eq!(ctx.ty.constant, ConstValue::Double(7.0));
	}

	#[test]
	fn variables_convert_through_a_temporary() {
		let mut registry = TypeRegistry::new();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			let double = DataType::create_primitive(TokenKind::Double, false);
			let var = c.allocate_variable(&int, false);
			let mut ctx = ExprContext::with_type(TypeInfo::variable(int, var, false));
			c.implicit_conversion(&mut ctx, &double, (1, 1), false, true, &[]);
			assert!(ctx.ty.is_temporary && ctx.ty.data_type.is_double_type());
			assert_eq!(
				ctx.bc.instructions(),
				&[Instruction::Conv { dst: ctx.ty.stack_offset, src: var, from: NumKind::I32, to: NumKind::F64 }]
			);
		});
	}

	#[test]
	fn bool_never_becomes_a_number() {
		let mut ctx = constant(TokenKind::Bool, ConstValue::Bool(true));
		convert(&mut ctx, TokenKind::Int);
		assert!(ctx.ty.data_type.is_boolean_type());
	}
}
