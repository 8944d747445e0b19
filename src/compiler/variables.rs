//! Stack slots, lexical scopes and the temporary variable pool.

use super::{Compiler, context::TypeInfo};
use crate::{bytecode::{ByteCode, ConstValue, Instruction, Var}, scanner::TokenKind, types::DataType};

/// A named variable or parameter.
#[derive(Debug, Clone)]
pub(super) struct Variable {
	pub name:            String,
	pub ty:              DataType,
	pub offset:          Var,
	pub is_initialized:  bool,
	/// `const` primitives with a constant initializer have no storage
	pub constant:        Option<ConstValue>,
	/// `&out` and `&inout` parameters of primitive or handle type hold a
	/// reference to the caller's value
	pub holds_reference: bool,
}

impl Variable {
	/// Whether leaving the variable's scope has to free its slot.
	fn needs_free(&self) -> bool { self.constant.is_none() && (holds_object(&self.ty) || self.holds_reference) }
}

#[derive(Debug, Default)]
pub(super) struct Scope {
	pub vars:              Vec<Variable>,
	pub is_break_scope:    bool,
	pub is_continue_scope: bool,
}

#[derive(Debug)]
pub(super) struct Slot {
	offset:       Var,
	/// Primitives are normalized to their size, an `int` slot can hold any
	/// one dword value
	ty:           DataType,
	is_temporary: bool,
	free:         bool,
}

/// Primitives only differ by size once they sit in a slot.
fn slot_type(dt: &DataType) -> DataType {
	if dt.is_primitive() && !dt.is_reference() {
		let token = if dt.size_on_stack_dwords() == 2 { TokenKind::Double } else { TokenKind::Int };
		return DataType::create_primitive(token, false);
	}
	let mut ty = *dt;
	let _ = ty.make_read_only(false);
	ty
}

/// Whether releasing a slot of this type has to drop what it holds.
pub(super) fn holds_object(dt: &DataType) -> bool { dt.is_object() || dt.is_object_handle() || dt.is_reference() }

/// Frees the variables of `scope`, last declared first.
fn free_scope(scope: &Scope, bc: &mut ByteCode) {
	for var in scope.vars.iter().rev().filter(|v| v.needs_free()) {
		bc.instr(Instruction::Free(var.offset));
	}
}

impl Compiler<'_> {
	pub(super) fn allocate_variable(&mut self, dt: &DataType, is_temporary: bool) -> Var {
		self.allocate_variable_not_in(dt, is_temporary, &[])
	}

	/// A slot for a value of `dt` whose offset is none of `reserved`.
	pub(super) fn allocate_variable_not_in(&mut self, dt: &DataType, is_temporary: bool, reserved: &[Var]) -> Var {
		let ty = slot_type(dt);
		if let Some(slot) = self.slots.iter_mut().find(|s| {
			s.free && s.is_temporary == is_temporary && s.ty.is_equal_except_const(&ty) && !reserved.contains(&s.offset)
		}) {
			slot.free = false;
			return slot.offset;
		}
		self.stack_size += dt.size_on_stack_dwords().max(1);
		let offset = self.stack_size;
		if holds_object(&ty) {
			self.object_vars.push(offset);
		}
		self.slots.push(Slot { offset, ty, is_temporary, free: false });
		offset
	}

	pub(super) fn deallocate_variable(&mut self, offset: Var) {
		if let Some(slot) = self.slots.iter_mut().find(|s| s.offset == offset) {
			slot.free = true;
		}
	}

	pub(super) fn allocate_temporary(&mut self, dt: &DataType, reserved: &[Var]) -> Var {
		let offset = self.allocate_variable_not_in(dt, true, reserved);
		self.temps.push(offset);
		self.stats.allocated += 1;
		offset
	}

	/// A temporary for `dt` as a [`TypeInfo`], the reference flag dropped.
	pub(super) fn temporary(&mut self, dt: &DataType, reserved: &[Var]) -> TypeInfo {
		let mut dt = *dt;
		let _ = dt.make_reference(false);
		let offset = self.allocate_temporary(&dt, reserved);
		TypeInfo::variable(dt, offset, true)
	}

	/// Releases the slot when `ty` is a temporary. Objects held by it are freed
	/// at this point of `bc`.
	pub(super) fn release_temporary(&mut self, ty: &TypeInfo, bc: &mut ByteCode) {
		if ty.is_variable && ty.is_temporary {
			self.release_temporary_var(ty.stack_offset, bc);
		}
	}

	pub(super) fn release_temporary_var(&mut self, offset: Var, bc: &mut ByteCode) {
		let Some(index) = self.temps.iter().position(|&t| t == offset) else {
			return;
		};
		self.temps.swap_remove(index);
		self.stats.released += 1;
		if let Some(slot) = self.slots.iter_mut().find(|s| s.offset == offset) {
			slot.free = true;
			if holds_object(&slot.ty) {
				bc.instr(Instruction::Free(offset));
			}
		}
	}

	pub(super) fn push_scope(&mut self, is_break_scope: bool, is_continue_scope: bool) {
		self.scopes.push(Scope { vars: Vec::new(), is_break_scope, is_continue_scope });
	}

	/// Frees the objects of the innermost scope, last declared first.
	pub(super) fn pop_scope(&mut self, bc: &mut ByteCode) {
		let Some(scope) = self.scopes.pop() else {
			return;
		};
		free_scope(&scope, bc);
		for var in scope.vars.iter().filter(|v| v.constant.is_none()) {
			self.deallocate_variable(var.offset);
		}
	}

	/// The code leaving every scope above the nearest break (or continue)
	/// scope, without popping them.
	pub(super) fn free_scopes_until(&self, bc: &mut ByteCode, is_continue: bool) {
		for scope in self.scopes.iter().rev() {
			free_scope(scope, bc);
			if (is_continue && scope.is_continue_scope) || (!is_continue && scope.is_break_scope) {
				return;
			}
		}
	}

	/// Frees every object variable in scope, before a `return`.
	pub(super) fn free_all_scopes(&self, bc: &mut ByteCode) {
		for scope in self.scopes.iter().rev() {
			free_scope(scope, bc);
		}
	}

	/// Declares a named variable in the innermost scope. `None` when the name
	/// is taken in that scope.
	pub(super) fn declare_variable(&mut self, name: &str, ty: DataType, constant: Option<ConstValue>) -> Option<Var> {
		let scope = self.scopes.last()?;
		if scope.vars.iter().any(|v| v.name == name) {
			return None;
		}
		let offset = if constant.is_some() { 0 } else { self.allocate_variable(&ty, false) };
		let scope = self.scopes.last_mut()?;
		scope.vars.push(Variable {
			name: name.to_string(),
			ty,
			offset,
			is_initialized: constant.is_some(),
			constant,
			holds_reference: false,
		});
		Some(offset)
	}

	pub(super) fn find_variable(&self, name: &str) -> Option<&Variable> {
		self.scopes.iter().rev().find_map(|scope| scope.vars.iter().rev().find(|v| v.name == name))
	}

	pub(super) fn mark_initialized(&mut self, offset: Var) {
		for scope in self.scopes.iter_mut().rev() {
			if let Some(var) = scope.vars.iter_mut().find(|v| v.offset == offset && v.constant.is_none()) {
				var.is_initialized = true;
				return;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{compiler::tests::with_compiler, types::{ObjectFlags, TypeRegistry}};

	#[test]
	fn released_temporaries_are_reused_by_size() {
		let mut registry = TypeRegistry::new();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			let float = DataType::create_primitive(TokenKind::Float, false);
			let double = DataType::create_primitive(TokenKind::Double, false);
			let mut bc = ByteCode::new();

			let a = c.allocate_temporary(&int, &[]);
			c.release_temporary_var(a, &mut bc);
			assert_eq!(c.allocate_temporary(&float, &[]), a);
			let d = c.allocate_temporary(&double, &[]);
			assert_ne!(d, a);
			assert_eq!(c.stack_size, 3);
			c.release_temporary_var(a, &mut bc);
			c.release_temporary_var(d, &mut bc);
			assert!(bc.is_empty());
			assert_eq!(c.stats.allocated, c.stats.released);
		});
	}

	#[test]
	fn reserved_slots_are_skipped() {
		let mut registry = TypeRegistry::new();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			let mut bc = ByteCode::new();
			let a = c.allocate_temporary(&int, &[]);
			c.release_temporary_var(a, &mut bc);
			let b = c.allocate_temporary(&int, &[a]);
			assert_ne!(a, b);
		});
	}

	#[test]
	fn object_slots_are_freed() {
		let mut registry = TypeRegistry::new();
		let id = registry.add_object_type("Obj", ObjectFlags::REF, 8).unwrap();
		let handle = DataType::create_object_handle(registry.type_ref(id), false).unwrap();
		with_compiler(&mut registry, |c| {
			let mut bc = ByteCode::new();
			let h = c.allocate_temporary(&handle, &[]);
			assert!(c.object_vars.contains(&h));
			c.release_temporary_var(h, &mut bc);
			assert_eq!(bc.instructions(), &[Instruction::Free(h)]);
		});
	}

	#[test]
	fn scopes_shadow_and_reject_redeclaration() {
		let mut registry = TypeRegistry::new();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			c.push_scope(false, false);
			let outer = c.declare_variable("x", int, None).unwrap();
			assert!(c.declare_variable("x", int, None).is_none());
			c.push_scope(false, false);
			let inner = c.declare_variable("x", int, None).unwrap();
			assert_eq!(c.find_variable("x").map(|v| v.offset), Some(inner));
			let mut bc = ByteCode::new();
			c.pop_scope(&mut bc);
			assert_eq!(c.find_variable("x").map(|v| v.offset), Some(outer));
		});
	}

	#[test]
	fn every_exit_frees_the_same_variables() {
		let mut registry = TypeRegistry::new();
		let id = registry.add_object_type("Obj", ObjectFlags::REF, 8).unwrap();
		let handle = DataType::create_object_handle(registry.type_ref(id), false).unwrap();
		with_compiler(&mut registry, |c| {
			let int = DataType::create_primitive(TokenKind::Int, false);
			c.push_scope(true, true);
			c.declare_variable("n", int, None).unwrap();
			c.declare_variable("k", int, Some(ConstValue::Int(3))).unwrap();
			let h = c.declare_variable("h", handle, None).unwrap();
			let out = c.allocate_variable(&int, false);
			if let Some(scope) = c.scopes.last_mut() {
				scope.vars.push(Variable {
					name:            "out".to_string(),
					ty:              int,
					offset:          out,
					is_initialized:  false,
					constant:        None,
					holds_reference: true,
				});
			}
			let expected = [Instruction::Free(out), Instruction::Free(h)];

			let mut on_return = ByteCode::new();
			c.free_all_scopes(&mut on_return);
			assert_eq!(on_return.instructions(), &expected);
			let mut on_break = ByteCode::new();
			c.free_scopes_until(&mut on_break, false);
			assert_eq!(on_break.instructions(), &expected);
			let mut on_exit = ByteCode::new();
			c.pop_scope(&mut on_exit);
			assert_eq!(on_exit.instructions(), &expected);
		});
	}
}
