//! What compiling an expression produces.
//!
//! Every expression node yields an [`ExprContext`]: the code computing it and
//! a [`TypeInfo`] telling where the result ends up. A result is in one of four
//! places:
//!
//! - a constant, no code at all
//! - a variable, named or temporary, read in place
//! - a reference on the stack, a `Ref` for primitives and handles or the
//!   object itself for non-handle objects
//! - a value on the stack
//!
//! A member access that resolves to `get_`/`set_` accessors leaves a
//! [`PendingAccessor`] instead, resolved once the use site is known.

use crate::{bytecode::{ByteCode, ConstValue, Var}, scanner::TokenKind, types::{DataType, FuncId}};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
	pub data_type:          DataType,
	pub is_constant:        bool,
	pub constant:           ConstValue,
	pub is_variable:        bool,
	pub is_temporary:       bool,
	pub stack_offset:       Var,
	/// Written with `@`, compared and assigned as a handle
	pub is_explicit_handle: bool,
}

impl Default for TypeInfo {
	fn default() -> Self { Self::value(DataType::default()) }
}

impl TypeInfo {
	/// A value or reference left on the stack.
	pub fn value(data_type: DataType) -> Self {
		Self {
			data_type,
			is_constant: false,
			constant: ConstValue::Int(0),
			is_variable: false,
			is_temporary: false,
			stack_offset: 0,
			is_explicit_handle: false,
		}
	}

	/// Constants are always read only.
	pub fn constant(mut data_type: DataType, value: ConstValue) -> Self {
		let _ = data_type.make_read_only(true);
		Self { is_constant: true, constant: value, ..Self::value(data_type) }
	}

	pub fn null() -> Self { Self::constant(DataType::create_null_handle(), ConstValue::Null) }

	pub fn variable(data_type: DataType, offset: Var, is_temporary: bool) -> Self {
		Self { is_variable: true, is_temporary, stack_offset: offset, ..Self::value(data_type) }
	}

	/// What a failed expression evaluates to, so compilation can go on.
	pub fn dummy() -> Self { Self::constant(DataType::create_primitive(TokenKind::Int, true), ConstValue::Int(0)) }

	pub fn is_void(&self) -> bool {
		self.data_type.token() == TokenKind::Void && self.data_type.object_type().is_none()
	}

	pub fn is_null_constant(&self) -> bool { self.is_constant && self.data_type.is_null_handle() }

	/// Whether the result sits on the stack rather than in a variable.
	pub fn is_on_stack(&self) -> bool { !self.is_constant && !self.is_variable && !self.is_void() }

	/// Primitives and handles come as a `Ref` when they are references on the
	/// stack, objects always come as themselves.
	pub fn is_ref_on_stack(&self) -> bool {
		self.is_on_stack() && self.data_type.is_reference() && !self.is_object_value()
	}

	/// A non-handle object, in whatever place.
	pub fn is_object_value(&self) -> bool { self.data_type.is_object() && !self.data_type.is_object_handle() }

	/// Can be written to.
	pub fn is_lvalue(&self) -> bool {
		if self.is_constant || self.is_temporary {
			return false;
		}
		if self.is_variable {
			return true;
		}
		self.data_type.is_reference() || self.is_object_value()
	}
}

/// An `&out` argument: the callee writes `temp`, which is assigned to
/// `target` once the call returned.
#[derive(Debug, Clone)]
pub struct DeferredParam {
	pub temp:   TypeInfo,
	pub target: Box<ExprContext>,
}

/// A property implemented by accessor functions. For methods the object is
/// already pushed by the context's code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingAccessor {
	pub get:       Option<FuncId>,
	pub set:       Option<FuncId>,
	pub is_method: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExprContext {
	pub bc:       ByteCode,
	pub ty:       TypeInfo,
	pub deferred: Vec<DeferredParam>,
	pub accessor: Option<PendingAccessor>,
}

impl ExprContext {
	pub fn new() -> Self { Self::default() }

	pub fn with_type(ty: TypeInfo) -> Self { Self { ty, ..Self::default() } }

	/// Stands in for an expression that failed to compile.
	pub fn dummy() -> Self { Self::with_type(TypeInfo::dummy()) }

	/// Takes over the other context's code and deferred writebacks, not its
	/// type.
	pub fn merge(&mut self, other: &mut ExprContext) {
		self.bc.append(&mut other.bc);
		self.deferred.append(&mut other.deferred);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn places_are_exclusive() {
		let int = DataType::create_primitive(TokenKind::Int, false);
		let constant = TypeInfo::constant(int, ConstValue::Int(3));
		assert!(constant.data_type.is_read_only());
		assert!(!constant.is_on_stack() && !constant.is_lvalue());

		let temp = TypeInfo::variable(int, 2, true);
		assert!(!temp.is_on_stack() && !temp.is_lvalue());

		let mut reference = int;
		reference.make_reference(true).unwrap();
		let on_stack = TypeInfo::value(reference);
		assert!(on_stack.is_ref_on_stack() && on_stack.is_lvalue());
		assert!(!TypeInfo::value(int).is_lvalue());
	}

	#[test]
	fn null_and_void() {
		assert!(TypeInfo::null().is_null_constant());
		assert!(TypeInfo::default().is_void());
		assert!(!TypeInfo::dummy().is_void());
	}
}
