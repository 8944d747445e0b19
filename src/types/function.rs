use std::{fmt::Debug, rc::Rc};

use super::{DataType, TypeId, TypeRegistry};
use crate::{bytecode::ScriptFunction, vm::NativeFn};

/// Index of a function in the [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub usize);

/// How an argument is bound to a reference parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamModifier {
	/// By value
	#[default]
	None,
	/// `&in`, the callee reads a copy
	In,
	/// `&out`, the callee writes a value copied back after the call
	Out,
	/// `&inout`, the callee works on the caller's value
	InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
	pub ty:       DataType,
	pub modifier: ParamModifier,
}

impl Parameter {
	pub fn new(ty: DataType, modifier: ParamModifier) -> Self { Self { ty, modifier } }

	pub fn by_value(ty: DataType) -> Self { Self { ty, modifier: ParamModifier::None } }
}

pub enum FunctionKind {
	/// Compiled from script, the bytecode is attached once the body compiled
	Script(Option<Rc<ScriptFunction>>),
	Native(NativeFn),
}

impl Debug for FunctionKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Script(code) => f.debug_tuple("Script").field(&code.is_some()).finish(),
			Self::Native(_) => f.debug_tuple("Native").field(&"Function Pointer").finish(),
		}
	}
}

#[derive(Debug)]
pub struct FunctionDescriptor {
	pub id:           FuncId,
	pub name:         String,
	pub return_type:  DataType,
	pub params:       Vec<Parameter>,
	/// The type a method belongs to
	pub object_type:  Option<TypeId>,
	/// A `const` method, callable on read only objects
	pub is_read_only: bool,
	pub kind:         FunctionKind,
}

impl FunctionDescriptor {
	pub fn new(name: &str, return_type: DataType, params: Vec<Parameter>, object_type: Option<TypeId>) -> Self {
		Self {
			id: FuncId(usize::MAX),
			name: name.to_string(),
			return_type,
			params,
			object_type,
			is_read_only: false,
			kind: FunctionKind::Script(None),
		}
	}

	pub fn native(mut self, f: NativeFn) -> Self {
		self.kind = FunctionKind::Native(f);
		self
	}

	pub fn read_only(mut self, is_read_only: bool) -> Self {
		self.is_read_only = is_read_only;
		self
	}

	pub fn is_native(&self) -> bool { matches!(self.kind, FunctionKind::Native(_)) }

	/// Stack space taken by the arguments, `this` included.
	pub fn args_size_dwords(&self) -> usize {
		let this = if self.object_type.is_some() { super::PTR_SIZE } else { 0 };
		this + self.params.iter().map(|p| p.ty.size_on_stack_dwords()).sum::<usize>()
	}

	/// The declaration text, e.g. `int Obj::get_prop() const`.
	pub fn declaration(&self, registry: &TypeRegistry) -> String {
		let params = self
			.params
			.iter()
			.map(|p| {
				let mut s = p.ty.format(registry);
				match p.modifier {
					ParamModifier::In => s.push_str("in"),
					ParamModifier::Out => s.push_str("out"),
					ParamModifier::InOut => s.push_str("inout"),
					ParamModifier::None => {}
				}
				s
			})
			.collect::<Vec<_>>()
			.join(", ");
		let owner = match self.object_type {
			Some(id) => format!("{}::", registry.type_name(id)),
			None => String::new(),
		};
		let constness = if self.is_read_only { " const" } else { "" };
		format!("{} {owner}{}({params}){constness}", self.return_type.format(registry), self.name)
	}
}
