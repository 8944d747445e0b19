use std::rc::Rc;

use super::{Memory, Vm, value::{Object, Value}};
use crate::{error::runtime::RuntimeError, types::{TypeId, TypeRegistry}};

/// A host function callable from scripts.
pub type NativeFn = Rc<dyn Fn(&mut NativeCall<'_, '_>) -> Result<Value, RuntimeError>>;

/// Wraps a closure as a [`NativeFn`].
pub fn native<F>(f: F) -> NativeFn
where
	F: Fn(&mut NativeCall<'_, '_>) -> Result<Value, RuntimeError> + 'static,
{
	Rc::new(f)
}

/// The arguments of a native call, with access to the memory references
/// point into.
pub struct NativeCall<'m, 'g> {
	this:     Option<Value>,
	args:     Vec<Value>,
	memory:   &'m mut Memory<'g>,
	registry: &'m TypeRegistry,
}

impl<'m, 'g> NativeCall<'m, 'g> {
	pub(super) fn new(
		this: Option<Value>,
		args: Vec<Value>,
		memory: &'m mut Memory<'g>,
		registry: &'m TypeRegistry,
	) -> Self {
		Self { this, args, memory, registry }
	}

	pub fn registry(&self) -> &TypeRegistry { self.registry }

	/// A default initialized instance of a registered type.
	pub fn new_object(&self, ty: TypeId) -> Object { Vm::new_object(self.registry, ty) }

	/// The object a method was called on.
	pub fn this(&self) -> Result<Object, RuntimeError> {
		self.this.as_ref().ok_or(RuntimeError::NullPointerAccess)?.object()
	}

	pub fn len(&self) -> usize { self.args.len() }

	pub fn is_empty(&self) -> bool { self.args.is_empty() }

	/// The argument as passed, references are not followed.
	pub fn raw(&self, i: usize) -> Result<&Value, RuntimeError> {
		self.args.get(i).ok_or(RuntimeError::ArgumentCount { expected: i + 1, found: self.args.len() })
	}

	/// The argument's value, following a reference.
	pub fn arg(&self, i: usize) -> Result<Value, RuntimeError> {
		match self.raw(i)? {
			Value::Ref(address) => self.memory.read(address),
			other => Ok(other.clone()),
		}
	}

	pub fn int(&self, i: usize) -> Result<i64, RuntimeError> {
		let v = self.arg(i)?;
		v.as_int().ok_or_else(|| RuntimeError::InvalidValue(format!("argument {i} is not an integer: {v:?}")))
	}

	pub fn double(&self, i: usize) -> Result<f64, RuntimeError> {
		let v = self.arg(i)?;
		v.as_double().ok_or_else(|| RuntimeError::InvalidValue(format!("argument {i} is not a real: {v:?}")))
	}

	pub fn bool(&self, i: usize) -> Result<bool, RuntimeError> {
		let v = self.arg(i)?;
		v.as_bool().ok_or_else(|| RuntimeError::InvalidValue(format!("argument {i} is not a bool: {v:?}")))
	}

	pub fn object(&self, i: usize) -> Result<Object, RuntimeError> { self.arg(i)?.object() }

	/// The text of a string object or literal argument.
	pub fn text(&self, i: usize) -> Result<String, RuntimeError> {
		match self.arg(i)? {
			Value::Str(s) => Ok(s.to_string()),
			Value::Object(Some(obj)) => {
				obj.borrow().text().map(str::to_string).ok_or_else(|| RuntimeError::InvalidValue("not a string".into()))
			}
			Value::Object(None) => Err(RuntimeError::NullPointerAccess),
			other => Err(RuntimeError::InvalidValue(format!("argument {i} is not a string: {other:?}"))),
		}
	}

	/// Stores a value through a reference argument, the way `&out` and
	/// `&inout` parameters hand results back.
	pub fn write(&mut self, i: usize, value: Value) -> Result<(), RuntimeError> {
		match self.raw(i)?.clone() {
			Value::Ref(address) => self.memory.write(&address, value),
			other => Err(RuntimeError::InvalidValue(format!("argument {i} is not a reference: {other:?}"))),
		}
	}
}
