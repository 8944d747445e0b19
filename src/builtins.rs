//! Types and functions every engine can offer scripts: the `string` value
//! type, the `array<T>` template and `print`.

use std::io::Write;

use crate::{error::{registry::{DataTypeError, RegistryError}, runtime::RuntimeError}, scanner::TokenKind, types::{DataType, FunctionDescriptor, ObjectFlags, ParamModifier, Parameter, TypeId, TypeRegistry}, utils::RcCell, vm::{Address, NativeCall, Object, ObjectData, Payload, Value, native}};

/// Where `print` writes its lines.
#[derive(Debug, Clone, Default)]
pub enum Output {
	#[default]
	Stdout,
	/// Collects the lines, for tests and embedding
	Capture(RcCell<String>),
}

impl Output {
	pub fn capture() -> Self { Self::Capture(RcCell::new(String::new())) }

	/// Everything captured so far.
	pub fn captured(&self) -> String {
		match self {
			Self::Stdout => String::new(),
			Self::Capture(buffer) => buffer.borrow().clone(),
		}
	}

	fn write_line(&self, line: &str) -> Result<(), RuntimeError> {
		match self {
			Self::Stdout => {
				let mut out = std::io::stdout().lock();
				writeln!(out, "{line}").map_err(|e| RuntimeError::Native(e.to_string()))
			}
			Self::Capture(buffer) => {
				let mut buffer = buffer.borrow_mut();
				buffer.push_str(line);
				buffer.push('\n');
				Ok(())
			}
		}
	}
}

fn primitive(token: TokenKind) -> DataType { DataType::create_primitive(token, false) }

/// `const T &in`
fn const_in(mut dt: DataType) -> Result<Parameter, DataTypeError> {
	dt.make_read_only(true)?;
	dt.make_reference(true)?;
	Ok(Parameter::new(dt, ParamModifier::In))
}

fn reference(mut dt: DataType, read_only: bool) -> Result<DataType, DataTypeError> {
	if read_only {
		dt.make_read_only(true)?;
	}
	dt.make_reference(true)?;
	Ok(dt)
}

fn this_text(call: &NativeCall<'_, '_>) -> Result<String, RuntimeError> {
	call.this()?.borrow().text().map(str::to_string).ok_or_else(|| RuntimeError::InvalidValue("not a string".into()))
}

fn text_object(ty: TypeId, text: String) -> Value {
	Value::Object(Some(RcCell::new(ObjectData::new(ty, Vec::new(), Payload::Text(text)))))
}

/// Registers the `string` value type and makes it the type of string
/// constants.
pub fn register_string(registry: &mut TypeRegistry) -> Result<TypeId, RegistryError> {
	let id = registry.add_object_type("string", ObjectFlags::VALUE, 8)?;
	let string = DataType::create_object(registry.type_ref(id), false);
	let mut const_string = string;
	const_string.make_read_only(true)?;

	let factory = FunctionDescriptor::new("$string", const_string, vec![Parameter::by_value(DataType::create_any(true))], None)
		.native(native(move |call| Ok(text_object(id, call.text(0)?))));
	let factory = registry.add_function(factory);
	registry.set_string_factory(factory);

	let construct = FunctionDescriptor::new("$construct", primitive(TokenKind::Void), Vec::new(), Some(id)).native(native(
		|call| {
			call.this()?.borrow_mut().payload = Payload::Text(String::new());
			Ok(Value::Void)
		},
	));
	let construct = registry.add_function(construct);
	registry.object_type_mut(id).beh.default_constructor = Some(construct);

	let assign = FunctionDescriptor::new("opAssign", reference(string, false)?, vec![const_in(string)?], Some(id))
		.native(native(|call| {
			let text = call.text(0)?;
			let this = call.this()?;
			this.borrow_mut().payload = Payload::Text(text);
			Ok(Value::Object(Some(this)))
		}));
	let assign = registry.add_method(id, assign);
	registry.object_type_mut(id).beh.copy = Some(assign);

	let add_assign = FunctionDescriptor::new("opAddAssign", reference(string, false)?, vec![const_in(string)?], Some(id))
		.native(native(|call| {
			let text = call.text(0)?;
			let this = call.this()?;
			if let Payload::Text(s) = &mut this.borrow_mut().payload {
				s.push_str(&text);
			}
			Ok(Value::Object(Some(this)))
		}));
	registry.add_method(id, add_assign);

	let add = FunctionDescriptor::new("opAdd", string, vec![const_in(string)?], Some(id))
		.read_only(true)
		.native(native(move |call| Ok(text_object(id, this_text(call)? + &call.text(0)?))));
	registry.add_method(id, add);

	let equals = FunctionDescriptor::new("opEquals", primitive(TokenKind::Bool), vec![const_in(string)?], Some(id))
		.read_only(true)
		.native(native(move |call| Ok(Value::Bool(this_text(call)? == call.text(0)?))));
	registry.add_method(id, equals);

	let cmp = FunctionDescriptor::new("opCmp", primitive(TokenKind::Int), vec![const_in(string)?], Some(id))
		.read_only(true)
		.native(native(move |call| Ok(Value::Int(this_text(call)?.cmp(&call.text(0)?) as i64))));
	registry.add_method(id, cmp);

	let length = FunctionDescriptor::new("length", primitive(TokenKind::UInt), Vec::new(), Some(id))
		.read_only(true)
		.native(native(move |call| Ok(Value::Int(this_text(call)?.chars().count() as i64))));
	registry.add_method(id, length);

	Ok(id)
}

/// Registers `print` overloads for strings and the primitive types.
pub fn register_print(registry: &mut TypeRegistry, output: &Output) -> Result<(), RegistryError> {
	let mut params = vec![
		Parameter::by_value(primitive(TokenKind::Bool)),
		Parameter::by_value(primitive(TokenKind::Int)),
		Parameter::by_value(primitive(TokenKind::Int64)),
		Parameter::by_value(primitive(TokenKind::UInt)),
		Parameter::by_value(primitive(TokenKind::UInt64)),
		Parameter::by_value(primitive(TokenKind::Double)),
	];
	if let Some(string) = registry.string_type() {
		params.push(const_in(string)?);
	}
	for param in params {
		let unsigned = param.ty.is_unsigned_type();
		let output = output.clone();
		let print = FunctionDescriptor::new("print", primitive(TokenKind::Void), vec![param], None).native(native(
			move |call| {
				let line = match call.arg(0)? {
					Value::Int(v) if unsigned => (v as u64).to_string(),
					other => other.to_string(),
				};
				output.write_line(&line)?;
				Ok(Value::Void)
			},
		));
		registry.add_global_function(print);
	}
	Ok(())
}

/// What a new element of an array holds.
fn new_element(call: &NativeCall<'_, '_>, element: DataType) -> Value {
	match element.type_id() {
		Some(ty) if element.is_object() && !element.is_object_handle() => Value::Object(Some(call.new_object(ty))),
		_ => Value::default_for(&element),
	}
}

/// Value objects are stored by value, the element gets its own copy.
fn stored_element(call: &NativeCall<'_, '_>, element: DataType, value: Value) -> Value {
	if element.is_object_handle() {
		return value;
	}
	let Value::Object(Some(obj)) = &value else {
		return value;
	};
	let src = obj.borrow();
	let payload = match &src.payload {
		Payload::Text(s) => Payload::Text(s.clone()),
		_ => Payload::None,
	};
	let copy = call.new_object(src.type_id);
	{
		let mut dst = copy.borrow_mut();
		dst.fields = src.fields.clone();
		dst.payload = payload;
	}
	Value::Object(Some(copy))
}

fn new_array(call: &NativeCall<'_, '_>, id: TypeId, element: DataType, len: usize) -> Value {
	let items = (0..len).map(|_| new_element(call, element)).collect();
	Value::Object(Some(RcCell::new(ObjectData::new(id, Vec::new(), Payload::Array(items)))))
}

fn with_items<R>(obj: &Object, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, RuntimeError> {
	match &mut obj.borrow_mut().payload {
		Payload::Array(items) => Ok(f(items)),
		_ => Err(RuntimeError::InvalidValue("not an array".into())),
	}
}

fn index(call: &NativeCall<'_, '_>, element: DataType) -> Result<Value, RuntimeError> {
	let this = call.this()?;
	let i = usize::try_from(call.int(0)?).map_err(|_| RuntimeError::IndexOutOfBounds)?;
	let item = with_items(&this, |items| items.get(i).cloned())?.ok_or(RuntimeError::IndexOutOfBounds)?;
	if element.is_object() && !element.is_object_handle() {
		return Ok(item);
	}
	Ok(Value::Ref(Address::Element(this, i)))
}

/// Gives a fresh `array<element>` instance its factories and methods.
pub(crate) fn register_array_instance(registry: &mut TypeRegistry, id: TypeId, element: DataType) -> Result<(), DataTypeError> {
	let handle = DataType::create_object_handle(registry.type_ref(id), false)?;
	let uint = primitive(TokenKind::UInt);

	let default_factory = FunctionDescriptor::new("array", handle, Vec::new(), None)
		.native(native(move |call| Ok(new_array(call, id, element, 0))));
	let default_factory = registry.add_function(default_factory);

	let sized_factory = FunctionDescriptor::new("array", handle, vec![Parameter::by_value(uint)], None).native(native(
		move |call| {
			let len = usize::try_from(call.int(0)?).map_err(|_| RuntimeError::IndexOutOfBounds)?;
			Ok(new_array(call, id, element, len))
		},
	));
	let sized_factory = registry.add_function(sized_factory);

	let beh = &mut registry.object_type_mut(id).beh;
	beh.default_factory = Some(default_factory);
	beh.factories = vec![default_factory, sized_factory];

	let op_index = FunctionDescriptor::new("opIndex", reference(element, false)?, vec![Parameter::by_value(uint)], Some(id))
		.native(native(move |call| index(call, element)));
	registry.add_method(id, op_index);

	let const_index = FunctionDescriptor::new("opIndex", reference(element, true)?, vec![Parameter::by_value(uint)], Some(id))
		.read_only(true)
		.native(native(move |call| index(call, element)));
	registry.add_method(id, const_index);

	let length = FunctionDescriptor::new("length", uint, Vec::new(), Some(id))
		.read_only(true)
		.native(native(|call| Ok(Value::Int(with_items(&call.this()?, |items| items.len())? as i64))));
	registry.add_method(id, length);

	let resize = FunctionDescriptor::new("resize", primitive(TokenKind::Void), vec![Parameter::by_value(uint)], Some(id))
		.native(native(move |call| {
			let len = usize::try_from(call.int(0)?).map_err(|_| RuntimeError::IndexOutOfBounds)?;
			let this = call.this()?;
			let current = with_items(&this, |items| items.len())?;
			let extra: Vec<_> = (current..len).map(|_| new_element(call, element)).collect();
			with_items(&this, |items| {
				items.truncate(len);
				items.extend(extra);
			})?;
			Ok(Value::Void)
		}));
	registry.add_method(id, resize);

	let mut value_in = element;
	value_in.make_read_only(true)?;
	let insert_last = FunctionDescriptor::new("insertLast", primitive(TokenKind::Void), vec![const_in(value_in)?], Some(id))
		.native(native(move |call| {
			let item = stored_element(call, element, call.arg(0)?);
			with_items(&call.this()?, |items| items.push(item))?;
			Ok(Value::Void)
		}));
	registry.add_method(id, insert_last);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_is_the_constant_type() {
		let mut registry = TypeRegistry::new();
		let id = register_string(&mut registry).unwrap();
		let dt = registry.string_type().unwrap();
		assert_eq!(dt.type_id(), Some(id));
		assert!(dt.is_read_only());
		assert!(DataType::create_object(registry.type_ref(id), false).can_be_copied(&registry));
		assert_eq!(registry.methods(id, "opEquals").len(), 1);
	}

	#[test]
	fn print_has_an_overload_per_type() {
		let mut registry = TypeRegistry::new();
		register_string(&mut registry).unwrap();
		register_print(&mut registry, &Output::capture()).unwrap();
		assert_eq!(registry.global_functions("print").len(), 7);
	}

	#[test]
	fn arrays_get_const_and_mutable_index_operators() {
		let mut registry = TypeRegistry::new();
		let array = DataType::create_primitive(TokenKind::Int, false).make_array(&mut registry).unwrap();
		let id = array.type_id().unwrap();
		let index = registry.methods(id, "opIndex");
		assert_eq!(index.len(), 2);
		assert!(index.iter().any(|&f| registry.function(f).is_read_only));
		assert_eq!(registry.object_type(id).beh.factories.len(), 2);
	}
}
