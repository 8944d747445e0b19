use std::collections::HashMap;

use super::{DataType, FuncId, FunctionDescriptor, ObjectFlags, ObjectType, ObjectTypeRef, TypeId};
use crate::{builtins, bytecode::ConstValue, error::registry::{DataTypeError, RegistryError}, statement::{TypeDecl, TypeSuffix}};

/// Index of a global variable, also its slot in the engine's global storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);

#[derive(Debug, Clone)]
pub struct GlobalProperty {
	pub name:     String,
	pub ty:       DataType,
	/// Set for `const` globals with a constant initializer, they get no storage
	/// reads, the value is folded into the code using them.
	pub constant: Option<ConstValue>,
	/// Registered by the host rather than declared by a script module
	pub is_host:  bool,
}

/// Arena of everything a script can refer to: object types, enums, array
/// instances, functions and global variables. Everything is addressed by
/// index and nothing is ever removed.
#[derive(Debug, Default)]
pub struct TypeRegistry {
	types:            Vec<ObjectType>,
	functions:        Vec<FunctionDescriptor>,
	globals:          Vec<GlobalProperty>,
	global_functions: Vec<FuncId>,
	arrays:           HashMap<DataType, TypeId>,
	string_factory:   Option<FuncId>,
}

impl TypeRegistry {
	pub fn new() -> Self { Self::default() }

	pub fn add_object_type(&mut self, name: &str, flags: ObjectFlags, size: usize) -> Result<TypeId, RegistryError> {
		if self.find_type(name).is_some() {
			return Err(RegistryError::AlreadyRegistered(name.to_string()));
		}
		let id = TypeId(self.types.len());
		self.types.push(ObjectType::new(name, flags, size));
		Ok(id)
	}

	pub fn type_ref(&self, id: TypeId) -> ObjectTypeRef {
		let ot = &self.types[id.0];
		ObjectTypeRef { id, flags: ot.flags, size: ot.size }
	}

	pub fn object_type(&self, id: TypeId) -> &ObjectType { &self.types[id.0] }

	pub fn object_type_mut(&mut self, id: TypeId) -> &mut ObjectType { &mut self.types[id.0] }

	/// Looks up a named type. Template instances are only reachable through
	/// [`DataType::make_array`].
	pub fn find_type(&self, name: &str) -> Option<TypeId> {
		self.types
			.iter()
			.position(|ot| ot.name == name && !ot.flags.contains(ObjectFlags::TEMPLATE))
			.map(TypeId)
	}

	/// The data type a declaration names. `const` applies to the base type,
	/// so `const Obj@` is a handle to a const object.
	pub fn resolve(&mut self, decl: &TypeDecl<'_>) -> Result<DataType, RegistryError> {
		let mut dt = if decl.base.kind.is_primitive_type() {
			DataType::create_primitive(decl.base.kind, decl.is_const)
		} else {
			let id = self.find_type(decl.base.lexeme).ok_or_else(|| RegistryError::UnknownType(decl.base.lexeme.to_string()))?;
			DataType::create_object(self.type_ref(id), decl.is_const)
		};
		for suffix in &decl.suffixes {
			match suffix {
				TypeSuffix::Handle { is_const } => {
					dt.make_handle(true, false)?;
					dt.make_read_only(*is_const)?;
				}
				TypeSuffix::Array => dt = dt.make_array(self)?,
			}
		}
		Ok(dt)
	}

	pub fn type_name(&self, id: TypeId) -> String {
		let ot = &self.types[id.0];
		match ot.sub_type {
			Some(element) if ot.flags.contains(ObjectFlags::TEMPLATE) => format!("{}[]", element.format(self)),
			_ => ot.name.clone(),
		}
	}

	/// The `array<T>` instance for `element`, registered with its factory and
	/// methods the first time it is asked for.
	pub fn array_type_of(&mut self, element: DataType) -> Result<ObjectTypeRef, DataTypeError> {
		if let Some(&id) = self.arrays.get(&element) {
			return Ok(self.type_ref(id));
		}
		let id = TypeId(self.types.len());
		let mut ot = ObjectType::new("array", ObjectFlags::REF | ObjectFlags::TEMPLATE, 8);
		ot.sub_type = Some(element);
		self.types.push(ot);
		self.arrays.insert(element, id);
		builtins::register_array_instance(self, id, element)?;
		Ok(self.type_ref(id))
	}

	pub fn add_function(&mut self, mut desc: FunctionDescriptor) -> FuncId {
		let id = FuncId(self.functions.len());
		desc.id = id;
		self.functions.push(desc);
		id
	}

	pub fn function(&self, id: FuncId) -> &FunctionDescriptor { &self.functions[id.0] }

	pub fn function_mut(&mut self, id: FuncId) -> &mut FunctionDescriptor { &mut self.functions[id.0] }

	pub fn add_global_function(&mut self, desc: FunctionDescriptor) -> FuncId {
		let id = self.add_function(desc);
		self.global_functions.push(id);
		id
	}

	pub fn global_functions(&self, name: &str) -> Vec<FuncId> {
		self.global_functions.iter().copied().filter(|&f| self.function(f).name == name).collect()
	}

	pub fn methods(&self, ty: TypeId, name: &str) -> Vec<FuncId> {
		self.types[ty.0].methods.iter().copied().filter(|&f| self.function(f).name == name).collect()
	}

	pub fn add_method(&mut self, ty: TypeId, desc: FunctionDescriptor) -> FuncId {
		let id = self.add_function(desc);
		self.types[ty.0].methods.push(id);
		id
	}

	pub fn add_global(&mut self, global: GlobalProperty) -> GlobalId {
		self.globals.push(global);
		GlobalId(self.globals.len() - 1)
	}

	pub fn global(&self, id: GlobalId) -> &GlobalProperty { &self.globals[id.0] }

	pub fn global_count(&self) -> usize { self.globals.len() }

	/// Host registered globals by name. Script globals are module scoped.
	pub fn find_global(&self, name: &str) -> Option<GlobalId> {
		self.globals.iter().position(|g| g.is_host && g.name == name).map(GlobalId)
	}

	pub fn add_enum(&mut self, name: &str) -> Result<TypeId, RegistryError> {
		self.add_object_type(name, ObjectFlags::ENUM, 4)
	}

	pub fn add_enum_value(&mut self, ty: TypeId, name: &str, value: i64) -> Result<(), RegistryError> {
		let ot = &mut self.types[ty.0];
		if !ot.flags.contains(ObjectFlags::ENUM) {
			return Err(RegistryError::NotAnEnum(ot.name.clone()));
		}
		if ot.enum_value(name).is_some() {
			return Err(RegistryError::AlreadyRegistered(format!("{}::{name}", ot.name)));
		}
		ot.enum_values.push((name.to_string(), value));
		Ok(())
	}

	/// Enum values can be used unqualified or as `Enum::Value`.
	pub fn find_enum_value(&self, name: &str, scope: Option<&str>) -> Option<(TypeId, i64)> {
		self.types.iter().enumerate().find_map(|(i, ot)| {
			if !ot.flags.contains(ObjectFlags::ENUM) || scope.is_some_and(|s| s != ot.name) {
				return None;
			}
			ot.enum_value(name).map(|v| (TypeId(i), v))
		})
	}

	pub fn set_string_factory(&mut self, id: FuncId) { self.string_factory = Some(id) }

	pub fn string_factory(&self) -> Option<FuncId> { self.string_factory }

	/// The type string constants have, the factory's return type without the
	/// handle.
	pub fn string_type(&self) -> Option<DataType> {
		self.string_factory.and_then(|f| {
			let ret = self.function(f).return_type;
			ret.object_type().map(|ot| DataType::create_object(ot, true))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scanner::TokenKind;

	#[test]
	fn duplicate_types_are_rejected() {
		let mut registry = TypeRegistry::new();
		registry.add_object_type("Obj", ObjectFlags::REF, 8).unwrap();
		assert!(matches!(
			registry.add_object_type("Obj", ObjectFlags::VALUE, 8),
			Err(RegistryError::AlreadyRegistered(_))
		));
	}

	#[test]
	fn enum_values_resolve_with_and_without_scope() {
		let mut registry = TypeRegistry::new();
		let color = registry.add_enum("Color").unwrap();
		registry.add_enum_value(color, "Red", 0).unwrap();
		registry.add_enum_value(color, "Green", 5).unwrap();
		assert!(registry.add_enum_value(color, "Red", 1).is_err());
		assert_eq!(registry.find_enum_value("Green", None), Some((color, 5)));
		assert_eq!(registry.find_enum_value("Green", Some("Color")), Some((color, 5)));
		assert_eq!(registry.find_enum_value("Green", Some("Other")), None);
	}

	#[test]
	fn declarations_resolve_to_data_types() {
		use crate::{parser::Parser, scanner::Scanner};

		let mut registry = TypeRegistry::new();
		registry.add_object_type("Obj", ObjectFlags::REF, 8).unwrap();
		let mut resolve = |text: &str| {
			let mut parser = Parser::new(Scanner::new(text).scan_tokens());
			let decl = parser.type_decl().unwrap();
			registry.resolve(&decl).map(|dt| dt.format(&registry))
		};
		assert_eq!(resolve("const int").unwrap(), "const int");
		assert_eq!(resolve("const Obj@").unwrap(), "const Obj@");
		assert_eq!(resolve("Obj@ const").unwrap(), "Obj@ const");
		assert_eq!(resolve("int[]").unwrap(), "int[]");
		assert!(matches!(resolve("Nope"), Err(RegistryError::UnknownType(_))));
		assert!(matches!(resolve("int@"), Err(RegistryError::DataType(DataTypeError::HandleNotAllowed))));
	}

	#[test]
	fn array_instances_are_shared_per_element() {
		let mut registry = TypeRegistry::new();
		let int = DataType::create_primitive(TokenKind::Int, false);
		let float = DataType::create_primitive(TokenKind::Float, false);
		let a = registry.array_type_of(int).unwrap();
		assert_eq!(a, registry.array_type_of(int).unwrap());
		assert_ne!(a, registry.array_type_of(float).unwrap());
		assert!(registry.find_type("array").is_none());
		assert!(!registry.object_type(a.id).beh.factories.is_empty());
		assert!(!registry.methods(a.id, "opIndex").is_empty());
	}
}
