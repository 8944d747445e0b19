//! The compiler's view of a value's type.
//!
//! A [`DataType`] is a small `Copy` descriptor: a base kind (one of the
//! primitive keyword tokens, [`TokenKind::Identifier`] for registered object
//! types and enums, [`TokenKind::Question`] for the "any" placeholder of
//! generic parameters, or [`TokenKind::Unrecognized`] for the null handle),
//! an optional object type and four flags. The object type is an index into
//! the [`TypeRegistry`] arena, a `DataType` never keeps a type alive.
//!
//! Constness is tracked in two places. `is_read_only` is the constness of the
//! value itself, or of the pointee when the type is a handle (a handle to
//! const). `is_const_handle` is the constness of the handle variable.
mod function;
mod object;
mod registry;

pub use function::*;
pub use object::*;
pub use registry::*;

use crate::{error::registry::DataTypeError, scanner::TokenKind};

/// Pointer size in dwords.
pub const PTR_SIZE: usize = 2;
/// Size of a `bool` in bytes.
pub const SIZEOF_BOOL: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
	token:            TokenKind,
	object_type:      Option<ObjectTypeRef>,
	is_reference:     bool,
	is_read_only:     bool,
	is_object_handle: bool,
	is_const_handle:  bool,
}

impl Default for DataType {
	fn default() -> Self { Self::create_primitive(TokenKind::Void, false) }
}

impl DataType {
	pub fn create_primitive(token: TokenKind, is_const: bool) -> Self {
		Self {
			token,
			object_type: None,
			is_reference: false,
			is_read_only: is_const,
			is_object_handle: false,
			is_const_handle: false,
		}
	}

	pub fn create_object(object_type: ObjectTypeRef, is_const: bool) -> Self {
		Self {
			token:            TokenKind::Identifier,
			object_type:      Some(object_type),
			is_reference:     false,
			is_read_only:     is_const,
			is_object_handle: false,
			is_const_handle:  false,
		}
	}

	pub fn create_object_handle(object_type: ObjectTypeRef, is_const: bool) -> Result<Self, DataTypeError> {
		let mut dt = Self::create_object(object_type, is_const);
		dt.make_handle(true, false)?;
		Ok(dt)
	}

	/// The type of the `null` constant, implicitly convertible to any handle.
	pub fn create_null_handle() -> Self {
		Self {
			token:            TokenKind::Unrecognized,
			object_type:      None,
			is_reference:     false,
			is_read_only:     true,
			is_object_handle: true,
			is_const_handle:  false,
		}
	}

	/// The placeholder type of generic parameters declared as `?`.
	pub fn create_any(is_const: bool) -> Self { Self::create_primitive(TokenKind::Question, is_const) }

	pub fn token(&self) -> TokenKind { self.token }

	pub fn object_type(&self) -> Option<ObjectTypeRef> { self.object_type }

	pub fn type_id(&self) -> Option<TypeId> { self.object_type.map(|ot| ot.id) }

	/// Replace the base kind and object type, keeping the flags.
	pub fn set_base(&mut self, token: TokenKind, object_type: Option<ObjectTypeRef>) {
		self.token = token;
		self.object_type = object_type;
	}

	/// Take the base kind and object type of `other`, keeping the flags.
	pub fn set_base_from(&mut self, other: &DataType) { self.set_base(other.token, other.object_type) }

	/// Only reference types that allow handles can become handles. Scoped
	/// reference types are rejected unless `accept_scoped` is set, which is
	/// how registered factories are allowed to return them.
	pub fn make_handle(&mut self, b: bool, accept_scoped: bool) -> Result<(), DataTypeError> {
		if !b {
			self.is_object_handle = false;
			self.is_const_handle = false;
			return Ok(());
		}
		if self.is_object_handle {
			return Ok(());
		}
		let Some(ot) = self.object_type else {
			return Err(DataTypeError::HandleNotAllowed);
		};
		if !ot.flags.contains(ObjectFlags::REF)
			|| ot.flags.contains(ObjectFlags::NOHANDLE)
			|| (ot.flags.contains(ObjectFlags::SCOPED) && !accept_scoped)
		{
			return Err(DataTypeError::HandleNotAllowed);
		}
		self.is_object_handle = true;
		self.is_const_handle = false;
		Ok(())
	}

	pub fn make_reference(&mut self, b: bool) -> Result<(), DataTypeError> {
		self.is_reference = b;
		Ok(())
	}

	/// For a handle this sets the constness of the handle itself.
	pub fn make_read_only(&mut self, b: bool) -> Result<(), DataTypeError> {
		if self.is_object_handle {
			self.is_const_handle = b;
		} else {
			self.is_read_only = b;
		}
		Ok(())
	}

	pub fn make_handle_to_const(&mut self, b: bool) -> Result<(), DataTypeError> {
		if !self.is_object_handle {
			return Err(DataTypeError::NotAHandle);
		}
		self.is_read_only = b;
		Ok(())
	}

	/// Returns the `array<T>` type with this type as element, creating the
	/// template instance on first use.
	pub fn make_array(&self, registry: &mut TypeRegistry) -> Result<DataType, DataTypeError> {
		if self.token == TokenKind::Void || self.token == TokenKind::Question || self.is_reference {
			return Err(DataTypeError::InvalidArrayElement);
		}
		let mut element = *self;
		element.is_const_handle = false;
		let is_const = !self.is_object_handle && self.is_read_only;
		element.is_read_only = if self.is_object_handle { self.is_read_only } else { false };
		let array = registry.array_type_of(element)?;
		let mut dt = DataType::create_object(array, is_const);
		dt.is_read_only = is_const;
		Ok(dt)
	}

	pub fn is_reference(&self) -> bool { self.is_reference }

	pub fn is_object_handle(&self) -> bool { self.is_object_handle }

	pub fn is_read_only(&self) -> bool {
		if self.is_object_handle { self.is_const_handle } else { self.is_read_only }
	}

	pub fn is_handle_to_const(&self) -> bool { self.is_object_handle && self.is_read_only }

	pub fn is_null_handle(&self) -> bool { self.token == TokenKind::Unrecognized && self.is_object_handle }

	/// Enumerations are primitives even though they have an object type.
	pub fn is_primitive(&self) -> bool {
		if self.is_enum_type() {
			return true;
		}
		self.object_type.is_none() && self.token != TokenKind::Unrecognized
	}

	pub fn is_object(&self) -> bool { self.object_type.is_some() && !self.is_enum_type() }

	pub fn is_integer_type(&self) -> bool {
		matches!(self.token, TokenKind::Int8 | TokenKind::Int16 | TokenKind::Int | TokenKind::Int64)
	}

	pub fn is_unsigned_type(&self) -> bool {
		matches!(self.token, TokenKind::UInt8 | TokenKind::UInt16 | TokenKind::UInt | TokenKind::UInt64)
	}

	pub fn is_float_type(&self) -> bool { self.token == TokenKind::Float }

	pub fn is_double_type(&self) -> bool { self.token == TokenKind::Double }

	pub fn is_boolean_type(&self) -> bool { self.token == TokenKind::Bool }

	pub fn is_enum_type(&self) -> bool { self.has_flag(ObjectFlags::ENUM) }

	pub fn is_array_type(&self) -> bool { self.has_flag(ObjectFlags::TEMPLATE) }

	pub fn is_template(&self) -> bool { self.has_flag(ObjectFlags::TEMPLATE) }

	pub fn is_script_object(&self) -> bool { self.has_flag(ObjectFlags::SCRIPT_OBJECT) }

	pub fn is_any(&self) -> bool { self.token == TokenKind::Question }

	/// Integer and arithmetic types, the ones the math operators accept.
	pub fn is_numeric(&self) -> bool {
		self.is_integer_type() || self.is_unsigned_type() || self.is_float_type() || self.is_double_type()
	}

	fn has_flag(&self, flag: ObjectFlags) -> bool { self.object_type.is_some_and(|ot| ot.flags.contains(flag)) }

	pub fn supports_handles(&self) -> bool {
		self.object_type.is_some_and(|ot| {
			ot.flags.contains(ObjectFlags::REF)
				&& !ot.flags.contains(ObjectFlags::NOHANDLE)
				&& !ot.flags.contains(ObjectFlags::SCOPED)
		}) && !self.is_object_handle
	}

	pub fn can_be_instantiated(&self, registry: &TypeRegistry) -> bool {
		if self.size_on_stack_dwords() == 0 {
			return false;
		}
		if let Some(ot) = self.object_type
			&& self.is_object()
			&& ot.flags.contains(ObjectFlags::REF)
			&& (ot.flags.contains(ObjectFlags::NOHANDLE)
				|| (!self.is_object_handle && registry.object_type(ot.id).beh.factories.is_empty()))
		{
			return false;
		}
		true
	}

	pub fn can_be_copied(&self, registry: &TypeRegistry) -> bool {
		if self.is_primitive() {
			return true;
		}
		let Some(ot) = self.object_type else {
			return false;
		};
		if ot.flags.contains(ObjectFlags::POD) {
			return true;
		}
		if !self.can_be_instantiated(registry) {
			return false;
		}
		let beh = &registry.object_type(ot.id).beh;
		if beh.default_constructor.is_none() && beh.default_factory.is_none() {
			return false;
		}
		beh.copy.is_some()
	}

	/// Integers of either sign share a base, as do `float` and `double`.
	pub fn is_same_primitive_base_type(&self, other: &DataType) -> bool {
		if !self.is_primitive() || !other.is_primitive() {
			return false;
		}
		let integral = |dt: &DataType| dt.is_integer_type() || dt.is_unsigned_type();
		let real = |dt: &DataType| dt.is_float_type() || dt.is_double_type();
		(integral(self) && integral(other))
			|| (real(self) && real(other))
			|| (self.is_boolean_type() && other.is_boolean_type())
			|| (self.is_enum_type() && other.is_enum_type() && self.object_type == other.object_type)
	}

	pub fn is_equal_except_ref(&self, other: &DataType) -> bool {
		self.token == other.token
			&& self.object_type == other.object_type
			&& self.is_object_handle == other.is_object_handle
			&& self.is_read_only == other.is_read_only
			&& self.is_const_handle == other.is_const_handle
	}

	/// The constness of the pointee is still compared for handles.
	pub fn is_equal_except_ref_and_const(&self, other: &DataType) -> bool {
		if self.token != other.token || self.object_type != other.object_type {
			return false;
		}
		if self.is_object_handle != other.is_object_handle {
			return false;
		}
		!self.is_object_handle || self.is_read_only == other.is_read_only
	}

	pub fn is_equal_except_const(&self, other: &DataType) -> bool {
		self.is_equal_except_ref_and_const(other) && self.is_reference == other.is_reference
	}

	pub fn size_in_memory_bytes(&self) -> usize {
		if let Some(ot) = self.object_type {
			return ot.size;
		}
		match self.token {
			TokenKind::Void => 0,
			TokenKind::Int8 | TokenKind::UInt8 => 1,
			TokenKind::Int16 | TokenKind::UInt16 => 2,
			TokenKind::Double | TokenKind::Int64 | TokenKind::UInt64 => 8,
			TokenKind::Bool => SIZEOF_BOOL,
			TokenKind::Unrecognized => 4 * PTR_SIZE,
			_ => 4,
		}
	}

	pub fn size_in_memory_dwords(&self) -> usize {
		match self.size_in_memory_bytes() {
			0 => 0,
			1..=4 => 1,
			s => s / 4,
		}
	}

	/// Objects and references always take a pointer on the stack. The `?`
	/// placeholder takes one more dword for the type id.
	pub fn size_on_stack_dwords(&self) -> usize {
		let extra = usize::from(self.token == TokenKind::Question);
		if self.is_reference || self.object_type.is_some_and(|_| !self.is_enum_type()) {
			return PTR_SIZE + extra;
		}
		self.size_in_memory_dwords() + extra
	}

	/// The declaration text of the type, e.g. `const Obj@&`.
	pub fn format(&self, registry: &TypeRegistry) -> String {
		let mut s = String::new();
		if self.is_read_only && !self.is_object_handle || self.is_handle_to_const() {
			s.push_str("const ");
		}
		match (self.token, self.object_type) {
			(TokenKind::Unrecognized, _) => s.push_str("<null handle>"),
			(_, Some(ot)) => s.push_str(&registry.type_name(ot.id)),
			(token, None) => s.push_str(token.text()),
		}
		if self.is_object_handle && !self.is_null_handle() {
			s.push('@');
			if self.is_const_handle {
				s.push_str(" const");
			}
		}
		if self.is_reference {
			s.push('&');
		}
		s
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn registry_with(flags: ObjectFlags) -> (TypeRegistry, ObjectTypeRef) {
		let mut registry = TypeRegistry::new();
		let id = registry.add_object_type("Obj", flags, 8).unwrap();
		let ot = registry.type_ref(id);
		(registry, ot)
	}

	#[test]
	fn handle_constness_is_part_of_identity() {
		let (_, ot) = registry_with(ObjectFlags::REF);
		let to_const = DataType::create_object_handle(ot, true).unwrap();
		let to_mutable = DataType::create_object_handle(ot, false).unwrap();
		assert!(!to_const.is_equal_except_ref_and_const(&to_mutable));
		assert!(!to_const.is_equal_except_const(&to_mutable));

		let a = DataType::create_primitive(TokenKind::Int, true);
		let b = DataType::create_primitive(TokenKind::Int, false);
		assert!(a.is_equal_except_ref_and_const(&b));
		assert!(!a.is_equal_except_ref(&b));
	}

	#[test]
	fn equality_flavours() {
		let plain = DataType::create_primitive(TokenKind::Float, false);
		let mut reference = plain;
		reference.make_reference(true).unwrap();
		let mut const_ref = reference;
		const_ref.make_read_only(true).unwrap();

		assert_ne!(plain, reference);
		assert!(plain.is_equal_except_ref(&reference));
		assert!(!plain.is_equal_except_const(&reference));
		assert!(reference.is_equal_except_const(&const_ref));
		assert!(!reference.is_equal_except_ref(&const_ref));
		assert!(plain.is_equal_except_ref_and_const(&const_ref));
	}

	#[test]
	fn handles_require_reference_types() {
		let (_, value) = registry_with(ObjectFlags::VALUE | ObjectFlags::POD);
		let mut dt = DataType::create_object(value, false);
		assert!(dt.make_handle(true, false).is_err());
		assert!(!dt.is_object_handle());

		let (_, scoped) = registry_with(ObjectFlags::REF | ObjectFlags::SCOPED);
		let mut dt = DataType::create_object(scoped, false);
		assert!(dt.make_handle(true, false).is_err());
		assert!(dt.make_handle(true, true).is_ok());

		let mut int = DataType::create_primitive(TokenKind::Int, false);
		assert!(int.make_handle(true, false).is_err());
		assert!(int.make_handle_to_const(true).is_err());
	}

	#[test]
	fn read_only_targets_the_handle() {
		let (_, ot) = registry_with(ObjectFlags::REF);
		let mut dt = DataType::create_object_handle(ot, false).unwrap();
		dt.make_read_only(true).unwrap();
		assert!(dt.is_read_only());
		assert!(!dt.is_handle_to_const());
		dt.make_handle_to_const(true).unwrap();
		assert!(dt.is_handle_to_const());
	}

	#[test]
	fn sizes() {
		use TokenKind::*;
		let size = |t| DataType::create_primitive(t, false);
		assert_eq!(size(Int8).size_in_memory_bytes(), 1);
		assert_eq!(size(UInt16).size_in_memory_bytes(), 2);
		assert_eq!(size(Int64).size_in_memory_bytes(), 8);
		assert_eq!(size(Double).size_in_memory_dwords(), 2);
		assert_eq!(size(Bool).size_in_memory_bytes(), SIZEOF_BOOL);
		assert_eq!(size(Float).size_on_stack_dwords(), 1);
		assert_eq!(size(Void).size_on_stack_dwords(), 0);
		assert_eq!(DataType::create_any(false).size_on_stack_dwords(), 2);
		assert_eq!(DataType::create_null_handle().size_in_memory_bytes(), 4 * PTR_SIZE);

		let mut reference = size(Int8);
		reference.make_reference(true).unwrap();
		assert_eq!(reference.size_on_stack_dwords(), PTR_SIZE);

		let (_, ot) = registry_with(ObjectFlags::VALUE | ObjectFlags::POD);
		assert_eq!(DataType::create_object(ot, false).size_on_stack_dwords(), PTR_SIZE);
	}

	#[test]
	fn same_primitive_base_type() {
		use TokenKind::*;
		let int = DataType::create_primitive(Int, false);
		let uint = DataType::create_primitive(UInt, false);
		let int8 = DataType::create_primitive(Int8, false);
		let float = DataType::create_primitive(Float, false);
		let double = DataType::create_primitive(Double, false);
		assert!(int.is_same_primitive_base_type(&uint));
		assert!(uint.is_same_primitive_base_type(&int));
		assert!(int8.is_same_primitive_base_type(&int));
		assert!(float.is_same_primitive_base_type(&double));
		assert!(!int.is_same_primitive_base_type(&float));
		assert!(!DataType::create_primitive(Bool, false).is_same_primitive_base_type(&int));
	}

	#[test]
	fn instantiation_and_copy_rules() {
		let (mut registry, ot) = registry_with(ObjectFlags::REF);
		let obj = DataType::create_object(ot, false);
		assert!(!obj.can_be_instantiated(&registry));
		let handle = DataType::create_object_handle(ot, false).unwrap();
		assert!(handle.can_be_instantiated(&registry));

		let factory = registry.add_function(FunctionDescriptor::new("f", handle, Vec::new(), None));
		registry.object_type_mut(ot.id).beh.factories.push(factory);
		assert!(obj.can_be_instantiated(&registry));
		assert!(!obj.can_be_copied(&registry));
		registry.object_type_mut(ot.id).beh.copy = Some(factory);
		assert!(!obj.can_be_copied(&registry));
		registry.object_type_mut(ot.id).beh.default_factory = Some(factory);
		assert!(obj.can_be_copied(&registry));

		let (registry, nohandle) = registry_with(ObjectFlags::REF | ObjectFlags::NOHANDLE);
		assert!(!DataType::create_object(nohandle, false).can_be_instantiated(&registry));

		let (registry, pod) = registry_with(ObjectFlags::VALUE | ObjectFlags::POD);
		assert!(DataType::create_object(pod, true).can_be_copied(&registry));
		assert!(!DataType::default().can_be_instantiated(&registry));
	}

	#[test]
	fn arrays_are_template_instances() {
		let mut registry = TypeRegistry::new();
		let int = DataType::create_primitive(TokenKind::Int, false);
		let array = int.make_array(&mut registry).unwrap();
		assert!(array.is_array_type() && array.is_template() && array.is_object());
		assert_eq!(array, int.make_array(&mut registry).unwrap());
		assert_eq!(array.format(&registry), "int[]");
		assert!(DataType::default().make_array(&mut registry).is_err());
	}
}
