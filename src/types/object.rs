use std::ops::BitOr;

use super::{DataType, FuncId};

/// Index of an object type in the [`TypeRegistry`](super::TypeRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// What a [`DataType`] knows about its object type without asking the
/// registry. Flags and size never change after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectTypeRef {
	pub id:    TypeId,
	pub flags: ObjectFlags,
	pub size:  usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectFlags(u32);

impl ObjectFlags {
	/// Reference counted type, instantiated through factories
	pub const REF: Self = Self(1);
	/// Value type, instantiated through constructors
	pub const VALUE: Self = Self(1 << 1);
	/// Plain old data, can be copied field by field
	pub const POD: Self = Self(1 << 2);
	/// Reference type that can't be held by handles
	pub const NOHANDLE: Self = Self(1 << 3);
	/// Reference type only living in a single scope
	pub const SCOPED: Self = Self(1 << 4);
	pub const TEMPLATE: Self = Self(1 << 5);
	pub const SCRIPT_OBJECT: Self = Self(1 << 6);
	pub const ENUM: Self = Self(1 << 7);

	pub const fn empty() -> Self { Self(0) }

	pub const fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }
}

impl BitOr for ObjectFlags {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

/// A registered member variable. `index` is the field slot in the object.
#[derive(Debug, Clone)]
pub struct ObjectProperty {
	pub name:  String,
	pub ty:    DataType,
	pub index: usize,
}

/// Conversion behaviours an object type can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
	Factory,
	Construct,
	ValueCast,
	ImplicitValueCast,
	RefCast,
	ImplicitRefCast,
}

#[derive(Debug, Clone, Default)]
pub struct Behaviours {
	/// Factories of reference types
	pub factories:           Vec<FuncId>,
	/// Constructors of value types
	pub constructors:        Vec<FuncId>,
	pub default_factory:     Option<FuncId>,
	pub default_constructor: Option<FuncId>,
	/// `opAssign` taking the type itself
	pub copy:                Option<FuncId>,
	/// Cast behaviours paired with the function implementing them
	pub operators:           Vec<(Behaviour, FuncId)>,
}

impl Behaviours {
	/// Functions registered for any of the given behaviours.
	pub fn casts<'a>(&'a self, kinds: &'a [Behaviour]) -> impl Iterator<Item = FuncId> + 'a {
		self.operators.iter().filter(move |(b, _)| kinds.contains(b)).map(|&(_, f)| f)
	}
}

/// A registered type, an enum, or an instance of the array template.
#[derive(Debug, Clone)]
pub struct ObjectType {
	pub name:       String,
	pub flags:      ObjectFlags,
	pub size:       usize,
	pub properties: Vec<ObjectProperty>,
	pub methods:    Vec<FuncId>,
	pub beh:        Behaviours,
	/// Element type of an array instance
	pub sub_type:   Option<DataType>,
	/// Named values of an enum
	pub enum_values: Vec<(String, i64)>,
}

impl ObjectType {
	pub fn new(name: &str, flags: ObjectFlags, size: usize) -> Self {
		Self {
			name: name.to_string(),
			flags,
			size,
			properties: Vec::new(),
			methods: Vec::new(),
			beh: Behaviours::default(),
			sub_type: None,
			enum_values: Vec::new(),
		}
	}

	pub fn property(&self, name: &str) -> Option<&ObjectProperty> { self.properties.iter().find(|p| p.name == name) }

	pub fn enum_value(&self, name: &str) -> Option<i64> {
		self.enum_values.iter().find(|(n, _)| n == name).map(|&(_, v)| v)
	}
}
