use std::{any::Any, cmp::Ordering, fmt::{Debug, Display}, rc::Rc};

use Value::*;

use crate::{bytecode::{BitOp, ConstValue, MathOp, NumKind, Var}, error::runtime::RuntimeError, types::{DataType, GlobalId, TypeId}, utils::RcCell};

/// A reference counted script object. Handles are clones of it.
pub type Object = RcCell<ObjectData>;

pub struct ObjectData {
	pub type_id: TypeId,
	/// One slot per registered property
	pub fields:  Vec<Value>,
	pub payload: Payload,
}

/// State of built-in and host types that isn't made of properties.
pub enum Payload {
	None,
	Text(String),
	Array(Vec<Value>),
	Host(Box<dyn Any>),
}

impl Debug for ObjectData {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let payload = match &self.payload {
			Payload::None => "none".to_string(),
			Payload::Text(s) => format!("{s:?}"),
			Payload::Array(items) => format!("{} elements", items.len()),
			Payload::Host(_) => "host data".to_string(),
		};
		f.debug_struct("ObjectData")
			.field("type_id", &self.type_id)
			.field("fields", &self.fields)
			.field("payload", &payload)
			.finish()
	}
}

impl ObjectData {
	pub fn new(type_id: TypeId, fields: Vec<Value>, payload: Payload) -> Self { Self { type_id, fields, payload } }

	pub fn text(&self) -> Option<&str> {
		match &self.payload {
			Payload::Text(s) => Some(s),
			_ => None,
		}
	}
}

/// Where a reference points to.
#[derive(Debug, Clone)]
pub enum Address {
	/// A variable of the frame at the given depth
	Local(usize, Var),
	Global(GlobalId),
	Field(Object, usize),
	Element(Object, usize),
}

/// A runtime value. Every integer type is stored as its bit pattern in an
/// `i64`, instructions interpret it according to their [`NumKind`].
#[derive(Debug, Clone, Default)]
pub enum Value {
	#[default]
	Void,
	Bool(bool),
	Int(i64),
	Float(f32),
	Double(f64),
	/// A handle or an object, `None` is the null handle
	Object(Option<Object>),
	Ref(Address),
	/// A string literal on its way to the string factory
	Str(Rc<str>),
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Void, Void) => true,
			(Bool(l), Bool(r)) => l == r,
			(Int(l), Int(r)) => l == r,
			(Float(l), Float(r)) => l == r,
			(Double(l), Double(r)) => l == r,
			(Object(None), Object(None)) => true,
			(Object(Some(l)), Object(Some(r))) => l.ptr_eq(r),
			(Str(l), Str(r)) => l == r,
			_ => false,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Void => write!(f, "void"),
			Bool(b) => write!(f, "{b}"),
			Int(v) => write!(f, "{v}"),
			Float(v) => write!(f, "{v}"),
			Double(v) => write!(f, "{v}"),
			Object(None) => write!(f, "null"),
			Object(Some(obj)) => match &obj.borrow().payload {
				Payload::Text(s) => write!(f, "{s}"),
				Payload::Array(items) => {
					write!(f, "[")?;
					for (i, item) in items.iter().enumerate() {
						if i > 0 {
							write!(f, ", ")?;
						}
						write!(f, "{item}")?;
					}
					write!(f, "]")
				}
				_ => write!(f, "<object>"),
			},
			Ref(_) => write!(f, "<reference>"),
			Str(s) => write!(f, "{s}"),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self { Bool(value) }
}

impl From<i32> for Value {
	fn from(value: i32) -> Self { Int(i64::from(value)) }
}

impl From<i64> for Value {
	fn from(value: i64) -> Self { Int(value) }
}

impl From<u32> for Value {
	fn from(value: u32) -> Self { Int(i64::from(value)) }
}

impl From<f32> for Value {
	fn from(value: f32) -> Self { Float(value) }
}

impl From<f64> for Value {
	fn from(value: f64) -> Self { Double(value) }
}

impl From<ConstValue> for Value {
	fn from(value: ConstValue) -> Self {
		match value {
			ConstValue::Bool(b) => Bool(b),
			ConstValue::Int(v) => Int(v),
			ConstValue::UInt(v) => Int(v as i64),
			ConstValue::Float(v) => Float(v),
			ConstValue::Double(v) => Double(v),
			ConstValue::Null => Object(None),
		}
	}
}

impl Value {
	/// What a fresh variable of the type holds before it is assigned.
	pub fn default_for(dt: &DataType) -> Self {
		if dt.is_object() || dt.is_object_handle() {
			return Object(None);
		}
		match NumKind::of(dt) {
			Some(NumKind::F32) => Float(0.0),
			Some(NumKind::F64) => Double(0.0),
			Some(_) => Int(0),
			None if dt.is_boolean_type() => Bool(false),
			None => Void,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Int(v) => Some(*v),
			Bool(b) => Some(i64::from(*b)),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Bool(b) => Some(*b),
			Int(v) => Some(*v != 0),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f32> {
		match self {
			Float(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_double(&self) -> Option<f64> {
		match self {
			Double(v) => Some(*v),
			Float(v) => Some(f64::from(*v)),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Object(obj) => obj.as_ref(),
			_ => None,
		}
	}

	/// The object, failing on a null handle.
	pub fn object(&self) -> Result<Object, RuntimeError> {
		match self {
			Object(Some(obj)) => Ok(obj.clone()),
			Object(None) => Err(RuntimeError::NullPointerAccess),
			other => Err(RuntimeError::InvalidValue(format!("expected an object, found {other:?}"))),
		}
	}

	pub fn is_null(&self) -> bool { matches!(self, Object(None)) }

	fn int(&self) -> Result<i64, RuntimeError> {
		self.as_int().ok_or_else(|| RuntimeError::InvalidValue(format!("expected an integer, found {self:?}")))
	}

	fn real(&self) -> Result<f64, RuntimeError> {
		self.as_double().ok_or_else(|| RuntimeError::InvalidValue(format!("expected a real, found {self:?}")))
	}

	fn boolean(&self) -> Result<bool, RuntimeError> {
		self.as_bool().ok_or_else(|| RuntimeError::InvalidValue(format!("expected a bool, found {self:?}")))
	}

	fn real_of(kind: NumKind, v: f64) -> Self {
		if kind == NumKind::F32 { Float(v as f32) } else { Double(v) }
	}

	/// Arithmetic on two operands of the same kind.
	pub fn math(&self, op: MathOp, kind: NumKind, rhs: &Self) -> Result<Self, RuntimeError> {
		if kind.is_float() {
			let (l, r) = (self.real()?, rhs.real()?);
			let v = match op {
				MathOp::Add => l + r,
				MathOp::Sub => l - r,
				MathOp::Mul => l * r,
				MathOp::Div => l / r,
				MathOp::Mod => l % r,
			};
			return Ok(Self::real_of(kind, v));
		}
		let (l, r) = (kind.wrap(self.int()?), kind.wrap(rhs.int()?));
		let v = match op {
			MathOp::Add => l.wrapping_add(r),
			MathOp::Sub => l.wrapping_sub(r),
			MathOp::Mul => l.wrapping_mul(r),
			MathOp::Div | MathOp::Mod if r == 0 => return Err(RuntimeError::DivideByZero),
			MathOp::Div if kind == NumKind::U64 => ((l as u64) / (r as u64)) as i64,
			MathOp::Mod if kind == NumKind::U64 => ((l as u64) % (r as u64)) as i64,
			MathOp::Div => l.wrapping_div(r),
			MathOp::Mod => l.wrapping_rem(r),
		};
		Ok(Int(kind.wrap(v)))
	}

	/// Bitwise operators and shifts. The shift amount is taken modulo the
	/// operand width.
	pub fn bits(&self, op: BitOp, kind: NumKind, rhs: &Self) -> Result<Self, RuntimeError> {
		let (l, r) = (kind.wrap(self.int()?), rhs.int()?);
		let wide = matches!(kind, NumKind::I64 | NumKind::U64);
		let amount = r as u32;
		let v = match op {
			BitOp::And => l & r,
			BitOp::Or => l | r,
			BitOp::Xor => l ^ r,
			BitOp::Shl if wide => l.wrapping_shl(amount),
			BitOp::Shl => i64::from((l as u32).wrapping_shl(amount)),
			BitOp::Shr if wide => (l as u64).wrapping_shr(amount) as i64,
			BitOp::Shr => i64::from((l as u32).wrapping_shr(amount)),
			BitOp::Sar if wide => l.wrapping_shr(amount),
			BitOp::Sar => i64::from((l as i32).wrapping_shr(amount)),
		};
		Ok(Int(kind.wrap(v)))
	}

	/// -1, 0 or 1. Unordered reals compare as equal.
	pub fn compare(&self, kind: NumKind, rhs: &Self) -> Result<i64, RuntimeError> {
		let ordering = if kind.is_float() {
			self.real()?.partial_cmp(&rhs.real()?).unwrap_or(Ordering::Equal)
		} else if kind == NumKind::U64 {
			(self.int()? as u64).cmp(&(rhs.int()? as u64))
		} else {
			kind.wrap(self.int()?).cmp(&kind.wrap(rhs.int()?))
		};
		Ok(ordering as i64)
	}

	pub fn negate(&self, kind: NumKind) -> Result<Self, RuntimeError> {
		if kind.is_float() {
			return Ok(Self::real_of(kind, -self.real()?));
		}
		Ok(Int(kind.wrap(self.int()?.wrapping_neg())))
	}

	pub fn bit_not(&self, kind: NumKind) -> Result<Self, RuntimeError> { Ok(Int(kind.wrap(!self.int()?))) }

	pub fn logical_not(&self) -> Result<Self, RuntimeError> { Ok(Bool(!self.boolean()?)) }

	pub fn increment(&self, kind: NumKind, delta: i8) -> Result<Self, RuntimeError> {
		if kind.is_float() {
			return Ok(Self::real_of(kind, self.real()? + f64::from(delta)));
		}
		Ok(Int(kind.wrap(self.int()?.wrapping_add(i64::from(delta)))))
	}

	/// Numeric conversion between kinds.
	pub fn convert(&self, from: NumKind, to: NumKind) -> Result<Self, RuntimeError> {
		if from.is_float() {
			let v = self.real()?;
			if to.is_float() {
				return Ok(Self::real_of(to, v));
			}
			let bits = if to.is_unsigned() { v as u64 as i64 } else { v as i64 };
			return Ok(Int(to.wrap(bits)));
		}
		let bits = from.wrap(self.int()?);
		if to.is_float() {
			let v = if from == NumKind::U64 { bits as u64 as f64 } else { bits as f64 };
			return Ok(Self::real_of(to, v));
		}
		Ok(Int(to.wrap(bits)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integer_math_wraps_per_kind() {
		let max = Int(i64::from(i32::MAX));
		assert_eq!(max.math(MathOp::Add, NumKind::I32, &Int(1)).unwrap(), Int(i64::from(i32::MIN)));
		assert_eq!(Int(250).math(MathOp::Add, NumKind::U8, &Int(10)).unwrap(), Int(4));
		assert_eq!(Int(-7).math(MathOp::Div, NumKind::I32, &Int(2)).unwrap(), Int(-3));
		assert_eq!(Int(7).math(MathOp::Mod, NumKind::I32, &Int(0)), Err(RuntimeError::DivideByZero));
		assert_eq!(Float(1.5).math(MathOp::Mul, NumKind::F32, &Float(2.0)).unwrap(), Float(3.0));
	}

	#[test]
	fn shifts_follow_signedness() {
		let minus_eight = Int(-8);
		assert_eq!(minus_eight.bits(BitOp::Sar, NumKind::I32, &Int(1)).unwrap(), Int(-4));
		assert_eq!(minus_eight.bits(BitOp::Shr, NumKind::U32, &Int(28)).unwrap(), Int(0xF));
		assert_eq!(Int(1).bits(BitOp::Shl, NumKind::U64, &Int(40)).unwrap(), Int(1 << 40));
	}

	#[test]
	fn comparisons_and_conversions() {
		assert_eq!(Int(-1).compare(NumKind::I32, &Int(1)).unwrap(), -1);
		assert_eq!(Int(-1).compare(NumKind::U64, &Int(1)).unwrap(), 1);
		assert_eq!(Double(2.5).compare(NumKind::F64, &Double(2.5)).unwrap(), 0);
		assert_eq!(Int(-1).convert(NumKind::I32, NumKind::U32).unwrap(), Int(0xFFFF_FFFF));
		assert_eq!(Double(3.9).convert(NumKind::F64, NumKind::I32).unwrap(), Int(3));
		assert_eq!(Int(3).convert(NumKind::I32, NumKind::F32).unwrap(), Float(3.0));
	}

	#[test]
	fn objects_compare_by_identity() {
		let a = RcCell::new(ObjectData::new(TypeId(0), Vec::new(), Payload::None));
		let b = RcCell::new(ObjectData::new(TypeId(0), Vec::new(), Payload::None));
		assert_eq!(Object(Some(a.clone())), Object(Some(a)));
		assert_ne!(Object(Some(b)), Object(None));
	}
}
