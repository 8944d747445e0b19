//! A small stack machine running compiled script functions.
//!
//! Every call gets a frame of value slots addressed by the variables' stack
//! offsets. Arguments and intermediate references travel on a shared value
//! stack, results of calls and comparisons in a single value register.
//! Objects are reference counted, a handle is a clone of the object's `Rc`.

mod native;
mod value;

pub use native::{NativeCall, NativeFn, native};
pub use value::{Address, Object, ObjectData, Payload, Value};

use crate::{bytecode::{Instruction, Label, Operand, ScriptFunction, TestOp, Var}, error::runtime::RuntimeError, types::{FuncId, FunctionKind, TypeId, TypeRegistry}, utils::RcCell};

/// Everything a reference can point to.
pub struct Memory<'g> {
	frames:  Vec<Vec<Value>>,
	globals: &'g mut Vec<Value>,
}

impl Memory<'_> {
	pub fn read(&self, address: &Address) -> Result<Value, RuntimeError> {
		match address {
			Address::Local(frame, var) => self
				.frames
				.get(*frame)
				.and_then(|f| f.get(*var))
				.cloned()
				.ok_or_else(|| RuntimeError::InvalidValue("dangling local reference".into())),
			Address::Global(id) => self.globals.get(id.0).cloned().ok_or(RuntimeError::IndexOutOfBounds),
			Address::Field(obj, index) => obj.borrow().fields.get(*index).cloned().ok_or(RuntimeError::IndexOutOfBounds),
			Address::Element(obj, index) => match &obj.borrow().payload {
				Payload::Array(items) => items.get(*index).cloned().ok_or(RuntimeError::IndexOutOfBounds),
				_ => Err(RuntimeError::InvalidValue("not an array".into())),
			},
		}
	}

	pub fn write(&mut self, address: &Address, value: Value) -> Result<(), RuntimeError> {
		let slot = match address {
			Address::Local(frame, var) => self.frames.get_mut(*frame).and_then(|f| f.get_mut(*var)),
			Address::Global(id) => self.globals.get_mut(id.0),
			Address::Field(obj, index) => {
				let mut obj = obj.borrow_mut();
				let slot = obj.fields.get_mut(*index).ok_or(RuntimeError::IndexOutOfBounds)?;
				*slot = value;
				return Ok(());
			}
			Address::Element(obj, index) => {
				let mut obj = obj.borrow_mut();
				let Payload::Array(items) = &mut obj.payload else {
					return Err(RuntimeError::InvalidValue("not an array".into()));
				};
				let slot = items.get_mut(*index).ok_or(RuntimeError::IndexOutOfBounds)?;
				*slot = value;
				return Ok(());
			}
		};
		*slot.ok_or(RuntimeError::IndexOutOfBounds)? = value;
		Ok(())
	}
}

pub struct Vm<'r, 'g> {
	registry:  &'r TypeRegistry,
	memory:    Memory<'g>,
	stack:     Vec<Value>,
	register:  Value,
	max_depth: usize,
}

impl<'r, 'g> Vm<'r, 'g> {
	pub fn new(registry: &'r TypeRegistry, globals: &'g mut Vec<Value>, max_depth: usize) -> Self {
		if globals.len() < registry.global_count() {
			globals.resize(registry.global_count(), Value::Void);
		}
		Self { registry, memory: Memory { frames: Vec::new(), globals }, stack: Vec::new(), register: Value::Void, max_depth }
	}

	/// Calls a function with the given arguments, `this` first for methods.
	pub fn call(&mut self, id: FuncId, args: Vec<Value>) -> Result<Value, RuntimeError> {
		let registry = self.registry;
		let desc = registry.function(id);
		let expected = desc.params.len() + usize::from(desc.object_type.is_some());
		if args.len() != expected {
			return Err(RuntimeError::ArgumentCount { expected, found: args.len() });
		}
		self.stack.extend(args);
		self.invoke(id)?;
		Ok(std::mem::take(&mut self.register))
	}

	/// A default initialized instance of a registered type. Strings start out
	/// empty rather than without text.
	pub fn new_object(registry: &TypeRegistry, ty: TypeId) -> Object {
		let payload = match registry.string_type().and_then(|dt| dt.type_id()) {
			Some(string) if string == ty => Payload::Text(String::new()),
			_ => Payload::None,
		};
		let fields = registry
			.object_type(ty)
			.properties
			.iter()
			.map(|p| match p.ty.type_id() {
				Some(id) if p.ty.is_object() && !p.ty.is_object_handle() => {
					Value::Object(Some(Self::new_object(registry, id)))
				}
				_ => Value::default_for(&p.ty),
			})
			.collect();
		RcCell::new(ObjectData::new(ty, fields, payload))
	}

	fn invoke(&mut self, id: FuncId) -> Result<(), RuntimeError> {
		let registry = self.registry;
		let desc = registry.function(id);
		let args = self.pop_n(desc.params.len())?;
		match &desc.kind {
			FunctionKind::Native(f) => {
				let f = f.clone();
				let this = if desc.object_type.is_some() { Some(self.pop()?) } else { None };
				if this.as_ref().is_some_and(Value::is_null) {
					return Err(RuntimeError::NullPointerAccess);
				}
				let mut call = NativeCall::new(this, args, &mut self.memory, registry);
				self.register = f(&mut call)?;
				Ok(())
			}
			FunctionKind::Script(Some(code)) => {
				let code = code.clone();
				self.run(&code, args)
			}
			FunctionKind::Script(None) => Err(RuntimeError::FunctionNotCompiled(desc.name.clone())),
		}
	}

	fn run(&mut self, code: &ScriptFunction, args: Vec<Value>) -> Result<(), RuntimeError> {
		if self.memory.frames.len() >= self.max_depth {
			return Err(RuntimeError::StackOverflow);
		}
		let mut vars = vec![Value::Void; code.stack_size + 1];
		for (&var, arg) in code.params.iter().zip(args) {
			vars[var] = arg;
		}
		self.memory.frames.push(vars);
		let frame = self.memory.frames.len() - 1;
		let base = self.stack.len();
		let result = self.execute(code, frame);
		if result.is_err() {
			for &var in code.object_vars.iter().rev() {
				self.memory.frames[frame][var] = Value::Void;
			}
		}
		self.memory.frames.pop();
		self.stack.truncate(base);
		result
	}

	fn execute(&mut self, code: &ScriptFunction, frame: usize) -> Result<(), RuntimeError> {
		use Instruction::*;
		let mut pc = 0;
		while let Some(instruction) = code.code.get(pc) {
			pc += 1;
			match instruction {
				Instruction::Label(_) | Line(_) => {}
				PshC(c) => self.stack.push((*c).into()),
				PshV(v) => self.stack.push(self.var(frame, *v).clone()),
				Psf(v) => self.stack.push(Value::Ref(Address::Local(frame, *v))),
				Pga(g) => self.stack.push(Value::Ref(Address::Global(*g))),
				PshNull => self.stack.push(Value::Object(None)),
				PshR => self.stack.push(self.register.clone()),
				Str(s) => self.stack.push(Value::Str(s.clone())),
				Pop => {
					self.pop()?;
				}
				PopV(v) => {
					let value = self.pop()?;
					self.set(frame, *v, value);
				}
				SetV(v, c) => self.set(frame, *v, (*c).into()),
				CpyV { dst, src } => self.set(frame, *dst, self.var(frame, *src).clone()),
				Rdr(v) => {
					let value = match self.pop()? {
						Value::Ref(address) => self.memory.read(&address)?,
						other => other,
					};
					self.set(frame, *v, value);
				}
				Wrt(v) | RefCpy(v) => {
					let address = self.top_ref()?;
					let value = self.var(frame, *v).clone();
					self.memory.write(&address, value)?;
				}
				CpyVtoR(v) => self.register = self.var(frame, *v).clone(),
				CpyRtoV(v) => self.set(frame, *v, self.register.clone()),
				Conv { dst, src, from, to } => {
					let value = self.var(frame, *src).convert(*from, *to)?;
					self.set(frame, *dst, value);
				}
				Neg { var, kind } => self.set(frame, *var, self.var(frame, *var).negate(*kind)?),
				Not(v) => self.set(frame, *v, self.var(frame, *v).logical_not()?),
				BNot { var, kind } => self.set(frame, *var, self.var(frame, *var).bit_not(*kind)?),
				IncV { var, kind, delta } => self.set(frame, *var, self.var(frame, *var).increment(*kind, *delta)?),
				Inc { kind, delta } => {
					let address = self.top_ref()?;
					let value = self.memory.read(&address)?.increment(*kind, *delta)?;
					self.memory.write(&address, value)?;
				}
				Math { op, kind, dst, lhs, rhs } => {
					let value = self.operand(frame, lhs).math(*op, *kind, &self.operand(frame, rhs))?;
					self.set(frame, *dst, value);
				}
				Bits { op, kind, dst, lhs, rhs } => {
					let value = self.operand(frame, lhs).bits(*op, *kind, &self.operand(frame, rhs))?;
					self.set(frame, *dst, value);
				}
				Cmp { kind, lhs, rhs } => {
					self.register = Value::Int(self.operand(frame, lhs).compare(*kind, &self.operand(frame, rhs))?)
				}
				CmpHandle { lhs, rhs } => {
					let same = self.var(frame, *lhs) == self.var(frame, *rhs);
					self.register = Value::Int(i64::from(!same));
				}
				Test(op) => {
					let v = self.register_int()?;
					self.register = Value::Bool(match op {
						TestOp::Zero => v == 0,
						TestOp::NotZero => v != 0,
						TestOp::Negative => v < 0,
						TestOp::NotNegative => v >= 0,
						TestOp::Positive => v > 0,
						TestOp::NotPositive => v <= 0,
					});
				}
				Jmp(target) => pc = Self::target(*target)?,
				Jz(target) => pc = self.branch(pc, *target, |v| v == 0)?,
				Jnz(target) => pc = self.branch(pc, *target, |v| v != 0)?,
				Js(target) => pc = self.branch(pc, *target, |v| v < 0)?,
				Jns(target) => pc = self.branch(pc, *target, |v| v >= 0)?,
				Jp(target) => pc = self.branch(pc, *target, |v| v > 0)?,
				Jnp(target) => pc = self.branch(pc, *target, |v| v <= 0)?,
				JmpP(v) => {
					let offset = self.var(frame, *v).as_int().ok_or(RuntimeError::IndexOutOfBounds)?;
					pc += usize::try_from(offset).map_err(|_| RuntimeError::IndexOutOfBounds)?;
				}
				Ret => return Ok(()),
				Call(id) | CallSys(id) => self.invoke(*id)?,
				Alloc { var, ty } => {
					let obj = Self::new_object(self.registry, *ty);
					self.set(frame, *var, Value::Object(Some(obj)));
				}
				Free(v) => self.set(frame, *v, Value::Void),
				RefCpyV { dst, src } => self.set(frame, *dst, self.var(frame, *src).clone()),
				CopyObj(v) => {
					let dst = self.top()?.object()?;
					let src = self.var(frame, *v).object()?;
					self.copy_object(&dst, &src);
				}
				Deref => {
					let value = match self.pop()? {
						Value::Ref(address) => self.memory.read(&address)?,
						other => other,
					};
					self.stack.push(value);
				}
				ChkRef => {
					if self.top()?.is_null() {
						return Err(RuntimeError::NullPointerAccess);
					}
				}
				ChkRefV(v) => {
					if self.var(frame, *v).is_null() {
						return Err(RuntimeError::NullPointerAccess);
					}
				}
				Field { index, object } => {
					let obj = self.pop()?.object()?;
					let value = if *object {
						obj.borrow().fields.get(*index).cloned().ok_or(RuntimeError::IndexOutOfBounds)?
					} else {
						Value::Ref(Address::Field(obj, *index))
					};
					self.stack.push(value);
				}
			}
		}
		Ok(())
	}

	/// Copies value fields deeply, handles by reference.
	fn copy_object(&self, dst: &Object, src: &Object) {
		if dst.ptr_eq(src) {
			return;
		}
		let src = src.borrow();
		let props = &self.registry.object_type(src.type_id).properties;
		let mut dst = dst.borrow_mut();
		for (i, field) in src.fields.iter().enumerate() {
			let nested = props.get(i).is_some_and(|p| p.ty.is_object() && !p.ty.is_object_handle());
			match (field, dst.fields.get(i)) {
				(Value::Object(Some(from)), Some(Value::Object(Some(to)))) if nested => self.copy_object(to, from),
				_ => {
					if let Some(slot) = dst.fields.get_mut(i) {
						*slot = field.clone();
					}
				}
			}
		}
		if let (Payload::Text(from), Payload::Text(to)) = (&src.payload, &mut dst.payload) {
			to.clone_from(from);
		}
	}

	fn var(&self, frame: usize, v: Var) -> &Value { &self.memory.frames[frame][v] }

	fn set(&mut self, frame: usize, v: Var, value: Value) { self.memory.frames[frame][v] = value }

	fn operand(&self, frame: usize, operand: &Operand) -> Value {
		match operand {
			Operand::Var(v) => self.var(frame, *v).clone(),
			Operand::Const(c) => (*c).into(),
		}
	}

	fn pop(&mut self) -> Result<Value, RuntimeError> {
		self.stack.pop().ok_or_else(|| RuntimeError::InvalidValue("stack underflow".into()))
	}

	fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
		let len = self.stack.len();
		if len < n {
			return Err(RuntimeError::InvalidValue("stack underflow".into()));
		}
		Ok(self.stack.split_off(len - n))
	}

	fn top(&self) -> Result<&Value, RuntimeError> {
		self.stack.last().ok_or_else(|| RuntimeError::InvalidValue("stack underflow".into()))
	}

	fn top_ref(&self) -> Result<Address, RuntimeError> {
		match self.top()? {
			Value::Ref(address) => Ok(address.clone()),
			other => Err(RuntimeError::InvalidValue(format!("expected a reference, found {other:?}"))),
		}
	}

	fn register_int(&self) -> Result<i64, RuntimeError> {
		self.register
			.as_int()
			.ok_or_else(|| RuntimeError::InvalidValue(format!("register holds {:?}", self.register)))
	}

	fn target(label: Label) -> Result<usize, RuntimeError> {
		if label.0 == usize::MAX {
			return Err(RuntimeError::InvalidValue("jump to an unresolved label".into()));
		}
		Ok(label.0)
	}

	fn branch(&self, pc: usize, label: Label, taken: impl Fn(i64) -> bool) -> Result<usize, RuntimeError> {
		if taken(self.register_int()?) { Self::target(label) } else { Ok(pc) }
	}
}
