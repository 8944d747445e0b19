//! Instructions of the virtual machine and the buffers the compiler fills.
//!
//! Code is appended to a [`ByteCode`] while the compiler walks the tree.
//! Jumps name labels, which are plain instructions in the buffer until
//! [`ByteCode::finalize`] turns them into instruction indices and moves the
//! line markers into a separate table.
//!
//! Variables are addressed by their stack offset, the position of the last
//! dword the variable occupies in the frame.

mod disasm;

use std::{collections::HashMap, rc::Rc};

use crate::{scanner::TokenKind, types::{DataType, FuncId, GlobalId, TypeId}};

/// Stack offset of a variable in the frame.
pub type Var = usize;

/// A jump target. A label id while compiling, an instruction index once the
/// code is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

/// A value known at compile time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(f32),
	Double(f64),
	Null,
}

impl ConstValue {
	/// The integer bit pattern of the constant.
	pub fn as_i64(&self) -> i64 {
		match *self {
			ConstValue::Bool(b) => i64::from(b),
			ConstValue::Int(v) => v,
			ConstValue::UInt(v) => v as i64,
			ConstValue::Float(v) => v as i64,
			ConstValue::Double(v) => v as i64,
			ConstValue::Null => 0,
		}
	}

	pub fn as_u64(&self) -> u64 { self.as_i64() as u64 }

	pub fn as_f64(&self) -> f64 {
		match *self {
			ConstValue::Int(v) => v as f64,
			ConstValue::UInt(v) => v as f64,
			ConstValue::Float(v) => f64::from(v),
			ConstValue::Double(v) => v,
			ConstValue::Bool(b) => f64::from(u8::from(b)),
			ConstValue::Null => 0.0,
		}
	}

	pub fn as_bool(&self) -> bool {
		match *self {
			ConstValue::Bool(b) => b,
			_ => self.as_i64() != 0,
		}
	}
}

/// Width and interpretation of a numeric operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
	I8,
	I16,
	I32,
	I64,
	U8,
	U16,
	U32,
	U64,
	F32,
	F64,
}

impl NumKind {
	/// Enums count as `int`, `bool` has no numeric kind.
	pub fn of(dt: &DataType) -> Option<Self> {
		if dt.is_enum_type() {
			return Some(Self::I32);
		}
		if dt.object_type().is_some() || dt.is_object_handle() {
			return None;
		}
		Some(match dt.token() {
			TokenKind::Int8 => Self::I8,
			TokenKind::Int16 => Self::I16,
			TokenKind::Int => Self::I32,
			TokenKind::Int64 => Self::I64,
			TokenKind::UInt8 => Self::U8,
			TokenKind::UInt16 => Self::U16,
			TokenKind::UInt => Self::U32,
			TokenKind::UInt64 => Self::U64,
			TokenKind::Float => Self::F32,
			TokenKind::Double => Self::F64,
			_ => return None,
		})
	}

	pub fn is_float(self) -> bool { matches!(self, Self::F32 | Self::F64) }

	pub fn is_unsigned(self) -> bool { matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64) }

	/// Truncates an integer bit pattern to this width, sign or zero extending
	/// it back to 64 bits.
	pub fn wrap(self, v: i64) -> i64 {
		match self {
			Self::I8 => i64::from(v as i8),
			Self::I16 => i64::from(v as i16),
			Self::I32 => i64::from(v as i32),
			Self::U8 => i64::from(v as u8),
			Self::U16 => i64::from(v as u16),
			Self::U32 => i64::from(v as u32),
			Self::I64 | Self::U64 | Self::F32 | Self::F64 => v,
		}
	}
}

/// Either side of an arithmetic instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
	Var(Var),
	Const(ConstValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
	Add,
	Sub,
	Mul,
	Div,
	Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
	And,
	Or,
	Xor,
	Shl,
	/// Logical shift right, `>>`
	Shr,
	/// Arithmetic shift right, `>>>`
	Sar,
}

/// Turns the -1/0/1 of a comparison in the register into a `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOp {
	Zero,
	NotZero,
	Negative,
	NotNegative,
	Positive,
	NotPositive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	/// Jump target, removed on finalization
	Label(Label),
	/// Source row of the following code, removed on finalization
	Line(usize),

	PshC(ConstValue),
	PshV(Var),
	/// Push a reference to a variable
	Psf(Var),
	/// Push a reference to a global variable
	Pga(GlobalId),
	PshNull,
	/// Push the value register
	PshR,
	/// Push a string literal, the argument of the string factory
	Str(Rc<str>),
	Pop,
	PopV(Var),

	SetV(Var, ConstValue),
	CpyV { dst: Var, src: Var },
	/// Pop a reference and read the value it points to into the variable
	Rdr(Var),
	/// Write the variable through the reference on top of the stack, which
	/// stays there
	Wrt(Var),
	CpyVtoR(Var),
	CpyRtoV(Var),

	Conv { dst: Var, src: Var, from: NumKind, to: NumKind },
	Neg { var: Var, kind: NumKind },
	Not(Var),
	BNot { var: Var, kind: NumKind },
	IncV { var: Var, kind: NumKind, delta: i8 },
	/// Increment through the reference on top of the stack, which stays there
	Inc { kind: NumKind, delta: i8 },
	Math { op: MathOp, kind: NumKind, dst: Var, lhs: Operand, rhs: Operand },
	Bits { op: BitOp, kind: NumKind, dst: Var, lhs: Operand, rhs: Operand },
	/// Compare and leave -1, 0 or 1 in the register
	Cmp { kind: NumKind, lhs: Operand, rhs: Operand },
	/// Leave 0 in the register when both handles point to the same object
	CmpHandle { lhs: Var, rhs: Var },
	Test(TestOp),

	Jmp(Label),
	/// Jump when the register is zero or false
	Jz(Label),
	Jnz(Label),
	Js(Label),
	Jns(Label),
	Jp(Label),
	Jnp(Label),
	/// Skip as many instructions as the variable's value, landing on one of
	/// the `Jmp` that follow
	JmpP(Var),
	Ret,

	Call(FuncId),
	CallSys(FuncId),

	/// Create an object with default fields in the variable
	Alloc { var: Var, ty: TypeId },
	/// Release whatever the variable holds
	Free(Var),
	/// Store the handle in the variable through the reference on top of the
	/// stack, which stays there
	RefCpy(Var),
	RefCpyV { dst: Var, src: Var },
	/// Copy the fields of the object in the variable into the object on top
	/// of the stack, which stays there
	CopyObj(Var),
	/// Replace the reference on top of the stack with the value it points to
	Deref,
	/// Fail on a null handle on top of the stack
	ChkRef,
	ChkRefV(Var),
	/// Pop an object and push a reference to one of its fields. Value object
	/// fields are pushed as the object itself.
	Field { index: usize, object: bool },
}

impl Instruction {
	fn vars(&self) -> Vec<Var> {
		use Instruction::*;
		let operand = |o: &Operand| match o {
			Operand::Var(v) => Some(*v),
			Operand::Const(_) => None,
		};
		match self {
			PshV(v) | Psf(v) | PopV(v) | SetV(v, _) | Rdr(v) | Wrt(v) | CpyVtoR(v) | CpyRtoV(v) | Not(v)
			| JmpP(v) | Free(v) | RefCpy(v) | CopyObj(v) | ChkRefV(v) => vec![*v],
			Neg { var, .. } | BNot { var, .. } | IncV { var, .. } | Alloc { var, .. } => vec![*var],
			CpyV { dst, src } | Conv { dst, src, .. } | RefCpyV { dst, src } => vec![*dst, *src],
			Math { dst, lhs, rhs, .. } | Bits { dst, lhs, rhs, .. } => {
				[Some(*dst), operand(lhs), operand(rhs)].into_iter().flatten().collect()
			}
			Cmp { lhs, rhs, .. } => [operand(lhs), operand(rhs)].into_iter().flatten().collect(),
			CmpHandle { lhs, rhs } => vec![*lhs, *rhs],
			_ => Vec::new(),
		}
	}

	fn exchange_var(&mut self, old: Var, new: Var) {
		use Instruction::*;
		let swap = |v: &mut Var| {
			if *v == old {
				*v = new
			}
		};
		let swap_operand = |o: &mut Operand| {
			if let Operand::Var(v) = o
				&& *v == old
			{
				*v = new
			}
		};
		match self {
			PshV(v) | Psf(v) | PopV(v) | SetV(v, _) | Rdr(v) | Wrt(v) | CpyVtoR(v) | CpyRtoV(v) | Not(v)
			| JmpP(v) | Free(v) | RefCpy(v) | CopyObj(v) | ChkRefV(v) => swap(v),
			Neg { var, .. } | BNot { var, .. } | IncV { var, .. } | Alloc { var, .. } => swap(var),
			CpyV { dst, src } | Conv { dst, src, .. } | RefCpyV { dst, src } => {
				swap(dst);
				swap(src);
			}
			Math { dst, lhs, rhs, .. } | Bits { dst, lhs, rhs, .. } => {
				swap(dst);
				swap_operand(lhs);
				swap_operand(rhs);
			}
			Cmp { lhs, rhs, .. } => {
				swap_operand(lhs);
				swap_operand(rhs);
			}
			CmpHandle { lhs, rhs } => {
				swap(lhs);
				swap(rhs);
			}
			_ => {}
		}
	}

	fn jump_target_mut(&mut self) -> Option<&mut Label> {
		use Instruction::*;
		match self {
			Jmp(l) | Jz(l) | Jnz(l) | Js(l) | Jns(l) | Jp(l) | Jnp(l) => Some(l),
			_ => None,
		}
	}
}

/// An append only instruction buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByteCode {
	code: Vec<Instruction>,
}

impl ByteCode {
	pub fn new() -> Self { Self::default() }

	pub fn instr(&mut self, instruction: Instruction) { self.code.push(instruction) }

	pub fn label(&mut self, label: Label) { self.code.push(Instruction::Label(label)) }

	pub fn line(&mut self, row: usize) {
		if let Some(Instruction::Line(last)) = self.code.last_mut() {
			*last = row;
			return;
		}
		self.code.push(Instruction::Line(row))
	}

	/// Moves all of `other` to the end of this buffer.
	pub fn append(&mut self, other: &mut ByteCode) { self.code.append(&mut other.code) }

	pub fn is_empty(&self) -> bool { self.code.is_empty() }

	pub fn instructions(&self) -> &[Instruction] { &self.code }

	pub fn last(&self) -> Option<&Instruction> {
		self.code.iter().rev().find(|i| !matches!(i, Instruction::Line(_)))
	}

	/// Every variable the code refers to, each once.
	pub fn vars_used(&self) -> Vec<Var> {
		let mut vars = Vec::new();
		for v in self.code.iter().flat_map(Instruction::vars) {
			if !vars.contains(&v) {
				vars.push(v);
			}
		}
		vars
	}

	/// Retargets every use of the variable `old` to `new`.
	pub fn exchange_var(&mut self, old: Var, new: Var) {
		for instruction in &mut self.code {
			instruction.exchange_var(old, new);
		}
	}

	/// Drops the pseudo instructions and resolves labels. Returns the code and
	/// the `(instruction index, row)` line table.
	pub fn finalize(self) -> (Vec<Instruction>, Vec<(usize, usize)>) {
		let mut targets = HashMap::new();
		let mut lines = Vec::new();
		let mut code = Vec::with_capacity(self.code.len());
		for instruction in self.code {
			match instruction {
				Instruction::Label(label) => {
					targets.insert(label, code.len());
				}
				Instruction::Line(row) => {
					if lines.last().is_some_and(|&(at, _)| at == code.len()) {
						lines.pop();
					}
					lines.push((code.len(), row));
				}
				other => code.push(other),
			}
		}
		for instruction in &mut code {
			if let Some(label) = instruction.jump_target_mut() {
				*label = Label(targets.get(label).copied().unwrap_or(usize::MAX));
			}
		}
		(code, lines)
	}
}

/// Temporary variable bookkeeping of one compiled function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempStats {
	pub allocated: usize,
	pub released:  usize,
}

/// A compiled script function, ready for the virtual machine.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
	pub name:        String,
	pub code:        Vec<Instruction>,
	/// Frame size in dwords
	pub stack_size:  usize,
	/// Variable of each parameter, in declaration order
	pub params:      Vec<Var>,
	pub lines:       Vec<(usize, usize)>,
	/// Variables holding objects, released when the frame unwinds
	pub object_vars: Vec<Var>,
	pub temps:       TempStats,
}

impl ScriptFunction {
	/// Source row of the instruction at `pc`.
	pub fn row_of(&self, pc: usize) -> Option<usize> {
		self.lines.iter().take_while(|&&(at, _)| at <= pc).last().map(|&(_, row)| row)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_resolve_to_instruction_indices() {
		let mut bc = ByteCode::new();
		bc.line(1);
		bc.instr(Instruction::SetV(1, ConstValue::Int(0)));
		bc.label(Label(0));
		bc.line(2);
		bc.instr(Instruction::IncV { var: 1, kind: NumKind::I32, delta: 1 });
		bc.instr(Instruction::Jmp(Label(0)));
		bc.instr(Instruction::Jz(Label(7)));
		let (code, lines) = bc.finalize();
		assert_eq!(code.len(), 4);
		assert_eq!(code[2], Instruction::Jmp(Label(1)));
		assert_eq!(code[3], Instruction::Jz(Label(usize::MAX)));
		assert_eq!(lines, vec![(0, 1), (1, 2)]);
	}

	#[test]
	fn consecutive_line_markers_collapse() {
		let mut bc = ByteCode::new();
		bc.line(1);
		bc.line(4);
		bc.instr(Instruction::Ret);
		assert_eq!(bc.instructions()[0], Instruction::Line(4));
	}

	#[test]
	fn vars_used_and_exchange() {
		let mut bc = ByteCode::new();
		bc.instr(Instruction::Math {
			op:   MathOp::Add,
			kind: NumKind::I32,
			dst:  3,
			lhs:  Operand::Var(1),
			rhs:  Operand::Const(ConstValue::Int(2)),
		});
		bc.instr(Instruction::CpyV { dst: 1, src: 3 });
		assert_eq!(bc.vars_used(), vec![3, 1]);
		bc.exchange_var(3, 5);
		assert_eq!(bc.vars_used(), vec![5, 1]);
	}

	#[test]
	fn num_kind_wraps_to_width() {
		assert_eq!(NumKind::I8.wrap(200), -56);
		assert_eq!(NumKind::U8.wrap(-1), 255);
		assert_eq!(NumKind::U32.wrap(-1), 0xFFFF_FFFF);
		assert_eq!(NumKind::I32.wrap(0xFFFF_FFFF), -1);
	}
}
