use std::fmt::{Display, Formatter, Result};

use super::{BitOp, ConstValue, Instruction, MathOp, NumKind, Operand, ScriptFunction, TestOp};

impl Display for ConstValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		match self {
			ConstValue::Bool(b) => write!(f, "{b}"),
			ConstValue::Int(v) => write!(f, "{v}"),
			ConstValue::UInt(v) => write!(f, "{v}u"),
			ConstValue::Float(v) => write!(f, "{v:?}f"),
			ConstValue::Double(v) => write!(f, "{v:?}"),
			ConstValue::Null => write!(f, "null"),
		}
	}
}

impl Display for NumKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		let s = match self {
			NumKind::I8 => "i8",
			NumKind::I16 => "i16",
			NumKind::I32 => "i",
			NumKind::I64 => "i64",
			NumKind::U8 => "u8",
			NumKind::U16 => "u16",
			NumKind::U32 => "u",
			NumKind::U64 => "u64",
			NumKind::F32 => "f",
			NumKind::F64 => "d",
		};
		f.pad(s)
	}
}

impl Display for Operand {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		match self {
			Operand::Var(v) => write!(f, "v{v}"),
			Operand::Const(c) => write!(f, "{c}"),
		}
	}
}

#[rustfmt::skip]
impl Display for Instruction {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		use Instruction::*;
		match self {
			Label(l) => write!(f, "{}:", l.0),
			Line(row) => write!(f, "; line {row}"),
			PshC(c) => write!(f, "PshC     {c}"),
			PshV(v) => write!(f, "PshV     v{v}"),
			Psf(v) => write!(f, "Psf      v{v}"),
			Pga(g) => write!(f, "Pga      g{}", g.0),
			PshNull => write!(f, "PshNull"),
			PshR => write!(f, "PshR"),
			Str(s) => write!(f, "Str      {s:?}"),
			Pop => write!(f, "Pop"),
			PopV(v) => write!(f, "PopV     v{v}"),
			SetV(v, c) => write!(f, "SetV     v{v}, {c}"),
			CpyV { dst, src } => write!(f, "CpyV     v{dst}, v{src}"),
			Rdr(v) => write!(f, "Rdr      v{v}"),
			Wrt(v) => write!(f, "Wrt      v{v}"),
			CpyVtoR(v) => write!(f, "CpyVtoR  v{v}"),
			CpyRtoV(v) => write!(f, "CpyRtoV  v{v}"),
			Conv { dst, src, from, to } => write!(f, "Conv     v{dst}, v{src} ({from} -> {to})"),
			Neg { var, kind } => write!(f, "Neg{kind:<5} v{var}"),
			Not(v) => write!(f, "Not      v{v}"),
			BNot { var, kind } => write!(f, "BNot{kind:<4} v{var}"),
			IncV { var, kind, delta } => write!(f, "IncV{kind:<4} v{var}, {delta}"),
			Inc { kind, delta } => write!(f, "Inc{kind:<5} {delta}"),
			Math { op, kind, dst, lhs, rhs } => {
				let name = match op {
					MathOp::Add => "Add",
					MathOp::Sub => "Sub",
					MathOp::Mul => "Mul",
					MathOp::Div => "Div",
					MathOp::Mod => "Mod",
				};
				write!(f, "{name}{kind:<5} v{dst}, {lhs}, {rhs}")
			}
			Bits { op, kind, dst, lhs, rhs } => {
				let name = match op {
					BitOp::And => "BAnd",
					BitOp::Or => "BOr",
					BitOp::Xor => "BXor",
					BitOp::Shl => "Bsll",
					BitOp::Shr => "Bsrl",
					BitOp::Sar => "Bsra",
				};
				write!(f, "{name}{kind:<4} v{dst}, {lhs}, {rhs}")
			}
			Cmp { kind, lhs, rhs } => write!(f, "Cmp{kind:<5} {lhs}, {rhs}"),
			CmpHandle { lhs, rhs } => write!(f, "CmpPtr   v{lhs}, v{rhs}"),
			Test(op) => {
				let name = match op {
					TestOp::Zero => "Tz",
					TestOp::NotZero => "Tnz",
					TestOp::Negative => "Ts",
					TestOp::NotNegative => "Tns",
					TestOp::Positive => "Tp",
					TestOp::NotPositive => "Tnp",
				};
				write!(f, "{name}")
			}
			Jmp(l) => write!(f, "Jmp      {}", l.0),
			Jz(l) => write!(f, "Jz       {}", l.0),
			Jnz(l) => write!(f, "Jnz      {}", l.0),
			Js(l) => write!(f, "Js       {}", l.0),
			Jns(l) => write!(f, "Jns      {}", l.0),
			Jp(l) => write!(f, "Jp       {}", l.0),
			Jnp(l) => write!(f, "Jnp      {}", l.0),
			JmpP(v) => write!(f, "JmpP     v{v}"),
			Ret => write!(f, "Ret"),
			Call(id) => write!(f, "Call     f{}", id.0),
			CallSys(id) => write!(f, "CallSys  f{}", id.0),
			Alloc { var, ty } => write!(f, "Alloc    v{var}, t{}", ty.0),
			Free(v) => write!(f, "Free     v{v}"),
			RefCpy(v) => write!(f, "RefCpy   v{v}"),
			RefCpyV { dst, src } => write!(f, "RefCpyV  v{dst}, v{src}"),
			CopyObj(v) => write!(f, "Copy     v{v}"),
			Deref => write!(f, "Deref"),
			ChkRef => write!(f, "ChkRef"),
			ChkRefV(v) => write!(f, "ChkRefV  v{v}"),
			Field { index, object } => write!(f, "Field    {index}{}", if *object { " (object)" } else { "" }),
		}
	}
}

impl Display for ScriptFunction {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result {
		writeln!(f, "{}: stack {} dwords, temps {}/{}", self.name, self.stack_size, self.temps.allocated, self.temps.released)?;
		let mut lines = self.lines.iter().peekable();
		for (pc, instruction) in self.code.iter().enumerate() {
			if let Some(&(_, row)) = lines.next_if(|&&(at, _)| at == pc) {
				writeln!(f, "               ; line {row}")?;
			}
			writeln!(f, "  {pc:>4}  {instruction}")?;
		}
		Ok(())
	}
}
