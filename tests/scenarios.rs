#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use zangel::{Engine, EngineConfig, Module, ZangelError, builtins::Output, bytecode::{ConstValue, Instruction, ScriptFunction}, error::compiler::{CollectingSink, Severity}, types::{FuncId, FunctionKind, ObjectFlags}, vm::{Value, native}};

	fn engine() -> (Engine, Output) {
		let output = Output::capture();
		(Engine::with_output(EngineConfig::default(), output.clone()).unwrap(), output)
	}

	fn build(engine: &mut Engine, source: &str) -> (Result<Module, ZangelError>, CollectingSink) {
		let mut sink = CollectingSink::default();
		let module = engine.build_with_sink("scenario", source, &mut sink);
		(module, sink)
	}

	fn code(engine: &Engine, module: &Module, name: &str) -> Rc<ScriptFunction> {
		let id = module.functions(name)[0];
		match &engine.registry().function(id).kind {
			FunctionKind::Script(Some(code)) => code.clone(),
			_ => panic!("{name} was not compiled"),
		}
	}

	/// A reference type `Obj` with an `int v` field, a default factory and a
	/// copy behaviour. `prop` only has a set accessor storing into `v`.
	fn register_obj(engine: &mut Engine) -> FuncId {
		let ty = engine.register_object_type("Obj", 8, ObjectFlags::REF).unwrap();
		engine.register_object_property(ty, "int v").unwrap();
		engine
			.register_object_behaviour(
				ty,
				zangel::types::Behaviour::Factory,
				"Obj@ f()",
				native(move |call| Ok(Value::Object(Some(call.new_object(ty))))),
			)
			.unwrap();
		engine
			.register_object_method(
				ty,
				"void set_prop(int)",
				native(|call| {
					let value = call.int(0)?;
					call.this()?.borrow_mut().fields[0] = Value::Int(value);
					Ok(Value::Void)
				}),
			)
			.unwrap();
		engine
			.register_object_method(
				ty,
				"Obj& opAssign(const Obj &in)",
				native(|call| {
					let value = call.object(0)?.borrow().fields[0].clone();
					let this = call.this()?;
					this.borrow_mut().fields[0] = value;
					Ok(Value::Object(Some(this)))
				}),
			)
			.unwrap()
	}

	#[test]
	fn constant_initializers_are_folded() {
		let (mut engine, _) = engine();
		let (module, _) = build(&mut engine, "int f() { int x = 2 + 3 * 4; return x; }");
		let module = module.unwrap();
		let f = code(&engine, &module, "f");
		assert!(f.code.iter().any(|i| matches!(i, Instruction::SetV(_, ConstValue::Int(14)))), "{f}");
		assert!(!f.code.iter().any(|i| matches!(i, Instruction::Math { .. })), "{f}");
		assert_eq!(engine.execute(&module, "f", Vec::new()).unwrap().as_int(), Some(14));
	}

	#[test]
	fn set_only_property() {
		let (mut engine, _) = engine();
		register_obj(&mut engine);
		let (module, _) = build(&mut engine, "int f() { Obj@ obj = Obj(); obj.prop = 5; return obj.v; }");
		let module = module.unwrap();
		assert_eq!(engine.execute(&module, "f", Vec::new()).unwrap().as_int(), Some(5));

		let (module, sink) = build(&mut engine, "void g() { Obj@ obj = Obj(); int y = obj.prop; y += 1; obj.prop = y; }");
		assert!(matches!(module, Err(ZangelError::CompileErrors(1))));
		let errors: Vec<_> = sink.messages.iter().filter(|d| d.severity == Severity::Error).collect();
		assert_eq!(errors.len(), 1, "{:?}", sink.messages);
		assert_eq!(errors[0].message, "The property has no get accessor");
	}

	#[test]
	fn switch_dispatch() {
		let (mut engine, output) = engine();
		let source = "
			void f(int v) {
				switch (v) {
				case 1: print(10); break;
				case 2: print(20); break;
				case 3: print(30); break;
				case 100: print(1000); break;
				default: print(-1);
				}
			}";
		let (module, _) = build(&mut engine, source);
		let module = module.unwrap();
		for v in [2, 50, 100, 1] {
			engine.execute(&module, "f", vec![Value::Int(v)]).unwrap();
		}
		assert_eq!(output.captured(), "20\n-1\n1000\n10\n");

		let (module, sink) = build(&mut engine, "void g(int v) { switch (v) { case 1: case 2: break; case 3: case 2: break; } }");
		assert!(module.is_err());
		let duplicate = sink.messages.iter().find(|d| d.message == "Duplicate switch case").unwrap();
		assert_eq!((duplicate.row, duplicate.col), (1, 61));
	}

	#[test]
	fn handle_and_value_assignment() {
		let (mut engine, output) = engine();
		let assign = register_obj(&mut engine);
		let source = "
			void handles() { Obj@ a = Obj(); Obj@ b = Obj(); b.v = 3; a @= b; b.v = 4; print(a.v); }
			void copies() { Obj@ a = Obj(); Obj@ b = Obj(); b.v = 3; a = b; b.v = 4; print(a.v); }";
		let (module, sink) = build(&mut engine, source);
		let module = module.unwrap_or_else(|e| panic!("{e}: {:?}", sink.messages));

		let handles = code(&engine, &module, "handles");
		assert!(handles.code.iter().any(|i| matches!(i, Instruction::RefCpyV { .. } | Instruction::RefCpy(_))), "{handles}");
		assert!(!handles.code.iter().any(|i| matches!(i, Instruction::CallSys(f) if *f == assign)), "{handles}");
		let copies = code(&engine, &module, "copies");
		assert!(copies.code.iter().any(|i| matches!(i, Instruction::CallSys(f) if *f == assign)), "{copies}");

		engine.execute(&module, "handles", Vec::new()).unwrap();
		engine.execute(&module, "copies", Vec::new()).unwrap();
		assert_eq!(output.captured(), "4\n3\n");
	}

	#[test]
	fn temporaries_are_balanced() {
		let (mut engine, _) = engine();
		let source = "
			int twice(int a) { return a * 2; }
			string greet(const string &in name) { return \"hello \" + name + \"!\"; }
			void out(int &out a) { a = 7; }
			int main() {
				int total = 0;
				for (int i = 0; i < 10; i++) {
					total += i % 3 == 0 ? twice(i) : -i;
					if (total > 20 && !(i < 5 || i > 8))
						break;
				}
				int[] values(3);
				values[1] = twice(values[0] + 1);
				int o;
				out(o);
				string s = greet(\"world\");
				switch (total & 3) { case 0: total++; case 1: total--; break; default: total = 1; }
				return total + values[1] + o + int(s.length());
			}";
		let (module, sink) = build(&mut engine, source);
		let module = module.unwrap_or_else(|e| panic!("{e}: {:?}", sink.messages));
		for name in ["twice", "greet", "out", "main"] {
			let f = code(&engine, &module, name);
			assert_eq!(f.temps.allocated, f.temps.released, "{f}");
		}
		assert!(engine.execute(&module, "main", Vec::new()).unwrap().as_int().is_some());
	}
}
