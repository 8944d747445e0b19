#[cfg(test)]
mod tests {
	use zangel::{Engine, EngineConfig, ZangelError, builtins::Output, error::compiler::CollectingSink, types::{Behaviour, ObjectFlags, TypeId}, vm::{Value, native}};

	/// `Vec2`, a POD value type with two float fields, a constructor, a sum
	/// method and an implicit cast to double.
	fn register_vec2(engine: &mut Engine) -> TypeId {
		let ty = engine.register_object_type("Vec2", 8, ObjectFlags::VALUE | ObjectFlags::POD).unwrap();
		engine.register_object_property(ty, "float x").unwrap();
		engine.register_object_property(ty, "float y").unwrap();
		engine
			.register_object_behaviour(
				ty,
				Behaviour::Construct,
				"void f(float, float)",
				native(|call| {
					let (x, y) = (call.double(0)? as f32, call.double(1)? as f32);
					call.this()?.borrow_mut().fields = vec![Value::Float(x), Value::Float(y)];
					Ok(Value::Void)
				}),
			)
			.unwrap();
		engine
			.register_object_method(
				ty,
				"float sum() const",
				native(|call| {
					let this = call.this()?;
					let this = this.borrow();
					let sum = this.fields.iter().filter_map(Value::as_float).sum::<f32>();
					Ok(Value::Float(sum))
				}),
			)
			.unwrap();
		engine
			.register_object_behaviour(
				ty,
				Behaviour::ImplicitValueCast,
				"double f() const",
				native(|call| {
					let this = call.this()?;
					let this = this.borrow();
					Ok(Value::Double(this.fields.iter().filter_map(Value::as_double).sum()))
				}),
			)
			.unwrap();
		ty
	}

	/// `Counter`, a reference type made by a factory, with a running total.
	fn register_counter(engine: &mut Engine) -> TypeId {
		let ty = engine.register_object_type("Counter", 8, ObjectFlags::REF).unwrap();
		engine.register_object_property(ty, "int total").unwrap();
		engine
			.register_object_behaviour(
				ty,
				Behaviour::Factory,
				"Counter@ f()",
				native(move |call| Ok(Value::Object(Some(call.new_object(ty))))),
			)
			.unwrap();
		engine
			.register_object_method(
				ty,
				"void add(int)",
				native(|call| {
					let amount = call.int(0)?;
					let this = call.this()?;
					let total = this.borrow().fields[0].as_int().unwrap_or_default();
					this.borrow_mut().fields[0] = Value::Int(total + amount);
					Ok(Value::Void)
				}),
			)
			.unwrap();
		ty
	}

	fn engine() -> (Engine, Output) {
		let output = Output::capture();
		let mut engine = Engine::with_output(EngineConfig::default(), output.clone()).unwrap();
		register_vec2(&mut engine);
		register_counter(&mut engine);
		(engine, output)
	}

	fn call(engine: &mut Engine, source: &str, name: &str) -> Result<Value, ZangelError> {
		let mut sink = CollectingSink::default();
		let module = engine.build_with_sink("host", source, &mut sink).map_err(|e| {
			eprintln!("{:?}", sink.messages);
			e
		})?;
		engine.execute(&module, name, Vec::new())
	}

	#[test]
	fn value_types_construct_and_cast() {
		let (mut engine, _) = engine();
		let source = "double f() { Vec2 v(3, 4); v.x = v.x * 2; double d = v; return d + v.y; }";
		assert_eq!(call(&mut engine, source, "f").unwrap().as_double(), Some(14.0));
		let source = "float g() { Vec2 v(1, 2); return v.sum() + v.x; }";
		assert_eq!(call(&mut engine, source, "g").unwrap().as_float(), Some(4.0));
	}

	#[test]
	fn value_casts_apply_inside_operators() {
		let (mut engine, _) = engine();
		let source = "double f() { Vec2 v(1, 2); return v + 1.0; }";
		assert_eq!(call(&mut engine, source, "f").unwrap().as_double(), Some(4.0));
		let source = "double g() { Vec2 v(1, 2); return 10.0 - v * 2.0; }";
		assert_eq!(call(&mut engine, source, "g").unwrap().as_double(), Some(4.0));
		let source = "bool h() { Vec2 v(1, 2); return v > 2.5 && 3.5 >= v && !(v == 4.0); }";
		assert_eq!(call(&mut engine, source, "h").unwrap().as_bool(), Some(true));
	}

	#[test]
	fn operators_without_a_method_or_cast_are_rejected() {
		let (mut engine, _) = engine();
		let mut sink = CollectingSink::default();
		let result = engine.build_with_sink("host", "void f() { Vec2 a(1, 2); Vec2 b(3, 4); Vec2 c = a + b; }", &mut sink);
		assert!(result.is_err());
		assert!(sink.messages.iter().any(|d| d.message == "Illegal operation on 'Vec2'"), "{:?}", sink.messages);

		let mut sink = CollectingSink::default();
		let result = engine.build_with_sink("host", "int f() { Counter@ c = Counter(); return c + 1; }", &mut sink);
		assert!(result.is_err(), "{:?}", sink.messages);
	}

	#[test]
	fn explicit_handles_only_compare() {
		let (mut engine, _) = engine();
		let source = "bool f() { Counter@ c = Counter(); Counter@ d = c; return @c == @d && !(@c != @d); }";
		assert_eq!(call(&mut engine, source, "f").unwrap().as_bool(), Some(true));

		let mut sink = CollectingSink::default();
		let result = engine.build_with_sink("host", "void f() { Counter@ c = Counter(); int x = @c + 1; }", &mut sink);
		assert!(result.is_err());
		assert!(sink.messages.iter().any(|d| d.message == "Illegal operation on this datatype"), "{:?}", sink.messages);
	}

	#[test]
	fn value_types_are_copied() {
		let (mut engine, output) = engine();
		let source = "void f() { Vec2 v(1, 2); Vec2 w = v; w.x = 10; print(v.x); print(w.x); }";
		call(&mut engine, source, "f").unwrap();
		assert_eq!(output.captured(), "1\n10\n");
	}

	#[test]
	fn reference_types_are_shared_by_handles() {
		let (mut engine, _) = engine();
		let source = "int f() { Counter@ c = Counter(); Counter@ d = c; d.add(5); c.add(2); return c.total + (c is d ? 100 : 0); }";
		assert_eq!(call(&mut engine, source, "f").unwrap().as_int(), Some(107));
	}

	#[test]
	fn null_handles_fail_at_runtime() {
		let (mut engine, _) = engine();
		let source = "int f() { Counter@ c; c.add(1); return 0; }";
		assert!(matches!(call(&mut engine, source, "f"), Err(ZangelError::Runtime(_))));
	}

	#[test]
	fn bad_declarations_are_reported() {
		let (mut engine, _) = engine();
		let mut sink = CollectingSink::default();
		let result = engine.build_with_sink("host", "void f() { Vec2 v(1); Counter@ c = 3; }", &mut sink);
		assert!(matches!(result, Err(ZangelError::CompileErrors(n)) if n >= 2), "{:?}", sink.messages);
	}
}
