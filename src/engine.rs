//! The host facing side: registration, building modules and running them.

use std::{fs::read_to_string, io::Write, path::Path};

use anyhow::Context;

use crate::{ZangelError, builtins::{self, Output}, bytecode::ConstValue, compiler::{Compiler, GlobalInit, ScriptScope}, error::{compiler::{CollectingSink, CompileErrorType, Diagnostic, MessageSink, Severity, StderrSink}, registry::RegistryError}, parser::Parser, scanner::{Scanner, TokenKind}, statement::{Declaration, EnumDecl, FunctionDecl, Initializer, VariableDecl}, types::{Behaviour, DataType, FuncId, FunctionDescriptor, FunctionKind, GlobalProperty, ObjectFlags, ObjectProperty, ParamModifier, Parameter, TypeId, TypeRegistry}, vm::{NativeFn, Value, Vm}};

/// Name of the function running a module's global initializers.
const INIT_FUNCTION: &str = "$init";
/// Name of the function wrapping a statement typed at the prompt.
const PROMPT_FUNCTION: &str = "$prompt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
	/// Report warnings as errors, failing the build
	pub warnings_as_errors: bool,
	/// Nested script calls allowed before the VM gives up
	pub max_call_depth:     usize,
	/// Register `string` and `print`
	pub builtins:           bool,
}

impl Default for EngineConfig {
	fn default() -> Self { Self { warnings_as_errors: false, max_call_depth: 256, builtins: true } }
}

/// A built script: the functions and globals it declared.
#[derive(Debug, Clone)]
pub struct Module {
	name:  String,
	scope: ScriptScope,
}

impl Module {
	pub fn name(&self) -> &str { &self.name }

	/// Every overload the module declares under `name`.
	pub fn functions(&self, name: &str) -> &[FuncId] { self.scope.functions.get(name).map_or(&[], Vec::as_slice) }
}

/// Keeps one error count per build across every compiler it runs.
struct BuildSink<'s> {
	sink:   &'s mut dyn MessageSink,
	errors: usize,
}

impl MessageSink for BuildSink<'_> {
	fn message(&mut self, diagnostic: Diagnostic) {
		if diagnostic.severity == Severity::Error {
			self.errors += 1;
		}
		self.sink.message(diagnostic)
	}
}

impl BuildSink<'_> {
	fn report(&mut self, section: &str, (row, col): (usize, usize), message: CompileErrorType) {
		self.message(Diagnostic { section: section.to_string(), row, col, severity: message.severity(), message: message.to_string() });
	}
}

pub struct Engine {
	registry: TypeRegistry,
	config:   EngineConfig,
	/// Storage of every global, host and script ones alike
	globals:  Vec<Value>,
}

impl Engine {
	/// An engine printing to stdout.
	pub fn new(config: EngineConfig) -> Result<Self, ZangelError> { Self::with_output(config, Output::Stdout) }

	/// An engine whose `print` writes to `output`.
	pub fn with_output(config: EngineConfig, output: Output) -> Result<Self, ZangelError> {
		let mut registry = TypeRegistry::new();
		if config.builtins {
			builtins::register_string(&mut registry)?;
			builtins::register_print(&mut registry, &output)?;
		}
		Ok(Self { registry, config, globals: Vec::new() })
	}

	pub fn registry(&self) -> &TypeRegistry { &self.registry }

	pub fn register_object_type(&mut self, name: &str, size: usize, flags: ObjectFlags) -> Result<TypeId, ZangelError> {
		if flags.contains(ObjectFlags::REF) == flags.contains(ObjectFlags::VALUE) {
			return Err(RegistryError::InvalidBehaviour("REF or VALUE".into(), name.to_string()).into());
		}
		Ok(self.registry.add_object_type(name, flags, size)?)
	}

	/// Registers a field, `"int x"`.
	pub fn register_object_property(&mut self, ty: TypeId, decl: &str) -> Result<(), ZangelError> {
		let (ty_decl, name) = Parser::parse_property(decl).map_err(RegistryError::from)?;
		let dt = self.registry.resolve(&ty_decl)?;
		let ot = self.registry.object_type_mut(ty);
		if ot.property(name).is_some() {
			return Err(RegistryError::AlreadyRegistered(name.to_string()).into());
		}
		let index = ot.properties.len();
		ot.properties.push(ObjectProperty { name: name.to_string(), ty: dt, index });
		Ok(())
	}

	/// Registers a method, `"int get_x() const"`. An `opAssign` taking the
	/// type itself becomes the copy behaviour.
	pub fn register_object_method(&mut self, ty: TypeId, decl: &str, f: NativeFn) -> Result<FuncId, ZangelError> {
		let desc = self.native_function(decl, Some(ty), f)?;
		let is_copy = desc.name == "opAssign" && desc.params.len() == 1 && desc.params[0].ty.type_id() == Some(ty);
		let id = self.registry.add_method(ty, desc);
		if is_copy {
			self.registry.object_type_mut(ty).beh.copy = Some(id);
		}
		Ok(id)
	}

	/// Registers a factory, constructor or cast. Factories are declared
	/// returning a handle, `"Obj@ f(int)"`, constructors returning `void`.
	pub fn register_object_behaviour(
		&mut self,
		ty: TypeId,
		behaviour: Behaviour,
		decl: &str,
		f: NativeFn,
	) -> Result<FuncId, ZangelError> {
		let is_ref = self.registry.object_type(ty).flags.contains(ObjectFlags::REF);
		let invalid = || RegistryError::InvalidBehaviour(decl.to_string(), ty.0.to_string());
		match behaviour {
			Behaviour::Factory => {
				let desc = self.native_function(decl, None, f)?;
				if !is_ref || desc.return_type.type_id() != Some(ty) || !desc.return_type.is_object_handle() {
					return Err(invalid().into());
				}
				let is_default = desc.params.is_empty();
				let id = self.registry.add_function(desc);
				let beh = &mut self.registry.object_type_mut(ty).beh;
				beh.factories.push(id);
				if is_default {
					beh.default_factory = Some(id);
				}
				Ok(id)
			}
			Behaviour::Construct => {
				let desc = self.native_function(decl, Some(ty), f)?;
				if is_ref || desc.return_type.token() != TokenKind::Void {
					return Err(invalid().into());
				}
				let is_default = desc.params.is_empty();
				let id = self.registry.add_function(desc);
				let beh = &mut self.registry.object_type_mut(ty).beh;
				if is_default {
					beh.default_constructor = Some(id);
				} else {
					beh.constructors.push(id);
				}
				Ok(id)
			}
			cast => {
				let desc = self.native_function(decl, Some(ty), f)?;
				if !desc.params.is_empty() {
					return Err(invalid().into());
				}
				let id = self.registry.add_function(desc);
				self.registry.object_type_mut(ty).beh.operators.push((cast, id));
				Ok(id)
			}
		}
	}

	pub fn register_global_function(&mut self, decl: &str, f: NativeFn) -> Result<FuncId, ZangelError> {
		let desc = self.native_function(decl, None, f)?;
		Ok(self.registry.add_global_function(desc))
	}

	/// Registers a global variable, `"int counter"`, starting out as `value`.
	pub fn register_global_property(&mut self, decl: &str, value: Value) -> Result<(), ZangelError> {
		let (ty_decl, name) = Parser::parse_property(decl).map_err(RegistryError::from)?;
		let ty = self.registry.resolve(&ty_decl)?;
		if self.registry.find_global(name).is_some() {
			return Err(RegistryError::AlreadyRegistered(name.to_string()).into());
		}
		let id = self.registry.add_global(GlobalProperty { name: name.to_string(), ty, constant: None, is_host: true });
		self.grow_globals();
		self.globals[id.0] = value;
		Ok(())
	}

	/// The current value of a host global.
	pub fn global(&self, name: &str) -> Option<&Value> { self.registry.find_global(name).and_then(|id| self.globals.get(id.0)) }

	pub fn register_enum(&mut self, name: &str) -> Result<TypeId, ZangelError> { Ok(self.registry.add_enum(name)?) }

	pub fn register_enum_value(&mut self, ty: TypeId, name: &str, value: i64) -> Result<(), ZangelError> {
		Ok(self.registry.add_enum_value(ty, name, value)?)
	}

	/// Makes `f` turn string literals into objects of `ty`. It gets the text
	/// as its only argument.
	pub fn register_string_factory(&mut self, ty: TypeId, f: NativeFn) -> Result<FuncId, ZangelError> {
		let mut dt = DataType::create_object(self.registry.type_ref(ty), true);
		if self.registry.type_ref(ty).flags.contains(ObjectFlags::REF) {
			dt.make_handle(true, false).map_err(RegistryError::from)?;
		}
		let desc = FunctionDescriptor::new("$string", dt, vec![Parameter::by_value(DataType::create_any(true))], None).native(f);
		let id = self.registry.add_function(desc);
		self.registry.set_string_factory(id);
		Ok(id)
	}

	fn native_function(&mut self, decl: &str, object: Option<TypeId>, f: NativeFn) -> Result<FunctionDescriptor, ZangelError> {
		let signature = Parser::parse_signature(decl).map_err(RegistryError::from)?;
		let mut return_type = self.registry.resolve(&signature.return_type)?;
		if signature.returns_reference {
			return_type.make_reference(true).map_err(RegistryError::from)?;
		}
		let params = self.parameters(&signature)?;
		Ok(FunctionDescriptor::new(signature.name, return_type, params, object).read_only(signature.is_const).native(f))
	}

	fn parameters(&mut self, decl: &FunctionDecl<'_>) -> Result<Vec<Parameter>, RegistryError> {
		decl.params
			.iter()
			.map(|p| {
				let mut ty = self.registry.resolve(&p.ty)?;
				let modifier = p.reference.unwrap_or_default();
				if modifier != ParamModifier::None {
					ty.make_reference(true)?;
				}
				Ok(Parameter::new(ty, modifier))
			})
			.collect()
	}

	fn grow_globals(&mut self) {
		for i in self.globals.len()..self.registry.global_count() {
			let ty = self.registry.global(crate::types::GlobalId(i)).ty;
			self.globals.push(Value::default_for(&ty));
		}
	}
}

impl Engine {
	/// Builds a module, printing messages to stderr.
	pub fn build(&mut self, name: &str, source: &str) -> Result<Module, ZangelError> {
		self.build_with_sink(name, source, &mut StderrSink)
	}

	/// Parses the source, registers its declarations, compiles every function
	/// and runs the global initializers.
	pub fn build_with_sink(&mut self, name: &str, source: &str, sink: &mut dyn MessageSink) -> Result<Module, ZangelError> {
		let mut sink = BuildSink { sink, errors: 0 };
		let tokens = Scanner::new(source).scan_tokens();
		let mut parser = Parser::new(tokens);
		let script = match parser.parse() {
			Ok(script) => script,
			Err(e) => {
				for error in parser.errors() {
					sink.sink.message(Diagnostic {
						section:  name.to_string(),
						row:      error.row,
						col:      error.col,
						severity: Severity::Error,
						message:  error.r#type.to_string(),
					});
				}
				return Err(e);
			}
		};

		let mut scope = ScriptScope::default();
		for declaration in &script.declarations {
			if let Declaration::Enum(decl) = declaration {
				self.declare_enum(name, decl, &scope, &mut sink);
			}
		}
		let mut functions = Vec::new();
		for declaration in &script.declarations {
			if let Declaration::Function(decl) = declaration
				&& let Some(id) = self.declare_function(name, decl, &mut scope, &mut sink)
			{
				functions.push((decl, id));
			}
		}
		let mut inits = Vec::new();
		for declaration in &script.declarations {
			if let Declaration::Variable(decl) = declaration {
				self.declare_globals(name, decl, &mut scope, &mut inits, &mut sink);
			}
		}
		self.grow_globals();

		let mut init = None;
		if !inits.is_empty() {
			let mut compiler = Compiler::new(&mut self.registry, &scope, &mut sink, name)
				.warnings_as_errors(self.config.warnings_as_errors);
			if let Some(code) = compiler.compile_globals(INIT_FUNCTION, &inits) {
				let mut desc = FunctionDescriptor::new(INIT_FUNCTION, DataType::default(), Vec::new(), None);
				desc.kind = FunctionKind::Script(Some(code.into()));
				init = Some(self.registry.add_function(desc));
			}
		}
		for (decl, id) in functions {
			let mut compiler = Compiler::new(&mut self.registry, &scope, &mut sink, name)
				.warnings_as_errors(self.config.warnings_as_errors);
			if let Some(code) = compiler.compile_function(decl, id) {
				self.registry.function_mut(id).kind = FunctionKind::Script(Some(code.into()));
			}
		}
		if sink.errors > 0 {
			return Err(ZangelError::CompileErrors(sink.errors));
		}
		if let Some(init) = init {
			Vm::new(&self.registry, &mut self.globals, self.config.max_call_depth).call(init, Vec::new())?;
		}
		Ok(Module { name: name.to_string(), scope })
	}

	fn declare_enum(&mut self, section: &str, decl: &EnumDecl<'_>, scope: &ScriptScope, sink: &mut BuildSink<'_>) {
		let pos = (decl.row, decl.col);
		let Ok(ty) = self.registry.add_enum(decl.name) else {
			sink.report(section, pos, CompileErrorType::AlreadyDeclared(decl.name.to_string()));
			return;
		};
		let int = DataType::create_primitive(TokenKind::Int, true);
		let mut next = 0;
		for value in &decl.values {
			let pos = (value.row, value.col);
			if let Some(expr) = &value.value {
				let mut compiler = Compiler::new(&mut self.registry, scope, sink, section);
				match compiler.evaluate_constant(expr, Some(&int)) {
					Some(ty) => next = ty.constant.as_i64(),
					None => sink.report(section, pos, CompileErrorType::ExpectedConstant),
				}
			}
			if self.registry.add_enum_value(ty, value.name, next).is_err() {
				sink.report(section, pos, CompileErrorType::AlreadyDeclared(value.name.to_string()));
			}
			next += 1;
		}
	}

	fn declare_function(
		&mut self,
		section: &str,
		decl: &FunctionDecl<'_>,
		scope: &mut ScriptScope,
		sink: &mut BuildSink<'_>,
	) -> Option<FuncId> {
		let pos = (decl.row, decl.col);
		if decl.returns_reference {
			sink.report(section, pos, CompileErrorType::DataTypeCantBe(format!("{}&", decl.return_type)));
			return None;
		}
		let return_type = match self.registry.resolve(&decl.return_type) {
			Ok(dt) => dt,
			Err(e) => {
				sink.report(section, pos, registration_message(e, &decl.return_type.to_string()));
				return None;
			}
		};
		let params = match self.parameters(decl) {
			Ok(params) => params,
			Err(e) => {
				sink.report(section, pos, registration_message(e, decl.name));
				return None;
			}
		};
		let overloads = scope.functions.entry(decl.name.to_string()).or_default();
		let same_params = |id: &FuncId| {
			let other = &self.registry.function(*id).params;
			other.len() == params.len() && other.iter().zip(&params).all(|(a, b)| a.ty == b.ty && a.modifier == b.modifier)
		};
		if overloads.iter().any(same_params) {
			sink.report(section, pos, CompileErrorType::AlreadyDeclared(decl.name.to_string()));
			return None;
		}
		let id = self.registry.add_function(FunctionDescriptor::new(decl.name, return_type, params, None));
		overloads.push(id);
		Some(id)
	}

	/// Registers the globals of one declaration. `const` primitives with a
	/// constant initializer become pure constants, the others are queued for
	/// the initialization function.
	fn declare_globals<'s, 'a>(
		&mut self,
		section: &str,
		decl: &'s VariableDecl<'a>,
		scope: &mut ScriptScope,
		inits: &mut Vec<GlobalInit<'s, 'a>>,
		sink: &mut BuildSink<'_>,
	) {
		let pos = (decl.ty.base.row, decl.ty.base.col);
		let ty = match self.registry.resolve(&decl.ty) {
			Ok(dt) => dt,
			Err(e) => {
				sink.report(section, pos, registration_message(e, &decl.ty.to_string()));
				return;
			}
		};
		if !ty.can_be_instantiated(&self.registry) {
			sink.report(section, pos, CompileErrorType::DataTypeCantBe(ty.format(&self.registry)));
			return;
		}
		for var in &decl.vars {
			let pos = (var.row, var.col);
			if scope.globals.contains_key(var.name) || scope.functions.contains_key(var.name) {
				sink.report(section, pos, CompileErrorType::AlreadyDeclared(var.name.to_string()));
				continue;
			}
			let constant = match &var.init {
				Initializer::Expression(expr) if ty.is_read_only() && ty.is_primitive() => {
					self.constant_initializer(section, expr, &ty, scope)
				}
				_ => None,
			};
			let global = GlobalProperty { name: var.name.to_string(), ty, constant, is_host: false };
			let id = self.registry.add_global(global);
			scope.globals.insert(var.name.to_string(), id);
			if constant.is_none() {
				inits.push(GlobalInit { id, init: &var.init, row: var.row, col: var.col });
			}
		}
	}

	/// Evaluates quietly, an initializer that isn't constant is reported
	/// when the initialization function compiles it.
	fn constant_initializer(
		&mut self,
		section: &str,
		expr: &crate::parser::expression::Expression<'_>,
		ty: &DataType,
		scope: &ScriptScope,
	) -> Option<ConstValue> {
		let mut quiet = CollectingSink::default();
		let mut compiler = Compiler::new(&mut self.registry, scope, &mut quiet, section);
		let value = compiler.evaluate_constant(expr, Some(ty))?;
		(compiler.errors() == 0).then_some(value.constant)
	}
}

/// What the build reports for a type in a declaration it can't resolve.
fn registration_message(e: RegistryError, decl: &str) -> CompileErrorType {
	match e {
		RegistryError::UnknownType(name) => CompileErrorType::UnknownType(name),
		_ => CompileErrorType::DataTypeCantBe(decl.to_string()),
	}
}

impl Engine {
	/// Calls a function of the module. With overloads, the first one taking
	/// as many arguments is picked.
	pub fn execute(&mut self, module: &Module, name: &str, args: Vec<Value>) -> Result<Value, ZangelError> {
		let registry = &self.registry;
		let id = module
			.functions(name)
			.iter()
			.copied()
			.find(|&f| registry.function(f).params.len() == args.len())
			.ok_or_else(|| crate::error::runtime::RuntimeError::NoFunction(name.to_string()))?;
		Ok(Vm::new(registry, &mut self.globals, self.config.max_call_depth).call(id, args)?)
	}

	/// The bytecode of every function the module compiled, in declaration
	/// order.
	pub fn disassemble(&self, module: &Module) -> String {
		let mut ids: Vec<FuncId> = module.scope.functions.values().flatten().copied().collect();
		ids.sort_by_key(|id| id.0);
		let mut out = String::new();
		for id in ids {
			if let FunctionKind::Script(Some(code)) = &self.registry.function(id).kind {
				out.push_str(&code.to_string());
				out.push('\n');
			}
		}
		out
	}

	/// Builds a script file and runs `entry`, printing what it returns.
	pub fn run_file<P: AsRef<Path>>(&mut self, path: P, entry: &str) -> Result<(), ZangelError> {
		let path = path.as_ref();
		let source = read_to_string(path).context("Failed open source file")?;
		let module = self.build(&path.display().to_string(), &source)?;
		let result = self.execute(&module, entry, Vec::new())?;
		if !matches!(result, Value::Void) {
			println!("{result}");
		}
		Ok(())
	}

	/// Run the REPL prompt. Declarations are kept for the following lines,
	/// anything else runs as the body of a function.
	pub fn run_prompt(&mut self) {
		let mut declarations = String::new();
		let mut input = String::new();
		let stdin = std::io::stdin();
		loop {
			input.clear();
			print!("> ");
			if let Err(e) = std::io::stdout().flush() {
				eprintln!("Failed flush: {e}");
			}
			match stdin.read_line(&mut input) {
				Ok(0) => {
					println!("\nExited zangel repl");
					break;
				}
				Ok(_) => {}
				Err(e) => {
					eprintln!("Failed read line: {e}");
					continue;
				}
			}
			let line = input.trim();
			if line.is_empty() {
				continue;
			}
			if let Err(e) = self.run_line(&mut declarations, line) {
				eprintln!("Failed run prompt: {e}");
			}
		}
	}

	fn run_line(&mut self, declarations: &mut String, line: &str) -> Result<(), ZangelError> {
		let is_declaration = Parser::new(Scanner::new(line).scan_tokens()).parse().is_ok_and(|s| !s.declarations.is_empty());
		if is_declaration {
			let source = format!("{declarations}\n{line}");
			self.build("repl", &source)?;
			declarations.push('\n');
			declarations.push_str(line);
			return Ok(());
		}
		let source = format!("{declarations}\nvoid {PROMPT_FUNCTION}() {{\n{line}\n}}");
		let module = self.build("repl", &source)?;
		self.execute(&module, PROMPT_FUNCTION, Vec::new())?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vm::native;

	fn engine() -> (Engine, Output) {
		let output = Output::capture();
		(Engine::with_output(EngineConfig::default(), output.clone()).unwrap(), output)
	}

	fn build(engine: &mut Engine, source: &str) -> (Result<Module, ZangelError>, CollectingSink) {
		let mut sink = CollectingSink::default();
		let module = engine.build_with_sink("test", source, &mut sink);
		(module, sink)
	}

	#[test]
	fn globals_are_initialized_at_build() {
		let (mut engine, output) = engine();
		let (module, sink) = build(&mut engine, "int counter = 40; string name = \"zangel\"; void main() { counter += 2; print(counter); print(name); }");
		let module = module.unwrap_or_else(|e| panic!("{e}: {:?}", sink.messages));
		engine.execute(&module, "main", Vec::new()).unwrap();
		assert_eq!(output.captured(), "42\nzangel\n");
	}

	#[test]
	fn enums_number_their_values() {
		let (mut engine, _) = engine();
		let (module, _) = build(&mut engine, "enum Color { Red, Green = 5, Blue } int f() { return Blue + Color::Red; }");
		let module = module.unwrap();
		assert_eq!(engine.execute(&module, "f", Vec::new()).unwrap().as_int(), Some(6));
	}

	#[test]
	fn const_globals_are_folded() {
		let (mut engine, _) = engine();
		let (module, _) = build(&mut engine, "const int SIZE = 4 * 4; int f() { return SIZE + 1; }");
		let module = module.unwrap();
		assert_eq!(engine.execute(&module, "f", Vec::new()).unwrap().as_int(), Some(17));
		assert!(!engine.disassemble(&module).contains("Pga"));
	}

	#[test]
	fn errors_fail_the_build() {
		let (mut engine, _) = engine();
		let (module, sink) = build(&mut engine, "void f() { x = 1; } void g() { y(); }");
		assert!(matches!(module, Err(ZangelError::CompileErrors(n)) if n >= 2));
		assert_eq!(sink.messages[0].to_string(), "test (1, 12) : Error   : 'x' is not declared");

		let (module, sink) = build(&mut engine, "void f( { }");
		assert!(matches!(module, Err(ZangelError::ParserErrors(_))));
		assert!(!sink.messages.is_empty());
	}

	#[test]
	fn warnings_as_errors() {
		let config = EngineConfig { warnings_as_errors: true, ..EngineConfig::default() };
		let mut engine = Engine::with_output(config, Output::capture()).unwrap();
		let (module, _) = build(&mut engine, "void f() { uint u = -1; }");
		assert!(matches!(module, Err(ZangelError::CompileErrors(1))));
	}

	#[test]
	fn host_functions_and_globals() {
		let (mut engine, _) = engine();
		engine.register_global_function("int twice(int)", native(|call| Ok(Value::Int(call.int(0)? * 2)))).unwrap();
		engine.register_global_property("int limit", Value::Int(5)).unwrap();
		let (module, _) = build(&mut engine, "int f() { limit = twice(limit); return limit; }");
		let module = module.unwrap();
		assert_eq!(engine.execute(&module, "f", Vec::new()).unwrap().as_int(), Some(10));
		assert_eq!(engine.global("limit").and_then(Value::as_int), Some(10));
	}

	#[test]
	fn registration_is_checked() {
		let (mut engine, _) = engine();
		assert!(engine.register_object_type("Both", 4, ObjectFlags::REF | ObjectFlags::VALUE).is_err());
		assert!(engine.register_global_function("void f(Unknown)", native(|_| Ok(Value::Void))).is_err());
		let ty = engine.register_object_type("Vec2", 8, ObjectFlags::VALUE | ObjectFlags::POD).unwrap();
		engine.register_object_property(ty, "float x").unwrap();
		assert!(engine.register_object_property(ty, "float x").is_err());
		let factory = engine.register_object_behaviour(ty, Behaviour::Factory, "Vec2@ f()", native(|_| Ok(Value::Void)));
		assert!(factory.is_err());
	}

	#[test]
	fn deep_recursion_overflows() {
		let config = EngineConfig { max_call_depth: 16, ..EngineConfig::default() };
		let mut engine = Engine::with_output(config, Output::capture()).unwrap();
		let (module, _) = build(&mut engine, "int f(int n) { return n == 0 ? 0 : f(n - 1) + 1; }");
		let module = module.unwrap();
		assert_eq!(engine.execute(&module, "f", vec![Value::Int(10)]).unwrap().as_int(), Some(10));
		assert!(matches!(
			engine.execute(&module, "f", vec![Value::Int(100)]),
			Err(ZangelError::Runtime(crate::error::runtime::RuntimeError::StackOverflow))
		));
	}
}
