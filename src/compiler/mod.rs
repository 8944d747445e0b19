//! Turns function bodies into bytecode.
//!
//! The compiler walks the statement tree once, emitting code while it goes.
//! Each expression node produces an [`ExprContext`] which the parent merges
//! into its own. Errors never stop the walk: the failing expression is
//! replaced by a dummy constant, the error is reported to the
//! [`MessageSink`] and the function is dropped at the end.
//!
//! One `Compiler` compiles one function at a time. It borrows the registry
//! mutably because resolving `T[]` may instantiate the array template.

mod assignment;
mod call;
mod context;
mod conversion;
mod expression;
mod operators;
mod statement;
mod variables;

use std::collections::HashMap;

pub use context::{DeferredParam, ExprContext, PendingAccessor, TypeInfo};
use variables::{Scope, Slot};

use crate::{bytecode::{ByteCode, ConstValue, Instruction, Label, ScriptFunction, TempStats, Var}, error::{compiler::{CompileErrorType, Diagnostic, MessageSink, Severity}, registry::{DataTypeError, RegistryError}}, parser::expression::Expression, statement::{FunctionDecl, Initializer, TypeDecl}, types::{DataType, FuncId, GlobalId, ParamModifier, Parameter, TypeRegistry}};

/// Row and column of the node a message is about.
pub type Pos = (usize, usize);

/// Names a script module declares, visible to all of its functions.
#[derive(Debug, Clone, Default)]
pub struct ScriptScope {
	pub functions: HashMap<String, Vec<FuncId>>,
	pub globals:   HashMap<String, GlobalId>,
}

/// The initializer of one script global, compiled into the module's
/// initialization function.
#[derive(Debug, Clone, Copy)]
pub struct GlobalInit<'s, 'a> {
	pub id:   GlobalId,
	pub init: &'s Initializer<'a>,
	pub row:  usize,
	pub col:  usize,
}

/// What the compiler needs to know about a function it calls.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
	pub name:        String,
	pub params:      Vec<Parameter>,
	pub return_type: DataType,
}

pub struct Compiler<'c> {
	registry:             &'c mut TypeRegistry,
	module:               &'c ScriptScope,
	sink:                 &'c mut dyn MessageSink,
	section:              &'c str,
	warnings_as_errors:   bool,
	errors:               usize,
	return_type:          DataType,
	/// Global initializers and constant expressions can't assign or call
	in_global_expression: bool,
	scopes:               Vec<Scope>,
	slots:                Vec<Slot>,
	temps:                Vec<Var>,
	stack_size:           usize,
	object_vars:          Vec<Var>,
	next_label:           usize,
	break_labels:         Vec<Label>,
	continue_labels:      Vec<Label>,
	stats:                TempStats,
}

impl<'c> Compiler<'c> {
	pub fn new(
		registry: &'c mut TypeRegistry,
		module: &'c ScriptScope,
		sink: &'c mut dyn MessageSink,
		section: &'c str,
	) -> Self {
		Self {
			registry,
			module,
			sink,
			section,
			warnings_as_errors: false,
			errors: 0,
			return_type: DataType::default(),
			in_global_expression: false,
			scopes: Vec::new(),
			slots: Vec::new(),
			temps: Vec::new(),
			stack_size: 0,
			object_vars: Vec::new(),
			next_label: 0,
			break_labels: Vec::new(),
			continue_labels: Vec::new(),
			stats: TempStats::default(),
		}
	}

	/// Report warnings as errors, failing the function they occur in.
	pub fn warnings_as_errors(mut self, b: bool) -> Self {
		self.warnings_as_errors = b;
		self
	}

	/// Errors reported since the compiler was created.
	pub fn errors(&self) -> usize { self.errors }

	fn reset(&mut self, return_type: DataType) {
		self.return_type = return_type;
		self.in_global_expression = false;
		self.scopes.clear();
		self.slots.clear();
		self.temps.clear();
		self.stack_size = 0;
		self.object_vars.clear();
		self.next_label = 0;
		self.break_labels.clear();
		self.continue_labels.clear();
		self.stats = TempStats::default();
	}

	/// Compiles the body of a script function registered as `func`. Returns
	/// `None` when the body had errors.
	pub fn compile_function(&mut self, decl: &FunctionDecl<'_>, func: FuncId) -> Option<ScriptFunction> {
		let signature = self.signature(func);
		self.reset(signature.return_type);
		let errors = self.errors;
		let pos = (decl.row, decl.col);

		self.push_scope(false, false);
		let mut params = Vec::with_capacity(signature.params.len());
		for (param, param_decl) in signature.params.iter().zip(&decl.params) {
			let offset = self.allocate_variable(&param.ty, false);
			params.push(offset);
			let Some(name) = param_decl.name else {
				continue;
			};
			if self.find_variable(name).is_some() {
				self.report(CompileErrorType::AlreadyDeclared(name.to_string()), pos);
				continue;
			}
			let is_object = param.ty.is_object() && !param.ty.is_object_handle();
			let holds_reference = matches!(param.modifier, ParamModifier::Out | ParamModifier::InOut) && !is_object;
			let mut ty = param.ty;
			let _ = ty.make_reference(holds_reference);
			if let Some(scope) = self.scopes.last_mut() {
				scope.vars.push(variables::Variable {
					name: name.to_string(),
					ty,
					offset,
					is_initialized: param.modifier != ParamModifier::Out || is_object,
					constant: None,
					holds_reference,
				});
			}
		}

		let mut bc = ByteCode::new();
		let has_returned = match &decl.body {
			Some(body) => self.compile_statement_block(body, &mut bc, false),
			None => false,
		};
		if !has_returned {
			if !TypeInfo::value(self.return_type).is_void() {
				self.report(CompileErrorType::NotAllPathsReturn, pos);
			}
			bc.line(decl.row);
			self.pop_scope(&mut bc);
			bc.instr(Instruction::Ret);
		}
		self.finish(&signature.name, bc, params, errors)
	}

	/// Compiles the initializers of a module's globals into one function run
	/// before anything else in the module.
	pub fn compile_globals(&mut self, name: &str, globals: &[GlobalInit<'_, '_>]) -> Option<ScriptFunction> {
		self.reset(DataType::default());
		let errors = self.errors;
		self.in_global_expression = true;
		self.push_scope(false, false);
		let mut bc = ByteCode::new();
		for global in globals {
			bc.line(global.row);
			self.compile_global_init(global, &mut bc);
		}
		self.pop_scope(&mut bc);
		bc.instr(Instruction::Ret);
		self.finish(name, bc, Vec::new(), errors)
	}

	/// Evaluates an enum value or `const` global initializer. `None` when the
	/// expression isn't constant.
	pub fn evaluate_constant(&mut self, expr: &Expression<'_>, to: Option<&DataType>) -> Option<TypeInfo> {
		self.reset(DataType::default());
		self.in_global_expression = true;
		self.push_scope(false, false);
		let mut ctx = self.compile_expression(expr);
		self.process_property_get(&mut ctx, expr.pos());
		if let Some(to) = to {
			self.implicit_conversion(&mut ctx, to, expr.pos(), false, true, &[]);
		}
		self.scopes.clear();
		if !ctx.ty.is_constant {
			let mut bc = ByteCode::new();
			let ty = ctx.ty;
			self.release_temporary(&ty, &mut bc);
			return None;
		}
		Some(ctx.ty)
	}

	fn finish(&mut self, name: &str, bc: ByteCode, params: Vec<Var>, errors: usize) -> Option<ScriptFunction> {
		if self.errors > errors {
			return None;
		}
		debug_assert!(self.temps.is_empty(), "temporaries left at the end of '{name}'");
		debug_assert_eq!(self.stats.allocated, self.stats.released);
		let (code, lines) = bc.finalize();
		Some(ScriptFunction {
			name: name.to_string(),
			code,
			stack_size: self.stack_size,
			params,
			lines,
			object_vars: self.object_vars.clone(),
			temps: self.stats,
		})
	}

	/// Hands a message to the sink. Errors are counted, warnings too when
	/// they are treated as errors.
	pub(crate) fn report(&mut self, message: CompileErrorType, (row, col): Pos) {
		let mut severity = message.severity();
		if severity == Severity::Warning && self.warnings_as_errors {
			severity = Severity::Error;
		}
		if severity == Severity::Error {
			self.errors += 1;
		}
		self.sink.message(Diagnostic { section: self.section.to_string(), row, col, severity, message: message.to_string() });
	}

	fn next_label(&mut self) -> Label {
		self.next_label += 1;
		Label(self.next_label - 1)
	}

	fn format(&self, dt: &DataType) -> String { dt.format(self.registry) }

	fn signature(&self, func: FuncId) -> Signature {
		let desc = self.registry.function(func);
		Signature {
			name:        desc.name.clone(),
			params:      desc.params.clone(),
			return_type: desc.return_type,
		}
	}

	/// Resolves a type written in the source, reporting unknown types.
	fn resolve_type(&mut self, decl: &TypeDecl<'_>, pos: Pos) -> Option<DataType> {
		match self.registry.resolve(decl) {
			Ok(dt) => Some(dt),
			Err(RegistryError::UnknownType(name)) => {
				self.report(CompileErrorType::UnknownType(name), pos);
				None
			}
			Err(RegistryError::DataType(DataTypeError::HandleNotAllowed)) => {
				self.report(CompileErrorType::HandleNotSupported, pos);
				None
			}
			Err(_) => {
				self.report(CompileErrorType::DataTypeCantBe(decl.to_string()), pos);
				None
			}
		}
	}

	/// A constant of `dt`, for folded results.
	fn constant_of(dt: DataType, value: ConstValue) -> ExprContext { ExprContext::with_type(TypeInfo::constant(dt, value)) }
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::{builtins, error::compiler::CollectingSink, parser::Parser, scanner::Scanner, statement::Declaration, vm::Vm};

	/// Runs `f` on a compiler over an empty module.
	pub(crate) fn with_compiler<R>(registry: &mut TypeRegistry, f: impl FnOnce(&mut Compiler<'_>) -> R) -> R {
		let module = ScriptScope::default();
		let mut sink = CollectingSink::default();
		let mut compiler = Compiler::new(registry, &module, &mut sink, "test");
		compiler.push_scope(false, false);
		f(&mut compiler)
	}

	/// Runs `f` and returns every message it produced, one per line.
	pub(crate) fn messages(registry: &mut TypeRegistry, f: impl FnOnce(&mut Compiler<'_>)) -> String {
		let module = ScriptScope::default();
		let mut sink = CollectingSink::default();
		{
			let mut compiler = Compiler::new(registry, &module, &mut sink, "test");
			compiler.push_scope(false, false);
			f(&mut compiler);
		}
		sink.messages.iter().map(|d| d.message.clone()).collect::<Vec<_>>().join("\n")
	}

	/// A registry with `string`, `print` capturing its output, and the output.
	pub(crate) fn registry() -> (TypeRegistry, builtins::Output) {
		let mut registry = TypeRegistry::new();
		let output = builtins::Output::capture();
		builtins::register_string(&mut registry).unwrap();
		builtins::register_print(&mut registry, &output).unwrap();
		(registry, output)
	}

	/// Compiles every function of `source`, returning the collected messages
	/// and the compiled functions by name.
	pub(crate) fn compile(registry: &mut TypeRegistry, source: &str) -> (CollectingSink, HashMap<String, FuncId>) {
		let tokens = Scanner::new(source).scan_tokens();
		let script = Parser::new(tokens).parse().unwrap();
		let mut module = ScriptScope::default();
		let mut sink = CollectingSink::default();
		let mut declared = Vec::new();
		for declaration in &script.declarations {
			let Declaration::Function(decl) = declaration else {
				continue;
			};
			let return_type = registry.resolve(&decl.return_type).unwrap();
			let params = decl
				.params
				.iter()
				.map(|p| {
					let mut ty = registry.resolve(&p.ty).unwrap();
					let modifier = p.reference.unwrap_or_default();
					if modifier != ParamModifier::None {
						ty.make_reference(true).unwrap();
					}
					Parameter::new(ty, modifier)
				})
				.collect();
			let id = registry.add_function(crate::types::FunctionDescriptor::new(decl.name, return_type, params, None));
			module.functions.entry(decl.name.to_string()).or_default().push(id);
			declared.push((decl, id));
		}
		let mut compiled = HashMap::new();
		for (decl, id) in declared {
			let code = Compiler::new(registry, &module, &mut sink, "test").compile_function(decl, id);
			if let Some(code) = code {
				registry.function_mut(id).kind = crate::types::FunctionKind::Script(Some(code.into()));
				compiled.insert(decl.name.to_string(), id);
			}
		}
		(sink, compiled)
	}

	/// Compiles `source` and runs `main`, returning what it printed.
	pub(crate) fn run(source: &str) -> String {
		let (mut registry, output) = registry();
		let (sink, functions) = compile(&mut registry, source);
		assert_eq!(sink.errors().count(), 0, "{:?}", sink.messages);
		let main = functions["main"];
		let mut globals = Vec::new();
		Vm::new(&registry, &mut globals, 64).call(main, Vec::new()).unwrap();
		output.captured()
	}

	/// Compiles `source` and returns the messages, errors expected.
	pub(crate) fn diagnostics(source: &str) -> String {
		let (mut registry, _) = registry();
		let (sink, _) = compile(&mut registry, source);
		sink.messages.iter().map(|d| d.message.clone()).collect::<Vec<_>>().join("\n")
	}

	#[test]
	fn functions_with_errors_produce_no_code() {
		let (mut registry, _) = registry();
		let (sink, functions) = compile(&mut registry, "int main() { return x; }");
		assert!(sink.contains("'x' is not declared"));
		assert!(!functions.contains_key("main"));
	}

	#[test]
	fn missing_return_is_reported() {
		assert!(diagnostics("int f(int a) { if (a > 0) return 1; }").contains("Not all paths return a value"));
		assert!(!diagnostics("int f(int a) { if (a > 0) return 1; else return 2; }").contains("Not all paths"));
	}

	#[test]
	fn warnings_can_fail_the_build() {
		let (mut registry, _) = registry();
		let tokens = Scanner::new("void main() { uint u = -1; }").scan_tokens();
		let script = Parser::new(tokens).parse().unwrap();
		let Declaration::Function(decl) = &script.declarations[0] else { panic!("expected a function") };
		let id = registry.add_function(crate::types::FunctionDescriptor::new("main", DataType::default(), Vec::new(), None));
		let module = ScriptScope::default();
		let mut sink = CollectingSink::default();
		let mut compiler = Compiler::new(&mut registry, &module, &mut sink, "test").warnings_as_errors(true);
		assert!(compiler.compile_function(decl, id).is_none());
		assert_eq!(compiler.errors(), 1);
	}

	#[test]
	fn temporaries_balance_after_compilation() {
		let (mut registry, _) = registry();
		let (sink, functions) = compile(
			&mut registry,
			"int main() { int a = 3; float f = a * 2.5f; string s = \"x\" + \"y\"; return a + int(f) + s.length(); }",
		);
		assert_eq!(sink.errors().count(), 0, "{:?}", sink.messages);
		let crate::types::FunctionKind::Script(Some(code)) = &registry.function(functions["main"]).kind else {
			panic!("main was not compiled")
		};
		assert_eq!(code.temps.allocated, code.temps.released);
		assert!(code.temps.allocated > 0);
	}
}
