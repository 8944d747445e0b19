//! The `Scanner` use `Lexical grammar`, implement `alphabet` as `Characters`,
//! `string` as `Lexme` or `Token`
//! The `Parser` use `Syntactic grammar`, implement `alphabet` as `Tokens`,
//! `string` as `Expression`
//!
//! Script grammar:
//!
//! ``` BNF
//! script         → declaration* END ;
//! declaration    → enum | function | variable ;
//! enum           → "enum" IDENT "{" ( IDENT ( "=" assignment )? ","? )* "}" ;
//! function       → type "&"? IDENT "(" params? ")" "const"? block ;
//! variable       → type declarator ( "," declarator )* ";" ;
//! declarator     → IDENT ( "=" assignment | arguments )? ;
//! type           → "const"? ( PRIMITIVE | IDENT ) ( "@" "const"? | "[" "]" )* ;
//! params         → "void" | param ( "," param )* ;
//! param          → type ( "&" ( "in" | "out" | "inout" )? )? IDENT? ;
//! statement      → block | if | while | do | for | switch | "break" ";"
//!                | "continue" ";" | "return" assignment? ";" | variable
//!                | assignment ";" | ";" ;
//! ```
//!
//! A statement is a variable declaration when it starts with something shaped
//! like a type followed by an identifier, `Obj@ h` or `int[] a`. Syntax
//! errors are collected and the parser skips to the next statement.

pub mod expression;
mod precedence;

use TokenKind::*;
use anyhow::anyhow;

use self::expression::Expression;
use crate::{error::{ZangelError, parser::{ParseError, ParseErrorType, ParserError}}, scanner::{Scanner, Token, TokenKind}, statement::{Case, Declaration, Declarator, EnumDecl, EnumValueDecl, FunctionDecl, Initializer, ParamDecl, Script, Statement, StatementKind, TypeDecl, TypeSuffix, VariableDecl}, types::ParamModifier};

pub struct Parser<'a> {
	/// The tokens to parse, always ending with [`TokenKind::End`].
	tokens:  Vec<Token<'a>>,
	current: usize,
	errors:  Vec<ParseError>,
}

impl<'a> Parser<'a> {
	/// Tokens the tokenizer could not make sense of are reported here and
	/// dropped.
	pub fn new(tokens: Vec<Token<'a>>) -> Self {
		let mut errors = Vec::new();
		let mut tokens: Vec<_> = tokens
			.into_iter()
			.filter(|token| {
				let r#type = match token.kind {
					NonTerminatedStringConstant => ParseErrorType::UnterminatedString,
					MultilineComment => ParseErrorType::UnterminatedComment,
					Unrecognized => ParseErrorType::UnrecognizedToken(token.lexeme.to_string()),
					_ => return true,
				};
				errors.push(ParseError::new(token.row, token.col, r#type));
				false
			})
			.collect();
		if tokens.last().is_none_or(|t| t.kind != End) {
			let (row, col) = tokens.last().map_or((1, 1), |t| (t.row, t.col + t.lexeme.len()));
			tokens.push(Token::new(End, "", 0, row, col));
		}
		Self { tokens, current: 0, errors }
	}

	/// Parses a whole script, failing with the error count when any syntax
	/// error was found.
	pub fn parse(&mut self) -> Result<Script<'a>, ZangelError> {
		match self.script() {
			Ok(script) if self.errors.is_empty() => Ok(script),
			Ok(_) => Err(ZangelError::ParserErrors(self.errors.len())),
			Err(ParserError::InternalError(e)) => Err(e.into()),
			Err(ParserError::ParseError(e)) => {
				self.report(e);
				Err(ZangelError::ParserErrors(self.errors.len()))
			}
		}
	}

	/// Every syntax error found so far.
	pub fn errors(&self) -> &[ParseError] { &self.errors }

	pub fn script(&mut self) -> Result<Script<'a>, ParserError> {
		let mut declarations = Vec::new();
		while !self.check(End) {
			match self.declaration() {
				Ok(declaration) => declarations.push(declaration),
				Err(ParserError::ParseError(e)) => {
					self.report(e);
					self.synchronize_declaration()?;
				}
				Err(e) => return Err(e),
			}
		}
		Ok(Script { declarations })
	}

	/// Parses a registration declaration such as `int get_prop() const` or
	/// `void f(int &out)`.
	pub fn parse_signature(decl: &'a str) -> Result<FunctionDecl<'a>, ParseError> {
		let mut parser = Self::new(Scanner::new(decl).scan_tokens());
		let signature = parser.function(false);
		parser.finish(decl, signature)
	}

	/// Parses a property declaration such as `const int x`.
	pub fn parse_property(decl: &'a str) -> Result<(TypeDecl<'a>, &'a str), ParseError> {
		let mut parser = Self::new(Scanner::new(decl).scan_tokens());
		let property = parser.type_decl().and_then(|ty| Ok((ty, parser.expect_identifier()?.lexeme)));
		parser.finish(decl, property)
	}

	fn finish<T>(&self, decl: &str, result: Result<T, ParserError>) -> Result<T, ParseError> {
		if let Some(e) = self.errors.first() {
			return Err(e.clone());
		}
		let invalid = || ParseError::new(1, 1, ParseErrorType::InvalidDeclaration(decl.to_string()));
		match result {
			Ok(_) if !self.check(End) => Err(invalid()),
			Ok(value) => Ok(value),
			Err(ParserError::ParseError(e)) => Err(e),
			Err(ParserError::InternalError(_)) => Err(invalid()),
		}
	}

	fn declaration(&mut self) -> Result<Declaration<'a>, ParserError> {
		if self.check(Enum) {
			return Ok(Declaration::Enum(self.enum_decl()?));
		}
		if self.is_function_decl() {
			return Ok(Declaration::Function(self.function(true)?));
		}
		Ok(Declaration::Variable(self.variable_decl()?))
	}

	fn enum_decl(&mut self) -> Result<EnumDecl<'a>, ParserError> {
		let keyword = self.advance()?;
		let name = self.expect_identifier()?;
		self.expect(StartStatementBlock, "{")?;
		let mut values = Vec::new();
		while !self.check(EndStatementBlock) {
			let value_name = self.expect_identifier()?;
			let value = if self.matches(Assignment) { Some(self.expression()?) } else { None };
			values.push(EnumValueDecl { name: value_name.lexeme, value, row: value_name.row, col: value_name.col });
			if !self.matches(ListSeparator) {
				break;
			}
		}
		self.expect(EndStatementBlock, "}")?;
		self.matches(EndStatement);
		Ok(EnumDecl { name: name.lexeme, values, row: keyword.row, col: keyword.col })
	}

	fn function(&mut self, with_body: bool) -> Result<FunctionDecl<'a>, ParserError> {
		let return_type = self.type_decl()?;
		let returns_reference = self.matches(Amp);
		let name = self.expect_identifier()?;
		self.expect(OpenParen, "(")?;
		let params = self.params()?;
		self.expect(CloseParen, ")")?;
		let is_const = self.matches(Const);
		let body = if with_body { Some(self.block()?) } else { None };
		Ok(FunctionDecl {
			return_type,
			returns_reference,
			name: name.lexeme,
			params,
			is_const,
			body,
			row: name.row,
			col: name.col,
		})
	}

	fn params(&mut self) -> Result<Vec<ParamDecl<'a>>, ParserError> {
		let mut params = Vec::new();
		if self.check(CloseParen) {
			return Ok(params);
		}
		if self.check(Void) && self.peek_at(1) == CloseParen {
			self.advance()?;
			return Ok(params);
		}
		loop {
			let ty = self.type_decl()?;
			let reference = if self.matches(Amp) {
				Some(if self.matches(In) {
					ParamModifier::In
				} else if self.matches(Out) {
					ParamModifier::Out
				} else {
					self.matches(InOut);
					ParamModifier::InOut
				})
			} else {
				None
			};
			let name = if self.check(Identifier) { Some(self.advance()?.lexeme) } else { None };
			params.push(ParamDecl { ty, reference, name });
			if !self.matches(ListSeparator) {
				return Ok(params);
			}
		}
	}

	pub(crate) fn type_decl(&mut self) -> Result<TypeDecl<'a>, ParserError> {
		let is_const = self.matches(Const);
		let base = *self.peek();
		if !base.kind.is_primitive_type() && base.kind != Identifier {
			return Err(self.error_at(&base, ParseErrorType::ExpectedDataType(Self::describe(&base))).into());
		}
		self.advance()?;
		let mut suffixes = Vec::new();
		loop {
			if self.matches(Handle) {
				suffixes.push(TypeSuffix::Handle { is_const: self.matches(Const) });
			} else if self.check(OpenBracket) && self.peek_at(1) == CloseBracket {
				self.advance()?;
				self.advance()?;
				suffixes.push(TypeSuffix::Array);
			} else {
				return Ok(TypeDecl { is_const, base, suffixes });
			}
		}
	}

	fn variable_decl(&mut self) -> Result<VariableDecl<'a>, ParserError> {
		let ty = self.type_decl()?;
		let mut vars = Vec::new();
		loop {
			let name = self.expect_identifier()?;
			let init = if self.matches(Assignment) {
				Initializer::Expression(self.expression()?)
			} else if self.check(OpenParen) {
				Initializer::Args(self.arguments()?)
			} else {
				Initializer::None
			};
			vars.push(Declarator { name: name.lexeme, init, row: name.row, col: name.col });
			if !self.matches(ListSeparator) {
				break;
			}
		}
		self.expect(EndStatement, ";")?;
		Ok(VariableDecl { ty, vars })
	}

	/// `{ statement* }`, recovering from errors inside.
	fn block(&mut self) -> Result<Vec<Statement<'a>>, ParserError> {
		self.expect(StartStatementBlock, "{")?;
		let mut statements = Vec::new();
		while !self.check(EndStatementBlock) && !self.check(End) {
			match self.statement() {
				Ok(statement) => statements.push(statement),
				Err(ParserError::ParseError(e)) => {
					self.report(e);
					self.synchronize_statement()?;
				}
				Err(e) => return Err(e),
			}
		}
		self.expect(EndStatementBlock, "}")?;
		Ok(statements)
	}

	fn statement(&mut self) -> Result<Statement<'a>, ParserError> {
		let token = *self.peek();
		let kind = match token.kind {
			StartStatementBlock => StatementKind::Block(self.block()?),
			If => {
				self.advance()?;
				let condition = self.condition()?;
				let then_branch = Box::new(self.statement()?);
				let else_branch = if self.matches(Else) { Some(Box::new(self.statement()?)) } else { None };
				StatementKind::If { condition, then_branch, else_branch }
			}
			While => {
				self.advance()?;
				let condition = self.condition()?;
				StatementKind::While { condition, body: Box::new(self.statement()?) }
			}
			Do => {
				self.advance()?;
				let body = Box::new(self.statement()?);
				self.expect(While, "while")?;
				let condition = self.condition()?;
				self.expect(EndStatement, ";")?;
				StatementKind::DoWhile { body, condition }
			}
			For => self.for_statement()?,
			Switch => self.switch()?,
			Break | Continue => {
				self.advance()?;
				self.expect(EndStatement, ";")?;
				if token.kind == Break { StatementKind::Break } else { StatementKind::Continue }
			}
			Return => {
				self.advance()?;
				let value = if self.check(EndStatement) { None } else { Some(self.expression()?) };
				self.expect(EndStatement, ";")?;
				StatementKind::Return(value)
			}
			EndStatement => {
				self.advance()?;
				StatementKind::Empty
			}
			_ if self.is_var_decl() => StatementKind::Declaration(self.variable_decl()?),
			_ => {
				let expr = self.expression()?;
				self.expect(EndStatement, ";")?;
				StatementKind::Expression(expr)
			}
		};
		Ok(Statement::at(kind, &token))
	}

	/// `( assignment )`
	fn condition(&mut self) -> Result<Expression<'a>, ParserError> {
		self.expect(OpenParen, "(")?;
		let condition = self.expression()?;
		self.expect(CloseParen, ")")?;
		Ok(condition)
	}

	fn for_statement(&mut self) -> Result<StatementKind<'a>, ParserError> {
		self.advance()?;
		self.expect(OpenParen, "(")?;
		let init_token = *self.peek();
		let init = if self.matches(EndStatement) {
			None
		} else if self.is_var_decl() {
			Some(Box::new(Statement::at(StatementKind::Declaration(self.variable_decl()?), &init_token)))
		} else {
			let expr = self.expression()?;
			self.expect(EndStatement, ";")?;
			Some(Box::new(Statement::at(StatementKind::Expression(expr), &init_token)))
		};
		let condition = if self.check(EndStatement) { None } else { Some(self.expression()?) };
		self.expect(EndStatement, ";")?;
		let mut increment = Vec::new();
		while !self.check(CloseParen) {
			increment.push(self.expression()?);
			if !self.matches(ListSeparator) {
				break;
			}
		}
		self.expect(CloseParen, ")")?;
		let body = Box::new(self.statement()?);
		Ok(StatementKind::For { init, condition, increment, body })
	}

	fn switch(&mut self) -> Result<StatementKind<'a>, ParserError> {
		self.advance()?;
		let value = self.condition()?;
		self.expect(StartStatementBlock, "{")?;
		let mut cases = Vec::new();
		while !self.check(EndStatementBlock) {
			let label = *self.peek();
			let value = match label.kind {
				Case => {
					self.advance()?;
					Some(self.expression()?)
				}
				Default => {
					self.advance()?;
					None
				}
				_ => return Err(self.error_at(&label, ParseErrorType::Expected("case", Self::describe(&label))).into()),
			};
			self.expect(Colon, ":")?;
			let mut body = Vec::new();
			while !matches!(self.peek().kind, Case | Default | EndStatementBlock | End) {
				match self.statement() {
					Ok(statement) => body.push(statement),
					Err(ParserError::ParseError(e)) => {
						self.report(e);
						self.synchronize_statement()?;
					}
					Err(e) => return Err(e),
				}
			}
			cases.push(Case { value, body, row: label.row, col: label.col });
		}
		self.expect(EndStatementBlock, "}")?;
		Ok(StatementKind::Switch { value, cases })
	}

	/// Index just past a type starting at `i`, if there is one.
	fn skip_type(&self, mut i: usize) -> Option<usize> {
		if self.kind_at(i) == Const {
			i += 1;
		}
		let base = self.kind_at(i);
		if !base.is_primitive_type() && base != Identifier {
			return None;
		}
		i += 1;
		loop {
			match self.kind_at(i) {
				Handle => {
					i += 1;
					if self.kind_at(i) == Const {
						i += 1;
					}
				}
				OpenBracket if self.kind_at(i + 1) == CloseBracket => i += 2,
				_ => return Some(i),
			}
		}
	}

	fn is_var_decl(&self) -> bool {
		self.skip_type(self.current).is_some_and(|i| self.kind_at(i) == Identifier)
	}

	/// A type, a name and a parameter list followed by a body.
	fn is_function_decl(&self) -> bool {
		let Some(mut i) = self.skip_type(self.current) else {
			return false;
		};
		if self.kind_at(i) == Amp {
			i += 1;
		}
		if self.kind_at(i) != Identifier || self.kind_at(i + 1) != OpenParen {
			return false;
		}
		i += 2;
		let mut depth = 1;
		while depth > 0 {
			match self.kind_at(i) {
				OpenParen => depth += 1,
				CloseParen => depth -= 1,
				End => return false,
				_ => {}
			}
			i += 1;
		}
		if self.kind_at(i) == Const {
			i += 1;
		}
		self.kind_at(i) == StartStatementBlock
	}

	/// Skips past the next `;` or the block the broken declaration opened.
	fn synchronize_declaration(&mut self) -> Result<(), ParserError> {
		let mut depth = 0usize;
		loop {
			match self.peek().kind {
				End => return Ok(()),
				EndStatement if depth == 0 => {
					self.advance()?;
					return Ok(());
				}
				StartStatementBlock => depth += 1,
				EndStatementBlock => {
					depth = depth.saturating_sub(1);
					if depth == 0 {
						self.advance()?;
						return Ok(());
					}
				}
				_ => {}
			}
			self.advance()?;
		}
	}

	/// Skips past the next `;`, stopping in front of the `}` closing the
	/// current block.
	fn synchronize_statement(&mut self) -> Result<(), ParserError> {
		let mut depth = 0usize;
		loop {
			match self.peek().kind {
				End => return Ok(()),
				EndStatement if depth == 0 => {
					self.advance()?;
					return Ok(());
				}
				EndStatementBlock if depth == 0 => return Ok(()),
				StartStatementBlock => depth += 1,
				EndStatementBlock => depth -= 1,
				_ => {}
			}
			self.advance()?;
		}
	}

	fn peek(&self) -> &Token<'a> { &self.tokens[self.current.min(self.tokens.len() - 1)] }

	fn kind_at(&self, i: usize) -> TokenKind { self.tokens.get(i).map_or(End, |t| t.kind) }

	fn peek_at(&self, offset: usize) -> TokenKind { self.kind_at(self.current + offset) }

	fn check(&self, kind: TokenKind) -> bool { self.peek().kind == kind }

	/// Consumes the current token when it is of the given kind.
	fn matches(&mut self, kind: TokenKind) -> bool {
		if self.check(kind) {
			self.current += 1;
			return true;
		}
		false
	}

	/// Advance to the next token.
	fn advance(&mut self) -> Result<Token<'a>, ParserError> {
		let token = *self.tokens.get(self.current).ok_or_else(|| anyhow!("Unexpected end of tokens"))?;
		if token.kind == End {
			return Err(anyhow!("Advanced past the end of the script").into());
		}
		self.current += 1;
		Ok(token)
	}

	fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<Token<'a>, ParserError> {
		let token = *self.peek();
		if token.kind != kind {
			return Err(self.error_at(&token, ParseErrorType::Expected(what, Self::describe(&token))).into());
		}
		self.advance()
	}

	fn expect_identifier(&mut self) -> Result<Token<'a>, ParserError> {
		let token = *self.peek();
		if token.kind != Identifier {
			return Err(self.error_at(&token, ParseErrorType::ExpectedIdentifier(Self::describe(&token))).into());
		}
		self.advance()
	}

	fn describe(token: &Token<'_>) -> String {
		if token.lexeme.is_empty() { token.kind.text().to_string() } else { token.lexeme.to_string() }
	}

	fn error_at(&self, token: &Token<'_>, r#type: ParseErrorType) -> ParseError {
		ParseError::new(token.row, token.col, r#type)
	}

	fn report(&mut self, error: ParseError) { self.errors.push(error) }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parser(input: &str) -> Parser<'_> { Parser::new(Scanner::new(input).scan_tokens()) }

	fn parse(input: &str, equals: &str) {
		let mut parser = parser(input);
		let ast = parser.expression().unwrap();
		assert!(parser.check(End), "trailing tokens in {input:?}");
		assert_eq!(ast.to_string(), equals);
	}

	fn script(input: &str) -> Script<'_> { parser(input).parse().unwrap() }

	fn body<'a>(script: &'a Script<'_>) -> &'a [Statement<'a>] {
		match &script.declarations[0] {
			Declaration::Function(f) => f.body.as_deref().unwrap(),
			other => panic!("expected a function, found {other:?}"),
		}
	}

	#[test]
	fn parse_arithmetic() {
		parse("3 + 4 * (-2 - 1)", "(+ 3 (* 4 (group (- (- 2) 1))))");
		parse("1 + 2 * 3 / 4 - 5", "(- (+ 1 (/ (* 2 3) 4)) 5)");
		parse("a % b * c", "(* (% a b) c)");
	}

	#[test]
	fn parse_operator_precedence() {
		parse("a || b && c", "(|| a (&& b c))");
		parse("a or b ^^ c", "(|| a (^^ b c))");
		parse("a | b ^ c & d", "(| a (^ b (& c d)))");
		parse("a == b < c", "(== a (< b c))");
		parse("a << 1 + 2", "(<< a (+ 1 2))");
		parse("a >>> 2 >> 1", "(>> (>>> a 2) 1)");
		parse("h is null", "(is h null)");
		parse("h !is null", "(!is h null)");
	}

	#[test]
	fn parse_assignment_is_right_associative() {
		parse("a = b = 3", "(= a (= b 3))");
		parse("a += b * 2", "(+= a (* b 2))");
		parse("a @= b", "(@= a b)");
		parse("x = c ? 1 : 2", "(= x (? c : 1 2))");
	}

	#[test]
	fn parse_unary_and_postfix() {
		parse("-123", "(- 123)");
		parse("!!true", "(! (! true))");
		parse("not a", "(! a)");
		parse("~a++", "(~ (a ++))");
		parse("--a", "(-- a)");
		parse("@h", "(@ h)");
	}

	#[test]
	fn parse_members_calls_and_indexing() {
		parse("f(1, x)", "(call f 1 x)");
		parse("obj.prop", "(. obj prop)");
		parse("obj.m(1).n", "(. (.call obj m 1) n)");
		parse("a[i + 1][0]", "([] ([] a (+ i 1)) 0)");
		parse("Color::Red", "Color::Red");
		parse("::g", "::g");
		parse("int(3.5)", "(int 3.5)");
		parse("cast<Obj@>(h)", "(cast<Obj@> h)");
	}

	#[test]
	fn parse_literals() {
		parse("42", "42");
		parse("0xFF", "0xFF");
		parse("1.5f", "1.5f");
		parse("\"hi\"", "\"hi\"");
		parse("null", "null");
	}

	#[test]
	fn parse_declarations() {
		let script = script("enum E { A, B = 5, C } const int g = 3; int f(int a, const string &in s, int &out o) { return a; }");
		assert_eq!(script.declarations.len(), 3);
		let Declaration::Enum(e) = &script.declarations[0] else { panic!() };
		assert_eq!(e.values.len(), 3);
		assert!(e.values[1].value.is_some());
		let Declaration::Variable(g) = &script.declarations[1] else { panic!() };
		assert!(g.ty.is_const);
		let Declaration::Function(f) = &script.declarations[2] else { panic!() };
		assert_eq!(f.params.len(), 3);
		assert_eq!(f.params[1].reference, Some(ParamModifier::In));
		assert_eq!(f.params[2].reference, Some(ParamModifier::Out));
	}

	#[test]
	fn parse_statements() {
		let script = script(
			"void main() { int a = 1, b; Obj@ h; int[] arr; a = b; if (a) b = 1; else ; while (a < 3) a++; \
			 do { a--; } while (a > 0); for (int i = 0; i < 3; i++, a++) {} switch (a) { case 1: case 2: break; default: return; } }",
		);
		let statements = body(&script);
		let kinds: Vec<_> = statements.iter().map(|s| std::mem::discriminant(&s.kind)).collect();
		assert_eq!(kinds.len(), 9);
		let StatementKind::Declaration(decl) = &statements[0].kind else { panic!() };
		assert_eq!(decl.vars.len(), 2);
		let StatementKind::Declaration(handle) = &statements[1].kind else { panic!() };
		assert_eq!(handle.ty.suffixes, vec![TypeSuffix::Handle { is_const: false }]);
		assert!(matches!(statements[3].kind, StatementKind::Expression(_)));
		let StatementKind::Switch { cases, .. } = &statements[8].kind else { panic!() };
		assert_eq!(cases.len(), 3);
		assert!(cases[2].value.is_none());
	}

	#[test]
	fn recover_after_syntax_errors() {
		let mut broken = parser("void main() { int a = ; a = 1; b = (2; } int g; $");
		let script = broken.script().unwrap();
		assert_eq!(script.declarations.len(), 2);
		assert_eq!(body(&script).len(), 1);
		let errors = broken.errors();
		assert_eq!(errors.len(), 3);
		assert!(matches!(errors[0].r#type, ParseErrorType::UnrecognizedToken(_)));
		assert!(matches!(errors[1].r#type, ParseErrorType::ExpectedExpression(_)));
		assert_eq!((errors[1].row, errors[1].col), (1, 23));
	}

	#[test]
	fn report_lexical_errors() {
		let mut string = parser("int a = \"open");
		assert!(string.parse().is_err());
		assert_eq!(string.errors()[0].r#type, ParseErrorType::UnterminatedString);
		let mut comment = parser("int a; /* open");
		assert!(comment.parse().is_err());
		assert_eq!(comment.errors()[0].r#type, ParseErrorType::UnterminatedComment);
	}

	#[test]
	fn parse_registration_signatures() {
		let f = Parser::parse_signature("int get_prop() const").unwrap();
		assert_eq!(f.name, "get_prop");
		assert!(f.is_const && f.params.is_empty() && f.body.is_none());
		let f = Parser::parse_signature("Obj@ &f(int &out, const Obj@ const h)").unwrap();
		assert!(f.returns_reference);
		assert_eq!(f.params.len(), 2);
		assert!(f.params[1].ty.is_const);
		assert!(Parser::parse_signature("void f() junk").is_err());
		assert!(Parser::parse_signature("void (").is_err());
		let (ty, name) = Parser::parse_property("const int x").unwrap();
		assert!(ty.is_const);
		assert_eq!(name, "x");
	}
}
