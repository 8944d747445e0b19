//! Turns raw script text into classified tokens.
//!
//! The [`Tokenizer`] answers one question: what is the longest token at the
//! start of this byte slice? It never fails, a byte it cannot classify comes
//! back as a length 1 [`TokenKind::Unrecognized`] so the caller can report it
//! and carry on. The candidates are tried in a fixed order:
//!
//! 1. white space (a UTF-8 byte order mark counts as three bytes of it)
//! 2. comments, `//` up to and including the newline, `/* */` up to the closer
//! 3. constants, numbers and strings
//! 4. identifiers that are not exactly a reserved word
//! 5. reserved words and operators, longest match wins
//!
//! Reserved words are found with an incremental prefix match over
//! [`KEYWORDS`]. A word ending in an identifier character is not accepted
//! when the input continues the identifier, so `!isTrue` is `!` followed by
//! the identifier `isTrue`, never `!is` followed by `True`.
//!
//! The [`Scanner`] drives the tokenizer over a whole script and keeps the
//! significant tokens with their positions for the parser.
mod token;

pub use token::*;

const WHITESPACE: &[u8] = b" \t\r\n";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Stateless longest-match tokenizer. The two fields are scratch space for the
/// token being classified and are overwritten by every call.
#[derive(Debug, Default)]
pub struct Tokenizer {
	token_type:   TokenKind,
	token_length: usize,
}

impl Tokenizer {
	pub fn new() -> Self { Self::default() }

	/// Classify the token at the start of `source`, returning its kind, its
	/// length in bytes and its class. Empty input yields [`TokenKind::End`].
	pub fn get_token(&mut self, source: &[u8]) -> (TokenKind, usize, TokenClass) {
		if source.is_empty() {
			return (TokenKind::End, 0, TokenClass::Unknown);
		}
		let class = if self.is_whitespace(source) {
			TokenClass::Whitespace
		} else if self.is_comment(source) {
			TokenClass::Comment
		} else if self.is_constant(source) {
			TokenClass::Value
		} else if self.is_identifier(source) {
			TokenClass::Identifier
		} else if self.is_keyword(source) {
			TokenClass::Keyword
		} else {
			self.token_type = TokenKind::Unrecognized;
			self.token_length = 1;
			TokenClass::Unknown
		};
		(self.token_type, self.token_length, class)
	}

	fn is_whitespace(&mut self, source: &[u8]) -> bool {
		if source.starts_with(UTF8_BOM) {
			self.token_type = TokenKind::Whitespace;
			self.token_length = UTF8_BOM.len();
			return true;
		}
		let n = source.iter().take_while(|&&b| WHITESPACE.contains(&b)).count();
		if n == 0 {
			return false;
		}
		self.token_type = TokenKind::Whitespace;
		self.token_length = n;
		true
	}

	fn is_comment(&mut self, source: &[u8]) -> bool {
		if source.len() < 2 || source[0] != b'/' {
			return false;
		}
		match source[1] {
			b'/' => {
				self.token_type = TokenKind::OnelineComment;
				self.token_length = match source[2..].iter().position(|&b| b == b'\n') {
					Some(n) => n + 3,
					None => source.len(),
				};
				true
			}
			b'*' => {
				self.token_type = TokenKind::MultilineComment;
				self.token_length = match source[2..].windows(2).position(|w| w == b"*/") {
					Some(n) => n + 4,
					None => source.len(),
				};
				true
			}
			_ => false,
		}
	}

	fn is_constant(&mut self, source: &[u8]) -> bool {
		let starts_number = source[0].is_ascii_digit() || (source[0] == b'.' && source.get(1).is_some_and(u8::is_ascii_digit));
		if starts_number {
			self.number(source);
			return true;
		}
		if source[0] == b'"' || source[0] == b'\'' {
			if source.starts_with(b"\"\"\"") {
				self.heredoc(source);
			} else {
				self.string(source);
			}
			return true;
		}
		false
	}

	fn number(&mut self, source: &[u8]) {
		let digits = |from: usize| from + source[from..].iter().take_while(|b| b.is_ascii_digit()).count();

		if source[0] == b'0' && matches!(source.get(1), Some(b'x' | b'X')) {
			let n = 2 + source[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
			self.token_type = TokenKind::BitsConstant;
			self.token_length = n;
			return;
		}

		let mut n = digits(0);
		if source.get(n) != Some(&b'.') {
			self.token_type = TokenKind::IntConstant;
			self.token_length = n;
			return;
		}

		n = digits(n + 1);
		if matches!(source.get(n), Some(b'e' | b'E')) {
			n += 1;
			if matches!(source.get(n), Some(b'+' | b'-')) {
				n += 1;
			}
			n = digits(n);
		}
		if matches!(source.get(n), Some(b'f' | b'F')) {
			self.token_type = TokenKind::FloatConstant;
			self.token_length = n + 1;
		} else {
			self.token_type = TokenKind::DoubleConstant;
			self.token_length = n;
		}
	}

	/// A quote closes the string only when preceded by an even number of
	/// backslashes.
	fn string(&mut self, source: &[u8]) {
		let quote = source[0];
		let mut even_slashes = true;
		self.token_type = TokenKind::StringConstant;
		for (n, &b) in source.iter().enumerate().skip(1) {
			if b == b'\n' {
				self.token_type = TokenKind::MultilineStringConstant;
			}
			if b == quote && even_slashes {
				self.token_length = n + 1;
				return;
			}
			even_slashes = if b == b'\\' { !even_slashes } else { true };
		}
		self.token_type = TokenKind::NonTerminatedStringConstant;
		self.token_length = source.len();
	}

	fn heredoc(&mut self, source: &[u8]) {
		match source[3..].windows(3).position(|w| w == b"\"\"\"") {
			Some(n) => {
				self.token_type = TokenKind::HeredocStringConstant;
				self.token_length = n + 6;
			}
			None => {
				self.token_type = TokenKind::NonTerminatedStringConstant;
				self.token_length = source.len();
			}
		}
	}

	fn is_identifier(&mut self, source: &[u8]) -> bool {
		if !(source[0].is_ascii_alphabetic() || source[0] == b'_') {
			return false;
		}
		let n = source.iter().take_while(|&&b| is_identifier_char(b)).count();
		if KEYWORDS.iter().any(|(word, _)| word.as_bytes() == &source[..n]) {
			return false;
		}
		self.token_type = TokenKind::Identifier;
		self.token_length = n;
		true
	}

	fn is_keyword(&mut self, source: &[u8]) -> bool {
		let mut alive = vec![true; KEYWORDS.len()];
		let mut remaining = KEYWORDS.len();
		let mut last_possible = None;

		let mut n = 0;
		while n < source.len() && remaining > 0 {
			for (m, (word, kind)) in KEYWORDS.iter().enumerate() {
				if !alive[m] {
					continue;
				}
				let word = word.as_bytes();
				if word.len() == n {
					alive[m] = false;
					remaining -= 1;
					if is_identifier_char(word[n - 1]) && is_identifier_char(source[n]) {
						continue;
					}
					if remaining == 0 {
						self.token_type = *kind;
						self.token_length = n;
						return true;
					}
					last_possible = Some(m);
				} else if word[n] != source[n] {
					alive[m] = false;
					remaining -= 1;
				}
			}
			n += 1;
		}

		// The input ran out, a word ending exactly here is the longest match
		let exact = KEYWORDS.iter().enumerate().find(|(m, (word, _))| alive[*m] && word.len() == n);
		if let Some((_, (word, kind))) = exact.or_else(|| last_possible.map(|m| (m, &KEYWORDS[m]))) {
			self.token_type = *kind;
			self.token_length = word.len();
			return true;
		}
		false
	}
}

fn is_identifier_char(b: u8) -> bool { b.is_ascii_alphanumeric() || b == b'_' }

/// Walks a whole script with the [`Tokenizer`], keeping every significant
/// token with its position.
pub struct Scanner<'a> {
	/// User input source code
	source:    &'a str,
	tokenizer: Tokenizer,
	/// Byte offsets where each line starts
	lines:     Vec<usize>,
}

impl<'a> Scanner<'a> {
	pub fn new(source: &'a str) -> Self {
		let lines = std::iter::once(0).chain(source.match_indices('\n').map(|(i, _)| i + 1)).collect();
		Self { source, tokenizer: Tokenizer::new(), lines }
	}

	/// Scan all significant tokens, the last one is always [`TokenKind::End`].
	/// A comment missing its closer is kept so the parser can report it.
	pub fn scan_tokens(&mut self) -> Vec<Token<'a>> {
		let mut tokens = Vec::new();
		let bytes = self.source.as_bytes();
		let mut pos = 0;
		while pos < bytes.len() {
			let (kind, len, _) = self.tokenizer.get_token(&bytes[pos..]);
			let open_comment = kind == TokenKind::MultilineComment && (len < 4 || !bytes[pos..pos + len].ends_with(b"*/"));
			if !kind.is_ignored() || open_comment {
				let (row, col) = self.row_col(pos);
				let lexeme = self.source.get(pos..pos + len).unwrap_or("");
				tokens.push(Token::new(kind, lexeme, pos, row, col));
			}
			pos += len.max(1);
		}
		let (row, col) = self.row_col(bytes.len());
		tokens.push(Token::new(TokenKind::End, "", bytes.len(), row, col));
		tokens
	}

	/// Convert a byte offset to a 1-based row and column.
	pub fn row_col(&self, pos: usize) -> (usize, usize) {
		let line = self.lines.partition_point(|&start| start <= pos).saturating_sub(1);
		(line + 1, pos - self.lines[line] + 1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn token(input: &str, kind: TokenKind, len: usize) {
		let mut tokenizer = Tokenizer::new();
		let (found, length, _) = tokenizer.get_token(input.as_bytes());
		assert_eq!((found, length), (kind, len), "tokenizing {input:?}");
	}

	fn round_trip(input: &[u8]) {
		let mut tokenizer = Tokenizer::new();
		let mut rebuilt = Vec::new();
		let mut pos = 0;
		while pos < input.len() {
			let (_, len, _) = tokenizer.get_token(&input[pos..]);
			assert!(len > 0 && pos + len <= input.len());
			rebuilt.extend_from_slice(&input[pos..pos + len]);
			pos += len;
		}
		assert_eq!(rebuilt, input);
	}

	#[test]
	fn tokenize_keywords_and_identifiers() {
		token("is", TokenKind::Is, 2);
		token("isTrue", TokenKind::Identifier, 6);
		token("!isTrue", TokenKind::Not, 1);
		token("!is", TokenKind::NotIs, 3);
		token("!is null", TokenKind::NotIs, 3);
		token("!=", TokenKind::NotEqual, 2);
		token("int", TokenKind::Int, 3);
		token("int8", TokenKind::Int8, 4);
		token("integer", TokenKind::Identifier, 7);
		token("_x1", TokenKind::Identifier, 3);
		token("and", TokenKind::And, 3);
		token("android", TokenKind::Identifier, 7);
	}

	#[test]
	fn tokenize_operators() {
		token(">>>=", TokenKind::ShiftRightAAssign, 4);
		token(">>>", TokenKind::BitShiftRightArith, 3);
		token(">>", TokenKind::BitShiftRight, 2);
		token(">= 1", TokenKind::GreaterThanOrEqual, 2);
		token("::", TokenKind::Scope, 2);
		token("@=", TokenKind::HandleAssign, 2);
		token("@a", TokenKind::Handle, 1);
		token("++i", TokenKind::Inc, 2);
	}

	#[test]
	fn tokenize_numbers() {
		token("123", TokenKind::IntConstant, 3);
		token("123.5", TokenKind::DoubleConstant, 5);
		token("123.5f", TokenKind::FloatConstant, 6);
		token("1.5e-3;", TokenKind::DoubleConstant, 6);
		token(".5", TokenKind::DoubleConstant, 2);
		token("0xFF", TokenKind::BitsConstant, 4);
		token("0xffz", TokenKind::BitsConstant, 4);
	}

	#[test]
	fn tokenize_strings() {
		token(r#""a\"b""#, TokenKind::StringConstant, 6);
		token(r#""a\\"b"#, TokenKind::StringConstant, 5);
		token("'c'", TokenKind::StringConstant, 3);
		token("\"a\nb\"", TokenKind::MultilineStringConstant, 5);
		token("\"abc", TokenKind::NonTerminatedStringConstant, 4);
		token("\"\"\"raw \\ \" text\"\"\" x", TokenKind::HeredocStringConstant, 18);
		token("\"\"\"open", TokenKind::NonTerminatedStringConstant, 7);
	}

	#[test]
	fn tokenize_whitespace_and_comments() {
		token(" \t\r\nx", TokenKind::Whitespace, 4);
		token("\u{feff}int", TokenKind::Whitespace, 3);
		token("// hi\nx", TokenKind::OnelineComment, 6);
		token("// end", TokenKind::OnelineComment, 6);
		token("/* a */b", TokenKind::MultilineComment, 7);
		token("/* open", TokenKind::MultilineComment, 7);
		token("/*", TokenKind::MultilineComment, 2);
		token("/", TokenKind::Slash, 1);
	}

	#[test]
	fn tokenize_unrecognized() {
		token("$", TokenKind::Unrecognized, 1);
		token("é", TokenKind::Unrecognized, 1);
		token("", TokenKind::End, 0);
	}

	#[test]
	fn tokens_reproduce_source() {
		round_trip(b"int x = 2 + 3 * 4; // done\n");
		round_trip("\u{feff}void main() { string s = \"h\\\"i\"; }".as_bytes());
		round_trip("$ # é ` \"unterminated".as_bytes());
		round_trip(b"/* open comment");
		round_trip(b"a!isTrue!is b>>>=c 0x1fg 1.5e+ \"\"\"x\"\"\"");
		round_trip(&[0xff, 0x00, b'a', 0x80]);
	}

	#[test]
	fn scanner_skips_trivia() {
		let mut scanner = Scanner::new("int a; // c\n  a = 1;");
		let tokens = scanner.scan_tokens();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		use TokenKind::*;
		assert_eq!(kinds, vec![Int, Identifier, EndStatement, Identifier, Assignment, IntConstant, EndStatement, End]);
		assert_eq!((tokens[3].row, tokens[3].col), (2, 3));
		assert_eq!(tokens[3].lexeme, "a");
	}
}
