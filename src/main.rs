use std::{fs::read_to_string, path::Path};

use anyhow::Context;
use palc::Parser;
use zangel::{Engine, EngineConfig, ZangelError, cli::*, scanner::Scanner};

fn print_tokens(path: &Path) -> Result<(), ZangelError> {
	let source = read_to_string(path).context("Failed open source file")?;
	for token in Scanner::new(&source).scan_tokens() {
		println!("{}:{} {:?} {}", token.row, token.col, token.kind, token.lexeme);
	}
	Ok(())
}

fn print_bytecode(engine: &mut Engine, path: &Path) -> Result<(), ZangelError> {
	let source = read_to_string(path).context("Failed open source file")?;
	let module = engine.build(&path.display().to_string(), &source)?;
	print!("{}", engine.disassemble(&module));
	Ok(())
}

fn main() {
	let cli = Cli::parse();
	let config = EngineConfig { warnings_as_errors: cli.warnings_as_errors, ..EngineConfig::default() };
	let mut engine = match Engine::new(config) {
		Ok(engine) => engine,
		Err(e) => {
			eprintln!("Failed create engine: {e}");
			return;
		}
	};

	match cli.mode {
		Mode::File { path, entry } => {
			if let Err(e) = engine.run_file(&path, entry.as_deref().unwrap_or("main")) {
				eprintln!("Failed run file: {e}");
			}
		}
		Mode::Tokens { path } => {
			if let Err(e) = print_tokens(&path) {
				eprintln!("Failed scan file: {e}");
			}
		}
		Mode::Disasm { path } => {
			if let Err(e) = print_bytecode(&mut engine, &path) {
				eprintln!("Failed disassemble file: {e}");
			}
		}
		Mode::Repl => engine.run_prompt(),
	}
}
