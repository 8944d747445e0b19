use std::path::PathBuf;

use palc::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zangel", after_long_help = "An AngelScript compiler and virtual machine.")]
pub struct Cli {
	/// Treat warnings as errors
	#[arg(long)]
	pub warnings_as_errors: bool,
	#[command(subcommand)]
	pub mode:               Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Build a script and run a function of it
	File {
		path:  PathBuf,
		/// Function to run, `main` by default
		#[arg(long)]
		entry: Option<String>,
	},
	/// Print the tokens of a script
	Tokens { path: PathBuf },
	/// Print the bytecode of a script's functions
	Disasm { path: PathBuf },
	/// Input prompt
	Repl,
}
