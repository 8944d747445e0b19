//! # How a script becomes bytecode and runs
//!
//! User's source code: `int average = (min + max) / 2;`

//! ## Tokenizing
//!
//! The tokenizer walks the bytes and cuts them into tokens, longest match
//! first: `>>>=` is one token, not four. Every token gets a kind, a length
//! and a class (keyword, identifier, constant, whitespace, comment). The
//! scanner drops whitespace and comments and turns byte offsets into rows and
//! columns.
//!
//! The tokens are
//! `["int", "average", "=", "(", "min", "+", "max", ")", "/", "2", ";"]`.

//! ## Parsing
//!
//! A recursive descent parser builds the syntax tree. Unlike a dynamically
//! typed language, every declaration names its type, so the parser has to
//! tell `Obj o(1);` (a declaration) from `f(1);` (a call) by asking whether
//! the identifier is a known type.
//!
//! ``` markdown
//! average (VariableDecl int)
//! └── / (Binary)
//!     ├── + (Binary)
//!     │   ├── min (Variable)
//!     │   └── max (Variable)
//!     └── 2 (Literal)
//! ```

//! ## Types
//!
//! Every value has a [`DataType`](types::DataType): a primitive or a
//! registered object type, plus whether it is a handle, a reference or read
//! only. Object types live in the [`TypeRegistry`](types::TypeRegistry) the
//! host fills before building scripts.

//! ## Compiling
//!
//! The compiler walks each function body once. Every expression yields the
//! code computing it and where the result ends up: a constant, a variable, or
//! a value on the stack. Operands are converted to a common type, constants
//! are folded, and intermediate results go to temporary variables that are
//! reused as soon as they are released.
//!
//! `int x = 2 + 3 * 4;` compiles to a single `SetV v1, 14`.

//! ## Running
//!
//! The virtual machine executes the bytecode with a frame of variable slots
//! per call, a value stack for arguments and references, and a register for
//! results. Objects are reference counted and handles share them.

pub mod builtins;
pub mod bytecode;
pub mod cli;
pub mod compiler;
mod engine;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod statement;
pub mod types;
pub mod utils;
pub mod vm;

pub use engine::{Engine, EngineConfig, Module};
pub use error::ZangelError;
