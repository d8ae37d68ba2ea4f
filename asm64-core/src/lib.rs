//! Two-pass 6502/6510/65C02 cross-assembler engine for the Commodore 64.
//!
//! This crate is the engine only: it knows nothing about the filesystem
//! beyond the [`source::SourceProvider`] trait, and nothing about CLI
//! argument parsing or terminal output. The `asm64` binary crate wires a
//! real filesystem provider and a `clap` front end around it.

pub mod addressing;
pub mod charset;
mod directives;
pub mod engine;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod opcodes;
pub mod output;
pub mod source;
pub mod statement;
pub mod symbols;

pub use engine::{AssembledOutput, Assembler, Options};
pub use error::{AsmError, Diagnostic, Diagnostics, Severity};
pub use opcodes::Cpu;
pub use output::OutputFormat;
