//! Error taxonomy for the assembler.
//!
//! Grounded on the `LexerError` enum in the pack's
//! `Schala-rustgamingkit/cpu-mos-core` assembler, which models lexer
//! failures for this same instruction family with `thiserror::Error`.
//! Extended here to cover every failure category the engine can hit:
//! lexical, parse, symbol, expression, directive, conditional, macro, loop,
//! include and numeric-range errors, plus a generic I/O and CPU-mismatch
//! case.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A single assembler failure, independent of where it was reported from.
#[derive(Debug, Error)]
pub enum AsmError {
    #[error("unexpected character '{found}'")]
    Lexical { found: char },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("malformed number literal: {text}")]
    MalformedNumber { text: String },

    #[error("expected {expected}, found {found}")]
    Parse { expected: String, found: String },

    #[error("unexpected end of line")]
    UnexpectedEol,

    #[error("symbol '{name}' already defined")]
    DuplicateSymbol { name: String },

    #[error("undefined symbol '{name}'")]
    UndefinedSymbol { name: String },

    #[error("symbol '{name}' changed value between passes")]
    UnstableSymbol { name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("value {value} out of range for {context}")]
    OutOfRange { value: i64, context: String },

    #[error("unknown directive '{name}'")]
    UnknownDirective { name: String },

    #[error("unknown mnemonic '{name}'")]
    UnknownMnemonic { name: String },

    #[error("addressing mode {mode} not valid for {mnemonic}")]
    InvalidAddressingMode { mnemonic: String, mode: String },

    #[error("illegal opcode '{mnemonic}' not supported on target CPU {cpu}")]
    IllegalOpcodeNotSupported { mnemonic: String, cpu: String },

    #[error("branch target out of range ({offset} bytes, must fit in a signed byte)")]
    BranchOutOfRange { offset: i32 },

    #[error("unmatched !else/!endif")]
    UnmatchedConditional,

    #[error("unterminated !if block")]
    UnterminatedConditional,

    #[error("unmatched !endfor/!endwhile")]
    UnmatchedLoop,

    #[error("unterminated !for/!while block")]
    UnterminatedLoop,

    #[error("loop iteration limit exceeded ({limit})")]
    LoopLimitExceeded { limit: u32 },

    #[error("macro '{name}' already defined")]
    DuplicateMacro { name: String },

    #[error("undefined macro '{name}'")]
    UndefinedMacro { name: String },

    #[error("macro '{name}' expects {expected} argument(s), got {got}")]
    MacroArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("macro expansion nested too deeply (limit {limit})")]
    MacroRecursionLimit { limit: u32 },

    #[error("could not open include file '{path}': {source}")]
    Include { path: PathBuf, source: io::Error },

    #[error("include nested too deeply (limit {limit})")]
    IncludeDepthExceeded { limit: u32 },

    #[error("binary file '{path}' could not be read: {source}")]
    BinaryInclude { path: PathBuf, source: io::Error },

    #[error("{0}")]
    User(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Severity of a single reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A located diagnostic: an `AsmError` plus the file/line/column it was
/// raised at, and whether it is fatal to the assembly.
///
/// Unlike `original_source/src/error.c`'s process-global `ErrorContext`,
/// this is owned by the `Assembler` instance so that multiple assemblers
/// (e.g. in tests) can run independently without sharing state.
#[derive(Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, line: u32, column: u32, err: AsmError) -> Self {
        Diagnostic {
            severity: Severity::Error,
            file: file.into(),
            line,
            column,
            message: err.to_string(),
        }
    }

    pub fn warning(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.column, kind, self.message
        )
    }
}

/// Accumulates diagnostics for one assembly run. Owned by `Assembler`,
/// not a singleton, so independent assembler instances never interfere.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        log::debug!("{diag}");
        self.entries.push(diag);
    }

    pub fn error(&mut self, file: impl Into<String>, line: u32, column: u32, err: AsmError) {
        self.push(Diagnostic::error(file, line, column, err));
    }

    pub fn warning(&mut self, file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) {
        self.push(Diagnostic::warning(file, line, column, message));
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn diagnostics_counts_errors_and_warnings_separately() {
        let mut d = Diagnostics::new();
        d.error("foo.asm", 1, 1, AsmError::DivisionByZero);
        d.warning("foo.asm", 2, 1, "unused symbol");
        assert_eq!(d.error_count(), 1);
        assert_eq!(d.warning_count(), 1);
        assert!(d.has_errors());
    }

    #[test]
    fn diagnostic_display_format() {
        let diag = Diagnostic::error("foo.asm", 3, 5, AsmError::UndefinedSymbol { name: "LOOP".into() });
        assert_eq!(diag.to_string(), "foo.asm:3:5: error: undefined symbol 'LOOP'");
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let mut a = Diagnostics::new();
        let b = Diagnostics::new();
        a.error("a.asm", 1, 1, AsmError::DivisionByZero);
        assert_eq!(a.error_count(), 1);
        assert_eq!(b.error_count(), 0);
    }
}
