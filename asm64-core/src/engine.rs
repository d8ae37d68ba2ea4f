//! The two-pass assembler engine: flattens source (following `!source`
//! includes), walks it twice, and tracks pseudo-PC relocation, zones,
//! anonymous labels, conditional assembly, loops and macro expansion.
//!
//! Grounded on `original_source/src/assembler.c`'s `Assembler` struct and
//! its pass-driving loop, which likewise materializes every source line
//! (including macro bodies and loop bodies) into one flat array and
//! drives passes by walking it with a cursor rather than recursing
//! through the lexer per statement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::addressing::{self, OperandSyntax, Resolved};
use crate::charset;
use crate::error::{AsmError, Diagnostics};
use crate::expr::{self, Expr};
use crate::opcodes::{self, Cpu};
use crate::output::{ListingLine, OutputFormat, Segment};
use crate::source::SourceProvider;
use crate::statement::{parse_line, LabelDef, Statement, StatementBody};
use crate::symbols::{AnonLabels, SymbolFlags, SymbolTable};

const MAX_INCLUDE_DEPTH: u32 = 16;
const MAX_MACRO_DEPTH: u32 = 64;
const MAX_LOOP_ITERATIONS: u32 = 100_000;
const MAX_COND_DEPTH: u32 = 64;

/// One physical line of source, after include-flattening.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub file: String,
    pub line: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
struct MacroDef {
    params: Vec<String>,
    body_start: usize,
    body_end: usize,
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    /// True if the currently active branch of this `!if` should emit.
    taking: bool,
    /// True once some branch of this `!if` has already been taken, so a
    /// later `!else` knows not to take too.
    taken_before: bool,
    /// True if the statements surrounding this frame were themselves
    /// active (nested inside a skipped block disables everything below).
    parent_active: bool,
}

impl CondFrame {
    fn active(&self) -> bool {
        self.taking && self.parent_active
    }
}

enum LoopFrame {
    For {
        start_line_index: usize,
        var_name: String,
        end_value: i64,
        step: i64,
        current: i64,
        iterations: u32,
    },
    While {
        start_line_index: usize,
        condition: Expr,
        iterations: u32,
    },
}

/// Configuration for one assembly run.
pub struct Options {
    pub cpu: Cpu,
    pub format: OutputFormat,
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<(String, i64)>,
    pub show_cycles: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            cpu: Cpu::Mos6510,
            format: OutputFormat::Prg,
            include_paths: Vec::new(),
            defines: Vec::new(),
            show_cycles: false,
        }
    }
}

/// Result of a full, successful assembly.
pub struct AssembledOutput {
    pub segment: Segment,
    pub listing: Vec<ListingLine>,
}

pub struct Assembler<'p> {
    provider: &'p dyn SourceProvider,
    options: Options,

    pass: u8,
    pc: u32,
    real_pc: u32,
    origin: Option<u32>,
    bytes: Vec<u8>,

    symbols: SymbolTable,
    anon: AnonLabels,
    diagnostics: Diagnostics,
    current_zone: Option<String>,
    pseudo_pc_stack: Vec<u32>,

    macros: HashMap<String, MacroDef>,
    macro_depth: u32,
    macro_expansion_counter: u32,

    listing: Vec<ListingLine>,
}

impl<'p> Assembler<'p> {
    pub fn new(provider: &'p dyn SourceProvider, options: Options) -> Self {
        let mut symbols = SymbolTable::new();
        for (name, value) in &options.defines {
            let _ = symbols.define(
                name.clone(),
                name.clone(),
                *value,
                SymbolFlags::CONSTANT,
                "<command line>",
                0,
            );
        }
        Assembler {
            provider,
            options,
            pass: 1,
            pc: 0,
            real_pc: 0,
            origin: None,
            bytes: Vec::new(),
            symbols,
            anon: AnonLabels::new(),
            diagnostics: Diagnostics::new(),
            current_zone: None,
            pseudo_pc_stack: Vec::new(),
            macros: HashMap::new(),
            macro_depth: 0,
            macro_expansion_counter: 0,
            listing: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Assemble `entry` end to end: flatten includes, run pass 1 and
    /// pass 2, and return the resulting image plus listing. Returns the
    /// image even when diagnostics contain errors, matching
    /// `main.c`'s "only write output if result == 0" gate, which the
    /// caller enforces by checking `diagnostics().has_errors()`.
    pub fn assemble_file(&mut self, entry: &Path) -> Result<AssembledOutput, AsmError> {
        let lines = self.flatten(entry, 0)?;
        self.collect_macros(&lines);

        self.pass = 1;
        self.run_pass(&lines);
        self.anon.start_pass2();
        self.pc = 0;
        self.real_pc = 0;
        self.origin = None;
        self.bytes.clear();
        self.current_zone = None;

        self.pass = 2;
        self.run_pass(&lines);

        for sym in self.symbols.undefined() {
            self.diagnostics.error(
                sym.file.clone(),
                sym.line,
                1,
                AsmError::UndefinedSymbol { name: sym.display_name.clone() },
            );
        }

        let segment = Segment {
            start: self.origin.unwrap_or(0) as u16,
            bytes: self.bytes.clone(),
        };
        Ok(AssembledOutput {
            segment,
            listing: std::mem::take(&mut self.listing),
        })
    }

    // ---- Source flattening -------------------------------------------------

    fn flatten(&mut self, path: &Path, depth: u32) -> Result<Vec<SourceLine>, AsmError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(AsmError::IncludeDepthExceeded { limit: MAX_INCLUDE_DEPTH });
        }
        let resolved = self
            .provider
            .resolve(path, &self.options.include_paths)
            .unwrap_or_else(|| path.to_path_buf());
        let text = self
            .provider
            .read_source(&resolved)
            .map_err(|source| AsmError::Include { path: resolved.clone(), source })?;

        let file_name = resolved.display().to_string();
        let mut out = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx as u32 + 1;
            if let Some(rest) = raw.trim_start().strip_prefix("!source") {
                if let Some(included) = extract_quoted(rest) {
                    let include_path = resolved
                        .parent()
                        .map(|p| p.join(&included))
                        .unwrap_or_else(|| PathBuf::from(&included));
                    out.extend(self.flatten(&include_path, depth + 1)?);
                    continue;
                }
            }
            out.push(SourceLine { file: file_name.clone(), line: line_no, text: raw.to_string() });
        }
        Ok(out)
    }

    fn collect_macros(&mut self, lines: &[SourceLine]) {
        let mut i = 0;
        while i < lines.len() {
            if let Ok(stmt) = parse_line(&lines[i].text, lines[i].line) {
                if let StatementBody::Directive { name, args, string_arg: _ } = &stmt.body {
                    if name.eq_ignore_ascii_case("macro") {
                        let macro_name = match args.first() {
                            Some(Expr::Symbol(s)) => s.clone(),
                            _ => {
                                i += 1;
                                continue;
                            }
                        };
                        let params = args[1..]
                            .iter()
                            .filter_map(|e| match e {
                                Expr::Symbol(s) => Some(s.clone()),
                                _ => None,
                            })
                            .collect();
                        let body_start = i + 1;
                        let mut depth = 1;
                        let mut j = body_start;
                        while j < lines.len() && depth > 0 {
                            if let Ok(inner) = parse_line(&lines[j].text, lines[j].line) {
                                if let StatementBody::Directive { name, .. } = &inner.body {
                                    if name.eq_ignore_ascii_case("macro") {
                                        depth += 1;
                                    } else if name.eq_ignore_ascii_case("endmacro")
                                        || name.eq_ignore_ascii_case("endm")
                                    {
                                        depth -= 1;
                                        if depth == 0 {
                                            break;
                                        }
                                    }
                                }
                            }
                            j += 1;
                        }
                        self.macros.insert(
                            macro_name,
                            MacroDef { params, body_start, body_end: j },
                        );
                        i = j + 1;
                        continue;
                    }
                }
            }
            i += 1;
        }
    }

    // ---- Pass driver --------------------------------------------------------

    fn run_pass(&mut self, lines: &[SourceLine]) {
        debug!("starting pass {}", self.pass);
        let mut cond_stack: Vec<CondFrame> = Vec::new();
        let mut loop_stack: Vec<LoopFrame> = Vec::new();
        let mut i = 0usize;
        let mut in_macro_def_depth = 0u32;

        while i < lines.len() {
            let line = &lines[i];
            let stmt = match parse_line(&line.text, line.line) {
                Ok(s) => s,
                Err(e) => {
                    self.diagnostics.error(line.file.clone(), line.line, 1, e);
                    i += 1;
                    continue;
                }
            };

            let active = cond_stack.iter().all(|f| f.active());

            if let StatementBody::Directive { name, .. } = &stmt.body {
                if name.eq_ignore_ascii_case("macro") {
                    in_macro_def_depth += 1;
                    i += 1;
                    continue;
                }
                if name.eq_ignore_ascii_case("endmacro") || name.eq_ignore_ascii_case("endm") {
                    in_macro_def_depth = in_macro_def_depth.saturating_sub(1);
                    i += 1;
                    continue;
                }
            }
            if in_macro_def_depth > 0 {
                i += 1;
                continue;
            }

            if self.handle_conditional(&stmt, active, &mut cond_stack, line) {
                i += 1;
                continue;
            }
            if !active {
                i += 1;
                continue;
            }
            if self.handle_loop_control(&stmt, &mut loop_stack, &mut i, lines) {
                continue;
            }

            self.execute_statement(&stmt, line, lines);
            i += 1;
        }
    }

    fn handle_conditional(
        &mut self,
        stmt: &Statement,
        active: bool,
        cond_stack: &mut Vec<CondFrame>,
        line: &SourceLine,
    ) -> bool {
        let StatementBody::Directive { name, args, .. } = &stmt.body else {
            return false;
        };
        match name.to_ascii_lowercase().as_str() {
            "if" => {
                if cond_stack.len() as u32 >= MAX_COND_DEPTH {
                    self.diagnostics.error(
                        line.file.clone(),
                        line.line,
                        1,
                        AsmError::UnterminatedConditional,
                    );
                    return true;
                }
                let cond = args.first().map(|e| self.eval(e).value != 0).unwrap_or(false);
                cond_stack.push(CondFrame { taking: cond, taken_before: cond, parent_active: active });
                true
            }
            "ifdef" => {
                let cond = args
                    .first()
                    .map(|e| self.symbol_defined(e))
                    .unwrap_or(false);
                cond_stack.push(CondFrame { taking: cond, taken_before: cond, parent_active: active });
                true
            }
            "ifndef" => {
                let cond = args
                    .first()
                    .map(|e| !self.symbol_defined(e))
                    .unwrap_or(false);
                cond_stack.push(CondFrame { taking: cond, taken_before: cond, parent_active: active });
                true
            }
            "else" => {
                match cond_stack.last_mut() {
                    Some(frame) => {
                        frame.taking = !frame.taken_before;
                        frame.taken_before = true;
                    }
                    None => self.diagnostics.error(
                        line.file.clone(),
                        line.line,
                        1,
                        AsmError::UnmatchedConditional,
                    ),
                }
                true
            }
            "endif" => {
                if cond_stack.pop().is_none() {
                    self.diagnostics.error(
                        line.file.clone(),
                        line.line,
                        1,
                        AsmError::UnmatchedConditional,
                    );
                }
                true
            }
            _ => false,
        }
    }

    fn symbol_defined(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Symbol(name) => {
                let mangled = self.symbols.mangle(name, self.current_zone.as_deref());
                self.symbols.is_defined(&mangled)
            }
            _ => false,
        }
    }

    fn handle_loop_control(
        &mut self,
        stmt: &Statement,
        loop_stack: &mut Vec<LoopFrame>,
        i: &mut usize,
        lines: &[SourceLine],
    ) -> bool {
        let StatementBody::Directive { name, args, .. } = &stmt.body else {
            return false;
        };
        match name.to_ascii_lowercase().as_str() {
            "for" => {
                let var_name = match args.first() {
                    Some(Expr::Symbol(s)) => s.clone(),
                    _ => return false,
                };
                let start = args.get(1).map(|e| self.eval(e).value).unwrap_or(0);
                let end = args.get(2).map(|e| self.eval(e).value).unwrap_or(0);
                let step = if end >= start { 1 } else { -1 };
                self.define_loop_var(&var_name, start);
                loop_stack.push(LoopFrame::For {
                    start_line_index: *i + 1,
                    var_name,
                    end_value: end,
                    step,
                    current: start,
                    iterations: 0,
                });
                *i += 1;
                true
            }
            "while" => {
                let condition = match args.first() {
                    Some(e) => e.clone(),
                    None => {
                        self.diagnostics.error(
                            "<loop>",
                            stmt.line,
                            1,
                            AsmError::Parse { expected: "condition expression".into(), found: "nothing".into() },
                        );
                        *i += 1;
                        return true;
                    }
                };
                if self.eval(&condition).value != 0 {
                    loop_stack.push(LoopFrame::While { start_line_index: *i, condition, iterations: 0 });
                    *i += 1;
                } else {
                    *i = find_matching_end(lines, *i) + 1;
                }
                true
            }
            // `!end` closes whichever loop kind is on top of the stack --
            // `!for`/`!while` share a single terminator.
            "end" => {
                match loop_stack.last_mut() {
                    Some(LoopFrame::For { start_line_index, var_name, end_value, step, current, iterations }) => {
                        *iterations += 1;
                        if *iterations > MAX_LOOP_ITERATIONS {
                            self.diagnostics.error(
                                "<loop>",
                                stmt.line,
                                1,
                                AsmError::LoopLimitExceeded { limit: MAX_LOOP_ITERATIONS },
                            );
                            loop_stack.pop();
                            *i += 1;
                            return true;
                        }
                        *current += *step;
                        let done = if *step > 0 { *current > *end_value } else { *current < *end_value };
                        if done {
                            loop_stack.pop();
                            *i += 1;
                        } else {
                            let (name, value, back_to) = (var_name.clone(), *current, *start_line_index);
                            self.define_loop_var(&name, value);
                            *i = back_to;
                        }
                    }
                    Some(LoopFrame::While { start_line_index, condition, iterations }) => {
                        *iterations += 1;
                        if *iterations > MAX_LOOP_ITERATIONS {
                            self.diagnostics.error(
                                "<loop>",
                                stmt.line,
                                1,
                                AsmError::LoopLimitExceeded { limit: MAX_LOOP_ITERATIONS },
                            );
                            loop_stack.pop();
                            *i += 1;
                            return true;
                        }
                        if self.eval(&condition.clone()).value != 0 {
                            *i = *start_line_index;
                        } else {
                            loop_stack.pop();
                            *i += 1;
                        }
                    }
                    None => {
                        self.diagnostics.error(
                            "<loop>",
                            stmt.line,
                            1,
                            AsmError::UnmatchedLoop,
                        );
                        *i += 1;
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn define_loop_var(&mut self, name: &str, value: i64) {
        let mangled = self.symbols.mangle(name, self.current_zone.as_deref());
        let _ = self.symbols.define(
            mangled,
            name,
            value,
            SymbolFlags::FORCE_UPDATE,
            "<loop>",
            0,
        );
    }

    // ---- Per-statement dispatch ---------------------------------------------

    fn execute_statement(&mut self, stmt: &Statement, line: &SourceLine, lines: &[SourceLine]) {
        if let Some(label) = &stmt.label {
            self.define_label(label, line);
        }

        match &stmt.body {
            StatementBody::Empty => {}
            StatementBody::Instruction { mnemonic, syntax } => {
                self.assemble_instruction(mnemonic, syntax, line);
            }
            StatementBody::Directive { name, args, string_arg } => {
                crate::directives::dispatch(self, name, args, string_arg.as_deref(), line);
            }
            StatementBody::Assignment { name, value } => {
                self.define_assignment(name, value, line);
            }
            StatementBody::MacroInvoke { name, args } => {
                self.expand_macro(name, args, line, lines);
            }
        }
    }

    /// `NAME = expr`. Uses `FORCE_UPDATE` like a loop counter: the same
    /// assignment line runs again on pass 2 (and on every iteration, if
    /// it's inside a loop), so the symbol table can't treat that as a
    /// user-authored duplicate the way a genuinely repeated label would be.
    fn define_assignment(&mut self, name: &str, value: &Expr, line: &SourceLine) {
        let result = self.eval(value);
        let mangled = self.symbols.mangle(name, self.current_zone.as_deref());
        let define_result = self.symbols.define(
            mangled,
            name.to_string(),
            result.value,
            SymbolFlags::CONSTANT | SymbolFlags::FORCE_UPDATE,
            line.file.clone(),
            line.line,
        );
        if let Err(e) = define_result {
            self.diagnostics.error(line.file.clone(), line.line, 1, e);
        }
    }

    fn define_label(&mut self, label: &LabelDef, line: &SourceLine) {
        let addr = self.pc as u16;
        match label {
            LabelDef::Global(name) => {
                self.current_zone = Some(name.clone());
                let result = self.symbols.define(
                    name.clone(),
                    name.clone(),
                    addr as i64,
                    SymbolFlags::FORCE_UPDATE,
                    line.file.clone(),
                    line.line,
                );
                if let Err(e) = result {
                    self.diagnostics.error(line.file.clone(), line.line, 1, e);
                }
            }
            LabelDef::Local(name) => {
                let mangled = self.symbols.mangle(&format!(".{name}"), self.current_zone.as_deref());
                let result = self.symbols.define(
                    mangled,
                    format!(".{name}"),
                    addr as i64,
                    SymbolFlags::FORCE_UPDATE | SymbolFlags::LOCAL,
                    line.file.clone(),
                    line.line,
                );
                if let Err(e) = result {
                    self.diagnostics.error(line.file.clone(), line.line, 1, e);
                }
            }
            LabelDef::AnonForward => {
                if self.pass == 1 {
                    self.anon.define_forward(addr);
                } else {
                    self.anon.advance_forward();
                }
            }
            LabelDef::AnonBack => {
                if self.pass == 1 {
                    self.anon.define_backward(addr);
                } else {
                    // Keep pass 2's backward list in step with pass 1's.
                    self.anon.define_backward(addr);
                }
            }
        }
    }

    /// Arguments are whole-word, case-insensitive substituted into the raw
    /// body text before it's parsed -- there's no per-parameter symbol
    /// binding, since an argument is source text (e.g. `LDA`, `$d020,X`,
    /// a bare number), not necessarily a valid expression on its own.
    fn expand_macro(&mut self, name: &str, args: &[String], line: &SourceLine, lines: &[SourceLine]) {
        let def = match self.macros.get(name) {
            Some(d) => d.clone(),
            None => {
                self.diagnostics.error(
                    line.file.clone(),
                    line.line,
                    1,
                    AsmError::UndefinedMacro { name: name.to_string() },
                );
                return;
            }
        };
        if def.params.len() != args.len() {
            self.diagnostics.error(
                line.file.clone(),
                line.line,
                1,
                AsmError::MacroArityMismatch {
                    name: name.to_string(),
                    expected: def.params.len(),
                    got: args.len(),
                },
            );
            return;
        }
        if self.macro_depth >= MAX_MACRO_DEPTH {
            self.diagnostics.error(
                line.file.clone(),
                line.line,
                1,
                AsmError::MacroRecursionLimit { limit: MAX_MACRO_DEPTH },
            );
            return;
        }

        self.macro_expansion_counter += 1;
        let saved_zone = self.current_zone.clone();
        self.current_zone = Some(format!("_macro{}", self.macro_expansion_counter));

        let body: Vec<SourceLine> = lines[def.body_start..def.body_end]
            .iter()
            .map(|l| SourceLine {
                file: l.file.clone(),
                line: l.line,
                text: substitute_macro_params(&l.text, &def.params, args),
            })
            .collect();

        self.macro_depth += 1;
        self.run_pass(&body);
        self.macro_depth -= 1;
        self.current_zone = saved_zone;
    }

    // ---- Instruction assembly -------------------------------------------------

    fn assemble_instruction(&mut self, mnemonic: &str, syntax: &OperandSyntax, line: &SourceLine) {
        if !opcodes::is_valid_mnemonic(mnemonic) {
            self.diagnostics.error(
                line.file.clone(),
                line.line,
                1,
                AsmError::UnknownMnemonic { name: mnemonic.to_string() },
            );
            return;
        }

        let zone = self.current_zone.clone();
        let pc = self.pc as u16;
        let cpu = self.options.cpu;
        let symbols = &self.symbols;
        let anon = &self.anon;
        let pass = self.pass;
        let resolved: Result<Resolved, AsmError> = addressing::resolve(mnemonic, syntax, cpu, |e| {
            expr::eval(e, symbols, anon, pc, pass, zone.as_deref())
        });

        let resolved = match resolved {
            Ok(r) => r,
            Err(e) => {
                self.diagnostics.error(line.file.clone(), line.line, 1, e);
                return;
            }
        };

        let entry = match opcodes::find(mnemonic, resolved.mode, cpu) {
            Some(e) => e,
            None => {
                let err = if opcodes::is_illegal(mnemonic) {
                    AsmError::IllegalOpcodeNotSupported {
                        mnemonic: mnemonic.to_string(),
                        cpu: format!("{cpu:?}"),
                    }
                } else {
                    AsmError::InvalidAddressingMode {
                        mnemonic: mnemonic.to_string(),
                        mode: resolved.mode.name().to_string(),
                    }
                };
                self.diagnostics.error(line.file.clone(), line.line, 1, err);
                return;
            }
        };

        let size = entry.size() as u32;
        if self.pass == 1 {
            self.advance_pc(size);
            return;
        }

        let mut out = vec![entry.opcode];
        if let Some(expr_val) = &resolved.expr {
            let value = self.eval(expr_val);
            if !value.defined {
                self.diagnostics.error(
                    line.file.clone(),
                    line.line,
                    1,
                    AsmError::UndefinedSymbol { name: format!("{expr_val:?}") },
                );
                self.advance_pc(size);
                return;
            }
            if resolved.mode == opcodes::Mode::Relative {
                let pc_after = self.pc as u16 + size as u16;
                match addressing::branch_offset(pc_after, value.value as u16) {
                    Ok(offset) => out.push(offset as u8),
                    Err(e) => {
                        self.diagnostics.error(line.file.clone(), line.line, 1, e);
                        self.advance_pc(size);
                        return;
                    }
                }
            } else if size == 2 {
                out.push((value.value & 0xFF) as u8);
            } else if size == 3 {
                out.push((value.value & 0xFF) as u8);
                out.push(((value.value >> 8) & 0xFF) as u8);
            }
        }

        trace!("{}: {} -> {:02X?}", line.line, mnemonic, out);
        self.emit_bytes(&out, line);
    }

    // ---- Shared evaluation / emission helpers --------------------------------

    pub(crate) fn eval(&self, expr: &Expr) -> expr::ExprResult {
        expr::eval(expr, &self.symbols, &self.anon, self.pc as u16, self.pass, self.current_zone.as_deref())
    }

    pub(crate) fn pc(&self) -> u32 {
        self.pc
    }

    pub(crate) fn pass(&self) -> u8 {
        self.pass
    }

    pub(crate) fn cpu(&self) -> Cpu {
        self.options.cpu
    }

    pub(crate) fn set_cpu(&mut self, cpu: Cpu) {
        self.options.cpu = cpu;
    }

    pub(crate) fn current_zone(&self) -> Option<&str> {
        self.current_zone.as_deref()
    }

    pub(crate) fn set_zone(&mut self, zone: Option<String>) {
        self.current_zone = zone;
    }

    pub(crate) fn error(&mut self, line: &SourceLine, err: AsmError) {
        self.diagnostics.error(line.file.clone(), line.line, 1, err);
    }

    pub(crate) fn warning(&mut self, line: &SourceLine, message: impl Into<String>) {
        self.diagnostics.warning(line.file.clone(), line.line, 1, message);
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub(crate) fn read_binary(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let resolved = self
            .provider
            .resolve(path, &self.options.include_paths)
            .unwrap_or_else(|| path.to_path_buf());
        self.provider.read_binary(&resolved)
    }

    /// Advance both virtual and physical PC by `count` bytes without
    /// emitting anything (used by `!skip`, pass-1 sizing, etc.).
    pub(crate) fn advance_pc(&mut self, count: u32) {
        self.pc += count;
        self.real_pc += count;
    }

    /// Set the origin. The first `!org` in a file fixes the segment's
    /// base address; subsequent ones jump forward, zero-filling the gap.
    pub(crate) fn set_origin(&mut self, addr: u32) {
        if self.origin.is_none() {
            self.origin = Some(addr);
            self.pc = addr;
            self.real_pc = addr;
            return;
        }
        if self.pass == 2 && addr as usize > self.origin.unwrap_or(0) as usize + self.bytes.len() {
            let gap = addr - self.real_pc;
            self.bytes.resize(self.bytes.len() + gap as usize, 0);
        }
        self.pc = addr;
        self.real_pc = addr;
    }

    /// Enter pseudo-PC mode: `addr` becomes the virtual PC used for
    /// address calculations while bytes keep landing at the real PC.
    pub(crate) fn push_pseudo_pc(&mut self, addr: u32) {
        self.pseudo_pc_stack.push(self.pc);
        self.pc = addr;
    }

    pub(crate) fn pop_pseudo_pc(&mut self, line: &SourceLine) {
        match self.pseudo_pc_stack.pop() {
            Some(saved) => self.pc = saved,
            None => self.error(line, AsmError::Parse {
                expected: "!pseudopc before !realpc".into(),
                found: "!realpc".into(),
            }),
        }
    }

    pub(crate) fn emit_bytes(&mut self, bytes: &[u8], line: &SourceLine) {
        if self.origin.is_none() {
            self.set_origin(self.pc);
        }
        let offset = (self.real_pc - self.origin.unwrap_or(0)) as usize;
        if offset > self.bytes.len() {
            self.bytes.resize(offset, 0);
        }
        if offset == self.bytes.len() {
            self.bytes.extend_from_slice(bytes);
        } else {
            for (i, b) in bytes.iter().enumerate() {
                let at = offset + i;
                if at < self.bytes.len() {
                    self.bytes[at] = *b;
                } else {
                    self.bytes.push(*b);
                }
            }
        }
        self.listing.push(ListingLine {
            line: line.line,
            address: Some(self.pc as u16),
            bytes: bytes.to_vec(),
            source: line.text.clone(),
        });
        self.pc += bytes.len() as u32;
        self.real_pc += bytes.len() as u32;
    }

    pub(crate) fn emit_str_petscii(&mut self, s: &str, line: &SourceLine) {
        let bytes = charset::str_to_petscii(s);
        self.emit_bytes(&bytes, line);
    }

    pub(crate) fn emit_str_screencode(&mut self, s: &str, line: &SourceLine) {
        let bytes = charset::str_to_screencode(s);
        self.emit_bytes(&bytes, line);
    }
}

/// Scan forward from a `!while` line for its matching `!end`, accounting
/// for nested `!for`/`!while` blocks of either kind.
fn find_matching_end(lines: &[SourceLine], start: usize) -> usize {
    let mut depth = 1;
    let mut j = start + 1;
    while j < lines.len() {
        if let Ok(stmt) = parse_line(&lines[j].text, lines[j].line) {
            if let StatementBody::Directive { name, .. } = &stmt.body {
                if name.eq_ignore_ascii_case("while") || name.eq_ignore_ascii_case("for") {
                    depth += 1;
                } else if name.eq_ignore_ascii_case("end") {
                    depth -= 1;
                    if depth == 0 {
                        return j;
                    }
                }
            }
        }
        j += 1;
    }
    lines.len().saturating_sub(1)
}

/// Whole-word, case-insensitive substitution of macro parameter names with
/// their call-site argument text. Identifier runs (alphanumeric/`_`) are
/// matched against `params`; everything else (operators, punctuation,
/// string/char literal contents, whitespace) passes through untouched.
fn substitute_macro_params(text: &str, params: &[String], args: &[String]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match params.iter().position(|p| p.eq_ignore_ascii_case(&word)) {
                Some(idx) => out.push_str(&args[idx]),
                None => out.push_str(&word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn extract_quoted(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let start = trimmed.find('"')?;
    let rest = &trimmed[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::test_helpers::MemorySourceProvider;

    fn assemble(src: &str) -> AssembledOutput {
        let provider = MemorySourceProvider::new().with_source("main.asm", src);
        let mut asm = Assembler::new(&provider, Options::default());
        asm.assemble_file(Path::new("main.asm")).unwrap()
    }

    #[test]
    fn simple_program_assembles_to_expected_bytes() {
        let out = assemble("!org $c000\nLDA #$01\nSTA $D020\nRTS\n");
        assert_eq!(out.segment.start, 0xC000);
        assert_eq!(out.segment.bytes, vec![0xA9, 0x01, 0x8D, 0x20, 0xD0, 0x60]);
    }

    #[test]
    fn forward_label_reference_resolves() {
        let out = assemble("!org $c000\nJMP TARGET\nNOP\nTARGET: RTS\n");
        assert_eq!(out.segment.bytes, vec![0x4C, 0x04, 0xC0, 0xEA, 0x60]);
    }

    #[test]
    fn backward_branch_resolves_to_negative_offset() {
        let out = assemble("!org $c000\nLOOP: DEX\nBNE LOOP\n");
        assert_eq!(out.segment.bytes, vec![0xCA, 0xD0, 0xFD]);
    }

    #[test]
    fn zero_page_narrowing_applies_to_small_addresses() {
        let out = assemble("!org $c000\nLDA $10\n");
        assert_eq!(out.segment.bytes, vec![0xA5, 0x10]);
    }

    #[test]
    fn conditional_assembly_skips_false_branch() {
        let out = assemble("!org $c000\n!if 0\nLDA #1\n!else\nLDA #2\n!endif\n");
        assert_eq!(out.segment.bytes, vec![0xA9, 0x02]);
    }

    #[test]
    fn ifdef_checks_symbol_table() {
        let out = assemble("FOO = 1\n!org $c000\n!ifdef FOO\nLDA #1\n!endif\n");
        assert_eq!(out.segment.bytes, vec![0xA9, 0x01]);
    }

    #[test]
    fn star_equals_sets_origin_and_assignment_defines_symbol() {
        let out = assemble("*=$1000\nVAL=$42\nLDA #VAL\nRTS\n");
        assert_eq!(out.segment.start, 0x1000);
        assert_eq!(out.segment.bytes, vec![0xA9, 0x42, 0x60]);
    }

    #[test]
    fn for_loop_uses_end_terminator() {
        let out = assemble("*=$1000\n!for i,0,2\n!byte i\n!end\n");
        assert_eq!(out.segment.bytes, vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn while_loop_uses_end_terminator() {
        let out = assemble("*=$1000\nCOUNT=0\n!while COUNT<3\n!byte COUNT\nCOUNT=COUNT+1\n!end\n");
        assert_eq!(out.segment.bytes, vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn macro_invocation_substitutes_arguments_textually() {
        let out = assemble(
            "!macro setbyte value\n!byte value\n!endmacro\n*=$1000\n+setbyte $42\n+setbyte $43\n",
        );
        assert_eq!(out.segment.bytes, vec![0x42, 0x43]);
    }

    #[test]
    fn endm_is_accepted_as_macro_terminator_alias() {
        let out = assemble("!macro one\nRTS\n!endm\n*=$1000\n+one\n");
        assert_eq!(out.segment.bytes, vec![0x60]);
    }

    #[test]
    fn undefined_symbol_is_reported() {
        let provider = MemorySourceProvider::new().with_source("main.asm", "!org $c000\nJMP NOWHERE\n");
        let mut asm = Assembler::new(&provider, Options::default());
        asm.assemble_file(Path::new("main.asm")).unwrap();
        assert!(asm.diagnostics().has_errors());
    }
}
