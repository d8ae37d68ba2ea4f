//! Handlers for every non-control-flow directive: data emission
//! (`!byte`/`!word`/`!text`/`!fill`/`!skip`/`!align`/`!binary`), PETSCII
//! and screen-code string emission (`!pet`/`!scr`/`!null`), origin and
//! relocation control (`!org`/`!pseudopc`/`!realpc`), the `!basic` SYS
//! stub, and `!cpu`/`!zone`/`!zn`.
//!
//! `!if`/`!ifdef`/`!ifndef`/`!else`/`!endif`, `!for`/`!while`/`!end`,
//! `!macro`/`!endmacro` and `!source` are control flow and are
//! intercepted earlier by `engine::Assembler::run_pass` before a
//! statement ever reaches `dispatch`.
//!
//! The `!basic` SYS-address algorithm is grounded on
//! `original_source/src/assembler.c`'s iterative digit-count search: the
//! stub's length depends on how many digits the SYS target has, and the
//! target is the address right after the stub, so the two are solved by
//! iterating until a guess is self-consistent.

use crate::charset;
use crate::engine::{Assembler, SourceLine};
use crate::error::AsmError;
use crate::expr::Expr;
use crate::opcodes::Cpu;

pub(crate) fn dispatch(
    engine: &mut Assembler,
    name: &str,
    args: &[Expr],
    string_arg: Option<&str>,
    line: &SourceLine,
) {
    match name.to_ascii_lowercase().as_str() {
        "byte" | "by" | "db" | "08" => emit_bytes_directive(engine, args, line),
        "word" | "wo" | "dw" | "16" => emit_words_directive(engine, args, line),
        "text" | "tx" => emit_text_directive(engine, args, string_arg, line),
        "fill" => emit_fill_directive(engine, args, line),
        "org" => emit_org_directive(engine, args, line),
        "pet" => emit_pet_directive(engine, string_arg, line),
        "scr" => emit_scr_directive(engine, string_arg, line),
        "null" => emit_null_directive(engine, string_arg, line),
        "skip" | "res" => emit_skip_directive(engine, args, line),
        "align" => emit_align_directive(engine, args, line),
        "binary" => emit_binary_directive(engine, args, string_arg, line),
        "basic" => emit_basic_directive(engine, line),
        "pseudopc" => emit_pseudopc_directive(engine, args, line),
        "realpc" => engine.pop_pseudo_pc(line),
        "cpu" => emit_cpu_directive(engine, args, string_arg, line),
        "zone" | "zn" => emit_zone_directive(engine, args, string_arg),
        "warn" | "error" | "warning" => emit_user_message(engine, name, string_arg, line),
        // An unknown directive name is ignored, not fatal -- matches
        // running an assembler built against a newer dialect.
        other => engine.warning(line, format!("unknown directive '!{other}', ignoring")),
    }
}

fn eval_u8(engine: &mut Assembler, expr: &Expr, line: &SourceLine) -> u8 {
    let result = engine.eval(expr);
    if !result.defined && engine.pass() == 2 {
        engine.error(line, AsmError::UndefinedSymbol { name: format!("{expr:?}") });
    }
    (result.value & 0xFF) as u8
}

fn eval_value(engine: &mut Assembler, expr: &Expr, line: &SourceLine) -> i64 {
    let result = engine.eval(expr);
    if !result.defined && engine.pass() == 2 {
        engine.error(line, AsmError::UndefinedSymbol { name: format!("{expr:?}") });
    }
    result.value
}

fn emit_bytes_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    if engine.pass() == 1 {
        engine.advance_pc(args.len() as u32);
        return;
    }
    let bytes: Vec<u8> = args.iter().map(|e| eval_u8(engine, e, line)).collect();
    engine.emit_bytes(&bytes, line);
}

fn emit_words_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    if engine.pass() == 1 {
        engine.advance_pc(args.len() as u32 * 2);
        return;
    }
    let mut bytes = Vec::with_capacity(args.len() * 2);
    for e in args {
        let value = eval_value(engine, e, line);
        bytes.push((value & 0xFF) as u8);
        bytes.push(((value >> 8) & 0xFF) as u8);
    }
    engine.emit_bytes(&bytes, line);
}

fn emit_text_directive(engine: &mut Assembler, args: &[Expr], string_arg: Option<&str>, line: &SourceLine) {
    if let Some(s) = string_arg {
        let bytes = charset::str_to_petscii(s);
        if engine.pass() == 1 {
            engine.advance_pc(bytes.len() as u32);
        } else {
            engine.emit_bytes(&bytes, line);
        }
        return;
    }
    emit_bytes_directive(engine, args, line);
}

fn emit_fill_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    let count = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(0).max(0) as usize;
    let value = args.get(1).map(|e| eval_u8(engine, e, line)).unwrap_or(0);
    if engine.pass() == 1 {
        engine.advance_pc(count as u32);
        return;
    }
    engine.emit_bytes(&vec![value; count], line);
}

fn emit_org_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    let addr = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(0);
    engine.set_origin((addr & 0xFFFF) as u32);
}

fn emit_pet_directive(engine: &mut Assembler, string_arg: Option<&str>, line: &SourceLine) {
    let Some(s) = string_arg else {
        engine.error(line, AsmError::Parse { expected: "string literal".into(), found: "nothing".into() });
        return;
    };
    if engine.pass() == 1 {
        engine.advance_pc(s.len() as u32);
        return;
    }
    engine.emit_str_petscii(s, line);
}

fn emit_scr_directive(engine: &mut Assembler, string_arg: Option<&str>, line: &SourceLine) {
    let Some(s) = string_arg else {
        engine.error(line, AsmError::Parse { expected: "string literal".into(), found: "nothing".into() });
        return;
    };
    if engine.pass() == 1 {
        engine.advance_pc(s.len() as u32);
        return;
    }
    engine.emit_str_screencode(s, line);
}

fn emit_null_directive(engine: &mut Assembler, string_arg: Option<&str>, line: &SourceLine) {
    let Some(s) = string_arg else {
        engine.error(line, AsmError::Parse { expected: "string literal".into(), found: "nothing".into() });
        return;
    };
    if engine.pass() == 1 {
        engine.advance_pc(s.len() as u32 + 1);
        return;
    }
    let mut bytes = charset::str_to_petscii(s);
    bytes.push(0);
    engine.emit_bytes(&bytes, line);
}

fn emit_skip_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    let count = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(0).max(0) as u32;
    engine.advance_pc(count);
}

fn emit_align_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    let alignment = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(1).max(1) as u32;
    let fill_value = args.get(1).map(|e| eval_u8(engine, e, line)).unwrap_or(0);
    let pc = engine.pc();
    let remainder = pc % alignment;
    let padding = if remainder == 0 { 0 } else { alignment - remainder };
    if engine.pass() == 1 {
        engine.advance_pc(padding);
        return;
    }
    engine.emit_bytes(&vec![fill_value; padding as usize], line);
}

fn emit_binary_directive(engine: &mut Assembler, args: &[Expr], string_arg: Option<&str>, line: &SourceLine) {
    let Some(path) = string_arg else {
        engine.error(line, AsmError::Parse { expected: "file path string".into(), found: "nothing".into() });
        return;
    };
    let skip = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(0).max(0) as usize;
    let take = args.get(1).map(|e| eval_value(engine, e, line) as usize);

    match engine.read_binary(std::path::Path::new(path)) {
        Ok(data) => {
            let sliced: Vec<u8> = data
                .into_iter()
                .skip(skip)
                .take(take.unwrap_or(usize::MAX))
                .collect();
            if engine.pass() == 1 {
                engine.advance_pc(sliced.len() as u32);
            } else {
                engine.emit_bytes(&sliced, line);
            }
        }
        Err(source) => engine.error(
            line,
            AsmError::BinaryInclude { path: path.into(), source },
        ),
    }
}

fn emit_pseudopc_directive(engine: &mut Assembler, args: &[Expr], line: &SourceLine) {
    let addr = args.first().map(|e| eval_value(engine, e, line)).unwrap_or(0);
    engine.push_pseudo_pc((addr & 0xFFFF) as u32);
}

fn emit_cpu_directive(engine: &mut Assembler, args: &[Expr], string_arg: Option<&str>, line: &SourceLine) {
    let name = if let Some(s) = string_arg {
        s.to_string()
    } else {
        match args.first() {
            Some(Expr::Number(n)) => n.to_string(),
            Some(Expr::Symbol(s)) => s.clone(),
            _ => {
                engine.error(line, AsmError::Parse { expected: "CPU name".into(), found: "nothing".into() });
                return;
            }
        }
    };
    match Cpu::parse(&name) {
        Some(cpu) => engine.set_cpu(cpu),
        None => engine.error(line, AsmError::User(format!("unknown CPU target '{name}'"))),
    }
}

fn emit_zone_directive(engine: &mut Assembler, args: &[Expr], string_arg: Option<&str>) {
    if let Some(name) = string_arg {
        engine.set_zone(Some(name.to_string()));
        return;
    }
    match args.first() {
        Some(Expr::Symbol(name)) => engine.set_zone(Some(name.clone())),
        _ => engine.set_zone(None),
    }
}

fn emit_user_message(engine: &mut Assembler, name: &str, string_arg: Option<&str>, line: &SourceLine) {
    let message = string_arg.unwrap_or("").to_string();
    if name.eq_ignore_ascii_case("error") {
        engine.error(line, AsmError::User(message));
    } else {
        engine.warning(line, message);
    }
}

/// Synthesize a minimal C64 BASIC line `10 SYS <addr>` where `<addr>` is
/// the address immediately following the stub itself. The stub's byte
/// length depends on how many decimal digits the SYS address needs, and
/// the address depends on the stub's length, so the digit count is
/// guessed and checked until it's stable (4 digits first, falling back
/// to 5 if the guessed address doesn't fit).
fn emit_basic_directive(engine: &mut Assembler, line: &SourceLine) {
    let origin = engine.pc();

    let build_stub = |sys_addr: u32, line_no: u16| -> Vec<u8> {
        let digits = sys_addr.to_string().into_bytes();
        let mut tokens = vec![0x9Eu8]; // SYS token
        tokens.push(b' ');
        tokens.extend_from_slice(&digits);
        tokens.push(0x00); // end of BASIC line

        let mut stub = Vec::new();
        // next-line link, patched below once we know the total length
        stub.extend_from_slice(&[0u8, 0u8]);
        stub.push((line_no & 0xFF) as u8);
        stub.push((line_no >> 8) as u8);
        stub.extend_from_slice(&tokens);
        stub.extend_from_slice(&[0u8, 0u8]); // end-of-program link

        let link = origin as u16 + stub.len() as u16 - 2;
        stub[0] = (link & 0xFF) as u8;
        stub[1] = (link >> 8) as u8;
        stub
    };

    let mut stub = build_stub(0, 10);
    for _ in 0..4 {
        let sys_addr = origin + stub.len() as u32;
        let next = build_stub(sys_addr, 10);
        if next.len() == stub.len() {
            stub = next;
            break;
        }
        stub = next;
    }

    if engine.pass() == 1 {
        engine.advance_pc(stub.len() as u32);
    } else {
        engine.emit_bytes(&stub, line);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::Options;
    use crate::source::test_helpers::MemorySourceProvider;
    use std::path::Path;

    fn assemble(src: &str) -> crate::engine::AssembledOutput {
        let provider = MemorySourceProvider::new().with_source("main.asm", src);
        let mut asm = Assembler::new(&provider, Options::default());
        asm.assemble_file(Path::new("main.asm")).unwrap()
    }

    #[test]
    fn byte_directive_emits_literal_bytes() {
        let out = assemble("!org $c000\n!byte $01, $02, $03\n");
        assert_eq!(out.segment.bytes, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn word_directive_emits_little_endian_pairs() {
        let out = assemble("!org $c000\n!word $1234\n");
        assert_eq!(out.segment.bytes, vec![0x34, 0x12]);
    }

    #[test]
    fn fill_directive_repeats_value() {
        let out = assemble("!org $c000\n!fill 4, $AA\n");
        assert_eq!(out.segment.bytes, vec![0xAA, 0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn fill_directive_defaults_to_zero() {
        let out = assemble("!org $c000\n!fill 3\n");
        assert_eq!(out.segment.bytes, vec![0x00, 0x00, 0x00]);
    }

    #[test]
    fn align_pads_to_boundary() {
        let out = assemble("!org $c001\n!align 4\nNOP\n");
        assert_eq!(out.segment.bytes, vec![0x00, 0x00, 0x00, 0xEA]);
    }

    #[test]
    fn pet_directive_emits_petscii_bytes() {
        let out = assemble("!org $c000\n!pet \"AB\"\n");
        assert_eq!(out.segment.bytes, charset::str_to_petscii("AB"));
    }

    #[test]
    fn null_directive_appends_terminator() {
        let out = assemble("!org $c000\n!null \"A\"\n");
        let mut expected = charset::str_to_petscii("A");
        expected.push(0);
        assert_eq!(out.segment.bytes, expected);
    }

    #[test]
    fn zone_directive_scopes_local_labels() {
        let out = assemble(
            "!org $c000\n!zone one\n.loop: NOP\nJMP .loop\n!zone two\n.loop: NOP\nJMP .loop\n",
        );
        // Each zone's `.loop` resolves to its own local label, not the
        // other zone's, so both JMPs should target their nearby NOP.
        assert_eq!(out.segment.bytes[0], 0xEA);
        assert_eq!(out.segment.bytes[4], 0xEA);
    }

    #[test]
    fn basic_stub_precedes_machine_code() {
        let out = assemble("!org $0801\n!basic\nLDA #1\n");
        assert_eq!(out.segment.start, 0x0801);
        assert!(out.segment.bytes.len() > 2);
        assert_eq!(out.segment.bytes[4], 0x9E);
    }

    #[test]
    fn cpu_directive_enables_illegal_opcodes() {
        let out = assemble("!cpu 6510\n!org $c000\nLAX $10\n");
        assert_eq!(out.segment.bytes, vec![0xA7, 0x10]);
    }

    #[test]
    fn unknown_directive_is_a_warning_not_an_error() {
        let provider = MemorySourceProvider::new().with_source("main.asm", "!org $c000\n!notreal\nNOP\n");
        let mut asm = Assembler::new(&provider, Options::default());
        let out = asm.assemble_file(Path::new("main.asm")).unwrap();
        assert!(!asm.diagnostics().has_errors());
        assert_eq!(out.segment.bytes, vec![0xEA]);
    }

    #[test]
    fn byte_directive_aliases_match_byte() {
        let db = assemble("!org $c000\n!db $01, $02\n");
        let zero8 = assemble("!org $c000\n!08 $01, $02\n");
        assert_eq!(db.segment.bytes, vec![0x01, 0x02]);
        assert_eq!(zero8.segment.bytes, vec![0x01, 0x02]);
    }

    #[test]
    fn word_directive_aliases_match_word() {
        let wo = assemble("!org $c000\n!wo $1234\n");
        let dw = assemble("!org $c000\n!dw $1234\n");
        let one6 = assemble("!org $c000\n!16 $1234\n");
        assert_eq!(wo.segment.bytes, vec![0x34, 0x12]);
        assert_eq!(dw.segment.bytes, vec![0x34, 0x12]);
        assert_eq!(one6.segment.bytes, vec![0x34, 0x12]);
    }

    #[test]
    fn text_directive_tx_alias() {
        let out = assemble("!org $c000\n!tx \"AB\"\n");
        assert_eq!(out.segment.bytes, charset::str_to_petscii("AB"));
    }

    #[test]
    fn skip_directive_res_alias() {
        let out = assemble("!org $c000\n!res 2\nNOP\n");
        assert_eq!(out.segment.bytes, vec![0x00, 0x00, 0xEA]);
    }

    #[test]
    fn warning_alias_emits_a_warning_not_an_error() {
        let provider = MemorySourceProvider::new().with_source("main.asm", "!org $c000\n!warning \"heads up\"\n");
        let mut asm = Assembler::new(&provider, Options::default());
        asm.assemble_file(Path::new("main.asm")).unwrap();
        assert!(!asm.diagnostics().has_errors());
    }
}
