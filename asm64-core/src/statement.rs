//! Parses one tokenized source line into a `Statement`: an optional label
//! definition followed by an instruction, directive, or macro invocation.

use crate::addressing::OperandSyntax;
use crate::error::AsmError;
use crate::expr::{Expr, ExprParser};
use crate::lexer::{tokenize_line, Token, TokenKind};
use crate::opcodes;

#[derive(Debug, Clone, PartialEq)]
pub enum LabelDef {
    Global(String),
    Local(String),
    AnonForward,
    AnonBack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    Empty,
    Instruction {
        mnemonic: String,
        syntax: OperandSyntax,
    },
    Directive {
        name: String,
        args: Vec<Expr>,
        string_arg: Option<String>,
    },
    /// `NAME = expr` -- a symbol assignment, distinct from a label in that
    /// it can be reassigned on a later pass (and, inside a loop body, on
    /// every iteration).
    Assignment {
        name: String,
        value: Expr,
    },
    /// `+name arg1 arg2 ...` -- arguments are kept as raw source text, not
    /// evaluated, since macro expansion substitutes them textually into the
    /// body before it's parsed.
    MacroInvoke {
        name: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub label: Option<LabelDef>,
    pub body: StatementBody,
    pub line: u32,
}

/// Index into a token slice, treating anything past the end as `Eof` --
/// every tokenized line already ends with one, but sub-slices taken while
/// parsing an operand can run short on malformed input.
fn at(tokens: &[Token], index: usize) -> TokenKind {
    tokens
        .get(index)
        .map(|t| t.kind.clone())
        .unwrap_or(TokenKind::Eof)
}

pub fn parse_line(source: &str, line: u32) -> Result<Statement, AsmError> {
    let tokens = tokenize_line(source, line)?;
    parse_tokens(&tokens, line, source)
}

fn parse_tokens(tokens: &[Token], line: u32, source: &str) -> Result<Statement, AsmError> {
    let mut pos = 0usize;
    let peek = |pos: usize| -> &TokenKind { &tokens[pos.min(tokens.len() - 1)].kind };

    let mut label = None;

    // A leading anonymous `+`/`-` immediately followed by end-of-line is a
    // label definition rather than an operand reference.
    match peek(pos) {
        TokenKind::AnonForward(_) if matches!(peek(pos + 1), TokenKind::Eol | TokenKind::Eof) => {
            label = Some(LabelDef::AnonForward);
            pos += 1;
        }
        TokenKind::AnonBack(_) if matches!(peek(pos + 1), TokenKind::Eol | TokenKind::Eof) => {
            label = Some(LabelDef::AnonBack);
            pos += 1;
        }
        TokenKind::Identifier(name) => {
            if matches!(peek(pos + 1), TokenKind::Colon) {
                label = Some(LabelDef::Global(name.clone()));
                pos += 2;
            } else if matches!(peek(pos + 1), TokenKind::Eq) {
                // `NAME = expr` -- an assignment, not a label.
                let name = name.clone();
                let mut parser = ExprParser::new(&tokens[pos + 2..]);
                let value = parser.parse()?;
                return Ok(Statement {
                    label: None,
                    body: StatementBody::Assignment { name, value },
                    line,
                });
            } else if matches!(peek(pos + 1), TokenKind::Eol | TokenKind::Eof) {
                label = Some(LabelDef::Global(name.clone()));
                pos += 1;
            }
        }
        TokenKind::LocalLabel(name) => {
            if matches!(peek(pos + 1), TokenKind::Colon) {
                label = Some(LabelDef::Local(name.clone()));
                pos += 2;
            } else if matches!(peek(pos + 1), TokenKind::Eol | TokenKind::Eof) {
                label = Some(LabelDef::Local(name.clone()));
                pos += 1;
            }
        }
        _ => {}
    }

    if matches!(peek(pos), TokenKind::Eol | TokenKind::Eof) {
        return Ok(Statement { label, body: StatementBody::Empty, line });
    }

    let rest = &tokens[pos..];
    let body = parse_body(rest, line, source)?;
    Ok(Statement { label, body, line })
}

fn parse_body(tokens: &[Token], line: u32, source: &str) -> Result<StatementBody, AsmError> {
    match &tokens[0].kind {
        TokenKind::Directive(name) => parse_directive(name.clone(), &tokens[1..], line),
        TokenKind::MacroCall(name) => parse_macro_invoke(name.clone(), &tokens[0], source),
        // `*= expr` -- origin-setting, equivalent to `!org expr`.
        TokenKind::Star if matches!(at(tokens, 1), TokenKind::Eq) => {
            let mut parser = ExprParser::new(&tokens[2..]);
            let expr = parser.parse()?;
            Ok(StatementBody::Directive {
                name: "org".to_string(),
                args: vec![expr],
                string_arg: None,
            })
        }
        TokenKind::Identifier(name) if opcodes::is_valid_mnemonic(name) => {
            parse_instruction(name.clone(), &tokens[1..])
        }
        other => Err(AsmError::Parse {
            expected: "instruction, directive, or macro invocation".into(),
            found: format!("{other:?}"),
        }),
    }
}

fn parse_instruction(mnemonic: String, rest: &[Token]) -> Result<StatementBody, AsmError> {
    if matches!(at(rest, 0), TokenKind::Eol | TokenKind::Eof) {
        return Ok(StatementBody::Instruction {
            mnemonic,
            syntax: OperandSyntax::None,
        });
    }

    // Bare `A` accumulator shorthand, e.g. `ROL A`.
    if let TokenKind::Identifier(id) = at(rest, 0) {
        if id.eq_ignore_ascii_case("a") && matches!(at(rest, 1), TokenKind::Eol | TokenKind::Eof) {
            return Ok(StatementBody::Instruction {
                mnemonic,
                syntax: OperandSyntax::Accumulator,
            });
        }
    }

    if matches!(at(rest, 0), TokenKind::Hash) {
        let mut parser = ExprParser::new(&rest[1..]);
        let expr = parser.parse()?;
        return Ok(StatementBody::Instruction {
            mnemonic,
            syntax: OperandSyntax::Immediate(expr),
        });
    }

    if matches!(at(rest, 0), TokenKind::LParen) {
        let mut parser = ExprParser::new(&rest[1..]);
        let expr = parser.parse()?;
        let after = rest[(1 + parser.position()).min(rest.len())..].to_vec();
        return parse_indirect_tail(mnemonic, expr, &after);
    }

    let mut parser = ExprParser::new(rest);
    let expr = parser.parse()?;
    let after_pos = parser.position();
    match at(rest, after_pos) {
        TokenKind::Comma => match at(rest, after_pos + 1) {
            TokenKind::Identifier(reg) if reg.eq_ignore_ascii_case("x") => Ok(StatementBody::Instruction {
                mnemonic,
                syntax: OperandSyntax::AddressX(expr),
            }),
            TokenKind::Identifier(reg) if reg.eq_ignore_ascii_case("y") => Ok(StatementBody::Instruction {
                mnemonic,
                syntax: OperandSyntax::AddressY(expr),
            }),
            other => Err(AsmError::Parse {
                expected: "X or Y index register".into(),
                found: format!("{other:?}"),
            }),
        },
        TokenKind::Eol | TokenKind::Eof => Ok(StatementBody::Instruction {
            mnemonic,
            syntax: OperandSyntax::Address(expr),
        }),
        other => Err(AsmError::Parse {
            expected: "end of line or index register".into(),
            found: format!("{other:?}"),
        }),
    }
}

fn parse_indirect_tail(
    mnemonic: String,
    expr: Expr,
    after: &[Token],
) -> Result<StatementBody, AsmError> {
    match at(after, 0) {
        TokenKind::Comma => match at(after, 1) {
            TokenKind::Identifier(reg) if reg.eq_ignore_ascii_case("x") => match at(after, 2) {
                TokenKind::RParen => Ok(StatementBody::Instruction {
                    mnemonic,
                    syntax: OperandSyntax::IndirectX(expr),
                }),
                other => Err(AsmError::Parse {
                    expected: ")".into(),
                    found: format!("{other:?}"),
                }),
            },
            other => Err(AsmError::Parse {
                expected: "X register in (expr,X)".into(),
                found: format!("{other:?}"),
            }),
        },
        TokenKind::RParen => match at(after, 1) {
            TokenKind::Comma => match at(after, 2) {
                TokenKind::Identifier(reg) if reg.eq_ignore_ascii_case("y") => {
                    Ok(StatementBody::Instruction {
                        mnemonic,
                        syntax: OperandSyntax::IndirectY(expr),
                    })
                }
                other => Err(AsmError::Parse {
                    expected: "Y register in (expr),Y".into(),
                    found: format!("{other:?}"),
                }),
            },
            TokenKind::Eol | TokenKind::Eof => Ok(StatementBody::Instruction {
                mnemonic,
                syntax: OperandSyntax::Indirect(expr),
            }),
            other => Err(AsmError::Parse {
                expected: "end of line or ,Y".into(),
                found: format!("{other:?}"),
            }),
        },
        other => Err(AsmError::Parse {
            expected: ", or ) in indirect operand".into(),
            found: format!("{other:?}"),
        }),
    }
}

fn parse_directive(name: String, rest: &[Token], _line: u32) -> Result<StatementBody, AsmError> {
    if matches!(rest[0].kind, TokenKind::Eol | TokenKind::Eof) {
        return Ok(StatementBody::Directive { name, args: Vec::new(), string_arg: None });
    }
    if let TokenKind::Str(s) = &rest[0].kind {
        return Ok(StatementBody::Directive {
            name,
            args: Vec::new(),
            string_arg: Some(s.clone()),
        });
    }
    let args = parse_arg_list(rest)?;
    Ok(StatementBody::Directive { name, args, string_arg: None })
}

/// Macro arguments are plain source text, not expressions -- expansion
/// substitutes them whole-word into the body before it's parsed, so there's
/// nothing to evaluate here. `call_token` is the `MacroCall` token itself;
/// its column plus the name's length locates where the argument text starts
/// in `source`.
fn parse_macro_invoke(
    name: String,
    call_token: &Token,
    source: &str,
) -> Result<StatementBody, AsmError> {
    let tail_start = (call_token.column as usize - 1) + 1 + name.chars().count();
    let mut tail: String = source.chars().skip(tail_start).collect();
    if let Some(semi) = tail.find(';') {
        tail.truncate(semi);
    }
    let tail = tail.trim();
    if tail.is_empty() {
        return Ok(StatementBody::MacroInvoke { name, args: Vec::new() });
    }
    let args: Vec<String> = if tail.contains(',') {
        tail.split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        tail.split_whitespace().map(|p| p.to_string()).collect()
    };
    Ok(StatementBody::MacroInvoke { name, args })
}

/// Parse a comma-separated expression list running to end of line.
fn parse_arg_list(tokens: &[Token]) -> Result<Vec<Expr>, AsmError> {
    let mut args = Vec::new();
    let mut offset = 0usize;
    loop {
        let mut parser = ExprParser::new(&tokens[offset..]);
        let expr = parser.parse()?;
        args.push(expr);
        offset += parser.position();
        match tokens[offset].kind {
            TokenKind::Comma => offset += 1,
            TokenKind::Eol | TokenKind::Eof => break,
            ref other => {
                return Err(AsmError::Parse {
                    expected: ", or end of line".into(),
                    found: format!("{other:?}"),
                })
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_label_colon_and_instruction() {
        let stmt = parse_line("LOOP: LDA #1", 1).unwrap();
        assert_eq!(stmt.label, Some(LabelDef::Global("LOOP".into())));
        assert!(matches!(
            stmt.body,
            StatementBody::Instruction { ref mnemonic, syntax: OperandSyntax::Immediate(_) }
                if mnemonic == "LDA"
        ));
    }

    #[test]
    fn parses_bare_label_without_colon() {
        let stmt = parse_line("LOOP", 1).unwrap();
        assert_eq!(stmt.label, Some(LabelDef::Global("LOOP".into())));
        assert_eq!(stmt.body, StatementBody::Empty);
    }

    #[test]
    fn parses_absolute_indexed_operand() {
        let stmt = parse_line("STA $D020,X", 1).unwrap();
        match stmt.body {
            StatementBody::Instruction { mnemonic, syntax: OperandSyntax::AddressX(_) } => {
                assert_eq!(mnemonic, "STA");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_indirect_indexed_operand() {
        let stmt = parse_line("LDA ($20),Y", 1).unwrap();
        assert!(matches!(
            stmt.body,
            StatementBody::Instruction { syntax: OperandSyntax::IndirectY(_), .. }
        ));
    }

    #[test]
    fn parses_indexed_indirect_operand() {
        let stmt = parse_line("LDA ($20,X)", 1).unwrap();
        assert!(matches!(
            stmt.body,
            StatementBody::Instruction { syntax: OperandSyntax::IndirectX(_), .. }
        ));
    }

    #[test]
    fn parses_directive_with_string_arg() {
        let stmt = parse_line("!pet \"HELLO\"", 1).unwrap();
        match stmt.body {
            StatementBody::Directive { name, string_arg, .. } => {
                assert_eq!(name, "pet");
                assert_eq!(string_arg, Some("HELLO".into()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_directive_with_multiple_args() {
        let stmt = parse_line("!fill 10, $FF", 1).unwrap();
        match stmt.body {
            StatementBody::Directive { name, args, .. } => {
                assert_eq!(name, "fill");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_macro_invocation_with_args() {
        let stmt = parse_line("+setpos 5, 10", 1).unwrap();
        match stmt.body {
            StatementBody::MacroInvoke { name, args } => {
                assert_eq!(name, "setpos");
                assert_eq!(args, vec!["5".to_string(), "10".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_macro_invocation_with_whitespace_separated_args() {
        let stmt = parse_line("+setpos 5 10", 1).unwrap();
        match stmt.body {
            StatementBody::MacroInvoke { name, args } => {
                assert_eq!(name, "setpos");
                assert_eq!(args, vec!["5".to_string(), "10".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_assignment() {
        let stmt = parse_line("VAL=$42", 1).unwrap();
        assert_eq!(stmt.label, None);
        match stmt.body {
            StatementBody::Assignment { name, value } => {
                assert_eq!(name, "VAL");
                assert_eq!(value, Expr::Number(0x42));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_star_equals_as_org_directive() {
        let stmt = parse_line("*=$1000", 1).unwrap();
        match stmt.body {
            StatementBody::Directive { name, args, .. } => {
                assert_eq!(name, "org");
                assert_eq!(args, vec![Expr::Number(0x1000)]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_anonymous_label_definition() {
        let stmt = parse_line("-", 1).unwrap();
        assert_eq!(stmt.label, Some(LabelDef::AnonBack));
    }

    #[test]
    fn parses_local_label_definition() {
        let stmt = parse_line(".loop: INX", 1).unwrap();
        assert_eq!(stmt.label, Some(LabelDef::Local("loop".into())));
    }

    #[test]
    fn rol_with_bare_accumulator() {
        let stmt = parse_line("ROL A", 1).unwrap();
        assert!(matches!(
            stmt.body,
            StatementBody::Instruction { syntax: OperandSyntax::Accumulator, .. }
        ));
    }

    #[test]
    fn implied_instruction_with_no_operand() {
        let stmt = parse_line("RTS", 1).unwrap();
        assert!(matches!(
            stmt.body,
            StatementBody::Instruction { syntax: OperandSyntax::None, .. }
        ));
    }

    #[test]
    fn empty_line_is_empty_statement() {
        let stmt = parse_line("", 1).unwrap();
        assert_eq!(stmt.label, None);
        assert_eq!(stmt.body, StatementBody::Empty);
    }
}
