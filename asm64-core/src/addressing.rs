//! Resolves the operand syntax the statement parser recognized into a
//! concrete addressing `Mode`, narrowing zero-page vs. absolute and
//! picking up branch targets along the way.

use crate::error::AsmError;
use crate::expr::{Expr, ExprResult};
use crate::opcodes::{self, Cpu, Mode};

/// The shape of an operand as written in source, before we know whether
/// a bare address should encode zero-page or absolute.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandSyntax {
    None,
    /// Accumulator shorthand: `ASL A` or bare `ASL`.
    Accumulator,
    Immediate(Expr),
    Indirect(Expr),
    IndirectX(Expr),
    IndirectY(Expr),
    Address(Expr),
    AddressX(Expr),
    AddressY(Expr),
}

/// A fully resolved operand: the addressing mode plus the expression
/// whose value gets encoded (None for `Implied`/`Accumulator`).
pub struct Resolved {
    pub mode: Mode,
    pub expr: Option<Expr>,
}

/// Resolve `syntax` for `mnemonic` against the target `cpu`. `eval`
/// evaluates an expression at the current pc/pass/zone so the narrowing
/// decision (zero page vs absolute) can use the operand's value.
pub fn resolve(
    mnemonic: &str,
    syntax: &OperandSyntax,
    cpu: Cpu,
    eval: impl Fn(&Expr) -> ExprResult,
) -> Result<Resolved, AsmError> {
    let is_branch = opcodes::is_branch(mnemonic);

    let narrow = |expr: &Expr, zp_mode: Mode, abs_mode: Mode| -> Result<Mode, AsmError> {
        let result = eval(expr);
        let supports_zp = opcodes::supports_mode(mnemonic, zp_mode);
        let supports_abs = opcodes::supports_mode(mnemonic, abs_mode);
        if result.is_zeropage && supports_zp {
            Ok(zp_mode)
        } else if supports_abs {
            Ok(abs_mode)
        } else if supports_zp {
            Ok(zp_mode)
        } else {
            Err(AsmError::InvalidAddressingMode {
                mnemonic: mnemonic.to_string(),
                mode: abs_mode.name().to_string(),
            })
        }
    };

    match syntax {
        OperandSyntax::None => {
            if opcodes::is_accumulator_optional(mnemonic)
                && opcodes::supports_mode(mnemonic, Mode::Accumulator)
            {
                Ok(Resolved { mode: Mode::Accumulator, expr: None })
            } else {
                Ok(Resolved { mode: Mode::Implied, expr: None })
            }
        }
        OperandSyntax::Accumulator => Ok(Resolved { mode: Mode::Accumulator, expr: None }),
        OperandSyntax::Immediate(e) => Ok(Resolved { mode: Mode::Immediate, expr: Some(e.clone()) }),
        OperandSyntax::Indirect(e) => Ok(Resolved { mode: Mode::Indirect, expr: Some(e.clone()) }),
        OperandSyntax::IndirectX(e) => Ok(Resolved { mode: Mode::IndirectX, expr: Some(e.clone()) }),
        OperandSyntax::IndirectY(e) => Ok(Resolved { mode: Mode::IndirectY, expr: Some(e.clone()) }),
        OperandSyntax::Address(e) => {
            if is_branch {
                return Ok(Resolved { mode: Mode::Relative, expr: Some(e.clone()) });
            }
            let mode = narrow(e, Mode::ZeroPage, Mode::Absolute)?;
            Ok(Resolved { mode, expr: Some(e.clone()) })
        }
        OperandSyntax::AddressX(e) => {
            let mode = narrow(e, Mode::ZeroPageX, Mode::AbsoluteX)?;
            Ok(Resolved { mode, expr: Some(e.clone()) })
        }
        OperandSyntax::AddressY(e) => {
            let mode = narrow(e, Mode::ZeroPageY, Mode::AbsoluteY)?;
            Ok(Resolved { mode, expr: Some(e.clone()) })
        }
    }
}

/// Compute the signed 8-bit branch displacement from `pc_after` (the
/// address of the byte following the 2-byte branch instruction) to
/// `target`.
pub fn branch_offset(pc_after: u16, target: u16) -> Result<i8, AsmError> {
    let diff = target as i32 - pc_after as i32;
    if !(-128..=127).contains(&diff) {
        return Err(AsmError::BranchOutOfRange { offset: diff });
    }
    Ok(diff as i8)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::Expr;

    fn zp_result() -> ExprResult {
        ExprResult { value: 0x10, defined: true, is_zeropage: true }
    }

    fn abs_result() -> ExprResult {
        ExprResult { value: 0x1234, defined: true, is_zeropage: false }
    }

    #[test]
    fn narrows_to_zero_page_when_value_fits() {
        let syntax = OperandSyntax::Address(Expr::Number(0x10));
        let resolved = resolve("LDA", &syntax, Cpu::Mos6502, |_| zp_result()).unwrap();
        assert_eq!(resolved.mode, Mode::ZeroPage);
    }

    #[test]
    fn widens_to_absolute_when_value_does_not_fit() {
        let syntax = OperandSyntax::Address(Expr::Number(0x1234));
        let resolved = resolve("LDA", &syntax, Cpu::Mos6502, |_| abs_result()).unwrap();
        assert_eq!(resolved.mode, Mode::Absolute);
    }

    #[test]
    fn branch_mnemonic_always_relative() {
        let syntax = OperandSyntax::Address(Expr::Number(0x10));
        let resolved = resolve("BEQ", &syntax, Cpu::Mos6502, |_| zp_result()).unwrap();
        assert_eq!(resolved.mode, Mode::Relative);
    }

    #[test]
    fn bare_asl_is_accumulator_mode() {
        let resolved = resolve("ASL", &OperandSyntax::None, Cpu::Mos6502, |_| zp_result()).unwrap();
        assert_eq!(resolved.mode, Mode::Accumulator);
    }

    #[test]
    fn bare_nop_is_implied() {
        let resolved = resolve("NOP", &OperandSyntax::None, Cpu::Mos6502, |_| zp_result()).unwrap();
        assert_eq!(resolved.mode, Mode::Implied);
    }

    #[test]
    fn branch_offset_rejects_out_of_range() {
        assert!(branch_offset(0x1000, 0x2000).is_err());
        assert!(branch_offset(0x1000, 0x1010).is_ok());
    }

    #[test]
    fn branch_offset_computes_signed_displacement() {
        assert_eq!(branch_offset(0x1002, 0x1000).unwrap(), -2);
        assert_eq!(branch_offset(0x1000, 0x1002).unwrap(), 2);
    }
}
