//! Static catalog of 6502/6510/65C02 instructions: mnemonic/mode pairs,
//! opcode bytes, sizes, cycle counts and page-crossing penalties.
//!
//! Grounded on `original_source/src/opcodes.c`'s `opcode_table` and
//! `mnemonic_info` arrays, which enumerate every official instruction plus
//! the common 6510 illegal opcodes.

use std::collections::HashMap;
use std::sync::OnceLock;

/// One of the 6502 operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl Mode {
    /// Instruction size in bytes for this addressing mode.
    pub fn size(self) -> u8 {
        match self {
            Mode::Implied | Mode::Accumulator => 1,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndirectX
            | Mode::IndirectY
            | Mode::Relative => 2,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Implied => "implied",
            Mode::Accumulator => "accumulator",
            Mode::Immediate => "immediate",
            Mode::ZeroPage => "zero page",
            Mode::ZeroPageX => "zero page,X",
            Mode::ZeroPageY => "zero page,Y",
            Mode::Absolute => "absolute",
            Mode::AbsoluteX => "absolute,X",
            Mode::AbsoluteY => "absolute,Y",
            Mode::Indirect => "indirect",
            Mode::IndirectX => "(indirect,X)",
            Mode::IndirectY => "(indirect),Y",
            Mode::Relative => "relative",
        }
    }

    /// True if this is one of the zero-page-class modes (the absolute-class
    /// counterpart can sometimes be narrowed to this one).
    pub fn is_zero_page_class(self) -> bool {
        matches!(self, Mode::ZeroPage | Mode::ZeroPageX | Mode::ZeroPageY)
    }
}

/// Target CPU variant. Governs which illegal opcodes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cpu {
    Mos6502,
    Mos6510,
    Wdc65c02,
}

impl Cpu {
    pub fn parse(name: &str) -> Option<Cpu> {
        match name.to_ascii_lowercase().as_str() {
            "6502" => Some(Cpu::Mos6502),
            "6510" => Some(Cpu::Mos6510),
            "65c02" => Some(Cpu::Wdc65c02),
            _ => None,
        }
    }

    /// Whether this CPU accepts undocumented/illegal opcodes.
    pub fn accepts_illegal(self) -> bool {
        matches!(self, Cpu::Mos6510)
    }
}

bitflags::bitflags! {
    /// Categorical flags for a mnemonic, independent of addressing mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InstFlags: u8 {
        const BRANCH  = 0b0000_0001;
        const JUMP    = 0b0000_0010;
        const RETURN  = 0b0000_0100;
        const ILLEGAL = 0b0000_1000;
        const STACK   = 0b0001_0000;
        const BREAK   = 0b0010_0000;
    }
}

/// One row of the opcode catalog: a concrete (mnemonic, mode) encoding.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub opcode: u8,
    pub cycles: u8,
    pub page_penalty: bool,
}

impl OpcodeEntry {
    pub fn size(&self) -> u8 {
        self.mode.size()
    }
}

/// Per-mnemonic metadata: which modes it supports and its categorical flags.
#[derive(Debug, Clone, Copy)]
struct MnemonicInfo {
    modes: u16,
    flags: InstFlags,
}

fn mode_bit(mode: Mode) -> u16 {
    1u16 << (mode as u8)
}

macro_rules! opcode_table {
    ($( $mnem:literal, $mode:expr, $opcode:literal, $cycles:literal, $penalty:literal );* $(;)?) => {
        &[ $( OpcodeEntry { mnemonic: $mnem, mode: $mode, opcode: $opcode, cycles: $cycles, page_penalty: $penalty } ),* ]
    };
}

use Mode::*;

/// The complete catalog: every (mnemonic, mode) pair this assembler can
/// encode, official instructions followed by illegal/undocumented ones.
/// Verbatim from `original_source/src/opcodes.c`.
static TABLE: &[OpcodeEntry] = opcode_table! {
    "ADC", Immediate, 0x69, 2, false; "ADC", ZeroPage, 0x65, 3, false;
    "ADC", ZeroPageX, 0x75, 4, false; "ADC", Absolute, 0x6D, 4, false;
    "ADC", AbsoluteX, 0x7D, 4, true; "ADC", AbsoluteY, 0x79, 4, true;
    "ADC", IndirectX, 0x61, 6, false; "ADC", IndirectY, 0x71, 5, true;

    "AND", Immediate, 0x29, 2, false; "AND", ZeroPage, 0x25, 3, false;
    "AND", ZeroPageX, 0x35, 4, false; "AND", Absolute, 0x2D, 4, false;
    "AND", AbsoluteX, 0x3D, 4, true; "AND", AbsoluteY, 0x39, 4, true;
    "AND", IndirectX, 0x21, 6, false; "AND", IndirectY, 0x31, 5, true;

    "ASL", Accumulator, 0x0A, 2, false; "ASL", ZeroPage, 0x06, 5, false;
    "ASL", ZeroPageX, 0x16, 6, false; "ASL", Absolute, 0x0E, 6, false;
    "ASL", AbsoluteX, 0x1E, 7, false;

    "BCC", Relative, 0x90, 2, true; "BCS", Relative, 0xB0, 2, true;
    "BEQ", Relative, 0xF0, 2, true; "BMI", Relative, 0x30, 2, true;
    "BNE", Relative, 0xD0, 2, true; "BPL", Relative, 0x10, 2, true;
    "BVC", Relative, 0x50, 2, true; "BVS", Relative, 0x70, 2, true;

    "BIT", ZeroPage, 0x24, 3, false; "BIT", Absolute, 0x2C, 4, false;

    "BRK", Implied, 0x00, 7, false;

    "CLC", Implied, 0x18, 2, false; "CLD", Implied, 0xD8, 2, false;
    "CLI", Implied, 0x58, 2, false; "CLV", Implied, 0xB8, 2, false;

    "CMP", Immediate, 0xC9, 2, false; "CMP", ZeroPage, 0xC5, 3, false;
    "CMP", ZeroPageX, 0xD5, 4, false; "CMP", Absolute, 0xCD, 4, false;
    "CMP", AbsoluteX, 0xDD, 4, true; "CMP", AbsoluteY, 0xD9, 4, true;
    "CMP", IndirectX, 0xC1, 6, false; "CMP", IndirectY, 0xD1, 5, true;

    "CPX", Immediate, 0xE0, 2, false; "CPX", ZeroPage, 0xE4, 3, false;
    "CPX", Absolute, 0xEC, 4, false;

    "CPY", Immediate, 0xC0, 2, false; "CPY", ZeroPage, 0xC4, 3, false;
    "CPY", Absolute, 0xCC, 4, false;

    "DEC", ZeroPage, 0xC6, 5, false; "DEC", ZeroPageX, 0xD6, 6, false;
    "DEC", Absolute, 0xCE, 6, false; "DEC", AbsoluteX, 0xDE, 7, false;

    "DEX", Implied, 0xCA, 2, false; "DEY", Implied, 0x88, 2, false;

    "EOR", Immediate, 0x49, 2, false; "EOR", ZeroPage, 0x45, 3, false;
    "EOR", ZeroPageX, 0x55, 4, false; "EOR", Absolute, 0x4D, 4, false;
    "EOR", AbsoluteX, 0x5D, 4, true; "EOR", AbsoluteY, 0x59, 4, true;
    "EOR", IndirectX, 0x41, 6, false; "EOR", IndirectY, 0x51, 5, true;

    "INC", ZeroPage, 0xE6, 5, false; "INC", ZeroPageX, 0xF6, 6, false;
    "INC", Absolute, 0xEE, 6, false; "INC", AbsoluteX, 0xFE, 7, false;

    "INX", Implied, 0xE8, 2, false; "INY", Implied, 0xC8, 2, false;

    "JMP", Absolute, 0x4C, 3, false; "JMP", Indirect, 0x6C, 5, false;

    "JSR", Absolute, 0x20, 6, false;

    "LDA", Immediate, 0xA9, 2, false; "LDA", ZeroPage, 0xA5, 3, false;
    "LDA", ZeroPageX, 0xB5, 4, false; "LDA", Absolute, 0xAD, 4, false;
    "LDA", AbsoluteX, 0xBD, 4, true; "LDA", AbsoluteY, 0xB9, 4, true;
    "LDA", IndirectX, 0xA1, 6, false; "LDA", IndirectY, 0xB1, 5, true;

    "LDX", Immediate, 0xA2, 2, false; "LDX", ZeroPage, 0xA6, 3, false;
    "LDX", ZeroPageY, 0xB6, 4, false; "LDX", Absolute, 0xAE, 4, false;
    "LDX", AbsoluteY, 0xBE, 4, true;

    "LDY", Immediate, 0xA0, 2, false; "LDY", ZeroPage, 0xA4, 3, false;
    "LDY", ZeroPageX, 0xB4, 4, false; "LDY", Absolute, 0xAC, 4, false;
    "LDY", AbsoluteX, 0xBC, 4, true;

    "LSR", Accumulator, 0x4A, 2, false; "LSR", ZeroPage, 0x46, 5, false;
    "LSR", ZeroPageX, 0x56, 6, false; "LSR", Absolute, 0x4E, 6, false;
    "LSR", AbsoluteX, 0x5E, 7, false;

    "NOP", Implied, 0xEA, 2, false;

    "ORA", Immediate, 0x09, 2, false; "ORA", ZeroPage, 0x05, 3, false;
    "ORA", ZeroPageX, 0x15, 4, false; "ORA", Absolute, 0x0D, 4, false;
    "ORA", AbsoluteX, 0x1D, 4, true; "ORA", AbsoluteY, 0x19, 4, true;
    "ORA", IndirectX, 0x01, 6, false; "ORA", IndirectY, 0x11, 5, true;

    "PHA", Implied, 0x48, 3, false; "PHP", Implied, 0x08, 3, false;
    "PLA", Implied, 0x68, 4, false; "PLP", Implied, 0x28, 4, false;

    "ROL", Accumulator, 0x2A, 2, false; "ROL", ZeroPage, 0x26, 5, false;
    "ROL", ZeroPageX, 0x36, 6, false; "ROL", Absolute, 0x2E, 6, false;
    "ROL", AbsoluteX, 0x3E, 7, false;

    "ROR", Accumulator, 0x6A, 2, false; "ROR", ZeroPage, 0x66, 5, false;
    "ROR", ZeroPageX, 0x76, 6, false; "ROR", Absolute, 0x6E, 6, false;
    "ROR", AbsoluteX, 0x7E, 7, false;

    "RTI", Implied, 0x40, 6, false; "RTS", Implied, 0x60, 6, false;

    "SBC", Immediate, 0xE9, 2, false; "SBC", ZeroPage, 0xE5, 3, false;
    "SBC", ZeroPageX, 0xF5, 4, false; "SBC", Absolute, 0xED, 4, false;
    "SBC", AbsoluteX, 0xFD, 4, true; "SBC", AbsoluteY, 0xF9, 4, true;
    "SBC", IndirectX, 0xE1, 6, false; "SBC", IndirectY, 0xF1, 5, true;

    "SEC", Implied, 0x38, 2, false; "SED", Implied, 0xF8, 2, false;
    "SEI", Implied, 0x78, 2, false;

    "STA", ZeroPage, 0x85, 3, false; "STA", ZeroPageX, 0x95, 4, false;
    "STA", Absolute, 0x8D, 4, false; "STA", AbsoluteX, 0x9D, 5, false;
    "STA", AbsoluteY, 0x99, 5, false; "STA", IndirectX, 0x81, 6, false;
    "STA", IndirectY, 0x91, 6, false;

    "STX", ZeroPage, 0x86, 3, false; "STX", ZeroPageY, 0x96, 4, false;
    "STX", Absolute, 0x8E, 4, false;

    "STY", ZeroPage, 0x84, 3, false; "STY", ZeroPageX, 0x94, 4, false;
    "STY", Absolute, 0x8C, 4, false;

    "TAX", Implied, 0xAA, 2, false; "TAY", Implied, 0xA8, 2, false;
    "TSX", Implied, 0xBA, 2, false; "TXA", Implied, 0x8A, 2, false;
    "TXS", Implied, 0x9A, 2, false; "TYA", Implied, 0x98, 2, false;

    "LAX", ZeroPage, 0xA7, 3, false; "LAX", ZeroPageY, 0xB7, 4, false;
    "LAX", Absolute, 0xAF, 4, false; "LAX", AbsoluteY, 0xBF, 4, true;
    "LAX", IndirectX, 0xA3, 6, false; "LAX", IndirectY, 0xB3, 5, true;

    "SAX", ZeroPage, 0x87, 3, false; "SAX", ZeroPageY, 0x97, 4, false;
    "SAX", Absolute, 0x8F, 4, false; "SAX", IndirectX, 0x83, 6, false;

    "DCP", ZeroPage, 0xC7, 5, false; "DCP", ZeroPageX, 0xD7, 6, false;
    "DCP", Absolute, 0xCF, 6, false; "DCP", AbsoluteX, 0xDF, 7, false;
    "DCP", AbsoluteY, 0xDB, 7, false; "DCP", IndirectX, 0xC3, 8, false;
    "DCP", IndirectY, 0xD3, 8, false;
    "DCM", ZeroPage, 0xC7, 5, false; "DCM", ZeroPageX, 0xD7, 6, false;
    "DCM", Absolute, 0xCF, 6, false; "DCM", AbsoluteX, 0xDF, 7, false;
    "DCM", AbsoluteY, 0xDB, 7, false; "DCM", IndirectX, 0xC3, 8, false;
    "DCM", IndirectY, 0xD3, 8, false;

    "ISC", ZeroPage, 0xE7, 5, false; "ISC", ZeroPageX, 0xF7, 6, false;
    "ISC", Absolute, 0xEF, 6, false; "ISC", AbsoluteX, 0xFF, 7, false;
    "ISC", AbsoluteY, 0xFB, 7, false; "ISC", IndirectX, 0xE3, 8, false;
    "ISC", IndirectY, 0xF3, 8, false;
    "ISB", ZeroPage, 0xE7, 5, false; "ISB", ZeroPageX, 0xF7, 6, false;
    "ISB", Absolute, 0xEF, 6, false; "ISB", AbsoluteX, 0xFF, 7, false;
    "ISB", AbsoluteY, 0xFB, 7, false; "ISB", IndirectX, 0xE3, 8, false;
    "ISB", IndirectY, 0xF3, 8, false;
    "INS", ZeroPage, 0xE7, 5, false; "INS", ZeroPageX, 0xF7, 6, false;
    "INS", Absolute, 0xEF, 6, false; "INS", AbsoluteX, 0xFF, 7, false;
    "INS", AbsoluteY, 0xFB, 7, false; "INS", IndirectX, 0xE3, 8, false;
    "INS", IndirectY, 0xF3, 8, false;

    "SLO", ZeroPage, 0x07, 5, false; "SLO", ZeroPageX, 0x17, 6, false;
    "SLO", Absolute, 0x0F, 6, false; "SLO", AbsoluteX, 0x1F, 7, false;
    "SLO", AbsoluteY, 0x1B, 7, false; "SLO", IndirectX, 0x03, 8, false;
    "SLO", IndirectY, 0x13, 8, false;
    "ASO", ZeroPage, 0x07, 5, false; "ASO", ZeroPageX, 0x17, 6, false;
    "ASO", Absolute, 0x0F, 6, false; "ASO", AbsoluteX, 0x1F, 7, false;
    "ASO", AbsoluteY, 0x1B, 7, false; "ASO", IndirectX, 0x03, 8, false;
    "ASO", IndirectY, 0x13, 8, false;

    "RLA", ZeroPage, 0x27, 5, false; "RLA", ZeroPageX, 0x37, 6, false;
    "RLA", Absolute, 0x2F, 6, false; "RLA", AbsoluteX, 0x3F, 7, false;
    "RLA", AbsoluteY, 0x3B, 7, false; "RLA", IndirectX, 0x23, 8, false;
    "RLA", IndirectY, 0x33, 8, false;

    "SRE", ZeroPage, 0x47, 5, false; "SRE", ZeroPageX, 0x57, 6, false;
    "SRE", Absolute, 0x4F, 6, false; "SRE", AbsoluteX, 0x5F, 7, false;
    "SRE", AbsoluteY, 0x5B, 7, false; "SRE", IndirectX, 0x43, 8, false;
    "SRE", IndirectY, 0x53, 8, false;
    "LSE", ZeroPage, 0x47, 5, false; "LSE", ZeroPageX, 0x57, 6, false;
    "LSE", Absolute, 0x4F, 6, false; "LSE", AbsoluteX, 0x5F, 7, false;
    "LSE", AbsoluteY, 0x5B, 7, false; "LSE", IndirectX, 0x43, 8, false;
    "LSE", IndirectY, 0x53, 8, false;

    "RRA", ZeroPage, 0x67, 5, false; "RRA", ZeroPageX, 0x77, 6, false;
    "RRA", Absolute, 0x6F, 6, false; "RRA", AbsoluteX, 0x7F, 7, false;
    "RRA", AbsoluteY, 0x7B, 7, false; "RRA", IndirectX, 0x63, 8, false;
    "RRA", IndirectY, 0x73, 8, false;

    "ANC", Immediate, 0x0B, 2, false; "ANC2", Immediate, 0x2B, 2, false;
    "ALR", Immediate, 0x4B, 2, false; "ASR", Immediate, 0x4B, 2, false;
    "ARR", Immediate, 0x6B, 2, false;
    "XAA", Immediate, 0x8B, 2, false; "ANE", Immediate, 0x8B, 2, false;

    "AHX", AbsoluteY, 0x9F, 5, false; "AHX", IndirectY, 0x93, 6, false;
    "SHA", AbsoluteY, 0x9F, 5, false; "SHA", IndirectY, 0x93, 6, false;

    "TAS", AbsoluteY, 0x9B, 5, false; "SHS", AbsoluteY, 0x9B, 5, false;
    "SHX", AbsoluteY, 0x9E, 5, false; "SXA", AbsoluteY, 0x9E, 5, false;
    "SHY", AbsoluteX, 0x9C, 5, false; "SYA", AbsoluteX, 0x9C, 5, false;

    "LAS", AbsoluteY, 0xBB, 4, true; "LAR", AbsoluteY, 0xBB, 4, true;

    "USB", Immediate, 0xEB, 2, false;

    "DOP", Immediate, 0x80, 2, false; "DOP", ZeroPage, 0x04, 3, false;
    "DOP", ZeroPageX, 0x14, 4, false;
    "TOP", Absolute, 0x0C, 4, false; "TOP", AbsoluteX, 0x1C, 4, true;

    "JAM", Implied, 0x02, 0, false; "KIL", Implied, 0x02, 0, false;
    "HLT", Implied, 0x02, 0, false;
};

/// (mnemonic -> valid-mode-bitset + categorical flags), built once from the
/// opcode table plus `original_source/src/opcodes.c`'s `mnemonic_info`
/// illegal-flag annotations.
fn illegal_mnemonics() -> &'static [&'static str] {
    &[
        "LAX", "SAX", "DCP", "DCM", "ISC", "ISB", "INS", "SLO", "ASO", "RLA", "SRE", "LSE", "RRA",
        "ANC", "ANC2", "ALR", "ASR", "ARR", "XAA", "ANE", "AHX", "SHA", "TAS", "SHS", "SHX", "SXA",
        "SHY", "SYA", "LAS", "LAR", "USB", "DOP", "TOP", "JAM", "KIL", "HLT",
    ]
}

fn branch_mnemonics() -> &'static [&'static str] {
    &["BCC", "BCS", "BEQ", "BMI", "BNE", "BPL", "BVC", "BVS"]
}

/// Mnemonics for which a bare `ASL` / `ROL` / etc. (no operand, or the
/// explicit pseudo-operand `A`) selects accumulator mode.
pub fn is_accumulator_optional(mnemonic: &str) -> bool {
    matches!(
        mnemonic.to_ascii_uppercase().as_str(),
        "ASL" | "LSR" | "ROL" | "ROR"
    )
}

pub fn is_branch(mnemonic: &str) -> bool {
    branch_mnemonics().contains(&mnemonic.to_ascii_uppercase().as_str())
}

struct Catalog {
    by_mnemonic_mode: HashMap<(&'static str, Mode), &'static OpcodeEntry>,
    by_opcode: HashMap<u8, &'static OpcodeEntry>,
    info: HashMap<&'static str, MnemonicInfo>,
}

fn flags_for(mnemonic: &str, illegal_set: &[&str]) -> InstFlags {
    let mut flags = InstFlags::empty();
    if branch_mnemonics().contains(&mnemonic) {
        flags |= InstFlags::BRANCH;
    }
    if illegal_set.contains(&mnemonic) {
        flags |= InstFlags::ILLEGAL;
    }
    match mnemonic {
        "JMP" | "JSR" => flags |= InstFlags::JUMP,
        "RTS" | "RTI" => flags |= InstFlags::RETURN,
        "PHA" | "PHP" | "PLA" | "PLP" | "JSR" | "RTS" | "RTI" => flags |= InstFlags::STACK,
        "BRK" => flags |= InstFlags::BREAK,
        _ => {}
    }
    flags
}

fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut by_mnemonic_mode = HashMap::new();
        let mut by_opcode = HashMap::new();
        let mut modes: HashMap<&'static str, u16> = HashMap::new();
        let illegal_set = illegal_mnemonics();

        for entry in TABLE {
            by_mnemonic_mode.insert((entry.mnemonic, entry.mode), entry);
            by_opcode.entry(entry.opcode).or_insert(entry);
            *modes.entry(entry.mnemonic).or_insert(0) |= mode_bit(entry.mode);
        }

        let info = modes
            .into_iter()
            .map(|(mnemonic, modes)| {
                let flags = flags_for(mnemonic, illegal_set);
                (mnemonic, MnemonicInfo { modes, flags })
            })
            .collect();

        Catalog {
            by_mnemonic_mode,
            by_opcode,
            info,
        }
    })
}

/// Upper-case a mnemonic for table lookups (matching is case-insensitive).
fn canonical(mnemonic: &str) -> String {
    mnemonic.to_ascii_uppercase()
}

pub fn is_valid_mnemonic(mnemonic: &str) -> bool {
    catalog().info.contains_key(canonical(mnemonic).as_str())
}

pub fn is_illegal(mnemonic: &str) -> bool {
    flags(mnemonic).contains(InstFlags::ILLEGAL)
}

/// Categorical flags for a mnemonic (branch/jump/return/stack/break/illegal).
pub fn flags(mnemonic: &str) -> InstFlags {
    catalog()
        .info
        .get(canonical(mnemonic).as_str())
        .map(|i| i.flags)
        .unwrap_or(InstFlags::empty())
}

/// Look up the concrete encoding for a (mnemonic, mode) pair, subject to
/// the target CPU's illegal-opcode policy.
pub fn find(mnemonic: &str, mode: Mode, cpu: Cpu) -> Option<&'static OpcodeEntry> {
    let key = canonical(mnemonic);
    let entry = catalog()
        .by_mnemonic_mode
        .iter()
        .find(|((m, md), _)| *m == key && *md == mode)
        .map(|(_, e)| *e)?;
    if is_illegal(&key) && !cpu.accepts_illegal() {
        return None;
    }
    Some(entry)
}

/// Look up an entry by opcode byte only, ignoring CPU acceptance (used for
/// CPU-compatibility diagnostics, not for code generation).
pub fn find_by_opcode(opcode: u8) -> Option<&'static OpcodeEntry> {
    catalog().by_opcode.get(&opcode).copied()
}

/// Bitset of addressing modes this mnemonic supports, independent of mode.
pub fn valid_modes(mnemonic: &str) -> u16 {
    catalog()
        .info
        .get(canonical(mnemonic).as_str())
        .map(|i| i.modes)
        .unwrap_or(0)
}

pub fn supports_mode(mnemonic: &str, mode: Mode) -> bool {
    valid_modes(mnemonic) & mode_bit(mode) != 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lda_immediate_is_a9() {
        let e = find("LDA", Mode::Immediate, Cpu::Mos6502).unwrap();
        assert_eq!(e.opcode, 0xA9);
        assert_eq!(e.size(), 2);
        assert_eq!(e.cycles, 2);
        assert!(!e.page_penalty);
    }

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        assert!(find("lda", Mode::Immediate, Cpu::Mos6502).is_some());
        assert!(find("Lda", Mode::Immediate, Cpu::Mos6502).is_some());
    }

    #[test]
    fn illegal_opcode_rejected_on_6502_and_65c02() {
        assert!(find("LAX", Mode::ZeroPage, Cpu::Mos6510).is_some());
        assert!(find("LAX", Mode::ZeroPage, Cpu::Mos6502).is_none());
        assert!(find("LAX", Mode::ZeroPage, Cpu::Wdc65c02).is_none());
    }

    #[test]
    fn branch_instructions_are_relative_only() {
        for m in branch_mnemonics() {
            assert_eq!(valid_modes(m), mode_bit(Mode::Relative));
        }
    }

    #[test]
    fn sta_has_no_immediate_mode() {
        assert!(!supports_mode("STA", Mode::Immediate));
    }

    #[test]
    fn asl_is_accumulator_optional() {
        assert!(is_accumulator_optional("asl"));
        assert!(!is_accumulator_optional("lda"));
    }

    #[test]
    fn opcode_byte_roundtrip() {
        let entry = find_by_opcode(0xA9).unwrap();
        assert_eq!(entry.mnemonic, "LDA");
        assert_eq!(entry.mode, Mode::Immediate);
    }

    #[test]
    fn brk_size_one_cycles_seven() {
        let e = find("BRK", Mode::Implied, Cpu::Mos6502).unwrap();
        assert_eq!(e.size(), 1);
        assert_eq!(e.cycles, 7);
    }

    #[test]
    fn jsr_is_jump_and_stack() {
        let f = flags("JSR");
        assert!(f.contains(InstFlags::JUMP));
        assert!(f.contains(InstFlags::STACK));
    }

    #[test]
    fn rts_is_return() {
        assert!(flags("RTS").contains(InstFlags::RETURN));
        assert!(!flags("RTS").contains(InstFlags::JUMP));
    }

    #[test]
    fn beq_is_branch_not_illegal() {
        let f = flags("BEQ");
        assert!(f.contains(InstFlags::BRANCH));
        assert!(!f.contains(InstFlags::ILLEGAL));
    }

    #[test]
    fn lax_is_illegal() {
        assert!(flags("LAX").contains(InstFlags::ILLEGAL));
    }
}
