//! Symbol table, zone-based local-label mangling, and anonymous
//! (`+`/`-`) label tracking.
//!
//! Flag bits are grounded on `original_source/include/symbols.h`'s
//! `SymbolFlags`. Zones are modeled as a single "current zone" string per
//! the distilled spec, simpler than the original's linked `Scope` chain;
//! the mangled name shape (`<zone>.<tail>` / `_global.<tail>`) still
//! matches the original so VICE label output reads the same way.

use std::collections::HashMap;

use crate::error::AsmError;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFlags: u8 {
        const DEFINED      = 0x01;
        const ZEROPAGE     = 0x02;
        const CONSTANT     = 0x04;
        const REFERENCED   = 0x08;
        const LOCAL        = 0x10;
        const EXPORTED     = 0x20;
        const FORCE_UPDATE = 0x40;
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    /// Mangled name, as stored in the table.
    pub name: String,
    /// Name as the user wrote it (for listings and VICE export).
    pub display_name: String,
    pub value: i64,
    pub defined: bool,
    pub flags: SymbolFlags,
    pub file: String,
    pub line: u32,
}

impl Symbol {
    pub fn is_zeropage(&self) -> bool {
        self.flags.contains(SymbolFlags::ZEROPAGE)
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(SymbolFlags::CONSTANT)
    }

    pub fn is_referenced(&self) -> bool {
        self.flags.contains(SymbolFlags::REFERENCED)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Mangle a user-written name for table storage. Names starting with
    /// `.` are local to `zone` (or to the synthetic `_global` zone when no
    /// zone is active); everything else is a plain global name.
    pub fn mangle(&self, name: &str, zone: Option<&str>) -> String {
        match name.strip_prefix('.') {
            Some(tail) => match zone {
                Some(z) => format!("{z}.{tail}"),
                None => format!("_global.{tail}"),
            },
            None => name.to_string(),
        }
    }

    /// Define a new symbol. Errors if already defined and not marked
    /// `FORCE_UPDATE` (e.g. a loop counter that's allowed to be redefined
    /// on each iteration).
    pub fn define(
        &mut self,
        mangled_name: impl Into<String>,
        display_name: impl Into<String>,
        value: i64,
        mut flags: SymbolFlags,
        file: impl Into<String>,
        line: u32,
    ) -> Result<(), AsmError> {
        let mangled_name = mangled_name.into();
        if let Some(existing) = self.entries.get(&mangled_name) {
            if existing.defined && !existing.flags.contains(SymbolFlags::FORCE_UPDATE) {
                return Err(AsmError::DuplicateSymbol {
                    name: existing.display_name.clone(),
                });
            }
        }
        flags |= SymbolFlags::DEFINED;
        if (0..=0xFF).contains(&value) {
            flags |= SymbolFlags::ZEROPAGE;
        }
        self.entries.insert(
            mangled_name.clone(),
            Symbol {
                name: mangled_name,
                display_name: display_name.into(),
                value,
                defined: true,
                flags,
                file: file.into(),
                line,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, mangled_name: &str) -> Option<&Symbol> {
        self.entries.get(mangled_name)
    }

    pub fn is_defined(&self, mangled_name: &str) -> bool {
        self.entries
            .get(mangled_name)
            .map(|s| s.defined)
            .unwrap_or(false)
    }

    /// Mark a symbol as referenced (used by `!warn` / unused-symbol
    /// diagnostics and by `assembler_reference` in the original).
    pub fn reference(&mut self, mangled_name: &str) {
        if let Some(sym) = self.entries.get_mut(mangled_name) {
            sym.flags |= SymbolFlags::REFERENCED;
        }
    }

    /// All symbols that were referenced but never defined, after the
    /// final pass. Order is unspecified (backed by a hash map).
    pub fn undefined(&self) -> Vec<&Symbol> {
        self.entries.values().filter(|s| !s.defined).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.values()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// Tracks the addresses anonymous `+`/`-` labels resolve to.
///
/// Forward references (`+`, `++`, ...) resolve to the Nth *upcoming*
/// anonymous forward-label definition; backward references (`-`, `--`,
/// ...) resolve to the Nth most recent anonymous backward-label
/// definition already passed. `forward_defs`/`backward_defs` are
/// collected once during pass 1 and then walked with a cursor during
/// pass 2, since pass 2 needs to know about label definitions that
/// haven't been reached yet in the current scan.
#[derive(Debug, Default)]
pub struct AnonLabels {
    forward_defs: Vec<u16>,
    forward_cursor: usize,
    backward_defs: Vec<u16>,
}

impl AnonLabels {
    pub fn new() -> Self {
        AnonLabels::default()
    }

    /// Record a `+`-label definition's address, in source order.
    pub fn define_forward(&mut self, address: u16) {
        self.forward_defs.push(address);
    }

    /// Record a `-`-label definition's address, in source order.
    pub fn define_backward(&mut self, address: u16) {
        self.backward_defs.push(address);
    }

    /// Call once a forward-label definition has actually been passed
    /// during pass 2, so later `+` references count from there.
    pub fn advance_forward(&mut self) {
        self.forward_cursor += 1;
    }

    /// `run` is how many consecutive `+` characters were lexed (1 for
    /// `+`, 2 for `++`, ...).
    pub fn resolve_forward(&self, run: usize) -> Option<u16> {
        if run == 0 {
            return None;
        }
        self.forward_defs.get(self.forward_cursor + run - 1).copied()
    }

    /// `run` is how many consecutive `-` characters were lexed.
    pub fn resolve_backward(&self, run: usize) -> Option<u16> {
        if run == 0 || run > self.backward_defs.len() {
            return None;
        }
        self.backward_defs
            .get(self.backward_defs.len() - run)
            .copied()
    }

    /// Reset pass-local state, keeping the forward/backward definition
    /// lists collected so far (called between pass 1 and pass 2).
    pub fn start_pass2(&mut self) {
        self.forward_cursor = 0;
    }

    /// Clear everything (used when re-running the assembler from
    /// scratch, e.g. in tests).
    pub fn clear(&mut self) {
        self.forward_defs.clear();
        self.backward_defs.clear();
        self.forward_cursor = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mangle_local_label_uses_current_zone() {
        let table = SymbolTable::new();
        assert_eq!(table.mangle(".loop", Some("main")), "main.loop");
        assert_eq!(table.mangle(".loop", None), "_global.loop");
        assert_eq!(table.mangle("GLOBAL", Some("main")), "GLOBAL");
    }

    #[test]
    fn define_and_lookup() {
        let mut table = SymbolTable::new();
        table
            .define("FOO", "FOO", 42, SymbolFlags::empty(), "a.asm", 1)
            .unwrap();
        let sym = table.lookup("FOO").unwrap();
        assert_eq!(sym.value, 42);
        assert!(sym.defined);
    }

    #[test]
    fn redefining_without_force_update_is_an_error() {
        let mut table = SymbolTable::new();
        table
            .define("FOO", "FOO", 1, SymbolFlags::empty(), "a.asm", 1)
            .unwrap();
        let err = table
            .define("FOO", "FOO", 2, SymbolFlags::empty(), "a.asm", 2)
            .unwrap_err();
        assert!(matches!(err, AsmError::DuplicateSymbol { .. }));
    }

    #[test]
    fn force_update_symbol_can_be_redefined() {
        let mut table = SymbolTable::new();
        table
            .define("I", "I", 0, SymbolFlags::FORCE_UPDATE, "a.asm", 1)
            .unwrap();
        table
            .define("I", "I", 1, SymbolFlags::FORCE_UPDATE, "a.asm", 2)
            .unwrap();
        assert_eq!(table.lookup("I").unwrap().value, 1);
    }

    #[test]
    fn zeropage_flag_set_for_byte_values() {
        let mut table = SymbolTable::new();
        table
            .define("ZP", "ZP", 0x80, SymbolFlags::empty(), "a.asm", 1)
            .unwrap();
        table
            .define("ABS", "ABS", 0x1234, SymbolFlags::empty(), "a.asm", 1)
            .unwrap();
        assert!(table.lookup("ZP").unwrap().is_zeropage());
        assert!(!table.lookup("ABS").unwrap().is_zeropage());
    }

    #[test]
    fn anon_forward_resolves_in_definition_order() {
        let mut anon = AnonLabels::new();
        anon.define_forward(0x1000);
        anon.define_forward(0x1010);
        assert_eq!(anon.resolve_forward(1), Some(0x1000));
        assert_eq!(anon.resolve_forward(2), Some(0x1010));
        anon.advance_forward();
        assert_eq!(anon.resolve_forward(1), Some(0x1010));
    }

    #[test]
    fn anon_backward_resolves_most_recent_first() {
        let mut anon = AnonLabels::new();
        anon.define_backward(0x2000);
        anon.define_backward(0x2010);
        assert_eq!(anon.resolve_backward(1), Some(0x2010));
        assert_eq!(anon.resolve_backward(2), Some(0x2000));
        assert_eq!(anon.resolve_backward(3), None);
    }
}
