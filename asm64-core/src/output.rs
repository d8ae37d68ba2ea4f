//! Output writers: PRG/raw memory images, VICE-format label files, and
//! assembly listings.

use crate::symbols::SymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Prg,
    Raw,
}

/// One fully-assembled segment of bytes at a load address.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: u16,
    pub bytes: Vec<u8>,
}

/// Render a segment as a C64 PRG image: 2-byte little-endian load
/// address followed by the raw bytes, or as a bare raw image.
pub fn write_image(segment: &Segment, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Raw => segment.bytes.clone(),
        OutputFormat::Prg => {
            let mut out = Vec::with_capacity(segment.bytes.len() + 2);
            out.push((segment.start & 0xFF) as u8);
            out.push((segment.start >> 8) as u8);
            out.extend_from_slice(&segment.bytes);
            out
        }
    }
}

/// Render the symbol table as a VICE monitor label file:
/// `al C:<hhhh> .<name>` per exported/defined symbol, one per line.
pub fn write_vice_labels(symbols: &SymbolTable) -> String {
    let mut lines: Vec<String> = symbols
        .iter()
        .filter(|s| s.defined)
        .map(|s| format!("al C:{:04x} .{}", (s.value as i64 & 0xFFFF) as u16, s.display_name))
        .collect();
    lines.sort();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// One listing line: source line number, resulting address, encoded
/// bytes (if any), and the original source text.
#[derive(Debug, Clone)]
pub struct ListingLine {
    pub line: u32,
    pub address: Option<u16>,
    pub bytes: Vec<u8>,
    pub source: String,
}

/// Render a listing as fixed-width text, one line per source line:
/// `<line>  <addr>  <bytes>   <source>`.
pub fn write_listing(lines: &[ListingLine]) -> String {
    let mut out = String::new();
    for l in lines {
        let addr = l
            .address
            .map(|a| format!("{a:04X}"))
            .unwrap_or_else(|| "    ".to_string());
        let bytes_text = l
            .bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "{:5} {}  {:<24} {}\n",
            l.line, addr, bytes_text, l.source
        ));
    }
    out
}
