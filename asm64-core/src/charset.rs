//! ASCII -> PETSCII and ASCII -> C64 screen-code transliteration, used by
//! the `!pet` and `!scr` directives.
//!
//! Transcribed from `original_source/src/assembler.c`'s `ascii_to_petscii`
//! and `ascii_to_screencode_table`.

/// Convert one ASCII byte to its PETSCII equivalent.
pub fn ascii_to_petscii(c: u8) -> u8 {
    if c.is_ascii_uppercase() {
        return c;
    }
    if c.is_ascii_lowercase() {
        return c - 0x20;
    }
    match c {
        b'@' => 0x40,
        b'[' => 0x5B,
        b'\\' => 0x5C,
        b']' => 0x5D,
        b'^' => 0x5E,
        b'_' => 0xA4,
        b'`' => 0x27,
        b'{' => 0x5B,
        b'|' => 0x7C,
        b'}' => 0x5D,
        b'~' => 0x7E,
        _ => c,
    }
}

/// Convert an ASCII string to PETSCII bytes.
pub fn str_to_petscii(s: &str) -> Vec<u8> {
    s.bytes().map(ascii_to_petscii).collect()
}

/// ASCII ($00-$7F) -> C64 VIC-II screen code, byte for byte.
const ASCII_TO_SCREENCODE_TABLE: [u8; 128] = [
    // $00-$0F: control chars -> space or '?'
    0x20, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F,
    // $10-$1F: control chars
    0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F,
    // $20-$2F: space and punctuation
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F,
    // $30-$3F: digits and more punctuation
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    // $40-$5F: @, A-Z, [ \ ] ^ _
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
    // $60-$7F: ` a-z { | } ~ DEL, same screen codes as uppercase
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x3F,
];

/// Convert one ASCII byte to its C64 screen-code equivalent.
pub fn ascii_to_screencode(c: u8) -> u8 {
    if c < 128 {
        ASCII_TO_SCREENCODE_TABLE[c as usize]
    } else {
        c & 0x7F
    }
}

/// Convert an ASCII string to screen-code bytes.
pub fn str_to_screencode(s: &str) -> Vec<u8> {
    s.bytes().map(ascii_to_screencode).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn petscii_uppercase_passthrough() {
        assert_eq!(ascii_to_petscii(b'A'), b'A');
        assert_eq!(ascii_to_petscii(b'Z'), b'Z');
    }

    #[test]
    fn petscii_lowercase_maps_to_uppercase_byte() {
        assert_eq!(ascii_to_petscii(b'a'), b'A');
        assert_eq!(ascii_to_petscii(b'z'), b'Z');
    }

    #[test]
    fn petscii_special_chars() {
        assert_eq!(ascii_to_petscii(b'@'), 0x40);
        assert_eq!(ascii_to_petscii(b'_'), 0xA4);
        assert_eq!(ascii_to_petscii(b'`'), 0x27);
        assert_eq!(ascii_to_petscii(b'~'), 0x7E);
    }

    #[test]
    fn petscii_digits_and_punctuation_passthrough() {
        assert_eq!(ascii_to_petscii(b'5'), b'5');
        assert_eq!(ascii_to_petscii(b'!'), b'!');
    }

    #[test]
    fn screencode_space_is_0x20() {
        assert_eq!(ascii_to_screencode(b' '), 0x20);
    }

    #[test]
    fn screencode_at_sign_is_zero() {
        assert_eq!(ascii_to_screencode(b'@'), 0x00);
    }

    #[test]
    fn screencode_letters_start_at_one() {
        assert_eq!(ascii_to_screencode(b'A'), 0x01);
        assert_eq!(ascii_to_screencode(b'Z'), 0x1A);
    }

    #[test]
    fn screencode_lowercase_matches_uppercase() {
        for c in b'a'..=b'z' {
            assert_eq!(
                ascii_to_screencode(c),
                ascii_to_screencode(c.to_ascii_uppercase())
            );
        }
    }

    #[test]
    fn screencode_del_maps_to_question_mark() {
        assert_eq!(ascii_to_screencode(0x7F), 0x3F);
    }

    #[test]
    fn screencode_high_bit_masked() {
        assert_eq!(ascii_to_screencode(0xC1), ascii_to_screencode(b'A'));
    }

    #[test]
    fn str_to_petscii_roundtrip_shape() {
        assert_eq!(str_to_petscii("Hi!"), vec![b'H', b'I', b'!']);
    }
}
