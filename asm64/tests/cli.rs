//! End-to-end CLI tests: invoke the built `asm64` binary against small
//! fixture sources and check the resulting image bytes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn asm64_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_asm64"))
}

fn write_fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("asm64-cli-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn assembles_prg_with_default_options() {
    let src = write_fixture("hello.asm", "!org $c000\nLDA #$01\nSTA $D020\nRTS\n");
    let out = src.with_extension("prg");

    let status = Command::new(asm64_bin())
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .status()
        .expect("failed to run asm64");
    assert!(status.success());

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes, vec![0x00, 0xC0, 0xA9, 0x01, 0x8D, 0x20, 0xD0, 0x60]);
}

#[test]
fn raw_format_omits_load_address() {
    let src = write_fixture("raw.asm", "!org $1000\nNOP\n");
    let out = src.with_extension("bin");

    let status = Command::new(asm64_bin())
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .arg("-f")
        .arg("raw")
        .status()
        .expect("failed to run asm64");
    assert!(status.success());

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes, vec![0xEA]);
}

#[test]
fn undefined_symbol_exits_with_failure() {
    let src = write_fixture("bad.asm", "!org $c000\nJMP NOWHERE\n");
    let out = src.with_extension("prg");

    let status = Command::new(asm64_bin())
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .status()
        .expect("failed to run asm64");
    assert!(!status.success());
}

#[test]
fn writes_vice_label_file_alongside_image() {
    let src = write_fixture("labels.asm", "!org $c000\nSTART: NOP\nRTS\n");
    let out = src.with_extension("prg");
    let labels = src.with_extension("vice");

    let status = Command::new(asm64_bin())
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .arg("-s")
        .arg(&labels)
        .status()
        .expect("failed to run asm64");
    assert!(status.success());

    let text = fs::read_to_string(&labels).unwrap();
    assert!(text.contains("al C:c000 .START"));
}

#[test]
fn define_flag_seeds_a_constant_symbol() {
    let src = write_fixture("define.asm", "!org $c000\nLDA #VALUE\n");
    let out = src.with_extension("prg");

    let status = Command::new(asm64_bin())
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .arg("-D")
        .arg("VALUE=5")
        .status()
        .expect("failed to run asm64");
    assert!(status.success());

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes, vec![0x00, 0xC0, 0xA9, 0x05]);
}
