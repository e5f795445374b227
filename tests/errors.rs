use asmcore::{AsmConfig, ArrayMemory, Assembler, Disassembler, ErrorKind, Insn, NoSymbols, Ns32k};
use pretty_assertions::assert_eq;

fn encode(line: &str, config: &mut AsmConfig) -> Insn {
    let mut insn = Insn::new(0x100);
    let _ = Ns32k.encode(line, &mut insn, &NoSymbols, config);
    insn
}

#[test]
fn overflow_is_reported_but_length_is_kept() {
    let mut config = AsmConfig::default();
    let good = encode("ADDW 7000, R0", &mut config);
    let bad = encode("ADDW 70000, R0", &mut config);
    assert!(good.is_ok());
    assert_eq!(bad.error().kind(), Some(ErrorKind::OverflowRange));
    assert_eq!(bad.error().at(), Some(5));
    assert_eq!(bad.len(), good.len());
    assert_eq!(bad.next_address(), good.next_address());
}

#[test]
fn first_fatal_error_wins() {
    let mut config = AsmConfig::default();
    // both operands overflow; the first one is reported
    let insn = encode("MOVB 300, 0x40000000(R1)", &mut config);
    assert_eq!(insn.error().kind(), Some(ErrorKind::OverflowRange));
    assert_eq!(insn.error().at(), Some(5));
}

#[test]
fn advisory_does_not_fail() {
    let mut config = AsmConfig::default();
    let mut insn = Insn::new(0);
    assert!(Ns32k.encode("RESTORE []", &mut insn, &NoSymbols, &mut config).is_ok());
    assert_eq!(insn.error().kind(), Some(ErrorKind::OpcodeHasNoEffect));
    assert_eq!(insn.bytes(), &[0x72, 0x00]);
}

#[test]
fn option_line_enables_the_fpu() {
    let mut config = AsmConfig::default();
    assert_eq!(encode("MOVF F0, F2", &mut config).error().kind(), Some(ErrorKind::UnknownInstruction));

    let mut insn = Insn::new(0);
    Ns32k.encode("OPTION fpu, on", &mut insn, &NoSymbols, &mut config).unwrap();
    assert!(insn.is_empty());
    let insn = encode("MOVF F0, F2", &mut config);
    assert!(insn.is_ok());
    assert_eq!(insn.bytes(), &[0xBE, 0x85, 0x00]);
}

#[test]
fn directives_through_the_assembler() {
    let mut config = AsmConfig::default();
    assert_eq!(encode(".DOUBLE 0x12345678", &mut config).bytes(), &[0x78, 0x56, 0x34, 0x12]);
    assert_eq!(encode(".byte 'A', 2 ; trailing", &mut config).bytes(), &[0x41, 0x02]);
    let insn = encode("org 0x400", &mut config);
    assert_eq!((insn.address(), insn.len()), (0x400, 0));
    let insn = encode(".WORD 1 2", &mut config);
    assert_eq!(insn.error().kind(), Some(ErrorKind::GarbageAtEnd));
    assert_eq!(insn.error().at(), Some(8));
}

#[test]
fn reserved_displacement_stops_decoding() {
    let mut mem = ArrayMemory::new(0, vec![0x12, 0xE0, 0x00, 0x00, 0x00]);
    let mut insn = Insn::default();
    let mut out = String::new();
    let err = Ns32k.decode(&mut mem, &mut insn, &mut out, &AsmConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IllegalConstant);
    assert_eq!(err.at, 1);
}

#[test]
fn register_list_errors() {
    let mut config = AsmConfig::default();
    let insn = encode("SAVE [R1, R1]", &mut config);
    assert_eq!(insn.error().kind(), Some(ErrorKind::DuplicateRegister));
    let insn = encode("SAVE [R1, R9]", &mut config);
    assert_eq!(insn.error().kind(), Some(ErrorKind::RegisterNotAllowed));
    assert_eq!(insn.error().at(), Some(10));
    assert_eq!(insn.bytes(), &[0x62, 0x02]);
}
