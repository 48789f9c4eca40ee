use super::{hash_map, run_test, ExpectedState};

#[test]
fn ld_register_pair_immediate() {
    // LD BC, 0x1234
    run_test(
        "013412",
        &ExpectedState { b: Some(0x12), c: Some(0x34), ..ExpectedState::empty() },
    );

    // LD DE, 0xABCD; LD HL, 0x5678; LD SP, 0xCFFF
    run_test(
        "11CDAB21785631FFCF",
        &ExpectedState {
            d: Some(0xAB),
            e: Some(0xCD),
            h: Some(0x56),
            l: Some(0x78),
            sp: Some(0xCFFF),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_register_immediate() {
    // LD A, 0x77; LD B, 0x11; LD L, 0x99
    run_test(
        "3E7706112E99",
        &ExpectedState { a: Some(0x77), b: Some(0x11), l: Some(0x99), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_register_register() {
    // LD B, 0xAB; LD A, B; LD D, A
    run_test(
        "06AB7857",
        &ExpectedState { a: Some(0xAB), b: Some(0xAB), d: Some(0xAB), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_indirect_hl() {
    // LD HL, 0xC000; LD (HL), 0x42; LD A, (HL)
    run_test(
        "2100C036427E",
        &ExpectedState {
            a: Some(0x42),
            memory: hash_map! { 0xC000: 0x42 },
            ..ExpectedState::empty()
        },
    );

    // LD HL, 0xC123; LD B, 0x9A; LD (HL), B
    run_test(
        "2123C1069A70",
        &ExpectedState { memory: hash_map! { 0xC123: 0x9A }, ..ExpectedState::empty() },
    );
}

#[test]
fn ld_indirect_bc_de() {
    // LD BC, 0xC000; LD A, 0x99; LD (BC), A; LD DE, 0xC000; LD A, 0x00; LD A, (DE)
    run_test(
        "0100C03E99021100C03E001A",
        &ExpectedState {
            a: Some(0x99),
            memory: hash_map! { 0xC000: 0x99 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ldh_direct() {
    // LD A, 0x5A; LDH (0x80), A; LD A, 0x00; LDH A, (0x80)
    run_test(
        "3E5AE0803E00F080",
        &ExpectedState {
            a: Some(0x5A),
            memory: hash_map! { 0xFF80: 0x5A },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ldh_indirect_c() {
    // LD C, 0x81; LD A, 0x66; LDH (C), A; LD A, 0x00; LDH A, (C)
    run_test(
        "0E813E66E23E00F2",
        &ExpectedState {
            a: Some(0x66),
            memory: hash_map! { 0xFF81: 0x66 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_direct_16() {
    // LD A, 0x7B; LD (0xC000), A; XOR A; LD A, (0xC000)
    run_test(
        "3E7BEA00C0AFFA00C0",
        &ExpectedState {
            a: Some(0x7B),
            memory: hash_map! { 0xC000: 0x7B },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_hl_increment_decrement() {
    // LD HL, 0xC000; LD A, 0x11; LD (HL+), A; LD A, 0x22; LD (HL-), A
    run_test(
        "2100C03E11223E2232",
        &ExpectedState {
            h: Some(0xC0),
            l: Some(0x00),
            memory: hash_map! { 0xC000: 0x11, 0xC001: 0x22 },
            ..ExpectedState::empty()
        },
    );

    // LD HL, 0xC000; LD (HL), 0x33; LD A, (HL+)
    run_test(
        "2100C036332A",
        &ExpectedState {
            a: Some(0x33),
            h: Some(0xC0),
            l: Some(0x01),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_sp_hl_and_store_sp() {
    // LD HL, 0xCFFE; LD SP, HL; LD (0xC00A), SP
    run_test(
        "21FECFF9080AC0",
        &ExpectedState {
            sp: Some(0xCFFE),
            memory: hash_map! { 0xC00A: 0xFE, 0xC00B: 0xCF },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn push_pop_round_trip() {
    // LD HL, 0x55AA; PUSH HL; POP DE -> stack bytes are little-endian
    run_test(
        "21AA55E5D1",
        &ExpectedState {
            d: Some(0x55),
            e: Some(0xAA),
            sp: Some(0xFFFE),
            memory: hash_map! { 0xFFFC: 0xAA, 0xFFFD: 0x55 },
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn inc_dec_register_pairs() {
    // LD BC, 0x00FF; INC BC
    run_test(
        "01FF0003",
        &ExpectedState { b: Some(0x01), c: Some(0x00), ..ExpectedState::empty() },
    );

    // LD DE, 0x0000; DEC DE -> wraps
    run_test(
        "1100001B",
        &ExpectedState { d: Some(0xFF), e: Some(0xFF), ..ExpectedState::empty() },
    );

    // LD SP, 0xCFFF; INC SP
    run_test("31FFCF33", &ExpectedState { sp: Some(0xD000), ..ExpectedState::empty() });
}
