//! Opcode decode table for the official 6502 instruction set.
//!
//! Each of the 256 opcode bytes maps to an [`Opcode`] (mnemonic, addressing mode, base cycle
//! count, page-cross penalty) or to `None` for the undocumented ones. Timings follow the
//! [6502 instruction reference](https://www.nesdev.org/obelisk-6502-guide/reference.html).

/// How an instruction locates its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($xxxx)` only.
    Indirect,
    /// `($zp,X)`
    IndexedIndirect,
    /// `($zp),Y`
    IndirectIndexed,
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    pub const fn size(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
            _ => 2,
        }
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    //Load/Store
    LDA,
    LDX,
    LDY,
    STA,
    STX,
    STY,
    //Transfer
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    //Stack
    PHA,
    PHP,
    PLA,
    PLP,
    //Shift
    ASL,
    LSR,
    ROL,
    ROR,
    //Logic
    AND,
    BIT,
    EOR,
    ORA,
    //Arithmetic
    ADC,
    SBC,
    CMP,
    CPX,
    CPY,
    //Inc/Dec
    DEC,
    DEX,
    DEY,
    INC,
    INX,
    INY,
    //Control flow
    BRK,
    JMP,
    JSR,
    RTI,
    RTS,
    //Branch
    BCC,
    BCS,
    BEQ,
    BMI,
    BNE,
    BPL,
    BVC,
    BVS,
    //Flags
    CLC,
    CLD,
    CLI,
    CLV,
    SEC,
    SED,
    SEI,
    NOP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Base cycle count, before page-cross and branch penalties.
    pub cycles: u8,
    /// One extra cycle when the indexed address crosses a page.
    pub page_penalty: bool,
}

impl Opcode {
    pub const fn size(&self) -> u16 {
        self.mode.size()
    }
}

/// Decode table indexed by opcode byte.
pub static OPCODES: [Option<Opcode>; 256] = build_table();

const fn build_table() -> [Option<Opcode>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: false,
    })
}

/// Same as [`op`] with the page-cross penalty.
const fn opp(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Opcode> {
    Some(Opcode {
        mnemonic,
        mode,
        cycles,
        page_penalty: true,
    })
}

const fn decode(byte: u8) -> Option<Opcode> {
    use AddressingMode::*;
    use Mnemonic::*;

    match byte {
        0x69 => op(ADC, Immediate, 2),
        0x65 => op(ADC, ZeroPage, 3),
        0x75 => op(ADC, ZeroPageX, 4),
        0x6D => op(ADC, Absolute, 4),
        0x7D => opp(ADC, AbsoluteX, 4),
        0x79 => opp(ADC, AbsoluteY, 4),
        0x61 => op(ADC, IndexedIndirect, 6),
        0x71 => opp(ADC, IndirectIndexed, 5),

        0x29 => op(AND, Immediate, 2),
        0x25 => op(AND, ZeroPage, 3),
        0x35 => op(AND, ZeroPageX, 4),
        0x2D => op(AND, Absolute, 4),
        0x3D => opp(AND, AbsoluteX, 4),
        0x39 => opp(AND, AbsoluteY, 4),
        0x21 => op(AND, IndexedIndirect, 6),
        0x31 => opp(AND, IndirectIndexed, 5),

        0x0A => op(ASL, Accumulator, 2),
        0x06 => op(ASL, ZeroPage, 5),
        0x16 => op(ASL, ZeroPageX, 6),
        0x0E => op(ASL, Absolute, 6),
        0x1E => op(ASL, AbsoluteX, 7),

        0x90 => op(BCC, Relative, 2),
        0xB0 => op(BCS, Relative, 2),
        0xF0 => op(BEQ, Relative, 2),
        0x30 => op(BMI, Relative, 2),
        0xD0 => op(BNE, Relative, 2),
        0x10 => op(BPL, Relative, 2),
        0x50 => op(BVC, Relative, 2),
        0x70 => op(BVS, Relative, 2),

        0x24 => op(BIT, ZeroPage, 3),
        0x2C => op(BIT, Absolute, 4),

        0x00 => op(BRK, Implied, 7),

        0x18 => op(CLC, Implied, 2),
        0xD8 => op(CLD, Implied, 2),
        0x58 => op(CLI, Implied, 2),
        0xB8 => op(CLV, Implied, 2),

        0xC9 => op(CMP, Immediate, 2),
        0xC5 => op(CMP, ZeroPage, 3),
        0xD5 => op(CMP, ZeroPageX, 4),
        0xCD => op(CMP, Absolute, 4),
        0xDD => opp(CMP, AbsoluteX, 4),
        0xD9 => opp(CMP, AbsoluteY, 4),
        0xC1 => op(CMP, IndexedIndirect, 6),
        0xD1 => opp(CMP, IndirectIndexed, 5),

        0xE0 => op(CPX, Immediate, 2),
        0xE4 => op(CPX, ZeroPage, 3),
        0xEC => op(CPX, Absolute, 4),

        0xC0 => op(CPY, Immediate, 2),
        0xC4 => op(CPY, ZeroPage, 3),
        0xCC => op(CPY, Absolute, 4),

        0xC6 => op(DEC, ZeroPage, 5),
        0xD6 => op(DEC, ZeroPageX, 6),
        0xCE => op(DEC, Absolute, 6),
        0xDE => op(DEC, AbsoluteX, 7),

        0xCA => op(DEX, Implied, 2),
        0x88 => op(DEY, Implied, 2),

        0x49 => op(EOR, Immediate, 2),
        0x45 => op(EOR, ZeroPage, 3),
        0x55 => op(EOR, ZeroPageX, 4),
        0x4D => op(EOR, Absolute, 4),
        0x5D => opp(EOR, AbsoluteX, 4),
        0x59 => opp(EOR, AbsoluteY, 4),
        0x41 => op(EOR, IndexedIndirect, 6),
        0x51 => opp(EOR, IndirectIndexed, 5),

        0xE6 => op(INC, ZeroPage, 5),
        0xF6 => op(INC, ZeroPageX, 6),
        0xEE => op(INC, Absolute, 6),
        0xFE => op(INC, AbsoluteX, 7),

        0xE8 => op(INX, Implied, 2),
        0xC8 => op(INY, Implied, 2),

        0x4C => op(JMP, Absolute, 3),
        0x6C => op(JMP, Indirect, 5),
        0x20 => op(JSR, Absolute, 6),

        0xA9 => op(LDA, Immediate, 2),
        0xA5 => op(LDA, ZeroPage, 3),
        0xB5 => op(LDA, ZeroPageX, 4),
        0xAD => op(LDA, Absolute, 4),
        0xBD => opp(LDA, AbsoluteX, 4),
        0xB9 => opp(LDA, AbsoluteY, 4),
        0xA1 => op(LDA, IndexedIndirect, 6),
        0xB1 => opp(LDA, IndirectIndexed, 5),

        0xA2 => op(LDX, Immediate, 2),
        0xA6 => op(LDX, ZeroPage, 3),
        0xB6 => op(LDX, ZeroPageY, 4),
        0xAE => op(LDX, Absolute, 4),
        0xBE => opp(LDX, AbsoluteY, 4),

        0xA0 => op(LDY, Immediate, 2),
        0xA4 => op(LDY, ZeroPage, 3),
        0xB4 => op(LDY, ZeroPageX, 4),
        0xAC => op(LDY, Absolute, 4),
        0xBC => opp(LDY, AbsoluteX, 4),

        0x4A => op(LSR, Accumulator, 2),
        0x46 => op(LSR, ZeroPage, 5),
        0x56 => op(LSR, ZeroPageX, 6),
        0x4E => op(LSR, Absolute, 6),
        0x5E => op(LSR, AbsoluteX, 7),

        0xEA => op(NOP, Implied, 2),

        0x09 => op(ORA, Immediate, 2),
        0x05 => op(ORA, ZeroPage, 3),
        0x15 => op(ORA, ZeroPageX, 4),
        0x0D => op(ORA, Absolute, 4),
        0x1D => opp(ORA, AbsoluteX, 4),
        0x19 => opp(ORA, AbsoluteY, 4),
        0x01 => op(ORA, IndexedIndirect, 6),
        0x11 => opp(ORA, IndirectIndexed, 5),

        0x48 => op(PHA, Implied, 3),
        0x08 => op(PHP, Implied, 3),
        0x68 => op(PLA, Implied, 4),
        0x28 => op(PLP, Implied, 4),

        0x2A => op(ROL, Accumulator, 2),
        0x26 => op(ROL, ZeroPage, 5),
        0x36 => op(ROL, ZeroPageX, 6),
        0x2E => op(ROL, Absolute, 6),
        0x3E => op(ROL, AbsoluteX, 7),

        0x6A => op(ROR, Accumulator, 2),
        0x66 => op(ROR, ZeroPage, 5),
        0x76 => op(ROR, ZeroPageX, 6),
        0x6E => op(ROR, Absolute, 6),
        0x7E => op(ROR, AbsoluteX, 7),

        0x40 => op(RTI, Implied, 6),
        0x60 => op(RTS, Implied, 6),

        0xE9 => op(SBC, Immediate, 2),
        0xE5 => op(SBC, ZeroPage, 3),
        0xF5 => op(SBC, ZeroPageX, 4),
        0xED => op(SBC, Absolute, 4),
        0xFD => opp(SBC, AbsoluteX, 4),
        0xF9 => opp(SBC, AbsoluteY, 4),
        0xE1 => op(SBC, IndexedIndirect, 6),
        0xF1 => opp(SBC, IndirectIndexed, 5),

        0x38 => op(SEC, Implied, 2),
        0xF8 => op(SED, Implied, 2),
        0x78 => op(SEI, Implied, 2),

        0x85 => op(STA, ZeroPage, 3),
        0x95 => op(STA, ZeroPageX, 4),
        0x8D => op(STA, Absolute, 4),
        0x9D => op(STA, AbsoluteX, 5),
        0x99 => op(STA, AbsoluteY, 5),
        0x81 => op(STA, IndexedIndirect, 6),
        0x91 => op(STA, IndirectIndexed, 6),

        0x86 => op(STX, ZeroPage, 3),
        0x96 => op(STX, ZeroPageY, 4),
        0x8E => op(STX, Absolute, 4),

        0x84 => op(STY, ZeroPage, 3),
        0x94 => op(STY, ZeroPageX, 4),
        0x8C => op(STY, Absolute, 4),

        0xAA => op(TAX, Implied, 2),
        0xA8 => op(TAY, Implied, 2),
        0xBA => op(TSX, Implied, 2),
        0x8A => op(TXA, Implied, 2),
        0x9A => op(TXS, Implied, 2),
        0x98 => op(TYA, Implied, 2),

        _ => None,
    }
}
