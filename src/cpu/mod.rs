//! 6502 CPU emulation for the NES.
//!
//! Official instruction set only; undocumented opcodes stop emulation with an error.
//! Table-driven decode ([`opcodes`]), instruction semantics ([`instructions`]), and
//! the [NMI](https://www.nesdev.org/wiki/NMI) / [IRQ](https://www.nesdev.org/wiki/IRQ)
//! sequences. Memory and I/O go through the [`Bus`](crate::bus::Bus) trait.

pub mod cpu;
pub mod flags;
pub mod instructions;
pub mod opcodes;
