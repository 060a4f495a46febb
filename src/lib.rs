//! Instruction model for the Mindustry logic VM.
//!
//! Every [`Instruction`](instructions/enum.Instruction.html) renders to
//! exactly one line of logic source via `Display`. Jump-like variants carry
//! symbolic targets (a function-local offset plus the owning function's
//! start) that a linker resolves to absolute instruction indices before
//! rendering. The [`ops`](ops/index.html) module holds the static tables
//! that translate C-style operator tokens to logic opcode names.

pub mod instructions;
pub mod ops;

#[cfg(test)]
mod test;

pub use instructions::{Instruction, JumpCondition};
