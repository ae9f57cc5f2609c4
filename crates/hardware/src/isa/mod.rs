//! Instruction-set surface consumed by the pipeline.
//!
//! The core never decodes instructions itself. This module defines what the
//! instruction-set and process layers hand it:
//! 1. **Mnemonics:** Instruction class and functional unit operation per mnemonic.
//! 2. **Instructions:** Register dependencies, static and dynamic instructions.
//! 3. **Contexts:** The `Context` collaborator trait and its execution states.
//! 4. **Traces:** A trace-replaying `Context` for driving the model from recorded streams.

/// The `Context` collaborator trait.
pub mod context;

/// Register dependencies and decoded instructions.
pub mod instruction;

/// Mnemonic classification.
pub mod mnemonic;

/// Trace-driven context.
pub mod trace;

pub use context::{Context, ContextState, DecodedInstruction};
pub use instruction::{DynamicInstruction, RegisterDependency, RegisterDependencyType, StaticInstruction};
pub use mnemonic::{Mnemonic, StaticInstructionType};
pub use trace::{TraceBuilder, TraceContext, TraceRecord};
