//! Register dependencies and decoded instructions.
//!
//! The instruction-set layer hands the pipeline fully decoded instructions; the
//! core never looks at encodings. This module defines what such an instruction
//! carries:
//! 1. **Register dependencies:** An architectural register named by class and index.
//! 2. **Static instructions:** Mnemonic plus input and output dependency lists.
//! 3. **Dynamic instructions:** One fetched instance with its pc, owning thread and
//!    effective address.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::constants::{
    NUM_FLOAT_REGISTERS, NUM_INT_REGISTERS, NUM_MISC_REGISTERS, REGISTER_ZERO,
};
use crate::common::ids::InstructionId;
use crate::isa::mnemonic::{Mnemonic, StaticInstructionType};

/// Register class of an architectural dependency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterDependencyType {
    /// General-purpose integer register.
    Integer,
    /// Floating-point register.
    Float,
    /// Miscellaneous register (HI, LO, FCSR).
    Misc,
}

impl RegisterDependencyType {
    /// All classes, in register-file order.
    pub const ALL: [Self; 3] = [Self::Integer, Self::Float, Self::Misc];

    /// Number of architectural registers in this class.
    pub const fn num_architectural_registers(self) -> usize {
        match self {
            Self::Integer => NUM_INT_REGISTERS,
            Self::Float => NUM_FLOAT_REGISTERS,
            Self::Misc => NUM_MISC_REGISTERS,
        }
    }

    /// Position of this class in per-class arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Integer => 0,
            Self::Float => 1,
            Self::Misc => 2,
        }
    }

    /// Short lowercase name used in logs and statistics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::Float => "fp",
            Self::Misc => "misc",
        }
    }

    const fn prefix(self) -> char {
        match self {
            Self::Integer => 'r',
            Self::Float => 'f',
            Self::Misc => 'm',
        }
    }
}

/// An architectural register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterDependency {
    /// Register class.
    pub kind: RegisterDependencyType,
    /// Index within the class.
    pub index: u8,
}

impl RegisterDependency {
    /// Integer register `index`.
    pub const fn integer(index: u8) -> Self {
        Self {
            kind: RegisterDependencyType::Integer,
            index,
        }
    }

    /// Floating-point register `index`.
    pub const fn float(index: u8) -> Self {
        Self {
            kind: RegisterDependencyType::Float,
            index,
        }
    }

    /// Miscellaneous register `index`.
    pub const fn misc(index: u8) -> Self {
        Self {
            kind: RegisterDependencyType::Misc,
            index,
        }
    }

    /// Returns true for the hard-wired zero register.
    pub const fn is_zero_register(self) -> bool {
        matches!(self.kind, RegisterDependencyType::Integer) && self.index == REGISTER_ZERO
    }

    /// Returns true if the index exists in its class.
    pub const fn is_valid(self) -> bool {
        (self.index as usize) < self.kind.num_architectural_registers()
    }
}

impl fmt::Display for RegisterDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

impl FromStr for RegisterDependency {
    type Err = String;

    /// Parses `r<n>`, `f<n>` or `m<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = match chars.next() {
            Some('r') => RegisterDependencyType::Integer,
            Some('f') => RegisterDependencyType::Float,
            Some('m') => RegisterDependencyType::Misc,
            _ => return Err(format!("register '{s}' must start with r, f or m")),
        };
        let index: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| format!("register '{s}' has no valid index"))?;
        let dep = Self { kind, index };
        if dep.is_valid() {
            Ok(dep)
        } else {
            Err(format!("register '{s}' is out of range"))
        }
    }
}

/// A decoded instruction independent of where it executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticInstruction {
    /// Operation.
    pub mnemonic: Mnemonic,
    /// Source registers; for loads and stores the first is the address base.
    pub input_dependencies: Vec<RegisterDependency>,
    /// Destination registers.
    pub output_dependencies: Vec<RegisterDependency>,
}

impl StaticInstruction {
    /// Creates a static instruction.
    pub const fn new(
        mnemonic: Mnemonic,
        input_dependencies: Vec<RegisterDependency>,
        output_dependencies: Vec<RegisterDependency>,
    ) -> Self {
        Self {
            mnemonic,
            input_dependencies,
            output_dependencies,
        }
    }

    /// Instruction class of the mnemonic.
    pub const fn kind(&self) -> StaticInstructionType {
        self.mnemonic.kind()
    }

    /// Address base register of a load or store.
    pub fn base_address_register(&self) -> Option<RegisterDependency> {
        if self.mnemonic.is_memory() {
            self.input_dependencies.first().copied()
        } else {
            None
        }
    }

    /// Destinations that receive a fresh physical register at rename.
    pub fn renamed_outputs(&self) -> impl Iterator<Item = RegisterDependency> + '_ {
        self.output_dependencies
            .iter()
            .copied()
            .filter(|dep| !dep.is_zero_register())
    }

    /// Free physical registers needed per class, indexed by
    /// [`RegisterDependencyType::index`]. A destination listed twice needs
    /// one register.
    pub fn num_free_physical_registers_to_allocate(&self) -> [usize; 3] {
        let mut needed = [0; 3];
        let outputs: BTreeSet<_> = self.renamed_outputs().collect();
        for dep in outputs {
            needed[dep.kind.index()] += 1;
        }
        needed
    }
}

/// One fetched instance of a static instruction.
#[derive(Clone, Debug)]
pub struct DynamicInstruction {
    /// Simulation-unique id.
    pub id: InstructionId,
    /// Global id of the thread that fetched it.
    pub thread: usize,
    /// Program counter.
    pub pc: u64,
    /// The decoded instruction.
    pub static_instruction: Arc<StaticInstruction>,
    /// Virtual effective address of a load or store.
    pub effective_address: Option<u64>,
}

impl DynamicInstruction {
    /// Mnemonic of the underlying static instruction.
    pub fn mnemonic(&self) -> Mnemonic {
        self.static_instruction.mnemonic
    }
}
