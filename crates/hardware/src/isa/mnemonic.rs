//! Mnemonic classification.
//!
//! Every mnemonic the instruction-set layer can hand to the pipeline is listed
//! here together with the two properties the core consumes:
//! 1. **Instruction type:** Computation, memory, control flow, trap or nop.
//! 2. **Functional unit operation:** The execution resource an issued instruction
//!    occupies, or none for the zero-latency class that completes at issue.

use serde::Deserialize;

use crate::core::units::fu::FunctionalUnitOperationType;

/// Broad class of a static instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StaticInstructionType {
    /// Integer arithmetic and logic.
    IntegerComputation,
    /// Floating-point arithmetic.
    FloatComputation,
    /// Memory read.
    Load,
    /// Memory write.
    Store,
    /// Conditional branch.
    Conditional,
    /// Call (link register written).
    FunctionCall,
    /// Unconditional direct jump.
    Unconditional,
    /// Return through a register.
    FunctionReturn,
    /// System call or breakpoint.
    Trap,
    /// No operation; skipped by fetch.
    Nop,
    /// Not recognized by the pipeline.
    Unknown,
}

impl StaticInstructionType {
    /// Returns true for instructions that redirect control flow.
    pub const fn is_control(self) -> bool {
        matches!(
            self,
            Self::Conditional | Self::FunctionCall | Self::Unconditional | Self::FunctionReturn
        )
    }
}

/// Instruction mnemonics understood by the pipeline.
///
/// Names deserialize in snake case (`"addu"`, `"add_s"`, `"cvt_d_w"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Mnemonic {
    Nop,

    Add,
    Addi,
    Addiu,
    Addu,
    Sub,
    Subu,
    And,
    Andi,
    Or,
    Ori,
    Xor,
    Xori,
    Nor,
    Sll,
    Sllv,
    Sra,
    Srav,
    Srl,
    Srlv,
    Slt,
    Slti,
    Sltiu,
    Sltu,
    Lui,
    Mfhi,
    Mflo,
    Mthi,
    Mtlo,
    Mult,
    Multu,
    Div,
    Divu,
    Madd,
    Msub,
    Mul,
    Movn,
    Movz,
    Mfc1,
    Mtc1,

    AddS,
    AddD,
    SubS,
    SubD,
    MulS,
    MulD,
    DivS,
    DivD,
    SqrtS,
    SqrtD,
    AbsS,
    AbsD,
    NegS,
    NegD,
    CCondS,
    CCondD,
    CvtSD,
    CvtSW,
    CvtDS,
    CvtDW,
    CvtWS,
    CvtWD,
    MovS,
    MovD,
    TruncW,

    Lb,
    Lbu,
    Lh,
    Lhu,
    Lw,
    Lwl,
    Lwr,
    Ll,
    Lwc1,
    Ldc1,

    Sb,
    Sh,
    Sw,
    Swl,
    Swr,
    Sc,
    Swc1,
    Sdc1,

    B,
    Beq,
    Bne,
    Bgez,
    Bgtz,
    Blez,
    Bltz,
    Bc1f,
    Bc1t,
    Bal,
    Bgezal,
    J,
    Jal,
    Jalr,
    Jr,

    Syscall,
    Break,

    Unknown,
}

impl Mnemonic {
    /// Returns the instruction class of this mnemonic.
    pub const fn kind(self) -> StaticInstructionType {
        use StaticInstructionType as T;
        match self {
            Self::Nop => T::Nop,
            Self::Add
            | Self::Addi
            | Self::Addiu
            | Self::Addu
            | Self::Sub
            | Self::Subu
            | Self::And
            | Self::Andi
            | Self::Or
            | Self::Ori
            | Self::Xor
            | Self::Xori
            | Self::Nor
            | Self::Sll
            | Self::Sllv
            | Self::Sra
            | Self::Srav
            | Self::Srl
            | Self::Srlv
            | Self::Slt
            | Self::Slti
            | Self::Sltiu
            | Self::Sltu
            | Self::Lui
            | Self::Mfhi
            | Self::Mflo
            | Self::Mthi
            | Self::Mtlo
            | Self::Mult
            | Self::Multu
            | Self::Div
            | Self::Divu
            | Self::Madd
            | Self::Msub
            | Self::Mul
            | Self::Movn
            | Self::Movz
            | Self::Mfc1
            | Self::Mtc1 => T::IntegerComputation,
            Self::AddS
            | Self::AddD
            | Self::SubS
            | Self::SubD
            | Self::MulS
            | Self::MulD
            | Self::DivS
            | Self::DivD
            | Self::SqrtS
            | Self::SqrtD
            | Self::AbsS
            | Self::AbsD
            | Self::NegS
            | Self::NegD
            | Self::CCondS
            | Self::CCondD
            | Self::CvtSD
            | Self::CvtSW
            | Self::CvtDS
            | Self::CvtDW
            | Self::CvtWS
            | Self::CvtWD
            | Self::MovS
            | Self::MovD
            | Self::TruncW => T::FloatComputation,
            Self::Lb
            | Self::Lbu
            | Self::Lh
            | Self::Lhu
            | Self::Lw
            | Self::Lwl
            | Self::Lwr
            | Self::Ll
            | Self::Lwc1
            | Self::Ldc1 => T::Load,
            Self::Sb
            | Self::Sh
            | Self::Sw
            | Self::Swl
            | Self::Swr
            | Self::Sc
            | Self::Swc1
            | Self::Sdc1 => T::Store,
            Self::Beq
            | Self::Bne
            | Self::Bgez
            | Self::Bgtz
            | Self::Blez
            | Self::Bltz
            | Self::Bc1f
            | Self::Bc1t => T::Conditional,
            Self::B | Self::J => T::Unconditional,
            Self::Bal | Self::Bgezal | Self::Jal | Self::Jalr => T::FunctionCall,
            Self::Jr => T::FunctionReturn,
            Self::Syscall | Self::Break => T::Trap,
            Self::Unknown => T::Unknown,
        }
    }

    /// Returns the functional unit operation this mnemonic occupies when issued.
    ///
    /// `None` marks the zero-latency class: the instruction is completed and
    /// written back in the cycle it issues.
    pub const fn fu_operation(self) -> Option<FunctionalUnitOperationType> {
        use FunctionalUnitOperationType as Op;
        match self {
            Self::Add
            | Self::Addi
            | Self::Addiu
            | Self::Addu
            | Self::Sub
            | Self::Subu
            | Self::And
            | Self::Andi
            | Self::Or
            | Self::Ori
            | Self::Xor
            | Self::Xori
            | Self::Nor
            | Self::Sll
            | Self::Sllv
            | Self::Sra
            | Self::Srav
            | Self::Srl
            | Self::Srlv
            | Self::Slt
            | Self::Slti
            | Self::Sltiu
            | Self::Sltu
            | Self::Lui
            | Self::Mfhi
            | Self::Mflo
            | Self::Mthi
            | Self::Mtlo
            | Self::Mult
            | Self::Multu
            | Self::B
            | Self::Beq
            | Self::Bne
            | Self::Bgez
            | Self::Bgtz
            | Self::Blez
            | Self::Bltz
            | Self::Bal
            | Self::Bgezal
            | Self::J
            | Self::Jal
            | Self::Jalr => Some(Op::IntAlu),
            Self::Madd | Self::Msub => Some(Op::IntMultiply),
            Self::Div | Self::Divu => Some(Op::IntDivide),
            Self::AddS | Self::AddD | Self::SubS | Self::SubD => Some(Op::FloatAdd),
            Self::MulS | Self::MulD => Some(Op::FloatMultiply),
            Self::DivS | Self::DivD => Some(Op::FloatDivide),
            Self::SqrtS | Self::SqrtD => Some(Op::FloatSqrt),
            Self::AbsS | Self::AbsD | Self::NegS | Self::NegD | Self::CCondS | Self::CCondD => {
                Some(Op::FloatCompare)
            }
            Self::CvtSD | Self::CvtSW | Self::CvtDS | Self::CvtDW | Self::CvtWS | Self::CvtWD => {
                Some(Op::FloatConvert)
            }
            Self::Lb
            | Self::Lbu
            | Self::Lh
            | Self::Lhu
            | Self::Lw
            | Self::Lwl
            | Self::Lwr
            | Self::Ll
            | Self::Lwc1
            | Self::Ldc1 => Some(Op::ReadPort),
            Self::Sb
            | Self::Sh
            | Self::Sw
            | Self::Swl
            | Self::Swr
            | Self::Sc
            | Self::Swc1
            | Self::Sdc1 => Some(Op::WritePort),
            Self::Nop
            | Self::Mul
            | Self::Movn
            | Self::Movz
            | Self::Mfc1
            | Self::Mtc1
            | Self::MovS
            | Self::MovD
            | Self::TruncW
            | Self::Bc1f
            | Self::Bc1t
            | Self::Jr
            | Self::Syscall
            | Self::Break
            | Self::Unknown => None,
        }
    }

    /// Returns true for control-flow mnemonics.
    pub const fn is_control(self) -> bool {
        self.kind().is_control()
    }

    /// Returns true for loads and stores.
    pub const fn is_memory(self) -> bool {
        matches!(
            self.kind(),
            StaticInstructionType::Load | StaticInstructionType::Store
        )
    }
}
