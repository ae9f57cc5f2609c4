//! Architectural constants shared across the simulator.

/// Number of architectural integer registers.
pub const NUM_INT_REGISTERS: usize = 32;

/// Number of architectural floating-point registers.
pub const NUM_FLOAT_REGISTERS: usize = 32;

/// Number of architectural miscellaneous registers (HI, LO, FCSR).
pub const NUM_MISC_REGISTERS: usize = 3;

/// Integer register hard-wired to zero; never renamed as a destination.
pub const REGISTER_ZERO: u8 = 0;

/// Size in bytes of one instruction.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Aligns `addr` down to a multiple of `size` (which must be a power of two).
#[inline]
pub const fn align_down(addr: u64, size: u64) -> u64 {
    addr & !(size - 1)
}
