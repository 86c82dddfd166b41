//! Per-generation hardware constants.
//!
//! The semaphore region of a core's L1 starts at a fixed base and is carved
//! into `num_semaphores` slots, `l1_alignment` bytes apart. Both numbers
//! are burnt into the firmware of each chip generation.

use crate::helpe::*;

/// L1 base of the semaphore region on the default generation.
pub const SEMAPHORE_BASE: u32 = 0x0000_6000;
/// Stride between two consecutive semaphore slots, in bytes.
pub const L1_ALIGNMENT: u32 = 16;
/// Number of semaphore slots per core.
pub const NUM_SEMAPHORES: u32 = 8;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Default)]
pub enum Arch {
    Grayskull,
    #[default]
    WormholeB0,
    Blackhole,
}

/// Where the semaphore region of a core's L1 lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemMap {
    pub semaphore_base: u32,
    pub l1_alignment:   u32,
    pub num_semaphores: u32,
}

impl Default for MemMap {
    fn default() -> Self {
        Self {
            semaphore_base: SEMAPHORE_BASE,
            l1_alignment:   L1_ALIGNMENT,
            num_semaphores: NUM_SEMAPHORES,
        }
    }
}

impl MemMap {
    /// Panics if slot `id` would lie past the end of the 32-bit L1 address
    /// space.
    #[inline(always)]
    pub fn semaphore_address(&self, id: u32) -> u32 {
        match self.l1_alignment
            .checked_mul(id)
            .and_then(|offset| offset.checked_add(self.semaphore_base)) {
            Some(addr)  => addr,
            None        => panic!("Semaphore id {id} has no L1 address above 0x{:x}", self.semaphore_base),
        }
    }

    /// First byte past the semaphore region.
    pub fn semaphore_region_end(&self) -> u32 {
        self.semaphore_address(self.num_semaphores)
    }
}

impl Arch {
    pub const fn mem_map(self) -> MemMap {
        match self {
            Arch::Grayskull     => MemMap {
                semaphore_base: 0x0000_4000,
                l1_alignment:   L1_ALIGNMENT,
                num_semaphores: NUM_SEMAPHORES,
            },
            Arch::WormholeB0    => MemMap {
                semaphore_base: SEMAPHORE_BASE,
                l1_alignment:   L1_ALIGNMENT,
                num_semaphores: NUM_SEMAPHORES,
            },
            Arch::Blackhole     => MemMap {
                semaphore_base: 0x0000_8000,
                l1_alignment:   L1_ALIGNMENT,
                num_semaphores: NUM_SEMAPHORES,
            },
        }
    }
}
