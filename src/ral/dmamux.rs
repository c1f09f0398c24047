//! DMA channel multiplexer registers

use super::RWRegister;

/// DMAMUX registers
#[repr(C)]
pub struct RegisterBlock {
    /// Channel configuration, one per DMA channel
    pub chcfg: [RWRegister<u32>; 32],
}

impl RegisterBlock {
    /// Enable the channel's request routing
    pub const ENBL: u32 = 1 << 31;
    /// Periodic triggering from the PIT
    pub const TRIG: u32 = 1 << 30;
    /// Request always asserted; `SOURCE` is ignored
    pub const A_ON: u32 = 1 << 29;
    /// Request source slot
    pub const SOURCE: u32 = 0x7F;
}
