//! eDMA controller registers

use super::{tcd, RORegister, RWRegister, WORegister};

/// DMA registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Control Register
    pub CR: RWRegister<u32>,
    /// Error Status Register
    pub ES: RORegister<u32>,
    _reserved1: [u32; 1],
    /// Enable Request Register
    pub ERQ: RWRegister<u32>,
    _reserved2: [u32; 1],
    /// Enable Error Interrupt Register
    pub EEI: RWRegister<u32>,
    /// Clear Enable Error Interrupt Register
    pub CEEI: WORegister<u8>,
    /// Set Enable Error Interrupt Register
    pub SEEI: WORegister<u8>,
    /// Clear Enable Request Register
    pub CERQ: WORegister<u8>,
    /// Set Enable Request Register
    pub SERQ: WORegister<u8>,
    /// Clear DONE Status Bit Register
    pub CDNE: WORegister<u8>,
    /// Set START Bit Register
    pub SSRT: WORegister<u8>,
    /// Clear Error Register
    pub CERR: WORegister<u8>,
    /// Clear Interrupt Request Register
    pub CINT: WORegister<u8>,
    _reserved3: [u32; 1],
    /// Interrupt Request Register
    pub INT: RWRegister<u32>,
    _reserved4: [u32; 1],
    /// Error Register
    pub ERR: RWRegister<u32>,
    _reserved5: [u32; 1],
    /// Hardware Request Status Register
    pub HRS: RORegister<u32>,
    _reserved6: [u32; 3],
    /// Enable Asynchronous Request in Stop Register
    pub EARS: RWRegister<u32>,
    _reserved7: [u32; 46],
    /// Channel Priority Registers
    pub DCHPRI: [RWRegister<u8>; 32],
    _reserved8: [u32; 952],
    /// Transfer Control Descriptors
    pub TCD: [tcd::RegisterBlock; 32],
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, SERQ) == 0x1B);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, INT) == 0x24);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, DCHPRI) == 0x100);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, TCD) == 0x1000);
