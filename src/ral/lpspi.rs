//! LPSPI registers and the fields that the DMA driver touches

use super::{RORegister, RWRegister, WORegister};

/// LPSPI registers
#[repr(C)]
pub struct RegisterBlock {
    /// Version ID
    pub VERID: RORegister<u32>,
    /// Parameter
    pub PARAM: RORegister<u32>,
    _reserved0: [u32; 2],
    /// Control
    pub CR: RWRegister<u32>,
    /// Status
    pub SR: RWRegister<u32>,
    /// Interrupt Enable
    pub IER: RWRegister<u32>,
    /// DMA Enable
    pub DER: RWRegister<u32>,
    /// Configuration 0
    pub CFGR0: RWRegister<u32>,
    /// Configuration 1
    pub CFGR1: RWRegister<u32>,
    _reserved1: [u32; 2],
    /// Data Match 0
    pub DMR0: RWRegister<u32>,
    /// Data Match 1
    pub DMR1: RWRegister<u32>,
    _reserved2: [u32; 2],
    /// Clock Configuration
    pub CCR: RWRegister<u32>,
    _reserved3: [u32; 5],
    /// FIFO Control
    pub FCR: RWRegister<u32>,
    /// FIFO Status
    pub FSR: RORegister<u32>,
    /// Transmit Command
    pub TCR: RWRegister<u32>,
    /// Transmit Data
    pub TDR: WORegister<u32>,
    _reserved4: [u32; 2],
    /// Receive Status
    pub RSR: RORegister<u32>,
    /// Receive Data
    pub RDR: RORegister<u32>,
}

const _: () = assert!(core::mem::offset_of!(RegisterBlock, CR) == 0x10);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, CCR) == 0x40);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, FCR) == 0x58);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, TCR) == 0x60);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, TDR) == 0x64);
const _: () = assert!(core::mem::offset_of!(RegisterBlock, RDR) == 0x74);

pub mod CR {
    field!(MEN: u32, 0, 1);
    field!(RST: u32, 1, 1);
    field!(DOZEN: u32, 2, 1);
    field!(DBGEN: u32, 3, 1);
    field!(RTF: u32, 8, 1);
    field!(RRF: u32, 9, 1);
}

pub mod SR {
    field!(TDF: u32, 0, 1);
    field!(RDF: u32, 1, 1);
    field!(WCF: u32, 8, 1);
    field!(FCF: u32, 9, 1);
    field!(TCF: u32, 10, 1);
    field!(TEF: u32, 11, 1);
    field!(REF: u32, 12, 1);
    field!(DMF: u32, 13, 1);
    field!(MBF: u32, 24, 1);
}

pub mod DER {
    field!(TDDE: u32, 0, 1);
    field!(RDDE: u32, 1, 1);
}

pub mod FCR {
    field!(TXWATER: u32, 0, 4);
    field!(RXWATER: u32, 16, 4);
}

pub mod TCR {
    field!(FRAMESZ: u32, 0, 12);
    field!(WIDTH: u32, 16, 2);
    field!(TXMSK: u32, 18, 1);
    field!(RXMSK: u32, 19, 1);
    field!(CONTC: u32, 20, 1);
    field!(CONT: u32, 21, 1);
    field!(BYSW: u32, 22, 1);
    field!(LSBF: u32, 23, 1);
    field!(PCS: u32, 24, 2);
    field!(PRESCALE: u32, 27, 3);
    field!(CPHA: u32, 30, 1);
    field!(CPOL: u32, 31, 1);
}

/// All write-one-to-clear status flags
pub const SR_W1C: u32 = SR::WCF::mask
    | SR::FCF::mask
    | SR::TCF::mask
    | SR::TEF::mask
    | SR::REF::mask
    | SR::DMF::mask;
