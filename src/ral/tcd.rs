//! Transfer control descriptor registers and fields

use super::RWRegister;

/// One channel's transfer control descriptor, as it appears in the
/// eDMA register block
#[repr(C, align(32))]
pub struct RegisterBlock {
    pub SADDR: RWRegister<u32>,
    pub SOFF: RWRegister<i16>,
    pub ATTR: RWRegister<u16>,
    pub NBYTES: RWRegister<u32>,
    pub SLAST: RWRegister<i32>,
    pub DADDR: RWRegister<u32>,
    pub DOFF: RWRegister<i16>,
    pub CITER: RWRegister<u16>,
    pub DLAST_SGA: RWRegister<i32>,
    pub CSR: RWRegister<u16>,
    pub BITER: RWRegister<u16>,
}

const _: () = assert!(core::mem::size_of::<RegisterBlock>() == 32);

pub mod ATTR {
    field!(DSIZE: u16, 0, 3);
    field!(DMOD: u16, 3, 5);
    field!(SSIZE: u16, 8, 3);
    field!(SMOD: u16, 11, 5);
}

pub mod CSR {
    field!(START: u16, 0, 1);
    field!(INTMAJOR: u16, 1, 1);
    field!(INTHALF: u16, 2, 1);
    field!(DREQ: u16, 3, 1);
    field!(ESG: u16, 4, 1);
    field!(MAJORELINK: u16, 5, 1);
    field!(ACTIVE: u16, 6, 1);
    field!(DONE: u16, 7, 1);
    field!(MAJORLINKCH: u16, 8, 5);
    field!(BWC: u16, 14, 2);
}

/// The largest major loop count when channel linking is disabled
pub const CITER_MAX: u16 = 0x7FFF;
