//! DMA controller register access
//!
//! The driver never dereferences DMA registers directly. It goes through a
//! [`Controller`], which exposes the named eDMA registers, the channel
//! descriptors, and the DMAMUX channel configurations. [`Dma`] is the
//! implementation for real hardware.

use crate::{
    descriptor::Tcd,
    ral::{self, dma, dmamux, Static},
};

/// eDMA controller registers that the driver names
///
/// The `S*` and `C*` registers are write-only: write a channel number to
/// set or clear that channel's bit. The others are read-only views with one
/// bit per channel, except `ES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaRegister {
    /// Enable request status
    Erq,
    /// Interrupt request status
    Int,
    /// Error status, one bit per channel
    Err,
    /// Global error status
    Es,
    /// Set enable request
    Serq,
    /// Clear enable request
    Cerq,
    /// Clear interrupt request
    Cint,
    /// Clear DONE status bit
    Cdne,
    /// Clear error
    Cerr,
}

/// Access to an eDMA controller and its channel multiplexer
///
/// Methods take `&self`: channels and interrupt handlers share a controller.
/// Each `Channel` only writes its own channel's state.
pub trait Controller {
    /// Read a controller register
    fn read(&self, register: DmaRegister) -> u32;
    /// Write a controller register
    fn write(&self, register: DmaRegister, value: u32);
    /// Returns the bus address of a controller register
    ///
    /// A DMA transfer may target a controller register. The trigger channels
    /// write channel numbers into `SERQ`.
    fn address(&self, register: DmaRegister) -> u32;
    /// Copy `tcd` into the channel's hardware descriptor
    fn load(&self, channel: usize, tcd: &Tcd);
    /// Read back the channel's hardware descriptor
    fn tcd(&self, channel: usize) -> Tcd;
    /// Read the channel's DMAMUX configuration
    fn multiplexer(&self, channel: usize) -> u32;
    /// Write the channel's DMAMUX configuration
    fn set_multiplexer(&self, channel: usize, value: u32);
}

impl<C: Controller + ?Sized> Controller for &C {
    fn read(&self, register: DmaRegister) -> u32 {
        (**self).read(register)
    }
    fn write(&self, register: DmaRegister, value: u32) {
        (**self).write(register, value)
    }
    fn address(&self, register: DmaRegister) -> u32 {
        (**self).address(register)
    }
    fn load(&self, channel: usize, tcd: &Tcd) {
        (**self).load(channel, tcd)
    }
    fn tcd(&self, channel: usize) -> Tcd {
        (**self).tcd(channel)
    }
    fn multiplexer(&self, channel: usize) -> u32 {
        (**self).multiplexer(channel)
    }
    fn set_multiplexer(&self, channel: usize, value: u32) {
        (**self).set_multiplexer(channel, value)
    }
}

/// The eDMA controller and DMAMUX of an i.MX RT processor
///
/// `CHANNELS` is the number of DMA channels on your chip: 32 for most
/// i.MX RT processors, 16 for the 1010 family.
pub struct Dma<const CHANNELS: usize> {
    controller: Static<dma::RegisterBlock>,
    multiplexer: Static<dmamux::RegisterBlock>,
}

// Safety: OK to allocate a DMA driver in a static context.
unsafe impl<const CHANNELS: usize> Sync for Dma<CHANNELS> {}

impl<const CHANNELS: usize> Dma<CHANNELS> {
    /// Create the DMA driver
    ///
    /// This can evaluate at compile time, so you can assign a `Dma` to a static.
    ///
    /// ```no_run
    /// use imxrt_spi_dma::Dma;
    /// # const DMA_PTR: *const () = core::ptr::null() as _;
    /// # const DMAMUX_PTR: *const () = core::ptr::null() as _;
    ///
    /// // Safety: addresses and channel count are valid for this target.
    /// static DMA: Dma<32> = unsafe { Dma::new(DMA_PTR, DMAMUX_PTR) };
    /// ```
    ///
    /// # Safety
    ///
    /// `controller` must point to the start of the eDMA register block, and
    /// `multiplexer` must point to the start of the DMAMUX register block.
    /// `CHANNELS` must not exceed the number of channels on your chip.
    pub const unsafe fn new(controller: *const (), multiplexer: *const ()) -> Self {
        Dma {
            controller: Static(controller.cast()),
            multiplexer: Static(multiplexer.cast()),
        }
    }

    fn checked(channel: usize) -> usize {
        assert!(
            channel < CHANNELS,
            "DMA channel index {} exceeds CHANNELS",
            channel
        );
        channel
    }
}

impl<const CHANNELS: usize> Controller for Dma<CHANNELS> {
    fn read(&self, register: DmaRegister) -> u32 {
        let dma = &*self.controller;
        match register {
            DmaRegister::Erq => dma.ERQ.read(),
            DmaRegister::Int => dma.INT.read(),
            DmaRegister::Err => dma.ERR.read(),
            DmaRegister::Es => dma.ES.read(),
            // Write-only registers read as zero.
            DmaRegister::Serq
            | DmaRegister::Cerq
            | DmaRegister::Cint
            | DmaRegister::Cdne
            | DmaRegister::Cerr => 0,
        }
    }

    fn write(&self, register: DmaRegister, value: u32) {
        let dma = &*self.controller;
        let channel = value as u8;
        match register {
            DmaRegister::Serq => dma.SERQ.write(channel),
            DmaRegister::Cerq => dma.CERQ.write(channel),
            DmaRegister::Cint => dma.CINT.write(channel),
            DmaRegister::Cdne => dma.CDNE.write(channel),
            DmaRegister::Cerr => dma.CERR.write(channel),
            // Status registers are cleared through their C* companions.
            DmaRegister::Erq
            | DmaRegister::Int
            | DmaRegister::Err
            | DmaRegister::Es => {}
        }
    }

    fn address(&self, register: DmaRegister) -> u32 {
        let dma = &*self.controller;
        match register {
            DmaRegister::Erq => &dma.ERQ as *const _ as u32,
            DmaRegister::Int => &dma.INT as *const _ as u32,
            DmaRegister::Err => &dma.ERR as *const _ as u32,
            DmaRegister::Es => &dma.ES as *const _ as u32,
            DmaRegister::Serq => &dma.SERQ as *const _ as u32,
            DmaRegister::Cerq => &dma.CERQ as *const _ as u32,
            DmaRegister::Cint => &dma.CINT as *const _ as u32,
            DmaRegister::Cdne => &dma.CDNE as *const _ as u32,
            DmaRegister::Cerr => &dma.CERR as *const _ as u32,
        }
    }

    fn load(&self, channel: usize, tcd: &Tcd) {
        let hw = &self.controller.TCD[Self::checked(channel)];
        // Clear CSR first: a stale ESG must not be live while the link
        // address is rewritten.
        ral::write_reg!(crate::ral::tcd, hw, CSR, 0);
        ral::write_reg!(crate::ral::tcd, hw, SADDR, tcd.saddr);
        ral::write_reg!(crate::ral::tcd, hw, SOFF, tcd.soff);
        ral::write_reg!(crate::ral::tcd, hw, ATTR, tcd.attr);
        ral::write_reg!(crate::ral::tcd, hw, NBYTES, tcd.nbytes);
        ral::write_reg!(crate::ral::tcd, hw, SLAST, tcd.slast);
        ral::write_reg!(crate::ral::tcd, hw, DADDR, tcd.daddr);
        ral::write_reg!(crate::ral::tcd, hw, DOFF, tcd.doff);
        ral::write_reg!(crate::ral::tcd, hw, CITER, tcd.citer);
        ral::write_reg!(crate::ral::tcd, hw, DLAST_SGA, tcd.dlast_sga);
        ral::write_reg!(crate::ral::tcd, hw, BITER, tcd.biter);
        ral::write_reg!(crate::ral::tcd, hw, CSR, tcd.csr);
    }

    fn tcd(&self, channel: usize) -> Tcd {
        let hw = &self.controller.TCD[Self::checked(channel)];
        Tcd {
            saddr: ral::read_reg!(crate::ral::tcd, hw, SADDR),
            soff: ral::read_reg!(crate::ral::tcd, hw, SOFF),
            attr: ral::read_reg!(crate::ral::tcd, hw, ATTR),
            nbytes: ral::read_reg!(crate::ral::tcd, hw, NBYTES),
            slast: ral::read_reg!(crate::ral::tcd, hw, SLAST),
            daddr: ral::read_reg!(crate::ral::tcd, hw, DADDR),
            doff: ral::read_reg!(crate::ral::tcd, hw, DOFF),
            citer: ral::read_reg!(crate::ral::tcd, hw, CITER),
            dlast_sga: ral::read_reg!(crate::ral::tcd, hw, DLAST_SGA),
            csr: ral::read_reg!(crate::ral::tcd, hw, CSR),
            biter: ral::read_reg!(crate::ral::tcd, hw, BITER),
        }
    }

    fn multiplexer(&self, channel: usize) -> u32 {
        self.multiplexer.chcfg[Self::checked(channel)].read()
    }

    fn set_multiplexer(&self, channel: usize, value: u32) {
        // Immutable write OK. 32-bit store on configuration register.
        self.multiplexer.chcfg[Self::checked(channel)].write(value);
    }
}
