//! DMA error status

use core::fmt::{self, Debug, Display};

/// A DMA error observed on a transfer channel
///
/// The wrapper holds a copy of the DMA controller's error status register
/// at the point of the error. Both `Debug` and `Display` decode it; print the
/// error to understand why the transfer failed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error {
    /// The raw error status
    es: u32,
}

impl Error {
    pub(crate) const fn new(es: u32) -> Self {
        Error { es }
    }

    /// Returns the raw error status value
    pub const fn raw(self) -> u32 {
        self.es
    }

    /// Returns the channel that caused the most recent error
    pub const fn channel(self) -> usize {
        ((self.es >> 8) & 0x1F) as usize
    }

    /// Indicates a source address or offset error
    ///
    /// The source side of a descriptor isn't aligned to its transfer size.
    pub const fn is_source_error(self) -> bool {
        self.es & (0b11 << 6) != 0
    }

    /// Indicates a destination address or offset error
    pub const fn is_destination_error(self) -> bool {
        self.es & (0b11 << 4) != 0
    }

    /// Indicates a scatter-gather configuration error
    ///
    /// The linked descriptor wasn't aligned on a 32 byte boundary.
    pub const fn is_scatter_gather_error(self) -> bool {
        self.es & (1 << 2) != 0
    }

    /// Indicates a bus error on a source read or destination write
    pub const fn is_bus_error(self) -> bool {
        self.es & 0b11 != 0
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DMA_ES({:#010X})", self.es)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
             "DMA_ES: VLD {vld} ECX {ecx} GPE {gpe} CPE {cpe} ERRCHN {errchn} SAE {sae} SOE {soe} DAE {dae} DOE {doe} NCE {nce} SGE {sge} SBE {sbe} DBE {dbe}",
             vld = (self.es >> 31) & 0x1,
             ecx = (self.es >> 16) & 0x1,
             gpe = (self.es >> 15) & 0x1,
             cpe = (self.es >> 14) & 0x1,
             errchn = self.channel(),
             sae = (self.es >> 7) & 0x1,
             soe = (self.es >> 6) & 0x1,
             dae = (self.es >> 5) & 0x1,
             doe = (self.es >> 4) & 0x1,
             nce = (self.es >> 3) & 0x1,
             sge = (self.es >> 2) & 0x1,
             sbe = (self.es >> 1) & 0x1,
             dbe = self.es & 0x1
         )
    }
}
