//! Transfer control descriptors
//!
//! A [`Descriptor`] describes one autonomous transfer: where to read, where
//! to write, how many elements, and what to do when the major loop completes.
//! [`build`](Descriptor::build) turns it into a [`Tcd`], the in-memory image of
//! a channel's hardware descriptor. Building never touches a DMA channel; see
//! [`Channel::load`](crate::Channel::load) for that.

use crate::{
    element::Element,
    ral::tcd::{ATTR, CITER_MAX, CSR},
};

use core::marker::PhantomData;

/// A transfer control descriptor
///
/// `Tcd` has the memory layout of an eDMA TCD. A `Tcd` that lives in RAM may
/// be the target of a scatter-gather link; the DMA controller loads it into
/// a channel when the linking descriptor's major loop completes. The 32 byte
/// alignment is required for scatter-gather targets.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tcd {
    /// Source address
    pub saddr: u32,
    /// Signed source address offset, applied after each read
    pub soff: i16,
    /// Source and destination transfer sizes
    pub attr: u16,
    /// Bytes per minor loop
    pub nbytes: u32,
    /// Last source address adjustment, applied when the major loop completes
    pub slast: i32,
    /// Destination address
    pub daddr: u32,
    /// Signed destination address offset, applied after each write
    pub doff: i16,
    /// Current major loop count
    pub citer: u16,
    /// Last destination address adjustment, or the scatter-gather address
    pub dlast_sga: i32,
    /// Control and status
    pub csr: u16,
    /// Beginning major loop count
    pub biter: u16,
}

const _: () = assert!(core::mem::size_of::<Tcd>() == 32);

impl Tcd {
    /// A descriptor with every field cleared
    pub const fn zeroed() -> Self {
        Tcd {
            saddr: 0,
            soff: 0,
            attr: 0,
            nbytes: 0,
            slast: 0,
            daddr: 0,
            doff: 0,
            citer: 0,
            dlast_sga: 0,
            csr: 0,
            biter: 0,
        }
    }

    /// Clear every field
    ///
    /// Leftover `DREQ`, `ESG` or link bits from an earlier transfer would
    /// otherwise leak into the next one.
    pub fn reset(&mut self) {
        *self = Tcd::zeroed();
    }

    /// Returns the bus address of this descriptor
    pub fn address(&self) -> u32 {
        self as *const Tcd as u32
    }

    /// Chain `next` behind this descriptor using scatter-gather
    ///
    /// When this descriptor's major loop completes, the DMA controller loads
    /// `next` into the channel. The request stays enabled so that `next` can
    /// run. `next` must not move while this descriptor is loaded in a channel.
    pub fn link(&mut self, next: &Tcd) {
        self.dlast_sga = next.address() as i32;
        self.csr = (self.csr | CSR::ESG::mask) & !CSR::DREQ::mask;
    }

    /// Start `channel` when this descriptor's major loop completes
    pub fn link_channel(&mut self, channel: usize) {
        self.csr &= !CSR::MAJORLINKCH::mask;
        self.csr |= CSR::MAJORELINK::mask
            | (((channel as u16) << CSR::MAJORLINKCH::offset) & CSR::MAJORLINKCH::mask);
    }

    /// Returns the scatter-gather link, or `None` if scatter-gather is off
    pub fn next(&self) -> Option<u32> {
        self.is_scatter_gather().then_some(self.dlast_sga as u32)
    }

    /// Indicates if scatter-gather processing is enabled
    pub fn is_scatter_gather(&self) -> bool {
        self.csr & CSR::ESG::mask != 0
    }

    /// Indicates if the channel's request is cleared when the major loop completes
    pub fn disables_on_completion(&self) -> bool {
        self.csr & CSR::DREQ::mask != 0
    }

    /// Indicates if the major loop completion generates an interrupt
    pub fn interrupts_on_completion(&self) -> bool {
        self.csr & CSR::INTMAJOR::mask != 0
    }

    /// Returns the channel started on major loop completion, if any
    pub fn linked_channel(&self) -> Option<usize> {
        (self.csr & CSR::MAJORELINK::mask != 0).then_some(
            ((self.csr & CSR::MAJORLINKCH::mask) >> CSR::MAJORLINKCH::offset) as usize,
        )
    }
}

/// One side of a transfer: an address, and how it moves per element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<E> {
    address: u32,
    stride: i16,
    _elem: PhantomData<fn() -> E>,
}

impl<E: Element> Endpoint<E> {
    /// A peripheral register at `address`
    ///
    /// Every element is read from, or written to, the same address.
    pub const fn register(address: u32) -> Self {
        Endpoint {
            address,
            stride: 0,
            _elem: PhantomData,
        }
    }

    /// A linear buffer, walked one element at a time
    pub fn buffer(buffer: &[E]) -> Self {
        Endpoint {
            address: buffer.as_ptr() as u32,
            stride: core::mem::size_of::<E>() as i16,
            _elem: PhantomData,
        }
    }

    /// A single variable that's read or written on every element
    pub fn variable(variable: &E) -> Self {
        Self::register(variable as *const E as u32)
    }

    /// The endpoint's address
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// The signed address increment per element, in bytes
    pub const fn stride(&self) -> i16 {
        self.stride
    }
}

/// Describes one autonomous DMA transfer
///
/// Each service request moves a single `E`, and the major loop runs for
/// `iterations` requests.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor<E> {
    /// Where the channel reads
    pub source: Endpoint<E>,
    /// Where the channel writes
    pub destination: Endpoint<E>,
    /// Number of elements, which is the major loop count
    pub iterations: u16,
    /// Return the source address to its start after the major loop
    pub rewind_source: bool,
    /// Return the destination address to its start after the major loop
    pub rewind_destination: bool,
    /// Interrupt when the major loop completes
    pub interrupt_on_completion: bool,
}

impl<E: Element> Descriptor<E> {
    /// A transfer of `iterations` elements from `source` to `destination`
    ///
    /// Nothing rewinds, and there's no completion interrupt.
    pub const fn new(source: Endpoint<E>, destination: Endpoint<E>, iterations: u16) -> Self {
        Descriptor {
            source,
            destination,
            iterations,
            rewind_source: false,
            rewind_destination: false,
            interrupt_on_completion: false,
        }
    }

    /// The number of bytes moved over the whole major loop
    pub fn span(&self) -> i32 {
        (self.iterations as usize * core::mem::size_of::<E>()) as i32
    }

    /// Write this transfer into `tcd`
    ///
    /// `tcd` is reset first, so the result never depends on what `tcd` held.
    /// The descriptor disables its channel's request when the major loop
    /// completes; use [`Tcd::link`] to chain another descriptor instead.
    pub fn build(&self, tcd: &mut Tcd) {
        debug_assert!(self.iterations > 0, "DMA transfer with no elements");
        debug_assert!(
            self.iterations <= CITER_MAX,
            "DMA transfer of {} elements exceeds the major loop",
            self.iterations
        );

        tcd.reset();

        let span = self.span();
        tcd.saddr = self.source.address;
        tcd.soff = self.source.stride;
        tcd.daddr = self.destination.address;
        tcd.doff = self.destination.stride;
        tcd.attr = ((E::DATA_TRANSFER_ID << ATTR::SSIZE::offset) & ATTR::SSIZE::mask)
            | ((E::DATA_TRANSFER_ID << ATTR::DSIZE::offset) & ATTR::DSIZE::mask);
        tcd.nbytes = core::mem::size_of::<E>() as u32;
        tcd.citer = self.iterations;
        tcd.biter = self.iterations;
        if self.rewind_source {
            tcd.slast = span.wrapping_neg();
        }
        if self.rewind_destination {
            tcd.dlast_sga = span.wrapping_neg();
        }

        tcd.csr = CSR::DREQ::mask;
        if self.interrupt_on_completion {
            tcd.csr |= CSR::INTMAJOR::mask;
        }
    }

    /// Build this transfer into a new descriptor
    pub fn to_tcd(&self) -> Tcd {
        let mut tcd = Tcd::zeroed();
        self.build(&mut tcd);
        tcd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirty() -> Tcd {
        Tcd {
            saddr: 0xDEAD_BEEF,
            soff: -7,
            attr: 0xFFFF,
            nbytes: 99,
            slast: -1234,
            daddr: 0xCAFE_F00D,
            doff: 3,
            citer: 17,
            dlast_sga: 0x2000_0040,
            csr: 0xFFFF,
            biter: 4,
        }
    }

    fn sample(buffer: &[u8]) -> Descriptor<u8> {
        Descriptor {
            rewind_source: true,
            interrupt_on_completion: true,
            ..Descriptor::new(
                Endpoint::buffer(buffer),
                Endpoint::register(0x403A_0067),
                buffer.len() as u16,
            )
        }
    }

    #[test]
    fn build_ignores_prior_contents() {
        let buffer = [0u8; 25];
        let descriptor = sample(&buffer);

        let mut fresh = Tcd::zeroed();
        descriptor.build(&mut fresh);
        let mut stale = dirty();
        descriptor.build(&mut stale);

        assert_eq!(fresh, stale);
        assert!(!stale.is_scatter_gather());
        assert_eq!(stale.linked_channel(), None);
    }

    #[test]
    fn major_loop_counts_match() {
        for iterations in [1u16, 2, 25, 512, CITER_MAX] {
            let tcd = Descriptor::new(
                Endpoint::<u32>::register(0x4000_0000),
                Endpoint::register(0x4000_0004),
                iterations,
            )
            .to_tcd();
            assert_eq!(tcd.citer, iterations);
            assert_eq!(tcd.biter, tcd.citer);
        }
    }

    #[test]
    fn rewind_is_negative_span() {
        let buffer = [0u8; 25];
        let tcd = sample(&buffer).to_tcd();
        assert_eq!(tcd.slast, -25);
        assert_eq!(tcd.dlast_sga, 0);

        let words = [0u32; 6];
        let tcd = Descriptor {
            rewind_destination: true,
            ..Descriptor::new(
                Endpoint::register(0x403A_0074),
                Endpoint::buffer(&words),
                words.len() as u16,
            )
        }
        .to_tcd();
        assert_eq!(tcd.slast, 0);
        assert_eq!(tcd.dlast_sga, -24);
    }

    #[test]
    fn element_size_sets_attributes_and_minor_loop() {
        let byte = sample(&[0u8; 4]).to_tcd();
        assert_eq!(byte.attr, 0);
        assert_eq!(byte.nbytes, 1);
        assert_eq!(byte.soff, 1);
        assert_eq!(byte.doff, 0);

        let word = 0u32;
        let tcd = Descriptor::new(Endpoint::variable(&word), Endpoint::register(0x403A_0060), 1)
            .to_tcd();
        assert_eq!(tcd.attr, (2 << 8) | 2);
        assert_eq!(tcd.nbytes, 4);
        assert_eq!(tcd.soff, 0);
    }

    #[test]
    fn control_bits() {
        let buffer = [0u8; 3];
        let tcd = sample(&buffer).to_tcd();
        assert!(tcd.disables_on_completion());
        assert!(tcd.interrupts_on_completion());

        let quiet = Descriptor::new(Endpoint::buffer(&buffer), Endpoint::register(0), 3).to_tcd();
        assert!(quiet.disables_on_completion());
        assert!(!quiet.interrupts_on_completion());
    }

    #[test]
    fn link_enables_scatter_gather() {
        let next = Tcd::zeroed();
        let mut tcd = sample(&[1, 2, 3]).to_tcd();
        tcd.link(&next);

        assert_eq!(tcd.next(), Some(next.address()));
        assert!(tcd.is_scatter_gather());
        assert!(!tcd.disables_on_completion());
        assert!(tcd.interrupts_on_completion());
        assert_eq!(next.address() % 32, 0);
    }

    #[test]
    fn link_channel_replaces_prior_link() {
        let mut tcd = sample(&[1]).to_tcd();
        tcd.link_channel(5);
        assert_eq!(tcd.linked_channel(), Some(5));
        tcd.link_channel(2);
        assert_eq!(tcd.linked_channel(), Some(2));
        assert!(tcd.disables_on_completion());
    }
}
