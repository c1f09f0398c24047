//! DMA completion interrupt support

use crate::controller::{Controller, DmaRegister};

use core::sync::atomic::{AtomicU32, Ordering};

/// Acknowledges a channel's completion interrupt, and counts completions
///
/// A `CompletionNotifier` services one channel of one controller. Call
/// [`on_interrupt`](CompletionNotifier::on_interrupt) from that channel's
/// interrupt handler. The count starts at zero, and it's never reset; it
/// wraps after `u32::MAX` completions.
///
/// ```no_run
/// use imxrt_spi_dma::{CompletionNotifier, Dma};
/// # const DMA_PTR: *const () = core::ptr::null() as _;
/// # const DMAMUX_PTR: *const () = core::ptr::null() as _;
///
/// static DMA: Dma<32> = unsafe { Dma::new(DMA_PTR, DMAMUX_PTR) };
/// // Safety: channel 8 carries the receive transfer, and only
/// // DMA8_DMA24 services it.
/// static RX_COMPLETE: CompletionNotifier<Dma<32>> =
///     unsafe { CompletionNotifier::new(&DMA, 8) };
///
/// // #[cortex_m_rt::interrupt]
/// fn DMA8_DMA24() {
///     RX_COMPLETE.on_interrupt();
/// }
///
/// fn status() -> u32 {
///     RX_COMPLETE.completions()
/// }
/// ```
pub struct CompletionNotifier<'c, C> {
    controller: &'c C,
    channel: usize,
    completions: AtomicU32,
}

impl<'c, C: Controller> CompletionNotifier<'c, C> {
    /// Service completion interrupts for `channel`
    ///
    /// # Safety
    ///
    /// `channel` must be valid for the controller. There should be only one
    /// notifier per channel, called from the interrupt handler that the
    /// channel's interrupt is routed to.
    pub const unsafe fn new(controller: &'c C, channel: usize) -> Self {
        CompletionNotifier {
            controller,
            channel,
            completions: AtomicU32::new(0),
        }
    }

    /// Handle the channel's interrupt
    ///
    /// If the channel raised its interrupt, the flag is cleared before the
    /// count increments. Returns `true` if there was an interrupt to
    /// acknowledge. Descriptors and buffers are left alone.
    pub fn on_interrupt(&self) -> bool {
        if self.controller.read(DmaRegister::Int) & (1 << self.channel) == 0 {
            return false;
        }
        // Clear by channel number before counting; a set flag re-enters the handler.
        self.controller.write(DmaRegister::Cint, self.channel as u32);
        let count = self.completions.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        log::trace!("DMA{} complete ({})", self.channel, count);
        true
    }

    /// Returns the number of acknowledged completion interrupts
    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::Relaxed)
    }

    /// Returns the serviced channel number
    pub fn channel(&self) -> usize {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Event, Sim};

    #[test]
    fn starts_at_zero() {
        let sim = Sim::new();
        let notifier = unsafe { CompletionNotifier::new(&sim, 8) };
        assert_eq!(notifier.completions(), 0);
        assert!(!notifier.on_interrupt());
        assert_eq!(notifier.completions(), 0);
        assert!(sim.dma_events().is_empty());
    }

    #[test]
    fn clears_flag_then_counts_once() {
        let sim = Sim::new();
        let notifier = unsafe { CompletionNotifier::new(&sim, 8) };

        for expected in 1..=5 {
            sim.raise_interrupt(8);
            assert!(notifier.on_interrupt());
            assert_eq!(notifier.completions(), expected);
            assert!(!sim.interrupt_pending(8));
            // A spurious entry doesn't count.
            assert!(!notifier.on_interrupt());
            assert_eq!(notifier.completions(), expected);
        }
        assert_eq!(
            sim.dma_events(),
            vec![Event::ClearInterrupt(8); 5]
        );
    }

    #[test]
    fn ignores_other_channels() {
        let sim = Sim::new();
        let notifier = unsafe { CompletionNotifier::new(&sim, 8) };
        sim.raise_interrupt(7);
        assert!(!notifier.on_interrupt());
        assert!(sim.interrupt_pending(7));
        assert_eq!(notifier.completions(), 0);
    }
}
