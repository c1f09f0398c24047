//! Full-duplex LPSPI transfers with chained DMA descriptors
//!
//! An [`Orchestrator`] owns a LPSPI peripheral and the DMA channels that
//! serve it. Each call to [`configure`](Orchestrator::configure) either
//! performs a cold configuration, which quiesces the peripheral and rebuilds
//! everything, or a warm one, which refreshes only the descriptors whose
//! buffers changed. Then it arms the channels and returns; the hardware moves
//! the data on its own.
//!
//! # Chained framing
//!
//! Without chained framing, the LPSPI toggles chip select around every
//! byte. With chained framing, the transmit command register's `CONT` flag
//! holds chip select for the whole buffer. The transmit descriptor links, by
//! scatter-gather, to a continuation descriptor that writes a `CONT`-free
//! command into the TCR after the last byte. That releases chip select
//! without CPU involvement.

use crate::{
    channel::{ChannelConfiguration, Role, Router},
    controller::{Controller, DmaRegister},
    descriptor::{Descriptor, Endpoint, Tcd},
    peripheral::{Peripheral, Register},
    ral::{
        lpspi::{self, CR, DER, FCR, TCR},
        tcd::CITER_MAX,
    },
};

/// The data registers present the active byte in their top byte lane
const BYTE_LANE: u32 = 3;

/// Memory that the DMA controller reads on its own
///
/// This holds the continuation descriptor, the command it writes into the
/// TCR, and the channel numbers written by the trigger channels. The
/// orchestrator borrows it for its whole life, so it can't move while a
/// transfer references it.
#[repr(C, align(32))]
pub struct DescriptorMemory {
    continuation: Tcd,
    command: u32,
    trigger_channels: [u8; 2],
}

impl DescriptorMemory {
    /// Empty descriptor memory
    pub const fn new() -> Self {
        DescriptorMemory {
            continuation: Tcd::zeroed(),
            command: 0,
            trigger_channels: [0; 2],
        }
    }

    /// The continuation descriptor of the current configuration
    ///
    /// This is all zero unless the configuration uses chained framing.
    pub fn continuation(&self) -> &Tcd {
        &self.continuation
    }

    /// The non-continuing TCR command that ends a chained frame
    pub fn command(&self) -> &u32 {
        &self.command
    }

    /// The transmit and receive channel numbers, as written by the trigger
    /// channels
    pub fn trigger_channels(&self) -> &[u8; 2] {
        &self.trigger_channels
    }
}

impl Default for DescriptorMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How the trigger channels are requested
    ///
    /// `AlwaysOn` runs the triggers as soon as they're armed. A periodic
    /// configuration waits for a PIT timer.
    pub trigger: ChannelConfiguration,
    /// Arm the transfer channels directly on warm configurations
    ///
    /// When `false`, and there are trigger channels, the triggers arm the
    /// transfer channels. See [`Orchestrator::set_combined`].
    pub combined: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trigger: ChannelConfiguration::AlwaysOn,
            combined: true,
        }
    }
}

/// Configuration state, as observed through [`Orchestrator::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing is configured
    Uninitialized,
    /// The last `configure` was a cold configuration
    ColdConfigured,
    /// The last `configure` reused the cold configuration
    Warm,
}

/// Identifies the buffer that a descriptor was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BufferId {
    address: u32,
    len: usize,
}

impl BufferId {
    const NONE: Self = BufferId { address: 0, len: 0 };

    fn of(buffer: &[u8]) -> Self {
        BufferId {
            address: buffer.as_ptr() as u32,
            len: buffer.len(),
        }
    }
}

/// Flags consumed by the next arm operation
#[derive(Debug)]
struct EpochState {
    state: State,
    cold_start_required: bool,
    refresh_rx: bool,
    refresh_tx: bool,
    combined: bool,
    arm_tx: bool,
    arm_rx: bool,
    chain_framing: bool,
    rx: BufferId,
    tx: BufferId,
}

impl EpochState {
    fn new(combined: bool) -> Self {
        EpochState {
            state: State::Uninitialized,
            cold_start_required: true,
            refresh_rx: false,
            refresh_tx: false,
            combined,
            arm_tx: false,
            arm_rx: false,
            chain_framing: false,
            rx: BufferId::NONE,
            tx: BufferId::NONE,
        }
    }
}

/// Schedules full-duplex LPSPI transfers on a receive / transmit channel pair
///
/// See the [module documentation](crate::orchestrator) for the configuration
/// policy.
///
/// ```no_run
/// use imxrt_spi_dma::{
///     Channel, CompletionNotifier, Config, DescriptorMemory, Dma, Lpspi, Orchestrator, Router,
/// };
/// # const DMA_PTR: *const () = core::ptr::null() as _;
/// # const DMAMUX_PTR: *const () = core::ptr::null() as _;
/// # const LPSPI3_PTR: *const () = core::ptr::null() as _;
///
/// static DMA: Dma<32> = unsafe { Dma::new(DMA_PTR, DMAMUX_PTR) };
/// static RX_COMPLETE: CompletionNotifier<Dma<32>> =
///     unsafe { CompletionNotifier::new(&DMA, 0) };
///
/// static mut MEMORY: DescriptorMemory = DescriptorMemory::new();
/// static mut TX: [u8; 25] = [0; 25];
/// static mut RX: [u8; 25] = [0; 25];
///
/// // Safety: we own LPSPI3, DMA channels 0 and 1, and the descriptor memory.
/// let (spi, rx_channel, tx_channel, memory) = unsafe {
///     (
///         Lpspi::new(LPSPI3_PTR, 15),
///         Channel::new(&DMA, 0),
///         Channel::new(&DMA, 1),
///         &mut *core::ptr::addr_of_mut!(MEMORY),
///     )
/// };
/// let mut spi_dma = Orchestrator::new(
///     Router::new(rx_channel, tx_channel),
///     spi,
///     memory,
///     Config::default(),
/// );
///
/// // Safety: the buffers are static, and we don't touch them until the
/// // receive channel completes.
/// unsafe {
///     let tx = &mut *core::ptr::addr_of_mut!(TX);
///     tx[0] = 0x41;
///     spi_dma.configure(tx, &mut *core::ptr::addr_of_mut!(RX), false, false);
/// }
/// while RX_COMPLETE.completions() == 0 {}
/// ```
pub struct Orchestrator<'a, C, P> {
    router: Router<'a, C>,
    peripheral: P,
    memory: &'a mut DescriptorMemory,
    config: Config,
    epoch: EpochState,
}

impl<'a, C: Controller, P: Peripheral> Orchestrator<'a, C, P> {
    /// Create an orchestrator that moves data for `peripheral` through the
    /// `router` channels
    ///
    /// Nothing is written to hardware until the first
    /// [`configure`](Orchestrator::configure).
    pub fn new(
        router: Router<'a, C>,
        peripheral: P,
        memory: &'a mut DescriptorMemory,
        config: Config,
    ) -> Self {
        Orchestrator {
            router,
            peripheral,
            memory,
            config,
            epoch: EpochState::new(config.combined),
        }
    }

    /// Configure and start a full-duplex transfer of `tx` into `rx`
    ///
    /// A cold configuration happens when `force_restart` is set, when nothing
    /// was configured yet, or when `chain_framing` differs from the current
    /// configuration. Otherwise, the warm path rebuilds only the descriptors
    /// whose buffers changed and re-arms the channels. The call returns once
    /// the channels are armed.
    ///
    /// # Safety
    ///
    /// The DMA controller reads `tx` and writes `rx` after this call returns.
    /// Both buffers must stay valid, and you must not access `rx` or modify
    /// `tx`, until the receive channel signals completion, or until
    /// [`stop`](Orchestrator::stop) and the channels are idle.
    ///
    /// `tx` and `rx` must have the same, non-zero length that fits in a
    /// major loop (32767 elements). That's only checked in debug builds.
    pub unsafe fn configure(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        chain_framing: bool,
        force_restart: bool,
    ) {
        debug_assert_eq!(tx.len(), rx.len(), "TX and RX buffer lengths differ");
        debug_assert!(
            !tx.is_empty() && tx.len() <= CITER_MAX as usize,
            "Unsupported transfer length {}",
            tx.len()
        );

        let epoch = &mut self.epoch;
        epoch.cold_start_required |= force_restart || epoch.chain_framing != chain_framing;
        epoch.refresh_rx |= epoch.rx != BufferId::of(rx);
        epoch.refresh_tx |= epoch.tx != BufferId::of(tx);
        epoch.arm_tx = true;
        epoch.arm_rx = true;

        if epoch.cold_start_required {
            self.cold(tx, rx, chain_framing);
        } else {
            self.warm(tx, rx);
        }
    }

    /// Force a cold configuration, then start the transfer
    ///
    /// Same as [`configure`](Orchestrator::configure) with `force_restart`.
    ///
    /// # Safety
    ///
    /// See [`configure`](Orchestrator::configure).
    pub unsafe fn restart(&mut self, tx: &[u8], rx: &mut [u8], chain_framing: bool) {
        self.configure(tx, rx, chain_framing, true);
    }

    /// Stop generating DMA requests from the peripheral
    ///
    /// Descriptors are left as they are, so the next `configure` without a
    /// forced restart takes the warm path. A transfer that the controller
    /// already dispatched is not cancelled.
    pub fn stop(&mut self) {
        self.disable_requests();
        self.epoch.arm_tx = false;
        self.epoch.arm_rx = false;
        log::debug!("Stopped LPSPI DMA requests");
    }

    /// Choose how warm configurations arm the transfer channels
    ///
    /// `true` arms the transmit, then receive, channel directly. `false`
    /// delegates arming to the trigger channels; this has no effect if the
    /// router has none. Takes effect on the next warm configuration.
    pub fn set_combined(&mut self, combined: bool) {
        if !combined && !self.router.has_triggers() {
            log::warn!("No trigger channels; arming stays combined");
        }
        self.epoch.combined = combined;
    }

    /// Returns the configuration state
    pub fn state(&self) -> State {
        self.epoch.state
    }

    /// Check the transfer channels for a DMA error
    ///
    /// Clears the error flag of the first channel found in error, and returns
    /// the controller's error status.
    pub fn error(&self) -> crate::Result<()> {
        for channel in [self.router.rx(), self.router.tx()] {
            if channel.is_error() {
                let error = channel.error_status();
                channel.clear_error();
                log::error!("DMA{} error: {}", channel.channel(), error);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Returns the peripheral
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Returns the channel router
    pub fn router(&self) -> &Router<'a, C> {
        &self.router
    }

    /// Returns the memory read by the DMA controller
    pub fn memory(&self) -> &DescriptorMemory {
        &*self.memory
    }

    /// Release the channels and the peripheral
    pub fn release(self) -> (Router<'a, C>, P) {
        (self.router, self.peripheral)
    }

    unsafe fn cold(&mut self, tx: &[u8], rx: &mut [u8], chain_framing: bool) {
        log::debug!(
            "Cold LPSPI DMA configuration: {} bytes, chained framing {}",
            tx.len(),
            chain_framing
        );
        self.router.disable_all();
        self.quiesce();

        // Stall on the FIFOs; DMA keeps up.
        self.peripheral.modify(Register::Fcr, |fcr| {
            fcr & !(FCR::TXWATER::mask | FCR::RXWATER::mask)
        });
        // TCR writes only take effect once the module is enabled.
        self.peripheral.modify(Register::Cr, |cr| cr | CR::MEN::mask);

        // Both directions stay unmasked for full-duplex.
        let unmasked = !(TCR::TXMSK::mask | TCR::RXMSK::mask);
        if chain_framing {
            self.peripheral.modify(Register::Tcr, |tcr| {
                (tcr & unmasked) | TCR::CONT::mask | TCR::BYSW::mask
            });
            self.build_continuation();
        } else {
            self.peripheral.modify(Register::Tcr, |tcr| {
                (tcr & unmasked & !(TCR::CONT::mask | TCR::CONTC::mask)) | TCR::BYSW::mask
            });
            self.memory.continuation.reset();
        }

        let rx_tcd = self.rx_descriptor(rx);
        let tx_tcd = self.tx_descriptor(tx, chain_framing);

        let rx_signal = self.peripheral.source_signal();
        let tx_signal = self.peripheral.destination_signal();
        self.router.bind(Role::Receive, ChannelConfiguration::enable(rx_signal));
        self.router.bind(Role::Transmit, ChannelConfiguration::enable(tx_signal));
        if self.router.has_triggers() {
            self.prepare_triggers();
        }

        self.router.load(Role::Receive, &rx_tcd);
        self.router.load(Role::Transmit, &tx_tcd);
        self.router.arm_direct(true, true);
        self.enable_requests();

        let epoch = &mut self.epoch;
        epoch.state = State::ColdConfigured;
        epoch.cold_start_required = false;
        epoch.refresh_rx = false;
        epoch.refresh_tx = false;
        epoch.arm_tx = false;
        epoch.arm_rx = false;
        epoch.chain_framing = chain_framing;
        epoch.rx = BufferId::of(rx);
        epoch.tx = BufferId::of(tx);
    }

    unsafe fn warm(&mut self, tx: &[u8], rx: &mut [u8]) {
        log::debug!(
            "Warm LPSPI DMA configuration: refresh RX {} TX {}",
            self.epoch.refresh_rx,
            self.epoch.refresh_tx
        );
        // Nothing may be requesting while descriptors are rewritten.
        self.disable_requests();
        self.router.disable_all();

        // Scatter-gather swapped the continuation into the transmit channel
        // once the last frame ended.
        let tcr = self.peripheral.address(Register::Tcr);
        self.epoch.refresh_tx |= self.router.tx().tcd().daddr == tcr;

        // Both descriptors must count the same remaining elements, so a
        // refresh on either side rebuilds both.
        if self.epoch.refresh_rx || self.epoch.refresh_tx {
            let rx_tcd = self.rx_descriptor(rx);
            let tx_tcd = self.tx_descriptor(tx, self.epoch.chain_framing);
            self.router.load(Role::Receive, &rx_tcd);
            self.router.load(Role::Transmit, &tx_tcd);
            self.epoch.refresh_rx = false;
            self.epoch.refresh_tx = false;
            self.epoch.rx = BufferId::of(rx);
            self.epoch.tx = BufferId::of(tx);
        }
        if self.epoch.chain_framing {
            // The last frame ended with the continuation command; open the next one.
            self.peripheral.modify(Register::Tcr, |tcr| tcr | TCR::CONT::mask);
        }

        let arm_tx = core::mem::take(&mut self.epoch.arm_tx);
        let arm_rx = core::mem::take(&mut self.epoch.arm_rx);
        self.router.combine_arm(self.epoch.combined, arm_tx, arm_rx);
        self.enable_requests();
        self.epoch.state = State::Warm;
    }

    /// Disable the peripheral, flush its FIFOs, and clear its flags,
    /// interrupts, and DMA requests
    fn quiesce(&mut self) {
        self.peripheral.modify(Register::Cr, |cr| cr & !CR::MEN::mask);
        self.peripheral.modify(Register::Cr, |cr| cr | CR::RTF::mask | CR::RRF::mask);
        self.peripheral.write(Register::Sr, lpspi::SR_W1C);
        self.peripheral.write(Register::Ier, 0);
        self.peripheral.write(Register::Der, 0);
    }

    fn enable_requests(&mut self) {
        self.peripheral.modify(Register::Der, |der| der | DER::TDDE::mask | DER::RDDE::mask);
    }

    fn disable_requests(&mut self) {
        self.peripheral.modify(Register::Der, |der| {
            der & !(DER::TDDE::mask | DER::RDDE::mask)
        });
    }

    /// Build the descriptor that ends a chained frame
    fn build_continuation(&mut self) {
        let command =
            self.peripheral.read(Register::Tcr) & !(TCR::CONT::mask | TCR::CONTC::mask);
        let memory = &mut *self.memory;
        memory.command = command;
        Descriptor::<u32>::new(
            Endpoint::variable(&memory.command),
            Endpoint::register(self.peripheral.address(Register::Tcr)),
            1,
        )
        .build(&mut memory.continuation);
    }

    fn rx_descriptor(&self, rx: &[u8]) -> Tcd {
        Descriptor {
            rewind_destination: true,
            interrupt_on_completion: true,
            ..Descriptor::new(
                Endpoint::register(self.peripheral.address(Register::Rdr) + BYTE_LANE),
                Endpoint::buffer(rx),
                rx.len() as u16,
            )
        }
        .to_tcd()
    }

    fn tx_descriptor(&self, tx: &[u8], chain_framing: bool) -> Tcd {
        let mut tcd = Descriptor {
            rewind_source: true,
            ..Descriptor::new(
                Endpoint::buffer(tx),
                Endpoint::register(self.peripheral.address(Register::Tdr) + BYTE_LANE),
                tx.len() as u16,
            )
        }
        .to_tcd();
        if chain_framing {
            tcd.link(&self.memory.continuation);
        }
        tcd
    }

    /// Build, load, and route the trigger descriptors
    ///
    /// Each trigger writes a channel number into `SERQ`. The transmit trigger
    /// starts the receive trigger when it completes.
    fn prepare_triggers(&mut self) {
        let tx_channel = self.router.tx().channel();
        let rx_channel = self.router.rx().channel();
        let (trigger_rx, serq) = match self.router.channel(Role::TriggerReceive) {
            Some(trigger_rx) => (
                trigger_rx.channel(),
                trigger_rx.controller().address(DmaRegister::Serq),
            ),
            None => return,
        };

        self.memory.trigger_channels = [tx_channel as u8, rx_channel as u8];
        let [tx_source, rx_source] = &self.memory.trigger_channels;
        let mut trigger_tx_tcd = Descriptor::<u8>::new(
            Endpoint::variable(tx_source),
            Endpoint::register(serq),
            1,
        )
        .to_tcd();
        trigger_tx_tcd.link_channel(trigger_rx);
        let trigger_rx_tcd =
            Descriptor::<u8>::new(Endpoint::variable(rx_source), Endpoint::register(serq), 1)
                .to_tcd();

        self.router.load(Role::TriggerTransmit, &trigger_tx_tcd);
        self.router.load(Role::TriggerReceive, &trigger_rx_tcd);
        self.router.bind(Role::TriggerTransmit, self.config.trigger);
        // Started by the transmit trigger's link, never by a request.
        self.router.bind(Role::TriggerReceive, ChannelConfiguration::Off);
    }
}
