//! DMA channels, request routing, and arming

use crate::{
    controller::{Controller, DmaRegister},
    descriptor::Tcd,
    ral::{dmamux, tcd::CSR},
    Error,
};

/// A DMA channel
///
/// A `Channel` pairs a channel number with the controller that owns it. You
/// must always load a descriptor before enabling the channel.
pub struct Channel<'c, C> {
    /// Our channel number, expected to be between 0 to (CHANNEL_COUNT - 1)
    index: usize,
    /// The DMA controller and multiplexer
    controller: &'c C,
}

impl<'c, C: Controller> Channel<'c, C> {
    /// Creates the DMA channel described by `index`
    ///
    /// # Safety
    ///
    /// This will create a handle that may alias global, mutable state. You should only create
    /// one channel per index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than 32.
    pub unsafe fn new(controller: &'c C, index: usize) -> Self {
        assert!(index < 32, "DMA channel index {} exceeds 32", index);
        Channel { index, controller }
    }

    /// Returns the DMA channel number
    pub fn channel(&self) -> usize {
        self.index
    }

    /// Returns the controller that owns this channel
    pub fn controller(&self) -> &'c C {
        self.controller
    }

    /// Copy `tcd` into this channel's hardware descriptor
    ///
    /// Clears the channel's DONE flag first; the controller refuses a
    /// scatter-gather descriptor while DONE is set.
    pub fn load(&mut self, tcd: &Tcd) {
        self.clear_complete();
        self.controller.load(self.index, tcd);
    }

    /// Returns a copy of the channel's hardware descriptor
    pub fn tcd(&self) -> Tcd {
        self.controller.tcd(self.index)
    }

    /// Set the DMAMUX channel configuration
    ///
    /// The multiplexer entry is cleared, the source is assigned, and then the
    /// entry is enabled. The hardware ignores a new source unless the entry
    /// was cleared first.
    ///
    /// # Panics
    ///
    /// Only the first four DMA channels support periodic triggering from PIT timers. This method
    /// panics if `periodic` is set for the [`Enable`](ChannelConfiguration::Enable)
    /// variant, but the channel does not support triggering.
    pub fn set_channel_configuration(&mut self, configuration: ChannelConfiguration) {
        self.controller.set_multiplexer(self.index, 0);
        match configuration {
            ChannelConfiguration::Off => {}
            ChannelConfiguration::Enable { source, periodic } => {
                let mut v = source & dmamux::RegisterBlock::SOURCE;
                if periodic {
                    assert!(
                        self.channel() < 4,
                        "Requested DMA periodic triggering on an unsupported channel."
                    );
                    v |= dmamux::RegisterBlock::TRIG;
                }
                self.controller.set_multiplexer(self.index, v);
                self.controller.set_multiplexer(self.index, v | dmamux::RegisterBlock::ENBL);
            }
            ChannelConfiguration::AlwaysOn => {
                // See note in reference manual: when A_ON is high, SOURCE is ignored.
                self.controller.set_multiplexer(
                    self.index,
                    dmamux::RegisterBlock::ENBL | dmamux::RegisterBlock::A_ON,
                )
            }
        }
    }

    /// Returns the DMAMUX channel configuration
    pub fn channel_configuration(&self) -> ChannelConfiguration {
        let v = self.controller.multiplexer(self.index);
        if v & dmamux::RegisterBlock::ENBL == 0 {
            ChannelConfiguration::Off
        } else if v & dmamux::RegisterBlock::A_ON != 0 {
            ChannelConfiguration::AlwaysOn
        } else {
            ChannelConfiguration::Enable {
                source: v & dmamux::RegisterBlock::SOURCE,
                periodic: v & dmamux::RegisterBlock::TRIG != 0,
            }
        }
    }

    /// Enable the DMA request, which signals that the transfer is ready
    ///
    /// # Safety
    ///
    /// This could initiate a DMA transaction that uses an invalid source or destination.
    /// Caller must ensure that the source and destination set in the channel are valid for
    /// the lifetime of the transfer.
    pub unsafe fn enable(&self) {
        self.controller.write(DmaRegister::Serq, self.index as u32);
    }

    /// Disable the DMA channel, preventing any DMA transfers
    pub fn disable(&self) {
        self.controller.write(DmaRegister::Cerq, self.index as u32);
    }

    /// Indicates if this DMA channel is enabled
    pub fn is_enabled(&self) -> bool {
        self.bit(DmaRegister::Erq)
    }

    /// Returns `true` if this DMA channel generated an interrupt
    pub fn is_interrupt(&self) -> bool {
        self.bit(DmaRegister::Int)
    }

    /// Clear the interrupt flag from this DMA channel
    pub fn clear_interrupt(&self) {
        self.controller.write(DmaRegister::Cint, self.index as u32);
    }

    /// Indicates if the DMA transfer has completed
    pub fn is_complete(&self) -> bool {
        self.tcd().csr & CSR::DONE::mask != 0
    }

    /// Clears completion indication
    pub fn clear_complete(&self) {
        self.controller.write(DmaRegister::Cdne, self.index as u32);
    }

    /// Indicates if the DMA channel is in an error state
    pub fn is_error(&self) -> bool {
        self.bit(DmaRegister::Err)
    }

    /// Clears the error flag
    pub fn clear_error(&self) {
        self.controller.write(DmaRegister::Cerr, self.index as u32);
    }

    /// Returns the value from the **global** error status register
    ///
    /// It may reflect the last channel that produced an error, and that
    /// may not be related to this channel.
    pub fn error_status(&self) -> Error {
        Error::new(self.controller.read(DmaRegister::Es))
    }

    fn bit(&self, register: DmaRegister) -> bool {
        self.controller.read(register) & (1 << self.index) != 0
    }
}

/// DMAMUX channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelConfiguration {
    /// The DMAMUX channel is disabled
    Off,
    /// The DMAMUX is enabled, permitting hardware triggering.
    /// See [`enable()`](ChannelConfiguration::enable) to enable
    /// the channel without periodic triggering.
    Enable {
        /// The DMA channel source (slot number)
        ///
        /// Specifies which DMA source is routed to the DMA channel.
        source: u32,
        /// Set the periodic triggering flag to schedule DMA transfers on PIT
        /// timer scheduling.
        ///
        /// `periodic` only works for the first four DMA channels, since
        /// it corresponds to the PIT timers.
        periodic: bool,
    },
    /// The DMAMUX is always on, and there's no need for software
    /// or hardware activation
    AlwaysOn,
}

impl ChannelConfiguration {
    /// Enable the channel without triggering
    ///
    /// Shorthand for `ChannelConfiguration::Enable { source, periodic: false }`.
    pub const fn enable(source: u32) -> Self {
        ChannelConfiguration::Enable {
            source,
            periodic: false,
        }
    }
}

/// What a channel does for a full-duplex transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Moves received data out of the peripheral
    Receive,
    /// Moves transmit data into the peripheral
    Transmit,
    /// Enables the transmit channel's request
    TriggerTransmit,
    /// Enables the receive channel's request
    TriggerReceive,
}

/// The channels used by one full-duplex transfer
///
/// There's always one receive and one transmit channel. The optional trigger
/// pair enables the transmit and receive requests from DMA instead of from
/// software, so that an external event can start the transfer. The transmit
/// trigger links to the receive trigger, so the transmit request is always
/// enabled first.
pub struct Router<'c, C> {
    rx: Channel<'c, C>,
    tx: Channel<'c, C>,
    triggers: Option<(Channel<'c, C>, Channel<'c, C>)>,
}

impl<'c, C: Controller> Router<'c, C> {
    /// Route a transfer through the `rx` and `tx` channels
    pub fn new(rx: Channel<'c, C>, tx: Channel<'c, C>) -> Self {
        Router {
            rx,
            tx,
            triggers: None,
        }
    }

    /// Use `trigger_tx` and `trigger_rx` to arm the transfer channels
    pub fn with_triggers(mut self, trigger_tx: Channel<'c, C>, trigger_rx: Channel<'c, C>) -> Self {
        self.triggers = Some((trigger_tx, trigger_rx));
        self
    }

    /// Returns the receive channel
    pub fn rx(&self) -> &Channel<'c, C> {
        &self.rx
    }

    /// Returns the transmit channel
    pub fn tx(&self) -> &Channel<'c, C> {
        &self.tx
    }

    /// Returns the channel for `role`, if there is one
    pub fn channel(&self, role: Role) -> Option<&Channel<'c, C>> {
        match role {
            Role::Receive => Some(&self.rx),
            Role::Transmit => Some(&self.tx),
            Role::TriggerTransmit => self.triggers.as_ref().map(|(tx, _)| tx),
            Role::TriggerReceive => self.triggers.as_ref().map(|(_, rx)| rx),
        }
    }

    /// Returns the channel for `role`, if there is one
    pub fn channel_mut(&mut self, role: Role) -> Option<&mut Channel<'c, C>> {
        match role {
            Role::Receive => Some(&mut self.rx),
            Role::Transmit => Some(&mut self.tx),
            Role::TriggerTransmit => self.triggers.as_mut().map(|(tx, _)| tx),
            Role::TriggerReceive => self.triggers.as_mut().map(|(_, rx)| rx),
        }
    }

    /// Indicates if there are trigger channels
    pub fn has_triggers(&self) -> bool {
        self.triggers.is_some()
    }

    /// Route `configuration` to the channel that plays `role`
    ///
    /// Does nothing if there's no channel for `role`.
    pub fn bind(&mut self, role: Role, configuration: ChannelConfiguration) {
        if let Some(channel) = self.channel_mut(role) {
            log::trace!(
                "DMA{} {:?} routed to {:?}",
                channel.channel(),
                role,
                configuration
            );
            channel.set_channel_configuration(configuration);
        }
    }

    /// Load `tcd` into the channel that plays `role`
    pub fn load(&mut self, role: Role, tcd: &Tcd) {
        if let Some(channel) = self.channel_mut(role) {
            channel.load(tcd);
        }
    }

    /// Enable the transmit request, then the receive request
    ///
    /// # Safety
    ///
    /// Both channels must hold complete, valid descriptors.
    pub unsafe fn arm_direct(&self, arm_tx: bool, arm_rx: bool) {
        fence();
        if arm_tx {
            log::trace!("Arming TX DMA{}", self.tx.channel());
            self.tx.enable();
        }
        if arm_rx {
            log::trace!("Arming RX DMA{}", self.rx.channel());
            self.rx.enable();
        }
    }

    /// Arm the transfer channels according to the combine policy
    ///
    /// When `combined` is set, or there are no trigger channels, this is
    /// [`arm_direct`](Router::arm_direct). Otherwise, only the transmit trigger
    /// is enabled; its descriptor enables the transmit request, and its major
    /// loop link starts the receive trigger.
    ///
    /// # Safety
    ///
    /// Both transfer channels must hold complete, valid descriptors. When
    /// delegating, the trigger channels must hold their descriptors.
    pub unsafe fn combine_arm(&self, combined: bool, arm_tx: bool, arm_rx: bool) {
        match &self.triggers {
            Some((trigger_tx, _)) if !combined => {
                fence();
                log::trace!("Arming trigger DMA{}", trigger_tx.channel());
                trigger_tx.enable();
            }
            _ => self.arm_direct(arm_tx, arm_rx),
        }
    }

    /// Disable the requests of every routed channel
    pub fn disable_all(&self) {
        self.tx.disable();
        self.rx.disable();
        if let Some((trigger_tx, trigger_rx)) = &self.triggers {
            trigger_tx.disable();
            trigger_rx.disable();
        }
    }

    /// Release the channels
    #[allow(clippy::type_complexity)]
    pub fn release(
        self,
    ) -> (
        Channel<'c, C>,
        Channel<'c, C>,
        Option<(Channel<'c, C>, Channel<'c, C>)>,
    ) {
        (self.rx, self.tx, self.triggers)
    }
}

/// Orders descriptor writes before a channel request is enabled
fn fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    #[cfg(target_arch = "arm")]
    cortex_m::asm::dsb();
}
