//! A simulated DMA controller and LPSPI for unit tests
//!
//! [`Sim`] keeps a register file for both blocks, and records every write as
//! an [`Event`]. The LPSPI is wired in loopback: every byte written to `TDR`
//! comes back through `RDR`. [`Sim::run_loopback`] plays the part of the DMA
//! engine for one armed transfer.

use crate::{
    controller::{Controller, DmaRegister},
    descriptor::Tcd,
    peripheral::{Peripheral, Register},
    ral::{
        lpspi::{self, CR, DER, SR},
        tcd::CSR,
    },
};

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

const DMA_BASE: u32 = 0x400E_8000;
const LPSPI_BASE: u32 = 0x403A_0000;
const SOURCE_SIGNAL: u32 = 15;

/// Something the driver did to the simulated hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// SERQ
    Arm(usize),
    /// CERQ
    Disarm(usize),
    /// CINT
    ClearInterrupt(usize),
    /// CDNE
    ClearDone(usize),
    /// CERR
    ClearError(usize),
    /// Descriptor copied into a channel
    Load(usize),
    /// DMAMUX channel configuration written
    Mux(usize, u32),
    /// LPSPI register written
    Write(Register, u32),
}

pub struct Sim {
    erq: Cell<u32>,
    int: Cell<u32>,
    err: Cell<u32>,
    es: Cell<u32>,
    tcds: [Cell<Tcd>; 32],
    mux: [Cell<u32>; 32],
    spi: [Cell<u32>; 9],
    fifo: RefCell<VecDeque<u32>>,
    transmitted: RefCell<Vec<u8>>,
    corrupt: Cell<Option<usize>>,
    events: RefCell<Vec<Event>>,
}

impl Sim {
    pub fn new() -> Self {
        Sim {
            erq: Cell::new(0),
            int: Cell::new(0),
            err: Cell::new(0),
            es: Cell::new(0),
            tcds: core::array::from_fn(|_| Cell::new(Tcd::zeroed())),
            mux: core::array::from_fn(|_| Cell::new(0)),
            spi: core::array::from_fn(|_| Cell::new(0)),
            fifo: RefCell::new(VecDeque::new()),
            transmitted: RefCell::new(Vec::new()),
            corrupt: Cell::new(None),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Every recorded event, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Recorded DMA controller events, without multiplexer and LPSPI writes
    pub fn dma_events(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .copied()
            .filter(|event| !matches!(event, Event::Mux(..) | Event::Write(..)))
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Every value written to `channel`'s multiplexer configuration
    pub fn mux_writes(&self, channel: usize) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                Event::Mux(ch, value) if ch == channel => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn raise_interrupt(&self, channel: usize) {
        self.int.set(self.int.get() | 1 << channel);
    }

    pub fn interrupt_pending(&self, channel: usize) -> bool {
        self.int.get() & (1 << channel) != 0
    }

    pub fn raise_error(&self, channel: usize, es: u32) {
        self.err.set(self.err.get() | 1 << channel);
        self.es.set(es);
    }

    /// The hardware descriptor of `channel`
    pub fn tcd(&self, channel: usize) -> Tcd {
        self.tcds[channel].get()
    }

    /// Overwrite the hardware descriptor of `channel`, as if the engine moved it
    pub fn set_tcd(&self, channel: usize, tcd: Tcd) {
        self.tcds[channel].set(tcd);
    }

    /// Raw LPSPI register value, without read side effects
    pub fn spi(&self, register: Register) -> u32 {
        self.spi[register as usize].get()
    }

    pub fn set_spi(&self, register: Register, value: u32) {
        self.spi[register as usize].set(value);
    }

    /// Bus address of a LPSPI register
    pub fn address(&self, register: Register) -> u32 {
        LPSPI_BASE
            + match register {
                Register::Cr => 0x10,
                Register::Sr => 0x14,
                Register::Ier => 0x18,
                Register::Der => 0x1C,
                Register::Fcr => 0x58,
                Register::Fsr => 0x5C,
                Register::Tcr => 0x60,
                Register::Tdr => 0x64,
                Register::Rdr => 0x74,
            }
    }

    /// Bus address of a DMA controller register
    pub fn dma_address(&self, register: DmaRegister) -> u32 {
        DMA_BASE
            + match register {
                DmaRegister::Es => 0x04,
                DmaRegister::Erq => 0x0C,
                DmaRegister::Cerq => 0x1A,
                DmaRegister::Serq => 0x1B,
                DmaRegister::Cdne => 0x1C,
                DmaRegister::Cerr => 0x1E,
                DmaRegister::Cint => 0x1F,
                DmaRegister::Int => 0x24,
                DmaRegister::Err => 0x2C,
            }
    }

    /// Bytes written to the transmit data register
    pub fn transmitted(&self) -> Vec<u8> {
        self.transmitted.borrow().clone()
    }

    /// Flip the bits of the `idx`th echoed byte
    pub fn corrupt_echo(&self, idx: usize) {
        self.corrupt.set(Some(idx));
    }

    /// Run the armed transfer on the `tx` and `rx` channels to completion
    ///
    /// Returns `false`, and moves nothing, unless both channel requests and
    /// both LPSPI DMA requests are enabled. The descriptors must address
    /// `tx` and `rx`. A scatter-gather link on the transmit descriptor must
    /// point at `continuation`, which is then loaded into the channel.
    pub fn run_loopback(
        &self,
        tx_channel: usize,
        rx_channel: usize,
        tx: &[u8],
        rx: &mut [u8],
        continuation: Option<&Tcd>,
    ) -> bool {
        let requests = DER::TDDE::mask | DER::RDDE::mask;
        let channels = (1 << tx_channel) | (1 << rx_channel);
        if self.spi(Register::Der) & requests != requests || self.erq.get() & channels != channels
        {
            return false;
        }

        let mut tx_tcd = self.tcd(tx_channel);
        let mut rx_tcd = self.tcd(rx_channel);
        assert_eq!(tx_tcd.daddr, self.address(Register::Tdr) + 3);
        assert_eq!(rx_tcd.saddr, self.address(Register::Rdr) + 3);
        assert_eq!(tx_tcd.citer, rx_tcd.citer);

        let tx_base = tx.as_ptr() as u32;
        let rx_base = rx.as_ptr() as u32;
        while tx_tcd.citer > 0 {
            let byte = tx[tx_tcd.saddr.wrapping_sub(tx_base) as usize];
            let mut spi = self;
            Peripheral::write(&mut spi, Register::Tdr, byte as u32);
            tx_tcd.saddr = tx_tcd.saddr.wrapping_add(tx_tcd.soff as u32);
            tx_tcd.citer -= 1;

            let echo = Peripheral::read(&spi, Register::Rdr) as u8;
            rx[rx_tcd.daddr.wrapping_sub(rx_base) as usize] = echo;
            rx_tcd.daddr = rx_tcd.daddr.wrapping_add(rx_tcd.doff as u32);
            rx_tcd.citer -= 1;
        }

        self.complete(tx_channel, tx_tcd, continuation);
        self.complete(rx_channel, rx_tcd, None);
        true
    }

    /// Run the trigger descriptor on `channel`, then every channel it links
    ///
    /// A trigger moves one byte into `SERQ`, and that byte is read from
    /// `memory`. Returns `false` unless `channel`'s request is enabled.
    pub fn run_triggers(&self, channel: usize, memory: &[u8]) -> bool {
        if self.erq.get() & (1 << channel) == 0 {
            return false;
        }

        let base = memory.as_ptr() as u32;
        let mut next = Some(channel);
        while let Some(channel) = next {
            let mut tcd = self.tcd(channel);
            assert_eq!(tcd.daddr, self.dma_address(DmaRegister::Serq));
            assert_eq!((tcd.nbytes, tcd.citer), (1, 1));
            let value = memory[tcd.saddr.wrapping_sub(base) as usize];
            Controller::write(self, DmaRegister::Serq, value as u32);

            tcd.csr |= CSR::DONE::mask;
            if tcd.disables_on_completion() {
                self.erq.set(self.erq.get() & !(1 << channel));
            }
            self.tcds[channel].set(tcd);
            next = tcd.linked_channel();
        }
        true
    }

    fn complete(&self, channel: usize, mut tcd: Tcd, continuation: Option<&Tcd>) {
        let bit = 1 << channel;
        if tcd.interrupts_on_completion() {
            self.int.set(self.int.get() | bit);
        }
        if let Some(next) = tcd.next() {
            let continuation =
                continuation.expect("scatter-gather link without a continuation descriptor");
            assert_eq!(next, continuation.address());
            self.tcds[channel].set(*continuation);
            // The continuation is a single write that ends with DREQ.
            if continuation.disables_on_completion() {
                self.erq.set(self.erq.get() & !bit);
            }
            return;
        }

        tcd.citer = tcd.biter;
        tcd.saddr = tcd.saddr.wrapping_add(tcd.slast as u32);
        tcd.daddr = tcd.daddr.wrapping_add(tcd.dlast_sga as u32);
        tcd.csr |= CSR::DONE::mask;
        if tcd.disables_on_completion() {
            self.erq.set(self.erq.get() & !bit);
        }
        self.tcds[channel].set(tcd);
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl Controller for Sim {
    fn read(&self, register: DmaRegister) -> u32 {
        match register {
            DmaRegister::Erq => self.erq.get(),
            DmaRegister::Int => self.int.get(),
            DmaRegister::Err => self.err.get(),
            DmaRegister::Es => self.es.get(),
            _ => 0,
        }
    }

    fn write(&self, register: DmaRegister, value: u32) {
        let channel = value as usize & 0x1F;
        let bit = 1u32 << channel;
        let event = match register {
            DmaRegister::Serq => {
                self.erq.set(self.erq.get() | bit);
                Event::Arm(channel)
            }
            DmaRegister::Cerq => {
                self.erq.set(self.erq.get() & !bit);
                Event::Disarm(channel)
            }
            DmaRegister::Cint => {
                self.int.set(self.int.get() & !bit);
                Event::ClearInterrupt(channel)
            }
            DmaRegister::Cdne => {
                let mut tcd = self.tcds[channel].get();
                tcd.csr &= !CSR::DONE::mask;
                self.tcds[channel].set(tcd);
                Event::ClearDone(channel)
            }
            DmaRegister::Cerr => {
                self.err.set(self.err.get() & !bit);
                Event::ClearError(channel)
            }
            DmaRegister::Erq
            | DmaRegister::Int
            | DmaRegister::Err
            | DmaRegister::Es => return,
        };
        self.record(event);
    }

    fn address(&self, register: DmaRegister) -> u32 {
        self.dma_address(register)
    }

    fn load(&self, channel: usize, tcd: &Tcd) {
        self.tcds[channel].set(*tcd);
        self.record(Event::Load(channel));
    }

    fn tcd(&self, channel: usize) -> Tcd {
        self.tcds[channel].get()
    }

    fn multiplexer(&self, channel: usize) -> u32 {
        self.mux[channel].get()
    }

    fn set_multiplexer(&self, channel: usize, value: u32) {
        self.mux[channel].set(value);
        self.record(Event::Mux(channel, value));
    }
}

unsafe impl Peripheral for &Sim {
    fn read(&self, register: Register) -> u32 {
        match register {
            Register::Sr if !self.fifo.borrow().is_empty() => {
                self.spi(Register::Sr) | SR::RDF::mask
            }
            Register::Fsr => (self.fifo.borrow().len() as u32) << 16,
            Register::Rdr => self.fifo.borrow_mut().pop_front().unwrap_or(0),
            Register::Tdr => 0,
            _ => self.spi(register),
        }
    }

    fn write(&mut self, register: Register, value: u32) {
        self.record(Event::Write(register, value));
        match register {
            Register::Cr => {
                if value & (CR::RTF::mask | CR::RRF::mask) != 0 {
                    self.fifo.borrow_mut().clear();
                }
                self.set_spi(Register::Cr, value & !(CR::RTF::mask | CR::RRF::mask));
            }
            Register::Sr => {
                let sr = self.spi(Register::Sr);
                self.set_spi(Register::Sr, sr & !(value & lpspi::SR_W1C));
            }
            Register::Tdr => {
                let byte = value as u8;
                let mut transmitted = self.transmitted.borrow_mut();
                let echo = if self.corrupt.get() == Some(transmitted.len()) {
                    !byte
                } else {
                    byte
                };
                transmitted.push(byte);
                self.fifo.borrow_mut().push_back(echo as u32);
            }
            Register::Fsr | Register::Rdr => {}
            _ => self.set_spi(register, value),
        }
    }

    fn address(&self, register: Register) -> u32 {
        Sim::address(self, register)
    }

    fn source_signal(&self) -> u32 {
        SOURCE_SIGNAL
    }

    fn destination_signal(&self) -> u32 {
        SOURCE_SIGNAL + 1
    }
}
