//! LPSPI register access, and the polled (non-DMA) echo transfer.
//!
//! The orchestrator drives the LPSPI through the [`Peripheral`] trait. It
//! needs the register bus addresses for the data and command registers, and
//! the DMAMUX request signals for the receive and transmit paths. [`Lpspi`]
//! implements `Peripheral` for real hardware.

use crate::ral::{self, lpspi, Static};

/// LPSPI registers that the driver names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Control
    Cr,
    /// Status; flags are write-one-to-clear
    Sr,
    /// Interrupt enable
    Ier,
    /// DMA request enable
    Der,
    /// FIFO control (watermarks)
    Fcr,
    /// FIFO status
    Fsr,
    /// Transmit command; frame and chip select control
    Tcr,
    /// Transmit data
    Tdr,
    /// Receive data
    Rdr,
}

/// A LPSPI peripheral that can be the source and destination of DMA data
///
/// # Safety
///
/// `address` must return the bus address of the named register, and the
/// signals must be this peripheral's DMAMUX request sources. The DMA
/// controller reads and writes those addresses without any further checks.
pub unsafe trait Peripheral {
    /// Read a register
    fn read(&self, register: Register) -> u32;
    /// Write a register
    fn write(&mut self, register: Register, value: u32);
    /// Read, modify, and write a register
    fn modify(&mut self, register: Register, f: impl FnOnce(u32) -> u32) {
        let value = self.read(register);
        self.write(register, f(value));
    }
    /// Returns the bus address of `register`
    ///
    /// This memory is assumed to be static. Repeated calls should always
    /// return the same address.
    fn address(&self, register: Register) -> u32;
    /// Receive request signal
    ///
    /// See the DMA multiplexer request table in the reference manual.
    fn source_signal(&self) -> u32;
    /// Transmit request signal
    fn destination_signal(&self) -> u32;
}

/// DMAMUX receive request signals for LPSPI1 through LPSPI4 on i.MX RT 1060
/// processors
///
/// The transmit signal is the receive signal plus one.
pub const IMXRT1060_SOURCE_SIGNALS: [u32; 4] = [13, 77, 15, 79];

/// A LPSPI register block
pub struct Lpspi {
    instance: Static<lpspi::RegisterBlock>,
    source_signal: u32,
}

impl Lpspi {
    /// Wrap the LPSPI register block at `instance`
    ///
    /// `source_signal` is the DMAMUX receive request for this instance; the
    /// transmit request is the next slot.
    ///
    /// # Safety
    ///
    /// `instance` must point to a LPSPI register block, and `source_signal`
    /// must be its receive request. You must not create more than one `Lpspi`
    /// for the same instance.
    pub const unsafe fn new(instance: *const (), source_signal: u32) -> Self {
        Lpspi {
            instance: Static(instance.cast()),
            source_signal,
        }
    }
}

unsafe impl Peripheral for Lpspi {
    fn read(&self, register: Register) -> u32 {
        let spi = &*self.instance;
        match register {
            Register::Cr => ral::read_reg!(crate::ral::lpspi, spi, CR),
            Register::Sr => ral::read_reg!(crate::ral::lpspi, spi, SR),
            Register::Ier => ral::read_reg!(crate::ral::lpspi, spi, IER),
            Register::Der => ral::read_reg!(crate::ral::lpspi, spi, DER),
            Register::Fcr => ral::read_reg!(crate::ral::lpspi, spi, FCR),
            Register::Fsr => ral::read_reg!(crate::ral::lpspi, spi, FSR),
            Register::Tcr => ral::read_reg!(crate::ral::lpspi, spi, TCR),
            Register::Rdr => ral::read_reg!(crate::ral::lpspi, spi, RDR),
            Register::Tdr => 0,
        }
    }

    fn write(&mut self, register: Register, value: u32) {
        let spi = &*self.instance;
        match register {
            Register::Cr => ral::write_reg!(crate::ral::lpspi, spi, CR, value),
            Register::Sr => ral::write_reg!(crate::ral::lpspi, spi, SR, value),
            Register::Ier => ral::write_reg!(crate::ral::lpspi, spi, IER, value),
            Register::Der => ral::write_reg!(crate::ral::lpspi, spi, DER, value),
            Register::Fcr => ral::write_reg!(crate::ral::lpspi, spi, FCR, value),
            Register::Tcr => ral::write_reg!(crate::ral::lpspi, spi, TCR, value),
            Register::Tdr => ral::write_reg!(crate::ral::lpspi, spi, TDR, value),
            Register::Fsr | Register::Rdr => {}
        }
    }

    fn address(&self, register: Register) -> u32 {
        let spi = &*self.instance;
        match register {
            Register::Cr => &spi.CR as *const _ as u32,
            Register::Sr => &spi.SR as *const _ as u32,
            Register::Ier => &spi.IER as *const _ as u32,
            Register::Der => &spi.DER as *const _ as u32,
            Register::Fcr => &spi.FCR as *const _ as u32,
            Register::Fsr => &spi.FSR as *const _ as u32,
            Register::Tcr => &spi.TCR as *const _ as u32,
            Register::Tdr => &spi.TDR as *const _ as u32,
            Register::Rdr => &spi.RDR as *const _ as u32,
        }
    }

    fn source_signal(&self) -> u32 {
        self.source_signal
    }

    fn destination_signal(&self) -> u32 {
        self.source_signal + 1
    }
}

/// Send `bytes` one at a time without DMA, checking that each one echoes
///
/// Each byte is written to the transmit data register; then we spin until
/// the receive FIFO has data, and compare what comes back. The loop stops at
/// the first byte that doesn't echo. Returns the number of bytes that echoed
/// unchanged, which is `bytes.len()` when everything matched.
///
/// Use this with a loopback connection (SDO tied to SDI) while the DMA
/// requests are off.
pub fn polled_transfer<P: Peripheral>(peripheral: &mut P, bytes: &[u8]) -> usize {
    for (idx, &byte) in bytes.iter().enumerate() {
        peripheral.write(Register::Tdr, byte as u32);
        while peripheral.read(Register::Sr) & lpspi::SR::RDF::mask == 0 {}
        let echo = peripheral.read(Register::Rdr) as u8;
        if echo != byte {
            log::warn!(
                "Polled transfer stopped at byte {}: sent {:#04X}, received {:#04X}",
                idx,
                byte,
                echo
            );
            return idx;
        }
    }
    bytes.len()
}

/// The bytes sent by [`self_test`]
pub const SELF_TEST_PATTERN: &[u8; 10] = b"0123456789";

/// Run a polled echo test over ASCII `'0'` through `'9'`
///
/// Returns `true` if all ten bytes echoed.
pub fn self_test<P: Peripheral>(peripheral: &mut P) -> bool {
    let echoed = polled_transfer(peripheral, SELF_TEST_PATTERN);
    log::debug!(
        "Polled self-test echoed {}/{} bytes",
        echoed,
        SELF_TEST_PATTERN.len()
    );
    echoed == SELF_TEST_PATTERN.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sim;

    #[test]
    fn self_test_passes_on_clean_loopback() {
        let sim = Sim::new();
        let mut spi = &sim;
        assert!(self_test(&mut spi));
        assert_eq!(sim.transmitted(), SELF_TEST_PATTERN.to_vec());
    }

    #[test]
    fn self_test_stops_at_first_mismatch() {
        for corrupt in 0..SELF_TEST_PATTERN.len() {
            let sim = Sim::new();
            sim.corrupt_echo(corrupt);
            let mut spi = &sim;
            assert_eq!(polled_transfer(&mut spi, SELF_TEST_PATTERN), corrupt);
            // Nothing past the mismatch went out.
            assert_eq!(sim.transmitted(), SELF_TEST_PATTERN[..=corrupt].to_vec());

            let sim = Sim::new();
            sim.corrupt_echo(corrupt);
            assert!(!self_test(&mut &sim));
        }
    }

    #[test]
    fn empty_transfer_echoes_nothing() {
        let sim = Sim::new();
        assert_eq!(polled_transfer(&mut &sim, &[]), 0);
        assert!(sim.transmitted().is_empty());
    }
}
