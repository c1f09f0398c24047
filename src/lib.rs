//! Full-duplex LPSPI transfers with chained DMA descriptors for i.MX RT processors
//!
//! `imxrt-spi-dma` moves a transmit buffer out of, and a receive buffer into,
//! a LPSPI peripheral without CPU involvement. It provides
//!
//! - a descriptor builder that turns a transfer description into an eDMA
//!   transfer control descriptor ([`Descriptor`], [`Tcd`])
//! - a channel router that binds DMA channels to peripheral request signals,
//!   and arms them in a fixed order ([`Router`])
//! - a transfer orchestrator that chooses between a cold and a warm
//!   configuration, and optionally holds chip select across the whole buffer
//!   ([`Orchestrator`])
//! - a completion notifier for the receive channel's interrupt
//!   ([`CompletionNotifier`])
//! - a polled, non-DMA echo test for loopback wiring ([`self_test`])
//!
//! The driver talks to hardware through the [`Controller`] and [`Peripheral`]
//! traits. [`Dma`] and [`Lpspi`] implement them for real register blocks. You
//! supply the register block addresses; this crate doesn't depend on a RAL.
//!
//! # Portability
//!
//! The eDMA and DMAMUX layout is the same across the i.MX RT 1010 and 1060
//! families. The 1010 has 16 DMA channels; size your [`Dma`] accordingly. The
//! DMAMUX request signals differ by chip. [`IMXRT1060_SOURCE_SIGNALS`] lists
//! the LPSPI signals for the 1060.
//!
//! # Logging
//!
//! The driver logs through the [`log`](https://docs.rs/log) facade. Cold and
//! warm configurations log at `debug`, channel routing and arming at `trace`.
//! Nothing is logged unless your program installs a logger.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![cfg_attr(not(test), no_std)]

mod channel;
mod controller;
mod descriptor;
mod element;
mod error;
mod interrupt;
pub mod orchestrator;
pub mod peripheral;
mod ral;
#[cfg(test)]
mod sim;

pub use channel::{Channel, ChannelConfiguration, Role, Router};
pub use controller::{Controller, Dma, DmaRegister};
pub use descriptor::{Descriptor, Endpoint, Tcd};
pub use element::Element;
pub use error::Error;
pub use interrupt::CompletionNotifier;
pub use orchestrator::{Config, DescriptorMemory, Orchestrator, State};
pub use peripheral::{
    polled_transfer, self_test, Lpspi, Peripheral, Register, IMXRT1060_SOURCE_SIGNALS,
};

/// A DMA result
pub type Result<T> = core::result::Result<T, Error>;
