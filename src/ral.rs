//! A RAL-like module to support DMA and LPSPI register access
//!
//! Register blocks are `#[repr(C)]` structs of `ral-registers` types, so the
//! transfer control descriptors and the multiplexer registers can be indexed
//! by channel number. Every field that the driver touches by name also has a
//! field module, which lets us use the RAL macros.

#![allow(
    non_snake_case, // Compatibility with RAL
    non_upper_case_globals, // Compatibility with RAL
    dead_code, // Not every register and field is used
)]

/// Generates a RAL field module with `offset` and `mask`
macro_rules! field {
    ($name:ident: $ty:ty, $offset:expr, $width:expr) => {
        pub mod $name {
            pub const offset: $ty = $offset;
            pub const mask: $ty = (((1 as $ty) << $width) - 1) << offset;
            pub mod R {}
            pub mod W {}
            pub mod RW {}
        }
    };
}

pub mod dma;
pub mod dmamux;
pub mod lpspi;
pub mod tcd;

pub use ral_registers::{read_reg, write_reg};
use ral_registers::{RORegister, RWRegister, WORegister};

//
// Helper types for static memory
//
// Similar to the RAL's `Instance` type, but more copy.
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}
