//! DMA element types

mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// An element that a DMA channel can move in one read / write
///
/// `Element` is sealed. It's implemented for `u8`, `u16` and `u32`,
/// the three transfer sizes that the eDMA `ATTR` fields encode.
pub trait Element: Copy + private::Sealed {
    /// The `SSIZE` / `DSIZE` encoding for this element
    const DATA_TRANSFER_ID: u16;
}

impl Element for u8 {
    const DATA_TRANSFER_ID: u16 = 0;
}

impl Element for u16 {
    const DATA_TRANSFER_ID: u16 = 1;
}

impl Element for u32 {
    const DATA_TRANSFER_ID: u16 = 2;
}
