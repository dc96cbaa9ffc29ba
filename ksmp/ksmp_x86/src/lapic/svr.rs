use modular_bitfield::prelude::*;

use crate::lapic::id;

/// Spurious Interrupt Vector Register (SVR).
#[bitfield(bytes = 4)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpuriousInterruptVector {
    /// The spurious interrupt vector number.
    pub vector: u8,
    /// The APIC software enable/disable bit.
    pub apic_enable: bool,
    /// The focus processor checking bit.
    pub focus_processor_checking: bool,
    #[skip]
    __: B2,
    /// The EOI broadcast suppression bit.
    pub eoi_broadcast_suppression: bool,
    #[skip]
    __: B19,
}

id!(SpuriousInterruptVector, REGISTER, 0xF0);

impl SpuriousInterruptVector {
    /// The raw register value.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }

    /// Decodes a raw register value.
    pub fn from_u32(raw: u32) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }
}
