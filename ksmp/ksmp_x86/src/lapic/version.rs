use core::fmt::Debug;
use modular_bitfield::prelude::*;

use crate::lapic::id;

/// Represents the LAPIC version register.
#[bitfield(bytes = 4)]
#[derive(Clone, Copy)]
pub struct LapicVersion {
    /// The version of the local APIC.
    pub version: u8,
    #[skip]
    __: B8,
    /// The number of LVT entries minus one.
    pub max_lvt_entry: u8,
    /// Whether EOI broadcasts can be suppressed.
    pub supports_eoi_broadcast_suppression: bool,
    #[skip]
    __: B7,
}

id!(LapicVersion, REGISTER, 0x30);

impl Debug for LapicVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LapicVersion")
            .field("version", &self.version())
            .field("max_lvt_entry", &self.max_lvt_entry())
            .field(
                "supports_eoi_broadcast_suppression",
                &self.supports_eoi_broadcast_suppression(),
            )
            .finish()
    }
}
