use core::fmt::Debug;
use modular_bitfield::prelude::*;

use crate::lapic::id;

/// The Interrupt Command Register (ICR), used to send inter-processor interrupts.
#[bitfield(bytes = 8)]
#[derive(Clone, Copy)]
pub struct InterruptCommandRegister {
    /// The interrupt vector to send.
    pub vector: B8,
    /// The delivery mode of the interrupt.
    #[bits = 3]
    pub delivery_mode: DeliverMode,
    /// The destination mode of the interrupt (0 = physical, 1 = logical).
    pub destination_mode: bool,
    /// The delivery status of the interrupt (0 = idle, 1 = send pending).
    pub delivery_status: bool,
    #[skip]
    __: B1,
    /// The level of the interrupt (0 = deassert, 1 = assert).
    pub level: bool,
    /// The trigger mode of the interrupt (0 = edge, 1 = level).
    pub trigger_mode: bool,
    #[skip]
    __: B2,
    /// The destination shorthand of the interrupt.
    pub destination_shorthand: DestinationShorthand,
    #[skip]
    __: B36,
    /// The destination field of the interrupt (only used if destination shorthand is 0).
    pub destination: B8,
}

id!(InterruptCommandRegister, REGISTER, 0x300);

impl InterruptCommandRegister {
    /// The raw 64-bit register value.
    pub fn to_u64(self) -> u64 {
        u64::from_le_bytes(self.into_bytes())
    }

    /// Decodes a raw 64-bit register value.
    pub fn from_u64(raw: u64) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }
}

/// How the target processors handle the interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Specifier)]
pub enum DeliverMode {
    /// Deliver the vector as a normal interrupt.
    Fixed = 0b000,
    /// Deliver to the lowest priority processor among the destinations.
    LowestPriority = 0b001,
    /// System management interrupt.
    Smi = 0b010,
    /// Non-maskable interrupt.
    Nmi = 0b100,
    /// INIT request.
    Init = 0b101,
    /// Startup IPI.
    Startup = 0b110,
    /// Reserved.
    Invalid1 = 0b011,
    /// Reserved.
    Invalid2 = 0b111,
}

/// Shorthand destinations that override the destination field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Specifier)]
pub enum DestinationShorthand {
    /// Use the destination field.
    NoShorthand = 0b00,
    /// Only the sending processor.
    SelfOnly = 0b01,
    /// Every processor, the sender included.
    AllIncludingSelf = 0b10,
    /// Every processor except the sender.
    AllExcludingSelf = 0b11,
}

impl Debug for InterruptCommandRegister {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterruptCommandRegister")
            .field("vector", &self.vector())
            .field("delivery_mode", &self.delivery_mode())
            .field("destination_mode", &self.destination_mode())
            .field("delivery_status", &self.delivery_status())
            .field("level", &self.level())
            .field("trigger_mode", &self.trigger_mode())
            .field("destination_shorthand", &self.destination_shorthand())
            .field("destination", &self.destination())
            .finish()
    }
}
