//! InterProcessor Interrupts (IPIs).

use crate::lapic::{DeliverMode, DestinationShorthand, InterruptCommandRegister, Lapic};

/// The destination for an IPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpiDestination {
    /// Send to all cores including self.
    AllCores,
    /// Send to all cores except self.
    AllExceptSelf,
    /// Send to only self.
    SelfOnly,
    /// Send to a specific core by its APIC ID.
    Physical(u8),
    /// Send to a specific logical core ID.
    Logical(u8),
}

/// Builds the fixed, edge-triggered ICR value that delivers `vector` to `dest`.
pub fn command(dest: IpiDestination, vector: u8) -> InterruptCommandRegister {
    let mut icr = InterruptCommandRegister::new()
        .with_vector(vector)
        .with_delivery_mode(DeliverMode::Fixed)
        .with_destination_mode(false) // Physical mode
        .with_level(true) // Assert
        .with_trigger_mode(false); // Edge triggered

    match dest {
        IpiDestination::AllCores => {
            icr.set_destination_shorthand(DestinationShorthand::AllIncludingSelf);
        }
        IpiDestination::AllExceptSelf => {
            icr.set_destination_shorthand(DestinationShorthand::AllExcludingSelf);
        }
        IpiDestination::SelfOnly => {
            icr.set_destination_shorthand(DestinationShorthand::SelfOnly);
        }
        IpiDestination::Physical(apic_id) => {
            icr.set_destination(apic_id);
        }
        IpiDestination::Logical(logical_id) => {
            icr.set_destination_mode(true); // Logical mode
            icr.set_destination(logical_id);
        }
    }
    icr
}

/// Sends `vector` to `dest` once the previous IPI has been accepted.
///
/// # Safety
/// The caller must ensure `lapic` is initialized and that every destination handles `vector`.
pub unsafe fn send_ipi(lapic: &Lapic, dest: IpiDestination, vector: u8) {
    lapic.wait_for_delivery();
    unsafe { lapic.write_icr(command(dest, vector)) };
}
