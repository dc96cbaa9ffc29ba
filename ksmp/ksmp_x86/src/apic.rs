use ksmp::{CoreId, hal::InterruptController};
use log::{debug, warn};

use crate::{
    core_map::CoreMap,
    ipi::{IpiDestination, send_ipi},
    lapic::{LAPIC_BASE_ENABLE, LAPIC_BASE_MSR, Lapic},
};

/// The interrupt vectors used by SMP task delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpiVectors {
    /// Raised on an AP to make it drain its task queues.
    pub task: u8,
    /// Raised on the BSP when an AP staged completion callbacks.
    pub completion: u8,
    /// Routed to by the LAPIC for spurious interrupts.
    pub spurious: u8,
}

/// [`InterruptController`] backed by the xAPIC of the running core.
#[derive(Debug)]
pub struct X86Apic<'a> {
    lapic: &'a Lapic,
    cores: CoreMap,
    vectors: IpiVectors,
}

impl<'a> X86Apic<'a> {
    /// Creates a controller over an initialized `lapic`.
    pub fn new(lapic: &'a Lapic, cores: CoreMap, vectors: IpiVectors) -> Self {
        Self {
            lapic,
            cores,
            vectors,
        }
    }

    /// The core to APIC id mapping in use.
    pub fn cores(&self) -> &CoreMap {
        &self.cores
    }

    /// Signals end of interrupt for the vector being serviced.
    ///
    /// The BSP's completion handler calls this after [`ksmp::bsp::collect_completions`], and each
    /// AP's task handler after [`ksmp::dispatch::dispatch`].
    ///
    /// # Safety
    /// Must only be called from the handler of an interrupt delivered through the LAPIC.
    pub unsafe fn end_of_interrupt(&self) {
        // SAFETY: The LAPIC was initialized before this controller was built.
        unsafe { self.lapic.eoi() };
    }

    fn send(&self, apic_id: u8, vector: u8) {
        // SAFETY: The LAPIC was initialized before this controller was built, and every core's IDT
        // handles the SMP vectors before it is counted as online.
        unsafe { send_ipi(self.lapic, IpiDestination::Physical(apic_id), vector) };
    }
}

impl InterruptController for X86Apic<'_> {
    fn enable_multiprocessing_mode(&self) {
        // SAFETY: Setting the global enable bit keeps the current base address, and the IDT has a
        // handler for the spurious vector by the time an AP gets here.
        unsafe {
            let mut base = LAPIC_BASE_MSR;
            let value = base.read();
            base.write(value | LAPIC_BASE_ENABLE);
            self.lapic.enable(self.vectors.spurious);
        }
        debug!("LAPIC enabled: {:?}", self.lapic.version());
    }

    fn send_interrupt_to_bsp(&self) {
        self.send(self.cores.bsp(), self.vectors.completion);
    }

    fn send_interrupt_to(&self, core: CoreId) {
        match self.cores.apic_id(core) {
            Some(apic_id) => self.send(apic_id, self.vectors.task),
            None => warn!("No APIC id for core {}, dropping task IPI", core),
        }
    }
}
