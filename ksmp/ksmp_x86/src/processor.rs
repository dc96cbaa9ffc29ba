use ksmp::{CoreId, InterruptMask, hal::Processor};
use log::warn;
use raw_cpuid::CpuId;
use x86_64::{instructions::interrupts, registers::model_specific::Msr};

use crate::core_map::CoreMap;

/// Masks interrupts through `RFLAGS.IF`. Pass it to [`ksmp::SmpConfig::with_interrupt_mask`].
pub const INTERRUPT_MASK: InterruptMask =
    InterruptMask::new(interrupts::are_enabled, interrupts::disable, interrupts::enable);

/// Returns the initial local APIC id of the running core.
#[inline]
pub fn current_apic_id() -> u8 {
    // INFO: We don't use `CpuId::new()` because RA fails to generate the IDE definition for it on non-x86_64 platforms.
    CpuId::with_cpuid_reader(raw_cpuid::CpuIdReaderNative)
        .get_feature_info()
        .map_or(0, |finfo| finfo.initial_local_apic_id())
}

/// [`Processor`] for the running x86_64 core.
#[derive(Debug)]
pub struct X86Processor {
    cores: CoreMap,
}

impl X86Processor {
    /// Creates a processor handle resolving core ids through `cores`.
    pub fn new(cores: CoreMap) -> Self {
        Self { cores }
    }
}

impl Processor for X86Processor {
    fn current_core_id(&self) -> CoreId {
        let apic_id = current_apic_id();
        self.cores.core_of(apic_id).unwrap_or_else(|| {
            warn!("APIC id {} is not in the core map", apic_id);
            CoreId::MAX
        })
    }

    unsafe fn write_msr(&self, register: u32, value: u64) {
        let mut msr = Msr::new(register);
        unsafe { msr.write(value) };
    }

    fn enable_interrupts(&self) {
        interrupts::enable();
    }

    fn halt(&self) {
        x86_64::instructions::hlt();
    }
}
