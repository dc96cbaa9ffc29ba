//! Local APIC register access.
//!
//! Most of the documentation for individual types are taken directly from section 3A of
//! the Intel® 64 and IA-32 Architectures Software Developer’s Manual
use core::hint;

use log::{info, trace};
use spin::Once;
use x86_64::registers::model_specific::Msr;

mod icr;
mod svr;
mod version;

pub use icr::{DeliverMode, DestinationShorthand, InterruptCommandRegister};
pub use svr::SpuriousInterruptVector;
pub use version::LapicVersion;

/// The Model Specific Register (MSR) used to determine the base address of the Local APIC.
pub const LAPIC_BASE_MSR: Msr = Msr::new(0x1B);

/// The APIC global enable bit of [`LAPIC_BASE_MSR`].
pub const LAPIC_BASE_ENABLE: u64 = 1 << 11;

/// The offset for the Task Priority Register (TPR).
pub const LAPIC_TPR_OFFSET: usize = 0x80;

/// The offset for the End Of Interrupt (EOI) register.
pub const LAPIC_EOI_OFFSET: usize = 0xB0;

/// The offset for the Destination Format Register (DFR).
pub const LAPIC_DFR_OFFSET: usize = 0xE0;

/// The Local APIC of the running core.
///
/// Every core sees its own LAPIC at the same address, so one instance serves all cores once the
/// register page has been mapped.
#[derive(Debug)]
pub struct Lapic {
    mapped: Once<*mut u8>,
}

impl Lapic {
    /// Creates a new, uninitialized LAPIC instance.
    pub const fn new() -> Self {
        Self {
            mapped: Once::new(),
        }
    }

    /// Sets the virtual address the LAPIC register page is mapped at.
    /// Later calls are ignored.
    ///
    /// # Safety
    /// `mapped` must point to the LAPIC register page (or a 4 KiB region standing in for it), mapped
    /// uncached and writable for the rest of the kernel's lifetime.
    pub unsafe fn init(&self, mapped: *mut u8) {
        self.mapped.call_once(|| mapped);
        info!("LAPIC registers at {:p}", mapped);
    }

    fn base_ptr(&self) -> *mut u8 {
        *self.mapped.wait()
    }

    /// Reads a value from the LAPIC register at the given offset.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given offset is valid and that the LAPIC has been properly initialized.
    pub unsafe fn read_offset<T>(&self, byte_off: usize) -> T
    where
        T: Copy,
    {
        let ptr = unsafe { self.base_ptr().add(byte_off) } as *const T;
        unsafe { ptr.read_volatile() }
    }

    /// Writes a value to the LAPIC register at the given offset.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given offset is valid and that the LAPIC has been properly initialized.
    pub unsafe fn write_offset<T>(&self, byte_off: usize, value: T)
    where
        T: Copy,
    {
        let ptr = unsafe { self.base_ptr().add(byte_off) } as *mut T;
        unsafe { ptr.write_volatile(value) }
    }

    /// Reads the LAPIC version register.
    pub fn version(&self) -> LapicVersion {
        LapicVersion::from_bytes(
            unsafe { self.read_offset::<u32>(LapicVersion::REGISTER) }.to_le_bytes(),
        )
    }

    /// Sends an End Of Interrupt (EOI) signal to the LAPIC.
    /// # Safety
    /// The caller must ensure that the LAPIC has been properly initialized.
    /// The caller must also ensure that this is called in response to an interrupt.
    pub unsafe fn eoi(&self) {
        unsafe {
            self.write_offset::<u32>(LAPIC_EOI_OFFSET, 0);
        }
    }

    /// Reads the Spurious Interrupt Vector Register (SVR).
    pub fn read_svr(&self) -> SpuriousInterruptVector {
        SpuriousInterruptVector::from_u32(unsafe {
            self.read_offset::<u32>(SpuriousInterruptVector::REGISTER)
        })
    }

    /// Writes to the Spurious Interrupt Vector Register (SVR).
    ///
    /// # Safety
    /// The caller must also ensure that the value being written is valid.
    pub unsafe fn write_svr(&self, svr: SpuriousInterruptVector) {
        unsafe {
            self.write_offset::<u32>(SpuriousInterruptVector::REGISTER, svr.to_u32());
        }
    }

    /// Software-enables the LAPIC, routing spurious interrupts to `spurious`, in the flat logical
    /// destination model and accepting every interrupt priority.
    ///
    /// # Safety
    /// The caller must ensure that the current IDT handles `spurious`.
    pub unsafe fn enable(&self, spurious: u8) {
        unsafe {
            self.write_offset::<u32>(LAPIC_DFR_OFFSET, 0xFFFF_FFFF);
            self.write_offset::<u32>(LAPIC_TPR_OFFSET, 0);
            let svr = self.read_svr().with_vector(spurious).with_apic_enable(true);
            self.write_svr(svr);
        }
    }

    /// Reads the Interrupt Command Register (ICR).
    pub fn read_icr(&self) -> InterruptCommandRegister {
        unsafe {
            let low = self.read_offset::<u32>(InterruptCommandRegister::REGISTER);
            let high = self.read_offset::<u32>(InterruptCommandRegister::REGISTER + 0x10);
            InterruptCommandRegister::from_u64(u64::from(high) << 32 | u64::from(low))
        }
    }

    /// Writes to the Interrupt Command Register (ICR). The low half is written last, which sends the
    /// interrupt.
    ///
    /// # Safety
    /// The caller must ensure that the given ICR value is valid.
    /// The caller must also ensure that the deliver status is not modified.
    pub unsafe fn write_icr(&self, icr: InterruptCommandRegister) {
        let icr: u64 = icr.to_u64();
        trace!("Writing ICR: {:#016x}", icr);
        let low: u32 = (icr & 0xFFFF_FFFF) as u32;
        let high: u32 = (icr >> 32) as u32;
        unsafe {
            self.write_offset::<u32>(InterruptCommandRegister::REGISTER + 0x10, high);
            self.write_offset::<u32>(InterruptCommandRegister::REGISTER, low);
        }
    }

    /// Spins until the previous interrupt has been accepted.
    pub fn wait_for_delivery(&self) {
        while self.read_icr().delivery_status() {
            hint::spin_loop();
        }
    }
}

impl Default for Lapic {
    fn default() -> Self {
        Self::new()
    }
}

/// SAFETY: The LAPIC is safe to access from multiple threads, as long as the caller ensures that
/// the LAPIC has been properly initialized before use.
unsafe impl Sync for Lapic {}
unsafe impl Send for Lapic {}

mod _macro {
    /// Defines a constant identifier for a given type.
    macro_rules! id {
        ($typ: ident, $name: ident, $value: expr) => {
            impl $typ {
                /// The register offset for this type.
                pub const $name: usize = $value;
            }
        };
    }

    pub(crate) use id;
}

pub(crate) use _macro::id;
