use crate::CoreId;

/// Errors reported by the SMP subsystem to its callers.
///
/// Bring-up contract violations are not represented here. They panic, and the kernel's
/// `panic = "abort"` profile turns that into a system halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SmpError {
    /// The requested core does not exist in this context.
    #[error("No such core {core} (configured cores: {count})")]
    UnknownCore {
        /// The requested core.
        core: CoreId,
        /// The number of configured cores, BSP included.
        count: usize,
    },
    /// The requested core is the bootstrap processor, which does not take task interrupts.
    #[error("Core {0} is not an application processor")]
    NotApplicationCore(CoreId),
    /// Growing a pending list failed to allocate.
    #[error("Out of memory while enqueueing a task")]
    OutOfMemory,
    /// The bring-up configuration was rejected.
    #[error("Invalid SMP configuration: {0}")]
    InvalidConfig(&'static str),
    /// A context has already been installed for this kernel.
    #[error("The SMP context is already installed")]
    AlreadyInstalled,
}
