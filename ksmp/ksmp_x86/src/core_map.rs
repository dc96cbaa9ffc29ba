//! Logical core id to local APIC id mapping.
use arrayvec::ArrayVec;
use ksmp::{CoreId, MAX_CORES, SmpError};

/// The local APIC id of every core, indexed by [`CoreId`]. Core `0` is the BSP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMap {
    apic_ids: ArrayVec<u8, MAX_CORES>,
}

impl CoreMap {
    /// Builds a map from APIC ids in core order, the BSP first.
    pub fn new(apic_ids: &[u8]) -> Result<Self, SmpError> {
        if apic_ids.is_empty() {
            return Err(SmpError::InvalidConfig("no cores in APIC map"));
        }
        let mut map = ArrayVec::new();
        map.try_extend_from_slice(apic_ids)
            .map_err(|_| SmpError::InvalidConfig("too many cores in APIC map"))?;
        Ok(Self { apic_ids: map })
    }

    /// The number of mapped cores.
    pub fn len(&self) -> usize {
        self.apic_ids.len()
    }

    /// Always false; a map holds at least the BSP.
    pub fn is_empty(&self) -> bool {
        self.apic_ids.is_empty()
    }

    /// The APIC id of the bootstrap processor.
    pub fn bsp(&self) -> u8 {
        self.apic_ids[0]
    }

    /// The APIC id of `core`.
    pub fn apic_id(&self, core: CoreId) -> Option<u8> {
        self.apic_ids.get(core).copied()
    }

    /// The core with APIC id `apic_id`.
    pub fn core_of(&self, apic_id: u8) -> Option<CoreId> {
        self.apic_ids.iter().position(|&id| id == apic_id)
    }
}
