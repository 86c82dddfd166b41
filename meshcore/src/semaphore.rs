use crate::helpe::*;

impl Semaphore {
    pub fn new(
        core_range_set: CoreRangeSet,
        id:             u32,
        initial_value:  u32,
        core_type:      CoreType,
    ) -> Self {
        Self {
            core_range_set,
            id,
            initial_value,
            core_type,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn initial_value(&self) -> u32 {
        self.initial_value
    }

    pub fn core_type(&self) -> CoreType {
        self.core_type
    }

    pub fn core_range_set(&self) -> &CoreRangeSet {
        &self.core_range_set
    }

    /// Returns `true` if the program of `logical_core` has to initialize
    /// this semaphore.
    #[inline(always)]
    pub fn initialized_on_logical_core(&self, logical_core: &CoreCoord) -> bool {
        self.core_range_set.contains(logical_core)
    }

    /// L1 address of the counter, identical on every core the semaphore
    /// spans: `SEMAPHORE_BASE + L1_ALIGNMENT * id`.
    ///
    /// Panics if that address does not fit in 32 bits.
    #[inline(always)]
    pub fn address(&self) -> u32 {
        MemMap::default().semaphore_address(self.id)
    }

    /// Same as [`Semaphore::address`], for a chip generation other than
    /// the default one.
    #[inline(always)]
    pub fn address_on(&self, mem_map: &MemMap) -> u32 {
        mem_map.semaphore_address(self.id)
    }

    /// Returns `true` if `self` and `other` would land on the same L1
    /// word of at least one core.
    pub fn collides_with(&self, other: &Self) -> bool {
        self.id == other.id &&
        self.core_type == other.core_type &&
        self.core_range_set.intersects(&other.core_range_set)
    }
}
