//! Per-program semaphore bookkeeping.
//!
//! A [`Semaphore`] knows its own address but nothing about its neighbours.
//! The [`SemaphoreTable`] of a device program is where ids get handed out,
//! so that no two semaphores living on a common core ever share one.

use crate::helpe::*;

/// Every semaphore of one device program.
///
/// Allocation takes `&mut self`: whoever builds a program owns its table,
/// so concurrent program builds for the same device must go through
/// separate tables or be serialized by the caller.
#[derive(Debug, Clone, Default)]
pub struct SemaphoreTable {
    mem_map:    MemMap,
    semaphores: Vec<Semaphore>,
}

impl SemaphoreTable {
    pub fn new(mem_map: MemMap) -> Self {
        Self {
            mem_map,
            semaphores: vec![],
        }
    }

    pub fn mem_map(&self) -> &MemMap {
        &self.mem_map
    }

    /// Creates a semaphore on `core_range_set` and returns its id: the
    /// lowest one not already taken on any of those cores.
    pub fn create(
        &mut self,
        core_range_set: CoreRangeSet,
        initial_value:  u32,
        core_type:      CoreType,
    ) -> Result<u32, SemaphoreError> {
        let taken: BTreeSet<u32> = self.semaphores
            .iter()
            .filter(|s| s.core_type() == core_type && s.core_range_set().intersects(&core_range_set))
            .map(Semaphore::id)
            .collect();
        let id = (0..self.mem_map.num_semaphores)
            .find(|id| !taken.contains(id))
            .ok_or(SemaphoreError::Exhausted {
                num_semaphores: self.mem_map.num_semaphores,
                core_type,
            })?;
        trace!(id, ?core_type, cores = core_range_set.num_cores(), "Semaphore created");
        self.semaphores.push(Semaphore::new(core_range_set, id, initial_value, core_type));

        Ok(id)
    }

    /// Registers a semaphore whose id was picked elsewhere.
    pub fn insert(&mut self, semaphore: Semaphore) -> Result<(), SemaphoreError> {
        if semaphore.id() >= self.mem_map.num_semaphores {
            return Err(SemaphoreError::IdOutOfRange {
                id:             semaphore.id(),
                num_semaphores: self.mem_map.num_semaphores,
            });
        }
        if self.semaphores.iter().any(|s| s.collides_with(&semaphore)) {
            return Err(SemaphoreError::Collision {
                id:         semaphore.id(),
                core_type:  semaphore.core_type(),
            });
        }
        self.semaphores.push(semaphore);

        Ok(())
    }

    pub fn semaphores(&self) -> &[Semaphore] {
        &self.semaphores
    }

    pub fn len(&self) -> usize {
        self.semaphores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.semaphores.is_empty()
    }

    /// The semaphore with `id` that `core` has to initialize, if any.
    pub fn get(&self, id: u32, core: &CoreCoord) -> Option<&Semaphore> {
        self.semaphores
            .iter()
            .find(|s| s.id() == id && s.initialized_on_logical_core(core))
    }

    pub fn semaphores_on_core(&self, core: &CoreCoord) -> Vec<&Semaphore> {
        self.semaphores
            .iter()
            .filter(|s| s.initialized_on_logical_core(core))
            .collect()
    }

    /// L1 address of semaphore `id` on this table's chip generation.
    pub fn address_of(&self, id: u32) -> u32 {
        self.mem_map.semaphore_address(id)
    }

    /// Re-checks every pair of semaphores for collisions.
    pub fn validate(&self) -> Result<(), SemaphoreError> {
        if let Some(s) = self.semaphores
            .iter()
            .find(|s| s.id() >= self.mem_map.num_semaphores) {
            return Err(SemaphoreError::IdOutOfRange {
                id:             s.id(),
                num_semaphores: self.mem_map.num_semaphores,
            });
        }
        match self.semaphores
            .iter()
            .tuple_combinations()
            .find(|(a, b)| a.collides_with(b)) {
            Some((a, _))    => Err(SemaphoreError::Collision {
                id:         a.id(),
                core_type:  a.core_type(),
            }),
            None            => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cores(x0: usize, y0: usize, x1: usize, y1: usize) -> CoreRangeSet {
        CoreRange::new(CoreCoord::new(x0, y0), CoreCoord::new(x1, y1)).into()
    }

    #[test]
    fn disjoint_cores_reuse_ids() {
        let mut table = SemaphoreTable::default();
        assert_eq!(table.create(cores(0, 0, 1, 0), 0, CoreType::Worker), Ok(0));
        assert_eq!(table.create(cores(2, 0, 3, 0), 0, CoreType::Worker), Ok(0));
        assert_eq!(table.create(cores(0, 0, 3, 0), 0, CoreType::Worker), Ok(1));
        assert_eq!(table.create(cores(1, 0, 2, 0), 5, CoreType::Worker), Ok(2));
        // Other L1, other id space.
        assert_eq!(table.create(cores(0, 0, 3, 0), 0, CoreType::Ethernet), Ok(0));
        assert_eq!(table.len(), 5);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn lowest_free_id_is_picked() {
        let mut table = SemaphoreTable::default();
        table.insert(Semaphore::new(cores(0, 0, 0, 0), 0, 0, CoreType::Worker)).unwrap();
        table.insert(Semaphore::new(cores(0, 0, 0, 0), 2, 0, CoreType::Worker)).unwrap();
        assert_eq!(table.create(cores(0, 0, 1, 1), 0, CoreType::Worker), Ok(1));
        assert_eq!(table.create(cores(0, 0, 1, 1), 0, CoreType::Worker), Ok(3));
    }

    #[test]
    fn slots_run_out() {
        let mut table = SemaphoreTable::new(Arch::WormholeB0.mem_map());
        for expected in 0..NUM_SEMAPHORES {
            assert_eq!(table.create(cores(0, 0, 0, 0), 0, CoreType::Worker), Ok(expected));
        }
        assert_eq!(
            table.create(cores(0, 0, 0, 0), 0, CoreType::Worker),
            Err(SemaphoreError::Exhausted { num_semaphores: NUM_SEMAPHORES, core_type: CoreType::Worker })
        );
        // A core nobody touched still has every slot.
        assert_eq!(table.create(cores(1, 0, 1, 0), 0, CoreType::Worker), Ok(0));
    }

    #[test]
    fn insert_guards_collisions() {
        let mut table = SemaphoreTable::default();
        table.insert(Semaphore::new(cores(0, 0, 2, 2), 1, 0, CoreType::Worker)).unwrap();
        assert_eq!(
            table.insert(Semaphore::new(cores(2, 2, 3, 3), 1, 0, CoreType::Worker)),
            Err(SemaphoreError::Collision { id: 1, core_type: CoreType::Worker })
        );
        assert_eq!(
            table.insert(Semaphore::new(cores(0, 0, 0, 0), NUM_SEMAPHORES, 0, CoreType::Worker)),
            Err(SemaphoreError::IdOutOfRange { id: NUM_SEMAPHORES, num_semaphores: NUM_SEMAPHORES })
        );
        assert!(table.insert(Semaphore::new(cores(3, 3, 3, 3), 1, 0, CoreType::Worker)).is_ok());
    }

    #[test]
    fn per_core_queries() {
        let mut table = SemaphoreTable::default();
        let a = table.create(cores(0, 0, 1, 1), 7, CoreType::Worker).unwrap();
        let b = table.create(cores(1, 1, 2, 2), 0, CoreType::Worker).unwrap();
        let shared = CoreCoord::new(1, 1);
        assert_eq!(table.semaphores_on_core(&shared).len(), 2);
        assert_eq!(table.semaphores_on_core(&CoreCoord::new(2, 2)).len(), 1);
        assert_eq!(table.get(a, &shared).map(Semaphore::initial_value), Some(7));
        assert!(table.get(b, &CoreCoord::new(0, 0)).is_none());
        assert_ne!(table.address_of(a), table.address_of(b));
        assert_eq!(table.address_of(a), table.semaphores()[0].address());
    }
}
