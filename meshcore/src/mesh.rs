use crate::helpe::*;

impl<D: Device> DeviceMesh<D> {
    /// Builds a mesh from its row-major slots.
    ///
    /// Fails if the number of slots doesn't match the shape, or if two
    /// devices share a chip id.
    pub fn new(rows: usize, cols: usize, slots: Vec<Option<D>>) -> Result<Self, TopologyError> {
        if slots.len() != Self::num_slots(rows, cols)? {
            return Err(TopologyError::ShapeMismatch {
                rows,
                cols,
                slots: slots.len(),
            });
        }
        let mut seen: HashSet<ChipId> = HashSet::new();
        for d in slots.iter().flatten() {
            if !seen.insert(d.id()) {
                return Err(TopologyError::DuplicateDevice(d.id()));
            }
        }
        debug!(rows, cols, devices = seen.len(), "Device mesh built");

        Ok(Self {
            rows,
            cols,
            slots,
        })
    }

    /// Builds a mesh from `(coordinate, device)` pairs. Slots nobody
    /// claims stay empty.
    pub fn from_placements(
        rows:       usize,
        cols:       usize,
        placements: Vec<(Coordinate, D)>,
    ) -> Result<Self, TopologyError> {
        let num_slots = Self::num_slots(rows, cols)?;
        let mut slots: Vec<Option<D>> = vec![];
        slots.try_reserve_exact(num_slots)
            .map_err(|_| TopologyError::ShapeOverflow { rows, cols })?;
        slots.resize_with(num_slots, || None);
        for (coord, d) in placements {
            if coord.row >= rows || coord.col >= cols {
                return Err(TopologyError::OutOfMesh { coord, rows, cols });
            }
            let slot = &mut slots[coord.linear_index(cols)];
            if let Some(first) = slot {
                return Err(TopologyError::DuplicateCoordinate {
                    coord,
                    first:  first.id(),
                    second: d.id(),
                });
            }
            *slot = Some(d);
        }

        Self::new(rows, cols, slots)
    }

    fn num_slots(rows: usize, cols: usize) -> Result<usize, TopologyError> {
        rows.checked_mul(cols).ok_or(TopologyError::ShapeOverflow { rows, cols })
    }

    #[inline(always)]
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> DeviceGrid {
        (self.rows, self.cols)
    }

    /// Number of populated slots.
    pub fn num_devices(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.num_devices() == 0
    }

    /// Returns the device at `(row, col)`, or `None` if the slot is empty
    /// or lies outside the mesh.
    #[inline(always)]
    pub fn get_device(&self, row: usize, col: usize) -> Option<&D> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slots[Coordinate::new(row, col).linear_index(self.cols)].as_ref()
    }

    /// Every device, in row-major order.
    pub fn get_devices(&self) -> Vec<&D> {
        self.slots.iter().flatten().collect()
    }

    pub fn get_device_ids(&self) -> Vec<ChipId> {
        self.slots.iter().flatten().map(|d| d.id()).collect()
    }

    pub fn get_device_by_id(&self, id: ChipId) -> Option<&D> {
        self.slots.iter().flatten().find(|d| d.id() == id)
    }

    /// Where the device `id` sits, if the mesh has it.
    pub fn coordinate_of(&self, id: ChipId) -> Option<Coordinate> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|d| d.id() == id))
            .map(|idx| Coordinate::from_linear_index(idx, self.cols))
    }

    /// Shorthand for [`DeviceMeshView::new`].
    pub fn view(&self) -> Result<DeviceMeshView<'_, D>, TopologyError> {
        DeviceMeshView::new(self)
    }
}
