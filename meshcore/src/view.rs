use crate::helpe::*;

impl<'a, D: Device> DeviceMeshView<'a, D> {
    /// A view over the whole mesh: `top_left = (0, 0)` and
    /// `bottom_right = (rows - 1, cols - 1)`.
    pub fn new(mesh: &'a DeviceMesh<D>) -> Result<Self, TopologyError> {
        let (rows, cols) = mesh.shape();
        if rows == 0 || cols == 0 {
            return Err(TopologyError::EmptyShape { rows, cols });
        }

        Self::from_window(
            mesh,
            Coordinate::new(0, 0),
            Coordinate::new(rows - 1, cols - 1),
        )
    }

    /// A view over the inclusive window `[top_left, bottom_right]` of
    /// `mesh`. The window may stick out of the mesh; slots out there are
    /// treated like any other empty slot.
    pub fn from_window(
        mesh:           &'a DeviceMesh<D>,
        top_left:       Coordinate,
        bottom_right:   Coordinate,
    ) -> Result<Self, TopologyError> {
        if !top_left.precedes(&bottom_right) {
            return Err(TopologyError::InvalidRectangle { top_left, bottom_right });
        }
        let mut res = Self::empty(top_left, bottom_right);
        for (row, col) in (top_left.row..=bottom_right.row)
            .cartesian_product(top_left.col..=bottom_right.col) {
            if let Some(d) = mesh.get_device(row, col) {
                res.record(d, Coordinate::new(row, col))?;
            }
        }
        trace!(%top_left, %bottom_right, devices = res.size(), "Windowed view built");

        Ok(res)
    }

    /// A view over an arbitrary set of devices. `mapper` must place every
    /// one of them; the bounding rectangle is the tightest one enclosing
    /// all returned coordinates.
    ///
    /// An empty device list yields an empty view spanning `(0, 0)` alone.
    pub fn from_devices<F>(devices: Vec<&'a D>, mapper: F) -> Result<Self, TopologyError>
    where F: Fn(ChipId) -> Option<Coordinate> {
        let mut res = Self::empty(Coordinate::default(), Coordinate::default());
        for d in devices {
            let coord = mapper(d.id()).ok_or(TopologyError::UnmappedDevice(d.id()))?;
            res.record(d, coord)?;
        }
        if let Some((top_left, bottom_right)) = Coordinate::bounding_box(res.device_coordinates.values()) {
            res.top_left = top_left;
            res.bottom_right = bottom_right;
        }
        trace!(top_left = %res.top_left, bottom_right = %res.bottom_right, devices = res.size(), "Mapped view built");

        Ok(res)
    }

    fn empty(top_left: Coordinate, bottom_right: Coordinate) -> Self {
        Self {
            devices:            vec![],
            device_coordinates: CoordinateMap::default(),
            top_left,
            bottom_right,
        }
    }

    // The one place devices enter a view. Rejects both a device seen
    // twice and two devices fighting over one coordinate.
    fn record(&mut self, d: &'a D, coord: Coordinate) -> Result<(), TopologyError> {
        if self.device_coordinates.contains_key(&d.id()) {
            return Err(TopologyError::DuplicateDevice(d.id()));
        }
        if let Some((&first, _)) = self.device_coordinates
            .iter()
            .find(|(_, c)| **c == coord) {
            return Err(TopologyError::DuplicateCoordinate {
                coord,
                first,
                second: d.id(),
            });
        }
        self.device_coordinates.insert(d.id(), coord);
        self.devices.push(d);

        Ok(())
    }

    /// Returns the device recorded at `(row, col)`, if any.
    ///
    /// This is a scan over the view's devices, which is fine for
    /// cluster-sized views.
    pub fn get_device(&self, row: usize, col: usize) -> Option<&'a D> {
        let target = Coordinate::new(row, col);
        self.devices
            .iter()
            .find(|d| self.device_coordinates.get(&d.id()) == Some(&target))
            .copied()
    }

    pub fn get_devices(&self) -> &[&'a D] {
        &self.devices
    }

    /// Devices within the inclusive rectangle `[start, end]`, row-major.
    ///
    /// Panics if `start` is not above-left of `end`.
    pub fn get_devices_in(&self, start: Coordinate, end: Coordinate) -> Vec<&'a D> {
        assert!(
            start.precedes(&end),
            "Invalid coordinates: start {start} must be less than or equal to end {end}"
        );

        (start.row..=end.row)
            .cartesian_product(start.col..=end.col)
            .filter_map(|(row, col)| self.get_device(row, col))
            .collect()
    }

    /// Shorthand for `get_devices_in((0, 0), (rows - 1, cols - 1))`.
    pub fn get_devices_of_shape(&self, (rows, cols): DeviceGrid) -> Vec<&'a D> {
        assert!(rows > 0 && cols > 0, "Invalid shape {rows}x{cols}");
        self.get_devices_in(Coordinate::new(0, 0), Coordinate::new(rows - 1, cols - 1))
    }

    pub fn get_devices_on_row(&self, row: usize) -> Vec<&'a D> {
        self.filter_by_coordinate(|c| c.row == row)
    }

    pub fn get_devices_on_column(&self, col: usize) -> Vec<&'a D> {
        self.filter_by_coordinate(|c| c.col == col)
    }

    fn filter_by_coordinate<P>(&self, pred: P) -> Vec<&'a D>
    where P: Fn(&Coordinate) -> bool {
        self.devices
            .iter()
            .filter(|d| self.device_coordinates.get(&d.id()).is_some_and(&pred))
            .copied()
            .collect()
    }

    /// One device sequence per row of the bounding rectangle, top to
    /// bottom. Each sequence is a line; close it on itself and it is a ring.
    pub fn get_row_views(&self) -> Vec<Vec<&'a D>> {
        (self.top_left.row..=self.bottom_right.row)
            .map(|row| self.get_devices_on_row(row))
            .collect()
    }

    /// One device sequence per column of the bounding rectangle, left to
    /// right.
    pub fn get_column_views(&self) -> Vec<Vec<&'a D>> {
        (self.top_left.col..=self.bottom_right.col)
            .map(|col| self.get_devices_on_column(col))
            .collect()
    }

    /// Keeps only the devices satisfying `predicate`. Survivors keep the
    /// coordinates they had here; the bounding rectangle shrinks to fit.
    pub fn subview<P>(&self, predicate: P) -> DeviceMeshView<'a, D>
    where P: Fn(&D) -> bool {
        let filtered: Vec<&'a D> = self.devices
            .iter()
            .filter(|d| predicate(d))
            .copied()
            .collect();
        let parent = &self.device_coordinates;

        match Self::from_devices(filtered, |id| parent.get(&id).copied()) {
            Ok(v)   => v,
            // Survivors were all recorded here, once each, at distinct
            // coordinates.
            Err(e)  => unreachable!("Inconsistent parent view: {e}"),
        }
    }

    /// Returns `true` if `coord` lies within the bounding rectangle. There
    /// might still be no device there.
    #[inline(always)]
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.within(&self.top_left, &self.bottom_right)
    }

    pub fn at(&self, coord: &Coordinate) -> Option<&'a D> {
        if self.contains(coord) {
            self.get_device(coord.row, coord.col)
        } else { None }
    }

    /// Where device `id` sits.
    ///
    /// Panics if this view does not track `id`.
    pub fn find_device(&self, id: ChipId) -> Coordinate {
        match self.device_coordinates.get(&id) {
            Some(c) => *c,
            None    => panic!("Device not found in mesh view: {id}"),
        }
    }

    /// Chip id at `coord`, where `coord` is relative to the view's
    /// top-left corner.
    ///
    /// Panics if `coord` falls outside `[0, num_rows) x [0, num_cols)`, or
    /// if no device sits there.
    pub fn find_device_id(&self, coord: &Coordinate) -> ChipId {
        let (rows, cols) = self.shape();
        assert!(
            coord.row < rows && coord.col < cols,
            "Invalid coordinate {coord} for a view of shape {rows}x{cols}"
        );
        let absolute = self.top_left.offset_by(coord);
        match self.get_device(absolute.row, absolute.col) {
            Some(d) => d.id(),
            None    => panic!("No device at {absolute} in mesh view"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn size(&self) -> usize {
        self.devices.len()
    }

    pub fn shape(&self) -> DeviceGrid {
        (self.num_rows(), self.num_cols())
    }

    pub fn num_rows(&self) -> usize {
        self.bottom_right.row - self.top_left.row + 1
    }

    pub fn num_cols(&self) -> usize {
        self.bottom_right.col - self.top_left.col + 1
    }

    pub fn top_left(&self) -> Coordinate {
        self.top_left
    }

    pub fn bottom_right(&self) -> Coordinate {
        self.bottom_right
    }

    pub fn device_coordinates(&self) -> &CoordinateMap {
        &self.device_coordinates
    }
}

impl<D> Clone for DeviceMeshView<'_, D> {
    fn clone(&self) -> Self {
        Self {
            devices:            self.devices.clone(),
            device_coordinates: self.device_coordinates.clone(),
            top_left:           self.top_left,
            bottom_right:       self.bottom_right,
        }
    }
}

impl<D: Device> PartialEq for DeviceMeshView<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        self.devices.len() == other.devices.len() &&
        self.devices
            .iter()
            .zip(other.devices.iter())
            .all(|(a, b)| a.id() == b.id()) &&
        self.device_coordinates == other.device_coordinates &&
        self.top_left == other.top_left &&
        self.bottom_right == other.bottom_right
    }
}

impl<D: Device> Eq for DeviceMeshView<'_, D> {}

impl<D: Device> fmt::Debug for DeviceMeshView<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMeshView")
            .field("top_left", &self.top_left)
            .field("bottom_right", &self.bottom_right)
            .field("devices", &self.device_coordinates)
            .finish()
    }
}
