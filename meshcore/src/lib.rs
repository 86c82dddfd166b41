//! Welcome to `meshcore`!
//!
//! Two things live here: the bookkeeping of *where* each accelerator chip
//! sits in a 2-D cluster, and the addressing of the semaphores that the
//! cores of one chip use to hand data to each other during a collective.
//! Both are pure, in-memory computations; nothing in this crate talks to
//! hardware.

mod coord;
mod mesh;
mod view;
mod semaphore;

pub mod cores;
pub mod hal;
pub mod table;
pub mod ccl;
pub mod helpe;

pub use crate::helpe::*;

/// A logical `(row, col)` position inside a mesh or a view.
///
/// Coordinates have no total order of their own. Given a fixed number of
/// columns they can be linearized as `row * num_cols + col`, see
/// [`Coordinate::linear_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coordinate {
    pub row:    usize,
    pub col:    usize,
}

/// The single source of truth for "which chip occupies which slot".
///
/// A [`DeviceMesh`] owns its devices. Its shape never changes after
/// construction and some slots may be empty: a chip that failed or was
/// never provisioned is simply absent, for as long as the mesh lives.
///
/// > ***ATTENTION:*** Absence is not an error. [`DeviceMesh::get_device`]
/// > returns `None` both for empty slots and for coordinates that fall
/// > outside the mesh, and callers are expected to handle both.
pub struct DeviceMesh<D> {
    rows:   usize,
    cols:   usize,
    // Row-major, `rows * cols` long.
    slots:  Vec<Option<D>>,
}

/// A read-only projection over a [`DeviceMesh`], a window of it, or any
/// explicit set of devices paired with a coordinate mapper.
///
/// Views borrow their devices, so the borrow checker guarantees that a
/// view never outlives the mesh it was carved from. Deriving a sub-view
/// (by window, row, column or predicate) always yields a new value; a
/// view is never mutated after construction.
///
/// Views are compared structurally: two views are equal iff they list
/// the same devices in the same order, map them to the same coordinates
/// and span the same bounding rectangle.
pub struct DeviceMeshView<'a, D> {
    devices:            Vec<&'a D>,
    device_coordinates: CoordinateMap,
    top_left:           Coordinate,
    bottom_right:       Coordinate,
}

/// One hardware semaphore, replicated identically on every core of
/// [`core_range_set`](Semaphore::core_range_set) of a single chip.
///
/// A [`Semaphore`] is a plain value: cloning it yields an independent copy
/// and there is no shared state behind it. The counter itself lives in
/// device L1, at [`address`](Semaphore::address), which is a pure function
/// of the id.
///
/// > ***ATTENTION:*** The id is the unit of allocation. Two semaphores
/// > with overlapping core ranges must never share an id, but this type
/// > does not check that. See [`table::SemaphoreTable`] for the allocator
/// > that does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Semaphore {
    core_range_set: CoreRangeSet,
    id:             u32,
    initial_value:  u32,
    core_type:      CoreType,
}
