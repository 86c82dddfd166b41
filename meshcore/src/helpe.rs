pub use std::{
    sync::Arc,
    io::{BufRead, BufReader},
    collections::{HashMap, HashSet, BTreeSet},
    path::PathBuf,
    fmt,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use rayon::prelude::*;
pub use indexmap::IndexMap;
pub use clap::{Parser, ValueEnum};
pub use tracing::{debug, trace, warn};

pub use crate::{Coordinate, DeviceMesh, DeviceMeshView, Semaphore,
    cores::*,
    hal::*,
};

/// Unique identifier of a physical chip. Chip ids are handed out by the
/// cluster-initialization layer; `meshcore` never invents one.
pub type ChipId = u32;

/// A mesh or view shape, as (rows, columns).
pub type DeviceGrid = (usize, usize);

/// The device-to-coordinate map kept by every [DeviceMeshView]. Iteration
/// order is insertion order, which for mesh-born views is row-major.
pub type CoordinateMap = IndexMap<ChipId, Coordinate, ahash::RandomState>;

/// The slice of a physical device that topology bookkeeping cares about.
///
/// Everything else a device can do (command queues, NoC traffic, buffer
/// allocation) lives in the layers above and below us.
pub trait Device {
    fn id(&self) -> ChipId;
    fn arch(&self) -> Arch;
}

impl<T: Device + ?Sized> Device for Arc<T> {
    fn id(&self) -> ChipId {
        (**self).id()
    }

    fn arch(&self) -> Arch {
        (**self).arch()
    }
}

/// The plainest possible [Device]: an id and an architecture tag.
///
/// Used by the mesh description parsers, `meshinfo` and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chip {
    pub id:     ChipId,
    pub arch:   Arch,
}

impl Chip {
    pub fn new(id: ChipId, arch: Arch) -> Self {
        Self { id, arch }
    }
}

impl Device for Chip {
    fn id(&self) -> ChipId {
        self.id
    }

    fn arch(&self) -> Arch {
        self.arch
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Appears while building a [DeviceMesh] or a [DeviceMeshView]. A caller
/// receiving one of these never gets a partially built topology.
pub enum TopologyError {
    #[error("Mesh of shape {rows}x{cols} has no slots")]
    EmptyShape { rows: usize, cols: usize },
    #[error("Mesh of shape {rows}x{cols} needs {} slots, got {slots}", rows * cols)]
    ShapeMismatch { rows: usize, cols: usize, slots: usize },
    #[error("Mesh of shape {rows}x{cols} has more slots than fit in memory")]
    ShapeOverflow { rows: usize, cols: usize },
    #[error("Coordinate {coord} lies outside mesh of shape {rows}x{cols}")]
    OutOfMesh { coord: Coordinate, rows: usize, cols: usize },
    #[error("Invalid coordinates: top_left {top_left} must be less than or equal to bottom_right {bottom_right}")]
    InvalidRectangle { top_left: Coordinate, bottom_right: Coordinate },
    #[error("Failed to map device {0} to a coordinate")]
    UnmappedDevice(ChipId),
    #[error("Devices {first} and {second} both claim coordinate {coord}")]
    DuplicateCoordinate { coord: Coordinate, first: ChipId, second: ChipId },
    #[error("Device {0} appears more than once")]
    DuplicateDevice(ChipId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Appears while handing out semaphore ids on a device.
pub enum SemaphoreError {
    #[error("All {num_semaphores} {core_type:?} semaphore slots are taken on the requested cores")]
    Exhausted { num_semaphores: u32, core_type: CoreType },
    #[error("Semaphore id {id} exceeds the {num_semaphores} available slots")]
    IdOutOfRange { id: u32, num_semaphores: u32 },
    #[error("Semaphore id {id} is already live on overlapping {core_type:?} cores")]
    Collision { id: u32, core_type: CoreType },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Appears while planning a collective over a line of devices.
pub enum PlanError {
    #[error("Bad collective configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Semaphore(#[from] SemaphoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Appears while reading a mesh description.
pub enum ParseError {
    #[error("Line {line}: missing field `{field}`")]
    MissingField { line: usize, field: &'static str },
    #[error("Line {line}: cannot parse `{field}`")]
    BadField { line: usize, field: String },
}

//---START EXTERNAL INTERFACES
// Mesh descriptions come from whoever brought the cluster up. To read a
// new format, implement `MeshGen` for it.

/// Defines the interface for reading mesh descriptions.
pub trait MeshGen<T> {
    /// `arch` is used for every device whose record doesn't name one.
    fn new(path: PathBuf, arch: Arch) -> Self;
    /// Either every placement is successfully returned, or some
    /// arbitrary type that implements [std::error::Error].
    fn read_placements(&self) -> Result<Vec<(Coordinate, Chip)>, Box<dyn std::error::Error>>;
    /// Turns one record into one placed [Chip]. `line` is only used
    /// for error reporting.
    fn gen_single(&self, d: T, line: usize) -> Result<(Coordinate, Chip), ParseError>;
}

/// A CSV with a header line and columns `row,col,chip_id[,arch]`.
pub struct MeshCSVParser {
    pub path:   PathBuf,
    pub arch:   Arch,
}

impl MeshGen<&str> for MeshCSVParser {
    fn new(path: PathBuf, arch: Arch) -> Self {
        Self {
            path,
            arch,
        }
    }

    fn read_placements(&self) -> Result<Vec<(Coordinate, Chip)>, Box<dyn std::error::Error>> {
        let fd = std::fs::File::open(self.path.as_path())?;
        let reader = BufReader::new(fd);
        let mut res = vec![];
        for (idx, line) in reader.lines()
            .enumerate()
            // First line is the header!
            .skip(1) {
            let line = line?;
            if line.trim().is_empty() { continue; }
            // Line numbers are 1-based for humans.
            res.push(self.gen_single(&line, idx + 1)?);
        }

        Ok(res)
    }

    fn gen_single(&self, d: &str, line: usize) -> Result<(Coordinate, Chip), ParseError> {
        let mut fields = d.split(',').map(str::trim);
        let mut next_num = |field: &'static str| -> Result<usize, ParseError> {
            let raw = fields.next()
                .filter(|x| !x.is_empty())
                .ok_or(ParseError::MissingField { line, field })?;
            raw.parse::<usize>()
                .map_err(|_| ParseError::BadField { line, field: raw.to_string() })
        };
        let row = next_num("row")?;
        let col = next_num("col")?;
        let id = next_num("chip_id")?;
        let id = ChipId::try_from(id)
            .map_err(|_| ParseError::BadField { line, field: id.to_string() })?;
        let arch = match fields.next().filter(|x| !x.is_empty()) {
            Some(raw)   => {
                Arch::from_str(raw, true)
                    .map_err(|_| ParseError::BadField { line, field: raw.to_string() })?
            },
            None        => self.arch,
        };

        Ok((Coordinate::new(row, col), Chip::new(id, arch)))
    }
}
//---END EXTERNAL INTERFACES

/// Reads a mesh description and builds a validated [DeviceMesh].
///
/// If `shape` is `None`, the mesh is made just big enough to hold
/// every placement.
pub fn read_mesh<T, B>(
    file_path:  PathBuf,
    arch:       Arch,
    shape:      Option<DeviceGrid>,
) -> Result<DeviceMesh<Chip>, Box<dyn std::error::Error>>
where T: MeshGen<B> {
    let parser = T::new(file_path, arch);
    let placements = parser.read_placements()?;
    let (rows, cols) = match shape {
        Some(s) => s,
        None    => {
            placements.iter()
                .try_fold((0, 0), |(rows, cols): DeviceGrid, (c, _)| {
                    match (c.row.checked_add(1), c.col.checked_add(1)) {
                        (Some(r), Some(k))  => Ok((rows.max(r), cols.max(k))),
                        _                   => Err(TopologyError::ShapeOverflow {
                            rows: c.row,
                            cols: c.col,
                        }),
                    }
                })?
        }
    };
    debug!(rows, cols, devices = placements.len(), "Mesh description read");
    let mesh = DeviceMesh::from_placements(rows, cols, placements)?;

    Ok(mesh)
}
