//! Collective communication topologies on top of mesh views.
//!
//! A collective walks a *line* of devices: one row or one column of a
//! [`DeviceMeshView`]. On a [`Topology::Linear`] the line has two ends; on
//! a [`Topology::Ring`] the last device hands back to the first.

pub mod ring;
pub mod plan;

pub use ring::RingTopology;
pub use plan::{
    DevicePlan,
    LinkSemaphores,
    plan_all_gather,
    plan_line,
    select_worker_cores,
};

use crate::helpe::*;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug)]
pub enum Topology {
    /// An open chain: the ends have a single neighbour.
    Linear,
    /// A closed chain: every device has two neighbours.
    Ring,
}

/// How a ring collective splits work between its two directions.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Default)]
pub enum BidirectionalMode {
    /// Each direction carries half of every tensor, all the way around.
    #[default]
    SplitTensor,
    /// Each direction carries whole tensors, half of the way around.
    FullTensor,
}

/// Which lines of a view a collective runs along.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug)]
pub enum ClusterAxis {
    /// One line per row: devices vary by column.
    Rows,
    /// One line per column: devices vary by row.
    Columns,
}

/// Knobs of a collective's per-device programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectiveConfig {
    /// Ethernet links used between two neighbouring chips.
    pub num_links:          u32,
    /// Ethernet data-mover buffers per link; each gets a receiver and a
    /// sender worker core.
    pub buffers_per_link:   u32,
    pub mode:               BidirectionalMode,
    /// Width of the worker grid that worker cores are laid out on.
    pub worker_grid_width:  u32,
}

impl Default for CollectiveConfig {
    fn default() -> Self {
        Self {
            num_links:          1,
            buffers_per_link:   4,
            mode:               BidirectionalMode::default(),
            worker_grid_width:  8,
        }
    }
}

impl CollectiveConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.num_links == 0 {
            return Err(PlanError::InvalidConfig(String::from("at least one link is needed")));
        }
        if self.buffers_per_link == 0 {
            return Err(PlanError::InvalidConfig(String::from("at least one buffer per link is needed")));
        }
        if self.worker_grid_width == 0 {
            return Err(PlanError::InvalidConfig(String::from("worker grid has zero width")));
        }

        Ok(())
    }

    /// Worker grid rows taken by one link in one direction.
    #[inline(always)]
    pub fn rows_per_link(&self) -> u32 {
        (self.buffers_per_link * 2 - 1) / self.worker_grid_width + 1
    }
}

/// Number of directions in which whole tensors travel.
pub fn num_full_send_directions(topology: Topology, mode: BidirectionalMode) -> u32 {
    match (topology, mode) {
        (Topology::Linear, _)                           => 2,
        (Topology::Ring, BidirectionalMode::FullTensor) => 2,
        (Topology::Ring, BidirectionalMode::SplitTensor)=> 1,
    }
}

/// The non-empty lines of `view` along `axis`, in order. Lines left empty
/// by missing chips are skipped.
pub fn lines<'a, D: Device>(view: &DeviceMeshView<'a, D>, axis: ClusterAxis) -> Vec<Vec<&'a D>> {
    let all = match axis {
        ClusterAxis::Rows       => view.get_row_views(),
        ClusterAxis::Columns    => view.get_column_views(),
    };
    let total = all.len();
    let res: Vec<Vec<&'a D>> = all.into_iter()
        .filter(|l| !l.is_empty())
        .collect();
    if res.len() < total {
        debug!(?axis, skipped = total - res.len(), "Empty lines skipped");
    }

    res
}
