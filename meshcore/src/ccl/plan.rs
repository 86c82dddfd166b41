use crate::{
    ccl::{
        lines,
        num_full_send_directions,
        ClusterAxis,
        CollectiveConfig,
        RingTopology,
        Topology,
    },
    table::SemaphoreTable,
    helpe::*,
};

/// The worker cores serving one link in one direction, and the three
/// semaphores they hand chunks over with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSemaphores {
    pub link:               u32,
    pub direction:          u32,
    pub receiver_cores:     CoreRangeSet,
    pub sender_cores:       CoreRangeSet,
    /// Bumped by the Ethernet receiver when data is ready for the
    /// receiver workers.
    pub receiver_worker:    u32,
    /// Bumped by the Ethernet sender when its buffer is free for the
    /// sender writer.
    pub sender_writer:      u32,
    /// Running count of chunks committed by the receiver writer, read by
    /// the sender reader.
    pub sender_reader:      u32,
}

impl LinkSemaphores {
    /// `[receiver_worker, sender_writer, sender_reader]` as L1 addresses.
    pub fn addresses(&self, mem_map: &MemMap) -> [u32; 3] {
        [
            mem_map.semaphore_address(self.receiver_worker),
            mem_map.semaphore_address(self.sender_writer),
            mem_map.semaphore_address(self.sender_reader),
        ]
    }
}

/// Everything one chip's collective program needs from topology and
/// synchronization bookkeeping.
#[derive(Debug, Clone)]
pub struct DevicePlan {
    pub chip:       ChipId,
    pub ring:       RingTopology,
    pub links:      Vec<LinkSemaphores>,
    pub semaphores: SemaphoreTable,
}

/// Picks the receiver and sender worker cores of `link` in `direction`.
///
/// Cores are handed out one at a time, left to right, wrapping to the next
/// row at the grid's width; receivers first, then senders. Each link and
/// direction starts on fresh rows, so no two links ever share a core.
pub fn select_worker_cores(
    config:     &CollectiveConfig,
    link:       u32,
    direction:  u32,
) -> (CoreRangeSet, CoreRangeSet) {
    let width = config.worker_grid_width as usize;
    let rows_per_link = config.rows_per_link() as usize;
    let mut row = link as usize * rows_per_link +
        direction as usize * config.num_links as usize * rows_per_link;
    let mut col = 0;
    let mut next_core = || {
        let core = CoreCoord::new(col, row);
        col += 1;
        if col == width {
            col = 0;
            row += 1;
        }
        CoreRange::single(core)
    };
    let receivers: Vec<CoreRange> = (0..config.buffers_per_link).map(|_| next_core()).collect();
    let senders: Vec<CoreRange> = (0..config.buffers_per_link).map(|_| next_core()).collect();

    (CoreRangeSet::new(receivers), CoreRangeSet::new(senders))
}

fn plan_device<D: Device>(
    line:       &[&D],
    ring_index: usize,
    topology:   Topology,
    config:     &CollectiveConfig,
) -> Result<DevicePlan, PlanError> {
    let chip = line[ring_index];
    let ring = RingTopology::new(line, ring_index, topology, config.num_links);
    let mut semaphores = SemaphoreTable::new(chip.arch().mem_map());
    let mut links = vec![];
    for direction in 0..num_full_send_directions(topology, config.mode) {
        for link in 0..config.num_links {
            let (receiver_cores, sender_cores) = select_worker_cores(config, link, direction);
            let receiver_worker = semaphores.create(receiver_cores.clone(), 0, CoreType::Worker)?;
            let sender_writer = semaphores.create(sender_cores.clone(), 0, CoreType::Worker)?;
            let sender_reader = semaphores.create(sender_cores.clone(), 0, CoreType::Worker)?;
            trace!(
                chip = chip.id(),
                link,
                direction,
                receiver_worker,
                sender_writer,
                sender_reader,
                "Link semaphores allocated"
            );
            links.push(LinkSemaphores {
                link,
                direction,
                receiver_cores,
                sender_cores,
                receiver_worker,
                sender_writer,
                sender_reader,
            });
        }
    }
    debug_assert!(semaphores.validate().is_ok(), "Colliding semaphores planned");

    Ok(DevicePlan {
        chip: chip.id(),
        ring,
        links,
        semaphores,
    })
}

/// Plans every device of one line, in line order. Devices are planned in
/// parallel; each gets its own [SemaphoreTable].
pub fn plan_line<D: Device + Sync>(
    line:       &[&D],
    topology:   Topology,
    config:     &CollectiveConfig,
) -> Result<Vec<DevicePlan>, PlanError> {
    config.validate()?;
    let res: Vec<DevicePlan> = (0..line.len())
        .into_par_iter()
        .map(|idx| plan_device(line, idx, topology, config))
        .collect::<Result<Vec<_>, PlanError>>()?;
    debug!(devices = res.len(), ?topology, "Line planned");

    Ok(res)
}

/// Plans every non-empty line of `view` along `axis`.
pub fn plan_all_gather<D: Device + Sync>(
    view:       &DeviceMeshView<'_, D>,
    axis:       ClusterAxis,
    topology:   Topology,
    config:     &CollectiveConfig,
) -> Result<Vec<Vec<DevicePlan>>, PlanError> {
    lines(view, axis)
        .iter()
        .map(|l| plan_line(l, topology, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::BidirectionalMode;

    fn t3000() -> DeviceMesh<Chip> {
        DeviceMesh::new(2, 4, (0..8).map(|id| Some(Chip::new(id, Arch::WormholeB0))).collect()).unwrap()
    }

    #[test]
    fn worker_cores_follow_the_grid() {
        let cfg = CollectiveConfig::default();
        let (rx, tx) = select_worker_cores(&cfg, 0, 0);
        assert_eq!(rx.cores().collect::<Vec<_>>(), (0..4).map(|x| CoreCoord::new(x, 0)).collect::<Vec<_>>());
        assert_eq!(tx.cores().collect::<Vec<_>>(), (4..8).map(|x| CoreCoord::new(x, 0)).collect::<Vec<_>>());

        let cfg = CollectiveConfig { num_links: 2, ..cfg };
        let (rx, _) = select_worker_cores(&cfg, 1, 0);
        assert!(rx.contains(&CoreCoord::new(0, 1)));
        let (rx, _) = select_worker_cores(&cfg, 0, 1);
        assert!(rx.contains(&CoreCoord::new(0, 2)));
    }

    #[test]
    fn worker_cores_wrap() {
        let cfg = CollectiveConfig { buffers_per_link: 3, worker_grid_width: 4, ..Default::default() };
        let (rx, tx) = select_worker_cores(&cfg, 0, 0);
        assert_eq!(rx.num_cores(), 3);
        assert!(tx.contains(&CoreCoord::new(3, 0)));
        assert!(tx.contains(&CoreCoord::new(0, 1)));
        assert!(tx.contains(&CoreCoord::new(1, 1)));
        assert!(!rx.intersects(&tx));
    }

    #[test]
    fn links_never_share_cores() {
        let cfg = CollectiveConfig { num_links: 3, buffers_per_link: 6, ..Default::default() };
        let sets: Vec<CoreRangeSet> = (0..2)
            .cartesian_product(0..cfg.num_links)
            .flat_map(|(dir, link)| {
                let (rx, tx) = select_worker_cores(&cfg, link, dir);
                [rx, tx]
            })
            .collect();
        for (a, b) in sets.iter().tuple_combinations() {
            assert!(!a.intersects(b));
        }
    }

    #[test]
    fn ring_line_plan() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let row = view.get_devices_on_row(1);
        let plans = plan_line(&row, Topology::Ring, &CollectiveConfig::default()).unwrap();
        assert_eq!(plans.iter().map(|p| p.chip).collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        for (idx, p) in plans.iter().enumerate() {
            assert_eq!(p.ring.ring_index as usize, idx);
            assert_eq!(p.links.len(), 1);
            let l = &p.links[0];
            // Receivers and senders are disjoint, so both start at slot 0.
            assert_eq!((l.receiver_worker, l.sender_writer, l.sender_reader), (0, 0, 1));
            assert_eq!(p.semaphores.len(), 3);
            assert!(p.semaphores.validate().is_ok());
        }
        assert_eq!(plans[0].ring.sender, Some(7));
    }

    #[test]
    fn linear_plans_both_directions() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let cfg = CollectiveConfig { num_links: 2, ..Default::default() };
        let plans = plan_all_gather(&view, ClusterAxis::Columns, Topology::Linear, &cfg).unwrap();
        assert_eq!(plans.len(), 4);
        for line in &plans {
            assert_eq!(line.len(), 2);
            for p in line {
                assert_eq!(p.links.len(), 4);
                assert_eq!(p.semaphores.len(), 12);
            }
        }
        assert_eq!(plans[2][0].ring.receiver, Some(6));
        assert_eq!(plans[2][1].ring.receiver, None);
    }

    #[test]
    fn full_tensor_ring_uses_two_directions() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let cfg = CollectiveConfig { mode: BidirectionalMode::FullTensor, ..Default::default() };
        let plans = plan_all_gather(&view, ClusterAxis::Rows, Topology::Ring, &cfg).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans.iter().flatten().all(|p| p.links.len() == 2));
    }

    #[test]
    fn addresses_follow_ids() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let row = view.get_devices_on_row(0);
        let plans = plan_line(&row, Topology::Ring, &CollectiveConfig::default()).unwrap();
        let map = Arch::WormholeB0.mem_map();
        assert_eq!(
            plans[0].links[0].addresses(&map),
            [SEMAPHORE_BASE, SEMAPHORE_BASE, SEMAPHORE_BASE + L1_ALIGNMENT]
        );
    }

    #[test]
    fn bad_config_is_reported() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let cfg = CollectiveConfig { num_links: 0, ..Default::default() };
        assert!(matches!(
            plan_line(view.get_devices(), Topology::Ring, &cfg),
            Err(PlanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn wide_links_spill_over_rows() {
        let mesh = t3000();
        let view = mesh.view().unwrap();
        let cfg = CollectiveConfig { buffers_per_link: 16, ..Default::default() };
        let plans = plan_line(view.get_devices(), Topology::Linear, &cfg).unwrap();
        assert!(plans.iter().all(|p| p.semaphores.validate().is_ok()));
    }
}
