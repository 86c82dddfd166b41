use crate::{
    ccl::{BidirectionalMode, Topology},
    helpe::*,
};

/// One device's place on a line or ring of devices.
///
/// Direction `0` is "clockwise": data flows from [`sender`](Self::sender)
/// into this chip and on to [`receiver`](Self::receiver). Direction `1`
/// is the opposite flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingTopology {
    pub topology:   Topology,
    pub ring_size:  u32,
    pub ring_index: u32,
    pub num_links:  u32,
    /// The upstream neighbour. `None` for the head of a linear chain.
    pub sender:     Option<ChipId>,
    /// The downstream neighbour. `None` for the tail of a linear chain.
    pub receiver:   Option<ChipId>,
}

impl RingTopology {
    /// Panics if `ring_index` is not a position on `line`.
    pub fn new<D: Device>(
        line:       &[&D],
        ring_index: usize,
        topology:   Topology,
        num_links:  u32,
    ) -> Self {
        assert!(
            ring_index < line.len(),
            "Ring index {ring_index} outside a line of {} devices", line.len()
        );
        let size = line.len();
        let (sender, receiver) = if size == 1 {
            (None, None)
        } else {
            match topology {
                Topology::Linear    => (
                    ring_index.checked_sub(1).map(|i| line[i].id()),
                    line.get(ring_index + 1).map(|d| d.id()),
                ),
                Topology::Ring      => (
                    Some(line[(ring_index + size - 1) % size].id()),
                    Some(line[(ring_index + 1) % size].id()),
                ),
            }
        };

        Self {
            topology,
            ring_size:  size as u32,
            ring_index: ring_index as u32,
            num_links,
            sender,
            receiver,
        }
    }

    #[inline(always)]
    pub fn is_linear(&self) -> bool {
        self.topology == Topology::Linear
    }

    /// On a linear chain, the chip that only ever sends in `direction`.
    pub fn is_first_in_chain(&self, direction: u32) -> bool {
        debug_assert!(direction < 2, "Only two directions exist");
        self.is_linear() &&
        if direction == 0 { self.ring_index == 0 } else { self.ring_index == self.ring_size - 1 }
    }

    /// On a linear chain, the chip that only ever receives in `direction`.
    pub fn is_last_in_chain(&self, direction: u32) -> bool {
        debug_assert!(direction < 2, "Only two directions exist");
        self.is_linear() &&
        if direction == 0 { self.ring_index == self.ring_size - 1 } else { self.ring_index == 0 }
    }

    /// Number of chunks each sender worker pushes in `direction`.
    pub fn sender_num_transfers(&self, direction: u32, mode: BidirectionalMode) -> u32 {
        assert!(direction < 2, "Only two directions exist");
        let hops = self.ring_size - 1;
        match self.topology {
            Topology::Linear    => {
                if direction == 0 { self.ring_index + 1 } else { self.ring_size - self.ring_index }
            },
            Topology::Ring      => match mode {
                BidirectionalMode::SplitTensor  => hops,
                // The clockwise half gets the odd hop.
                BidirectionalMode::FullTensor   => {
                    if direction == 0 { hops.div_ceil(2) } else { hops / 2 }
                },
            },
        }
    }

    /// Number of chunks each receiver worker drains in `direction`.
    pub fn receiver_num_transfers(&self, direction: u32, mode: BidirectionalMode) -> u32 {
        match self.topology {
            Topology::Linear    => self.sender_num_transfers(direction, mode) - 1,
            Topology::Ring      => self.sender_num_transfers(direction, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: ChipId) -> Vec<Chip> {
        (0..n).map(|id| Chip::new(100 + id, Arch::WormholeB0)).collect()
    }

    #[test]
    fn linear_ends_lack_a_neighbour() {
        let chips = line(4);
        let refs: Vec<&Chip> = chips.iter().collect();
        let head = RingTopology::new(&refs, 0, Topology::Linear, 1);
        assert_eq!((head.sender, head.receiver), (None, Some(101)));
        assert!(head.is_first_in_chain(0));
        assert!(head.is_last_in_chain(1));
        let mid = RingTopology::new(&refs, 2, Topology::Linear, 1);
        assert_eq!((mid.sender, mid.receiver), (Some(101), Some(103)));
        assert!(!mid.is_first_in_chain(0) && !mid.is_last_in_chain(0));
        let tail = RingTopology::new(&refs, 3, Topology::Linear, 1);
        assert_eq!((tail.sender, tail.receiver), (Some(102), None));
        assert!(tail.is_last_in_chain(0));
    }

    #[test]
    fn ring_wraps() {
        let chips = line(4);
        let refs: Vec<&Chip> = chips.iter().collect();
        let head = RingTopology::new(&refs, 0, Topology::Ring, 2);
        assert_eq!((head.sender, head.receiver), (Some(103), Some(101)));
        assert!(!head.is_first_in_chain(0));
        let tail = RingTopology::new(&refs, 3, Topology::Ring, 2);
        assert_eq!((tail.sender, tail.receiver), (Some(102), Some(100)));
        assert_eq!(tail.num_links, 2);
    }

    #[test]
    fn lonely_device() {
        let chips = line(1);
        let refs: Vec<&Chip> = chips.iter().collect();
        let t = RingTopology::new(&refs, 0, Topology::Ring, 1);
        assert_eq!((t.sender, t.receiver), (None, None));
        assert_eq!(t.sender_num_transfers(0, BidirectionalMode::FullTensor), 0);
        assert_eq!(t.sender_num_transfers(1, BidirectionalMode::FullTensor), 0);
    }

    #[test]
    #[should_panic(expected = "outside a line")]
    fn index_past_the_line_panics() {
        let chips = line(2);
        let refs: Vec<&Chip> = chips.iter().collect();
        RingTopology::new(&refs, 2, Topology::Linear, 1);
    }

    #[test]
    fn linear_transfer_counts() {
        let chips = line(4);
        let refs: Vec<&Chip> = chips.iter().collect();
        let t = RingTopology::new(&refs, 1, Topology::Linear, 1);
        let mode = BidirectionalMode::SplitTensor;
        assert_eq!(t.sender_num_transfers(0, mode), 2);
        assert_eq!(t.sender_num_transfers(1, mode), 3);
        assert_eq!(t.receiver_num_transfers(0, mode), 1);
        assert_eq!(t.receiver_num_transfers(1, mode), 2);
    }

    #[test]
    fn ring_transfer_counts() {
        let chips = line(8);
        let refs: Vec<&Chip> = chips.iter().collect();
        let t = RingTopology::new(&refs, 5, Topology::Ring, 1);
        assert_eq!(t.sender_num_transfers(0, BidirectionalMode::SplitTensor), 7);
        assert_eq!(t.receiver_num_transfers(1, BidirectionalMode::SplitTensor), 7);
        // 7 hops: 4 clockwise, 3 the other way.
        assert_eq!(t.sender_num_transfers(0, BidirectionalMode::FullTensor), 4);
        assert_eq!(t.sender_num_transfers(1, BidirectionalMode::FullTensor), 3);
        assert_eq!(t.receiver_num_transfers(0, BidirectionalMode::FullTensor), 4);

        let chips = line(4);
        let refs: Vec<&Chip> = chips.iter().collect();
        let t = RingTopology::new(&refs, 0, Topology::Ring, 1);
        assert_eq!(t.sender_num_transfers(0, BidirectionalMode::FullTensor), 2);
        assert_eq!(t.sender_num_transfers(1, BidirectionalMode::FullTensor), 1);
    }
}
