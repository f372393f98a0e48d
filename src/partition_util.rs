use crate::Hypergraph;
use rand::rngs::StdRng;
use rand::Rng;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InitialPartitioningMethod {
    /// Cells with construction id below the midpoint go to partition B(1),
    /// the rest to partition A(0). Deterministic and reproducible.
    IdHalf,
    /// Cells are ordered by pin count; the half with the fewest pins goes to
    /// partition B(1).
    PinOrder,
    /// Cells are assigned to random partitions.
    Random,
}

impl Hypergraph {
    /// Seeds the two partitions and records the per-partition sizes and the
    /// maximum pin count, which sizes the gain bucket range.
    pub fn partition_initial(&mut self, method: InitialPartitioningMethod, rng: &mut StdRng) {
        match method {
            InitialPartitioningMethod::IdHalf => {
                let half = self.cells.len() / 2;
                for (id, cell) in self.cells.iter_mut().enumerate() {
                    cell.part = if id < half { 1 } else { 0 };
                }
            }
            InitialPartitioningMethod::PinOrder => {
                let mut order: Vec<usize> = (0..self.cells.len()).collect();
                order.sort_by_key(|&id| self.cells[id].nets.len());
                let half = self.cells.len() / 2;
                for (rank, &id) in order.iter().enumerate() {
                    self.cells[id].part = if rank < half { 1 } else { 0 };
                }
            }
            InitialPartitioningMethod::Random => {
                for cell in self.cells.iter_mut() {
                    cell.part = rng.gen_range(0..2);
                }
            }
        }

        self.part_size = [0, 0];
        self.max_pin_count = 0;
        for cell in self.cells.iter() {
            self.part_size[cell.part] += 1;
            self.max_pin_count = self.max_pin_count.max(cell.nets.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn id_half_puts_first_half_in_partition_b() {
        let mut graph = Hypergraph::parse("1.0 NET N1 A B ; NET N2 B C D ;").unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        graph.partition_initial(InitialPartitioningMethod::IdHalf, &mut rng);
        assert_eq!(graph.cells[0].part, 1); // A
        assert_eq!(graph.cells[1].part, 1); // B
        assert_eq!(graph.cells[2].part, 0); // C
        assert_eq!(graph.cells[3].part, 0); // D
        assert_eq!(graph.part_sizes(), [2, 2]);
        assert_eq!(graph.max_pin_count, 2); // B sits on both nets
    }

    #[test]
    fn pin_order_moves_low_pin_cells_to_partition_b() {
        // B has 2 pins, the rest have 1; B must land in partition A(0).
        let mut graph = Hypergraph::parse("1.0 NET N1 A B ; NET N2 B C D ;").unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        graph.partition_initial(InitialPartitioningMethod::PinOrder, &mut rng);
        assert_eq!(graph.cells[1].part, 0);
        assert_eq!(graph.part_sizes(), [2, 2]);
    }

    #[test]
    fn random_is_reproducible_for_a_fixed_seed() {
        let graph = Hypergraph::parse("1.0 NET N1 A B ; NET N2 B C D ;").unwrap();
        let mut first = graph.clone();
        let mut second = graph;
        let mut rng = StdRng::seed_from_u64(42);
        first.partition_initial(InitialPartitioningMethod::Random, &mut rng);
        let mut rng = StdRng::seed_from_u64(42);
        second.partition_initial(InitialPartitioningMethod::Random, &mut rng);
        let parts = |g: &Hypergraph| g.cells.iter().map(|c| c.part).collect::<Vec<_>>();
        assert_eq!(parts(&first), parts(&second));
        assert_eq!(first.part_sizes()[0] + first.part_sizes()[1], 4);
    }
}
