// Fiduccia-Mattheyses two-way refinement: repeated passes of locked
// single-cell moves with incremental gain maintenance, rewinding each pass to
// its best prefix.

use crate::bucket::BucketList;
use crate::partition_util::InitialPartitioningMethod;
use crate::{Hypergraph, PartitionError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;

pub struct FmPartitioningConfig {
    /// How the cells are distributed over the two partitions before the first pass.
    pub initial_partitioning: InitialPartitioningMethod,
    /// The seed for the random number generator (only consumed by random initial partitioning).
    pub rng_seed: u64,
    /// How many consecutive passes without a positive accumulated gain are tolerated
    /// before the algorithm stops.
    pub max_unproductive_passes: u32,
}

impl Default for FmPartitioningConfig {
    fn default() -> Self {
        Self {
            initial_partitioning: InitialPartitioningMethod::IdHalf,
            rng_seed: 1234,
            max_unproductive_passes: 5,
        }
    }
}

/// Final output of a partitioning run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionSummary {
    pub cut_size: usize,
    pub cell_count: usize,
    pub net_count: usize,
    pub part_size: [usize; 2],
    pub passes: u32,
}

impl fmt::Display for PartitionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==================== Summary ====================")?;
        writeln!(f, " Cutsize: {}", self.cut_size)?;
        writeln!(f, " Total cell number: {}", self.cell_count)?;
        writeln!(f, " Total net number:  {}", self.net_count)?;
        writeln!(f, " Cell Number of partition A: {}", self.part_size[0])?;
        writeln!(f, " Cell Number of partition B: {}", self.part_size[1])?;
        write!(f, "=================================================")
    }
}

/// Per-pass mutable state: the two gain bucket lists plus the move bookkeeping.
/// Reset at the start of every pass, consumed by the rewind at its end.
struct FmPass {
    buckets: [BucketList; 2],
    acc_gain: i32,
    max_acc_gain: i32,
    move_num: usize,
    best_move_num: usize,
    move_stack: Vec<u32>,
    unlock_num: [usize; 2],
}

impl FmPass {
    fn new(max_pin_count: usize, cell_count: usize) -> Self {
        Self {
            buckets: [
                BucketList::new(max_pin_count, cell_count),
                BucketList::new(max_pin_count, cell_count),
            ],
            acc_gain: 0,
            max_acc_gain: 0,
            move_num: 0,
            best_move_num: 0,
            move_stack: Vec::new(),
            unlock_num: [0, 0],
        }
    }

    /// RESET: zero the move bookkeeping, unlock every cell and recompute every
    /// net's partition counts from its incidence list.
    fn reset(&mut self, graph: &mut Hypergraph) {
        self.acc_gain = 0;
        self.max_acc_gain = 0;
        self.move_num = 0;
        self.best_move_num = 0;
        self.move_stack.clear();
        self.unlock_num = graph.part_size;
        self.buckets[0].clear();
        self.buckets[1].clear();
        for cell in graph.cells.iter_mut() {
            cell.locked = false;
        }
        for net_id in 0..graph.nets.len() {
            graph.nets[net_id].part_count = [0, 0];
            for k in 0..graph.nets[net_id].cells.len() {
                let cell_id = graph.nets[net_id].cells[k] as usize;
                let part = graph.cells[cell_id].part;
                graph.nets[net_id].part_count[part] += 1;
            }
        }
    }

    /// GAIN-INIT, step 1: initial gain of every cell. A net contributes +1 if
    /// the cell is its only pin on the from side and -1 if the to side is empty.
    fn compute_cell_gains(&self, graph: &mut Hypergraph) {
        for cell in graph.cells.iter_mut() {
            cell.gain = 0;
        }
        for cell_id in 0..graph.cells.len() {
            let from = graph.cells[cell_id].part;
            let to = 1 - from;
            for k in 0..graph.cells[cell_id].nets.len() {
                let net = &graph.nets[graph.cells[cell_id].nets[k] as usize];
                if net.part_count[from] == 1 {
                    graph.cells[cell_id].gain += 1;
                }
                if net.part_count[to] == 0 {
                    graph.cells[cell_id].gain -= 1;
                }
            }
        }
    }

    /// GAIN-INIT, step 2: seed both bucket lists from the current gains.
    fn seed_buckets(&mut self, graph: &Hypergraph) {
        for (cell_id, cell) in graph.cells.iter().enumerate() {
            self.buckets[cell.part].append(cell_id as u32, cell.gain);
        }
    }

    /// SELECT/MOVE/UPDATE loop until no unlocked cell remains or none may move.
    fn run_moves(&mut self, graph: &mut Hypergraph) -> Result<(), PartitionError> {
        while self.buckets[0].len() + self.buckets[1].len() > 0 {
            debug_assert_eq!(
                self.unlock_num[0] + self.unlock_num[1],
                self.buckets[0].len() + self.buckets[1].len()
            );
            let cell_id = match self.select(graph)? {
                Some(cell_id) => cell_id,
                None => break,
            };
            self.apply_move(graph, cell_id);
            self.update_gains(graph, cell_id);
        }
        Ok(())
    }

    /// Picks the max-gain cell that may legally move. With candidates on both
    /// sides the balance constraint applies to each; a single candidate moves
    /// unchecked. Ties on gain prefer partition 0.
    fn select(&self, graph: &Hypergraph) -> Result<Option<u32>, PartitionError> {
        match (self.buckets[0].top(), self.buckets[1].top()) {
            (None, None) => Ok(None),
            (Some((cell_id, _)), None) | (None, Some((cell_id, _))) => Ok(Some(cell_id)),
            (Some((cell_0, gain_0)), Some((cell_1, gain_1))) => {
                let legal_0 = graph.is_balanced_move(cell_0);
                let legal_1 = graph.is_balanced_move(cell_1);
                match (legal_0, legal_1) {
                    (false, false) => Err(PartitionError::BalanceInfeasible {
                        balance_factor: graph.balance_factor(),
                        cell_count: graph.cells.len(),
                    }),
                    (true, false) => Ok(Some(cell_0)),
                    (false, true) => Ok(Some(cell_1)),
                    (true, true) => Ok(Some(if gain_0 >= gain_1 { cell_0 } else { cell_1 })),
                }
            }
        }
    }

    /// MOVE: flip the cell's partition, lock it and account its gain. The move
    /// becomes the new best prefix if the accumulated gain at least matches the
    /// best so far, except for the very last possible move of a pass, which
    /// would leave one partition empty.
    fn apply_move(&mut self, graph: &mut Hypergraph, cell_id: u32) {
        let idx = cell_id as usize;
        let from = graph.cells[idx].part;
        let gain = graph.cells[idx].gain;
        self.unlock_num[from] -= 1;
        self.buckets[from].remove(cell_id, gain);
        graph.cells[idx].locked = true;
        graph.move_cell(cell_id);
        self.move_stack.push(cell_id);
        self.move_num += 1;
        self.acc_gain += gain;
        log::trace!(
            "move {}: cell {} (gain {}), acc gain {}",
            self.move_num,
            graph.cells[idx].name,
            gain,
            self.acc_gain
        );
        if self.acc_gain >= self.max_acc_gain && self.move_num != graph.cells.len() {
            self.max_acc_gain = self.acc_gain;
            self.best_move_num = self.move_num;
        }
    }

    /// UPDATE: incremental gain patch for every net of the moved cell. The net
    /// counts already include the move, so the pre-move count on the to side
    /// and the post-move count on the from side are reconstructed from them.
    fn update_gains(&mut self, graph: &mut Hypergraph, moved: u32) {
        let to = graph.cells[moved as usize].part;
        let from = 1 - to;
        for k in 0..graph.cells[moved as usize].nets.len() {
            let net_id = graph.cells[moved as usize].nets[k] as usize;
            let to_count_before = graph.nets[net_id].part_count[to] - 1;
            let from_count_after = graph.nets[net_id].part_count[from];

            if to_count_before == 0 {
                // The net just started spanning the to side: moving any of its
                // cells along became one cut cheaper.
                self.adjust_unlocked(graph, net_id, 1);
            } else if to_count_before == 1 {
                if let Some(cell_id) = Self::sole_unlocked_on_side(graph, net_id, to) {
                    self.adjust_gain(graph, cell_id, -1);
                }
            }

            if from_count_after == 0 {
                self.adjust_unlocked(graph, net_id, -1);
            } else if from_count_after == 1 {
                if let Some(cell_id) = Self::sole_unlocked_on_side(graph, net_id, from) {
                    self.adjust_gain(graph, cell_id, 1);
                }
            }
        }
    }

    fn adjust_unlocked(&mut self, graph: &mut Hypergraph, net_id: usize, delta: i32) {
        for k in 0..graph.nets[net_id].cells.len() {
            let cell_id = graph.nets[net_id].cells[k];
            if graph.cells[cell_id as usize].locked {
                continue;
            }
            self.adjust_gain(graph, cell_id, delta);
        }
    }

    fn sole_unlocked_on_side(graph: &Hypergraph, net_id: usize, part: usize) -> Option<u32> {
        graph.nets[net_id].cells.iter().copied().find(|&cell_id| {
            let cell = &graph.cells[cell_id as usize];
            cell.part == part && !cell.locked
        })
    }

    /// Re-slots a cell at its new gain; the bucket position must always match
    /// the gain tracked on the cell.
    fn adjust_gain(&mut self, graph: &mut Hypergraph, cell_id: u32, delta: i32) {
        let cell = &mut graph.cells[cell_id as usize];
        self.buckets[cell.part].remove(cell_id, cell.gain);
        cell.gain += delta;
        self.buckets[cell.part].append(cell_id, cell.gain);
    }

    /// Rewind: unlock everything and undo moves from the end of the history
    /// down to the best prefix. A no-op when already at the best point.
    fn restore_best(&mut self, graph: &mut Hypergraph) {
        for cell in graph.cells.iter_mut() {
            cell.locked = false;
        }
        while self.move_num != self.best_move_num {
            let cell_id = self
                .move_stack
                .pop()
                .expect("move stack out of sync with move count");
            graph.move_cell(cell_id);
            self.move_num -= 1;
        }
    }
}

impl Hypergraph {
    /// Splits the hypergraph into two partitions while minimizing the net cut,
    /// subject to the balance factor carried by the netlist. Runs FM passes
    /// until several consecutive passes fail to produce a positive gain.
    pub fn partition_fm(
        &mut self,
        config: &FmPartitioningConfig,
    ) -> Result<PartitionSummary, PartitionError> {
        let mut rng = StdRng::seed_from_u64(config.rng_seed);
        self.partition_initial(config.initial_partitioning, &mut rng);
        log::trace!("initial cut size: {}", self.calculate_cut_size());

        let mut pass = FmPass::new(self.max_pin_count, self.cells.len());
        let mut passes = 0;
        let mut unproductive_passes = 0;
        loop {
            pass.reset(self);
            pass.compute_cell_gains(self);
            pass.seed_buckets(self);
            pass.run_moves(self)?;
            pass.restore_best(self);
            passes += 1;
            log::trace!(
                "pass {}: cut size {}, max acc gain {} at move {}",
                passes,
                self.cut_size_from_part_counts(),
                pass.max_acc_gain,
                pass.best_move_num
            );
            if pass.max_acc_gain > 0 {
                unproductive_passes = 0;
            } else {
                unproductive_passes += 1;
            }
            if unproductive_passes >= config.max_unproductive_passes {
                break;
            }
        }

        Ok(PartitionSummary {
            cut_size: self.cut_size_from_part_counts(),
            cell_count: self.cells.len(),
            net_count: self.nets.len(),
            part_size: self.part_size,
            passes,
        })
    }
}
