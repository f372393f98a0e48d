// Two-way min-cut hypergraph partitioning using the Fiduccia-Mattheyses heuristic:
// https://doi.org/10.1109/DAC.1982.1585498

mod bucket;
mod fm;
mod partition_util;

pub use crate::fm::{FmPartitioningConfig, PartitionSummary};
pub use crate::partition_util::InitialPartitioningMethod;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid balance factor {0:?}, expected a decimal in [0, 1]")]
    InvalidBalanceFactor(String),
    #[error("malformed netlist: {0}")]
    MalformedInput(String),
    #[error("inconsistent netlist: {0}")]
    InputInconsistent(String),
    #[error("balance factor {balance_factor} is infeasible for {cell_count} cells")]
    BalanceInfeasible {
        balance_factor: f64,
        cell_count: usize,
    },
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub name: String,
    pub part: usize,
    pub gain: i32,
    pub locked: bool,
    /// Incident net ids, one entry per pin.
    pub nets: Vec<u32>,
}

impl Cell {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            part: 0,
            gain: 0,
            locked: false,
            nets: Vec::new(),
        }
    }

    pub fn pin_count(&self) -> usize {
        self.nets.len()
    }
}

#[derive(Clone, Debug)]
pub struct Net {
    pub name: String,
    /// Incident cell ids, one entry per pin.
    pub cells: Vec<u32>,
    pub part_count: [u32; 2],
}

#[derive(Clone)]
pub struct Hypergraph {
    pub cells: Vec<Cell>,
    pub nets: Vec<Net>,
    balance_factor: f64,
    pub(crate) part_size: [usize; 2],
    pub(crate) max_pin_count: usize,
    cell_lookup: HashMap<String, u32>,
    net_lookup: HashMap<String, u32>,
}

impl Hypergraph {
    pub fn new(balance_factor: f64) -> Result<Self, PartitionError> {
        if !(0.0..=1.0).contains(&balance_factor) {
            return Err(PartitionError::InvalidBalanceFactor(
                balance_factor.to_string(),
            ));
        }
        Ok(Self {
            cells: Vec::new(),
            nets: Vec::new(),
            balance_factor,
            part_size: [0, 0],
            max_pin_count: 0,
            cell_lookup: HashMap::new(),
            net_lookup: HashMap::new(),
        })
    }

    /// Adds one net record. Cell names seen for the first time create new cells,
    /// with ids assigned in order of first mention.
    ///
    /// A cell name repeated immediately after itself within the record is
    /// ignored; a non-consecutive repeat adds another incidence and inflates
    /// the cell's pin count, exactly like the reference netlist format.
    pub fn add_net(&mut self, name: &str, cell_names: &[&str]) -> Result<(), PartitionError> {
        if self.net_lookup.contains_key(name) {
            return Err(PartitionError::InputInconsistent(format!(
                "net {name} declared twice"
            )));
        }
        let net_id = self.nets.len() as u32;
        self.net_lookup.insert(name.to_string(), net_id);
        self.nets.push(Net {
            name: name.to_string(),
            cells: Vec::new(),
            part_count: [0, 0],
        });

        let mut last: Option<&str> = None;
        for &cell_name in cell_names {
            if last == Some(cell_name) {
                continue;
            }
            let cell_id = match self.cell_lookup.get(cell_name) {
                Some(&id) => id,
                None => {
                    let id = self.cells.len() as u32;
                    self.cell_lookup.insert(cell_name.to_string(), id);
                    self.cells.push(Cell::new(cell_name));
                    id
                }
            };
            self.cells[cell_id as usize].nets.push(net_id);
            self.nets[net_id as usize].cells.push(cell_id);
            last = Some(cell_name);
        }
        Ok(())
    }

    /// Parses the netlist format: a balance factor token followed by
    /// `NET <name> <cell>+ ;` records, all whitespace delimited.
    pub fn parse(text: &str) -> Result<Self, PartitionError> {
        let mut tokens = text.split_whitespace();

        let token = tokens
            .next()
            .ok_or_else(|| PartitionError::MalformedInput("empty netlist".to_string()))?;
        let balance_factor = token
            .parse::<f64>()
            .map_err(|_| PartitionError::InvalidBalanceFactor(token.to_string()))?;
        let mut graph = Self::new(balance_factor)?;

        while let Some(token) = tokens.next() {
            if token != "NET" {
                return Err(PartitionError::MalformedInput(format!(
                    "expected NET record, found {token:?}"
                )));
            }
            let name = tokens.next().ok_or_else(|| {
                PartitionError::MalformedInput("net record missing a name".to_string())
            })?;
            let mut cell_names = Vec::new();
            let mut terminated = false;
            for token in tokens.by_ref() {
                if token == ";" {
                    terminated = true;
                    break;
                }
                cell_names.push(token);
            }
            if !terminated {
                return Err(PartitionError::MalformedInput(format!(
                    "net {name} missing terminating semicolon"
                )));
            }
            graph.add_net(name, &cell_names)?;
        }
        Ok(graph)
    }

    pub fn deserialize_netlist<P: AsRef<Path>>(path: P) -> Result<Self, PartitionError> {
        let mut text = String::new();
        BufReader::new(File::open(path)?).read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn balance_factor(&self) -> f64 {
        self.balance_factor
    }

    pub fn part_sizes(&self) -> [usize; 2] {
        self.part_size
    }

    /// Cut size recomputed from scratch from the current cell assignment.
    pub fn calculate_cut_size(&self) -> usize {
        self.nets
            .iter()
            .filter(|net| {
                let spans_0 = net.cells.iter().any(|&c| self.cells[c as usize].part == 0);
                let spans_1 = net.cells.iter().any(|&c| self.cells[c as usize].part == 1);
                spans_0 && spans_1
            })
            .count()
    }

    /// Cut size read off the maintained net partition counts.
    pub(crate) fn cut_size_from_part_counts(&self) -> usize {
        self.nets
            .iter()
            .filter(|net| net.part_count[0] > 0 && net.part_count[1] > 0)
            .count()
    }

    /// Moves a cell to the other partition, keeping the partition sizes and
    /// every incident net's partition counts in step.
    pub(crate) fn move_cell(&mut self, cell_id: u32) {
        let idx = cell_id as usize;
        let from = self.cells[idx].part;
        let to = 1 - from;
        self.part_size[from] -= 1;
        self.part_size[to] += 1;
        self.cells[idx].part = to;
        for k in 0..self.cells[idx].nets.len() {
            let net_id = self.cells[idx].nets[k] as usize;
            self.nets[net_id].part_count[from] -= 1;
            self.nets[net_id].part_count[to] += 1;
        }
        debug_assert_eq!(self.part_size[0] + self.part_size[1], self.cells.len());
    }

    /// A move out of the cell's partition is legal iff both partitions stay
    /// strictly inside N(1 +- b)/2 afterwards.
    pub(crate) fn is_balanced_move(&self, cell_id: u32) -> bool {
        let part = self.cells[cell_id as usize].part;
        let n = self.cells.len() as f64;
        let lower = n * (1.0 - self.balance_factor) / 2.0;
        let upper = n * (1.0 + self.balance_factor) / 2.0;
        let new_from = (self.part_size[part] - 1) as f64;
        let new_to = (self.part_size[1 - part] + 1) as f64;
        new_from > lower && new_to < upper
    }

    /// Writes the result file: cut size, then the cells of each partition.
    pub fn write_result<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "Cutsize = {}", self.calculate_cut_size())?;
        for part in 0..2 {
            writeln!(writer, "G{} {}", part + 1, self.part_size[part])?;
            for cell in &self.cells {
                if cell.part == part {
                    write!(writer, "{} ", cell.name)?;
                }
            }
            writeln!(writer, ";")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_netlist() {
        let graph = Hypergraph::parse("0.5 NET N1 A B ; NET N2 B C D ;").unwrap();
        assert_eq!(graph.balance_factor(), 0.5);
        assert_eq!(graph.cells.len(), 4);
        assert_eq!(graph.nets.len(), 2);
        assert_eq!(graph.cells[0].name, "A");
        assert_eq!(graph.cells[1].name, "B");
        assert_eq!(graph.cells[1].pin_count(), 2);
        assert_eq!(graph.nets[0].cells, vec![0, 1]);
        assert_eq!(graph.nets[1].cells, vec![1, 2, 3]);
    }

    #[test]
    fn parse_ignores_consecutive_duplicate() {
        let graph = Hypergraph::parse("0.5 NET N1 a a b ;").unwrap();
        assert_eq!(graph.cells.len(), 2);
        assert_eq!(graph.cells[0].pin_count(), 1);
        assert_eq!(graph.nets[0].cells, vec![0, 1]);
    }

    #[test]
    fn parse_keeps_non_consecutive_duplicate() {
        // A repeat separated by another cell counts as an extra incidence.
        let graph = Hypergraph::parse("0.5 NET N1 a b a ;").unwrap();
        assert_eq!(graph.cells.len(), 2);
        assert_eq!(graph.cells[0].pin_count(), 2);
        assert_eq!(graph.nets[0].cells, vec![0, 1, 0]);
    }

    #[test]
    fn parse_rejects_bad_balance_factor() {
        assert!(matches!(
            Hypergraph::parse("nope NET N1 a b ;"),
            Err(PartitionError::InvalidBalanceFactor(_))
        ));
        assert!(matches!(
            Hypergraph::parse("1.5 NET N1 a b ;"),
            Err(PartitionError::InvalidBalanceFactor(_))
        ));
    }

    #[test]
    fn parse_rejects_unterminated_record() {
        assert!(matches!(
            Hypergraph::parse("0.5 NET N1 a b"),
            Err(PartitionError::MalformedInput(_))
        ));
    }

    #[test]
    fn parse_rejects_stray_token() {
        assert!(matches!(
            Hypergraph::parse("0.5 WIRE N1 a b ;"),
            Err(PartitionError::MalformedInput(_))
        ));
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert!(matches!(
            Hypergraph::parse("   "),
            Err(PartitionError::MalformedInput(_))
        ));
    }

    #[test]
    fn parse_rejects_duplicate_net_name() {
        assert!(matches!(
            Hypergraph::parse("0.5 NET N1 a b ; NET N1 c d ;"),
            Err(PartitionError::InputInconsistent(_))
        ));
    }

    #[test]
    fn cut_size_counts_spanning_nets() {
        let mut graph = Hypergraph::parse("1.0 NET N1 A B ; NET N2 B C D ;").unwrap();
        graph.cells[0].part = 1;
        graph.cells[1].part = 1;
        graph.part_size = [2, 2];
        // N1 is whole in partition 1, N2 spans both.
        assert_eq!(graph.calculate_cut_size(), 1);
    }

    #[test]
    fn write_result_format() {
        let mut graph = Hypergraph::parse("1.0 NET N1 A B ; NET N2 B C D ;").unwrap();
        graph.cells[0].part = 1;
        graph.cells[1].part = 1;
        graph.part_size = [2, 2];
        let mut out = Vec::new();
        graph.write_result(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Cutsize = 1\nG1 2\nC D ;\nG2 2\nA B ;\n"
        );
    }
}
