//! Line topology of the metro and the pairwise tables derived from it.
//!
//! The tables are expensive to compute for the full network, so they are built
//! offline by the `metro-tables` binary and loaded as plain matrices at startup.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Deserialize;

use crate::state::directory::PairMatrix;

/// One metro line as an ordered list of stops.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetroLine {
    /// Line name, e.g. `2号线`.
    pub line: String,
    /// Stops in travel order.
    pub stations: Vec<String>,
    /// The last stop connects back to the first one.
    #[serde(default)]
    pub circular: bool,
}

/// Station adjacency and line membership of the whole network.
#[derive(Debug, Clone, Default)]
pub struct MetroNetwork {
    names: Vec<String>,
    index: HashMap<String, usize>,
    neighbours: Vec<BTreeSet<usize>>,
    lines_of: Vec<BTreeSet<usize>>,
    line_neighbours: Vec<BTreeSet<usize>>,
}

impl MetroNetwork {
    /// Build the network graph from its lines.
    pub fn new(lines: &[MetroLine]) -> Self {
        let mut network = Self {
            line_neighbours: vec![BTreeSet::new(); lines.len()],
            ..Self::default()
        };

        for (line_index, line) in lines.iter().enumerate() {
            let stops: Vec<usize> = line
                .stations
                .iter()
                .map(|name| network.intern(name))
                .collect();
            for &stop in &stops {
                network.lines_of[stop].insert(line_index);
            }
            for pair in stops.windows(2) {
                network.link(pair[0], pair[1]);
            }
            if line.circular && stops.len() > 2 {
                network.link(stops[stops.len() - 1], stops[0]);
            }
        }

        // Two lines are one change apart when they share a station.
        for lines in &network.lines_of {
            for &a in lines {
                for &b in lines {
                    if a != b {
                        network.line_neighbours[a].insert(b);
                    }
                }
            }
        }

        network
    }

    /// Station names in first-seen order.
    pub fn stations(&self) -> &[String] {
        &self.names
    }

    /// Fewest stops from `origin` to every reachable station.
    pub fn stops_from(&self, origin: &str) -> HashMap<&str, u32> {
        let Some(&start) = self.index.get(origin) else {
            return HashMap::new();
        };
        breadth_first(start, &self.neighbours)
            .into_iter()
            .enumerate()
            .filter_map(|(node, hops)| hops.map(|hops| (self.names[node].as_str(), hops)))
            .collect()
    }

    /// Fewest line changes between two stations, `None` when unreachable.
    #[cfg(test)]
    fn transfers_between(&self, from: &str, to: &str) -> Option<u32> {
        let from = *self.index.get(from)?;
        let to = *self.index.get(to)?;
        self.line_hops_from(from)
            .into_iter()
            .enumerate()
            .filter(|(line, _)| self.lines_of[to].contains(line))
            .filter_map(|(_, hops)| hops)
            .min()
    }

    /// Full stop and transfer matrices over every station of the network.
    pub fn matrices(&self) -> (PairMatrix, PairMatrix) {
        let mut stops = PairMatrix::with_stations(self.names.iter().cloned());
        let mut transfers = PairMatrix::with_stations(self.names.iter().cloned());

        for (from_index, from) in self.names.iter().enumerate() {
            for (to, hops) in self.stops_from(from) {
                stops.set(from, to, hops);
            }
            let line_hops = self.line_hops_from(from_index);
            for (to_index, to) in self.names.iter().enumerate() {
                let best = self.lines_of[to_index]
                    .iter()
                    .filter_map(|&line| line_hops[line])
                    .min();
                if let Some(best) = best {
                    transfers.set(from, to, best);
                }
            }
        }

        (stops, transfers)
    }

    /// Changes needed to reach each line from the lines serving `station`.
    fn line_hops_from(&self, station: usize) -> Vec<Option<u32>> {
        let mut hops = vec![None; self.line_neighbours.len()];
        let mut queue = VecDeque::new();
        for &line in &self.lines_of[station] {
            hops[line] = Some(0);
            queue.push_back(line);
        }
        walk(&mut queue, &mut hops, &self.line_neighbours);
        hops
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&existing) = self.index.get(name) {
            return existing;
        }
        let position = self.names.len();
        self.names.push(name.to_owned());
        self.index.insert(name.to_owned(), position);
        self.neighbours.push(BTreeSet::new());
        self.lines_of.push(BTreeSet::new());
        position
    }

    fn link(&mut self, a: usize, b: usize) {
        if a != b {
            self.neighbours[a].insert(b);
            self.neighbours[b].insert(a);
        }
    }
}

fn breadth_first(start: usize, edges: &[BTreeSet<usize>]) -> Vec<Option<u32>> {
    let mut hops = vec![None; edges.len()];
    hops[start] = Some(0);
    let mut queue = VecDeque::from([start]);
    walk(&mut queue, &mut hops, edges);
    hops
}

fn walk(queue: &mut VecDeque<usize>, hops: &mut [Option<u32>], edges: &[BTreeSet<usize>]) {
    while let Some(node) = queue.pop_front() {
        let Some(current) = hops[node] else {
            continue;
        };
        for &next in &edges[node] {
            if hops[next].is_none() {
                hops[next] = Some(current + 1);
                queue.push_back(next);
            }
        }
    }
}
