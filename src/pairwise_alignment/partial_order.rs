use std::collections::VecDeque;

use anyhow::bail;
use log::debug;

use crate::alignment::{Alignment, Mapping, PairwiseAlignment};
use crate::alphabets::GAP;
use crate::errors::PhyloError;
use crate::pairwise_alignment::matrices::{select_direction, ScoreMatrices};
use crate::pairwise_alignment::{
    AlignmentScoring,
    Direction::{self, GapInX, GapInY, Matc},
    PairwiseAligner, Symbol,
};
use crate::Result;

#[derive(Clone, Debug, PartialEq)]
struct PogNode {
    /// Motifs seen in this column with their counts, in order of appearance.
    column: Vec<(Vec<u8>, usize)>,
    /// Outgoing edges with the number of sequences using them.
    successors: Vec<(usize, usize)>,
    predecessors: Vec<usize>,
}

impl PogNode {
    fn new(motif: &[u8]) -> Self {
        PogNode {
            column: vec![(motif.to_ascii_uppercase(), 1)],
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    fn add_motif(&mut self, motif: &[u8]) {
        let motif = motif.to_ascii_uppercase();
        match self.column.iter_mut().find(|(m, _)| *m == motif) {
            Some((_, count)) => *count += 1,
            None => self.column.push((motif, 1)),
        }
    }

    /// Most frequent motif, the earliest one on ties.
    fn consensus(&self) -> &[u8] {
        let mut best = &self.column[0];
        for entry in &self.column[1..] {
            if entry.1 > best.1 {
                best = entry;
            }
        }
        &best.0
    }
}

/// A directed acyclic graph of alignment columns.
///
/// Every node is a column profile, the motifs aligned there and how often they occur. Edges
/// follow the sequences through the columns and are weighted by the number of sequences that
/// take them. Sequences are aligned against all paths of the graph at once and can then be
/// fused into it.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialOrderGraph {
    nodes: Vec<PogNode>,
    motif_len: usize,
    n_sequences: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Step {
    direction: Direction,
    row: usize,
}

impl Default for Step {
    fn default() -> Self {
        Step {
            direction: Matc,
            row: 0,
        }
    }
}

struct GraphTraceback {
    m: Vec<Vec<Step>>,
    x: Vec<Vec<Step>>,
    y: Vec<Vec<Step>>,
}

impl GraphTraceback {
    fn new(len1: usize, len2: usize) -> GraphTraceback {
        GraphTraceback {
            m: vec![vec![Step::default(); len2]; len1],
            x: vec![vec![Step::default(); len2]; len1],
            y: vec![vec![Step::default(); len2]; len1],
        }
    }
}

impl PartialOrderGraph {
    /// A linear graph with one node per motif of `seq`.
    pub fn from_sequence(seq: &[u8], motif_len: usize) -> Result<Self> {
        if seq.is_empty() {
            bail!(PhyloError::EmptySequence);
        }
        if motif_len == 0 || seq.len() % motif_len != 0 || seq.contains(&GAP) {
            bail!(PhyloError::InvalidInput(format!(
                "Cannot build a graph with motif length {} from {}",
                motif_len,
                String::from_utf8_lossy(seq)
            )));
        }
        let mut graph = PartialOrderGraph {
            nodes: Vec::with_capacity(seq.len() / motif_len),
            motif_len,
            n_sequences: 1,
        };
        for (i, motif) in seq.chunks(motif_len).enumerate() {
            graph.nodes.push(PogNode::new(motif));
            if i > 0 {
                graph.add_edge(i - 1, i);
            }
        }
        Ok(graph)
    }

    /// A graph with one node per alignment column that holds at least one motif.
    pub fn from_alignment(msa: &Alignment) -> Result<Self> {
        if msa.is_empty() || msa.msa_len() == 0 {
            bail!(PhyloError::EmptySequence);
        }
        let alphabet = msa.alphabet();
        let mut graph = PartialOrderGraph {
            nodes: Vec::with_capacity(msa.msa_len()),
            motif_len: alphabet.motif_len(),
            n_sequences: msa.len(),
        };
        let mut column_nodes = Vec::with_capacity(msa.msa_len());
        for column in msa.columns() {
            let mut motifs = column.into_iter().filter(|motif| !alphabet.is_gap(motif));
            let node = motifs.next().map(|first| {
                let mut node = PogNode::new(first);
                motifs.for_each(|motif| node.add_motif(motif));
                graph.nodes.push(node);
                graph.nodes.len() - 1
            });
            column_nodes.push(node);
        }
        for rec in msa.seqs() {
            let mut prev = None;
            for (motif, node) in msa.motifs(rec).zip(&column_nodes) {
                if alphabet.is_gap(motif) {
                    continue;
                }
                if let (Some(prev), Some(node)) = (prev, node) {
                    graph.add_edge(prev, *node);
                }
                prev = *node;
            }
        }
        Ok(graph)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn motif_len(&self) -> usize {
        self.motif_len
    }

    /// Number of sequences fused into the graph.
    pub fn n_sequences(&self) -> usize {
        self.n_sequences
    }

    /// Motifs and their counts at a node.
    pub fn column(&self, node: usize) -> &[(Vec<u8>, usize)] {
        &self.nodes[node].column
    }

    /// Outgoing edges of a node as `(successor, weight)`.
    pub fn successors(&self, node: usize) -> &[(usize, usize)] {
        &self.nodes[node].successors
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if let Some((_, weight)) = self.nodes[from]
            .successors
            .iter_mut()
            .find(|(succ, _)| *succ == to)
        {
            *weight += 1;
        } else {
            self.nodes[from].successors.push((to, 1));
            self.nodes[to].predecessors.push(from);
        }
    }

    /// Nodes ordered so that every edge points forward, ties in index order.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut in_degree = self
            .nodes
            .iter()
            .map(|node| node.predecessors.len())
            .collect::<Vec<_>>();
        let mut queue = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect::<VecDeque<_>>();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &(succ, _) in &self.nodes[node].successors {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    queue.push_back(succ);
                }
            }
        }
        order
    }

    /// Global alignment of `seq` to a source-to-sink path of the graph.
    pub(super) fn align(&self, seq: &[u8], scoring: &AlignmentScoring) -> Result<PairwiseAlignment> {
        if scoring.motif_len() != self.motif_len {
            bail!(PhyloError::InvalidInput(format!(
                "Graph motifs have length {}, the scoring expects {}",
                self.motif_len,
                scoring.motif_len()
            )));
        }
        let y_info = scoring.symbols(seq)?;
        let profiles = self
            .nodes
            .iter()
            .map(|node| {
                let total = node.column.iter().map(|(_, count)| count).sum::<usize>() as f64;
                node.column
                    .iter()
                    .map(|(motif, count)| Ok((scoring.symbol(motif)?, *count as f64 / total)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let order = self.topological_order();
        let mut rank = vec![0; self.nodes.len()];
        for (r, &node) in order.iter().enumerate() {
            rank[node] = r + 1;
        }

        let rows = order.len() + 1;
        let cols = y_info.len() + 1;
        let (open, extend) = (scoring.gap_open(), scoring.gap_extend());
        let mut score = ScoreMatrices::new(rows, cols);
        let mut trace = GraphTraceback::new(rows, cols);
        score.m[0][0] = 0.0;
        for j in 1..cols {
            score.y[0][j] = -(open + (j - 1) as f64 * extend);
            trace.y[0][j].direction = if j == 1 { Matc } else { GapInX };
        }
        for (r, &node) in order.iter().enumerate().map(|(r, node)| (r + 1, node)) {
            let preds = if self.nodes[node].predecessors.is_empty() {
                vec![0]
            } else {
                self.nodes[node]
                    .predecessors
                    .iter()
                    .map(|&p| rank[p])
                    .collect()
            };
            for j in 0..cols {
                if j > 0 {
                    let match_score = profile_score(&profiles[node], &y_info[j - 1], scoring);
                    (score.m[r][j], trace.m[r][j]) = best_predecessor(&preds, |p| {
                        select_direction(
                            score.m[p][j - 1] + match_score,
                            score.x[p][j - 1] + match_score,
                            score.y[p][j - 1] + match_score,
                        )
                    });
                }
                (score.x[r][j], trace.x[r][j]) = best_predecessor(&preds, |p| {
                    select_direction(
                        score.m[p][j] - open,
                        score.x[p][j] - extend,
                        score.y[p][j] - open,
                    )
                });
                if j > 0 {
                    let (value, direction) = select_direction(
                        score.m[r][j - 1] - open,
                        score.x[r][j - 1] - open,
                        score.y[r][j - 1] - extend,
                    );
                    score.y[r][j] = value;
                    trace.y[r][j] = Step { direction, row: r };
                }
            }
        }

        let j = cols - 1;
        let (mut best, mut end) = (f64::NEG_INFINITY, Step::default());
        for (r, &node) in order.iter().enumerate().map(|(r, node)| (r + 1, node)) {
            if !self.nodes[node].successors.is_empty() {
                continue;
            }
            let (value, direction) = select_direction(score.m[r][j], score.x[r][j], score.y[r][j]);
            if value > best {
                (best, end) = (value, Step { direction, row: r });
            }
        }

        let mut map_x = Mapping::with_capacity(rows + cols);
        let mut map_y = Mapping::with_capacity(rows + cols);
        let (mut r, mut j, mut action) = (end.row, j, end.direction);
        while r > 0 || j > 0 {
            let step = match action {
                Matc => {
                    j -= 1;
                    map_x.push(Some(order[r - 1]));
                    map_y.push(Some(j));
                    trace.m[r][j + 1]
                }
                GapInY => {
                    map_x.push(Some(order[r - 1]));
                    map_y.push(None);
                    trace.x[r][j]
                }
                GapInX => {
                    j -= 1;
                    map_x.push(None);
                    map_y.push(Some(j));
                    trace.y[r][j + 1]
                }
            };
            (r, action) = (step.row, step.direction);
        }
        map_x.reverse();
        map_y.reverse();
        Ok(PairwiseAlignment::new(map_x, map_y, best))
    }

    /// Aligns `seq` to the graph and fuses it in: aligned motifs join their column, inserted
    /// motifs become new nodes. Returns the alignment that was used.
    pub fn add_sequence(&mut self, aligner: &PairwiseAligner, seq: &[u8]) -> Result<PairwiseAlignment> {
        let alignment = aligner.align_to_graph(self, seq)?;
        let motifs = seq.chunks(self.motif_len).collect::<Vec<_>>();
        let mut prev = None;
        for (node, pos) in alignment.map_x.iter().zip(&alignment.map_y) {
            let node = match (*node, *pos) {
                (Some(node), Some(pos)) => {
                    self.nodes[node].add_motif(motifs[pos]);
                    node
                }
                (None, Some(pos)) => {
                    self.nodes.push(PogNode::new(motifs[pos]));
                    self.nodes.len() - 1
                }
                _ => continue,
            };
            if let Some(prev) = prev {
                self.add_edge(prev, node);
            }
            prev = Some(node);
        }
        self.n_sequences += 1;
        debug!(
            "Fused sequence {} into the graph, now {} nodes",
            self.n_sequences,
            self.nodes.len()
        );
        Ok(alignment)
    }

    /// Consensus sequence along the path with the largest total edge weight.
    pub fn consensus(&self) -> Vec<u8> {
        let order = self.topological_order();
        let mut weight = vec![0; self.nodes.len()];
        let mut back = vec![None; self.nodes.len()];
        for &node in &order {
            for &(succ, w) in &self.nodes[node].successors {
                if weight[node] + w > weight[succ] {
                    weight[succ] = weight[node] + w;
                    back[succ] = Some(node);
                }
            }
        }
        let mut end = None;
        for &node in &order {
            if end.map_or(true, |e: usize| weight[node] > weight[e]) {
                end = Some(node);
            }
        }
        let mut path = Vec::new();
        while let Some(node) = end {
            path.push(node);
            end = back[node];
        }
        path.iter()
            .rev()
            .flat_map(|&node| self.nodes[node].consensus().iter().copied())
            .collect()
    }
}

fn profile_score(profile: &[(Symbol, f64)], symbol: &Symbol, scoring: &AlignmentScoring) -> f64 {
    profile
        .iter()
        .map(|(node_symbol, weight)| weight * scoring.score(node_symbol, symbol))
        .sum()
}

/// Best state over all predecessor rows, the first row wins ties.
fn best_predecessor(preds: &[usize], select: impl Fn(usize) -> (f64, Direction)) -> (f64, Step) {
    let mut best: Option<(f64, Step)> = None;
    for &row in preds {
        let (value, direction) = select(row);
        if best.map_or(true, |(best_value, _)| value > best_value) {
            best = Some((value, Step { direction, row }));
        }
    }
    best.unwrap_or((f64::NEG_INFINITY, Step::default()))
}
