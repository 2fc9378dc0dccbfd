use crate::alignment::{Mapping, PairwiseAlignment};
use crate::pairwise_alignment::{
    AlignmentScoring,
    Direction::{self, GapInX, GapInY, Matc},
    Symbol,
};

/// Preferred move for every set of optimal states, bit 0 is `m`, bit 1 `x` and bit 2 `y`.
pub(super) const DIRECTION_PICKER: [Direction; 8] = [
    /* 000 */ Matc,
    /* 001 */ Matc,
    /* 010 */ GapInY,
    /* 011 */ Matc,
    /* 100 */ GapInX,
    /* 101 */ Matc,
    /* 110 */ GapInX,
    /* 111 */ Matc,
];

/// Best of the three state scores, ties resolved by `DIRECTION_PICKER`.
pub(super) fn select_direction(sm: f64, sx: f64, sy: f64) -> (f64, Direction) {
    let (mut max_val, mut sel_mat) = (sm, 0b001);
    if sx > max_val {
        (max_val, sel_mat) = (sx, 0b010);
    } else if sx == max_val {
        sel_mat |= 0b010;
    }
    if sy > max_val {
        (max_val, sel_mat) = (sy, 0b100);
    } else if sy == max_val {
        sel_mat |= 0b100;
    }
    (max_val, DIRECTION_PICKER[sel_mat])
}

/// Scores of the best path ending in each state: `m` with both motifs aligned, `x` with a motif
/// of the first sequence against a gap, `y` with a motif of the second sequence against a gap.
pub(super) struct ScoreMatrices {
    pub(super) m: Vec<Vec<f64>>,
    pub(super) x: Vec<Vec<f64>>,
    pub(super) y: Vec<Vec<f64>>,
}

impl ScoreMatrices {
    pub(super) fn new(len1: usize, len2: usize) -> ScoreMatrices {
        ScoreMatrices {
            m: vec![vec![f64::NEG_INFINITY; len2]; len1],
            x: vec![vec![f64::NEG_INFINITY; len2]; len1],
            y: vec![vec![f64::NEG_INFINITY; len2]; len1],
        }
    }
}

/// State each cell of `m`, `x` and `y` was entered from.
pub(super) struct TracebackMatrices {
    pub(super) m: Vec<Vec<Direction>>,
    pub(super) x: Vec<Vec<Direction>>,
    pub(super) y: Vec<Vec<Direction>>,
}

impl TracebackMatrices {
    pub(super) fn new(len1: usize, len2: usize) -> TracebackMatrices {
        TracebackMatrices {
            m: vec![vec![Matc; len2]; len1],
            x: vec![vec![GapInY; len2]; len1],
            y: vec![vec![GapInX; len2]; len1],
        }
    }
}

pub(super) struct AlignmentMatrices<'a> {
    rows: usize,
    cols: usize,
    scoring: &'a AlignmentScoring,
    x_info: &'a [Symbol],
    y_info: &'a [Symbol],
    pub(super) score: ScoreMatrices,
    pub(super) trace: TracebackMatrices,
}

impl<'a> AlignmentMatrices<'a> {
    pub(super) fn new(
        x_info: &'a [Symbol],
        y_info: &'a [Symbol],
        scoring: &'a AlignmentScoring,
    ) -> AlignmentMatrices<'a> {
        let rows = x_info.len() + 1;
        let cols = y_info.len() + 1;
        AlignmentMatrices {
            rows,
            cols,
            scoring,
            x_info,
            y_info,
            score: ScoreMatrices::new(rows, cols),
            trace: TracebackMatrices::new(rows, cols),
        }
    }

    pub(super) fn fill_matrices(&mut self) {
        self.score.m[0][0] = 0.0;
        self.init_x();
        self.init_y();
        for i in 1..self.rows {
            for j in 1..self.cols {
                (self.score.m[i][j], self.trace.m[i][j]) = self.fill_s_m(i - 1, j - 1);
                (self.score.x[i][j], self.trace.x[i][j]) = self.fill_s_x(i - 1, j);
                (self.score.y[i][j], self.trace.y[i][j]) = self.fill_s_y(i, j - 1);
            }
        }
    }

    fn gap_cost(&self, len: usize) -> f64 {
        self.scoring.gap_open + (len - 1) as f64 * self.scoring.gap_extend
    }

    fn init_x(&mut self) {
        for i in 1..self.rows {
            self.score.x[i][0] = -self.gap_cost(i);
            self.trace.x[i][0] = if i == 1 { Matc } else { GapInY };
        }
    }

    fn init_y(&mut self) {
        for j in 1..self.cols {
            self.score.y[0][j] = -self.gap_cost(j);
            self.trace.y[0][j] = if j == 1 { Matc } else { GapInX };
        }
    }

    fn fill_s_m(&self, i: usize, j: usize) -> (f64, Direction) {
        let match_score = self.scoring.score(&self.x_info[i], &self.y_info[j]);
        select_direction(
            self.score.m[i][j] + match_score,
            self.score.x[i][j] + match_score,
            self.score.y[i][j] + match_score,
        )
    }

    fn fill_s_x(&self, i: usize, j: usize) -> (f64, Direction) {
        select_direction(
            self.score.m[i][j] - self.scoring.gap_open,
            self.score.x[i][j] - self.scoring.gap_extend,
            self.score.y[i][j] - self.scoring.gap_open,
        )
    }

    fn fill_s_y(&self, i: usize, j: usize) -> (f64, Direction) {
        select_direction(
            self.score.m[i][j] - self.scoring.gap_open,
            self.score.x[i][j] - self.scoring.gap_open,
            self.score.y[i][j] - self.scoring.gap_extend,
        )
    }

    pub(super) fn traceback(&self) -> PairwiseAlignment {
        let mut i = self.rows - 1;
        let mut j = self.cols - 1;
        let (score, mut action) =
            select_direction(self.score.m[i][j], self.score.x[i][j], self.score.y[i][j]);
        let max_alignment_length = self.rows + self.cols - 2;
        let mut map_x = Mapping::with_capacity(max_alignment_length);
        let mut map_y = Mapping::with_capacity(max_alignment_length);
        while i > 0 || j > 0 {
            match action {
                Matc => {
                    action = self.trace.m[i][j];
                    i -= 1;
                    j -= 1;
                    map_x.push(Some(i));
                    map_y.push(Some(j));
                }
                GapInY => {
                    action = self.trace.x[i][j];
                    i -= 1;
                    map_x.push(Some(i));
                    map_y.push(None);
                }
                GapInX => {
                    action = self.trace.y[i][j];
                    j -= 1;
                    map_x.push(None);
                    map_y.push(Some(j));
                }
            }
        }
        map_x.reverse();
        map_y.reverse();
        PairwiseAlignment::new(map_x, map_y, score)
    }
}
