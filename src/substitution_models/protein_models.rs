use std::ops::Div;

use crate::alphabets::AMINOACIDS;
use crate::evolutionary_models::ProteinModelType;
use crate::substitution_models::{FreqVector, SubstMatrix};

const N: usize = 20;

pub(crate) fn protein_rates(model: ProteinModelType) -> SubstMatrix {
    match model {
        ProteinModelType::Poisson => {
            let mut rates = SubstMatrix::from_element(N, N, 1.0);
            rates.fill_diagonal(0.0);
            rates
        }
        ProteinModelType::WAG => lower_triangle_rates(&WAG_RATES),
        ProteinModelType::LG => lower_triangle_rates(&LG_RATES),
    }
}

/// Published equilibrium frequencies, rescaled to sum to one.
pub(crate) fn protein_freqs(model: ProteinModelType) -> FreqVector {
    let freqs = match model {
        ProteinModelType::Poisson => return FreqVector::from_element(N, 1.0 / N as f64),
        ProteinModelType::WAG => FreqVector::from_column_slice(&WAG_FREQS),
        ProteinModelType::LG => FreqVector::from_column_slice(&LG_FREQS),
    };
    let total = freqs.sum();
    freqs.div(total)
}

/// Symmetric exchangeabilities from the 190 lower-triangle entries in PAML order,
/// `R[1][0], R[2][0], R[2][1], R[3][0], ...` with states ordered as `AMINOACIDS`.
fn lower_triangle_rates(values: &[f64; 190]) -> SubstMatrix {
    debug_assert_eq!(AMINOACIDS.len(), N);
    let mut rates = SubstMatrix::zeros(N, N);
    let mut idx = 0;
    for i in 1..N {
        for j in 0..i {
            rates[(i, j)] = values[idx];
            rates[(j, i)] = values[idx];
            idx += 1;
        }
    }
    rates
}

// Whelan & Goldman (2001).
static WAG_RATES: [f64; 190] = [
    0.551571, 0.509848, 0.635346, 0.738998, 0.147304, 5.429420, 1.027040, 0.528191, 0.528768,
    0.017830, 0.908598, 0.627228, 0.211049, 4.854648, 0.080556, 1.015564, 0.377422, 0.230756,
    0.611973, 0.210494, 5.298530, 1.740159, 0.361903, 0.225167, 0.013266, 0.303767, 1.733298,
    0.596766, 0.347805, 0.141830, 0.013488, 0.199675, 0.360032, 0.068448, 0.243972, 0.653040,
    0.024712, 0.104111, 0.047954, 0.419409, 0.930480, 0.635680, 0.149750, 0.013590, 0.086805,
    0.116490, 0.165240, 0.354813, 0.400141, 0.073086, 0.224968, 0.016240, 0.390192, 0.015882,
    0.065641, 0.063010, 0.472800, 0.230150, 0.067200, 0.054041, 0.015850, 0.030756, 0.057450,
    0.030780, 0.254310, 0.170100, 0.120368, 0.012650, 1.186630, 0.345880, 0.019840, 0.303530,
    0.044480, 0.038451, 0.008310, 0.266720, 0.137550, 0.067190, 0.071570, 0.082178, 0.247800,
    0.044580, 0.115540, 1.188020, 4.727180, 0.560420, 0.425860, 0.749920, 0.506830, 0.320390,
    0.147540, 0.588820, 0.196440, 0.027150, 0.595510, 0.017720, 0.147710, 0.094340, 0.125220,
    0.308330, 0.050890, 0.211320, 0.058020, 0.045740, 0.035730, 0.013040, 0.263570, 0.116330,
    0.024950, 0.034530, 0.022730, 0.031380, 0.015010, 1.438260, 0.175050, 0.057390, 0.073580,
    0.192380, 0.030370, 0.245950, 0.041310, 0.192000, 0.207160, 0.126770, 0.077670, 0.024070,
    0.633720, 0.556900, 0.025660, 0.074070, 0.020540, 0.066800, 0.244650, 0.082260, 0.321550,
    0.024530, 0.024660, 0.016500, 0.084410, 0.012960, 0.012430, 0.076560, 0.300930, 0.055020,
    0.175700, 0.066320, 0.033300, 0.019900, 0.017430, 0.040380, 0.157960, 0.036920, 0.122300,
    0.024340, 0.035860, 0.048860, 0.008970, 0.028010, 0.291420, 0.070740, 0.080800, 0.023960,
    0.013550, 0.014880, 0.036180, 0.024310, 0.017490, 0.073800, 0.038990, 0.112750, 0.069590,
    0.374260, 0.025950, 0.067260, 0.014830, 0.024440, 0.017570, 0.037950, 0.120130, 0.038530,
    0.195780, 0.138070, 0.271610, 0.139850, 0.127860, 0.108760, 0.023510, 0.130500, 1.587900,
    0.481060,
];

static WAG_FREQS: [f64; 20] = [
    0.086628, 0.043972, 0.039089, 0.057045, 0.019308, 0.036728, 0.058059, 0.083252, 0.024431,
    0.048466, 0.086209, 0.062029, 0.019503, 0.038432, 0.045763, 0.069518, 0.061013, 0.014386,
    0.035274, 0.070896,
];

// Le & Gascuel (2008).
static LG_RATES: [f64; 190] = [
    0.425093, 0.276818, 0.751878, 0.395144, 0.123954, 5.076149, 2.489084, 0.534551, 0.528768,
    0.062556, 0.969894, 0.640346, 0.221500, 5.243870, 0.080556, 1.038545, 0.363970, 0.228075,
    0.611973, 0.210494, 5.221070, 2.317100, 0.361903, 0.227710, 0.012693, 0.270720, 1.773733,
    0.590559, 0.340530, 0.137505, 0.013266, 0.234489, 0.360032, 0.068448, 0.243972, 0.653040,
    0.024289, 0.104111, 0.047954, 0.419409, 1.211550, 0.710170, 0.169264, 0.010040, 0.080045,
    0.117910, 0.125383, 0.325711, 0.471791, 0.062596, 0.235601, 0.013490, 0.326622, 0.015076,
    0.054821, 0.061830, 0.532476, 0.234850, 0.070570, 0.052886, 0.015750, 0.030174, 0.065441,
    0.029890, 0.225833, 0.190001, 0.131528, 0.012371, 1.331289, 0.348956, 0.019984, 0.296636,
    0.044261, 0.026612, 0.008607, 0.279425, 0.142088, 0.069683, 0.078862, 0.084808, 0.252214,
    0.044550, 0.115639, 1.190200, 4.863674, 0.547054, 0.442472, 0.782857, 0.504551, 0.327059,
    0.141552, 0.610460, 0.199099, 0.025346, 0.592036, 0.017614, 0.155337, 0.092258, 0.115951,
    0.310300, 0.049009, 0.208449, 0.055834, 0.044603, 0.036397, 0.013012, 0.233413, 0.115866,
    0.025625, 0.035855, 0.021282, 0.030880, 0.012689, 1.473510, 0.152430, 0.051316, 0.076868,
    0.195510, 0.031543, 0.249313, 0.037897, 0.179240, 0.210332, 0.124665, 0.078698, 0.023918,
    0.651028, 0.547105, 0.024760, 0.075860, 0.021017, 0.064105, 0.248862, 0.082368, 0.306674,
    0.024521, 0.023196, 0.015152, 0.086619, 0.011982, 0.012538, 0.067393, 0.320627, 0.052790,
    0.180717, 0.069104, 0.032371, 0.018811, 0.017070, 0.040203, 0.145558, 0.032157, 0.129315,
    0.024469, 0.037159, 0.058082, 0.006712, 0.025548, 0.282959, 0.065389, 0.081134, 0.025952,
    0.014126, 0.013539, 0.034131, 0.020229, 0.017098, 0.073236, 0.040653, 0.118938, 0.080488,
    0.399748, 0.025060, 0.075004, 0.013927, 0.023920, 0.015699, 0.035562, 0.116392, 0.039205,
    0.200534, 0.145816, 0.273615, 0.139634, 0.142754, 0.100111, 0.021362, 0.125872, 1.608126,
    0.495130,
];

static LG_FREQS: [f64; 20] = [
    0.079066, 0.055941, 0.041977, 0.053052, 0.012937, 0.040767, 0.071586, 0.057337, 0.022355,
    0.062157, 0.099081, 0.064600, 0.022951, 0.042302, 0.044040, 0.061197, 0.053287, 0.012066,
    0.034155, 0.069147,
];
