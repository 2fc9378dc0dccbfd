use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use log::debug;
use nalgebra::DMatrix;

use crate::alignment::Alignment;
use crate::alphabets::Alphabet;
use crate::errors::PhyloError;
use crate::substitution_models::FreqVector;
use crate::tree::{NodeIdx, Tree};
use crate::Result;

/// The PhyloInfo struct contains the data a likelihood is computed on: a tree and the alignment
/// of the sequences at its leaves.
///
/// The alignment is shared by `Arc` so that many trees can be evaluated on one alignment. The
/// struct also holds the leaf sequence encodings, one `n × msa_len` matrix per leaf.
#[derive(Debug, Clone)]
pub struct PhyloInfo {
    /// Multiple sequence alignment of the leaf sequences.
    pub msa: Arc<Alignment>,
    /// Phylogenetic tree.
    pub tree: Tree,
    leaf_encoding: HashMap<String, DMatrix<f64>>,
}

impl PhyloInfo {
    /// Pairs a tree with an alignment. Every leaf must have exactly one sequence and every
    /// sequence a leaf.
    pub fn new(tree: Tree, msa: Arc<Alignment>) -> Result<Self> {
        if tree.n() != msa.len() {
            bail!(PhyloError::InvalidInput(format!(
                "Tree has {} leaves but the alignment has {} sequences",
                tree.n(),
                msa.len()
            )));
        }
        for id in tree.leaf_ids() {
            if msa.record(id).is_none() {
                bail!(PhyloError::InvalidInput(format!(
                    "No sequence for leaf {} in the alignment",
                    id
                )));
            }
        }
        let leaf_encoding = generate_leaf_encoding(&msa)?;
        debug!(
            "Encoded {} leaf sequences of {} columns",
            leaf_encoding.len(),
            msa.msa_len()
        );
        Ok(PhyloInfo {
            msa,
            tree,
            leaf_encoding,
        })
    }

    /// Returns the number of columns in the alignment.
    pub fn msa_length(&self) -> usize {
        self.msa.msa_len()
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.msa.alphabet()
    }

    /// Returns the encoding of a leaf sequence by its id.
    pub fn leaf_encoding_by_id(&self, id: &str) -> Result<&DMatrix<f64>> {
        match self.leaf_encoding.get(id) {
            Some(encoding) => Ok(encoding),
            None => bail!(PhyloError::InvalidInput(format!(
                "No encoding found for leaf with id {}",
                id
            ))),
        }
    }

    /// Returns the encoding of a leaf sequence by the leaf node index.
    pub fn leaf_encoding(&self, idx: &NodeIdx) -> Result<&DMatrix<f64>> {
        let id = self.tree.node_id(idx);
        self.leaf_encoding_by_id(id)
    }

    /// Returns the empirical frequencies of the states in the alignment.
    pub fn freqs(&self) -> FreqVector {
        self.msa.empirical_freqs()
    }
}

/// Character encodings of every sequence, computed once so that the likelihood does not have
/// to look up characters on every evaluation.
fn generate_leaf_encoding(msa: &Alignment) -> Result<HashMap<String, DMatrix<f64>>> {
    let alphabet = msa.alphabet();
    let mut leaf_encoding = HashMap::with_capacity(msa.len());
    for rec in msa.seqs() {
        let columns = msa
            .motifs(rec)
            .map(|motif| alphabet.char_encoding(motif))
            .collect::<Result<Vec<_>>>()?;
        let encoding = if columns.is_empty() {
            DMatrix::zeros(alphabet.n(), 0)
        } else {
            DMatrix::from_columns(&columns)
        };
        leaf_encoding.insert(rec.id().to_string(), encoding);
    }
    Ok(leaf_encoding)
}
