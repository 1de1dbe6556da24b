//! Learned per-feature state.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fid::{Fid, SlotId};

/// Everything the store keeps for one feature id.
///
/// `w`, `z` and `n` are the scalar weight and its FTRL accumulators;
/// `vec_w`, `vec_z` and `vec_n` are the same triple for each embedding
/// coordinate and all have the store's embedding size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub slot: SlotId,
    pub id: Fid,
    pub text: String,
    /// Number of training touches.
    pub show: u64,
    /// Sum of labels over training touches.
    pub click: i64,
    pub w: f32,
    pub z: f32,
    pub n: f32,
    pub vec_w: Vec<f32>,
    pub vec_z: Vec<f32>,
    pub vec_n: Vec<f32>,
}

impl Parameter {
    /// Creates a parameter with zero weight and a zero embedding of `size`.
    pub fn zeroed(slot: SlotId, id: Fid, size: usize) -> Self {
        Self {
            slot,
            id,
            vec_w: vec![0.0; size],
            vec_z: vec![0.0; size],
            vec_n: vec![0.0; size],
            ..Default::default()
        }
    }

    /// Creates a fresh parameter whose embedding is drawn uniformly from
    /// `[-0.5 / size, 0.5 / size)`.
    pub fn random<R: Rng + ?Sized>(slot: SlotId, id: Fid, size: usize, rng: &mut R) -> Self {
        let mut param = Self::zeroed(slot, id, size);
        param.vec_w = random_embedding(size, rng);
        param
    }

    /// Snapshot of the values used for scoring.
    pub fn weight(&self) -> Weight {
        Weight {
            w: self.w,
            vec_w: self.vec_w.clone(),
        }
    }
}

/// Owned copy of a parameter's scoring values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weight {
    pub w: f32,
    pub vec_w: Vec<f32>,
}

impl Weight {
    /// A zero weight with a zero embedding of `size`.
    pub fn zero(size: usize) -> Self {
        Self {
            w: 0.0,
            vec_w: vec![0.0; size],
        }
    }
}

/// Draws an embedding with coordinates in `[-0.5 / size, 0.5 / size)`.
pub fn random_embedding<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<f32> {
    let norm = size as f32;
    (0..size).map(|_| (rng.gen::<f32>() - 0.5) / norm).collect()
}
