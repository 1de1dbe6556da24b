//! Parsed training records.
//!
//! An [`Instance`] is one labeled input line broken into [`Feature`]s. Engines
//! score instances into [`PredictResult`]s, which is what the metrics consume.

use serde::{Deserialize, Serialize};

use crate::fid::{Fid, SlotId};

/// One sparse feature of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Slot (feature family) the value belongs to.
    pub slot: SlotId,
    /// Packed feature id, hashed from `text` or parsed directly from input.
    pub id: Fid,
    /// Raw feature text as it appeared in the input.
    pub text: String,
    /// Set by the frequency filter when the feature is excluded from a
    /// training pass.
    #[serde(default)]
    pub filtered: bool,
}

impl Feature {
    /// Creates an unfiltered feature.
    pub fn new(slot: SlotId, id: Fid, text: impl Into<String>) -> Self {
        Self {
            slot,
            id,
            text: text.into(),
            filtered: false,
        }
    }
}

/// A labeled training or prediction record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Click label; any value above zero counts as positive.
    pub label: i32,
    /// Id of the user feature, used to group results for GAUC.
    pub user_id: Fid,
    /// Id of the item feature.
    pub item_id: Fid,
    pub user_id_str: String,
    pub item_id_str: String,
    pub features: Vec<Feature>,
}

impl Instance {
    /// Creates an instance with only a label.
    pub fn new(label: i32) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }

    /// Returns true when the label marks a click.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.label > 0
    }
}

/// Score emitted for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResult {
    pub label: i32,
    pub score: f32,
    pub user_id: Fid,
}

impl PredictResult {
    pub fn new(label: i32, score: f32, user_id: Fid) -> Self {
        Self {
            label,
            score,
            user_id,
        }
    }
}
