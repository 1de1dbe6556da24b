//! Text sample parsing.
//!
//! One sample per line:
//!
//! ```text
//! <label>\t<slot>:<value> <slot>:<value> ...
//! ```

use fmlearn_core::fid::{self, Fid, SlotId};
use fmlearn_core::{Feature, FeatureConfig, Instance, TrainConfig};
use hashbrown::HashSet;
use tracing::warn;

/// Turns sample lines into [`Instance`]s.
///
/// Only slots from the configured feature list are kept. In unsigned mode a
/// value is hashed with its slot through [`fid::encode`]; in signed mode it
/// must already be a numeric feature id.
#[derive(Debug, Clone)]
pub struct InstanceParser {
    slots: HashSet<SlotId>,
    signed: bool,
    uid_slot: SlotId,
    item_slot: SlotId,
}

impl InstanceParser {
    pub fn new(features: &[FeatureConfig], signed: bool, uid_slot: SlotId, item_slot: SlotId) -> Self {
        Self {
            slots: features.iter().map(|f| f.slot_id).collect(),
            signed,
            uid_slot,
            item_slot,
        }
    }

    pub fn from_config(config: &TrainConfig) -> Self {
        Self::new(
            &config.feature_list,
            config.is_feature_signed,
            config.uid_slot,
            config.item_slot,
        )
    }

    /// Parses one line. Returns `None` for empty lines and for lines without
    /// a tab or with an unparsable label.
    pub fn parse_line(&self, line: &str) -> Option<Instance> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return None;
        }
        let Some((label, features)) = line.split_once('\t') else {
            warn!(line, "skip sample without label separator");
            return None;
        };
        let label: i32 = match label.trim().parse() {
            Ok(label) => label,
            Err(e) => {
                warn!(label, "skip sample with bad label: {e}");
                return None;
            }
        };

        let mut ins = Instance::new(label);
        for token in features.split_whitespace() {
            let Some((slot, value)) = token.split_once(':') else {
                warn!(token, "skip feature without slot separator");
                continue;
            };
            let slot: SlotId = match slot.parse() {
                Ok(slot) if fid::is_valid_slot(slot) => slot,
                _ => {
                    warn!(token, "skip feature with bad slot");
                    continue;
                }
            };
            if !self.slots.contains(&slot) {
                continue;
            }
            let Some(id) = self.feature_id(slot, value) else {
                warn!(token, "skip feature with bad id");
                continue;
            };

            if slot == self.uid_slot {
                ins.user_id = id;
                ins.user_id_str = value.to_string();
            } else if slot == self.item_slot {
                ins.item_id = id;
                ins.item_id_str = value.to_string();
            }
            ins.features.push(Feature::new(slot, id, value));
        }
        Some(ins)
    }

    fn feature_id(&self, slot: SlotId, value: &str) -> Option<Fid> {
        if self.signed {
            value.parse().ok()
        } else {
            Some(fid::encode(slot, value))
        }
    }

    /// Parses every well-formed line of `lines`.
    pub fn parse_batch<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Instance> {
        lines
            .iter()
            .filter_map(|line| self.parse_line(line.as_ref()))
            .collect()
    }
}
