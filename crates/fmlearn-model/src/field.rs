//! Slot to field assignment for field-aware factorization machines.

use fmlearn_core::{FeatureConfig, SlotId, VecType};
use hashbrown::HashMap;

use crate::error::{ModelError, Result};

/// Field assignment and embedding geometry of an FFM model.
///
/// Fields are numbered from 1; a slot in field 0 (or not configured at all)
/// only contributes its scalar weight. Every feature stores one `emb_size`
/// sub-vector per field, so its full embedding is `emb_size * num_fields`
/// long and the sub-vector used against field `f` starts at
/// `(f - 1) * emb_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    slot_to_field: HashMap<SlotId, usize>,
    num_fields: usize,
    emb_size: usize,
}

impl FieldLayout {
    /// Builds the layout from the configured feature list.
    ///
    /// # Errors
    ///
    /// - [`ModelError::DuplicateSlot`] if a slot appears twice.
    /// - [`ModelError::FieldConfig`] if one field is declared with both
    ///   vector sides, or if the largest field id exceeds the number of
    ///   distinct fields (field ids must be dense).
    ///
    /// # Example
    ///
    /// ```
    /// use fmlearn_core::{FeatureConfig, VecType};
    /// use fmlearn_model::FieldLayout;
    ///
    /// let layout = FieldLayout::new(&[
    ///     FeatureConfig::new(101, "UserId", 1, VecType::Left),
    ///     FeatureConfig::new(102, "ItemId", 2, VecType::Right),
    ///     FeatureConfig::new(103, "Hour", 0, VecType::Left),
    /// ], 4).unwrap();
    ///
    /// assert_eq!(layout.num_fields(), 2);
    /// assert_eq!(layout.full_size(), 8);
    /// assert_eq!(layout.field(102), 2);
    /// assert_eq!(layout.field(103), 0);
    /// ```
    pub fn new(features: &[FeatureConfig], emb_size: usize) -> Result<Self> {
        let mut slot_to_field = HashMap::with_capacity(features.len());
        let mut field_side: HashMap<usize, VecType> = HashMap::new();
        let mut max_field = 0usize;

        for feature in features {
            let field = feature.cross as usize;
            if slot_to_field.insert(feature.slot_id, field).is_some() {
                return Err(ModelError::DuplicateSlot {
                    slot: feature.slot_id,
                });
            }
            if field == 0 {
                continue;
            }
            max_field = max_field.max(field);
            match field_side.get(&field) {
                Some(side) if *side != feature.vec_type => {
                    return Err(ModelError::FieldConfig {
                        message: format!("field {field} is configured with different sides"),
                    });
                }
                Some(_) => {}
                None => {
                    field_side.insert(field, feature.vec_type);
                }
            }
        }

        let num_fields = field_side.len();
        if max_field > num_fields {
            return Err(ModelError::FieldConfig {
                message: format!("max field {max_field} more than field num {num_fields}"),
            });
        }

        Ok(Self {
            slot_to_field,
            num_fields,
            emb_size,
        })
    }

    /// Field of `slot`, 0 when it takes no part in interactions.
    #[inline]
    pub fn field(&self, slot: SlotId) -> usize {
        self.slot_to_field.get(&slot).copied().unwrap_or(0)
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn emb_size(&self) -> usize {
        self.emb_size
    }

    /// Embedding length stored per feature.
    pub fn full_size(&self) -> usize {
        self.emb_size * self.num_fields
    }

    /// Offset of the `(i, j)` block in a `num_fields x num_fields x emb_size`
    /// buffer, with 0-based field indices.
    #[inline]
    pub fn block(&self, i: usize, j: usize) -> usize {
        i * self.full_size() + j * self.emb_size
    }
}
