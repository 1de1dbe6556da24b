//! Sharded, lock-protected parameter storage.

use fmlearn_core::fid::BIAS_FID;
use fmlearn_core::{Fid, Parameter, SlotId, Weight};
use fmlearn_optimizer::OptimizerDyn;
use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{HashTableError, Result};

/// Default number of shards.
pub const DEFAULT_SHARD_COUNT: usize = 61;

/// One shard: its parameters and the RNG used to initialise new embeddings.
#[derive(Debug)]
pub(crate) struct Shard {
    pub(crate) params: HashMap<Fid, Parameter>,
    rng: StdRng,
}

impl Shard {
    fn get_or_init(&mut self, id: Fid, slot: SlotId, size: usize) -> &mut Parameter {
        let Shard { params, rng } = self;
        params
            .entry(id)
            .or_insert_with(|| Parameter::random(slot, id, size, rng))
    }
}

/// Concurrent map from feature id to [`Parameter`].
///
/// Parameters are spread over shards by `id % shard_count`; each shard sits
/// behind its own mutex, so threads touching different shards never contend
/// and all operations on one id are serialised. The bias (id 0) lives outside
/// the shards behind a dedicated lock and carries no embedding.
///
/// Every method returns owned copies; callers never hold a reference into
/// the store.
///
/// # Example
///
/// ```
/// use fmlearn_hash_table::ParameterStore;
///
/// let store = ParameterStore::with_seed(4, 2, Some(1));
/// let p = store.get(17, 3, true).unwrap();
/// assert_eq!(p.vec_w.len(), 2);
/// assert!(store.contains(17));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug)]
pub struct ParameterStore {
    shards: Vec<Mutex<Shard>>,
    bias: Mutex<Parameter>,
    embedding_size: usize,
}

impl ParameterStore {
    /// Creates a store whose new embeddings are seeded from OS entropy.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is 0.
    pub fn new(shard_count: usize, embedding_size: usize) -> Self {
        Self::with_seed(shard_count, embedding_size, None)
    }

    /// Creates a store; with `Some(seed)` shard `i` draws embeddings from an
    /// RNG seeded with `seed + i`, which makes single-threaded runs
    /// reproducible.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is 0.
    pub fn with_seed(shard_count: usize, embedding_size: usize, seed: Option<u64>) -> Self {
        assert!(shard_count > 0, "shard_count must be greater than 0");

        let shards = (0..shard_count)
            .map(|i| {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => StdRng::from_entropy(),
                };
                Mutex::new(Shard {
                    params: HashMap::new(),
                    rng,
                })
            })
            .collect();

        Self {
            shards,
            bias: Mutex::new(Parameter::default()),
            embedding_size,
        }
    }

    /// Length of every embedding in the store.
    pub fn embedding_size(&self) -> usize {
        self.embedding_size
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard_for_id(&self, id: Fid) -> usize {
        (id % self.shards.len() as u64) as usize
    }

    #[inline]
    fn lock_shard(&self, id: Fid) -> MutexGuard<'_, Shard> {
        self.shards[self.shard_for_id(id)].lock()
    }

    pub(crate) fn shards(&self) -> &[Mutex<Shard>] {
        &self.shards
    }

    /// Returns a copy of the parameter for `id`.
    ///
    /// Id 0 returns the bias. A missing id is created with a random embedding
    /// when `init_if_missing` is set (lookup and insert happen under one
    /// lock), otherwise `None` is returned.
    pub fn get(&self, id: Fid, slot: SlotId, init_if_missing: bool) -> Option<Parameter> {
        if id == BIAS_FID {
            return Some(self.bias.lock().clone());
        }
        let mut shard = self.lock_shard(id);
        if init_if_missing {
            Some(shard.get_or_init(id, slot, self.embedding_size).clone())
        } else {
            shard.params.get(&id).cloned()
        }
    }

    /// Returns the scoring values for `id`.
    ///
    /// Like [`get`](Self::get) but a missing id that is not initialised yields
    /// a zero weight with a zero embedding. Parameters created here remember
    /// `text` for persistence.
    pub fn get_weight(&self, id: Fid, slot: SlotId, text: &str, init_if_missing: bool) -> Weight {
        if id == BIAS_FID {
            return Weight {
                w: self.bias.lock().w,
                vec_w: Vec::new(),
            };
        }
        let mut shard = self.lock_shard(id);
        if init_if_missing {
            let param = shard.get_or_init(id, slot, self.embedding_size);
            if param.text.is_empty() {
                param.text = text.to_string();
            }
            param.weight()
        } else {
            shard
                .params
                .get(&id)
                .map(Parameter::weight)
                .unwrap_or_else(|| Weight::zero(self.embedding_size))
        }
    }

    /// Returns true if `id` has a parameter (the bias always exists).
    pub fn contains(&self, id: Fid) -> bool {
        id == BIAS_FID || self.lock_shard(id).params.contains_key(&id)
    }

    /// Overwrites the parameter for `id`.
    pub fn set(&self, id: Fid, parameter: Parameter) {
        if id == BIAS_FID {
            *self.bias.lock() = parameter;
            return;
        }
        self.lock_shard(id).params.insert(id, parameter);
    }

    /// Copy of the bias parameter.
    pub fn bias(&self) -> Parameter {
        self.bias.lock().clone()
    }

    /// Applies a scalar gradient to `id`, counting one show and `label`
    /// clicks.
    ///
    /// # Errors
    ///
    /// Returns [`HashTableError::IdNotFound`] without touching anything when
    /// `id` was never initialised by a `get`/`get_weight` call.
    pub fn update(
        &self,
        id: Fid,
        slot: SlotId,
        label: i32,
        grad: f32,
        optimizer: &dyn OptimizerDyn,
    ) -> Result<()> {
        if id == BIAS_FID {
            optimizer.update(grad, &mut self.bias.lock());
            return Ok(());
        }
        let mut shard = self.lock_shard(id);
        let param = shard
            .params
            .get_mut(&id)
            .ok_or(HashTableError::IdNotFound { id, slot })?;
        record_touch(param, label);
        optimizer.update(grad, param);
        Ok(())
    }

    /// Applies an embedding gradient to `id`, counting one show and `label`
    /// clicks. The bias has no embedding, so id 0 is a no-op.
    ///
    /// # Errors
    ///
    /// [`HashTableError::IdNotFound`] for an uninitialised id and
    /// [`HashTableError::DimensionMismatch`] when `grad` is not
    /// [`embedding_size`](Self::embedding_size) long; nothing is modified in
    /// either case.
    pub fn update_embedding(
        &self,
        id: Fid,
        slot: SlotId,
        label: i32,
        grad: &[f32],
        optimizer: &dyn OptimizerDyn,
    ) -> Result<()> {
        if id == BIAS_FID {
            return Ok(());
        }
        self.check_grad_size(grad)?;
        let mut shard = self.lock_shard(id);
        let param = shard
            .params
            .get_mut(&id)
            .ok_or(HashTableError::IdNotFound { id, slot })?;
        optimizer.update_embedding(grad, param)?;
        record_touch(param, label);
        Ok(())
    }

    /// Scalar and embedding update of `id` under a single lock acquisition.
    /// For the bias only the scalar gradient is applied.
    ///
    /// # Errors
    ///
    /// Same as [`update_embedding`](Self::update_embedding).
    pub fn update_weight_and_embedding(
        &self,
        id: Fid,
        slot: SlotId,
        label: i32,
        grad: f32,
        grad_vec: &[f32],
        optimizer: &dyn OptimizerDyn,
    ) -> Result<()> {
        if id == BIAS_FID {
            optimizer.update(grad, &mut self.bias.lock());
            return Ok(());
        }
        self.check_grad_size(grad_vec)?;
        let mut shard = self.lock_shard(id);
        let param = shard
            .params
            .get_mut(&id)
            .ok_or(HashTableError::IdNotFound { id, slot })?;
        optimizer.update_embedding(grad_vec, param)?;
        optimizer.update(grad, param);
        record_touch(param, label);
        Ok(())
    }

    fn check_grad_size(&self, grad: &[f32]) -> Result<()> {
        if grad.len() != self.embedding_size {
            return Err(HashTableError::DimensionMismatch {
                expected: self.embedding_size,
                actual: grad.len(),
            });
        }
        Ok(())
    }

    /// Number of feature parameters, excluding the bias.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().params.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parameters held by each shard.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.lock().params.len()).collect()
    }
}

#[inline]
fn record_touch(param: &mut Parameter, label: i32) {
    param.show += 1;
    param.click += i64::from(label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmlearn_optimizer::{create_optimizer, FtrlParams, OptimizerConfig};
    use std::sync::Arc;
    use std::thread;

    fn sgd() -> Box<dyn OptimizerDyn> {
        create_optimizer(OptimizerConfig::Sgd {
            learning_rate: 0.5,
            l2_reg: 0.0,
        })
    }

    fn ftrl() -> Box<dyn OptimizerDyn> {
        let params = FtrlParams {
            alpha: 0.1,
            beta: 1.0,
            l1: 0.1,
            l2: 0.1,
        };
        create_optimizer(OptimizerConfig::Ftrl {
            weight: params,
            embedding: params,
        })
    }

    #[test]
    fn test_store_get_initializes_once() {
        let store = ParameterStore::with_seed(DEFAULT_SHARD_COUNT, 4, Some(3));
        assert!(store.get(5, 1, false).is_none());

        let first = store.get(5, 1, true).unwrap();
        assert_eq!(first.id, 5);
        assert_eq!(first.slot, 1);
        assert_eq!(first.vec_w.len(), 4);
        assert_eq!(first.vec_z, vec![0.0; 4]);
        assert!(first.vec_w.iter().all(|v| v.abs() <= 0.125));

        let second = store.get(5, 1, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_weight() {
        let store = ParameterStore::with_seed(7, 3, Some(1));

        let missing = store.get_weight(9, 2, "nine", false);
        assert_eq!(missing, Weight::zero(3));
        assert!(!store.contains(9));

        let created = store.get_weight(9, 2, "nine", true);
        assert_eq!(created.vec_w.len(), 3);
        assert_eq!(store.get(9, 2, false).unwrap().text, "nine");

        let bias = store.get_weight(0, 0, "", true);
        assert_eq!(bias.w, 0.0);
        assert!(bias.vec_w.is_empty());
    }

    #[test]
    fn test_store_seed_is_reproducible() {
        let a = ParameterStore::with_seed(5, 8, Some(42));
        let b = ParameterStore::with_seed(5, 8, Some(42));
        for id in [1u64, 2, 17, 1_000_000_007] {
            assert_eq!(a.get(id, 1, true), b.get(id, 1, true));
        }
    }

    #[test]
    fn test_store_update_counts_and_learns() {
        let store = ParameterStore::new(3, 0);
        let opt = sgd();
        store.get(11, 1, true);

        store.update(11, 1, 1, 1.0, opt.as_ref()).unwrap();
        store.update(11, 1, 0, 1.0, opt.as_ref()).unwrap();

        let p = store.get(11, 1, false).unwrap();
        assert_eq!(p.show, 2);
        assert_eq!(p.click, 1);
        assert_eq!(p.w, -1.0);
    }

    #[test]
    fn test_store_update_missing_is_noop() {
        let store = ParameterStore::new(3, 2);
        let opt = sgd();

        let err = store.update(11, 4, 1, 1.0, opt.as_ref()).unwrap_err();
        assert!(matches!(err, HashTableError::IdNotFound { id: 11, slot: 4 }));
        let err = store
            .update_embedding(11, 4, 1, &[0.1, 0.1], opt.as_ref())
            .unwrap_err();
        assert!(matches!(err, HashTableError::IdNotFound { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_bias_path() {
        let store = ParameterStore::new(3, 2);
        let opt = ftrl();

        store.update(0, 0, 1, 0.1, opt.as_ref()).unwrap();
        let bias = store.bias();
        assert!((bias.z - 0.1).abs() < 1e-6);
        assert!((bias.n - 0.01).abs() < 1e-6);
        assert_eq!(bias.show, 0);

        // The bias carries no embedding.
        store.update_embedding(0, 0, 1, &[1.0, 1.0], opt.as_ref()).unwrap();
        assert!(store.bias().vec_w.is_empty());
        assert!(store.contains(0));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_update_embedding_size_mismatch() {
        let store = ParameterStore::new(3, 2);
        let opt = ftrl();
        let before = store.get(8, 1, true).unwrap();

        let err = store
            .update_embedding(8, 1, 1, &[0.1, 0.1, 0.1], opt.as_ref())
            .unwrap_err();
        assert!(matches!(
            err,
            HashTableError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        // A parameter whose state was overwritten with the wrong length is
        // rejected by the optimizer.
        let mut broken = before.clone();
        broken.vec_n.clear();
        store.set(8, broken.clone());
        let err = store
            .update_embedding(8, 1, 1, &[0.1, 0.1], opt.as_ref())
            .unwrap_err();
        assert!(matches!(err, HashTableError::Optimizer(_)));
        assert_eq!(store.get(8, 1, false).unwrap(), broken);
    }

    #[test]
    fn test_store_update_weight_and_embedding() {
        let store = ParameterStore::new(3, 2);
        let opt = sgd();
        let mut p = Parameter::zeroed(1, 8, 2);
        p.w = 1.0;
        p.vec_w = vec![1.0, -1.0];
        store.set(8, p);

        store
            .update_weight_and_embedding(8, 1, 1, 1.0, &[1.0, 1.0], opt.as_ref())
            .unwrap();
        let p = store.get(8, 1, false).unwrap();
        assert_eq!(p.w, 0.5);
        assert_eq!(p.vec_w, vec![0.5, -1.5]);
        assert_eq!(p.show, 1);
        assert_eq!(p.click, 1);
    }

    #[test]
    fn test_store_sharding() {
        let store = ParameterStore::new(4, 0);
        for id in 1..=12u64 {
            store.get(id, 1, true);
        }
        assert_eq!(store.shard_count(), 4);
        assert_eq!(store.shard_sizes(), vec![3, 3, 3, 3]);
        assert_eq!(store.len(), 12);
    }

    #[test]
    fn test_store_concurrent_updates() {
        let store = Arc::new(ParameterStore::new(DEFAULT_SHARD_COUNT, 2));
        let opt: Arc<dyn OptimizerDyn> = Arc::from(sgd());
        let threads = 8;
        let rounds = 200;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let opt = Arc::clone(&opt);
                thread::spawn(move || {
                    for round in 0..rounds {
                        let id = 1 + (round % 10) as u64;
                        store.get(id, 1, true);
                        store.update(id, 1, 1, 0.0, opt.as_ref()).unwrap();
                        store
                            .update_embedding(id, 1, 0, &[0.0, 0.0], opt.as_ref())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total_show: u64 = (1..=10u64)
            .map(|id| store.get(id, 1, false).unwrap().show)
            .sum();
        let total_click: i64 = (1..=10u64)
            .map(|id| store.get(id, 1, false).unwrap().click)
            .sum();
        assert_eq!(total_show, (threads * rounds * 2) as u64);
        assert_eq!(total_click, (threads * rounds) as i64);
        assert_eq!(store.len(), 10);
    }
}
