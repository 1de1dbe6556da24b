//! Text model files.
//!
//! ```text
//! <header>
//! 0\t<bias w, 8 decimals>
//! <text>\t<slot>\t<id>\t<w>\t<v0>,<v1>,...
//! ```
//!
//! Feature lines use 7 decimals and come in no particular order. The header
//! is free-form metadata written by the engine and ignored on restore.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use fmlearn_core::fid::BIAS_FID;
use fmlearn_core::Parameter;
use tracing::{info, warn};

use crate::error::{HashTableError, Result};
use crate::store::ParameterStore;

const FEATURE_COLUMNS: usize = 5;

/// Formats an embedding as comma separated values with 7 decimals.
pub fn format_vec(v: &[f32]) -> String {
    v.iter()
        .map(|x| format!("{x:.7}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a comma separated embedding, which must have exactly `size`
/// values. An empty string is the empty embedding.
pub fn parse_vec(s: &str, size: usize) -> std::result::Result<Vec<f32>, String> {
    let values: Vec<f32> = if s.is_empty() {
        Vec::new()
    } else {
        s.split(',')
            .map(|x| x.trim().parse::<f32>().map_err(|e| format!("{x:?}: {e}")))
            .collect::<std::result::Result<_, _>>()?
    };
    if values.len() != size {
        return Err(format!(
            "expected {size} embedding values, got {}",
            values.len()
        ));
    }
    Ok(values)
}

fn format_parameter(p: &Parameter) -> String {
    format!(
        "{}\t{}\t{}\t{:.7}\t{}",
        p.text,
        p.slot,
        p.id,
        p.w,
        format_vec(&p.vec_w)
    )
}

fn parse_parameter(line: &str, size: usize) -> std::result::Result<Parameter, String> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != FEATURE_COLUMNS {
        return Err(format!(
            "expected {FEATURE_COLUMNS} columns, got {}",
            cols.len()
        ));
    }
    let slot = cols[1]
        .parse()
        .map_err(|e| format!("slot {:?}: {e}", cols[1]))?;
    let id: u64 = cols[2]
        .parse()
        .map_err(|e| format!("id {:?}: {e}", cols[2]))?;
    if id == BIAS_FID {
        return Err(format!("id {BIAS_FID} is reserved for the bias"));
    }
    let w = cols[3]
        .parse()
        .map_err(|e| format!("weight {:?}: {e}", cols[3]))?;
    let vec_w = parse_vec(cols[4], size)?;

    let mut param = Parameter::zeroed(slot, id, size);
    param.text = cols[0].to_string();
    param.w = w;
    param.vec_w = vec_w;
    Ok(param)
}

impl ParameterStore {
    /// Writes the bias and every parameter to `path`, returning the number of
    /// feature lines written.
    ///
    /// Shards are locked one at a time, so a persist running alongside
    /// training sees each shard at some point during the call.
    pub fn persist(&self, path: impl AsRef<Path>, header: &str) -> Result<usize> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| HashTableError::io(path, e))?;
        let mut out = BufWriter::new(file);

        let mut count = 0usize;
        let write_all = |out: &mut BufWriter<File>, count: &mut usize| -> std::io::Result<()> {
            writeln!(out, "{header}")?;
            writeln!(out, "{}\t{:.8}", BIAS_FID, self.bias().w)?;
            for shard in self.shards() {
                let shard = shard.lock();
                for param in shard.params.values() {
                    writeln!(out, "{}", format_parameter(param))?;
                    *count += 1;
                }
            }
            out.flush()
        };
        write_all(&mut out, &mut count).map_err(|e| HashTableError::io(path, e))?;

        info!(path = %path.display(), count, "Saved model");
        Ok(count)
    }

    /// Loads a file written by [`persist`](Self::persist) into this store,
    /// returning the number of feature parameters restored.
    ///
    /// Restored parameters get zeroed optimizer accumulators of the store's
    /// embedding size so that training can continue. Feature lines that
    /// cannot be parsed are skipped with a warning.
    ///
    /// # Errors
    ///
    /// IO failures, and [`HashTableError::Format`] when the second line is
    /// missing or not a `0\t<bias>` pair.
    pub fn restore(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| HashTableError::io(path, e))?;
        let reader = BufReader::new(file);
        let size = self.embedding_size();

        let mut count = 0usize;
        let mut skipped = 0usize;
        let mut has_bias = false;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| HashTableError::io(path, e))?;
            let line = line.trim_end_matches('\r');
            match idx {
                0 => continue,
                1 => {
                    let bias = parse_bias(line).map_err(|message| HashTableError::Format {
                        path: path.to_path_buf(),
                        line: 2,
                        message,
                    })?;
                    let mut param = self.bias();
                    param.w = bias;
                    self.set(BIAS_FID, param);
                    has_bias = true;
                }
                _ => {
                    if line.is_empty() {
                        continue;
                    }
                    match parse_parameter(line, size) {
                        Ok(param) => {
                            self.set(param.id, param);
                            count += 1;
                        }
                        Err(message) => {
                            skipped += 1;
                            warn!(path = %path.display(), line = idx + 1, "skip model line: {message}");
                        }
                    }
                }
            }
        }
        if !has_bias {
            return Err(HashTableError::Format {
                path: path.to_path_buf(),
                line: 2,
                message: "missing bias line".to_string(),
            });
        }

        info!(path = %path.display(), count, skipped, "Loaded model");
        Ok(count)
    }
}

fn parse_bias(line: &str) -> std::result::Result<f32, String> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 2 {
        return Err(format!("expected 2 columns, got {}", cols.len()));
    }
    if cols[0] != "0" {
        return Err(format!("expected bias key 0, got {:?}", cols[0]));
    }
    cols[1]
        .parse()
        .map_err(|e| format!("bias {:?}: {e}", cols[1]))
}
