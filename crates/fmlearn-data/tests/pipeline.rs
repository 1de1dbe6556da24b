//! End-to-end behaviour of the reader and parser pool.

use std::io::Write;

use fmlearn_core::{FeatureConfig, VecType};
use fmlearn_data::{DataError, DataLoader, InstanceParser};
use tempfile::NamedTempFile;

fn parser() -> InstanceParser {
    let features = [101, 102, 103]
        .into_iter()
        .map(|slot| FeatureConfig::new(slot, format!("s{slot}"), 0, VecType::Left))
        .collect::<Vec<_>>();
    InstanceParser::new(&features, false, 101, 102)
}

/// Writes `good` parsable lines with a malformed one every tenth line.
fn sample_file(good: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..good {
        writeln!(file, "{}\t101:u{} 102:i{} 103:h{}", i % 2, i % 13, i % 17, i % 24).unwrap();
        if i % 10 == 0 {
            writeln!(file, "garbage without tab").unwrap();
            writeln!(file).unwrap();
        }
    }
    file
}

fn count_parallel(loader: &DataLoader, file: &NamedTempFile, workers: usize) -> (usize, usize) {
    let mut instances = 0;
    let mut positives = 0;
    for batch in loader.parallel_iter(file.path(), workers).unwrap() {
        instances += batch.len();
        positives += batch.iter().filter(|ins| ins.is_positive()).count();
    }
    (instances, positives)
}

#[test]
fn test_instance_count_is_independent_of_workers() {
    let file = sample_file(1234);
    let loader = DataLoader::with_batch_size(parser(), 37);

    let single = count_parallel(&loader, &file, 1);
    assert_eq!(single, (1234, 617));
    for workers in [2, 4, 7] {
        assert_eq!(count_parallel(&loader, &file, workers), single);
    }
}

#[test]
fn test_parsed_instances_carry_user_and_item() {
    let file = sample_file(5);
    let loader = DataLoader::new(parser());
    let batches: Vec<_> = loader.parallel_iter(file.path(), 1).unwrap().collect();
    assert_eq!(batches.len(), 1);
    let ins = &batches[0][3];
    assert_eq!(ins.user_id_str, "u3");
    assert_eq!(ins.item_id_str, "i3");
    assert_eq!(ins.features.len(), 3);
}

#[test]
fn test_second_read_is_rejected_while_busy() {
    let file = sample_file(500);
    // One line per batch so the reader fills its queue and blocks.
    let loader = DataLoader::with_batch_size(parser(), 1);

    let first = loader.read_file(file.path()).unwrap();
    assert!(loader.is_busy());
    assert!(matches!(loader.read_file(file.path()), Err(DataError::Busy)));
    assert!(matches!(loader.parallel_iter(file.path(), 2), Err(DataError::Busy)));

    let lines: usize = first.map(|batch| batch.len()).sum();
    assert_eq!(lines, 500 + 2 * 50);

    // End of stream implies the loader is free again.
    assert!(!loader.is_busy());
    let (instances, _) = count_parallel(&loader, &file, 3);
    assert_eq!(instances, 500);
}

#[test]
fn test_closing_output_stops_pipeline() {
    let file = sample_file(2000);
    let loader = DataLoader::with_batch_size(parser(), 1);

    let out = loader.parallel_iter(file.path(), 2).unwrap();
    assert!(out.pop().is_some());
    out.close();

    // Workers close the line queue on their next push, which stops the reader.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while loader.is_busy() {
        assert!(std::time::Instant::now() < deadline, "reader did not stop");
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

#[test]
fn test_dropping_output_frees_loader() {
    let file = sample_file(2000);
    let loader = DataLoader::with_batch_size(parser(), 1);

    let out = loader.parallel_iter(file.path(), 2).unwrap();
    assert!(out.pop().is_some());
    drop(out);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while loader.is_busy() {
        assert!(std::time::Instant::now() < deadline, "reader did not stop");
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let (instances, _) = count_parallel(&loader, &file, 2);
    assert_eq!(instances, 2000);
}

#[test]
fn test_early_return_frees_loader() {
    fn first_positive(loader: &DataLoader, file: &NamedTempFile) -> Option<String> {
        for batch in loader.parallel_iter(file.path(), 3).ok()? {
            if let Some(ins) = batch.into_iter().find(|ins| ins.is_positive()) {
                return Some(ins.user_id_str);
            }
        }
        None
    }

    let file = sample_file(3000);
    let loader = DataLoader::with_batch_size(parser(), 2);
    assert!(first_positive(&loader, &file).is_some());

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while loader.is_busy() {
        assert!(std::time::Instant::now() < deadline, "reader did not stop");
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}
