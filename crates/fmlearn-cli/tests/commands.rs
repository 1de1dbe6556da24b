//! Runs the train and predict commands against files in a temp directory.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use fmlearn_cli::{ModelArg, PredictCommand, TrainCommand};

fn write_samples(path: &Path, lines: usize) {
    let mut text = String::new();
    for i in 0..lines {
        let item = i % 6;
        writeln!(text, "{}\t101:u{} 102:i{item}", i32::from(item < 3), i % 4).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let root = dir.display();
    let config = format!(
        r#"{{
            "optim_config": {{"alpha": 0.1, "beta": 1.0, "l1": 0.01, "l2": 0.01,
                              "emb_alpha": 0.05, "emb_beta": 1.0, "emb_l1": 0.0,
                              "emb_l2": 0.01, "emb_size": 2}},
            "feature_list": [
                {{"slot_id": 101, "name": "UserId", "cross": 1, "vec_type": "left"}},
                {{"slot_id": 102, "name": "ItemId", "cross": 2, "vec_type": "right"}}
            ],
            "train_list": ["{root}/train.*"],
            "predict_list": ["{root}/test.txt"],
            "eval_list": [{{"inc_train_list": ["{root}/inc.train"],
                           "inc_test_list": ["{root}/test.txt"]}}],
            "model": "fm",
            "seed": 3
        }}"#
    );
    let path = dir.join("conf.json");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn train_save_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    write_samples(&dir.path().join("train.0"), 600);
    write_samples(&dir.path().join("train.1"), 600);
    write_samples(&dir.path().join("inc.train"), 120);
    write_samples(&dir.path().join("test.txt"), 90);
    let conf = write_config(dir.path());
    let model = dir.path().join("model.txt");
    let report = dir.path().join("report.json");

    TrainCommand {
        conf: conf.clone(),
        model: Some(ModelArg::Ffm),
        parallel: 2,
        save: Some(model.clone()),
        load: None,
        report: Some(report.clone()),
    }
    .run()
    .unwrap();

    let saved = fs::read_to_string(&model).unwrap();
    assert!(saved.starts_with("2\t2\t101:1\t102:2\n"));
    // header + bias + 4 users + 6 items
    assert_eq!(saved.lines().count(), 12);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["trained"], 1200);
    assert_eq!(json["eval"]["count"], 90);
    assert!(json["eval"]["auc"].as_f64().unwrap() > 0.9);
    assert_eq!(json["incremental"]["groups"].as_array().unwrap().len(), 1);

    let output = dir.path().join("scores.tsv");
    PredictCommand {
        conf,
        load: model,
        model: Some(ModelArg::Ffm),
        parallel: 3,
        output: output.clone(),
    }
    .run()
    .unwrap();

    let scores = fs::read_to_string(&output).unwrap();
    assert_eq!(scores.lines().count(), 90);
    for line in scores.lines() {
        let cols: Vec<&str> = line.split('\t').collect();
        assert_eq!(cols.len(), 3);
        assert!(cols[0] == "0" || cols[0] == "1");
        let score: f32 = cols[1].parse().unwrap();
        assert!(score > 0.0 && score < 1.0);
        cols[2].parse::<u64>().unwrap();
    }
}

#[test]
fn train_fails_on_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrainCommand {
        conf: dir.path().join("missing.json"),
        model: None,
        parallel: 1,
        save: None,
        load: None,
        report: None,
    }
    .run()
    .unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));
}

#[test]
fn train_fails_when_train_list_matches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_config(dir.path());
    let result = TrainCommand {
        conf,
        model: Some(ModelArg::Lr),
        parallel: 1,
        save: None,
        load: None,
        report: None,
    }
    .run();
    assert!(result.is_err());
}
