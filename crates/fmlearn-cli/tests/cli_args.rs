use clap::Parser;
use fmlearn_cli::{Cli, Commands, ModelArg};
use fmlearn_core::ModelKind;
use std::path::PathBuf;

#[test]
fn cli_parses_train_flags() {
    let cli = Cli::parse_from([
        "fmlearn",
        "train",
        "--conf",
        "conf/ffm.json",
        "--model",
        "ffm",
        "--parallel",
        "8",
        "--save",
        "out.model",
    ]);
    let Commands::Train(cmd) = cli.command else {
        panic!("expected train command");
    };
    assert_eq!(cmd.conf, PathBuf::from("conf/ffm.json"));
    assert_eq!(cmd.model, Some(ModelArg::Ffm));
    assert_eq!(cmd.parallel, 8);
    assert_eq!(cmd.save, Some(PathBuf::from("out.model")));
    assert!(cmd.load.is_none());
    assert!(cmd.report.is_none());
}

#[test]
fn cli_train_defaults() {
    let cli = Cli::parse_from(["fmlearn", "train", "-c", "a.json"]);
    let Commands::Train(cmd) = cli.command else {
        panic!("expected train command");
    };
    assert_eq!(cmd.parallel, 1);
    assert!(cmd.model.is_none());
}

#[test]
fn cli_parses_predict_flags() {
    let cli = Cli::parse_from([
        "fmlearn", "predict", "--conf", "a.json", "--load", "m.txt", "-m", "lr", "-p", "3", "-o",
        "scores.tsv",
    ]);
    let Commands::Predict(cmd) = cli.command else {
        panic!("expected predict command");
    };
    assert_eq!(cmd.load, PathBuf::from("m.txt"));
    assert_eq!(cmd.model.map(ModelKind::from), Some(ModelKind::Lr));
    assert_eq!(cmd.parallel, 3);
    assert_eq!(cmd.output, PathBuf::from("scores.tsv"));
}

#[test]
fn cli_rejects_bad_input() {
    assert!(Cli::try_parse_from(["fmlearn", "train", "-c", "a.json", "--model", "svm"]).is_err());
    assert!(Cli::try_parse_from(["fmlearn", "predict", "--conf", "a.json", "-o", "x"]).is_err());
    assert!(Cli::try_parse_from(["fmlearn", "serve"]).is_err());
}
