use std::path::Path;

use clap::Parser;
use hashlr_checkpoint::{read_predictions, Checkpointer, JsonCheckpointer, ModelCheckpoint};
use hashlr_cli::{Cli, Commands, PredictCommand};
use hashlr_core::{Event, EventContext, LearnerConfig, TaggedTokens, TokenFields};
use hashlr_training::{OnlineLearner, Predictor};

const TRAIN: &str = "\
1|2|2|1|1,2|3|4,5|6|11,1,2
0|3|2|2|1|7|8|9|12,2,3
2|4|3|1|2,10|3|4|6|11,1,2
0|1|1|1|13|14|15|16|0,0,0
1|1|2|1|1,2|3|4,5|6|12,2,3
0|5|3|3|20|21|22|23|13,1,4
";

const TEST: &str = "\
2|1|1,2|3|4,5|6|11,1,2
3|3|20|21|22|23|13,1,4
1|1|99|98|97|96|0,0,0
";

const SOLUTION: &str = "1,2\n0,4\n0,1\n";

fn write_fixtures(dir: &Path) {
    std::fs::write(dir.join("train.txt"), TRAIN).unwrap();
    std::fs::write(dir.join("test.txt"), TEST).unwrap();
    std::fs::write(dir.join("solution.txt"), SOLUTION).unwrap();
}

fn arg(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

#[test]
fn cli_parses_train_flags() {
    let cli = Cli::parse_from([
        "hashlr",
        "train",
        "--train",
        "train.txt",
        "--output",
        "model.json",
        "--dim",
        "97",
        "--lambda",
        "0.01",
        "--personalized",
        "--layout",
        "structured",
        "--checkpoint-every",
        "100",
    ]);
    match cli.command {
        Commands::Train(cmd) => {
            let config = cmd.learner.resolve().unwrap();
            assert_eq!(config.dim(), 97);
            assert!(config.personalized());
            assert_eq!(cmd.checkpoint_every, 100);
            assert_eq!(cmd.keep_checkpoints, 5);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_unknown_layout() {
    let parsed = Cli::try_parse_from([
        "hashlr", "train", "--train", "a", "--output", "b", "--layout", "dense",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn train_predict_eval_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_fixtures(d);

    hashlr_cli::run(Cli::parse_from([
        "hashlr",
        "train",
        "--train",
        arg(d, "train.txt").as_str(),
        "--output",
        arg(d, "model.json.gz").as_str(),
        "--dim",
        "1031",
        "--step",
        "0.1",
        "--lambda",
        "0.01",
        "--personalized",
        "--checkpoint-dir",
        arg(d, "snapshots").as_str(),
        "--checkpoint-every",
        "2",
        "--keep-checkpoints",
        "2",
    ]))
    .unwrap();

    let model = JsonCheckpointer::new().restore(&d.join("model.json.gz")).unwrap();
    assert_eq!(model.global_step(), 6);
    assert!(model.weights.is_settled());
    assert_eq!(model.config.dim(), 1031);

    // Periodic snapshots at 2, 4 and 6 events; only the newest two remain.
    let snapshots = d.join("snapshots");
    assert!(!snapshots.join("checkpoint-2.json").exists());
    assert!(snapshots.join("checkpoint-4.json").exists());
    assert!(snapshots.join("checkpoint-6.json").exists());
    assert_eq!(
        JsonCheckpointer::new().latest(&snapshots).unwrap(),
        snapshots.join("checkpoint-6.json")
    );

    hashlr_cli::run(Cli::parse_from([
        "hashlr",
        "predict",
        "--model",
        arg(d, "model.json.gz").as_str(),
        "--test",
        arg(d, "test.txt").as_str(),
        "--output",
        arg(d, "preds.txt").as_str(),
    ]))
    .unwrap();
    let predictions = read_predictions(d.join("preds.txt")).unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| (0.0..=1.0).contains(p)));

    let report = hashlr_cli::EvalCommand {
        solution: d.join("solution.txt"),
        predictions: d.join("preds.txt"),
    }
    .run()
    .unwrap();
    assert!(report.rmse >= 0.0 && report.rmse <= 1.0);
    assert!(report.weighted_rmse >= 0.0 && report.weighted_rmse <= 1.0);

    // Solution CTRs 0.5, 0 and 0 over 7 impressions in total.
    let squared: f64 = [0.5, 0.0, 0.0]
        .iter()
        .zip(&predictions)
        .map(|(ctr, p)| (ctr - p) * (ctr - p))
        .sum();
    assert!((report.per_impression_rmse - (squared / 7.0).sqrt()).abs() < 1e-12);
    assert!((report.rmse - (squared / 3.0).sqrt()).abs() < 1e-12);
}

#[test]
fn predict_from_snapshot_uses_settled_weights() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let config = LearnerConfig::builder()
        .dim(1_572_869)
        .step(0.1)
        .lambda(1.0)
        .build()
        .unwrap();
    let query = |token: &str| TaggedTokens {
        query: vec![token.to_string()],
        ..TaggedTokens::default()
    };
    let mut learner = OnlineLearner::new(config.clone()).unwrap();
    learner
        .update(&Event::aggregated(EventContext::default(), 1, 1, query("a")))
        .unwrap();
    for _ in 0..20 {
        learner
            .update(&Event::aggregated(EventContext::default(), 0, 1, query("b")))
            .unwrap();
    }
    let snapshot = learner.weights().clone();
    assert!(!snapshot.is_settled());

    let model = d.join("checkpoint-21.json");
    JsonCheckpointer::new()
        .save(&model, &ModelCheckpoint::new(config.clone(), snapshot))
        .unwrap();
    std::fs::write(d.join("test.txt"), "0|0|a||||0,0,0\n").unwrap();

    let predictions = PredictCommand {
        model,
        test: d.join("test.txt"),
        output: d.join("preds.txt"),
        labeled: false,
        limit: None,
        precision: 12,
        solution: None,
    }
    .run()
    .unwrap();

    let settled = learner.finish().unwrap();
    let event = Event::unlabeled(
        EventContext::default(),
        TokenFields::Tagged(query("a")),
    );
    let expected = Predictor::new(&config)
        .unwrap()
        .predict(&settled, &event)
        .unwrap();
    assert_eq!(predictions, vec![expected]);
}

#[test]
fn resume_continues_where_training_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_fixtures(d);

    let train = |extra: &[&str], output: &str| {
        let mut args = vec![
            "hashlr".to_string(),
            "train".to_string(),
            "--train".to_string(),
            arg(d, "train.txt"),
            "--output".to_string(),
            arg(d, output),
            "--dim".to_string(),
            "257".to_string(),
            "--lambda".to_string(),
            "0.1".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Train(cmd) => cmd.run().unwrap(),
            other => panic!("unexpected command: {other:?}"),
        }
    };

    let first = train(&["--limit", "4", "--prefetch", "0"], "first.json");
    assert_eq!(first.global_step(), 4);

    let resume = arg(d, "first.json");
    let resumed = train(&["--resume", resume.as_str()], "resumed.json");
    assert_eq!(resumed.global_step(), 10);
}

#[test]
fn resume_rejects_changed_regularization() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_fixtures(d);

    let train = |extra: &[&str], output: &str| {
        let mut args = vec![
            "hashlr".to_string(),
            "train".to_string(),
            "--train".to_string(),
            arg(d, "train.txt"),
            "--output".to_string(),
            arg(d, output),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Train(cmd) => cmd.run(),
            other => panic!("unexpected command: {other:?}"),
        }
    };

    train(&["--dim", "257", "--lambda", "0.1"], "first.json").unwrap();
    let resume = arg(d, "first.json");

    let err = train(&["--resume", resume.as_str(), "--lambda", "0.2"], "second.json")
        .unwrap_err();
    assert!(format!("{err:#}").contains("--lambda 0.2 (checkpoint has 0.1)"));
    assert!(!d.join("second.json").exists());

    let resumed = train(
        &["--resume", resume.as_str(), "--lambda", "0.1", "--log-every", "2"],
        "third.json",
    )
    .unwrap();
    assert_eq!(resumed.global_step(), 12);
}

#[test]
fn sweep_scores_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_fixtures(d);

    let cli = Cli::parse_from([
        "hashlr",
        "sweep",
        "--train",
        arg(d, "train.txt").as_str(),
        "--test",
        arg(d, "test.txt").as_str(),
        "--solution",
        arg(d, "solution.txt").as_str(),
        "--dims",
        "97,389",
        "--lambdas",
        "0,0.05",
        "--output-dir",
        arg(d, "sweep").as_str(),
    ]);
    let scores = match cli.command {
        Commands::Sweep(cmd) => cmd.run().unwrap(),
        other => panic!("unexpected command: {other:?}"),
    };
    assert_eq!(scores.len(), 4);
    assert_eq!((scores[0].dim, scores[0].lambda), (97, 0.0));
    assert_eq!((scores[3].dim, scores[3].lambda), (389, 0.05));
    assert!(d.join("sweep").join("predictions-dim389-lambda0.05.txt").exists());
}

#[test]
fn stats_runs_on_train_and_test() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_fixtures(d);

    hashlr_cli::run(Cli::parse_from([
        "hashlr",
        "stats",
        "--train",
        arg(d, "train.txt").as_str(),
        "--test",
        arg(d, "test.txt").as_str(),
        "--top",
        "3",
    ]))
    .unwrap();
}
