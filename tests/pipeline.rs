use std::path::PathBuf;

use langnet::{
    Activation, ActivationSet, Dataset, Error, LanguageTable, Layer, LayerSpec, Mlp,
    NetworkConfig, Outcome, Predictor, ResilientTrainer, RpropParams, Topology, Trainer,
    configure_topology, evaluate, generate_dataset, predict, train_cross_validation,
    train_resilient,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("langnet-{}-{name}", std::process::id()))
}

/// Two clusters in three features: class 0 leans on the first feature, class 1 on the second.
fn clusters(len: usize) -> Dataset {
    let mut xs = Vec::with_capacity(len);
    let mut ys = Vec::with_capacity(len);
    for i in 0..len {
        let jitter = (i % 5) as f32 * 0.02;
        if i % 2 == 0 {
            xs.push(vec![0.9 - jitter, 0.1 + jitter, 0.2]);
            ys.push(vec![1.0, 0.0]);
        } else {
            xs.push(vec![0.1 + jitter, 0.9 - jitter, 0.2]);
            ys.push(vec![0.0, 1.0]);
        }
    }
    Dataset::from_rows(&xs, &ys).unwrap()
}

fn small_net() -> Mlp {
    NetworkConfig::new(3, 2, 4).with_seed(7).build().unwrap()
}

fn languages() -> LanguageTable {
    LanguageTable::from_labels(["English", "Irish"]).unwrap()
}

#[test]
fn cross_validation_runs_exactly_the_requested_epochs() {
    let artifact = temp_path("kfold-epochs.json");
    let mut mlp = small_net();
    let data = clusters(12);

    let report = train_cross_validation(&mut mlp, &data, 4, 5, &artifact).unwrap();

    assert_eq!(report.epochs.len(), 4);
    assert_eq!(report.outcome, Outcome::MaxEpochReached);
    let numbers: Vec<usize> = report.epochs.iter().map(|e| e.epoch).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(artifact.exists());
    std::fs::remove_file(&artifact).unwrap();
}

#[test]
fn saved_model_predicts_like_the_in_memory_network() {
    let artifact = temp_path("roundtrip.json");
    let mut mlp = small_net();
    let data = clusters(10);
    train_cross_validation(&mut mlp, &data, 2, 5, &artifact).unwrap();

    let features = [0.8_f32, 0.15, 0.2];
    let mut scratch = mlp.scratch();
    let expected = mlp.forward(&features, &mut scratch).to_vec();

    let predictor = Predictor::load(&artifact, 3, 2, languages()).unwrap();
    let loaded = predictor.model();
    let mut scratch2 = loaded.scratch();
    assert_eq!(loaded.forward(&features, &mut scratch2), expected.as_slice());

    let via_file = predict(&artifact, 3, &features, &languages()).unwrap();
    let in_memory = Predictor::from_model(mlp, languages())
        .unwrap()
        .predict(&features)
        .unwrap();
    assert_eq!(via_file, in_memory);
    std::fs::remove_file(&artifact).unwrap();
}

#[test]
fn resilient_training_stops_once_the_target_is_met() {
    let artifact = temp_path("resilient-converged.json");
    let mut mlp = small_net();

    // Mean squared error against a one-hot target never exceeds 1.
    let report = train_resilient(&mut mlp, &clusters(8), 2.0, &artifact).unwrap();

    assert_eq!(report.outcome, Outcome::Converged);
    assert_eq!(report.epochs.len(), 1);
    assert!(artifact.exists());
    std::fs::remove_file(&artifact).unwrap();
}

#[test]
fn resilient_training_honours_the_iteration_cap() {
    let artifact = temp_path("resilient-capped.json");
    let mut mlp = small_net();
    let data = clusters(8);

    let report = ResilientTrainer::new(1e-12, &artifact)
        .with_required_improvement(None)
        .with_max_iterations(30)
        .train(&mut mlp, &data)
        .unwrap();

    assert_eq!(report.outcome, Outcome::MaxEpochReached);
    assert_eq!(report.epochs.len(), 30);
    let first = report.epochs[0].error;
    assert!(
        report.final_error < first,
        "first={first} final={}",
        report.final_error
    );
    std::fs::remove_file(&artifact).unwrap();
}

#[test]
fn non_finite_error_aborts_without_writing_an_artifact() {
    let artifact = temp_path("unstable.json");
    let _ = std::fs::remove_file(&artifact);

    let mut mlp = NetworkConfig::new(3, 2, 4)
        .with_activations(ActivationSet::tanh())
        .with_seed(1)
        .build()
        .unwrap();
    let data = Dataset::from_rows(
        &[vec![f32::NAN, 0.1, 0.2], vec![0.1, 0.9, 0.2]],
        &[vec![1.0, 0.0], vec![0.0, 1.0]],
    )
    .unwrap();

    let err = train_cross_validation(&mut mlp, &data, 3, 2, &artifact).unwrap_err();
    assert!(matches!(err, Error::NumericInstability(_)), "{err}");
    assert!(!artifact.exists());
}

/// 3 -> 3 (pass-through) -> 2 network with outputs `[0.6, 0.4]` for sample A and
/// `[0.3, 0.7]` for sample B.
fn scenario_net() -> Mlp {
    let topology = Topology::new(vec![
        LayerSpec::new(Activation::ReLU, 3, false),
        LayerSpec::new(Activation::ReLU, 3, true),
        LayerSpec::new(Activation::Identity, 2, false),
    ])
    .unwrap();
    let hidden = Layer::from_parts(
        3,
        3,
        Activation::ReLU,
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        Vec::new(),
    )
    .unwrap();
    let output = Layer::from_parts(
        3,
        2,
        Activation::Identity,
        vec![0.0, 0.0, -0.5, 0.0, 0.0, 0.5],
        vec![0.75, 0.25],
    )
    .unwrap();
    Mlp::from_parts(topology, vec![hidden, output]).unwrap()
}

#[test]
fn evaluator_scores_the_two_sample_scenario() {
    let data = Dataset::from_rows(
        &[vec![0.1, 0.2, 0.3], vec![0.4, 0.1, 0.9]],
        &[vec![1.0, 0.0], vec![0.0, 1.0]],
    )
    .unwrap();

    let report = evaluate(&scenario_net(), &data).unwrap();
    assert_eq!(report.correct, 2);
    assert_eq!(report.total, 2);
    assert_eq!(report.accuracy_percent, 100.0);
}

#[test]
fn evaluation_is_repeatable_and_consistent() {
    let mut mlp = small_net();
    let data = clusters(10);
    let artifact = temp_path("repeatable.json");
    train_cross_validation(&mut mlp, &data, 1, 5, &artifact).unwrap();
    std::fs::remove_file(&artifact).unwrap();

    let first = mlp.evaluate(&data).unwrap();
    let second = mlp.evaluate(&data).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.correct + first.incorrect(), first.total);
    assert_eq!(first.total, data.len());
    assert!((0.0..=100.0).contains(&first.accuracy_percent));
}

#[test]
fn one_sample_accuracy_is_all_or_nothing() {
    let mlp = configure_topology(3, 2, 1).unwrap();
    let data = Dataset::from_rows(&[vec![0.3, 0.1, 0.7]], &[vec![0.0, 1.0]]).unwrap();

    let report = mlp.evaluate(&data).unwrap();
    assert!(
        report.accuracy_percent == 0.0 || report.accuracy_percent == 100.0,
        "{report:?}"
    );
}

#[test]
fn short_row_fails_the_whole_load() {
    let path = temp_path("short-row.csv");
    std::fs::write(&path, "0.1,0.2,0.3,1,0\n0.1,0.2,1,0\n").unwrap();

    let err = generate_dataset(&path, 3, 2).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, Error::DatasetFormat { row: 2, .. }), "{err}");
}

#[test]
fn loaded_dataset_matches_the_file() {
    let path = temp_path("good.csv");
    std::fs::write(&path, "0.1,0.2,0.3,1,0\n0.4,0.1,0.9,0,1\n").unwrap();

    let data = generate_dataset(&path, 3, 2).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.target(1), [0.0_f32, 1.0]);
}

#[test]
fn short_feature_vector_is_rejected_before_inference() {
    let artifact = temp_path("dims.json");
    scenario_net().save_json(&artifact).unwrap();

    let err = predict(&artifact, 3, &[0.1, 0.2], &languages()).unwrap_err();
    std::fs::remove_file(&artifact).unwrap();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn predictor_load_checks_the_artifact() {
    let missing = temp_path("never-written.json");
    assert!(matches!(
        Predictor::load(&missing, 3, 2, languages()),
        Err(Error::ModelLoad(_))
    ));

    let artifact = temp_path("incompatible.json");
    scenario_net().save_json(&artifact).unwrap();
    let wrong_input = Predictor::load(&artifact, 4, 2, languages());
    std::fs::remove_file(&artifact).unwrap();
    assert!(matches!(wrong_input, Err(Error::ModelLoad(_))));
}

#[test]
fn crate_level_predict_rejects_a_model_of_the_wrong_shape() {
    let artifact = temp_path("wrong-shape.json");
    scenario_net().save_json(&artifact).unwrap();

    // The vector matches the expected width, but the saved network takes 3 inputs.
    let wrong_input = predict(&artifact, 4, &[0.1, 0.2, 0.3, 0.4], &languages());
    let three = LanguageTable::from_labels(["English", "Irish", "Welsh"]).unwrap();
    let wrong_outputs = predict(&artifact, 3, &[0.1, 0.2, 0.3], &three);
    std::fs::remove_file(&artifact).unwrap();

    assert!(matches!(wrong_input, Err(Error::ModelLoad(_))), "{wrong_input:?}");
    assert!(matches!(wrong_outputs, Err(Error::ModelLoad(_))), "{wrong_outputs:?}");
}

#[test]
fn resilient_training_stops_when_the_error_stalls() {
    let artifact = temp_path("resilient-stalled.json");
    let _ = std::fs::remove_file(&artifact);
    let mut mlp = small_net();

    // Identical inputs with alternating labels: no network gets below 0.25.
    let xs = vec![vec![0.4_f32, 0.6, 0.2]; 8];
    let ys: Vec<Vec<f32>> = (0..8)
        .map(|i| if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
        .collect();
    let data = Dataset::from_rows(&xs, &ys).unwrap();

    let report = ResilientTrainer::new(1e-6, &artifact)
        .with_params(RpropParams::default())
        .with_max_iterations(1000)
        .train(&mut mlp, &data)
        .unwrap();

    assert_eq!(report.outcome, Outcome::StalledNoImprovement);
    assert!(report.epochs.len() < 1000, "{}", report.epochs.len());
    assert!(report.final_error > 1e-6);
    assert!(artifact.exists());
    std::fs::remove_file(&artifact).unwrap();
}
