//! Natural language identification with a small feed-forward network.
//!
//! `langnet` classifies which language a document is written in from a fixed-length
//! feature vector. It covers the whole model pipeline: building the three-layer
//! network, loading labeled datasets, two training strategies, accuracy evaluation and
//! single-vector prediction against a persisted model.
//!
//! # Design goals
//!
//! - Predictable performance: reuse buffers (`Scratch` / `Gradients`) instead of allocating.
//! - Clear contracts: shapes are explicit and validated at the API boundary.
//! - Repeatable reads: evaluation and prediction keep all of their state per call.
//!
//! # Panics vs `Result`
//!
//! This crate intentionally exposes two layers of API:
//!
//! - Low-level hot path (panics on misuse):
//!   - [`mlp::Mlp::forward`], [`mlp::Mlp::backward`]
//!     Shape mismatches are treated as programmer error and will panic via `assert!`.
//!
//! - High-level APIs (shape-checked):
//!   - [`Trainer::train`], [`Mlp::evaluate`], [`Predictor::predict`]
//!     These validate inputs and return [`Result`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Dataset`] stores samples contiguously in row-major layout.
//! - Connection weights are row-major with shape `(out_dim, in_dim)`.
//! - Ideal vectors are one-hot over the language classes.
//!
//! # Quick start
//!
//! ```rust
//! use langnet::{CrossValidationTrainer, Dataset, NetworkConfig, Trainer};
//!
//! # fn main() -> langnet::Result<()> {
//! let xs = vec![
//!     vec![0.9, 0.1, 0.0],
//!     vec![0.1, 0.9, 0.0],
//!     vec![0.8, 0.2, 0.1],
//!     vec![0.2, 0.8, 0.1],
//! ];
//! let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
//! let data = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut mlp = NetworkConfig::new(3, 2, 4).with_seed(0).build()?;
//! let artifact = std::env::temp_dir().join(format!("langnet-doc-{}.json", std::process::id()));
//!
//! let report = CrossValidationTrainer::new(3, 2, &artifact).train(&mut mlp, &data)?;
//! assert_eq!(report.epochs.len(), 3);
//!
//! let eval = mlp.evaluate(&data)?;
//! assert_eq!(eval.correct + eval.incorrect(), eval.total);
//! # std::fs::remove_file(&artifact).ok();
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod activation;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod kfold;
pub mod language;
pub mod layer;
pub mod loader;
pub mod logging;
pub mod loss;
pub mod metrics;
pub mod mlp;
pub mod optim;
pub mod predict;
pub mod resilient;
pub mod serde_model;
pub mod topology;
pub mod train;

pub use activation::Activation;
pub use builder::MlpBuilder;
pub use config::{ConfigOverrides, SessionConfig};
pub use data::{Dataset, Sample};
pub use error::{Error, Result};
pub use eval::EvalReport;
pub use kfold::{CrossValidationTrainer, Folds};
pub use language::LanguageTable;
pub use layer::{Init, Layer};
pub use loader::{load_dataset, load_features, read_dataset};
pub use mlp::{Gradients, Mlp, Scratch, TrainBuffers};
pub use optim::{GradientMethod, MethodState, RpropParams};
pub use predict::{Prediction, Predictor};
pub use resilient::{RequiredImprovement, ResilientTrainer};
pub use topology::{ActivationSet, LayerSpec, NetworkConfig, Topology, hidden_width};
pub use train::{EpochReport, Outcome, TrainReport, Trainer};

/// Build the three-layer language network with the default activation set.
pub fn configure_topology(input_size: usize, outputs: usize, hidden_width: usize) -> Result<Mlp> {
    NetworkConfig::new(input_size, outputs, hidden_width).build()
}

/// Load a labeled dataset. Thin wrapper around [`load_dataset`].
pub fn generate_dataset<P: AsRef<Path>>(
    path: P,
    input_size: usize,
    outputs: usize,
) -> Result<Dataset> {
    load_dataset(path, input_size, outputs)
}

/// Run `epochs` epochs of `fold_count`-fold cross-validated training and save to `artifact`.
pub fn train_cross_validation<P: AsRef<Path>>(
    mlp: &mut Mlp,
    data: &Dataset,
    epochs: usize,
    fold_count: usize,
    artifact: P,
) -> Result<TrainReport> {
    CrossValidationTrainer::new(epochs, fold_count, artifact.as_ref()).train(mlp, data)
}

/// Train with RPROP+ until the error reaches `error_rate` or stalls, then save to `artifact`.
pub fn train_resilient<P: AsRef<Path>>(
    mlp: &mut Mlp,
    data: &Dataset,
    error_rate: f32,
    artifact: P,
) -> Result<TrainReport> {
    ResilientTrainer::new(error_rate, artifact.as_ref()).train(mlp, data)
}

/// Classification accuracy of `mlp` on `data`.
pub fn evaluate(mlp: &Mlp, data: &Dataset) -> Result<EvalReport> {
    mlp.evaluate(data)
}

/// Load the model at `artifact` and classify one feature vector.
///
/// The model must map `input_size` features onto one output per entry of `languages`;
/// any other shape is a [`Error::ModelLoad`].
pub fn predict<P: AsRef<Path>>(
    artifact: P,
    input_size: usize,
    features: &[f32],
    languages: &LanguageTable,
) -> Result<Prediction> {
    Predictor::load(artifact, input_size, languages.len(), languages.clone())?.predict(features)
}
