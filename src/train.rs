//! Shared training machinery.
//!
//! Both trainers follow the same session shape:
//! `Init -> Iterating -> {Converged | MaxEpochReached | StalledNoImprovement} -> Saved`.
//! A session that hits a non-finite error aborts before the save step, so no artifact
//! is written for it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::optim::{GradientMethod, MethodState};
use crate::{Dataset, Error, Gradients, Mlp, Result, TrainBuffers, loss};

/// A training strategy that mutates a network in place and persists the result.
pub trait Trainer {
    /// Train `mlp` on `data`, save it to the trainer's artifact and report the session.
    fn train(&self, mlp: &mut Mlp, data: &Dataset) -> Result<TrainReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Why a training session stopped iterating.
pub enum Outcome {
    /// Error reached the target.
    Converged,
    /// The epoch/iteration budget was used up.
    MaxEpochReached,
    /// Error failed to improve enough within the allowed window.
    StalledNoImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch (or iteration) number.
    pub epoch: usize,
    pub error: f32,
}

#[derive(Debug, Clone)]
/// Result of a completed (and saved) training session.
pub struct TrainReport {
    pub outcome: Outcome,
    pub epochs: Vec<EpochReport>,
    pub final_error: f32,
    /// Where the trained network was saved.
    pub artifact: PathBuf,
}

/// Per-call session bookkeeping: epoch counter and error history.
#[derive(Debug, Default)]
pub(crate) struct Session {
    epochs: Vec<EpochReport>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of completed epochs.
    #[inline]
    pub(crate) fn epoch(&self) -> usize {
        self.epochs.len()
    }

    /// Record the error of the epoch that just finished.
    ///
    /// A non-finite error aborts the session.
    pub(crate) fn record(&mut self, error: f32) -> Result<()> {
        let epoch = self.epochs.len() + 1;
        if !error.is_finite() {
            return Err(Error::NumericInstability(format!(
                "training error became {error} at epoch {epoch}"
            )));
        }
        self.epochs.push(EpochReport { epoch, error });
        Ok(())
    }

    pub(crate) fn last_error(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.error)
    }

    /// Persist the network and close the session.
    pub(crate) fn finish(
        self,
        mlp: &Mlp,
        outcome: Outcome,
        artifact: &Path,
    ) -> Result<TrainReport> {
        let final_error = self.last_error().unwrap_or(f32::NAN);
        mlp.save_json(artifact)?;
        info!(
            ?outcome,
            epochs = self.epochs.len(),
            final_error,
            artifact = %artifact.display(),
            "training complete, network saved"
        );

        Ok(TrainReport {
            outcome,
            epochs: self.epochs,
            final_error,
            artifact: artifact.to_path_buf(),
        })
    }
}

/// Check that `data` is non-empty and shaped like `mlp`.
pub(crate) fn check_compatible(mlp: &Mlp, data: &Dataset) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidData(
            "train dataset must not be empty".to_owned(),
        ));
    }
    if data.input_dim() != mlp.input_dim() {
        return Err(Error::InvalidData(format!(
            "train input_dim {} does not match model input_dim {}",
            data.input_dim(),
            mlp.input_dim()
        )));
    }
    if data.target_dim() != mlp.output_dim() {
        return Err(Error::InvalidData(format!(
            "train target_dim {} does not match model output_dim {}",
            data.target_dim(),
            mlp.output_dim()
        )));
    }
    Ok(())
}

/// Reusable state for repeated training passes over one network.
pub(crate) struct Pass {
    method: GradientMethod,
    state: MethodState,
    buffers: TrainBuffers,
    sum: Gradients,
}

impl Pass {
    pub(crate) fn new(mlp: &Mlp, method: GradientMethod) -> Result<Self> {
        Ok(Self {
            method,
            state: method.state(mlp)?,
            buffers: mlp.buffers(),
            sum: mlp.gradients(),
        })
    }

    /// One training pass over `indices`, updating `mlp` once per batch.
    ///
    /// Returns the mean error measured during the pass (before each batch's update).
    pub(crate) fn run(&mut self, mlp: &mut Mlp, data: &Dataset, indices: &[usize]) -> f32 {
        debug_assert!(!indices.is_empty());

        let batch = self.method.batch_len(indices.len());
        let mut total = 0.0_f32;

        for chunk in indices.chunks(batch) {
            self.sum.zero();
            for &idx in chunk {
                let input = data.input(idx);
                let target = data.target(idx);

                mlp.forward(input, &mut self.buffers.scratch);
                total += loss::mse_backward(
                    self.buffers.scratch.output(),
                    target,
                    self.buffers.grads.d_output_mut(),
                );
                mlp.backward(input, &self.buffers.scratch, &mut self.buffers.grads);
                self.sum.accumulate(&self.buffers.grads);
            }

            self.sum.scale(1.0 / chunk.len() as f32);
            self.state.step(mlp, &self.sum);
        }

        let error = total / indices.len() as f32;
        debug!(samples = indices.len(), batch, error, "training pass");
        error
    }
}

/// Mean error of `mlp` over the samples at `indices`. Read-only.
pub(crate) fn mean_error<I>(mlp: &Mlp, data: &Dataset, indices: I) -> f32
where
    I: IntoIterator<Item = usize>,
{
    let mut scratch = mlp.scratch();
    let mut total = 0.0_f32;
    let mut n = 0usize;
    for idx in indices {
        mlp.forward(data.input(idx), &mut scratch);
        total += loss::mse(scratch.output(), data.target(idx));
        n += 1;
    }
    if n == 0 { 0.0 } else { total / n as f32 }
}
