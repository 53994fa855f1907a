//! Classification accuracy over a labeled dataset.

use tracing::{debug, info};

use crate::metrics::{accuracy_percent, one_hot_index, positive_argmax};
use crate::{Dataset, Error, Mlp, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub correct: usize,
    pub total: usize,
    /// `correct / total` as a percentage, rounded up to two decimals.
    pub accuracy_percent: f64,
}

impl EvalReport {
    #[inline]
    pub fn incorrect(&self) -> usize {
        self.total - self.correct
    }
}

impl Mlp {
    /// Count how many samples the network classifies correctly.
    ///
    /// The predicted class is the largest strictly positive output. A sample with no
    /// positive output never matches. Read-only: all counters live in this call.
    pub fn evaluate(&self, data: &Dataset) -> Result<EvalReport> {
        if data.is_empty() {
            return Err(Error::InvalidData(
                "evaluation dataset must not be empty".to_owned(),
            ));
        }
        if data.input_dim() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: data.input_dim(),
            });
        }
        if data.target_dim() != self.output_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.output_dim(),
                actual: data.target_dim(),
            });
        }

        let mut scratch = self.scratch();
        let mut correct = 0usize;
        for sample in data.iter() {
            let output = self.forward(sample.features, &mut scratch);
            let predicted = positive_argmax(output);
            if predicted.is_some() && predicted == one_hot_index(sample.ideal) {
                correct += 1;
            }
        }

        let total = data.len();
        let report = EvalReport {
            correct,
            total,
            accuracy_percent: accuracy_percent(correct, total),
        };
        debug!(incorrect = report.incorrect(), "evaluation finished");
        info!("Correct: {correct}/{total}");
        info!("Accuracy: {:.2}%", report.accuracy_percent);
        Ok(report)
    }
}
