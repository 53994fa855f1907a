//! Single-vector inference against a persisted model.

use std::path::Path;

use tracing::info;

use crate::metrics::argmax;
use crate::{Error, LanguageTable, Mlp, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Winning output class.
    pub index: usize,
    pub label: String,
    /// Raw output value of the winning class.
    pub confidence: f32,
}

/// A loaded network paired with its language table.
#[derive(Debug, Clone)]
pub struct Predictor {
    mlp: Mlp,
    languages: LanguageTable,
}

impl Predictor {
    /// Load the artifact at `path` and check it matches the expected dimensions.
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_size: usize,
        outputs: usize,
        languages: LanguageTable,
    ) -> Result<Self> {
        if languages.len() != outputs {
            return Err(Error::InvalidConfig(format!(
                "language table has {} labels, configured for {outputs} outputs",
                languages.len()
            )));
        }
        let mlp = Mlp::load_json(path)?;
        if mlp.input_dim() != input_size || mlp.output_dim() != outputs {
            return Err(Error::ModelLoad(format!(
                "model is {}->{}, expected {input_size}->{outputs}",
                mlp.input_dim(),
                mlp.output_dim()
            )));
        }
        Self::from_model(mlp, languages)
    }

    /// Predict with an in-memory network.
    ///
    /// A network whose output count differs from the table is unusable: [`Error::ModelLoad`].
    pub fn from_model(mlp: Mlp, languages: LanguageTable) -> Result<Self> {
        if languages.len() != mlp.output_dim() {
            return Err(Error::ModelLoad(format!(
                "language table has {} labels, model has {} outputs",
                languages.len(),
                mlp.output_dim()
            )));
        }
        Ok(Self { mlp, languages })
    }

    #[inline]
    pub fn model(&self) -> &Mlp {
        &self.mlp
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.mlp.input_dim()
    }

    /// Classify one feature vector.
    ///
    /// The length is checked before any forward pass. The winner is the first maximal
    /// output; negative outputs are candidates too.
    pub fn predict(&self, features: &[f32]) -> Result<Prediction> {
        if features.len() != self.mlp.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.mlp.input_dim(),
                actual: features.len(),
            });
        }

        let mut scratch = self.mlp.scratch();
        let output = self.mlp.forward(features, &mut scratch);
        let index = argmax(output);
        let label = self
            .languages
            .label(index)
            .ok_or_else(|| Error::InvalidConfig(format!("no language label for class {index}")))?
            .to_owned();

        info!(index, %label, "Predicted language: {label}");
        Ok(Prediction {
            index,
            label,
            confidence: output[index],
        })
    }
}
