//! Model serialization/deserialization.
//!
//! This module defines a versioned, stable on-disk format for `Mlp`: the topology
//! descriptors followed by one weight matrix per connection.
//!
//! Design notes:
//! - We do NOT directly serialize internal `Mlp`/`Layer` structs, to keep the
//!   file format stable even if internal representation changes.
//! - All deserialization validates dimensions, parameter lengths, and that
//!   all parameters are finite. Every failure is reported as [`Error::ModelLoad`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::topology::{LayerSpec, Topology};
use crate::{Activation, Error, Layer, Mlp, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedModel {
    pub format_version: u32,
    pub topology: Vec<SerializedLayerSpec>,
    pub connections: Vec<SerializedConnection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayerSpec {
    pub activation: SerializedActivation,
    pub neurons: usize,
    pub has_bias: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedConnection {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major (out_dim, in_dim).
    pub weights: Vec<f32>,
    /// `None` when the source layer carries no bias.
    pub biases: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedActivation {
    Tanh,
    Relu,
    LeakyRelu { alpha: f32 },
    Sigmoid,
    Identity,
    Softmax,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::Tanh => SerializedActivation::Tanh,
            Activation::ReLU => SerializedActivation::Relu,
            Activation::LeakyReLU { alpha } => SerializedActivation::LeakyRelu { alpha },
            Activation::Sigmoid => SerializedActivation::Sigmoid,
            Activation::Identity => SerializedActivation::Identity,
            Activation::Softmax => SerializedActivation::Softmax,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::Tanh => Activation::Tanh,
            SerializedActivation::Relu => Activation::ReLU,
            SerializedActivation::LeakyRelu { alpha } => Activation::LeakyReLU { alpha },
            SerializedActivation::Sigmoid => Activation::Sigmoid,
            SerializedActivation::Identity => Activation::Identity,
            SerializedActivation::Softmax => Activation::Softmax,
        }
    }
}

impl SerializedModel {
    /// Check the structure without building a network.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::ModelLoad(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.topology.len() < 2 {
            return Err(Error::ModelLoad(
                "serialized model must have at least two layers".to_owned(),
            ));
        }
        if self.connections.len() + 1 != self.topology.len() {
            return Err(Error::ModelLoad(format!(
                "{} layers need {} connections, found {}",
                self.topology.len(),
                self.topology.len() - 1,
                self.connections.len()
            )));
        }

        for (i, (conn, pair)) in self
            .connections
            .iter()
            .zip(self.topology.windows(2))
            .enumerate()
        {
            let (from, to) = (&pair[0], &pair[1]);
            if conn.in_dim != from.neurons || conn.out_dim != to.neurons {
                return Err(Error::ModelLoad(format!(
                    "connection {i} is {}x{}, topology expects {}x{}",
                    conn.in_dim, conn.out_dim, from.neurons, to.neurons
                )));
            }
            if conn.biases.is_some() != from.has_bias {
                return Err(Error::ModelLoad(format!(
                    "connection {i} biases do not match layer {i} has_bias={}",
                    from.has_bias
                )));
            }
            if conn.biases.as_ref().is_some_and(|b| b.len() != conn.out_dim) {
                return Err(Error::ModelLoad(format!(
                    "connection {i} biases length does not match out_dim {}",
                    conn.out_dim
                )));
            }
        }

        Ok(())
    }
}

impl From<&Mlp> for SerializedModel {
    fn from(model: &Mlp) -> Self {
        let topology = model
            .topology()
            .layers()
            .iter()
            .map(|spec| SerializedLayerSpec {
                activation: spec.activation.into(),
                neurons: spec.neurons,
                has_bias: spec.has_bias,
            })
            .collect();

        let connections = model
            .layers()
            .iter()
            .map(SerializedConnection::from)
            .collect();

        Self {
            format_version: MODEL_FORMAT_VERSION,
            topology,
            connections,
        }
    }
}

impl From<&Layer> for SerializedConnection {
    fn from(layer: &Layer) -> Self {
        Self {
            in_dim: layer.in_dim(),
            out_dim: layer.out_dim(),
            weights: layer.weights().to_vec(),
            biases: layer.has_bias().then(|| layer.biases().to_vec()),
        }
    }
}

impl TryFrom<SerializedModel> for Mlp {
    type Error = Error;

    fn try_from(value: SerializedModel) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let specs: Vec<LayerSpec> = value
            .topology
            .iter()
            .map(|s| LayerSpec::new(s.activation.into(), s.neurons, s.has_bias))
            .collect();

        let mut layers = Vec::with_capacity(value.connections.len());
        for (i, (conn, to)) in value.connections.into_iter().zip(&specs[1..]).enumerate() {
            // Layer::from_parts performs shape validation and finiteness checks.
            let layer = Layer::from_parts(
                conn.in_dim,
                conn.out_dim,
                to.activation,
                conn.weights,
                conn.biases.unwrap_or_default(),
            )
            .map_err(|e| Error::ModelLoad(format!("connection {i} invalid: {e}")))?;
            layers.push(layer);
        }

        let topology =
            Topology::new(specs).map_err(|e| Error::ModelLoad(format!("invalid topology: {e}")))?;
        Mlp::from_parts(topology, layers).map_err(|e| Error::ModelLoad(e.to_string()))
    }
}

impl Mlp {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedModel::from(self);
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Serialize the model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedModel::from(self);
        serde_json::to_string(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedModel = serde_json::from_str(s)
            .map_err(|e| Error::ModelLoad(format!("failed to parse model json: {e}")))?;
        ser.try_into()
    }

    /// Save the model to a JSON file (pretty-printed).
    ///
    /// The whole document is rendered before the file is opened, so a failure never leaves
    /// a truncated artifact behind. Networks holding non-finite parameters are refused.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.is_finite() {
            return Err(Error::NumericInstability(
                "refusing to save a network with non-finite parameters".to_owned(),
            ));
        }
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, &s)
            .map_err(|e| Error::Io(format!("failed to write {}: {e}", p.display())))?;
        debug!(path = %p.display(), bytes = s.len(), "model saved");
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::ModelLoad(format!("failed to read {}: {e}", p.display())))?;
        let mlp = Self::from_json_str(&s)?;
        info!(
            path = %p.display(),
            input_dim = mlp.input_dim(),
            output_dim = mlp.output_dim(),
            "model loaded"
        );
        Ok(mlp)
    }
}
