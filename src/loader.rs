//! Dataset loading from delimited text files.
//!
//! Each row holds `input_size` feature values followed by `outputs` one-hot values,
//! decimal-point formatted, no header row.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, info};

use crate::{Dataset, Error, Result};

/// Load a dataset from `path`.
///
/// The file handle is dropped before returning, on success and on every error path.
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    input_size: usize,
    outputs: usize,
) -> Result<Dataset> {
    let p = path.as_ref();
    let file = File::open(p)
        .map_err(|e| Error::Io(format!("failed to open {}: {e}", p.display())))?;

    let ds = read_dataset(BufReader::new(file), input_size, outputs)?;
    info!(
        path = %p.display(),
        samples = ds.len(),
        input_size,
        outputs,
        "dataset loaded"
    );
    Ok(ds)
}

/// Parse a dataset from any reader.
///
/// Fails with [`Error::DatasetFormat`] on the first malformed row; no partial dataset is
/// returned.
pub fn read_dataset<R: Read>(reader: R, input_size: usize, outputs: usize) -> Result<Dataset> {
    if input_size == 0 || outputs == 0 {
        return Err(Error::InvalidConfig(format!(
            "input_size and outputs must be > 0, got {input_size} and {outputs}"
        )));
    }

    let width = input_size + outputs;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut inputs = Vec::new();
    let mut targets = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| Error::DatasetFormat {
            row,
            reason: e.to_string(),
        })?;

        if record.len() != width {
            return Err(Error::DatasetFormat {
                row,
                reason: format!(
                    "expected {width} fields ({input_size} features + {outputs} outputs), got {}",
                    record.len()
                ),
            });
        }

        let start = targets.len();
        for (col, field) in record.iter().enumerate() {
            let value: f32 = field.parse().map_err(|_| Error::DatasetFormat {
                row,
                reason: format!("field {} is not a number: {field:?}", col + 1),
            })?;
            if col < input_size {
                inputs.push(value);
            } else {
                targets.push(value);
            }
        }

        if !is_one_hot(&targets[start..]) {
            return Err(Error::DatasetFormat {
                row,
                reason: "output block is not one-hot".to_owned(),
            });
        }
    }

    debug!(rows = targets.len() / outputs, "parsed dataset rows");
    Dataset::from_flat(inputs, targets, input_size, outputs)
}

/// Read a single feature vector: the first row of a delimited file.
///
/// The length is not checked here; the predictor rejects vectors of the wrong size.
pub fn load_features<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let p = path.as_ref();
    let file = File::open(p)
        .map_err(|e| Error::Io(format!("failed to open {}: {e}", p.display())))?;
    read_features(BufReader::new(file))
}

/// Parse the first row of `reader` as a feature vector.
pub fn read_features<R: Read>(reader: R) -> Result<Vec<f32>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let record = match reader.records().next() {
        Some(result) => result.map_err(|e| Error::DatasetFormat {
            row: 1,
            reason: e.to_string(),
        })?,
        None => {
            return Err(Error::InvalidData("feature file is empty".to_owned()));
        }
    };

    record
        .iter()
        .enumerate()
        .map(|(col, field)| {
            field.parse::<f32>().map_err(|_| Error::DatasetFormat {
                row: 1,
                reason: format!("field {} is not a number: {field:?}", col + 1),
            })
        })
        .collect()
}

/// Exactly one entry equal to 1, every other entry equal to 0.
pub(crate) fn is_one_hot(values: &[f32]) -> bool {
    let mut ones = 0usize;
    for &v in values {
        if v == 1.0 {
            ones += 1;
        } else if v != 0.0 {
            return false;
        }
    }
    ones == 1
}
