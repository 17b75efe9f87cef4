use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::data::stream::{self, DataStream};
use crate::error::{NnError, Result};

/// Maps a user record onto flat network vectors.
pub trait Sample {
    fn input(&self) -> Vec<f64>;
    fn target(&self) -> Vec<f64>;
}

/// Input/target pairs held in memory.
///
/// Every input has the same width, and so does every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub(crate) inputs: Vec<Vec<f64>>,
    pub(crate) targets: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new(inputs: Vec<Vec<f64>>, targets: Vec<Vec<f64>>) -> Result<Dataset> {
        check_pairs(&inputs, &targets)?;
        Ok(Dataset { inputs, targets })
    }

    pub fn from_samples<S: Sample>(samples: &[S]) -> Result<Dataset> {
        let (inputs, targets): (Vec<_>, Vec<_>) =
            samples.iter().map(|s| (s.input(), s.target())).unzip();
        Dataset::new(inputs, targets)
    }

    /// Loads every record of a dataset stream.
    pub fn from_stream(stream: &mut DataStream) -> Result<Dataset> {
        let (inputs, targets) = stream::read_all(stream)?;
        Dataset::new(inputs, targets)
    }

    /// Writes the dataset in the fixed-width stream layout.
    pub fn write_stream(&self, path: impl AsRef<Path>) -> Result<()> {
        stream::write_dataset(path, &self.inputs, &self.targets)
    }

    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    pub fn targets(&self) -> &[Vec<f64>] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Width of each input, or 0 for an empty dataset.
    pub fn input_width(&self) -> usize {
        self.inputs.first().map_or(0, Vec::len)
    }

    pub fn target_width(&self) -> usize {
        self.targets.first().map_or(0, Vec::len)
    }
}

/// Checks that inputs and targets pair up and have uniform widths.
pub(crate) fn check_pairs(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<()> {
    if inputs.len() != targets.len() {
        return Err(NnError::shape("target count", inputs.len(), targets.len()));
    }
    for (rows, context) in [(inputs, "input width"), (targets, "target width")] {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(NnError::shape(context, width, bad.len()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reading {
        celsius: f64,
        humid: bool,
        rain: bool,
    }

    impl Sample for Reading {
        fn input(&self) -> Vec<f64> {
            vec![self.celsius, if self.humid { 1.0 } else { 0.0 }]
        }

        fn target(&self) -> Vec<f64> {
            vec![if self.rain { 1.0 } else { 0.0 }]
        }
    }

    #[test]
    fn samples_map_to_vectors() {
        let data = Dataset::from_samples(&[
            Reading { celsius: 21.5, humid: true, rain: true },
            Reading { celsius: 30.0, humid: false, rain: false },
        ])
        .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.inputs()[0], vec![21.5, 1.0]);
        assert_eq!(data.targets()[1], vec![0.0]);
        assert_eq!((data.input_width(), data.target_width()), (2, 1));
    }

    #[test]
    fn ragged_or_unpaired_rows_are_rejected() {
        assert!(Dataset::new(vec![vec![1.0]], vec![]).is_err());
        assert!(Dataset::new(vec![vec![1.0], vec![1.0, 2.0]], vec![vec![0.0], vec![0.0]]).is_err());
        assert!(Dataset::new(vec![vec![1.0], vec![2.0]], vec![vec![0.0], vec![]]).is_err());
    }

    #[test]
    fn stream_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gates.bin");
        let data = crate::data::gates::logic_gates();
        data.write_stream(&path).unwrap();
        let mut stream = DataStream::open(&path, 3, 1).unwrap();
        assert_eq!(Dataset::from_stream(&mut stream).unwrap(), data);
    }
}
