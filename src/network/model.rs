use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Deserialize};

use crate::activation::ActivationKind;
use crate::data::dataset::check_pairs;
use crate::data::{DataStream, Dataset};
use crate::error::{NnError, Result};

/// How fresh weights are drawn when a network is built or reseeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// `uniform(0, 1) * 2 - 1`
    #[default]
    Uniform,
    /// Mean of 16 uniform draws, scaled to `[-1, 1]`.
    PinkNoise,
}

impl WeightInit {
    pub fn is_pink(self) -> bool {
        self == WeightInit::PinkNoise
    }
}

/// Generator for weights drawn from `seed`; the same seed always yields the
/// same weights.
pub(crate) fn seeded_rng(seed: i32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(u64::from(seed as u32))
}

fn join_values(values: &[f64]) -> String {
    values.iter().map(|v| format!("{v:.2}")).collect::<Vec<_>>().join(", ")
}

/// The contract both network variants share and the trainer searches over.
pub trait Model: Sized + Send + Sync {
    fn seed(&self) -> i32;

    fn learning_rate(&self) -> f64;

    fn activation(&self) -> ActivationKind;

    fn set_activation(&mut self, kind: ActivationKind);

    /// A network with the same topology, learning rate and activation whose
    /// weights are regenerated from `seed`.
    fn reseeded(&self, seed: i32) -> Result<Self>;

    /// Draws new weights from the network's own generator.
    fn reset_weights(&mut self, pink: bool) -> Result<()>;

    /// Runs `input` through the network and returns the output buffer.
    fn forward(&mut self, input: &[f64]) -> Result<&[f64]>;

    /// Trains on a single sample for `epochs` steps.
    fn train(&mut self, input: &[f64], target: &[f64], epochs: usize) -> Result<()>;

    /// Writes the network in the binary model format.
    fn save<W: Write>(&mut self, writer: &mut W) -> Result<()>;

    /// Reads a network written by [`save`](Model::save).
    fn load<R: Read>(reader: &mut R) -> Result<Self>;

    /// Each epoch trains every sample once, in order.
    fn train_batch(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], epochs: usize) -> Result<()> {
        check_pairs(inputs, targets)?;
        for _ in 0..epochs {
            for (input, target) in inputs.iter().zip(targets) {
                self.train(input, target, 1)?;
            }
        }
        Ok(())
    }

    fn train_dataset(&mut self, data: &Dataset, epochs: usize) -> Result<()> {
        self.train_batch(data.inputs(), data.targets(), epochs)
    }

    fn train_stream(&mut self, stream: &mut DataStream, epochs: usize) -> Result<()> {
        for _ in 0..epochs {
            for i in 0..stream.count() {
                let (input, target) = stream.read_entry(i)?;
                self.train(&input, &target, 1)?;
            }
        }
        Ok(())
    }

    /// Sum of absolute output errors for one sample.
    fn test(&mut self, input: &[f64], targets: &[f64]) -> Result<f64> {
        let output = self.forward(input)?;
        if output.len() != targets.len() {
            return Err(NnError::shape("test targets", output.len(), targets.len()));
        }
        Ok(output.iter().zip(targets).map(|(o, t)| (t - o).abs()).sum())
    }

    /// Summed error over every sample; an empty batch scores `+∞`.
    fn test_batch(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<f64> {
        check_pairs(inputs, targets)?;
        if inputs.is_empty() {
            return Ok(f64::INFINITY);
        }
        let mut error = 0.0;
        for (input, target) in inputs.iter().zip(targets) {
            error += self.test(input, target)?;
        }
        Ok(error)
    }

    fn test_dataset(&mut self, data: &Dataset) -> Result<f64> {
        self.test_batch(data.inputs(), data.targets())
    }

    fn test_stream(&mut self, stream: &mut DataStream) -> Result<f64> {
        if stream.is_empty() {
            return Ok(f64::INFINITY);
        }
        let mut error = 0.0;
        for i in 0..stream.count() {
            let (input, target) = stream.read_entry(i)?;
            error += self.test(&input, &target)?;
        }
        Ok(error)
    }

    /// Writes one `{inputs} >> {outputs}` line per input, values to two
    /// decimals.
    fn print_batch<W: Write>(&mut self, inputs: &[Vec<f64>], out: &mut W) -> Result<()> {
        for input in inputs {
            let output = self.forward(input)?;
            writeln!(out, "{{{}}} >> {{{}}}", join_values(input), join_values(output))?;
        }
        Ok(())
    }

    fn save_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::load(&mut reader)
    }
}
