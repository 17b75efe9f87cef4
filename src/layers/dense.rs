use rand::Rng;

use crate::activation::ActivationFunction;
use crate::error::{NnError, Result};
use crate::math::{Matrix, MatrixStore, WeightStorage};

/// Uniform draws averaged per weight in pink-noise initialisation.
pub const PINK_DRAWS: usize = 16;

/// A hidden-node vector with the matrix feeding it (`inputs × hidden`) and
/// the matrix feeding from it (`hidden × outputs`).
///
/// Every weight access goes through whole rows of the storage, so the
/// out-of-core variant costs one seek per row touched.
#[derive(Debug)]
pub struct Layer<M: WeightStorage = Matrix> {
    weights_in: M,
    weights_out: M,
    hidden: Vec<f64>,
}

/// Layer whose weights live in backing files instead of memory.
pub type BigLayer = Layer<MatrixStore>;

impl<M: WeightStorage> Layer<M> {
    /// Allocates a zero-weight layer.
    pub fn new(inputs: usize, nodes: usize, outputs: usize) -> Result<Layer<M>> {
        if inputs == 0 || nodes == 0 || outputs == 0 {
            return Err(NnError::InvalidTopology(format!(
                "layer {inputs}x{nodes}x{outputs} has an empty dimension"
            )));
        }
        Layer::from_weights(M::allocate(inputs, nodes)?, M::allocate(nodes, outputs)?)
    }

    /// Wraps existing weight matrices; `weights_in.cols` must equal `weights_out.rows`.
    pub fn from_weights(weights_in: M, weights_out: M) -> Result<Layer<M>> {
        if weights_in.cols() != weights_out.rows() {
            return Err(NnError::InvalidTopology(format!(
                "input matrix has {} columns but output matrix has {} rows",
                weights_in.cols(),
                weights_out.rows()
            )));
        }
        let hidden = vec![0.0; weights_in.cols()];
        Ok(Layer { weights_in, weights_out, hidden })
    }

    /// Zero-weight layer with the same shape as `other`.
    pub fn with_shape_of<N: WeightStorage>(other: &Layer<N>) -> Result<Layer<M>> {
        Layer::new(other.input_size(), other.hidden_size(), other.output_size())
    }

    pub fn input_size(&self) -> usize {
        self.weights_in.rows()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden.len()
    }

    pub fn output_size(&self) -> usize {
        self.weights_out.cols()
    }

    /// Hidden activations from the last pass.
    pub fn hidden(&self) -> &[f64] {
        &self.hidden
    }

    pub fn weights_in(&self) -> &M {
        &self.weights_in
    }

    pub fn weights_out(&self) -> &M {
        &self.weights_out
    }

    pub fn weights_in_mut(&mut self) -> &mut M {
        &mut self.weights_in
    }

    pub fn weights_out_mut(&mut self) -> &mut M {
        &mut self.weights_out
    }

    /// Refills both matrices from `rng`, input matrix first, row-major.
    ///
    /// Plain mode draws `uniform(0, 1) * 2 - 1`. Pink mode averages
    /// [`PINK_DRAWS`] uniform draws before scaling, which pulls the initial
    /// weights towards zero.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R, pink: bool) -> Result<()> {
        randomize(&mut self.weights_in, rng, pink)?;
        randomize(&mut self.weights_out, rng, pink)
    }

    /// `hidden[i] = activation(Σ_j input[j] * weights_in[j, i])`
    pub fn pass_input(&mut self, input: &[f64], activation: ActivationFunction) -> Result<()> {
        if input.len() != self.input_size() {
            return Err(NnError::shape("layer input", self.input_size(), input.len()));
        }
        self.hidden.fill(0.0);
        for (j, &x) in input.iter().enumerate() {
            let row = self.weights_in.row(j)?;
            for (sum, &w) in self.hidden.iter_mut().zip(row) {
                *sum += x * w;
            }
        }
        for h in &mut self.hidden {
            *h = activation.apply(*h);
        }
        Ok(())
    }

    /// `output[i] = activation(Σ_j hidden[j] * weights_out[j, i])`
    pub fn pass_output(&mut self, output: &mut [f64], activation: ActivationFunction) -> Result<()> {
        if output.len() != self.output_size() {
            return Err(NnError::shape("layer output", self.output_size(), output.len()));
        }
        output.fill(0.0);
        for (j, &h) in self.hidden.iter().enumerate() {
            let row = self.weights_out.row(j)?;
            for (sum, &w) in output.iter_mut().zip(row) {
                *sum += h * w;
            }
        }
        for o in output.iter_mut() {
            *o = activation.apply(*o);
        }
        Ok(())
    }

    pub fn pass(&mut self, input: &[f64], output: &mut [f64], activation: ActivationFunction) -> Result<()> {
        self.pass_input(input, activation)?;
        self.pass_output(output, activation)
    }

    /// One gradient step given the deltas at this layer's output.
    ///
    /// Hidden deltas are taken against the pre-update output weights. The
    /// derivative is evaluated on the post-activation hidden values, for
    /// every activation kind.
    pub fn update_weights(
        &mut self,
        inputs: &[f64],
        output_deltas: &[f64],
        derivative: ActivationFunction,
        learning_rate: f64,
    ) -> Result<()> {
        if inputs.len() != self.input_size() {
            return Err(NnError::shape("update inputs", self.input_size(), inputs.len()));
        }
        if output_deltas.len() != self.output_size() {
            return Err(NnError::shape("output deltas", self.output_size(), output_deltas.len()));
        }

        let mut hidden_deltas = vec![0.0; self.hidden.len()];
        for (i, delta) in hidden_deltas.iter_mut().enumerate() {
            let h = self.hidden[i];
            let mut error = 0.0;
            // Row i of the output matrix only feeds hidden delta i.
            self.weights_out.update_row(i, |row| {
                for (&w, &d) in row.iter().zip(output_deltas) {
                    error += d * w;
                }
                for (w, &d) in row.iter_mut().zip(output_deltas) {
                    *w += learning_rate * d * h;
                }
            })?;
            *delta = error * derivative.apply(h);
        }

        for (i, &x) in inputs.iter().enumerate() {
            self.weights_in.update_row(i, |row| {
                for (w, &d) in row.iter_mut().zip(&hidden_deltas) {
                    *w += learning_rate * d * x;
                }
            })?;
        }
        Ok(())
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, pink: bool) -> f64 {
    if pink {
        let sum: f64 = (0..PINK_DRAWS).map(|_| rng.gen::<f64>()).sum();
        sum / PINK_DRAWS as f64 * 2.0 - 1.0
    } else {
        rng.gen::<f64>() * 2.0 - 1.0
    }
}

fn randomize<M: WeightStorage, R: Rng + ?Sized>(weights: &mut M, rng: &mut R, pink: bool) -> Result<()> {
    for i in 0..weights.rows() {
        weights.update_row(i, |row| {
            for w in row.iter_mut() {
                *w = draw(rng, pink);
            }
        })?;
    }
    Ok(())
}
