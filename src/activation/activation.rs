use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{NnError, Result};

const LEAKY_SLOPE: f64 = 0.01;
const ELU_ALPHA: f64 = 1.0;

/// One entry of the function table.
///
/// The discriminant is the id written to model files, so the order of the
/// variants is part of the on-disk format. Every activation sits at an even
/// index and its derivative directly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationFunction {
    Sigmoid = 0,
    SigmoidDerivative = 1,
    ReLU = 2,
    ReLUDerivative = 3,
    LeakyReLU = 4,
    LeakyReLUDerivative = 5,
    Tanh = 6,
    TanhDerivative = 7,
    Swish = 8,
    SwishDerivative = 9,
    Elu = 10,
    EluDerivative = 11,
    Gelu = 12,
    GeluDerivative = 13,
}

/// The function table, indexed by id.
pub const FUNCTIONS: [ActivationFunction; 14] = [
    ActivationFunction::Sigmoid,
    ActivationFunction::SigmoidDerivative,
    ActivationFunction::ReLU,
    ActivationFunction::ReLUDerivative,
    ActivationFunction::LeakyReLU,
    ActivationFunction::LeakyReLUDerivative,
    ActivationFunction::Tanh,
    ActivationFunction::TanhDerivative,
    ActivationFunction::Swish,
    ActivationFunction::SwishDerivative,
    ActivationFunction::Elu,
    ActivationFunction::EluDerivative,
    ActivationFunction::Gelu,
    ActivationFunction::GeluDerivative,
];

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn gelu_inner(x: f64) -> f64 {
    (2.0 / PI).sqrt() * (x + 0.044715 * x.powi(3))
}

impl ActivationFunction {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Result<ActivationFunction> {
        usize::try_from(id)
            .ok()
            .and_then(|i| FUNCTIONS.get(i).copied())
            .ok_or(NnError::InvalidActivation(id))
    }

    /// Evaluates the table entry at `x`.
    ///
    /// Derivative entries are fed the *post-activation* value by the layers.
    /// That is exact for `SigmoidDerivative` (`y * (1 - y)`) and an
    /// approximation for the others, which evaluate their derivative formula
    /// at whatever value they are given.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::SigmoidDerivative => x * (1.0 - x),
            ActivationFunction::ReLU => x.max(0.0),
            ActivationFunction::ReLUDerivative => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU => if x > 0.0 { x } else { LEAKY_SLOPE * x },
            ActivationFunction::LeakyReLUDerivative => if x > 0.0 { 1.0 } else { LEAKY_SLOPE },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::TanhDerivative => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Swish => x * sigmoid(x),
            ActivationFunction::SwishDerivative => {
                let s = sigmoid(x);
                s + x * s * (1.0 - s)
            }
            ActivationFunction::Elu => if x >= 0.0 { x } else { ELU_ALPHA * (x.exp() - 1.0) },
            ActivationFunction::EluDerivative => if x >= 0.0 { 1.0 } else { ELU_ALPHA * x.exp() },
            ActivationFunction::Gelu => 0.5 * x * (1.0 + gelu_inner(x).tanh()),
            ActivationFunction::GeluDerivative => {
                let t = gelu_inner(x).tanh();
                let d_inner = (2.0 / PI).sqrt() * (1.0 + 3.0 * 0.044715 * x * x);
                0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner
            }
        }
    }
}

/// An (activation, derivative) pair from the table.
///
/// `ActivationKind` is what networks carry and what the trainer iterates;
/// the pair's ids are what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    #[default]
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
    Tanh,
    Swish,
    Elu,
    Gelu,
}

impl ActivationKind {
    /// Every pair in table order: `ALL[k]` owns ids `2k` and `2k + 1`.
    pub const ALL: [ActivationKind; 7] = [
        ActivationKind::Sigmoid,
        ActivationKind::ReLU,
        ActivationKind::LeakyReLU,
        ActivationKind::Tanh,
        ActivationKind::Swish,
        ActivationKind::Elu,
        ActivationKind::Gelu,
    ];

    fn index(self) -> usize {
        // ALL mirrors the declaration order
        self as usize
    }

    pub fn activation(self) -> ActivationFunction {
        FUNCTIONS[self.index() * 2]
    }

    pub fn derivative(self) -> ActivationFunction {
        FUNCTIONS[self.index() * 2 + 1]
    }

    /// Resolves persisted ids back into a pair.
    pub fn from_ids(activation: i32, derivative: i32) -> Result<ActivationKind> {
        let act = ActivationFunction::from_id(activation)?;
        ActivationFunction::from_id(derivative)?;
        if activation % 2 != 0 || derivative != activation + 1 {
            return Err(NnError::UnpairedActivation { activation, derivative });
        }
        Ok(ActivationKind::ALL[act.id() as usize / 2])
    }
}
