use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-neuron nonlinearity applied to the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    #[default]
    Sigmoid,
    Relu,
    Tanh,
}

impl ActivationKind {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationKind::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationKind::Relu => x.max(0.0),
            ActivationKind::Tanh => x.tanh(),
        }
    }

    /// Derivative of the activation, written in terms of its own output `a = f(z)` rather than
    /// the pre-activation `z`.
    ///
    /// Backward and update passes only keep post-activation values, so this is what they call.
    /// Do not pass `z` here: `sigmoid'(z)` is `a * (1 - a)`, not `z * (1 - z)`.
    pub fn derivative_at_output(self, a: f64) -> f64 {
        match self {
            // y = sigmoid(x)
            // dy/dx = y * (1 - y)
            ActivationKind::Sigmoid => a * (1.0 - a),
            // y = relu(x) = max(0, x)
            // dy/dx = 1 if y > 0, 0 otherwise
            ActivationKind::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            // y = tanh(x)
            // dy/dx = 1 - y^2
            ActivationKind::Tanh => 1.0 - a * a,
        }
    }
}

impl Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationKind::Sigmoid => write!(f, "sigmoid"),
            ActivationKind::Relu => write!(f, "relu"),
            ActivationKind::Tanh => write!(f, "tanh"),
        }
    }
}

impl FromStr for ActivationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(ActivationKind::Sigmoid),
            "relu" => Ok(ActivationKind::Relu),
            "tanh" => Ok(ActivationKind::Tanh),
            other => Err(ConfigError::UnknownActivation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_closed_forms() {
        assert_abs_diff_eq!(ActivationKind::Sigmoid.apply(0.0), 0.5);
        assert_abs_diff_eq!(
            ActivationKind::Sigmoid.apply(0.6),
            1.0 / (1.0 + (-0.6f64).exp())
        );
        assert_eq!(ActivationKind::Relu.apply(-3.0), 0.0);
        assert_eq!(ActivationKind::Relu.apply(2.5), 2.5);
        assert_abs_diff_eq!(ActivationKind::Tanh.apply(0.5), 0.5f64.tanh());
    }

    #[test]
    fn test_derivative_takes_output_not_input() {
        let z = 0.6;
        let a = ActivationKind::Sigmoid.apply(z);
        assert_abs_diff_eq!(ActivationKind::Sigmoid.derivative_at_output(a), a * (1.0 - a));

        let a = ActivationKind::Tanh.apply(z);
        assert_abs_diff_eq!(ActivationKind::Tanh.derivative_at_output(a), 1.0 - a * a);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let h = 1e-6;
        for kind in [ActivationKind::Sigmoid, ActivationKind::Tanh] {
            for z in [-1.5, -0.2, 0.0, 0.7, 2.0] {
                let numeric = (kind.apply(z + h) - kind.apply(z - h)) / (2.0 * h);
                let analytic = kind.derivative_at_output(kind.apply(z));
                assert_abs_diff_eq!(numeric, analytic, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_relu_derivative() {
        assert_eq!(ActivationKind::Relu.derivative_at_output(0.0), 0.0);
        assert_eq!(ActivationKind::Relu.derivative_at_output(0.3), 1.0);
    }

    #[test]
    fn test_parse_and_display() {
        for kind in [
            ActivationKind::Sigmoid,
            ActivationKind::Relu,
            ActivationKind::Tanh,
        ] {
            assert_eq!(kind.to_string().parse::<ActivationKind>().unwrap(), kind);
        }
        assert_eq!(" TanH ".parse::<ActivationKind>().unwrap(), ActivationKind::Tanh);
        assert!(matches!(
            "softmax".parse::<ActivationKind>(),
            Err(ConfigError::UnknownActivation(s)) if s == "softmax"
        ));
    }
}
