//! Model block: layer stack, epoch count, state persistence paths

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Layer type declared in a model's layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    /// Input layer
    Data,
    /// Dense layer
    FullyConnected {
        /// Output units
        nout: u32,
    },
    /// Convolutional layer
    Convolution {
        /// Output feature maps
        nofm: u32,
        /// Filter edge length
        fshape: u32,
    },
    /// Pooling layer
    Pooling {
        /// Pooling window edge length
        fshape: u32,
    },
    /// Randomly zeroes activations during training
    Dropout {
        /// Keep probability
        keep: f64,
    },
    /// Cost layer
    Cost,
    /// Layer implemented by the experiment itself
    Custom {
        /// Implementation name
        class: String,
        /// Whether the layer draws random numbers
        #[serde(default)]
        stochastic: bool,
    },
}

/// A named layer in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Layer name
    pub name: String,
    /// Layer type and parameters
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl LayerConfig {
    /// Create a named layer.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Whether the layer makes a run non-deterministic.
    #[must_use]
    pub const fn is_stochastic(&self) -> bool {
        match &self.kind {
            LayerKind::Dropout { .. } => true,
            LayerKind::Custom { stochastic, .. } => *stochastic,
            _ => false,
        }
    }
}

/// Epoch count used when the model block omits `num_epochs`.
pub const DEFAULT_NUM_EPOCHS: u32 = 10;

const fn default_num_epochs() -> u32 {
    DEFAULT_NUM_EPOCHS
}

/// Model block of an experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ordered layer stack
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    /// Training epochs
    #[serde(default = "default_num_epochs")]
    pub num_epochs: u32,
    /// Where to persist model state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_path: Option<PathBuf>,
    /// Where to restore model state from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deserialized_path: Option<PathBuf>,
    /// Persist every N epochs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialize_schedule: Option<u32>,
}

impl ModelConfig {
    /// Whether any state persistence is configured.
    #[must_use]
    pub const fn touches_disk(&self) -> bool {
        self.serialized_path.is_some()
            || self.deserialized_path.is_some()
            || self.serialize_schedule.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_stack_deserialize() {
        let yaml = r"
layers:
  - name: input
    type: data
  - name: fc1
    type: fully_connected
    nout: 100
  - name: drop1
    type: dropout
    keep: 0.5
  - name: noise
    type: custom
    class: GaussianNoise
    stochastic: true
num_epochs: 10
serialized_path: /tmp/model.prm
";
        let model: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(model.layers.len(), 4);
        assert_eq!(model.num_epochs, 10);
        assert!(model.touches_disk());

        let stochastic: Vec<&str> = model
            .layers
            .iter()
            .filter(|l| l.is_stochastic())
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(stochastic, vec!["drop1", "noise"]);
    }

    #[test]
    fn test_num_epochs_defaults_when_omitted() {
        let model: ModelConfig =
            serde_yaml::from_str("layers:\n  - {name: fc, type: fully_connected, nout: 10}\n")
                .unwrap();
        assert_eq!(model.num_epochs, DEFAULT_NUM_EPOCHS);
        assert_eq!(model.layers.len(), 1);
    }

    #[test]
    fn test_custom_layer_defaults_to_deterministic() {
        let layer: LayerConfig =
            serde_yaml::from_str("name: scale\ntype: custom\nclass: Scale\n").unwrap();
        assert!(!layer.is_stochastic());
    }
}
