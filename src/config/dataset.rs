//! Dataset identities and their integration-mode shrink policies
//!
//! Each known dataset carries its override policy as data, so the override
//! pipeline applies a table entry instead of branching on names.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::metrics::Split;

/// Closed set of dataset identities with integration-mode policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatasetKind {
    /// ImageNet 1K
    I1K,
    /// CIFAR-10
    Cifar10,
    /// MNIST digits
    Mnist,
    /// Moby Dick character corpus
    MobyDick,
    /// Any dataset without an integration policy
    Custom(String),
}

impl DatasetKind {
    /// Identity string used in descriptions.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::I1K => "I1K",
            Self::Cifar10 => "CIFAR10",
            Self::Mnist => "MNIST",
            Self::MobyDick => "MOBYDICK",
            Self::Custom(name) => name,
        }
    }

    /// Integration-mode shrinkage applied to this dataset.
    #[must_use]
    pub const fn shrink_policy(&self) -> ShrinkPolicy {
        match self {
            Self::I1K => ShrinkPolicy {
                num_train_samples: Some(2),
                num_valid_samples: Some(1),
                disable_augmentation: true,
                num_epochs: Some(2),
                drop_split: Some(Split::Test),
                sample_pct: None,
            },
            Self::Cifar10 | Self::Mnist => ShrinkPolicy {
                num_epochs: Some(5),
                drop_split: Some(Split::Validation),
                sample_pct: Some(10.0),
                ..ShrinkPolicy::NONE
            },
            Self::MobyDick => ShrinkPolicy {
                num_epochs: Some(5),
                drop_split: Some(Split::Validation),
                ..ShrinkPolicy::NONE
            },
            Self::Custom(_) => ShrinkPolicy::NONE,
        }
    }
}

impl From<String> for DatasetKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "I1K" => Self::I1K,
            "CIFAR10" => Self::Cifar10,
            "MNIST" => Self::Mnist,
            "MOBYDICK" => Self::MobyDick,
            _ => Self::Custom(name),
        }
    }
}

impl From<DatasetKind> for String {
    fn from(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forced values for an integration run on a particular dataset.
///
/// Every field is absolute (a forced value, never a relative change), which is
/// what makes re-applying the policy a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkPolicy {
    /// Forced training sample count
    pub num_train_samples: Option<u64>,
    /// Forced validation sample count
    pub num_valid_samples: Option<u64>,
    /// Turn data augmentation off
    pub disable_augmentation: bool,
    /// Forced epoch count
    pub num_epochs: Option<u32>,
    /// Metric set removed from the run
    pub drop_split: Option<Split>,
    /// Forced data sampling rate, in percent
    pub sample_pct: Option<f64>,
}

impl ShrinkPolicy {
    /// Policy that changes nothing.
    pub const NONE: Self = Self {
        num_train_samples: None,
        num_valid_samples: None,
        disable_augmentation: false,
        num_epochs: None,
        drop_split: None,
        sample_pct: None,
    };
}

/// Dataset block of an experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset identity
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    /// Percentage of the data to sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_pct: Option<f64>,
    /// Training sample count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_train_samples: Option<u64>,
    /// Validation sample count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_valid_samples: Option<u64>,
    /// Data augmentation toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augment: Option<bool>,
    /// Dataset-specific tunables passed through to the experiment
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl DatasetConfig {
    /// Dataset block with only an identity.
    #[must_use]
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            kind,
            sample_pct: None,
            num_train_samples: None,
            num_valid_samples: None,
            augment: None,
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_kind_from_identity() {
        assert_eq!(DatasetKind::from("CIFAR10".to_string()), DatasetKind::Cifar10);
        assert_eq!(DatasetKind::from("I1K".to_string()), DatasetKind::I1K);
        assert_eq!(
            DatasetKind::from("cifar10".to_string()),
            DatasetKind::Custom("cifar10".to_string())
        );
    }

    #[test]
    fn test_cifar_gets_epoch_and_sampling_rules() {
        let policy = DatasetKind::Cifar10.shrink_policy();
        assert_eq!(policy.num_epochs, Some(5));
        assert_eq!(policy.sample_pct, Some(10.0));
        assert_eq!(policy.drop_split, Some(Split::Validation));
    }

    #[test]
    fn test_mobydick_has_no_sampling_rule() {
        let policy = DatasetKind::MobyDick.shrink_policy();
        assert_eq!(policy.num_epochs, Some(5));
        assert_eq!(policy.sample_pct, None);
    }

    #[test]
    fn test_custom_dataset_policy_is_noop() {
        assert_eq!(
            DatasetKind::Custom("SVHN".into()).shrink_policy(),
            ShrinkPolicy::NONE
        );
    }

    #[test]
    fn test_dataset_config_keeps_extra_fields() {
        let config: DatasetConfig =
            serde_yaml::from_str("type: MNIST\nsample_pct: 50\nbatch_size: 128\n").unwrap();
        assert_eq!(config.kind, DatasetKind::Mnist);
        assert_eq!(config.sample_pct, Some(50.0));
        assert!(config.extra.contains_key("batch_size"));
    }
}
