//! Data layer configuration format.

use crate::{common::*, error::BoxDataError, label_encoder::Side};

pub use data::*;
pub use transform::*;

/// The side used when no side is configured.
pub const DEFAULT_SIDE: usize = 13;

/// The main data layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Validate the configuration against the number of label outputs the
    /// consumer expects, if it has an expectation.
    pub fn check(&self, label_outputs: Option<usize>) -> Result<()> {
        let Self {
            data, transform, ..
        } = self;

        ensure!(
            data.prefetch.get() >= 2,
            "prefetch must be at least 2, but get {}",
            data.prefetch
        );
        ensure!(
            data.encoded_channels == 1 || data.encoded_channels == 3,
            "encoded_channels must be 1 or 3, but get {}",
            data.encoded_channels
        );

        // zero label outputs selects the image-only mode
        if let Some(outputs) = label_outputs.filter(|&outputs| outputs > 0) {
            let sides = data.sides().len();
            if sides != outputs {
                bail!(BoxDataError::SideCountMismatch { sides, outputs });
            }
        }

        transform.check()?;
        Ok(())
    }
}

/// Diagnostic logging options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// If set, log the average batch timing per this number of batches.
    #[serde(default)]
    pub timing_report_interval: Option<NonZeroUsize>,
}

mod data {
    use super::*;

    /// Record source and batch layout options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DataConfig {
        pub source: StoreConfig,
        pub batch_size: NonZeroUsize,
        /// The default number of label slots per item.
        pub num_label: NonZeroUsize,
        /// The label outputs. A single side 13 is used if it is empty.
        #[serde(default)]
        pub sides: Vec<SideConfig>,
        /// The number of batch buffers in the prefetching pool.
        #[serde(default = "default_prefetch")]
        pub prefetch: NonZeroUsize,
        /// The number of channels encoded images are converted to.
        #[serde(default = "default_encoded_channels")]
        pub encoded_channels: usize,
    }

    impl DataConfig {
        /// Resolve the configured sides and their label capacity.
        pub fn sides(&self) -> Vec<Side> {
            if self.sides.is_empty() {
                return vec![Side::new(DEFAULT_SIDE, self.num_label)];
            }

            self.sides
                .iter()
                .map(|conf| Side::new(conf.side, conf.max_labels.unwrap_or(self.num_label)))
                .collect()
        }
    }

    /// One label output.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SideConfig {
        pub side: usize,
        /// Overrides `num_label` for this side.
        #[serde(default)]
        pub max_labels: Option<NonZeroUsize>,
    }

    /// The record store location.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StoreConfig {
        pub backend: StoreBackend,
        pub path: PathBuf,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum StoreBackend {
        /// Read record files from the directory on demand.
        Directory,
        /// Load the whole directory into memory when opened.
        Memory,
    }

    fn default_prefetch() -> NonZeroUsize {
        NonZeroUsize::new(3).unwrap()
    }

    fn default_encoded_channels() -> usize {
        3
    }
}

mod transform {
    use super::*;

    /// Image augmentation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TransformConfig {
        /// The factor multiplied to pixel values after mean subtraction.
        #[serde(default = "default_scale")]
        pub scale: R64,
        /// Per-channel mean values. A single value applies to all channels.
        #[serde(default)]
        pub mean_values: Vec<R64>,
        /// If set, crop a square patch of this size.
        #[serde(default)]
        pub crop_size: Option<NonZeroUsize>,
        /// If set, crop at a random location, otherwise at the center.
        #[serde(default = "default_random_crop")]
        pub random_crop: bool,
        /// If set, flip images horizontally with probability 0.5.
        #[serde(default)]
        pub mirror: bool,
        /// Boxes with visible fraction not above this ratio after cropping
        /// are dropped.
        #[serde(default = "default_min_box_overlap")]
        pub min_box_overlap: R64,
        /// The random seed. It is drawn from entropy if not set.
        #[serde(default)]
        pub seed: Option<u64>,
    }

    impl TransformConfig {
        pub fn check(&self) -> Result<()> {
            ensure!(self.scale > 0.0, "scale must be positive");
            ensure!(
                (0.0..1.0).contains(&self.min_box_overlap.raw()),
                "min_box_overlap must be in range [0, 1)"
            );
            Ok(())
        }
    }

    impl Default for TransformConfig {
        fn default() -> Self {
            Self {
                scale: default_scale(),
                mean_values: vec![],
                crop_size: None,
                random_crop: default_random_crop(),
                mirror: false,
                min_box_overlap: default_min_box_overlap(),
                seed: None,
            }
        }
    }

    fn default_scale() -> R64 {
        r64(1.0)
    }

    fn default_random_crop() -> bool {
        true
    }

    fn default_min_box_overlap() -> R64 {
        r64(0.0)
    }
}
