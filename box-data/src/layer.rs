//! Wiring the data layer from a configuration.

use crate::{
    assembler::{BatchAssembler, BatchAssemblerInit},
    common::*,
    config::Config,
    prefetch::{PrefetchScheduler, PrefetchSchedulerInit},
    record::DatumDecoder,
    store::{open_store, RecordCursor},
    transform::DataTransformer,
};

/// The initializer of the data layer.
#[derive(Debug, Clone)]
pub struct BoxDataLayerInit<'a> {
    pub config: &'a Config,
    /// The number of label outputs the consumer expects, if it has an
    /// expectation. It must match the number of configured sides, or be
    /// zero to produce images only.
    pub label_outputs: Option<usize>,
}

impl<'a> BoxDataLayerInit<'a> {
    /// Open the store and build the assembler without starting prefetching.
    pub fn build_assembler(&self) -> Result<BatchAssembler> {
        let Self {
            config,
            label_outputs,
        } = *self;
        config.check(label_outputs)?;

        let Config {
            data, transform, ..
        } = config;

        let store = open_store(&data.source)?;
        let cursor = RecordCursor::new(&*store)?;
        let decoder = DatumDecoder::new(data.encoded_channels)?;
        let augmentor = DataTransformer::new(transform)?;
        let sides = if label_outputs == Some(0) {
            info!("label outputs are disabled");
            vec![]
        } else {
            data.sides()
        };

        let assembler = BatchAssemblerInit {
            cursor,
            decoder: Box::new(decoder),
            augmentor: Box::new(augmentor),
            sides,
            batch_size: data.batch_size.get(),
        }
        .build()?;

        let [c, h, w] = assembler.infer_image_shape()?;
        info!(
            "output data size: {},{},{},{}",
            data.batch_size, c, h, w
        );
        for (index, side) in assembler.sides().iter().enumerate() {
            info!(
                "output label {} (side {}) size: {},{}",
                index,
                side.side(),
                data.batch_size,
                side.layout().row_len()
            );
        }

        Ok(assembler)
    }

    /// Set up the data layer and start prefetching.
    pub fn build(self) -> Result<PrefetchScheduler> {
        let assembler = self.build_assembler()?;
        PrefetchSchedulerInit {
            assembler,
            pool_size: self.config.data.prefetch.get(),
            timing_report_interval: self.config.logging.timing_report_interval,
        }
        .build()
    }
}
