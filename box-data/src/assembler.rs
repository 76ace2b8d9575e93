//! Filling batches from the record store.

use crate::{
    batch::{Batch, ItemMeta},
    common::*,
    error::BoxDataError,
    label_encoder::{encode_into, Side},
    profiling::Timing,
    record::RecordDecoder,
    store::RecordCursor,
    transform::Augmentor,
};

/// The timing of one or more batch fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyTiming {
    pub batch: Duration,
    pub read: Duration,
    pub transform: Duration,
}

impl std::ops::AddAssign for AssemblyTiming {
    fn add_assign(&mut self, rhs: Self) {
        self.batch += rhs.batch;
        self.read += rhs.read;
        self.transform += rhs.transform;
    }
}

/// The initializer of [BatchAssembler].
#[derive(Debug)]
pub struct BatchAssemblerInit {
    pub cursor: RecordCursor,
    pub decoder: Box<dyn RecordDecoder>,
    pub augmentor: Box<dyn Augmentor>,
    pub sides: Vec<Side>,
    pub batch_size: usize,
}

impl BatchAssemblerInit {
    pub fn build(self) -> Result<BatchAssembler> {
        let Self {
            cursor,
            decoder,
            augmentor,
            sides,
            batch_size,
        } = self;

        ensure!(batch_size > 0, "batch_size must be positive");

        Ok(BatchAssembler {
            cursor,
            decoder,
            augmentor,
            sides,
            batch_size,
            num_batches: 0,
            total_timing: AssemblyTiming::default(),
        })
    }
}

/// Drives the cursor, the decoder, the augmentor and the label encoder to
/// fill batches.
///
/// The assembler exclusively owns the cursor. Items of a batch are taken
/// from consecutive records in cursor order.
#[derive(Debug)]
pub struct BatchAssembler {
    cursor: RecordCursor,
    decoder: Box<dyn RecordDecoder>,
    augmentor: Box<dyn Augmentor>,
    sides: Vec<Side>,
    batch_size: usize,
    num_batches: usize,
    total_timing: AssemblyTiming,
}

impl BatchAssembler {
    /// Infer the image shape from the current record without advancing.
    pub fn infer_image_shape(&self) -> Result<[usize; 3]> {
        let datum = self.decoder.parse(&self.cursor.peek()?).with_context(|| {
            format!(
                "failed to decode record '{}'",
                String::from_utf8_lossy(self.cursor.key())
            )
        })?;
        self.augmentor.infer_output_shape(&datum.image)
    }

    /// Allocate a batch buffer fitting the current record.
    pub fn allocate_batch(&self) -> Result<Batch> {
        let image_shape = self.infer_image_shape()?;
        Batch::new(self.batch_size, image_shape, &self.sides)
    }

    /// Fill the batch in place with the next `batch_size` records.
    ///
    /// All items of the batch must have the image shape inferred from the
    /// first record. Any failure invalidates the whole batch.
    pub fn fill(&mut self, batch: &mut Batch) -> Result<AssemblyTiming> {
        let batch_start = Instant::now();
        let mut timing = Timing::new("load_batch");

        ensure!(
            batch.batch_size() == self.batch_size,
            "expect batch size {}, but get {}",
            self.batch_size,
            batch.batch_size()
        );
        if batch.num_sides() != self.sides.len() {
            bail!(BoxDataError::SideCountMismatch {
                sides: self.sides.len(),
                outputs: batch.num_sides(),
            });
        }
        ensure!(
            batch.sides == self.sides,
            "the label layout of the batch {:?} differs from the configured sides {:?}",
            batch.sides,
            self.sides
        );

        // reshape according to the first record of each batch
        let image_shape = self.infer_image_shape()?;
        batch.reshape_images(image_shape);

        let Batch {
            images,
            labels,
            items,
            ..
        } = batch;
        items.clear();

        for index in 0..self.batch_size {
            let offset = self.cursor.offset();
            let key = self.cursor.key().to_vec();

            // read a record
            let instant = Instant::now();
            let datum = self.decoder.parse(&self.cursor.peek()?).with_context(|| {
                format!(
                    "failed to decode record '{}' at offset {}",
                    String::from_utf8_lossy(&key),
                    offset
                )
            })?;
            timing.add("read", instant.elapsed());

            // transform the image and the boxes
            let instant = Instant::now();
            let found = self.augmentor.infer_output_shape(&datum.image)?;
            if found != image_shape {
                bail!(BoxDataError::ShapeMismatch {
                    expect: image_shape,
                    found,
                });
            }
            let boxes = self.augmentor.transform(
                &datum.image,
                &datum.annotations,
                images.index_axis_mut(Axis(0), index),
            )?;

            // encode labels per side
            for side_labels in labels.iter_mut() {
                let mut row = side_labels.row_mut(index);
                let row = row
                    .as_slice_mut()
                    .ok_or_else(|| format_err!("label rows must be contiguous"))?;
                encode_into(&boxes, row)?;
            }
            timing.add("transform", instant.elapsed());

            items.push(ItemMeta {
                offset,
                key,
                num_boxes: boxes.len(),
            });
            self.cursor.advance();
        }

        let batch_timing = AssemblyTiming {
            batch: batch_start.elapsed(),
            read: timing.get("read"),
            transform: timing.get("transform"),
        };
        self.num_batches += 1;
        self.total_timing += batch_timing;

        debug!("Prefetch batch: {:?}", batch_timing.batch);
        debug!("     Read time: {:?}", batch_timing.read);
        debug!("Transform time: {:?}", batch_timing.transform);
        timing.report();

        Ok(batch_timing)
    }

    pub fn cursor(&self) -> &RecordCursor {
        &self.cursor
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of batches filled so far.
    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    /// The accumulated timing over all filled batches.
    pub fn total_timing(&self) -> AssemblyTiming {
        self.total_timing
    }
}
