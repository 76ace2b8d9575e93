//! Batch buffers.

use crate::{
    common::*,
    label_encoder::{LabelLayout, Side, SlotField, SLOT_SIZE},
};

/// Which record filled an item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMeta {
    /// The cursor offset of the record.
    pub offset: u64,
    /// The store key of the record.
    pub key: Vec<u8>,
    /// The number of occupied label slots. Slots past it are zero.
    pub num_boxes: usize,
}

/// One batch of images and labels.
///
/// * `images` has shape `[batch_size, channels, height, width]`.
/// * `labels[i]` has shape `[batch_size, max_labels_i * 5]` for the i-th side.
///
/// Buffers are allocated once and refilled in place by the assembler.
#[derive(Debug, Clone)]
pub struct Batch {
    pub(crate) images: Array4<f32>,
    pub(crate) labels: Vec<Array2<f32>>,
    pub(crate) sides: Vec<Side>,
    pub(crate) items: Vec<ItemMeta>,
}

impl Batch {
    pub fn new(batch_size: usize, image_shape: [usize; 3], sides: &[Side]) -> Result<Self> {
        ensure!(batch_size > 0, "batch_size must be positive");

        let [c, h, w] = image_shape;
        let images = Array4::zeros((batch_size, c, h, w));
        let labels = sides
            .iter()
            .map(|side| Array2::zeros((batch_size, side.layout().row_len())))
            .collect();

        Ok(Self {
            images,
            labels,
            sides: sides.to_vec(),
            items: Vec::with_capacity(batch_size),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    /// The `[channels, height, width]` shape of each image.
    pub fn image_shape(&self) -> [usize; 3] {
        let (_, c, h, w) = self.images.dim();
        [c, h, w]
    }

    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn num_sides(&self) -> usize {
        self.sides.len()
    }

    /// The label tensor of the side at `index`.
    pub fn labels(&self, index: usize) -> Option<&Array2<f32>> {
        self.labels.get(index)
    }

    /// The records that filled the batch, in item order.
    pub fn items(&self) -> &[ItemMeta] {
        &self.items
    }

    /// The occupied `[class, cx, cy, w, h]` slots of an item for a side.
    ///
    /// Returns `None` if the side does not exist.
    pub fn label_slots(&self, side_index: usize, item: usize) -> Option<Vec<[f32; SLOT_SIZE]>> {
        let labels = self.labels.get(side_index)?;
        let layout: LabelLayout = self.sides.get(side_index)?.layout();
        let num_boxes = self
            .items
            .get(item)
            .map(|meta| meta.num_boxes)
            .unwrap_or(0);

        let slots = (0..num_boxes)
            .map(|slot| {
                [
                    SlotField::Class,
                    SlotField::Cx,
                    SlotField::Cy,
                    SlotField::W,
                    SlotField::H,
                ]
                .map(|field| labels[[item, layout.slot_offset(slot, field)]])
            })
            .collect();
        Some(slots)
    }

    /// Re-allocate the image tensor if the image shape changed.
    pub(crate) fn reshape_images(&mut self, image_shape: [usize; 3]) {
        if self.image_shape() != image_shape {
            warn!(
                "re-allocate batch images from {:?} to {:?}",
                self.image_shape(),
                image_shape
            );
            let [c, h, w] = image_shape;
            self.images = Array4::zeros((self.batch_size(), c, h, w));
        }
    }
}
