//! Encoding of box lists into fixed-length label rows.
//!
//! A label row holds `max_labels` slots of [SLOT_SIZE] values laid out as
//! `class, cx, cy, w, h`. Boxes fill the slots in input order, and the
//! remaining slots are zero. A zero slot cannot be told apart from a
//! class 0 box at the origin with zero size, so consumers must rely on the
//! number of boxes of each item (see [crate::ItemMeta::num_boxes]).

use crate::{common::*, error::BoxDataError, transform::TransformedBox};

/// The number of values per label slot.
pub const SLOT_SIZE: usize = 5;

/// The fields of one label slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotField {
    Class = 0,
    Cx = 1,
    Cy = 2,
    W = 3,
    H = 4,
}

/// The mapping from `(item, slot, field)` to the offset into a flat label
/// tensor of shape `[batch_size, max_labels * 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelLayout {
    max_labels: usize,
}

impl LabelLayout {
    pub fn new(max_labels: usize) -> Result<Self> {
        ensure!(max_labels > 0, "max_labels must be positive");
        Ok(Self { max_labels })
    }

    pub fn max_labels(&self) -> usize {
        self.max_labels
    }

    /// The length of one item's label row.
    pub fn row_len(&self) -> usize {
        self.max_labels * SLOT_SIZE
    }

    /// The offset of a field within an item's row.
    pub fn slot_offset(&self, slot: usize, field: SlotField) -> usize {
        debug_assert!(slot < self.max_labels);
        slot * SLOT_SIZE + field as usize
    }

    /// The offset of a field in the flat tensor.
    pub fn offset(&self, item: usize, slot: usize, field: SlotField) -> usize {
        item * self.row_len() + self.slot_offset(slot, field)
    }
}

/// A label output of the data layer.
///
/// The side tags one label tensor of a batch. Every side receives the same
/// flat box list, encoded with its own slot capacity. No spatial binning
/// on an `side x side` grid takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Side {
    side: usize,
    layout: LabelLayout,
}

impl Side {
    pub fn new(side: usize, max_labels: NonZeroUsize) -> Self {
        Self {
            side,
            layout: LabelLayout {
                max_labels: max_labels.get(),
            },
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn max_labels(&self) -> usize {
        self.layout.max_labels
    }

    pub fn layout(&self) -> LabelLayout {
        self.layout
    }
}

/// Encode boxes into a new row of `slot_count` slots.
pub fn encode(boxes: &[TransformedBox], slot_count: usize) -> Result<Vec<f32>> {
    let mut row = vec![0.0; slot_count * SLOT_SIZE];
    encode_into(boxes, &mut row)?;
    Ok(row)
}

/// Encode boxes into an existing label row.
///
/// The row length decides the slot capacity. It fails if there are more
/// boxes than slots or if any class is negative, without touching the row.
pub fn encode_into(boxes: &[TransformedBox], row: &mut [f32]) -> Result<()> {
    ensure!(
        row.len() % SLOT_SIZE == 0,
        "the label row length {} is not a multiple of {}",
        row.len(),
        SLOT_SIZE
    );
    let max_labels = row.len() / SLOT_SIZE;

    if boxes.len() > max_labels {
        bail!(BoxDataError::TooManyLabels {
            boxes: boxes.len(),
            max_labels,
        });
    }
    if let Some(label) = boxes.iter().find(|label| label.class < 0) {
        bail!(BoxDataError::NegativeClass { class: label.class });
    }

    row.fill(0.0);

    for (slot, label) in row.chunks_exact_mut(SLOT_SIZE).zip(boxes) {
        slot[SlotField::Class as usize] = label.class as f32;
        slot[SlotField::Cx as usize..].copy_from_slice(&label.rect.xywh());

        // move x and y from the top-left corner to the center
        slot[SlotField::Cx as usize] += slot[SlotField::W as usize] / 2.0;
        slot[SlotField::Cy as usize] += slot[SlotField::H as usize] / 2.0;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn label(class: i32, xywh: [f32; 4]) -> TransformedBox {
        Label {
            rect: XYWH::from_xywh(xywh),
            class,
        }
    }

    #[test]
    fn center_conversion() {
        let row = encode(&[label(1, [2.0, 3.0, 4.0, 6.0])], 1).unwrap();
        assert_eq!(row, vec![1.0, 4.0, 6.0, 4.0, 6.0]);
    }

    #[test]
    fn zero_fill() {
        let row = encode(&[], 3).unwrap();
        assert_eq!(row.len(), 15);
        assert!(row.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn stale_values_are_cleared() {
        let mut row = vec![9.0; 10];
        encode_into(&[label(2, [0.1, 0.2, 0.2, 0.4])], &mut row).unwrap();
        assert_abs_diff_eq!(row[0], 2.0);
        assert_abs_diff_eq!(row[1], 0.2);
        assert_abs_diff_eq!(row[2], 0.4);
        assert_abs_diff_eq!(row[3], 0.2);
        assert_abs_diff_eq!(row[4], 0.4);
        assert!(row[5..].iter().all(|&value| value == 0.0));
    }

    #[test]
    fn capacity() {
        let boxes: Vec<_> = (0..4).map(|class| label(class, [0.0, 0.0, 0.5, 0.5])).collect();
        encode(&boxes, 4).unwrap();

        let err = encode(&boxes, 3).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BoxDataError>(),
            Some(&BoxDataError::TooManyLabels {
                boxes: 4,
                max_labels: 3
            })
        );
    }

    #[test]
    fn negative_class() {
        let mut row = vec![7.0; 10];
        let err = encode_into(
            &[label(0, [0.0, 0.0, 1.0, 1.0]), label(-1, [0.0, 0.0, 1.0, 1.0])],
            &mut row,
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BoxDataError>(),
            Some(&BoxDataError::NegativeClass { class: -1 })
        );
        assert!(row.iter().all(|&value| value == 7.0));
    }

    #[test]
    fn multi_side_replication() {
        let boxes = vec![label(3, [0.1, 0.1, 0.2, 0.2]), label(1, [0.5, 0.4, 0.1, 0.2])];
        let short = encode(&boxes, 3).unwrap();
        let long = encode(&boxes, 5).unwrap();

        assert_eq!(short.len(), 15);
        assert_eq!(long.len(), 25);
        assert_eq!(short[..10], long[..10]);
        assert!(short[10..].iter().chain(&long[10..]).all(|&value| value == 0.0));
    }

    #[test]
    fn layout_offsets() {
        let layout = LabelLayout::new(3).unwrap();
        assert_eq!(layout.row_len(), 15);
        assert_eq!(layout.offset(0, 0, SlotField::Class), 0);
        assert_eq!(layout.offset(0, 1, SlotField::Cy), 7);
        assert_eq!(layout.offset(2, 2, SlotField::H), 2 * 15 + 2 * 5 + 4);
        assert!(LabelLayout::new(0).is_err());
    }
}
