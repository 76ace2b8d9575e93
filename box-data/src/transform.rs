//! Image augmentation with box adjustment.

use crate::{
    common::*,
    config::TransformConfig,
    error::BoxDataError,
    record::{Annotation, Image},
};

/// A box after augmentation, in ratio units of the augmented image.
pub type TransformedBox = Label<XYWH<f32>, i32>;

/// Transforms a decoded image into its slot of a batch tensor.
pub trait Augmentor
where
    Self: Debug + Send,
{
    /// The `[channels, height, width]` shape the image is transformed to.
    fn infer_output_shape(&self, image: &Image) -> Result<[usize; 3]>;

    /// Write the transformed pixels into `output` and return the boxes that
    /// survive the transform, in input order.
    fn transform(
        &mut self,
        image: &Image,
        annotations: &[Annotation],
        output: ArrayViewMut3<'_, f32>,
    ) -> Result<Vec<TransformedBox>>;
}

/// The crop, mirror, mean subtraction and scaling transform.
#[derive(Debug, Clone)]
pub struct DataTransformer {
    scale: f32,
    mean_values: Vec<f32>,
    crop_size: Option<usize>,
    random_crop: bool,
    mirror: bool,
    min_box_overlap: f32,
    rng: StdRng,
}

impl DataTransformer {
    pub fn new(config: &TransformConfig) -> Result<Self> {
        config.check()?;
        let TransformConfig {
            scale,
            ref mean_values,
            crop_size,
            random_crop,
            mirror,
            min_box_overlap,
            seed,
        } = *config;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            scale: scale.raw() as f32,
            mean_values: mean_values.iter().map(|mean| mean.raw() as f32).collect(),
            crop_size: crop_size.map(|size| size.get()),
            random_crop,
            mirror,
            min_box_overlap: min_box_overlap.raw() as f32,
            rng,
        })
    }

    fn channel_means(&self, channels: usize) -> Result<Vec<f32>> {
        let means = match self.mean_values.len() {
            0 => vec![0.0; channels],
            1 => vec![self.mean_values[0]; channels],
            len => {
                ensure!(
                    len == channels,
                    "specify either 1 mean value or as many as channels: {} values for {} channels",
                    len,
                    channels
                );
                self.mean_values.clone()
            }
        };
        Ok(means)
    }

    /// Pick the crop window `[x, y, w, h]` in pixels.
    fn crop_window(&mut self, height: usize, width: usize) -> [usize; 4] {
        match self.crop_size {
            Some(size) if self.random_crop => {
                let x = self.rng.gen_range(0..=(width - size));
                let y = self.rng.gen_range(0..=(height - size));
                [x, y, size, size]
            }
            Some(size) => [(width - size) / 2, (height - size) / 2, size, size],
            None => [0, 0, width, height],
        }
    }

    /// Map boxes in ratio units of the source image into ratio units of the
    /// crop window, dropping the ones mostly outside of it.
    fn transform_boxes(
        &self,
        annotations: &[Annotation],
        [height, width]: [usize; 2],
        [crop_x, crop_y, crop_w, crop_h]: [usize; 4],
        mirror: bool,
    ) -> Vec<TransformedBox> {
        let to_pixel = Transform::scale(width as f32, height as f32);
        let window = XYWH::from_xywh([crop_x as f32, crop_y as f32, crop_w as f32, crop_h as f32]);
        let to_crop = {
            let translate = Transform::translate(-(crop_x as f32), -(crop_y as f32));
            let flip = if mirror {
                Transform::mirror_x(crop_w as f32)
            } else {
                Transform::identity()
            };
            let normalize = Transform::normalize(crop_w as f32, crop_h as f32);
            &normalize * &(&flip * &translate)
        };

        annotations
            .iter()
            .filter_map(|label| {
                let orig = &to_pixel * label;
                let clipped = orig.clip(&window)?;

                let orig_area = orig.rect.area();
                let visible = if orig_area > 0.0 {
                    clipped.rect.area() / orig_area
                } else {
                    0.0
                };
                if visible <= self.min_box_overlap {
                    return None;
                }

                Some(&to_crop * &clipped)
            })
            .collect()
    }
}

impl Augmentor for DataTransformer {
    fn infer_output_shape(&self, image: &Image) -> Result<[usize; 3]> {
        let [channels, height, width] = image.shape();
        match self.crop_size {
            Some(size) => {
                ensure!(
                    size <= height && size <= width,
                    "crop size {} exceeds the image size {}x{}",
                    size,
                    height,
                    width
                );
                Ok([channels, size, size])
            }
            None => Ok([channels, height, width]),
        }
    }

    fn transform(
        &mut self,
        image: &Image,
        annotations: &[Annotation],
        mut output: ArrayViewMut3<'_, f32>,
    ) -> Result<Vec<TransformedBox>> {
        let expect = self.infer_output_shape(image)?;
        let found = {
            let (c, h, w) = output.dim();
            [c, h, w]
        };
        if expect != found {
            bail!(BoxDataError::ShapeMismatch { expect, found });
        }

        let [channels, height, width] = image.shape();
        let means = self.channel_means(channels)?;
        let window = self.crop_window(height, width);
        let [crop_x, crop_y, crop_w, _] = window;
        let mirror = self.mirror && self.rng.gen::<bool>();
        let scale = self.scale;
        let pixels = image.pixels();

        output
            .indexed_iter_mut()
            .for_each(|((c, y, x), value)| {
                let src_x = if mirror { crop_w - 1 - x } else { x };
                let pixel = pixels[[c, crop_y + y, crop_x + src_x]];
                *value = (pixel as f32 - means[c]) * scale;
            });

        Ok(self.transform_boxes(annotations, [height, width], window, mirror))
    }
}
