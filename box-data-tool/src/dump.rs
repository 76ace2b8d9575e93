use crate::common::*;
use bbox::{prelude::*, CxCyWH};
use box_data::{Batch, TransformConfig};
use image::{Rgb, RgbImage};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

pub fn dump(
    config_file: impl AsRef<Path>,
    num_batches: usize,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::open(config_file)?;
    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
    }

    let scheduler = BoxDataLayerInit {
        config: &config,
        label_outputs: None,
    }
    .build()?;

    for batch_index in 0..num_batches {
        let batch = scheduler.next_batch()?;
        let [_, height, width] = batch.image_shape();
        let (h, w) = (height as f32, width as f32);

        for (item, meta) in batch.items().iter().enumerate() {
            println!(
                "batch {} item {}: record '{}' at offset {}, {} boxes",
                batch_index,
                item,
                String::from_utf8_lossy(&meta.key),
                meta.offset,
                meta.num_boxes
            );

            for (side_index, side) in batch.sides().iter().enumerate() {
                for [class, cx, cy, bw, bh] in
                    batch.label_slots(side_index, item).into_iter().flatten()
                {
                    let rect = CxCyWH::try_from_cxcywh([cx * w, cy * h, bw * w, bh * h])?;
                    let [cx, cy, bw, bh] = rect.cxcywh();
                    let [l, t, r, b] = rect.ltrb();
                    println!(
                        "  side {}: class {} cx {:.2} cy {:.2} w {:.2} h {:.2} (ltrb {:.1} {:.1} {:.1} {:.1})",
                        side.side(),
                        class,
                        cx,
                        cy,
                        bw,
                        bh,
                        l,
                        t,
                        r,
                        b
                    );
                }
            }

            if let Some(dir) = &output_dir {
                let path = dir.join(format!("{:06}_{:03}.png", batch_index, item));
                let image = render_item(&batch, item, &config.transform)?;
                image
                    .save(&path)
                    .with_context(|| format!("failed to save '{}'", path.display()))?;
            }
        }
    }

    let stats = scheduler.stats();
    info!("dumped {} batches, {} filled", num_batches, stats.batches_filled);
    Ok(())
}

/// Undo the mean subtraction and scaling, and outline the boxes of the
/// first side if labels are produced.
fn render_item(batch: &Batch, item: usize, transform: &TransformConfig) -> Result<RgbImage> {
    let [channels, height, width] = batch.image_shape();
    ensure!(
        channels == 1 || channels == 3,
        "cannot render an image with {} channels",
        channels
    );
    ensure!(height > 0 && width > 0, "cannot render an empty image");

    let scale = transform.scale.raw() as f32;
    let means: Vec<f32> = (0..channels)
        .map(|c| match transform.mean_values.len() {
            0 => 0.0,
            1 => transform.mean_values[0].raw() as f32,
            _ => transform.mean_values[c].raw() as f32,
        })
        .collect();

    let pixels = batch.images().index_axis(ndarray::Axis(0), item);
    let value = |c: usize, y: usize, x: usize| -> u8 {
        let value = pixels[[c, y, x]] / scale + means[c];
        value.round().clamp(0.0, 255.0) as u8
    };

    let mut image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        if channels == 1 {
            let luma = value(0, y, x);
            Rgb([luma, luma, luma])
        } else {
            Rgb([value(0, y, x), value(1, y, x), value(2, y, x)])
        }
    });

    let (h, w) = (height as f32, width as f32);
    let clamp_x = |x: f32| (x.round().max(0.0) as u32).min(width as u32 - 1);
    let clamp_y = |y: f32| (y.round().max(0.0) as u32).min(height as u32 - 1);

    for [_, cx, cy, bw, bh] in batch.label_slots(0, item).unwrap_or_default() {
        let rect = CxCyWH::try_from_cxcywh([cx * w, cy * h, bw * w, bh * h])?;
        let [l, t, r, b] = rect.ltrb();
        let (l, r) = (clamp_x(l), clamp_x(r));
        let (t, b) = (clamp_y(t), clamp_y(b));

        for x in l..=r {
            image.put_pixel(x, t, BOX_COLOR);
            image.put_pixel(x, b, BOX_COLOR);
        }
        for y in t..=b {
            image.put_pixel(l, y, BOX_COLOR);
            image.put_pixel(r, y, BOX_COLOR);
        }
    }

    Ok(image)
}
