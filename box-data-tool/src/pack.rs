use crate::common::*;
use image::GenericImageView;
use bbox::{prelude::*, XYWH};
use box_data::{
    encode_record, Annotation, DirectoryStore, Image, MemoryStore, RecordPayload,
    RecordStoreWriter,
};
use indexmap::{IndexMap, IndexSet};
use label::Label;
use ndarray::Array3;
use serde::Deserialize;

/// A row of the label file. The box is in pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsvSample {
    pub image_file: PathBuf,
    pub class_name: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PackOptions {
    /// Store the image files as they are instead of raw pixels.
    pub encoded: bool,
    /// Build the records into memory only.
    pub dry_run: bool,
}

pub fn pack(
    image_dir: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
    classes_file: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: PackOptions,
) -> Result<()> {
    let PackOptions { encoded, dry_run } = options;
    let image_dir = image_dir.as_ref();
    let output_dir = output_dir.as_ref();

    let classes = load_classes_file(classes_file)?;
    let samples = load_csv_file(label_file)?;

    // group boxes by image, keeping the order of first appearance
    let mut groups: IndexMap<PathBuf, Vec<CsvSample>> = IndexMap::new();
    samples.into_iter().for_each(|sample| {
        groups
            .entry(sample.image_file.clone())
            .or_default()
            .push(sample)
    });

    let mut writer: Box<dyn RecordStoreWriter> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(DirectoryStore::create(output_dir)?)
    };
    let num_boxes = groups
        .iter()
        .enumerate()
        .map(|(index, (image_file, samples))| -> Result<_> {
            let path = image_dir.join(image_file);
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read '{}'", path.display()))?;
            let image = image::load_from_memory(&bytes)
                .with_context(|| format!("failed to decode '{}'", path.display()))?;
            let (width, height) = (image.width() as f64, image.height() as f64);

            let annotations: Vec<Annotation> = samples
                .iter()
                .map(|sample| -> Result<_> {
                    let class = classes.get_index_of(&sample.class_name).ok_or_else(|| {
                        format_err!(
                            "the class '{}' of '{}' is not in the classes file",
                            sample.class_name,
                            image_file.display()
                        )
                    })?;
                    let rect = XYWH::try_from_xywh([
                        (sample.x / width) as f32,
                        (sample.y / height) as f32,
                        (sample.w / width) as f32,
                        (sample.h / height) as f32,
                    ])?;
                    Ok(Label {
                        rect,
                        class: class.try_into()?,
                    })
                })
                .try_collect()?;

            let record = if encoded {
                encode_record(&annotations, RecordPayload::Encoded(&bytes))?
            } else {
                let rgb = image.to_rgb8();
                let (w, h) = rgb.dimensions();
                let pixels = Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
                    rgb.get_pixel(x as u32, y as u32)[c]
                });
                encode_record(&annotations, RecordPayload::Raw(&Image::new(pixels)))?
            };

            let key = format!("{:08}", index);
            writer.put(key.as_bytes(), &record)?;
            Ok(annotations.len())
        })
        .fold_ok(0, |sum, count| sum + count)?;

    if dry_run {
        info!(
            "dry run: {} records with {} boxes are not written",
            groups.len(),
            num_boxes
        );
    } else {
        info!(
            "packed {} images and {} boxes into '{}'",
            groups.len(),
            num_boxes,
            output_dir.display()
        );
    }
    Ok(())
}

pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let lines: Vec<_> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let classes: IndexSet<_> = lines.iter().cloned().map(ToOwned::to_owned).collect();
    ensure!(
        lines.len() == classes.len(),
        "duplicated class names found in '{}'",
        path.display()
    );
    ensure!(
        !classes.is_empty(),
        "no classes found in '{}'",
        path.display()
    );
    Ok(classes)
}

pub fn load_csv_file(path: impl AsRef<Path>) -> Result<Vec<CsvSample>> {
    let path = path.as_ref();
    let samples: Vec<CsvSample> = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?
        .deserialize()
        .try_collect()?;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use box_data::{DatumDecoder, RecordDecoder, RecordStore};

    #[test]
    fn pack_csv_dataset() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let image_dir = dir.path().join("images");
        fs::create_dir(&image_dir)?;
        image::RgbImage::from_fn(8, 4, |x, y| image::Rgb([x as u8, y as u8, 0]))
            .save(image_dir.join("a.png"))?;
        image::RgbImage::from_fn(4, 4, |_, _| image::Rgb([9, 9, 9]))
            .save(image_dir.join("b.png"))?;

        let label_file = dir.path().join("labels.csv");
        fs::write(
            &label_file,
            "image_file,class_name,x,y,w,h\n\
             b.png,cat,0,0,4,4\n\
             a.png,dog,2,1,4,2\n\
             # comment\n\
             b.png,dog,1,1,2,2\n",
        )?;
        let classes_file = dir.path().join("classes.txt");
        fs::write(&classes_file, "dog\ncat\n")?;

        let output = dir.path().join("store");
        pack(
            &image_dir,
            &label_file,
            &classes_file,
            &output,
            PackOptions::default(),
        )?;

        let store = DirectoryStore::open(&output)?;
        assert_eq!(store.num_records(), 2);

        let decoder = DatumDecoder::default();
        let mut cursor = store.new_cursor()?;

        // b.png appears first in the label file
        assert_eq!(cursor.key(), b"00000000");
        let datum = decoder.parse(&cursor.value()?)?;
        assert_eq!(datum.image.shape(), [3, 4, 4]);
        let classes: Vec<_> = datum.annotations.iter().map(|label| label.class).collect();
        assert_eq!(classes, vec![1, 0]);
        assert_eq!(datum.annotations[1].rect.xywh(), [0.25, 0.25, 0.5, 0.5]);

        cursor.next();
        let datum = decoder.parse(&cursor.value()?)?;
        assert_eq!(datum.image.shape(), [3, 4, 8]);
        assert_eq!(datum.image.pixels()[[0, 2, 5]], 5);
        assert_eq!(datum.annotations[0].rect.xywh(), [0.25, 0.25, 0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn unknown_class_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        image::RgbImage::new(2, 2).save(dir.path().join("a.png"))?;
        let label_file = dir.path().join("labels.csv");
        fs::write(&label_file, "image_file,class_name,x,y,w,h\na.png,bird,0,0,1,1\n")?;
        let classes_file = dir.path().join("classes.txt");
        fs::write(&classes_file, "dog\n")?;

        let result = pack(
            dir.path(),
            &label_file,
            &classes_file,
            dir.path().join("store"),
            PackOptions {
                encoded: true,
                dry_run: true,
            },
        );
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn dry_run_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        image::RgbImage::new(2, 2).save(dir.path().join("a.png"))?;
        let label_file = dir.path().join("labels.csv");
        fs::write(&label_file, "image_file,class_name,x,y,w,h\na.png,dog,0,0,1,1\n")?;
        let classes_file = dir.path().join("classes.txt");
        fs::write(&classes_file, "dog\n")?;

        let output = dir.path().join("store");
        pack(
            dir.path(),
            &label_file,
            &classes_file,
            &output,
            PackOptions {
                encoded: false,
                dry_run: true,
            },
        )?;
        assert!(!output.exists());
        Ok(())
    }
}
