use anyhow::{format_err, Result};
use approx::assert_abs_diff_eq;
use bbox::{prelude::*, XYWH};
use box_data::{
    BoxDataError, BoxDataLayerInit, Config, Datum, DirectoryStore, Image, RecordStoreWriter,
};
use label::Label;
use ndarray::Array3;
use std::path::Path;

fn write_store(dir: &Path, len: usize) -> Result<()> {
    let mut writer = DirectoryStore::create(dir)?;
    for index in 0..len {
        let datum = Datum {
            image: Image::new(Array3::from_elem((3, 4, 4), index as u8)),
            annotations: vec![Label {
                rect: XYWH::from_xywh([0.5, 0.0, 0.25, 0.5]),
                class: 1,
            }],
        };
        writer.put(format!("{:04}", index).as_bytes(), &datum.to_bytes()?)?;
    }
    Ok(())
}

fn write_config(dir: &Path, store_dir: &Path, backend: &str) -> Result<Config> {
    let store_dir = store_dir
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 path"))?;
    let text = format!(
        r#"{{
    data: {{
        source: {{ backend: "{}", path: {:?} }},
        batch_size: 2,
        num_label: 3,
        sides: [
            {{ side: 13 }},
            {{ side: 26, max_labels: 5 }},
        ],
    }},
    transform: {{
        scale: 0.5,
        mean_values: [1.0],
    }},
}}"#,
        backend, store_dir
    );
    let path = dir.join("data.json5");
    std::fs::write(&path, text)?;
    Config::open(&path)
}

#[test]
fn directory_store_layer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store_dir = dir.path().join("records");
    write_store(&store_dir, 3)?;
    let config = write_config(dir.path(), &store_dir, "directory")?;

    let scheduler = BoxDataLayerInit {
        config: &config,
        label_outputs: Some(2),
    }
    .build()?;

    let batch = scheduler.next_batch()?;
    assert_eq!(batch.images().shape(), &[2, 3, 4, 4]);
    assert_eq!(batch.labels(0).unwrap().shape(), &[2, 15]);
    assert_eq!(batch.labels(1).unwrap().shape(), &[2, 25]);
    assert_eq!(batch.sides()[1].side(), 26);

    // (index - 1) * 0.5
    assert_abs_diff_eq!(batch.images()[[0, 2, 3, 3]], -0.5);
    assert_abs_diff_eq!(batch.images()[[1, 0, 0, 0]], 0.0);

    let slots = batch.label_slots(1, 1).unwrap();
    assert_eq!(slots.len(), 1);
    [1.0, 0.625, 0.25, 0.25, 0.5]
        .iter()
        .zip(slots[0])
        .for_each(|(&expect, found)| assert_abs_diff_eq!(found, expect));
    drop(batch);

    let batch = scheduler.next_batch()?;
    let keys: Vec<_> = batch.items().iter().map(|meta| meta.key.clone()).collect();
    assert_eq!(keys, vec![b"0002".to_vec(), b"0000".to_vec()]);
    Ok(())
}

#[test]
fn memory_store_layer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store_dir = dir.path().join("records");
    write_store(&store_dir, 1)?;
    let config = write_config(dir.path(), &store_dir, "memory")?;

    let scheduler = BoxDataLayerInit {
        config: &config,
        label_outputs: None,
    }
    .build()?;
    let batch = scheduler.next_batch()?;
    let keys: Vec<_> = batch.items().iter().map(|meta| meta.key.clone()).collect();
    assert_eq!(keys, vec![b"0000".to_vec(), b"0000".to_vec()]);
    Ok(())
}

#[test]
fn image_only_layer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store_dir = dir.path().join("records");
    write_store(&store_dir, 2)?;
    let config = write_config(dir.path(), &store_dir, "directory")?;

    let scheduler = BoxDataLayerInit {
        config: &config,
        label_outputs: Some(0),
    }
    .build()?;

    let batch = scheduler.next_batch()?;
    assert_eq!(batch.images().shape(), &[2, 3, 4, 4]);
    assert_eq!(batch.num_sides(), 0);
    assert!(batch.labels(0).is_none());
    assert!(batch.label_slots(0, 0).is_none());
    assert_abs_diff_eq!(batch.images()[[1, 0, 0, 0]], 0.0);
    assert_eq!(batch.items()[1].num_boxes, 1);
    Ok(())
}

#[test]
fn side_count_must_match_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store_dir = dir.path().join("records");
    write_store(&store_dir, 1)?;
    let config = write_config(dir.path(), &store_dir, "directory")?;

    let err = BoxDataLayerInit {
        config: &config,
        label_outputs: Some(3),
    }
    .build()
    .unwrap_err();
    assert_eq!(
        err.downcast_ref::<BoxDataError>(),
        Some(&BoxDataError::SideCountMismatch {
            sides: 2,
            outputs: 3
        })
    );
    Ok(())
}

#[test]
fn empty_store_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store_dir = dir.path().join("records");
    std::fs::create_dir(&store_dir)?;
    let config = write_config(dir.path(), &store_dir, "directory")?;

    let err = BoxDataLayerInit {
        config: &config,
        label_outputs: None,
    }
    .build()
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BoxDataError>(),
        Some(BoxDataError::EmptyStore { .. })
    ));
    Ok(())
}
