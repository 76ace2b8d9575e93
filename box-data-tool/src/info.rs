use crate::common::*;
use prettytable::{cell, row, Table};

pub fn info(config_file: impl AsRef<Path>) -> Result<()> {
    let config = Config::open(config_file)?;
    let assembler = BoxDataLayerInit {
        config: &config,
        label_outputs: None,
    }
    .build_assembler()?;
    let batch_size = assembler.batch_size();
    let [c, h, w] = assembler.infer_image_shape()?;

    {
        let mut table = Table::new();
        table.add_row(row!["source", "backend", "records", "prefetch"]);
        table.add_row(row![
            config.data.source.path.display(),
            format!("{:?}", config.data.source.backend),
            assembler.cursor().num_records(),
            config.data.prefetch,
        ]);
        table.printstd();
    }

    {
        let mut table = Table::new();
        table.add_row(row!["output", "side", "max_labels", "shape"]);
        table.add_row(row![
            "data",
            "",
            "",
            format!("[{}, {}, {}, {}]", batch_size, c, h, w),
        ]);
        assembler
            .sides()
            .iter()
            .enumerate()
            .for_each(|(index, side)| {
                table.add_row(row![
                    format!("label {}", index),
                    side.side(),
                    side.max_labels(),
                    format!("[{}, {}]", batch_size, side.layout().row_len()),
                ]);
            });
        table.printstd();
    }

    Ok(())
}
