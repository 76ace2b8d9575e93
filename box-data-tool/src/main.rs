mod common;
mod dump;
mod info;
mod pack;

use crate::common::*;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
/// Inspect and build box data record stores.
enum Opts {
    /// Run the data layer and print the labels of each batch.
    Dump {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// number of batches to dump
        #[clap(long, default_value = "1")]
        batches: usize,
        /// directory to save images with boxes drawn
        #[clap(long)]
        output_dir: Option<PathBuf>,
    },
    /// Pack images and a CSV label file into a directory store.
    Pack {
        /// directory of image files
        #[clap(long)]
        image_dir: PathBuf,
        /// CSV file with columns image_file,class_name,x,y,w,h in pixels
        #[clap(long)]
        label_file: PathBuf,
        /// text file with one class name per line
        #[clap(long)]
        classes_file: PathBuf,
        /// output store directory
        #[clap(long)]
        output: PathBuf,
        /// keep the encoded image files instead of raw pixels
        #[clap(long)]
        encoded: bool,
        /// build the records in memory without writing the store
        #[clap(long)]
        dry_run: bool,
    },
    /// Print the record count and the output shapes.
    Info {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Dump {
            config,
            batches,
            output_dir,
        } => {
            dump::dump(config, batches, output_dir)?;
        }
        Opts::Pack {
            image_dir,
            label_file,
            classes_file,
            output,
            encoded,
            dry_run,
        } => {
            pack::pack(
                image_dir,
                label_file,
                classes_file,
                output,
                pack::PackOptions { encoded, dry_run },
            )?;
        }
        Opts::Info { config } => {
            info::info(config)?;
        }
    }

    Ok(())
}
