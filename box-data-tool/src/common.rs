pub use anyhow::{ensure, format_err, Context as _, Result};
pub use box_data::{BoxDataLayerInit, Config};
pub use itertools::Itertools as _;
pub use log::info;
pub use std::{
    env, fs,
    path::{Path, PathBuf},
};
