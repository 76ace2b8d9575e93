pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use bbox::{prelude::*, Transform, XYWH};
pub use itertools::Itertools as _;
pub use label::Label;
pub use lazy_static::lazy_static;
pub use log::{debug, info, warn};
pub use ndarray::{Array2, Array3, Array4, ArrayView3, ArrayViewMut3, Axis};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt,
    fmt::Debug,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
