//! Model and feature-schema files
//!
//! Both artifacts are bincode-encoded and fully overwritten on every save. The
//! two files are written independently: a failure on the second write leaves
//! the first one already replaced.

use crate::error::Result;
use crate::random_forest::RandomForest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const MODEL_FILE: &str = "pd_model.pkl";
pub const FEATURE_NAMES_FILE: &str = "feature_names.pkl";

fn write_bincode<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_model(path: impl AsRef<Path>, model: &RandomForest) -> Result<()> {
    write_bincode(path.as_ref(), model)
}

pub fn load_model(path: impl AsRef<Path>) -> Result<RandomForest> {
    read_bincode(path.as_ref())
}

pub fn save_feature_names(path: impl AsRef<Path>, names: &[String]) -> Result<()> {
    write_bincode(path.as_ref(), names)
}

pub fn load_feature_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    read_bincode(path.as_ref())
}
