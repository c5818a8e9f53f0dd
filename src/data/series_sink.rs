use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Destination for a finished numeric series (a plot, a file, ...).
pub trait SeriesSink {
    fn write_series(&mut self, label: &str, values: &[f64]) -> Result<()>;
}

/// On-disk layout written by [`JsonSeriesSink`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesFile {
    pub title: String,
    pub values: Vec<f64>,
}

/// Writes each series to `<dir>/<label>.json`.
pub struct JsonSeriesSink {
    dir: PathBuf,
}

impl JsonSeriesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}.json", label))
    }

    pub fn read(path: &Path) -> Result<SeriesFile> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        serde_json::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))
    }
}

impl SeriesSink for JsonSeriesSink {
    fn write_series(&mut self, label: &str, values: &[f64]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.dir))?;

        let path = self.path_for(label);
        let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        let series = SeriesFile {
            title: label.to_string(),
            values: values.to_vec(),
        };
        serde_json::to_writer(BufWriter::new(file), &series)
            .with_context(|| format!("Failed to write {:?}", path))?;

        log::info!("Wrote {} values to {:?}", values.len(), path);
        Ok(())
    }
}
