//! Training-data export: normalized frames as CSV rows.
//!
//! The layout matches what the classifier is trained on. There are four
//! columns per landmark (`NOSE_X`, `NOSE_Y`, `NOSE_Z`, `NOSE_V`, ...), then a
//! `Pose_Class` column.

use crate::error::Result;
use crate::frames::FrameRecord;
use crate::pose::landmark::LandmarkName;
use crate::pose::normalizer::{FeatureVector, Normalizer};
use std::io::Write;
use tracing::{debug, warn};

/// Name of the trailing class column.
pub const CLASS_COLUMN: &str = "Pose_Class";

const CHANNEL_SUFFIXES: [&str; 4] = ["X", "Y", "Z", "V"];

/// Header row: feature columns followed by the class column.
pub fn column_names() -> Vec<String> {
    let mut names: Vec<String> = LandmarkName::ALL
        .iter()
        .flat_map(|name| {
            let upper = column_stem(*name);
            CHANNEL_SUFFIXES
                .iter()
                .map(move |suffix| format!("{}_{}", upper, suffix))
        })
        .collect();
    names.push(CLASS_COLUMN.to_string());
    names
}

/// Upper-case landmark name as used in column headers.
///
/// The detector's own enum names drop the `_1`/`_2` suffixes of the
/// vocabulary (`LEFT_PINKY`, not `LEFT_PINKY_1`).
fn column_stem(name: LandmarkName) -> String {
    let raw = name.as_str();
    let stem = raw
        .strip_suffix("_1")
        .or_else(|| raw.strip_suffix("_2"))
        .unwrap_or(raw);
    stem.to_uppercase()
}

/// Writes feature rows to any `Write` sink.
pub struct DatasetWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl<W: Write> DatasetWriter<W> {
    /// Creates a writer and emits the header row.
    pub fn new(sink: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(column_names())?;
        Ok(Self { writer, rows: 0 })
    }

    /// Appends one labeled sample.
    pub fn write_sample(&mut self, features: &FeatureVector, class: &str) -> Result<()> {
        let mut record: Vec<String> = features.as_slice().iter().map(|v| v.to_string()).collect();
        record.push(class.to_string());
        self.writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of samples written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes buffered rows and returns the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| crate::error::PosewatchError::Io(e.into_error()))
    }
}

/// Counts for one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Normalizes every record and appends it to `writer`.
///
/// `class` overrides the class stored in each record. Records without a pose,
/// without a class, or that fail to normalize are skipped with a warning.
pub fn export_records<W, I>(
    records: I,
    normalizer: &Normalizer,
    class: Option<&str>,
    writer: &mut DatasetWriter<W>,
) -> Result<ExportSummary>
where
    W: Write,
    I: IntoIterator<Item = FrameRecord>,
{
    let mut summary = ExportSummary::default();

    for (index, record) in records.into_iter().enumerate() {
        if record.landmarks.is_empty() {
            debug!(frame = index, "no pose, skipping");
            summary.skipped += 1;
            continue;
        }

        let Some(label) = class.or(record.class.as_deref()) else {
            warn!(frame = index, "record has no class, skipping");
            summary.skipped += 1;
            continue;
        };

        match normalizer.normalize(&record.landmarks) {
            Ok(features) => {
                writer.write_sample(&features, label)?;
                summary.written += 1;
            }
            Err(e) => {
                warn!(frame = index, error = %e, "cannot normalize, skipping");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}
