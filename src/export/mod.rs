//! Persistence of feature tables, rankings and run summaries

use crate::data::loader::FileFormat;
use crate::data::FeatureTable;
use crate::selection::FeatureRanking;
use crate::task::ResampleInstance;
use crate::utils::ensure_dir;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write a feature table as delimited text
///
/// Header is `sample`, the feature identifiers, then the label column. Values
/// are written with Rust's shortest round-trip formatting; NaN becomes `NA`.
pub fn write_table<W: Write>(table: &FeatureTable, writer: W, delimiter: u8) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    let mut header = Vec::with_capacity(table.n_columns() + 1);
    header.push("sample");
    header.extend(table.column_names());
    csv_writer.write_record(&header)?;

    for (sample, sample_id) in table.sample_ids().iter().enumerate() {
        let mut record = Vec::with_capacity(table.n_columns() + 1);
        record.push(sample_id.clone());
        record.extend(table.row(sample).iter().map(|&v| format_value(v)));
        record.push(table.labels()[sample].clone());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Save a feature table; format follows the file extension
pub fn save_table<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    if format.is_gzipped() {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_table(table, &mut encoder, format.delimiter())?;
        encoder.finish()?.flush()?;
    } else {
        write_table(table, BufWriter::new(file), format.delimiter())?;
    }

    info!(
        "Saved {} x {} table to {:?}",
        table.n_samples(),
        table.n_columns(),
        path
    );
    Ok(())
}

/// Write a ranking as `rank, feature, column, score`
pub fn write_ranking<W: Write>(ranking: &FeatureRanking, writer: W, delimiter: u8) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    csv_writer.write_record(["rank", "feature", "column", "score"])?;

    for (i, entry) in ranking.iter().enumerate() {
        csv_writer.write_record([
            (i + 1).to_string(),
            entry.feature.clone(),
            entry.column.to_string(),
            format_value(entry.score),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Save a ranking; format follows the file extension
pub fn save_ranking<P: AsRef<Path>>(ranking: &FeatureRanking, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    if format.is_gzipped() {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_ranking(ranking, &mut encoder, format.delimiter())?;
        encoder.finish()?.flush()?;
    } else {
        write_ranking(ranking, BufWriter::new(file), format.delimiter())?;
    }

    info!("Saved ranking of {} features to {:?}", ranking.len(), path);
    Ok(())
}

/// Write `train_<i>` and `test_<i>` tables for every split into `dir`
///
/// `extension` picks the format, e.g. `csv` or `tsv.gz`. Returns the written
/// paths, train before test, in split order.
pub fn save_split_tables<P: AsRef<Path>>(
    instance: &ResampleInstance,
    table: &FeatureTable,
    dir: P,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    let parts = instance
        .partition(table)
        .context("Splits do not match the table")?;

    let mut written = Vec::with_capacity(parts.len() * 2);
    for (i, (train, test)) in parts.iter().enumerate() {
        let train_path = dir.join(format!("train_{}.{}", i + 1, extension));
        let test_path = dir.join(format!("test_{}.{}", i + 1, extension));
        save_table(train, &train_path)?;
        save_table(test, &test_path)?;
        written.push(train_path);
        written.push(test_path);
    }
    Ok(written)
}

/// Save any serializable value as pretty JSON
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Saved JSON to {:?}", path);
    Ok(())
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        value.to_string()
    }
}
