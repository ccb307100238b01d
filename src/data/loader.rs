use crate::data::{is_missing_token, FeatureTable, MeasurementContainer, DEFAULT_LABEL_COLUMN};
use crate::error::AdapterError;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use flate2::read::GzDecoder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Csv,
    Tsv,
    GzippedCsv,
    GzippedTsv,
}

impl FileFormat {
    /// Detect file format from path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str());
        let stem = path.file_stem().and_then(|s| s.to_str());

        match (ext, stem) {
            (Some("gz"), Some(stem)) => {
                if stem.ends_with(".csv") {
                    Ok(FileFormat::GzippedCsv)
                } else if stem.ends_with(".tsv") || stem.ends_with(".txt") {
                    Ok(FileFormat::GzippedTsv)
                } else {
                    Err(anyhow::anyhow!("Cannot determine format of gzipped file {:?}", path))
                }
            }
            (Some("csv"), _) => Ok(FileFormat::Csv),
            (Some("tsv"), _) | (Some("txt"), _) => Ok(FileFormat::Tsv),
            _ => Err(anyhow::anyhow!("Unsupported file format: {:?}", path)),
        }
    }

    /// Get delimiter character
    pub fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv | FileFormat::GzippedCsv => b',',
            FileFormat::Tsv | FileFormat::GzippedTsv => b'\t',
        }
    }

    /// Check if format is gzipped
    pub fn is_gzipped(&self) -> bool {
        matches!(self, FileFormat::GzippedCsv | FileFormat::GzippedTsv)
    }
}

/// Data loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Sample identifier column in sample sheets
    pub sample_column: String,
    /// Class label column in sample sheets and feature tables
    pub label_column: String,
    /// Maximum number of feature rows to load (0 = unlimited)
    pub max_features: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sample_column: "sample".to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            max_features: 0,
        }
    }
}

/// Per-sample class labels read from a sample sheet
#[derive(Debug, Clone, Default)]
pub struct SampleSheet {
    labels: HashMap<String, Option<String>>,
}

impl SampleSheet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of one sample; `None` if absent from the sheet or missing
    pub fn label(&self, sample: &str) -> Option<&str> {
        self.labels.get(sample).and_then(|l| l.as_deref())
    }

    /// Labels aligned to `sample_ids`
    pub fn labels_for(&self, sample_ids: &[String]) -> Vec<Option<String>> {
        let unknown = sample_ids
            .iter()
            .filter(|s| !self.labels.contains_key(s.as_str()))
            .count();
        if unknown > 0 {
            warn!("{} samples are not listed in the sample sheet", unknown);
        }
        sample_ids
            .iter()
            .map(|s| self.label(s).map(str::to_string))
            .collect()
    }
}

/// Loader for expression matrices, sample sheets and exported tables
pub struct DataLoader {
    config: LoaderConfig,
}

impl DataLoader {
    /// Create new data loader with default config
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create new data loader with custom config
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load an expression matrix and attach labels from a sample sheet
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        matrix_path: P,
        sample_sheet_path: Q,
    ) -> Result<MeasurementContainer> {
        let container = self.load_matrix(matrix_path)?;
        let sheet = self.load_sample_sheet(sample_sheet_path)?;
        let labels = sheet.labels_for(container.sample_ids());
        Ok(container.with_labels(labels)?)
    }

    /// Load a features-by-samples expression matrix
    pub fn load_matrix<P: AsRef<Path>>(&self, path: P) -> Result<MeasurementContainer> {
        let path = path.as_ref();
        info!("Loading expression matrix from {:?}", path);
        let (reader, format) = open(path)?;
        let container = self
            .parse_matrix(reader, format)
            .with_context(|| format!("Failed to load expression matrix from {:?}", path))?;
        info!(
            "Loaded {} features x {} samples",
            container.n_features(),
            container.n_samples()
        );
        Ok(container)
    }

    /// Load a sample sheet holding the sample and label columns
    pub fn load_sample_sheet<P: AsRef<Path>>(&self, path: P) -> Result<SampleSheet> {
        let path = path.as_ref();
        info!("Loading sample sheet from {:?}", path);
        let (reader, format) = open(path)?;
        self.parse_sample_sheet(reader, format)
            .with_context(|| format!("Failed to load sample sheet from {:?}", path))
    }

    /// Load a feature table written by the export module
    pub fn load_feature_table<P: AsRef<Path>>(&self, path: P) -> Result<FeatureTable> {
        let path = path.as_ref();
        info!("Loading feature table from {:?}", path);
        let (reader, format) = open(path)?;
        self.parse_feature_table(reader, format)
            .with_context(|| format!("Failed to load feature table from {:?}", path))
    }

    /// Parse matrix rows: feature identifier followed by one value per sample
    fn parse_matrix<R: Read>(&self, reader: R, format: FileFormat) -> Result<MeasurementContainer> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            bail!("Expression matrix needs an identifier column and at least one sample");
        }
        let sample_ids: Vec<String> = headers.iter().skip(1).map(|s| s.trim().to_string()).collect();
        ensure_unique(&sample_ids, "sample")?;
        debug!("Samples: {:?}", sample_ids);

        let mut feature_ids = Vec::new();
        let mut rows = Vec::new();

        for (line, result) in csv_reader.records().enumerate() {
            let record = result.context("Failed to parse matrix record")?;
            let line = line + 2;

            let feature_id = record
                .get(0)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .with_context(|| format!("Missing feature identifier at line {}", line))?;

            let row = record
                .iter()
                .skip(1)
                .map(parse_value)
                .collect::<Result<Vec<f64>>>()
                .with_context(|| format!("Invalid value for feature {} at line {}", feature_id, line))?;

            feature_ids.push(feature_id);
            rows.push(row);

            if self.config.max_features > 0 && rows.len() >= self.config.max_features {
                warn!("Reached maximum feature limit: {}", self.config.max_features);
                break;
            }
            if rows.len() % 10_000 == 0 {
                debug!("Loaded {} features...", rows.len());
            }
        }

        Ok(MeasurementContainer::from_rows(feature_ids, sample_ids, &rows)?)
    }

    fn parse_sample_sheet<R: Read>(&self, reader: R, format: FileFormat) -> Result<SampleSheet> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let position = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AdapterError::ColumnNotFound(name.to_string()).into())
        };
        let sample_idx = position(&self.config.sample_column)?;
        let label_idx = position(&self.config.label_column)?;

        let mut labels = HashMap::new();
        let mut missing = 0usize;
        for result in csv_reader.records() {
            let record = result.context("Failed to parse sample sheet record")?;
            let sample = record.get(sample_idx).unwrap_or("").trim().to_string();
            if sample.is_empty() {
                warn!("Skipping sample sheet row without sample identifier");
                continue;
            }
            let label = record
                .get(label_idx)
                .filter(|l| !is_missing_token(l))
                .map(|l| l.trim().to_string());
            if label.is_none() {
                missing += 1;
            }
            if labels.insert(sample.clone(), label).is_some() {
                bail!("Sample {} listed more than once in sample sheet", sample);
            }
        }

        info!(
            "Loaded {} sample labels ({} missing)",
            labels.len(),
            missing
        );
        Ok(SampleSheet { labels })
    }

    /// Parse `sample, <features...>, <label column>` rows
    fn parse_feature_table<R: Read>(&self, reader: R, format: FileFormat) -> Result<FeatureTable> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let label_idx = headers
            .iter()
            .position(|h| h.trim() == self.config.label_column)
            .ok_or_else(|| AdapterError::ColumnNotFound(self.config.label_column.clone()))?;
        if label_idx == 0 {
            bail!("First column must hold sample identifiers");
        }
        let feature_cols: Vec<usize> = (1..headers.len()).filter(|&i| i != label_idx).collect();
        let feature_ids: Vec<String> = feature_cols
            .iter()
            .map(|&i| headers[i].trim().to_string())
            .collect();

        let mut sample_ids = Vec::new();
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (line, result) in csv_reader.records().enumerate() {
            let record = result.context("Failed to parse table record")?;
            let line = line + 2;

            let label = record
                .get(label_idx)
                .filter(|l| !is_missing_token(l))
                .with_context(|| format!("Missing label at line {}", line))?;
            let row = feature_cols
                .iter()
                .map(|&i| parse_value(record.get(i).unwrap_or("")))
                .collect::<Result<Vec<f64>>>()
                .with_context(|| format!("Invalid value at line {}", line))?;

            sample_ids.push(record.get(0).unwrap_or("").trim().to_string());
            labels.push(label.trim().to_string());
            rows.push(row);
        }

        Ok(FeatureTable::new(
            sample_ids,
            feature_ids,
            &rows,
            labels,
            self.config.label_column.clone(),
        )?)
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a plain or gzipped file, detecting its format from the extension
fn open(path: &Path) -> Result<(Box<dyn Read>, FileFormat)> {
    let format = FileFormat::from_path(path)?;
    debug!("Detected file format: {:?}", format);

    let file = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;
    let reader: Box<dyn Read> = if format.is_gzipped() {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok((reader, format))
}

/// Parse one numeric cell; missing tokens become NaN
fn parse_value(cell: &str) -> Result<f64> {
    if is_missing_token(cell) {
        return Ok(f64::NAN);
    }
    cell.trim()
        .parse::<f64>()
        .with_context(|| format!("Not a number: {:?}", cell))
}

fn ensure_unique(ids: &[String], what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            bail!("Duplicate {} identifier: {}", what, id);
        }
    }
    Ok(())
}

/// Load an annotation map (`from`, `to`) from a two-column file
///
/// The first row is a header and is skipped. Rows with an empty target are
/// skipped; extra columns are ignored.
pub fn load_annotation<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let (reader, format) = open(path)?;
    parse_annotation(reader, format.delimiter())
        .with_context(|| format!("Failed to load annotation from {:?}", path))
}

fn parse_annotation<R: Read>(reader: R, delimiter: u8) -> Result<HashMap<String, String>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut mapping = HashMap::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.records().enumerate().skip(1) {
        let record = result.with_context(|| format!("Failed to parse annotation line {}", line + 1))?;
        let (from, to) = match (record.get(0), record.get(1)) {
            (Some(from), Some(to)) if !from.is_empty() && !is_missing_token(to) => (from, to),
            _ => {
                skipped += 1;
                continue;
            }
        };
        mapping.insert(from.to_string(), to.to_string());
    }

    if skipped > 0 {
        debug!("Skipped {} annotation rows without target", skipped);
    }
    info!("Loaded {} annotation records", mapping.len());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    #[test]
    fn test_file_format_detection() {
        assert_eq!(FileFormat::from_path("data.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path("data.tsv").unwrap(), FileFormat::Tsv);
        assert_eq!(FileFormat::from_path("data.csv.gz").unwrap(), FileFormat::GzippedCsv);
        assert_eq!(FileFormat::from_path("data.tsv.gz").unwrap(), FileFormat::GzippedTsv);
        assert!(FileFormat::from_path("data.parquet").is_err());
    }

    #[test]
    fn test_parse_matrix() {
        let data = "id_ref,S1,S2,S3\n1007_s_at,5.1,NA,4\n1053_at,2,3,4\n";
        let loader = DataLoader::new();
        let container = loader.parse_matrix(Cursor::new(data), FileFormat::Csv).unwrap();

        assert_eq!(container.n_features(), 2);
        assert_eq!(container.n_samples(), 3);
        assert_eq!(container.feature_ids()[0], "1007_s_at");
        assert_eq!(container.value(0, 0), 5.1);
        assert!(container.value(0, 1).is_nan());
        assert_eq!(container.feature_row(1), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_parse_matrix_rejects_text_values() {
        let data = "id_ref\tS1\ng1\thigh\n";
        let loader = DataLoader::new();
        assert!(loader.parse_matrix(Cursor::new(data), FileFormat::Tsv).is_err());
    }

    #[test]
    fn test_parse_matrix_duplicate_features() {
        let data = "id_ref,S1\ng1,1\ng1,2\ng2,3\n";
        let loader = DataLoader::new();
        let err = loader
            .parse_matrix(Cursor::new(data), FileFormat::Csv)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AdapterError>(),
            Some(&AdapterError::DuplicateFeatureIdentifier("g1".into()))
        );
    }

    #[test]
    fn test_sample_sheet_alignment() {
        let data = "sample,subtype,age\nS3,Basal,50\nS1,LumA,61\nS2,NA,44\n";
        let loader = DataLoader::with_config(LoaderConfig {
            label_column: "subtype".to_string(),
            ..LoaderConfig::default()
        });
        let sheet = loader.parse_sample_sheet(Cursor::new(data), FileFormat::Csv).unwrap();

        let samples = vec!["S1".to_string(), "S2".to_string(), "S3".to_string(), "S4".to_string()];
        assert_eq!(
            sheet.labels_for(&samples),
            vec![Some("LumA".to_string()), None, Some("Basal".to_string()), None]
        );
    }

    #[test]
    fn test_sample_sheet_missing_label_column() {
        let data = "sample,age\nS1,50\n";
        let loader = DataLoader::new();
        let err = loader
            .parse_sample_sheet(Cursor::new(data), FileFormat::Csv)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AdapterError>(),
            Some(&AdapterError::ColumnNotFound("Class".into()))
        );
    }

    #[test]
    fn test_parse_feature_table() {
        let data = "sample,g1,g2,Class\nS1,1,2,A\nS2,3,4,B\n";
        let loader = DataLoader::new();
        let table = loader.parse_feature_table(Cursor::new(data), FileFormat::Csv).unwrap();

        assert_eq!(table.column_names(), vec!["g1", "g2", "Class"]);
        assert_eq!(table.row(1), &[3.0, 4.0]);
        assert_eq!(table.labels(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_load_gzipped_files() {
        let dir = TempDir::new().unwrap();
        let matrix_path = dir.path().join("expr.tsv.gz");
        let sheet_path = dir.path().join("samples.csv");

        let mut encoder = GzEncoder::new(File::create(&matrix_path).unwrap(), Compression::default());
        encoder.write_all(b"gene\tS1\tS2\nTP53\t1.5\t2.5\n").unwrap();
        encoder.finish().unwrap();
        std::fs::write(&sheet_path, "sample,Class\nS1,tumor\nS2,normal\n").unwrap();

        let container = DataLoader::new().load(&matrix_path, &sheet_path).unwrap();
        assert_eq!(container.feature_row(0), &[1.5, 2.5]);
        assert_eq!(
            container.labels(),
            &[Some("tumor".to_string()), Some("normal".to_string())]
        );
    }

    #[test]
    fn test_parse_matrix_rejects_infinite_values() {
        let data = "id_ref,S1,S2,S3\nflat,1,1,1\nspread,1,5,9\nodd,inf,1,1\n";
        let loader = DataLoader::new();
        let err = loader
            .parse_matrix(Cursor::new(data), FileFormat::Csv)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AdapterError>(),
            Some(&AdapterError::NonFiniteValue {
                feature: "odd".into(),
                sample: "S1".into(),
            })
        );
    }

    #[test]
    fn test_parse_feature_table_rejects_infinite_values() {
        let data = "sample,g1,Class\nS1,-Infinity,A\n";
        let loader = DataLoader::new();
        let err = loader
            .parse_feature_table(Cursor::new(data), FileFormat::Csv)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdapterError>(),
            Some(AdapterError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_parse_annotation() {
        let data = "id_ref\tsymbol\n1007_s_at\tDDR1\n1053_at\tRFC2\n117_at\tNA\n121_at\n";
        let mapping = parse_annotation(Cursor::new(data), b'\t').unwrap();

        assert_eq!(mapping.get("1007_s_at").map(String::as_str), Some("DDR1"));
        assert_eq!(mapping.get("117_at"), None);
        assert_eq!(mapping.get("id_ref"), None);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_parse_annotation_quoted_fields() {
        let data = "ID,Gene Symbol,Title\n\"200000_s_at\",\"PRPF8\",\"pre-mRNA processing factor 8\"\n\"200001_at\",\"CAPNS1, CAPN4\",\"calpain\"\n";
        let mapping = parse_annotation(Cursor::new(data), b',').unwrap();

        assert_eq!(mapping.get("200000_s_at").map(String::as_str), Some("PRPF8"));
        assert_eq!(mapping.get("200001_at").map(String::as_str), Some("CAPNS1, CAPN4"));
        assert!(!mapping.contains_key("ID"));
        assert_eq!(mapping.len(), 2);
    }
}
