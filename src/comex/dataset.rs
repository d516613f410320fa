//! A comex table held as a single Arrow record batch.

use crate::error::{CrewLabError, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::kernels::cmp::eq;
use arrow::compute::{cast, concat_batches, filter_record_batch};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const MONTH_COLUMN: &str = "CO_MES";
const DELIMITER: u8 = b';';
const BATCH_SIZE: usize = 8_192;

/// Summary statistics of a numeric column, ignoring nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; needs at least two values
    pub std: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ComexDataset {
    batch: RecordBatch,
}

impl ComexDataset {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Parse `;`-separated ISO-8859-1 CSV with a header row, inferring column types.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_latin1(bytes);
        let format = Format::default().with_header(true).with_delimiter(DELIMITER);

        let (schema, _) = format.infer_schema(Cursor::new(text.as_bytes()), None)?;
        let schema: SchemaRef = Arc::new(schema);

        let reader = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .with_batch_size(BATCH_SIZE)
            .build(Cursor::new(text.as_bytes()))?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;

        debug!(rows = batch.num_rows(), columns = batch.num_columns(), "Parsed comex CSV");
        Ok(Self { batch })
    }

    pub fn read_parquet(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.with_batch_size(BATCH_SIZE).build()?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            batch: concat_batches(&schema, &batches)?,
        })
    }

    /// Write to a temporary sibling and rename it into place, so readers never see a partial file.
    pub fn write_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("comex.parquet");
        let tmp_path = path.with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()));

        let written = self.write_parquet_file(&tmp_path).and_then(|_| Ok(fs::rename(&tmp_path, path)?));
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written
    }

    fn write_parquet_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();

        let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.batch.schema(), Some(props))?;
        writer.write(&self.batch)?;
        writer.close()?;
        Ok(())
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch.schema().fields().iter().map(|f| f.name().clone()).collect()
    }

    /// Rows whose `CO_MES` equals `month`.
    pub fn filter_month(&self, month: u32) -> Result<Self> {
        let months = cast(self.column(MONTH_COLUMN)?, &DataType::Int64)?;
        let mask = eq(&months, &Int64Array::new_scalar(i64::from(month)))?;

        Ok(Self {
            batch: filter_record_batch(&self.batch, &mask)?,
        })
    }

    pub fn mean(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.column_stats(column)?.mean)
    }

    /// The `n` most frequent values of a column, most frequent first.
    pub fn value_counts(&self, column: &str, n: usize) -> Result<Vec<(String, usize)>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in self.string_values(column)?.into_iter().flatten() {
            *counts.entry(value).or_default() += 1;
        }

        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(n);
        Ok(counts)
    }

    /// Sum `value_column` per distinct `group_column` and keep the `n` largest totals.
    pub fn top_by(&self, group_column: &str, value_column: &str, n: usize) -> Result<Vec<(String, f64)>> {
        let groups = self.string_values(group_column)?;
        let values = self.numeric_values(value_column)?;

        let mut totals: HashMap<String, f64> = HashMap::new();
        for (group, value) in groups.into_iter().zip(values) {
            if let (Some(group), Some(value)) = (group, value) {
                *totals.entry(group).or_default() += value;
            }
        }

        let mut totals: Vec<(String, f64)> = totals.into_iter().collect();
        totals.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        totals.truncate(n);
        Ok(totals)
    }

    pub fn column_stats(&self, column: &str) -> Result<ColumnStats> {
        let values: Vec<f64> = self.numeric_values(column)?.into_iter().flatten().collect();
        let count = values.len();
        let sum: f64 = values.iter().sum();

        if count == 0 {
            return Ok(ColumnStats {
                count,
                sum,
                mean: None,
                min: None,
                max: None,
                std: None,
            });
        }

        let mean = sum / count as f64;
        let std = (count > 1).then(|| {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        });

        Ok(ColumnStats {
            count,
            sum,
            mean: Some(mean),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            std,
        })
    }

    fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch.column_by_name(name).ok_or_else(|| {
            CrewLabError::DataError(format!(
                "Column '{}' not found (available: {})",
                name,
                self.column_names().join(", ")
            ))
        })
    }

    fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?;
        if !column.data_type().is_numeric() {
            return Err(CrewLabError::DataError(format!(
                "Column '{}' is not numeric ({})",
                name,
                column.data_type()
            )));
        }

        let floats = cast(column, &DataType::Float64)?;
        let floats = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| CrewLabError::DataError("Float64 cast failed".to_string()))?;
        Ok(floats.iter().collect())
    }

    fn string_values(&self, column: &str) -> Result<Vec<Option<String>>> {
        let strings = cast(self.column(column)?, &DataType::Utf8)?;
        let strings = strings
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| CrewLabError::DataError("Utf8 cast failed".to_string()))?;
        Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
    }
}

/// ISO-8859-1 maps every byte to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) const SAMPLE_CSV: &str = "\"CO_ANO\";\"CO_MES\";\"SH4\";\"CO_PAIS\";\"SG_UF_MUN\";\"CO_MUN\";\"KG_LIQUIDO\";\"VL_FOB\"\n\
        \"2024\";\"4\";\"1201\";\"160\";\"MT\";\"5107925\";\"1000\";\"500\"\n\
        \"2024\";\"4\";\"1201\";\"160\";\"MT\";\"5107925\";\"3000\";\"1500\"\n\
        \"2024\";\"4\";\"2601\";\"160\";\"MG\";\"3106200\";\"2000\";\"800\"\n\
        \"2024\";\"4\";\"0901\";\"249\";\"SP\";\"3550308\";\"500\";\"2500\"\n\
        \"2024\";\"5\";\"1201\";\"160\";\"MT\";\"5107925\";\"9000\";\"4000\"\n";

    pub(crate) fn sample() -> ComexDataset {
        ComexDataset::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_infers_columns() {
        let data = sample();

        assert_eq!(data.num_rows(), 5);
        assert_eq!(data.column_names()[1], "CO_MES");
        assert_eq!(data.batch().schema().field_with_name("KG_LIQUIDO").unwrap().data_type(), &DataType::Int64);
        assert_eq!(data.batch().schema().field_with_name("SG_UF_MUN").unwrap().data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_parse_decodes_latin1() {
        let bytes = b"NO_PAIS;VL_FOB\n\xC1frica do Sul;10\nJap\xE3o;20\n";

        let data = ComexDataset::from_csv_bytes(bytes).unwrap();

        assert_eq!(
            data.value_counts("NO_PAIS", 5).unwrap(),
            vec![("Japão".to_string(), 1), ("África do Sul".to_string(), 1)]
        );
    }

    #[test]
    fn test_filter_month() {
        let april = sample().filter_month(4).unwrap();
        let june = sample().filter_month(6).unwrap();

        assert_eq!(april.num_rows(), 4);
        assert!(june.is_empty());
    }

    #[test]
    fn test_mean() {
        let april = sample().filter_month(4).unwrap();

        assert_eq!(april.mean("KG_LIQUIDO").unwrap(), Some(1625.0));
    }

    #[test]
    fn test_value_counts() {
        let counts = sample().filter_month(4).unwrap().value_counts("SG_UF_MUN", 5).unwrap();

        assert_eq!(
            counts,
            vec![("MT".to_string(), 2), ("MG".to_string(), 1), ("SP".to_string(), 1)]
        );
    }

    #[test]
    fn test_top_by() {
        let top = sample().filter_month(4).unwrap().top_by("SG_UF_MUN", "VL_FOB", 2).unwrap();

        assert_eq!(top, vec![("SP".to_string(), 2500.0), ("MT".to_string(), 2000.0)]);
    }

    #[test]
    fn test_column_stats() {
        let stats = sample().filter_month(4).unwrap().column_stats("VL_FOB").unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.sum, 5300.0);
        assert_eq!(stats.mean, Some(1325.0));
        assert_eq!(stats.min, Some(500.0));
        assert_eq!(stats.max, Some(2500.0));
        assert!((stats.std.unwrap() - 888.3505314).abs() < 1e-3);
    }

    #[test]
    fn test_stats_of_empty_column() {
        let stats = sample().filter_month(6).unwrap().column_stats("VL_FOB").unwrap();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.std, None);
    }

    #[test]
    fn test_unknown_column_is_data_error() {
        let err = sample().mean("NAO_EXISTE").unwrap_err();

        match err {
            CrewLabError::DataError(message) => {
                assert!(message.contains("NAO_EXISTE"));
                assert!(message.contains("KG_LIQUIDO"));
            }
            other => panic!("Expected DataError, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_stats_reject_text_columns() {
        assert!(sample().column_stats("SG_UF_MUN").is_err());
    }

    #[test]
    fn test_parquet_round_trip_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EXP_2024.parquet");

        sample().write_parquet(&path).unwrap();
        let loaded = ComexDataset::read_parquet(&path).unwrap();

        assert_eq!(loaded.num_rows(), 5);
        assert_eq!(loaded.filter_month(4).unwrap().mean("KG_LIQUIDO").unwrap(), Some(1625.0));
    }

    #[test]
    fn test_parquet_write_replaces_existing_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EXP_2024.parquet");
        std::fs::write(&path, b"truncated").unwrap();

        sample().write_parquet(&path).unwrap();

        assert_eq!(ComexDataset::read_parquet(&path).unwrap().num_rows(), 5);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["EXP_2024.parquet".to_string()]);
    }

    #[test]
    fn test_failed_parquet_write_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("EXP_2024.parquet");

        assert!(sample().write_parquet(&path).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
