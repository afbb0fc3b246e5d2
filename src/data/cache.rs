//! Parquet cache for fetched bars.
//!
//! Layout: `timestamp` (Int64, epoch ms UTC), `open`/`high`/`low`/`close`/
//! `volume` (Float64) and `pair` (Utf8), Brotli-compressed. Any null in the
//! file marks it dirty; the store then refetches instead of repairing it.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Float64Builder, Int64Array, Int64Builder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;

use crate::error::DataError;
use crate::types::{PairId, PriceBar, PriceBarSeries};

const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Clone, Debug, PartialEq)]
pub enum CacheState {
    Missing,
    /// File exists but contains `nulls` null cells.
    Dirty { nulls: usize },
    Clean(PriceBarSeries),
}

pub fn schema() -> Schema {
    let mut fields = vec![Field::new("timestamp", DataType::Int64, true)];
    for name in PRICE_COLUMNS {
        fields.push(Field::new(name, DataType::Float64, true));
    }
    fields.push(Field::new("pair", DataType::Utf8, true));
    Schema::new(fields)
}

pub fn write_cache(path: &Path, series: &PriceBarSeries) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    let n = series.len();
    let mut ts = Int64Builder::with_capacity(n);
    let mut cols: Vec<Float64Builder> = (0..PRICE_COLUMNS.len())
        .map(|_| Float64Builder::with_capacity(n))
        .collect();
    let mut pair = StringBuilder::with_capacity(n, n * 8);

    for bar in series.bars() {
        ts.append_value(bar.timestamp.timestamp_millis());
        for (builder, v) in cols
            .iter_mut()
            .zip([bar.open, bar.high, bar.low, bar.close, bar.volume])
        {
            builder.append_value(v);
        }
        pair.append_value(&bar.pair.0);
    }

    let mut columns: Vec<ArrayRef> = vec![Arc::new(ts.finish())];
    for builder in cols.iter_mut() {
        columns.push(Arc::new(builder.finish()));
    }
    columns.push(Arc::new(pair.finish()));

    let schema = Arc::new(schema());
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::default()))
        .build();

    // Write beside the target, then rename.
    let tmp = path.with_extension("parquet.partial");
    let file = File::create(&tmp).map_err(|e| DataError::io(&tmp, e))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    std::fs::rename(&tmp, path).map_err(|e| DataError::io(path, e))?;

    tracing::info!(path = %path.display(), rows = n, "wrote bar cache");
    Ok(())
}

pub fn read_cache(path: &Path) -> Result<CacheState, DataError> {
    if !path.exists() {
        return Ok(CacheState::Missing);
    }
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut bars = Vec::new();
    let mut nulls = 0usize;
    for batch in reader {
        let batch = batch?;
        let batch_nulls: usize = batch.columns().iter().map(|c| c.null_count()).sum();
        if batch_nulls > 0 {
            nulls += batch_nulls;
            continue;
        }
        decode_batch(&batch, &mut bars)?;
    }

    if nulls > 0 {
        return Ok(CacheState::Dirty { nulls });
    }
    Ok(CacheState::Clean(PriceBarSeries::new(bars)))
}

fn decode_batch(batch: &RecordBatch, out: &mut Vec<PriceBar>) -> Result<(), DataError> {
    let ts = column::<Int64Array>(batch, "timestamp")?;
    let open = column::<Float64Array>(batch, "open")?;
    let high = column::<Float64Array>(batch, "high")?;
    let low = column::<Float64Array>(batch, "low")?;
    let close = column::<Float64Array>(batch, "close")?;
    let volume = column::<Float64Array>(batch, "volume")?;
    let pair = column::<StringArray>(batch, "pair")?;

    for i in 0..batch.num_rows() {
        let timestamp = Utc
            .timestamp_millis_opt(ts.value(i))
            .single()
            .ok_or_else(|| DataError::Malformed(format!("timestamp {} out of range", ts.value(i))))?;
        out.push(PriceBar {
            timestamp,
            open: open.value(i),
            high: high.value(i),
            low: low.value(i),
            close: close.value(i),
            volume: volume.value(i),
            pair: PairId(pair.value(i).to_string()),
        });
    }
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a T, DataError> {
    batch
        .column_by_name(name)
        .ok_or(DataError::MissingColumn(name))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or(DataError::ColumnType(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> PriceBarSeries {
        let mut bars = Vec::new();
        for (p, pair) in ["ETH/BTC", "LTC/BTC"].iter().enumerate() {
            for i in 0..50i64 {
                let c = 0.05 + p as f64 + i as f64 * 1e-4;
                bars.push(PriceBar {
                    timestamp: Utc.timestamp_millis_opt(1_738_368_000_000 + i * 60_000).unwrap(),
                    open: c - 1e-5,
                    high: c + 2e-5,
                    low: c - 3e-5,
                    close: c,
                    volume: 12.5 + i as f64,
                    pair: PairId(pair.to_string()),
                });
            }
        }
        PriceBarSeries::new(bars)
    }

    #[test]
    fn round_trip_preserves_rows_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("bars.parquet");
        let series = sample();

        write_cache(&path, &series).unwrap();
        assert!(!path.with_extension("parquet.partial").exists());

        match read_cache(&path).unwrap() {
            CacheState::Clean(back) => assert_eq!(back, series),
            other => panic!("unexpected cache state: {other:?}"),
        }

        let file = File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        assert_eq!(builder.schema().fields(), schema().fields());
    }

    #[test]
    fn missing_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_cache(&dir.path().join("nope.parquet")).unwrap(), CacheState::Missing);
    }

    #[test]
    fn nulls_mark_cache_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirty.parquet");

        let schema = Arc::new(schema());
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![1_000, 2_000])),
            Arc::new(Float64Array::from(vec![1.0, 1.0])),
            Arc::new(Float64Array::from(vec![1.0, 1.0])),
            Arc::new(Float64Array::from(vec![1.0, 1.0])),
            Arc::new(Float64Array::from(vec![Some(1.0), None])),
            Arc::new(Float64Array::from(vec![5.0, 5.0])),
            Arc::new(StringArray::from(vec!["ETH/BTC", "ETH/BTC"])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        assert_eq!(read_cache(&path).unwrap(), CacheState::Dirty { nulls: 1 });
    }
}
