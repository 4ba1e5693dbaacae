//! JSON and CSV output files
//!
//! The URL collection is stored as pretty-printed JSON, nutrition records as
//! UTF-8 CSV with a fixed header. Parent directories are created on write.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use nutri_core::{NutriError, NutritionRecord, Result, UrlCollectionRecord};
use tokio::fs;
use tracing::{debug, info, warn};

/// Write a URL collection record, validating it first
pub async fn write_url_record(path: &Path, record: &UrlCollectionRecord) -> Result<()> {
    record.validate()?;
    ensure_parent(path).await?;

    let data = serde_json::to_vec_pretty(record)?;
    debug!("Writing URL record: {}", path.display());
    fs::write(path, data).await?;

    Ok(())
}

/// Read a URL collection record
///
/// A missing file is reported as [`NutriError::UrlFileMissing`].
pub async fn read_url_record(path: &Path) -> Result<UrlCollectionRecord> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(NutriError::UrlFileMissing(path.to_path_buf()));
    }

    debug!("Reading URL record: {}", path.display());
    let data = fs::read(path).await?;
    let record: UrlCollectionRecord = serde_json::from_slice(&data)?;
    record.validate()?;

    Ok(record)
}

/// Write nutrition records as CSV
///
/// Returns `Ok(None)` without touching the filesystem when there is nothing
/// to write, otherwise the number of data rows written.
pub async fn write_nutrition_csv(path: &Path, records: &[NutritionRecord]) -> Result<Option<usize>> {
    if records.is_empty() {
        warn!("No records to write, skipping {}", path.display());
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(NutritionRecord::HEADER)
        .map_err(|e| NutriError::Csv(e.to_string()))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| NutriError::Csv(e.to_string()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| NutriError::Csv(e.to_string()))?;

    ensure_parent(path).await?;
    fs::write(path, data).await?;
    info!("Wrote {} records to {}", records.len(), path.display());

    Ok(Some(records.len()))
}

/// A generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// JSON files in `data_dir` and CSV files in `data_dir/csv`, sorted by path
pub async fn list_outputs(data_dir: &Path) -> Result<Vec<OutputFile>> {
    let mut outputs = Vec::new();
    collect_with_extension(data_dir, "json", &mut outputs).await?;
    collect_with_extension(&data_dir.join("csv"), "csv", &mut outputs).await?;
    outputs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(outputs)
}

/// Delete every file [`list_outputs`] reports; returns the removed paths
pub async fn clean_outputs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for output in list_outputs(data_dir).await? {
        fs::remove_file(&output.path).await?;
        debug!("Removed {}", output.path.display());
        removed.push(output.path);
    }
    Ok(removed)
}

async fn collect_with_extension(dir: &Path, extension: &str, out: &mut Vec<OutputFile>) -> Result<()> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        out.push(OutputFile {
            path,
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}
