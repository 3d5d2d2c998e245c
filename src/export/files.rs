//! Working-file accumulation and archive finalization.
//!
//! Writes happen on the blocking pool so a slow disk never stalls the runtime.

use crate::error::{Error, Result};
use crate::search::LogEntry;
use crate::types::SortOrder;
use crate::utils::format_nanos;
use std::cmp::Reverse;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Create (or truncate) an empty working file
pub(crate) async fn init_working_file(path: &Path) -> std::io::Result<()> {
    tokio::fs::File::create(path).await.map(|_| ())
}

/// Render one entry as a line of the export
pub(crate) fn format_entry(entry: &LogEntry, include_metadata: bool) -> String {
    if include_metadata {
        format!(
            "[{}][DESCRIPTOR-{}][INSTANCE-{}][SERVICE-GROUP-{}][SERVICE-{}]:{}\n",
            format_nanos(entry.timestamp),
            entry.app_descriptor_name,
            entry.app_instance_name,
            entry.service_group_name,
            entry.service_name,
            entry.msg
        )
    } else {
        format!("{}\n", entry.msg)
    }
}

/// Sort a page in the requested order and render its lines
///
/// The sort is stable: entries sharing a timestamp keep the order the search
/// returned them in.
pub(crate) fn render_page(
    mut entries: Vec<LogEntry>,
    order: SortOrder,
    include_metadata: bool,
) -> Vec<String> {
    match order {
        SortOrder::Asc => entries.sort_by_key(|e| e.timestamp),
        SortOrder::Desc => entries.sort_by_key(|e| Reverse(e.timestamp)),
    }
    entries
        .iter()
        .map(|e| format_entry(e, include_metadata))
        .collect()
}

/// Append lines to the working file
pub(crate) async fn append_lines(path: &Path, lines: Vec<String>) -> Result<()> {
    let path = path.to_path_buf();
    run_blocking(move || {
        let file = OpenOptions::new().append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        for line in &lines {
            writer.write_all(line.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    })
    .await
}

/// Compress the working file into a single-member deflate archive
///
/// The member is named after the working file.
pub(crate) async fn create_archive(working: &Path, archive: &Path) -> Result<()> {
    let working = working.to_path_buf();
    let archive = archive.to_path_buf();
    run_blocking(move || write_archive(&working, &archive)).await
}

fn write_archive(working: &Path, archive: &Path) -> Result<()> {
    let member = working
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::InvalidArgument(format!("invalid working file path: {}", working.display()))
        })?
        .to_string();

    let mut source = BufReader::new(File::open(working)?);
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive)?));

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(member, options)?;
    std::io::copy(&mut source, &mut zip)?;

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}

async fn run_blocking<F>(task: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::Internal(format!("file task failed: {e}")))?
}
