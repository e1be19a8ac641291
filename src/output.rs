//! Record output
//!
//! Records are written as JSON lines, one `{"id": ..., "record": ...}` object per line,
//! where `record` is the organization's knowledge-base frame.
//! [`JsonlRecordWriter`] writes to `<output>.tmp` and renames it over the target only on
//! [`JsonlRecordWriter::commit`], so a failed run never publishes a partial file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::frame::organization_frame;
use crate::kb::ItemId;
use crate::models::OrganizationRecord;

/// Sink for (identifier, record) pairs
pub trait RecordWriter {
    fn write(&mut self, id: &ItemId, record: &OrganizationRecord) -> PipelineResult<()>;
}

#[derive(Serialize)]
struct OutputLine<'a> {
    id: &'a ItemId,
    record: Value,
}

/// JSON-lines writer with atomic publish
pub struct JsonlRecordWriter {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
    committed: bool,
}

impl JsonlRecordWriter {
    /// Create the temporary file next to `path`
    pub fn create(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::io_with_path(parent, "creating output directory", e)
            })?;
        }
        let temp_path = temp_path(path);
        let file = File::create(&temp_path)
            .map_err(|e| PipelineError::io_with_path(&temp_path, "creating output file", e))?;
        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer: Some(BufWriter::new(file)),
            written: 0,
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush and move the temporary file over the target
    pub fn commit(mut self) -> PipelineResult<usize> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| PipelineError::io_with_path(&self.temp_path, "flushing output", e))?;
            let file = writer.into_inner().map_err(|e| {
                PipelineError::io_with_path(&self.temp_path, "flushing output", e.into_error())
            })?;
            file.sync_all()
                .map_err(|e| PipelineError::io_with_path(&self.temp_path, "syncing output", e))?;
        }
        fs::rename(&self.temp_path, &self.path)
            .map_err(|e| PipelineError::io_with_path(&self.path, "publishing output", e))?;
        self.committed = true;
        tracing::info!(path = %self.path.display(), records = self.written, "Output published");
        Ok(self.written)
    }

    /// Discard everything written so far
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.committed {
            return;
        }
        self.writer.take();
        if let Err(e) = fs::remove_file(&self.temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.temp_path.display(),
                    error = %e,
                    "Failed to remove temporary output"
                );
            }
        }
        self.committed = true;
    }
}

impl RecordWriter for JsonlRecordWriter {
    fn write(&mut self, id: &ItemId, record: &OrganizationRecord) -> PipelineResult<()> {
        let temp_path = &self.temp_path;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::ConfigError("output already closed".to_string()))?;
        let record = organization_frame(record).into_value();
        serde_json::to_writer(&mut *writer, &OutputLine { id, record })?;
        writer
            .write_all(b"\n")
            .map_err(|e| PipelineError::io_with_path(temp_path, "writing output", e))?;
        self.written += 1;
        Ok(())
    }
}

impl Drop for JsonlRecordWriter {
    fn drop(&mut self) {
        self.discard();
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
