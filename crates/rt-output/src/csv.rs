//! CSV metrics backend.
//!
//! One file per [`Table`] in the configured directory, e.g.
//! `traffic_edge.csv`.  Files are opened in append mode so a restarted
//! process keeps adding to yesterday's output.  The header is taken from the
//! first tuple written to a new file; an existing file keeps its header and
//! later tuples are projected onto it (missing fields become empty cells,
//! extra fields are dropped).

use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::sink::{MetricsSink, Table, Tuple};
use crate::OutputResult;

struct TableFile {
    writer:  Writer<File>,
    columns: Vec<String>,
}

/// Appends metrics tuples to per-table CSV files.
pub struct CsvSink {
    dir:    PathBuf,
    tables: Mutex<FxHashMap<Table, TableFile>>,
}

impl CsvSink {
    /// Create `dir` if needed.  Files are opened lazily on first write.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf(), tables: Mutex::new(FxHashMap::default()) })
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }

    fn open(&self, table: Table, first: &Tuple) -> OutputResult<TableFile> {
        let path = self.path(table);
        let existing = match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => {
                let mut reader = csv::Reader::from_path(&path)?;
                Some(reader.headers()?.iter().map(str::to_owned).collect::<Vec<_>>())
            }
            _ => None,
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        let columns = match existing {
            Some(columns) => columns,
            None => {
                let columns: Vec<String> = first.keys().map(str::to_owned).collect();
                writer.write_record(&columns)?;
                columns
            }
        };
        debug!(table = %table, path = %path.display(), columns = columns.len(), "metrics file opened");
        Ok(TableFile { writer, columns })
    }

    /// Flush every open file.
    ///
    /// Idempotent — safe to call more than once.
    pub fn finish(&self) -> OutputResult<()> {
        for file in self.tables.lock().values_mut() {
            file.writer.flush()?;
        }
        Ok(())
    }
}

impl MetricsSink for CsvSink {
    fn record(&self, table: Table, tuples: &[Tuple]) -> OutputResult<()> {
        let Some(first) = tuples.first() else { return Ok(()) };
        let mut tables = self.tables.lock();
        let file = match tables.entry(table) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.open(table, first)?),
        };

        for tuple in tuples {
            let row: Vec<String> = file
                .columns
                .iter()
                .map(|c| tuple.get(c).map(ToString::to_string).unwrap_or_default())
                .collect();
            file.writer.write_record(&row)?;
        }
        file.writer.flush()?;
        Ok(())
    }
}
