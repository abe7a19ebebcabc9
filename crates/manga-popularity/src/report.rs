//! Filtered, popularity-ranked report of an enriched manga list.

use crate::error::{PipelineError, Result};
use serde_json::Value;
use shared::{EnrichedEntry, ReadingStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Columns written before the passthrough fields
const LEADING_COLUMNS: [&str; 4] = ["mal_id", "title", "reading_status", "score"];
const POPULARITY_COLUMN: &str = "popularity";

#[derive(Debug, Clone, Default)]
pub struct Report {
    rows: Vec<EnrichedEntry>,
    unscored: usize,
}

impl Report {
    /// Drop unscored entries and rank the rest by popularity, descending.
    ///
    /// The sort is stable: entries with equal popularity keep list order.
    pub fn build(entries: Vec<EnrichedEntry>) -> Self {
        let total = entries.len();
        let mut rows: Vec<EnrichedEntry> = entries
            .into_iter()
            .filter(|e| e.entry.is_scored())
            .collect();
        let unscored = total - rows.len();

        rows.sort_by(|a, b| b.popularity.cmp(&a.popularity));

        Self { rows, unscored }
    }

    pub fn rows(&self) -> &[EnrichedEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of entries dropped for having no score
    pub fn unscored(&self) -> usize {
        self.unscored
    }

    /// Row count per reading status
    pub fn status_breakdown(&self) -> BTreeMap<ReadingStatus, usize> {
        let mut breakdown = BTreeMap::new();
        for row in &self.rows {
            *breakdown.entry(row.entry.reading_status).or_insert(0) += 1;
        }
        breakdown
    }

    /// Header row: index, known fields, passthrough fields, popularity
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![String::new()];
        columns.extend(LEADING_COLUMNS.iter().map(|c| c.to_string()));
        columns.extend(self.passthrough_columns());
        columns.push(POPULARITY_COLUMN.to_string());
        columns
    }

    fn passthrough_columns(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .flat_map(|row| row.entry.extra.keys())
            .filter(|key| key.as_str() != POPULARITY_COLUMN)
            .cloned()
            .collect()
    }

    /// Write the report as CSV to any writer
    pub fn write_csv_to<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let passthrough = self.passthrough_columns();
        let mut csv = csv::Writer::from_writer(writer);

        csv.write_record(self.columns())?;

        for row in &self.rows {
            let entry = &row.entry;
            let mut record = Vec::with_capacity(LEADING_COLUMNS.len() + passthrough.len() + 2);
            record.push(row.position.to_string());
            record.push(entry.mal_id.to_string());
            record.push(entry.title.clone());
            record.push(u8::from(entry.reading_status).to_string());
            record.push(entry.score.to_string());
            for key in &passthrough {
                record.push(entry.extra.get(key).map(render_cell).unwrap_or_default());
            }
            record.push(row.popularity.to_string());
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Write the report to `path`, replacing any existing file.
    ///
    /// Rows go to a temporary sibling first, which is renamed into place
    /// only once fully written.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let report_error = |source: csv::Error| PipelineError::Report {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| report_error(e.into()))?;
            }
        }

        let temp_path = temp_sibling(path);
        let written = std::fs::File::create(&temp_path)
            .map_err(csv::Error::from)
            .and_then(|file| self.write_csv_to(io::BufWriter::new(file)))
            .and_then(|()| std::fs::rename(&temp_path, path).map_err(csv::Error::from));

        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(report_error(e));
        }

        info!(
            path = %path.display(),
            rows = self.rows.len(),
            unscored = self.unscored,
            "Report written"
        );
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Render a passthrough JSON value as a single CSV cell
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use shared::MangaListEntry;
    use tempfile::TempDir;

    fn enriched(position: usize, mal_id: u32, score: f64, popularity: u32) -> EnrichedEntry {
        EnrichedEntry {
            position,
            entry: MangaListEntry {
                mal_id,
                title: format!("Title {}", mal_id),
                score,
                reading_status: ReadingStatus::Completed,
                extra: Map::new(),
            },
            popularity,
        }
    }

    fn ids(report: &Report) -> Vec<u32> {
        report.rows().iter().map(|r| r.entry.mal_id).collect()
    }

    #[test]
    fn build_filters_unscored_and_keeps_tie_order() {
        let report = Report::build(vec![
            enriched(0, 1, 0.0, 5),
            enriched(1, 2, 7.0, 9),
            enriched(2, 3, 3.0, 9),
        ]);

        assert_eq!(ids(&report), vec![2, 3]);
        assert_eq!(report.unscored(), 1);
    }

    #[test]
    fn build_sorts_by_popularity_descending() {
        let report = Report::build(vec![
            enriched(0, 10, 8.0, 120),
            enriched(1, 11, 6.0, 4000),
            enriched(2, 12, 9.0, 120),
            enriched(3, 13, 5.0, 1),
            enriched(4, 14, 7.0, 4000),
        ]);

        assert_eq!(ids(&report), vec![11, 14, 10, 12, 13]);
        assert_eq!(report.len(), 5);
    }

    #[test]
    fn csv_layout() {
        let mut first = enriched(3, 2, 10.0, 8);
        first.entry.title = "Berserk, Deluxe".to_string();
        first.entry.extra = Map::from_iter([
            ("chapters_read".to_string(), json!(364)),
            ("tags".to_string(), Value::Null),
        ]);
        let mut second = enriched(0, 13, 7.5, 3);
        second.entry.reading_status = ReadingStatus::Reading;
        second.entry.extra = Map::from_iter([
            ("chapters_read".to_string(), json!(1000)),
            ("genres".to_string(), json!([{"name": "Action"}])),
        ]);

        let report = Report::build(vec![second, first]);
        let mut out = Vec::new();
        report.write_csv_to(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            ",mal_id,title,reading_status,score,chapters_read,genres,tags,popularity"
        );
        assert_eq!(lines[1], "3,2,\"Berserk, Deluxe\",2,10,364,,,8");
        assert_eq!(
            lines[2],
            "0,13,Title 13,1,7.5,1000,\"[{\"\"name\"\":\"\"Action\"\"}]\",,3"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn status_breakdown_counts_rows() {
        let mut reading = enriched(0, 1, 6.0, 1);
        reading.entry.reading_status = ReadingStatus::Reading;
        let report = Report::build(vec![
            reading,
            enriched(1, 2, 6.0, 2),
            enriched(2, 3, 6.0, 3),
            enriched(3, 4, 0.0, 4),
        ]);

        let breakdown = report.status_breakdown();
        assert_eq!(breakdown.get(&ReadingStatus::Reading), Some(&1));
        assert_eq!(breakdown.get(&ReadingStatus::Completed), Some(&2));
        assert_eq!(breakdown.len(), 2);
    }

    #[test]
    fn write_csv_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("population_list.csv");
        std::fs::write(&path, "old report\n".repeat(100)).unwrap();

        let report = Report::build(vec![enriched(0, 1, 8.0, 42)]);
        report.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(",mal_id,title"));
        assert!(!text.contains("old report"));
        assert!(!temp_dir.path().join(".population_list.csv.tmp").exists());
    }

    #[test]
    fn write_csv_is_byte_identical_across_runs() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.csv");
        let second = temp_dir.path().join("b.csv");

        let entries = vec![enriched(0, 1, 8.0, 42), enriched(1, 2, 6.0, 42)];
        Report::build(entries.clone()).write_csv(&first).unwrap();
        Report::build(entries).write_csv(&second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn empty_report_still_has_header() {
        let report = Report::build(vec![enriched(0, 1, 0.0, 1)]);
        assert!(report.is_empty());

        let mut out = Vec::new();
        report.write_csv_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ",mal_id,title,reading_status,score,popularity\n"
        );
    }
}
