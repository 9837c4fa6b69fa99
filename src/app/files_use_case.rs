use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::app::ports::FileSourcePort;
use crate::constants::DEFAULT_MAX_CONCURRENCY;
use crate::error::{FilesError, Result};
use crate::observability::metrics;
use crate::parser::validate_counted;
use crate::types::{FileList, FileRecord, ValidationMode};

/// What happened to one file of the target set.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Fetched(FileRecord),
    FetchFailed { file: String, reason: String },
}

impl FileOutcome {
    /// Apply the inclusion rule: strict mode keeps only records with rows,
    /// permissive mode keeps everything and turns failures into empty records.
    pub fn into_record(self, mode: ValidationMode) -> Option<FileRecord> {
        match (self, mode) {
            (FileOutcome::Fetched(record), ValidationMode::Permissive) => Some(record),
            (FileOutcome::Fetched(record), ValidationMode::Strict) => {
                (!record.lines.is_empty()).then_some(record)
            }
            (FileOutcome::FetchFailed { file, reason }, ValidationMode::Permissive) => {
                warn!(file = %file, "Keeping empty record for failed file: {}", reason);
                Some(FileRecord::empty(file))
            }
            (FileOutcome::FetchFailed { file, reason }, ValidationMode::Strict) => {
                warn!(file = %file, "Omitting failed file: {}", reason);
                None
            }
        }
    }
}

/// Fetches, validates and aggregates the remote CSV files.
pub struct FilesUseCase {
    source: Arc<dyn FileSourcePort>,
    max_concurrency: usize,
}

impl FilesUseCase {
    pub fn new(source: Arc<dyn FileSourcePort>) -> Self {
        Self {
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Cap on in-flight file fetches per aggregation; at least 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Aggregate validated rows of every remote file, or only `filter_name`.
    ///
    /// The filtered name is trusted as given: it is fetched even when the
    /// remote list does not contain it. Per-file failures never abort the
    /// batch; only an unavailable file list does.
    #[instrument(skip(self))]
    pub async fn aggregate(
        &self,
        filter_name: Option<&str>,
        include_empty: bool,
    ) -> Result<Vec<FileRecord>> {
        let started = Instant::now();
        let remote = self.remote_files().await?;
        let targets = match non_empty(filter_name) {
            Some(name) => vec![name.to_string()],
            None => remote,
        };
        let mode = ValidationMode::from_include_empty(include_empty);
        debug!("Aggregating {} files in {:?} mode", targets.len(), mode);

        // `buffered` yields in input order whatever the completion order
        let outcomes: Vec<FileOutcome> = stream::iter(targets)
            .map(|file| self.process_file(file, mode))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let records = assemble(outcomes, mode);
        metrics::aggregate::completed(records.len(), started.elapsed().as_secs_f64());
        info!("Aggregated {} file records", records.len());
        Ok(records)
    }

    /// The remote file list, or just `filter_name` if the list contains it.
    #[instrument(skip(self))]
    pub async fn resolve_file_list(&self, filter_name: Option<&str>) -> Result<FileList> {
        let remote = self.remote_files().await?;
        match non_empty(filter_name) {
            None => Ok(FileList { files: remote }),
            Some(name) if remote.iter().any(|f| f == name) => Ok(FileList {
                files: vec![name.to_string()],
            }),
            Some(name) => Err(FilesError::NotFound(name.to_string())),
        }
    }

    async fn remote_files(&self) -> Result<Vec<String>> {
        match self.source.list_files().await {
            Ok(files) => {
                metrics::source::list_success();
                debug!("Remote source lists {} files", files.len());
                Ok(files)
            }
            Err(e) => {
                metrics::source::list_error();
                warn!("Failed to fetch file list: {}", e);
                Err(FilesError::ListUnavailable(e))
            }
        }
    }

    async fn process_file(&self, file: String, mode: ValidationMode) -> FileOutcome {
        match self.source.fetch_file(&file).await {
            Ok(raw) => {
                metrics::source::file_success();
                let (lines, parsed) = validate_counted(&raw, mode);
                metrics::validator::rows_validated(lines.len(), parsed - lines.len());
                debug!(file = %file, parsed, kept = lines.len(), "Validated file");
                FileOutcome::Fetched(FileRecord { file, lines })
            }
            Err(e) => {
                metrics::source::file_error();
                FileOutcome::FetchFailed {
                    file,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Ordered outcomes to the final result, applying the inclusion rule.
pub fn assemble(outcomes: Vec<FileOutcome>, mode: ValidationMode) -> Vec<FileRecord> {
    outcomes
        .into_iter()
        .filter_map(|outcome| outcome.into_record(mode))
        .collect()
}

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::in_memory::InMemoryFileSource;
    use crate::types::Row;
    use std::time::Duration;

    const HEX: &str = "0123456789abcdef0123456789abcdef";

    fn valid_csv(text: &str) -> String {
        format!("file,text,number,hex\nf,{text},1,{HEX}\n")
    }

    fn use_case(source: InMemoryFileSource) -> FilesUseCase {
        FilesUseCase::new(Arc::new(source))
    }

    fn names(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.file.as_str()).collect()
    }

    #[tokio::test]
    async fn test_single_valid_file_in_strict_mode() {
        let source = InMemoryFileSource::new(["x.csv"]).with_file(
            "x.csv",
            format!("text,hex,number\nhi,{HEX},5\n"),
        );
        let records = use_case(source).aggregate(None, false).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file, "x.csv");
        assert_eq!(records[0].lines.len(), 1);
        let line = &records[0].lines[0];
        assert_eq!(line.text(), Some("hi"));
        assert_eq!(line.number(), Some(5.0));
        assert_eq!(line.hex(), Some(HEX));
    }

    #[tokio::test]
    async fn test_order_follows_list_despite_completion_order() {
        let source = InMemoryFileSource::new(["a.csv", "b.csv", "c.csv"])
            .with_file("a.csv", valid_csv("a"))
            .with_file("b.csv", valid_csv("b"))
            .with_file("c.csv", valid_csv("c"))
            .with_delay("a.csv", Duration::from_millis(60))
            .with_delay("b.csv", Duration::from_millis(30));
        let records = use_case(source).with_max_concurrency(3).aggregate(None, false).await.unwrap();
        assert_eq!(names(&records), vec!["a.csv", "b.csv", "c.csv"]);
    }

    #[tokio::test]
    async fn test_failed_file_omitted_in_strict_mode() {
        let source = InMemoryFileSource::new(["a.csv", "b.csv", "c.csv"])
            .with_file("a.csv", valid_csv("a"))
            .with_file("c.csv", valid_csv("c"));
        let records = use_case(source).aggregate(None, false).await.unwrap();
        assert_eq!(names(&records), vec!["a.csv", "c.csv"]);
    }

    #[tokio::test]
    async fn test_failed_file_kept_empty_in_permissive_mode() {
        let source = InMemoryFileSource::new(["a.csv", "b.csv", "c.csv"])
            .with_file("a.csv", valid_csv("a"))
            .with_file("c.csv", valid_csv("c"));
        let records = use_case(source).aggregate(None, true).await.unwrap();
        assert_eq!(names(&records), vec!["a.csv", "b.csv", "c.csv"]);
        assert!(records[1].lines.is_empty());
        assert_eq!(records[0].lines.len(), 1);
    }

    #[tokio::test]
    async fn test_strict_mode_drops_files_without_valid_rows() {
        let source = InMemoryFileSource::new(["bad.csv", "good.csv"])
            .with_file("bad.csv", "text,number,hex\n,x,short\n")
            .with_file("good.csv", valid_csv("g"));
        let records = use_case(source.clone()).aggregate(None, false).await.unwrap();
        assert_eq!(names(&records), vec!["good.csv"]);

        let records = use_case(source).aggregate(None, true).await.unwrap();
        assert_eq!(names(&records), vec!["bad.csv", "good.csv"]);
        assert!(matches!(records[0].lines[0], Row::Lenient(_)));
    }

    #[tokio::test]
    async fn test_malformed_csv_counts_as_no_rows() {
        let source = InMemoryFileSource::new(["broken.csv", "good.csv"])
            .with_file("broken.csv", format!("text,number,hex\nok,1,{HEX}\nbad,\"2\"x,{HEX}\n"))
            .with_file("good.csv", valid_csv("g"));
        let records = use_case(source.clone()).aggregate(None, false).await.unwrap();
        assert_eq!(names(&records), vec!["good.csv"]);

        let records = use_case(source).aggregate(None, true).await.unwrap();
        assert_eq!(records[0], FileRecord::empty("broken.csv"));
        assert_eq!(records[1].lines.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_source_reason() {
        let uc = use_case(InMemoryFileSource::new(["gone.csv"]));
        match uc.process_file("gone.csv".to_string(), ValidationMode::Strict).await {
            FileOutcome::FetchFailed { file, reason } => {
                assert_eq!(file, "gone.csv");
                assert!(reason.contains("404"), "unexpected reason: {reason}");
            }
            other => panic!("expected a fetch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_filter_is_not_checked_against_list() {
        let source = InMemoryFileSource::new(["a.csv"]).with_file("a.csv", valid_csv("a"));
        let uc = use_case(source.clone());

        let records = uc.aggregate(Some("missing.csv"), false).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(source.fetch_log(), vec!["missing.csv"]);

        let records = uc.aggregate(Some("missing.csv"), true).await.unwrap();
        assert_eq!(records, vec![FileRecord::empty("missing.csv")]);
    }

    #[tokio::test]
    async fn test_filter_fetches_only_named_file() {
        let source = InMemoryFileSource::new(["a.csv", "b.csv"])
            .with_file("a.csv", valid_csv("a"))
            .with_file("b.csv", valid_csv("b"));
        let records = use_case(source.clone()).aggregate(Some("b.csv"), false).await.unwrap();
        assert_eq!(names(&records), vec!["b.csv"]);
        assert_eq!(source.fetch_log(), vec!["b.csv"]);
    }

    #[tokio::test]
    async fn test_empty_filter_means_all_files() {
        let source = InMemoryFileSource::new(["a.csv", "b.csv"])
            .with_file("a.csv", valid_csv("a"))
            .with_file("b.csv", valid_csv("b"));
        let records = use_case(source).aggregate(Some(""), false).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_list_failure_aborts_aggregation() {
        let source = InMemoryFileSource::unavailable();
        let uc = use_case(source.clone());

        let err = uc.aggregate(None, true).await.unwrap_err();
        assert!(matches!(err, FilesError::ListUnavailable(_)));

        let err = uc.aggregate(Some("a.csv"), true).await.unwrap_err();
        assert!(matches!(err, FilesError::ListUnavailable(_)));
        assert!(source.fetch_log().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_file_list() {
        let uc = use_case(InMemoryFileSource::new(["a.csv", "b.csv"]));

        let all = uc.resolve_file_list(None).await.unwrap();
        assert_eq!(all.files, vec!["a.csv", "b.csv"]);

        let one = uc.resolve_file_list(Some("b.csv")).await.unwrap();
        assert_eq!(one.files, vec!["b.csv"]);

        let err = uc.resolve_file_list(Some("missing.csv")).await.unwrap_err();
        assert!(matches!(err, FilesError::NotFound(name) if name == "missing.csv"));
    }

    #[tokio::test]
    async fn test_resolve_file_list_when_list_unavailable() {
        let uc = use_case(InMemoryFileSource::unavailable());
        for filter in [None, Some("a.csv")] {
            let err = uc.resolve_file_list(filter).await.unwrap_err();
            assert!(matches!(err, FilesError::ListUnavailable(_)));
        }
    }

    #[test]
    fn test_outcome_inclusion_rule() {
        let empty = FileOutcome::Fetched(FileRecord::empty("e.csv"));
        let failed = FileOutcome::FetchFailed {
            file: "f.csv".into(),
            reason: "404".into(),
        };

        assert_eq!(empty.clone().into_record(ValidationMode::Strict), None);
        assert_eq!(
            empty.into_record(ValidationMode::Permissive),
            Some(FileRecord::empty("e.csv"))
        );
        assert_eq!(failed.clone().into_record(ValidationMode::Strict), None);
        assert_eq!(
            failed.into_record(ValidationMode::Permissive),
            Some(FileRecord::empty("f.csv"))
        );
    }
}
