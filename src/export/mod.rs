//! Asynchronous export pipeline.
//!
//! [`LogExporter::submit`] reserves a registry entry and detaches one task per
//! export. The task drains the search capability window by window, appends
//! every page to `{dir}/{request_id}.file` and finally compresses it into
//! `{dir}/{request_id}.zip`.
//!
//! ```text
//! submit ──► Queued ──► Generating ──► (search page ─► append)* ──► archive ──► Ready
//!                             │                 │                      │
//!                             └─────────────────┴──────────────────────┴──► Error
//! ```
//!
//! Any search, timeout or disk failure is terminal; there is no retry.

mod files;

use crate::error::{Error, Result, SearchError};
use crate::registry::OperationRegistry;
use crate::search::{LogSearch, SearchRequest, SearchResponse};
use crate::types::{
    DownloadLogRequest, DownloadLogResponse, DownloadLogResponseList, DownloadState, RequestId,
    SortOrder,
};
use crate::utils::{CURSOR_STEP_NANOS, now_nanos, remove_file_if_exists};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Info recorded once an archive has been produced
pub const FILE_GENERATED_MSG: &str = "file generated";

/// Entry point of the export pipeline (cloneable, Arc-backed)
#[derive(Clone)]
pub struct LogExporter {
    registry: OperationRegistry,
    search: Arc<dyn LogSearch>,
    download_dir: PathBuf,
    search_timeout: Duration,
    accepting_new: Arc<AtomicBool>,
}

/// Everything a detached pipeline task needs
struct ExportJob {
    request_id: RequestId,
    request: DownloadLogRequest,
    to: i64,
    working_path: PathBuf,
    archive_path: PathBuf,
}

impl LogExporter {
    /// Create an exporter writing its artifacts to `download_dir`
    pub fn new(
        registry: OperationRegistry,
        search: Arc<dyn LogSearch>,
        download_dir: PathBuf,
        search_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            search,
            download_dir,
            search_timeout,
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registry the exporter reports to
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Refuse further submissions with [`Error::ShuttingDown`]
    ///
    /// Pipelines already running are left to finish.
    pub fn stop_accepting(&self) {
        self.accepting_new.store(false, Ordering::SeqCst);
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Start a new export and return its Queued entry
    ///
    /// A `to` of 0 means "now" and is resolved here; the returned entry
    /// carries the resolved value. The pipeline runs detached.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`stop_accepting`](Self::stop_accepting) was called
    /// - [`Error::InvalidArgument`] for an empty organization or `from > to`
    /// - [`Error::AlreadyExists`] if the generated id collides
    pub async fn submit(&self, request: DownloadLogRequest) -> Result<DownloadLogResponse> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        validate_organization(&request.organization_id)?;

        let to = if request.to == 0 {
            now_nanos()
        } else {
            request.to
        };
        if request.from > to {
            return Err(Error::InvalidArgument(format!(
                "invalid range: from ({}) is after to ({})",
                request.from, to
            )));
        }

        let request_id = RequestId::generate();
        let operation = self
            .registry
            .add(
                &request.organization_id,
                request_id.clone(),
                request.from,
                to,
                self.download_dir.clone(),
            )
            .await?;

        let working_path = operation.working_path();
        if let Err(e) = files::init_working_file(&working_path).await {
            tracing::error!(
                request_id = %request_id,
                path = %working_path.display(),
                error = %e,
                "failed to create working file"
            );
            self.registry
                .update(&request_id, DownloadState::Error, e.to_string())
                .await?;
            return Ok(self.registry.get(&request_id).await?.to_response());
        }

        tracing::info!(
            request_id = %request_id,
            organization_id = %request.organization_id,
            from = request.from,
            to,
            order = ?request.order,
            "export queued"
        );

        let job = ExportJob {
            request_id,
            request,
            to,
            working_path,
            archive_path: operation.archive_path(),
        };
        let exporter = self.clone();
        tokio::spawn(async move { exporter.generate(job).await });

        Ok(operation.to_response())
    }

    /// Current view of one export
    ///
    /// An export owned by another organization is reported as not found.
    pub async fn check(
        &self,
        organization_id: &str,
        request_id: &RequestId,
    ) -> Result<DownloadLogResponse> {
        validate_organization(organization_id)?;
        if request_id.as_str().trim().is_empty() {
            return Err(Error::InvalidArgument(
                "request_id cannot be empty".to_string(),
            ));
        }

        let operation = self.registry.get(request_id).await?;
        if operation.organization_id != organization_id {
            return Err(Error::NotFound(format!("download operation {request_id}")));
        }

        Ok(operation.to_response())
    }

    /// Every export of an organization
    pub async fn list(&self, organization_id: &str) -> Result<DownloadLogResponseList> {
        validate_organization(organization_id)?;

        let responses = self
            .registry
            .list(organization_id)
            .await
            .iter()
            .map(|op| op.to_response())
            .collect();

        Ok(DownloadLogResponseList { responses })
    }

    /// Body of the detached task: run the pipeline and record its outcome
    async fn generate(&self, job: ExportJob) {
        let request_id = job.request_id.clone();

        match self.run_pipeline(&job).await {
            Ok(pages) => {
                tracing::info!(request_id = %request_id, pages, "export ready");
            }
            Err(e) => {
                let info = failure_info(&e);
                tracing::warn!(request_id = %request_id, error = %info, "export failed");
                if let Err(update_err) = self
                    .registry
                    .update(&request_id, DownloadState::Error, info)
                    .await
                {
                    tracing::error!(
                        request_id = %request_id,
                        error = %update_err,
                        "failed to record export failure"
                    );
                }
            }
        }
    }

    /// Drain the search capability, archive, and publish; returns the number of pages read
    async fn run_pipeline(&self, job: &ExportJob) -> Result<usize> {
        self.registry
            .update(&job.request_id, DownloadState::Generating, "")
            .await?;

        let order = job.request.order;
        let include_metadata = job.request.include_metadata;
        let mut window = SearchRequest::from_download_request(&job.request, job.to);
        let mut pages = 0;

        loop {
            let mut page = self.search_window(&window).await?;
            if page.entries.is_empty() {
                break;
            }
            pages += 1;

            tracing::debug!(
                request_id = %job.request_id,
                entries = page.entries.len(),
                from = page.from,
                to = page.to,
                "appending search page"
            );

            let lines = files::render_page(std::mem::take(&mut page.entries), order, include_metadata);
            files::append_lines(&job.working_path, lines).await?;

            advance_cursor(&mut window, &page, order)?;
            if window.from > window.to {
                break;
            }
        }

        files::create_archive(&job.working_path, &job.archive_path).await?;

        if let Err(e) = remove_file_if_exists(&job.working_path).await {
            tracing::warn!(
                request_id = %job.request_id,
                path = %job.working_path.display(),
                error = %e,
                "failed to delete working file"
            );
        }

        self.registry
            .update(&job.request_id, DownloadState::Ready, FILE_GENERATED_MSG)
            .await?;

        Ok(pages)
    }

    async fn search_window(&self, window: &SearchRequest) -> Result<SearchResponse> {
        match tokio::time::timeout(self.search_timeout, self.search.search(window)).await {
            Ok(page) => Ok(page?),
            Err(_) => Err(SearchError::Timeout(self.search_timeout).into()),
        }
    }
}

/// Move the window past `page`; a cursor that would not strictly advance is an error
fn advance_cursor(
    window: &mut SearchRequest,
    page: &SearchResponse,
    order: SortOrder,
) -> std::result::Result<(), SearchError> {
    match order {
        SortOrder::Asc => {
            let next = page.to.saturating_add(CURSOR_STEP_NANOS);
            if next <= window.from {
                return Err(SearchError::WindowNotAdvancing(format!(
                    "next from ({next}) is not after current from ({})",
                    window.from
                )));
            }
            window.from = next;
        }
        SortOrder::Desc => {
            let next = page.from.saturating_sub(CURSOR_STEP_NANOS);
            if next >= window.to {
                return Err(SearchError::WindowNotAdvancing(format!(
                    "next to ({next}) is not before current to ({})",
                    window.to
                )));
            }
            window.to = next;
        }
    }
    Ok(())
}

fn validate_organization(organization_id: &str) -> Result<()> {
    if organization_id.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "organization_id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Text stored in `info` when a pipeline fails
fn failure_info(error: &Error) -> String {
    match error {
        Error::Search(e) => e.to_string(),
        other => other.to_string(),
    }
}
