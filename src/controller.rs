//! Interaction controller: owns the UI state machine.
//!
//! `Idle -> Loading -> {Success | Failed}`, and back to `Loading` on the
//! next submit or to `Idle` on a dialect change. Only this type mutates
//! [`UiState`].
//!
//! Submitting is split in two phases so a UI surface can run the remote
//! call elsewhere: [`Controller::begin_submit`] hands out a [`Ticket`] and
//! [`Controller::finish`] applies the outcome. Every accepted submit and
//! every dialect change bumps a sequence number, and an outcome carrying an
//! older ticket is dropped.

use std::sync::Arc;

use crate::completion::CompletionClient;
use crate::config::RenderConfig;
use crate::dialect::{Dialect, DialectSelection};
use crate::error::{CompletionError, SqleanError};
use crate::highlight::{Language, apply_code_highlighting, highlight_source};
use crate::models::{AnalysisError, AnalysisRequest, AnalysisResult};
use crate::prompt::build_prompt;
use crate::render::{MountedRoot, ResultsView, render_markdown};

#[derive(Debug, Clone, PartialEq)]
pub enum UiState {
    Idle,
    Loading(AnalysisRequest),
    Success(AnalysisResult),
    Failed(AnalysisError),
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Loading(_) => "loading",
            UiState::Success(_) => "success",
            UiState::Failed(_) => "failed",
        }
    }
}

/// Handle for one accepted submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    pub prompt: String,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Work that may only run once the current view is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCommit {
    HighlightCode { hint: Option<Language> },
}

pub struct Controller {
    client: Arc<dyn CompletionClient>,
    render: RenderConfig,
    dialect: DialectSelection,
    query_text: String,
    state: UiState,
    seq: u64,
    post_commit: Vec<PostCommit>,
}

impl Controller {
    /// Starts `Idle` with `default_dialect` and its example in the editor.
    pub fn new(client: Arc<dyn CompletionClient>, render: RenderConfig, default_dialect: Dialect) -> Self {
        Self {
            client,
            render,
            dialect: DialectSelection::Known(default_dialect),
            query_text: default_dialect.example().to_string(),
            state: UiState::Idle,
            seq: 0,
            post_commit: Vec::new(),
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn dialect(&self) -> &DialectSelection {
        &self.dialect
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// While loading the submit control is inert.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, UiState::Loading(_))
    }

    pub fn client(&self) -> Arc<dyn CompletionClient> {
        Arc::clone(&self.client)
    }

    pub fn view(&self) -> ResultsView {
        match &self.state {
            UiState::Idle => ResultsView::Empty,
            UiState::Loading(_) => ResultsView::Loading,
            UiState::Success(result) => ResultsView::Analysis(result.html.clone()),
            UiState::Failed(error) => ResultsView::Error(error.message.clone()),
        }
    }

    /// Working query text highlighted for the selected dialect's editor language.
    pub fn editor_html(&self) -> String {
        highlight_source(&self.query_text, self.dialect.editor_language())
    }

    /// Editor edits. Never changes state.
    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.query_text = text.into();
    }

    /// Select a dialect: back to `Idle`, editor reset to its example.
    pub fn change_dialect(&mut self, dialect_id: &str) {
        let selection = DialectSelection::from_id(dialect_id);
        if let DialectSelection::Unrecognized(raw) = &selection {
            tracing::warn!("Unrecognized dialect '{}', using generic guidance", raw);
        }
        if self.is_loading() {
            tracing::info!("Dialect changed while loading; in-flight result will be discarded");
        }

        self.query_text = selection.example().to_string();
        self.dialect = selection;
        self.seq += 1;
        self.post_commit.clear();
        self.transition(UiState::Idle);
    }

    /// First half of submit. `None` when nothing was sent: either a request
    /// is already in flight or the query failed validation.
    pub fn begin_submit(&mut self) -> Option<Ticket> {
        if self.is_loading() {
            tracing::debug!("Submit ignored while a request is in flight");
            return None;
        }

        self.post_commit.clear();
        let request = match AnalysisRequest::new(&self.query_text, self.dialect.clone()) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Submit rejected: {}", e);
                self.transition(UiState::Failed(AnalysisError::from(e)));
                return None;
            }
        };

        self.seq += 1;
        let prompt = build_prompt(&request.query_text, request.dialect.id());
        self.transition(UiState::Loading(request));

        Some(Ticket {
            seq: self.seq,
            prompt,
        })
    }

    /// Second half of submit. Returns false when the outcome was stale.
    pub fn finish(&mut self, ticket: Ticket, outcome: Result<String, CompletionError>) -> bool {
        if ticket.seq != self.seq || !self.is_loading() {
            tracing::debug!(
                "Discarding stale completion (ticket {}, current {})",
                ticket.seq,
                self.seq
            );
            return false;
        }

        match outcome {
            Ok(markdown) => {
                let html = render_markdown(&markdown, &self.render);
                if self.render.highlight {
                    let hint = Language::from_name(self.dialect.editor_language());
                    self.post_commit.push(PostCommit::HighlightCode { hint });
                }
                self.transition(UiState::Success(AnalysisResult {
                    raw_markdown: markdown,
                    html,
                }));
            }
            Err(e) => {
                self.transition(UiState::Failed(AnalysisError::from(SqleanError::from(e))));
            }
        }
        true
    }

    /// Validate, call the completion client, and apply the result.
    pub async fn submit(&mut self) -> &UiState {
        if let Some(ticket) = self.begin_submit() {
            let outcome = self.client.request_completion(&ticket.prompt).await;
            self.finish(ticket, outcome);
        }
        &self.state
    }

    /// Commit the current view into `root`, then run queued post-commit work.
    pub fn commit(&mut self, root: &mut MountedRoot) {
        root.mount(&self.view());
        for effect in self.post_commit.drain(..) {
            match effect {
                PostCommit::HighlightCode { hint } => {
                    let report = apply_code_highlighting(root, hint);
                    tracing::debug!(
                        "Highlighted {} code blocks ({} skipped, {} failed)",
                        report.highlighted,
                        report.skipped,
                        report.failed
                    );
                }
            }
        }
    }

    pub fn pending_post_commit(&self) -> &[PostCommit] {
        &self.post_commit
    }

    fn transition(&mut self, next: UiState) {
        tracing::info!("State {} -> {}", self.state.name(), next.name());
        self.state = next;
    }
}
