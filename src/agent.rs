// src/agent.rs
//! Run orchestrator: resolve → patch → notify, with the fallback policy.
//!
//! Any resolution or patch failure leaves the document as it was and turns
//! into a failure notification. `Agent::run` never returns an error.

use chrono::{DateTime, Local, Utc};
use metrics::counter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::document::{DocumentStore, DryRunDocument, FsDocument};
use crate::notify::{DynNotifySink, LogSink, Notifier, Outcome, PushoverSink};
use crate::patch::{DocumentPatcher, PatchError};
use crate::resolver::provider::build_provider;
use crate::resolver::{NewsRecord, NewsResolver, ResolutionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Patching,
    Failed,
    Notifying { succeeded: bool },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Patching,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Resolving => "resolving",
            Stage::Patching => "patching",
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Resolution(_) => Stage::Resolving,
            RunError::Patch(_) => Stage::Patching,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Updated(NewsRecord),
    /// Document left untouched; `diagnostic` is what the recipient was told.
    Preserved { stage: Stage, diagnostic: String },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub notified: bool,
    /// Every state the run passed through, `Idle` first, `Done` last.
    pub states: Vec<RunState>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Updated(_))
    }
}

/// Command-line overrides applied on top of `AgentSettings`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub document: Option<PathBuf>,
    /// Read and patch in memory, log the notification, write nothing.
    pub dry_run: bool,
}

/// Explicit dependencies for one run.
pub struct Agent {
    resolver: NewsResolver,
    patcher: DocumentPatcher,
    document: Arc<dyn DocumentStore>,
    notifier: Notifier,
}

struct Transitions(Vec<RunState>);

impl Transitions {
    fn enter(&mut self, next: RunState) {
        let prev = self.0.last().copied().unwrap_or(RunState::Idle);
        tracing::debug!(target: "agent", from = ?prev, to = ?next, "state transition");
        self.0.push(next);
    }
}

impl Agent {
    pub fn new(
        resolver: NewsResolver,
        patcher: DocumentPatcher,
        document: Arc<dyn DocumentStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            resolver,
            patcher,
            document,
            notifier,
        }
    }

    /// Wire the production collaborators from startup configuration.
    pub fn from_config(config: &AgentConfig, options: &RunOptions) -> anyhow::Result<Self> {
        let settings = &config.settings;
        let creds = &config.credentials;

        let provider = build_provider(settings, creds)?;
        let resolver = NewsResolver::new(provider, settings.preferred_sources.clone());
        let patcher = DocumentPatcher::new(&settings.heading)?;

        let path = options
            .document
            .clone()
            .unwrap_or_else(|| settings.document_path.clone());
        let document: Arc<dyn DocumentStore>;
        let sink: DynNotifySink;
        if options.dry_run {
            document = Arc::new(DryRunDocument::new(path));
            sink = Arc::new(LogSink);
        } else {
            document = Arc::new(FsDocument::new(path));
            sink = Arc::new(
                PushoverSink::new(
                    &settings.pushover_url,
                    &creds.pushover_token,
                    &creds.pushover_user,
                )
                .with_timeout(Duration::from_secs(settings.notify_timeout_secs)),
            );
        }
        let notifier = Notifier::new(sink, settings.notify_priority);

        Ok(Self::new(resolver, patcher, document, notifier))
    }

    pub async fn run(&self, now: DateTime<Local>) -> RunReport {
        info!(target: "agent", started_at = %now, "starting AI news agent");
        let mut states = Transitions(vec![RunState::Idle]);

        let outcome = match self.resolve_and_patch(&now, &mut states).await {
            Ok(record) => {
                info!(target: "agent", title = %record.title, "portfolio updated");
                RunOutcome::Updated(record)
            }
            Err(e) => {
                states.enter(RunState::Failed);
                let stage = e.stage();
                counter!("news_agent_stage_failures_total", "stage" => stage.as_str())
                    .increment(1);
                error!(target: "agent", stage = stage.as_str(), error = %e, "AI news agent failed");
                warn!(target: "agent", "FALLBACK: keeping existing AI news (no changes made)");
                RunOutcome::Preserved {
                    stage,
                    diagnostic: e.to_string(),
                }
            }
        };

        let succeeded = matches!(outcome, RunOutcome::Updated(_));
        states.enter(RunState::Notifying { succeeded });
        // Stamped when sent; the search alone may take minutes.
        let notify_at = Utc::now();
        let notified = match &outcome {
            RunOutcome::Updated(record) => {
                self.notifier.notify(Outcome::Updated(record), notify_at).await
            }
            RunOutcome::Preserved { diagnostic, .. } => {
                self.notifier
                    .notify(Outcome::Preserved { diagnostic }, notify_at)
                    .await
            }
        };

        states.enter(RunState::Done);
        let label = if succeeded { "updated" } else { "preserved" };
        counter!("news_agent_runs_total", "outcome" => label).increment(1);
        info!(target: "agent", outcome = label, notified, "AI news agent finished");

        RunReport {
            outcome,
            notified,
            states: states.0,
        }
    }

    async fn resolve_and_patch(
        &self,
        now: &DateTime<Local>,
        states: &mut Transitions,
    ) -> Result<NewsRecord, RunError> {
        states.enter(RunState::Resolving);
        info!(target: "agent", provider = self.resolver.provider_name(), "searching for AI news");
        let record = self.resolver.resolve(now).await?;

        states.enter(RunState::Patching);
        let location = self.document.location();
        info!(target: "agent", document = %location, "updating portfolio HTML");
        let current = self
            .document
            .read()
            .await
            .map_err(|source| PatchError::Read {
                path: location.clone(),
                source,
            })?;

        // The full replacement exists in memory before anything is written.
        let updated = self.patcher.patch(&current, &record)?;
        if updated == current {
            info!(target: "agent", "region already up to date");
        }
        self.document
            .write(&updated)
            .await
            .map_err(|source| PatchError::Write {
                path: location,
                source,
            })?;

        Ok(record)
    }
}
