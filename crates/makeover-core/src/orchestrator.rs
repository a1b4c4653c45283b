//! Single-flight state machine in front of the image backend.
//!
//! ```text
//! Idle | Error --start_full_generation / start_edit--> Generating
//! Generating --complete(Ok)--> Idle      (history.append_after, dirty.mark_clean)
//! Generating --complete(Err)--> Error(message)
//! Error --dismiss--> Idle
//! any --reset_session--> Idle            (in-flight result becomes stale)
//! ```
//!
//! Every started request is tagged with a [`RequestTicket`] carrying the
//! session token current at start time. A completion whose ticket does not
//! match the tracked in-flight request is discarded without touching state.

use crate::backend::ImageBackend;
use crate::dirty::DirtyTracker;
use crate::error::{MakeoverError, Result};
use crate::history::HistorySequence;
use crate::image::{Artifact, ImageRef};
use crate::slot::GenerationInputs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const MISSING_PORTRAIT_MESSAGE: &str =
    "Please provide a main portrait image to start the makeover.";
pub const MISSING_SOURCE_MESSAGE: &str = "There is no generated image to edit.";
pub const EMPTY_INSTRUCTION_MESSAGE: &str = "Please describe the edit to apply.";

/// Which backend operation a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    FullGeneration,
    Edit,
}

impl RequestKind {
    fn failure_prefix(self) -> &'static str {
        match self {
            Self::FullGeneration => "Failed to generate the makeover.",
            Self::Edit => "Failed to apply edit.",
        }
    }
}

/// Orchestrator state. Exactly one request may be outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum OrchestratorState {
    #[default]
    Idle,
    Generating(RequestKind),
    Error(String),
}

impl OrchestratorState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Monotonically increasing token identifying a composition session.
///
/// Bumped by every reset (initial upload, start over, reuse as reference).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub u64);

/// Identifies one started request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket {
    pub session: SessionToken,
    pub request_id: u64,
    pub kind: RequestKind,
    /// History position the result is appended after, fixed at start.
    ///
    /// For an edit this is the cursor of its source, so moving the cursor
    /// while the request is in flight never truncates the source away.
    pub append_after: Option<usize>,
}

/// Payload captured when a request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Composite(GenerationInputs),
    Adjustment { source: ImageRef, instruction: String },
}

impl GenerationRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Composite(_) => RequestKind::FullGeneration,
            Self::Adjustment { .. } => RequestKind::Edit,
        }
    }

    /// Runs the request against the backend.
    pub async fn execute(&self, backend: &dyn ImageBackend) -> Result<Artifact> {
        match self {
            Self::Composite(inputs) => backend.generate_composite(inputs).await,
            Self::Adjustment {
                source,
                instruction,
            } => backend.generate_adjustment(source, instruction).await,
        }
    }
}

/// A started request: the ticket to complete it with and what to send.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: RequestTicket,
    pub request: GenerationRequest,
}

/// What happened when a completion was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The artifact was appended; `discarded` future entries were truncated.
    Applied { cursor: usize, discarded: usize },
    /// The request failed; the orchestrator is now in `Error(message)`.
    Failed(String),
    /// The request belongs to an abandoned session (or was never tracked).
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOrchestrator {
    state: OrchestratorState,
    session: SessionToken,
    next_request_id: u64,
    in_flight: Option<RequestTicket>,
}

impl GenerationOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_generating()
    }

    /// Starts a full generation from a slot snapshot.
    ///
    /// # Errors
    ///
    /// - `Busy` if a request is outstanding
    /// - `Validation` if `inputs` is `None` (no portrait)
    pub fn start_full_generation(
        &mut self,
        inputs: Option<GenerationInputs>,
    ) -> Result<PendingRequest> {
        self.ensure_not_busy()?;
        let inputs = inputs.ok_or_else(|| MakeoverError::validation(MISSING_PORTRAIT_MESSAGE))?;
        info!(
            session = self.session.0,
            images = inputs.image_count(),
            "Starting full generation"
        );
        // History is reset by the caller: the result starts a new sequence
        Ok(self.begin(GenerationRequest::Composite(inputs), None))
    }

    /// Starts an edit of the artifact under the history cursor using a
    /// natural-language instruction.
    ///
    /// # Errors
    ///
    /// - `Busy` if a request is outstanding
    /// - `Validation` if there is no source artifact or the instruction is blank
    pub fn start_edit(
        &mut self,
        history: &HistorySequence,
        instruction: &str,
    ) -> Result<PendingRequest> {
        self.ensure_not_busy()?;
        let source = history
            .current()
            .ok_or_else(|| MakeoverError::validation(MISSING_SOURCE_MESSAGE))?;
        if instruction.trim().is_empty() {
            return Err(MakeoverError::validation(EMPTY_INSTRUCTION_MESSAGE));
        }
        info!(
            session = self.session.0,
            source = %source.id(),
            "Starting edit"
        );
        let source = source.to_image_ref(format!(
            "edit-source-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        Ok(self.begin(
            GenerationRequest::Adjustment {
                source,
                instruction: instruction.to_string(),
            },
            history.cursor(),
        ))
    }

    /// Delivers the result of a request started by this orchestrator.
    ///
    /// On success the artifact is appended to `history` right after the
    /// position recorded in the ticket (branch-truncating) and `dirty` is
    /// cleared. Stale completions change nothing.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<Artifact>,
        history: &mut HistorySequence,
        dirty: &mut DirtyTracker,
    ) -> CompletionOutcome {
        if ticket.session != self.session || self.in_flight != Some(ticket) {
            warn!(
                request_id = ticket.request_id,
                ticket_session = ticket.session.0,
                current_session = self.session.0,
                "Discarding stale generation result"
            );
            return CompletionOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(artifact) => {
                let discarded = history.append_after(ticket.append_after, artifact);
                dirty.mark_clean();
                self.state = OrchestratorState::Idle;
                let cursor = history.cursor().unwrap_or_default();
                info!(
                    request_id = ticket.request_id,
                    cursor,
                    discarded,
                    "Generation succeeded"
                );
                CompletionOutcome::Applied { cursor, discarded }
            }
            Err(err) => {
                let message = format!("{} {}", ticket.kind.failure_prefix(), err.message());
                warn!(request_id = ticket.request_id, error = %err, "Generation failed");
                self.state = OrchestratorState::Error(message.clone());
                CompletionOutcome::Failed(message)
            }
        }
    }

    /// Clears an `Error` state. No-op otherwise.
    pub fn dismiss(&mut self) {
        if matches!(self.state, OrchestratorState::Error(_)) {
            debug!("Dismissing generation error");
            self.state = OrchestratorState::Idle;
        }
    }

    /// Abandons the current session: forces `Idle` and bumps the session
    /// token so any in-flight result is discarded on arrival.
    pub fn reset_session(&mut self) -> SessionToken {
        if let Some(ticket) = self.in_flight.take() {
            info!(
                request_id = ticket.request_id,
                "Abandoning in-flight request"
            );
        }
        self.session = SessionToken(self.session.0 + 1);
        self.state = OrchestratorState::Idle;
        self.session
    }

    fn ensure_not_busy(&self) -> Result<()> {
        if self.is_busy() {
            return Err(MakeoverError::Busy);
        }
        Ok(())
    }

    fn begin(&mut self, request: GenerationRequest, append_after: Option<usize>) -> PendingRequest {
        self.next_request_id += 1;
        let ticket = RequestTicket {
            session: self.session,
            request_id: self.next_request_id,
            kind: request.kind(),
            append_after,
        };
        self.in_flight = Some(ticket);
        self.state = OrchestratorState::Generating(ticket.kind);
        PendingRequest { ticket, request }
    }
}
