//! The style command pipeline.
//!
//! A [`Widget`] owns everything the chat panel shows: the current style state,
//! the transcript, the loading flag and whether the panel is open. The
//! presentation layer may only read that state and call two verbs,
//! [`Widget::submit`] and [`Widget::toggle_panel`].
//!
//! A submission moves the widget from idle to awaiting and back. Front-ends
//! that need to keep drawing while the request is in flight use the two halves
//! directly: [`Widget::begin`] captures the command and raises the loading
//! flag, [`Widget::complete`] applies whatever the completion client returned.

use crate::completion::{CompletionBackend, CompletionError};
use crate::style::{PayloadError, StyleState};
use crate::transcript::Transcript;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Assistant reply after a style update was applied.
pub const SUCCESS_REPLY: &str = "Styles updated successfully!";

/// Assistant reply after any failure; the style state is left untouched.
pub const FAILURE_REPLY: &str = "Failed to update styles. Please try again.";

/// Why a command left the style state unchanged.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Result of one submission once it has left the awaiting state.
#[derive(Debug)]
pub enum Outcome {
    Updated,
    Failed(CommandError),
}

impl Outcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Outcome::Updated)
    }
}

/// A command that has been accepted and is waiting for its completion.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    command: String,
    styles: StyleState,
}

impl PendingCommand {
    /// The text exactly as submitted.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Style state at the moment the command was accepted.
    pub fn styles(&self) -> &StyleState {
        &self.styles
    }
}

/// State of one chat widget instance.
#[derive(Debug, Clone, Default)]
pub struct Widget {
    styles: StyleState,
    transcript: Transcript,
    pending_input: Option<String>,
    loading: bool,
    panel_open: bool,
}

impl Widget {
    /// Mount a widget with the given style state and an empty transcript.
    pub fn new(initial: StyleState) -> Self {
        Self {
            styles: initial,
            ..Self::default()
        }
    }

    pub fn styles(&self) -> &StyleState {
        &self.styles
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// True while a request is in flight; input and submit are disabled.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    /// The command currently being processed, if any.
    pub fn pending_input(&self) -> Option<&str> {
        self.pending_input.as_deref()
    }

    /// Show or hide the chat panel. Does not affect an in-flight request.
    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        debug!(open = self.panel_open, "chat panel toggled");
        self.panel_open
    }

    /// Submit a command and wait for it to resolve.
    ///
    /// Returns `None` when the submission is rejected: blank text, or another
    /// command still in flight. Nothing is sent and nothing is recorded then.
    pub async fn submit<B>(&mut self, backend: &B, command: &str) -> Option<Outcome>
    where
        B: CompletionBackend + ?Sized,
    {
        let pending = self.begin(command)?;
        let result = backend.complete(pending.styles(), pending.command()).await;
        Some(self.complete(pending, result))
    }

    /// Accept a command and enter the awaiting state.
    pub fn begin(&mut self, command: &str) -> Option<PendingCommand> {
        if self.loading {
            debug!("submission rejected: a command is already in flight");
            return None;
        }
        if command.trim().is_empty() {
            debug!("submission rejected: empty command");
            return None;
        }

        self.loading = true;
        self.pending_input = Some(command.to_string());
        info!(command = %command, "style command submitted");

        Some(PendingCommand {
            command: command.to_string(),
            styles: self.styles.clone(),
        })
    }

    /// Apply the completion result for `pending` and return to idle.
    ///
    /// The new state replaces the old one wholesale; properties the model
    /// omitted are dropped. On any failure the old state stays as it was.
    pub fn complete(
        &mut self,
        pending: PendingCommand,
        result: Result<String, CompletionError>,
    ) -> Outcome {
        let parsed = result
            .map_err(CommandError::from)
            .and_then(|text| StyleState::parse_payload(&text).map_err(CommandError::from));

        let outcome = match parsed {
            Ok(styles) => {
                info!(styles = %styles, "styles updated");
                self.styles = styles;
                self.transcript.push_exchange(pending.command, SUCCESS_REPLY);
                Outcome::Updated
            }
            Err(err) => {
                warn!(error = %err, command = %pending.command, "style command failed");
                self.transcript.push_exchange(pending.command, FAILURE_REPLY);
                Outcome::Failed(err)
            }
        };

        self.loading = false;
        self.pending_input = None;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies and records every call.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        calls: Mutex<Vec<(StyleState, String)>>,
    }

    impl ScriptedBackend {
        fn replying(reply: Result<String, CompletionError>) -> Self {
            let backend = Self::default();
            backend.replies.lock().unwrap().push_back(reply);
            backend
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            current: &StyleState,
            command: &str,
        ) -> Result<String, CompletionError> {
            self.calls
                .lock()
                .unwrap()
                .push((current.clone(), command.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::EmptyChoices))
        }
    }

    const RED: &str = r#"{"button":{"backgroundColor":"red","padding":"10px 20px","borderRadius":"6px","color":"white"}}"#;

    #[tokio::test]
    async fn test_make_it_red() {
        let backend = ScriptedBackend::replying(Ok(RED.to_string()));
        let mut widget = Widget::new(StyleState::default());

        let outcome = widget.submit(&backend, "make it red").await.unwrap();

        assert!(outcome.is_updated());
        assert_eq!(widget.styles().property("backgroundColor"), Some("red"));
        assert_eq!(widget.styles().property("padding"), Some("10px 20px"));
        assert_eq!(widget.transcript().len(), 2);
        assert!(!widget.is_loading());
        assert!(widget.pending_input().is_none());

        let entries = widget.transcript().entries();
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].content, "make it red");
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].content, SUCCESS_REPLY);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, StyleState::default());
        assert_eq!(calls[0].1, "make it red");
    }

    #[tokio::test]
    async fn test_echoed_state_is_idempotent() {
        let initial = StyleState::default();
        let backend = ScriptedBackend::replying(Ok(initial.to_string()));
        let mut widget = Widget::new(initial.clone());

        let outcome = widget.submit(&backend, "leave it").await.unwrap();

        assert!(outcome.is_updated());
        assert_eq!(widget.styles(), &initial);
        assert_eq!(widget.transcript().len(), 2);
        assert_eq!(widget.transcript().entries()[1].content, SUCCESS_REPLY);
    }

    #[tokio::test]
    async fn test_replacement_drops_omitted_properties() {
        let backend =
            ScriptedBackend::replying(Ok(r#"{"button":{"backgroundColor":"green"}}"#.to_string()));
        let mut widget = Widget::new(StyleState::default());

        widget.submit(&backend, "green").await.unwrap();

        assert_eq!(widget.styles().property("backgroundColor"), Some("green"));
        assert_eq!(widget.styles().property("padding"), None);
        assert_eq!(widget.styles().property("color"), None);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_styles() {
        let backend = ScriptedBackend::replying(Err(CompletionError::Status {
            status: 500,
            message: "boom".to_string(),
        }));
        let mut widget = Widget::new(StyleState::default());
        let before = widget.styles().clone();

        let outcome = widget.submit(&backend, "make it red").await.unwrap();

        assert!(matches!(
            outcome,
            Outcome::Failed(CommandError::Completion(CompletionError::Status { .. }))
        ));
        assert_eq!(widget.styles(), &before);
        assert_eq!(widget.transcript().len(), 2);
        assert_eq!(widget.transcript().entries()[0].content, "make it red");
        assert_eq!(widget.transcript().entries()[1].content, FAILURE_REPLY);
        assert!(!widget.is_loading());
        assert!(widget.pending_input().is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_styles() {
        let backend = ScriptedBackend::replying(Ok("not json".to_string()));
        let mut widget = Widget::new(StyleState::default());
        let before = widget.styles().clone();

        let outcome = widget.submit(&backend, "make it red").await.unwrap();

        assert!(matches!(
            outcome,
            Outcome::Failed(CommandError::Payload(PayloadError::InvalidJson(_)))
        ));
        assert_eq!(widget.styles(), &before);
        assert_eq!(widget.transcript().entries()[1].role, Role::Assistant);
        assert_eq!(widget.transcript().entries()[1].content, FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_non_object_payload_keeps_styles() {
        let backend = ScriptedBackend::replying(Ok(r#"["red"]"#.to_string()));
        let mut widget = Widget::new(StyleState::default());

        let outcome = widget.submit(&backend, "make it red").await.unwrap();

        assert!(matches!(
            outcome,
            Outcome::Failed(CommandError::Payload(PayloadError::NotAnObject("array")))
        ));
        assert_eq!(widget.styles(), &StyleState::default());
        assert_eq!(widget.transcript().entries()[1].content, FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_blank_command_is_ignored() {
        let backend = ScriptedBackend::default();
        let mut widget = Widget::new(StyleState::default());

        for command in ["", "   ", "\t\n"] {
            assert!(widget.submit(&backend, command).await.is_none());
        }

        assert_eq!(backend.call_count(), 0);
        assert!(widget.transcript().is_empty());
        assert!(!widget.is_loading());
    }

    #[tokio::test]
    async fn test_submit_while_loading_is_rejected() {
        let backend = ScriptedBackend::replying(Ok(RED.to_string()));
        let mut widget = Widget::new(StyleState::default());

        let pending = widget.begin("make it red").unwrap();
        assert!(widget.is_loading());
        assert_eq!(widget.pending_input(), Some("make it red"));

        assert!(widget.submit(&backend, "make it blue").await.is_none());
        assert!(widget.begin("make it blue").is_none());
        assert_eq!(backend.call_count(), 0);
        assert!(widget.transcript().is_empty());
        assert!(widget.is_loading());

        let result = backend.complete(pending.styles(), pending.command()).await;
        let outcome = widget.complete(pending, result);
        assert!(outcome.is_updated());
        assert!(!widget.is_loading());
        assert_eq!(widget.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_each_success_adds_two_entries() {
        let backend = ScriptedBackend::default();
        for _ in 0..3 {
            backend.replies.lock().unwrap().push_back(Ok(RED.to_string()));
        }
        let mut widget = Widget::new(StyleState::default());

        for (i, command) in ["a", "b", "c"].into_iter().enumerate() {
            widget.submit(&backend, command).await.unwrap();
            assert_eq!(widget.transcript().len(), 2 * (i + 1));
            assert!(!widget.is_loading());
        }
    }

    #[test]
    fn test_toggle_panel_does_not_touch_request() {
        let mut widget = Widget::new(StyleState::default());
        assert!(!widget.is_panel_open());

        let pending = widget.begin("make it red").unwrap();
        assert!(widget.toggle_panel());
        assert!(!widget.toggle_panel());
        assert!(widget.is_loading());

        // Resolves after the panel was closed and still applies.
        widget.complete(pending, Ok(RED.to_string()));
        assert_eq!(widget.styles().property("backgroundColor"), Some("red"));
        assert_eq!(widget.transcript().len(), 2);
    }

    #[test]
    fn test_pending_command_snapshots_styles() {
        let mut widget = Widget::new(StyleState::default());
        let pending = widget.begin("  padded  ").unwrap();
        assert_eq!(pending.command(), "  padded  ");
        assert_eq!(pending.styles(), widget.styles());
    }
}
