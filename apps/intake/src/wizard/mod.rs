//! The CV intake wizard: ten steps over one [`CvDocument`], persisted to the
//! session store after every edit and submitted to the order backend from
//! the final step.

pub mod derive;
pub mod edit;
pub mod handlers;
pub mod machine;
pub mod photo;
pub mod review;
pub mod validation;

use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend_client::{BackendError, SubmitResponse};
use crate::models::cv::{ALevel, CvDocument, OLevelAttempt, Personal, SubmissionPayload};
use crate::storage::{self, SessionStore, FORM_KEY};

use self::derive::derive_from_nic;
use self::edit::{EditError, Entry, ListSection};
use self::machine::{transition, Blocked, Connectivity, ControllerState, Event, Step};
use self::photo::{photo_data_url, PhotoError};
use self::review::ReviewSummary;

/// Key the ordered template id is stored under, so a remounted wizard keeps it.
pub const TEMPLATE_KEY: &str = "kl_cv_template";

pub const SUCCESS_NOTICE: &str =
    "CV data saved successfully. Your information has been stored securely.";
const DEFAULT_FAILURE_REASON: &str = "Failed to save data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Completed { notice: String },
    Failed { reason: String },
}

impl SubmitOutcome {
    /// Message to show the user.
    pub fn notice(&self) -> String {
        match self {
            SubmitOutcome::Completed { notice } => notice.clone(),
            SubmitOutcome::Failed { reason } => format!("{DEFAULT_FAILURE_REASON}: {reason}"),
        }
    }
}

type CompletionHook = Box<dyn FnOnce() + Send>;

pub struct Wizard {
    state: ControllerState,
    document: CvDocument,
    template_id: String,
    store: Arc<dyn SessionStore>,
    on_complete: Option<CompletionHook>,
}

impl Wizard {
    /// Opens the wizard for `template_id`, restoring any document left in `store`.
    pub fn mount(store: Arc<dyn SessionStore>, template_id: impl Into<String>) -> Self {
        let mut document = storage::load_or(store.as_ref(), FORM_KEY, CvDocument::default());
        if document.olevels.is_empty() {
            document.olevels.push(OLevelAttempt::default());
        }
        if document.references.is_empty() {
            document.references.push(Default::default());
        }

        let template_id = template_id.into();
        storage::save(store.as_ref(), TEMPLATE_KEY, &template_id);

        let wizard = Self {
            state: ControllerState::default(),
            document,
            template_id,
            store,
            on_complete: None,
        };
        wizard.persist();
        wizard
    }

    /// Reopens a wizard for a session whose template id was stored at mount.
    pub fn resume(store: Arc<dyn SessionStore>) -> Self {
        let template_id: String = storage::load_or(store.as_ref(), TEMPLATE_KEY, String::new());
        Self::mount(store, template_id)
    }

    /// Registers a callback fired once when a submission succeeds.
    pub fn on_complete(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn document(&self) -> &CvDocument {
        &self.document
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn review(&self) -> ReviewSummary {
        ReviewSummary::of(&self.document)
    }

    // --- navigation ---

    pub fn next(&mut self) -> Result<Step, Blocked> {
        self.apply(Event::Next)?;
        Ok(self.state.step)
    }

    pub fn previous(&mut self) -> Result<Step, Blocked> {
        self.apply(Event::Previous)?;
        Ok(self.state.step)
    }

    fn apply(&mut self, event: Event) -> Result<(), Blocked> {
        self.state = transition(&self.state, event, &self.document)?;
        Ok(())
    }

    // --- backend connectivity ---

    pub fn record_health(&mut self, result: Result<bool, BackendError>) -> Connectivity {
        let success = match result {
            Ok(true) => true,
            Ok(false) => {
                warn!("Backend health check reported failure");
                false
            }
            Err(e) => {
                warn!("Backend connection failed: {e}");
                false
            }
        };
        if let Ok(state) = transition(&self.state, Event::HealthChecked { success }, &self.document)
        {
            self.state = state;
        }
        self.state.connectivity
    }

    // --- document edits ---

    pub fn set_field(&mut self, path: &str, value: Value) -> Result<(), EditError> {
        self.try_mutate(|doc| edit::set_field(doc, path, value))
    }

    pub fn append_item(&mut self, path: &str, item: Value) -> Result<(), EditError> {
        self.try_mutate(|doc| edit::append_item(doc, path, item))
    }

    pub fn remove_item(&mut self, path: &str, index: usize) -> Result<bool, EditError> {
        self.try_mutate(|doc| edit::remove_item(doc, path, index))
    }

    pub fn append(&mut self, entry: Entry) {
        self.mutate(|doc| edit::append_entry(doc, entry))
    }

    pub fn remove(&mut self, section: ListSection, index: usize) -> Result<bool, EditError> {
        self.try_mutate(|doc| edit::remove_entry(doc, section, index))
    }

    pub fn update_personal(&mut self, f: impl FnOnce(&mut Personal)) {
        self.mutate(|doc| f(&mut doc.personal))
    }

    pub fn update_alevel(&mut self, f: impl FnOnce(&mut ALevel)) {
        self.mutate(|doc| f(&mut doc.alevel))
    }

    /// Edits one O/L attempt; returns `false` when `index` does not exist.
    pub fn update_olevel(&mut self, index: usize, f: impl FnOnce(&mut OLevelAttempt)) -> bool {
        self.mutate(|doc| doc.olevels.get_mut(index).map(f).is_some())
    }

    pub fn set_profile(&mut self, profile: impl Into<String>) {
        let profile = profile.into();
        self.mutate(|doc| doc.profile = profile)
    }

    pub fn attach_photo(
        &mut self,
        bytes: &[u8],
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(), PhotoError> {
        let data_url = photo_data_url(bytes, file_name, content_type)?;
        debug!("Attached photo ({} bytes)", bytes.len());
        self.update_personal(|p| p.photo = Some(data_url));
        Ok(())
    }

    fn mutate<R>(&mut self, f: impl FnOnce(&mut CvDocument) -> R) -> R {
        match self.try_mutate::<R, Infallible>(|doc| Ok(f(doc))) {
            Ok(out) => out,
            Err(never) => match never {},
        }
    }

    /// Runs an edit, then re-derives NIC fields if the NIC changed and persists.
    fn try_mutate<R, E>(
        &mut self,
        f: impl FnOnce(&mut CvDocument) -> Result<R, E>,
    ) -> Result<R, E> {
        let previous_nic = self.document.personal.nic.clone();
        let out = f(&mut self.document)?;
        if self.document.personal.nic != previous_nic {
            if let Some(derived) = derive_from_nic(&self.document) {
                derived.apply(&mut self.document);
            }
        }
        self.persist();
        Ok(out)
    }

    fn persist(&self) {
        storage::save(self.store.as_ref(), FORM_KEY, &self.document);
    }

    // --- submission ---

    /// Marks a submission in flight and returns the body to send.
    pub fn begin_submit(&mut self) -> Result<SubmissionPayload, Blocked> {
        self.apply(Event::SubmitStarted)?;
        info!("Submitting CV for template '{}'", self.template_id);
        Ok(SubmissionPayload {
            document: self.document.clone(),
            template_id: self.template_id.clone(),
        })
    }

    /// Settles the in-flight submission with the backend's answer.
    pub fn finish_submit(
        &mut self,
        result: Result<SubmitResponse, BackendError>,
    ) -> Result<SubmitOutcome, Blocked> {
        let failure = match result {
            Ok(response) if response.success => None,
            Ok(response) => Some(
                response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string()),
            ),
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => {
                self.apply(Event::SubmitSucceeded)?;
                for key in [FORM_KEY, TEMPLATE_KEY] {
                    if let Err(e) = self.store.remove(key) {
                        warn!("Failed to clear '{key}' from session store: {e}");
                    }
                }
                self.document = CvDocument::default();
                info!("CV submission for template '{}' completed", self.template_id);
                if let Some(hook) = self.on_complete.take() {
                    hook();
                }
                Ok(SubmitOutcome::Completed {
                    notice: SUCCESS_NOTICE.to_string(),
                })
            }
            Some(reason) => {
                self.apply(Event::SubmitFailed)?;
                warn!("CV submission failed: {reason}");
                Ok(SubmitOutcome::Failed { reason })
            }
        }
    }
}
