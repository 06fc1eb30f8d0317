use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cv::{ALevel, CvDocument, OLevelAttempt, Personal};
use crate::nic::{decode_nic, NicParseResult};
use crate::state::AppState;
use crate::wizard::edit::{Entry, ListSection};
use crate::wizard::machine::{Connectivity, Step};
use crate::wizard::review::ReviewSummary;
use crate::wizard::{SubmitOutcome, Wizard};

/// Template ids arrive as either numbers or strings from the storefront.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TemplateId {
    Text(String),
    Number(i64),
}

impl TemplateId {
    fn into_string(self) -> String {
        match self {
            TemplateId::Text(s) => s,
            TemplateId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountRequest {
    pub template_id: TemplateId,
}

#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct AppendItemRequest {
    pub path: String,
    pub item: Value,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub path: String,
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub profile: String,
}

#[derive(Debug, Deserialize)]
pub struct NicRequest {
    #[serde(default)]
    pub nic: String,
}

#[derive(Debug, Serialize)]
pub struct StepInfo {
    pub number: u8,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub template_id: String,
    pub step: Step,
    pub step_title: &'static str,
    pub steps: Vec<StepInfo>,
    pub connectivity: Connectivity,
    pub submitting: bool,
    pub completed: bool,
    pub can_submit: bool,
    pub document: CvDocument,
}

impl SessionView {
    fn of(session_id: Uuid, wizard: &Wizard) -> Self {
        let state = wizard.state();
        SessionView {
            session_id,
            template_id: wizard.template_id().to_string(),
            step: state.step,
            step_title: state.step.title(),
            steps: Step::all()
                .map(|s| StepInfo {
                    number: s.number(),
                    title: s.title(),
                })
                .collect(),
            connectivity: state.connectivity,
            submitting: state.submitting,
            completed: state.completed,
            can_submit: state.can_submit(),
            document: wizard.document().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RemoveItemResponse {
    pub removed: bool,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct SubmitView {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/sessions
pub async fn handle_mount(
    State(state): State<AppState>,
    Json(req): Json<MountRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let (session, wizard) = state.mount(req.template_id.into_string()).await?;
    let view = SessionView::of(session, &*wizard.lock().await);
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let view = SessionView::of(session, &*wizard.lock().await);
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/health
pub async fn handle_check_health(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let result = state.backend.health().await;
    let mut wizard = wizard.lock().await;
    wizard.record_health(result);
    Ok(Json(SessionView::of(session, &wizard)))
}

/// PATCH /api/v1/sessions/:id/fields
pub async fn handle_set_field(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.set_field(&req.path, req.value)?;
    Ok(Json(SessionView::of(session, &wizard)))
}

/// POST /api/v1/sessions/:id/items
pub async fn handle_append_item(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(req): Json<AppendItemRequest>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.append_item(&req.path, req.item)?;
    Ok(Json(SessionView::of(session, &wizard)))
}

/// DELETE /api/v1/sessions/:id/items
pub async fn handle_remove_item(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(req): Json<RemoveItemRequest>,
) -> Result<Json<RemoveItemResponse>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    let removed = wizard.remove_item(&req.path, req.index)?;
    Ok(Json(RemoveItemResponse {
        removed,
        session: SessionView::of(session, &wizard),
    }))
}

/// PUT /api/v1/sessions/:id/personal
///
/// Replaces the personal details; an omitted photo keeps the uploaded one.
pub async fn handle_put_personal(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(mut personal): Json<Personal>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.update_personal(|current| {
        if personal.photo.is_none() {
            personal.photo = current.photo.take();
        }
        *current = personal;
    });
    Ok(Json(SessionView::of(session, &wizard)))
}

/// PUT /api/v1/sessions/:id/olevels/:index
pub async fn handle_put_olevel(
    State(state): State<AppState>,
    Path((session, index)): Path<(Uuid, usize)>,
    Json(attempt): Json<OLevelAttempt>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    if !wizard.update_olevel(index, |current| *current = attempt) {
        return Err(AppError::NotFound(format!("O/L attempt {index} not found")));
    }
    Ok(Json(SessionView::of(session, &wizard)))
}

/// PUT /api/v1/sessions/:id/alevel
pub async fn handle_put_alevel(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(alevel): Json<ALevel>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.update_alevel(|current| *current = alevel);
    Ok(Json(SessionView::of(session, &wizard)))
}

/// PUT /api/v1/sessions/:id/profile
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.set_profile(req.profile);
    Ok(Json(SessionView::of(session, &wizard)))
}

/// POST /api/v1/sessions/:id/entries/:section
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path((session, section)): Path<(Uuid, ListSection)>,
    Json(entry): Json<Value>,
) -> Result<Json<SessionView>, AppError> {
    let entry = Entry::from_json(section, entry)?;
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.append(entry);
    Ok(Json(SessionView::of(session, &wizard)))
}

/// DELETE /api/v1/sessions/:id/entries/:section/:index
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((session, section, index)): Path<(Uuid, ListSection, usize)>,
) -> Result<Json<RemoveItemResponse>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    let removed = wizard.remove(section, index)?;
    Ok(Json(RemoveItemResponse {
        removed,
        session: SessionView::of(session, &wizard),
    }))
}

/// POST /api/v1/sessions/:id/photo
pub async fn handle_upload_photo(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
        .ok_or_else(|| AppError::Validation("No file selected".to_string()))?;

    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;

    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.attach_photo(&bytes, file_name.as_deref(), content_type.as_deref())?;
    Ok(Json(SessionView::of(session, &wizard)))
}

/// POST /api/v1/sessions/:id/next
pub async fn handle_next(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.next()?;
    Ok(Json(SessionView::of(session, &wizard)))
}

/// POST /api/v1/sessions/:id/previous
pub async fn handle_previous(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let wizard = state.wizard(session).await?;
    let mut wizard = wizard.lock().await;
    wizard.previous()?;
    Ok(Json(SessionView::of(session, &wizard)))
}

/// GET /api/v1/sessions/:id/review
pub async fn handle_review(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<ReviewSummary>, AppError> {
    let wizard = state.wizard(session).await?;
    let review = wizard.lock().await.review();
    Ok(Json(review))
}

/// POST /api/v1/sessions/:id/submit
///
/// The wizard lock is released while the backend call is in flight so the
/// document stays editable; the submitting flag refuses a second submit.
/// The call is settled on its own task, so a client that disconnects still
/// leaves the wizard ready to retry.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<SubmitView>, AppError> {
    let wizard = state.wizard(session).await?;
    let payload = wizard.lock().await.begin_submit()?;
    let outcome = tokio::spawn(state.settle_submit(session, wizard, payload))
        .await
        .map_err(anyhow::Error::from)??;

    match outcome {
        SubmitOutcome::Completed { .. } => Ok(Json(SubmitView {
            success: true,
            message: outcome.notice(),
        })),
        SubmitOutcome::Failed { .. } => Err(AppError::Submission(outcome.notice())),
    }
}

/// POST /api/v1/nic/decode
pub async fn handle_decode_nic(Json(req): Json<NicRequest>) -> Json<NicParseResult> {
    Json(NicParseResult::from(decode_nic(&req.nic)))
}
