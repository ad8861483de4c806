//! Photo endpoints: upload, browsing, engagement

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;

use super::converters::{owned_photo_to_response, photo_detail_to_response, photo_to_response};
use super::dto::{
    InteractionRequest, InteractionResponse, MessageResponse, PhotoDetailResponse, PhotoResponse,
    ThemesResponse,
};
use crate::AppState;
use crate::analysis::ImageAnalysis;
use crate::auth::{CurrentUser, MaybeUser};
use crate::data::{ApprovalStatus, InteractionKind, PhotoFilter, PhotoSort};
use crate::error::AppError;
use crate::service::{Page, Paginated, UploadRequest};

#[derive(Debug, Deserialize)]
pub struct PhotoListQuery {
    pub theme: Option<String>,
    pub competition_id: Option<i64>,
    pub user_id: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MyPhotosQuery {
    pub status_filter: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhotoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Create photos router
///
/// Routes:
/// - GET /api/photos
/// - POST /api/photos/upload
/// - POST /api/photos/analyze-for-upload
/// - GET /api/photos/themes/list
/// - GET /api/photos/me/photos
/// - GET|PUT|DELETE /api/photos/:id
/// - POST /api/photos/:id/interact
pub fn photos_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_photos))
        .route("/upload", post(upload_photo))
        .route("/analyze-for-upload", post(analyze_for_upload))
        .route("/themes/list", get(list_themes))
        .route("/me/photos", get(my_photos))
        .route(
            "/:id",
            get(get_photo).put(update_photo).delete(delete_photo),
        )
        .route("/:id/interact", post(interact))
}

fn parse_sort(query: &PhotoListQuery) -> Result<(PhotoSort, bool), AppError> {
    let sort = query
        .sort_by
        .as_deref()
        .map(PhotoSort::parse)
        .transpose()?
        .unwrap_or(PhotoSort::UploadedAt);
    let descending = match query.sort_order.as_deref() {
        None | Some("desc") => true,
        Some("asc") => false,
        Some(other) => {
            return Err(AppError::Validation(format!(
                "sort_order must be asc or desc, got {}",
                other
            )));
        }
    };
    Ok((sort, descending))
}

/// Uploaded file taken from a multipart body
struct FilePart {
    file_name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Form fields of an upload
#[derive(Default)]
struct UploadForm {
    file: Option<FilePart>,
    title: Option<String>,
    description: Option<String>,
    competition_id: Option<i64>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?;
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "title" | "description" | "competition_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read {}: {}", name, e)))?;
                let text = text.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "title" => form.title = Some(text),
                    "description" => form.description = Some(text),
                    _ => {
                        form.competition_id = Some(text.parse().map_err(|_| {
                            AppError::Validation("competition_id must be an integer".to_string())
                        })?)
                    }
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// GET /api/photos
async fn list_photos(
    State(state): State<AppState>,
    Query(query): Query<PhotoListQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let (sort, descending) = parse_sort(&query)?;
    let filter = PhotoFilter {
        theme: query.theme.clone().filter(|t| !t.is_empty()),
        competition_id: query.competition_id,
        user_id: query.user_id,
        sort,
        descending,
    };

    let (photos, total) = state.photos.list_approved(&filter, page).await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}

/// POST /api/photos/upload
async fn upload_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<PhotoResponse>, AppError> {
    let form = read_upload_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    let title = form
        .title
        .ok_or_else(|| AppError::Validation("title is required".to_string()))?;

    let photo = state
        .photos
        .upload(
            &user,
            UploadRequest {
                file_name: file.file_name,
                content_type: file.content_type,
                data: file.data,
                title,
                description: form.description,
                competition_id: form.competition_id,
            },
        )
        .await?;
    Ok(Json(photo_to_response(&photo)))
}

/// POST /api/photos/analyze-for-upload
async fn analyze_for_upload(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    multipart: Multipart,
) -> Result<Json<ImageAnalysis>, AppError> {
    let file = read_upload_form(multipart)
        .await?
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    Ok(Json(state.photos.analyze(file.data).await?))
}

/// GET /api/photos/themes/list
async fn list_themes(State(state): State<AppState>) -> Result<Json<ThemesResponse>, AppError> {
    Ok(Json(ThemesResponse {
        themes: state.photos.themes().await?,
    }))
}

/// GET /api/photos/me/photos
async fn my_photos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MyPhotosQuery>,
) -> Result<Json<Paginated<PhotoResponse>>, AppError> {
    let page = Page::new(query.page, query.size)?;
    let status = query
        .status_filter
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ApprovalStatus::parse)
        .transpose()?;

    let (photos, total) = state
        .photos
        .list_by_status(Some(user.id), status, None, page)
        .await?;
    Ok(Json(
        Paginated::new(photos, total, page).map(|row| owned_photo_to_response(&row)),
    ))
}

/// GET /api/photos/:id
async fn get_photo(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PhotoDetailResponse>, AppError> {
    let detail = state.photos.detail(viewer.as_ref(), id).await?;
    Ok(Json(photo_detail_to_response(&detail)))
}

/// PUT /api/photos/:id
async fn update_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePhotoRequest>,
) -> Result<Json<PhotoResponse>, AppError> {
    let photo = state
        .photos
        .update(&user, id, req.title.as_deref(), req.description.as_deref())
        .await?;
    Ok(Json(photo_to_response(&photo)))
}

/// DELETE /api/photos/:id
async fn delete_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.photos.delete(&user, id).await?;
    Ok(Json(MessageResponse::new("Photo deleted")))
}

/// POST /api/photos/:id/interact
async fn interact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<InteractionRequest>,
) -> Result<Json<InteractionResponse>, AppError> {
    let kind = InteractionKind::parse(&req.kind)?;
    let outcome = state.photos.interact(&user, id, kind).await?;
    Ok(Json(InteractionResponse {
        kind: kind.as_str().to_string(),
        active: outcome.active,
        views: outcome.photo.views,
        likes: outcome.photo.likes,
        favorites: outcome.photo.favorites,
        votes: outcome.photo.votes,
        heat_score: outcome.photo.heat_score,
    }))
}
