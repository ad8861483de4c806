//! Photo service
//!
//! Uploads with their business limits, visibility rules, engagement and
//! owner/admin edits. Every change that affects what readers see drops the
//! matching strategy cache entries.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::{Page, SettingsService, utc_midnight};
use crate::analysis::{ImageAnalysis, ImageAnalyzer};
use crate::data::{
    ApprovalStatus, Competition, CompetitionStatus, Database, InteractionKind, NewPhoto,
    NewSystemLog, Photo, PhotoFilter, PhotoWithOwner, User, ViewerFlags,
};
use crate::error::AppError;
use crate::metrics::{PHOTO_BYTES_UPLOADED, PHOTO_UPLOADS_TOTAL};
use crate::storage::MediaStorage;
use crate::strategy::StrategyEngine;

const MAX_TITLE_LEN: usize = 100;

/// Multipart upload after extraction
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub title: String,
    pub description: Option<String>,
    pub competition_id: Option<i64>,
}

/// Photo page with everything a viewer needs
#[derive(Debug, Clone)]
pub struct PhotoDetail {
    pub photo: PhotoWithOwner,
    pub competition: Option<Competition>,
    pub flags: ViewerFlags,
}

/// State after an interaction
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    /// Whether the toggle is now set; always `true` for views
    pub active: bool,
    pub photo: Photo,
}

pub(crate) fn validate_title(title: &str) -> Result<(), AppError> {
    let length = title.trim().chars().count();
    if length == 0 || length > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be 1 to {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Lower-case extension of a file name
fn file_extension(file_name: &str) -> Option<String> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn content_type_for(extension: &str, declared: Option<&str>) -> String {
    match extension {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "webp" => "image/webp".to_string(),
        "gif" => "image/gif".to_string(),
        _ => declared.unwrap_or("application/octet-stream").to_string(),
    }
}

fn can_manage(user: &User, photo: &Photo) -> bool {
    user.is_admin() || user.id == photo.user_id
}

/// Photo service
pub struct PhotoService {
    db: Arc<Database>,
    settings: Arc<SettingsService>,
    storage: Arc<MediaStorage>,
    analyzer: Arc<ImageAnalyzer>,
    engine: Arc<StrategyEngine>,
}

impl PhotoService {
    pub fn new(
        db: Arc<Database>,
        settings: Arc<SettingsService>,
        storage: Arc<MediaStorage>,
        analyzer: Arc<ImageAnalyzer>,
        engine: Arc<StrategyEngine>,
    ) -> Self {
        Self {
            db,
            settings,
            storage,
            analyzer,
            engine,
        }
    }

    /// Store, analyze and register a new photo as `pending`
    ///
    /// Checks run in order: permission (403), daily limit (429), size (413),
    /// extension (400), decodability (400), then the competition (404/400).
    pub async fn upload(&self, user: &User, request: UploadRequest) -> Result<Photo, AppError> {
        let permissions = self.settings.role_permissions(user.role()).await?;
        if !permissions.can_upload {
            return Err(AppError::Forbidden);
        }
        validate_title(&request.title)?;

        if let Some(limit) = self.settings.daily_upload_limit().await? {
            let today = self
                .db
                .count_uploads_since(user.id, utc_midnight(Utc::now()))
                .await?;
            if today >= limit {
                return Err(AppError::RateLimited(format!(
                    "Daily upload limit of {} photos reached",
                    limit
                )));
            }
        }

        if let Some(max_size) = self.settings.max_file_size().await? {
            if request.data.len() as u64 > max_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the {} byte limit",
                    max_size
                )));
            }
        }

        let extension = file_extension(&request.file_name)
            .ok_or_else(|| AppError::Validation("File name has no extension".to_string()))?;
        let allowed = self.settings.allowed_extensions().await?;
        if !allowed.contains(&extension) {
            return Err(AppError::Validation(format!(
                "Unsupported file type .{} (allowed: {})",
                extension,
                allowed.join(", ")
            )));
        }

        let thumbnail_edge = self.settings.image_processing().await?.thumbnail_size;
        let (analysis, thumbnail) = self
            .analyzer
            .analyze_with_thumbnail(request.data.clone(), thumbnail_edge)
            .await?;

        if let Some(competition_id) = request.competition_id {
            self.check_submission(user, competition_id).await?;
        }

        let size = request.data.len();
        let content_type = content_type_for(&extension, request.content_type.as_deref());
        let stored = self
            .storage
            .store_photo(&extension, request.data, &content_type, thumbnail)
            .await?;

        let inserted = self
            .db
            .insert_photo(&NewPhoto {
                user_id: user.id,
                title: request.title.trim().to_string(),
                description: request.description,
                image_url: stored.url.clone(),
                thumbnail_url: Some(stored.thumbnail_url.clone()),
                storage_key: Some(stored.key.clone()),
                thumbnail_key: Some(stored.thumbnail_key.clone()),
                theme: Some(analysis.theme.clone()),
                confidence: Some(analysis.confidence),
                quality_score: Some(analysis.quality_score),
                competition_id: request.competition_id,
            })
            .await;

        let photo = match inserted {
            Ok(photo) => photo,
            Err(error) => {
                for key in [&stored.key, &stored.thumbnail_key] {
                    if let Err(cleanup) = self.storage.delete(key).await {
                        tracing::warn!(
                            key = %key,
                            error = %cleanup,
                            "Failed to remove orphaned upload"
                        );
                    }
                }
                return Err(error);
            }
        };

        PHOTO_UPLOADS_TOTAL.inc();
        PHOTO_BYTES_UPLOADED.inc_by(size as f64);
        tracing::info!(
            photo_id = photo.id,
            user_id = user.id,
            theme = %analysis.theme,
            bytes = size,
            "Photo uploaded"
        );
        Ok(photo)
    }

    /// Analyze an image without storing it
    pub async fn analyze(&self, data: Vec<u8>) -> Result<ImageAnalysis, AppError> {
        self.analyzer.analyze(data).await
    }

    pub async fn list_approved(
        &self,
        filter: &PhotoFilter,
        page: Page,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        self.db
            .list_approved_photos(filter, page.limit(), page.offset())
            .await
    }

    /// Photos of any status, optionally narrowed to one owner
    pub async fn list_by_status(
        &self,
        user_id: Option<i64>,
        status: Option<ApprovalStatus>,
        search: Option<&str>,
        page: Page,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        self.db
            .list_photos_by_status(user_id, status, search, page.limit(), page.offset())
            .await
    }

    /// Load a photo for `viewer`, counting a view when it is public
    ///
    /// Pending and rejected photos are visible only to their owner and
    /// admins; anyone else gets `NotFound`.
    pub async fn detail(&self, viewer: Option<&User>, id: i64) -> Result<PhotoDetail, AppError> {
        let photo = self.db.get_photo_with_owner(id).await?.ok_or(AppError::NotFound)?;

        let photo = if photo.photo.is_approved() {
            let weights = self.settings.heat_weights().await?;
            self.db
                .record_view(id, viewer.map(|user| user.id), &weights)
                .await?;
            self.engine.invalidate_photo(id).await;
            self.db.get_photo_with_owner(id).await?.ok_or(AppError::NotFound)?
        } else if viewer.is_some_and(|user| can_manage(user, &photo.photo)) {
            photo
        } else {
            return Err(AppError::NotFound);
        };

        let competition = match photo.photo.competition_id {
            Some(competition_id) => self.db.get_competition(competition_id).await?,
            None => None,
        };
        let flags = match viewer {
            Some(user) => self.db.viewer_flags(user.id, id).await?,
            None => ViewerFlags::default(),
        };

        Ok(PhotoDetail {
            photo,
            competition,
            flags,
        })
    }

    pub async fn update(
        &self,
        user: &User,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Photo, AppError> {
        let photo = self.db.get_photo(id).await?.ok_or(AppError::NotFound)?;
        if !can_manage(user, &photo) {
            return Err(AppError::Forbidden);
        }
        if let Some(title) = title {
            validate_title(title)?;
        }

        let updated = self
            .db
            .update_photo_details(id, title.map(str::trim), description)
            .await?
            .ok_or(AppError::NotFound)?;
        self.engine.invalidate_photo(id).await;
        Ok(updated)
    }

    /// Delete a photo, its interactions and stored media
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), AppError> {
        let photo = self.db.get_photo(id).await?.ok_or(AppError::NotFound)?;
        if !can_manage(user, &photo) {
            return Err(AppError::Forbidden);
        }

        if !self.db.delete_photo(id).await? {
            return Err(AppError::NotFound);
        }
        self.engine.invalidate_photo(id).await;

        for key in [&photo.storage_key, &photo.thumbnail_key].into_iter().flatten() {
            if let Err(error) = self.storage.delete(key).await {
                tracing::warn!(
                    photo_id = id,
                    key = %key,
                    error = %error,
                    "Failed to delete stored media"
                );
            }
        }

        if user.is_admin() && user.id != photo.user_id {
            self.db
                .insert_system_log(
                    &NewSystemLog::new(user.id, "delete_photo", "photo", Some(id))
                        .with_details(json!({ "title": photo.title, "owner_id": photo.user_id })),
                )
                .await?;
        }

        tracing::info!(photo_id = id, user_id = user.id, "Photo deleted");
        Ok(())
    }

    /// Like, favorite, vote (toggles) or view an approved photo
    pub async fn interact(
        &self,
        user: &User,
        id: i64,
        kind: InteractionKind,
    ) -> Result<InteractionOutcome, AppError> {
        let photo = self
            .db
            .get_photo(id)
            .await?
            .filter(Photo::is_approved)
            .ok_or(AppError::NotFound)?;

        if kind == InteractionKind::Vote {
            let permissions = self.settings.role_permissions(user.role()).await?;
            if !permissions.can_vote {
                return Err(AppError::Forbidden);
            }
            if let Some(competition_id) = photo.competition_id {
                let competition = self
                    .db
                    .get_competition(competition_id)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if competition.status() != CompetitionStatus::Voting {
                    return Err(AppError::Validation(
                        "Voting is not open for this competition".to_string(),
                    ));
                }
            }
        }

        let weights = self.settings.heat_weights().await?;
        let active = if kind.is_toggle() {
            self.db
                .toggle_interaction(user.id, id, kind, &weights)
                .await?
        } else {
            self.db.record_view(id, Some(user.id), &weights).await?
        };
        self.engine.invalidate_photo(id).await;

        let photo = self.db.get_photo(id).await?.ok_or(AppError::NotFound)?;
        tracing::debug!(
            photo_id = id,
            user_id = user.id,
            kind = kind.as_str(),
            active,
            "Interaction recorded"
        );
        Ok(InteractionOutcome { active, photo })
    }

    pub async fn themes(&self) -> Result<Vec<String>, AppError> {
        self.db.approved_themes().await
    }

    /// Admin correction of the analyzer's output
    pub async fn update_analysis(
        &self,
        id: i64,
        theme: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<Photo, AppError> {
        if let Some(confidence) = confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(AppError::Validation(
                    "confidence must be between 0 and 1".to_string(),
                ));
            }
        }

        let photo = self
            .db
            .update_photo_analysis(id, theme, confidence)
            .await?
            .ok_or(AppError::NotFound)?;
        self.engine.invalidate_photo(id).await;
        Ok(photo)
    }

    async fn check_submission(&self, user: &User, competition_id: i64) -> Result<(), AppError> {
        let competition = self
            .db
            .get_competition(competition_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if competition.status() != CompetitionStatus::Active {
            return Err(AppError::Validation(
                "Competition is not accepting submissions".to_string(),
            ));
        }

        let submitted = self
            .db
            .count_competition_submissions(user.id, competition_id)
            .await?;
        if submitted >= competition.max_submissions {
            return Err(AppError::Validation(format!(
                "At most {} submissions per user",
                competition.max_submissions
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_lowercased() {
        assert_eq!(file_extension("Sunset.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("jpeg", Some("text/plain")), "image/jpeg");
        assert_eq!(content_type_for("webp", None), "image/webp");
        assert_eq!(content_type_for("bin", None), "application/octet-stream");
    }

    #[test]
    fn titles_are_bounded() {
        assert!(validate_title("Library at dusk").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(101)).is_err());
    }
}
