//! SQLite database operations
//!
//! All database access goes through this module.
//! State transitions are single conditional statements so concurrent
//! requests cannot both win.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

const PHOTO_WITH_OWNER_SELECT: &str = r#"
    SELECT p.*, u.username AS owner_username, u.avatar_url AS owner_avatar_url
    FROM photos p
    JOIN users u ON u.id = p.user_id
"#;

fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, sort: PhotoSort, descending: bool) {
    let direction = if descending { "DESC" } else { "ASC" };
    builder.push(format!(
        " ORDER BY p.{} {}, p.id {}",
        sort.column(),
        direction,
        direction
    ));
}

fn push_photo_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PhotoFilter) {
    if let Some(theme) = &filter.theme {
        builder.push(" AND p.theme = ").push_bind(theme.clone());
    }
    if let Some(competition_id) = filter.competition_id {
        builder
            .push(" AND p.competition_id = ")
            .push_bind(competition_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND p.user_id = ").push_bind(user_id);
    }
}

fn push_window(builder: &mut QueryBuilder<'_, Sqlite>, since: Option<DateTime<Utc>>) {
    if let Some(since) = since {
        builder.push(" AND p.uploaded_at >= ").push_bind(since);
    }
}

fn push_appointment_scope(builder: &mut QueryBuilder<'_, Sqlite>, scope: AppointmentScope) {
    match scope {
        AppointmentScope::All => {}
        AppointmentScope::AsStudent(user_id) => {
            builder.push(" AND student_id = ").push_bind(user_id);
        }
        AppointmentScope::AsPhotographer(user_id) => {
            builder.push(" AND photographer_id = ").push_bind(user_id);
        }
    }
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let db_path = path.to_str().ok_or_else(|| {
            AppError::Config(format!(
                "database path must be valid UTF-8: {}",
                path.display()
            ))
        })?;

        let database_url = format!("sqlite:{}?mode=rwc", db_path);
        let pool = SqlitePool::connect(&database_url).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Migration failed: {}", e)))?;

        tracing::info!(path = %path.display(), "Database connected");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn insert_user(&self, user: &NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role, bio, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.bio)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Look a user up by username or email, as accepted at login.
    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = ? OR email = ? ORDER BY id LIMIT 1",
        )
        .bind(login)
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Whether `username` belongs to a user other than `except_id`.
    pub async fn username_taken(
        &self,
        username: &str,
        except_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(except_id.unwrap_or(0))
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Whether `email` belongs to a user other than `except_id`.
    pub async fn email_taken(&self, email: &str, except_id: Option<i64>) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(except_id.unwrap_or(0))
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Apply profile changes; `None` fields keep their value.
    pub async fn update_user_profile(
        &self,
        id: i64,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE(?, username),
                email = COALESCE(?, email),
                bio = COALESCE(?, bio),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.bio)
        .bind(&changes.avatar_url)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn set_user_role(&self, id: i64, role: Role) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Keep the bootstrap admin's credentials in sync with configuration.
    pub async fn sync_admin_credentials(
        &self,
        id: i64,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, password_hash = ?, role = 'admin', is_active = 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Page through users, optionally narrowed by role and a username/email search.
    pub async fn list_users(
        &self,
        role: Option<Role>,
        search: Option<&str>,
        active_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), AppError> {
        fn push_filters<'a>(
            builder: &mut QueryBuilder<'a, Sqlite>,
            role: Option<Role>,
            search: Option<&str>,
            active_only: bool,
        ) {
            if let Some(role) = role {
                builder.push(" AND role = ").push_bind(role.as_str());
            }
            if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
                let pattern = like_pattern(search);
                builder
                    .push(" AND (username LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if active_only {
                builder.push(" AND is_active = 1");
            }
        }

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_filters(&mut count_query, role, search, active_only);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE 1 = 1");
        push_filters(&mut query, role, search, active_only);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    pub async fn count_user_photos(
        &self,
        user_id: i64,
        status: Option<ApprovalStatus>,
    ) -> Result<i64, AppError> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM photos WHERE user_id = ");
        query.push_bind(user_id);
        if let Some(status) = status {
            query
                .push(" AND approval_status = ")
                .push_bind(status.as_str());
        }
        let count: i64 = query.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(count)
    }

    /// Sum of engagement on a user's approved photos: (likes, views).
    pub async fn user_engagement_totals(&self, user_id: i64) -> Result<(i64, i64), AppError> {
        let totals: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(likes), 0), COALESCE(SUM(views), 0)
            FROM photos
            WHERE user_id = ? AND approval_status = 'approved'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    // =========================================================================
    // Photos
    // =========================================================================

    pub async fn insert_photo(&self, photo: &NewPhoto) -> Result<Photo, AppError> {
        let now = Utc::now();
        let analyzed_at = photo.theme.as_ref().map(|_| now);
        let created = sqlx::query_as::<_, Photo>(
            r#"
            INSERT INTO photos (
                user_id, title, description, image_url, thumbnail_url, storage_key,
                thumbnail_key, theme, confidence, quality_score, analyzed_at,
                competition_id, approval_status, uploaded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            RETURNING *
            "#,
        )
        .bind(photo.user_id)
        .bind(&photo.title)
        .bind(&photo.description)
        .bind(&photo.image_url)
        .bind(&photo.thumbnail_url)
        .bind(&photo.storage_key)
        .bind(&photo.thumbnail_key)
        .bind(&photo.theme)
        .bind(photo.confidence)
        .bind(photo.quality_score)
        .bind(analyzed_at)
        .bind(photo.competition_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_photo(&self, id: i64) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    pub async fn get_photo_with_owner(&self, id: i64) -> Result<Option<PhotoWithOwner>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query.push(" WHERE p.id = ").push_bind(id);
        let photo = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    /// Approved photos visible on public listings.
    pub async fn list_approved_photos(
        &self,
        filter: &PhotoFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM photos p WHERE p.approval_status = 'approved'",
        );
        push_photo_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query.push(" WHERE p.approval_status = 'approved'");
        push_photo_filter(&mut query, filter);
        push_order(&mut query, filter.sort, filter.descending);
        query
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let photos = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok((photos, total))
    }

    /// Photos of any status, for owners and admins.
    ///
    /// `search` matches title or description. Newest first.
    pub async fn list_photos_by_status(
        &self,
        user_id: Option<i64>,
        status: Option<ApprovalStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        fn push_filters<'a>(
            builder: &mut QueryBuilder<'a, Sqlite>,
            user_id: Option<i64>,
            status: Option<ApprovalStatus>,
            search: Option<&str>,
        ) {
            if let Some(user_id) = user_id {
                builder.push(" AND p.user_id = ").push_bind(user_id);
            }
            if let Some(status) = status {
                builder
                    .push(" AND p.approval_status = ")
                    .push_bind(status.as_str());
            }
            if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
                let pattern = like_pattern(search);
                builder
                    .push(" AND (p.title LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.description LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM photos p WHERE 1 = 1");
        push_filters(&mut count_query, user_id, status, search);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query.push(" WHERE 1 = 1");
        push_filters(&mut query, user_id, status, search);
        push_order(&mut query, PhotoSort::UploadedAt, true);
        query
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let photos = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok((photos, total))
    }

    /// Pending photos, oldest first.
    pub async fn list_pending_photos(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PhotoWithOwner>, i64), AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE approval_status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query.push(" WHERE p.approval_status = 'pending'");
        push_order(&mut query, PhotoSort::UploadedAt, false);
        query
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let photos = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok((photos, total))
    }

    pub async fn update_photo_details(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as::<_, Photo>(
            r#"
            UPDATE photos
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }

    pub async fn update_photo_analysis(
        &self,
        id: i64,
        theme: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<Option<Photo>, AppError> {
        let now = Utc::now();
        let photo = sqlx::query_as::<_, Photo>(
            r#"
            UPDATE photos
            SET theme = COALESCE(?, theme),
                confidence = COALESCE(?, confidence),
                analyzed_at = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(theme)
        .bind(confidence)
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }

    /// Delete a photo and its interactions.
    pub async fn delete_photo(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM interactions WHERE photo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    /// Move a pending photo to `approved` or `rejected`.
    ///
    /// # Returns
    /// The reviewed photo, or `None` when it was not pending (or missing).
    pub async fn review_photo(
        &self,
        id: i64,
        decision: ApprovalStatus,
        reviewer_id: i64,
        notes: Option<&str>,
    ) -> Result<Option<Photo>, AppError> {
        let now = Utc::now();
        let photo = sqlx::query_as::<_, Photo>(
            r#"
            UPDATE photos
            SET approval_status = ?, approved_by = ?, approved_at = ?,
                approval_notes = ?, updated_at = ?
            WHERE id = ? AND approval_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(decision.as_str())
        .bind(reviewer_id)
        .bind(now)
        .bind(notes)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }

    pub async fn count_uploads_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE user_id = ? AND uploaded_at >= ?")
                .bind(user_id)
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn count_competition_submissions(
        &self,
        user_id: i64,
        competition_id: i64,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM photos WHERE user_id = ? AND competition_id = ?",
        )
        .bind(user_id)
        .bind(competition_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Attach an existing photo to a competition.
    pub async fn set_photo_competition(
        &self,
        photo_id: i64,
        competition_id: i64,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE photos SET competition_id = ?, updated_at = ?
            WHERE id = ? AND competition_id IS NULL
            "#,
        )
        .bind(competition_id)
        .bind(Utc::now())
        .bind(photo_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Distinct themes among approved photos, sorted by name.
    pub async fn approved_themes(&self) -> Result<Vec<String>, AppError> {
        let themes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT theme FROM photos
            WHERE approval_status = 'approved' AND theme IS NOT NULL AND theme != ''
            ORDER BY theme
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(themes)
    }

    // =========================================================================
    // Engagement
    // =========================================================================

    /// Apply counter deltas and recompute heat in one statement.
    ///
    /// Counters are floored at zero.
    pub async fn apply_counter_delta(
        &self,
        photo_id: i64,
        delta: CounterDelta,
        weights: &HeatWeights,
    ) -> Result<bool, AppError> {
        Self::apply_counter_delta_on(&self.pool, photo_id, delta, weights).await
    }

    async fn apply_counter_delta_on<'e, E>(
        executor: E,
        photo_id: i64,
        delta: CounterDelta,
        weights: &HeatWeights,
    ) -> Result<bool, AppError>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE photos
            SET views = MAX(views + ?1, 0),
                likes = MAX(likes + ?2, 0),
                favorites = MAX(favorites + ?3, 0),
                votes = MAX(votes + ?4, 0),
                heat_score = MAX(likes + ?2, 0) * ?5
                    + MAX(views + ?1, 0) * ?6
                    + MAX(favorites + ?3, 0) * ?7
                    + MAX(votes + ?4, 0) * ?8
            WHERE id = ?9
            "#,
        )
        .bind(delta.views)
        .bind(delta.likes)
        .bind(delta.favorites)
        .bind(delta.votes)
        .bind(weights.like)
        .bind(weights.view)
        .bind(weights.favorite)
        .bind(weights.vote)
        .bind(photo_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Flip a like/favorite/vote for a user.
    ///
    /// # Returns
    /// `true` when the interaction is now present, `false` when it was removed.
    pub async fn toggle_interaction(
        &self,
        user_id: i64,
        photo_id: i64,
        kind: InteractionKind,
        weights: &HeatWeights,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM interactions WHERE user_id = ? AND photo_id = ? AND type = ?",
        )
        .bind(user_id)
        .bind(photo_id)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let active = if removed > 0 {
            Self::apply_counter_delta_on(
                &mut *tx,
                photo_id,
                CounterDelta::single(kind, -1),
                weights,
            )
            .await?;
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO interactions (user_id, photo_id, type, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(photo_id)
            .bind(kind.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
            Self::apply_counter_delta_on(
                &mut *tx,
                photo_id,
                CounterDelta::single(kind, 1),
                weights,
            )
            .await?;
            true
        };

        tx.commit().await?;
        Ok(active)
    }

    /// Count a view, logging an interaction row for signed-in viewers.
    pub async fn record_view(
        &self,
        photo_id: i64,
        viewer_id: Option<i64>,
        weights: &HeatWeights,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = Self::apply_counter_delta_on(
            &mut *tx,
            photo_id,
            CounterDelta::single(InteractionKind::View, 1),
            weights,
        )
        .await?;

        if updated {
            if let Some(viewer_id) = viewer_id {
                sqlx::query(
                    r#"
                    INSERT INTO interactions (user_id, photo_id, type, created_at)
                    VALUES (?, ?, 'view', ?)
                    "#,
                )
                .bind(viewer_id)
                .bind(photo_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn viewer_flags(&self, user_id: i64, photo_id: i64) -> Result<ViewerFlags, AppError> {
        let kinds: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT type FROM interactions
            WHERE user_id = ? AND photo_id = ? AND type != 'view'
            "#,
        )
        .bind(user_id)
        .bind(photo_id)
        .fetch_all(&self.pool)
        .await?;

        let mut flags = ViewerFlags::default();
        for kind in kinds {
            match kind.as_str() {
                "like" => flags.liked = true,
                "favorite" => flags.favorited = true,
                "vote" => flags.voted = true,
                _ => {}
            }
        }
        Ok(flags)
    }

    /// Recompute `heat_score` for every photo.
    pub async fn recalculate_all_heat(&self, weights: &HeatWeights) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE photos
            SET heat_score = likes * ? + views * ? + favorites * ? + votes * ?
            "#,
        )
        .bind(weights.like)
        .bind(weights.view)
        .bind(weights.favorite)
        .bind(weights.vote)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Rankings
    // =========================================================================

    /// Approved photos ordered by `heat_score DESC, id ASC`.
    pub async fn photo_rankings(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<PhotoRankingRow>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT p.id, p.title, p.image_url, p.thumbnail_url, p.theme,
                   p.likes, p.views, p.favorites, p.votes, p.heat_score,
                   u.id AS user_id, u.username, u.avatar_url
            FROM photos p
            JOIN users u ON u.id = p.user_id
            WHERE p.approval_status = 'approved'
            "#,
        );
        push_window(&mut query, since);
        query
            .push(" ORDER BY p.heat_score DESC, p.id ASC LIMIT ")
            .push_bind(limit);
        let rows = query
            .build_query_as::<PhotoRankingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Owners of approved photos ordered by summed heat, then id.
    pub async fn photographer_rankings(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<PhotographerRankingRow>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT u.id, u.username, u.avatar_url,
                   COUNT(p.id) AS photos_count,
                   COALESCE(SUM(p.likes), 0) AS total_likes,
                   CAST(COALESCE(SUM(p.heat_score), 0) AS REAL) AS total_heat,
                   CAST(COALESCE(AVG(p.heat_score), 0) AS REAL) AS avg_heat
            FROM users u
            JOIN photos p ON p.user_id = u.id
            WHERE u.role IN ('photographer', 'student')
              AND u.is_active = 1
              AND p.approval_status = 'approved'
            "#,
        );
        push_window(&mut query, since);
        query
            .push(" GROUP BY u.id ORDER BY total_heat DESC, u.id ASC LIMIT ")
            .push_bind(limit);
        let rows = query
            .build_query_as::<PhotographerRankingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Theme frequencies of approved photos for the given owners.
    pub async fn user_theme_counts(
        &self,
        user_ids: &[i64],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<UserThemeCount>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT p.user_id, p.theme, COUNT(*) AS count
            FROM photos p
            WHERE p.approval_status = 'approved' AND p.theme IS NOT NULL AND p.theme != ''
            "#,
        );
        push_window(&mut query, since);
        query.push(" AND p.user_id IN (");
        let mut separated = query.separated(", ");
        for user_id in user_ids {
            separated.push_bind(*user_id);
        }
        separated.push_unseparated(")");
        query.push(" GROUP BY p.user_id, p.theme");
        let rows = query
            .build_query_as::<UserThemeCount>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// (ranked photos, distinct owners) within a window.
    pub async fn ranking_totals(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<(i64, i64), AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT COUNT(p.id), COUNT(DISTINCT p.user_id)
            FROM photos p
            WHERE p.approval_status = 'approved'
            "#,
        );
        push_window(&mut query, since);
        let totals: (i64, i64) = query.build_query_as().fetch_one(&self.pool).await?;

        Ok(totals)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    pub async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, AppError> {
        let created = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                student_id, photographer_id, title, description, preferred_time,
                location, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
            RETURNING *
            "#,
        )
        .bind(appointment.student_id)
        .bind(appointment.photographer_id)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(appointment.preferred_time)
        .bind(&appointment.location)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_appointment(&self, id: i64) -> Result<Option<Appointment>, AppError> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(appointment)
    }

    /// Appointments visible in `scope`, newest first.
    pub async fn list_appointments(
        &self,
        scope: AppointmentScope,
        status: Option<AppointmentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Appointment>, i64), AppError> {
        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM appointments WHERE 1 = 1");
        push_appointment_scope(&mut count_query, scope);
        if let Some(status) = status {
            count_query.push(" AND status = ").push_bind(status.as_str());
        }
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM appointments WHERE 1 = 1");
        push_appointment_scope(&mut query, scope);
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let appointments = query
            .build_query_as::<Appointment>()
            .fetch_all(&self.pool)
            .await?;

        Ok((appointments, total))
    }

    /// Whether the photographer already holds an open booking at `at`.
    pub async fn photographer_slot_taken(
        &self,
        photographer_id: i64,
        at: DateTime<Utc>,
        except_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE photographer_id = ? AND preferred_time = ?
              AND status IN ('pending', 'accepted') AND id != ?
            "#,
        )
        .bind(photographer_id)
        .bind(at)
        .bind(except_id.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Open bookings of a photographer with `preferred_time` in `[start, end)`.
    pub async fn count_open_bookings_between(
        &self,
        photographer_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE photographer_id = ? AND preferred_time >= ? AND preferred_time < ?
              AND status IN ('pending', 'accepted')
            "#,
        )
        .bind(photographer_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Move an appointment from `from` to `to`.
    ///
    /// `notes` and `actual_time` are written only when given.
    ///
    /// # Returns
    /// The updated appointment, or `None` when it was no longer in `from`.
    pub async fn transition_appointment(
        &self,
        id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
        notes: Option<&str>,
        actual_time: Option<DateTime<Utc>>,
    ) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = ?,
                notes = COALESCE(?, notes),
                actual_time = COALESCE(?, actual_time),
                updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING *
            "#,
        )
        .bind(to.as_str())
        .bind(notes)
        .bind(actual_time)
        .bind(Utc::now())
        .bind(id)
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    /// Record the student's rating exactly once on a completed appointment.
    pub async fn rate_appointment(
        &self,
        id: i64,
        rating: i64,
        review: Option<&str>,
    ) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET rating = ?, review = ?, updated_at = ?
            WHERE id = ? AND status = 'completed' AND rating IS NULL
            RETURNING *
            "#,
        )
        .bind(rating)
        .bind(review)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    pub async fn update_appointment(
        &self,
        id: i64,
        changes: &AppointmentChanges,
    ) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                preferred_time = COALESCE(?, preferred_time),
                actual_time = COALESCE(?, actual_time),
                location = COALESCE(?, location),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.preferred_time)
        .bind(changes.actual_time)
        .bind(&changes.location)
        .bind(&changes.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    /// Non-cancelled, non-rejected bookings in `[start, end)`, ordered by time.
    pub async fn photographer_schedule(
        &self,
        photographer_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE photographer_id = ? AND preferred_time >= ? AND preferred_time < ?
              AND status IN ('pending', 'accepted', 'completed')
            ORDER BY preferred_time ASC, id ASC
            "#,
        )
        .bind(photographer_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    pub async fn appointment_status_counts(
        &self,
        scope: AppointmentScope,
    ) -> Result<Vec<StatusCount>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT status, COUNT(*) AS count FROM appointments WHERE 1 = 1",
        );
        push_appointment_scope(&mut query, scope);
        query.push(" GROUP BY status");
        let counts = query
            .build_query_as::<StatusCount>()
            .fetch_all(&self.pool)
            .await?;

        Ok(counts)
    }

    /// (average rating, number of ratings) received by a photographer.
    pub async fn photographer_rating(
        &self,
        photographer_id: i64,
    ) -> Result<(Option<f64>, i64), AppError> {
        let row: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT CAST(AVG(rating) AS REAL), COUNT(rating)
            FROM appointments
            WHERE photographer_id = ? AND rating IS NOT NULL
            "#,
        )
        .bind(photographer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    // =========================================================================
    // Competitions
    // =========================================================================

    pub async fn insert_competition(
        &self,
        fields: &CompetitionFields,
    ) -> Result<Competition, AppError> {
        let competition = sqlx::query_as::<_, Competition>(
            r#"
            INSERT INTO competitions (
                name, description, theme, start_time, end_time, voting_end_time,
                status, rules, prizes, max_submissions, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.theme)
        .bind(fields.start_time)
        .bind(fields.end_time)
        .bind(fields.voting_end_time)
        .bind(fields.rules.as_ref().map(|v| v.to_string()))
        .bind(fields.prizes.as_ref().map(|v| v.to_string()))
        .bind(fields.max_submissions)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(competition)
    }

    pub async fn get_competition(&self, id: i64) -> Result<Option<Competition>, AppError> {
        let competition =
            sqlx::query_as::<_, Competition>("SELECT * FROM competitions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(competition)
    }

    pub async fn list_competitions(
        &self,
        status: Option<CompetitionStatus>,
        theme: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Competition>, i64), AppError> {
        fn push_filters<'a>(
            builder: &mut QueryBuilder<'a, Sqlite>,
            status: Option<CompetitionStatus>,
            theme: Option<&str>,
        ) {
            if let Some(status) = status {
                builder.push(" AND status = ").push_bind(status.as_str());
            }
            if let Some(theme) = theme {
                builder.push(" AND theme = ").push_bind(theme.to_string());
            }
        }

        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM competitions WHERE 1 = 1");
        push_filters(&mut count_query, status, theme);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM competitions WHERE 1 = 1");
        push_filters(&mut query, status, theme);
        query
            .push(" ORDER BY start_time DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let competitions = query
            .build_query_as::<Competition>()
            .fetch_all(&self.pool)
            .await?;

        Ok((competitions, total))
    }

    /// Competitions accepting submissions or votes at `now`.
    pub async fn list_running_competitions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Competition>, AppError> {
        let competitions = sqlx::query_as::<_, Competition>(
            r#"
            SELECT * FROM competitions
            WHERE status IN ('active', 'voting') AND start_time <= ? AND end_time >= ?
            ORDER BY end_time ASC, id ASC
            "#,
        )
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(competitions)
    }

    pub async fn update_competition(
        &self,
        id: i64,
        fields: &CompetitionFields,
    ) -> Result<Option<Competition>, AppError> {
        let competition = sqlx::query_as::<_, Competition>(
            r#"
            UPDATE competitions
            SET name = ?, description = ?, theme = ?, start_time = ?, end_time = ?,
                voting_end_time = ?, rules = ?, prizes = ?, max_submissions = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.theme)
        .bind(fields.start_time)
        .bind(fields.end_time)
        .bind(fields.voting_end_time)
        .bind(fields.rules.as_ref().map(|v| v.to_string()))
        .bind(fields.prizes.as_ref().map(|v| v.to_string()))
        .bind(fields.max_submissions)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(competition)
    }

    pub async fn delete_competition(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM competitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Move a competition to `to` when its current status is one of `from`.
    pub async fn transition_competition(
        &self,
        id: i64,
        from: &[CompetitionStatus],
        to: CompetitionStatus,
    ) -> Result<Option<Competition>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE competitions SET status = ");
        query
            .push_bind(to.as_str())
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND status IN (");
        let mut separated = query.separated(", ");
        for status in from {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(") RETURNING *");
        let competition = query
            .build_query_as::<Competition>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(competition)
    }

    /// (attached photos, distinct participants) of a competition.
    pub async fn competition_totals(&self, id: i64) -> Result<(i64, i64), AppError> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM photos WHERE competition_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Approved entries ranked by `votes + likes * 0.5`, ties by id.
    pub async fn competition_leaderboard(
        &self,
        id: i64,
        limit: i64,
    ) -> Result<Vec<LeaderboardRow>, AppError> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT p.id, p.title, p.image_url, p.thumbnail_url, p.likes, p.votes, p.views,
                   CAST(p.votes + p.likes * 0.5 AS REAL) AS score,
                   u.id AS user_id, u.username, u.avatar_url
            FROM photos p
            JOIN users u ON u.id = p.user_id
            WHERE p.competition_id = ? AND p.approval_status = 'approved'
            ORDER BY score DESC, p.id ASC
            LIMIT ?
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Configurations
    // =========================================================================

    pub async fn list_configurations(&self) -> Result<Vec<ConfigurationRow>, AppError> {
        let rows = sqlx::query_as::<_, ConfigurationRow>(
            "SELECT * FROM configurations ORDER BY category, key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_configuration(&self, key: &str) -> Result<Option<ConfigurationRow>, AppError> {
        let row =
            sqlx::query_as::<_, ConfigurationRow>("SELECT * FROM configurations WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    /// Seed a configuration entry; existing keys are left untouched.
    ///
    /// # Returns
    /// `true` if inserted.
    pub async fn insert_configuration_if_absent(
        &self,
        key: &str,
        value: &serde_json::Value,
        description: &str,
        category: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO configurations (key, value, description, category, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .bind(description)
        .bind(category)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_configuration_value(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE configurations SET value = ?, updated_at = ? WHERE key = ?")
                .bind(value.to_string())
                .bind(Utc::now())
                .bind(key)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // System logs
    // =========================================================================

    pub async fn insert_system_log(&self, log: &NewSystemLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO system_logs
                (user_id, action, resource_type, resource_id, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.user_id)
        .bind(&log.action)
        .bind(&log.resource_type)
        .bind(log.resource_id)
        .bind(log.details.as_ref().map(|v| v.to_string()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Audit entries, newest first.
    pub async fn list_system_logs(
        &self,
        action: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SystemLog>, i64), AppError> {
        let mut count_query =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM system_logs WHERE 1 = 1");
        if let Some(action) = action {
            count_query.push(" AND action = ").push_bind(action.to_string());
        }
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM system_logs WHERE 1 = 1");
        if let Some(action) = action {
            query.push(" AND action = ").push_bind(action.to_string());
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let logs = query
            .build_query_as::<SystemLog>()
            .fetch_all(&self.pool)
            .await?;

        Ok((logs, total))
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    pub async fn approval_counts(
        &self,
        today_start: DateTime<Utc>,
    ) -> Result<ApprovalCounts, AppError> {
        let counts = sqlx::query_as::<_, ApprovalCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM photos WHERE approval_status = 'pending') AS pending,
                (SELECT COUNT(*) FROM photos WHERE approval_status = 'approved') AS approved,
                (SELECT COUNT(*) FROM photos WHERE approval_status = 'rejected') AS rejected,
                (SELECT COUNT(*) FROM photos
                    WHERE approval_status = 'approved' AND approved_at >= ?) AS today_approved,
                (SELECT COUNT(*) FROM photos
                    WHERE approval_status = 'rejected' AND approved_at >= ?) AS today_rejected
            "#,
        )
        .bind(today_start)
        .bind(today_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    pub async fn dashboard_counts(
        &self,
        month_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DashboardCounts, AppError> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM photos) AS total_photos,
                (SELECT COUNT(*) FROM competitions) AS total_competitions,
                (SELECT COUNT(*) FROM appointments) AS total_appointments,
                (SELECT COUNT(*) FROM competitions
                    WHERE status IN ('active', 'voting') AND start_time <= ? AND end_time >= ?)
                    AS active_competitions,
                (SELECT COUNT(*) FROM photos WHERE uploaded_at >= ?) AS photos_this_month,
                (SELECT COUNT(*) FROM users WHERE created_at >= ?) AS users_this_month
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(month_start)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    pub async fn analysis_counts(&self) -> Result<AnalysisCounts, AppError> {
        let counts = sqlx::query_as::<_, AnalysisCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM photos) AS total_photos,
                (SELECT COUNT(*) FROM photos WHERE analyzed_at IS NOT NULL) AS analyzed_photos,
                (SELECT COUNT(*) FROM photos
                    WHERE analyzed_at IS NOT NULL AND confidence >= 0.8) AS confident_photos,
                (SELECT CAST(AVG(quality_score) AS REAL) FROM photos
                    WHERE quality_score IS NOT NULL) AS average_quality,
                (SELECT COUNT(*) FROM photos WHERE quality_score >= 0.8) AS high_quality_count,
                (SELECT COUNT(*) FROM photos
                    WHERE quality_score >= 0.5 AND quality_score < 0.8) AS medium_quality_count,
                (SELECT COUNT(*) FROM photos WHERE quality_score < 0.5) AS low_quality_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Photo count per theme, most frequent first.
    pub async fn theme_distribution(&self) -> Result<Vec<ThemeCount>, AppError> {
        let rows = sqlx::query_as::<_, ThemeCount>(
            r#"
            SELECT theme, COUNT(*) AS count FROM photos
            WHERE theme IS NOT NULL AND theme != ''
            GROUP BY theme
            ORDER BY count DESC, theme ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn recent_analyses(&self, limit: i64) -> Result<Vec<AnalysisRow>, AppError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, title, theme, confidence, quality_score, analyzed_at FROM photos
            WHERE analyzed_at IS NOT NULL
            ORDER BY analyzed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Approved photos by `heat_score DESC, id ASC`, optionally of one theme.
    pub async fn hot_photos(
        &self,
        since: Option<DateTime<Utc>>,
        theme: Option<&str>,
        limit: i64,
    ) -> Result<Vec<PhotoWithOwner>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query.push(" WHERE p.approval_status = 'approved'");
        push_window(&mut query, since);
        if let Some(theme) = theme {
            query.push(" AND p.theme = ").push_bind(theme.to_string());
        }
        query
            .push(" ORDER BY p.heat_score DESC, p.id ASC LIMIT ")
            .push_bind(limit);
        let photos = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok(photos)
    }

    /// Approved entries of a competition by votes, likes, favorites, then id.
    pub async fn competition_standings(
        &self,
        competition_id: i64,
        limit: i64,
    ) -> Result<Vec<PhotoWithOwner>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(PHOTO_WITH_OWNER_SELECT);
        query
            .push(" WHERE p.approval_status = 'approved' AND p.competition_id = ")
            .push_bind(competition_id)
            .push(" ORDER BY p.votes DESC, p.likes DESC, p.favorites DESC, p.id ASC LIMIT ")
            .push_bind(limit);
        let photos = query
            .build_query_as::<PhotoWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok(photos)
    }

    pub async fn user_photo_totals(&self, user_id: i64) -> Result<UserPhotoTotals, AppError> {
        let totals = sqlx::query_as::<_, UserPhotoTotals>(
            r#"
            SELECT
                COUNT(*) AS total_photos,
                COALESCE(SUM(approval_status = 'approved'), 0) AS approved_photos,
                COALESCE(SUM(CASE WHEN approval_status = 'approved' THEN likes END), 0)
                    AS total_likes,
                COALESCE(SUM(CASE WHEN approval_status = 'approved' THEN favorites END), 0)
                    AS total_favorites,
                COALESCE(SUM(CASE WHEN approval_status = 'approved' THEN views END), 0)
                    AS total_views
            FROM photos
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Theme counts over one owner's approved photos, most frequent first.
    pub async fn user_theme_distribution(&self, user_id: i64) -> Result<Vec<ThemeCount>, AppError> {
        let rows = sqlx::query_as::<_, ThemeCount>(
            r#"
            SELECT theme, COUNT(*) AS count FROM photos
            WHERE user_id = ? AND approval_status = 'approved'
              AND theme IS NOT NULL AND theme != ''
            GROUP BY theme
            ORDER BY count DESC, theme ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// An owner's approved photos by `likes + favorites DESC, id ASC`.
    pub async fn popular_user_photos(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Photo>, AppError> {
        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT * FROM photos
            WHERE user_id = ? AND approval_status = 'approved'
            ORDER BY likes + favorites DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    /// Uploads of any status per UTC day, oldest day first.
    pub async fn daily_uploads(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, AppError> {
        let rows = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT substr(uploaded_at, 1, 10) AS day, COUNT(*) AS count
            FROM photos
            WHERE user_id = ? AND uploaded_at >= ?
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Approved photos by like, favorite and vote rows created since `since`.
    ///
    /// Photos without such rows are left out.
    pub async fn trending_photos(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TrendingRow>, AppError> {
        let rows = sqlx::query_as::<_, TrendingRow>(
            r#"
            SELECT p.*, u.username AS owner_username, u.avatar_url AS owner_avatar_url,
                   r.recent_count
            FROM photos p
            JOIN users u ON u.id = p.user_id
            JOIN (
                SELECT photo_id, COUNT(*) AS recent_count FROM interactions
                WHERE created_at >= ? AND type IN ('like', 'favorite', 'vote')
                GROUP BY photo_id
            ) r ON r.photo_id = p.id
            WHERE p.approval_status = 'approved'
            ORDER BY r.recent_count DESC, p.id ASC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn interaction_kind_counts(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<KindCount>, AppError> {
        let rows = sqlx::query_as::<_, KindCount>(
            r#"
            SELECT type AS kind, COUNT(*) AS count FROM interactions
            WHERE created_at >= ?
            GROUP BY type
            ORDER BY type ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn interaction_daily_counts(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyKindCount>, AppError> {
        let rows = sqlx::query_as::<_, DailyKindCount>(
            r#"
            SELECT substr(created_at, 1, 10) AS day, type AS kind, COUNT(*) AS count
            FROM interactions
            WHERE created_at >= ?
            GROUP BY day, type
            ORDER BY day ASC, type ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Users with the most interaction rows since `since`, ties by id.
    pub async fn most_active_users(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ActiveUserCount>, AppError> {
        let rows = sqlx::query_as::<_, ActiveUserCount>(
            r#"
            SELECT user_id, COUNT(*) AS interaction_count FROM interactions
            WHERE created_at >= ?
            GROUP BY user_id
            ORDER BY interaction_count DESC, user_id ASC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Per-theme uploads and engagement of approved photos.
    pub async fn theme_engagement(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ThemeEngagementRow>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT p.theme AS theme, COUNT(*) AS upload_count,
                   COALESCE(SUM(p.likes + p.favorites + p.votes), 0) AS total_interactions,
                   CAST(COALESCE(AVG(p.likes + p.favorites + p.votes), 0) AS REAL)
                       AS avg_interactions
            FROM photos p
            WHERE p.approval_status = 'approved' AND p.theme IS NOT NULL AND p.theme != ''
            "#,
        );
        push_window(&mut query, since);
        query.push(" GROUP BY p.theme");
        let rows = query
            .build_query_as::<ThemeEngagementRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// (average rating, number of ratings) over appointments in scope.
    pub async fn appointment_rating_totals(
        &self,
        scope: AppointmentScope,
    ) -> Result<(Option<f64>, i64), AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT CAST(AVG(rating) AS REAL), COUNT(rating)
            FROM appointments
            WHERE rating IS NOT NULL
            "#,
        );
        push_appointment_scope(&mut query, scope);
        let row: (Option<f64>, i64) = query.build_query_as().fetch_one(&self.pool).await?;

        Ok(row)
    }

    /// Appointments created per calendar month, newest month first.
    pub async fn monthly_appointments(
        &self,
        scope: AppointmentScope,
        months: i64,
    ) -> Result<Vec<MonthlyCount>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT CAST(substr(created_at, 1, 4) AS INTEGER) AS year,
                   CAST(substr(created_at, 6, 2) AS INTEGER) AS month,
                   COUNT(*) AS count
            FROM appointments
            WHERE 1 = 1
            "#,
        );
        push_appointment_scope(&mut query, scope);
        query
            .push(" GROUP BY year, month ORDER BY year DESC, month DESC LIMIT ")
            .push_bind(months);
        let rows = query
            .build_query_as::<MonthlyCount>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Backdate a photo's upload time. Test-only helper for ranking windows.
    #[cfg(test)]
    pub async fn set_photo_uploaded_at_for_test(
        &self,
        id: i64,
        uploaded_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE photos SET uploaded_at = ? WHERE id = ?")
            .bind(uploaded_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
