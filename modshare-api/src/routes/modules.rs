/// Module endpoints
///
/// - `POST /api/modules` - Upload a module (multipart, login required)
/// - `GET /api/modules` - List all modules
/// - `GET /api/modules/:id` - Module detail with images and rating summary
/// - `GET /api/modules/:id/download` - Stream the module archive

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::form::MultipartForm,
};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use modshare_shared::{
    auth::middleware::AuthContext,
    models::{
        image::{Image, MAX_IMAGES_PER_MODULE},
        module::{CreateModule, Module},
        review::Review,
    },
    storage::{classify, extension_of, sanitize_file_name, FileKind, StoredFile},
};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio_util::io::ReaderStream;

const ARCHIVE_FIELD: &str = "file";
const IMAGES_FIELD: &str = "images";

/// Module creation response
#[derive(Debug, Serialize)]
pub struct CreateModuleResponse {
    pub message: String,
    pub id: i64,
}

/// Module detail
#[derive(Debug, Serialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: Module,

    /// Image reference paths in upload order
    pub images: Vec<String>,

    /// Mean rating, `null` without reviews
    pub average_rating: Option<f64>,

    pub review_count: i64,
}

/// Upload a module
///
/// # Endpoint
///
/// ```text
/// POST /api/modules
/// Content-Type: multipart/form-data
///
/// title=<text>              (required)
/// description=<text>        (required)
/// long_description=<text>   (optional)
/// file=<.zip>               (required, exactly one)
/// images=<.png|.jpg|.jpeg>  (optional, up to four)
/// ```
///
/// Every check runs before anything is written. Files are stored first and
/// the module row plus its image rows are inserted in one transaction; if
/// that fails the stored files are removed again.
///
/// # Response
///
/// ```json
/// { "message": "Module uploaded", "id": 7 }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not logged in
/// - `400 Bad Request`: Too many files, disallowed file type, or missing
///   title / description / archive
pub async fn create_module(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<CreateModuleResponse>> {
    let form = MultipartForm::read(multipart).await?;

    form.ensure_max_files(ARCHIVE_FIELD, 1)?;
    form.ensure_max_files(IMAGES_FIELD, MAX_IMAGES_PER_MODULE)?;
    form.ensure_allowed_types()?;

    let images = form.files(IMAGES_FIELD);
    for image in images {
        if image.kind()? != FileKind::Image {
            return Err(ApiError::BadRequest(
                "Images must be .png, .jpg or .jpeg files".to_string(),
            ));
        }
    }

    let (Some(title), Some(description), Some(archive)) = (
        form.non_blank("title"),
        form.non_blank("description"),
        form.files(ARCHIVE_FIELD).first(),
    ) else {
        return Err(ApiError::BadRequest(
            "Title, description, and .zip file required".to_string(),
        ));
    };

    if archive.kind()? != FileKind::Archive {
        return Err(ApiError::BadRequest(
            "Title, description, and .zip file required".to_string(),
        ));
    }

    let mut stored: Vec<StoredFile> = Vec::with_capacity(1 + images.len());
    for upload in std::iter::once(archive).chain(images) {
        match state.uploads.store(upload).await {
            Ok(file) => stored.push(file),
            Err(e) => {
                state.uploads.discard(&stored).await;
                return Err(e.into());
            }
        }
    }

    let data = CreateModule {
        title,
        description,
        long_description: form.non_blank("long_description"),
        author: auth.username.clone(),
        file_path: stored[0].reference.clone(),
        user_id: auth.user_id,
    };

    let module = match insert_module(&state.db, data, &stored[1..]).await {
        Ok(module) => module,
        Err(e) => {
            state.uploads.discard(&stored).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        module_id = module.id,
        user_id = auth.user_id,
        images = stored.len() - 1,
        "Module uploaded"
    );

    Ok(Json(CreateModuleResponse {
        message: "Module uploaded".to_string(),
        id: module.id,
    }))
}

/// Inserts a module and its images atomically
async fn insert_module(
    pool: &SqlitePool,
    data: CreateModule,
    images: &[StoredFile],
) -> Result<Module, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let module = Module::create(&mut *tx, data).await?;
    for image in images {
        Image::create(&mut *tx, module.id, &image.reference).await?;
    }

    tx.commit().await?;
    Ok(module)
}

/// List all modules
///
/// # Endpoint
///
/// ```text
/// GET /api/modules
/// ```
///
/// Returns every module ordered by ID (upload order). No pagination.
pub async fn list_modules(State(state): State<AppState>) -> ApiResult<Json<Vec<Module>>> {
    let modules = Module::list_all(&state.db).await?;
    Ok(Json(modules))
}

/// Module detail
///
/// # Endpoint
///
/// ```text
/// GET /api/modules/:id
/// ```
///
/// # Response
///
/// ```json
/// {
///   "id": 7,
///   "title": "Dungeon",
///   "description": "short",
///   "long_description": null,
///   "author": "alice",
///   "file_path": "/uploads/1700000000000-1a2b3c4d-d.zip",
///   "user_id": 1,
///   "created_at": "2025-01-01T00:00:00Z",
///   "images": [],
///   "average_rating": null,
///   "review_count": 0
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Module not found
pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ModuleDetail>> {
    let module = Module::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Module not found".to_string()))?;

    let images = Image::paths_by_module(&state.db, id).await?;
    let summary = Review::rating_summary(&state.db, id).await?;

    Ok(Json(ModuleDetail {
        module,
        images,
        average_rating: summary.average,
        review_count: summary.count,
    }))
}

/// Download a module archive
///
/// # Endpoint
///
/// ```text
/// GET /api/modules/:id/download
/// ```
///
/// The stored reference is validated as a string before the filesystem is
/// touched; the file is then streamed as an attachment.
///
/// # Errors
///
/// - `404 Not Found`: Module not found, or file not found on server
/// - `400 Bad Request`: Invalid file path
pub async fn download_module(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reference = Module::file_path_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Module not found".to_string()))?;

    let path = state.uploads.locate(&reference).await.map_err(|e| {
        tracing::warn!(module_id = id, reference = %reference, error = %e, "Download refused");
        ApiError::from(e)
    })?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to open {}: {}", path.display(), e)))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();

    let stored_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("module.zip");
    let download_name = sanitize_file_name(display_name(stored_name));

    let content_type = extension_of(&download_name)
        .and_then(|ext| classify(&download_name).ok().map(|kind| kind.content_type(&ext)))
        .unwrap_or("application/octet-stream");

    tracing::debug!(module_id = id, bytes = length, "Streaming module download");

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

/// Client-facing name of a stored file: the original name without the
/// `<millis>-<nonce>-` prefix
fn display_name(stored_name: &str) -> &str {
    let mut parts = stored_name.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(millis), Some(nonce), Some(rest))
            if !rest.is_empty()
                && millis.chars().all(|c| c.is_ascii_digit())
                && nonce.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            rest
        }
        _ => stored_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_stored_prefix() {
        assert_eq!(display_name("1700000000000-1a2b3c4d-d.zip"), "d.zip");
        assert_eq!(
            display_name("1700000000000-1a2b3c4d-my-mod.zip"),
            "my-mod.zip"
        );
    }

    #[test]
    fn test_display_name_keeps_foreign_names() {
        assert_eq!(display_name("d.zip"), "d.zip");
        assert_eq!(display_name("my-cool-mod.zip"), "my-cool-mod.zip");
        assert_eq!(display_name("123-xyz-d.zip"), "123-xyz-d.zip");
    }
}
