//! Multipart intake: photo parts are streamed straight into the uploads
//! directory before the service sees the request.

use axum::{
    extract::{multipart::Field, FromRequest, Multipart, Request},
    http::header,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::RegisterFields,
    store::FileStore,
    AppState,
};

use super::FormOrJson;

const PHOTO_FIELD: &str = "photo";

/// Text fields plus the stored name of the uploaded photo, if any.
#[derive(Debug, Default)]
pub struct PhotoForm {
    pub inventory_name: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

/// Read a registration or photo-replacement request. Multipart bodies may
/// carry a photo; JSON and urlencoded bodies only carry text fields.
pub async fn read_form(state: &AppState, req: Request) -> AppResult<PhotoForm> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

    if !is_multipart {
        let FormOrJson(fields) = FormOrJson::<RegisterFields>::from_request(req, state).await?;
        return Ok(PhotoForm {
            inventory_name: fields.inventory_name,
            description: fields.description,
            photo: None,
        });
    }

    let multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    let store = state.service.store();
    let mut form = PhotoForm::default();
    match read_multipart(store, multipart, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            // Don't leave a half-read request's photo behind.
            if let Some(photo) = form.photo.take() {
                store.remove_photo(&photo).await?;
            }
            Err(e)
        }
    }
}

async fn read_multipart(
    store: &FileStore,
    mut multipart: Multipart,
    form: &mut PhotoForm,
) -> AppResult<()> {
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("inventory_name") => form.inventory_name = Some(field.text().await?),
            Some("description") => form.description = Some(field.text().await?),
            Some(PHOTO_FIELD) if form.photo.is_none() => {
                let original = field.file_name().unwrap_or_default().to_string();
                // Browsers send an empty, unnamed part when no file was chosen.
                if original.is_empty() {
                    continue;
                }
                save_field(store, field, &original, form).await?;
            }
            _ => {}
        }
    }
    Ok(())
}

async fn save_field(
    store: &FileStore,
    mut field: Field<'_>,
    original: &str,
    form: &mut PhotoForm,
) -> AppResult<()> {
    let (name, mut file) = store.create_upload(original).await?;
    form.photo = Some(name.clone());

    let path = store.uploads_dir().join(&name);
    let io_err = |source| crate::store::StoreError::Io {
        path: path.clone(),
        source,
    };

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len();
    }
    file.flush().await.map_err(io_err)?;

    debug!(photo = %name, original, bytes = written, "Stored upload");
    Ok(())
}
