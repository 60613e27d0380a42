use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Blink count for an uploaded clip
#[derive(Debug, Serialize, Deserialize)]
pub struct BlinkCountResponse {
    pub count: u32,
}

/// Count blinks in a multipart upload.
///
/// Reads the part named `video`; if there is none, the first part is used.
pub async fn count_blinks(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Json<BlinkCountResponse>> {
    let mut multipart = multipart?;
    let video = read_video_part(&mut multipart).await?;
    let size = video.len();

    let count =
        facegate::count_blinks_in_video(state.blink.clone(), video, &state.config.blink).await?;

    tracing::info!(bytes = size, count, "blinks counted");
    Ok(Json(BlinkCountResponse { count }))
}

async fn read_video_part(multipart: &mut Multipart) -> ServerResult<Vec<u8>> {
    let mut first = None;
    while let Some(field) = multipart.next_field().await? {
        let is_video = field.name() == Some("video");
        if !is_video && first.is_some() {
            continue;
        }
        let bytes = field.bytes().await?;
        if is_video {
            return Ok(bytes.to_vec());
        }
        first = Some(bytes.to_vec());
    }
    first.ok_or_else(|| ServerError::BadRequest("a video file part is required".to_string()))
}
