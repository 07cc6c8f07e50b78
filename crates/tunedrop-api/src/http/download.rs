//! Download handlers streaming finished artifacts to the caller.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use tunedrop_fsops::content_disposition;

use crate::http::body::WorkspaceStream;
use crate::http::errors::ApiError;
use crate::orchestrator::Artifact;
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DownloadQuery {
    pub(crate) url: Option<String>,
}

pub(crate) async fn download_single(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let artifact = state.orchestrator.single(query.url.as_deref()).await?;
    artifact_response(artifact).await
}

pub(crate) async fn download_collection(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let artifact = state.orchestrator.collection(query.url.as_deref()).await?;
    artifact_response(artifact).await
}

async fn artifact_response(artifact: Artifact) -> Result<Response, ApiError> {
    let Artifact {
        workspace,
        path,
        file_name,
        content_type,
    } = artifact;

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(err) => {
            error!(workspace = %workspace.id(), error = %err, "failed to open artifact");
            workspace.release();
            return Err(ApiError::internal("failed to open download"));
        }
    };
    let length = file.metadata().await.ok().map(|meta| meta.len());
    info!(workspace = %workspace.id(), file = %file_name, bytes = ?length, "streaming artifact");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, content_disposition(&file_name));
    if let Some(length) = length {
        builder = builder.header(CONTENT_LENGTH, length);
    }

    let stream = WorkspaceStream::new(ReaderStream::new(file), workspace);
    builder.body(Body::from_stream(stream)).map_err(|err| {
        error!(error = %err, "failed to build download response");
        ApiError::internal("failed to build download response")
    })
}
