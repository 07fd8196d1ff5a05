//! Message Routes
//!
//! Endpoints for feeding text into the sliding window.
//!
//! - POST /api/v1/messages - Single message
//! - POST /api/v1/messages/batch - Batch of messages

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{
    BatchError, BatchMessageRequest, BatchMessageResponse, MessageRequest, MessageResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::{ApiConfig, AppState};
use crate::window::IngestStatus;

/// POST /api/v1/messages
///
/// Ingest a single message.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    validate_message(&state.config, &req)?;

    let timestamp = req.timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
    let outcome = state.aggregator.ingest(&req.content, timestamp);

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            status: outcome.status,
            timestamp,
            aligned_secs: outcome.aligned_secs,
            counted: outcome.counted,
        }),
    ))
}

/// POST /api/v1/messages/batch
///
/// Ingest several messages in order.
pub async fn post_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchMessageRequest>,
) -> ApiResult<(StatusCode, Json<BatchMessageResponse>)> {
    if req.messages.is_empty() {
        return Err(ApiError::Validation("Empty batch".to_string()));
    }

    if req.messages.len() > state.config.max_batch {
        return Err(ApiError::Validation(format!(
            "Batch size exceeds maximum of {} messages",
            state.config.max_batch
        )));
    }

    let mut response = BatchMessageResponse {
        status: "ok".to_string(),
        accepted: 0,
        empty: 0,
        dropped_late: 0,
        counted: 0,
        errors: Vec::new(),
    };

    for (index, message) in req.messages.into_iter().enumerate() {
        if let Err(e) = validate_message(&state.config, &message) {
            response.errors.push(BatchError {
                index,
                error: e.to_string(),
            });
            continue;
        }

        let timestamp = message
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let outcome = state.aggregator.ingest(&message.content, timestamp);
        match outcome.status {
            IngestStatus::Applied => response.accepted += 1,
            IngestStatus::Empty => response.empty += 1,
            IngestStatus::DroppedLate => response.dropped_late += 1,
        }
        response.counted += outcome.counted;
    }

    let processed = response.accepted + response.empty + response.dropped_late;
    let status = if response.errors.is_empty() {
        StatusCode::ACCEPTED
    } else if processed > 0 {
        response.status = "partial".to_string();
        StatusCode::MULTI_STATUS
    } else {
        response.status = "rejected".to_string();
        StatusCode::BAD_REQUEST
    };

    tracing::debug!(
        accepted = response.accepted,
        dropped_late = response.dropped_late,
        rejected = response.errors.len(),
        "Ingested batch"
    );

    Ok((status, Json(response)))
}

/// Validate a message request
fn validate_message(config: &ApiConfig, req: &MessageRequest) -> ApiResult<()> {
    if req.content.len() > config.max_content_len {
        return Err(ApiError::Validation(format!(
            "Content exceeds maximum length of {} bytes",
            config.max_content_len
        )));
    }

    if let Some(ts) = req.timestamp {
        if ts < 0 {
            return Err(ApiError::Validation(
                "Timestamp must not be negative".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message_valid() {
        let req = MessageRequest {
            content: "rust release today".to_string(),
            timestamp: Some(1_700_000_000_000),
        };
        assert!(validate_message(&ApiConfig::default(), &req).is_ok());
    }

    #[test]
    fn test_validate_message_empty_content_allowed() {
        let req = MessageRequest {
            content: String::new(),
            timestamp: None,
        };
        assert!(validate_message(&ApiConfig::default(), &req).is_ok());
    }

    #[test]
    fn test_validate_message_too_long() {
        let config = ApiConfig {
            max_content_len: 8,
            ..Default::default()
        };
        let req = MessageRequest {
            content: "far too long for this".to_string(),
            timestamp: None,
        };
        assert!(validate_message(&config, &req).is_err());
    }

    #[test]
    fn test_validate_message_negative_timestamp() {
        let req = MessageRequest {
            content: "rust".to_string(),
            timestamp: Some(-1),
        };
        assert!(validate_message(&ApiConfig::default(), &req).is_err());
    }
}
