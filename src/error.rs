use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// 面向入口调用方的错误分类。
///
/// partner 侧的错误细节只进遥测，不透传给入口调用方。
#[derive(Debug, Error)]
pub enum SspError {
    /// 缺失或无法解析的 placement/site/publisher 标识、畸形 JSON
    #[error("bad request: {0}")]
    BadRequest(String),
    /// 目录查询未命中
    #[error("not found: {0}")]
    NotFound(String),
    /// 竞价无可接纳出价（热路径常态，不高于 debug 级别记录）
    #[error("no bid")]
    NoBid,
    /// 一个或多个 partner 出错/超时；只要有 partner 应答就不影响竞价
    #[error("partner failure: {0}")]
    PartnerFailure(String),
    /// builder / schain 校验失败、目录存储故障
    #[error("internal: {0}")]
    Internal(String),
}

impl IntoResponse for SspError {
    fn into_response(self) -> Response {
        match self {
            SspError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            // 广告端点上 not-found 与 no-bid 同样表现为无填充
            SspError::NotFound(_) | SspError::NoBid | SspError::PartnerFailure(_) => {
                StatusCode::NO_CONTENT.into_response()
            }
            SspError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}
