// region:    --- Imports
use crate::auction::model::AuctionStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

// endregion: --- Imports

// region:    --- Market Error
/// 마켓 전체에서 사용하는 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("{0}")]
    Validation(String),

    #[error("입찰 금액은 현재 입찰가 {current}보다 높아야 합니다.")]
    BidTooLow { current: i64 },

    #[error("입찰이 불가능한 경매 상태입니다: {0}")]
    AuctionNotActive(AuctionStatus),

    #[error("모든 약관에 동의해야 진행할 수 있습니다.")]
    TermsNotAccepted,

    #[error("로그인이 필요합니다.")]
    Unauthenticated,

    #[error("권한이 없습니다.")]
    Forbidden,

    #[error("찾을 수 없습니다: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("입찰 반영 확인 시간이 초과되었습니다.")]
    EchoTimeout,

    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),

    #[error("메시지 브로커 오류: {0}")]
    Broker(String),

    #[error("직렬화 오류: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("저장소 데이터 오류: {0}")]
    Corrupt(String),
}

pub type MarketResult<T> = Result<T, MarketError>;

impl MarketError {
    /// 클라이언트에게 전달되는 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::Validation(_) => "VALIDATION",
            MarketError::BidTooLow { .. } => "LOW_BID",
            MarketError::AuctionNotActive(_) => "NOT_ACTIVE",
            MarketError::TermsNotAccepted => "TERMS_NOT_ACCEPTED",
            MarketError::Unauthenticated => "UNAUTHENTICATED",
            MarketError::Forbidden => "FORBIDDEN",
            MarketError::NotFound(_) => "NOT_FOUND",
            MarketError::Conflict(_) => "CONFLICT",
            MarketError::EchoTimeout => "ECHO_TIMEOUT",
            MarketError::Database(_)
            | MarketError::Broker(_)
            | MarketError::Serialization(_)
            | MarketError::Corrupt(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MarketError::Validation(_)
            | MarketError::BidTooLow { .. }
            | MarketError::AuctionNotActive(_)
            | MarketError::TermsNotAccepted => StatusCode::BAD_REQUEST,
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketError::Forbidden => StatusCode::FORBIDDEN,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Conflict(_) => StatusCode::CONFLICT,
            MarketError::EchoTimeout => StatusCode::GATEWAY_TIMEOUT,
            MarketError::Database(_)
            | MarketError::Broker(_)
            | MarketError::Serialization(_)
            | MarketError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // 백엔드 오류는 로그로 남기고 일반 메시지로 응답
            error!("{:<12} --> 백엔드 작업 실패: {:?}", "Error", self);
            serde_json::json!({
                "error": "요청을 처리하지 못했습니다. 잠시 후 다시 시도해 주세요.",
                "code": self.code(),
            })
        } else {
            let mut body = serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            });
            if let MarketError::BidTooLow { current } = &self {
                body["current_bid"] = serde_json::json!(current);
            }
            body
        };
        (status, Json(body)).into_response()
    }
}
// endregion: --- Market Error
