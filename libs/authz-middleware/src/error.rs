use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use authz_client::ClientError;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, AuthzError>;

/// Outcome of an authorization check other than "allowed"
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Setup mistake: every missing field is listed
    #[error("missing options: {}", .0.join(", "))]
    MissingOptions(Vec<&'static str>),

    /// The evaluation call itself failed
    #[error("authorization call failed: {0}")]
    Transport(#[from] ClientError),

    /// The authorizer answered without the requested decision
    #[error("authorizer returned no decisions")]
    NoDecision,

    /// The policy denied the request
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid field path '{0}'")]
    InvalidFieldPath(String),
}

impl AuthzError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthzError::Unauthorized)
    }

    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            AuthzError::Unauthorized => Status::new(Code::PermissionDenied, "unauthorized"),
            AuthzError::Transport(err) if err.is_deadline() => {
                Status::new(Code::DeadlineExceeded, self.to_string())
            }
            AuthzError::NoDecision => Status::new(Code::Internal, self.to_string()),
            AuthzError::MissingOptions(_)
            | AuthzError::Transport(_)
            | AuthzError::InvalidFieldPath(_) => Status::new(Code::Internal, self.to_string()),
        }
    }

    /// HTTP response with an explicit status for denials
    pub fn http_response(&self, deny_status: StatusCode) -> HttpResponse {
        let status = if self.is_unauthorized() {
            deny_status
        } else {
            self.status_code()
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

impl From<AuthzError> for Status {
    fn from(err: AuthzError) -> Self {
        err.to_status()
    }
}

impl ResponseError for AuthzError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthzError::MissingOptions(_)
            | AuthzError::Transport(_)
            | AuthzError::NoDecision
            | AuthzError::InvalidFieldPath(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.http_response(StatusCode::UNAUTHORIZED)
    }
}
