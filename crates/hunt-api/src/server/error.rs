#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidArgument, message, None),
        }
    }

    fn from_hunt(err: HuntError) -> Self {
        match err {
            HuntError::NotFound(what) => Self {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(ErrorCode::NotFound, what, None),
            },
            HuntError::InvalidState(detail) => Self {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new(ErrorCode::InvalidState, detail, None),
            },
            HuntError::Forbidden(detail) => Self {
                status: StatusCode::FORBIDDEN,
                error: ApiError::new(ErrorCode::Forbidden, detail, None),
            },
            HuntError::InvalidArgument(detail) => Self {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new(ErrorCode::InvalidArgument, detail, None),
            },
            HuntError::InsufficientPool {
                requested,
                available,
            } => Self {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new(
                    ErrorCode::InsufficientPool,
                    "not enough unused challenges in the city pool",
                    Some(format!("requested={requested} available={available}")),
                ),
            },
            other @ (HuntError::Catalog(_) | HuntError::Store(_)) => {
                warn!(error = %other, "request failed internally");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: ApiError::new(
                        ErrorCode::InternalError,
                        "operation failed",
                        Some(other.to_string()),
                    ),
                }
            }
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
