/// Controller-level errors
///
/// Every variant is recoverable: the controller turns them into an error banner,
/// a log line, or an error notification, and stays interactive.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short message suitable for a banner or toast
    pub fn user_message(&self) -> String {
        match self {
            AppError::HttpClient(e) if e.is_connect() => {
                "Could not reach the recommendation service".to_string()
            }
            AppError::HttpClient(e) if e.is_decode() => {
                "Received an unexpected response from the service".to_string()
            }
            AppError::HttpClient(_) => "Network error".to_string(),
            AppError::InvalidInput(msg) | AppError::ExternalApi(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_through_api_errors() {
        let err = AppError::ExternalApi("search returned status 500".to_string());
        assert_eq!(err.user_message(), "search returned status 500");
        assert_eq!(
            err.to_string(),
            "External API error: search returned status 500"
        );
    }

    #[test]
    fn test_invalid_input_display() {
        let err = AppError::InvalidInput("user id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: user id is empty");
    }
}
