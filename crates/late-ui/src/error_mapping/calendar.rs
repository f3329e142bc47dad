use crate::services::calendar_service::CalendarError;
use late_core::{AppError, NetworkError};

impl From<CalendarError> for AppError {
    fn from(e: CalendarError) -> Self {
        match e {
            CalendarError::Network(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
            CalendarError::Auth(s) | CalendarError::NotFound(s) => AppError::Calendar(s),
            CalendarError::RateLimited(secs) => AppError::Network(NetworkError::RateLimited(secs)),
            CalendarError::NotInitialized => {
                AppError::Other(anyhow::anyhow!("Calendar service not initialized"))
            }
        }
    }
}
