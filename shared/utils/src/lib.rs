pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.forwarding.retry.max_attempts, 3);
    }

    #[test]
    fn test_error_status_mapping() {
        let error = ReportError::authentication("bad key");
        assert_eq!(error.error_code(), "AUTHENTICATION_ERROR");
        assert_eq!(error.http_status_code(), 401);

        let error = ReportError::extraction("Date not found in PDF");
        assert_eq!(error.http_status_code(), 422);

        let error = ReportError::forwarding("endpoint unreachable", 3);
        assert_eq!(error.http_status_code(), 502);
    }
}
