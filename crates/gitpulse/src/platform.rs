//! Platform-agnostic seam between the harvesting engine and a source-control
//! server.
//!
//! The engine is generic over [`PlatformClient`]; the GitLab client is the
//! production implementation and tests use scripted fakes.
//!
//! # Example
//!
//! ```ignore
//! use gitpulse::platform::PlatformClient;
//!
//! async fn print_first_branches<C: PlatformClient>(client: &C, id: u64) -> Result<(), PlatformError> {
//!     for branch in client.list_branches_page(id, 1, 100).await? {
//!         println!("{branch}");
//!     }
//!     Ok(())
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, GITLAB_DEFAULT_RPS};
pub use types::{CommitDetail, CommitSummary, PlatformClient, Project, ProjectSummary, UserInfo};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_api() {
        let err = PlatformError::api(502, "Bad Gateway");
        assert!(err.to_string().contains("API error (502)"));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_platform_error_not_found() {
        let err = PlatformError::not_found("project 42");
        assert!(err.to_string().contains("Not found"));
        assert!(err.to_string().contains("project 42"));
    }

    #[test]
    fn test_platform_error_auth_required() {
        let err = PlatformError::AuthRequired;
        assert!(err.to_string().contains("Authentication required"));
    }

    #[test]
    fn test_transient_errors() {
        assert!(PlatformError::network("connection refused").is_transient());
        assert!(PlatformError::timeout("30s elapsed").is_transient());
        assert!(
            PlatformError::RateLimited {
                message: "slow down".to_string()
            }
            .is_transient()
        );
        assert!(PlatformError::api(500, "Internal Server Error").is_transient());
        assert!(PlatformError::api(503, "Service Unavailable").is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!PlatformError::AuthRequired.is_transient());
        assert!(!PlatformError::not_found("project 1").is_transient());
        assert!(!PlatformError::api(400, "Bad Request").is_transient());
        assert!(!PlatformError::internal("bad json").is_transient());
    }

    #[test]
    fn test_platform_error_is_rate_limited() {
        let rate_limited = PlatformError::RateLimited {
            message: "429".to_string(),
        };
        assert!(rate_limited.is_rate_limited());
        assert!(!PlatformError::api(500, "boom").is_rate_limited());
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = PlatformError::api(500, "first line\nsecond line");
        assert_eq!(short_error_message(&err), "API error (500): first line");
    }

    #[test]
    fn test_commit_summary_is_merge() {
        let mut summary = CommitSummary {
            id: "abc".to_string(),
            parent_ids: None,
            committed_date: None,
        };
        assert!(!summary.is_merge());

        summary.parent_ids = Some(vec!["p1".to_string()]);
        assert!(!summary.is_merge());

        summary.parent_ids = Some(vec!["p1".to_string(), "p2".to_string()]);
        assert!(summary.is_merge());
    }
}
