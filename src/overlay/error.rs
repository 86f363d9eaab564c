use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },

    #[error("failed to allocate {bytes} bytes for a {width}x{height} surface")]
    Allocation { width: i32, height: i32, bytes: usize },

    #[error("presentation surface failed: {0}")]
    Presentation(String),

    #[error("overlay backend is not available on this platform")]
    Unsupported,

    #[error("no overlay session is active")]
    NotActive,
}

impl OverlayError {
    /// Reason code reported across the host boundary.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSize { .. } | Self::Allocation { .. } | Self::Presentation(_) => {
                "CREATE_FAILED"
            }
            Self::Unsupported => "NOT_WINDOWS",
            Self::NotActive => "NOT_ACTIVE",
        }
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::OverlayError;

    #[test]
    fn resource_failures_share_create_failed_reason() {
        assert_eq!(
            OverlayError::InvalidSize {
                width: 0,
                height: 10
            }
            .reason(),
            "CREATE_FAILED"
        );
        assert_eq!(
            OverlayError::Presentation("lost device".into()).reason(),
            "CREATE_FAILED"
        );
        assert_eq!(OverlayError::Unsupported.reason(), "NOT_WINDOWS");
    }

    #[test]
    fn display_includes_dimensions() {
        let err = OverlayError::InvalidSize {
            width: -4,
            height: 2,
        };
        assert_eq!(err.to_string(), "invalid surface size -4x2");
    }
}
