//! Why a relay or extraction run stopped, and how that maps to an exit status

use std::process::ExitCode;

use thiserror::Error;

/// Broad failure class reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    CaptureUnavailable,
    DeliveryRejected,
    UserCancelled,
    EndOfStream,
    UpstreamSignal,
}

/// Terminal condition of a driving loop. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopReason {
    #[error("capture source reached end of stream")]
    EndOfStream,
    #[error("capture failure: {0}")]
    CaptureFailure(String),
    #[error("stop requested by user")]
    UserRequested,
    #[error("failed to allocate {len} byte transfer buffer")]
    AllocationFailure { len: usize },
    #[error("delivery failure: {0}")]
    DeliveryFailure(String),
    #[error("pipeline error: {0}")]
    Upstream(String),
}

impl StopReason {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StopReason::EndOfStream => ErrorCategory::EndOfStream,
            StopReason::CaptureFailure(_) => ErrorCategory::CaptureUnavailable,
            StopReason::UserRequested => ErrorCategory::UserCancelled,
            StopReason::AllocationFailure { .. } | StopReason::DeliveryFailure(_) => {
                ErrorCategory::DeliveryRejected
            }
            StopReason::Upstream(_) => ErrorCategory::UpstreamSignal,
        }
    }

    /// Clean stops exit zero
    pub fn is_clean(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::EndOfStream | ErrorCategory::UserCancelled
        )
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_clean() {
            ExitCode::SUCCESS
        } else {
            failure_exit_code()
        }
    }
}

/// `-1` as seen by the parent process
pub fn failure_exit_code() -> ExitCode {
    ExitCode::from(255)
}
