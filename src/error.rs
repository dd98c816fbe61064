//! Crate-wide error type.
//!
//! Errors carry the process exit code the `frag` binary should return:
//!
//! - `2`: configuration / input error (bad shapes, missing parameters, invalid dataset)
//! - `3`: insufficient data for the requested computation
//! - `4`: fatal numerical failure (singular effective stiffness, non-finite system)
//!
//! Recoverable numerical trouble (Newton-Raphson non-convergence, a failed
//! likelihood fit) is *not* an error; it is reported as a
//! [`Diagnostic`](crate::domain::Diagnostic) on the result instead.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Configuration / input error (exit code 2).
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Not enough usable data (exit code 3).
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Fatal numerical failure (exit code 4).
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
