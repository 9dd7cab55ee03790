//! Runtime error types for the tracing interpreter.
//!
//! Every variant carries enough context to produce the Python-flavored
//! message the visualizer shows to students. Resource-governor trips live
//! here too: they unwind the run exactly like any other runtime failure and
//! are only classified differently at the run boundary.

/// Runtime errors produced while executing a traced program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("NameError: name '{name}' is not defined (line {line})")]
    NameError { name: String, line: u32 },

    #[error("TypeError: {message} (line {line})")]
    TypeError { message: String, line: u32 },

    #[error("ValueError: {message} (line {line})")]
    ValueError { message: String, line: u32 },

    #[error("ZeroDivisionError: division by zero (line {line})")]
    ZeroDivision { line: u32 },

    #[error("IndexError: index {index} out of range for length {len} (line {line})")]
    IndexError { index: i64, len: usize, line: u32 },

    #[error("OverflowError: integer result too large (line {line})")]
    Overflow { line: u32 },

    #[error("TypeError: '{type_name}' object is not callable (line {line})")]
    NotCallable { type_name: String, line: u32 },

    #[error("TypeError: {name}() takes {expected} arguments but {got} were given (line {line})")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        line: u32,
    },

    #[error("RecursionError: maximum call depth ({limit}) exceeded (line {line})")]
    RecursionLimit { limit: usize, line: u32 },

    #[error("step limit exceeded: more than {limit} traced events")]
    StepLimitExceeded { limit: u64 },

    #[error("time limit exceeded: ran longer than {millis} ms")]
    TimeLimitExceeded { millis: u64 },
}

impl RuntimeError {
    /// True for governor trips, which the run boundary reports as
    /// `ResourceExceeded` rather than a plain runtime failure.
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            RuntimeError::StepLimitExceeded { .. } | RuntimeError::TimeLimitExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_division_message_is_python_flavored() {
        let msg = RuntimeError::ZeroDivision { line: 2 }.to_string();
        assert!(msg.contains("division by zero"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn governor_errors_are_resource_limits() {
        assert!(RuntimeError::StepLimitExceeded { limit: 10 }.is_resource_limit());
        assert!(RuntimeError::TimeLimitExceeded { millis: 5000 }.is_resource_limit());
        assert!(!RuntimeError::ZeroDivision { line: 1 }.is_resource_limit());
    }
}
