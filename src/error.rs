/// Kinds of error raised by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    ScalarOutOfRange,
    PointNotOnCurve,
    TransactionAlreadySigned,
    TransactionUnsigned,
    UnknownCriterion,
    PayloadInvalid,
    IntegrityMismatch,
    MinerState,
    WorkerState,
    Transport,
    Config,
    Other,
}


/// Shortcut for converting boolean check into error.
#[macro_export]
macro_rules! validate {
    ($check:expr, $kind:ident) => (
        if $check {
            Ok::<(), $crate::error::Error>(())
        } else {
            Err($crate::error::ErrorKind::$kind.into())
        }
    );
    ($check:expr, $kind:ident, $($arg:tt)+) => (
        if $check {
            Ok::<(), $crate::error::Error>(())
        } else {
            Err($crate::error::Error::new(
                $crate::error::ErrorKind::$kind, format!($($arg)+)
            ))
        }
    );
}


/// Error structure of the core. It supports converting into
/// `std::io::Error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}


impl Error {
    /// Create a new error instance.
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    /// Error about a malformed field of an inbound payload.
    pub fn payload(field: &str, reason: &str) -> Self {
        Self::new(ErrorKind::PayloadInvalid, format!("{}: {}", field, reason))
    }

    /// Get kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind.clone()
    }
}


impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        let message = format!("{:?}", kind);
        Error::new(kind, message)
    }
}


impl From<Error> for std::io::Error {
    fn from(error: Error) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, error.to_string())
    }
}


impl From<ErrorKind> for std::io::Error {
    fn from(kind: ErrorKind) -> std::io::Error {
        let error = Error::from(kind);
        error.into()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let err = Error::new(
            ErrorKind::IntegrityMismatch,
            "reported 00ab, recomputed 00cd".to_string()
        );

        assert_eq!(err.kind(), ErrorKind::IntegrityMismatch);
        assert_eq!(err.to_string(), "reported 00ab, recomputed 00cd");
    }

    #[test]
    fn test_payload() {
        let err = Error::payload("data[1].amount", "expected an integer");
        assert_eq!(err.kind(), ErrorKind::PayloadInvalid);
        assert_eq!(err.to_string(), "data[1].amount: expected an integer");
    }

    #[test]
    fn test_err_to_std() {
        let err = Error::new(
            ErrorKind::Transport,
            "connection refused".to_string()
        );

        let err_std: std::io::Error = err.into();

        assert_eq!(err_std.kind(), std::io::ErrorKind::Other);
        assert_eq!(err_std.to_string(), "connection refused");
    }

    #[test]
    fn test_kind_to_err() {
        let kind = ErrorKind::UnknownCriterion;
        let err: Error = kind.into();
        assert_eq!(err.kind(), ErrorKind::UnknownCriterion);
        assert_eq!(err.to_string(), "UnknownCriterion");
    }

    #[test]
    fn test_validate() {
        let ok = validate!(1 + 1 == 2, Config);
        assert!(ok.is_ok());

        let err = validate!(false, Config, "interval must be {}", "positive")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "interval must be positive");
    }
}
