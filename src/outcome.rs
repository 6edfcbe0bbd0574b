use std::fmt::Display;

/// How a wrapped callback reports failure.
///
/// `()` never fails. `Result` fails on `Err`, described by its `Display`.
pub trait Outcome {
    fn failure(&self) -> Option<String>;
}

impl Outcome for () {
    fn failure(&self) -> Option<String> {
        None
    }
}

impl<T, E: Display> Outcome for Result<T, E> {
    fn failure(&self) -> Option<String> {
        self.as_ref().err().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_never_fails() {
        assert_eq!(().failure(), None);
    }

    #[test]
    fn test_result_failure() {
        let ok: Result<u32, String> = Ok(1);
        let err: Result<u32, String> = Err("boom".to_string());
        assert_eq!(ok.failure(), None);
        assert_eq!(err.failure(), Some("boom".to_string()));
    }
}
