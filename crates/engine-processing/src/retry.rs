use connectors::error::FetchError;
use engine_core::retry::RetryDisposition;

pub fn classify_fetch_error(err: &FetchError) -> RetryDisposition {
    match err {
        FetchError::Transient { .. } => RetryDisposition::Retry,
        FetchError::Status { .. } => RetryDisposition::Stop,
        FetchError::Decode { .. } => RetryDisposition::Stop,
        FetchError::Config(_) => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retried() {
        let transient = FetchError::Transient {
            url: "u".into(),
            reason: "503".into(),
        };
        let status = FetchError::Status {
            url: "u".into(),
            status: 400,
        };
        let decode = FetchError::Decode {
            url: "u".into(),
            reason: "eof".into(),
        };

        assert_eq!(classify_fetch_error(&transient), RetryDisposition::Retry);
        assert_eq!(classify_fetch_error(&status), RetryDisposition::Stop);
        assert_eq!(classify_fetch_error(&decode), RetryDisposition::Stop);
    }
}
