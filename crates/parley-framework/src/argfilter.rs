//! Filters applied to text captured by got points.
//!
//! Filters run in order on the captured plain text. Each one may rewrite the
//! text or fail with a [`ValidateError`], in which case the point asks again
//! and keeps owning the next event.

use std::sync::Arc;

use regex::Regex;

use crate::error::{CommandError, ValidateError};

/// A single text filter.
pub type ArgFilter = Arc<dyn Fn(String) -> Result<String, ValidateError> + Send + Sync>;

/// Wraps a closure as an [`ArgFilter`].
pub fn filter<F>(f: F) -> ArgFilter
where
    F: Fn(String) -> Result<String, ValidateError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs `filters` over `text` in order.
pub fn run_filters(filters: &[ArgFilter], text: String) -> Result<String, ValidateError> {
    filters.iter().try_fold(text, |text, f| f(text))
}

fn failure(message: Option<&str>) -> ValidateError {
    match message {
        Some(message) => ValidateError::new(message),
        None => ValidateError::default_prompt(),
    }
}

/// Trims surrounding whitespace.
pub fn stripped() -> ArgFilter {
    filter(|text| Ok(text.trim().to_string()))
}

/// Rejects text that is empty after trimming.
pub fn not_empty(message: Option<&str>) -> ArgFilter {
    let message = message.map(str::to_string);
    filter(move |text| {
        if text.trim().is_empty() {
            Err(failure(message.as_deref()))
        } else {
            Ok(text)
        }
    })
}

/// Rejects text whose character count falls outside `min..=max`.
pub fn fit_size(min: usize, max: usize, message: Option<&str>) -> ArgFilter {
    let message = message.map(str::to_string);
    filter(move |text| {
        let len = text.chars().count();
        if (min..=max).contains(&len) {
            Ok(text)
        } else {
            Err(failure(message.as_deref()))
        }
    })
}

/// Rejects text that does not match `pattern` anywhere.
pub fn match_regex(pattern: &str, message: Option<&str>) -> Result<ArgFilter, CommandError> {
    let re = Regex::new(pattern).map_err(|err| CommandError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })?;
    let message = message.map(str::to_string);
    Ok(filter(move |text| {
        if re.is_match(&text) {
            Ok(text)
        } else {
            Err(failure(message.as_deref()))
        }
    }))
}

/// Requires a base-10 integer and normalizes it (`" 007"` becomes `"7"`).
pub fn ensure_int(message: Option<&str>) -> ArgFilter {
    let message = message.map(str::to_string);
    filter(move |text| {
        text.trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| failure(message.as_deref()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_chain_in_order() {
        let filters = vec![stripped(), not_empty(Some("say something")), ensure_int(None)];

        assert_eq!(run_filters(&filters, "  42 ".into()), Ok("42".into()));
        assert_eq!(
            run_filters(&filters, "   ".into()),
            Err(ValidateError::new("say something"))
        );
        assert_eq!(
            run_filters(&filters, "abc".into()),
            Err(ValidateError::default_prompt())
        );
    }

    #[test]
    fn test_fit_size_counts_chars() {
        let f = fit_size(1, 3, Some("1 to 3 characters"));
        assert!(f("日本語".into()).is_ok());
        assert!(f("日本語だ".into()).is_err());
        assert!(f(String::new()).is_err());
    }

    #[test]
    fn test_match_regex() {
        let f = match_regex(r"^\d{4}-\d{2}-\d{2}$", Some("use YYYY-MM-DD")).unwrap();
        assert!(f("2024-01-31".into()).is_ok());
        assert_eq!(
            f("tomorrow".into()),
            Err(ValidateError::new("use YYYY-MM-DD"))
        );
        assert!(match_regex("(", None).is_err());
    }
}
