//! Matcher builder functions for common event types.
//!
//! ```rust,ignore
//! use parley_framework::{on_message, on_notice, on_keyword};
//!
//! on_message().handler(log_handler).register(&registry);
//! on_notice().handler(notice_handler).register(&registry);
//! on_keyword(["hello", "hi"]).handler(greet).register(&registry);
//! ```

use regex::Regex;

use parley_core::EventType;

use crate::matcher::Matcher;
use crate::rule::Rule;

/// Creates a matcher for events of `event_type`.
pub fn on(event_type: EventType) -> Matcher {
    Matcher::new().event_type(event_type)
}

/// Creates a matcher that only handles message events.
pub fn on_message() -> Matcher {
    on(EventType::Message).name("message")
}

/// Creates a matcher that only handles notice events.
pub fn on_notice() -> Matcher {
    on(EventType::Notice).name("notice")
}

/// Creates a matcher that only handles request events.
pub fn on_request() -> Matcher {
    on(EventType::Request).name("request")
}

/// Creates a matcher that only handles meta events.
pub fn on_meta() -> Matcher {
    on(EventType::Meta).name("meta")
}

/// Messages containing any of `keywords`.
pub fn on_keyword<S: Into<String>>(keywords: impl IntoIterator<Item = S>) -> Matcher {
    on_message().name("keyword").rule(Rule::keyword(keywords))
}

/// Messages starting with any of `prefixes`.
pub fn on_startswith<S: Into<String>>(prefixes: impl IntoIterator<Item = S>) -> Matcher {
    on_message()
        .name("startswith")
        .rule(Rule::starts_with(prefixes))
}

/// Messages whose text matches `re`.
pub fn on_regex(re: Regex) -> Matcher {
    on_message().name("regex").rule(Rule::regex(re))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_type_filter() {
        assert_eq!(on_message().build().type_filter(), Some(EventType::Message));
        assert_eq!(on_notice().build().type_filter(), Some(EventType::Notice));
        assert_eq!(on_request().build().type_filter(), Some(EventType::Request));
        assert_eq!(on_meta().build().type_filter(), Some(EventType::Meta));
        assert_eq!(on_keyword(["x"]).build().name(), Some("keyword"));
    }
}
