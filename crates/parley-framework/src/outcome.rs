//! Handler outcomes.
//!
//! A handler tells the executor what happens next by returning an
//! [`Outcome`]. Handlers may also return `()` (same as
//! [`Outcome::Continue`]) or a `Result` whose error aborts the chain.

/// What the executor does after a handler returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Run the next handler.
    #[default]
    Continue,
    /// This handler declined the event; run the next one.
    Skip,
    /// Re-run this handler with the next event from the same session.
    ///
    /// The prompt, if any, is sent before the conversation suspends.
    Reject(Option<String>),
    /// Run the next handler with the next event from the same session.
    Pause(Option<String>),
    /// End the conversation. Remaining handlers are discarded.
    Finish(Option<String>),
    /// Keep lower-priority groups from seeing this event, then continue
    /// with the next handler.
    Block,
}

impl Outcome {
    /// Re-asks with `prompt`.
    pub fn reject(prompt: impl Into<String>) -> Self {
        Outcome::Reject(Some(prompt.into()))
    }

    /// Waits for the next event after sending `prompt`.
    pub fn pause(prompt: impl Into<String>) -> Self {
        Outcome::Pause(Some(prompt.into()))
    }

    /// Ends the conversation after sending `message`.
    pub fn finish(message: impl Into<String>) -> Self {
        Outcome::Finish(Some(message.into()))
    }
}

/// Result type every handler is normalized to.
pub type HandlerResult = Result<Outcome, anyhow::Error>;

/// Conversion from handler return values into a [`HandlerResult`].
pub trait IntoOutcome {
    fn into_outcome(self) -> HandlerResult;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Continue)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> HandlerResult {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> HandlerResult {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_outcome_conversions() {
        assert_eq!(().into_outcome().unwrap(), Outcome::Continue);
        assert_eq!(
            Outcome::pause("more").into_outcome().unwrap(),
            Outcome::Pause(Some("more".into()))
        );

        let ok: Result<Outcome, std::io::Error> = Ok(Outcome::Block);
        assert_eq!(ok.into_outcome().unwrap(), Outcome::Block);

        let err: Result<(), anyhow::Error> = Err(anyhow::anyhow!("boom"));
        assert_eq!(err.into_outcome().unwrap_err().to_string(), "boom");
    }
}
