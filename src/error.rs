use thiserror::Error;

/// Misuse of the local API, reported to the immediate caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("the provided '{name}' entry has the type of '{kind}', but only a method may be exposed")]
    NotAMethod { name: String, kind: &'static str },

    #[error("the server does not expose a method named '{0}'")]
    UnknownMethod(String),
}
