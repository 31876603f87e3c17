use thiserror::Error;

/// Errors from the template expander (C1).
///
/// Parse errors abort the run (`InvalidTemplate`); expansion errors
/// terminate only the issuing worker (see `error::AppError` call sites).
#[derive(Debug, Error, Clone)]
pub enum TemplateError {
    #[error("Unterminated '{{{{' in template at byte {pos}.")]
    UnterminatedExpression { pos: usize },
    #[error("Empty expression '{{{{}}}}' in template.")]
    EmptyExpression,
    #[error("Unterminated argument list in '{{{{{name}}}}}'.")]
    UnterminatedArgs { name: String },
    #[error("Unknown template function '{name}'.")]
    UnknownFunction { name: String },
    #[error("Function '{name}' expects {expected} argument(s), got {got}.")]
    ArgCountMismatch {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("Function '{name}' received an invalid argument: {reason}.")]
    InvalidArgument { name: String, reason: String },
    #[error("Function '{name}' failed: {reason}.")]
    FunctionFailed { name: String, reason: String },
}
