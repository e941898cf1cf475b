/// An error that can occur while building or querying a [`crate::DependencyManager`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `add` was called twice for the same provider name.
    #[error("duplicate provider {name:?}: a provider named {name:?} is already registered")]
    Duplicate {
        /// The name that was added twice.
        name: String,
    },

    /// A testable expression did not match the grammar in
    /// `TESTABLE_RE`.
    #[error("malformed testable expression {expression:?}")]
    MalformedExpression {
        /// The text that failed to parse.
        expression: String,
    },

    /// A testable expression used the `~` operator, which the grammar
    /// accepts syntactically but has no defined evaluation semantics.
    #[error("the `~` operator in {expression:?} has no defined semantics")]
    UnsupportedOperator {
        /// The expression that used `~`.
        expression: String,
    },

    /// `generate`/`verify` referenced a name with no registered
    /// provider.
    #[error("no provider registered for {name:?}")]
    MissingProvider {
        /// The unregistered name.
        name: String,
    },

    /// A requirement's version test failed against its provider.
    #[error("requirement {requirement} is not satisfied by provider {provider}")]
    UnresolvedRequire {
        /// The unmet requirement, formatted as its testable expression.
        requirement: String,
        /// The provider it was tested against, formatted as `name/version`.
        provider: String,
    },

    /// A conflict expression matched a present provider.
    #[error("conflict {conflict} matches provider {provider}")]
    ConflictDetected {
        /// The matching conflict, formatted as its testable expression.
        conflict: String,
        /// The provider it matched, formatted as `name/version`.
        provider: String,
    },
}
