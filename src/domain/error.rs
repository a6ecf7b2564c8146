//! Domain error types.

/// Structural problem with a condition node, raised by the compiler and
/// reported (as text) by the validator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("missing op")]
    MissingOp,

    #[error("{op}: missing {field}")]
    MissingField { op: String, field: &'static str },

    #[error("{op}: missing ref")]
    MissingRef { op: String },

    #[error("{op}: ref must have col or value")]
    InvalidRef { op: String },

    #[error("{op}: conditions array is empty")]
    EmptyCompositeChildren { op: String },

    #[error("unknown operator: {0:?}")]
    UnknownOperator(String),

    #[error("parsing condition JSON: {0}")]
    MalformedJson(String),

    #[error("{path}: {source}")]
    At {
        path: String,
        source: Box<ConditionError>,
    },
}

impl ConditionError {
    pub fn at(self, path: impl Into<String>) -> Self {
        ConditionError::At {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, without path wrapping.
    pub fn root(&self) -> &ConditionError {
        match self {
            ConditionError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Top-level error type for stratcond.
#[derive(Debug, thiserror::Error)]
pub enum StratcondError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("{set}: {source}")]
    Condition {
        set: String,
        #[source]
        source: ConditionError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratcondError> for std::process::ExitCode {
    fn from(err: &StratcondError) -> Self {
        let code: u8 = match err {
            StratcondError::Io(_) => 1,
            StratcondError::ConfigParse { .. }
            | StratcondError::ConfigMissing { .. }
            | StratcondError::ConfigInvalid { .. } => 2,
            StratcondError::Data { .. } => 3,
            StratcondError::Condition { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
