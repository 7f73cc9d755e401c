/// Everything that can go wrong while encoding, decoding or transforming a view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PermalinkError {
    #[error("No input given")]
    EmptyInput,
    #[error("Unrecognized URL or coordinate text: {0}")]
    UnrecognizedInput(String),
    #[error("Parameter '{param}' is not a number: {value}")]
    InvalidNumber { param: String, value: String },
    #[error("Missing parameter '{0}'")]
    MissingParameter(String),
    #[error("Parameter '{param}' out of range: {value}")]
    OutOfRange { param: String, value: f64 },
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),
    #[error("No transform available from {from} to {to}")]
    TransformUnavailable { from: String, to: String },
    #[error("Point cannot be projected into {crs}")]
    ProjectionFailed { crs: String },
    #[error("Invalid theme parameter: {0}")]
    InvalidTheme(String),
    #[error("Invalid location parameter: {0}")]
    InvalidLocation(String),
}

impl PermalinkError {
    /// Short machine-readable name, used in JSON error bodies
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::UnrecognizedInput(_) => "unrecognized_input",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::MissingParameter(_) => "missing_parameter",
            Self::OutOfRange { .. } => "out_of_range",
            Self::UnknownCrs(_) => "unknown_crs",
            Self::TransformUnavailable { .. } => "transform_unavailable",
            Self::ProjectionFailed { .. } => "projection_failed",
            Self::InvalidTheme(_) => "invalid_theme",
            Self::InvalidLocation(_) => "invalid_location",
        }
    }

    pub(crate) fn invalid_number(param: &str, value: &str) -> Self {
        Self::InvalidNumber {
            param: param.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn out_of_range(param: &str, value: f64) -> Self {
        Self::OutOfRange {
            param: param.to_string(),
            value,
        }
    }
}

pub type PermalinkResult<T> = std::result::Result<T, PermalinkError>;
