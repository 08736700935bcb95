use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Field '{0}' is maintained by the collection and cannot be written")]
    ReservedField(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),
}
