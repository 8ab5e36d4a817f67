use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Record period must be positive, got {0} seconds")]
    InvalidRecordPeriod(i64),
}

impl AnalyticsError {
    pub fn kind(&self) -> core_types::FailureKind {
        match self {
            AnalyticsError::InvalidRecordPeriod(_) => core_types::FailureKind::Config,
        }
    }
}
