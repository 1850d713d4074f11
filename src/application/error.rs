// Errors raised by view operations
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("view {0} not found")]
    ViewNotFound(u64),

    #[error("no chart for column {0}")]
    UnknownChart(String),

    #[error("chart {0} is already mounted")]
    AlreadyMounted(String),

    #[error("sensor {0} is not part of this view")]
    UnknownSensor(String),

    #[error("view has been closed")]
    Closed,

    #[error("chart command stream already taken")]
    StreamTaken,
}
