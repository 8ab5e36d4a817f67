use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Malformed step payload: {0}")]
    MalformedPayload(String),

    #[error("Venue rejected the operation: {0}")]
    VenueRejected(String),

    #[error("Venue unreachable: {0}")]
    VenueUnreachable(String),
}
