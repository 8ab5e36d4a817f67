use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid address '{0}': {1}")]
    InvalidAddress(String, String),

    #[error("Invalid controller id '{0}': {1}")]
    InvalidControllerId(String, String),

    #[error("Invalid signature encoding '{0}': {1}")]
    InvalidSignature(String, String),
}
