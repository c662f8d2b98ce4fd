use thiserror::Error;

#[derive(Debug, Error)]
pub enum DarajaApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not obtain an access token: {0}")]
    AccessToken(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("STK request rejected. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not parse callback payload: {0}")]
    CallbackParse(String),
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
}
