use thiserror::Error;

/// Errors raised by the AIS manager, target store, warning ledger and log
/// replay source.
///
/// A codec miss (`Codec::decode` returning `None`) is not represented here —
/// per the ingestion contract that is silently ignored, not an error.
#[derive(Error, Debug)]
pub enum AisError {
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),

    #[error("unsupported AIS message type")]
    UnsupportedMessage,

    #[error("invalid field '{0}', cleared and update continued")]
    InvalidField(&'static str),

    #[error("outbound position report encoding did not yield exactly one sentence")]
    EncodeFailure,

    #[error("outbound encoding is only supported for transceiver class A")]
    UnsupportedEncoding,

    #[error("source reached end of data")]
    PortClosed,
}
