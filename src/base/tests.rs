use crate::base::neterror::NetError;
use crate::http::connection::State;

#[test]
fn test_net_error_roundtrip() {
    let refused = NetError::ConnectionRefused;
    let code = refused.as_i32();
    assert_eq!(code, -102);
    let converted = NetError::from(code);
    assert!(matches!(converted, NetError::ConnectionRefused));

    let framing = NetError::ContentLengthMismatch;
    assert_eq!(framing.as_i32(), -354);
    assert!(matches!(NetError::from(-354), NetError::ContentLengthMismatch));
}

#[test]
fn test_unknown_error() {
    let err = NetError::from(-9999);
    assert!(matches!(err, NetError::Unknown(-9999)));
}

#[test]
fn test_unassigned_codes_are_unknown() {
    for code in [-320, -324, -901, -902] {
        assert_eq!(NetError::from(code), NetError::Unknown(code));
    }
}

#[test]
fn test_data_carrying_variants_are_not_reconstructed() {
    let err = NetError::IllegalState(State::Closed);
    assert_eq!(err.as_i32(), -912);
    assert!(matches!(NetError::from(-912), NetError::Unknown(-912)));
}

#[test]
fn test_error_categories() {
    assert!(NetError::RequestBodyOverflow { expected: 3, received: 4 }.is_framing_error());
    assert!(NetError::IncompleteChunkedEncoding.is_framing_error());
    assert!(!NetError::ConnectionReset.is_framing_error());
    assert!(NetError::ConnectionReset.is_transport_error());
    assert!(NetError::IllegalState(State::Idle).is_usage_error());
    assert!(NetError::InvalidArgument.is_usage_error());
}

#[test]
fn test_overflow_message() {
    let err = NetError::RequestBodyOverflow { expected: 3, received: 10 };
    assert_eq!(err.to_string(), "Expected 3 bytes but received 10");
}

#[test]
fn test_io_error_mapping() {
    use std::io::{Error, ErrorKind};
    assert_eq!(NetError::from(Error::from(ErrorKind::BrokenPipe)), NetError::ConnectionAborted);
    assert_eq!(NetError::from(Error::from(ErrorKind::TimedOut)), NetError::ConnectionTimedOut);
    assert_eq!(NetError::from(Error::from(ErrorKind::Other)), NetError::ConnectionFailed);
}
