use crate::base::neterror::NetError;
use std::fmt;

/// Parsed `HTTP/1.x CODE reason` response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    pub minor_version: u8,
    pub code: u16,
    pub reason: String,
}

impl StatusLine {
    /// Interim response sent before the final one.
    pub const CONTINUE: u16 = 100;

    pub fn parse(line: &str) -> Result<Self, NetError> {
        // "HTTP/1.1 200" is the shortest acceptable form.
        let bytes = line.as_bytes();
        if bytes.len() < 12 || !line.starts_with("HTTP/1.") || bytes[8] != b' ' {
            return Err(NetError::InvalidHttpResponse);
        }
        let minor_version = match bytes[7] {
            b'0' => 0,
            b'1' => 1,
            _ => return Err(NetError::InvalidHttpResponse),
        };

        let code_digits = &bytes[9..12];
        if !code_digits.iter().all(u8::is_ascii_digit) {
            return Err(NetError::InvalidHttpResponse);
        }
        let code = code_digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));

        let reason = match bytes.get(12) {
            None => String::new(),
            Some(b' ') => line[13..].to_string(),
            Some(_) => return Err(NetError::InvalidHttpResponse),
        };

        Ok(Self {
            minor_version,
            code,
            reason,
        })
    }

    pub fn is_continue(&self) -> bool {
        self.code == Self::CONTINUE
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/1.{} {}", self.minor_version, self.code)?;
        if !self.reason.is_empty() {
            write!(f, " {}", self.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        let status = StatusLine::parse("HTTP/1.1 200 OK").unwrap();
        assert_eq!(status.minor_version, 1);
        assert_eq!(status.code, 200);
        assert_eq!(status.reason, "OK");
        assert_eq!(status.to_string(), "HTTP/1.1 200 OK");
    }

    #[test]
    fn test_parse_without_reason() {
        let status = StatusLine::parse("HTTP/1.0 204").unwrap();
        assert_eq!(status.minor_version, 0);
        assert_eq!(status.code, 204);
        assert!(status.reason.is_empty());
    }

    #[test]
    fn test_parse_continue() {
        assert!(StatusLine::parse("HTTP/1.1 100 Continue").unwrap().is_continue());
    }

    #[test]
    fn test_reason_with_spaces() {
        let status = StatusLine::parse("HTTP/1.1 404 Not Found Here").unwrap();
        assert_eq!(status.reason, "Not Found Here");
    }

    #[test]
    fn test_parse_errors() {
        for line in ["", "HTTP/2.0 200 OK", "HTTP/1.1 2x0 OK", "HTTP/1.1200 OK", "HTTP/1.1 2000", "ICY 200 OK"] {
            assert_eq!(StatusLine::parse(line), Err(NetError::InvalidHttpResponse), "{line}");
        }
    }
}
