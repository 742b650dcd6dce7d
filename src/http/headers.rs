use crate::base::neterror::NetError;
use bytes::{BufMut, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// HTTP/1.1 header block that strictly preserves insertion order and casing.
///
/// Names may repeat; lookups are case-insensitive. The order of entries is the
/// order they hit the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.bytes().any(|b| b == b':' || b <= b' ' || b == 0x7f)
}

fn is_valid_value(value: &str) -> bool {
    !value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0)
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if !is_valid_name(name) || !is_valid_value(value) {
            return Err(NetError::InvalidHeader);
        }
        self.entries.push((name.to_string(), value.trim().to_string()));
        Ok(())
    }

    /// Replace every header named `name` with a single value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if !is_valid_name(name) || !is_valid_value(value) {
            return Err(NetError::InvalidHeader);
        }
        self.remove_all(name);
        self.entries.push((name.to_string(), value.trim().to_string()));
        Ok(())
    }

    /// Add a raw `Name: value` line as received from a peer.
    ///
    /// Lenient: a line without a colon is kept with an empty name, as is a
    /// line with a leading colon.
    pub fn add_line(&mut self, line: &str) {
        let (name, value) = match line.get(1..).and_then(|rest| rest.find(':')) {
            Some(index) => (&line[..index + 1], &line[index + 2..]),
            None => ("", line.strip_prefix(':').unwrap_or(line)),
        };
        self.entries.push((name.to_string(), value.trim().to_string()));
    }

    pub fn remove_all(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Last value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct names in first-seen order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(n, _)| n.as_str())
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `Name: value\r\n` for each header.
    pub fn encode(&self, dst: &mut BytesMut) {
        for (name, value) in &self.entries {
            dst.reserve(name.len() + value.len() + 4);
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }

    /// Convert to a standard `http::HeaderMap`, which lowercases names.
    pub fn to_header_map(&self) -> Result<HeaderMap, NetError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let name = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
            let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "application/json").unwrap();
        assert_eq!(headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_repeated_names_keep_order() {
        let mut headers = Headers::new();
        headers.add("Set-Cookie", "a=1").unwrap();
        headers.add("Host", "example.com").unwrap();
        headers.add("set-cookie", "b=2").unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.values("Set-Cookie"), vec!["a=1", "b=2"]);
        assert_eq!(headers.get("SET-COOKIE"), Some("b=2"));
        assert_eq!(headers.names(), vec!["Set-Cookie", "Host"]);
    }

    #[test]
    fn test_set_replaces_all() {
        let mut headers = Headers::new();
        headers.add("Accept", "a").unwrap();
        headers.add("Accept", "b").unwrap();
        headers.set("accept", "c").unwrap();
        assert_eq!(headers.values("Accept"), vec!["c"]);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut headers = Headers::new();
        assert_eq!(headers.add("Invalid Header", "v"), Err(NetError::InvalidHeader));
        assert_eq!(headers.add("X", "bad\r\nInjected: 1"), Err(NetError::InvalidHeader));
        assert_eq!(headers.add("", "v"), Err(NetError::InvalidHeader));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_add_line() {
        let mut headers = Headers::new();
        headers.add_line("Content-Length: 42");
        headers.add_line("X-Odd:no-space");
        headers.add_line(":colon-first");
        headers.add_line("no colon at all");

        assert_eq!(headers.get("content-length"), Some("42"));
        assert_eq!(headers.get("X-Odd"), Some("no-space"));
        assert_eq!(headers.name(2), Some(""));
        assert_eq!(headers.value(2), Some("colon-first"));
        assert_eq!(headers.value(3), Some("no colon at all"));
    }

    #[test]
    fn test_encode_preserves_order_and_case() {
        let mut headers = Headers::new();
        headers.add("Host", "example.com").unwrap();
        headers.add("X-Trace", "1").unwrap();
        let mut buf = BytesMut::new();
        headers.encode(&mut buf);
        assert_eq!(&buf[..], b"Host: example.com\r\nX-Trace: 1\r\n");
    }

    #[test]
    fn test_to_header_map() {
        let mut headers = Headers::new();
        headers.add("Accept", "text/html").unwrap();
        headers.add("Accept", "application/json").unwrap();
        let map = headers.to_header_map().unwrap();
        assert_eq!(map.get_all("accept").iter().count(), 2);
    }
}
