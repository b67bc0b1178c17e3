use crate::error::{Error, Result};

/// Identity of one remote device session and its clock relationship.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection {
    key: String,
    /// Milliseconds to add to local time to get device server time.
    server_time_offset: f64,
}

impl Connection {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            server_time_offset: 0.0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// The key, or a configuration error if none is set.
    pub fn require_key(&self) -> Result<&str> {
        if self.key.is_empty() {
            return Err(Error::Configuration("connection key not set".to_string()));
        }
        Ok(&self.key)
    }

    pub fn server_time_offset(&self) -> f64 {
        self.server_time_offset
    }

    /// Only called with the result of a complete estimation run.
    pub(crate) fn set_server_time_offset(&mut self, offset: f64) {
        self.server_time_offset = offset;
    }

    /// Device clock reading corresponding to `local_now`, rounded to whole ms.
    pub fn server_time_at(&self, local_now: f64) -> i64 {
        (local_now + self.server_time_offset).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_key() {
        let conn = Connection::default();
        match conn.require_key() {
            Err(Error::Configuration(msg)) => assert_eq!(msg, "connection key not set"),
            other => panic!("unexpected {other:?}"),
        }

        let mut conn = Connection::new("abc123");
        assert_eq!(conn.require_key().unwrap(), "abc123");
        conn.set_key("");
        assert!(conn.require_key().is_err());
    }

    #[test]
    fn test_server_time_rounding() {
        let mut conn = Connection::new("k");
        assert_eq!(conn.server_time_at(1_000.4), 1_000);

        conn.set_server_time_offset(250.0);
        assert_eq!(conn.server_time_at(1_700_000_000_000.0), 1_700_000_000_250);
        conn.set_server_time_offset(-0.6);
        assert_eq!(conn.server_time_at(10.0), 9);
    }
}
