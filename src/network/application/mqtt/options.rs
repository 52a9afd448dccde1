//! Session configuration.

use super::error::Error;
use super::packet::LengthEncoding;
use serde::Deserialize;

/// Keep-alive used by [`Options::new`].
pub const DEFAULT_KEEP_ALIVE_SECONDS: u16 = 60;

fn default_keep_alive() -> u16 {
    DEFAULT_KEEP_ALIVE_SECONDS
}

fn default_clean_session() -> bool {
    true
}

/// Username and optional password sent in the CONNECT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Credentials<'a> {
    /// The username.
    pub username: &'a str,
    /// The password, only sent together with a username.
    #[serde(borrow, default)]
    pub password: Option<&'a str>,
}

/// Configuration options for an MQTT session.
///
/// # Examples
///
/// ```rust
/// use libmqtt::network::application::mqtt::{LengthEncoding, Options};
///
/// let options = Options::new("sancho")
///     .with_credentials("quijote", Some("rocinante"))
///     .with_keep_alive(5);
///
/// assert_eq!(options.keep_alive_seconds, 5);
/// assert!(options.clean_session);
/// assert_eq!(options.length_encoding, LengthEncoding::SingleByte);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    pub client_id: &'a str,

    /// Optional authentication sent with CONNECT.
    #[serde(borrow, default)]
    pub credentials: Option<Credentials<'a>>,

    /// The keep-alive time interval in seconds.
    ///
    /// A PINGREQ is sent whenever this much time passes without the client
    /// sending anything. A value of 0 disables keep-alive.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u16,

    /// Whether the broker should discard any previous session state.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,

    /// Layout of the remaining-length field on the wire.
    #[serde(default)]
    pub length_encoding: LengthEncoding,
}

impl<'a> Options<'a> {
    /// Options with a 60 second keep-alive, a clean session and the
    /// single-byte length field.
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            credentials: None,
            keep_alive_seconds: DEFAULT_KEEP_ALIVE_SECONDS,
            clean_session: true,
            length_encoding: LengthEncoding::SingleByte,
        }
    }

    /// Authenticate with `username` and an optional `password`.
    pub fn with_credentials(mut self, username: &'a str, password: Option<&'a str>) -> Self {
        self.credentials = Some(Credentials { username, password });
        self
    }

    /// Set the keep-alive interval in seconds.
    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive_seconds = seconds;
        self
    }

    /// Ask the broker to resume a stored session instead of starting fresh.
    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    /// Select the remaining-length layout.
    pub fn with_length_encoding(mut self, encoding: LengthEncoding) -> Self {
        self.length_encoding = encoding;
        self
    }

    /// Parse options from a JSON document, borrowing strings from it.
    ///
    /// Only `client_id` is required. Strings must not contain escapes since
    /// they are borrowed rather than copied.
    ///
    /// ```rust
    /// use libmqtt::network::application::mqtt::Options;
    ///
    /// let json = r#"{"client_id":"sancho","keep_alive_seconds":5,
    ///                "credentials":{"username":"quijote","password":"rocinante"}}"#;
    /// let options = Options::from_json(json).unwrap();
    /// assert_eq!(options.client_id, "sancho");
    /// assert_eq!(options.credentials.unwrap().password, Some("rocinante"));
    /// ```
    pub fn from_json(json: &'a str) -> Result<Self, Error> {
        let (options, _): (Self, usize) =
            serde_json_core::from_str(json).map_err(|_| Error::InvalidOptions)?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every field can be put on the wire.
    ///
    /// Strings are limited to 65535 bytes by their length prefix, and a
    /// broker only accepts an empty client identifier for a clean session.
    pub fn validate(&self) -> Result<(), Error> {
        let fits = |s: &str| s.len() <= u16::MAX as usize;
        if !fits(self.client_id) {
            return Err(Error::InvalidOptions);
        }
        if self.client_id.is_empty() && !self.clean_session {
            return Err(Error::InvalidOptions);
        }
        if let Some(credentials) = &self.credentials {
            if !fits(credentials.username) || !credentials.password.is_none_or(fits) {
                return Err(Error::InvalidOptions);
            }
        }
        Ok(())
    }
}
