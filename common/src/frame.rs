use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// Opaque identifier a producer picks to distinguish its frames from others'.
///
/// Browser clients send a random number, but nothing stops a producer from
/// using a string. Either shape is normalized to its decimal/text form so
/// `42` and `"42"` address the same feed. Not authenticated, not guaranteed
/// unique across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Producers sending a falsy id (empty string, numeric zero) are
    /// rejected: the page script sends `0` only when it has no id yet.
    /// Numeric zero normalizes to the empty string so it stays
    /// distinguishable from the legitimate string `"0"`.
    pub fn is_falsy(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = ClientId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or numeric client identifier")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ClientId, E> {
                Ok(ClientId(v.to_owned()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ClientId, E> {
                if v == 0 {
                    return Ok(ClientId(String::new()));
                }
                Ok(ClientId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ClientId, E> {
                if v == 0 {
                    return Ok(ClientId(String::new()));
                }
                Ok(ClientId(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ClientId, E> {
                if v == 0.0 {
                    return Ok(ClientId(String::new()));
                }
                // JSON has no integer type; a whole-valued float is an id
                // the page script produced with Math.floor.
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Ok(ClientId((v as i64).to_string()))
                } else {
                    Ok(ClientId(v.to_string()))
                }
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One inbound push event from a producer: a client id plus a base64-encoded
/// JPEG payload. Both fields are optional at the wire level; the ingest
/// handler decides what to discard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FramePush {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub image: String,
}
