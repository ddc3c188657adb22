use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger contact data so it never lands verbatim in log lines.
///
/// `Debug` and `Display` print a redacted form; serialization keeps the real
/// value because API responses and outgoing mail need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    fn redacted(&self) -> String {
        let raw = self.0.as_ref();
        match raw.split_once('@') {
            Some((local, domain)) => {
                let head: String = local.chars().take(1).collect();
                format!("{head}***@{domain}")
            }
            None => "********".to_string(),
        }
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}
