use std::fmt;

/// Upper bound on the length of any identifier in the model (Zeebe historical value).
pub const ID_MAX_LEN: usize = 255;

/// An immutable byte string used for every identifier, name, and expression in the model.
///
/// Equality and hashing are bytewise; no character-encoding surprises leak into
/// comparisons, which matters once these values are hashed or written to a binary form.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct IdBytes(Box<[u8]>);

impl IdBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        IdBytes(bytes.into().into_boxed_slice())
    }

    pub fn empty() -> Self {
        IdBytes(Box::from([]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 view, used only for diagnostic text and the few surfaces (XML, YAML,
    /// JSON) that are textual by nature. Internal comparisons never go through this.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for IdBytes {
    fn from(s: &str) -> Self {
        IdBytes::new(s.as_bytes().to_vec())
    }
}

impl From<String> for IdBytes {
    fn from(s: String) -> Self {
        IdBytes::new(s.into_bytes())
    }
}

impl From<&String> for IdBytes {
    fn from(s: &String) -> Self {
        IdBytes::new(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for IdBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for IdBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdBytes({:?})", self.as_str_lossy())
    }
}

impl fmt::Display for IdBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_bytewise() {
        let a = IdBytes::from("task-1");
        let b = IdBytes::new(b"task-1".to_vec());
        assert_eq!(a, b);
    }

    #[test]
    fn empty_reports_empty() {
        assert!(IdBytes::empty().is_empty());
        assert!(!IdBytes::from("x").is_empty());
    }

    #[test]
    fn display_is_lossy_utf8() {
        let id = IdBytes::from("start");
        assert_eq!(format!("{}", id), "start");
    }
}
