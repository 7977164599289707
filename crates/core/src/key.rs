//! Field keys and labels.
//!
//! A [`Key`] is a permanent handle to a field slot, minted once from a
//! process-wide counter and never reused. A [`Label`] is the human-facing,
//! renameable name of a slot; [`Label::Empty`] marks key-only fields.

use alloc::string::{String, ToString};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Global key counter. Keys start at 1 and only ever increase.
static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Permanent, process-unique handle to a field slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u64);

impl Key {
    /// Mints the next key.
    pub fn next() -> Self {
        Key(NEXT_KEY.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the numeric value of this key.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Human-facing name of a field, unique within one container.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Label {
    /// No label: the field is reachable by key only.
    #[default]
    Empty,
    /// A textual label.
    Name(String),
    /// A numeric label.
    Index(i64),
}

impl Label {
    /// Returns true if this is the `Empty` sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Label::Empty)
    }

    /// Returns the label text if this is a `Name`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Empty => write!(f, "Empty()"),
            Label::Name(name) => write!(f, "'{}'", name),
            Label::Index(index) => write!(f, "{}", index),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Empty => write!(f, "Empty()"),
            Label::Name(name) => write!(f, "{}", name),
            Label::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Name(name.to_string())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label::Name(name)
    }
}

impl From<&Label> for Label {
    fn from(label: &Label) -> Self {
        label.clone()
    }
}

impl From<i64> for Label {
    fn from(index: i64) -> Self {
        Label::Index(index)
    }
}

/// Addresses a field either by key (deep) or by label (shallow).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Key(Key),
    Label(Label),
}

impl From<Key> for FieldRef {
    fn from(key: Key) -> Self {
        FieldRef::Key(key)
    }
}

impl From<Label> for FieldRef {
    fn from(label: Label) -> Self {
        FieldRef::Label(label)
    }
}

impl From<&Label> for FieldRef {
    fn from(label: &Label) -> Self {
        FieldRef::Label(label.clone())
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Label(Label::from(name))
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::Label(Label::from(name))
    }
}

impl From<i64> for FieldRef {
    fn from(index: i64) -> Self {
        FieldRef::Label(Label::Index(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_keys_strictly_increase() {
        let a = Key::next();
        let b = Key::next();
        let c = Key::next();
        assert!(a < b && b < c);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_debug() {
        let key = Key::next();
        assert_eq!(format!("{:?}", key), format!("Key({})", key.get()));
    }

    #[test]
    fn test_label_rendering() {
        assert_eq!(format!("{:?}", Label::from("sex")), "'sex'");
        assert_eq!(format!("{}", Label::from("sex")), "sex");
        assert_eq!(format!("{:?}", Label::Empty), "Empty()");
        assert_eq!(format!("{}", Label::from(3i64)), "3");
    }

    #[test]
    fn test_field_ref_conversions() {
        let key = Key::next();
        assert_eq!(FieldRef::from(key), FieldRef::Key(key));
        assert_eq!(FieldRef::from("a"), FieldRef::Label(Label::Name("a".into())));
        assert!(Label::default().is_empty());
        assert_eq!(Label::from("x").as_str(), Some("x"));
        assert_eq!(Label::Index(1).as_str(), None);
    }
}
