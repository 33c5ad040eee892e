//! Utilities for validating constraints on types.

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// A type that cannot be instatiated without validating the value within.
/// That is, if you have a [`Valid<T>`], `T` is guaranteed to be valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Valid<T> {
    value: T,
}

impl<T> Valid<T> {
    /// Constructs a new validated value.
    pub fn new(value: T) -> Result<Valid<T>, ValidationErrors>
    where
        T: Validate,
    {
        value.validate().map(|_| Valid { value })
    }

    /// Returns a reference to the validated value.
    pub fn inner(&self) -> &T {
        &self.value
    }

    /// Returns the validated value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> AsRef<T> for Valid<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<'de, T: Deserialize<'de> + Validate> Deserialize<'de> for Valid<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: T = T::deserialize(deserializer)?;
        Valid::new(value).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Valid;
    use crate::feature::item::item_repository::NewComment;

    #[test]
    pub fn valid_comment_succeeds() {
        let value = serde_json::from_str::<Valid<NewComment>>(r#"{ "comment": "nice" }"#);
        assert_eq!("nice", value.unwrap().inner().comment);
    }

    #[test]
    pub fn empty_comment_fails() {
        let value = serde_json::from_str::<Valid<NewComment>>(r#"{ "comment": "" }"#);
        assert!(value.is_err());
    }

    #[test]
    pub fn whitespace_is_a_comment() {
        let value = Valid::new(NewComment {
            comment: " ".to_string(),
        });
        assert!(value.is_ok());
    }
}
