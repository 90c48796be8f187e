use std::fmt;

/// One component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Identity of a cached query: an ordered tuple compared by value.
///
/// The first part is conventionally a domain tag (`"breed"`), the rest are
/// parameters (`"abys"`). Keys built from equal parts hit the same cache slot.
///
/// ```
/// use cat_breeds::subscription::query::QueryKey;
///
/// let a = QueryKey::new("breeds").with(3_u32);
/// let b = QueryKey::new("breeds").with(3_u32);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "breeds/3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    #[must_use]
    pub fn new(domain: impl Into<KeyPart>) -> Self {
        Self(vec![domain.into()])
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    #[must_use]
    pub fn domain(&self) -> &KeyPart {
        &self.0[0]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_parts_are_equal_keys() {
        let id = String::from("abys");
        let mut seen = HashSet::new();
        seen.insert(QueryKey::new("breed").with(&id));
        assert!(seen.contains(&QueryKey::new("breed").with("abys")));
        assert!(!seen.contains(&QueryKey::new("breedRefImg").with("abys")));
    }

    #[test]
    fn test_part_order_matters() {
        assert_ne!(
            QueryKey::new("a").with("b"),
            QueryKey::new("b").with("a")
        );
    }

    #[test]
    fn test_string_and_int_parts_differ() {
        assert_ne!(QueryKey::new("breeds").with(1_u32), QueryKey::new("breeds").with("1"));
    }

    #[test]
    fn test_display_joins_parts() {
        let key = QueryKey::new("breedImages").with("beng").with(10_u32);
        assert_eq!(key.to_string(), "breedImages/beng/10");
        assert_eq!(key.domain(), &KeyPart::from("breedImages"));
        assert_eq!(key.parts().len(), 3);
    }
}
