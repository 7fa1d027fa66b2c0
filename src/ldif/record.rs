//! Directory Records
//!
//! A DN plus an ordered attribute map. A record is either *full* (reset to
//! the baseline of its object class with [`DirectoryRecord::full_init`],
//! then overlaid) or a *patch* carrying only the attributes it is given.

use indexmap::IndexMap;

// =============================================================================
// Value Coercion
// =============================================================================

/// Conversion of attribute values into the list form stored in a record
pub trait IntoValues {
    fn into_values(self) -> Vec<String>;
}

impl IntoValues for &str {
    fn into_values(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoValues for String {
    fn into_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoValues for &String {
    fn into_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoValues for Vec<String> {
    fn into_values(self) -> Vec<String> {
        self
    }
}

impl IntoValues for Vec<&str> {
    fn into_values(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoValues for &[String] {
    fn into_values(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> IntoValues for [&str; N] {
    fn into_values(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

macro_rules! impl_into_values_for_numbers {
    ($($t:ty),*) => {
        $(
            impl IntoValues for $t {
                fn into_values(self) -> Vec<String> {
                    vec![self.to_string()]
                }
            }
        )*
    };
}

impl_into_values_for_numbers!(u32, u64, usize, i32, i64);

// =============================================================================
// Attributes
// =============================================================================

/// Ordered attribute map: name to list of string values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, Vec<String>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Attributes::set`]
    pub fn with(mut self, name: impl Into<String>, values: impl IntoValues) -> Self {
        self.set(name, values);
        self
    }

    /// Set an attribute, replacing its previous values
    pub fn set(&mut self, name: impl Into<String>, values: impl IntoValues) -> &mut Self {
        self.0.insert(name.into(), values.into_values());
        self
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Overlay `other`, overwriting keys present in both
    pub fn merge(&mut self, other: Attributes) {
        for (name, values) in other.0 {
            self.0.insert(name, values);
        }
    }

    /// Builder form of [`Attributes::merge`]
    pub fn merged(mut self, other: Attributes) -> Self {
        self.merge(other);
        self
    }
}

// =============================================================================
// Directory Record
// =============================================================================

/// One LDIF entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    dn: String,
    baseline: Attributes,
    attributes: Attributes,
}

impl DirectoryRecord {
    /// Record of an object class with the given baseline attributes.
    ///
    /// The attribute map stays empty until [`full_init`](Self::full_init).
    pub fn new(dn: impl Into<String>, baseline: Attributes) -> Self {
        Self {
            dn: dn.into(),
            baseline,
            attributes: Attributes::new(),
        }
    }

    /// Record without baseline, used for incremental updates
    pub fn patch(dn: impl Into<String>) -> Self {
        Self::new(dn, Attributes::new())
    }

    /// Reset the attribute map to the baseline
    pub fn full_init(&mut self) -> &mut Self {
        self.attributes = self.baseline.clone();
        self
    }

    /// Merge attributes into the record
    pub fn add(&mut self, attributes: Attributes) -> &mut Self {
        self.attributes.merge(attributes);
        self
    }

    /// Owned form of `full_init().add(attributes)`
    pub fn initialized(mut self, attributes: Attributes) -> Self {
        self.full_init().add(attributes);
        self
    }

    /// Owned form of `add(attributes)`
    pub fn with(mut self, attributes: Attributes) -> Self {
        self.add(attributes);
        self
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.attributes.first(name)
    }
}
