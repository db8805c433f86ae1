//! The value carried from one stage to the next.

/// A value threaded through a pipeline.
///
/// A push starts with whatever the caller hands in (often [`Carry::Empty`]),
/// and each stage's return value replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Carry<T> {
    /// No upstream value.
    Empty,
    /// A single value.
    Single(T),
    /// A fixed-size ordered group of values.
    Tuple(Vec<T>),
}

impl<T> Carry<T> {
    /// Build a tuple from any sequence of values.
    pub fn tuple(items: impl IntoIterator<Item = T>) -> Self {
        Carry::Tuple(items.into_iter().collect())
    }

    /// Whether there is no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Carry::Empty)
    }

    /// Whether this is a tuple.
    pub fn is_tuple(&self) -> bool {
        matches!(self, Carry::Tuple(_))
    }

    /// Human-readable name of this variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Carry::Empty => "nothing",
            Carry::Single(_) => "a single value",
            Carry::Tuple(_) => "a tuple",
        }
    }

    /// Borrow the single value, if this is one.
    pub fn as_single(&self) -> Option<&T> {
        match self {
            Carry::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Take the single value, if this is one.
    pub fn into_single(self) -> Option<T> {
        match self {
            Carry::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Flatten into positional values: `Empty` is none, `Single` is one.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Carry::Empty => Vec::new(),
            Carry::Single(value) => vec![value],
            Carry::Tuple(items) => items,
        }
    }
}

impl<T> Default for Carry<T> {
    fn default() -> Self {
        Carry::Empty
    }
}

impl<T> From<T> for Carry<T> {
    fn from(value: T) -> Self {
        Carry::Single(value)
    }
}

impl<T> FromIterator<T> for Carry<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Carry::tuple(iter)
    }
}
