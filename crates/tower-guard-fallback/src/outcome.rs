/// A successful result from a fallback-guarded call.
///
/// `Degraded` carries a value produced by a fallback handler rather than by
/// the inner service, so callers can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<T> {
    /// The inner service produced the value.
    Primary(T),
    /// A fallback handler substituted the value.
    Degraded(T),
}

impl<T> Outcome<T> {
    /// Returns true if a fallback handler produced the value.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    /// Returns true if the inner service produced the value.
    pub fn is_primary(&self) -> bool {
        matches!(self, Outcome::Primary(_))
    }

    /// Discards the provenance and returns the value.
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Primary(v) | Outcome::Degraded(v) => v,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Primary(v) => Outcome::Primary(v),
            Outcome::Degraded(v) => Outcome::Degraded(v),
        }
    }

    /// Maps the value, keeping its provenance.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Primary(v) => Outcome::Primary(f(v)),
            Outcome::Degraded(v) => Outcome::Degraded(f(v)),
        }
    }
}
