use std::fmt;

/// A value that must never end up in logs, such as an API key or a signing secret.
///
/// Both `Debug` and `Display` print `[redacted]` no matter what the wrapped value is, so a
/// `Secret` buried inside a config struct stays masked even when the whole struct is logged.
/// Reading the actual value takes a deliberate [`Secret::reveal`] call at the point of use.
#[derive(Clone, Default)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}
