use std::fmt;

/// A destination route: target name plus numeric route reference.
///
/// One [`ConnectionPool`](crate::ConnectionPool) exists per distinct route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub name: String,
    pub reference: u64,
}

impl Route {
    pub fn new(name: impl Into<String>, reference: u64) -> Self {
        Self {
            name: name.into(),
            reference,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.reference)
    }
}
