use std::fmt;

/// Tag identifying one submission. Strictly increasing for the life of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tuple submitted for one handshake attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub locale: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            locale: locale.into(),
        }
    }

    /// Positional parameters for the authentication procedure.
    pub fn as_parameters(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.password.clone(),
            self.locale.clone(),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("locale", &self.locale)
            .finish()
    }
}

/// In-memory holder of the current credentials.
///
/// Not synchronized; the coordinator keeps it behind its state lock.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: Option<Credentials>,
    generation: Generation,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tuple wholesale and return the new generation.
    pub fn set(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        locale: impl Into<String>,
    ) -> Generation {
        self.current = Some(Credentials::new(username, password, locale));
        self.generation = self.generation.next();
        self.generation
    }

    /// Drop the tuple. Still bumps the generation so in-flight results go stale.
    pub fn clear(&mut self) -> Generation {
        self.current = None;
        self.generation = self.generation.next();
        self.generation
    }

    pub fn current(&self) -> (Option<&Credentials>, Generation) {
        (self.current.as_ref(), self.generation)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }
}
