//! Bearer token lookup.
//!
//! The provider reads the token on every request through a `TokenProvider`
//! so that a token stored after the provider was built is still picked up.
//! An empty string means "no token".

/// Tokens of this length or shorter are treated as absent.
pub const MIN_TOKEN_LEN: usize = 16;

/// Source of the bearer token attached to outgoing requests.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> String;
}

/// Never supplies a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> String {
        String::new()
    }
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> String {
        self.0.clone()
    }
}

/// Reads the token from an environment variable at request time.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> String {
        std::env::var(&self.var).unwrap_or_default()
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn token(&self) -> String {
        self()
    }
}

/// The `Authorization` header value for `token`, if it is long enough to use.
pub fn bearer(token: &str) -> Option<String> {
    if token.chars().count() > MIN_TOKEN_LEN {
        Some(format!("Bearer {token}"))
    } else {
        None
    }
}
