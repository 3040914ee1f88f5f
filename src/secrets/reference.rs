//! Secret reference parsing

/// Prefix marking a value as a secret indirection
pub const SECRET_PREFIX: &str = "secret://";

/// The only secret backend name accepted after the prefix
pub const SECRET_STORE_NAME: &str = "store";

/// A parsed `secret://store/<kind>/<locator>` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    /// Kind as written, matched case-insensitively by the binders
    pub kind: String,

    /// Opaque store identifier, may contain `/`
    pub locator: String,
}

impl SecretReference {
    /// Parse a raw value
    ///
    /// Anything that does not fully match the reference shape is `None`,
    /// and callers treat the value as a literal.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw
            .strip_prefix(SECRET_PREFIX)?
            .strip_prefix(SECRET_STORE_NAME)?
            .strip_prefix('/')?;

        let (kind, locator) = rest.split_once('/')?;
        if kind.is_empty() || locator.is_empty() {
            return None;
        }

        Some(Self {
            kind: kind.to_string(),
            locator: locator.to_string(),
        })
    }
}

/// A stage environment value after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue<'a> {
    Literal(&'a str),
    Secret(SecretReference),
}

impl<'a> EnvValue<'a> {
    pub fn resolve(raw: &'a str) -> Self {
        match SecretReference::parse(raw) {
            Some(reference) => EnvValue::Secret(reference),
            None => EnvValue::Literal(raw),
        }
    }
}
