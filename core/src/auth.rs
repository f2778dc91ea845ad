use std::fmt;

use base64::Engine;

/// WordPress login paired with an application password.
///
/// Built once at startup from configuration and shared read-only for the
/// lifetime of the process. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identity: String,
    secret: String,
}

impl Credential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// `Authorization` value for HTTP Basic auth: `Basic base64(identity:secret)`.
pub fn basic_auth_header(credential: &Credential) -> String {
    let raw = format!("{}:{}", credential.identity, credential.secret);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_encodes_identity_and_secret() {
        let credential = Credential::new("admin", "pw");
        assert_eq!(basic_auth_header(&credential), "Basic YWRtaW46cHc=");
    }

    #[test]
    fn basic_header_is_deterministic() {
        let credential = Credential::new("editor", "abcd efgh ijkl mnop");
        assert_eq!(
            basic_auth_header(&credential),
            basic_auth_header(&credential.clone())
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential = Credential::new("admin", "hunter2");
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
