use git2::{Cred, CredentialType, RemoteCallbacks};
use serde::Deserialize;
use std::env;
use std::fmt;
use thiserror::Error;

/// Which clone URL of a project to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloneProtocol {
    /// `ssh_url_to_repo`, authenticated through the SSH agent.
    #[default]
    Ssh,
    /// `http_url_to_repo`, authenticated with the API token.
    Https,
}

impl fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ssh => "ssh",
            Self::Https => "https",
        })
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("SSH agent not available: SSH_AUTH_SOCK is not set")]
    NoAgent,
    #[error("HTTPS cloning needs a GitLab token")]
    MissingToken,
}

/// Transport credentials used for every clone and fetch of a run.
#[derive(Clone)]
pub enum Credentials {
    /// Keys served by the running SSH agent.
    SshAgent { username: String },
    /// HTTP basic auth with a GitLab token as password.
    Token { username: String, token: String },
    /// Whatever libgit2 finds by default (local and public remotes).
    Anonymous,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SshAgent { username } => f
                .debug_struct("SshAgent")
                .field("username", username)
                .finish(),
            Self::Token { username, .. } => f
                .debug_struct("Token")
                .field("username", username)
                .field("token", &"<redacted>")
                .finish(),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl Credentials {
    /// Pick the credential kind matching the clone protocol.
    ///
    /// SSH uses the agent with the conventional `git` user; HTTPS sends the
    /// token as password for the `oauth2` user, as GitLab expects.
    pub fn for_protocol(protocol: CloneProtocol, token: &str) -> Self {
        match protocol {
            CloneProtocol::Ssh => Self::SshAgent {
                username: "git".to_string(),
            },
            CloneProtocol::Https => Self::Token {
                username: "oauth2".to_string(),
                token: token.to_string(),
            },
        }
    }

    /// Startup check so a missing agent or token fails the run before any
    /// repository is touched.
    ///
    /// # Errors
    /// Returns [`CredentialError`] if the credential cannot possibly work.
    pub fn check(&self) -> Result<(), CredentialError> {
        match self {
            Self::SshAgent { .. } => match env::var_os("SSH_AUTH_SOCK") {
                Some(sock) if !sock.is_empty() => Ok(()),
                _ => Err(CredentialError::NoAgent),
            },
            Self::Token { token, .. } if token.is_empty() => Err(CredentialError::MissingToken),
            Self::Token { .. } | Self::Anonymous => Ok(()),
        }
    }

    /// Install the credential callback on `callbacks`.
    ///
    /// libgit2 keeps calling the callback for as long as it returns a
    /// credential the server rejects, so each callback gives up after one
    /// real attempt.
    pub(crate) fn install<'a>(&'a self, callbacks: &mut RemoteCallbacks<'a>) {
        let mut attempted = false;
        callbacks.credentials(move |_url, username_from_url, allowed| {
            if allowed.contains(CredentialType::USERNAME) {
                let user = match self {
                    Self::SshAgent { username } | Self::Token { username, .. } => {
                        username_from_url.unwrap_or(username.as_str())
                    }
                    Self::Anonymous => username_from_url.unwrap_or("git"),
                };
                return Cred::username(user);
            }
            if attempted {
                return Err(git2::Error::from_str("credentials rejected by remote"));
            }
            attempted = true;

            match self {
                Self::SshAgent { username } => {
                    let user = username_from_url.unwrap_or(username.as_str());
                    Cred::ssh_key_from_agent(user).or_else(|_| Cred::default())
                }
                Self::Token { username, token } => Cred::userpass_plaintext(username, token),
                Self::Anonymous => Cred::default(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn for_protocol_picks_kind() {
        let c = Credentials::for_protocol(CloneProtocol::Ssh, "tok");
        assert!(matches!(c, Credentials::SshAgent { ref username } if username == "git"));

        let c = Credentials::for_protocol(CloneProtocol::Https, "tok");
        assert!(matches!(
            c,
            Credentials::Token { ref username, ref token } if username == "oauth2" && token == "tok"
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let c = Credentials::for_protocol(CloneProtocol::Https, "glpat-secret");
        let shown = format!("{:?}", c);
        assert!(!shown.contains("glpat-secret"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn token_check_requires_token() {
        let c = Credentials::for_protocol(CloneProtocol::Https, "");
        assert!(matches!(c.check(), Err(CredentialError::MissingToken)));
        assert!(Credentials::Anonymous.check().is_ok());
    }

    #[test]
    #[serial]
    fn agent_check_follows_ssh_auth_sock() {
        let saved = env::var_os("SSH_AUTH_SOCK");
        let c = Credentials::for_protocol(CloneProtocol::Ssh, "");

        // SAFETY: serialized with every other test that touches the environment.
        unsafe { env::remove_var("SSH_AUTH_SOCK") };
        assert!(matches!(c.check(), Err(CredentialError::NoAgent)));

        unsafe { env::set_var("SSH_AUTH_SOCK", "/tmp/agent.sock") };
        assert!(c.check().is_ok());

        match saved {
            Some(v) => unsafe { env::set_var("SSH_AUTH_SOCK", v) },
            None => unsafe { env::remove_var("SSH_AUTH_SOCK") },
        }
    }
}
