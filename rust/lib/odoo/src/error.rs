use thiserror::Error;

/// Failure reported by a [`Transport`](crate::Transport).
///
/// The client never interprets these beyond wrapping them in
/// [`Error::Remote`]; they reach the caller as the transport produced them.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// `<fault>` response from the server (access errors, bad domains, ...).
    #[error("fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("decode: {0}")]
    Decode(String),
}

/// Client error.
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered `authenticate` with a false identity.
    #[error("authentication failed for '{username}' on database '{database}'")]
    Authentication { database: String, username: String },

    #[error(transparent)]
    Remote(#[from] RpcError),

    /// A record view was asked for an operation its data does not support.
    #[error("unsupported operation `{op}` on {kind}")]
    Unsupported { op: &'static str, kind: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_is_transparent() {
        let err: Error = RpcError::Fault {
            code: 2,
            message: "Access Denied".into(),
        }
        .into();
        assert_eq!(err.to_string(), "fault 2: Access Denied");
    }

    #[test]
    fn authentication_message_names_the_user() {
        let err = Error::Authentication {
            database: "prod".into(),
            username: "admin".into(),
        };
        assert_eq!(
            err.to_string(),
            "authentication failed for 'admin' on database 'prod'"
        );
    }
}
