use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A user-supplied key has the wrong length or a character outside
    /// the zbase32 alphabet.
    #[error("bad key")]
    BadKey,

    /// The object is absent from every configured backend.
    #[error("object does not exist")]
    NotExist,

    /// Decryption was rejected, the inner domain prefix mismatched, or
    /// stored metadata is inconsistent with the data it points at.
    /// May also indicate a wrong passphrase; we cannot tell the two apart.
    #[error("blob is corrupted")]
    CorruptBlob,

    /// A backend served an object with the wrong media type.
    #[error("unexpected content type: {0:?}")]
    UnexpectedContentType(String),

    #[error("backend error: {0}")]
    Backend(#[from] opendal::Error),

    /// Programmer error at construction time.
    #[error("config error: {0}")]
    Config(String),

    /// Every alternative failed; the individual failures are preserved.
    #[error("{}", fmt_multi(.0))]
    Multi(Vec<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn fmt_multi(errs: &[Error]) -> String {
    match errs {
        [single] => single.to_string(),
        many => {
            let mut s = String::from("multiple errors:");
            for err in many {
                s.push_str("\n\t");
                s.push_str(&err.to_string());
            }
            s
        }
    }
}

impl Error {
    /// Reports whether this error consists solely of backend not-found
    /// failures (recursing through aggregates).
    pub fn all_backend_not_found(&self) -> bool {
        match self {
            Error::Multi(errs) => {
                !errs.is_empty() && errs.iter().all(Error::all_backend_not_found)
            }
            Error::Backend(err) => err.kind() == opendal::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Folds an all-not-found failure into [`Error::NotExist`]; any other
    /// error is returned unchanged.
    pub fn into_not_exist(self) -> Error {
        if self.all_backend_not_found() {
            Error::NotExist
        } else {
            self
        }
    }
}
