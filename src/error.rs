use crate::{api, config};

/// Errors that stop the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("event queue capacity must be greater than zero")]
    EmptyEventQueue,
    #[error(transparent)]
    Api(#[from] api::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Logs the error of a `Result` and turns it into an `Option`.
///
/// Meant for background loops where a failure should be reported but must not
/// end the loop.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log() {
        let ok: std::result::Result<u8, std::io::Error> = Ok(7);
        assert_eq!(ok.ok_log(), Some(7));

        let err: std::result::Result<u8, std::io::Error> =
            Err(std::io::Error::other("lease file vanished"));
        assert_eq!(err.ok_log(), None);
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err = Error::from(config::Error::Invalid {
            var: config::EVENT_QUEUE_VAR,
            value: "x".to_owned(),
            reason: "nope".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "invalid value `x` for `OVERSEER_EVENT_QUEUE`: nope"
        );
    }
}
