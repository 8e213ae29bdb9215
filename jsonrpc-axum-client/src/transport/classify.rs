use std::error::Error as StdError;
use std::io;

use crate::{ClientError, DownstreamKind};

/// Turn a hyper or IO failure into a [`ClientError::Downstream`].
///
/// The first cause in the source chain that says something specific wins.
pub(crate) fn classify_error(err: impl StdError + 'static) -> ClientError {
    let mut cause: Option<&(dyn StdError + 'static)> = Some(&err);
    let kind = loop {
        let Some(current) = cause else {
            break DownstreamKind::Other;
        };
        if let Some(kind) = kind_of(current) {
            break kind;
        }
        cause = current.source();
    };
    ClientError::downstream(kind, err.to_string())
}

fn kind_of(err: &(dyn StdError + 'static)) -> Option<DownstreamKind> {
    if let Some(err) = err.downcast_ref::<io::Error>() {
        return match err.kind() {
            io::ErrorKind::ConnectionRefused => Some(DownstreamKind::ConnectionRefused),
            io::ErrorKind::TimedOut => Some(DownstreamKind::Timeout),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Some(DownstreamKind::PrematureClose),
            _ => None,
        };
    }
    let err = err.downcast_ref::<hyper::Error>()?;
    if err.is_incomplete_message() {
        Some(DownstreamKind::PrematureClose)
    } else if err.is_canceled() {
        Some(DownstreamKind::Canceled)
    } else if err.is_timeout() {
        Some(DownstreamKind::Timeout)
    } else {
        None
    }
}
