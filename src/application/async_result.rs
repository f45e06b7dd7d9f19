use crate::infrastructure::error::InfraError;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::warn;

/// Outcome of one asynchronous call as observed by a UI-facing consumer.
///
/// A logical call is reported as `Loading` exactly once and then exactly one
/// terminal value (`Success` or `Error`). [`ResultEmitter`] is the only
/// producer in the crate and enforces that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncResult<T> {
    Loading,
    Success(T),
    Error { message: String, code: Option<u16> },
}

impl<T> AsyncResult<T> {
    pub fn error(message: impl Into<String>, code: Option<u16>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    pub fn from_result(result: Result<T, InfraError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Error {
                message: error.to_string(),
                code: error.code(),
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<u16> {
        match self {
            Self::Error { code, .. } => *code,
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AsyncResult<U> {
        match self {
            Self::Loading => AsyncResult::Loading,
            Self::Success(value) => AsyncResult::Success(f(value)),
            Self::Error { message, code } => AsyncResult::Error { message, code },
        }
    }

    /// Runs the next call of a chain only after this one succeeded.
    ///
    /// An `Error` halts the chain and is passed through unchanged. A
    /// non-terminal `Loading` never starts the next call.
    pub async fn and_then<U, F, Fut>(self, next: F) -> AsyncResult<U>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = AsyncResult<U>>,
    {
        match self {
            Self::Success(value) => next(value).await,
            Self::Error { message, code } => AsyncResult::Error { message, code },
            Self::Loading => AsyncResult::Loading,
        }
    }
}

pub type ResultSender<T> = mpsc::UnboundedSender<AsyncResult<T>>;
pub type ResultReceiver<T> = mpsc::UnboundedReceiver<AsyncResult<T>>;

pub fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    mpsc::unbounded_channel()
}

/// Single-use producer for one logical call.
///
/// `Loading` is sent on construction; `finish` consumes the emitter, so a
/// second terminal value cannot be produced. Sends to a dropped receiver are
/// ignored: the work still completes, nobody observes it.
pub struct ResultEmitter<T> {
    operation: &'static str,
    sender: Option<ResultSender<T>>,
}

impl<T: Clone> ResultEmitter<T> {
    pub fn start(operation: &'static str, sender: Option<ResultSender<T>>) -> Self {
        let emitter = Self { operation, sender };
        emitter.send(AsyncResult::Loading);
        emitter
    }

    pub fn finish(self, result: Result<T, InfraError>) -> AsyncResult<T> {
        if let Err(error) = &result {
            warn!(operation = self.operation, %error, code = ?error.code(), "operation failed");
        }
        let terminal = AsyncResult::from_result(result);
        self.send(terminal.clone());
        terminal
    }

    fn send(&self, value: AsyncResult<T>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(value);
        }
    }
}

/// Wraps `work` in the Loading-then-terminal protocol.
pub async fn track<T, Fut>(
    operation: &'static str,
    sender: Option<ResultSender<T>>,
    work: Fut,
) -> AsyncResult<T>
where
    T: Clone,
    Fut: Future<Output = Result<T, InfraError>>,
{
    let emitter = ResultEmitter::start(operation, sender);
    emitter.finish(work.await)
}
