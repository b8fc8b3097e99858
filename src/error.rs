use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("unknown engine `{0}`, expected one of: mark-then-pull, mark-then-push-and-pull, legacy")]
	UnknownEngine(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
