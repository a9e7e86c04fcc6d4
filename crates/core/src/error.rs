use thiserror::Error;

use crate::engine::EngineError;
use crate::model::{ActivityError, ChildProfileError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    ChildProfile(#[from] ChildProfileError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
