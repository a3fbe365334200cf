use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Coordinates outside the 9x9 board")]
    InvalidCoords,
    #[error("Digit must be between 0 and 9")]
    InvalidDigit,
    #[error("Cell belongs to the original puzzle")]
    GivenCell,
    #[error("Grid must be 9 rows of 9 digits in 0..=9")]
    MalformedGrid,
    #[error("Board overwrites a given cell of the original puzzle")]
    InconsistentSession,
}

pub type Result<T> = core::result::Result<T, GameError>;
