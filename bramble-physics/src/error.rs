use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {shape} arguments: {reason}")]
    InvalidShape {
        shape: &'static str,
        reason: String,
    },

    #[error("more than one of density, mass, and mass properties supplied")]
    ConflictingMassConfiguration,

    #[error("ECS error")]
    Ecs(#[from] flax::Error),
}
