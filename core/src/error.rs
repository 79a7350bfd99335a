use thiserror::Error;

/// The maximum cartridge ROM size the 68k bus's cartridge window can address.
pub const MAX_ROM_SIZE: usize = 0x400000;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("ROM size {size} exceeds the maximum addressable cartridge size of {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error(
        "save state size mismatch: this build's state is {expected} bytes, loaded state is {actual} bytes"
    )]
    SaveStateSizeMismatch { expected: usize, actual: usize },

    #[error(
        "save state was created with a different region or TV standard than the one currently \
         configured; refusing to load it over the running state"
    )]
    SaveStateConfigMismatch,

    #[error("failed to decode save state: {0}")]
    SaveStateDecode(#[from] bincode::error::DecodeError),

    #[error("failed to encode save state: {0}")]
    SaveStateEncode(#[from] bincode::error::EncodeError),
}

pub type CoreResult<T> = Result<T, CoreError>;
