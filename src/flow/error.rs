#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("flow table is full ({capacity} entries)")]
    Full { capacity: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
