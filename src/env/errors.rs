use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("step called before reset")]
    NotReset,

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("render error")]
    Render(#[from] std::io::Error),

    #[error("Environment error")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
