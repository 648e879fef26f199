use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid editor config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode {format} export")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
}
