#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("pcm payload of {len} bytes is not aligned to 16-bit samples")]
    Misaligned { len: usize },
    #[error("invalid audio format: {0}")]
    InvalidFormat(String),
    #[error("could not allocate audio buffer: {0}")]
    Allocation(String),
    #[error("invalid wav header: {0}")]
    InvalidHeader(String),
    #[error("audio output failed: {0}")]
    Output(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("generation failed: {0}")]
    Service(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("news text is empty")]
    EmptyInput,
    #[error(transparent)]
    Remote(#[from] GenerationError),
    #[error("no audio data received")]
    MissingAudio,
    #[error(transparent)]
    Audio(#[from] AudioError),
}
