use serde::{Deserialize, Serialize};

/// Body of a text-generation request
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub inputs: String,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Upper bound on prompt plus continuation
    pub max_length: usize,
    pub num_return_sequences: usize,
    /// Echo the prompt in front of the continuation
    pub return_full_text: bool,
}

/// One returned sequence
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// Endpoints answer with a list of sequences, a bare sequence, or an error object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    Sequences(Vec<GeneratedText>),
    Single(GeneratedText),
    Error { error: String },
}
