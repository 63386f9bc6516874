pub mod chat;
pub mod embeddings;
pub mod generate;
pub mod stream;

/// Strip chat-template control tokens from untrusted text before it is
/// embedded in a prompt.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|im_start|>", "").replace("<|im_end|>", "")
}
