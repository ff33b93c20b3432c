pub mod claude;
pub mod gemini;
pub mod openai;
pub mod provider_base;
pub mod provider_handle;
