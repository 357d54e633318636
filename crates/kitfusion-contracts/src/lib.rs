pub mod chat;
pub mod errors;
pub mod events;
pub mod media;
pub mod presets;
pub mod prompt;
pub mod receipts;
pub mod request;
pub mod response;
pub mod slot;
