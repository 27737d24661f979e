mod identity;
mod client;

pub use identity::{Identity, Principal, Role};
pub use client::{Client, ClientDraft};
