pub mod accounts;
pub mod videos;

pub use accounts::{AccountService, ProfileImage};
pub use videos::{PublishDraft, UpdateDraft, VideoService};
