pub mod presence;

pub use presence::{room_key, split_accessories, PresenceEngine};
