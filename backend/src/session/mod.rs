pub mod models;
pub mod store;

pub use models::SessionEntry;
pub use store::SessionStore;
