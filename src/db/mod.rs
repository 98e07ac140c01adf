pub mod models;
pub mod store;

pub use models::EventRow;
pub use store::EventStore;
