mod model;
mod repository;

pub use model::{NewSubscriberDB, SubscriberDB};
pub use repository::SubscriberRepository;
