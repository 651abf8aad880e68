mod model;
mod repository;

pub use model::PriceSampleDB;
pub use repository::PriceSampleRepository;
