pub mod normalize;
pub mod record;

pub use normalize::normalize;
pub use record::ReadingRecord;
