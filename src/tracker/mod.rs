pub mod commit;
pub mod decoder;
pub mod price;
pub mod transaction;
pub mod tvl;
pub mod types;
pub mod window;
pub mod worker;
