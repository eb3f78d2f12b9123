pub mod random;
pub mod rarity;

pub use rarity::Rarity;
