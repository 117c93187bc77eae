pub mod admin;
pub mod burn;
pub mod collect;
pub mod flash;
pub mod initialize;
pub mod mint;
pub mod modify_position;
pub mod swap;
