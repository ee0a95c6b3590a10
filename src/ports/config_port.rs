//! Configuration access port trait.
//!
//! Typed getters return `Ok(None)` for an absent key and `Err` with a
//! reason when the key is present but does not parse.

use rust_decimal::Decimal;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_uint(&self, section: &str, key: &str) -> Result<Option<u64>, String>;
    fn get_decimal(&self, section: &str, key: &str) -> Result<Option<Decimal>, String>;
}
