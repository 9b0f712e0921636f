//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Shopper login and lockout, email codes, reset links, admin login
//! - `crypto` - AES-CBC decryption of the admin login password
//! - `ids` - Order ids and numbers, upload names, small parsers
//! - `import` - Spreadsheet product import and template
//! - `setup` - One-shot catalogue import from `product.json`
//! - `uploads` - Storing uploaded files

pub mod auth;
pub mod crypto;
pub mod ids;
pub mod import;
pub mod setup;
pub mod uploads;
