#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod hash;
mod header;
mod table;

/// A hash map growing through an extendible-hashing directory.
///
/// This module provides a `HashMap` that routes keys through a directory
/// of fixed-size sub-tables and grows by splitting one table at a time.
pub mod hash_map;

pub use hash_map::HashMap;
