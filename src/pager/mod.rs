//! Pager core: output indexing, scroll state and key routing.

pub mod index;
pub mod keys;
pub mod viewport;

#[cfg(test)]
mod test_properties;
