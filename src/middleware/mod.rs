//! Request extractors

pub mod tenant;
