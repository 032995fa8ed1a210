//! Surface-form text processing shared by knowledge-base compilation and
//! runtime matching.

pub mod expand;
pub mod normalize;

pub use expand::expand_braces;
pub use normalize::normalize;
