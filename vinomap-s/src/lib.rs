pub mod inference;
pub mod util;
