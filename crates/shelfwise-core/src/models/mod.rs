pub mod candidate;
pub mod detail;
pub mod record;
pub mod tokens;

pub use candidate::*;
pub use detail::*;
pub use record::*;
pub use tokens::*;
