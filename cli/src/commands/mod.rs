pub mod hash;
pub mod scenario;
