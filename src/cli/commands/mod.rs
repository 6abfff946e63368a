//! One module per subcommand, each exposing `execute`.

pub mod decrypt;
pub mod inspect;
pub mod validate;
pub mod version;
