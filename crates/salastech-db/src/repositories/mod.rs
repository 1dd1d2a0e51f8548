//! Database repositories for CRUD operations

mod user_repository;
mod department_repository;
mod room_repository;
mod reservation_repository;

pub use user_repository::*;
pub use department_repository::*;
pub use room_repository::*;
pub use reservation_repository::*;
