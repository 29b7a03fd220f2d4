pub mod user_database;

pub use user_database::{
    create_shared_user_database, SharedUserDatabase, UserDatabase, UserStats,
};
