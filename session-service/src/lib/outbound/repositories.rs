pub mod memory;
pub mod refresh_token;
pub mod user;

pub use memory::InMemoryCredentialStore;
pub use refresh_token::CassandraCredentialStore;
pub use user::PostgresUserRepository;
