pub mod crm_repo;
pub use crm_repo::PgCrmStore;
pub mod store;
pub use store::CrmStore;
pub mod user_repo;
pub use user_repo::UserRepository;

#[cfg(test)]
pub mod memory_store;
