pub use super::catalog_cache::Entity as CatalogCache;
pub use super::confirmed_associations::Entity as ConfirmedAssociations;
pub use super::episodes::Entity as Episodes;
pub use super::movies::Entity as Movies;
pub use super::pending_validations::Entity as PendingValidations;
pub use super::series::Entity as Series;
pub use super::trash::Entity as Trash;
pub use super::video_files::Entity as VideoFiles;
