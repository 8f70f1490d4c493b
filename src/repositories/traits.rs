//! Common repository traits
//!
//! Generic CRUD interfaces implemented by the repositories. Entity specific
//! finders live as inherent methods on each repository.

/// Insert a new entity, returning it with the id assigned by the database
pub trait Create<Entity, CreateDTO> {
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Read one entity by primary key
///
/// Returns `Ok(None)` when no row has that key.
pub trait Read<Entity, Id> {
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Partially update an entity: only `Some(_)` fields of the DTO are written
///
/// Fails with `sqlx::Error::RowNotFound` when the entity does not exist.
pub trait Update<Entity, UpdateDTO, Id> {
    async fn update(&self, id: &Id, data: &UpdateDTO) -> Result<Entity, sqlx::Error>;
}

/// Delete an entity (hard or soft, depending on the repository)
pub trait Delete<Id> {
    async fn delete(&self, id: &Id) -> Result<(), sqlx::Error>;
}
