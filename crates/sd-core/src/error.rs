use crate::entity::EntityId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while wiring or driving entities.
///
/// All of these are precondition violations made while building a level;
/// they are returned to the caller immediately and never retried.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An input was triggered or bound that the entity's class does not declare.
    #[error("entity \"{entity}\" has no input named \"{input}\"")]
    UnknownInput {
        /// Name of the entity that was addressed.
        entity: String,
        /// The undeclared input name.
        input: String,
    },

    /// An output was bound or fired that the entity's class does not declare.
    #[error("entity \"{entity}\" has no output named \"{output}\"")]
    UnknownOutput {
        /// Name of the entity that was addressed.
        entity: String,
        /// The undeclared output name.
        output: String,
    },

    /// An entity with the same name is already registered in the world.
    #[error("entity already exists: \"{0}\"")]
    DuplicateEntityName(String),

    /// More distinct tags were registered than a tag mask has bits.
    #[error("tag \"{tag}\" does not fit: all {capacity} tag bits are assigned")]
    TagOverflow {
        /// The tag that could not be assigned a bit.
        tag: String,
        /// The number of bits available.
        capacity: u32,
    },

    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An operation that needs a cell was given some other entity.
    #[error("entity \"{0}\" is not a cell")]
    NotACell(String),

    /// A cell grid whose rows do not all have the same length.
    #[error("ragged cell grid: row {row} has {found} cells, expected {expected}")]
    RaggedGrid {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// An input received a value it cannot use.
    #[error("invalid value for \"{input}\": {reason}")]
    InvalidValue {
        /// The input that rejected the value.
        input: String,
        /// Why the value was rejected.
        reason: String,
    },
}
