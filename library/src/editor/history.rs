use crate::error::LibraryError;

/// Undo/redo placeholder. Edits are written straight through to storage and
/// nothing is recorded, so both directions always report as unavailable.
#[derive(Debug, Default)]
pub struct History;

impl History {
    pub fn new() -> Self {
        Self
    }

    pub fn can_undo(&self) -> bool {
        false
    }

    pub fn can_redo(&self) -> bool {
        false
    }

    pub fn undo(&mut self) -> Result<(), LibraryError> {
        Err(LibraryError::Unsupported("undo"))
    }

    pub fn redo(&mut self) -> Result<(), LibraryError> {
        Err(LibraryError::Unsupported("redo"))
    }
}
