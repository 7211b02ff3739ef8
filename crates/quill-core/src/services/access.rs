//! Ownership guard.
//!
//! Flat rule: anyone may read, only the recorded author may write. There is
//! no role hierarchy and no admin override.

use uuid::Uuid;

use crate::domain::{Comment, Post};
use crate::error::DomainError;

/// Kind of access being requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Decide whether `requester` may perform `operation` on a resource authored
/// by `resource_author`.
pub fn may_mutate(requester: Uuid, resource_author: Uuid, operation: Operation) -> bool {
    match operation {
        Operation::Read => true,
        Operation::Write => requester == resource_author,
    }
}

/// Resources carrying an author reference.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}

impl Authored for Post {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// Turn a denied write into [`DomainError::Forbidden`].
pub fn ensure_can_write(requester: Uuid, resource: &impl Authored) -> Result<(), DomainError> {
    if may_mutate(requester, resource.author_id(), Operation::Write) {
        Ok(())
    } else {
        tracing::debug!(
            requester = %requester,
            author = %resource.author_id(),
            "Write denied: requester is not the author"
        );
        Err(DomainError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_may_write() {
        let a = Uuid::new_v4();
        assert!(may_mutate(a, a, Operation::Write));
    }

    #[test]
    fn test_other_user_may_not_write() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(!may_mutate(a, b, Operation::Write));
        assert!(!may_mutate(b, a, Operation::Write));
    }

    #[test]
    fn test_anyone_may_read() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(may_mutate(a, a, Operation::Read));
        assert!(may_mutate(a, b, Operation::Read));
    }

    #[test]
    fn test_ensure_can_write_on_comment() {
        let author = Uuid::new_v4();
        let comment = Comment::new(Uuid::new_v4(), author, "hi".to_string());

        assert!(ensure_can_write(author, &comment).is_ok());
        assert!(matches!(
            ensure_can_write(Uuid::new_v4(), &comment),
            Err(DomainError::Forbidden)
        ));
    }
}
