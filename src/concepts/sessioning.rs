use super::ConceptError;
use crate::middleware::SessionHandle;
use crate::types::Id;

/// Login state transitions on the session record handed in. Holds no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessioningConcept;

impl SessioningConcept {
    pub fn start(&self, session: &SessionHandle, user: Id) -> Result<(), ConceptError> {
        self.is_logged_out(session)?;
        session.set_user(Some(user));
        Ok(())
    }

    pub fn end(&self, session: &SessionHandle) -> Result<(), ConceptError> {
        self.is_logged_in(session)?;
        session.set_user(None);
        Ok(())
    }

    pub fn get_user(&self, session: &SessionHandle) -> Result<Id, ConceptError> {
        session
            .user()
            .ok_or_else(|| ConceptError::Unauthenticated("Must be logged in!".to_string()))
    }

    pub fn is_logged_in(&self, session: &SessionHandle) -> Result<(), ConceptError> {
        self.get_user(session).map(|_| ())
    }

    pub fn is_logged_out(&self, session: &SessionHandle) -> Result<(), ConceptError> {
        match session.user() {
            Some(_) => Err(ConceptError::not_allowed("Must be logged out!")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_has_no_user() {
        let session = SessionHandle::default();
        let err = SessioningConcept.get_user(&session).unwrap_err();
        assert!(matches!(err, ConceptError::Unauthenticated(_)));
        assert!(SessioningConcept.is_logged_out(&session).is_ok());
        assert!(SessioningConcept.end(&session).is_err());
    }

    #[test]
    fn start_then_end_returns_to_anonymous() {
        let sessioning = SessioningConcept;
        let session = SessionHandle::default();
        let user = Id::new();

        sessioning.start(&session, user).unwrap();
        assert_eq!(sessioning.get_user(&session).unwrap(), user);
        assert!(matches!(sessioning.is_logged_out(&session), Err(ConceptError::NotAllowed(_))));

        sessioning.end(&session).unwrap();
        assert!(matches!(sessioning.get_user(&session), Err(ConceptError::Unauthenticated(_))));
    }

    #[test]
    fn double_start_fails() {
        let sessioning = SessioningConcept;
        let session = SessionHandle::default();
        let first = Id::new();
        sessioning.start(&session, first).unwrap();
        let err = sessioning.start(&session, Id::new()).unwrap_err();
        assert!(matches!(err, ConceptError::NotAllowed(_)));
        assert_eq!(sessioning.get_user(&session).unwrap(), first);
    }
}
