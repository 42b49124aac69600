use crate::types::UserId;

/// Supplies the signed-in user. Without one, the ledger skips every store
/// operation.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// session holding a fixed user, or none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSession {
    user: Option<UserId>,
}

impl StaticSession {
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn sign_in(&mut self, user: UserId) {
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<UserId> {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_sign_in_and_out() {
        let user = Uuid::new_v4();
        let mut session = StaticSession::anonymous();
        assert_eq!(session.current_user(), None);

        session.sign_in(user);
        assert_eq!(session.current_user(), Some(user));
        assert_eq!(session, StaticSession::signed_in(user));

        session.sign_out();
        assert_eq!(session.current_user(), None);
    }
}
