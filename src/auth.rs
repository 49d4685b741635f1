//! Users and the login session.
//!
//! Registered users live in the `users` slot. The logged-in user is
//! mirrored into the `user` slot, which plays the role of the session
//! cookie: its presence is what the route guard looks at.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mail::{MailReceipt, Mailer};
use crate::storage::{Storage, SESSION_SLOT, USERS_SLOT};

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;
const PASSWORD_SCHEME: &str = "blake3";
const PASSWORD_KDF_CONTEXT: &str = "dayplan 2025 user password v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `blake3$<salt>$<hash>`; plain text in blobs from older versions.
    pub password: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

impl User {
    pub fn check_password(&self, candidate: &str) -> bool {
        match self.password.split('$').collect::<Vec<_>>().as_slice() {
            [PASSWORD_SCHEME, salt, _] => hash_password(salt, candidate) == self.password,
            _ => self.password == candidate,
        }
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_KDF_CONTEXT);
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{PASSWORD_SCHEME}${salt}${}", hasher.finalize().to_hex())
}

/// Sign-up form input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(Error::InvalidArgument(format!(
                "name must be at least {MIN_NAME_LEN} characters"
            )));
        }
        if !is_valid_email(&self.email) {
            return Err(Error::InvalidArgument(format!(
                "invalid email address: {}",
                self.email
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidArgument(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(Error::InvalidArgument("passwords do not match".to_string()));
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// The registered-user list.
pub struct UserDirectory<'a> {
    storage: &'a Storage,
}

impl<'a> UserDirectory<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// All users; empty when nothing has been stored yet.
    ///
    /// An unreadable users file is an error so a later write never
    /// replaces accounts that could not be parsed.
    pub fn list(&self) -> Result<Vec<User>> {
        let path = self.storage.users_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        self.storage.read_json(&path)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim();
        Ok(self.list()?.into_iter().find(|user| user.email == email))
    }

    /// Create an unverified user and send the verification mail.
    pub fn register(
        &self,
        registration: &Registration,
        mailer: &mut Mailer,
    ) -> Result<(User, MailReceipt)> {
        registration.validate()?;
        let email = registration.email.trim().to_string();
        let mut users = self.list()?;
        if users.iter().any(|user| user.email == email) {
            return Err(Error::EmailTaken(email));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let token = Uuid::new_v4().to_string();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: registration.name.trim().to_string(),
            email,
            password: hash_password(&salt, &registration.password),
            is_verified: false,
            verification_token: Some(token.clone()),
        };
        users.push(user.clone());
        self.storage.write_slot(USERS_SLOT, &users)?;
        tracing::info!(email = %user.email, "user registered");

        let receipt = mailer.send_verification_email(&user.email, &token);
        Ok((user, receipt))
    }

    /// Mark the user holding `token` as verified.
    ///
    /// Sends a notice to the configured admin address, if any.
    pub fn verify(&self, token: &str, mailer: &mut Mailer) -> Result<(User, Option<MailReceipt>)> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidToken);
        }
        let mut users = self.list()?;
        let user = users
            .iter_mut()
            .find(|user| user.verification_token.as_deref() == Some(token))
            .ok_or(Error::InvalidToken)?;
        user.is_verified = true;
        user.verification_token = None;
        let verified = user.clone();
        self.storage.write_slot(USERS_SLOT, &users)?;
        tracing::info!(email = %verified.email, "email verified");

        let admin_address = mailer.settings().notify_address.clone();
        let notice = admin_address.map(|admin| {
            mailer.send_notification_email(
                &admin,
                "Yeni E-posta Doğrulaması",
                "Bir kullanıcı e-posta adresini doğruladı.",
            )
        });
        Ok((verified, notice))
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .find_by_email(email)?
            .filter(|user| user.check_password(password))
            .ok_or(Error::InvalidCredentials)?;
        if !user.is_verified {
            return Err(Error::NotVerified(user.email));
        }
        Ok(user)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Login(User),
    Logout,
    Register(User),
}

pub fn reduce_session(_session: &Session, action: SessionAction) -> Session {
    match action {
        SessionAction::Login(user) => Session {
            user: Some(user),
            is_authenticated: true,
        },
        SessionAction::Logout => Session::default(),
        SessionAction::Register(user) => Session {
            user: Some(user),
            is_authenticated: false,
        },
    }
}

/// What the rest of the app may see of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub struct SessionStore {
    storage: Storage,
    session: Session,
}

impl SessionStore {
    /// Log in from the `user` slot when it holds a verified user.
    pub fn restore(storage: Storage) -> Self {
        let mut store = Self {
            storage,
            session: Session::default(),
        };
        if let Some(user) = store.storage.read_slot::<User>(SESSION_SLOT) {
            if user.is_verified {
                store.session = reduce_session(&store.session, SessionAction::Login(user));
            }
        }
        store
    }

    pub fn dispatch(&mut self, action: SessionAction) -> Result<()> {
        match &action {
            SessionAction::Login(user) => {
                self.storage.write_slot(SESSION_SLOT, user)?;
                tracing::info!(email = %user.email, "logged in");
            }
            SessionAction::Logout => {
                self.storage.clear_slot(SESSION_SLOT)?;
                tracing::info!("logged out");
            }
            SessionAction::Register(_) => {}
        }
        self.session = reduce_session(&self.session, action);
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the session cookie is present, verified or not.
    pub fn has_cookie(&self) -> bool {
        self.storage.has_slot(SESSION_SLOT)
    }

    pub fn view(&self) -> SessionView {
        let user = self.session.user.as_ref();
        SessionView {
            is_authenticated: self.session.is_authenticated,
            name: user.map(|user| user.name.clone()),
            email: user.map(|user| user.email.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::mail::OutgoingMail;
    use crate::model::State;
    use tempfile::TempDir;

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    fn outbox(storage: &Storage) -> Vec<OutgoingMail> {
        std::fs::read_to_string(storage.outbox_file())
            .expect("outbox")
            .lines()
            .map(|line| serde_json::from_str(line).expect("mail json"))
            .collect()
    }

    fn spool(storage: &Storage, settings: MailConfig) -> Mailer {
        Mailer::spool(settings, storage.outbox_file())
    }

    #[test]
    fn registration_validation() {
        assert!(registration("a@b.co").validate().is_ok());
        let mut short = registration("a@b.co");
        short.name = "A".to_string();
        assert!(short.validate().is_err());
        assert!(registration("not-an-email").validate().is_err());
        let mut weak = registration("a@b.co");
        weak.password = "12345".to_string();
        weak.confirm_password = "12345".to_string();
        assert!(weak.validate().is_err());
        let mut mismatch = registration("a@b.co");
        mismatch.confirm_password = "secret2".to_string();
        assert!(mismatch.validate().is_err());
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn register_verify_authenticate_flow() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let mut mailer = spool(&storage, MailConfig::default());
        let directory = UserDirectory::new(&storage);

        let (user, receipt) = directory
            .register(&registration("a@b.co"), &mut mailer)
            .expect("register");
        assert!(receipt.success);
        assert!(!user.is_verified);
        assert_ne!(user.password, "secret1");
        let token = user.verification_token.clone().expect("token");
        assert!(outbox(&storage)[0].html.contains(&token));

        assert!(matches!(
            directory.authenticate("a@b.co", "secret1"),
            Err(Error::NotVerified(_))
        ));

        let (verified, notice) = directory.verify(&token, &mut mailer).expect("verify");
        assert!(verified.is_verified);
        assert_eq!(verified.verification_token, None);
        assert!(notice.is_none());

        assert!(matches!(
            directory.authenticate("a@b.co", "wrong!!"),
            Err(Error::InvalidCredentials)
        ));
        let user = directory.authenticate("a@b.co", "secret1").expect("login");
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let mut mailer = spool(&storage, MailConfig::default());
        let directory = UserDirectory::new(&storage);
        directory
            .register(&registration("a@b.co"), &mut mailer)
            .expect("register");
        assert!(matches!(
            directory.register(&registration("a@b.co"), &mut mailer),
            Err(Error::EmailTaken(_))
        ));
        assert_eq!(directory.list().expect("list").len(), 1);
    }

    #[test]
    fn unreadable_users_file_is_never_overwritten() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let mut mailer = spool(&storage, MailConfig::default());
        let directory = UserDirectory::new(&storage);
        let damaged = r#"[{"id":"1","name":"Old","email":"old@b.co","password":"x"},
            {"id":"2","name":"Two","email":"two@b.co","password":"y"},]"#;
        std::fs::write(storage.users_file(), damaged).expect("write users");

        assert!(matches!(directory.list(), Err(Error::Json(_))));
        assert!(matches!(
            directory.register(&registration("new@b.co"), &mut mailer),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            directory.verify("some-token", &mut mailer),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            directory.authenticate("old@b.co", "x"),
            Err(Error::Json(_))
        ));

        let raw = std::fs::read_to_string(storage.users_file()).expect("read users");
        assert_eq!(raw, damaged);
        assert!(!storage.outbox_file().exists());
    }

    #[test]
    fn unknown_token_is_rejected_and_token_is_single_use() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let settings = MailConfig {
            notify_address: Some("admin@example.com".to_string()),
            ..MailConfig::default()
        };
        let mut mailer = spool(&storage, settings);
        let directory = UserDirectory::new(&storage);
        let (user, _) = directory
            .register(&registration("a@b.co"), &mut mailer)
            .expect("register");
        let token = user.verification_token.expect("token");

        assert!(matches!(
            directory.verify("bogus", &mut mailer),
            Err(Error::InvalidToken)
        ));
        assert!(matches!(directory.verify("", &mut mailer), Err(Error::InvalidToken)));

        let (_, notice) = directory.verify(&token, &mut mailer).expect("verify");
        assert!(notice.expect("admin notice").success);
        assert_eq!(outbox(&storage).last().expect("mail").to, "admin@example.com");
        assert!(matches!(
            directory.verify(&token, &mut mailer),
            Err(Error::InvalidToken)
        ));
    }

    #[test]
    fn legacy_plain_password_still_authenticates() {
        let user = User {
            id: "u".to_string(),
            name: "Old".to_string(),
            email: "old@b.co".to_string(),
            password: "plain123".to_string(),
            is_verified: true,
            verification_token: None,
        };
        assert!(user.check_password("plain123"));
        assert!(!user.check_password("plain124"));
    }

    #[test]
    fn session_reducer_transitions() {
        let user = User {
            id: "u".to_string(),
            name: "Ada".to_string(),
            email: "a@b.co".to_string(),
            password: String::new(),
            is_verified: true,
            verification_token: None,
        };
        let registered = reduce_session(&Session::default(), SessionAction::Register(user.clone()));
        assert!(!registered.is_authenticated);
        assert_eq!(registered.user.as_ref(), Some(&user));

        let logged_in = reduce_session(&registered, SessionAction::Login(user));
        assert!(logged_in.is_authenticated);

        let logged_out = reduce_session(&logged_in, SessionAction::Logout);
        assert_eq!(logged_out, Session::default());
    }

    #[test]
    fn login_writes_cookie_and_logout_leaves_tasks_alone() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let state = State::default();
        storage.save_state(&state).expect("save");
        let user = User {
            id: "u".to_string(),
            name: "Ada".to_string(),
            email: "a@b.co".to_string(),
            password: String::new(),
            is_verified: true,
            verification_token: None,
        };

        let mut sessions = SessionStore::restore(storage.clone());
        assert!(!sessions.view().is_authenticated);
        sessions.dispatch(SessionAction::Login(user)).expect("login");
        assert!(sessions.has_cookie());

        let restored = SessionStore::restore(storage.clone());
        let view = restored.view();
        assert!(view.is_authenticated);
        assert_eq!(view.name.as_deref(), Some("Ada"));
        assert_eq!(view.email.as_deref(), Some("a@b.co"));

        sessions.dispatch(SessionAction::Logout).expect("logout");
        assert!(!sessions.has_cookie());
        assert!(storage.task_state_file().exists());
        assert_eq!(storage.load_state(), Some(state));
    }

    #[test]
    fn restore_ignores_unverified_cookie() {
        let dir = TempDir::new().expect("tempdir");
        let storage = Storage::new(dir.path());
        let user = User {
            id: "u".to_string(),
            name: "Ada".to_string(),
            email: "a@b.co".to_string(),
            password: String::new(),
            is_verified: false,
            verification_token: Some("t".to_string()),
        };
        storage.write_slot(SESSION_SLOT, &user).expect("write");
        let sessions = SessionStore::restore(storage);
        assert!(!sessions.view().is_authenticated);
        assert!(sessions.has_cookie());
    }
}
