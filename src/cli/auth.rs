//! dayplan auth and guard command implementations.

use serde::Serialize;

use crate::auth::{Registration, SessionAction, SessionStore, User, UserDirectory};
use crate::cli::{Context, GlobalOptions};
use crate::error::Result;
use crate::guard::{self, GuardDecision};
use crate::mail::MailReceipt;
use crate::output::{emit_success, HumanOutput};
use crate::storage::SESSION_SLOT;

pub struct RegisterOptions {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub global: GlobalOptions,
}

pub struct VerifyOptions {
    pub token: String,
    pub global: GlobalOptions,
}

pub struct LoginOptions {
    pub email: String,
    pub password: String,
    pub global: GlobalOptions,
}

pub struct GuardOptions {
    pub path: String,
    pub global: GlobalOptions,
}

/// A user as shown on the command line. Never carries the password.
#[derive(Serialize)]
struct UserOutput<'a> {
    id: &'a str,
    name: &'a str,
    email: &'a str,
    is_verified: bool,
}

impl<'a> From<&'a User> for UserOutput<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: &user.id,
            name: &user.name,
            email: &user.email,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Serialize)]
struct RegisterOutput<'a> {
    user: UserOutput<'a>,
    verification_mail: MailReceipt,
}

#[derive(Serialize)]
struct VerifyOutput<'a> {
    user: UserOutput<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_notice: Option<MailReceipt>,
}

#[derive(Serialize)]
struct GuardOutput<'a> {
    path: &'a str,
    has_session: bool,
    #[serde(flatten)]
    decision: GuardDecision,
}

pub fn run_register(options: RegisterOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let registration = Registration {
        name: options.name,
        email: options.email,
        password: options.password,
        confirm_password: options.confirm_password,
    };
    let mut mailer = ctx.mailer();
    let (user, receipt) = UserDirectory::new(&ctx.storage).register(&registration, &mut mailer)?;

    let mut sessions = SessionStore::restore(ctx.storage.clone());
    sessions.dispatch(SessionAction::Register(user.clone()))?;

    let mut human = HumanOutput::new("Registered");
    human.push_summary("Name", user.name.clone());
    human.push_summary("Email", user.email.clone());
    if receipt.success {
        human.push_detail(format!("verification mail queued for {}", user.email));
    } else {
        human.push_warning(format!(
            "verification mail not sent: {}",
            receipt.error.as_deref().unwrap_or("unknown error")
        ));
    }
    human.push_next_step("dayplan auth verify <token>");

    emit_success(
        ctx.output,
        "auth register",
        &RegisterOutput {
            user: UserOutput::from(&user),
            verification_mail: receipt,
        },
        &human,
    )
}

pub fn run_verify(options: VerifyOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let mut mailer = ctx.mailer();
    let (user, notice) = UserDirectory::new(&ctx.storage).verify(&options.token, &mut mailer)?;

    let mut human = HumanOutput::new("Email verified");
    human.push_summary("Email", user.email.clone());
    if let Some(receipt) = notice.as_ref().filter(|receipt| !receipt.success) {
        human.push_warning(format!(
            "admin notice not sent: {}",
            receipt.error.as_deref().unwrap_or("unknown error")
        ));
    }
    human.push_next_step(format!("dayplan auth login {}", user.email));

    emit_success(
        ctx.output,
        "auth verify",
        &VerifyOutput {
            user: UserOutput::from(&user),
            admin_notice: notice,
        },
        &human,
    )
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let user = UserDirectory::new(&ctx.storage).authenticate(&options.email, &options.password)?;
    let mut sessions = SessionStore::restore(ctx.storage.clone());
    sessions.dispatch(SessionAction::Login(user))?;
    let view = sessions.view();

    let mut human = HumanOutput::new("Logged in");
    if let Some(name) = &view.name {
        human.push_summary("Name", name.clone());
    }
    if let Some(email) = &view.email {
        human.push_summary("Email", email.clone());
    }
    human.push_next_step("dayplan view daily");

    emit_success(ctx.output, "auth login", &view, &human)
}

pub fn run_logout(global: GlobalOptions) -> Result<()> {
    let ctx = Context::load(&global)?;
    let mut sessions = SessionStore::restore(ctx.storage.clone());
    let was_logged_in = sessions.has_cookie();
    sessions.dispatch(SessionAction::Logout)?;

    let mut human = HumanOutput::new("Logged out");
    if !was_logged_in {
        human.push_warning("no active session");
    }

    emit_success(ctx.output, "auth logout", &sessions.view(), &human)
}

pub fn run_whoami(global: GlobalOptions) -> Result<()> {
    let ctx = Context::load(&global)?;
    let sessions = SessionStore::restore(ctx.storage.clone());
    let view = sessions.view();

    let mut human = HumanOutput::new("Session");
    human.push_summary(
        "Authenticated",
        if view.is_authenticated { "yes" } else { "no" },
    );
    if let Some(name) = &view.name {
        human.push_summary("Name", name.clone());
    }
    if let Some(email) = &view.email {
        human.push_summary("Email", email.clone());
    }
    if sessions.has_cookie() && !view.is_authenticated {
        human.push_warning("stored session belongs to an unverified user");
    }
    if !view.is_authenticated {
        human.push_next_step("dayplan auth login <email>");
    }

    emit_success(ctx.output, "auth whoami", &view, &human)
}

/// Evaluate the route guard for `path` against the stored session.
pub fn run_guard(options: GuardOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let has_session = ctx.storage.has_slot(SESSION_SLOT);
    let decision = guard::check(&options.path, has_session, ctx.today_key());

    let mut human = HumanOutput::new(format!("Guard {}", options.path));
    match &decision {
        GuardDecision::Allow => human.push_summary("Decision", "allow"),
        GuardDecision::Redirect { location } => {
            human.push_summary("Decision", "redirect");
            human.push_summary("Location", location.clone());
        }
    }

    emit_success(
        ctx.output,
        "guard",
        &GuardOutput {
            path: &options.path,
            has_session,
            decision,
        },
        &human,
    )
}
