//! Subcommand handlers.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use roster_client::auth::AuthContext;
use roster_client::bootstrap::RefreshOutcome;
use roster_client::config::ClientConfig;
use roster_client::diagnostics;
use roster_client::navigation::MemoryNavigator;
use roster_client::oauth::{self, OAuthCallback, Provider};
use roster_client::store::FileCredentialStore;
use roster_core::roles::Capabilities;
use roster_core::user::{PasswordChange, ProfileUpdate, UserRecord};
use serde::Serialize;

use crate::{Command, OAuthCommand, ProfileCommand};

/// Where the CLI pretends to be before any redirect.
const HOME: &str = "/";

/// Everything a handler needs for one invocation.
struct Ctx {
    config: ClientConfig,
    store: Arc<FileCredentialStore>,
    navigator: Arc<MemoryNavigator>,
    auth: AuthContext,
    json: bool,
}

impl Ctx {
    fn new(config: &ClientConfig, json: bool) -> Result<Self> {
        let store = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        let navigator = Arc::new(MemoryNavigator::new(HOME));
        let auth = AuthContext::from_config(config, store.clone(), navigator.clone())
            .context("failed to build HTTP client")?;
        Ok(Self {
            config: config.clone(),
            store,
            navigator,
            auth,
            json,
        })
    }

    /// Restore the stored session and wait for the backend to confirm it.
    async fn restore(&self) -> Result<()> {
        let boot = self.auth.initialize().await?;
        if let Some(refresh) = boot.refresh {
            let outcome = refresh.await.context("session refresh task failed")?;
            if outcome == RefreshOutcome::Retained {
                eprintln!("warning: backend unreachable, showing cached session");
            }
        }
        Ok(())
    }

    /// Restore the session and fail unless someone is signed in.
    async fn require_user(&self) -> Result<UserRecord> {
        self.restore().await?;
        match self.auth.current_user() {
            Some(user) => Ok(user),
            None => bail!("not signed in, run `roster login` first"),
        }
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

pub async fn run(command: Command, config: &ClientConfig, json: bool) -> Result<()> {
    let ctx = Ctx::new(config, json)?;

    let result = match command {
        Command::Login { email, password } => login(&ctx, &email, &password).await,
        Command::Register {
            email,
            first_name,
            last_name,
            password,
        } => register(&ctx, &email, &password, &first_name, &last_name).await,
        Command::Logout => {
            ctx.auth.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => whoami(&ctx).await,
        Command::Units => units(&ctx).await,
        Command::Profile { action } => profile(&ctx, action).await,
        Command::Oauth { action } => oauth(&ctx, action).await,
        Command::Doctor => doctor(&ctx),
    };

    if ctx
        .navigator
        .history()
        .iter()
        .any(|path| path == ctx.auth.login_path())
    {
        eprintln!("Session expired, run `roster login` to sign in again.");
    }

    ctx.auth.teardown();
    result
}

async fn login(ctx: &Ctx, email: &str, password: &str) -> Result<()> {
    let payload = ctx.auth.login(email, password).await?;
    tracing::info!(user_id = payload.user.id, "Signed in");
    ctx.print(&payload.user, || format!("Signed in as {}", describe(&payload.user)))
}

async fn register(
    ctx: &Ctx,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    let payload = ctx
        .auth
        .register(email, password, first_name, last_name)
        .await?;
    ctx.print(&payload.user, || {
        format!("Registered and signed in as {}", describe(&payload.user))
    })
}

/// Identity plus derived capabilities, as printed by `whoami --json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Identity<'a> {
    user: &'a UserRecord,
    capabilities: Capabilities,
}

async fn whoami(ctx: &Ctx) -> Result<()> {
    ctx.restore().await?;
    let Some(user) = ctx.auth.current_user() else {
        if ctx.json {
            println!("null");
        } else {
            println!("Not signed in.");
        }
        return Ok(());
    };

    let identity = Identity {
        user: &user,
        capabilities: ctx.auth.capabilities(),
    };
    ctx.print(&identity, || {
        let mut text = describe(&user);
        if let Some(unit) = &user.unit {
            text.push_str(&format!("\nunit:           {}", unit.name));
        }
        text.push_str(&format!("\nadmin:          {}", yes_no(identity.capabilities.is_admin)));
        text.push_str(&format!(
            "\nmanage all:     {}",
            yes_no(identity.capabilities.can_manage_all)
        ));
        text
    })
}

async fn units(ctx: &Ctx) -> Result<()> {
    let units = ctx.auth.api().public_units().await?;
    ctx.print(&units, || {
        units
            .iter()
            .map(|u| format!("{:>4}  {}", u.id, u.name))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

async fn profile(ctx: &Ctx, action: ProfileCommand) -> Result<()> {
    match action {
        ProfileCommand::Show => {
            ctx.require_user().await?;
            let profile = ctx.auth.api().profile().await?;
            ctx.print(&profile, || describe(&profile))
        }
        ProfileCommand::Update {
            email,
            first_name,
            last_name,
        } => {
            let current = ctx.require_user().await?;
            let update = ProfileUpdate {
                email: email.unwrap_or(current.email),
                first_name: first_name.unwrap_or(current.first_name),
                last_name: last_name.unwrap_or(current.last_name),
            };
            let user = ctx.auth.update_profile(&update).await?;
            ctx.print(&user, || format!("Profile saved: {}", describe(&user)))
        }
        ProfileCommand::Password { current, new } => {
            ctx.require_user().await?;
            ctx.auth
                .change_password(&PasswordChange {
                    current_password: current,
                    new_password: new,
                })
                .await?;
            println!("Password changed.");
            Ok(())
        }
        ProfileCommand::Delete { yes } => {
            if !yes {
                bail!("refusing to delete the account without --yes");
            }
            ctx.require_user().await?;
            ctx.auth.delete_account().await?;
            println!("Account deleted.");
            Ok(())
        }
    }
}

async fn oauth(ctx: &Ctx, action: OAuthCommand) -> Result<()> {
    match action {
        OAuthCommand::Url => {
            println!(
                "{}",
                oauth::authorization_url(&ctx.config.base_url, Provider::Github)
            );
            Ok(())
        }
        OAuthCommand::Callback { query } => {
            let user = ctx
                .auth
                .complete_oauth(OAuthCallback::from_query(&query))
                .await?;
            ctx.print(&user, || format!("Signed in as {}", describe(&user)))
        }
    }
}

fn doctor(ctx: &Ctx) -> Result<()> {
    let report = diagnostics::inspect(ctx.store.as_ref());
    ctx.print(&report, || {
        format!("file:    {}\n{report}", ctx.store.path().display())
    })?;
    if !report.is_consistent() {
        bail!("credentials file is inconsistent, run `roster logout` to reset it");
    }
    Ok(())
}

/// One-line description: `Ana B <a@b.com> (Administrator)`.
fn describe(user: &UserRecord) -> String {
    format!(
        "{} <{}> ({})",
        user.display_name(),
        user.email,
        user.role.label()
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
