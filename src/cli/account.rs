use std::error::Error;

use crate::api::{ProfilePatch, RegisterRequest, User};
use crate::cli::context::AppContext;
use crate::utils::prompt::{prompt_line, prompt_secret};

fn print_user(user: &User) {
    println!("👤 {} ({})", user.display_name(), user.username);
    if !user.email.is_empty() {
        println!("   email: {}", user.email);
    }
    if !user.profile.bio.is_empty() {
        println!("   bio: {}", user.profile.bio);
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String, Box<dyn Error>> {
    match password {
        Some(password) => Ok(password),
        None => Ok(prompt_secret("Password: ")?),
    }
}

pub async fn login(
    ctx: &mut AppContext,
    username: String,
    password: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let password = password_or_prompt(password)?;
    let user = ctx.auth.login(&username, &password).await?;
    println!("✅ Logged in as {}", user.display_name());
    Ok(())
}

pub struct RegisterInput {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn register(ctx: &mut AppContext, input: RegisterInput) -> Result<(), Box<dyn Error>> {
    let email = match input.email {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = password_or_prompt(input.password)?;
    let fields = RegisterRequest {
        username: input.username,
        email,
        password,
        first_name: input.first_name.unwrap_or_default(),
        last_name: input.last_name.unwrap_or_default(),
    };
    let user = ctx.auth.register(&fields).await?;
    println!("✅ Welcome to NOVA, {}", user.display_name());
    Ok(())
}

pub fn logout(ctx: &mut AppContext) {
    ctx.auth.logout();
    println!("✅ Logged out");
}

pub async fn whoami(ctx: &mut AppContext) -> Result<(), Box<dyn Error>> {
    ctx.auth.init().await;
    match ctx.auth.current_user() {
        Some(user) => print_user(user),
        None => println!("Not logged in. Use: nova login <username>"),
    }
    Ok(())
}

pub async fn refresh(ctx: &mut AppContext) -> Result<(), Box<dyn Error>> {
    ctx.auth.refresh().await?;
    println!("✅ Access token refreshed");
    Ok(())
}

pub async fn update_profile(ctx: &mut AppContext, patch: ProfilePatch) -> Result<(), Box<dyn Error>> {
    if patch.is_empty() {
        return Err("Nothing to update; pass --first-name, --last-name or --bio".into());
    }
    ctx.require_chat_access().await?;
    let user = ctx.auth.update_profile(&patch).await?;
    println!("✅ Profile updated");
    print_user(user);
    Ok(())
}
