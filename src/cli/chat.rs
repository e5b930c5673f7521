use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::cli::context::AppContext;
use crate::core::chat::transcript::{format_message, ASSISTANT_LABEL};
use crate::core::chat::ChatController;
use crate::core::message::{ChatSession, Message};

fn print_session_line(session: &ChatSession, active: bool) {
    let marker = if active { "*" } else { " " };
    let updated = session.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    if session.preview.is_empty() {
        println!("{marker} {}  {}  [{updated}]", session.id, session.title);
    } else {
        println!(
            "{marker} {}  {}  [{updated}]\n      {}",
            session.id, session.title, session.preview
        );
    }
}

fn print_reply(message: &Message) {
    println!("{ASSISTANT_LABEL}: {}", message.response);
    if !message.artifacts().is_empty() {
        println!(
            "({} artifact(s); use `nova chat history` for the full transcript)",
            message.artifacts().len()
        );
    }
    println!("[message id: {}]", message.id);
}

pub fn list(ctx: &AppContext) {
    let controller = ctx.chat_controller();
    let sessions = controller.list_sessions();
    if sessions.is_empty() {
        println!("No conversations yet. Start one with: nova chat send <text>");
        return;
    }
    let active = controller.active_session().map(|session| session.id);
    for session in &sessions {
        print_session_line(session, active.as_deref() == Some(session.id.as_str()));
    }
}

pub fn new_session(ctx: &AppContext) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    let session = controller.new_session()?;
    ctx.remember_active(&controller);
    println!("✅ Started {} ({})", session.title, session.id);
    Ok(())
}

pub fn open(ctx: &AppContext, id: &str) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    if !controller.load_session(id) {
        ctx.remember_active(&controller);
        return Err(format!("No conversation with id '{id}'").into());
    }
    ctx.remember_active(&controller);
    print_history(&controller);
    Ok(())
}

pub fn history(ctx: &AppContext) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    if controller.active_session().is_none() {
        return Err("No active conversation; use `nova chat open <id>` first".into());
    }
    print_history(&controller);
    Ok(())
}

fn print_history(controller: &ChatController) {
    if let Some(session) = controller.active_session() {
        println!("# {}", session.title);
    }
    let messages = controller.messages();
    if messages.is_empty() {
        println!("(no messages yet)");
        return;
    }
    for message in &messages {
        println!();
        println!("{}", format_message(message, controller.user_label()));
        println!("[message id: {}]", message.id);
    }
}

pub async fn send(ctx: &AppContext, text: &str, files: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    controller.set_input(text);
    for path in files {
        let meta = controller
            .stage_path(path)
            .map_err(|err| format!("Cannot attach '{}': {err}", path.display()))?;
        tracing::debug!(name = %meta.name, size = meta.size, "Staged attachment");
    }
    let result = controller.send_pending().await;
    ctx.remember_active(&controller);
    print_reply(&result?);
    Ok(())
}

pub async fn regenerate(ctx: &AppContext, message_id: &str) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    let message = controller.regenerate_response(message_id).await?;
    print_reply(&message);
    Ok(())
}

pub fn share(ctx: &AppContext, message_id: Option<&str>) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    let copied = match message_id {
        Some(id) => controller.share_message(id)?,
        None => controller.share_session()?,
    };
    if copied {
        println!("📋 Copied to clipboard");
    } else {
        println!("Nothing to share");
    }
    Ok(())
}

pub fn export(ctx: &AppContext, path: &Path, overwrite: bool) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    match controller.export_to_file(path, overwrite)? {
        Some(pages) => println!("✅ Exported {pages} page(s) to {}", path.display()),
        None => println!("Nothing to export"),
    }
    Ok(())
}

pub fn clear(ctx: &AppContext) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    if controller.clear_active()? {
        println!("✅ Cleared the active conversation");
    } else {
        println!("No active conversation");
    }
    Ok(())
}

pub fn delete(ctx: &AppContext, id: &str) -> Result<(), Box<dyn Error>> {
    let controller = ctx.chat_controller();
    if !controller.delete_session(id)? {
        return Err(format!("No conversation with id '{id}'").into());
    }
    ctx.remember_active(&controller);
    println!("✅ Deleted {id}");
    Ok(())
}
