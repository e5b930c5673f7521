use super::*;
use std::path::Path;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn parse_chat(argv: &[&str]) -> ChatCommands {
        match parse_args(argv).command {
            Commands::Chat { command } => command,
            _ => panic!("expected chat subcommand for argv={argv:?}"),
        }
    }
}

use test_helpers::{parse_args, parse_chat};

#[test]
fn login_takes_username_and_optional_password() {
    match parse_args(&["nova", "login", "alice"]).command {
        Commands::Login { username, password } => {
            assert_eq!(username, "alice");
            assert_eq!(password, None);
        }
        _ => panic!("expected login"),
    }

    match parse_args(&["nova", "login", "alice", "--password", "pw123"]).command {
        Commands::Login { password, .. } => assert_eq!(password.as_deref(), Some("pw123")),
        _ => panic!("expected login"),
    }
}

#[test]
fn register_accepts_form_fields() {
    let argv = [
        "nova",
        "register",
        "alice",
        "--email",
        "alice@example.com",
        "--first-name",
        "Alice",
    ];
    match parse_args(&argv).command {
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            assert_eq!(username, "alice");
            assert_eq!(email.as_deref(), Some("alice@example.com"));
            assert_eq!(first_name.as_deref(), Some("Alice"));
            assert_eq!(last_name, None);
            assert_eq!(password, None);
        }
        _ => panic!("expected register for argv={argv:?}"),
    }
}

#[test]
fn profile_set_collects_patch_fields() {
    match parse_args(&["nova", "profile", "set", "--bio", "Rustacean"]).command {
        Commands::Profile {
            command:
                ProfileCommands::Set {
                    first_name,
                    last_name,
                    bio,
                },
        } => {
            assert_eq!(first_name, None);
            assert_eq!(last_name, None);
            assert_eq!(bio.as_deref(), Some("Rustacean"));
        }
        _ => panic!("expected profile set"),
    }
}

#[test]
fn chat_send_joins_words_and_collects_files() {
    match parse_chat(&[
        "nova", "chat", "send", "what", "is", "this", "--file", "a.png", "-f", "b.txt",
    ]) {
        ChatCommands::Send { text, files } => {
            assert_eq!(text.join(" "), "what is this");
            assert_eq!(files, vec![PathBuf::from("a.png"), PathBuf::from("b.txt")]);
        }
        _ => panic!("expected chat send"),
    }

    match parse_chat(&["nova", "chat", "send", "--file", "scan.pdf"]) {
        ChatCommands::Send { text, files } => {
            assert!(text.is_empty());
            assert_eq!(files.len(), 1);
        }
        _ => panic!("expected chat send"),
    }
}

#[test]
fn chat_share_and_export_flags() {
    assert!(matches!(
        parse_chat(&["nova", "chat", "share"]),
        ChatCommands::Share { message_id: None }
    ));
    match parse_chat(&["nova", "chat", "share", "--message", "m1"]) {
        ChatCommands::Share { message_id } => assert_eq!(message_id.as_deref(), Some("m1")),
        _ => panic!("expected chat share"),
    }
    match parse_chat(&["nova", "chat", "export", "out.txt", "--force"]) {
        ChatCommands::Export { path, force } => {
            assert_eq!(path, Path::new("out.txt"));
            assert!(force);
        }
        _ => panic!("expected chat export"),
    }
}

#[test]
fn session_management_subcommands_parse() {
    assert!(matches!(parse_chat(&["nova", "chat", "new"]), ChatCommands::New));
    assert!(matches!(parse_chat(&["nova", "chat", "list"]), ChatCommands::List));
    assert!(matches!(parse_chat(&["nova", "chat", "clear"]), ChatCommands::Clear));
    assert!(matches!(parse_chat(&["nova", "chat", "history"]), ChatCommands::History));
    assert!(matches!(
        parse_chat(&["nova", "chat", "open", "abc"]),
        ChatCommands::Open { id } if id == "abc"
    ));
    assert!(matches!(
        parse_chat(&["nova", "chat", "delete", "abc"]),
        ChatCommands::Delete { id } if id == "abc"
    ));
    assert!(matches!(
        parse_chat(&["nova", "chat", "regenerate", "m9"]),
        ChatCommands::Regenerate { message_id } if message_id == "m9"
    ));
}

#[test]
fn missing_required_arguments_are_rejected() {
    for argv in [
        &["nova"][..],
        &["nova", "login"][..],
        &["nova", "chat"][..],
        &["nova", "chat", "open"][..],
        &["nova", "chat", "export"][..],
    ] {
        assert!(
            Args::try_parse_from(argv).is_err(),
            "argv={argv:?} should be rejected"
        );
    }
}

#[test]
fn config_init_flag() {
    assert!(matches!(
        parse_args(&["nova", "config"]).command,
        Commands::Config { init: false }
    ));
    assert!(matches!(
        parse_args(&["nova", "config", "--init"]).command,
        Commands::Config { init: true }
    ));
}
