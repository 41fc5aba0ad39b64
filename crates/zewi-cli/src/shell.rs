//! Interactive shell: one line, one command, all against the same session.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use zewi_core::{Credentials, Decision, ProfileUpdate, Session};

use crate::app::App;

/// Environment variable read instead of prompting for a password.
const PASSWORD_ENV: &str = "ZEWI_PASSWORD";

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true, disable_help_subcommand = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Log in (password is prompted or read from ZEWI_PASSWORD)
    Login {
        email: Option<String>,
        #[arg(long)]
        remember_me: bool,
    },
    /// Log out locally and on the server
    Logout,
    /// Show the current user
    Whoami,
    /// Show the full session state
    Status,
    /// Re-run the "who am I" check against the server
    Check,
    /// Update profile fields, e.g. `profile name=Alice theme=dark`
    Profile {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Ask the navigation guard about a path
    Open { path: String },
    /// List known routes and their policies
    Routes,
    /// Show available commands
    Help,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Parse one shell line. Empty lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|l| Some(l.command))
}

/// Parse `key=value` pairs. Values that parse as JSON keep their type,
/// everything else is a string.
pub fn parse_fields(fields: &[String]) -> Result<ProfileUpdate> {
    let mut update = ProfileUpdate::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .with_context(|| format!("Expected key=value, got '{}'", field))?;
        if key.is_empty() {
            anyhow::bail!("Empty field name in '{}'", field);
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        update = update.set(key, value);
    }
    Ok(update)
}

pub async fn run(app: &mut App) -> Result<()> {
    println!("zewi shell - type 'help' for commands");
    loop {
        print!("zewi> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(());
        }

        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(ShellCommand::Quit)) => return Ok(()),
            Ok(Some(command)) => {
                if let Err(e) = execute(app, command).await {
                    eprintln!("Error: {:#}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

pub async fn execute(app: &mut App, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Login { email, remember_me } => login(app, email, remember_me).await?,
        ShellCommand::Logout => {
            app.session.logout().await;
            println!("Logged out.");
        }
        ShellCommand::Whoami => {
            app.session.wait_until_initialized().await;
            print_user(&app.session.session());
        }
        ShellCommand::Status => {
            print_status(&app.session.session());
            if let Some(at) = app.snapshot_saved_at() {
                println!("snapshot from: {}", at);
            }
        }
        ShellCommand::Check => {
            app.session.check_auth().await;
            print_user(&app.session.session());
        }
        ShellCommand::Profile { fields } => {
            let update = parse_fields(&fields)?;
            let result = app.session.update_profile(update).await;
            match result.error {
                None => println!("Profile updated."),
                Some(message) => println!("Profile update failed: {}", message),
            }
        }
        ShellCommand::Open { path } => {
            let (route, decision) = app.guard.navigate(&app.routes, &path).await;
            match decision {
                Decision::Allow => println!("{} ({}): allowed", route.name, route.path),
                Decision::Redirect(to) => println!("{} ({}): redirect to {}", route.name, route.path, to),
                Decision::Block => println!("{} ({}): blocked", route.name, route.path),
            }
        }
        ShellCommand::Routes => {
            for route in app.routes.routes() {
                println!("{:<10} {:<12} {}", route.path, route.name, route.policy.label());
            }
            let fallback = app.routes.fallback();
            println!("{:<10} {:<12} {}", "*", fallback.name, fallback.policy.label());
        }
        ShellCommand::Help => {
            println!("login [email] [--remember-me]   log in");
            println!("logout                          log out");
            println!("whoami | status | check         inspect the session");
            println!("profile key=value...            update profile fields");
            println!("open <path>                     check navigation to a path");
            println!("routes                          list routes");
            println!("quit                            leave");
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

async fn login(app: &mut App, email: Option<String>, remember_me: bool) -> Result<()> {
    let email = match email.or_else(|| app.config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    let credentials = Credentials::new(email.clone(), password).remember_me(remember_me);
    let result = app.session.login(credentials).await;
    match result.error {
        None => {
            app.remember_email(&email);
            print_user(&app.session.session());
        }
        Some(message) => println!("Login failed: {}", message),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_user(session: &Session) {
    match session.current_user() {
        Some(user) if session.is_authenticated() => {
            println!("Logged in as {}", user.display_name());
            for (key, value) in user.fields() {
                println!("  {:<12} {}", key, value);
            }
        }
        _ => println!("Not logged in."),
    }
}

fn print_status(session: &Session) {
    println!("initialized:   {}", session.initialized);
    println!("authenticated: {}", session.is_authenticated());
    println!("loading:       {}", session.loading());
    println!(
        "user:          {}",
        session
            .current_user()
            .map(|u| u.display_name())
            .unwrap_or_else(|| "-".to_string())
    );
    if let Some(ref error) = session.error {
        println!("last error:    {}", error);
    }
}
