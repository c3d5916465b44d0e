use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use minddy_cabinet::panels::publish::{can_publish, requirements};
use minddy_cabinet::panels::ChatEntry;
use minddy_cabinet::{Cabinet, CabinetError, LoginView, Tab, View};
use minddy_core::{FileSessionStore, FullProfile, IdentityAssertion, MinddyConfig, Role, SuggestField};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Minddy psychologist cabinet", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "minddy.toml")]
    config: String,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "PUBLIC_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in with a Telegram login widget payload
    Login {
        /// JSON file with the widget payload, or `-` for stdin
        #[arg(long, conflicts_with = "dev")]
        assertion: Option<PathBuf>,

        /// Use the development assertion accepted by a local backend
        #[arg(long)]
        dev: bool,
    },

    /// Forget the stored session
    Logout,

    /// Show login state, tabs and publish readiness
    Status,

    /// Profile tab
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// AI-twin tab
    #[command(subcommand)]
    Persona(PersonaCommand),

    /// Publish the AI twin
    Publish,

    /// Withdraw the AI twin
    Unpublish {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Preview tab
    #[command(subcommand)]
    Chats(ChatCommand),
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        education: Option<String>,
        #[arg(long)]
        specializations: Option<String>,
        #[arg(long)]
        experience: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum PersonaCommand {
    Show,
    Set {
        #[arg(long)]
        greeting: Option<String>,
        /// System prompt
        #[arg(long)]
        instruction: Option<String>,
    },
    /// Replace the first questions, in order
    Questions { questions: Vec<String> },
    /// Generate a suggestion for greeting, system_prompt or questions
    Suggest {
        field: SuggestField,
        /// Save the suggestion right away
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ChatCommand {
    List,
    New {
        #[arg(long)]
        title: Option<String>,
    },
    Show { chat_id: String },
    Delete {
        chat_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    Send { chat_id: String, message: String },
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match MinddyConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
        if let Err(e) = config.validate() {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    // Logs go to stderr so command output stays clean
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut cabinet = Cabinet::from_config(&config)?;
    tracing::debug!(api = %cabinet.api().base_url(), "Cabinet started");

    if let Err(e) = run(&mut cabinet, cli.command).await {
        if let Some(alert) = e.alert() {
            eprintln!("{}", alert);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cabinet: &mut Cabinet<FileSessionStore>, command: Commands) -> Result<(), CabinetError> {
    match command {
        Commands::Login { assertion, dev } => {
            let assertion = match read_assertion(assertion, dev) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("Failed to read identity assertion: {}", e);
                    std::process::exit(1);
                }
            };
            let (widget, view) = LoginView::open();
            widget.emit(assertion).ok();
            cabinet.login_with(view).await?;
            print_status(cabinet);
        }
        Commands::Logout => {
            cabinet.restore().await;
            cabinet.logout();
            println!("Logged out");
        }
        Commands::Status => {
            cabinet.restore().await;
            print_status(cabinet);
        }
        Commands::Profile(cmd) => {
            require_login(cabinet).await?;
            cabinet.select_tab(Tab::Profile)?;
            run_profile(cabinet, cmd).await?;
        }
        Commands::Persona(cmd) => {
            require_login(cabinet).await?;
            cabinet.select_tab(Tab::Persona)?;
            run_persona(cabinet, cmd).await?;
        }
        Commands::Publish => {
            require_login(cabinet).await?;
            cabinet.select_tab(Tab::Publish)?;
            let panel = cabinet.publish_panel()?;
            let updated = match cabinet.profile() {
                Some(profile) => panel.publish(profile).await?,
                None => return Err(CabinetError::NotAuthenticated),
            };
            let url = panel.status(&updated).share_url;
            cabinet.apply(updated);
            println!("Опубликовано");
            if let Some(url) = url {
                println!("{}", url);
            }
        }
        Commands::Unpublish { yes } => {
            if !yes && !confirm(UNPUBLISH_PROMPT) {
                return Ok(());
            }
            require_login(cabinet).await?;
            cabinet.select_tab(Tab::Publish)?;
            let updated = cabinet.publish_panel()?.unpublish().await?;
            cabinet.apply(updated);
            println!("Не опубликовано");
        }
        Commands::Chats(cmd) => {
            require_login(cabinet).await?;
            cabinet.select_tab(Tab::Preview)?;
            run_chats(cabinet, cmd).await?;
        }
    }
    Ok(())
}

async fn require_login(cabinet: &mut Cabinet<FileSessionStore>) -> Result<(), CabinetError> {
    if cabinet.restore().await {
        Ok(())
    } else {
        Err(CabinetError::NotAuthenticated)
    }
}

const UNPUBLISH_PROMPT: &str = "Вы уверены? Клиенты больше не смогут использовать эту ссылку.";
const DELETE_CHAT_PROMPT: &str = "Удалить этот чат?";

/// Ask on stderr, read the answer from stdin. Anything but yes declines.
fn confirm(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush().ok();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да")
}

fn read_assertion(path: Option<PathBuf>, dev: bool) -> anyhow::Result<IdentityAssertion> {
    if dev {
        return Ok(IdentityAssertion::dev());
    }
    let raw = match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(&p)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

// ============================================================================
// Tabs
// ============================================================================

async fn run_profile(
    cabinet: &mut Cabinet<FileSessionStore>,
    cmd: ProfileCommand,
) -> Result<(), CabinetError> {
    let mut editor = cabinet.profile_editor()?;
    match cmd {
        ProfileCommand::Show => {}
        ProfileCommand::Set {
            display_name,
            bio,
            education,
            specializations,
            experience,
        } => {
            let draft = editor.draft_mut();
            let fields = [
                (&mut draft.display_name, display_name),
                (&mut draft.bio, bio),
                (&mut draft.education, education),
                (&mut draft.specializations, specializations),
                (&mut draft.experience, experience),
            ];
            for (slot, value) in fields {
                if let Some(value) = value {
                    *slot = value;
                }
            }
            let updated = match cabinet.profile() {
                Some(profile) => editor.save(profile).await?,
                None => return Err(CabinetError::NotAuthenticated),
            };
            cabinet.apply(updated);
            println!("Сохранено");
        }
    }

    let draft = cabinet.profile_editor()?.draft().clone();
    println!("Имя:            {}", draft.display_name);
    println!("О себе:         {}", draft.bio);
    println!("Образование:    {}", draft.education);
    println!("Специализации:  {}", draft.specializations);
    println!("Опыт:           {}", draft.experience);
    Ok(())
}

async fn run_persona(
    cabinet: &mut Cabinet<FileSessionStore>,
    cmd: PersonaCommand,
) -> Result<(), CabinetError> {
    let editor = cabinet.persona_editor()?;
    let save = match cmd {
        PersonaCommand::Show => false,
        PersonaCommand::Set {
            greeting,
            instruction,
        } => {
            if let Some(greeting) = greeting {
                editor.set_greeting(greeting);
            }
            if let Some(instruction) = instruction {
                editor.set_system_prompt(instruction);
            }
            true
        }
        PersonaCommand::Questions { questions } => {
            editor.set_questions(questions);
            true
        }
        PersonaCommand::Suggest { field, save } => {
            editor.suggest(field).await?;
            save
        }
    };

    if save {
        let updated = match cabinet.profile() {
            Some(profile) => editor.save(profile).await?,
            None => return Err(CabinetError::NotAuthenticated),
        };
        cabinet.apply(updated);
        println!("Сохранено");
    }

    let draft = editor.draft();
    println!("Приветствие:\n  {}", draft.greeting);
    println!("Системный промпт:\n  {}", draft.system_prompt);
    println!("Первые вопросы:");
    for (i, question) in draft.questions.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
    Ok(())
}

async fn run_chats(
    cabinet: &mut Cabinet<FileSessionStore>,
    cmd: ChatCommand,
) -> Result<(), CabinetError> {
    let preview = cabinet.chat_preview()?;
    preview.load_chats().await?;

    match cmd {
        ChatCommand::List => {
            let chats = preview.chats();
            if chats.is_empty() {
                println!("Нет тестовых чатов");
            }
            for chat in chats {
                println!(
                    "{}  {}  {}",
                    chat.id,
                    chat.updated_at.format("%d.%m.%Y"),
                    chat.title
                );
            }
        }
        ChatCommand::New { title } => {
            let chat = preview.create_chat(title.as_deref()).await?;
            println!("{}  {}", chat.id, chat.title);
        }
        ChatCommand::Show { chat_id } => {
            preview.select_chat(&chat_id).await?;
            print_entries(&preview.entries());
        }
        ChatCommand::Delete { chat_id, yes } => {
            if !yes && !confirm(DELETE_CHAT_PROMPT) {
                return Ok(());
            }
            preview.delete_chat(&chat_id).await?;
            println!("Удалено");
        }
        ChatCommand::Send { chat_id, message } => {
            preview.select_chat(&chat_id).await?;
            let result = preview.send(&message).await;
            print_entries(&preview.entries());
            result?;
        }
    }
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_status(cabinet: &Cabinet<FileSessionStore>) {
    match cabinet.view() {
        View::Loading => println!("Загрузка..."),
        View::Login { error } => {
            println!("Не авторизован");
            if let Some(error) = error {
                println!("{}", error);
            }
        }
        View::Panel { tab } => {
            println!("{}", cabinet.display_name().unwrap_or_default());
            for t in Tab::ALL {
                let marker = if t == tab { "*" } else { " " };
                println!("{} {} ({})", marker, t.label(), t.id());
            }
            if let Some(profile) = cabinet.profile() {
                print_publish_readiness(profile);
            }
        }
    }
}

fn print_publish_readiness(profile: &FullProfile) {
    println!();
    println!(
        "{}",
        if profile.is_published() {
            "Опубликовано"
        } else {
            "Не опубликовано"
        }
    );
    for req in requirements(profile) {
        let mark = if req.satisfied { "[x]" } else { "[ ]" };
        let optional = if req.optional { " (опционально)" } else { "" };
        println!("{} {}{}", mark, req.label, optional);
    }
    if !profile.is_published() && !can_publish(profile) {
        println!("Заполните приветствие и системный промпт перед публикацией");
    }
}

fn print_entries(entries: &[ChatEntry]) {
    if entries.is_empty() {
        println!("Начните диалог с вашим AI-двойником");
    }
    for entry in entries {
        let who = match entry.role() {
            Role::User => "Вы",
            Role::Assistant => "AI",
        };
        let pending = if entry.is_pending() { " …" } else { "" };
        println!("{}: {}{}", who, entry.content(), pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  Да "));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("nope"));
    }

    #[test]
    fn test_destructive_commands_accept_yes_flag() {
        let cli = Cli::try_parse_from(["minddy-cabinet", "unpublish", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::Unpublish { yes: true }));

        let cli = Cli::try_parse_from(["minddy-cabinet", "chats", "delete", "chat-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Chats(ChatCommand::Delete { yes: false, .. })
        ));
    }
}
