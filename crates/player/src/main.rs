//! RPG Game Player - terminal client.
//!
//! Renders the reconciled snapshot as text and turns stdin lines into
//! commands. Plain lines select an option (or answer the active prompt);
//! lines starting with `/` are client commands, see `/help`.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rpggame_player::infrastructure::platform::{EnvAuthProvider, StaticAuthProvider, SystemClock};
use rpggame_player::infrastructure::websocket::TungsteniteConnector;
use rpggame_player::ports::outbound::{ApplyError, AuthProvider, UpdateObserver};
use rpggame_player::state::{ActionMenu, Section};
use rpggame_player::{ClientConfig, ClientError, ClientEvent, ClientHandle, SessionService, Snapshot};
use rpggame_shared::ServerUpdate;

const NO_TOKEN: &str = "No session token: set GAME_TOKEN or pass one as the first argument";

const HELP: &str = "\
  <key>            select an option (or answer the prompt)
  /auto on|off     toggle auto-hunt
  /items, /skills  open a combat sub-menu; /close closes it
  /expand <id>     expand or collapse a message group
  /connect         reconnect with the current token
  /disconnect      leave the session
  /quit            exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't interleave with the game text
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rpggame_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting RPG Game Player");

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    tracing::info!(server = %config.server_url, "Loaded configuration");

    // A token on the command line wins over GAME_TOKEN
    let auth: Arc<dyn AuthProvider> = match std::env::args().nth(1) {
        Some(token) => Arc::new(StaticAuthProvider::new(Some(token))),
        None => Arc::new(EnvAuthProvider::default()),
    };

    let (service, handle) = SessionService::new(
        config,
        Arc::new(TungsteniteConnector::new()),
        auth,
        Arc::new(SystemClock),
    );
    let service = service.with_observer(Box::new(TerminalView::default()));
    let session = tokio::spawn(service.run());

    handle.events().subscribe(print_event).await;
    handle.connect().context(NO_TOKEN)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match TerminalInput::parse(&line) {
            TerminalInput::Empty => {}
            TerminalInput::Quit => break,
            TerminalInput::Help => println!("{HELP}"),
            TerminalInput::Unknown(cmd) => println!("Unknown command {cmd}; try /help"),
            TerminalInput::Meta(action) => {
                if let Some(notice) = action.run(&handle)? {
                    println!("{notice}");
                }
            }
            TerminalInput::Text(text) => {
                if handle.snapshot().input.prompt().is_some() {
                    handle.input(text)?;
                } else {
                    handle.select(text)?;
                }
            }
        }
    }

    handle.shutdown()?;
    session.await.context("Session loop panicked")?;
    tracing::info!("Goodbye");
    Ok(())
}

fn print_event(event: ClientEvent) {
    match event {
        ClientEvent::Connected => println!("-- connected --"),
        ClientEvent::Disconnected {
            code,
            reconnecting: true,
        } => println!("-- connection dropped ({code}), reconnecting --"),
        ClientEvent::Disconnected { .. } => println!("-- disconnected --"),
        ClientEvent::ConnectionLost => println!("-- connection lost; /connect to retry --"),
        ClientEvent::SessionEnded => println!("-- session ended --"),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum MetaAction {
    AutoHunt(bool),
    OpenMenu(ActionMenu),
    CloseMenu,
    Toggle(u64),
    Connect,
    Disconnect,
}

impl MetaAction {
    /// Returns a notice for the user when the action could not be taken.
    /// Only a stopped session loop is an error.
    fn run(self, handle: &ClientHandle) -> anyhow::Result<Option<&'static str>> {
        match self {
            MetaAction::AutoHunt(enabled) => handle.set_auto_hunt(enabled)?,
            MetaAction::OpenMenu(menu) => handle.open_action_menu(menu)?,
            MetaAction::CloseMenu => handle.close_action_menu()?,
            MetaAction::Toggle(id) => handle.toggle_group(id)?,
            MetaAction::Connect => match handle.connect() {
                Err(ClientError::NotAuthenticated) => return Ok(Some(NO_TOKEN)),
                result => result?,
            },
            MetaAction::Disconnect => handle.disconnect()?,
        }
        Ok(None)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TerminalInput {
    Empty,
    Quit,
    Help,
    Meta(MetaAction),
    Unknown(String),
    Text(String),
}

impl TerminalInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return TerminalInput::Empty;
        }
        let Some(meta) = line.strip_prefix('/') else {
            return TerminalInput::Text(line.to_string());
        };

        let mut parts = meta.split_whitespace();
        let action = match (parts.next(), parts.next()) {
            (Some("quit" | "exit"), _) => return TerminalInput::Quit,
            (Some("help"), _) => return TerminalInput::Help,
            (Some("auto"), Some("on")) => MetaAction::AutoHunt(true),
            (Some("auto"), Some("off")) => MetaAction::AutoHunt(false),
            (Some("items"), _) => MetaAction::OpenMenu(ActionMenu::Items),
            (Some("skills"), _) => MetaAction::OpenMenu(ActionMenu::Skills),
            (Some("close"), _) => MetaAction::CloseMenu,
            (Some("expand"), Some(id)) => match id.parse() {
                Ok(id) => MetaAction::Toggle(id),
                Err(_) => return TerminalInput::Unknown(line.to_string()),
            },
            (Some("connect"), _) => MetaAction::Connect,
            (Some("disconnect"), _) => MetaAction::Disconnect,
            _ => return TerminalInput::Unknown(line.to_string()),
        };
        TerminalInput::Meta(action)
    }
}

/// Prints what each update changed.
#[derive(Default)]
struct TerminalView {
    section: Option<Section>,
}

impl TerminalView {
    fn render(
        &mut self,
        out: &mut impl Write,
        update: &ServerUpdate,
        snapshot: &Snapshot,
    ) -> std::io::Result<()> {
        if self.section != Some(snapshot.active_section) {
            self.section = Some(snapshot.active_section);
            writeln!(out, "== {} ==", snapshot.active_section)?;
        }

        if snapshot.in_combat() {
            if let Some(combat) = &snapshot.combat {
                writeln!(
                    out,
                    "[turn {}] You {}/{} HP vs {} (lv {}) {}/{} HP",
                    combat.turn,
                    combat.player_hp,
                    combat.player_max_hp,
                    combat.monster_name,
                    combat.monster_level,
                    combat.monster_hp,
                    combat.monster_max_hp
                )?;
            }
            for message in update.messages().iter().filter(|m| !m.is_blank()) {
                writeln!(out, "  > {}", message.text)?;
            }
        } else if !update.messages().is_empty() {
            if let Some(group) = snapshot.history.latest() {
                writeln!(
                    out,
                    "#{} [{:?}] {}",
                    group.id,
                    group.headline,
                    group.arrived_at.format("%H:%M:%S")
                )?;
                for message in &group.messages {
                    writeln!(out, "  {}", message.text)?;
                }
            }
        }

        if let Some(prompt) = snapshot.input.prompt() {
            writeln!(out, "? {prompt}")?;
        } else if !update.is_push() {
            for option in snapshot.input.options() {
                let marker = if option.enabled { "" } else { " (unavailable)" };
                writeln!(out, "  [{}] {}{}", option.key, option.label, marker)?;
            }
        }
        out.flush()
    }
}

impl UpdateObserver for TerminalView {
    fn on_update(&mut self, update: &ServerUpdate, snapshot: &Snapshot) -> Result<(), ApplyError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.render(&mut out, update, snapshot)
            .map_err(|e| ApplyError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpggame_shared::{CombatView, GameMessage, MenuOption, MessageCategory};
    use rpggame_player::state::ActiveInput;

    #[test]
    fn test_parse_terminal_input() {
        assert_eq!(TerminalInput::parse("  "), TerminalInput::Empty);
        assert_eq!(TerminalInput::parse("3"), TerminalInput::Text("3".into()));
        assert_eq!(TerminalInput::parse("/quit"), TerminalInput::Quit);
        assert_eq!(
            TerminalInput::parse("/auto on"),
            TerminalInput::Meta(MetaAction::AutoHunt(true))
        );
        assert_eq!(
            TerminalInput::parse("/expand 12"),
            TerminalInput::Meta(MetaAction::Toggle(12))
        );
        assert!(matches!(
            TerminalInput::parse("/expand x"),
            TerminalInput::Unknown(_)
        ));
        assert!(matches!(
            TerminalInput::parse("/auto maybe"),
            TerminalInput::Unknown(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_without_token_is_a_notice() {
        let (_service, handle) = SessionService::new(
            ClientConfig::default(),
            Arc::new(TungsteniteConnector::new()),
            Arc::new(StaticAuthProvider::new(None)),
            Arc::new(SystemClock),
        );

        assert_eq!(MetaAction::Connect.run(&handle).unwrap(), Some(NO_TOKEN));
        assert_eq!(MetaAction::CloseMenu.run(&handle).unwrap(), None);
    }

    #[test]
    fn test_render_combat_update() {
        let snapshot = Snapshot {
            combat: Some(CombatView {
                turn: 3,
                monster_name: "Wolf".into(),
                ..Default::default()
            }),
            input: ActiveInput::Options(vec![MenuOption::new("1", "Attack")]),
            ..Default::default()
        };
        let update = ServerUpdate {
            messages: Some(vec![GameMessage::new("You bite back", MessageCategory::Damage)]),
            ..Default::default()
        };

        let mut out = Vec::new();
        let mut view = TerminalView::default();
        view.render(&mut out, &update, &snapshot).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("== hub =="));
        assert!(text.contains("[turn 3]"));
        assert!(text.contains("  > You bite back"));
        assert!(text.contains("[1] Attack"));
    }
}
