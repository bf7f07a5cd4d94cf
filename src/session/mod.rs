//! Session Protocol Engine
//!
//! A [`Session`] owns one ISOTROPY process and speaks its console protocol:
//! every command is preceded by reading the pending `*` prompt, displays are
//! read until a blank or prompt line, and database sub-prompts are answered
//! automatically. The session mirrors the engine's remembered values and
//! shows so it can skip redundant commands and rebuild state after a restart.

mod options;
pub mod prompts;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use uuid::Uuid;

use crate::command::EngineCommand;
use crate::config::{Config, ProtocolConfig};
use crate::engine::{read_checked_line, Launcher, ProcessLauncher, SignatureTable, Transport};
use crate::error::{Error, Result};
use crate::mirror::{ShowSet, ValueMap};
use crate::parser::{parse_block, Record};

pub use options::SessionOptions;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Starting,
    Ready,
    AwaitingResponse,
    Restarting,
    Closed,
}

/// Snapshot of session bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub state: SessionState,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub restarts: u32,
    pub commands_sent: u64,
}

/// One live ISOTROPY console
pub struct Session<L: Launcher> {
    id: Uuid,
    launcher: L,
    protocol: ProtocolConfig,
    signatures: &'static SignatureTable,
    shutdown_grace: Duration,
    transport: Option<L::Transport>,
    state: SessionState,
    /// The engine has printed (or will print) a prompt nobody has read yet
    prompt_pending: bool,
    values: ValueMap,
    shows: ShowSet,
    settings: Vec<String>,
    started_at: DateTime<Utc>,
    restarts: u32,
    commands_sent: u64,
}

impl Session<ProcessLauncher> {
    /// Open a session on the real engine described by `config`
    pub async fn open_with_config(config: &Config, options: SessionOptions) -> Result<Self> {
        let options = options.shutdown_grace(Duration::from_millis(config.engine.shutdown_grace_ms));
        Self::open(
            ProcessLauncher::new(config.engine.clone()),
            config.protocol.clone(),
            options,
        )
        .await
    }
}

impl<L: Launcher> Session<L> {
    /// Launch the engine, configure the console and apply `options`
    pub async fn open(launcher: L, protocol: ProtocolConfig, options: SessionOptions) -> Result<Self> {
        let settings = if options.settings.is_empty() {
            protocol.default_settings.clone()
        } else {
            options.settings
        };

        let mut values = ValueMap::new();
        for (key, value) in &options.values {
            values.set(key, value.as_str());
        }
        let mut shows = ShowSet::new();
        for name in &options.shows {
            shows.add(name);
        }

        let mut session = Self {
            id: Uuid::new_v4(),
            launcher,
            protocol,
            signatures: SignatureTable::shared(),
            shutdown_grace: options.shutdown_grace,
            transport: None,
            state: SessionState::Starting,
            prompt_pending: false,
            values,
            shows,
            settings,
            started_at: Utc::now(),
            restarts: 0,
            commands_sent: 0,
        };
        info!(
            "opening isotropy session {} using {}",
            session.id,
            session.launcher.describe()
        );
        session.start().await?;
        Ok(session)
    }

    /// Launch, wait for the ready banner, configure, replay mirrored state
    async fn start(&mut self) -> Result<()> {
        self.state = SessionState::Starting;
        let transport = self.launcher.launch().await?;
        self.transport = Some(transport);
        self.prompt_pending = false;
        self.started_at = Utc::now();

        loop {
            let line = self.read_line().await?;
            if line.trim_end() == self.protocol.ready_banner {
                break;
            }
        }
        self.prompt_pending = true;

        self.send_command(&EngineCommand::Screen(self.protocol.screen_width))
            .await?;
        self.send_command(&EngineCommand::Page(self.protocol.page_length.into()))
            .await?;
        for setting in self.settings.clone() {
            self.send_command(&EngineCommand::Setting(setting)).await?;
        }
        let replay: Vec<EngineCommand> = self
            .values
            .replay()
            .into_iter()
            .chain(self.shows.replay())
            .collect();
        for command in &replay {
            self.send_command(command).await?;
        }

        self.state = SessionState::Ready;
        Ok(())
    }

    fn transport(&mut self) -> Result<&mut L::Transport> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        self.transport.as_mut().ok_or(Error::SessionClosed)
    }

    async fn read_line(&mut self) -> Result<String> {
        let signatures = self.signatures;
        let transport = self.transport()?;
        read_checked_line(transport, signatures).await
    }

    fn is_sentinel(&self, line: &str) -> bool {
        line == self.protocol.prompt_sentinel
    }

    /// Consume the pending prompt, then write `command`
    ///
    /// The command's own output is not read.
    pub async fn send_command(&mut self, command: &EngineCommand) -> Result<()> {
        if self.prompt_pending {
            self.read_line().await?;
            self.prompt_pending = false;
        }
        let text = command.to_string();
        debug!(target: "isodrive::command", "{}", text);
        self.transport()?.write_line(&text).await?;
        self.prompt_pending = true;
        self.commands_sent += 1;
        Ok(())
    }

    // === Remote state mirror ===
    //
    // The mirror only changes once the command is written. Reading the
    // pending prompt can surface a fault left by the previous command, and
    // then nothing reached the engine.

    /// Set a value; returns whether a command was sent
    pub async fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<bool> {
        self.transport()?;
        let value = value.into();
        let Some(command) = self.values.set_command(key, &value) else {
            return Ok(false);
        };
        self.send_command(&command).await?;
        self.values.set(key, value);
        Ok(true)
    }

    /// Cancel a value that was previously set
    pub async fn delete_value(&mut self, key: &str) -> Result<()> {
        self.transport()?;
        let command = self.values.delete_command(key)?;
        self.send_command(&command).await?;
        self.values.delete(key)?;
        Ok(())
    }

    /// Cancel every value
    pub async fn clear_values(&mut self) -> Result<()> {
        self.transport()?;
        self.send_command(&EngineCommand::CancelValueAll).await?;
        self.values.clear_all();
        Ok(())
    }

    /// Set several values, returning how many commands were sent
    pub async fn update_values<I, K, V>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut sent = 0;
        for (key, value) in values {
            if self.set_value(key.as_ref(), value).await? {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Show a field; returns whether a command was sent
    pub async fn add_show(&mut self, name: &str) -> Result<bool> {
        self.transport()?;
        let Some(command) = self.shows.add_command(name) else {
            return Ok(false);
        };
        self.send_command(&command).await?;
        self.shows.add(name);
        Ok(true)
    }

    /// Stop showing a field; unknown names send nothing
    pub async fn remove_show(&mut self, name: &str) -> Result<bool> {
        self.transport()?;
        let Some(command) = self.shows.remove_command(name) else {
            return Ok(false);
        };
        self.send_command(&command).await?;
        self.shows.remove(name);
        Ok(true)
    }

    /// Cancel every show
    pub async fn clear_shows(&mut self) -> Result<()> {
        self.transport()?;
        self.send_command(&EngineCommand::CancelShowAll).await?;
        self.shows.clear_all();
        Ok(())
    }

    /// Show several fields, returning how many commands were sent
    pub async fn update_shows<I, S>(&mut self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sent = 0;
        for name in names {
            if self.add_show(name.as_ref()).await? {
                sent += 1;
            }
        }
        Ok(sent)
    }

    // === Displays ===

    /// Run `DISPLAY name` and return the raw response lines
    ///
    /// If the engine bombs and `restart_on_crash` is set, the session is
    /// restarted once and the display retried; a second crash propagates.
    pub async fn display_raw(&mut self, name: &str, delay: Option<Duration>) -> Result<Vec<String>> {
        match self.collect_display(name, delay).await {
            Err(Error::EngineCrashed) if self.protocol.restart_on_crash => {
                warn!("isotropy bombed during DISPLAY {}; restarting once", name);
                self.restart().await?;
                self.collect_display(name, delay).await
            }
            result => result,
        }
    }

    /// Run `DISPLAY name` and parse the response into records
    pub async fn display(&mut self, name: &str, delay: Option<Duration>) -> Result<Vec<Record>> {
        let lines = self.display_raw(name, delay).await?;
        Ok(parse_block(&lines))
    }

    async fn collect_display(&mut self, name: &str, delay: Option<Duration>) -> Result<Vec<String>> {
        self.send_command(&EngineCommand::Display(name.trim().to_string()))
            .await?;
        self.state = SessionState::AwaitingResponse;
        if let Some(delay) = delay {
            // the engine sometimes flushes late
            tokio::time::sleep(delay).await;
        }

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if self.is_sentinel(&line) {
                self.prompt_pending = false;
                break;
            }
            if line.is_empty() {
                break;
            }
            if let Some(prompt) = prompts::match_database_prompt(&line) {
                debug!("answering {} database prompt", prompt.name);
                match self.answer_database_prompt(prompt.preamble_lines).await? {
                    Some(first) => lines.push(first),
                    None => break,
                }
                continue;
            }
            lines.push(line);
        }

        self.state = SessionState::Ready;
        Ok(lines)
    }

    /// Skip the preamble, acknowledge, skip "Adding", then find the first
    /// result line within the scan limit
    ///
    /// Blank lines and prompts inside the scan window are passed over; the
    /// results often follow a prompt.
    async fn answer_database_prompt(&mut self, preamble_lines: usize) -> Result<Option<String>> {
        for _ in 0..preamble_lines {
            self.read_line().await?;
        }
        self.send_command(&EngineCommand::Acknowledge).await?;
        self.read_line().await?;

        for _ in 0..self.protocol.database_scan_limit {
            let line = self.read_line().await?;
            if self.is_sentinel(&line) {
                self.prompt_pending = false;
                continue;
            }
            if !line.is_empty() {
                debug!("moved past data base prompt, adding results");
                // the results end like any display, with a prompt to follow
                self.prompt_pending = true;
                return Ok(Some(line));
            }
        }
        debug!("moved past data base prompt, no results");
        Ok(None)
    }

    // === Lifecycle ===

    /// Best-effort `QUIT`; a dead engine is not an error here
    async fn quit(&mut self) {
        if let Err(e) = self.send_command(&EngineCommand::Quit).await {
            debug!("ignoring {} while quitting", e);
            if let Ok(transport) = self.transport() {
                if let Err(e) = transport.write_line(&EngineCommand::Quit.to_string()).await {
                    debug!("ignoring {} while quitting", e);
                }
            }
        }
    }

    /// Tear down the engine and start a fresh one with the same state
    pub async fn restart(&mut self) -> Result<()> {
        self.transport()?;
        warn!("restarting isotropy session {}", self.id);
        self.state = SessionState::Restarting;

        self.quit().await;
        if let Some(mut transport) = self.transport.take() {
            transport.terminate(Duration::ZERO).await?;
        }
        self.launcher.remove_scratch_files()?;

        self.restarts += 1;
        self.start().await
    }

    /// Quit the engine, wait for it to exit and remove its scratch files
    ///
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.quit().await;
        self.state = SessionState::Closed;

        if let Some(mut transport) = self.transport.take() {
            transport.terminate(self.shutdown_grace).await?;
        }
        self.launcher.remove_scratch_files()?;
        info!(
            "closed isotropy session {} after {} commands",
            self.id, self.commands_sent
        );
        Ok(())
    }

    // === Accessors ===

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn shows(&self) -> &ShowSet {
        &self.shows
    }

    pub fn settings(&self) -> &[String] {
        &self.settings
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            state: self.state,
            pid: self.transport.as_ref().and_then(|t| t.pid()),
            started_at: self.started_at,
            restarts: self.restarts,
            commands_sent: self.commands_sent,
        }
    }
}

impl<L: Launcher> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("values", &self.values)
            .field("shows", &self.shows)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Dropping an open session only logs. The transport goes down with it (the
/// process transport kills its child on drop), but no `QUIT` is sent and
/// scratch files stay behind; call [`Session::close`] for an orderly end.
impl<L: Launcher> Drop for Session<L> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            warn!(
                "isotropy session {} dropped without close; scratch files are left in place",
                self.id
            );
        }
    }
}

/// Open a session, run `f` on it, and close it whether or not `f` succeeded
///
/// ```no_run
/// # async fn demo() -> isodrive::Result<()> {
/// use isodrive::{with_session, Config, ProcessLauncher, SessionOptions};
///
/// let config = Config::default();
/// let records = with_session(
///     ProcessLauncher::new(config.engine.clone()),
///     config.protocol.clone(),
///     SessionOptions::new().value("PARENT", 221).show("IRREP"),
///     |session| Box::pin(async move { session.display("IRREP", None).await }),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_session<L, T, F>(
    launcher: L,
    protocol: ProtocolConfig,
    options: SessionOptions,
    f: F,
) -> Result<T>
where
    L: Launcher,
    F: for<'a> FnOnce(&'a mut Session<L>) -> BoxFuture<'a, Result<T>>,
{
    let mut session = Session::open(launcher, protocol, options).await?;
    let result = f(&mut session).await;
    if let Err(e) = session.close().await {
        warn!("failed to close isotropy session {}: {}", session.id, e);
    }
    result
}
