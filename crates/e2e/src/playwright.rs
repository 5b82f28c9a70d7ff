//! Playwright browser automation
//!
//! A [`PlaywrightDriver`] owns one Node process running a generated session
//! script. Commands go to the script as JSON lines on stdin and each one is
//! answered by exactly one JSON line on stdout, so every operation of a
//! scenario acts on the same page.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::support::PageDriver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Relative navigation targets resolve against this
    pub base_url: String,
    pub browser: Browser,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    /// Upper bound for each wait, click or fill inside the browser
    pub action_timeout_ms: u64,
    pub node_binary: PathBuf,
    /// Directory `playwright` is resolved from (its `node_modules`)
    pub working_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: Browser::Chromium,
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            action_timeout_ms: 10_000,
            node_binary: PathBuf::from("node"),
            working_dir: PathBuf::from("."),
        }
    }
}

/// A single request to the session script
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum SessionCommand<'a> {
    Navigate { url: &'a str },
    CheckUrl { fragment: &'a str },
    CheckSelectorContent { selector: &'a str, expected: &'a str },
    Click { selector: &'a str },
    Fill { selector: &'a str, value: &'a str },
    Close,
}

impl SessionCommand<'_> {
    fn name(&self) -> String {
        match self {
            SessionCommand::Navigate { url } => format!("navigate:{}", url),
            SessionCommand::CheckUrl { fragment } => format!("check_url:{}", fragment),
            SessionCommand::CheckSelectorContent { selector, .. } => format!("check_content:{}", selector),
            SessionCommand::Click { selector } => format!("click:{}", selector),
            SessionCommand::Fill { selector, .. } => format!("fill:{}", selector),
            SessionCommand::Close => "close".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionReply {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SessionReply {
    fn into_result(self, command: &str) -> E2eResult<()> {
        if self.ok {
            return Ok(());
        }

        let reason = self.error.unwrap_or_else(|| "unknown error".to_string());
        match self.kind.as_deref() {
            Some("assertion") => Err(E2eError::AssertionFailed(reason)),
            Some("timeout") => Err(E2eError::Timeout(format!("{} ({})", command, reason))),
            _ => Err(E2eError::Playwright(format!("{} failed: {}", command, reason))),
        }
    }
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Session {
    async fn read_reply(&mut self) -> E2eResult<SessionReply> {
        loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                E2eError::Playwright("session script exited unexpectedly".to_string())
            })?;

            // Anything that is not a reply object is stray output from node
            if !line.trim_start().starts_with('{') {
                debug!("[playwright] {}", line);
                continue;
            }

            return Ok(serde_json::from_str(&line)?);
        }
    }
}

/// [`PageDriver`] backed by a live Playwright browser session
pub struct PlaywrightDriver {
    session: Mutex<Session>,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start a browser and wait until its first page is open
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("session.js");
        std::fs::write(&script_path, build_session_script(&config)?)?;

        info!(
            "Launching {} session against {}",
            config.browser.as_str(),
            config.base_url
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("session stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("session stdout unavailable".to_string()))?;

        let mut session = Session {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };
        session.read_reply().await?.into_result("launch")?;

        Ok(Self {
            session: Mutex::new(session),
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn send(&self, command: SessionCommand<'_>) -> E2eResult<()> {
        let name = command.name();
        debug!("Executing command: {}", name);

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');

        let mut session = self.session.lock().await;
        session.stdin.write_all(line.as_bytes()).await?;
        session.stdin.flush().await?;
        session.read_reply().await?.into_result(&name)
    }

    /// Close the browser and wait for the session process to exit
    pub async fn close(self) -> E2eResult<()> {
        self.send(SessionCommand::Close).await?;

        let mut session = self.session.into_inner();
        let status = session.child.wait().await?;
        if !status.success() {
            warn!("Playwright session exited with {}", status);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.send(SessionCommand::Navigate { url }).await
    }

    async fn check_url(&self, fragment: &str) -> E2eResult<()> {
        self.send(SessionCommand::CheckUrl { fragment }).await
    }

    async fn check_selector_content(&self, selector: &str, expected: &str) -> E2eResult<()> {
        self.send(SessionCommand::CheckSelectorContent { selector, expected })
            .await
    }

    async fn click_selector(&self, selector: &str) -> E2eResult<()> {
        self.send(SessionCommand::Click { selector }).await
    }

    async fn input_selector_value(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.send(SessionCommand::Fill { selector, value }).await
    }
}

/// Build the Node script that hosts the browser session
pub fn build_session_script(config: &PlaywrightConfig) -> E2eResult<String> {
    Ok(format!(
        r#"
const readline = require('readline');
const {{ chromium, firefox, webkit }} = require(require.resolve('playwright', {{ paths: [process.cwd()] }}));

const baseUrl = {base_url};
const actionTimeout = {timeout};

class AssertionError extends Error {{}}

function reply(message) {{
  process.stdout.write(JSON.stringify(message) + '\n');
}}

async function textOf(page, selector) {{
  const handle = await page.$(selector);
  if (!handle) return null;
  const text = await handle.textContent();
  return text === null ? null : text.trim();
}}

async function run(page, cmd) {{
  switch (cmd.command) {{
    case 'navigate':
      await page.goto(new URL(cmd.url, baseUrl).href);
      return;
    case 'check_url':
      try {{
        await page.waitForURL((url) => url.href.includes(cmd.fragment), {{ timeout: actionTimeout }});
      }} catch (error) {{
        throw new AssertionError(`expected URL containing '${{cmd.fragment}}', got '${{page.url()}}'`);
      }}
      return;
    case 'check_selector_content':
      try {{
        await page.waitForFunction(
          ([selector, expected]) => {{
            const el = document.querySelector(selector);
            return el !== null && el.textContent.trim() === expected;
          }},
          [cmd.selector, cmd.expected],
          {{ timeout: actionTimeout }},
        );
      }} catch (error) {{
        const actual = await textOf(page, cmd.selector);
        throw new AssertionError(`expected '${{cmd.selector}}' to read '${{cmd.expected}}', found ${{JSON.stringify(actual)}}`);
      }}
      return;
    case 'click':
      await page.click(cmd.selector, {{ timeout: actionTimeout }});
      return;
    case 'fill':
      await page.fill(cmd.selector, cmd.value, {{ timeout: actionTimeout }});
      return;
    default:
      throw new Error(`unknown command '${{cmd.command}}'`);
  }}
}}

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  reply({{ ok: true }});

  const lines = readline.createInterface({{ input: process.stdin }});
  for await (const line of lines) {{
    if (!line.trim()) continue;
    const cmd = JSON.parse(line);

    if (cmd.command === 'close') {{
      await browser.close();
      reply({{ ok: true }});
      process.exit(0);
    }}

    try {{
      await run(page, cmd);
      reply({{ ok: true }});
    }} catch (error) {{
      const kind = error instanceof AssertionError
        ? 'assertion'
        : (error.name === 'TimeoutError' ? 'timeout' : 'error');
      reply({{ ok: false, kind, error: error.message }});
    }}
  }}

  await browser.close();
}})().catch((error) => {{
  reply({{ ok: false, kind: 'error', error: error.message }});
  process.exit(1);
}});
"#,
        base_url = serde_json::to_string(&config.base_url)?,
        timeout = config.action_timeout_ms,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    ))
}
