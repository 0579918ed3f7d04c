//! Interactive SSH sessions to Cisco IOS devices.
//!
//! Network devices need a PTY-backed shell rather than `exec` channels: privileged mode,
//! paging and configuration mode are all properties of the interactive session. A
//! [`CliSession`] owns one such shell and releases it when dropped.

mod error;

pub use error::SessionError;

use regex_lite::Regex;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::device::{CommandChannel, Connector};
use crate::models::Credentials;

/// Per-read wait on the channel; the overall deadline is the session timeout
const POLL_INTERVAL_MS: u32 = 250;

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

fn generic_prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._\-/:@]+(\(config[^)]*\))?[>#]\s*$").expect("valid prompt regex")
    })
}

fn password_prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)password:\s*$").expect("valid password prompt regex"))
}

fn last_line(text: &str) -> &str {
    text.rsplit('\n').next().unwrap_or("").trim_end_matches('\r')
}

/// True when `line` is this device's prompt in exec, privileged or any config mode
fn matches_prompt(base: &str, line: &str) -> bool {
    let line = line.trim_end();
    let Some(rest) = line.strip_prefix(base) else {
        return false;
    };
    let Some(mode) = rest.strip_suffix('#').or_else(|| rest.strip_suffix('>')) else {
        return false;
    };
    mode.is_empty() || (mode.starts_with("(config") && mode.ends_with(')'))
}

fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "")
}

/// Raw channel output, tracking where its last line starts
#[derive(Default)]
struct OutputBuffer {
    bytes: Vec<u8>,
    line_start: usize,
}

impl OutputBuffer {
    fn push(&mut self, chunk: &[u8]) {
        if let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') {
            self.line_start = self.bytes.len() + pos + 1;
        }
        self.bytes.extend_from_slice(chunk);
    }

    /// Last, possibly partial, line without carriage returns
    fn tail(&self) -> String {
        String::from_utf8_lossy(&self.bytes[self.line_start..]).replace('\r', "")
    }

    fn into_text(self) -> String {
        normalize(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Command output without the echoed command line and the trailing prompt
fn strip_echo(output: &str, command: &str) -> String {
    let mut lines: Vec<&str> = output.lines().collect();
    lines.pop();
    if lines.first().is_some_and(|l| l.contains(command)) {
        lines.remove(0);
    }
    lines.join("\n")
}

/// Send `lines` through config mode with `run`, stopping at the first rejected line.
/// Once config mode is entered, `end` is sent on the rejection path too.
fn run_config_set<F>(lines: &[String], mut run: F) -> Result<String, SessionError>
where
    F: FnMut(&str) -> Result<String, SessionError>,
{
    let mut transcript = run("configure terminal")?;

    for line in lines {
        let output = run(line)?;
        if crate::parsers::check_rejected(&output).is_err() {
            // Leave config mode; earlier lines stay applied
            let _ = run("end");
            return Err(SessionError::ConfigRejected {
                line: line.clone(),
                output: output.trim().to_string(),
            });
        }
        transcript.push('\n');
        transcript.push_str(&output);
    }

    transcript.push('\n');
    transcript.push_str(&run("end")?);
    Ok(transcript)
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
/// Returns the authenticated Session. Blocking, so call from a spawn_blocking context.
pub fn ssh_connect(
    host: &str,
    port: u16,
    user: &str,
    pass: &str,
    timeout: Duration,
) -> Result<ssh2::Session, SessionError> {
    let target = format!("{}:{}", host, port);
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|_| SessionError::InvalidAddress(target.clone()))?
        .next()
        .ok_or_else(|| SessionError::InvalidAddress(target.clone()))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(SessionError::Connect)?;
    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new().map_err(SessionError::Channel)?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session.handshake().map_err(SessionError::Handshake)?;

    // Try password auth first
    match session.userauth_password(user, pass) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    // Fall back to keyboard-interactive (some IOS AAA configs only offer this)
    let mut prompter = PasswordPrompt {
        password: pass.to_string(),
    };
    let _ = session.userauth_keyboard_interactive(user, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err(SessionError::AuthenticationRejected)
    }
}

/// CliSession is an authenticated, privileged IOS shell on one device
pub struct CliSession {
    host: String,
    // Keeps the transport alive for the lifetime of the channel
    _session: ssh2::Session,
    channel: ssh2::Channel,
    timeout: Duration,
    /// Prompt line minus its trailing `>` / `#`, learned from the first prompt
    prompt_base: String,
    prompt: String,
}

impl CliSession {
    /// Connect, open a PTY shell, enter privileged mode and disable paging
    pub fn open(
        host: &str,
        port: u16,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let session = ssh_connect(host, port, &credentials.username, &credentials.password, timeout)?;
        session.set_timeout(POLL_INTERVAL_MS);

        let mut channel = session.channel_session().map_err(SessionError::Channel)?;
        channel
            .request_pty("vt100", None, Some((511, 24, 0, 0)))
            .map_err(SessionError::Channel)?;
        channel.shell().map_err(SessionError::Channel)?;

        let mut cli = Self {
            host: host.to_string(),
            _session: session,
            channel,
            timeout,
            prompt_base: String::new(),
            prompt: String::new(),
        };

        let banner = cli.read_until(|line| generic_prompt_re().is_match(line))?;
        cli.set_prompt(last_line(&banner));

        cli.enable(&credentials.enable_secret)?;
        cli.send_command("terminal length 0")?;
        cli.send_command("terminal width 511")?;

        tracing::debug!("CLI session to {} ready at prompt {}", cli.host, cli.prompt);
        Ok(cli)
    }

    fn set_prompt(&mut self, line: &str) {
        let prompt = line.trim().to_string();
        let base = prompt
            .trim_end_matches(&['>', '#'][..])
            .split('(')
            .next()
            .unwrap_or_default()
            .to_string();
        self.prompt_base = base;
        self.prompt = prompt;
    }

    fn enable(&mut self, secret: &str) -> Result<(), SessionError> {
        if self.prompt.ends_with('#') {
            return Ok(());
        }

        self.write_line("enable")?;
        let output = self.read_until(|line| {
            password_prompt_re().is_match(line) || generic_prompt_re().is_match(line)
        })?;

        let output = if password_prompt_re().is_match(last_line(&output)) {
            self.write_line(secret)?;
            self.read_until(|line| {
                password_prompt_re().is_match(line) || generic_prompt_re().is_match(line)
            })?
        } else {
            output
        };

        let line = last_line(&output).trim().to_string();
        if line.ends_with('#') {
            self.set_prompt(&line);
            Ok(())
        } else {
            let reason = output
                .lines()
                .map(str::trim)
                .find(|l| l.starts_with('%'))
                .unwrap_or(line.as_str())
                .to_string();
            Err(SessionError::EnableRefused(reason))
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.channel
            .write_all(format!("{}\n", line).as_bytes())
            .map_err(SessionError::Io)?;
        self.channel.flush().map_err(SessionError::Io)
    }

    /// Read until `done` accepts the current last line or the session deadline passes
    fn read_until<F>(&mut self, done: F) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        let mut output = OutputBuffer::default();
        let mut chunk = [0u8; 4096];

        loop {
            match self.channel.read(&mut chunk) {
                Ok(0) if self.channel.eof() => return Err(SessionError::Closed),
                Ok(0) => {}
                Ok(n) => {
                    output.push(&chunk[..n]);
                    if done(&output.tail()) {
                        return Ok(output.into_text());
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                Err(e) => return Err(SessionError::Io(e)),
            }

            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    secs: self.timeout.as_secs(),
                    tail: output.tail(),
                });
            }
        }
    }

    fn run(&mut self, command: &str) -> Result<String, SessionError> {
        self.write_line(command)?;
        let base = self.prompt_base.clone();
        let output = self.read_until(|line| matches_prompt(&base, line))?;
        self.prompt = last_line(&output).trim().to_string();
        Ok(strip_echo(&output, command))
    }
}

impl CommandChannel for CliSession {
    fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        tracing::debug!("{} <- {}", self.host, command);
        self.run(command)
    }

    fn send_config_set(&mut self, lines: &[String]) -> Result<String, SessionError> {
        run_config_set(lines, |line| {
            tracing::debug!("{} <- (config) {}", self.host, line);
            self.run(line)
        })
    }
}

impl Drop for CliSession {
    fn drop(&mut self) {
        let _ = self.channel.write_all(b"exit\n");
        let _ = self.channel.send_eof();
        let _ = self.channel.close();
        let _ = self.channel.wait_close();
        tracing::debug!("CLI session to {} closed", self.host);
    }
}

/// SshConnector opens real CLI sessions over SSH
#[derive(Debug, Clone)]
pub struct SshConnector {
    port: u16,
    timeout: Duration,
}

impl SshConnector {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Connector for SshConnector {
    type Channel = CliSession;

    fn connect(&self, address: &str, credentials: &Credentials) -> Result<CliSession, SessionError> {
        CliSession::open(address, self.port, credentials, self.timeout)
    }
}
