//! Operator prompts: credentials (never echoed) and the VLAN target.

use anyhow::{Context as _, Result};
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::env;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::models::{Credentials, VlanId, VlanTarget};

pub const USERNAME_ENV: &str = "SWITCH_USERNAME";
pub const PASSWORD_ENV: &str = "SWITCH_PASSWORD";
pub const ENABLE_SECRET_ENV: &str = "SWITCH_ENABLE_SECRET";

/// Restores the terminal settings captured before echo was turned off
struct EchoGuard {
    original: Termios,
}

impl EchoGuard {
    fn disable_echo() -> nix::Result<Self> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ECHONL);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &silent)?;
        Ok(Self { original })
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.original);
    }
}

/// Print `label` and read one line, without the trailing newline
pub fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("no input for prompt '{}'", label.trim());
    }
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Prompt on stderr and read from stdin. Secrets are read with echo off when stdin is a TTY.
pub fn ask(label: &str, secret: bool) -> Result<String> {
    let _guard = if secret && io::stdin().is_terminal() {
        match EchoGuard::disable_echo() {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!("Could not disable terminal echo: {}", e);
                None
            }
        }
    } else {
        None
    };

    read_answer(&mut io::stdin().lock(), &mut io::stderr(), label)
}

/// Build credentials from `lookup` (environment), asking for whatever is missing
pub fn credentials_with<L, A>(lookup: L, mut ask: A) -> Result<Credentials>
where
    L: Fn(&str) -> Option<String>,
    A: FnMut(&str, bool) -> Result<String>,
{
    let mut value = |key: &str, label: &str, secret: bool| -> Result<String> {
        match lookup(key).filter(|v| !v.is_empty()) {
            Some(v) => Ok(v),
            None => ask(label, secret),
        }
    };

    let username = value(USERNAME_ENV, "Enter Your UserName: ", true)?;
    let password = value(PASSWORD_ENV, "Enter Your Password: ", true)?;
    let enable_secret = value(ENABLE_SECRET_ENV, "Enter Your Enable Password: ", true)?;

    Credentials::new(username, password, enable_secret)
}

/// Credentials from SWITCH_* variables, else from the terminal
pub fn load_credentials() -> Result<Credentials> {
    credentials_with(|key| env::var(key).ok(), ask).context("credentials are required")
}

/// Resolve the VLAN target from flags, asking for whatever was not given
pub fn vlan_target_with<A>(id: Option<String>, name: Option<String>, mut ask: A) -> Result<VlanTarget>
where
    A: FnMut(&str) -> Result<String>,
{
    let id = match id {
        Some(id) => id,
        None => ask("Which VLAN do you want to check?: ")?,
    };
    let id: VlanId = id.parse()?;

    let name = match name {
        Some(name) => name,
        None => ask("VLAN name?: ")?,
    };
    Ok(VlanTarget::new(id, &name)?)
}

pub fn vlan_target(id: Option<String>, name: Option<String>) -> Result<VlanTarget> {
    vlan_target_with(id, name, |label| ask(label, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[test]
    fn test_read_answer_strips_newline() {
        let mut input = Cursor::new("admin\r\n".as_bytes());
        let mut output = Vec::new();
        let answer = read_answer(&mut input, &mut output, "User: ").unwrap();
        assert_eq!(answer, "admin");
        assert_eq!(output, b"User: ");
    }

    #[test]
    fn test_read_answer_eof_is_an_error() {
        let mut input = Cursor::new("".as_bytes());
        assert!(read_answer(&mut input, &mut Vec::new(), "User: ").is_err());
    }

    #[test]
    fn test_credentials_prefer_environment() {
        let env: HashMap<&str, &str> = [(USERNAME_ENV, "netops"), (PASSWORD_ENV, "pw")].into();
        let mut asked = Vec::new();
        let creds = credentials_with(
            |key| env.get(key).map(|v| v.to_string()),
            |label, secret| {
                asked.push((label.to_string(), secret));
                Ok("en".to_string())
            },
        )
        .unwrap();

        assert_eq!(creds.username, "netops");
        assert_eq!(creds.enable_secret, "en");
        assert_eq!(asked, vec![("Enter Your Enable Password: ".to_string(), true)]);
    }

    #[test]
    fn test_every_credential_prompt_is_silent() {
        let mut asked = Vec::new();
        credentials_with(
            |_| None,
            |label, secret| {
                asked.push((label.to_string(), secret));
                Ok("x".to_string())
            },
        )
        .unwrap();

        assert_eq!(asked.len(), 3);
        assert_eq!(asked[0].0, "Enter Your UserName: ");
        assert!(asked.iter().all(|(_, secret)| *secret));
    }

    #[test]
    fn test_empty_password_is_fatal() {
        let result = credentials_with(|_| None, |label, _| {
            Ok(if label.contains("UserName") { "admin".into() } else { String::new() })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_vlan_target_from_flags_and_prompts() {
        let target = vlan_target_with(Some("30".into()), Some("sales".into()), |_| {
            panic!("should not prompt")
        })
        .unwrap();
        assert_eq!(target.id.get(), 30);

        let mut answers = vec!["sales".to_string(), " 40 ".to_string()];
        let target = vlan_target_with(None, None, |_| Ok(answers.pop().unwrap())).unwrap();
        assert_eq!(target.id.get(), 40);
        assert_eq!(target.name, "sales");
    }

    #[test]
    fn test_invalid_vlan_id_is_rejected_before_name_prompt() {
        let mut prompts = 0;
        let result = vlan_target_with(Some("4095".into()), None, |_| {
            prompts += 1;
            Ok("x".into())
        });
        assert!(result.is_err());
        assert_eq!(prompts, 0);
    }
}
