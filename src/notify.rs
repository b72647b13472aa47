//! Remote console sessions used to notify a live server.
//!
//! Every session goes through [`run_batch`], which disconnects exactly once
//! after every connect attempt, whatever the outcome.

use std::time::Duration;

use async_trait::async_trait;
use rcon_proto::{Dialect, RconClient, RconError};
use tracing::{debug, error, warn};

use crate::config::CommandFailurePolicy;
use crate::model::ServerTarget;

/// Where and how to reach a server's console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub dialect: Dialect,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn for_server(server: &ServerTarget, timeout: Duration) -> Self {
        Self {
            host: server.ip.clone(),
            port: server.port,
            dialect: server.dialect(),
            timeout,
        }
    }
}

/// A remote console connection.
#[async_trait]
pub trait RemoteConsole: Send {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RconError>;
    async fn authenticate(&mut self, secret: &str) -> Result<(), RconError>;
    async fn execute(&mut self, command: &str) -> Result<String, RconError>;
    /// Must be safe in any state.
    async fn disconnect(&mut self);
}

/// Creates a fresh console per session.
pub trait ConsoleFactory: Send + Sync {
    fn create(&self) -> Box<dyn RemoteConsole>;
}

/// [`RemoteConsole`] over the network client.
#[derive(Default)]
pub struct RconConsole {
    client: Option<RconClient>,
}

#[async_trait]
impl RemoteConsole for RconConsole {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RconError> {
        let client = self.client.insert(RconClient::new(endpoint.timeout));
        client
            .connect(&endpoint.host, endpoint.port, endpoint.dialect)
            .await
    }

    async fn authenticate(&mut self, secret: &str) -> Result<(), RconError> {
        match self.client.as_mut() {
            Some(client) => client.authenticate(secret).await,
            None => Err(RconError::Closed),
        }
    }

    async fn execute(&mut self, command: &str) -> Result<String, RconError> {
        match self.client.as_mut() {
            Some(client) => client.execute(command).await,
            None => Err(RconError::Closed),
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.disconnect().await;
        }
    }
}

/// Factory for [`RconConsole`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RconConsoleFactory;

impl ConsoleFactory for RconConsoleFactory {
    fn create(&self) -> Box<dyn RemoteConsole> {
        Box::new(RconConsole::default())
    }
}

/// What happened to a command batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Lines executed successfully.
    pub sent: usize,
    /// Lines that failed and were skipped.
    pub skipped: Vec<String>,
}

/// Connect, authenticate, run `commands` in order, then disconnect.
///
/// Connect and authentication failures always fail the batch. A failing
/// command fails it under [`CommandFailurePolicy::Abort`] and is logged and
/// skipped under [`CommandFailurePolicy::SkipAndLog`].
pub async fn run_batch(
    console: &mut dyn RemoteConsole,
    endpoint: &Endpoint,
    secret: &str,
    commands: &[String],
    policy: CommandFailurePolicy,
) -> Result<BatchOutcome, RconError> {
    let result = exchange(&mut *console, endpoint, secret, commands, policy).await;
    console.disconnect().await;
    result
}

async fn exchange(
    console: &mut dyn RemoteConsole,
    endpoint: &Endpoint,
    secret: &str,
    commands: &[String],
    policy: CommandFailurePolicy,
) -> Result<BatchOutcome, RconError> {
    console.connect(endpoint).await?;
    console.authenticate(secret).await?;

    let mut outcome = BatchOutcome::default();
    for command in commands {
        match console.execute(command).await {
            Ok(response) => {
                debug!(command = %command, response = %response.trim_end(), "console command sent");
                outcome.sent += 1;
            }
            Err(e) if policy == CommandFailurePolicy::SkipAndLog => {
                warn!(command = %command, error = %e, code = e.error_code(), "console command failed, skipping");
                outcome.skipped.push(command.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

/// Best-effort reload notification after a grant was written.
///
/// Returns whether the command was delivered. Servers without a secret are
/// skipped; failures are logged, never raised.
pub async fn notify_reload(
    consoles: &dyn ConsoleFactory,
    server: &ServerTarget,
    timeout: Duration,
    command: &str,
) -> bool {
    let Some(secret) = server.rcon_secret() else {
        debug!(server = %server.name, "no rcon secret, skipping reload");
        return false;
    };

    let endpoint = Endpoint::for_server(server, timeout);
    let mut console = consoles.create();
    let commands = [command.to_string()];
    match run_batch(
        console.as_mut(),
        &endpoint,
        secret,
        &commands,
        CommandFailurePolicy::Abort,
    )
    .await
    {
        Ok(_) => true,
        Err(e) => {
            error!(
                server = %server.name,
                command = %command,
                error = %e,
                code = e.error_code(),
                "Failed to notify server, grant is stored"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Console whose steps fail on demand and which records calls.
    #[derive(Default)]
    struct Scripted {
        fail_connect: bool,
        fail_auth: bool,
        results: VecDeque<Result<String, RconError>>,
        calls: Vec<String>,
    }

    #[async_trait]
    impl RemoteConsole for Scripted {
        async fn connect(&mut self, _endpoint: &Endpoint) -> Result<(), RconError> {
            self.calls.push("connect".into());
            if self.fail_connect {
                return Err(RconError::Timeout("connecting"));
            }
            Ok(())
        }

        async fn authenticate(&mut self, _secret: &str) -> Result<(), RconError> {
            self.calls.push("auth".into());
            if self.fail_auth {
                return Err(RconError::Authentication);
            }
            Ok(())
        }

        async fn execute(&mut self, command: &str) -> Result<String, RconError> {
            self.calls.push(format!("exec {command}"));
            self.results.pop_front().unwrap_or(Ok(String::new()))
        }

        async fn disconnect(&mut self) {
            self.calls.push("disconnect".into());
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            host: "127.0.0.1".into(),
            port: 27015,
            dialect: Dialect::Source,
            timeout: Duration::from_secs(1),
        }
    }

    async fn batch(
        console: &mut Scripted,
        items: &[&str],
        policy: CommandFailurePolicy,
    ) -> Result<BatchOutcome, RconError> {
        let commands: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        run_batch(console, &endpoint(), "pw", &commands, policy).await
    }

    fn disconnects(console: &Scripted) -> usize {
        console.calls.iter().filter(|c| *c == "disconnect").count()
    }

    #[tokio::test]
    async fn test_disconnect_after_connect_failure() {
        let mut console = Scripted {
            fail_connect: true,
            ..Default::default()
        };
        let result = batch(&mut console, &["a"], CommandFailurePolicy::SkipAndLog).await;
        assert!(matches!(result, Err(RconError::Timeout(_))));
        assert_eq!(console.calls, vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_disconnect_after_auth_failure() {
        let mut console = Scripted {
            fail_auth: true,
            ..Default::default()
        };
        let result = batch(&mut console, &["a"], CommandFailurePolicy::SkipAndLog).await;
        assert!(matches!(result, Err(RconError::Authentication)));
        assert_eq!(disconnects(&console), 1);
    }

    #[tokio::test]
    async fn test_skip_and_log_continues() {
        let mut console = Scripted::default();
        console.results.push_back(Err(RconError::Closed));
        let outcome = batch(&mut console, &["bad", "good"], CommandFailurePolicy::SkipAndLog)
            .await
            .unwrap();
        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.skipped, vec!["bad".to_string()]);
        assert_eq!(disconnects(&console), 1);
    }

    #[tokio::test]
    async fn test_abort_stops_batch() {
        let mut console = Scripted::default();
        console.results.push_back(Err(RconError::Closed));
        let result = batch(&mut console, &["bad", "good"], CommandFailurePolicy::Abort).await;
        assert!(result.is_err());
        assert!(!console.calls.contains(&"exec good".to_string()));
        assert_eq!(disconnects(&console), 1);
    }

    #[tokio::test]
    async fn test_notify_without_secret_skips() {
        struct Unused;
        impl ConsoleFactory for Unused {
            fn create(&self) -> Box<dyn RemoteConsole> {
                panic!("console must not be created without a secret");
            }
        }
        let server = ServerTarget::default();
        assert!(!notify_reload(&Unused, &server, Duration::from_secs(1), "vip_reload").await);
    }
}
