//! Remote console double that records every call.

use async_trait::async_trait;
use givecore::notify::{ConsoleFactory, Endpoint, RemoteConsole};
use parking_lot::Mutex;
use rcon_proto::RconError;
use std::collections::HashSet;
use std::sync::Arc;

/// Everything consoles created by one factory did.
#[derive(Debug, Default)]
pub struct ConsoleLog {
    pub events: Vec<String>,
    pub connects: usize,
    pub disconnects: usize,
    pub executed: Vec<String>,
}

#[derive(Debug, Default)]
struct Script {
    fail_connect: bool,
    fail_auth: bool,
    failing: HashSet<String>,
}

/// Factory handing out recording consoles that share one log.
#[derive(Default)]
pub struct RecordingConsoles {
    log: Arc<Mutex<ConsoleLog>>,
    script: Arc<Mutex<Script>>,
}

#[allow(dead_code)]
impl RecordingConsoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self) {
        self.script.lock().fail_connect = true;
    }

    pub fn fail_auth(&self) {
        self.script.lock().fail_auth = true;
    }

    /// Make `command` fail when executed.
    pub fn fail_command(&self, command: &str) {
        self.script.lock().failing.insert(command.to_string());
    }

    pub fn connects(&self) -> usize {
        self.log.lock().connects
    }

    pub fn disconnects(&self) -> usize {
        self.log.lock().disconnects
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().executed.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().events.clone()
    }
}

impl ConsoleFactory for RecordingConsoles {
    fn create(&self) -> Box<dyn RemoteConsole> {
        Box::new(RecordingConsole {
            log: Arc::clone(&self.log),
            script: Arc::clone(&self.script),
        })
    }
}

struct RecordingConsole {
    log: Arc<Mutex<ConsoleLog>>,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl RemoteConsole for RecordingConsole {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), RconError> {
        let mut log = self.log.lock();
        log.connects += 1;
        log.events
            .push(format!("connect {}:{} {}", endpoint.host, endpoint.port, endpoint.dialect));
        if self.script.lock().fail_connect {
            return Err(RconError::Timeout("connecting"));
        }
        Ok(())
    }

    async fn authenticate(&mut self, secret: &str) -> Result<(), RconError> {
        self.log.lock().events.push(format!("auth {secret}"));
        if self.script.lock().fail_auth {
            return Err(RconError::Authentication);
        }
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<String, RconError> {
        let mut log = self.log.lock();
        log.events.push(format!("exec {command}"));
        if self.script.lock().failing.contains(command) {
            return Err(RconError::Closed);
        }
        log.executed.push(command.to_string());
        Ok(String::new())
    }

    async fn disconnect(&mut self) {
        let mut log = self.log.lock();
        log.disconnects += 1;
        log.events.push("disconnect".to_string());
    }
}
