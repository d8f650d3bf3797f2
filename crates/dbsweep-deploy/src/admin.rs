//! Administrative access to a running storage system.
//!
//! Used after bring-up for one-off setup such as initiating a MongoDB replica
//! set. The production client runs `mongosh --eval` inside the target
//! container through [`DeploymentHandle::exec`], so no client library or
//! published port is needed on the host.

use std::fmt;
use std::time::Duration;

use crate::backend::{DeployError, DeploymentHandle};
use crate::signal;

/// A service inside a deployment and the port its admin interface listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Compose service name
    pub service: String,
    /// Port inside the container
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(service: impl Into<String>, port: u16) -> Self {
        Self { service: service.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.port)
    }
}

/// An established admin connection.
pub trait AdminSession {
    /// Endpoint this session talks to
    fn endpoint(&self) -> &Endpoint;

    /// Run one administrative command and return its textual output.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::AdminCommand`] when the storage system rejects
    /// the command.
    fn run_admin_command(&self, command: &str) -> Result<String, DeployError>;
}

/// Factory for admin sessions against a deployment.
pub trait AdminClient: Send + Sync {
    /// Connect to `endpoint`, waiting for it to become ready.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::AdminUnreachable`] if the endpoint does not
    /// answer within the client's readiness budget.
    fn connect<'a>(
        &self,
        handle: &'a dyn DeploymentHandle,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn AdminSession + 'a>, DeployError>;
}

/// Bounded readiness polling: `attempts` tries spaced by `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoll {
    /// Maximum number of ping attempts
    pub attempts: u32,
    /// Delay between attempts
    pub interval: Duration,
}

impl ReadinessPoll {
    /// Poll budget derived from a total wait and a per-attempt interval.
    pub fn within(total: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let attempts = (total.as_millis() / interval.as_millis()).max(1);
        Self {
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            interval,
        }
    }
}

/// Admin client backed by `mongosh` running inside the MongoDB container.
#[derive(Debug, Clone)]
pub struct MongoShell {
    program: String,
    poll: ReadinessPoll,
}

impl MongoShell {
    /// Client using the `mongosh` binary shipped in the official image.
    pub fn new(poll: ReadinessPoll) -> Self {
        Self { program: "mongosh".to_string(), poll }
    }

    /// Use a different shell binary (e.g. the legacy `mongo`).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl AdminClient for MongoShell {
    fn connect<'a>(
        &self,
        handle: &'a dyn DeploymentHandle,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn AdminSession + 'a>, DeployError> {
        let session = MongoShellSession {
            handle,
            endpoint: endpoint.clone(),
            program: self.program.clone(),
        };

        let mut last_error = String::from("no attempt made");
        for attempt in 1..=self.poll.attempts {
            match session.run_admin_command("db.adminCommand({ ping: 1 }).ok") {
                Ok(out) if out.trim() == "1" => {
                    tracing::debug!("{} ready after {} attempt(s)", endpoint, attempt);
                    return Ok(Box::new(session));
                }
                Ok(out) => last_error = format!("unexpected ping reply: {}", out.trim()),
                Err(e) => last_error = e.to_string(),
            }
            tracing::debug!("{} not ready (attempt {}): {}", endpoint, attempt, last_error);

            if attempt < self.poll.attempts && signal::wait_for_shutdown_timeout(self.poll.interval) {
                last_error = "interrupted".to_string();
                break;
            }
        }

        Err(DeployError::AdminUnreachable {
            endpoint: endpoint.to_string(),
            attempts: self.poll.attempts,
            last_error,
        })
    }
}

struct MongoShellSession<'a> {
    handle: &'a dyn DeploymentHandle,
    endpoint: Endpoint,
    program: String,
}

impl AdminSession for MongoShellSession<'_> {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn run_admin_command(&self, command: &str) -> Result<String, DeployError> {
        let args = vec![
            self.program.clone(),
            "--quiet".to_string(),
            "--port".to_string(),
            self.endpoint.port.to_string(),
            "--eval".to_string(),
            command.to_string(),
        ];
        let output = self.handle.exec(&self.endpoint.service, &args)?;
        if output.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(DeployError::AdminCommand {
                endpoint: self.endpoint.to_string(),
                message: output.stderr_excerpt(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;

    use parking_lot::Mutex;

    use super::*;
    use crate::command::CommandOutput;

    /// Handle that answers `exec` from a script and records every call.
    struct ScriptedHandle {
        replies: Mutex<VecDeque<(i32, &'static str)>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedHandle {
        fn new(replies: &[(i32, &'static str)]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DeploymentHandle for ScriptedHandle {
        fn project(&self) -> &str {
            "dbsweep-mongodb"
        }

        fn descriptor(&self) -> &Path {
            Path::new("docker-compose.yml")
        }

        fn exec(&self, service: &str, args: &[String]) -> Result<CommandOutput, DeployError> {
            self.calls.lock().push((service.to_string(), args.to_vec()));
            let (code, text) = self.replies.lock().pop_front().unwrap_or((1, "connection refused"));
            let (stdout, stderr) = if code == 0 { (text, "") } else { ("", text) };
            Ok(CommandOutput {
                command: "exec".to_string(),
                code: Some(code),
                stdout: format!("{stdout}\n"),
                stderr: stderr.to_string(),
                elapsed: Duration::ZERO,
            })
        }

        fn tear_down(self: Box<Self>) -> Result<(), DeployError> {
            Ok(())
        }
    }

    fn fast_poll(attempts: u32) -> ReadinessPoll {
        ReadinessPoll { attempts, interval: Duration::from_millis(1) }
    }

    #[test]
    fn connect_polls_until_ping_succeeds() {
        let handle = ScriptedHandle::new(&[(1, "ECONNREFUSED"), (1, "ECONNREFUSED"), (0, "1")]);
        let endpoint = Endpoint::new("mongo-primary", 27017);

        let session = MongoShell::new(fast_poll(5)).connect(&handle, &endpoint).unwrap();
        assert_eq!(session.endpoint(), &endpoint);

        let calls = handle.calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "mongo-primary");
        assert_eq!(
            calls[0].1,
            ["mongosh", "--quiet", "--port", "27017", "--eval", "db.adminCommand({ ping: 1 }).ok"]
        );
    }

    #[test]
    fn connect_gives_up_after_budget() {
        let handle = ScriptedHandle::new(&[]);
        let err = MongoShell::new(fast_poll(3))
            .connect(&handle, &Endpoint::new("mongo-primary", 27017))
            .err()
            .unwrap();
        match err {
            DeployError::AdminUnreachable { endpoint, attempts, last_error } => {
                assert_eq!(endpoint, "mongo-primary:27017");
                assert_eq!(attempts, 3);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(handle.calls.lock().len(), 3);
    }

    #[test]
    fn rejected_command_surfaces_shell_error() {
        let handle = ScriptedHandle::new(&[(0, "1"), (1, "MongoServerError: already initialized")]);
        let session = MongoShell::new(fast_poll(1))
            .connect(&handle, &Endpoint::new("mongo-primary", 27017))
            .unwrap();
        let err = session.run_admin_command("rs.initiate()").unwrap_err();
        assert!(
            matches!(err, DeployError::AdminCommand { ref message, .. } if message.contains("already initialized"))
        );
    }

    #[test]
    fn readiness_budget_from_durations() {
        let poll = ReadinessPoll::within(Duration::from_secs(60), Duration::from_secs(2));
        assert_eq!(poll.attempts, 30);
        let poll = ReadinessPoll::within(Duration::ZERO, Duration::from_secs(2));
        assert_eq!(poll.attempts, 1);
    }
}
