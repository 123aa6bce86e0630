//! Scheduler/worker IPC framing.
//!
//! Messages are serde-tagged unions carried as JSON Lines over the worker's
//! stdin and stdout. Delivery is ordered within a connected channel; losing
//! the channel is treated as a worker crash.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::RunnerConfig;
use crate::model::TestCase;
use crate::runner::results::TestResult;

/// Parent to child.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerRequest {
    Execute {
        test_case: TestCase,
        config: RunnerConfig,
    },
}

/// Child to parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerResponse {
    Result { result: TestResult },
    Error { error: String },
}

/// Write one message as a JSON line.
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> std::io::Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

/// Parse one JSON line into a message, `None` for lines that do not parse.
#[must_use]
pub fn parse_message<'a, T: Deserialize<'a>>(line: &'a str) -> Option<T> {
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_a_line() {
        let request = WorkerRequest::Execute {
            test_case: TestCase {
                id: "t1".to_string(),
                name: "first".to_string(),
                suite: "smoke".to_string(),
                setup: Vec::new(),
                steps: Vec::new(),
                teardown: Vec::new(),
                metadata: Default::default(),
            },
            config: RunnerConfig::default(),
        };
        let line = serde_json::to_string(&request).unwrap();
        assert!(line.contains(r#""type":"execute""#));
        let parsed: WorkerRequest = parse_message(&line).unwrap();
        let WorkerRequest::Execute { test_case, .. } = parsed;
        assert_eq!(test_case.id, "t1");
    }

    #[test]
    fn unknown_message_types_do_not_parse() {
        assert!(parse_message::<WorkerRequest>(r#"{"type":"shutdown"}"#).is_none());
        assert!(parse_message::<WorkerResponse>("not json").is_none());
    }
}
