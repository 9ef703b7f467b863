//! Terminal console: prints reports to stdout and asks on stdin

use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::core::error::{PublishError, PublishResult};
use crate::core::traits::{Console, PublishStage};
use crate::release::report::render_error;

/// Console backed by the process terminal
#[derive(Debug, Clone, Default)]
pub struct TerminalConsole {
    /// Answer every confirmation with yes (`--yes`, CI)
    assume_yes: bool,
}

impl TerminalConsole {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn confirm(&self, report: &[String]) -> PublishResult<bool> {
        for line in report {
            println!("{}", line);
        }
        println!();

        if self.assume_yes {
            return Ok(true);
        }

        print!("Proceed? (yes/no): ");
        io::stdout().flush().await.map_err(stdin_error)?;

        let mut reader = BufReader::new(io::stdin());
        let mut answer = String::new();
        reader.read_line(&mut answer).await.map_err(stdin_error)?;

        Ok(is_yes(&answer))
    }

    fn report_error(&self, stage: PublishStage, status: u16, body: &serde_json::Value) {
        eprintln!("❌ {} failed", stage.describe());
        for line in render_error(status, body) {
            eprintln!("{}", line);
        }
    }

    fn info(&self, line: &str) {
        println!("{}", line);
    }
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "yes" || answer == "y"
}

fn stdin_error(source: std::io::Error) -> PublishError {
    PublishError::io("<terminal>", source)
}
