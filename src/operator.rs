use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::report;
use crate::workflow::types::DialogKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// The human in the loop: acknowledges dialogs and receives notices.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Show a dialog and return once the operator has dismissed it.
    async fn acknowledge(&self, kind: DialogKind, items: &[String]) -> Result<()>;

    /// Surface a one-way message.
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Operator on the controlling terminal.
pub struct TerminalOperator {
    auto_acknowledge: bool,
    stdin: Mutex<BufReader<Stdin>>,
}

impl TerminalOperator {
    pub fn new(auto_acknowledge: bool) -> Self {
        Self {
            auto_acknowledge,
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn acknowledge(&self, kind: DialogKind, items: &[String]) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(report::render_dialog(kind, items).as_bytes())
            .await?;

        if self.auto_acknowledge {
            stdout.write_all(b"(acknowledged automatically)\n\n").await?;
            stdout.flush().await?;
            tracing::info!(dialog = ?kind, items = items.len(), "Dialog auto-acknowledged");
            return Ok(());
        }

        stdout.write_all(b"Press Enter to continue... ").await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.stdin.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(AppError::Dialog(format!(
                "stdin closed before '{}' was acknowledged",
                kind.title()
            )));
        }
        tracing::info!(dialog = ?kind, "Dialog acknowledged");
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => println!("{message}"),
            NoticeLevel::Error => eprintln!("error: {message}"),
        }
    }
}
