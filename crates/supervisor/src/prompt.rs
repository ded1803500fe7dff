use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::warn;

pub const QUIT_QUESTION: &str = "Really quit? (y) ";

/// Asks the operator to confirm a quit request.
#[async_trait]
pub trait OperatorPrompt: Send {
    async fn confirm_quit(&mut self) -> bool;
}

/// Reads answers line by line. Only an answer starting with `y` or `Y`
/// confirms; end of input confirms as well since nobody is left to ask.
pub struct LinePrompt<R> {
    reader: R,
}

pub type StdinPrompt = LinePrompt<BufReader<Stdin>>;

impl StdinPrompt {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LinePrompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> OperatorPrompt for LinePrompt<R> {
    async fn confirm_quit(&mut self) -> bool {
        print!("{QUIT_QUESTION}");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        match self.reader.read_line(&mut answer).await {
            Ok(0) => {
                println!();
                true
            }
            Ok(_) => matches!(answer.chars().next(), Some('y' | 'Y')),
            Err(e) => {
                warn!("Cannot read operator answer, quitting: {e}");
                true
            }
        }
    }
}
