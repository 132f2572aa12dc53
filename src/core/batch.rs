use crate::config::QualityConfig;
use crate::core::counter::RunCounter;
use crate::core::descriptor::{classify, Descriptor, MediaType};
use crate::core::dispatch::{DispatchRouter, Outcome};
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Stdin};
use tracing::{debug, info};

/// Which items a retry pass walks again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryGranularity {
    /// The whole queue, including items that already succeeded.
    #[default]
    FullList,
    FailedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub granularity: RetryGranularity,
    /// `None` keeps retrying until a pass has no errors.
    pub max_passes: Option<u32>,
}

impl RetryPolicy {
    pub fn single_pass() -> Self {
        Self {
            granularity: RetryGranularity::FullList,
            max_passes: Some(1),
        }
    }
}

/// Decides whether another pass starts after a pass with errors.
#[async_trait]
pub trait RetryGate: Send {
    async fn allow_retry(&mut self, counter: &RunCounter) -> bool;
}

/// Line-oriented console input. One reader serves every prompt of a run, so
/// typed-ahead input is never lost between prompts.
pub struct ConsoleGate<R> {
    reader: BufReader<R>,
}

impl ConsoleGate<Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin + Send> ConsoleGate<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Prints `message` and reads one line. `None` at end of input.
    pub async fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(message.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        match self.reader.read_line(&mut line).await? {
            0 => Ok(None),
            _ => Ok(Some(line.trim().to_string())),
        }
    }
}

/// Waits for the user to press Enter.
#[async_trait]
impl<R: AsyncRead + Unpin + Send> RetryGate for ConsoleGate<R> {
    async fn allow_retry(&mut self, _counter: &RunCounter) -> bool {
        match self.prompt("Error detected, press Enter to try again...\n").await {
            Ok(Some(_)) => {
                println!("Start trying again...");
                true
            }
            Ok(None) | Err(_) => false,
        }
    }
}

/// Starts the next pass without asking.
pub struct AutoContinue;

#[async_trait]
impl RetryGate for AutoContinue {
    async fn allow_retry(&mut self, _counter: &RunCounter) -> bool {
        info!("errors in last pass, retrying");
        true
    }
}

/// Receives progress while a pass runs. Every hook defaults to a no-op.
pub trait PassObserver: Send {
    fn item_started(&mut self, _index: usize, _total: usize, _url: &str, _descriptor: &Descriptor) {}
    fn item_skipped(&mut self, _index: usize, _total: usize, _url: &str, _reason: &str) {}
    fn item_finished(&mut self, _index: usize, _total: usize, _url: &str, _outcome: &Outcome) {}
    fn pass_finished(&mut self, _pass: u32, _counter: &RunCounter) {}
}

impl PassObserver for () {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub passes: u32,
    pub counter: RunCounter,
    /// Failed items of the last pass with their reasons.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.counter.error == 0
    }
}

/// Drives passes over a URL queue until one finishes without errors or the
/// policy gives up.
pub struct BatchRunner<'a> {
    router: &'a DispatchRouter,
    token: &'a str,
    quality: &'a QualityConfig,
    policy: RetryPolicy,
}

impl<'a> BatchRunner<'a> {
    pub fn new(router: &'a DispatchRouter, token: &'a str, quality: &'a QualityConfig, policy: RetryPolicy) -> Self {
        Self {
            router,
            token,
            quality,
            policy,
        }
    }

    pub async fn run(
        &self,
        urls: &[String],
        observer: &mut dyn PassObserver,
        gate: &mut dyn RetryGate,
    ) -> BatchReport {
        let mut queue = urls.to_vec();
        let mut counter = RunCounter::default();
        let mut pass = 0;

        loop {
            pass += 1;
            counter.reset();
            let failed = self.run_pass(&queue, &mut counter, observer).await;
            observer.pass_finished(pass, &counter);

            let report = BatchReport {
                passes: pass,
                counter,
                failed,
            };
            if report.succeeded() {
                return report;
            }
            if self.policy.max_passes.is_some_and(|max| pass >= max) {
                debug!(passes = pass, "retry limit reached");
                return report;
            }
            if !gate.allow_retry(&counter).await {
                return report;
            }
            if self.policy.granularity == RetryGranularity::FailedOnly {
                queue = report.failed.into_iter().map(|(url, _)| url).collect();
            }
        }
    }

    async fn run_pass(
        &self,
        queue: &[String],
        counter: &mut RunCounter,
        observer: &mut dyn PassObserver,
    ) -> Vec<(String, String)> {
        let total = queue.len();
        let mut failed = Vec::new();

        for (index, url) in queue.iter().enumerate() {
            let descriptor = classify(url);
            observer.item_started(index, total, url, &descriptor);

            match descriptor.media_type {
                MediaType::Invalid => {
                    observer.item_skipped(index, total, url, "Invalid type");
                    continue;
                }
                MediaType::Artist => {
                    observer.item_skipped(index, total, url, "Artist URLs are only expanded as the first URL");
                    continue;
                }
                MediaType::MusicVideo if self.quality.debug => {
                    observer.item_skipped(index, total, url, "debug mode, skip MV dl");
                    continue;
                }
                _ => {}
            }

            let outcome = self.router.dispatch(&descriptor, self.token, self.quality).await;
            counter.record(&outcome);
            if let Outcome::Failed(reason) = &outcome {
                failed.push((url.clone(), reason.clone()));
            }
            observer.item_finished(index, total, url, &outcome);
        }

        failed
    }
}
