//! Random joke retrieval.
//!
//! A fetch runs as a task on a runtime owned by `JokeFetcher`. Starting a
//! new request aborts the previous one, completions carry the generation
//! they were started under, and dropping the fetcher aborts whatever is
//! still in flight. The UI picks up results with the non-blocking `poll`.

use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

use crate::config::JokeConfig;

#[derive(Debug, Error)]
pub enum JokeError {
    #[error("joke request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed joke payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct JokePayload {
    value: String,
}

/// Extract the `value` field from the endpoint's JSON body.
pub fn parse_joke(body: &str) -> Result<String, JokeError> {
    let payload: JokePayload = serde_json::from_str(body)?;
    Ok(payload.value)
}

async fn fetch(client: &reqwest::Client, endpoint: &str) -> Result<String, JokeError> {
    let body = client
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_joke(&body)
}

struct Completion {
    generation: u64,
    text: String,
}

pub struct JokeFetcher {
    runtime: Runtime,
    client: reqwest::Client,
    endpoint: String,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl JokeFetcher {
    pub fn new(config: &JokeConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("joke-fetch")
            .enable_all()
            .build()
            .context("failed to start joke runtime")?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        let (tx, rx) = mpsc::channel();
        Ok(Self {
            runtime,
            client,
            endpoint: config.endpoint.clone(),
            generation: 0,
            in_flight: None,
            tx,
            rx,
        })
    }

    /// Start a fetch, superseding any request that has not completed yet.
    pub fn request(&mut self) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let tx = self.tx.clone();

        info!("event=joke_requested generation={} endpoint={}", generation, endpoint);
        let handle = self.runtime.spawn(async move {
            match fetch(&client, &endpoint).await {
                Ok(text) => {
                    // The receiver is gone once the fetcher is dropped.
                    let _ = tx.send(Completion { generation, text });
                }
                Err(err) => warn!("event=joke_failed generation={} error={}", generation, err),
            }
        });
        self.in_flight = Some(handle);
    }

    /// Abort the in-flight request, if any. Its result will never be delivered.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("event=joke_cancelled generation={}", self.generation);
            }
            handle.abort();
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Latest joke delivered for the current generation, if one arrived
    /// since the last poll. Completions from superseded requests are dropped.
    pub fn poll(&mut self) -> Option<String> {
        let mut latest = None;
        while let Ok(completion) = self.rx.try_recv() {
            if completion.generation == self.generation {
                latest = Some(completion.text);
            } else {
                debug!(
                    "event=joke_stale generation={} current={}",
                    completion.generation, self.generation
                );
            }
        }
        if latest.is_some() {
            info!("event=joke_received generation={}", self.generation);
        }
        latest
    }

    /// Fetch one joke and wait for it.
    pub fn fetch_now(&self) -> Result<String, JokeError> {
        self.runtime.block_on(fetch(&self.client, &self.endpoint))
    }
}

impl Drop for JokeFetcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
