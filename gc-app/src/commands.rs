//! CLI command bodies.

use crate::config::AppConfig;
use anyhow::Result;
use gc_llm::{ChatClient, CostEstimator, CostSample, SendOutcome};
use std::path::Path;
use std::time::{Duration, Instant};

pub const DEFAULT_BENCH_MESSAGES: &[&str] = &["Tell me a joke", "What's the weather like?"];

pub async fn send(client: &ChatClient, message: &str) -> Result<()> {
    match client.send_message_detailed(message).await {
        SendOutcome::Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        SendOutcome::Blocked(reason) => Err(anyhow::anyhow!(
            "no usable response: blocked by the service (reason={reason})"
        )),
        SendOutcome::Failed(e) => Err(anyhow::anyhow!("no usable response: {e}")),
    }
}

#[derive(Debug, Clone)]
pub struct BenchCall {
    pub message: String,
    pub latency: Duration,
    /// `None` when the call produced no usable response.
    pub tokens: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub calls: Vec<BenchCall>,
    pub elapsed: Duration,
    pub estimated_cost: f64,
}

impl BenchReport {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.calls.len() as f64 / secs
    }

    pub fn usable(&self) -> usize {
        self.calls.iter().filter(|c| c.tokens.is_some()).count()
    }
}

/// Sends `messages` one after another, pausing `delay` between calls.
#[tracing::instrument(level = "info", skip_all, fields(calls = messages.len()))]
pub async fn run_bench(
    client: &ChatClient,
    messages: &[String],
    delay: Duration,
    estimator: &CostEstimator,
) -> BenchReport {
    let started = Instant::now();
    let mut calls = Vec::with_capacity(messages.len());
    let mut samples = Vec::new();

    for (idx, message) in messages.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let call_started = Instant::now();
        let result = client.send_message(message).await;
        let latency = call_started.elapsed();

        if let Some(result) = result.as_ref() {
            samples.push(CostSample::from_result(message, result));
        }
        tracing::info!(
            prompt = %message,
            latency_ms = millis(latency),
            usable = result.is_some(),
            "bench call finished"
        );
        calls.push(BenchCall {
            message: message.clone(),
            latency,
            tokens: result.map(|r| r.metrics.tokens),
        });
    }

    BenchReport {
        calls,
        elapsed: started.elapsed(),
        estimated_cost: estimator.estimate(&samples),
    }
}

/// Fractional milliseconds; sub-millisecond calls stay visible.
fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub fn print_bench(report: &BenchReport) {
    for call in &report.calls {
        let tokens = call
            .tokens
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>10.2} ms  tokens={tokens:<6} {}",
            millis(call.latency),
            call.message
        );
    }
    println!(
        "usable: {}/{}",
        report.usable(),
        report.calls.len()
    );
    println!("throughput: {:.2} requests/second", report.throughput());
    println!("estimated cost: ${:.6}", report.estimated_cost);
}

pub fn doctor(cfg: &AppConfig, path: &Path, tool_count: usize) {
    tracing::info!(
        model = %cfg.gemini.model,
        api_key_present = cfg.has_api_key(),
        base_url = ?cfg.gemini.base_url,
        tools = tool_count,
        config_path = %path.display(),
        "config ok"
    );
    println!("config: {}", path.display());
    println!("model: {}", cfg.gemini.model);
    println!(
        "api key: {}",
        if cfg.has_api_key() { "set" } else { "missing" }
    );
    println!("tools: {tool_count}");
}
