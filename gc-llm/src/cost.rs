//! Rough spend estimate for a batch of calls.
//!
//! Input size is approximated by word count; output size is the total token
//! count the service reported.

use crate::types::SendResult;

/// USD per input token (2.50 per million).
pub const DEFAULT_INPUT_RATE: f64 = 2.50 / 1_000_000.0;
/// USD per output token (10.00 per million).
pub const DEFAULT_OUTPUT_RATE: f64 = 10.00 / 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimator {
    pub input_rate_per_token: f64,
    pub output_rate_per_token: f64,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self {
            input_rate_per_token: DEFAULT_INPUT_RATE,
            output_rate_per_token: DEFAULT_OUTPUT_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostSample {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl CostSample {
    pub fn from_result(message: &str, result: &SendResult) -> Self {
        Self {
            input_tokens: CostEstimator::input_tokens(message),
            output_tokens: result.metrics.tokens,
        }
    }
}

impl CostEstimator {
    pub fn input_tokens(message: &str) -> u64 {
        message.split_whitespace().count() as u64
    }

    pub fn estimate(&self, samples: &[CostSample]) -> f64 {
        let input: u64 = samples.iter().map(|s| s.input_tokens).sum();
        let output: u64 = samples.iter().map(|s| s.output_tokens).sum();
        input as f64 * self.input_rate_per_token + output as f64 * self.output_rate_per_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_approximates_input_tokens() {
        assert_eq!(CostEstimator::input_tokens("Hello"), 1);
        assert_eq!(CostEstimator::input_tokens("Tell me about the solar system"), 6);
        assert_eq!(CostEstimator::input_tokens("   "), 0);
    }

    #[test]
    fn estimate_is_positive_when_any_tokens_reported() {
        let est = CostEstimator::default();
        let samples = [
            CostSample {
                input_tokens: 1,
                output_tokens: 0,
            },
            CostSample {
                input_tokens: 6,
                output_tokens: 412,
            },
        ];
        let cost = est.estimate(&samples);
        let expected = 7.0 * DEFAULT_INPUT_RATE + 412.0 * DEFAULT_OUTPUT_RATE;
        assert!(cost > 0.0);
        assert!((cost - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_batch_costs_nothing() {
        assert_eq!(CostEstimator::default().estimate(&[]), 0.0);
    }
}
