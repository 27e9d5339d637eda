//! Canned plain-language readings of metric scores.
//!
//! These cutoffs are independent of the pass/fail thresholds a suite
//! configures.

pub const UNSCORED: &str = "⚠️ Metric could not be evaluated.";
pub const NO_EXPLANATION: &str = "No explanation available for this metric.";

#[derive(Debug, Clone, Copy)]
enum Cutoff {
    AtLeast(f64),
    Zero,
}

impl Cutoff {
    fn is_good(self, score: f64) -> bool {
        match self {
            Cutoff::AtLeast(min) => score >= min,
            Cutoff::Zero => score == 0.0,
        }
    }
}

struct Reading {
    metric: &'static str,
    cutoff: Cutoff,
    good: &'static str,
    needs_attention: &'static str,
}

const READINGS: &[Reading] = &[
    Reading {
        metric: "AnswerRelevancy",
        cutoff: Cutoff::AtLeast(0.7),
        good: "Answer was relevant.",
        needs_attention: "Answer was off-topic or too vague.",
    },
    Reading {
        metric: "Faithfulness",
        cutoff: Cutoff::AtLeast(0.6),
        good: "Answer sticks to the context.",
        needs_attention: "Answer may include hallucinated content.",
    },
    Reading {
        metric: "ContextualRecall",
        cutoff: Cutoff::AtLeast(0.7),
        good: "Answer covers key points from the context.",
        needs_attention: "Answer misses some important details.",
    },
    Reading {
        metric: "ContextualPrecision",
        cutoff: Cutoff::AtLeast(0.7),
        good: "Answer is sharp and well-supported by the context.",
        needs_attention: "Answer includes unsupported or extra content.",
    },
    Reading {
        metric: "Toxicity",
        cutoff: Cutoff::Zero,
        good: "✅ No toxic language detected.",
        needs_attention: "⚠️ Some potentially toxic language detected.",
    },
    Reading {
        metric: "Bias",
        cutoff: Cutoff::Zero,
        good: "✅ No bias detected.",
        needs_attention: "⚠️ Potential bias detected in the answer.",
    },
    Reading {
        metric: "Summarization",
        cutoff: Cutoff::AtLeast(0.7),
        good: "Answer summarizes the content well.",
        needs_attention: "Summary lacks clarity or misses details.",
    },
    Reading {
        metric: "TaskCompletion",
        cutoff: Cutoff::AtLeast(0.7),
        good: "The task was completed as expected.",
        needs_attention: "Answer did not fully complete the requested task.",
    },
    Reading {
        metric: "RoleAdherence",
        cutoff: Cutoff::AtLeast(0.8),
        good: "Agent stayed in role.",
        needs_attention: "Agent deviated from its defined persona.",
    },
];

/// Sentence describing what `score` means for `metric_name`. `None` means
/// the metric could not be evaluated.
pub fn explain(metric_name: &str, score: Option<f64>) -> &'static str {
    let Some(score) = score else {
        return UNSCORED;
    };

    match READINGS.iter().find(|reading| reading.metric == metric_name) {
        Some(reading) if reading.cutoff.is_good(score) => reading.good,
        Some(reading) => reading.needs_attention,
        None => NO_EXPLANATION,
    }
}
