//! Rolling history summarisation.

use persona_core::config::SummaryConfig;
use persona_llm::{Summarizer, SummaryRequest};
use tracing::{debug, info};

use crate::error::Result;
use crate::state::SharedCharacter;
use crate::turn::to_chat;

/// Fold old history into the summary if enough has accumulated.
///
/// Returns the number of messages folded; `0` when nothing was due. The
/// state lock is not held while the summariser runs.
///
/// # Errors
/// Propagates summariser failures; the character is left untouched.
pub async fn maybe_summarize<S: Summarizer + ?Sized>(
    character: &SharedCharacter,
    summarizer: &S,
    config: &SummaryConfig,
) -> Result<usize> {
    let request = character.read(|c| {
        if !c.needs_summary(config) {
            return None;
        }
        let candidates = c.summary_candidates(config);
        Some(SummaryRequest {
            prior_summary: c.summary().map(str::to_string),
            messages: candidates.iter().map(to_chat).collect(),
        })
    });
    let Some(request) = request else {
        debug!("Summary not due");
        return Ok(0);
    };
    let folded = request.messages.len();
    if folded == 0 {
        return Ok(0);
    }

    let summary = summarizer.summarize(&request).await?;
    character.update(|c| c.record_summary(summary, folded));
    info!(folded, "History summarised");
    Ok(folded)
}
