//! Chairman synthesis driver.
//!
//! Builds a deterministic prompt from the query and every successful council
//! response, asks the chairman for a non-streaming completion at a low
//! temperature, and hands the raw text to [`parse_synthesis`].

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use super::parser::parse_synthesis;
use super::types::{ModelResponseResult, SynthesisResult};
use crate::config::CouncilConfig;
use crate::errors::SynthesisError;
use crate::producer::{ChatMessage, ModelProducer, SamplingOptions};

/// Drives the chairman call for one debate.
pub struct SynthesisDriver {
    producer: Arc<dyn ModelProducer>,
    options: SamplingOptions,
}

impl SynthesisDriver {
    pub fn new(producer: Arc<dyn ModelProducer>, config: &CouncilConfig) -> Self {
        Self {
            producer,
            options: SamplingOptions {
                temperature: config.chairman_temperature,
                max_tokens: config.max_tokens,
            },
        }
    }

    /// Ask `chairman` to synthesize `responses` and parse its answer.
    pub async fn synthesize(
        &self,
        query: &str,
        responses: &[ModelResponseResult],
        chairman: &str,
    ) -> Result<SynthesisResult, SynthesisError> {
        let prompt = build_synthesis_prompt(query, responses);
        debug!(
            chairman,
            responses = responses.len(),
            prompt_len = prompt.len(),
            "requesting chairman synthesis"
        );

        let raw = self
            .producer
            .complete(chairman, &[ChatMessage::user(prompt)], self.options)
            .await
            .map_err(|source| SynthesisError::Chairman {
                model: chairman.to_string(),
                source,
            })?;

        let result = parse_synthesis(&raw);
        info!(
            chairman,
            consensus = result.consensus_items.len(),
            debates = result.debates.len(),
            synthesis_len = result.synthesis_text.len(),
            "chairman synthesis parsed"
        );
        Ok(result)
    }
}

/// Chairman prompt: the query, each response under a `--- model ---` banner,
/// and the three-section output contract the parser expects.
pub fn build_synthesis_prompt(query: &str, responses: &[ModelResponseResult]) -> String {
    let mut prompt = format!(
        "You are the Chairman of a council of AI models. The council was asked to debate the following question:\n\n\
         QUESTION: {query}\n\n\
         The council members provided the following responses:\n\n"
    );

    for response in responses {
        // Writing to a String cannot fail.
        let _ = write!(
            prompt,
            "\n--- {} ---\n{}\n",
            response.model_id, response.text
        );
    }

    prompt.push_str(
        "\nAs Chairman, your task is to synthesize these responses. Please provide:\n\n\
         1. **CONSENSUS**: List the key points where all or most council members agree. Start each point with \"• \"\n\n\
         2. **DEBATES**: List the key points where council members disagree or take different approaches. \
         For each debate, explain the different positions. Start each point with \"• \"\n\n\
         3. **SYNTHESIS**: Provide your final synthesis that incorporates the council's collective wisdom, \
         acknowledges the debates, and offers a balanced conclusion.\n\n\
         Format your response EXACTLY as follows:\n\n\
         CONSENSUS:\n\
         • [consensus point 1]\n\
         • [consensus point 2]\n\
         ...\n\n\
         DEBATES:\n\
         • [debate topic]: [model A's position] vs [model B's position]\n\
         • [debate topic]: [different perspectives]\n\
         ...\n\n\
         SYNTHESIS:\n\
         [Your final synthesis statement incorporating the above]\n",
    );

    prompt
}
