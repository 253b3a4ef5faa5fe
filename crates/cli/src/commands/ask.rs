//! `assemble ask`: run one goal through the agent.

use assemble_core::message::{Query, Response, Step};

use super::build_agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Only the final answer.
    Answer,
    /// A line per step, then the answer.
    Steps,
    /// The whole response, pretty-printed JSON.
    Json,
}

pub async fn run(
    goal: String,
    initial_state: Option<String>,
    step_limit: Option<usize>,
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut agent) = build_agent(false, false, step_limit)?;

    let mut query = Query::new(goal);
    if let Some(state) = initial_state {
        query = query.with_initial_state(state);
    }

    let steps = agent.run(query).await?;
    let response = Response::from_steps(steps);
    tracing::debug!(
        steps = response.steps().len(),
        tokens = response.total_usage().total_tokens,
        "Run complete"
    );

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        Output::Steps => {
            for (index, step) in response.steps().iter().enumerate() {
                println!("{}", format_step(index + 1, step));
            }
            println!();
            println!("{}", response.final_output);
        }
        Output::Answer => println!("{}", response.final_output),
    }
    Ok(())
}

/// One trace line: `[n] state -> next (ms, tokens)` plus the output.
fn format_step(number: usize, step: &Step) -> String {
    let header = format!(
        "[{number}] {} -> {} ({} ms, {} tokens)",
        step.state_name,
        step.next_state,
        step.duration_ms(),
        step.token_usage.total_tokens
    );
    match &step.response {
        Some(response) => {
            let body: Vec<String> = response.lines().map(|line| format!("    {line}")).collect();
            format!("{header}\n{}", body.join("\n"))
        }
        None => format!("{header}\n    (skipped)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assemble_core::llm::Usage;
    use chrono::{Duration, Utc};

    fn step(response: Option<&str>) -> Step {
        let started_at = Utc::now();
        Step {
            state_name: "thought".into(),
            prompt: response.map(|_| "prompt".to_string()),
            response: response.map(str::to_string),
            next_state: "action".into(),
            token_usage: Usage::new(10, 5),
            started_at,
            finished_at: started_at + Duration::milliseconds(42),
        }
    }

    #[test]
    fn formats_generated_steps() {
        let line = format_step(1, &step(Some("use the calculator\nthen answer")));
        assert_eq!(
            line,
            "[1] thought -> action (42 ms, 15 tokens)\n    use the calculator\n    then answer"
        );
    }

    #[test]
    fn formats_skipped_steps() {
        let line = format_step(3, &step(None));
        assert!(line.starts_with("[3] thought -> action"));
        assert!(line.ends_with("(skipped)"));
    }
}
