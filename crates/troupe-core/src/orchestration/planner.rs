//! Supervisor planner protocol: prompt construction, decision parsing, and
//! deterministic synthesis of a final output when the loop ends without a
//! finish decision.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::models::agent::Agent;
use crate::models::workflow::{SupervisorStep, Termination};

/// Sentinel `next_agent_id` meaning "the goal is achieved".
pub const FINISH: &str = "FINISH";

/// How many trailing history entries feed a synthesized final output.
const SYNTHESIS_ENTRIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerDecision {
    Delegate {
        agent_id: String,
        instruction: String,
        reasoning: Option<String>,
    },
    Finish {
        summary: String,
    },
}

#[derive(Deserialize)]
struct RawDecision {
    next_agent_id: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn fence_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)```").ok())
        .as_ref()
}

/// System prompt describing the goal, the team and the JSON protocol.
pub fn system_prompt(goal: &str, roster: &[Agent]) -> String {
    let team = roster
        .iter()
        .map(Agent::roster_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a Supervisor Agent managing a team of workers.
Your Goal: {goal}

Your Team:
{team}

Protocol:
1. Analyze the current state and history.
2. Decide which agent to call next to make progress.
3. Provide a clear instruction to that agent.
4. If the goal is achieved, output "FINISH" with the final answer.

Output Format (JSON):
{{
    "next_agent_id": "agent_id_or_FINISH",
    "instruction": "Instruction for the agent or Final Answer",
    "reasoning": "Why you chose this step"
}}"#
    )
}

/// Rendered history, oldest first.
pub fn history_text(history: &[SupervisorStep]) -> String {
    let mut text = String::from("History:\n");
    for step in history {
        text.push_str(&format!(
            "Step {} - Agent {}:\n{}\n\n",
            step.step, step.agent_name, step.output
        ));
    }
    text
}

/// User turn for one planner call.
pub fn planner_prompt(history: &[SupervisorStep]) -> String {
    format!("{}\n\nWhat is the next step?", history_text(history))
}

/// The last `max_chars` characters of `text`, on a char boundary.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Parse a planner reply into a decision.
///
/// Accepts bare JSON, JSON inside a markdown code fence, or JSON surrounded
/// by prose (the outermost `{ ... }` is used). `FINISH` is matched
/// case-insensitively.
pub fn parse_decision(raw: &str) -> Result<PlannerDecision, String> {
    let trimmed = raw.trim();
    let unfenced = fence_re()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => return Err(format!("no JSON object in planner reply: {:?}", excerpt(raw))),
    };

    let decision: RawDecision = serde_json::from_str(json)
        .map_err(|e| format!("malformed planner decision: {}", e))?;

    let next = decision
        .next_agent_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "planner decision has no next_agent_id".to_string())?;
    let instruction = decision.instruction.unwrap_or_default();

    if next.eq_ignore_ascii_case(FINISH) {
        return Ok(PlannerDecision::Finish {
            summary: instruction,
        });
    }
    if instruction.trim().is_empty() {
        return Err(format!("planner delegated to {} without an instruction", next));
    }
    Ok(PlannerDecision::Delegate {
        agent_id: next,
        instruction,
        reasoning: decision.reasoning.filter(|r| !r.trim().is_empty()),
    })
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(120).collect()
}

/// Deterministic, never-empty final output for a loop that ended without a
/// usable finish summary.
pub fn synthesize(goal: &str, history: &[SupervisorStep], termination: &Termination) -> String {
    if history.is_empty() {
        return format!(
            "No agent output was produced for goal \"{}\" (run ended: {}).",
            goal, termination
        );
    }

    let start = history.len().saturating_sub(SYNTHESIS_ENTRIES);
    history[start..]
        .iter()
        .map(|s| format!("[step {}] {}:\n{}", s.step, s.agent_name, s.output))
        .collect::<Vec<_>>()
        .join("\n\n")
}
