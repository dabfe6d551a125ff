//! Console presenter: renders turn events to the terminal.

use pipeclaw_core::event::TurnObserver;
use pipeclaw_core::message::{ToolCall, ToolOutcome};
use serde_json::Value;

/// Prints assistant text, tool activity and errors as they happen.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl TurnObserver for ConsolePresenter {
    fn on_assistant_text(&self, text: &str) {
        println!("{}", render_assistant_text(text));
    }

    fn on_tool_requested(&self, call: &ToolCall) {
        println!("{}", render_tool_request(call));
    }

    fn on_tool_result(&self, _tool_call_id: &str, outcome: &ToolOutcome) {
        println!("{}", render_tool_result(outcome));
    }

    fn on_turn_error(&self, message: &str) {
        eprintln!("  [Error] {message}");
    }
}

pub fn render_assistant_text(text: &str) -> String {
    text.lines()
        .map(|line| format!("  Assistant > {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_tool_request(call: &ToolCall) -> String {
    format!("  [tool] {} {}", call.name, call.arguments)
}

/// Render a tool outcome according to the shape of its payload.
pub fn render_tool_result(outcome: &ToolOutcome) -> String {
    let Ok(payload) = serde_json::from_str::<Value>(&outcome.content) else {
        return format!("  [result] {}", outcome.content);
    };

    if !outcome.success {
        let message = payload["error"].as_str().unwrap_or(&outcome.content);
        return format!("  [tool error] {message}");
    }

    if let Some(results) = payload["results"].as_array() {
        let mut out = format!("  [search] {} result(s)", results.len());
        for (i, r) in results.iter().enumerate() {
            out.push_str(&format!(
                "\n    {}. {}\n       {}\n       {}",
                i + 1,
                r["title"].as_str().unwrap_or_default(),
                r["url"].as_str().unwrap_or_default(),
                r["snippet"].as_str().unwrap_or_default(),
            ));
        }
        return out;
    }

    if payload.get("success").is_some() && payload.get("code").is_some() {
        return render_code_result(&payload);
    }

    if let (Some(workflow), Some(result)) = (payload["workflow"].as_str(), payload["result"].as_str()) {
        let meta = &payload["metadata"];
        let confidence = meta["confidence"].as_f64().unwrap_or_default() * 100.0;
        return format!(
            "  [workflow] {workflow}\n    {result}\n    Processing time: {}  Tokens: {}  Confidence: {confidence:.1}%",
            meta["processing_time"].as_str().unwrap_or("-"),
            meta["tokens_used"],
        );
    }

    let pretty = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| outcome.content.clone());
    format!("  [result]\n{}", indent(&pretty, 4))
}

fn render_code_result(payload: &Value) -> String {
    let mut out = String::from("  [code]");
    if let Some(lines) = payload["console_output"].as_array()
        && !lines.is_empty()
    {
        let joined: Vec<&str> = lines.iter().filter_map(Value::as_str).collect();
        out.push_str(&format!("\n    Console: {}", joined.join(", ")));
    }
    if payload["success"].as_bool() == Some(true) {
        out.push_str(&format!(
            "\n    Result ({}): {}",
            payload["type"].as_str().unwrap_or("undefined"),
            payload["result"]
        ));
    } else {
        out.push_str(&format!(
            "\n    Error: {}",
            payload["error"].as_str().unwrap_or("unknown error")
        ));
    }
    out
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
